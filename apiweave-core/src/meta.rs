use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Type-keyed metadata collected while the application is assembled.
///
/// Every registered route pushes its frozen
/// [`RouteMeta`](crate::route::RouteMeta) (behind an `Arc`); plugins may push
/// their own types. Consumers registered with
/// [`ApiApp::with_meta_consumer`](crate::app::ApiApp::with_meta_consumer)
/// read one type at build time.
#[derive(Default)]
pub struct MetaRegistry {
    inner: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MetaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<M: Any + Send + Sync>(&mut self, item: M) {
        let slot = self
            .inner
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Box::new(Vec::<M>::new()));
        if let Some(items) = slot.downcast_mut::<Vec<M>>() {
            items.push(item);
        }
    }

    pub fn extend<M: Any + Send + Sync>(&mut self, items: impl IntoIterator<Item = M>) {
        for item in items {
            self.push(item);
        }
    }

    /// All items of type `M`, in push order.
    pub fn get<M: Any + Send + Sync>(&self) -> &[M] {
        self.inner
            .get(&TypeId::of::<M>())
            .and_then(|boxed| boxed.downcast_ref::<Vec<M>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len<M: Any + Send + Sync>(&self) -> usize {
        self.get::<M>().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_are_kept_per_type() {
        let mut registry = MetaRegistry::new();
        registry.push(1u32);
        registry.extend(["a", "b"]);
        registry.push(2u32);
        assert_eq!(registry.get::<u32>(), &[1, 2]);
        assert_eq!(registry.get::<&str>(), &["a", "b"]);
        assert!(registry.get::<i64>().is_empty());
    }
}
