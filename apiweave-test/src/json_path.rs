use serde_json::Value;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(String),
    Index(usize),
    /// `len()`: element count of an array or object, char count of a string.
    Len,
}

/// A parsed lookup path such as `detail.json.name[0]` or `pets.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    steps: Vec<Step>,
}

impl JsonPath {
    /// # Panics
    ///
    /// Panics on an unterminated `[` or a non-numeric index.
    pub fn parse(path: &str) -> Self {
        let mut steps = Vec::new();
        let mut key = String::new();
        let mut chars = path.chars().peekable();

        let flush = |key: &mut String, steps: &mut Vec<Step>| {
            if key == "len()" {
                steps.push(Step::Len);
            } else if !key.is_empty() {
                steps.push(Step::Key(key.clone()));
            }
            key.clear();
        };

        while let Some(c) = chars.next() {
            match c {
                '.' => flush(&mut key, &mut steps),
                '[' => {
                    flush(&mut key, &mut steps);
                    let digits: String = chars.by_ref().take_while(|c| *c != ']').collect();
                    let index = digits
                        .trim()
                        .parse()
                        .unwrap_or_else(|_| panic!("bad index `[{digits}]` in path `{path}`"));
                    steps.push(Step::Index(index));
                }
                _ => key.push(c),
            }
        }
        flush(&mut key, &mut steps);
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Walk `root`; a missing key or index yields `null`.
    pub fn lookup(&self, root: &Value) -> Value {
        let mut node = root;
        for (depth, step) in self.steps.iter().enumerate() {
            node = match step {
                Step::Key(key) => node.get(key.as_str()).unwrap_or(&Value::Null),
                Step::Index(i) => node.get(*i).unwrap_or(&Value::Null),
                Step::Len => {
                    let len = match node {
                        Value::Array(items) => items.len(),
                        Value::Object(map) => map.len(),
                        Value::String(s) => s.chars().count(),
                        other => panic!(
                            "len() needs an array, object or string; found {other} after {:?}",
                            &self.steps[..depth]
                        ),
                    };
                    return Value::from(len);
                }
            };
        }
        node.clone()
    }
}

/// Shorthand for `JsonPath::parse(path).lookup(root)`.
pub fn resolve_path(root: &Value, path: &str) -> Value {
    JsonPath::parse(path).lookup(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_keys_indices_and_len() {
        assert_eq!(
            JsonPath::parse("a.b[2][0].len()").steps(),
            &[
                Step::Key("a".into()),
                Step::Key("b".into()),
                Step::Index(2),
                Step::Index(0),
                Step::Len,
            ]
        );
    }

    #[test]
    fn leading_index_is_allowed() {
        assert_eq!(resolve_path(&json!([{"x": 1}]), "[0].x"), json!(1));
    }

    #[test]
    #[should_panic(expected = "len() needs")]
    fn len_of_number_panics() {
        resolve_path(&json!({"n": 3}), "n.len()");
    }
}
