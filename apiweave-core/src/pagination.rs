//! Pagination payloads with navigation links.
//!
//! ```ignore
//! async fn list_pets(url: RequestUrl, QueryArgs(q): QueryArgs<PageQuery>) -> Reply {
//!     let page = Pagination::new(q.page, q.per_page, store.len() as u64);
//!     Reply::new(json!({
//!         "pets": store.page(q.page, q.per_page),
//!         "pagination": pagination_builder(&page, &url, &[]),
//!     }))
//! }
//! ```

use serde::Serialize;
use url::Url;

use crate::http::{FromRequestParts, HeaderMap, Parts, HOST};

/// Position in a paginated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl Pagination {
    /// `page` and `per_page` are clamped to at least 1.
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            total,
        }
    }

    /// Number of pages, `0` for an empty collection.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Offset of the first item of the current page, saturating at `u64::MAX`.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// The pagination payload, shaped like [`pagination_schema`](crate::schema::pagination_schema).
///
/// `next` and `prev` are empty strings when there is no such page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationPayload {
    pub page: u64,
    pub per_page: u64,
    pub pages: u64,
    pub total: u64,
    pub current: String,
    pub next: String,
    pub prev: String,
    pub first: String,
    pub last: String,
}

/// The absolute URL of the current request.
///
/// The scheme comes from `X-Forwarded-Proto` when a proxy sets it, the host
/// from the `Host` header.
#[derive(Debug, Clone)]
pub struct RequestUrl(pub Url);

impl RequestUrl {
    pub fn from_parts(parts: &Parts) -> Option<Self> {
        let scheme = forwarded_proto(&parts.headers).unwrap_or("http");
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Url::parse(&format!("{scheme}://{host}{path_and_query}"))
            .ok()
            .map(RequestUrl)
    }

    /// This URL with `page` and `per_page` substituted and `extra`
    /// parameters appended.
    pub fn with_page(&self, page: u64, per_page: u64, extra: &[(&str, &str)]) -> String {
        let mut url = self.0.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "page" && k != "per_page" && !extra.iter().any(|(e, _)| e == k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            for (k, v) in &kept {
                query.append_pair(k, v);
            }
            query.append_pair("page", &page.to_string());
            query.append_pair("per_page", &per_page.to_string());
            for (k, v) in extra {
                query.append_pair(k, v);
            }
        }
        url.to_string()
    }
}

fn forwarded_proto(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for RequestUrl {
    type Rejection = crate::error::HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        RequestUrl::from_parts(parts)
            .ok_or_else(|| crate::error::HttpError::bad_request("Invalid request URL."))
    }
}

/// Build the pagination payload for `pagination` at `url`.
pub fn pagination_builder(
    pagination: &Pagination,
    url: &RequestUrl,
    extra: &[(&str, &str)],
) -> PaginationPayload {
    let per_page = pagination.per_page;
    let link = |page: u64| url.with_page(page, per_page, extra);
    let pages = pagination.pages();
    PaginationPayload {
        page: pagination.page,
        per_page,
        pages,
        total: pagination.total,
        current: link(pagination.page),
        next: if pagination.has_next() {
            link(pagination.page + 1)
        } else {
            String::new()
        },
        prev: if pagination.has_prev() {
            link(pagination.page - 1)
        } else {
            String::new()
        },
        first: link(1),
        last: link(pages.max(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn url(uri: &str) -> RequestUrl {
        let request = Request::builder()
            .uri(uri)
            .header(HOST, "api.example.com")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        RequestUrl::from_parts(&parts).unwrap()
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(Pagination::new(1, 25, 248).pages(), 10);
        assert_eq!(Pagination::new(1, 25, 250).pages(), 10);
        assert_eq!(Pagination::new(1, 25, 0).pages(), 0);
    }

    #[test]
    fn offset_of_a_huge_page_saturates() {
        assert_eq!(Pagination::new(3, 25, 100).offset(), 50);
        assert_eq!(Pagination::new(1_000_000_000_000_000_000, 30, 3).offset(), u64::MAX);
        let beyond = Pagination::new(u64::MAX, 30, 3);
        assert!(!beyond.has_next());
        assert!(beyond.has_prev());
    }

    #[test]
    fn middle_page_has_both_links() {
        let payload = pagination_builder(
            &Pagination::new(2, 25, 248),
            &url("/items?page=2&per_page=25"),
            &[],
        );
        assert_eq!(payload.pages, 10);
        assert_eq!(payload.next, "http://api.example.com/items?page=3&per_page=25");
        assert_eq!(payload.prev, "http://api.example.com/items?page=1&per_page=25");
        assert_eq!(payload.last, "http://api.example.com/items?page=10&per_page=25");
    }

    #[test]
    fn edge_pages_have_empty_links() {
        let first = pagination_builder(&Pagination::new(1, 10, 30), &url("/items"), &[]);
        assert_eq!(first.prev, "");
        assert!(!first.next.is_empty());

        let last = pagination_builder(&Pagination::new(3, 10, 30), &url("/items"), &[]);
        assert_eq!(last.next, "");
        assert!(!last.prev.is_empty());
    }

    #[test]
    fn empty_collection_points_last_at_page_one() {
        let payload = pagination_builder(&Pagination::new(1, 10, 0), &url("/items"), &[]);
        assert_eq!(payload.pages, 0);
        assert_eq!(payload.next, "");
        assert_eq!(payload.prev, "");
        assert_eq!(payload.last, "http://api.example.com/items?page=1&per_page=10");
    }

    #[test]
    fn other_query_parameters_are_kept() {
        let payload = pagination_builder(
            &Pagination::new(1, 10, 30),
            &url("/items?category=dog&page=1"),
            &[("sort", "name")],
        );
        assert_eq!(
            payload.next,
            "http://api.example.com/items?category=dog&page=2&per_page=10&sort=name"
        );
    }

    #[test]
    fn forwarded_proto_sets_the_scheme() {
        let request = Request::builder()
            .uri("/items")
            .header(HOST, "api.example.com")
            .header("x-forwarded-proto", "https")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        let url = RequestUrl::from_parts(&parts).unwrap();
        assert!(url.0.as_str().starts_with("https://api.example.com/"));
    }
}
