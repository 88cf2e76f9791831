use axum::http::Uri;
use serde::Serialize;
use url::form_urlencoded;

use crate::storage::Window;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Largest offset a SQL backend accepts (`OFFSET` is a signed bigint).
const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Coerces raw query values; anything that is not a positive integer
    /// falls back to the default for that field. `page_size` is capped at
    /// [`MAX_PAGE_SIZE`].
    pub fn from_raw(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            page_size: parse_positive(page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(MAX_OFFSET)
    }

    /// Whether this page starts at or after the last of `count` items.
    pub fn is_past_end(&self, count: u64) -> bool {
        self.offset() >= count
    }

    pub fn window(&self) -> Window {
        Window {
            offset: self.offset(),
            limit: self.page_size,
        }
    }

    /// Slices an already materialised, already ordered list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.page_size).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

/// One page of results plus the count of everything that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, count: u64, request: PageRequest) -> Self {
        Self {
            items,
            count,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.count, self.page_size)
    }
}

pub fn total_pages(count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Wire envelope for paginated listings.
#[derive(Debug, Serialize)]
pub struct PageEnvelope<T> {
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageEnvelope<T> {
    /// `uri` is the request URI; links keep its path and every query
    /// parameter except `page`.
    pub fn new(paginated: Paginated<T>, uri: &Uri) -> Self {
        let total_pages = paginated.total_pages();
        let page = paginated.page;

        let next = (page < total_pages).then(|| page_link(uri, page + 1));
        let previous = (page > 1).then(|| page_link(uri, page - 1));

        Self {
            count: paginated.count,
            page,
            page_size: paginated.page_size,
            total_pages,
            next,
            previous,
            results: paginated.items,
        }
    }
}

fn page_link(uri: &Uri, page: u64) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(raw) = uri.query() {
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            if key != "page" {
                query.append_pair(&key, &value);
            }
        }
    }
    query.append_pair("page", &page.to_string());
    format!("{}?{}", uri.path(), query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(1, 10), 1);
    }

    #[test]
    fn test_invalid_inputs_fall_back_to_defaults() {
        assert_eq!(PageRequest::from_raw(None, None), PageRequest::default());
        assert_eq!(
            PageRequest::from_raw(Some("abc"), Some("-5")),
            PageRequest { page: 1, page_size: 10 }
        );
        assert_eq!(
            PageRequest::from_raw(Some("0"), Some("2.5")),
            PageRequest { page: 1, page_size: 10 }
        );
        assert_eq!(
            PageRequest::from_raw(Some("3"), Some("25")),
            PageRequest { page: 3, page_size: 25 }
        );
    }

    #[test]
    fn test_page_size_is_capped() {
        assert_eq!(PageRequest::from_raw(None, Some("5000")).page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::from_raw(None, Some("100")).page_size, 100);
    }

    #[test]
    fn test_offset_and_slice() {
        let request = PageRequest { page: 2, page_size: 3 };
        assert_eq!(request.offset(), 3);
        assert_eq!(request.slice((1..=8).collect()), vec![4, 5, 6]);

        let past_end = PageRequest { page: 9, page_size: 3 };
        assert!(past_end.slice((1..=8).collect::<Vec<i32>>()).is_empty());
    }

    #[test]
    fn test_huge_page_offset_fits_a_signed_bigint() {
        let request = PageRequest::from_raw(Some("10000000000000000000"), Some("10"));
        assert_eq!(request.page, 10_000_000_000_000_000_000);
        assert_eq!(request.offset(), i64::MAX as u64);
        assert!(request.is_past_end(3));

        let unbounded = PageRequest { page: u64::MAX, page_size: u64::MAX };
        assert_eq!(unbounded.offset(), i64::MAX as u64);
        assert!(!PageRequest::default().is_past_end(1));
        assert!(PageRequest::default().is_past_end(0));
    }

    #[test]
    fn test_envelope_links_preserve_filters() {
        let uri: Uri = "/api/admin/rides?status=completed&page=2&page_size=1"
            .parse()
            .unwrap();
        let paginated = Paginated::new(vec!["b"], 3, PageRequest { page: 2, page_size: 1 });
        let envelope = PageEnvelope::new(paginated, &uri);

        assert_eq!(envelope.total_pages, 3);
        assert_eq!(
            envelope.next.as_deref(),
            Some("/api/admin/rides?status=completed&page_size=1&page=3")
        );
        assert_eq!(
            envelope.previous.as_deref(),
            Some("/api/admin/rides?status=completed&page_size=1&page=1")
        );
    }

    #[test]
    fn test_single_page_has_no_links() {
        let uri: Uri = "/api/admin/rides".parse().unwrap();
        let envelope = PageEnvelope::new(Paginated::<u8>::new(vec![], 0, PageRequest::default()), &uri);
        assert_eq!(envelope.total_pages, 0);
        assert!(envelope.next.is_none());
        assert!(envelope.previous.is_none());
    }
}
