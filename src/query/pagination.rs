use serde::{Deserialize, Serialize};

/// Requested window. Pages are 1-indexed; there is no upper bound, a page
/// past the end simply yields no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// `page` 0 reads as 1 and `limit` 0 as `default_limit`.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        PageRequest {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            limit: limit.filter(|l| *l > 0).unwrap_or(default_limit.max(1)),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_count: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(request.limit());
        Pagination {
            current_page: request.page,
            total_pages,
            total_count,
            has_next_page: u64::from(request.page) < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub events: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            events: self.events.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let req = PageRequest::new(None, None, 12);
        assert_eq!(req, PageRequest { page: 1, limit: 12 });
        assert_eq!(req.skip(), 0);
        assert_eq!(PageRequest::new(Some(0), Some(0), 10), PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn twenty_five_records_in_pages_of_twelve() {
        let last = Pagination::new(PageRequest::new(Some(3), Some(12), 12), 25);
        assert_eq!(last.total_pages, 3);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);
        assert_eq!(PageRequest::new(Some(3), Some(12), 12).skip(), 24);

        let first = Pagination::new(PageRequest::new(Some(1), Some(12), 12), 25);
        assert!(first.has_next_page);
        assert!(!first.has_prev_page);

        let beyond = Pagination::new(PageRequest::new(Some(4), Some(12), 12), 25);
        assert_eq!(beyond.current_page, 4);
        assert!(!beyond.has_next_page);
        assert!(beyond.has_prev_page);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let p = Pagination::new(PageRequest::new(None, None, 12), 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page && !p.has_prev_page);
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(Pagination::new(PageRequest::new(None, None, 12), 1)).unwrap();
        for key in ["currentPage", "totalPages", "totalCount", "hasNextPage", "hasPrevPage"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
