//! Pagination shared by list endpoints.

use serde::{Deserialize, Serialize};

/// Page request shared by list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: i64,
    /// Page size.
    pub limit: i64,
}

impl PageRequest {
    /// Largest page size a client may request.
    pub const MAX_LIMIT: i64 = 100;
    /// Page size when none is given.
    pub const DEFAULT_LIMIT: i64 = 20;

    /// Build a page request, clamping page to `>= 1` and limit to `1..=100`.
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        Self::new(q.page, q.limit)
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    #[must_use]
    pub const fn new(request: PageRequest, total: i64) -> Self {
        let pages = if total <= 0 {
            0
        } else {
            (total + request.limit - 1) / request.limit
        };
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages,
            has_next: request.page < pages,
            has_prev: request.page > 1,
        }
    }
}

/// `?limit=&offset=` query parameters used by the agent-facing endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OffsetQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OffsetQuery {
    /// Clamped `(limit, offset)`; the default limit is 10.
    #[must_use]
    pub fn resolve(self) -> (i64, i64) {
        (
            self.limit.unwrap_or(10).clamp(1, PageRequest::MAX_LIMIT),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    #[must_use]
    pub fn new(data: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            data,
            pagination: Pagination::new(request, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::default();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_request_clamps() {
        let page = PageRequest::new(Some(0), Some(1000));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 100);

        let page = PageRequest::new(Some(3), Some(-5));
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset(), 2);
    }

    #[test]
    fn test_offset_query_resolve() {
        assert_eq!(OffsetQuery::default().resolve(), (10, 0));
        let q = OffsetQuery {
            limit: Some(500),
            offset: Some(-3),
        };
        assert_eq!(q.resolve(), (100, 0));
    }

    #[test]
    fn test_pagination_metadata() {
        let meta = Pagination::new(PageRequest::new(Some(2), Some(10)), 25);
        assert_eq!(meta.pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        let meta = Pagination::new(PageRequest::new(Some(3), Some(10)), 25);
        assert!(!meta.has_next);

        let empty = Pagination::new(PageRequest::default(), 0);
        assert_eq!(empty.pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}
