//! Shared query types for API handlers

use serde::Deserialize;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Offset-based pagination query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Effective limit, clamped to the allowed range
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }

    /// Effective offset, never negative
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let q = PageQuery {
            limit: None,
            offset: None,
        };
        assert_eq!(q.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_page_query_clamps() {
        let q = PageQuery {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(q.limit(), MAX_PAGE_LIMIT);
        assert_eq!(q.offset(), 0);

        let q = PageQuery {
            limit: Some(0),
            offset: Some(40),
        };
        assert_eq!(q.limit(), 1);
        assert_eq!(q.offset(), 40);
    }
}
