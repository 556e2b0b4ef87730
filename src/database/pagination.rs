use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// `?page=&limit=` of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Malformed values fall back to the defaults.
    pub fn from_query(pairs: &[(String, String)]) -> Self {
        let find = |key: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.trim().parse::<i64>().ok())
                .filter(|v| *v > 0)
        };
        let default = Self::default();

        Self::new(
            find("page").unwrap_or(default.page),
            find("limit").unwrap_or(default.limit),
        )
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        if rows.is_empty() && request.page == 1 {
            return Self::no_rows();
        }

        let next = (request.offset() + request.limit < total_rows).then_some(request.page + 1);
        let previous = (request.page > 1).then_some(request.page - 1);

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_and_fallbacks() {
        assert_eq!(PageRequest::from_query(&[]), PageRequest::default());
        assert_eq!(
            PageRequest::from_query(&pairs(&[("page", "x"), ("limit", "-3")])),
            PageRequest::default()
        );
        assert_eq!(
            PageRequest::from_query(&pairs(&[("page", "3"), ("limit", "1000")])),
            PageRequest {
                page: 3,
                limit: MAX_PAGE_SIZE
            }
        );
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(PageRequest::new(1, 6).offset(), 0);
        assert_eq!(PageRequest::new(3, 6).offset(), 12);
    }

    #[test]
    fn next_and_previous_pages() {
        let page = PageContext::from_rows(vec![1, 2], 5, PageRequest::new(2, 2));
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = PageContext::from_rows(vec![5], 5, PageRequest::new(3, 2));
        assert_eq!(last.next, None);
        assert_eq!(last.count, 5);

        let past_end: PageContext<i32> = PageContext::from_rows(vec![], 3, PageRequest::new(5, 2));
        assert_eq!(past_end.count, 3);
        assert_eq!(past_end.next, None);
        assert_eq!(past_end.previous, Some(4));

        let empty: PageContext<i32> = PageContext::from_rows(vec![], 0, PageRequest::default());
        assert_eq!(empty, PageContext::no_rows());
    }
}
