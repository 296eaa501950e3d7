//! Page arithmetic for paginated batches.

use entify_model::{EntifyError, Info, Result, Value, record_of};
use serde::Serialize;

/// Default number of page links on each side of the current page.
pub const DEFAULT_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    per_page: usize,
    total: usize,
    last_page: usize,
    offset: usize,
}

impl Paginator {
    /// `page` starts at 1 and is not clamped to the last page.
    pub fn new(page: usize, per_page: usize, total: usize) -> Result<Self> {
        if page == 0 {
            return Err(EntifyError::InvalidPagination {
                reason: "page must be at least 1".to_string(),
            });
        }
        if per_page == 0 {
            return Err(EntifyError::InvalidPagination {
                reason: "per page must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            page,
            per_page,
            total,
            last_page: total.div_ceil(per_page),
            offset: (page - 1) * per_page,
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn last_page(&self) -> usize {
        self.last_page
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Up to `count` pages immediately before the current one.
    pub fn previous_pages(&self, count: usize) -> Vec<usize> {
        let start = self.page.saturating_sub(count).max(1);
        (start..self.page).collect()
    }

    /// Up to `count` pages after the current one, never past the last page.
    pub fn next_pages(&self, count: usize) -> Vec<usize> {
        let end = self.page.saturating_add(count).min(self.last_page);
        (self.page + 1..=end).collect()
    }

    pub fn to_page_info(&self, current_count: usize) -> PageInfo {
        self.to_page_info_with(current_count, DEFAULT_WINDOW, DEFAULT_WINDOW)
    }

    pub fn to_page_info_with(
        &self,
        current_count: usize,
        previous_window: usize,
        next_window: usize,
    ) -> PageInfo {
        PageInfo {
            current_page: self.page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
            from: self.offset + 1,
            to: self.offset + current_count,
            previous_pages: self.previous_pages(previous_window),
            next_pages: self.next_pages(next_window),
        }
    }
}

/// Pagination block attached to a batch's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub per_page: usize,
    pub total: usize,
    pub last_page: usize,
    pub from: usize,
    pub to: usize,
    pub previous_pages: Vec<usize>,
    pub next_pages: Vec<usize>,
}

impl PageInfo {
    pub fn into_info(self) -> Info {
        let pages = |pages: Vec<usize>| Value::List(pages.into_iter().map(count_value).collect());
        record_of([
            ("currentPage", count_value(self.current_page)),
            ("perPage", count_value(self.per_page)),
            ("total", count_value(self.total)),
            ("lastPage", count_value(self.last_page)),
            ("from", count_value(self.from)),
            ("to", count_value(self.to)),
            ("previousPages", pages(self.previous_pages)),
            ("nextPages", pages(self.next_pages)),
        ])
    }
}

fn count_value(count: usize) -> Value {
    Value::Int(i64::try_from(count).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_three() {
        let paginator = Paginator::new(1, 10, 25).unwrap();
        assert_eq!(paginator.last_page(), 3);
        assert_eq!(paginator.offset(), 0);

        let info = paginator.to_page_info(10);
        assert_eq!(info.from, 1);
        assert_eq!(info.to, 10);
        assert!(info.previous_pages.is_empty());
        assert_eq!(info.next_pages, vec![2, 3]);
    }

    #[test]
    fn last_partial_page() {
        let paginator = Paginator::new(3, 10, 25).unwrap();
        assert_eq!(paginator.offset(), 20);
        let info = paginator.to_page_info(5);
        assert_eq!(info.from, 21);
        assert_eq!(info.to, 25);
        assert_eq!(info.previous_pages, vec![1, 2]);
        assert!(info.next_pages.is_empty());
    }

    #[test]
    fn windows_are_bounded() {
        let paginator = Paginator::new(10, 1, 20).unwrap();
        let info = paginator.to_page_info_with(1, 3, 2);
        assert_eq!(info.previous_pages, vec![7, 8, 9]);
        assert_eq!(info.next_pages, vec![11, 12]);
    }

    #[test]
    fn empty_total_has_no_pages() {
        let paginator = Paginator::new(1, 10, 0).unwrap();
        assert_eq!(paginator.last_page(), 0);
        let info = paginator.to_page_info(0);
        assert!(info.previous_pages.is_empty());
        assert!(info.next_pages.is_empty());
    }

    #[test]
    fn rejects_zero_page_and_page_size() {
        assert!(matches!(
            Paginator::new(0, 10, 5),
            Err(EntifyError::InvalidPagination { .. })
        ));
        assert!(matches!(
            Paginator::new(1, 0, 5),
            Err(EntifyError::InvalidPagination { .. })
        ));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let info = Paginator::new(2, 10, 25).unwrap().to_page_info(10);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["currentPage"], 2);
        assert_eq!(json["previousPages"], serde_json::json!([1]));

        let info = info.into_info();
        assert_eq!(info["lastPage"], Value::Int(3));
        assert_eq!(info["nextPages"], Value::List(vec![Value::Int(3)]));
    }
}
