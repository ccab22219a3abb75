//! Pagination DTO
//!
//! One page of records plus the numbers a client needs to request the next.

use serde::Serialize;

/// A page of `T`.
///
/// `page_number` is 1-based; `total` counts records across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page_number: u32, page_size: u32, total: u64) -> Self {
        Self {
            data,
            page_number,
            page_size,
            total,
        }
    }

    /// Number of pages needed for `total` records. Zero when `page_size` is zero.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page_number) < self.total_pages()
    }

    /// Convert every record, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total: self.total,
        }
    }
}
