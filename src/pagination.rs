//! Page-number + page-size pagination contract shared by all list endpoints.

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 1000;

/// Query parameters accepted by every paginated listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    /// Resolve raw parameters into a 1-based page and a clamped page size.
    pub fn resolve(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, page_size)
    }

    /// SQL `LIMIT`/`OFFSET` pair for the resolved page.
    pub fn limit_offset(&self) -> (i64, i64) {
        let (page, page_size) = self.resolve();
        (page_size as i64, (page as i64 - 1) * page_size as i64)
    }
}

/// Response envelope wrapping one page of data plus pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, params: &PageParams, total_count: i64) -> Self {
        let (page, page_size) = params.resolve();
        let total_pages = ((total_count.max(0) as u64).div_ceil(page_size as u64)) as u32;
        Self {
            data,
            page,
            page_size,
            total_count,
            total_pages,
        }
    }
}
