//! Stateless pagination value objects.
//!
//! List handlers receive a [`PageDefaults`] from configuration and resolve
//! the caller's `page`/`page_size` query against it; nothing here is
//! shared mutable state.

use serde::Serialize;

/// Per-list pagination configuration: the default page size and the hard
/// ceiling a caller-supplied `page_size` is clamped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageDefaults {
    pub page_size: u32,
    pub max_page_size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
}

impl PageParams {
    /// Resolve raw query values against the configured defaults. Missing
    /// values fall back to the defaults; out-of-range values are clamped
    /// rather than rejected.
    pub fn resolve(page: Option<u32>, page_size: Option<u32>, defaults: PageDefaults) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size.unwrap_or(defaults.page_size).clamp(1, defaults.max_page_size);
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }
}

/// One page of results in the list envelope every paginated endpoint
/// returns: `{count, total_pages, current_page, results}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Paginate an already filtered and ordered collection. A page past
    /// the end yields an empty result set with the true count intact.
    pub fn from_items(items: Vec<T>, params: PageParams) -> Self {
        let count = items.len() as u64;
        let total_pages = count.div_ceil(params.page_size as u64).max(1);
        let results: Vec<T> =
            items.into_iter().skip(params.offset()).take(params.page_size as usize).collect();

        Self { count, total_pages, current_page: params.page, results }
    }
}
