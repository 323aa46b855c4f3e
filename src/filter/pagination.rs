use serde::Serialize;

/// Fallback page size when none (or zero) is configured.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One page of a filtered list, with the page number as actually served.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number after clamping.
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Number of pages needed for `total` items. Never less than one, so an empty
/// result still has a page 1 to show.
pub fn total_pages(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

/// Clamp a 1-based `page` into `1..=total_pages(total, page_size)`.
pub fn clamp_page(page: usize, total: usize, page_size: usize) -> usize {
    page.clamp(1, total_pages(total, page_size))
}

/// Cut `items` down to the requested page, clamping the page number first.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let page = clamp_page(page, total, page_size);
    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        page,
        page_size,
        total,
        total_pages: total_pages(total, page_size),
    }
}
