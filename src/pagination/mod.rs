//! Page arithmetic and the ellipsis-compressed page window.
//!
//! Navigation never clamps: a request for a page outside `1..=total_pages` is
//! ignored and leaves the current page where it was.

use std::fmt;

use serde::Serialize;

use crate::model::PageSize;

pub const DEFAULT_MAX_VISIBLE: u32 = 5;

/// One entry of a rendered page window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "page")]
pub enum PageSlot {
    Page(u32),
    Ellipsis,
}

impl PageSlot {
    pub fn page(self) -> Option<u32> {
        match self {
            Self::Page(n) => Some(n),
            Self::Ellipsis => None,
        }
    }
}

impl fmt::Display for PageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str("..."),
        }
    }
}

/// `max(1, ceil(total_items / page_size))`. A zero page size counts as 1.
pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total_items.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Compute the visible page window around `current_page`.
///
/// Pages `left..=right` are always emitted; `1, ...` is prepended when the
/// window does not start at the first page and `..., last` appended when it
/// does not reach the last page. `current_page` is clamped into range first so
/// the result never names a page that does not exist.
pub fn compute_window(
    current_page: u32,
    total_items: u64,
    page_size: u32,
    max_visible: u32,
) -> Vec<PageSlot> {
    let total = total_pages(total_items, page_size);
    let max_visible = max_visible.max(1);
    let current = current_page.clamp(1, total);

    let left = current.saturating_sub(max_visible / 2).max(1);
    let right = total.min(left.saturating_add(max_visible - 1));

    // Sized from the pages actually emitted; `max_visible` may be far larger.
    let mut window = Vec::with_capacity((right - left) as usize + 5);
    if left > 1 {
        window.push(PageSlot::Page(1));
        window.push(PageSlot::Ellipsis);
    }
    window.extend((left..=right).map(PageSlot::Page));
    if right < total {
        window.push(PageSlot::Ellipsis);
        window.push(PageSlot::Page(total));
    }
    window
}

/// Current position within a paginated collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paginator {
    current_page: u32,
    total_items: u64,
    page_size: PageSize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

impl Paginator {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            current_page: 1,
            total_items: 0,
            page_size,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_items, self.page_size.get())
    }

    /// Move to `target` when it names an existing page. Returns whether the
    /// page changed hands; out-of-range targets are ignored.
    pub fn set_page(&mut self, target: u32) -> bool {
        if target < 1 || target > self.total_pages() {
            return false;
        }
        self.current_page = target;
        true
    }

    pub fn next(&mut self) -> bool {
        self.set_page(self.current_page.saturating_add(1))
    }

    pub fn previous(&mut self) -> bool {
        self.set_page(self.current_page.saturating_sub(1))
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    /// Record a new collection total. A shrinking total pulls the current page
    /// back onto the last page.
    pub fn set_total_items(&mut self, total_items: u64) {
        self.total_items = total_items;
        let last = self.total_pages();
        if self.current_page > last {
            self.current_page = last;
        }
    }

    /// Change the page size and go back to the first page.
    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.current_page = 1;
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn window(&self, max_visible: u32) -> Vec<PageSlot> {
        compute_window(
            self.current_page,
            self.total_items,
            self.page_size.get(),
            max_visible,
        )
    }

    /// 1-based inclusive range of the items on the current page, or `None`
    /// for an empty collection.
    pub fn item_range(&self) -> Option<(u64, u64)> {
        if self.total_items == 0 {
            return None;
        }
        let size = u64::from(self.page_size.get());
        let start = u64::from(self.current_page - 1) * size + 1;
        if start > self.total_items {
            return None;
        }
        let end = (start + size - 1).min(self.total_items);
        Some((start, end))
    }
}
