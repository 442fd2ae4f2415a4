//! Page slicing over the filtered and sorted view.
//!
//! Pages are 1-based. Slicing never clamps: a page past the end yields an
//! empty slice and callers keep their page cursor in range.

/// Number of pages needed for `count` items; never less than 1.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    count.div_ceil(page_size).max(1)
}

/// Items on `page` (1-based). Out-of-range pages give an empty slice.
pub fn paginate<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    let page_size = page_size.max(1);
    if page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Caller-side page cursor that stays within `1..=total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: usize,
    page_size: usize,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    /// Move to `page`, clamped to the valid range for `count` items.
    pub fn go_to(&mut self, page: usize, count: usize) -> usize {
        self.page = page.clamp(1, total_pages(count, self.page_size));
        self.page
    }

    pub fn next(&mut self, count: usize) -> bool {
        let before = self.page;
        self.go_to(self.page + 1, count);
        self.page != before
    }

    pub fn prev(&mut self, count: usize) -> bool {
        let before = self.page;
        self.go_to(self.page.saturating_sub(1), count);
        self.page != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(38, 5), 8);
    }

    #[test]
    fn test_paginate_slices() {
        let items: Vec<u32> = (1..=12).collect();
        assert_eq!(paginate(&items, 5, 1), &[1, 2, 3, 4, 5]);
        assert_eq!(paginate(&items, 5, 3), &[11, 12]);
        assert!(paginate(&items, 5, 4).is_empty());
        assert!(paginate(&items, 5, 0).is_empty());
    }

    #[test]
    fn test_cursor_clamps() {
        let mut cursor = PageCursor::new(5);
        assert_eq!(cursor.go_to(99, 12), 3);
        assert!(!cursor.next(12));
        assert!(cursor.prev(12));
        assert_eq!(cursor.page(), 2);
        assert_eq!(cursor.go_to(0, 12), 1);
        assert!(!cursor.prev(12));
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut cursor = PageCursor::new(5);
        cursor.go_to(2, 12);
        cursor.set_page_size(0);
        assert_eq!(cursor.page_size(), 1);
        assert_eq!(cursor.page(), 1);
    }
}
