//! Paging over the community feed. The full, newest-first post list is held
//! in memory and every page is a fixed five-entry window into it; navigation
//! only moves a cursor and never touches the store.

use std::ops::Range;

pub const PAGE_SIZE: usize = 5;

/// Number of pages needed for `total_posts` entries. An empty feed still
/// renders as one (empty) page.
pub fn total_pages(total_posts: usize) -> usize {
    if total_posts > 0 {
        (total_posts + PAGE_SIZE - 1) / PAGE_SIZE
    } else {
        1
    }
}

/// Index window shown for a 1-based `page`. Pages past the end of the list
/// come back empty rather than clamping to the last page.
pub fn page_window(total_posts: usize, page: usize) -> Range<usize> {
    let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
    if start >= total_posts {
        return total_posts..total_posts;
    }
    let end = (start + PAGE_SIZE).min(total_posts);
    start..end
}

/// Cursor over an in-memory feed snapshot.
///
/// Replacing the snapshot recomputes the page count but deliberately leaves
/// the cursor where it was, even when that page no longer exists; the caller
/// sees an empty window and can navigate back into range.
pub struct FeedPager<T> {
    posts: Vec<T>,
    current_page: usize,
    total_pages: usize,
}

impl<T> FeedPager<T> {
    pub fn new() -> Self {
        Self {
            posts: Vec::new(),
            current_page: 1,
            total_pages: 1,
        }
    }

    pub fn set_posts(&mut self, posts: Vec<T>) {
        self.total_pages = total_pages(posts.len());
        self.posts = posts;
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn total_posts(&self) -> usize {
        self.posts.len()
    }

    pub fn go_to_next_page(&mut self) {
        if self.current_page < self.total_pages {
            self.current_page += 1;
        }
    }

    pub fn go_to_previous_page(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    pub fn go_to_page(&mut self, page: usize) {
        if page >= 1 && page <= self.total_pages {
            self.current_page = page;
        }
    }

    pub fn visible(&self) -> &[T] {
        &self.posts[page_window(self.posts.len(), self.current_page)]
    }
}

impl<T> Default for FeedPager<T> {
    fn default() -> Self {
        Self::new()
    }
}
