//! Page and request types shared by every paged resource.

/// One fetch result
///
/// An empty cursor string is treated the same as a missing one: the
/// resource is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    items: Vec<T>,
    cursor: Option<String>,
}

impl<T> Page<T> {
    /// Create a page from its items and continuation cursor
    pub fn new(items: Vec<T>, cursor: Option<String>) -> Self {
        Self {
            items,
            cursor: cursor.filter(|c| !c.is_empty()),
        }
    }

    /// Create the final page of a resource
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// Items in provider order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Continuation cursor, if the provider has more
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Number of items on this page
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Whether the provider reported no further pages
    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

/// Parameters for a single page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Cursor to continue from (`None` starts from the beginning)
    pub cursor: Option<String>,

    /// Number of items to ask for
    pub size: u32,
}
