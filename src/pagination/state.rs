//! Pagination State
//!
//! Progress of one paginated run, threaded explicitly through the engine and
//! the caller's callbacks.

use super::page::Page;

/// Maximum page size the Helix API accepts
pub const PROVIDER_PAGE_CAP: u32 = 100;

/// How a paginated run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The provider returned no continuation cursor
    Exhausted,

    /// The item budget was met
    BudgetReached,

    /// Cancellation was observed between fetches
    Cancelled,
}

/// Progress of a paginated run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaginationState {
    /// Cursor of the last successful page (or the starting cursor)
    cursor: Option<String>,

    /// Items forwarded so far
    retrieved: usize,

    /// Maximum number of items to forward (`None` = unbounded)
    budget: Option<usize>,

    /// Size of the last successful page
    last_page_len: Option<usize>,

    /// Requests issued, including a failed one
    requests: usize,
}

impl PaginationState {
    /// Start from the beginning of the resource
    pub fn new(budget: Option<usize>) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Resume from a cursor handed out by an earlier run
    pub fn resume(cursor: Option<String>, budget: Option<usize>) -> Self {
        Self {
            cursor: cursor.filter(|c| !c.is_empty()),
            budget,
            ..Self::default()
        }
    }

    /// Cursor to continue from
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn retrieved(&self) -> usize {
        self.retrieved
    }

    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    pub fn last_page_len(&self) -> Option<usize> {
        self.last_page_len
    }

    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Items still allowed by the budget
    pub fn remaining(&self) -> Option<usize> {
        self.budget.map(|b| b.saturating_sub(self.retrieved))
    }

    pub fn budget_reached(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Page size for the next request, never above `cap`
    pub fn next_page_size(&self, cap: u32) -> u32 {
        match self.remaining() {
            Some(remaining) => remaining.min(cap as usize) as u32,
            None => cap,
        }
    }

    /// Default continuation predicate: more pages exist and budget remains
    pub fn should_continue<T>(page: &Page<T>, state: &PaginationState) -> bool {
        page.cursor().is_some() && !state.budget_reached()
    }

    pub(crate) fn record_request(&mut self) {
        self.requests += 1;
    }

    pub(crate) fn record_page<T>(&mut self, page: &Page<T>) {
        self.cursor = page.cursor().map(str::to_string);
        self.retrieved += page.count();
        self.last_page_len = Some(page.count());
    }
}
