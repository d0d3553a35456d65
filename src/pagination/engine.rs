//! Pagination Engine
//!
//! Drives a cursor-paged resource one request at a time. Request N+1 depends
//! on the cursor and remaining budget known only after request N, so fetches
//! are never pipelined.
//!
//! # Usage
//!
//! ```ignore
//! let engine = PaginationEngine::default();
//! let report = engine
//!     .run(
//!         |request| client.get_follows(&query, request),
//!         |_previous, request| client.get_follows(&query, request),
//!         |page, state| sink.write_page(page, state),
//!         PaginationState::should_continue,
//!         PaginationState::new(Some(500)),
//!         &cancel,
//!     )
//!     .await?;
//! ```

use std::future::Future;
use tokio_util::sync::CancellationToken;

use super::page::{Page, PageRequest};
use super::state::{PaginationState, Termination, PROVIDER_PAGE_CAP};

/// Outcome of a run that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationReport {
    /// Terminal state
    pub termination: Termination,

    /// Final progress, including the cursor to resume from
    pub state: PaginationState,
}

/// A fetch failed; `state` holds the last good cursor for resumption
#[derive(Debug, thiserror::Error)]
#[error("Page request #{} failed after {} items", .state.requests(), .state.retrieved())]
pub struct PaginationError<E> {
    /// Error returned by the fetch function
    #[source]
    pub source: E,

    /// Progress up to the last successful page
    pub state: PaginationState,
}

impl<E> PaginationError<E> {
    /// Cursor to pass back in to continue where the run stopped
    pub fn resume_cursor(&self) -> Option<&str> {
        self.state.cursor()
    }
}

/// Sequential driver for cursor-paged resources
#[derive(Debug, Clone, Copy)]
pub struct PaginationEngine {
    /// Largest page size ever requested
    page_cap: u32,
}

impl Default for PaginationEngine {
    fn default() -> Self {
        Self {
            page_cap: PROVIDER_PAGE_CAP,
        }
    }
}

impl PaginationEngine {
    /// Create an engine with a custom page cap
    ///
    /// The cap is clamped to `1..=PROVIDER_PAGE_CAP`.
    pub fn new(page_cap: u32) -> Self {
        Self {
            page_cap: page_cap.clamp(1, PROVIDER_PAGE_CAP),
        }
    }

    pub fn page_cap(&self) -> u32 {
        self.page_cap
    }

    /// Fetch pages until the resource is exhausted, the budget is met, or
    /// cancellation is observed
    ///
    /// # Arguments
    ///
    /// * `fetch_first` - Issues the first request
    /// * `fetch_next` - Issues a follow-up request given the previous page
    /// * `on_page` - Receives each page after `state` has been updated
    /// * `should_continue` - Decides whether another page is wanted
    /// * `state` - Starting cursor and budget
    /// * `cancel` - Checked before every request
    ///
    /// # Errors
    ///
    /// Returns the first fetch error, unretried, together with the state as
    /// of the last successful page.
    pub async fn run<T, E, First, FirstFut, Next, NextFut, OnPage, Continue>(
        &self,
        fetch_first: First,
        mut fetch_next: Next,
        mut on_page: OnPage,
        should_continue: Continue,
        mut state: PaginationState,
        cancel: &CancellationToken,
    ) -> Result<PaginationReport, PaginationError<E>>
    where
        First: FnOnce(PageRequest) -> FirstFut,
        FirstFut: Future<Output = Result<Page<T>, E>>,
        Next: FnMut(&Page<T>, PageRequest) -> NextFut,
        NextFut: Future<Output = Result<Page<T>, E>>,
        OnPage: FnMut(&Page<T>, &PaginationState),
        Continue: Fn(&Page<T>, &PaginationState) -> bool,
    {
        if state.budget_reached() {
            return Ok(finish(Termination::BudgetReached, state));
        }
        if cancel.is_cancelled() {
            return Ok(finish(Termination::Cancelled, state));
        }

        let request = self.next_request(&state);
        let mut page = settle(fetch_first(request), &mut state).await?;

        loop {
            on_page(&page, &state);

            if state.budget_reached() {
                return Ok(finish(Termination::BudgetReached, state));
            }
            if !should_continue(&page, &state) {
                return Ok(finish(Termination::Exhausted, state));
            }
            if cancel.is_cancelled() {
                return Ok(finish(Termination::Cancelled, state));
            }

            let request = self.next_request(&state);
            page = settle(fetch_next(&page, request), &mut state).await?;
        }
    }

    fn next_request(&self, state: &PaginationState) -> PageRequest {
        let request = PageRequest {
            cursor: state.cursor().map(str::to_string),
            size: state.next_page_size(self.page_cap),
        };
        tracing::debug!(
            "Requesting page #{} (size {}, cursor {:?})",
            state.requests() + 1,
            request.size,
            request.cursor
        );
        request
    }
}

/// Await one fetch and fold the result into `state`
async fn settle<T, E, Fut>(
    fetch: Fut,
    state: &mut PaginationState,
) -> Result<Page<T>, PaginationError<E>>
where
    Fut: Future<Output = Result<Page<T>, E>>,
{
    state.record_request();

    match fetch.await {
        Ok(mut page) => {
            if let Some(remaining) = state.remaining() {
                page.truncate(remaining);
            }
            state.record_page(&page);
            tracing::debug!(
                "Received {} items ({} total), more: {}",
                page.count(),
                state.retrieved(),
                !page.is_last()
            );
            Ok(page)
        }
        Err(source) => {
            tracing::warn!(
                "Page request #{} failed, last cursor {:?}",
                state.requests(),
                state.cursor()
            );
            Err(PaginationError {
                source,
                state: state.clone(),
            })
        }
    }
}

fn finish(termination: Termination, state: PaginationState) -> PaginationReport {
    tracing::debug!(
        "Pagination finished: {:?} after {} requests, {} items",
        termination,
        state.requests(),
        state.retrieved()
    );
    PaginationReport { termination, state }
}
