//! Cursor Pagination
//!
//! Generic machinery for walking cursor-paged API resources under an item
//! budget, with resumption after a failed request.
//!
//! # Architecture
//!
//! 1. **Page** (`page`): one fetch result and the request that produced it
//! 2. **State** (`state`): cursor, item count and budget, threaded through
//!    every callback
//! 3. **Engine** (`engine`): the sequential fetch loop and its terminal states

pub mod engine;
pub mod page;
pub mod state;

pub use engine::{PaginationEngine, PaginationError, PaginationReport};
pub use page::{Page, PageRequest};
pub use state::{PaginationState, Termination, PROVIDER_PAGE_CAP};
