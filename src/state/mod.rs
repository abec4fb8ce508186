//! State module for tracking crawl progress
//!
//! This module holds everything a crawl mutates while it runs.
//!
//! # Components
//!
//! - `LinkState`: lifecycle of a single URL (queued, resolving, resolved)
//! - `VisitFrontier`: dedup ledger plus the GET visit budget
//! - `CrawlSession`: the single lock-guarded aggregate owning page links,
//!   statuses and the frontier

mod frontier;
mod link_state;
mod session;

// Re-export main types
pub use frontier::{Admission, RequestMethod, VisitFrontier};
pub use link_state::LinkState;
pub use session::{CrawlSession, PageLinkSet, SessionSnapshot, StatusLedger, UNRESOLVED};
