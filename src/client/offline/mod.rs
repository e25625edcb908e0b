//! # Offline Support
//!
//! Durable queue of undelivered messages and the retry policy shared by
//! every retrying component of the client.

pub mod queue;
pub mod retry;

pub use queue::{OfflineMessageQueue, ProcessOutcome, ProcessSummary};
pub use retry::{BackoffStrategy, RetryPolicy};
