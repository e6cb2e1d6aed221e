//! # Queue-Scope Core
//!
//! Domain services for the Queue-Scope debugging console.
//!
//! Every service depends only on the [`QueueBackend`] trait; the concrete
//! backend (live SQS or the demo backend) is chosen once at startup and
//! shared behind an `Arc`.
//!
//! ## Module Organization
//!
//! - [`model`] - Canonical queue, message and statistics shapes
//! - [`directory`] - Queue listing with tag filtering and redrive lookup
//! - [`messages`] - Browse, send, delete, retry and statistics
//! - [`live_tail`] - Per-session live-tail subscriptions
//!
//! [`QueueBackend`]: queue_scope_runtime::QueueBackend

pub mod directory;
pub mod live_tail;
pub mod messages;
pub mod model;

#[cfg(test)]
mod test_support;

pub use directory::{DirectoryService, TagFilter};
pub use live_tail::{LiveTailConfig, LiveTailManager, SessionHandle, TailEvent};
pub use messages::{MessageService, RetryOutcome, MAX_MESSAGES_PER_RECEIVE};
pub use model::{DlqStatistics, Message, Queue, QueueStatistics, RedrivePolicy};
