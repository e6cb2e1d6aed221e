//! # Queue-Scope Runtime
//!
//! Backend gateway for the Queue-Scope debugging console.
//!
//! This library provides:
//! - The [`QueueBackend`] capability trait every upstream service depends on
//! - A live AWS SQS adapter speaking the signed HTTP query API
//! - An in-memory demo backend seeded with realistic fixture data
//!
//! ## Module Organization
//!
//! - [`error`] - Error taxonomy for backend operations
//! - [`message`] - Raw message shapes as returned by a backend
//! - [`backend`] - The capability trait and backend descriptors
//! - [`providers`] - Concrete backend implementations

pub mod backend;
pub mod error;
pub mod message;
pub mod providers;

pub use backend::{BackendContext, BackendMode, QueueBackend};
pub use error::BackendError;
pub use message::{attribute_names, ReceivedMessage};
pub use providers::{AwsCredentials, AwsSqsConfig, AwsSqsProvider, DemoBackend};
