//! Backend implementations.
//!
//! This module contains the concrete implementations of [`QueueBackend`]:
//! the live SQS adapter and the in-memory demo backend.
//!
//! [`QueueBackend`]: crate::backend::QueueBackend

pub mod aws;
pub mod demo;

pub use aws::{AwsCredentials, AwsSqsConfig, AwsSqsProvider};
pub use demo::DemoBackend;
