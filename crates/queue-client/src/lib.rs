//! # Queue Client
//!
//! Client contract for a cloud message-queue service, with an AWS SQS
//! provider and an in-memory provider for tests.
//!
//! This library provides:
//! - Queue lifecycle operations (create, delete, list by prefix)
//! - Single and batch send with typed message attributes
//! - Receive with opt-in attribute retrieval
//! - Single and batch delete by receipt handle
//! - Request validation ahead of the network call
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Identifiers, messages, attributes and batch entries
//! - [`provider`] - Provider types and configuration
//! - [`client`] - Client traits and implementations
//! - [`providers`] - AWS SQS and in-memory backends

pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;

// Re-export commonly used types at crate root for convenience
pub use client::{QueueClient, QueueClientFactory, QueueProvider, StandardQueueClient};
pub use error::{ConfigurationError, QueueError, ValidationError};
pub use message::{
    AttributeFilter, BatchEntryFailure, BatchEntryId, BatchOutcome, DeleteMessageBatchEntry,
    Message, MessageAttributeValue, MessageId, QueueName, QueueUrl, ReceiptHandle,
    ReceiveRequest, ReceivedMessage, SendMessageBatchEntry, SentBatchEntry, Timestamp,
};
pub use provider::{AwsSqsConfig, InMemoryConfig, ProviderConfig, ProviderType, QueueConfig};
pub use providers::{AwsSqsProvider, InMemoryProvider};
