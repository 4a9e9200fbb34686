//! Client traits and implementations for queue operations.

use crate::error::{QueueError, ValidationError};
use crate::message::{
    BatchEntryId, BatchOutcome, DeleteMessageBatchEntry, Message, MessageId, QueueName, QueueUrl,
    ReceiptHandle, ReceiveRequest, ReceivedMessage, SendMessageBatchEntry, SentBatchEntry,
    MAX_RECEIVE_MESSAGES,
};
use crate::provider::{InMemoryConfig, ProviderConfig, ProviderType, QueueConfig};
use crate::providers::{AwsSqsProvider, InMemoryProvider};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashSet;
use tracing::{debug, info_span, Instrument};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Longest long-poll wait the service accepts
const MAX_WAIT_TIME_SECONDS: i64 = 20;

/// Longest visibility timeout the service accepts (12 hours)
const MAX_VISIBILITY_TIMEOUT_SECONDS: i64 = 43_200;

/// Main interface for queue operations across all providers
///
/// Every call is one request/response round trip against the service.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Create a queue, returning its URL
    async fn create_queue(&self, name: &QueueName) -> Result<QueueUrl, QueueError>;

    /// Delete a queue and every message in it
    async fn delete_queue(&self, queue: &QueueUrl) -> Result<(), QueueError>;

    /// List queues whose name starts with the prefix
    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueUrl>, QueueError>;

    /// Send single message to queue
    async fn send_message(&self, queue: &QueueUrl, message: &Message)
        -> Result<MessageId, QueueError>;

    /// Send several messages in one request
    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendMessageBatchEntry],
    ) -> Result<BatchOutcome<SentBatchEntry>, QueueError>;

    /// Receive up to `request.max_messages` messages
    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Delete one delivery by its receipt handle
    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError>;

    /// Delete several deliveries in one request
    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteMessageBatchEntry],
    ) -> Result<BatchOutcome<BatchEntryId>, QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// Interface implemented by specific queue providers (AWS, in-memory)
///
/// Providers may assume requests were validated by [`StandardQueueClient`].
#[async_trait]
pub trait QueueProvider: Send + Sync {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueUrl, QueueError>;

    async fn delete_queue(&self, queue: &QueueUrl) -> Result<(), QueueError>;

    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueUrl>, QueueError>;

    async fn send_message(&self, queue: &QueueUrl, message: &Message)
        -> Result<MessageId, QueueError>;

    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendMessageBatchEntry],
    ) -> Result<BatchOutcome<SentBatchEntry>, QueueError>;

    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError>;

    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteMessageBatchEntry],
    ) -> Result<BatchOutcome<BatchEntryId>, QueueError>;

    fn provider_type(&self) -> ProviderType;
}

/// Factory for creating queue clients with appropriate providers
pub struct QueueClientFactory;

impl QueueClientFactory {
    /// Create queue client from configuration
    pub async fn create_client(config: QueueConfig) -> Result<Box<dyn QueueClient>, QueueError> {
        let provider: Box<dyn QueueProvider> = match config.provider {
            ProviderConfig::InMemory(in_memory_config) => {
                Box::new(InMemoryProvider::new(in_memory_config))
            }
            ProviderConfig::AwsSqs(aws_config) => Box::new(AwsSqsProvider::new(aws_config).await?),
        };

        Ok(Box::new(StandardQueueClient::new(provider)))
    }

    /// Create test client with in-memory provider
    pub fn create_test_client() -> Box<dyn QueueClient> {
        let provider = InMemoryProvider::new(InMemoryConfig::default());
        Box::new(StandardQueueClient::new(Box::new(provider)))
    }
}

/// Standard queue client implementation
///
/// Rejects requests the service would refuse before they leave the process,
/// then forwards to the provider inside a span naming the operation.
pub struct StandardQueueClient {
    provider: Box<dyn QueueProvider>,
}

impl StandardQueueClient {
    /// Create new standard queue client with provider
    pub fn new(provider: Box<dyn QueueProvider>) -> Self {
        Self { provider }
    }

    fn validate_message(&self, message: &Message) -> Result<(), QueueError> {
        message.validate()?;

        let size = message.size_in_bytes();
        let max_size = self.provider.provider_type().max_message_size();
        if size > max_size {
            return Err(QueueError::MessageTooLarge { size, max_size });
        }

        Ok(())
    }

    fn validate_batch<'a, I>(&self, ids: I, len: usize) -> Result<(), QueueError>
    where
        I: IntoIterator<Item = &'a BatchEntryId>,
    {
        let max_size = self.provider.provider_type().max_batch_size();
        if len == 0 || len > max_size {
            return Err(ValidationError::OutOfRange {
                field: "batch_entries".to_string(),
                message: format!("batch must carry 1-{} entries, got {}", max_size, len),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                return Err(ValidationError::DuplicateBatchEntryId {
                    id: id.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    fn validate_receive(request: &ReceiveRequest) -> Result<(), QueueError> {
        if request.max_messages == 0 || request.max_messages > MAX_RECEIVE_MESSAGES {
            return Err(ValidationError::OutOfRange {
                field: "max_messages".to_string(),
                message: format!("must be 1-{}", MAX_RECEIVE_MESSAGES),
            }
            .into());
        }

        if request.wait_time < Duration::zero()
            || request.wait_time > Duration::seconds(MAX_WAIT_TIME_SECONDS)
        {
            return Err(ValidationError::OutOfRange {
                field: "wait_time".to_string(),
                message: format!("must be 0-{} seconds", MAX_WAIT_TIME_SECONDS),
            }
            .into());
        }

        if let Some(timeout) = request.visibility_timeout {
            if timeout < Duration::zero()
                || timeout > Duration::seconds(MAX_VISIBILITY_TIMEOUT_SECONDS)
            {
                return Err(ValidationError::OutOfRange {
                    field: "visibility_timeout".to_string(),
                    message: format!("must be 0-{} seconds", MAX_VISIBILITY_TIMEOUT_SECONDS),
                }
                .into());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl QueueClient for StandardQueueClient {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueUrl, QueueError> {
        let span = info_span!("create_queue", queue_name = %name);
        let url = self.provider.create_queue(name).instrument(span).await?;
        debug!(queue_name = %name, queue_url = %url, "Queue created");
        Ok(url)
    }

    async fn delete_queue(&self, queue: &QueueUrl) -> Result<(), QueueError> {
        let span = info_span!("delete_queue", queue_url = %queue);
        self.provider.delete_queue(queue).instrument(span).await
    }

    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueUrl>, QueueError> {
        let span = info_span!("list_queues", prefix = %prefix);
        self.provider.list_queues(prefix).instrument(span).await
    }

    async fn send_message(
        &self,
        queue: &QueueUrl,
        message: &Message,
    ) -> Result<MessageId, QueueError> {
        self.validate_message(message)?;

        let span = info_span!("send_message", queue_url = %queue);
        self.provider
            .send_message(queue, message)
            .instrument(span)
            .await
    }

    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendMessageBatchEntry],
    ) -> Result<BatchOutcome<SentBatchEntry>, QueueError> {
        self.validate_batch(entries.iter().map(|entry| &entry.id), entries.len())?;
        for entry in entries {
            self.validate_message(&entry.message)?;
        }

        let span = info_span!("send_message_batch", queue_url = %queue, entries = entries.len());
        self.provider
            .send_message_batch(queue, entries)
            .instrument(span)
            .await
    }

    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        Self::validate_receive(request)?;

        let span = info_span!(
            "receive_messages",
            queue_url = %queue,
            max_messages = request.max_messages
        );
        let messages = self
            .provider
            .receive_messages(queue, request)
            .instrument(span)
            .await?;
        debug!(queue_url = %queue, received = messages.len(), "Receive completed");
        Ok(messages)
    }

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        let span = info_span!("delete_message", queue_url = %queue);
        self.provider
            .delete_message(queue, receipt)
            .instrument(span)
            .await
    }

    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteMessageBatchEntry],
    ) -> Result<BatchOutcome<BatchEntryId>, QueueError> {
        self.validate_batch(entries.iter().map(|entry| &entry.id), entries.len())?;

        let span = info_span!("delete_message_batch", queue_url = %queue, entries = entries.len());
        self.provider
            .delete_message_batch(queue, entries)
            .instrument(span)
            .await
    }

    fn provider_type(&self) -> ProviderType {
        self.provider.provider_type()
    }
}
