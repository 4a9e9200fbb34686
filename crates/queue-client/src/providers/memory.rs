//! In-memory queue provider implementation for testing and development.
//!
//! This module provides an in-memory stand-in for the queue service that
//! honours the parts of the contract the fixture and scenarios depend on:
//! - Queues addressed by URL, created idempotently by name
//! - Visibility timeouts with a fresh receipt handle per delivery
//! - Attributes returned only when the receive request opts into them
//! - Per-entry outcomes for batch operations
//! - Eventually consistent listings: a deleted queue can keep appearing
//!   for a configurable number of listings
//!
//! Long polling is not simulated; receives return immediately.

use crate::client::QueueProvider;
use crate::error::{QueueError, ValidationError};
use crate::message::{
    AttributeFilter, BatchEntryFailure, BatchEntryId, BatchOutcome, DeleteMessageBatchEntry,
    Message, MessageAttributeValue, MessageId, QueueName, QueueUrl, ReceiptHandle, ReceiveRequest,
    ReceivedMessage, SendMessageBatchEntry, SentBatchEntry, Timestamp,
};
use crate::provider::{InMemoryConfig, ProviderType};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all queues
struct QueueStorage {
    queues: HashMap<QueueName, InMemoryQueue>,
    /// Deleted queues that listings still report
    tombstones: Vec<Tombstone>,
    config: InMemoryConfig,
}

impl QueueStorage {
    fn new(config: InMemoryConfig) -> Self {
        Self {
            queues: HashMap::new(),
            tombstones: Vec::new(),
            config,
        }
    }

    fn queue_url_for(&self, name: &QueueName) -> Result<QueueUrl, QueueError> {
        let url = format!("http://queue.memory/{}/{}", self.config.account_id, name);
        Ok(QueueUrl::new(url)?)
    }

    /// Resolve a URL to its live queue
    fn queue_mut(&mut self, url: &QueueUrl) -> Result<&mut InMemoryQueue, QueueError> {
        let not_found = || QueueError::QueueDoesNotExist {
            queue: url.to_string(),
        };

        let name = QueueName::new(url.queue_name().to_string()).map_err(|_| not_found())?;
        match self.queues.get_mut(&name) {
            Some(queue) if &queue.url == url => Ok(queue),
            _ => Err(not_found()),
        }
    }
}

/// Internal queue state for a single queue
struct InMemoryQueue {
    url: QueueUrl,
    /// Visible messages (FIFO order)
    messages: VecDeque<StoredMessage>,
    /// In-flight messages keyed by receipt handle
    in_flight: HashMap<String, InFlightMessage>,
}

impl InMemoryQueue {
    fn new(url: QueueUrl) -> Self {
        Self {
            url,
            messages: VecDeque::new(),
            in_flight: HashMap::new(),
        }
    }

    /// Return deliveries whose visibility timeout has lapsed to the visible set
    fn release_expired_leases(&mut self) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, in_flight)| in_flight.is_expired())
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(in_flight) = self.in_flight.remove(&receipt) {
                self.messages.push_back(in_flight.message);
            }
        }

        self.messages
            .make_contiguous()
            .sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));
    }

    fn enqueue(&mut self, message: &Message) -> MessageId {
        let message_id = MessageId::new();
        self.messages
            .push_back(StoredMessage::from_message(message, message_id.clone()));
        message_id
    }

    fn delete(&mut self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        self.in_flight
            .remove(receipt.as_str())
            .map(|_| ())
            .ok_or_else(|| QueueError::ReceiptHandleInvalid {
                receipt: receipt.to_string(),
            })
    }
}

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    message_id: MessageId,
    body: String,
    attributes: BTreeMap<String, MessageAttributeValue>,
    enqueued_at: Timestamp,
}

impl StoredMessage {
    fn from_message(message: &Message, message_id: MessageId) -> Self {
        Self {
            message_id,
            body: message.body.clone(),
            attributes: message.attributes.clone(),
            enqueued_at: Timestamp::now(),
        }
    }

    /// Build the delivered view, keeping only the attributes the filter selects
    fn deliver(&self, receipt: &str, filter: &AttributeFilter) -> ReceivedMessage {
        let attributes = self
            .attributes
            .iter()
            .filter(|(name, _)| filter.matches(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        ReceivedMessage {
            message_id: self.message_id.clone(),
            receipt_handle: ReceiptHandle::new(receipt.to_string()),
            body: self.body.clone(),
            attributes,
        }
    }
}

/// A message currently leased to a receiver
struct InFlightMessage {
    message: StoredMessage,
    lock_expires_at: Timestamp,
}

impl InFlightMessage {
    fn is_expired(&self) -> bool {
        Timestamp::now() >= self.lock_expires_at
    }
}

/// A deleted queue that listings keep reporting for a while
struct Tombstone {
    url: QueueUrl,
    remaining_listings: u32,
}

// ============================================================================
// InMemoryProvider
// ============================================================================

/// In-memory queue provider implementation
#[derive(Clone)]
pub struct InMemoryProvider {
    storage: Arc<RwLock<QueueStorage>>,
}

impl InMemoryProvider {
    /// Create new in-memory provider with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(QueueStorage::new(config))),
        }
    }

    /// Number of messages in a queue, visible and in flight
    pub fn approximate_message_count(&self, queue: &QueueUrl) -> Result<usize, QueueError> {
        let mut storage = self.write()?;
        let queue = storage.queue_mut(queue)?;
        Ok(queue.messages.len() + queue.in_flight.len())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, QueueStorage>, QueueError> {
        self.storage.write().map_err(|_| QueueError::ProviderError {
            provider: ProviderType::InMemory.to_string(),
            code: "StoragePoisoned".to_string(),
            message: "in-memory queue storage lock was poisoned".to_string(),
        })
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl QueueProvider for InMemoryProvider {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueUrl, QueueError> {
        let mut storage = self.write()?;
        if let Some(existing) = storage.queues.get(name) {
            return Ok(existing.url.clone());
        }

        let url = storage.queue_url_for(name)?;
        storage.tombstones.retain(|tombstone| tombstone.url != url);
        storage
            .queues
            .insert(name.clone(), InMemoryQueue::new(url.clone()));
        Ok(url)
    }

    async fn delete_queue(&self, queue: &QueueUrl) -> Result<(), QueueError> {
        let mut storage = self.write()?;
        // Resolve first so unknown URLs fail the same way as every other call
        storage.queue_mut(queue)?;

        let name = QueueName::new(queue.queue_name().to_string())?;
        storage.queues.remove(&name);

        let lag = storage.config.listing_lag;
        if lag > 0 {
            storage.tombstones.push(Tombstone {
                url: queue.clone(),
                remaining_listings: lag,
            });
        }
        Ok(())
    }

    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueUrl>, QueueError> {
        let mut storage = self.write()?;

        let mut urls: Vec<QueueUrl> = storage
            .queues
            .iter()
            .filter(|(name, _)| name.as_str().starts_with(prefix))
            .map(|(_, queue)| queue.url.clone())
            .collect();

        for tombstone in storage.tombstones.iter_mut() {
            if tombstone.url.queue_name().starts_with(prefix) && tombstone.remaining_listings > 0
            {
                tombstone.remaining_listings -= 1;
                urls.push(tombstone.url.clone());
            }
        }
        storage
            .tombstones
            .retain(|tombstone| tombstone.remaining_listings > 0);

        urls.sort();
        urls.dedup();
        Ok(urls)
    }

    async fn send_message(
        &self,
        queue: &QueueUrl,
        message: &Message,
    ) -> Result<MessageId, QueueError> {
        let mut storage = self.write()?;
        Ok(storage.queue_mut(queue)?.enqueue(message))
    }

    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendMessageBatchEntry],
    ) -> Result<BatchOutcome<SentBatchEntry>, QueueError> {
        let mut storage = self.write()?;
        let queue = storage.queue_mut(queue)?;

        let successful = entries
            .iter()
            .map(|entry| SentBatchEntry {
                id: entry.id.clone(),
                message_id: queue.enqueue(&entry.message),
            })
            .collect();

        Ok(BatchOutcome {
            successful,
            failed: Vec::new(),
        })
    }

    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let mut storage = self.write()?;
        let visibility = request
            .visibility_timeout
            .unwrap_or(storage.config.visibility_timeout);
        let lock_expires_at = Timestamp::now()
            .as_datetime()
            .checked_add_signed(visibility)
            .map(Timestamp::from_datetime)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "visibility_timeout".to_string(),
                message: format!("{} seconds exceeds the representable time range", visibility.num_seconds()),
            })?;
        let queue = storage.queue_mut(queue)?;
        queue.release_expired_leases();

        let mut received = Vec::new();
        while received.len() < request.max_messages as usize {
            let Some(message) = queue.messages.pop_front() else {
                break;
            };

            let receipt = uuid::Uuid::new_v4().to_string();
            received.push(message.deliver(&receipt, &request.attributes));
            queue.in_flight.insert(
                receipt,
                InFlightMessage {
                    message,
                    lock_expires_at: lock_expires_at.clone(),
                },
            );
        }

        Ok(received)
    }

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        let mut storage = self.write()?;
        storage.queue_mut(queue)?.delete(receipt)
    }

    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteMessageBatchEntry],
    ) -> Result<BatchOutcome<BatchEntryId>, QueueError> {
        let mut storage = self.write()?;
        let queue = storage.queue_mut(queue)?;

        let mut outcome = BatchOutcome::default();
        for entry in entries {
            match queue.delete(&entry.receipt_handle) {
                Ok(()) => outcome.successful.push(entry.id.clone()),
                Err(e) => outcome.failed.push(BatchEntryFailure {
                    id: entry.id.clone(),
                    code: "ReceiptHandleIsInvalid".to_string(),
                    message: Some(e.to_string()),
                    sender_fault: true,
                }),
            }
        }

        Ok(outcome)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
