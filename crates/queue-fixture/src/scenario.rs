//! Behavioural scenarios run against a queue client.
//!
//! Each scenario drives one queue through its whole life:
//! absent → created → has-unconsumed-message → empty → deleted.
//! Any client failure or unmet expectation stops the scenario and names the
//! step it happened in.

use chrono::Duration;
use queue_client::{
    BatchEntryId, DeleteMessageBatchEntry, Message, MessageAttributeValue, MessageId,
    QueueClient, QueueError, QueueName, QueueUrl, ReceiveRequest, ReceivedMessage,
    SendMessageBatchEntry,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod tests;

/// Queue base name of the single-message scenario
pub const SIMPLE_QUEUE: &str = "SimpleQueue";

/// Queue base name of the batch scenario
pub const BATCH_QUEUE: &str = "BatchQueue";

/// Queue base name of the attribute opt-in scenario
pub const OPT_IN_QUEUE: &str = "OptInQueue";

pub const CUSTOM_ATTRIBUTE_NAME: &str = "CustomMessageAttribute";
pub const CUSTOM_ATTRIBUTE_VALUE: &str = "CustomMessageAttributeValue";

/// Entry id of the single entry in batch requests
pub const BATCH_ENTRY_ID: &str = "1";

/// Message content and receive settings shared by the scenarios
#[derive(Debug, Clone)]
pub struct ScenarioPayload {
    pub body: String,
    pub attribute_name: String,
    pub attribute_value: MessageAttributeValue,
    /// Long-poll wait for receives that expect a message
    pub receive_wait: Duration,
}

impl ScenarioPayload {
    fn message(&self) -> Message {
        Message::new(self.body.clone())
            .with_attribute(self.attribute_name.clone(), self.attribute_value.clone())
    }
}

impl Default for ScenarioPayload {
    fn default() -> Self {
        Self {
            body: "x".repeat(10),
            attribute_name: CUSTOM_ATTRIBUTE_NAME.to_string(),
            attribute_value: MessageAttributeValue::string(CUSTOM_ATTRIBUTE_VALUE),
            receive_wait: Duration::seconds(2),
        }
    }
}

/// What a scenario observed on its way through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario: &'static str,
    pub queue_url: QueueUrl,
    pub message_id: MessageId,
    /// Attributes on the received message
    pub received_attributes: BTreeMap<String, MessageAttributeValue>,
}

/// Scenario errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Step '{step}' failed: {source}")]
    Client {
        step: &'static str,
        #[source]
        source: QueueError,
    },

    #[error("Step '{step}' did not meet expectation: {detail}")]
    Expectation { step: &'static str, detail: String },
}

impl ScenarioError {
    /// Step the scenario stopped in
    pub fn step(&self) -> &'static str {
        match self {
            Self::Client { step, .. } | Self::Expectation { step, .. } => step,
        }
    }
}

trait StepContext<T> {
    fn at_step(self, step: &'static str) -> Result<T, ScenarioError>;
}

impl<T> StepContext<T> for Result<T, QueueError> {
    fn at_step(self, step: &'static str) -> Result<T, ScenarioError> {
        self.map_err(|source| ScenarioError::Client { step, source })
    }
}

fn ensure(
    step: &'static str,
    condition: bool,
    detail: impl FnOnce() -> String,
) -> Result<(), ScenarioError> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Expectation {
            step,
            detail: detail(),
        })
    }
}

fn entry_id() -> Result<BatchEntryId, ScenarioError> {
    BatchEntryId::new(BATCH_ENTRY_ID.to_string())
        .map_err(QueueError::from)
        .at_step("build batch entry")
}

// ============================================================================
// Shared steps
// ============================================================================

/// Receive the one message sent and check body and attributes
async fn receive_sent_message(
    client: &dyn QueueClient,
    queue_url: &QueueUrl,
    payload: &ScenarioPayload,
) -> Result<ReceivedMessage, ScenarioError> {
    const STEP: &str = "receive message";

    let request = ReceiveRequest::new()
        .with_max_messages(1)
        .with_all_attributes()
        .with_wait_time(payload.receive_wait);
    let mut received = client.receive_messages(queue_url, &request).await.at_step(STEP)?;

    ensure(STEP, received.len() == 1, || {
        format!("expected exactly one message, received {}", received.len())
    })?;
    let message = received.remove(0);

    ensure(STEP, message.body == payload.body, || {
        format!("body mismatch: expected {:?}, got {:?}", payload.body, message.body)
    })?;
    ensure(STEP, message.attributes.len() == 1, || {
        format!(
            "expected exactly one attribute, received {:?}",
            message.attributes.keys().collect::<Vec<_>>()
        )
    })?;
    let value = message.attributes.get(&payload.attribute_name);
    ensure(STEP, value == Some(&payload.attribute_value), || {
        format!(
            "attribute {} mismatch: expected {:?}, got {:?}",
            payload.attribute_name, payload.attribute_value, value
        )
    })?;

    Ok(message)
}

/// Re-receive and check the queue has nothing left to deliver
async fn expect_queue_empty(
    client: &dyn QueueClient,
    queue_url: &QueueUrl,
) -> Result<(), ScenarioError> {
    const STEP: &str = "receive after delete";

    let received = client
        .receive_messages(queue_url, &ReceiveRequest::new())
        .await
        .at_step(STEP)?;
    ensure(STEP, received.is_empty(), || {
        format!("expected no messages, received {}", received.len())
    })
}

async fn delete_queue(
    client: &dyn QueueClient,
    queue_url: &QueueUrl,
) -> Result<(), ScenarioError> {
    client.delete_queue(queue_url).await.at_step("delete queue")?;
    debug!(queue_url = %queue_url, "Scenario queue deleted");
    Ok(())
}

// ============================================================================
// Scenarios
// ============================================================================

/// Send one attributed message, receive it with all attributes, delete it
pub async fn single_message_round_trip(
    client: &dyn QueueClient,
    queue_name: &QueueName,
    payload: &ScenarioPayload,
) -> Result<ScenarioReport, ScenarioError> {
    let span = info_span!("single_message_round_trip", queue_name = %queue_name);
    async move {
        let queue_url = client.create_queue(queue_name).await.at_step("create queue")?;

        let message_id = client
            .send_message(&queue_url, &payload.message())
            .await
            .at_step("send message")?;

        let received = receive_sent_message(client, &queue_url, payload).await?;

        client
            .delete_message(&queue_url, &received.receipt_handle)
            .await
            .at_step("delete message")?;

        expect_queue_empty(client, &queue_url).await?;
        delete_queue(client, &queue_url).await?;

        info!(message_id = %message_id, "Single-message round trip passed");
        Ok(ScenarioReport {
            scenario: "single_message_round_trip",
            queue_url,
            message_id,
            received_attributes: received.attributes,
        })
    }
    .instrument(span)
    .await
}

/// Same round trip through the batch send and batch delete operations
pub async fn batch_round_trip(
    client: &dyn QueueClient,
    queue_name: &QueueName,
    payload: &ScenarioPayload,
) -> Result<ScenarioReport, ScenarioError> {
    let span = info_span!("batch_round_trip", queue_name = %queue_name);
    async move {
        let queue_url = client.create_queue(queue_name).await.at_step("create queue")?;

        const SEND_STEP: &str = "send message batch";
        let entry_id = entry_id()?;
        let sent = client
            .send_message_batch(
                &queue_url,
                &[SendMessageBatchEntry::new(entry_id.clone(), payload.message())],
            )
            .await
            .at_step(SEND_STEP)?;
        ensure(SEND_STEP, sent.failed.is_empty(), || {
            format!("entries failed: {:?}", sent.failed)
        })?;
        ensure(
            SEND_STEP,
            sent.successful.len() == 1 && sent.successful[0].id == entry_id,
            || format!("expected entry {} to succeed, got {:?}", entry_id, sent.successful),
        )?;
        let message_id = sent.successful[0].message_id.clone();

        let received = receive_sent_message(client, &queue_url, payload).await?;

        const DELETE_STEP: &str = "delete message batch";
        let deleted = client
            .delete_message_batch(
                &queue_url,
                &[DeleteMessageBatchEntry::new(
                    entry_id.clone(),
                    received.receipt_handle.clone(),
                )],
            )
            .await
            .at_step(DELETE_STEP)?;
        ensure(DELETE_STEP, deleted.failed.is_empty(), || {
            format!("entries failed: {:?}", deleted.failed)
        })?;
        ensure(DELETE_STEP, deleted.successful == [entry_id.clone()], || {
            format!("expected entry {} to succeed, got {:?}", entry_id, deleted.successful)
        })?;

        expect_queue_empty(client, &queue_url).await?;
        delete_queue(client, &queue_url).await?;

        info!(message_id = %message_id, "Batch round trip passed");
        Ok(ScenarioReport {
            scenario: "batch_round_trip",
            queue_url,
            message_id,
            received_attributes: received.attributes,
        })
    }
    .instrument(span)
    .await
}

/// Receive without asking for attributes and check none come back
pub async fn attribute_opt_in_round_trip(
    client: &dyn QueueClient,
    queue_name: &QueueName,
    payload: &ScenarioPayload,
) -> Result<ScenarioReport, ScenarioError> {
    let span = info_span!("attribute_opt_in_round_trip", queue_name = %queue_name);
    async move {
        let queue_url = client.create_queue(queue_name).await.at_step("create queue")?;

        let message_id = client
            .send_message(&queue_url, &payload.message())
            .await
            .at_step("send message")?;

        const STEP: &str = "receive without attributes";
        let request = ReceiveRequest::new().with_wait_time(payload.receive_wait);
        let mut received = client
            .receive_messages(&queue_url, &request)
            .await
            .at_step(STEP)?;
        ensure(STEP, received.len() == 1, || {
            format!("expected exactly one message, received {}", received.len())
        })?;
        let message = received.remove(0);
        ensure(STEP, message.attributes.is_empty(), || {
            format!(
                "attributes returned without being requested: {:?}",
                message.attributes.keys().collect::<Vec<_>>()
            )
        })?;

        client
            .delete_message(&queue_url, &message.receipt_handle)
            .await
            .at_step("delete message")?;
        delete_queue(client, &queue_url).await?;

        info!(message_id = %message_id, "Attribute opt-in round trip passed");
        Ok(ScenarioReport {
            scenario: "attribute_opt_in_round_trip",
            queue_url,
            message_id,
            received_attributes: message.attributes,
        })
    }
    .instrument(span)
    .await
}
