//! Common test utilities for queue-fixture integration tests
//!
//! This module provides:
//! - Configuration and logging setup shared by every test binary
//! - In-memory client builders
//! - A recording client that logs every call and can inject delete failures
//! - A scenario runner that always finishes its fixture

use queue_client::{
    AttributeFilter, BatchEntryId, BatchOutcome, DeleteMessageBatchEntry, InMemoryConfig,
    InMemoryProvider, Message, MessageId, ProviderType, QueueClient, QueueError, QueueName,
    QueueUrl, ReceiptHandle, ReceiveRequest, ReceivedMessage, SendMessageBatchEntry,
    SentBatchEntry, StandardQueueClient,
};
use queue_fixture::{
    attribute_opt_in_round_trip, batch_round_trip, init_test_logging, single_message_round_trip,
    FixtureConfig, FixtureError, QueueFixture, ReconcileReport, ScenarioError, ScenarioPayload,
    ScenarioReport,
};
use std::sync::{Arc, Mutex};

// ============================================================================
// Configuration
// ============================================================================

/// Load the fixture configuration from the environment and set up logging
///
/// Without any `QUEUE_FIXTURE__` variables this selects the in-memory provider.
#[allow(dead_code)]
pub fn fixture_config() -> FixtureConfig {
    let config = FixtureConfig::load().expect("fixture configuration should load");
    init_test_logging(&config.logging);
    config
}

/// Client over a fresh in-memory provider
#[allow(dead_code)]
pub fn in_memory_client(listing_lag: u32) -> Arc<dyn QueueClient> {
    let provider = InMemoryProvider::new(InMemoryConfig {
        listing_lag,
        ..InMemoryConfig::default()
    });
    Arc::new(StandardQueueClient::new(Box::new(provider)))
}

// ============================================================================
// Scenario Runner
// ============================================================================

/// One of the behavioural scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Scenario {
    SingleMessage,
    Batch,
    AttributeOptIn,
}

#[allow(dead_code)]
impl Scenario {
    pub async fn run(
        self,
        client: &dyn QueueClient,
        queue_name: &QueueName,
        payload: &ScenarioPayload,
    ) -> Result<ScenarioReport, ScenarioError> {
        match self {
            Self::SingleMessage => single_message_round_trip(client, queue_name, payload).await,
            Self::Batch => batch_round_trip(client, queue_name, payload).await,
            Self::AttributeOptIn => attribute_opt_in_round_trip(client, queue_name, payload).await,
        }
    }
}

/// Outcome of a scenario and of the fixture finish that followed it
#[allow(dead_code)]
pub struct FixtureRun {
    pub scenario: Result<ScenarioReport, ScenarioError>,
    pub finish: Result<ReconcileReport, FixtureError>,
}

/// Run a scenario on a queue in the fixture's namespace, then finish the
/// fixture whatever the scenario's outcome
#[allow(dead_code)]
pub async fn run_in_fixture(
    fixture: QueueFixture,
    scenario: Scenario,
    base_name: &str,
    payload: &ScenarioPayload,
) -> FixtureRun {
    let outcome = match fixture.queue_name(base_name) {
        Ok(queue_name) => {
            scenario
                .run(fixture.client().as_ref(), &queue_name, payload)
                .await
        }
        Err(error) => Err(ScenarioError::Client {
            step: "build queue name",
            source: error.into(),
        }),
    };

    FixtureRun {
        scenario: outcome,
        finish: fixture.finish().await,
    }
}

// ============================================================================
// Recording Client
// ============================================================================

/// One call observed by [`RecordingClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Call {
    CreateQueue(String),
    DeleteQueue(String),
    ListQueues(String),
    SendMessage,
    SendMessageBatch(Vec<String>),
    Receive {
        max_messages: u32,
        attributes: AttributeFilter,
    },
    DeleteMessage,
    DeleteMessageBatch(Vec<String>),
}

type DeleteQueueHook = Box<dyn Fn(&QueueUrl) -> Option<QueueError> + Send + Sync>;

/// Client that records every call before forwarding it to an inner client
#[derive(Clone)]
#[allow(dead_code)]
pub struct RecordingClient {
    inner: Arc<dyn QueueClient>,
    calls: Arc<Mutex<Vec<Call>>>,
    delete_queue_hook: Arc<Mutex<Option<DeleteQueueHook>>>,
}

#[allow(dead_code)]
impl RecordingClient {
    pub fn new(inner: Arc<dyn QueueClient>) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            delete_queue_hook: Arc::new(Mutex::new(None)),
        }
    }

    /// Fail queue deletes for which the hook returns an error
    pub fn fail_queue_deletes<F>(&self, hook: F)
    where
        F: Fn(&QueueUrl) -> Option<QueueError> + Send + Sync + 'static,
    {
        *self.delete_queue_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn get_calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than listings, which depend on reconcile timing
    pub fn operations(&self) -> Vec<Call> {
        self.get_calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::ListQueues(_)))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn entry_ids<'a>(ids: impl Iterator<Item = &'a BatchEntryId>) -> Vec<String> {
    ids.map(|id| id.to_string()).collect()
}

#[async_trait::async_trait]
impl QueueClient for RecordingClient {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueUrl, QueueError> {
        self.record(Call::CreateQueue(name.to_string()));
        self.inner.create_queue(name).await
    }

    async fn delete_queue(&self, queue: &QueueUrl) -> Result<(), QueueError> {
        self.record(Call::DeleteQueue(queue.queue_name().to_string()));
        let injected = self
            .delete_queue_hook
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|hook| hook(queue));
        if let Some(error) = injected {
            return Err(error);
        }
        self.inner.delete_queue(queue).await
    }

    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueUrl>, QueueError> {
        self.record(Call::ListQueues(prefix.to_string()));
        self.inner.list_queues(prefix).await
    }

    async fn send_message(
        &self,
        queue: &QueueUrl,
        message: &Message,
    ) -> Result<MessageId, QueueError> {
        self.record(Call::SendMessage);
        self.inner.send_message(queue, message).await
    }

    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendMessageBatchEntry],
    ) -> Result<BatchOutcome<SentBatchEntry>, QueueError> {
        self.record(Call::SendMessageBatch(entry_ids(
            entries.iter().map(|entry| &entry.id),
        )));
        self.inner.send_message_batch(queue, entries).await
    }

    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        self.record(Call::Receive {
            max_messages: request.max_messages,
            attributes: request.attributes.clone(),
        });
        self.inner.receive_messages(queue, request).await
    }

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        self.record(Call::DeleteMessage);
        self.inner.delete_message(queue, receipt).await
    }

    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteMessageBatchEntry],
    ) -> Result<BatchOutcome<BatchEntryId>, QueueError> {
        self.record(Call::DeleteMessageBatch(entry_ids(
            entries.iter().map(|entry| &entry.id),
        )));
        self.inner.delete_message_batch(queue, entries).await
    }

    fn provider_type(&self) -> ProviderType {
        self.inner.provider_type()
    }
}
