//! Per-test queue fixture.

use crate::config::{ConfigError, FixtureConfig, ReconcileConfig};
use crate::namespace::Namespace;
use crate::reconciler::{FixtureReconciler, ReconcileError, ReconcileReport};
use queue_client::{QueueClient, QueueClientFactory, QueueError, QueueName, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, info_span, Instrument};

#[cfg(test)]
#[path = "fixture_tests.rs"]
mod tests;

/// Point in the fixture lifecycle at which reconciliation ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixturePhase {
    Start,
    Finish,
}

impl std::fmt::Display for FixturePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Finish => f.write_str("finish"),
        }
    }
}

/// Fixture errors
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Namespace reconciliation failed at fixture {phase}: {source}")]
    Reconcile {
        phase: FixturePhase,
        #[source]
        source: ReconcileError,
    },

    #[error("Fixture configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue client construction failed: {0}")]
    Client(#[from] QueueError),
}

/// Owns a queue client for one test case and keeps its namespace clean
///
/// [`QueueFixture::start`] empties the namespace before the test body runs;
/// [`QueueFixture::finish`] empties it again afterwards.
pub struct QueueFixture {
    client: Arc<dyn QueueClient>,
    namespace: Namespace,
    reconciler: FixtureReconciler,
    start_report: ReconcileReport,
}

impl QueueFixture {
    /// Reconcile the namespace and hand back a fixture ready for a test body
    pub async fn start(
        client: Arc<dyn QueueClient>,
        namespace: Namespace,
        reconcile_config: ReconcileConfig,
    ) -> Result<Self, FixtureError> {
        let reconciler = FixtureReconciler::new(client.clone(), reconcile_config);
        let prefix = namespace.listing_prefix();

        let start_report = reconciler
            .reconcile(&prefix)
            .instrument(info_span!("fixture_start", namespace = %namespace))
            .await
            .map_err(|source| FixtureError::Reconcile {
                phase: FixturePhase::Start,
                source,
            })?;

        info!(
            namespace = %namespace,
            run_id = namespace.run_id().unwrap_or("none"),
            provider = %client.provider_type(),
            removed = start_report.deleted.len(),
            "Queue fixture started"
        );

        Ok(Self {
            client,
            namespace,
            reconciler,
            start_report,
        })
    }

    /// Build the client and namespace a configuration describes, then start
    pub async fn from_config(config: &FixtureConfig) -> Result<Self, FixtureError> {
        config.validate()?;
        let namespace = config.namespace.build().map_err(ConfigError::from)?;
        let client: Arc<dyn QueueClient> =
            Arc::from(QueueClientFactory::create_client(config.queue_config()?).await?);

        Self::start(client, namespace, config.reconcile.clone()).await
    }

    pub fn client(&self) -> &Arc<dyn QueueClient> {
        &self.client
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Namespaced name for a queue base name
    pub fn queue_name(&self, base_name: &str) -> Result<QueueName, ValidationError> {
        self.namespace.queue_name(base_name)
    }

    /// Report of the reconcile that ran at start
    pub fn start_report(&self) -> &ReconcileReport {
        &self.start_report
    }

    /// Empty the namespace again and release the client
    pub async fn finish(self) -> Result<ReconcileReport, FixtureError> {
        let report = self
            .reconciler
            .reconcile(&self.namespace.listing_prefix())
            .instrument(info_span!("fixture_finish", namespace = %self.namespace))
            .await
            .map_err(|source| FixtureError::Reconcile {
                phase: FixturePhase::Finish,
                source,
            })?;

        info!(
            namespace = %self.namespace,
            removed = report.deleted.len(),
            "Queue fixture finished"
        );
        Ok(report)
    }
}
