//! Fixture reconciler: empties a queue namespace and waits until listings agree.
//!
//! One reconcile run works in polls. Each poll lists the queues under the
//! prefix; an empty listing ends the run. Otherwise every listed queue that
//! has not yet been deleted gets a delete request. The first poll is followed
//! immediately by a second listing; later polls wait the poll interval first,
//! since deleted queues can keep appearing in listings for a while.
//!
//! Runs are bounded by a poll count and an overall timeout. Delete failures
//! that mean "already gone" are not errors.

use crate::config::ReconcileConfig;
use queue_client::{QueueClient, QueueError, QueueUrl};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;

/// A queue whose delete request failed for a reason other than "not found"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub queue: QueueUrl,
    pub error: String,
}

/// Outcome of one successful reconcile run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Prefix that was reconciled
    pub prefix: String,
    /// Queues this run deleted
    pub deleted: Vec<QueueUrl>,
    /// Listed queues that turned out to be gone already
    pub already_absent: Vec<QueueUrl>,
    /// Delete failures no later delete attempt for the same queue resolved
    pub failed: Vec<DeleteFailure>,
    /// Number of listings issued
    pub polls: u32,
}

impl ReconcileReport {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            ..Self::default()
        }
    }

    /// Check if the namespace was empty on the first listing
    pub fn was_already_clean(&self) -> bool {
        self.polls == 1 && self.deleted.is_empty() && self.already_absent.is_empty()
    }
}

/// Reconcile errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "Queues under prefix '{prefix}' still listed after {polls} polls ({elapsed:?}): {remaining:?}"
    )]
    Timeout {
        prefix: String,
        remaining: Vec<QueueUrl>,
        polls: u32,
        elapsed: Duration,
    },

    #[error("Listing queues under prefix '{prefix}' failed: {source}")]
    List {
        prefix: String,
        #[source]
        source: QueueError,
    },
}

/// Drives a namespace to the empty state
pub struct FixtureReconciler {
    client: Arc<dyn QueueClient>,
    config: ReconcileConfig,
}

impl FixtureReconciler {
    pub fn new(client: Arc<dyn QueueClient>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Delete every queue whose name starts with `prefix` and wait until the
    /// listing for the prefix is empty
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Timeout`] when the poll count or the timeout runs
    ///   out while queues are still listed
    /// - [`ReconcileError::List`] when a listing fails permanently
    pub async fn reconcile(&self, prefix: &str) -> Result<ReconcileReport, ReconcileError> {
        let span = info_span!("reconcile", prefix = %prefix);
        self.run(prefix).instrument(span).await
    }

    async fn run(&self, prefix: &str) -> Result<ReconcileReport, ReconcileError> {
        let started = Instant::now();
        let mut report = ReconcileReport::new(prefix);
        // Queues deleted by this run or found to be gone; never re-deleted
        let mut settled: HashSet<QueueUrl> = HashSet::new();
        let mut remaining: Vec<QueueUrl> = Vec::new();

        loop {
            report.polls += 1;

            match self.client.list_queues(prefix).await {
                Ok(urls) if urls.is_empty() => {
                    info!(
                        polls = report.polls,
                        deleted = report.deleted.len(),
                        already_absent = report.already_absent.len(),
                        failed = report.failed.len(),
                        "Namespace reconciled"
                    );
                    return Ok(report);
                }
                Ok(urls) => {
                    debug!(poll = report.polls, listed = urls.len(), "Queues still listed");
                    let pending: Vec<QueueUrl> = urls
                        .iter()
                        .filter(|url| !settled.contains(*url))
                        .cloned()
                        .collect();
                    for url in &pending {
                        self.delete(url, &mut report, &mut settled).await;
                    }
                    remaining = urls;
                }
                Err(e) if e.is_transient() => {
                    warn!(poll = report.polls, error = %e, "Listing queues failed; retrying");
                }
                Err(e) => {
                    return Err(ReconcileError::List {
                        prefix: prefix.to_string(),
                        source: e,
                    });
                }
            }

            let elapsed = started.elapsed();
            if report.polls >= self.config.max_polls || elapsed >= self.config.timeout() {
                warn!(
                    polls = report.polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    remaining = remaining.len(),
                    "Namespace did not empty in time"
                );
                return Err(ReconcileError::Timeout {
                    prefix: prefix.to_string(),
                    remaining,
                    polls: report.polls,
                    elapsed,
                });
            }

            if report.polls > 1 {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        }
    }

    async fn delete(
        &self,
        url: &QueueUrl,
        report: &mut ReconcileReport,
        settled: &mut HashSet<QueueUrl>,
    ) {
        match self.client.delete_queue(url).await {
            Ok(()) => {
                debug!(queue_url = %url, "Queue deleted");
                report.failed.retain(|failure| &failure.queue != url);
                report.deleted.push(url.clone());
                settled.insert(url.clone());
            }
            Err(e) if e.is_not_found() => {
                debug!(queue_url = %url, "Queue already gone");
                report.failed.retain(|failure| &failure.queue != url);
                report.already_absent.push(url.clone());
                settled.insert(url.clone());
            }
            Err(e) => {
                warn!(queue_url = %url, error = %e, "Failed to delete queue");
                let failure = DeleteFailure {
                    queue: url.clone(),
                    error: e.to_string(),
                };
                match report.failed.iter_mut().find(|f| &f.queue == url) {
                    Some(existing) => *existing = failure,
                    None => report.failed.push(failure),
                }
            }
        }
    }
}
