//! Namespace reconciliation against an eventually consistent listing

mod common;

use common::{in_memory_client, Call, RecordingClient};
use queue_client::{QueueClient, QueueError, QueueName};
use queue_fixture::{
    FixtureError, FixturePhase, FixtureReconciler, Namespace, QueueFixture, ReconcileConfig,
    ReconcileError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

async fn create_all(client: &Arc<dyn QueueClient>, names: &[&str]) {
    for name in names {
        client
            .create_queue(&QueueName::new(name.to_string()).unwrap())
            .await
            .unwrap();
    }
}

fn quick_config(max_polls: u32) -> ReconcileConfig {
    ReconcileConfig {
        poll_interval_ms: 100,
        max_polls,
        timeout_seconds: 60,
    }
}

// ============================================================================
// Convergence
// ============================================================================

/// Deleted queues keep showing up for a few listings and must not be re-deleted.
#[tokio::test(start_paused = true)]
async fn test_lagging_listing_converges_with_single_delete_per_queue() {
    let recorder = RecordingClient::new(in_memory_client(3));
    let client: Arc<dyn QueueClient> = Arc::new(recorder.clone());
    create_all(
        &client,
        &["IntegrationTest_A", "IntegrationTest_B", "Other_C"],
    )
    .await;
    recorder.clear_calls();

    let reconciler = FixtureReconciler::new(client.clone(), quick_config(20));
    let report = assert_ok!(reconciler.reconcile("IntegrationTest_").await);

    assert_eq!(report.deleted.len(), 2);
    assert!(report.failed.is_empty());
    assert!(report.polls >= 4, "expected lagging listings, got {}", report.polls);

    let deletes: Vec<_> = recorder
        .get_calls()
        .into_iter()
        .filter(|call| matches!(call, Call::DeleteQueue(_)))
        .collect();
    assert_eq!(deletes.len(), 2);

    let remaining = client.list_queues("").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].queue_name(), "Other_C");
}

/// Every listing uses the namespace prefix.
#[tokio::test(start_paused = true)]
async fn test_listings_use_namespace_prefix() {
    let recorder = RecordingClient::new(in_memory_client(1));
    let client: Arc<dyn QueueClient> = Arc::new(recorder.clone());
    let namespace = Namespace::default().with_explicit_run_id("run42").unwrap();
    client
        .create_queue(&namespace.queue_name("SimpleQueue").unwrap())
        .await
        .unwrap();

    let reconciler = FixtureReconciler::new(client, quick_config(10));
    assert_ok!(reconciler.reconcile(&namespace.listing_prefix()).await);

    let listings: Vec<_> = recorder
        .get_calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::ListQueues(prefix) => Some(prefix),
            _ => None,
        })
        .collect();
    assert!(!listings.is_empty());
    assert!(listings
        .iter()
        .all(|prefix| prefix == "IntegrationTest_run42_"));
}

#[tokio::test(start_paused = true)]
async fn test_clean_namespace_needs_one_listing() {
    let recorder = RecordingClient::new(in_memory_client(0));
    let reconciler = FixtureReconciler::new(Arc::new(recorder.clone()), quick_config(5));

    let report = assert_ok!(reconciler.reconcile("IntegrationTest_").await);

    assert!(report.was_already_clean());
    assert_eq!(report.polls, 1);
    assert_eq!(recorder.get_calls().len(), 1);
}

// ============================================================================
// Bounded Failure
// ============================================================================

/// A queue whose deletes always fail makes the reconcile stop at the poll bound.
#[tokio::test(start_paused = true)]
async fn test_undeletable_queue_times_out() {
    let recorder = RecordingClient::new(in_memory_client(0));
    recorder.fail_queue_deletes(|queue| {
        (queue.queue_name() == "IntegrationTest_Stuck").then(|| QueueError::ConnectionFailed {
            message: "connection reset".to_string(),
        })
    });
    let client: Arc<dyn QueueClient> = Arc::new(recorder.clone());
    create_all(&client, &["IntegrationTest_Stuck", "IntegrationTest_Fine"]).await;

    let reconciler = FixtureReconciler::new(client.clone(), quick_config(4));
    let error = assert_err!(reconciler.reconcile("IntegrationTest_").await);

    match error {
        ReconcileError::Timeout {
            prefix,
            remaining,
            polls,
            ..
        } => {
            assert_eq!(prefix, "IntegrationTest_");
            assert_eq!(polls, 4);
            assert_eq!(remaining.len(), 1);
            assert_eq!(remaining[0].queue_name(), "IntegrationTest_Stuck");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let names: Vec<_> = client
        .list_queues("IntegrationTest_")
        .await
        .unwrap()
        .into_iter()
        .map(|url| url.queue_name().to_string())
        .collect();
    assert_eq!(names, vec!["IntegrationTest_Stuck".to_string()]);
}

/// The wall-clock bound applies even when the poll bound is generous.
#[tokio::test(start_paused = true)]
async fn test_timeout_bound_stops_reconcile() {
    let recorder = RecordingClient::new(in_memory_client(0));
    recorder.fail_queue_deletes(|_| {
        Some(QueueError::Throttled {
            provider: "in_memory".to_string(),
            message: "slow down".to_string(),
        })
    });
    let client: Arc<dyn QueueClient> = Arc::new(recorder.clone());
    create_all(&client, &["IntegrationTest_Stuck"]).await;
    let config = ReconcileConfig {
        poll_interval_ms: 1_000,
        max_polls: 1_000,
        timeout_seconds: 5,
    };

    let started = tokio::time::Instant::now();
    let error = assert_err!(
        FixtureReconciler::new(client, config)
            .reconcile("IntegrationTest_")
            .await
    );

    match error {
        ReconcileError::Timeout { polls, elapsed, .. } => {
            assert!(polls < 1_000);
            assert!(elapsed >= Duration::from_secs(5));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(10));
}

/// A stuck namespace at finish reports the finish phase.
#[tokio::test(start_paused = true)]
async fn test_fixture_finish_reports_stuck_queue() {
    let recorder = RecordingClient::new(in_memory_client(0));
    let fixture = assert_ok!(
        QueueFixture::start(
            Arc::new(recorder.clone()),
            Namespace::default(),
            quick_config(3),
        )
        .await
    );
    let name = fixture.queue_name("SimpleQueue").unwrap();
    assert_ok!(fixture.client().create_queue(&name).await);
    recorder.fail_queue_deletes(|_| {
        Some(QueueError::AuthenticationFailed {
            message: "AccessDenied: delete not allowed".to_string(),
        })
    });

    let error = assert_err!(fixture.finish().await);

    match error {
        FixtureError::Reconcile { phase, source } => {
            assert_eq!(phase, FixturePhase::Finish);
            assert!(matches!(source, ReconcileError::Timeout { polls: 3, .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
