//! # Queue Fixture
//!
//! Test fixtures for exercising a message-queue client against a queue
//! service.
//!
//! This library provides:
//! - A reconciler that empties a reserved queue-name namespace and waits
//!   until the service's listings agree
//! - A per-test fixture that reconciles before and after the test body
//! - Round-trip scenarios for single and batch messaging with attributes
//! - Configuration loading and test logging setup
//!
//! ## Module Organization
//!
//! - [`config`] - Fixture configuration and its sources
//! - [`namespace`] - Reserved prefix and per-run ids
//! - [`reconciler`] - Namespace reconciliation
//! - [`fixture`] - Per-test fixture lifecycle
//! - [`scenario`] - Behavioural scenarios
//! - [`telemetry`] - Test logging

pub mod config;
pub mod fixture;
pub mod namespace;
pub mod reconciler;
pub mod scenario;
pub mod telemetry;

pub use crate::config::{
    ConfigError, FixtureConfig, LoggingConfig, NamespaceConfig, ProviderKind, ProviderSettings,
    ReconcileConfig,
};
pub use fixture::{FixtureError, FixturePhase, QueueFixture};
pub use namespace::{Namespace, DEFAULT_PREFIX};
pub use reconciler::{DeleteFailure, FixtureReconciler, ReconcileError, ReconcileReport};
pub use scenario::{
    attribute_opt_in_round_trip, batch_round_trip, single_message_round_trip, ScenarioError,
    ScenarioPayload, ScenarioReport, BATCH_ENTRY_ID, BATCH_QUEUE, CUSTOM_ATTRIBUTE_NAME,
    CUSTOM_ATTRIBUTE_VALUE, OPT_IN_QUEUE, SIMPLE_QUEUE,
};
pub use telemetry::init_test_logging;
