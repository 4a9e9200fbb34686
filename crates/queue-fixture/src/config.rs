//! Configuration for queue fixtures.
//!
//! Sources (applied in order, later sources override earlier ones):
//!  1. Built-in defaults
//!  2. File named by `QUEUE_FIXTURE_CONFIG_FILE` (TOML, JSON or YAML by extension)
//!  3. Environment variables prefixed `QUEUE_FIXTURE__` (double-underscore separator)
//!     e.g. `QUEUE_FIXTURE__RECONCILE__POLL_INTERVAL_MS=250` sets
//!     `reconcile.poll_interval_ms = 250`
//!
//! Every field carries a default, so an unconfigured environment runs the
//! suite against the in-memory provider.

use crate::namespace::{Namespace, DEFAULT_PREFIX};
use queue_client::{
    AwsSqsConfig, InMemoryConfig, ProviderConfig, QueueConfig, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "QUEUE_FIXTURE_CONFIG_FILE";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "QUEUE_FIXTURE";

/// Longest visibility timeout the queue service accepts (12 hours)
pub const MAX_VISIBILITY_TIMEOUT_SECONDS: i64 = 43_200;

/// Fixture configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FixtureConfig {
    /// Reserved queue-name namespace
    pub namespace: NamespaceConfig,

    /// Reconciler polling bounds
    pub reconcile: ReconcileConfig,

    /// Queue service backend
    pub provider: ProviderSettings,

    /// Test logging
    pub logging: LoggingConfig,
}

impl FixtureConfig {
    /// Load configuration from the optional file and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV)
            .ok()
            .filter(|path| !path.is_empty());

        Self::load_from(file.as_deref().map(Path::new), None)
    }

    /// Load configuration from an explicit file and environment
    ///
    /// `env_vars` replaces the process environment when given; keys use the
    /// same `QUEUE_FIXTURE__` form.
    pub fn load_from(
        file: Option<&Path>,
        env_vars: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let environment = ::config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(env_vars);

        let config: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// Rejects:
    /// - an empty or malformed namespace prefix
    /// - a zero poll interval, poll count or timeout
    /// - an in-memory visibility timeout outside 0-12 hours
    /// - an empty region when the AWS SQS provider is selected
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.namespace.build()?;

        if self.reconcile.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "reconcile.poll_interval_ms must be greater than zero".to_string(),
            });
        }

        if self.reconcile.max_polls == 0 {
            return Err(ConfigError::Invalid {
                message: "reconcile.max_polls must be greater than zero".to_string(),
            });
        }

        if self.reconcile.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "reconcile.timeout_seconds must be greater than zero".to_string(),
            });
        }

        let visibility = self.provider.in_memory.visibility_timeout_seconds;
        if !(0..=MAX_VISIBILITY_TIMEOUT_SECONDS).contains(&visibility) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "provider.in_memory.visibility_timeout_seconds must be 0-{}, got {}",
                    MAX_VISIBILITY_TIMEOUT_SECONDS, visibility
                ),
            });
        }

        if self.provider.kind == ProviderKind::AwsSqs
            && self.provider.aws_sqs.region.trim().is_empty()
        {
            return Err(ConfigError::Missing {
                key: "provider.aws_sqs.region".to_string(),
            });
        }

        Ok(())
    }

    /// Queue client configuration for the selected provider
    pub fn queue_config(&self) -> Result<QueueConfig, ConfigError> {
        let provider = match self.provider.kind {
            ProviderKind::InMemory => ProviderConfig::InMemory(InMemoryConfig {
                visibility_timeout: chrono::Duration::try_seconds(
                    self.provider.in_memory.visibility_timeout_seconds,
                )
                .ok_or_else(|| ConfigError::Invalid {
                    message: "provider.in_memory.visibility_timeout_seconds is out of range"
                        .to_string(),
                })?,
                listing_lag: self.provider.in_memory.listing_lag,
                ..InMemoryConfig::default()
            }),
            ProviderKind::AwsSqs => {
                let aws = &self.provider.aws_sqs;
                ProviderConfig::AwsSqs(AwsSqsConfig {
                    region: aws.region.clone(),
                    endpoint_url: aws.endpoint_url.clone(),
                    access_key_id: aws.access_key_id.clone(),
                    secret_access_key: aws.secret_access_key.clone(),
                })
            }
        };

        Ok(QueueConfig { provider })
    }
}

/// Namespace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Reserved prefix of test-owned queues
    pub prefix: String,

    /// Narrow the namespace with a generated per-run id
    pub per_run_id: bool,
}

impl NamespaceConfig {
    /// Build the namespace this configuration describes
    pub fn build(&self) -> Result<Namespace, ValidationError> {
        let namespace = Namespace::new(self.prefix.clone())?;
        Ok(if self.per_run_id {
            namespace.with_run_id()
        } else {
            namespace
        })
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            per_run_id: false,
        }
    }
}

/// Reconciler polling bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Wait between listings in milliseconds
    pub poll_interval_ms: u64,

    /// Maximum number of listings per reconcile
    pub max_polls: u32,

    /// Overall limit for one reconcile in seconds
    pub timeout_seconds: u64,
}

impl ReconcileConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_polls: 60,
            timeout_seconds: 120,
        }
    }
}

/// Queue service backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    InMemory,
    AwsSqs,
}

/// Provider settings; only the block matching `kind` is used
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub aws_sqs: AwsSqsSettings,
    pub in_memory: InMemorySettings,
}

/// AWS SQS connection settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSqsSettings {
    pub region: String,

    /// Custom endpoint, e.g. `http://localhost:4566` for LocalStack
    pub endpoint_url: Option<String>,

    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl Default for AwsSqsSettings {
    fn default() -> Self {
        Self {
            region: AwsSqsConfig::default().region,
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl std::fmt::Debug for AwsSqsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSqsSettings")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// In-memory provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemorySettings {
    /// Default visibility timeout in seconds
    pub visibility_timeout_seconds: i64,

    /// Number of listings in which a deleted queue still appears
    pub listing_lag: u32,
}

impl Default for InMemorySettings {
    fn default() -> Self {
        Self {
            visibility_timeout_seconds: 30,
            listing_lag: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Invalid namespace: {0}")]
    Namespace(#[from] ValidationError),

    #[error("Configuration loading failed: {0}")]
    Loading(#[from] ::config::ConfigError),
}
