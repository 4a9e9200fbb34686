//! Provider types and configuration.

use chrono::Duration;

/// Largest message, body plus attributes, the SQS API accepts
pub const SQS_MAX_MESSAGE_BYTES: usize = 256 * 1024;

/// Most entries an SQS batch request may carry
pub const SQS_MAX_BATCH_ENTRIES: usize = 10;

/// Backend a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    AwsSqs,
    InMemory,
}

impl ProviderType {
    /// Size limit enforced before a send reaches the backend
    ///
    /// The in-memory backend uses the SQS limit so oversized messages fail
    /// the same way against both.
    pub fn max_message_size(&self) -> usize {
        SQS_MAX_MESSAGE_BYTES
    }

    /// Entry limit enforced before a batch request reaches the backend
    pub fn max_batch_size(&self) -> usize {
        SQS_MAX_BATCH_ENTRIES
    }

    /// Label used in logs and error values
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwsSqs => "AwsSqs",
            Self::InMemory => "InMemory",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for queue client initialization
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub provider: ProviderConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::InMemory(InMemoryConfig::default()),
        }
    }
}

/// Provider-specific configuration
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    AwsSqs(AwsSqsConfig),
    InMemory(InMemoryConfig),
}

/// AWS SQS configuration
#[derive(Debug, Clone)]
pub struct AwsSqsConfig {
    pub region: String,
    /// Overrides the regional endpoint (LocalStack, ElasticMQ, proxies)
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl Default for AwsSqsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

/// In-memory provider configuration
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    /// Account id embedded in queue URLs
    pub account_id: String,
    /// How long a received message stays invisible unless the request overrides it
    pub visibility_timeout: Duration,
    /// Number of listings in which a deleted queue still appears
    pub listing_lag: u32,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            account_id: "000000000000".to_string(),
            visibility_timeout: Duration::seconds(30),
            listing_lag: 0,
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
