//! Reserved queue-name namespace for test-owned queues.

use queue_client::{QueueName, ValidationError};
use ulid::Ulid;

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;

/// Prefix marking queues created by the integration suite
pub const DEFAULT_PREFIX: &str = "IntegrationTest_";

/// Longest prefix accepted, leaving room for a run id and a base name
const MAX_PREFIX_LENGTH: usize = 40;

/// Reserved prefix, optionally narrowed by a per-run id
///
/// Every queue a fixture creates is named `<prefix><base>`, or
/// `<prefix><run-id>_<base>` when a run id is set, so the reconciler can find
/// them by listing on [`Namespace::listing_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
    run_id: Option<String>,
}

impl Namespace {
    /// Create a namespace from a reserved prefix
    pub fn new(prefix: impl Into<String>) -> Result<Self, ValidationError> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.len() > MAX_PREFIX_LENGTH {
            return Err(ValidationError::OutOfRange {
                field: "namespace_prefix".to_string(),
                message: format!("must be 1-{} characters", MAX_PREFIX_LENGTH),
            });
        }

        if !is_name_text(&prefix) {
            return Err(ValidationError::InvalidFormat {
                field: "namespace_prefix".to_string(),
                message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
            });
        }

        Ok(Self {
            prefix,
            run_id: None,
        })
    }

    /// Narrow the namespace to a freshly generated run id
    pub fn with_run_id(self) -> Self {
        Self {
            run_id: Some(Ulid::new().to_string()),
            ..self
        }
    }

    /// Narrow the namespace to a caller-chosen run id
    pub fn with_explicit_run_id(self, run_id: impl Into<String>) -> Result<Self, ValidationError> {
        let run_id = run_id.into();
        if run_id.is_empty() || !is_name_text(&run_id) {
            return Err(ValidationError::InvalidFormat {
                field: "run_id".to_string(),
                message: "must be non-empty ASCII alphanumeric, hyphens, or underscores"
                    .to_string(),
            });
        }

        Ok(Self {
            run_id: Some(run_id),
            ..self
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Prefix that every queue in this namespace starts with
    pub fn listing_prefix(&self) -> String {
        match self.run_id() {
            Some(run_id) => format!("{}{}_", self.prefix, run_id),
            None => self.prefix.clone(),
        }
    }

    /// Full queue name for a base name
    pub fn queue_name(&self, base_name: &str) -> Result<QueueName, ValidationError> {
        QueueName::with_prefix(&self.listing_prefix(), base_name)
    }

    /// Check if a queue name belongs to this namespace
    pub fn contains(&self, queue_name: &str) -> bool {
        queue_name.starts_with(&self.listing_prefix())
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            run_id: None,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.listing_prefix())
    }
}

fn is_name_text(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
