//! Message types for queue operations including core domain identifiers.

use crate::error::ValidationError;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Maximum number of attributes the service accepts on one message
pub const MAX_MESSAGE_ATTRIBUTES: usize = 10;

/// Maximum number of messages one receive call may return
pub const MAX_RECEIVE_MESSAGES: u32 = 10;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name with length and character restrictions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.is_empty() || name.len() > 80 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 1-80 characters".to_string(),
            });
        }

        // FIFO queues carry a mandatory `.fifo` suffix; the rest follows the standard rules
        let stem = name.strip_suffix(".fifo").unwrap_or(&name);
        if stem.is_empty()
            || !stem
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Create queue name with prefix
    pub fn with_prefix(prefix: &str, base_name: &str) -> Result<Self, ValidationError> {
        Self::new(format!("{}{}", prefix, base_name))
    }

    /// Check if this is a FIFO queue name
    pub fn is_fifo(&self) -> bool {
        self.0.ends_with(".fifo")
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Service-assigned address of a queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueUrl(String);

impl QueueUrl {
    /// Parse a queue URL returned by the service
    pub fn new(url: String) -> Result<Self, ValidationError> {
        let parsed = url::Url::parse(&url).map_err(|e| ValidationError::InvalidFormat {
            field: "queue_url".to_string(),
            message: e.to_string(),
        })?;

        let has_name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .is_some_and(|last| !last.is_empty());
        if !has_name {
            return Err(ValidationError::InvalidFormat {
                field: "queue_url".to_string(),
                message: "URL path must end with the queue name".to_string(),
            });
        }

        Ok(Self(url))
    }

    /// Queue name, taken from the last path segment
    pub fn queue_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Get queue URL as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueUrl {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Unique identifier for messages within the queue system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Application-chosen identifier of one entry in a batch request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchEntryId(String);

impl BatchEntryId {
    /// Create new batch entry ID with validation
    pub fn new(id: String) -> Result<Self, ValidationError> {
        if id.is_empty() || id.len() > 80 {
            return Err(ValidationError::OutOfRange {
                field: "batch_entry_id".to_string(),
                message: "must be 1-80 characters".to_string(),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "batch_entry_id".to_string(),
                message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
            });
        }

        Ok(Self(id))
    }

    /// Get entry ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BatchEntryId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// ============================================================================
// Message Attributes
// ============================================================================

/// Typed value of a message attribute
///
/// Serialized as `{"data_type": ..., "value": ...}` with binary values in
/// base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AttributeRepr", try_from = "AttributeRepr")]
pub enum MessageAttributeValue {
    String(String),
    /// Decimal number kept in its textual form
    Number(String),
    Binary(Bytes),
}

/// Wire form of [`MessageAttributeValue`]
#[derive(Serialize, Deserialize)]
#[serde(tag = "data_type", content = "value")]
enum AttributeRepr {
    String(String),
    Number(String),
    Binary(String),
}

impl From<MessageAttributeValue> for AttributeRepr {
    fn from(value: MessageAttributeValue) -> Self {
        match value {
            MessageAttributeValue::String(s) => Self::String(s),
            MessageAttributeValue::Number(n) => Self::Number(n),
            MessageAttributeValue::Binary(b) => Self::Binary(general_purpose::STANDARD.encode(b)),
        }
    }
}

impl TryFrom<AttributeRepr> for MessageAttributeValue {
    type Error = base64::DecodeError;

    fn try_from(repr: AttributeRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            AttributeRepr::String(s) => Self::String(s),
            AttributeRepr::Number(n) => Self::Number(n),
            AttributeRepr::Binary(encoded) => {
                Self::Binary(Bytes::from(general_purpose::STANDARD.decode(encoded)?))
            }
        })
    }
}

impl MessageAttributeValue {
    /// Create a string attribute
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Create a number attribute from a numeric value
    pub fn number<N: std::fmt::Display>(value: N) -> Self {
        Self::Number(value.to_string())
    }

    /// Create a number attribute from text, validating it parses as a finite number
    pub fn parse_number(value: &str) -> Result<Self, ValidationError> {
        validate_number(value)?;
        Ok(Self::Number(value.to_string()))
    }

    /// Create a binary attribute
    pub fn binary(value: impl Into<Bytes>) -> Self {
        Self::Binary(value.into())
    }

    /// Data type tag as the service names it
    pub fn data_type(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Number(_) => "Number",
            Self::Binary(_) => "Binary",
        }
    }

    /// Textual payload for string and number attributes
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) | Self::Number(value) => Some(value),
            Self::Binary(_) => None,
        }
    }

    /// Binary payload
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(value) => Some(value),
            _ => None,
        }
    }

    /// Size the service charges against the message size limit
    pub fn size_in_bytes(&self) -> usize {
        let payload = match self {
            Self::String(value) | Self::Number(value) => value.len(),
            Self::Binary(value) => value.len(),
        };
        self.data_type().len() + payload
    }
}

fn validate_number(value: &str) -> Result<(), ValidationError> {
    let finite = value
        .parse::<f64>()
        .map(|number| number.is_finite())
        .unwrap_or(false);
    if !finite {
        return Err(ValidationError::InvalidFormat {
            field: "message_attribute".to_string(),
            message: format!("'{}' is not a finite number", value),
        });
    }
    Ok(())
}

/// Validate an attribute name against the service's naming rules
pub fn validate_attribute_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > 256 {
        return Err(ValidationError::OutOfRange {
            field: "message_attribute_name".to_string(),
            message: "must be 1-256 characters".to_string(),
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "message_attribute_name".to_string(),
            message: format!("'{}' contains characters outside [A-Za-z0-9_.-]", name),
        });
    }

    let lowered = name.to_ascii_lowercase();
    if lowered.starts_with("aws.") || lowered.starts_with("amazon.") {
        return Err(ValidationError::InvalidFormat {
            field: "message_attribute_name".to_string(),
            message: format!("'{}' uses a reserved prefix", name),
        });
    }

    if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
        return Err(ValidationError::InvalidFormat {
            field: "message_attribute_name".to_string(),
            message: format!("'{}' has a leading, trailing, or repeated period", name),
        });
    }

    Ok(())
}

/// Which attributes a receive request opts into
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AttributeFilter {
    /// Attributes are omitted from received messages
    #[default]
    None,
    /// Every attribute is returned
    All,
    /// Named attributes; a name ending in `.*` selects a prefix
    Names(Vec<String>),
}

impl AttributeFilter {
    /// Check if the attribute with this name is returned
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Names(names) => names.iter().any(|pattern| {
                if pattern == "All" || pattern == ".*" {
                    return true;
                }
                match pattern.strip_suffix(".*") {
                    Some(prefix) => name.starts_with(prefix),
                    None => pattern == name,
                }
            }),
        }
    }

    /// Attribute names as they appear on the wire
    pub fn to_request_names(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::All => vec!["All".to_string()],
            Self::Names(names) => names.clone(),
        }
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A message to be sent through the queue system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub body: String,
    pub attributes: BTreeMap<String, MessageAttributeValue>,
}

impl Message {
    /// Create new message with body
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add message attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: MessageAttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Size the service charges against the message size limit
    pub fn size_in_bytes(&self) -> usize {
        self.body.len()
            + self
                .attributes
                .iter()
                .map(|(name, value)| name.len() + value.size_in_bytes())
                .sum::<usize>()
    }

    /// Validate body and attributes, without the size limit
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.body.is_empty() {
            return Err(ValidationError::Required {
                field: "message_body".to_string(),
            });
        }

        if self.attributes.len() > MAX_MESSAGE_ATTRIBUTES {
            return Err(ValidationError::OutOfRange {
                field: "message_attributes".to_string(),
                message: format!(
                    "{} attributes exceeds maximum {}",
                    self.attributes.len(),
                    MAX_MESSAGE_ATTRIBUTES
                ),
            });
        }

        for (name, value) in &self.attributes {
            validate_attribute_name(name)?;
            if let MessageAttributeValue::Number(number) = value {
                validate_number(number)?;
            }
        }

        Ok(())
    }
}

/// A message received from the queue with processing metadata
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub receipt_handle: ReceiptHandle,
    pub body: String,
    pub attributes: BTreeMap<String, MessageAttributeValue>,
}

/// Opaque token proving the receiver holds the lease on one delivery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Create new receipt handle
    pub fn new(handle: String) -> Self {
        Self(handle)
    }

    /// Get handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Requests and Batch Results
// ============================================================================

/// Parameters of a receive call
#[derive(Debug, Clone)]
pub struct ReceiveRequest {
    /// Maximum number of messages to return (1-10)
    pub max_messages: u32,
    /// Attributes to include on returned messages
    pub attributes: AttributeFilter,
    /// Long-poll wait; zero returns immediately
    pub wait_time: Duration,
    /// Overrides the queue's visibility timeout for these deliveries
    pub visibility_timeout: Option<Duration>,
}

impl Default for ReceiveRequest {
    fn default() -> Self {
        Self {
            max_messages: 1,
            attributes: AttributeFilter::None,
            wait_time: Duration::zero(),
            visibility_timeout: None,
        }
    }
}

impl ReceiveRequest {
    /// Create new receive request with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum number of messages to receive
    pub fn with_max_messages(mut self, max: u32) -> Self {
        self.max_messages = max;
        self
    }

    /// Request every attribute
    pub fn with_all_attributes(mut self) -> Self {
        self.attributes = AttributeFilter::All;
        self
    }

    /// Set the attribute filter
    pub fn with_attributes(mut self, filter: AttributeFilter) -> Self {
        self.attributes = filter;
        self
    }

    /// Set long-poll wait time
    pub fn with_wait_time(mut self, wait: Duration) -> Self {
        self.wait_time = wait;
        self
    }

    /// Set visibility timeout for the returned deliveries
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = Some(timeout);
        self
    }
}

/// One entry of a send-batch request
#[derive(Debug, Clone)]
pub struct SendMessageBatchEntry {
    pub id: BatchEntryId,
    pub message: Message,
}

impl SendMessageBatchEntry {
    pub fn new(id: BatchEntryId, message: Message) -> Self {
        Self { id, message }
    }
}

/// One entry of a delete-batch request
#[derive(Debug, Clone)]
pub struct DeleteMessageBatchEntry {
    pub id: BatchEntryId,
    pub receipt_handle: ReceiptHandle,
}

impl DeleteMessageBatchEntry {
    pub fn new(id: BatchEntryId, receipt_handle: ReceiptHandle) -> Self {
        Self { id, receipt_handle }
    }
}

/// A successfully sent batch entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBatchEntry {
    pub id: BatchEntryId,
    pub message_id: MessageId,
}

/// A batch entry the service rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntryFailure {
    pub id: BatchEntryId,
    pub code: String,
    pub message: Option<String>,
    /// Whether the caller (rather than the service) caused the failure
    pub sender_fault: bool,
}

/// Per-entry outcome of a batch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<T> {
    pub successful: Vec<T>,
    pub failed: Vec<BatchEntryFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// Check if every entry succeeded
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
