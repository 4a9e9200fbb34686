//! AWS SQS provider implementation using the AWS SDK.
//!
//! Works against real SQS and against local emulators (LocalStack and
//! similar) through [`AwsSqsConfig::endpoint_url`].
//!
//! ## Authentication
//!
//! - **Static keys**: `access_key_id` and `secret_access_key` set together
//! - **Default chain**: environment, profile files, instance metadata
//!
//! ## Error Mapping
//!
//! Service error codes are translated into [`QueueError`] variants so callers
//! can tell a missing queue or a throttled request apart from a hard failure.
//! Transport failures (timeouts, dispatch failures) become
//! [`QueueError::ConnectionFailed`], which is transient.

use crate::client::QueueProvider;
use crate::error::{ConfigurationError, QueueError, ValidationError};
use crate::message::{
    BatchEntryFailure, BatchEntryId, BatchOutcome, DeleteMessageBatchEntry, Message,
    MessageAttributeValue, MessageId, QueueName, QueueUrl, ReceiptHandle, ReceiveRequest,
    ReceivedMessage, SendMessageBatchEntry, SentBatchEntry,
};
use crate::provider::{AwsSqsConfig, ProviderType};
use async_trait::async_trait;
use aws_sdk_sqs::config::{Credentials, Region};
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::primitives::Blob;
use aws_sdk_sqs::types::{
    DeleteMessageBatchRequestEntry, MessageAttributeValue as SqsAttributeValue,
    SendMessageBatchRequestEntry,
};
use aws_sdk_sqs::Client;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;

/// Page size requested from ListQueues; the service maximum
const LIST_QUEUES_PAGE_SIZE: i32 = 1000;

// ============================================================================
// Error Classification
// ============================================================================

/// Translate a service error code into a queue error
///
/// `target` names what the request addressed (queue name or URL) and is used
/// where the error variant identifies a queue.
pub(crate) fn classify_error(code: &str, message: &str, target: &str) -> QueueError {
    match code {
        "AWS.SimpleQueueService.NonExistentQueue" | "QueueDoesNotExist" => {
            QueueError::QueueDoesNotExist {
                queue: target.to_string(),
            }
        }
        "AWS.SimpleQueueService.QueueDeletedRecently" | "QueueDeletedRecently" => {
            QueueError::QueueDeletedRecently {
                queue_name: target.to_string(),
            }
        }
        "ReceiptHandleIsInvalid" | "InvalidReceiptHandle" => QueueError::ReceiptHandleInvalid {
            receipt: message.to_string(),
        },
        "InvalidClientTokenId"
        | "UnrecognizedClientException"
        | "SignatureDoesNotMatch"
        | "MissingAuthenticationToken"
        | "AccessDenied"
        | "AccessDeniedException"
        | "InvalidSecurity" => QueueError::AuthenticationFailed {
            message: format!("{}: {}", code, message),
        },
        "Throttling"
        | "ThrottlingException"
        | "RequestThrottled"
        | "AWS.SimpleQueueService.RequestThrottled"
        | "OverLimit" => QueueError::Throttled {
            provider: ProviderType::AwsSqs.to_string(),
            message: format!("{}: {}", code, message),
        },
        _ => QueueError::ProviderError {
            provider: ProviderType::AwsSqs.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

fn map_sdk_error<E, R>(error: SdkError<E, R>, target: &str) -> QueueError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            QueueError::ConnectionFailed {
                message: DisplayErrorContext(&error).to_string(),
            }
        }
        _ => match error.code() {
            Some(code) => classify_error(code, error.message().unwrap_or_default(), target),
            None => QueueError::ProviderError {
                provider: ProviderType::AwsSqs.to_string(),
                code: "Unknown".to_string(),
                message: DisplayErrorContext(&error).to_string(),
            },
        },
    }
}

fn malformed_response(operation: &str, field: &str) -> QueueError {
    QueueError::ProviderError {
        provider: ProviderType::AwsSqs.to_string(),
        code: "MalformedResponse".to_string(),
        message: format!("{} response is missing {}", operation, field),
    }
}

fn build_error(error: impl std::fmt::Display) -> QueueError {
    ValidationError::InvalidFormat {
        field: "request".to_string(),
        message: error.to_string(),
    }
    .into()
}

// ============================================================================
// Attribute Conversion
// ============================================================================

pub(crate) fn to_sqs_attribute(
    value: &MessageAttributeValue,
) -> Result<SqsAttributeValue, QueueError> {
    let builder = SqsAttributeValue::builder().data_type(value.data_type());
    let builder = match value {
        MessageAttributeValue::String(text) | MessageAttributeValue::Number(text) => {
            builder.string_value(text)
        }
        MessageAttributeValue::Binary(bytes) => builder.binary_value(Blob::new(bytes.to_vec())),
    };
    builder.build().map_err(build_error)
}

/// Attribute map for a request; `None` when the message carries no attributes
fn to_sqs_attributes(
    attributes: &BTreeMap<String, MessageAttributeValue>,
) -> Result<Option<HashMap<String, SqsAttributeValue>>, QueueError> {
    if attributes.is_empty() {
        return Ok(None);
    }

    attributes
        .iter()
        .map(|(name, value)| Ok((name.clone(), to_sqs_attribute(value)?)))
        .collect::<Result<HashMap<_, _>, QueueError>>()
        .map(Some)
}

/// Convert a received attribute, honouring custom type suffixes such as `Number.int`
///
/// Returns `None` for data types outside String, Number and Binary.
pub(crate) fn from_sqs_attribute(value: &SqsAttributeValue) -> Option<MessageAttributeValue> {
    let base_type = value.data_type().split('.').next().unwrap_or_default();
    match base_type {
        "String" => value.string_value().map(MessageAttributeValue::string),
        "Number" => value
            .string_value()
            .map(|number| MessageAttributeValue::Number(number.to_string())),
        "Binary" => value
            .binary_value()
            .map(|blob| MessageAttributeValue::binary(blob.as_ref().to_vec())),
        _ => None,
    }
}

// ============================================================================
// AwsSqsProvider
// ============================================================================

/// Queue provider backed by AWS SQS
pub struct AwsSqsProvider {
    client: Client,
}

impl AwsSqsProvider {
    /// Create a provider from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the region is empty or only one of
    /// the two static credential keys is set.
    pub async fn new(config: AwsSqsConfig) -> Result<Self, QueueError> {
        if config.region.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "region".to_string(),
            }
            .into());
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        match (config.access_key_id, config.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                loader = loader.credentials_provider(Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "queue-client-static",
                ));
            }
            (None, None) => {}
            _ => {
                return Err(ConfigurationError::Invalid {
                    message: "access_key_id and secret_access_key must be set together"
                        .to_string(),
                }
                .into())
            }
        }

        let sdk_config = loader.load().await;
        debug!(region = %config.region, endpoint = ?config.endpoint_url, "AWS SQS provider configured");
        Ok(Self::from_client(Client::new(&sdk_config)))
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_received(message: aws_sdk_sqs::types::Message) -> Result<ReceivedMessage, QueueError> {
        let message_id = message
            .message_id
            .ok_or_else(|| malformed_response("ReceiveMessage", "MessageId"))?;
        let receipt_handle = message
            .receipt_handle
            .ok_or_else(|| malformed_response("ReceiveMessage", "ReceiptHandle"))?;

        let mut attributes = BTreeMap::new();
        for (name, value) in message.message_attributes.unwrap_or_default() {
            match from_sqs_attribute(&value) {
                Some(converted) => {
                    attributes.insert(name, converted);
                }
                None => warn!(
                    attribute = %name,
                    data_type = %value.data_type(),
                    "Skipping message attribute with unsupported data type"
                ),
            }
        }

        Ok(ReceivedMessage {
            message_id: MessageId::from_str(&message_id)?,
            receipt_handle: ReceiptHandle::new(receipt_handle),
            body: message.body.unwrap_or_default(),
            attributes,
        })
    }
}

impl std::fmt::Debug for AwsSqsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSqsProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl QueueProvider for AwsSqsProvider {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueUrl, QueueError> {
        let output = self
            .client
            .create_queue()
            .queue_name(name.as_str())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, name.as_str()))?;

        let url = output
            .queue_url()
            .ok_or_else(|| malformed_response("CreateQueue", "QueueUrl"))?;
        Ok(QueueUrl::new(url.to_string())?)
    }

    async fn delete_queue(&self, queue: &QueueUrl) -> Result<(), QueueError> {
        self.client
            .delete_queue()
            .queue_url(queue.as_str())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, queue.as_str()))?;
        Ok(())
    }

    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueUrl>, QueueError> {
        let mut urls = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_queues()
                .set_queue_name_prefix((!prefix.is_empty()).then(|| prefix.to_string()))
                .max_results(LIST_QUEUES_PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, prefix))?;

            for url in output.queue_urls() {
                urls.push(QueueUrl::new(url.clone())?);
            }

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(urls)
    }

    async fn send_message(
        &self,
        queue: &QueueUrl,
        message: &Message,
    ) -> Result<MessageId, QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(queue.as_str())
            .message_body(&message.body)
            .set_message_attributes(to_sqs_attributes(&message.attributes)?)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, queue.as_str()))?;

        let message_id = output
            .message_id()
            .ok_or_else(|| malformed_response("SendMessage", "MessageId"))?;
        Ok(MessageId::from_str(message_id)?)
    }

    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendMessageBatchEntry],
    ) -> Result<BatchOutcome<SentBatchEntry>, QueueError> {
        let request_entries = entries
            .iter()
            .map(|entry| -> Result<SendMessageBatchRequestEntry, QueueError> {
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id.as_str())
                    .message_body(&entry.message.body)
                    .set_message_attributes(to_sqs_attributes(&entry.message.attributes)?)
                    .build()
                    .map_err(build_error)
            })
            .collect::<Result<Vec<_>, QueueError>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(queue.as_str())
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, queue.as_str()))?;

        let successful = output
            .successful()
            .iter()
            .map(|entry| -> Result<SentBatchEntry, QueueError> {
                Ok(SentBatchEntry {
                    id: BatchEntryId::new(entry.id().to_string())?,
                    message_id: MessageId::from_str(entry.message_id())?,
                })
            })
            .collect::<Result<Vec<_>, QueueError>>()?;

        let failed = output
            .failed()
            .iter()
            .map(|failure| -> Result<BatchEntryFailure, QueueError> {
                Ok(BatchEntryFailure {
                    id: BatchEntryId::new(failure.id().to_string())?,
                    code: failure.code().to_string(),
                    message: failure.message().map(str::to_string),
                    sender_fault: failure.sender_fault(),
                })
            })
            .collect::<Result<Vec<_>, QueueError>>()?;

        Ok(BatchOutcome { successful, failed })
    }

    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let attribute_names = request.attributes.to_request_names();

        let output = self
            .client
            .receive_message()
            .queue_url(queue.as_str())
            .max_number_of_messages(request.max_messages as i32)
            .wait_time_seconds(request.wait_time.num_seconds() as i32)
            .set_visibility_timeout(
                request
                    .visibility_timeout
                    .map(|timeout| timeout.num_seconds() as i32),
            )
            .set_message_attribute_names((!attribute_names.is_empty()).then_some(attribute_names))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, queue.as_str()))?;

        output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(Self::convert_received)
            .collect()
    }

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(queue.as_str())
            .receipt_handle(receipt.as_str())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, queue.as_str()))?;
        Ok(())
    }

    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteMessageBatchEntry],
    ) -> Result<BatchOutcome<BatchEntryId>, QueueError> {
        let request_entries = entries
            .iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(entry.id.as_str())
                    .receipt_handle(entry.receipt_handle.as_str())
                    .build()
                    .map_err(build_error)
            })
            .collect::<Result<Vec<_>, QueueError>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(queue.as_str())
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, queue.as_str()))?;

        let successful = output
            .successful()
            .iter()
            .map(|entry| BatchEntryId::new(entry.id().to_string()))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let failed = output
            .failed()
            .iter()
            .map(|failure| -> Result<BatchEntryFailure, QueueError> {
                Ok(BatchEntryFailure {
                    id: BatchEntryId::new(failure.id().to_string())?,
                    code: failure.code().to_string(),
                    message: failure.message().map(str::to_string),
                    sender_fault: failure.sender_fault(),
                })
            })
            .collect::<Result<Vec<_>, QueueError>>()?;

        Ok(BatchOutcome { successful, failed })
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AwsSqs
    }
}
