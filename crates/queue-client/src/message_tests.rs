//! Tests for message types.

use super::*;

// ============================================================================
// Identifier Tests
// ============================================================================

#[test]
fn test_queue_name_validation() {
    // Valid names
    assert!(QueueName::new("IntegrationTest_SimpleQueue".to_string()).is_ok());
    assert!(QueueName::new("queue-123".to_string()).is_ok());
    assert!(QueueName::new("orders.fifo".to_string()).is_ok());
    assert!(QueueName::new("a".repeat(80)).is_ok());

    // Invalid names
    assert!(QueueName::new("".to_string()).is_err());
    assert!(QueueName::new("a".repeat(81)).is_err());
    assert!(QueueName::new("special@chars".to_string()).is_err());
    assert!(QueueName::new("dotted.name".to_string()).is_err());
    assert!(QueueName::new(".fifo".to_string()).is_err());
}

#[test]
fn test_queue_name_with_prefix() {
    let name = QueueName::with_prefix("IntegrationTest_", "BatchQueue").unwrap();
    assert_eq!(name.as_str(), "IntegrationTest_BatchQueue");
    assert!(!name.is_fifo());
    assert!(QueueName::new("orders.fifo".to_string()).unwrap().is_fifo());
}

#[test]
fn test_queue_url_parsing() {
    let url = QueueUrl::new(
        "https://sqs.us-east-1.amazonaws.com/123456789012/IntegrationTest_SimpleQueue".to_string(),
    )
    .unwrap();
    assert_eq!(url.queue_name(), "IntegrationTest_SimpleQueue");

    assert!(QueueUrl::new("not a url".to_string()).is_err());
    assert!(QueueUrl::new("http://localhost:4566/".to_string()).is_err());
}

#[test]
fn test_message_id_generation() {
    let id1 = MessageId::new();
    let id2 = MessageId::new();
    assert_ne!(id1, id2);
    assert!(!id1.as_str().is_empty());
    assert!("".parse::<MessageId>().is_err());
}

#[test]
fn test_batch_entry_id_validation() {
    assert!(BatchEntryId::new("1".to_string()).is_ok());
    assert!(BatchEntryId::new("entry_1-a".to_string()).is_ok());

    assert!(BatchEntryId::new("".to_string()).is_err());
    assert!(BatchEntryId::new("a".repeat(81)).is_err());
    assert!(BatchEntryId::new("has space".to_string()).is_err());
}

// ============================================================================
// Attribute Tests
// ============================================================================

#[test]
fn test_attribute_value_data_types() {
    assert_eq!(MessageAttributeValue::string("v").data_type(), "String");
    assert_eq!(MessageAttributeValue::number(42).data_type(), "Number");
    assert_eq!(
        MessageAttributeValue::binary(vec![1u8, 2, 3]).data_type(),
        "Binary"
    );

    assert_eq!(MessageAttributeValue::number(1.5).as_str(), Some("1.5"));
    assert_eq!(MessageAttributeValue::binary(vec![1u8]).as_str(), None);
    assert_eq!(
        MessageAttributeValue::binary(vec![7u8]).as_bytes(),
        Some(&Bytes::from(vec![7u8]))
    );
}

#[test]
fn test_parse_number_rejects_non_numbers() {
    assert!(MessageAttributeValue::parse_number("-12.5e3").is_ok());
    assert!(MessageAttributeValue::parse_number("abc").is_err());
    assert!(MessageAttributeValue::parse_number("inf").is_err());
    assert!(MessageAttributeValue::parse_number("NaN").is_err());
}

#[test]
fn test_binary_attribute_serializes_as_base64() {
    let value = MessageAttributeValue::binary(vec![0u8, 255]);
    let json = serde_json::to_value(&value).unwrap();

    assert_eq!(json["data_type"], "Binary");
    assert_eq!(json["value"], "AP8=");

    let back: MessageAttributeValue = serde_json::from_value(json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_attribute_deserialization_rejects_bad_base64() {
    let json = serde_json::json!({ "data_type": "Binary", "value": "not base64!" });
    assert!(serde_json::from_value::<MessageAttributeValue>(json).is_err());

    let json = serde_json::json!({ "data_type": "Number", "value": "42" });
    let value: MessageAttributeValue = serde_json::from_value(json).unwrap();
    assert_eq!(value, MessageAttributeValue::Number("42".to_string()));
}

#[test]
fn test_attribute_name_rules() {
    assert!(validate_attribute_name("CustomMessageAttribute").is_ok());
    assert!(validate_attribute_name("trace.id-1_x").is_ok());

    assert!(validate_attribute_name("").is_err());
    assert!(validate_attribute_name(&"a".repeat(257)).is_err());
    assert!(validate_attribute_name("AWS.TraceHeader").is_err());
    assert!(validate_attribute_name("amazon.thing").is_err());
    assert!(validate_attribute_name(".leading").is_err());
    assert!(validate_attribute_name("trailing.").is_err());
    assert!(validate_attribute_name("double..period").is_err());
    assert!(validate_attribute_name("spa ce").is_err());
}

#[test]
fn test_attribute_filter_matching() {
    assert!(!AttributeFilter::None.matches("CustomMessageAttribute"));
    assert!(AttributeFilter::All.matches("CustomMessageAttribute"));

    let names = AttributeFilter::Names(vec!["trace.*".to_string(), "exact".to_string()]);
    assert!(names.matches("trace.id"));
    assert!(names.matches("exact"));
    assert!(!names.matches("exactly"));
    assert!(!names.matches("other"));

    let wildcard = AttributeFilter::Names(vec![".*".to_string()]);
    assert!(wildcard.matches("anything"));
}

#[test]
fn test_attribute_filter_request_names() {
    assert!(AttributeFilter::None.to_request_names().is_empty());
    assert_eq!(AttributeFilter::All.to_request_names(), vec!["All"]);
}

// ============================================================================
// Message Tests
// ============================================================================

#[test]
fn test_message_builder() {
    let message = Message::new("x".repeat(10)).with_attribute(
        "CustomMessageAttribute",
        MessageAttributeValue::string("CustomMessageAttributeValue"),
    );

    assert_eq!(message.body, "xxxxxxxxxx");
    assert_eq!(message.attributes.len(), 1);
    assert_eq!(
        message.attributes["CustomMessageAttribute"].as_str(),
        Some("CustomMessageAttributeValue")
    );
    assert!(message.validate().is_ok());
}

#[test]
fn test_message_size_counts_attributes() {
    let message = Message::new("body").with_attribute("key", MessageAttributeValue::string("value"));

    // body (4) + name (3) + "String" (6) + value (5)
    assert_eq!(message.size_in_bytes(), 18);
}

#[test]
fn test_message_validation_failures() {
    assert!(matches!(
        Message::new("").validate(),
        Err(ValidationError::Required { .. })
    ));

    let mut crowded = Message::new("body");
    for i in 0..=MAX_MESSAGE_ATTRIBUTES {
        crowded = crowded.with_attribute(format!("attr{}", i), MessageAttributeValue::number(i));
    }
    assert!(matches!(
        crowded.validate(),
        Err(ValidationError::OutOfRange { .. })
    ));

    let reserved = Message::new("body").with_attribute("AWS.x", MessageAttributeValue::string("v"));
    assert!(reserved.validate().is_err());

    let bad_number =
        Message::new("body").with_attribute("n", MessageAttributeValue::Number("1x".to_string()));
    assert!(bad_number.validate().is_err());
}

// ============================================================================
// Request Tests
// ============================================================================

#[test]
fn test_receive_request_defaults() {
    let request = ReceiveRequest::new();
    assert_eq!(request.max_messages, 1);
    assert_eq!(request.attributes, AttributeFilter::None);
    assert_eq!(request.wait_time, Duration::zero());
    assert!(request.visibility_timeout.is_none());
}

#[test]
fn test_receive_request_builder() {
    let request = ReceiveRequest::new()
        .with_max_messages(5)
        .with_all_attributes()
        .with_wait_time(Duration::seconds(2))
        .with_visibility_timeout(Duration::seconds(10));

    assert_eq!(request.max_messages, 5);
    assert_eq!(request.attributes, AttributeFilter::All);
    assert_eq!(request.wait_time, Duration::seconds(2));
    assert_eq!(request.visibility_timeout, Some(Duration::seconds(10)));
}

#[test]
fn test_batch_outcome_success_flag() {
    let mut outcome: BatchOutcome<BatchEntryId> = BatchOutcome::default();
    assert!(outcome.is_complete_success());

    outcome.failed.push(BatchEntryFailure {
        id: BatchEntryId::new("1".to_string()).unwrap(),
        code: "ReceiptHandleIsInvalid".to_string(),
        message: None,
        sender_fault: true,
    });
    assert!(!outcome.is_complete_success());
}
