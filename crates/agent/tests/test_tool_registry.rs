//! Tests for the tool registry and the modifyRecord tool

mod common;

use std::sync::Arc;

use common::{echo_updater, fields, MockUpdater};
use serde_json::json;
use tablechat_agent::tools::{to_provider_tool, ModifyRecordRequest, ToolRegistry};
use tablechat_agent::{AgentError, ModifyRecordTool, ToolResult, ToolStatus, ToolTrait};
use tablechat_airtable::{AirtableError, FieldValue};

#[test]
fn test_registry_new() {
    let registry = ToolRegistry::new();
    assert!(registry.names().is_empty());
    assert!(registry.definitions().is_empty());
}

#[test]
fn test_registry_default() {
    let registry: ToolRegistry = Default::default();
    assert!(registry.names().is_empty());
}

#[test]
fn test_registry_register_modify_record() {
    let mut registry = ToolRegistry::new();
    registry.register(ModifyRecordTool::new(Arc::new(echo_updater())));

    assert!(registry.has("modifyRecord"));
    assert!(!registry.has("nonexistent"));
    assert_eq!(registry.names(), vec!["modifyRecord".to_string()]);
    assert_eq!(registry.get("modifyRecord").unwrap().name(), "modifyRecord");
    assert!(registry.get("nonexistent").is_none());
}

#[test]
fn test_modify_record_schema() {
    let tool = ModifyRecordTool::new(Arc::new(echo_updater()));
    let definition = to_provider_tool(&tool);

    assert_eq!(definition.tool_type, "function");
    assert_eq!(definition.function.name, "modifyRecord");

    let params = &definition.function.parameters;
    assert_eq!(params["type"], "object");
    assert_eq!(params["additionalProperties"], false);
    assert_eq!(params["properties"]["recordId"]["type"], "string");
    assert_eq!(params["properties"]["tableName"]["type"], "string");
    assert_eq!(params["properties"]["updates"]["type"], "object");
    assert_eq!(params["required"], json!(["recordId", "tableName", "updates"]));
}

#[tokio::test]
async fn test_registry_execute_not_found() {
    let registry = ToolRegistry::new();
    let result = registry.execute("nonexistent", json!({})).await;

    match result {
        Err(AgentError::ToolNotFound(name)) => assert_eq!(name, "nonexistent"),
        other => panic!("Expected ToolNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_modify_record_success_echoes_store_fields() {
    let mut updater = MockUpdater::new();
    updater
        .expect_update_record()
        .withf(|table, record, updates| {
            table == "Contacts"
                && record == "rec1"
                && updates.get("Name") == Some(&FieldValue::from("Bob"))
        })
        .times(1)
        .returning(|_, _, _| Ok(fields(&[("Name", "Bob"), ("Email", "bob@example.com")])));

    let mut registry = ToolRegistry::new();
    registry.register(ModifyRecordTool::new(Arc::new(updater)));

    let output = registry
        .execute(
            "modifyRecord",
            json!({"recordId": "rec1", "tableName": "Contacts", "updates": {"Name": "Bob"}}),
        )
        .await
        .unwrap();

    let result: ToolResult = serde_json::from_str(&output).unwrap();
    assert_eq!(result.status, ToolStatus::Success);
    assert_eq!(result.message, "Record updated successfully.");
    assert_eq!(
        result.updates,
        Some(fields(&[("Name", "Bob"), ("Email", "bob@example.com")]))
    );
}

#[tokio::test]
async fn test_modify_record_store_failure_is_reported_not_raised() {
    let mut updater = MockUpdater::new();
    updater
        .expect_update_record()
        .times(1)
        .returning(|_, _, _| Err(AirtableError::ExternalApi("Unprocessable Entity".to_string())));

    let tool = ModifyRecordTool::new(Arc::new(updater));
    let output = tool
        .execute(json!({"recordId": "rec1", "tableName": "Contacts", "updates": {"Age": "x"}}))
        .await
        .unwrap();

    let result: ToolResult = serde_json::from_str(&output).unwrap();
    assert_eq!(result.status, ToolStatus::Failed);
    assert_eq!(result.message, "Failed to update Airtable record.");
    assert!(result.updates.is_none());
}

#[tokio::test]
async fn test_modify_record_invalid_arguments_propagate() {
    let mut updater = MockUpdater::new();
    updater.expect_update_record().never();

    let tool = ModifyRecordTool::new(Arc::new(updater));
    let result = tool
        .execute(json!({"recordId": "", "tableName": "Contacts", "updates": {}}))
        .await;

    assert!(matches!(result, Err(AgentError::InvalidToolArguments(_))));
}

#[tokio::test]
async fn test_modify_record_apply_direct() {
    let tool = ModifyRecordTool::new(Arc::new(echo_updater()));
    let request = ModifyRecordRequest::from_args(json!({
        "recordId": "rec2",
        "tableName": "Deals",
        "updates": {"Stage": "Won", "Amount": 1200, "Closed": true}
    }))
    .unwrap();

    let result = tool.apply(request).await;
    assert_eq!(result.status, ToolStatus::Success);

    let updates = result.updates.unwrap();
    assert_eq!(updates["Stage"], FieldValue::from("Won"));
    assert_eq!(updates["Amount"], FieldValue::from(1200));
    assert_eq!(updates["Closed"], FieldValue::from(true));
}
