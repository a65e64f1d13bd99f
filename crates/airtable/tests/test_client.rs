//! Tests for the Airtable client against a local mock server

use mockito::Matcher;
use serde_json::json;
use tablechat_airtable::{AirtableClient, AirtableError, FieldValue, Fields, RecordUpdater};

fn updates(pairs: &[(&str, &str)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
        .collect()
}

#[tokio::test]
async fn test_update_record_sends_patch_and_returns_fields() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/appTEST/Contacts/rec123")
        .match_header("authorization", "Bearer pat-secret")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"fields": {"Name": "Bob"}})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "rec123",
                "createdTime": "2024-01-01T00:00:00.000Z",
                "fields": {"Name": "Bob", "Email": "bob@example.com"}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let client = AirtableClient::new("pat-secret", "appTEST").with_api_base(server.url());
    let fields = client
        .update_record("Contacts", "rec123", updates(&[("Name", "Bob")]))
        .await
        .unwrap();

    assert_eq!(fields.len(), 2);
    assert_eq!(fields["Name"], FieldValue::from("Bob"));
    assert_eq!(fields["Email"], FieldValue::from("bob@example.com"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_update_record_non_success_carries_status_text() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/appTEST/Contacts/rec123")
        .with_status(422)
        .with_body(json!({"error": {"type": "INVALID_VALUE_FOR_COLUMN"}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = AirtableClient::new("pat", "appTEST").with_api_base(server.url());
    let result = client
        .update_record("Contacts", "rec123", updates(&[("Age", "x")]))
        .await;

    match result {
        Err(AirtableError::ExternalApi(text)) => assert_eq!(text, "Unprocessable Entity"),
        other => panic!("Expected ExternalApi error, got {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_update_record_unauthorized() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PATCH", "/appTEST/Contacts/rec123")
        .with_status(401)
        .create_async()
        .await;

    let client = AirtableClient::new("", "appTEST").with_api_base(server.url());
    let err = client
        .update_record("Contacts", "rec123", Fields::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Airtable API error: Unauthorized");
}

#[tokio::test]
async fn test_update_record_missing_fields_member() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PATCH", "/appTEST/Contacts/rec123")
        .with_status(200)
        .with_body(json!({"id": "rec123"}).to_string())
        .create_async()
        .await;

    let client = AirtableClient::new("pat", "appTEST").with_api_base(server.url());
    let result = client
        .update_record("Contacts", "rec123", updates(&[("Name", "Bob")]))
        .await;
    assert!(matches!(result, Err(AirtableError::InvalidResponse)));
}

#[tokio::test]
async fn test_update_record_unparseable_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PATCH", "/appTEST/Contacts/rec123")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let client = AirtableClient::new("pat", "appTEST").with_api_base(server.url());
    let result = client
        .update_record("Contacts", "rec123", updates(&[("Name", "Bob")]))
        .await;
    assert!(matches!(result, Err(AirtableError::Request(_))));
}

#[tokio::test]
async fn test_get_record_returns_fields() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/appTEST/Contacts/rec9")
        .match_header("authorization", "Bearer pat")
        .with_status(200)
        .with_body(json!({"id": "rec9", "fields": {"Name": "Current Name", "Seats": 3}}).to_string())
        .create_async()
        .await;

    let client = AirtableClient::new("pat", "appTEST").with_api_base(server.url());
    let fields = client.get_record("Contacts", "rec9").await.unwrap();

    assert_eq!(fields["Name"], FieldValue::from("Current Name"));
    assert_eq!(fields["Seats"], FieldValue::from(3));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_record_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/appTEST/Contacts/missing")
        .with_status(404)
        .create_async()
        .await;

    let client = AirtableClient::new("pat", "appTEST").with_api_base(server.url());
    match client.get_record("Contacts", "missing").await {
        Err(AirtableError::ExternalApi(text)) => assert_eq!(text, "Not Found"),
        other => panic!("Expected ExternalApi error, got {:?}", other),
    }
}
