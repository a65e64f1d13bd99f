//! Airtable REST client

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::{json, Value};
use tracing::debug;

use tablechat_config::AirtableConfig;

use crate::{AirtableError, Fields, RecordUpdater, Result};

const DEFAULT_API_BASE: &str = "https://api.airtable.com/v0";

/// Client for one Airtable base, authenticated with a static token.
///
/// No timeout is set on requests; a stalled connection stalls the caller.
pub struct AirtableClient {
    client: Client,
    api_key: String,
    base_id: String,
    api_base: String,
}

impl AirtableClient {
    pub fn new(api_key: impl Into<String>, base_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_id: base_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the client at another API root (proxies, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn from_config(config: &AirtableConfig) -> Self {
        Self::new(&config.api_key, &config.base_id).with_api_base(&config.api_base)
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.base_id.is_empty()
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// `{api_base}/{base_id}/{table_name}/{record_id}` with each segment escaped
    pub fn record_url(&self, table_name: &str, record_id: &str) -> Result<Url> {
        let mut url =
            Url::parse(&self.api_base).map_err(|e| AirtableError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AirtableError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .push(&self.base_id)
            .push(table_name)
            .push(record_id);
        Ok(url)
    }

    /// Fetch the current fields of a record
    pub async fn get_record(&self, table_name: &str, record_id: &str) -> Result<Fields> {
        let url = self.record_url(table_name, record_id)?;
        debug!("Fetching record {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::read_fields(response).await
    }

    async fn read_fields(response: Response) -> Result<Fields> {
        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .unwrap_or("Unknown Status")
                .to_string();
            return Err(AirtableError::ExternalApi(reason));
        }

        let mut body: Value = response.json().await?;
        let fields = body
            .get_mut("fields")
            .map(Value::take)
            .ok_or(AirtableError::InvalidResponse)?;
        Ok(serde_json::from_value(fields)?)
    }
}

#[async_trait]
impl RecordUpdater for AirtableClient {
    async fn update_record(
        &self,
        table_name: &str,
        record_id: &str,
        updates: Fields,
    ) -> Result<Fields> {
        let url = self.record_url(table_name, record_id)?;
        debug!(
            "Patching record {}/{} with {} field(s)",
            table_name,
            record_id,
            updates.len()
        );

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": updates }))
            .send()
            .await?;

        Self::read_fields(response).await
    }
}
