use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

pub struct ApiClient {
    client: Client,
    base_url: String,
    webhook_secret: Option<String>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String, webhook_secret: Option<String>) -> Self {
        Self {
            client,
            base_url,
            webhook_secret,
        }
    }

    /// Calls the publish webhook and returns the reported delivery status
    /// (`broadcasted`, `delivered` or `not_delivered`).
    pub async fn publish(
        &self,
        event: Option<&str>,
        data: Value,
        user_id: Option<&str>,
    ) -> Result<String> {
        let url = format!("{}/webhooks/sse", self.base_url);

        let mut request = self.client.post(&url).json(&json!({
            "event": event,
            "data": data,
            "user_id": user_id,
        }));
        if let Some(secret) = &self.webhook_secret {
            request = request.header(WEBHOOK_SECRET_HEADER, secret);
        }

        let response = request.send().await.context("Failed to call publish webhook")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Publish failed: {} - Response: {}", status, body);
        }

        let api_response: Value = response.json().await.context("Failed to parse response")?;

        // Extract the status from ApiResponse wrapper
        api_response["data"]["status"]
            .as_str()
            .map(str::to_string)
            .context("No status in response")
    }

    /// Returns the user ids the server currently holds a connection for.
    pub async fn connected_users(&self) -> Result<Vec<String>> {
        let url = format!("{}/sse/clients", self.base_url);

        let mut request = self.client.get(&url);
        if let Some(secret) = &self.webhook_secret {
            request = request.header(WEBHOOK_SECRET_HEADER, secret);
        }

        let response = request.send().await.context("Failed to list clients")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to list clients: {}", response.status());
        }

        let api_response: Value = response.json().await.context("Failed to parse response")?;

        api_response["data"]["user_ids"]
            .as_array()
            .context("No user_ids array in response")
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_str().map(str::to_string))
                    .collect()
            })
    }
}
