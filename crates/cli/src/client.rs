//! API client for communicating with a FuelWatch agent

use anyhow::{Context, Result};
use fuelwatch_core::{BatchReport, DispatchResult, HealthResponse, ReportKind};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// API client for the agent's HTTP API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Submit an ordered batch of observations for classification
    ///
    /// Records are forwarded as-is; the agent decodes and validates each one.
    pub async fn submit_observations(&self, batch: &[Value]) -> Result<IngestResponse> {
        self.post("api/v1/observations", &batch).await
    }

    /// Fetch component health
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("healthz").await
    }

    /// Ask the agent to broadcast a fleet report
    pub async fn broadcast_report(&self, kind: ReportKind) -> Result<DispatchResult> {
        self.post(&format!("api/v1/reports/{}", kind), &Value::Null)
            .await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub report: BatchReport,
    pub dispatches: Vec<DispatchResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_observations_parses_report() {
        let record = serde_json::json!({
            "generatorId": "G1",
            "timestamp": "2024-06-03T08:00:00Z",
            "fuelUsed": "n/a",
            "runtimeHours": 5
        });

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/observations")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(serde_json::json!([record.clone()])))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "report": {
                        "stats": {
                            "totalFuelUsage": 50.0,
                            "activeGenerators": 1,
                            "totalGenerators": 1,
                            "riskScore": 100,
                            "activity": [],
                            "alerts": ["Suspicious activity detected in G1"]
                        },
                        "classified": [],
                        "transitions": [],
                        "rejected": []
                    },
                    "dispatches": []
                }"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.submit_observations(&[record]).await.unwrap();

        assert_eq!(response.report.stats.risk_score, 100);
        assert_eq!(response.report.stats.alerts.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/reports/weekly")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .broadcast_report(ReportKind::Weekly)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
