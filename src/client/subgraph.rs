//! Thin GraphQL-over-HTTP client for subgraph endpoints.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;

#[derive(serde::Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
}

#[derive(serde::Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorItem>,
}

#[derive(serde::Deserialize)]
struct GraphqlErrorItem {
    message: String,
}

/// Executes GraphQL documents against a given endpoint.
///
/// The client is endpoint-agnostic; callers pass the network's data or
/// blocks endpoint per query. The request timeout is the only watchdog an
/// in-flight fetch has.
#[derive(Clone)]
pub struct SubgraphClient {
    http: reqwest::Client,
}

impl SubgraphClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }

    /// Posts one query document and decodes `data` into `T`.
    ///
    /// GraphQL-level errors are mapped to `Err` even on HTTP 200, so a
    /// composite fetch treats them like any failed leg.
    pub async fn query<T: DeserializeOwned>(&self, endpoint: &str, query: &str) -> Result<T> {
        let response = self
            .http
            .post(endpoint)
            .json(&GraphqlRequest { query })
            .send()
            .await
            .with_context(|| format!("Subgraph request to {endpoint} failed"))?
            .error_for_status()
            .with_context(|| format!("Subgraph at {endpoint} answered with an error status"))?;

        let envelope: GraphqlResponse<T> = response
            .json()
            .await
            .context("Failed to decode subgraph response")?;

        if let Some(first) = envelope.errors.first() {
            bail!("Subgraph query error: {}", first.message);
        }

        envelope
            .data
            .context("Subgraph response carried no data")
    }

    /// Same as [`query`](Self::query) but keeps the data as raw JSON, for
    /// documents with computed aliases.
    pub async fn query_value(&self, endpoint: &str, query: &str) -> Result<serde_json::Value> {
        self.query(endpoint, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Tokens {
        tokens: Vec<TokenRow>,
    }

    #[derive(serde::Deserialize)]
    struct TokenRow {
        id: String,
    }

    #[tokio::test]
    async fn decodes_data_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/subgraph")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"tokens": [{"id": "0xaa"}]}}"#)
            .create_async()
            .await;

        let client = SubgraphClient::new(Duration::from_secs(5)).unwrap();
        let endpoint = format!("{}/subgraph", server.url());
        let data: Tokens = client.query(&endpoint, "query { tokens { id } }").await.unwrap();

        mock.assert_async().await;
        assert_eq!(data.tokens[0].id, "0xaa");
    }

    #[tokio::test]
    async fn graphql_errors_become_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/subgraph")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": null, "errors": [{"message": "indexing error"}]}"#)
            .create_async()
            .await;

        let client = SubgraphClient::new(Duration::from_secs(5)).unwrap();
        let endpoint = format!("{}/subgraph", server.url());
        let result: Result<Tokens> = client.query(&endpoint, "query { tokens { id } }").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn http_errors_become_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/subgraph")
            .with_status(502)
            .create_async()
            .await;

        let client = SubgraphClient::new(Duration::from_secs(5)).unwrap();
        let endpoint = format!("{}/subgraph", server.url());
        let result: Result<Tokens> = client.query(&endpoint, "query { tokens { id } }").await;

        assert!(result.is_err());
    }
}
