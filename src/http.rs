use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{error, info};

use crate::error::{AppError, Result};

// One client for the whole process so every platform shares the pool
static CLIENT: OnceCell<Client> = OnceCell::new();

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns the process-wide client, building it with `timeout` on first use.
/// Later calls reuse the first client whatever timeout they pass.
pub fn shared_client(timeout: Duration) -> Result<Client> {
    CLIENT
        .get_or_try_init(|| build_client(timeout))
        .cloned()
        .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// A zero `timeout` leaves requests unbounded; only connecting is capped.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    let builder = ClientBuilder::new().pool_max_idle_per_host(10);

    let builder = if timeout.is_zero() {
        builder.connect_timeout(CONNECT_TIMEOUT)
    } else {
        builder
            .timeout(timeout)
            .connect_timeout(timeout.min(CONNECT_TIMEOUT))
    };

    builder.build()
}

/// A single outbound GET against a platform search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub host: String,
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
}

impl ApiRequest {
    pub fn new(host: impl Into<String>, path: &'static str) -> Self {
        Self {
            host: host.into(),
            path,
            query: Vec::new(),
        }
    }

    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    pub fn url(&self) -> String {
        format!("https://{}{}", self.host, self.path)
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request and returns the decoded JSON body.
    async fn get_json(&self, request: &ApiRequest) -> Result<Value>;
}

/// Talks to RapidAPI-hosted search endpoints.
pub struct RapidApiTransport {
    client: Client,
    api_key: String,
}

impl RapidApiTransport {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Transport for RapidApiTransport {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value> {
        let url = request.url();

        let response = self
            .client
            .get(&url)
            .query(&request.query)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &request.host)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "RapidAPI request failed");
                AppError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = status.as_u16(), "RapidAPI request failed");
            return Err(AppError::FetchError(format!(
                "{} returned HTTP {}",
                request.host, status
            )));
        }

        info!(url = %url, status = status.as_u16(), "RapidAPI request successful");

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            AppError::ParseError(format!("{} returned invalid JSON: {}", request.host, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builds_https_url_and_keeps_param_order() {
        let request = ApiRequest::new("twitter241.p.rapidapi.com", "/search-v2")
            .param("type", "Top")
            .param("count", "10")
            .param("query", "rust lang");

        assert_eq!(request.url(), "https://twitter241.p.rapidapi.com/search-v2");
        assert_eq!(
            request.query.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec!["type", "count", "query"]
        );
        assert_eq!(request.query_value("query"), Some("rust lang"));
        assert_eq!(request.query_value("cursor"), None);
    }

    /// Answers a single request with `200 {}`.
    async fn one_shot_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let reply = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}";
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}/search", addr)
    }

    #[tokio::test]
    async fn zero_timeout_means_no_timeout() {
        let url = one_shot_server().await;
        let client = build_client(Duration::ZERO).unwrap();

        let response = client.get(&url).send().await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn nonzero_timeout_still_allows_fast_responses() {
        let url = one_shot_server().await;
        let client = build_client(Duration::from_secs(5)).unwrap();

        let response = client.get(&url).send().await.unwrap();
        assert!(response.status().is_success());
    }

    #[test]
    fn shared_client_is_built_once() {
        let first = shared_client(Duration::from_secs(3));
        let second = shared_client(Duration::from_secs(30));
        assert!(first.is_ok());
        assert!(second.is_ok());
    }
}
