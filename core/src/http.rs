use crate::error::{Result, ScanError};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("scanrelay/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| ScanError::Decode {
            context: context.to_string(),
            source: e,
        })
    }
}

/// Thin transport over `reqwest`: every call carries its own deadline and
/// nothing is retried here.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScanError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(
        &self,
        path: &str,
        timeout: Duration,
        operation: &'static str,
    ) -> Result<HttpResponse> {
        self.send(self.client.get(self.url(path)), timeout, operation)
            .await
    }

    pub async fn post<B>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
        operation: &'static str,
    ) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.client.post(self.url(path)).json(body), timeout, operation)
            .await
    }

    pub async fn delete(
        &self,
        path: &str,
        timeout: Duration,
        operation: &'static str,
    ) -> Result<HttpResponse> {
        self.send(self.client.delete(self.url(path)), timeout, operation)
            .await
    }

    async fn send(
        &self,
        request: RequestBuilder,
        timeout: Duration,
        operation: &'static str,
    ) -> Result<HttpResponse> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout, operation))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout, operation))?;

        tracing::debug!(operation, status = status.as_u16(), "scanner responded");

        Ok(HttpResponse { status, body })
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration, operation: &'static str) -> ScanError {
    if e.is_timeout() {
        ScanError::Timeout {
            operation,
            after: timeout,
        }
    } else if e.is_builder() {
        ScanError::InvalidInput {
            message: format!("could not build {} request: {}", operation, e),
        }
    } else {
        ScanError::ServiceUnavailable {
            message: format!("{} failed: {}", operation, e),
        }
    }
}
