use anyhow::Context;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenManager;
use crate::error::{ClientError, Result};

/// Retries allowed after a 401 before the failure is surfaced
pub const MAX_AUTH_RETRIES: u32 = 1;

/// Authenticated HTTP client for the task API
///
/// Cheap to clone; clones share the connection pool and token manager.
#[derive(Clone)]
pub struct ApiHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    auth: Arc<TokenManager>,

    /// Cancels every request issued through this handle
    cancel: CancellationToken,
}

impl ApiHttpClient {
    pub fn from_client(client: Client, auth: Arc<TokenManager>) -> Self {
        Self {
            client,
            auth,
            cancel: CancellationToken::new(),
        }
    }

    /// Same client, bound to a caller-owned cancellation token
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            client: self.client.clone(),
            auth: self.auth.clone(),
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn auth(&self) -> &Arc<TokenManager> {
        &self.auth
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn cancellable<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            output = fut => Ok(output),
        }
    }

    /// Execute an authenticated request
    /// Automatically handles:
    /// - no token held: logs in first
    /// - 401: refreshes the token and retries once
    pub async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let mut attempt = 0;
        let mut token = self.cancellable(self.auth.access_token()).await??;

        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        loop {
            let mut builder = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(&token)
                .header(CONTENT_TYPE, "application/json");
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let result = self.cancellable(builder.send()).await?;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        tracing::debug!(status = %status, "Request successful");
                        return Ok(response);
                    }

                    if status == StatusCode::UNAUTHORIZED && attempt < MAX_AUTH_RETRIES {
                        tracing::warn!("Token expired, refreshing and retrying...");

                        token = self
                            .cancellable(self.auth.refresh_rejected(&token))
                            .await??;
                        attempt += 1;
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();

                    tracing::error!(
                        status = status.as_u16(),
                        method = %method,
                        url = %url,
                        response_body = %error_text,
                        attempt = attempt + 1,
                        "HTTP request failed with error response"
                    );

                    return Err(ClientError::Request {
                        method: method.to_string(),
                        url: url.to_string(),
                        status: Some(status.as_u16()),
                        message: if error_text.is_empty() {
                            status.to_string()
                        } else {
                            format!("{} - {}", status, error_text)
                        },
                    });
                }

                Err(e) => {
                    let error_kind = classify(&e);

                    tracing::error!(
                        error_kind = error_kind,
                        error = %e,
                        method = %method,
                        url = %url,
                        "HTTP request error"
                    );

                    return Err(ClientError::Request {
                        method: method.to_string(),
                        url: url.to_string(),
                        status: None,
                        message: format!("{} (kind: {})", e, error_kind),
                    });
                }
            }
        }
    }

    /// Execute a request and decode its JSON body
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let response = self.request(method.clone(), url.clone(), body).await?;

        let bytes = self
            .cancellable(response.bytes())
            .await?
            .map_err(|e| ClientError::Request {
                method: method.to_string(),
                url: url.to_string(),
                status: None,
                message: format!("{} (kind: {})", e, classify(&e)),
            })?;

        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(format!("{} {}: {}", method, url, e)))
    }

    /// Execute a request whose response body is not needed
    pub async fn request_empty(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<()> {
        self.request(method, url, body).await?;
        Ok(())
    }
}

/// Build the pooled client shared by the token manager and the API client
pub fn build_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .context("Failed to create HTTP client")
}

fn classify(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}
