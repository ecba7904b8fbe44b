// Token endpoint calls: full login and access token refresh

use anyhow::{Context, Result};
use reqwest::{Client, Url};

use super::types::{LoginCredentials, LoginResponse, RefreshRequest, RefreshResponse};

const LOGIN_PATH: &str = "token/";
const REFRESH_PATH: &str = "token/refresh/";

fn endpoint(base_url: &Url, path: &str) -> Result<Url> {
    base_url
        .join(path)
        .with_context(|| format!("Invalid token endpoint: {}{}", base_url, path))
}

/// Obtain a fresh access/refresh pair with username and password
pub async fn login(
    client: &Client,
    base_url: &Url,
    credentials: &LoginCredentials,
) -> Result<LoginResponse> {
    let url = endpoint(base_url, LOGIN_PATH)?;
    tracing::info!(username = %credentials.username, "Logging in via {}", url);

    let response = client
        .post(url)
        .json(credentials)
        .send()
        .await
        .context("Failed to send login request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Login failed: {} - {}", status, error_text);
    }

    let data: LoginResponse = response
        .json()
        .await
        .context("Failed to parse login response")?;

    if data.access.is_empty() || data.refresh.is_empty() {
        anyhow::bail!("Login response does not contain both tokens");
    }

    Ok(data)
}

/// Exchange the refresh token for a new access token
///
/// The refresh token itself is never rotated here.
pub async fn refresh_access(client: &Client, base_url: &Url, refresh_token: &str) -> Result<String> {
    let url = endpoint(base_url, REFRESH_PATH)?;
    tracing::debug!("Refreshing access token via {}", url);

    let response = client
        .post(url)
        .json(&RefreshRequest {
            refresh: refresh_token,
        })
        .send()
        .await
        .context("Failed to send refresh request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Token refresh failed: {} - {}", status, error_text);
    }

    let data: RefreshResponse = response
        .json()
        .await
        .context("Failed to parse refresh response")?;

    if data.access.is_empty() {
        anyhow::bail!("Refresh response does not contain an access token");
    }

    Ok(data.access)
}
