// Typed wrappers over the authenticated request pipeline, one per endpoint

use anyhow::Context;
use reqwest::{Method, Url};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::auth::{TokenManager, TokioClock};
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::http_client::{build_http_client, ApiHttpClient};
use crate::models::{NewTask, Task, TaskPage, User};

/// Task manager REST API
#[derive(Clone)]
pub struct TasksApi {
    http: ApiHttpClient,
    base_url: Url,
}

impl TasksApi {
    /// `base_url` is the API root; a trailing slash is added if missing
    pub fn new(http: ApiHttpClient, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
        }
    }

    /// Wire the token store, token manager and HTTP client from configuration
    pub fn connect(config: &Config) -> Result<Self> {
        let client = build_http_client(config.connect_timeout, config.request_timeout)?;
        let store = config
            .open_token_store()
            .map_err(|e| ClientError::Storage(format!("{:#}", e)))?;

        let auth = TokenManager::new(
            config.auth_settings(),
            client.clone(),
            store,
            Arc::new(TokioClock),
        );

        Ok(Self::new(
            ApiHttpClient::from_client(client, auth),
            config.api_url.clone(),
        ))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http(&self) -> &ApiHttpClient {
        &self.http
    }

    /// Same API, bound to a caller-owned cancellation token
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            http: self.http.with_cancellation(cancel),
            base_url: self.base_url.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid endpoint: {}{}", self.base_url, path))
            .map_err(ClientError::from)
    }

    /// Fetch a page of tasks; `cursor` is the `next` URL of a previous page
    pub async fn get_tasks(&self, cursor: Option<&str>) -> Result<TaskPage> {
        let url = match cursor {
            Some(cursor) => Url::parse(cursor)
                .with_context(|| format!("Invalid pagination cursor: {}", cursor))?,
            None => self.endpoint("tasks/")?,
        };

        self.http.request_json(Method::GET, url, None).await
    }

    /// Follow `next` cursors until the list is exhausted
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>> {
        let mut page = self.get_tasks(None).await?;
        let mut tasks = std::mem::take(&mut page.results);

        while let Some(next) = page.next.take() {
            page = self.get_tasks(Some(&next)).await?;
            tasks.append(&mut page.results);
        }

        Ok(tasks)
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        let body = serde_json::to_value(task).context("Failed to serialize task")?;
        self.http
            .request_json(Method::POST, self.endpoint("tasks/")?, Some(&body))
            .await
    }

    /// Send the full task; the response body is ignored
    pub async fn update_task(&self, task: &Task) -> Result<()> {
        let body = serde_json::to_value(task).context("Failed to serialize task")?;
        let url = self.endpoint(&format!("tasks/{}/", task.id))?;
        self.http.request_empty(Method::PATCH, url, Some(&body)).await
    }

    pub async fn delete_task(&self, id: u64) -> Result<()> {
        let url = self.endpoint(&format!("tasks/{}/", id))?;
        self.http.request_empty(Method::DELETE, url, None).await
    }

    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.http
            .request_json(Method::GET, self.endpoint("users/")?, None)
            .await
    }
}

/// `Url::join` drops the last segment unless the base ends with `/`
pub fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        let url = normalize_base_url(Url::parse("http://localhost:8000/api").unwrap());
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        assert_eq!(url.join("tasks/").unwrap().as_str(), "http://localhost:8000/api/tasks/");

        let url = normalize_base_url(Url::parse("http://backend:8000/api/").unwrap());
        assert_eq!(url.as_str(), "http://backend:8000/api/");
    }
}
