// Shared helpers for the integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

use tasks_client::auth::{
    AuthSettings, Clock, LoginCredentials, MemoryTokenStore, TokenManager, TokenStore,
    ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
use tasks_client::http_client::ApiHttpClient;
use tasks_client::TasksApi;

/// Clock whose sleeps only finish when the test calls `fire`
pub struct ManualClock {
    tx: broadcast::Sender<()>,
    scheduled: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(16);
        Arc::new(Self {
            tx,
            scheduled: Mutex::new(Vec::new()),
        })
    }

    /// Wake every sleep registered so far
    pub fn fire(&self) {
        let _ = self.tx.send(());
    }

    pub fn scheduled(&self) -> Vec<Duration> {
        self.scheduled.lock().unwrap().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.scheduled.lock().unwrap().push(duration);
        let mut rx = self.tx.subscribe();
        Box::pin(async move {
            let _ = rx.recv().await;
        })
    }
}

pub struct Harness {
    pub api: TasksApi,
    pub auth: Arc<TokenManager>,
    pub store: Arc<MemoryTokenStore>,
    pub clock: Arc<ManualClock>,
}

/// Client against `server_url` with optional pre-stored tokens
pub fn harness(server_url: &str, access: Option<&str>, refresh: Option<&str>) -> Harness {
    let store = Arc::new(MemoryTokenStore::new());
    if let Some(access) = access {
        store.save(ACCESS_TOKEN_KEY, access).unwrap();
    }
    if let Some(refresh) = refresh {
        store.save(REFRESH_TOKEN_KEY, refresh).unwrap();
    }

    let clock = ManualClock::new();
    let base_url = reqwest::Url::parse(&format!("{}/api/", server_url)).unwrap();
    let settings = AuthSettings {
        base_url: base_url.clone(),
        credentials: LoginCredentials {
            username: "admin".to_string(),
            password: "admin".to_string(),
        },
        refresh_interval: Duration::from_secs(240),
    };

    let client = reqwest::Client::new();
    let auth = TokenManager::new(settings, client.clone(), store.clone(), clock.clone());
    let api = TasksApi::new(ApiHttpClient::from_client(client, auth.clone()), base_url);

    Harness {
        api,
        auth,
        store,
        clock,
    }
}

pub fn task_json(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "due_date": "2024-01-05",
        "status": "pending",
        "created_at": "2024-01-01T09:00:00Z",
        "updated_at": "2024-01-01T09:00:00Z",
        "assigned_to": 1,
        "assigned_to_username": "admin"
    })
}

pub fn page_json(next: Option<String>, results: Vec<Value>) -> String {
    json!({
        "count": results.len(),
        "next": next,
        "previous": null,
        "results": results
    })
    .to_string()
}

/// Poll until `check` holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
