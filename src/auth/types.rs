// Authentication types

use serde::{Deserialize, Serialize};

/// Durable storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Durable storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Lifecycle state of the token manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No access token held
    Unauthenticated,
    /// Access token held
    Authenticated,
    /// Refresh or re-login in flight
    Refreshing,
}

/// Username/password used for the full login
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Tokens currently held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// `POST token/` response
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
}

/// `POST token/refresh/` request
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// `POST token/refresh/` response
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}
