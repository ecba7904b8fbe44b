// Authentication module
// Manages the access/refresh token lifecycle and its durable storage

mod clock;
mod manager;
mod refresh;
mod store;
mod types;

pub use clock::{Clock, TokioClock};
pub use manager::{AuthSettings, TokenManager, DEFAULT_REFRESH_INTERVAL};
pub use store::{MemoryTokenStore, SqliteTokenStore, TokenStore};
pub use types::{AuthState, LoginCredentials, TokenPair, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
