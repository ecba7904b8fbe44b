// Tasks client - library root

pub mod api;
pub mod auth;
pub mod board;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;

pub use api::TasksApi;
pub use board::TaskBoard;
pub use error::{ClientError, Result};
