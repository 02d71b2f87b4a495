pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod download;
pub mod error;
pub mod models;
pub mod notifier;
pub mod pagination;
pub mod response;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use cli::{Cli, Command};
pub use client::{ClientConfig, KontistClient, Payload};
pub use commands::run;
pub use error::{ApiError, Result};
pub use transport::{HttpTransport, Transport};
