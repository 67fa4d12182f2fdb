//! Minimal HTTP client for the OpenCode Server session API.

pub mod client;
pub mod error;
pub mod types;

pub use client::OpenCodeClient;
pub use error::{OpenCodeError, Result};
pub use types::*;
