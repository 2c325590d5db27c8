//! Commerce REST API client.
//!
//! # Architecture
//!
//! - JSON over HTTP with `reqwest`; credentials travel as cookies
//! - Every response uses the `{ success, message, data }` envelope
//! - Concurrent identical GETs are collapsed into one in-flight request
//!   (`moka` coalesces the loads, the entry is dropped once it resolves)
//! - A `401` triggers one session refresh and one retry
//!
//! # Example
//!
//! ```rust,ignore
//! use gymfuel_storefront::api::{CommerceClient, Envelope, RemoteCart};
//!
//! let client = CommerceClient::new(&config.api)?;
//! let cart: Envelope<RemoteCart> = client.get("/cart").await?;
//! ```

mod client;
pub mod types;

pub use client::CommerceClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when calling the commerce API.
///
/// Variants carry strings rather than source errors so that one result can be
/// shared between the callers of a deduplicated request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Client construction failed.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Request(_) => "Failed to fetch data".to_string(),
            Self::Decode(_) | Self::Config(_) => "Something went wrong".to_string(),
        }
    }

    /// HTTP status, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
