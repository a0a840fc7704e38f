//! REST API client module for the school backend.
//!
//! This module provides the `ApiClient`, the single request dispatcher
//! shared by the staff and parent sessions. The backend hands out opaque
//! bearer tokens; the dispatcher attaches whichever one the request path
//! calls for.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
pub use reqwest::Method;
