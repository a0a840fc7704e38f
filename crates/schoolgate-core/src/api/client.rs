//! Request dispatcher for the school backend.
//!
//! This module provides the `ApiClient` struct. Every request is classified
//! by its path and carries the bearer token of the matching session: the
//! parent session for the parent namespace, the staff session otherwise.

use anyhow::Result;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::session::{Parent, SessionStore, Staff};
use crate::config::Config;
use crate::namespace::Namespace;

use super::ApiError;

/// API client shared by both sessions.
/// Clone is cheap - reqwest::Client and the stores are reference counted.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    staff: SessionStore<Staff>,
    parent: SessionStore<Parent>,
}

impl ApiClient {
    /// Create a new API client reading tokens from the given stores
    pub fn new(
        config: &Config,
        staff: SessionStore<Staff>,
        parent: SessionStore<Parent>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            staff,
            parent,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path; the leading slash is optional
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Token of the session that owns `namespace`, read at call time
    pub fn bearer_for(&self, namespace: Namespace) -> Option<String> {
        match namespace {
            Namespace::Staff => self.staff.token(),
            Namespace::Parent => self.parent.token(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let namespace = Namespace::classify(path);
        let token = self.bearer_for(namespace);
        debug!(%method, path, %namespace, with_token = token.is_some(), "Dispatching request");

        let builder = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");

        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn execute(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        Self::check_response(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    /// Send a request with an optional JSON body.
    ///
    /// Non-2xx statuses come back as `ApiError`; nothing is retried.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Self::execute(builder).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = Self::execute(self.request(Method::GET, path)).await?;
        Self::parse(response, path).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = Self::execute(self.request(Method::POST, path).json(body)).await?;
        Self::parse(response, path).await
    }

    /// POST without a body, discarding whatever the server answers
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        Self::execute(self.request(Method::POST, path)).await?;
        Ok(())
    }
}
