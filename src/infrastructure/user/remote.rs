//! User store backed by a running gophr API
//!
//! Lookups and listings are forwarded to `GET /v1/users/{id}` and
//! `GET /v1/users`. The API has no write routes, so saves and deletes fail.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::store::start_boundary;
use crate::domain::{CallContext, Cursor, DomainError, KeyedStore, Page, PagedStore, User};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

const CURSOR_HEADER: &str = "x-cursor";

/// Remote API client configuration
#[derive(Debug, Clone)]
pub struct RemoteUserConfig {
    pub base_url: String,
    /// Upper bound on each request, tightened further by the caller's deadline
    pub timeout: Duration,
}

impl Default for RemoteUserConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl RemoteUserConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct RemoteUser {
    user_id: String,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<RemoteUser> for User {
    fn from(remote: RemoteUser) -> Self {
        // The API never returns password hashes
        User::with_id(
            remote.user_id,
            remote.username,
            remote.email,
            "",
            remote.created_at,
        )
        .with_updated_at(remote.updated_at)
    }
}

#[derive(Deserialize)]
struct RemoteUserPage {
    data: Vec<RemoteUser>,
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct RemoteErrorBody {
    error: RemoteErrorDetail,
}

#[derive(Deserialize)]
struct RemoteErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Read-only user store speaking to the HTTP API
#[derive(Debug, Clone)]
pub struct RemoteUserStore {
    base_url: Url,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl RemoteUserStore {
    pub fn new(config: RemoteUserConfig) -> Result<Self, DomainError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DomainError::configuration(format!("Invalid API URL '{}': {}", config.base_url, e))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(DomainError::configuration(format!(
                "Invalid API URL '{}': not a base URL",
                config.base_url
            )));
        }

        Ok(Self {
            base_url,
            timeout: config.timeout,
            http_client: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, DomainError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DomainError::configuration("API URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends `request` and decodes a successful JSON body, all under the caller's
    /// context narrowed to the client timeout
    async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        operation: &str,
        key: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<(T, Option<String>), DomainError> {
        let ctx = ctx.child_with_timeout(self.timeout);

        ctx.run(async {
            let response = request
                .send()
                .await
                .map_err(|e| DomainError::unexpected(operation, key, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(error_from_response(operation, key, response).await);
            }

            let cursor = response
                .headers()
                .get(CURSOR_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .json::<T>()
                .await
                .map_err(|e| DomainError::unexpected(operation, key, e))?;

            debug!(operation, key, %status, "Remote user request completed");
            Ok((body, cursor))
        })
        .await
    }
}

async fn error_from_response(
    operation: &str,
    key: &str,
    response: reqwest::Response,
) -> DomainError {
    let status = response.status();
    let detail = response
        .json::<RemoteErrorBody>()
        .await
        .ok()
        .map(|body| body.error);
    let code = detail.as_ref().and_then(|d| d.code.clone());
    let message = detail
        .map(|d| d.message)
        .unwrap_or_else(|| status.to_string());

    match (status, code.as_deref()) {
        (StatusCode::NOT_FOUND, _) => DomainError::not_found(key),
        (_, Some("invalid_cursor")) => DomainError::invalid_cursor(message),
        (StatusCode::BAD_REQUEST, _) => DomainError::validation(message),
        (StatusCode::GATEWAY_TIMEOUT, _) => DomainError::DeadlineExceeded,
        _ => DomainError::unexpected(operation, key, format!("{}: {}", status, message)),
    }
}

#[async_trait]
impl KeyedStore<User> for RemoteUserStore {
    async fn find_by_key(&self, ctx: &CallContext, key: &str) -> Result<User, DomainError> {
        let url = self.endpoint(&["v1", "users", key])?;
        let request = self.http_client.get(url);

        let (user, _) = self
            .fetch::<RemoteUser>(ctx, "find_by_key", key, request)
            .await?;
        Ok(user.into())
    }

    async fn save(&self, _ctx: &CallContext, user: User) -> Result<(), DomainError> {
        Err(DomainError::validation(format!(
            "Cannot save '{}': the remote user store is read-only",
            user.user_id()
        )))
    }

    async fn delete(&self, _ctx: &CallContext, key: &str) -> Result<(), DomainError> {
        Err(DomainError::validation(format!(
            "Cannot delete '{}': the remote user store is read-only",
            key
        )))
    }
}

#[async_trait]
impl PagedStore<User> for RemoteUserStore {
    async fn list_after(
        &self,
        ctx: &CallContext,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page<User>, DomainError> {
        start_boundary(cursor, limit)?;

        let mut url = self.endpoint(&["v1", "users"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor.as_str());
            }
        }

        let request = self.http_client.get(url);
        let (page, header) = self
            .fetch::<RemoteUserPage>(ctx, "list_after", "", request)
            .await?;

        let wire = header.unwrap_or(page.next_cursor);
        Ok(Page {
            items: page.data.into_iter().map(User::from).collect(),
            next_cursor: Cursor::from_wire(&wire),
        })
    }
}
