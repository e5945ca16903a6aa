//! REST store backend.
//!
//! Speaks the realtime database `.json` dialect:
//! - `PATCH {base}/.json` with `{ "a/b": {...}, "a/c": null }` for updates
//! - `GET {base}/{path}.json?orderBy="f"&startAt=v&endAt=v` for range queries
//! - `GET {base}/{path}.json` for reads
//! - `DELETE {base}/{path}.json` for removes
//!
//! Credentials travel as `auth=<secret>` or `access_token=<token>`.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, RequestBuilder, StatusCode};

use rtdb_harness_core::credentials::ServiceCredential;
use rtdb_harness_core::error::StoreResult;
use rtdb_harness_core::{Batch, KeyPath, RangeQuery, RealtimeStore, Snapshot, StoreError};

/// Characters escaped inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Update,
    Query,
    Read,
    Remove,
}

/// Remote store reached over HTTP.
#[derive(Clone)]
pub struct RestStore {
    http: Client,
    base_url: String,
    auth: Option<(&'static str, String)>,
}

impl RestStore {
    /// Creates a client for `base_url` (e.g. `https://my-app.firebaseio.com`).
    pub fn new(base_url: &str) -> StoreResult<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> StoreResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StoreError::Transport(format!(
                "database URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            auth: None,
        })
    }

    /// Authenticates every request with the credential's secret or token.
    pub fn with_credential(mut self, credential: &ServiceCredential) -> Self {
        self.auth = credential
            .auth_param()
            .map(|(name, value)| (name, value.to_string()));
        self
    }

    /// Authenticates every request with `auth=<secret>`.
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.auth = Some(("auth", secret.to_string()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{path}.json` with each segment escaped.
    pub fn url_for(&self, path: &KeyPath) -> String {
        let encoded = path
            .segments()
            .iter()
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}.json", self.base_url, encoded)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        kind: RequestKind,
        path: &KeyPath,
        order_by: Option<&str>,
    ) -> StoreResult<serde_json::Value> {
        let request = match &self.auth {
            Some((name, value)) => request.query(&[(*name, value.as_str())]),
            None => request,
        };
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let error = status_error(kind, status, &text, path, order_by);
            tracing::debug!(path = %path, status = status.as_u16(), error = %error, "Request rejected");
            return Err(error);
        }
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl RealtimeStore for RestStore {
    async fn update(&self, batch: &Batch) -> StoreResult<()> {
        batch.validate()?;
        let root = KeyPath::root();
        let request = self.http.patch(self.url_for(&root)).json(&batch.to_json());
        self.send(request, RequestKind::Update, &root, None).await?;
        Ok(())
    }

    async fn query(&self, query: &RangeQuery) -> StoreResult<Snapshot> {
        query.validate()?;
        let order_by = serde_json::Value::from(query.order_by.as_str()).to_string();
        let request = self.http.get(self.url_for(&query.path)).query(&[
            ("orderBy", order_by),
            ("startAt", query.start.to_json_string()),
            ("endAt", query.end.to_json_string()),
        ]);
        let body = self
            .send(request, RequestKind::Query, &query.path, Some(&query.order_by))
            .await?;
        Snapshot::from_json(&body)
    }

    async fn read(&self, path: &KeyPath) -> StoreResult<Snapshot> {
        let request = self.http.get(self.url_for(path));
        let body = self.send(request, RequestKind::Read, path, None).await?;
        Snapshot::from_json(&body)
    }

    async fn remove(&self, path: &KeyPath) -> StoreResult<()> {
        let request = self.http.delete(self.url_for(path));
        self.send(request, RequestKind::Remove, path, None).await?;
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    StoreError::Transport(format!("{}: {}", kind, e))
}

/// `{"error": "..."}` message, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn status_error(
    kind: RequestKind,
    status: StatusCode,
    body: &str,
    path: &KeyPath,
    order_by: Option<&str>,
) -> StoreError {
    let message = error_message(body);
    let reason = format!("HTTP {}: {}", status.as_u16(), message);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return StoreError::Auth(reason);
    }
    match kind {
        RequestKind::Query
            if status == StatusCode::BAD_REQUEST
                && message.to_ascii_lowercase().contains("index") =>
        {
            StoreError::MissingIndex {
                path: path.to_string(),
                field: order_by.unwrap_or_default().to_string(),
            }
        }
        RequestKind::Query => StoreError::InvalidQuery(reason),
        RequestKind::Update | RequestKind::Remove => StoreError::WriteRejected {
            path: path.to_string(),
            reason,
        },
        RequestKind::Read => StoreError::ReadRejected {
            path: path.to_string(),
            reason,
        },
    }
}
