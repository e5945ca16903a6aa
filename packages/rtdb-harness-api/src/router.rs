//! Matchit routing configuration.

use std::sync::Arc;

use hyper::{body::Bytes, Method, Request, Response};
use matchit::Router as MatchitRouter;

use rtdb_harness_core::{KeyPath, MemoryStore, StoreError};

use crate::handlers;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Backing store
    pub store: MemoryStore,
    /// Required `auth` query parameter, if any
    pub secret: Option<Arc<str>>,
    /// Request body read timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a router serving `store` under `/{path}.json`.
    pub fn new(store: MemoryStore) -> Self {
        let mut router = MatchitRouter::new();
        // Every data path ends in `.json`, so the catch-all never sees an
        // empty remainder.
        if let Err(e) = router.insert("/{*path}", RouteHandler::Data) {
            tracing::error!("Failed to insert data route: {}", e);
        }

        Self {
            inner: router,
            state: AppState {
                store,
                secret: None,
                request_timeout_ms: 5000,
            },
        }
    }

    /// Requires `auth=<secret>` on every request.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.state.secret = Some(Arc::from(secret.into()));
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.state.request_timeout_ms = timeout_ms;
        self
    }

    /// Routes an incoming request to the appropriate handler.
    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Bytes>, RouterError> {
        let uri_path = req.uri().path().to_string();
        let matched = self
            .inner
            .at(&uri_path)
            .map_err(|_| RouterError::NotFound(format!("No route found for {}", uri_path)))?;
        let handler = matched.value;
        handlers::check_auth(req.uri().query(), &self.state)?;
        let path = handlers::data_path(matched.params.get("path").unwrap_or_default())?;
        handler.handle(req, path, self.state.clone()).await
    }
}

/// Route handler function.
enum RouteHandler {
    Data,
}

impl RouteHandler {
    async fn handle(
        &self,
        req: Request<hyper::body::Incoming>,
        path: KeyPath,
        state: AppState,
    ) -> Result<Response<Bytes>, RouterError> {
        match self {
            RouteHandler::Data => {
                if req.method() == Method::GET {
                    handlers::get_data(req, path, state).await
                } else if req.method() == Method::PATCH {
                    handlers::patch_data(req, path, state).await
                } else if req.method() == Method::DELETE {
                    handlers::delete_data(req, path, state).await
                } else {
                    Err(RouterError::MethodNotAllowed)
                }
            }
        }
    }
}

/// Router error type.
#[derive(Debug)]
pub enum RouterError {
    MethodNotAllowed,
    InternalError(String),
    Timeout,
    BadRequest(String),
    NotFound(String),
    Unauthorized,
    Store(StoreError),
}

impl RouterError {
    pub fn status(&self) -> u16 {
        match self {
            RouterError::MethodNotAllowed => 405,
            RouterError::InternalError(_) => 500,
            RouterError::Timeout => 408,
            RouterError::BadRequest(_) => 400,
            RouterError::NotFound(_) => 404,
            RouterError::Unauthorized => 401,
            RouterError::Store(StoreError::Auth(_)) => 401,
            RouterError::Store(StoreError::Transport(_)) => 500,
            RouterError::Store(_) => 400,
        }
    }
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::MethodNotAllowed => write!(f, "Method Not Allowed"),
            RouterError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            RouterError::Timeout => write!(f, "Request Timeout"),
            RouterError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            RouterError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RouterError::Unauthorized => write!(f, "Permission denied"),
            RouterError::Store(StoreError::MissingIndex { path, field }) => write!(
                f,
                "Index not defined, add \".indexOn\": \"{}\", for path \"/{}\", to the rules",
                field, path
            ),
            RouterError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<StoreError> for RouterError {
    fn from(err: StoreError) -> Self {
        RouterError::Store(err)
    }
}

impl From<RouterError> for Response<Bytes> {
    fn from(err: RouterError) -> Self {
        let status = err.status();
        let body = serde_json::json!({ "error": err.to_string() }).to_string();

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Bytes::from(body))
            .unwrap_or_else(|_| {
                let mut fallback = Response::new(Bytes::from("Internal Server Error"));
                *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        assert_eq!(RouterError::Unauthorized.status(), 401);
        assert_eq!(RouterError::MethodNotAllowed.status(), 405);
        let missing = RouterError::Store(StoreError::MissingIndex {
            path: "transactions".into(),
            field: "published".into(),
        });
        assert_eq!(missing.status(), 400);
        assert!(missing.to_string().starts_with("Index not defined"));
    }

    #[test]
    fn test_error_response_body() {
        let response: Response<Bytes> = RouterError::NotFound("nothing here".into()).into();
        assert_eq!(response.status(), 404);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "Not Found: nothing here");
    }
}
