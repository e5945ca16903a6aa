//! Read, query, multi-path update and delete handlers.

use hyper::{body::Bytes, Request, Response};

use rtdb_harness_core::{Batch, KeyPath, RealtimeStore};

use super::request_utils::{
    json_response, parse_query_params, range_query_from_params, read_request_body_with_timeout,
};
use crate::router::{AppState, RouterError};

/// Reads or queries the children of a path.
///
/// # Endpoint
/// `GET /{path}.json`
/// `GET /{path}.json?orderBy="field"&startAt=v&endAt=v`
///
/// # Response
/// - **200 OK**: object of child key to record, or `null` when empty. A path
///   naming a single record returns that record.
///
/// # Errors
/// - **400 Bad Request**: malformed query or no index declared for the field
pub async fn get_data(
    req: Request<hyper::body::Incoming>,
    path: KeyPath,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let params = parse_query_params(req.uri().query());

    if let Some(query) = range_query_from_params(&path, &params)? {
        let snapshot = state.store.query(&query).await?;
        tracing::debug!(path = %path, order_by = %query.order_by, found = snapshot.len(), "Query");
        return json_response(&snapshot.to_json());
    }

    if let Some(record) = state.store.get(&path) {
        return json_response(&record.to_json());
    }
    let snapshot = state.store.read(&path).await?;
    tracing::debug!(path = %path, found = snapshot.len(), "Read");
    json_response(&snapshot.to_json())
}

/// Applies a multi-path update atomically.
///
/// # Endpoint
/// `PATCH /{path}.json`
///
/// # Request Body
/// ```json
/// { "test/1": { "id": 1, "name": "test" }, "test/2": null }
/// ```
///
/// # Response
/// - **200 OK**: echoes the request body
///
/// # Errors
/// - **400 Bad Request**: body is not an object of flat records, or keys overlap
pub async fn patch_data(
    req: Request<hyper::body::Incoming>,
    path: KeyPath,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let body = read_request_body_with_timeout(req, state.request_timeout_ms).await?;
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| RouterError::BadRequest(format!("Invalid JSON: {}", e)))?;
    let batch = Batch::from_json(&path, &value)?;
    state.store.update(&batch).await?;
    tracing::debug!(
        path = %path,
        upserts = batch.upsert_count(),
        deletes = batch.delete_count(),
        "Update"
    );
    json_response(&value)
}

/// Deletes a path and everything beneath it.
///
/// # Endpoint
/// `DELETE /{path}.json`
///
/// # Response
/// - **200 OK**: `null`
pub async fn delete_data(
    _req: Request<hyper::body::Incoming>,
    path: KeyPath,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    state.store.remove(&path).await?;
    json_response(&serde_json::Value::Null)
}
