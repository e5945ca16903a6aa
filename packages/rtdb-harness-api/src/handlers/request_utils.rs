//! Request utilities for HTTP endpoints.

use std::collections::HashMap;

use http_body_util::BodyExt;
use hyper::{body::Bytes, Request, Response};
use percent_encoding::percent_decode_str;
use tokio::time;

use rtdb_harness_core::record::FieldValue;
use rtdb_harness_core::{KeyPath, RangeQuery};

use crate::router::{AppState, RouterError};

/// Helper function to read request body with timeout
pub async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
) -> Result<Bytes, RouterError> {
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let body = time::timeout(timeout_duration, req.collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| RouterError::InternalError(format!("Failed to read request body: {}", e)))?;
    Ok(body.to_bytes())
}

/// Helper to build HTTP response with proper error handling
pub fn build_response(status: u16, json: Vec<u8>) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Bytes::from(json))
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Serializes `value` as a 200 response.
pub fn json_response(value: &serde_json::Value) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;
    build_response(200, json)
}

/// Converts the matched route remainder (`a/b.json`) into a key path.
pub fn data_path(raw: &str) -> Result<KeyPath, RouterError> {
    let trimmed = raw
        .strip_suffix(".json")
        .ok_or_else(|| RouterError::NotFound(format!("/{} is not a .json path", raw)))?;
    let decoded = percent_decode_str(trimmed).decode_utf8_lossy();
    Ok(KeyPath::parse(&decoded)?)
}

/// Parse query parameters from URL query string.
pub fn parse_query_params(query_str: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(query_str) = query_str {
        for pair in query_str.split('&') {
            let Some((key, encoded_value)) = pair.split_once('=') else {
                continue;
            };
            let encoded_value = encoded_value.replace('+', " ");
            let decoded_value = percent_decode_str(&encoded_value).decode_utf8_lossy();
            params.insert(key.to_string(), decoded_value.into_owned());
        }
    }
    params
}

/// Rejects the request unless `auth` matches the configured secret.
pub fn check_auth(query_str: Option<&str>, state: &AppState) -> Result<(), RouterError> {
    let Some(secret) = state.secret.as_deref() else {
        return Ok(());
    };
    match parse_query_params(query_str).get("auth") {
        Some(given) if given == secret => Ok(()),
        _ => Err(RouterError::Unauthorized),
    }
}

fn json_param(params: &HashMap<String, String>, name: &str) -> Result<Option<serde_json::Value>, RouterError> {
    params
        .get(name)
        .map(|raw| {
            serde_json::from_str(raw).map_err(|e| {
                RouterError::BadRequest(format!("{} must be valid JSON: {}", name, e))
            })
        })
        .transpose()
}

/// Builds a range query from `orderBy`/`startAt`/`endAt`, if `orderBy` is present.
pub fn range_query_from_params(
    path: &KeyPath,
    params: &HashMap<String, String>,
) -> Result<Option<RangeQuery>, RouterError> {
    let Some(order_by) = json_param(params, "orderBy")? else {
        return Ok(None);
    };
    let order_by = order_by
        .as_str()
        .ok_or_else(|| RouterError::BadRequest("orderBy must be a JSON string".to_string()))?
        .to_string();

    let bound = |name: &str| -> Result<FieldValue, RouterError> {
        let value = json_param(params, name)?
            .ok_or_else(|| RouterError::BadRequest(format!("{} is required with orderBy", name)))?;
        serde_json::from_value(value)
            .map_err(|e| RouterError::BadRequest(format!("{} must be a scalar: {}", name, e)))
    };
    let start = bound("startAt")?;
    let end = bound("endAt")?;

    Ok(Some(RangeQuery::new(path.clone(), &order_by, start, end)))
}
