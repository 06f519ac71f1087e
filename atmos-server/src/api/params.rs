//! Query string and body helpers
//!
//! Query parameters are extracted as raw strings and parsed here, so a
//! missing or non-numeric value becomes our JSON 400 rather than axum's
//! plain-text rejection.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::Json;
use std::str::FromStr;

use crate::{ApiError, ApiResult};

/// Parse a required parameter
pub fn required<T: FromStr>(raw: Option<&str>, name: &str) -> ApiResult<T> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing required parameter '{}'", name)))?;
    parse(raw, name)
}

/// Parse an optional parameter; empty counts as absent
pub fn optional<T: FromStr>(raw: Option<&str>, name: &str) -> ApiResult<Option<T>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse(raw, name).map(Some),
        None => Ok(None),
    }
}

fn parse<T: FromStr>(raw: &str, name: &str) -> ApiResult<T> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid value '{}' for '{}'", raw, name)))
}

/// Unwrap a JSON body, turning rejections into [`ApiError::BadRequest`]
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Unwrap a numeric path segment
pub fn path_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
