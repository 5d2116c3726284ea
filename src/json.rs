use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Serializes `value` with sonic-rs into a JSON response.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    let body = sonic_rs::to_string(value)
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
