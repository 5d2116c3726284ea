use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    Json,
};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    json::json_response,
    models::session::SessionView,
    services::chips as chip_service,
    state::AppState,
    validation::chips::*,
};

/// The request payload for connecting a chip.
#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[garde(length(min = 1, max = 128))]
    pub chip_id: String,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(length(min = 1, max = 32))]
    pub number: String,
}

/// The request payload for sending a message through a chip.
#[derive(Deserialize, Validate, Debug)]
pub struct SendMessageRequest {
    #[garde(length(min = 1, max = 64))]
    pub to: String,
    #[garde(length(max = 65536))]
    pub message: String,
}

#[derive(Serialize)]
struct ChipList {
    sessions: Vec<SessionView>,
    count: usize,
}

/// Starts a simulated connection for a chip.
#[axum::debug_handler]
pub async fn connect_chip(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = payload?;
    req.validate()?;
    validate_not_blank("name", &req.name)?;
    validate_not_blank("number", &req.number)?;

    let ack = chip_service::begin_connection(&state, req.chip_id, req.name, req.number).await?;

    Ok(json_response(StatusCode::OK, &ack))
}

/// Accepts an outbound message for a connected chip.
///
/// The chip is looked up before the body is inspected, so an unknown chip
/// is always reported as not found.
#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Path(chip_id): Path<String>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Response> {
    chip_service::ensure_connected(&state, &chip_id).await?;

    let Json(req) = payload?;
    req.validate()?;
    validate_not_blank("to", &req.to)?;

    let sent = chip_service::send_message(&state, &chip_id, &req.to, &req.message).await?;

    Ok(json_response(StatusCode::OK, &sent))
}

/// Lists every chip session.
#[axum::debug_handler]
pub async fn list_chips(State(state): State<AppState>) -> Result<Response> {
    let sessions = chip_service::list_sessions(&state).await;
    let count = sessions.len();

    Ok(json_response(StatusCode::OK, &ChipList { sessions, count }))
}

/// Gets one chip session with its detail.
#[axum::debug_handler]
pub async fn get_chip(
    State(state): State<AppState>,
    Path(chip_id): Path<String>,
) -> Result<Response> {
    let view = chip_service::get_session(&state, &chip_id).await?;
    Ok(json_response(StatusCode::OK, &view))
}

/// Ends a chip session.
#[axum::debug_handler]
pub async fn disconnect_chip(
    State(state): State<AppState>,
    Path(chip_id): Path<String>,
) -> Result<Response> {
    let session = chip_service::disconnect(&state, &chip_id).await?;

    Ok(json_response(
        StatusCode::OK,
        &sonic_rs::json!({
            "success": true,
            "chipId": session.id,
            "message": "Session ended"
        }),
    ))
}
