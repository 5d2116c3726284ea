use serde::Serialize;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        event::{ChipEvent, ConnectionPhase},
        session::{Session, SessionView},
    },
    repositories::session::Transition,
    state::AppState,
};

/// Acknowledgement returned as soon as a connection attempt is registered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectAck {
    pub success: bool,
    pub message: String,
    pub chip_id: String,
    pub session_name: String,
}

/// Acknowledgement for an accepted outbound message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub success: bool,
    pub message_id: String,
    pub status: &'static str,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Qr,
    Connect,
}

/// Registers a new connection attempt and schedules its lifecycle.
///
/// The QR phase and the connected phase are both timed from this call and
/// do not wait on each other.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `chip_id` - The chip identifier.
/// * `name` - The display name of the chip.
/// * `number` - The phone number of the chip.
///
/// # Returns
///
/// A `Result` containing the `ConnectAck`, or `AppError::Conflict` if the
/// chip already has a session.
pub async fn begin_connection(
    state: &AppState,
    chip_id: String,
    name: String,
    number: String,
) -> Result<ConnectAck> {
    tracing::info!("🔄 Starting connection for chip: {} ({})", name, number);

    let cancel = CancellationToken::new();
    let session = state
        .registry
        .insert(Session::new(chip_id, name, number), cancel.clone())
        .await?;

    let origin = Instant::now();
    schedule(state, &session.id, Phase::Qr, origin + state.config.qr_delay, &cancel);
    schedule(state, &session.id, Phase::Connect, origin + state.config.connect_delay, &cancel);

    Ok(ConnectAck {
        success: true,
        message: "Session started. Waiting for QR code.".to_string(),
        session_name: session.session_name(),
        chip_id: session.id,
    })
}

fn schedule(state: &AppState, chip_id: &str, phase: Phase, deadline: Instant, cancel: &CancellationToken) {
    let state = state.clone();
    let chip_id = chip_id.to_string();
    let cancel = cancel.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(chip_id = %chip_id, ?phase, "scheduled transition cancelled");
            }
            _ = sleep_until(deadline) => {
                let outcome = match phase {
                    Phase::Qr => complete_qr_phase(&state, &chip_id, &cancel).await,
                    Phase::Connect => complete_connection(&state, &chip_id, &cancel).await,
                };
                if let Err(e) = outcome {
                    tracing::error!(chip_id = %chip_id, ?phase, "❌ Scheduled transition failed: {}", e);
                }
            }
        }
    });
}

/// Moves a chip into the QR phase and announces the placeholder code.
///
/// Does nothing if the session is gone, already past the QR phase, or the
/// attempt behind `cancel` was disconnected.
pub async fn complete_qr_phase(
    state: &AppState,
    chip_id: &str,
    cancel: &CancellationToken,
) -> Result<Transition> {
    let outcome = state.registry.mark_qr_ready(chip_id, cancel).await;

    match &outcome {
        Transition::Applied(session) => {
            tracing::info!("📱 QR code generated for {}", session.name);

            state.broadcaster.broadcast(&ChipEvent::qr_code(chip_id)).await;
            state
                .broadcaster
                .broadcast(&ChipEvent::connection_status(
                    chip_id,
                    ConnectionPhase::QrReady,
                    session.session_name(),
                ))
                .await;
        }
        Transition::Missing => {
            tracing::debug!(chip_id, "QR phase skipped: session no longer exists");
        }
        Transition::Skipped(status) => {
            tracing::debug!(chip_id, %status, "QR phase skipped: session already advanced");
        }
        Transition::Cancelled => {
            tracing::debug!(chip_id, "QR phase skipped: attempt was disconnected");
        }
    }

    Ok(outcome)
}

/// Marks a chip as connected, records its detail and announces it.
///
/// Does nothing if the session is gone or the attempt behind `cancel` was
/// disconnected.
pub async fn complete_connection(
    state: &AppState,
    chip_id: &str,
    cancel: &CancellationToken,
) -> Result<Transition> {
    let outcome = state.registry.mark_connected(chip_id, cancel).await;

    match &outcome {
        Transition::Applied(session) => {
            tracing::info!("✅ Chip {} connected successfully!", session.name);

            state
                .broadcaster
                .broadcast(&ChipEvent::connection_status(
                    chip_id,
                    ConnectionPhase::Authenticated,
                    session.session_name(),
                ))
                .await;
            state
                .broadcaster
                .broadcast(&ChipEvent::chip_connected(chip_id, &session.name, &session.number))
                .await;
        }
        Transition::Missing => {
            tracing::debug!(chip_id, "connection skipped: session no longer exists");
        }
        Transition::Skipped(status) => {
            tracing::debug!(chip_id, %status, "connection skipped: session already connected");
        }
        Transition::Cancelled => {
            tracing::debug!(chip_id, "connection skipped: attempt was disconnected");
        }
    }

    Ok(outcome)
}

/// Gets a session with its detail.
pub async fn get_session(state: &AppState, chip_id: &str) -> Result<SessionView> {
    state
        .registry
        .view(chip_id)
        .await
        .ok_or_else(|| AppError::NotFound("Chip not found".to_string()))
}

/// Lists every session.
pub async fn list_sessions(state: &AppState) -> Vec<SessionView> {
    state.registry.list().await
}

/// Fails with `AppError::NotFound` unless the chip has a connected session.
pub async fn ensure_connected(state: &AppState, chip_id: &str) -> Result<Session> {
    state
        .registry
        .get(chip_id)
        .await
        .filter(|session| session.status.is_connected())
        .ok_or_else(|| AppError::NotFound("Chip not found or not connected".to_string()))
}

/// Accepts an outbound message for a connected chip.
///
/// Nothing is transmitted: the message is logged and acknowledged with a
/// fresh identifier.
///
/// # Returns
///
/// A `Result` containing the `SentMessage`, or `AppError::NotFound` if the
/// chip has no session or is not connected yet.
pub async fn send_message(
    state: &AppState,
    chip_id: &str,
    to: &str,
    message: &str,
) -> Result<SentMessage> {
    ensure_connected(state, chip_id).await?;

    let message_id = Uuid::new_v4().to_string();
    tracing::info!("📤 Message sent via chip {} to {}: {}", chip_id, to, message);

    Ok(SentMessage {
        success: true,
        message_id,
        status: "sent",
    })
}

/// Ends a chip session and cancels its pending transitions.
pub async fn disconnect(state: &AppState, chip_id: &str) -> Result<Session> {
    let session = state
        .registry
        .remove(chip_id)
        .await
        .ok_or_else(|| AppError::NotFound("Chip not found".to_string()))?;

    tracing::info!("🔌 Chip {} disconnected", session.name);
    Ok(session)
}
