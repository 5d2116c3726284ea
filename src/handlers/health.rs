use axum::{extract::State, http::StatusCode, response::Response};
use chrono::Utc;
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

use crate::{json::json_response, state::AppState};

/// Process memory usage in bytes.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub rss: u64,
    pub virtual_memory: u64,
}

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since the server started.
    pub uptime: f64,
    pub memory: MemoryStats,
    pub active_sessions: usize,
    /// Connected realtime clients.
    pub connections: usize,
    pub environment: String,
    pub version: &'static str,
}

fn process_memory() -> MemoryStats {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return MemoryStats::default();
    };

    let mut system = System::new();
    let _ = system.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);
    system
        .process(pid)
        .map(|process| MemoryStats {
            rss: process.memory(),
            virtual_memory: process.virtual_memory(),
        })
        .unwrap_or_default()
}

/// Reports liveness, uptime, memory and session counts.
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> Response {
    let health = HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        memory: process_memory(),
        active_sessions: state.registry.len().await,
        connections: state.broadcaster.connection_count().await,
        environment: state.config.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
    };

    json_response(StatusCode::OK, &health)
}
