use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a chip session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Initializing,
    QrReady,
    Connected,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::QrReady => "qr-ready",
            SessionStatus::Connected => "connected",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionStatus::Connected)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents one simulated device-connection attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The chip identifier.
    pub id: String,
    /// The display name of the chip.
    pub name: String,
    /// The phone number bound to the chip.
    pub number: String,
    /// The current lifecycle status.
    pub status: SessionStatus,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp of the last lifecycle change.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Creates a session in the `initializing` state.
    pub fn new(id: String, name: String, number: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            number,
            status: SessionStatus::Initializing,
            created_at: now,
            last_activity: now,
        }
    }

    /// The session name announced to clients.
    pub fn session_name(&self) -> String {
        session_name(&self.id)
    }
}

/// Builds the session name for a chip identifier.
pub fn session_name(chip_id: &str) -> String {
    format!("chip_{}", chip_id)
}

/// Health label reported for every connected chip.
pub const HEALTH_EXCELLENT: &str = "excellent";

/// Supplementary record created once a session reaches `connected`.
///
/// Stored separately from [`Session`] under the same identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub name: String,
    pub number: String,
    pub status: SessionStatus,
    pub connected_at: DateTime<Utc>,
    pub health: String,
    /// Never incremented: messages are not actually transmitted.
    pub messages_sent: u64,
    pub messages_received: u64,
    pub last_activity: DateTime<Utc>,
}

impl SessionDetail {
    /// Creates the detail record for a session that just connected.
    pub fn connected(session: &Session) -> Self {
        let now = Utc::now();
        Self {
            name: session.name.clone(),
            number: session.number.clone(),
            status: SessionStatus::Connected,
            connected_at: now,
            health: HEALTH_EXCELLENT.to_string(),
            messages_sent: 0,
            messages_received: 0,
            last_activity: now,
        }
    }
}

/// A session together with its detail, if it has connected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub session_name: String,
    pub detail: Option<SessionDetail>,
}
