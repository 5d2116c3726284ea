use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, Result},
    models::session::{Session, SessionDetail, SessionStatus, SessionView},
};

/// Outcome of a scheduled lifecycle transition.
#[derive(Debug, Clone)]
pub enum Transition {
    /// The transition was applied; carries the updated session.
    Applied(Session),
    /// The session no longer exists.
    Missing,
    /// The session is already past the target state.
    Skipped(SessionStatus),
    /// The attempt that scheduled the transition was disconnected.
    Cancelled,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    details: HashMap<String, SessionDetail>,
    pending: HashMap<String, CancellationToken>,
}

/// In-memory registry of chip sessions.
///
/// Sessions, their details and the cancellation handles for pending
/// transitions live behind one lock, so every operation on an identifier is
/// atomic relative to the scheduled transitions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl SessionRegistry {
    /// Creates a new, empty `SessionRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new session.
    ///
    /// # Arguments
    ///
    /// * `session` - The session to insert.
    /// * `cancel` - Cancels the transitions scheduled for this session.
    ///
    /// # Returns
    ///
    /// A `Result` containing the inserted `Session`, or `AppError::Conflict`
    /// if the identifier is already taken.
    pub async fn insert(&self, session: Session, cancel: CancellationToken) -> Result<Session> {
        let mut inner = self.inner.lock().await;

        if inner.sessions.contains_key(&session.id) {
            return Err(AppError::Conflict(
                "Chip already has an active session".to_string(),
            ));
        }

        inner.pending.insert(session.id.clone(), cancel);
        inner.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Moves an `initializing` session to `qr-ready`.
    ///
    /// `cancel` is the token of the attempt that scheduled the transition.
    /// It is checked under the lock, so a session re-created under the same
    /// identifier is never touched by an older attempt.
    pub async fn mark_qr_ready(&self, chip_id: &str, cancel: &CancellationToken) -> Transition {
        let mut inner = self.inner.lock().await;

        if cancel.is_cancelled() {
            return Transition::Cancelled;
        }

        let Some(session) = inner.sessions.get_mut(chip_id) else {
            return Transition::Missing;
        };

        if session.status != SessionStatus::Initializing {
            return Transition::Skipped(session.status);
        }

        session.status = SessionStatus::QrReady;
        session.last_activity = Utc::now();
        Transition::Applied(session.clone())
    }

    /// Moves a session to `connected` and records its detail.
    pub async fn mark_connected(&self, chip_id: &str, cancel: &CancellationToken) -> Transition {
        let mut inner = self.inner.lock().await;

        if cancel.is_cancelled() {
            return Transition::Cancelled;
        }

        let Some(session) = inner.sessions.get_mut(chip_id) else {
            return Transition::Missing;
        };

        if session.status == SessionStatus::Connected {
            return Transition::Skipped(session.status);
        }

        session.status = SessionStatus::Connected;
        session.last_activity = Utc::now();
        let session = session.clone();

        inner
            .details
            .insert(chip_id.to_string(), SessionDetail::connected(&session));
        Transition::Applied(session)
    }

    /// Looks up a session.
    pub async fn get(&self, chip_id: &str) -> Option<Session> {
        self.inner.lock().await.sessions.get(chip_id).cloned()
    }

    /// Looks up the detail of a connected session.
    pub async fn detail(&self, chip_id: &str) -> Option<SessionDetail> {
        self.inner.lock().await.details.get(chip_id).cloned()
    }

    /// Looks up a session together with its detail.
    pub async fn view(&self, chip_id: &str) -> Option<SessionView> {
        let inner = self.inner.lock().await;
        inner.sessions.get(chip_id).map(|session| SessionView {
            session_name: session.session_name(),
            session: session.clone(),
            detail: inner.details.get(chip_id).cloned(),
        })
    }

    /// Lists every session, oldest first.
    pub async fn list(&self) -> Vec<SessionView> {
        let inner = self.inner.lock().await;
        let mut views: Vec<SessionView> = inner
            .sessions
            .values()
            .map(|session| SessionView {
                session_name: session.session_name(),
                session: session.clone(),
                detail: inner.details.get(&session.id).cloned(),
            })
            .collect();

        views.sort_by(|a, b| {
            a.session
                .created_at
                .cmp(&b.session.created_at)
                .then_with(|| a.session.id.cmp(&b.session.id))
        });
        views
    }

    /// Removes a session and its detail, cancelling pending transitions.
    pub async fn remove(&self, chip_id: &str) -> Option<Session> {
        let mut inner = self.inner.lock().await;

        if let Some(token) = inner.pending.remove(chip_id) {
            token.cancel();
        }
        inner.details.remove(chip_id);
        inner.sessions.remove(chip_id)
    }

    /// Number of sessions in the registry.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
