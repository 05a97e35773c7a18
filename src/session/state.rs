//! Session identity and lifecycle flags

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity and lifecycle state for one broker session
///
/// Session-scoped permission rules live in the store, keyed by the
/// session scopes; this struct carries everything else that is fixed
/// for the session's lifetime.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Unique session identifier
    pub id: Uuid,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Whether every permission check is skipped for this session
    ///
    /// Set only at construction; it cannot be toggled mid-session.
    pub bypass_all: bool,
}

impl SessionState {
    /// Start a new session
    pub fn new(bypass_all: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            bypass_all,
        }
    }
}
