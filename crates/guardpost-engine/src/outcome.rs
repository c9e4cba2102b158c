//! Tagged outcome of one poll.

use serde::Serialize;

use guardpost_core::types::ActionMode;

/// What one poll did. Every failure mode the engine swallows locally
/// (per-comment actions, notification) is still observable here.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Fetch succeeded and every comment was already known.
    NoNewComments,
    /// New comments were recorded (and acted on, for DELETE/HIDE).
    Completed {
        new_comments: usize,
        action: ActionMode,
        /// Per-comment action outcomes; empty for TRACK.
        items: Vec<ItemOutcome>,
        /// Set when the notification send failed.
        notification_error: Option<String>,
    },
    /// The poll itself failed (fetch or persistence). The checkpoint
    /// has still advanced for fetch failures.
    Error { message: String },
    /// Preconditions were not met — nothing was attempted and the
    /// checkpoint did not move.
    Failed { reason: String },
}

/// Outcome of one moderation action on one comment.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub comment_id: String,
    pub ok: bool,
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn ok(comment_id: &str) -> Self {
        Self { comment_id: comment_id.into(), ok: true, error: None }
    }

    pub fn failed(comment_id: &str, error: String) -> Self {
        Self { comment_id: comment_id.into(), ok: false, error: Some(error) }
    }
}
