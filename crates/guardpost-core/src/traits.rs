//! Seam traits for the pipeline's external collaborators.
//!
//! The engine talks to the comment platform and the notification
//! channel only through these, so tests can substitute mocks.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Comment;

/// Outbound calls to the external comment platform. One implementor
/// per (account, proxy) pair — the proxy route is baked into the
/// client and never bypassed.
#[async_trait]
pub trait CommentApi: Send + Sync {
    /// All comments currently visible under a post.
    async fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>>;
    /// Remove a comment from its post.
    async fn delete_comment(&self, comment_id: &str) -> Result<()>;
    /// Set the hidden flag on a comment.
    async fn hide_comment(&self, comment_id: &str) -> Result<()>;
}

/// Fire-and-forget text notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;
}
