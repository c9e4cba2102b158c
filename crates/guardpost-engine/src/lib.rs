//! Comment diff & action engine.
//!
//! One poll = fetch the post's comments, subtract the known set, act on
//! the newcomers, notify, persist. The checkpoint advances on every
//! poll — including failed fetches — trading a possibly missed comment
//! window for resilience during platform outages. That tradeoff is
//! visible in the returned outcome, never hidden.

pub mod outcome;

pub use outcome::{ItemOutcome, TaskOutcome};

use std::sync::Arc;

use guardpost_core::traits::{CommentApi, Notifier};
use guardpost_core::types::{ActionMode, Comment, CommentTask};
use guardpost_store::Store;

use guardpost_channels::escape_markdown_v2;

/// Comments present in `fetched` but absent from `known`, in fetch
/// order. An empty result is the normal terminal state of a poll.
pub fn diff(fetched: &[Comment], known: &[String]) -> Vec<Comment> {
    fetched
        .iter()
        .filter(|c| !known.iter().any(|k| k == &c.id))
        .cloned()
        .collect()
}

/// Executes one poll for one task.
pub struct ModerationEngine {
    store: Arc<Store>,
    notifier: Arc<dyn Notifier>,
}

impl ModerationEngine {
    pub fn new(store: Arc<Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Run one poll. Never returns Err — every failure mode is a
    /// variant of the tagged outcome.
    pub async fn process_task(&self, task: &CommentTask, api: &dyn CommentApi) -> TaskOutcome {
        let fetched = match api.fetch_comments(&task.post_id).await {
            Ok(comments) => comments,
            Err(e) => {
                // Known set untouched; checkpoint still advances so the
                // task is not retried in a tight loop.
                if let Err(touch_err) = self.store.touch_task(task.id) {
                    tracing::error!("Task {}: checkpoint update failed: {touch_err}", task.id);
                }
                return TaskOutcome::Error { message: e.to_string() };
            }
        };

        let new_comments = diff(&fetched, &task.known_comment_ids);
        if new_comments.is_empty() {
            if let Err(e) = self.store.touch_task(task.id) {
                return TaskOutcome::Error { message: e.to_string() };
            }
            return TaskOutcome::NoNewComments;
        }

        let items = match task.action {
            ActionMode::Track => Vec::new(),
            ActionMode::Delete | ActionMode::Hide => {
                self.apply_action(task, api, &new_comments).await
            }
        };

        let notification_error = if task.notification {
            self.notify(task, &new_comments).await
        } else {
            None
        };

        // The sole "already seen" record: union in the new ids and
        // advance the checkpoint atomically, even if some per-comment
        // actions failed above.
        let new_ids: Vec<String> = new_comments.iter().map(|c| c.id.clone()).collect();
        if let Err(e) = self.store.append_known_comments(task.id, &new_ids) {
            return TaskOutcome::Error { message: e.to_string() };
        }

        TaskOutcome::Completed {
            new_comments: new_comments.len(),
            action: task.action,
            items,
            notification_error,
        }
    }

    /// Apply DELETE/HIDE to each new comment, all at once. One
    /// comment's failure is logged and recorded, never aborting the
    /// rest.
    async fn apply_action(
        &self,
        task: &CommentTask,
        api: &dyn CommentApi,
        comments: &[Comment],
    ) -> Vec<ItemOutcome> {
        let actions = comments.iter().map(|comment| async move {
            let result = match task.action {
                ActionMode::Delete => api.delete_comment(&comment.id).await,
                ActionMode::Hide => api.hide_comment(&comment.id).await,
                ActionMode::Track => Ok(()),
            };
            match result {
                Ok(()) => ItemOutcome::ok(&comment.id),
                Err(e) => {
                    tracing::warn!(
                        "Task {}: failed to {} comment {}: {e}",
                        task.id,
                        task.action.as_str(),
                        comment.id
                    );
                    ItemOutcome::failed(&comment.id, e.to_string())
                }
            }
        });
        futures::future::join_all(actions).await
    }

    /// Compose and send the one notification for this poll. Failure is
    /// logged and reported in the outcome, never fatal.
    async fn notify(&self, task: &CommentTask, comments: &[Comment]) -> Option<String> {
        let mut lines = vec![format!(
            "💬 New comments under post {}:",
            escape_markdown_v2(&task.post_id)
        )];
        for comment in comments {
            lines.push(format!(
                "👤 *{}*: {}",
                escape_markdown_v2(comment.author_name()),
                escape_markdown_v2(comment.message.as_deref().unwrap_or("")),
            ));
        }
        match self.notifier.send_text(&lines.join("\n")).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Task {}: notification failed: {e}", task.id);
                Some(e.to_string())
            }
        }
    }
}
