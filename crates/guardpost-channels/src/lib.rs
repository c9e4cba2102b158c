//! Notification channels. Telegram is the only wired channel; a
//! disabled configuration degrades to a logging no-op.

pub mod telegram;

pub use telegram::{escape_markdown_v2, notifier_from_config, NullNotifier, TelegramNotifier};
