//! # GuardPost Core
//!
//! Shared foundation for the GuardPost moderation pipeline: the error
//! taxonomy, the TOML configuration system, and the domain types that
//! every other crate speaks (proxies, accounts, tasks, credentials).

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::GuardPostConfig;
pub use error::{GuardPostError, Result};
