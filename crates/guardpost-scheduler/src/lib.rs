//! # GuardPost Scheduler
//!
//! The polling backbone: one repeating registration per active task,
//! firing into a bounded-concurrency dispatcher.
//!
//! ```text
//! ScheduleService (tokio interval per task)
//!   ├── registration keyed by task id — re-register replaces
//!   ├── bootstrap() rebuilds registrations from the store on start
//!   └── on tick → Dispatcher
//!         ├── semaphore caps simultaneous jobs (default 5)
//!         ├── at most one in-flight execution per task id
//!         ├── reloads task/account/proxy fresh per job
//!         └── ModerationEngine → tagged TaskOutcome
//! ```

pub mod dispatch;
pub mod schedule;

pub use dispatch::{ClientFactory, Dispatcher, JobStatus, PlatformClientFactory};
pub use schedule::ScheduleService;
