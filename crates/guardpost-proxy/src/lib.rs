//! Proxy pool manager — health checks, account binding, auto-assignment.
//!
//! Every account reaches the platform through its own proxy, so the pool
//! is the resource-isolation layer: it tracks which relays are alive and
//! which account holds each one.

pub mod check;
pub mod pool;

pub use check::{CheckSummary, HealthProbe, HttpEchoProbe};
pub use pool::{ProxyChoice, ProxyPool};
