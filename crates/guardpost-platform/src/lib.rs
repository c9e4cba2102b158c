//! Proxied client for the external comment platform.
//!
//! Every call tunnels through the proxy bound to the calling account —
//! per-account egress isolation is a correctness requirement here, not
//! an optimization, so the client cannot be built without a proxy.

pub mod client;
pub mod credential;
pub mod register;

pub use client::PlatformClient;
pub use credential::decode_bundle;
pub use register::register_account;
