//! HTTP transport for the media reconciliation engine.
//!
//! Implements `FetchJson` over a blocking `reqwest` client. No knowledge of
//! the remote APIs lives here; the engine's gateway builds every request.

mod client;

pub use client::{ClientError, HttpFetcher, HttpSettings, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
