//! Collaborator HTTP clients
//!
//! The engine owns no storage: reviewer overrides and stored scores live
//! behind two small collaborator APIs. Both clients follow the same
//! shape — base URL, shared `reqwest` client with a timeout, typed
//! payloads, per-client error enum.

mod override_client;
mod score_sync_client;

pub use override_client::{OverrideApiError, OverrideClient, OverrideWriteRequest};
pub use score_sync_client::{ScoreSyncClient, ScoreSyncRequest, SyncError};

/// User agent sent on every collaborator request
pub(crate) const USER_AGENT: &str = concat!("CallQA/", env!("CARGO_PKG_VERSION"));

/// Request timeout for collaborator calls
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 10;
