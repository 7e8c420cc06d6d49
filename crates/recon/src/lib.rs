//! `mediarecon-recon`: media reconciliation engine.
//!
//! Pure engine crate: maps free-form file references to `M<number>` media
//! ids and extends ids with repository and knowledge-graph metadata. All
//! remote access goes through [`FetchJson`]; no HTTP client dependency.

pub mod claims;
pub mod error;
pub mod extend;
pub mod gateway;
pub mod manifest;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod preview;
pub mod service;
pub mod suggest;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::ReconcileError;
pub use gateway::{Endpoints, FetchJson, Gateway, MAX_BATCH_SIZE};
pub use model::{parse_extend, parse_queries, Diagnostics, ExtendResult, QueryResponse};
pub use preview::PreviewSize;
pub use service::{Reconciler, ReconcilerOptions};
