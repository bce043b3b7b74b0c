// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod alert;
pub mod classify;
pub mod config;
pub mod dashboard;
pub mod ingest;
pub mod monitor;
pub mod notify;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::alert::{AlertBatch, AlertRouter, AlertTier};
pub use crate::classify::{Classifier, RoleCategory, Verdict};
pub use crate::ingest::identity::IdentityKey;
pub use crate::ingest::types::{JobSource, Listing, SourceKind};
pub use crate::ingest::{IngestionPipeline, PipelineOptions, RunReport};
pub use crate::monitor::{build_sources, run_monitor, run_monitor_with, RunSummary};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::store::{RunLock, SeenRecord, SeenStore, StoreError};
