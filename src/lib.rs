// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod app;
pub mod config;
pub mod driver;
pub mod fingerprint;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Classification, Enricher, Enrichment};
pub use crate::driver::{CycleReport, Driver, DriverState, DriverStatus, Pipeline};
pub use crate::fingerprint::Fingerprint;
pub use crate::ingest::types::{NormalizedItem, SourceAdapter, SourceKind, TransferDetails};
pub use crate::notify::Dispatcher;
pub use crate::store::{DurableStore, FingerprintStore, MemoryStore};
