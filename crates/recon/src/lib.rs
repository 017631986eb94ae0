//! `bommatch-recon`: identifier normalization and cross-source
//! reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns flagged and
//! classified results. No CLI or IO dependencies.

pub mod category;
pub mod columns;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod group;
pub mod model;
pub mod normalize;
pub mod partition;
pub mod unique;

pub use config::Config;
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use model::{Key, PairRecon, ReconInput, RunResult, Source, Table};
pub use normalize::{normalize, NormalizeOptions};
