//! `modeldiff-recon`: snapshot reconciliation engine.
//!
//! Receives two loaded snapshots and classifies every element as unchanged,
//! modified, added or deleted, recovering renumbered elements by content.
//! Pure engine crate: no document access, no UI, no CLI.

pub mod category;
pub mod config;
pub mod engine;
pub mod equality;
pub mod error;
pub mod evidence;
pub mod fingerprint;
pub mod model;
pub mod report;
pub mod strategy;

pub use category::{CategoryTree, Selection};
pub use config::{DiffConfig, ParameterPolicy, Strategy};
pub use engine::{reconcile, run};
pub use equality::structurally_equal;
pub use error::ReconError;
pub use evidence::hash_collision_check;
pub use fingerprint::fingerprint;
pub use model::{ChangeType, DiffRun, ReconciliationResult};
pub use report::Report;
pub use strategy::MatchStrategy;
