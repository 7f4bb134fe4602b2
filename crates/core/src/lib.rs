//! `modeldiff-core`: the record model shared by the reconciliation engine.
//!
//! A model document is captured as a [`Snapshot`]: a bag of [`Element`]s keyed
//! by an id that is unique inside the snapshot but not stable across
//! snapshots. Host integrations build snapshots directly or hand over JSON.

pub mod element;
pub mod error;
pub mod snapshot;

pub use element::{
    CategoryId, Curve, Element, ElementId, GeometryUnbound, Location, Parameter, Storage,
    StorageKind, Xyz,
};
pub use error::CoreError;
pub use snapshot::Snapshot;
