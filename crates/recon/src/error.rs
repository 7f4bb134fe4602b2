use std::fmt;

use modeldiff_core::{CoreError, ElementId};

use crate::model::Side;

#[derive(Debug)]
pub enum ReconError {
    /// Both snapshots carry the same source identifier.
    SameSnapshot { source: String },
    /// Exactly one of the two snapshots has no elements.
    EmptySnapshot { side: Side },
    /// An element id appears twice in one snapshot.
    DuplicateId { source: String, id: ElementId },
    /// A report asked for an id the relevant snapshot does not hold.
    UnknownElement { side: Side, id: ElementId },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (blank excluded name, bad separator, etc.).
    ConfigValidation(String),
    /// Snapshot JSON could not be deserialized.
    SnapshotParse(String),
    /// IO error (file read, etc.).
    Io(String),
    /// Run output could not be serialized.
    Output(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameSnapshot { source } => {
                write!(f, "both snapshots come from '{source}'; supply two different snapshots")
            }
            Self::EmptySnapshot { side } => {
                write!(f, "{side} snapshot is empty while the other is not")
            }
            Self::DuplicateId { source, id } => {
                write!(f, "snapshot '{source}': element id {id} appears more than once")
            }
            Self::UnknownElement { side, id } => {
                write!(f, "element {id} not found in {side} snapshot")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SnapshotParse(msg) => write!(f, "snapshot parse error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Output(msg) => write!(f, "output error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<CoreError> for ReconError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::DuplicateId { source, id } => Self::DuplicateId { source, id },
            CoreError::Parse(msg) => Self::SnapshotParse(msg),
            CoreError::Io(msg) => Self::Io(msg),
        }
    }
}
