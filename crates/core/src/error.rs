use std::fmt;

use crate::element::ElementId;

#[derive(Debug)]
pub enum CoreError {
    /// The same element id appears twice in one snapshot.
    DuplicateId { source: String, id: ElementId },
    /// Snapshot JSON could not be deserialized.
    Parse(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { source, id } => {
                write!(f, "snapshot '{source}': element id {id} appears more than once")
            }
            Self::Parse(msg) => write!(f, "snapshot parse error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}
