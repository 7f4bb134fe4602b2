use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Element identifier. Unique within one snapshot, NOT stable across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ElementId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Xyz) -> f64 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Xyz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

/// A curve's endpoints could not be resolved (geometry present, ends unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryUnbound;

impl fmt::Display for GeometryUnbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the curve is not bound")
    }
}

impl std::error::Error for GeometryUnbound {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    #[serde(default)]
    pub endpoints: Option<(Xyz, Xyz)>,
    pub length: f64,
}

impl Curve {
    /// Straight bound curve; length is the endpoint distance.
    pub fn line(start: Xyz, end: Xyz) -> Self {
        Self {
            length: start.distance_to(&end),
            endpoints: Some((start, end)),
        }
    }

    pub fn unbound(length: f64) -> Self {
        Self {
            endpoints: None,
            length,
        }
    }

    pub fn endpoints(&self) -> Result<(Xyz, Xyz), GeometryUnbound> {
        self.endpoints.ok_or(GeometryUnbound)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    #[default]
    None,
    Point(Xyz),
    Curve(Curve),
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    None,
    Integer,
    Double,
    String,
    ElementIdRef,
}

/// Typed parameter value. Strings treat `None` and `""` as the same "no value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Storage {
    None,
    Integer(i64),
    Double(f64),
    String(Option<String>),
    ElementIdRef {
        target: ElementId,
        #[serde(default)]
        display: Option<String>,
    },
}

impl Storage {
    pub fn kind(&self) -> StorageKind {
        match self {
            Self::None => StorageKind::None,
            Self::Integer(_) => StorageKind::Integer,
            Self::Double(_) => StorageKind::Double,
            Self::String(_) => StorageKind::String,
            Self::ElementIdRef { .. } => StorageKind::ElementIdRef,
        }
    }

    /// Display text for string-like storage, absent unified with empty.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_deref().unwrap_or("")),
            Self::ElementIdRef { display, .. } => Some(display.as_deref().unwrap_or("")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter identifier; defines the canonical comparison order.
    pub id: i64,
    pub definition_name: String,
    pub storage: Storage,
}

impl Parameter {
    pub fn new(id: i64, definition_name: impl Into<String>, storage: Storage) -> Self {
        Self {
            id,
            definition_name: definition_name.into(),
            storage,
        }
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(default)]
    pub category: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Element {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: ElementId(id),
            category: None,
            name: name.into(),
            location: Location::None,
            parameters: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: i64) -> Self {
        self.category = Some(CategoryId(category));
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Parameters sorted by parameter id (stable for equal ids).
    pub fn ordered_parameters(&self) -> Vec<&Parameter> {
        let mut params: Vec<&Parameter> = self.parameters.iter().collect();
        params.sort_by_key(|p| p.id);
        params
    }
}
