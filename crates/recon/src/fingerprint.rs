//! Structural fingerprints.
//!
//! A fingerprint is a cheap `f64` digest of the same fields
//! [`crate::equality`] compares: category, location, parameters (values only
//! for meaningful ones) and name. Equal content always yields an equal
//! fingerprint; the converse holds only up to collisions. Fingerprints are
//! compared for equality, never ordered.

use std::collections::{BTreeMap, HashMap};

use modeldiff_core::{Element, ElementId, Location, Parameter, Snapshot, Storage, Xyz};
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use sha2::{Digest, Sha256};

use crate::config::ParameterPolicy;

/// Category term for uncategorized elements.
pub static CATEGORY_SENTINEL: Lazy<f64> = Lazy::new(|| string_hash("Category") as f64);
/// Location term for elements without a location.
pub static LOCATION_SENTINEL: Lazy<f64> = Lazy::new(|| string_hash("Location") as f64);
/// Seed of the parameter fold.
pub static PARAMETER_SEED: Lazy<f64> = Lazy::new(|| string_hash("Parameter") as f64);

static DEFAULT_POLICY: Lazy<ParameterPolicy> = Lazy::new(ParameterPolicy::default);

const UNBOUND_CURVE_OFFSET: f64 = 7.0;
const NAME_MODULUS: f64 = 1e10;
const DEFINITION_SCALE: f64 = 1e-6;

/// Value read for an element whose fingerprint is still being computed.
pub const IN_PROGRESS_PLACEHOLDER: f64 = 0.0;

/// Deterministic 32-bit string hash, stable across processes and platforms.
pub fn string_hash(s: &str) -> i32 {
    let digest = Sha256::digest(s.as_bytes());
    i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Round to 6 decimals, the precision at which geometry and doubles compare.
pub fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Fingerprint equality. NaN matches NaN, so every element matches itself.
pub fn same_fingerprint(a: f64, b: f64) -> bool {
    OrderedFloat(a) == OrderedFloat(b)
}

/// Fingerprint under the default parameter policy.
pub fn fingerprint(e: &Element) -> f64 {
    Fingerprinter::new(&DEFAULT_POLICY).fingerprint(e)
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Per-field terms of a fingerprint, summed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerprintParts {
    pub category: f64,
    pub location: f64,
    pub parameters: f64,
    pub name: f64,
}

impl FingerprintParts {
    pub fn total(&self) -> f64 {
        self.category + self.location + self.parameters + self.name
    }
}

pub struct Fingerprinter<'p> {
    policy: &'p ParameterPolicy,
}

impl<'p> Fingerprinter<'p> {
    pub fn new(policy: &'p ParameterPolicy) -> Self {
        Self { policy }
    }

    pub fn fingerprint(&self, e: &Element) -> f64 {
        self.parts(e).total()
    }

    pub fn parts(&self, e: &Element) -> FingerprintParts {
        FingerprintParts {
            category: e.category.map(|c| c.0 as f64).unwrap_or(*CATEGORY_SENTINEL),
            location: location_hash(e.id, &e.location),
            parameters: e
                .ordered_parameters()
                .into_iter()
                .fold(*PARAMETER_SEED, |acc, p| acc + self.parameter_hash(p)),
            name: (string_hash(&e.name) as f64).powi(2) % NAME_MODULUS,
        }
    }

    fn parameter_hash(&self, p: &Parameter) -> f64 {
        let def = string_hash(&p.definition_name) as f64 * DEFINITION_SCALE;
        if !self.policy.is_meaningful(p) {
            return def;
        }

        match &p.storage {
            Storage::None => def * *PARAMETER_SEED,
            Storage::Integer(v) => def * (*v as f64 + 10.0),
            Storage::Double(v) => def * (round6(*v) + 10.0),
            Storage::String(_) | Storage::ElementIdRef { .. } => match p.storage.text() {
                Some(s) if !s.is_empty() => def * string_hash(s) as f64,
                _ => def,
            },
        }
    }

    /// Fingerprint through `cache`; a re-entrant lookup of an id still being
    /// computed reads [`IN_PROGRESS_PLACEHOLDER`] instead of recursing.
    pub fn fingerprint_cached(&self, e: &Element, cache: &mut FingerprintCache) -> f64 {
        if let Some(v) = cache.begin(e.id) {
            return v;
        }
        let v = self.fingerprint(e);
        cache.finish(e.id, v);
        v
    }

    /// Fingerprint every element of `snapshot` with a run-scoped memo.
    pub fn table(&self, snapshot: &Snapshot) -> FingerprintTable {
        let mut cache = FingerprintCache::default();
        for e in snapshot.elements() {
            self.fingerprint_cached(e, &mut cache);
        }
        let table = cache.into_table();
        log::debug!(
            "fingerprinted {} elements of '{}'",
            table.len(),
            snapshot.source()
        );
        table
    }
}

fn point_hash(p: &Xyz) -> f64 {
    100.0 * round6(p.x) + 10.0 * round6(p.y) + round6(p.z)
}

fn location_hash(id: ElementId, loc: &Location) -> f64 {
    match loc {
        Location::None => *LOCATION_SENTINEL,
        Location::Point(p) => point_hash(p),
        Location::Curve(c) => match c.endpoints() {
            Ok((start, end)) => {
                10.0 * point_hash(&start) + point_hash(&end) + 100.0 * round6(c.length)
            }
            Err(e) => {
                log::debug!("element {id}: {e}, hashing length only");
                100.0 * round6(c.length) + UNBOUND_CURVE_OFFSET
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Memo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    InProgress,
    Done(f64),
}

/// Per-snapshot, per-run fingerprint memo with an explicit in-progress marker.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    slots: HashMap<ElementId, Slot>,
}

impl FingerprintCache {
    /// Returns the known value (or the placeholder while in progress); otherwise
    /// marks `id` in progress and returns `None`.
    pub fn begin(&mut self, id: ElementId) -> Option<f64> {
        match self.slots.get(&id) {
            Some(Slot::Done(v)) => Some(*v),
            Some(Slot::InProgress) => Some(IN_PROGRESS_PLACEHOLDER),
            None => {
                self.slots.insert(id, Slot::InProgress);
                None
            }
        }
    }

    pub fn finish(&mut self, id: ElementId, value: f64) {
        self.slots.insert(id, Slot::Done(value));
    }

    pub fn into_table(self) -> FingerprintTable {
        let values = self
            .slots
            .into_iter()
            .filter_map(|(id, slot)| match slot {
                Slot::Done(v) => Some((id, v)),
                Slot::InProgress => None,
            })
            .collect();
        FingerprintTable { values }
    }
}

/// Fingerprints of one snapshot, ascending by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerprintTable {
    values: BTreeMap<ElementId, f64>,
}

impl FingerprintTable {
    pub fn get(&self, id: ElementId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, f64)> + '_ {
        self.values.iter().map(|(id, v)| (*id, *v))
    }
}

impl FromIterator<(ElementId, f64)> for FingerprintTable {
    fn from_iter<T: IntoIterator<Item = (ElementId, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
