//! Exact structural equality, the ground truth fingerprints approximate.
//!
//! Must cover the same fields as [`crate::fingerprint`]: anything hashed is
//! compared here and vice versa, or hash-filtered matching becomes unsound.

use modeldiff_core::{Curve, Element, Location, Parameter, Storage, Xyz};
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;

use crate::config::ParameterPolicy;
use crate::fingerprint::round6;

const DOUBLE_TOLERANCE: f64 = 1e-6;

static DEFAULT_POLICY: Lazy<ParameterPolicy> = Lazy::new(ParameterPolicy::default);

/// Structural equality under the default parameter policy.
pub fn structurally_equal(e1: &Element, e2: &Element) -> bool {
    EqualityEngine::new(&DEFAULT_POLICY).equal(e1, e2)
}

pub struct EqualityEngine<'p> {
    policy: &'p ParameterPolicy,
}

impl<'p> EqualityEngine<'p> {
    pub fn new(policy: &'p ParameterPolicy) -> Self {
        Self { policy }
    }

    /// Ids are ignored: two elements are equal when their content is.
    pub fn equal(&self, e1: &Element, e2: &Element) -> bool {
        if e1.name != e2.name {
            return false;
        }
        if e1.category != e2.category {
            return false;
        }
        if !location_equal(&e1.location, &e2.location) {
            return false;
        }

        let params1 = e1.ordered_parameters();
        let params2 = e2.ordered_parameters();
        if params1.len() != params2.len() {
            return false;
        }

        params1
            .iter()
            .zip(params2.iter())
            .all(|(p1, p2)| self.parameter_slot_equal(p1, p2))
    }

    fn parameter_slot_equal(&self, p1: &Parameter, p2: &Parameter) -> bool {
        let meaningful = self.policy.is_meaningful(p1);
        if meaningful != self.policy.is_meaningful(p2) {
            return false;
        }
        if p1.definition_name != p2.definition_name {
            return false;
        }
        !meaningful || storage_equal(&p1.storage, &p2.storage)
    }
}

pub fn storage_equal(s1: &Storage, s2: &Storage) -> bool {
    if s1.kind() != s2.kind() {
        return false;
    }
    match (s1, s2) {
        (Storage::None, Storage::None) => true,
        (Storage::Integer(a), Storage::Integer(b)) => a == b,
        (Storage::Double(a), Storage::Double(b)) => {
            OrderedFloat(*a) == OrderedFloat(*b) || (a - b).abs() < DOUBLE_TOLERANCE
        }
        _ => s1.text() == s2.text(),
    }
}

pub fn location_equal(l1: &Location, l2: &Location) -> bool {
    match (l1, l2) {
        (Location::None, Location::None) => true,
        (Location::Point(p1), Location::Point(p2)) => xyz_equal(p1, p2),
        (Location::Curve(c1), Location::Curve(c2)) => curve_equal(c1, c2),
        _ => false,
    }
}

fn curve_equal(c1: &Curve, c2: &Curve) -> bool {
    let same_length = same6(c1.length, c2.length);
    match (c1.endpoints(), c2.endpoints()) {
        (Ok((s1, e1)), Ok((s2, e2))) => xyz_equal(&s1, &s2) && xyz_equal(&e1, &e2) && same_length,
        // Unbound on either side: only the length is comparable
        _ => same_length,
    }
}

fn xyz_equal(p1: &Xyz, p2: &Xyz) -> bool {
    same6(p1.x, p2.x) && same6(p1.y, p2.y) && same6(p1.z, p2.z)
}

fn same6(a: f64, b: f64) -> bool {
    OrderedFloat(round6(a)) == OrderedFloat(round6(b))
}
