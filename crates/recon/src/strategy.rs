//! The four classification strategies behind one [`MatchStrategy`] interface.
//!
//! | strategy | renames | verdicts |
//! |---|---|---|
//! | [`MergeJoin`] (M) | never | exact, assumes ids are stable |
//! | [`ContentMatch`] (C) | yes | exact |
//! | [`HashedContentMatch`] verified (CHc) | yes | exact |
//! | [`HashedContentMatch`] quick (CHc-quick) | yes | probabilistic |

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use modeldiff_core::{Element, ElementId, Snapshot};

use crate::config::{ParameterPolicy, Strategy};
use crate::equality::EqualityEngine;
use crate::fingerprint::{same_fingerprint, FingerprintTable, Fingerprinter};
use crate::model::ReconciliationResult;

/// Precomputed inputs a strategy may use instead of deriving them itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hints<'a> {
    pub old: Option<&'a FingerprintTable>,
    pub new: Option<&'a FingerprintTable>,
}

impl<'a> Hints<'a> {
    pub fn fingerprints(old: &'a FingerprintTable, new: &'a FingerprintTable) -> Self {
        Self {
            old: Some(old),
            new: Some(new),
        }
    }
}

pub trait MatchStrategy {
    /// Partition `old` and `new`. Never mutates either snapshot.
    fn classify(&self, old: &Snapshot, new: &Snapshot, hints: &Hints<'_>) -> ReconciliationResult;
}

/// Strategy object for `strategy` under `policy`.
pub fn matcher_for<'p>(strategy: Strategy, policy: &'p ParameterPolicy) -> Box<dyn MatchStrategy + 'p> {
    match strategy {
        Strategy::Merge => Box::new(MergeJoin::new(policy)),
        Strategy::Content => Box::new(ContentMatch::new(policy)),
        Strategy::HashedContent => Box::new(HashedContentMatch::verified(policy)),
        Strategy::HashedContentQuick => Box::new(HashedContentMatch::quick(policy)),
    }
}

// ---------------------------------------------------------------------------
// M: merge-join on ids
// ---------------------------------------------------------------------------

/// Two-cursor walk over both id-sorted element lists.
///
/// Treats an id as the identity of a logical element, so a renumbered element
/// always surfaces as one deletion plus one addition. Results are only
/// meaningful when ids are stable and monotonic across the two snapshots.
pub struct MergeJoin<'p> {
    equality: EqualityEngine<'p>,
}

impl<'p> MergeJoin<'p> {
    pub fn new(policy: &'p ParameterPolicy) -> Self {
        Self {
            equality: EqualityEngine::new(policy),
        }
    }
}

impl MatchStrategy for MergeJoin<'_> {
    fn classify(&self, old: &Snapshot, new: &Snapshot, _hints: &Hints<'_>) -> ReconciliationResult {
        let mut result = ReconciliationResult::default();
        let (a, b) = (old.elements(), new.elements());
        let (mut i, mut j) = (0, 0);

        while i < a.len() && j < b.len() {
            match a[i].id.cmp(&b[j].id) {
                Ordering::Less => {
                    result.deleted.insert(a[i].id);
                    i += 1;
                }
                Ordering::Equal => {
                    if self.equality.equal(&a[i], &b[j]) {
                        result.unchanged.insert(b[j].id);
                    } else {
                        result.modified.insert(b[j].id);
                    }
                    i += 1;
                    j += 1;
                }
                Ordering::Greater => {
                    result.added.insert(b[j].id);
                    j += 1;
                }
            }
        }
        result.deleted.extend(a[i..].iter().map(|e| e.id));
        result.added.extend(b[j..].iter().map(|e| e.id));

        result
    }
}

// ---------------------------------------------------------------------------
// C: content matching
// ---------------------------------------------------------------------------

pub struct ContentMatch<'p> {
    equality: EqualityEngine<'p>,
}

impl<'p> ContentMatch<'p> {
    pub fn new(policy: &'p ParameterPolicy) -> Self {
        Self {
            equality: EqualityEngine::new(policy),
        }
    }
}

impl MatchStrategy for ContentMatch<'_> {
    fn classify(&self, old: &Snapshot, new: &Snapshot, _hints: &Hints<'_>) -> ReconciliationResult {
        two_phase(old, new, |e1, e2| self.equality.equal(e1, e2))
    }
}

// ---------------------------------------------------------------------------
// CHc / CHc-quick: fingerprint-filtered content matching
// ---------------------------------------------------------------------------

/// Content matching that compares fingerprints first.
///
/// Verified mode confirms every fingerprint hit structurally. Quick mode
/// accepts a fingerprint hit as proof: a collision between different content
/// produces a wrong Unchanged (or rename) verdict. That risk is the price of
/// the quick mode's throughput and is deliberately not checked.
pub struct HashedContentMatch<'p> {
    policy: &'p ParameterPolicy,
    equality: EqualityEngine<'p>,
    verify: bool,
}

impl<'p> HashedContentMatch<'p> {
    pub fn verified(policy: &'p ParameterPolicy) -> Self {
        Self {
            policy,
            equality: EqualityEngine::new(policy),
            verify: true,
        }
    }

    pub fn quick(policy: &'p ParameterPolicy) -> Self {
        Self {
            verify: false,
            ..Self::verified(policy)
        }
    }
}

impl MatchStrategy for HashedContentMatch<'_> {
    fn classify(&self, old: &Snapshot, new: &Snapshot, hints: &Hints<'_>) -> ReconciliationResult {
        let fingerprinter = Fingerprinter::new(self.policy);
        let fp_old: Cow<'_, FingerprintTable> = match hints.old {
            Some(t) => Cow::Borrowed(t),
            None => Cow::Owned(fingerprinter.table(old)),
        };
        let fp_new: Cow<'_, FingerprintTable> = match hints.new {
            Some(t) => Cow::Borrowed(t),
            None => Cow::Owned(fingerprinter.table(new)),
        };
        let lookup = |table: &FingerprintTable, e: &Element| {
            table.get(e.id).unwrap_or_else(|| fingerprinter.fingerprint(e))
        };

        two_phase(old, new, |e1, e2| {
            same_fingerprint(lookup(&*fp_old, e1), lookup(&*fp_new, e2))
                && (!self.verify || self.equality.equal(e1, e2))
        })
    }
}

// ---------------------------------------------------------------------------
// Shared two-phase driver
// ---------------------------------------------------------------------------

/// Phase 1 settles ids that persisted with unchanged content. Phase 2 scans,
/// in ascending id order on both sides, for the first remaining new element
/// with the same content. A remaining new id that is also still pending on
/// the old side is reserved for its own id, so it is never claimed by a
/// rename; this keeps deleted ids disjoint from new-snapshot ids.
///
/// An old element whose only matches are reserved waits for the next pass.
/// Passes repeat while they recover renames, so a shifted block
/// (`1,2,3 -> 2,3,4`) resolves from its free end inwards.
fn two_phase<F>(old: &Snapshot, new: &Snapshot, same: F) -> ReconciliationResult
where
    F: Fn(&Element, &Element) -> bool,
{
    let mut result = ReconciliationResult::default();
    let mut old_left: BTreeMap<ElementId, &Element> =
        old.elements().iter().map(|e| (e.id, e)).collect();
    let mut new_left: BTreeMap<ElementId, &Element> =
        new.elements().iter().map(|e| (e.id, e)).collect();

    for e1 in old.elements() {
        if let Some(e2) = new.get(e1.id) {
            if same(e1, e2) {
                result.unchanged.insert(e1.id);
                old_left.remove(&e1.id);
                new_left.remove(&e1.id);
            }
        }
    }
    log::debug!(
        "phase 1: {} unchanged by id, {} old / {} new pending",
        result.unchanged.len(),
        old_left.len(),
        new_left.len()
    );

    let mut pending: Vec<ElementId> = old_left.keys().copied().collect();
    let mut passes = 0usize;
    while !pending.is_empty() {
        passes += 1;
        let recovered = result.renames.len();
        let mut waiting = Vec::new();

        for old_id in pending {
            let Some(&e1) = old_left.get(&old_id) else {
                continue;
            };
            let mut found = None;
            let mut blocked = false;
            for e2 in new_left.values() {
                if e2.id == old_id {
                    continue;
                }
                let reserved = old_left.contains_key(&e2.id);
                if (reserved && blocked) || !same(e1, e2) {
                    continue;
                }
                if reserved {
                    blocked = true;
                } else {
                    found = Some(e2.id);
                    break;
                }
            }

            match found {
                Some(new_id) => {
                    result.unchanged.insert(new_id);
                    result.renames.insert(new_id, old_id);
                    old_left.remove(&old_id);
                    new_left.remove(&new_id);
                }
                None if blocked => waiting.push(old_id),
                None => {}
            }
        }

        if result.renames.len() == recovered {
            break;
        }
        pending = waiting;
    }
    log::debug!(
        "phase 2: {} renames recovered in {passes} passes",
        result.renames.len()
    );

    for old_id in old_left.keys() {
        if new_left.remove(old_id).is_some() {
            result.modified.insert(*old_id);
        } else {
            result.deleted.insert(*old_id);
        }
    }
    result.added.extend(new_left.keys().copied());

    result
}
