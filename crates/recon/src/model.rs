use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use modeldiff_core::ElementId;
use serde::Serialize;

use crate::config::Strategy;
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Sides + change types
// ---------------------------------------------------------------------------

/// Which of the two snapshots an id or element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Old,
    New,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Old => write!(f, "old"),
            Self::New => write!(f, "new"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Unchanged,
    Modified,
    Added,
    Deleted,
}

impl ChangeType {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Unchanged => "=",
            Self::Modified => "*",
            Self::Added => "+",
            Self::Deleted => "-",
        }
    }

    /// Listing order: modified, deleted, added, then unchanged last.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Modified => 1,
            Self::Deleted => 2,
            Self::Added => 3,
            Self::Unchanged => 10,
        }
    }

    pub fn tooltip(&self) -> &'static str {
        match self {
            Self::Unchanged => "Unchanged element",
            Self::Modified => "Modified element",
            Self::Added => "Added element (exists in the new file)",
            Self::Deleted => "Deleted element (exists in the old file)",
        }
    }

    /// Snapshot the element is read from when describing it.
    pub fn side(&self) -> Side {
        match self {
            Self::Deleted => Side::Old,
            _ => Side::New,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Modified => write!(f, "modified"),
            Self::Added => write!(f, "added"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation result
// ---------------------------------------------------------------------------

/// Four-way partition of both snapshots plus the recovered renames.
///
/// `unchanged`, `modified` and `added` hold new-snapshot ids; `deleted` holds
/// old-snapshot ids that no new element accounts for. `renames` maps
/// `new_id -> old_id` for content matches whose id changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub unchanged: BTreeSet<ElementId>,
    pub modified: BTreeSet<ElementId>,
    pub added: BTreeSet<ElementId>,
    pub deleted: BTreeSet<ElementId>,
    pub renames: BTreeMap<ElementId, ElementId>,
}

impl ReconciliationResult {
    /// Every classified id: modified, added, deleted, unchanged, each group ascending.
    pub fn all(&self) -> Vec<ElementId> {
        let mut seen = BTreeSet::new();
        self.modified
            .iter()
            .chain(&self.added)
            .chain(&self.deleted)
            .chain(&self.unchanged)
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn change_of(&self, id: ElementId) -> Option<ChangeType> {
        if self.modified.contains(&id) {
            Some(ChangeType::Modified)
        } else if self.added.contains(&id) {
            Some(ChangeType::Added)
        } else if self.deleted.contains(&id) {
            Some(ChangeType::Deleted)
        } else if self.unchanged.contains(&id) {
            Some(ChangeType::Unchanged)
        } else {
            None
        }
    }

    pub fn ids(&self, change: ChangeType) -> &BTreeSet<ElementId> {
        match change {
            ChangeType::Unchanged => &self.unchanged,
            ChangeType::Modified => &self.modified,
            ChangeType::Added => &self.added,
            ChangeType::Deleted => &self.deleted,
        }
    }

    /// Old id of the logical element `new_id` names (identity unless renamed).
    pub fn origin_of(&self, new_id: ElementId) -> ElementId {
        self.renames.get(&new_id).copied().unwrap_or(new_id)
    }

    /// Old ids consumed by a rename match.
    pub fn rename_sources(&self) -> BTreeSet<ElementId> {
        self.renames.values().copied().collect()
    }

    pub fn changed_count(&self) -> usize {
        self.modified.len() + self.added.len() + self.deleted.len()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub old_elements: usize,
    pub new_elements: usize,
    pub unchanged: usize,
    pub modified: usize,
    pub added: usize,
    pub deleted: usize,
    pub renamed: usize,
    /// Changed ids outside the configured noise categories.
    pub meaningful_changes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionReport {
    pub collisions: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub strategy: Strategy,
    pub old_source: String,
    pub new_source: String,
    pub engine_version: String,
    pub run_at: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffRun {
    pub meta: RunMeta,
    pub summary: DiffSummary,
    pub result: ReconciliationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collisions: Option<CollisionReport>,
}

impl DiffRun {
    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Output(e.to_string()))
    }
}
