use std::collections::HashMap;

use modeldiff_core::Snapshot;
use ordered_float::OrderedFloat;

use crate::category::CategoryTree;
use crate::fingerprint::FingerprintTable;
use crate::model::{CollisionReport, DiffSummary, ReconciliationResult};

/// Compute summary statistics for a finished reconciliation.
pub fn compute_summary(
    result: &ReconciliationResult,
    old: &Snapshot,
    new: &Snapshot,
    ignored_categories: &[String],
) -> DiffSummary {
    let tree = CategoryTree::build(result, old, new);
    DiffSummary {
        old_elements: old.len(),
        new_elements: new.len(),
        unchanged: result.unchanged.len(),
        modified: result.modified.len(),
        added: result.added.len(),
        deleted: result.deleted.len(),
        renamed: result.renames.len(),
        meaningful_changes: meaningful_change_count(&tree, ignored_categories),
    }
}

/// Changed ids minus the churn of categories whose display name is ignored.
pub fn meaningful_change_count(tree: &CategoryTree, ignored: &[String]) -> usize {
    let noise: usize = tree
        .categories()
        .filter(|n| ignored.iter().any(|name| *name == n.name))
        .map(|n| n.counts.changed())
        .sum();
    tree.root().counts.changed().saturating_sub(noise)
}

/// For each old fingerprint, every new element sharing it beyond the first
/// counts as a collision. `rate` normalises by the mean snapshot size.
pub fn hash_collision_check(old: &FingerprintTable, new: &FingerprintTable) -> CollisionReport {
    let mut sharers: HashMap<OrderedFloat<f64>, usize> = HashMap::new();
    for (_, fp) in new.iter() {
        *sharers.entry(OrderedFloat(fp)).or_insert(0) += 1;
    }

    let collisions: usize = old
        .iter()
        .map(|(_, fp)| {
            sharers
                .get(&OrderedFloat(fp))
                .copied()
                .unwrap_or(0)
                .saturating_sub(1)
        })
        .sum();

    let total = old.len() + new.len();
    let rate = if total == 0 {
        0.0
    } else {
        collisions as f64 / total as f64 * 2.0
    };

    if collisions > 0 {
        log::info!("fingerprint collisions: {collisions} (rate {rate:.6})");
    }
    CollisionReport { collisions, rate }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldiff_core::{CategoryId, Element, ElementId};

    fn table(values: &[(i64, f64)]) -> FingerprintTable {
        values.iter().map(|&(id, v)| (ElementId(id), v)).collect()
    }

    #[test]
    fn collisions_counted_per_old_fingerprint() {
        let old = table(&[(1, 10.0), (2, 20.0), (3, 30.0)]);
        let new = table(&[(1, 10.0), (5, 10.0), (6, 10.0), (2, 20.0), (9, 99.0)]);
        let report = hash_collision_check(&old, &new);
        assert_eq!(report.collisions, 2);
        assert!((report.rate - 2.0 / 8.0 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn no_collisions_on_empty_tables() {
        let report = hash_collision_check(&FingerprintTable::default(), &FingerprintTable::default());
        assert_eq!(report.collisions, 0);
        assert_eq!(report.rate, 0.0);
    }

    #[test]
    fn summary_excludes_ignored_categories() {
        let old = Snapshot::new(
            "old",
            vec![
                Element::new(1, "view").with_category(-2000279),
                Element::new(2, "wall").with_category(-2000011),
            ],
        )
        .unwrap()
        .with_category_names([
            (CategoryId(-2000279), "OST_Views"),
            (CategoryId(-2000011), "OST_Walls"),
        ]);
        let new = Snapshot::new(
            "new",
            vec![
                Element::new(1, "view 2").with_category(-2000279),
                Element::new(2, "wall 2").with_category(-2000011),
            ],
        )
        .unwrap();
        let mut result = ReconciliationResult::default();
        result.modified.extend([ElementId(1), ElementId(2)]);

        let summary = compute_summary(&result, &old, &new, &["Views".to_string()]);
        assert_eq!(summary.modified, 2);
        assert_eq!(summary.meaningful_changes, 1);
        assert_eq!(summary.old_elements, 2);

        let all = compute_summary(&result, &old, &new, &[]);
        assert_eq!(all.meaningful_changes, 2);
    }
}
