use std::time::Instant;

use modeldiff_core::Snapshot;

use crate::config::{DiffConfig, ParameterPolicy, Strategy};
use crate::error::ReconError;
use crate::evidence::{compute_summary, hash_collision_check};
use crate::fingerprint::Fingerprinter;
use crate::model::{DiffRun, ReconciliationResult, RunMeta, Side};
use crate::strategy::{matcher_for, Hints};

/// Classify `old` against `new` with the default parameter policy.
pub fn reconcile(
    old: &Snapshot,
    new: &Snapshot,
    strategy: Strategy,
) -> Result<ReconciliationResult, ReconError> {
    check_inputs(old, new)?;
    let policy = ParameterPolicy::default();
    let result = matcher_for(strategy, &policy).classify(old, new, &Hints::default());
    Ok(result)
}

/// Run reconciliation per config. Returns the partition plus summary and run metadata.
pub fn run(config: &DiffConfig, old: &Snapshot, new: &Snapshot) -> Result<DiffRun, ReconError> {
    check_inputs(old, new)?;
    let started = Instant::now();
    log::info!(
        "reconciling '{}' ({} elements) -> '{}' ({} elements) with strategy {}",
        old.source(),
        old.len(),
        new.source(),
        new.len(),
        config.strategy
    );

    let policy = config.parameter_policy();
    let tables = if config.strategy.uses_fingerprints() || config.diagnostics.collision_check {
        let fingerprinter = Fingerprinter::new(&policy);
        Some((fingerprinter.table(old), fingerprinter.table(new)))
    } else {
        None
    };

    let hints = match &tables {
        Some((fp_old, fp_new)) => Hints::fingerprints(fp_old, fp_new),
        None => Hints::default(),
    };
    let result = matcher_for(config.strategy, &policy).classify(old, new, &hints);

    let collisions = match &tables {
        Some((fp_old, fp_new)) if config.diagnostics.collision_check => {
            Some(hash_collision_check(fp_old, fp_new))
        }
        _ => None,
    };

    let summary = compute_summary(&result, old, new, &config.categories.ignored);
    let elapsed_ms = started.elapsed().as_millis() as u64;
    log::info!(
        "done in {elapsed_ms} ms: {} unchanged, {} modified, {} added, {} deleted, {} renamed",
        summary.unchanged,
        summary.modified,
        summary.added,
        summary.deleted,
        summary.renamed
    );

    Ok(DiffRun {
        meta: RunMeta {
            strategy: config.strategy,
            old_source: old.source().to_string(),
            new_source: new.source().to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            elapsed_ms,
        },
        summary,
        result,
        collisions,
    })
}

/// Two empty snapshots are a valid comparison with an empty result.
fn check_inputs(old: &Snapshot, new: &Snapshot) -> Result<(), ReconError> {
    if old.source() == new.source() {
        return Err(ReconError::SameSnapshot {
            source: old.source().to_string(),
        });
    }
    match (old.is_empty(), new.is_empty()) {
        (true, false) => Err(ReconError::EmptySnapshot { side: Side::Old }),
        (false, true) => Err(ReconError::EmptySnapshot { side: Side::New }),
        _ => Ok(()),
    }
}
