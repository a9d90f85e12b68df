use bevy::prelude::*;
use tracing::{error, info};

use crate::{
    grid::CohortGrid,
    merge_config::{CohortMergeConfigHandle, MergeStrategy},
    metrics::MergeMetrics,
};

/// Tracks simulation steps elapsed.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationStep(pub u64);

pub fn run_cohort_merge(
    config: Res<CohortMergeConfigHandle>,
    step: Res<SimulationStep>,
    mut grid: ResMut<CohortGrid>,
    mut metrics: ResMut<MergeMetrics>,
) {
    let config = config.get();
    let summary = match config.strategy() {
        MergeStrategy::Threshold => grid.reduce_to_threshold(config.cohort_threshold_per_group()),
        MergeStrategy::ExactDuplicates => grid.merge_exact_duplicates(),
    };

    let merges = summary.merges();
    let exhausted = summary.exhausted_groups();
    metrics.record_merges(merges, exhausted);
    metrics.failed_cells_last_step = summary.failures.len();

    if let Some(err) = summary.first_failure() {
        error!(
            target: "cohort_sim::grid",
            step = step.0,
            cell = err.cell,
            failed_cells = summary.failures.len(),
            error = %err,
            "cohort_merge.failed"
        );
    }
    info!(
        target: "cohort_sim::grid",
        step = step.0,
        strategy = ?config.strategy(),
        cells = summary.reports.len(),
        merges,
        exhausted_groups = exhausted,
        "cohort_merge.completed"
    );
}

pub fn clear_extinct_cohorts(
    config: Res<CohortMergeConfigHandle>,
    mut grid: ResMut<CohortGrid>,
    mut metrics: ResMut<MergeMetrics>,
) {
    if !config.config().remove_extinct() {
        metrics.removed_last_step = 0;
        return;
    }
    metrics.removed_last_step = grid.remove_extinct_cohorts();
}

pub fn advance_step(mut step: ResMut<SimulationStep>) {
    step.0 += 1;
}
