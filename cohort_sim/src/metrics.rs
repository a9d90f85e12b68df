use bevy::prelude::*;

use crate::grid::CohortGrid;

/// Per-step merge counters gathered by the headless host.
#[derive(Resource, Default, Debug, Clone, PartialEq)]
pub struct MergeMetrics {
    pub step: u64,
    pub merges_last_step: usize,
    pub total_merges: u64,
    pub exhausted_groups_last_step: usize,
    pub removed_last_step: usize,
    pub failed_cells_last_step: usize,
    pub live_cohorts: usize,
    pub total_biomass: f64,
}

impl MergeMetrics {
    pub(crate) fn record_merges(&mut self, merges: usize, exhausted_groups: usize) {
        self.merges_last_step = merges;
        self.exhausted_groups_last_step = exhausted_groups;
        self.total_merges += merges as u64;
    }
}

pub fn collect_merge_metrics(grid: Res<CohortGrid>, mut metrics: ResMut<MergeMetrics>) {
    metrics.step += 1;
    metrics.live_cohorts = grid.live_cohorts();
    metrics.total_biomass = grid.total_biomass();
}
