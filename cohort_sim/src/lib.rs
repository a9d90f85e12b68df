//! Cohort population reduction for gridded ecosystem simulations.
//!
//! Each grid cell holds cohorts bucketed by functional group. The merge
//! subsystem keeps the number of tracked cohorts tractable by folding similar
//! cohorts together while conserving biomass. A small headless bevy host runs
//! the merge pass once per step across a whole grid when [`run_step`] is
//! invoked.

mod cohort;
mod grid;
mod grid_cell_cohorts;
pub mod hashing;
pub mod merge;
pub mod merge_config;
pub mod metrics;
pub mod random;
pub mod seeding;
mod systems;

use std::sync::Arc;

use bevy::prelude::*;

pub use cohort::{Cohort, CohortId, Maturity};
pub use grid::{CellMergeReport, CohortGrid, GridCell, GridMergeError, GridMergeSummary};
pub use grid_cell_cohorts::GridCellCohorts;
pub use merge::{
    merge_cohorts, trait_distance, CohortMergeError, CohortMerger, DegenerateTrait,
    GroupReduction, ReductionOutcome,
};
pub use merge_config::{
    load_cohort_merge_config_from_env, CohortMergeConfig, CohortMergeConfigHandle,
    CohortMergeConfigMetadata, MergeStrategy,
};
pub use metrics::MergeMetrics;
pub use random::{MergeRng, UniformSource, DEFAULT_MERGE_SEED};
pub use systems::SimulationStep;

/// Construct a headless [`App`] using the configuration found through
/// `COHORT_MERGE_CONFIG_PATH` (or the builtin defaults).
pub fn build_headless_app() -> App {
    let (config, metadata) = load_cohort_merge_config_from_env();
    let mut app = build_headless_app_with_config(config);
    app.insert_resource(metadata);
    app
}

/// Construct a headless [`App`] with an empty [`CohortGrid`]; callers add
/// cells through `app.world.resource_mut::<CohortGrid>()`.
pub fn build_headless_app_with_config(config: Arc<CohortMergeConfig>) -> App {
    let mut app = App::new();
    let grid = CohortGrid::from_config(&config);

    app.insert_resource(CohortMergeConfigHandle::new(config))
        .insert_resource(grid)
        .insert_resource(SimulationStep::default())
        .insert_resource(MergeMetrics::default())
        .add_plugins(MinimalPlugins)
        .add_systems(
            Update,
            (
                systems::run_cohort_merge,
                systems::clear_extinct_cohorts,
                metrics::collect_merge_metrics,
                systems::advance_step,
            )
                .chain(),
        );

    app
}

/// Execute a single step (merge → extinct cleanup → metrics → step increment).
pub fn run_step(app: &mut App) {
    app.update();
}
