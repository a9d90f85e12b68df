use anyhow::{ensure, Result};
use clap::Parser;
use rand::{rngs::SmallRng, SeedableRng};
use tracing::info;

use cohort_sim::seeding::{seed_synthetic_cell, SyntheticCellSpec};
use cohort_sim::{
    build_headless_app, run_step, CohortGrid, CohortMergeConfigHandle, CohortMergeConfigMetadata,
    MergeMetrics,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs cohort merge passes over a synthetic grid", long_about = None)]
struct Cli {
    /// Number of grid cells to seed.
    #[arg(long, default_value_t = 16)]
    cells: u32,
    /// Functional groups per cell.
    #[arg(long, default_value_t = 4)]
    functional_groups: usize,
    /// Cohorts seeded into every functional group before each step.
    #[arg(long, default_value_t = 40)]
    cohorts_per_group: usize,
    /// Probability that a seeded cohort copies its predecessor exactly.
    #[arg(long, default_value_t = 0.0)]
    duplicate_fraction: f64,
    /// Steps to simulate; every step reseeds and then merges.
    #[arg(long, default_value_t = 12)]
    steps: u32,
    /// Seed for synthetic cohort generation.
    #[arg(long, default_value_t = 1)]
    population_seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    ensure!(
        (0.0..=1.0).contains(&cli.duplicate_fraction),
        "duplicate fraction must lie in [0, 1], got {}",
        cli.duplicate_fraction
    );

    let mut app = build_headless_app();
    let config = app.world.resource::<CohortMergeConfigHandle>().get();
    let config_path = app
        .world
        .get_resource::<CohortMergeConfigMetadata>()
        .and_then(|metadata| metadata.path().map(|path| path.display().to_string()))
        .unwrap_or_else(|| "builtin".to_string());
    info!(
        target: "cohort_sim::driver",
        config = %config_path,
        strategy = ?config.strategy(),
        threshold = config.cohort_threshold_per_group(),
        seed = config.seed(),
        draw_randomly = config.draw_randomly(),
        cells = cli.cells,
        "cohort merge driver ready"
    );

    let spec = SyntheticCellSpec {
        functional_groups: cli.functional_groups,
        cohorts_per_group: cli.cohorts_per_group,
        duplicate_fraction: cli.duplicate_fraction,
        ..SyntheticCellSpec::default()
    };
    let mut rng = SmallRng::seed_from_u64(cli.population_seed);
    let mut next_id = 0;

    {
        let mut grid = app.world.resource_mut::<CohortGrid>();
        for _ in 0..cli.cells {
            grid.push_cell(seed_synthetic_cell(&spec, &mut rng, &mut next_id));
        }
    }

    for step in 0..cli.steps {
        if step > 0 {
            reseed_cells(&mut app.world.resource_mut::<CohortGrid>(), &spec, &mut rng, &mut next_id);
        }
        run_step(&mut app);

        let metrics = app.world.resource::<MergeMetrics>();
        info!(
            target: "cohort_sim::driver",
            step = metrics.step,
            merges = metrics.merges_last_step,
            exhausted_groups = metrics.exhausted_groups_last_step,
            removed = metrics.removed_last_step,
            live_cohorts = metrics.live_cohorts,
            total_biomass = metrics.total_biomass,
            "step.completed"
        );
        ensure!(
            metrics.failed_cells_last_step == 0,
            "cohort merge failed at step {}",
            metrics.step
        );
    }

    let grid = app.world.resource::<CohortGrid>();
    let metrics = app.world.resource::<MergeMetrics>();
    info!(
        target: "cohort_sim::driver",
        total_merges = metrics.total_merges,
        live_cohorts = grid.live_cohorts(),
        fingerprint = %format!("{:016x}", grid.fingerprint()),
        "cohort merge driver finished"
    );
    Ok(())
}

/// Adds a fresh batch of cohorts to every cell, standing in for the
/// reproduction and dispersal processes that normally grow the population.
fn reseed_cells(
    grid: &mut CohortGrid,
    spec: &SyntheticCellSpec,
    rng: &mut SmallRng,
    next_id: &mut u64,
) {
    for index in 0..grid.len() as u32 {
        let batch = seed_synthetic_cell(spec, rng, next_id);
        if let Some(cell) = grid.cell_mut(index) {
            for (group, cohorts) in batch.iter_groups().enumerate() {
                for cohort in cohorts {
                    cell.cohorts_mut().push(group, cohort.clone());
                }
            }
        }
    }
}
