#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Once;

use anyhow::{Context, Result};
use cohort_sim::seeding::{seed_synthetic_cell, SyntheticCellSpec};
use cohort_sim::GridCellCohorts;
use rand::{rngs::SmallRng, SeedableRng};

static INIT: Once = Once::new();

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixtures_dir().join("test_cohort_merge_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test cohort merge config at {}",
            config_path.display()
        );

        std::env::set_var("COHORT_MERGE_CONFIG_PATH", &config_path);
    });
}

pub fn load_cell(name: &str) -> Result<GridCellCohorts> {
    let path = fixtures_dir().join(name);
    let contents =
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

pub fn synthetic_cell(seed: u64, functional_groups: usize, cohorts_per_group: usize) -> GridCellCohorts {
    let spec = SyntheticCellSpec {
        functional_groups,
        cohorts_per_group,
        ..SyntheticCellSpec::default()
    };
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut next_id = seed * 10_000;
    seed_synthetic_cell(&spec, &mut rng, &mut next_id)
}
