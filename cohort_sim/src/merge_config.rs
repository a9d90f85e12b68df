//! Configuration for the cohort merge pass.
//!
//! Loaded from `cohort_merge_config.json`, overridable with the
//! `COHORT_MERGE_CONFIG_PATH` environment variable.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;

use crate::random::DEFAULT_MERGE_SEED;

pub const BUILTIN_COHORT_MERGE_CONFIG: &str = include_str!("data/cohort_merge_config.json");

/// Which reducer the host runs each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Distance-based reduction down to `cohort_threshold_per_group`.
    #[default]
    Threshold,
    /// Exact-duplicate collapsing for dispersal-only runs.
    ExactDuplicates,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CohortMergeConfig {
    draw_randomly: bool,
    seed: u64,
    strategy: MergeStrategy,
    cohort_threshold_per_group: usize,
    remove_extinct: bool,
}

impl Default for CohortMergeConfig {
    fn default() -> Self {
        Self {
            draw_randomly: false,
            seed: DEFAULT_MERGE_SEED,
            strategy: MergeStrategy::Threshold,
            cohort_threshold_per_group: 25,
            remove_extinct: true,
        }
    }
}

impl CohortMergeConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_COHORT_MERGE_CONFIG)
                .expect("builtin cohort merge config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, CohortMergeConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| CohortMergeConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let config = CohortMergeConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn draw_randomly(&self) -> bool {
        self.draw_randomly
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    pub fn cohort_threshold_per_group(&self) -> usize {
        self.cohort_threshold_per_group
    }

    pub fn remove_extinct(&self) -> bool {
        self.remove_extinct
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_draw_randomly(mut self, draw_randomly: bool) -> Self {
        self.draw_randomly = draw_randomly;
        self
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_cohort_threshold_per_group(mut self, threshold: usize) -> Self {
        self.cohort_threshold_per_group = threshold;
        self
    }

    pub fn with_remove_extinct(mut self, remove_extinct: bool) -> Self {
        self.remove_extinct = remove_extinct;
        self
    }
}

#[derive(Debug, Error)]
pub enum CohortMergeConfigError {
    #[error("failed to parse cohort merge config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read cohort merge config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Resource, Debug, Clone)]
pub struct CohortMergeConfigHandle(pub Arc<CohortMergeConfig>);

impl CohortMergeConfigHandle {
    pub fn new(config: Arc<CohortMergeConfig>) -> Self {
        Self(config)
    }

    pub fn get(&self) -> Arc<CohortMergeConfig> {
        Arc::clone(&self.0)
    }

    pub fn config(&self) -> &CohortMergeConfig {
        &self.0
    }

    pub fn replace(&mut self, config: Arc<CohortMergeConfig>) {
        self.0 = config;
    }
}

#[derive(Resource, Debug, Clone)]
pub struct CohortMergeConfigMetadata {
    path: Option<PathBuf>,
}

impl CohortMergeConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

pub fn load_cohort_merge_config_from_env() -> (Arc<CohortMergeConfig>, CohortMergeConfigMetadata) {
    let override_path = env::var("COHORT_MERGE_CONFIG_PATH")
        .ok()
        .map(PathBuf::from);
    let default_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/cohort_merge_config.json");
    let path = override_path.unwrap_or(default_path);

    match CohortMergeConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "cohort_sim::config",
                path = %path.display(),
                "cohort_merge_config.loaded=file"
            );
            return (Arc::new(config), CohortMergeConfigMetadata::new(Some(path)));
        }
        Err(err) => {
            tracing::warn!(
                target: "cohort_sim::config",
                path = %path.display(),
                error = %err,
                "cohort_merge_config.load_failed"
            );
        }
    }

    let config = CohortMergeConfig::builtin();
    tracing::info!(
        target: "cohort_sim::config",
        "cohort_merge_config.loaded=builtin"
    );
    (config, CohortMergeConfigMetadata::new(None))
}
