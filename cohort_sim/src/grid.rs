use std::hash::Hasher;

use bevy::prelude::Resource;
use rayon::prelude::*;
use thiserror::Error;

use crate::grid_cell_cohorts::GridCellCohorts;
use crate::hashing::{derive_cell_seed, FnvHasher};
use crate::merge::{CohortMergeError, CohortMerger};
use crate::merge_config::CohortMergeConfig;
use crate::random::MergeRng;

/// One grid cell's cohorts together with the merger that owns its RNG stream.
#[derive(Debug, Clone)]
pub struct GridCell {
    index: u32,
    cohorts: GridCellCohorts,
    merger: CohortMerger<MergeRng>,
}

impl GridCell {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn cohorts(&self) -> &GridCellCohorts {
        &self.cohorts
    }

    pub fn cohorts_mut(&mut self) -> &mut GridCellCohorts {
        &mut self.cohorts
    }

    fn reduce_to_threshold(&mut self, threshold: usize) -> Result<CellMergeReport, GridMergeError> {
        let totals = self.cohorts.live_cohort_counts();
        let targets = vec![threshold; totals.len()];
        let outcome = self
            .merger
            .reduce_to_target(&mut self.cohorts, &totals, &targets)
            .map_err(|source| GridMergeError {
                cell: self.index,
                source,
            })?;
        Ok(CellMergeReport {
            cell: self.index,
            merges: outcome.total_merges(),
            exhausted_groups: outcome.exhausted_groups().count(),
        })
    }

    fn merge_exact_duplicates(&mut self) -> Result<CellMergeReport, GridMergeError> {
        let merges = self
            .merger
            .merge_exact_duplicates(&mut self.cohorts)
            .map_err(|source| GridMergeError {
                cell: self.index,
                source,
            })?;
        Ok(CellMergeReport {
            cell: self.index,
            merges,
            exhausted_groups: 0,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellMergeReport {
    pub cell: u32,
    pub merges: usize,
    pub exhausted_groups: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("cohort merge failed in grid cell {cell}: {source}")]
pub struct GridMergeError {
    pub cell: u32,
    #[source]
    pub source: CohortMergeError,
}

/// Outcome of one grid-wide merge pass, in cell index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridMergeSummary {
    pub reports: Vec<CellMergeReport>,
    pub failures: Vec<GridMergeError>,
}

impl GridMergeSummary {
    fn from_results(results: Vec<Result<CellMergeReport, GridMergeError>>) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result {
                Ok(report) => summary.reports.push(report),
                Err(err) => summary.failures.push(err),
            }
        }
        summary
    }

    pub fn merges(&self) -> usize {
        self.reports.iter().map(|report| report.merges).sum()
    }

    pub fn exhausted_groups(&self) -> usize {
        self.reports.iter().map(|report| report.exhausted_groups).sum()
    }

    /// The failure with the lowest cell index, if any cell failed.
    pub fn first_failure(&self) -> Option<&GridMergeError> {
        self.failures.first()
    }

    pub fn into_result(mut self) -> Result<Vec<CellMergeReport>, GridMergeError> {
        if self.failures.is_empty() {
            Ok(self.reports)
        } else {
            Err(self.failures.swap_remove(0))
        }
    }
}

/// All grid cells of a run.
///
/// Each cell carries its own merge RNG derived from `(seed, cell index)`, so
/// cells can be reduced on separate rayon workers without their results
/// depending on scheduling.
#[derive(Resource, Debug, Clone, Default)]
pub struct CohortGrid {
    cells: Vec<GridCell>,
    seed: u64,
    draw_randomly: bool,
}

impl CohortGrid {
    pub fn new(draw_randomly: bool, seed: u64) -> Self {
        Self {
            cells: Vec::new(),
            seed,
            draw_randomly,
        }
    }

    pub fn from_config(config: &CohortMergeConfig) -> Self {
        Self::new(config.draw_randomly(), config.seed())
    }

    /// Adds a cell and returns its index.
    pub fn push_cell(&mut self, cohorts: GridCellCohorts) -> u32 {
        let index = self.cells.len() as u32;
        let rng = if self.draw_randomly {
            MergeRng::from_entropy()
        } else {
            MergeRng::seeded(derive_cell_seed(self.seed, index))
        };
        self.cells.push(GridCell {
            index,
            cohorts,
            merger: CohortMerger::new(rng),
        });
        index
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn cell(&self, index: u32) -> Option<&GridCell> {
        self.cells.get(index as usize)
    }

    pub fn cell_mut(&mut self, index: u32) -> Option<&mut GridCell> {
        self.cells.get_mut(index as usize)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reduces every functional group of every cell to at most `threshold`
    /// live cohorts. A failing cell is left untouched and reported; the other
    /// cells are still reduced.
    pub fn reduce_to_threshold(&mut self, threshold: usize) -> GridMergeSummary {
        let results: Vec<_> = self
            .cells
            .par_iter_mut()
            .map(|cell| cell.reduce_to_threshold(threshold))
            .collect();
        GridMergeSummary::from_results(results)
    }

    pub fn merge_exact_duplicates(&mut self) -> GridMergeSummary {
        let results: Vec<_> = self
            .cells
            .par_iter_mut()
            .map(GridCell::merge_exact_duplicates)
            .collect();
        GridMergeSummary::from_results(results)
    }

    pub fn remove_extinct_cohorts(&mut self) -> usize {
        self.cells
            .iter_mut()
            .map(|cell| cell.cohorts.remove_extinct_cohorts())
            .sum()
    }

    pub fn live_cohorts(&self) -> usize {
        self.cells
            .iter()
            .map(|cell| cell.cohorts.live_cohort_counts().iter().sum::<usize>())
            .sum()
    }

    pub fn total_biomass(&self) -> f64 {
        self.cells
            .iter()
            .map(|cell| cell.cohorts.total_biomass())
            .sum()
    }

    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::new();
        hasher.write_usize(self.cells.len());
        for cell in &self.cells {
            hasher.write_u32(cell.index);
            cell.cohorts.write_fingerprint(&mut hasher);
        }
        hasher.finish()
    }
}
