//! Cohort population reduction.
//!
//! Two independent reducers share the [`CohortMerger`] and its injected RNG:
//!
//! - [`CohortMerger::reduce_to_target`] greedily merges the closest cohort
//!   pairs in trait space until each functional group reaches its target count.
//! - [`CohortMerger::merge_exact_duplicates`] collapses cohorts whose mass
//!   traits are bit-identical, used when dispersal keeps reseeding a cell.
//!
//! Both keep cohort slots in place; absorbed cohorts end with zero abundance.

mod distance;
mod duplicates;
mod threshold;

use thiserror::Error;

use crate::random::{MergeRng, UniformSource};

pub use distance::{merge_cohorts, trait_distance, DegenerateTrait};
pub use threshold::{GroupReduction, ReductionOutcome};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CohortMergeError {
    #[error("cohort {index} in functional group {functional_group} cannot be merged: {source}")]
    DegenerateCohort {
        functional_group: usize,
        index: usize,
        #[source]
        source: DegenerateTrait,
    },
    #[error(
        "count tables cover {totals} totals and {targets} targets but the cell holds {functional_groups} functional groups"
    )]
    CountTableMismatch {
        functional_groups: usize,
        totals: usize,
        targets: usize,
    },
}

/// Runs merge passes over one grid cell at a time, drawing orientation coin
/// flips from its own uniform source.
#[derive(Debug, Clone, Default)]
pub struct CohortMerger<R = MergeRng> {
    rng: R,
}

impl<R: UniformSource> CohortMerger<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    pub fn into_rng(self) -> R {
        self.rng
    }

    /// Draws the coin flip deciding which cohort of a pair is retained.
    fn first_is_retained(&mut self) -> bool {
        self.rng.next_uniform() < 0.5
    }
}

impl CohortMerger<MergeRng> {
    pub fn from_settings(draw_randomly: bool, seed: u64) -> Self {
        Self::new(MergeRng::from_settings(draw_randomly, seed))
    }
}

/// Disjoint mutable borrows of two slots in one bucket.
pub(crate) fn pair_mut<T>(items: &mut [T], first: usize, second: usize) -> (&mut T, &mut T) {
    assert_ne!(first, second, "a cohort cannot be merged with itself");
    if first < second {
        let (head, tail) = items.split_at_mut(second);
        (&mut head[first], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(first);
        (&mut tail[0], &mut head[second])
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_mut_handles_both_orders() {
        let mut values = [1, 2, 3, 4];
        {
            let (a, b) = pair_mut(&mut values, 0, 3);
            *a += 10;
            *b += 20;
        }
        {
            let (a, b) = pair_mut(&mut values, 2, 1);
            *a += 100;
            *b += 200;
        }
        assert_eq!(values, [11, 202, 103, 24]);
    }

    #[test]
    #[should_panic]
    fn pair_mut_rejects_same_slot() {
        let mut values = [1, 2];
        let _ = pair_mut(&mut values, 1, 1);
    }
}
