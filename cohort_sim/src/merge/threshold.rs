use tracing::{debug, info};

use super::{merge_cohorts, pair_mut, trait_distance, CohortMerger, CohortMergeError};
use crate::cohort::Cohort;
use crate::grid_cell_cohorts::GridCellCohorts;
use crate::random::UniformSource;

/// A candidate merge with its orientation fixed by a coin flip.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CandidatePair {
    distance: f64,
    to: usize,
    from: usize,
}

/// Result of reducing a single functional group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupReduction {
    pub functional_group: usize,
    pub requested: usize,
    pub merged: usize,
}

impl GroupReduction {
    /// True when the candidate pairs ran out before the target was reached.
    pub fn exhausted(&self) -> bool {
        self.merged < self.requested
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReductionOutcome {
    pub groups: Vec<GroupReduction>,
}

impl ReductionOutcome {
    pub fn total_merges(&self) -> usize {
        self.groups.iter().map(|group| group.merged).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.groups.iter().all(|group| !group.exhausted())
    }

    pub fn exhausted_groups(&self) -> impl Iterator<Item = &GroupReduction> + '_ {
        self.groups.iter().filter(|group| group.exhausted())
    }
}

impl<R: UniformSource> CohortMerger<R> {
    /// Merges the closest cohort pairs of every functional group until
    /// `total_counts[g] - target_counts[g]` merges have been applied to group
    /// `g`, or its candidate pairs run out.
    ///
    /// Candidate pairs for all groups are ranked (and every coin flip drawn)
    /// before any cohort is touched, so a degenerate cohort aborts the call
    /// with the cell unchanged. A target above the current total requests no
    /// merges. A cohort takes part in at most one merge per group pass, and
    /// `merged_this_time_step` is cleared on the whole group once its pass ends.
    pub fn reduce_to_target(
        &mut self,
        cohorts: &mut GridCellCohorts,
        total_counts: &[usize],
        target_counts: &[usize],
    ) -> Result<ReductionOutcome, CohortMergeError> {
        let functional_groups = cohorts.functional_group_count();
        if total_counts.len() < functional_groups || target_counts.len() < functional_groups {
            return Err(CohortMergeError::CountTableMismatch {
                functional_groups,
                totals: total_counts.len(),
                targets: target_counts.len(),
            });
        }

        let mut ranked_by_group = Vec::with_capacity(functional_groups);
        for (group, bucket) in cohorts.iter_groups().enumerate() {
            ranked_by_group.push(self.rank_candidate_pairs(group, bucket)?);
        }

        let mut outcome = ReductionOutcome {
            groups: Vec::with_capacity(functional_groups),
        };
        for (group, (bucket, ranked)) in cohorts
            .groups_mut()
            .iter_mut()
            .zip(ranked_by_group)
            .enumerate()
        {
            let requested = total_counts[group].saturating_sub(target_counts[group]);
            let applied = apply_closest_merges(bucket, &ranked, requested);
            for cohort in bucket.iter_mut() {
                cohort.merged_this_time_step = false;
            }
            let merged = applied.map_err(|(index, source)| CohortMergeError::DegenerateCohort {
                functional_group: group,
                index,
                source,
            })?;

            let reduction = GroupReduction {
                functional_group: group,
                requested,
                merged,
            };
            if reduction.exhausted() {
                info!(
                    target: "cohort_sim::merge",
                    functional_group = group,
                    requested,
                    merged,
                    candidates = ranked.len(),
                    "merge.exhausted=candidate_pairs"
                );
            } else if requested > 0 {
                debug!(
                    target: "cohort_sim::merge",
                    functional_group = group,
                    merged,
                    "merge.reduced=threshold"
                );
            }
            outcome.groups.push(reduction);
        }

        Ok(outcome)
    }

    /// Every unordered pair of the bucket, oriented by one coin flip each and
    /// sorted (stably) by ascending distance.
    fn rank_candidate_pairs(
        &mut self,
        group: usize,
        bucket: &[Cohort],
    ) -> Result<Vec<CandidatePair>, CohortMergeError> {
        let count = bucket.len();
        let mut pairs = Vec::with_capacity(count * count.saturating_sub(1) / 2);
        for i in 0..count {
            for j in (i + 1)..count {
                let (to, from) = if self.first_is_retained() {
                    (i, j)
                } else {
                    (j, i)
                };
                let distance = trait_distance(&bucket[to], &bucket[from]).map_err(|source| {
                    CohortMergeError::DegenerateCohort {
                        functional_group: group,
                        index: to,
                        source,
                    }
                })?;
                pairs.push(CandidatePair { distance, to, from });
            }
        }
        pairs.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(pairs)
    }
}

/// Walks `ranked` from the closest pair, merging pairs whose cohorts are both
/// still untouched this pass. Errors carry the index of the retained cohort.
fn apply_closest_merges(
    bucket: &mut [Cohort],
    ranked: &[CandidatePair],
    requested: usize,
) -> Result<usize, (usize, super::DegenerateTrait)> {
    let mut merged = 0;
    for pair in ranked {
        if merged >= requested {
            break;
        }
        if bucket[pair.to].merged_this_time_step || bucket[pair.from].merged_this_time_step {
            continue;
        }
        let (to, from) = pair_mut(bucket, pair.to, pair.from);
        merge_cohorts(to, from).map_err(|source| (pair.to, source))?;
        to.merged_this_time_step = true;
        from.merged_this_time_step = true;
        merged += 1;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::test_support::{cohort, ScriptedDraws};
    use crate::random::MergeRng;

    fn scenario_cell() -> GridCellCohorts {
        let mut cells = GridCellCohorts::with_functional_groups(1);
        for (id, body) in [5.0, 5.01, 8.0, 8.02].into_iter().enumerate() {
            cells.push(0, cohort(id as u64, 10.0, 1.0, body, 10.0));
        }
        cells
    }

    #[test]
    fn closest_pairs_merge_first() {
        let mut cells = scenario_cell();
        let biomass = cells.total_biomass();
        let mut merger = CohortMerger::new(MergeRng::seeded(11));

        let outcome = merger
            .reduce_to_target(&mut cells, &[4], &[2])
            .expect("valid cell");

        assert_eq!(outcome.total_merges(), 2);
        assert!(outcome.is_complete());
        assert_eq!(cells.live_cohort_counts(), vec![2]);

        let group = cells.group(0);
        let light = [&group[0], &group[1]];
        let heavy = [&group[2], &group[3]];
        assert_eq!(light.iter().filter(|c| c.abundance > 0.0).count(), 1);
        assert_eq!(heavy.iter().filter(|c| c.abundance > 0.0).count(), 1);
        assert!((cells.total_biomass() - biomass).abs() < 1e-9);
    }

    #[test]
    fn coin_flip_selects_retained_cohort() {
        // Pair order: (0,1) (0,2) (0,3) (1,2) (1,3) (2,3).
        let draws = [0.9, 0.1, 0.1, 0.1, 0.1, 0.2];
        let mut cells = scenario_cell();
        let mut merger = CohortMerger::new(ScriptedDraws::new(&draws));

        merger
            .reduce_to_target(&mut cells, &[4], &[2])
            .expect("valid cell");

        let group = cells.group(0);
        assert_eq!(group[0].abundance, 0.0);
        assert!((group[1].abundance - (10.0 + 10.0 * 5.0 / 5.01)).abs() < 1e-9);
        assert!((group[2].abundance - (10.0 + 10.0 * 8.02 / 8.0)).abs() < 1e-9);
        assert_eq!(group[3].abundance, 0.0);
        assert_eq!(merger.into_rng().consumed, 6);
    }

    #[test]
    fn pass_flags_are_cleared_and_no_cohort_merges_twice() {
        let mut cells = GridCellCohorts::with_functional_groups(1);
        for id in 0..6 {
            cells.push(0, cohort(id, 10.0, 1.0, 5.0 + id as f64 * 0.01, 1.0));
        }
        let mut merger = CohortMerger::new(MergeRng::seeded(2));

        let outcome = merger
            .reduce_to_target(&mut cells, &[6], &[1])
            .expect("valid cell");

        // Six cohorts pair off into at most three disjoint merges.
        assert_eq!(outcome.total_merges(), 3);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.groups[0].requested, 5);
        assert_eq!(cells.live_cohort_counts(), vec![3]);
        assert!(cells
            .group(0)
            .iter()
            .all(|cohort| !cohort.merged_this_time_step));
        assert!(cells.group(0).iter().all(|cohort| cohort.merged));
    }

    #[test]
    fn target_above_total_requests_nothing() {
        let mut cells = scenario_cell();
        let before = cells.clone();
        let mut merger = CohortMerger::new(ScriptedDraws::constant(0.3));

        let outcome = merger
            .reduce_to_target(&mut cells, &[4], &[9])
            .expect("valid cell");

        assert_eq!(outcome.total_merges(), 0);
        assert!(outcome.is_complete());
        assert_eq!(cells, before);
        // Pair orientation is still drawn for every candidate.
        assert_eq!(merger.into_rng().consumed, 6);
    }

    #[test]
    fn single_cohort_group_reports_exhaustion() {
        let mut cells = GridCellCohorts::with_functional_groups(2);
        cells.push(0, cohort(1, 10.0, 1.0, 5.0, 1.0));
        cells.push(1, cohort(2, 10.0, 1.0, 5.0, 1.0));
        cells.push(1, cohort(3, 10.0, 1.0, 5.5, 1.0));
        let mut merger = CohortMerger::new(MergeRng::default());

        let outcome = merger
            .reduce_to_target(&mut cells, &[1, 2], &[0, 1])
            .expect("valid cell");

        assert_eq!(outcome.groups[0].merged, 0);
        assert!(outcome.groups[0].exhausted());
        assert_eq!(outcome.groups[1].merged, 1);
        assert_eq!(outcome.exhausted_groups().count(), 1);
        assert_eq!(outcome.total_merges(), 1);
    }

    #[test]
    fn zero_abundance_remnant_still_competes_for_merges() {
        let mut cells = GridCellCohorts::with_functional_groups(1);
        cells.push(0, cohort(1, 10.0, 1.0, 5.0, 0.0));
        cells.push(0, cohort(2, 10.0, 1.0, 5.0, 2.0));
        cells.push(0, cohort(3, 10.0, 1.0, 9.0, 2.0));
        let mut merger = CohortMerger::new(MergeRng::seeded(3));

        let outcome = merger
            .reduce_to_target(&mut cells, &[3], &[2])
            .expect("valid cell");

        // The remnant pairs with its identical neighbour, so the merge does
        // not lower the live count.
        assert_eq!(outcome.total_merges(), 1);
        assert_eq!(cells.live_cohort_counts(), vec![2]);
        let group = cells.group(0);
        assert!(group[0].merged && group[1].merged);
        assert!(!group[2].merged);
        assert_eq!(group[2].abundance, 2.0);
        assert!((group[0].abundance + group[1].abundance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn groups_are_never_mixed() {
        let mut cells = GridCellCohorts::with_functional_groups(2);
        cells.push(0, cohort(1, 10.0, 1.0, 5.0, 1.0));
        cells.push(1, cohort(2, 10.0, 1.0, 5.0, 1.0));
        let mut merger = CohortMerger::new(MergeRng::default());

        let outcome = merger
            .reduce_to_target(&mut cells, &[1, 1], &[0, 0])
            .expect("valid cell");

        assert_eq!(outcome.total_merges(), 0);
        assert_eq!(cells.live_cohort_counts(), vec![1, 1]);
    }

    #[test]
    fn degenerate_mass_aborts_before_any_merge() {
        let mut cells = GridCellCohorts::with_functional_groups(2);
        cells.push(0, cohort(1, 10.0, 1.0, 5.0, 1.0));
        cells.push(0, cohort(2, 10.0, 1.0, 5.1, 1.0));
        cells.push(1, cohort(3, 0.0, 1.0, 5.0, 1.0));
        cells.push(1, cohort(4, 0.0, 1.0, 5.0, 1.0));
        let before = cells.clone();
        let mut merger = CohortMerger::new(MergeRng::default());

        let err = merger
            .reduce_to_target(&mut cells, &[2, 2], &[1, 1])
            .expect_err("adult mass is zero");

        match err {
            CohortMergeError::DegenerateCohort {
                functional_group,
                source,
                ..
            } => {
                assert_eq!(functional_group, 1);
                assert_eq!(source.trait_name, "adult_mass");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(cells, before);
    }

    #[test]
    fn short_count_tables_are_rejected() {
        let mut cells = GridCellCohorts::with_functional_groups(2);
        let mut merger = CohortMerger::new(MergeRng::default());

        let err = merger
            .reduce_to_target(&mut cells, &[0], &[0, 0])
            .expect_err("one total for two groups");
        assert_eq!(
            err,
            CohortMergeError::CountTableMismatch {
                functional_groups: 2,
                totals: 1,
                targets: 2,
            }
        );
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let mut first = GridCellCohorts::with_functional_groups(1);
        for id in 0..12 {
            let body = 3.0 + (id as f64 * 0.37) % 2.0;
            first.push(0, cohort(id, 10.0 + id as f64 % 3.0, 1.0, body, 1.0 + id as f64));
        }
        let mut second = first.clone();

        let a = CohortMerger::new(MergeRng::seeded(99))
            .reduce_to_target(&mut first, &[12], &[5])
            .expect("valid cell");
        let b = CohortMerger::new(MergeRng::seeded(99))
            .reduce_to_target(&mut second, &[12], &[5])
            .expect("valid cell");

        assert_eq!(a, b);
        assert_eq!(first, second);
        assert_eq!(a.total_merges(), 6);
    }
}
