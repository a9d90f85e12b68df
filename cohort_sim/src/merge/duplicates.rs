use tracing::debug;

use super::distance::retained_body_mass;
use super::{merge_cohorts, pair_mut, CohortMerger, CohortMergeError};
use crate::cohort::Cohort;
use crate::grid_cell_cohorts::GridCellCohorts;
use crate::random::UniformSource;

impl<R: UniformSource> CohortMerger<R> {
    /// Collapses cohorts whose body, adult, juvenile and maximum achieved
    /// masses are bit-identical and whose maturity class matches.
    ///
    /// Pairs are visited as `(j, k)` with `j < k`; a coin flip per match picks
    /// the survivor. There is no once-per-pass guard, so chains of duplicates
    /// collapse into a single cohort within one call. Returns the number of
    /// merges across all functional groups.
    ///
    /// Every group is validated before the first merge, so an error leaves
    /// the cell and the RNG untouched.
    pub fn merge_exact_duplicates(
        &mut self,
        cohorts: &mut GridCellCohorts,
    ) -> Result<usize, CohortMergeError> {
        for (group, bucket) in cohorts.iter_groups().enumerate() {
            validate_duplicate_group(group, bucket)?;
        }

        let mut combined = 0;
        for (group, bucket) in cohorts.groups_mut().iter_mut().enumerate() {
            let mut group_combined = 0;
            let count = bucket.len();
            for j in 0..count {
                for k in (j + 1)..count {
                    if !is_mergeable_duplicate(&bucket[j], &bucket[k]) {
                        continue;
                    }
                    let (to_index, from_index) = if self.first_is_retained() {
                        (j, k)
                    } else {
                        (k, j)
                    };
                    let (to, from) = pair_mut(bucket, to_index, from_index);
                    merge_cohorts(to, from).map_err(|source| {
                        CohortMergeError::DegenerateCohort {
                            functional_group: group,
                            index: to_index,
                            source,
                        }
                    })?;
                    group_combined += 1;
                }
            }
            if group_combined > 0 {
                debug!(
                    target: "cohort_sim::merge",
                    functional_group = group,
                    merged = group_combined,
                    "merge.collapsed=exact_duplicates"
                );
            }
            combined += group_combined;
        }
        Ok(combined)
    }
}

/// Merges only ever drain the absorbed cohort, so every pair merged during
/// the pass is already mergeable here. Duplicates share their body mass,
/// which makes checking the earlier cohort of each pair sufficient.
fn validate_duplicate_group(group: usize, bucket: &[Cohort]) -> Result<(), CohortMergeError> {
    for (j, first) in bucket.iter().enumerate() {
        let has_match = bucket[j + 1..]
            .iter()
            .any(|second| is_mergeable_duplicate(first, second));
        if has_match {
            retained_body_mass(first).map_err(|source| CohortMergeError::DegenerateCohort {
                functional_group: group,
                index: j,
                source,
            })?;
        }
    }
    Ok(())
}

fn is_mergeable_duplicate(a: &Cohort, b: &Cohort) -> bool {
    a.abundance > 0.0
        && b.abundance > 0.0
        && a.maturity.same_class(b.maturity)
        && a.has_identical_traits(b)
}
