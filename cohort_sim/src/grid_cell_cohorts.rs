use std::hash::Hasher;

use serde::{Deserialize, Serialize};

use crate::cohort::Cohort;
use crate::hashing::FnvHasher;

/// Cohorts of one grid cell, bucketed by functional group index.
///
/// Merging never crosses buckets. Reducers borrow the buckets mutably for a
/// single call and leave merged-away cohorts in place with zero abundance;
/// [`GridCellCohorts::remove_extinct_cohorts`] is the separate cleanup step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridCellCohorts {
    groups: Vec<Vec<Cohort>>,
}

impl GridCellCohorts {
    pub fn with_functional_groups(count: usize) -> Self {
        Self {
            groups: vec![Vec::new(); count],
        }
    }

    pub fn from_groups(groups: Vec<Vec<Cohort>>) -> Self {
        Self { groups }
    }

    pub fn functional_group_count(&self) -> usize {
        self.groups.len()
    }

    /// Appends a cohort, growing the bucket list if `group` is new.
    pub fn push(&mut self, group: usize, cohort: Cohort) {
        if group >= self.groups.len() {
            self.groups.resize_with(group + 1, Vec::new);
        }
        self.groups[group].push(cohort);
    }

    pub fn group(&self, group: usize) -> &[Cohort] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_mut(&mut self, group: usize) -> Option<&mut Vec<Cohort>> {
        self.groups.get_mut(group)
    }

    pub fn iter_groups(&self) -> impl Iterator<Item = &[Cohort]> + '_ {
        self.groups.iter().map(Vec::as_slice)
    }

    pub(crate) fn groups_mut(&mut self) -> &mut [Vec<Cohort>] {
        &mut self.groups
    }

    pub fn cohort_counts(&self) -> Vec<usize> {
        self.groups.iter().map(Vec::len).collect()
    }

    pub fn live_cohort_counts(&self) -> Vec<usize> {
        self.groups
            .iter()
            .map(|group| group.iter().filter(|cohort| !cohort.is_extinct()).count())
            .collect()
    }

    pub fn total_cohorts(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn group_biomass(&self, group: usize) -> f64 {
        self.group(group).iter().map(Cohort::biomass).sum()
    }

    pub fn total_biomass(&self) -> f64 {
        (0..self.groups.len())
            .map(|group| self.group_biomass(group))
            .sum()
    }

    /// Drops zero-abundance remnants, returning how many were removed.
    pub fn remove_extinct_cohorts(&mut self) -> usize {
        let mut removed = 0;
        for group in &mut self.groups {
            let before = group.len();
            group.retain(|cohort| !cohort.is_extinct());
            removed += before - group.len();
        }
        removed
    }

    /// Order-sensitive digest of every cohort's state.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::new();
        self.write_fingerprint(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn write_fingerprint(&self, hasher: &mut FnvHasher) {
        hasher.write_usize(self.groups.len());
        for group in &self.groups {
            hasher.write_usize(group.len());
            for cohort in group {
                hasher.write_u64(cohort.id);
                hasher.write_f64(cohort.abundance);
                hasher.write_f64(cohort.individual_body_mass);
                hasher.write_f64(cohort.individual_reproductive_potential_mass);
                hasher.write_u8(cohort.merged as u8);
            }
        }
    }
}
