//! Synthetic cohort populations for the driver, benchmarks and tests.
//!
//! Adult masses are drawn log-uniformly between fifty times the minimum mass
//! and the maximum mass, juveniles are a random fraction of the adult mass,
//! and biomass is shared evenly between the seeded cohorts.

use rand::{rngs::SmallRng, Rng};

use crate::cohort::{Cohort, CohortId};
use crate::grid_cell_cohorts::GridCellCohorts;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticCellSpec {
    pub functional_groups: usize,
    pub cohorts_per_group: usize,
    pub minimum_mass: f64,
    pub maximum_mass: f64,
    pub cell_biomass: f64,
    /// Probability that a seeded cohort starts out mature.
    pub mature_fraction: f64,
    /// Probability that a cohort is an exact copy of the previous one in its
    /// group, mimicking repeated dispersal seeding.
    pub duplicate_fraction: f64,
}

impl Default for SyntheticCellSpec {
    fn default() -> Self {
        Self {
            functional_groups: 4,
            cohorts_per_group: 40,
            minimum_mass: 0.01,
            maximum_mass: 50_000.0,
            cell_biomass: 1.0e7,
            mature_fraction: 0.3,
            duplicate_fraction: 0.0,
        }
    }
}

pub fn seed_synthetic_cell(
    spec: &SyntheticCellSpec,
    rng: &mut SmallRng,
    next_id: &mut CohortId,
) -> GridCellCohorts {
    let mut cohorts = GridCellCohorts::with_functional_groups(spec.functional_groups);
    let seeded = (spec.functional_groups * spec.cohorts_per_group).max(1) as f64;
    let biomass_per_cohort = spec.cell_biomass / seeded;

    let lower = (50.0 * spec.minimum_mass).log10();
    let upper = spec.maximum_mass.log10().max(lower);

    for group in 0..spec.functional_groups {
        let mut previous: Option<Cohort> = None;
        for _ in 0..spec.cohorts_per_group {
            let id = *next_id;
            *next_id += 1;

            if let Some(template) = previous.as_ref() {
                if rng.gen::<f64>() < spec.duplicate_fraction {
                    let mut copy = template.clone();
                    copy.id = id;
                    cohorts.push(group, copy);
                    continue;
                }
            }

            let adult_mass = 10f64.powf(lower + rng.gen::<f64>() * (upper - lower));
            let juvenile_mass =
                (adult_mass * 10f64.powf(-rng.gen_range(0.5..2.0))).max(spec.minimum_mass);
            let cohort = if rng.gen::<f64>() < spec.mature_fraction {
                Cohort::new(
                    id,
                    0,
                    juvenile_mass,
                    adult_mass,
                    adult_mass,
                    biomass_per_cohort / adult_mass,
                )
                .matured_at(0)
            } else {
                let growth = rng.gen::<f64>() * 0.5;
                let body = juvenile_mass * (adult_mass / juvenile_mass).powf(growth);
                Cohort::new(
                    id,
                    0,
                    juvenile_mass,
                    adult_mass,
                    body,
                    biomass_per_cohort / body,
                )
            };
            previous = Some(cohort.clone());
            cohorts.push(group, cohort);
        }
    }
    cohorts
}
