use thiserror::Error;

use crate::cohort::Cohort;

/// A mass trait that cannot act as a denominator.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{trait_name} must be positive and finite, found {value}")]
pub struct DegenerateTrait {
    pub trait_name: &'static str,
    pub value: f64,
}

fn positive(trait_name: &'static str, value: f64) -> Result<f64, DegenerateTrait> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(DegenerateTrait { trait_name, value })
    }
}

/// Body mass of a cohort that is about to absorb another one.
pub(crate) fn retained_body_mass(to: &Cohort) -> Result<f64, DegenerateTrait> {
    positive("individual_body_mass", to.individual_body_mass)
}

/// Relative distance in (adult, juvenile, current) mass space, normalized by
/// the retained cohort `to`. Not symmetric.
pub fn trait_distance(to: &Cohort, from: &Cohort) -> Result<f64, DegenerateTrait> {
    let adult = positive("adult_mass", to.adult_mass)?;
    let juvenile = positive("juvenile_mass", to.juvenile_mass)?;
    let body = positive("individual_body_mass", to.individual_body_mass)?;

    let adult_distance = (to.adult_mass - from.adult_mass).abs() / adult;
    let juvenile_distance = (to.juvenile_mass - from.juvenile_mass).abs() / juvenile;
    let body_distance = (to.individual_body_mass - from.individual_body_mass).abs() / body;

    Ok((adult_distance * adult_distance
        + juvenile_distance * juvenile_distance
        + body_distance * body_distance)
        .sqrt())
}

/// Folds `from` into `to`, conserving biomass.
///
/// Abundance is converted at `to`'s body mass; reproductive potential becomes
/// an abundance-weighted average over the post-merge abundance of `to`.
/// `from` is left as a zero-abundance remnant and both cohorts are flagged as
/// merged. Does not touch `merged_this_time_step`.
pub fn merge_cohorts(to: &mut Cohort, from: &mut Cohort) -> Result<(), DegenerateTrait> {
    let body = retained_body_mass(to)?;

    to.abundance += from.abundance * from.individual_body_mass / body;
    if to.abundance > 0.0 {
        to.individual_reproductive_potential_mass +=
            from.individual_reproductive_potential_mass * from.abundance / to.abundance;
    }
    from.abundance = 0.0;

    to.merged = true;
    from.merged = true;
    Ok(())
}
