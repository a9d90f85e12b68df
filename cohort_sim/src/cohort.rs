use serde::{Deserialize, Serialize};

pub type CohortId = u64;

/// Life stage marker used to keep juveniles and adults apart during merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    #[default]
    Immature,
    MaturedAt(u32),
}

impl Maturity {
    pub fn is_mature(self) -> bool {
        matches!(self, Maturity::MaturedAt(_))
    }

    /// Both immature, or both matured (at any time step).
    pub fn same_class(self, other: Maturity) -> bool {
        self.is_mature() == other.is_mature()
    }
}

/// A group of organisms with near-identical life-history state, tracked as a
/// single aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    pub id: CohortId,
    #[serde(default)]
    pub birth_time_step: u32,
    pub adult_mass: f64,
    pub juvenile_mass: f64,
    pub individual_body_mass: f64,
    pub maximum_achieved_body_mass: f64,
    pub abundance: f64,
    #[serde(default)]
    pub individual_reproductive_potential_mass: f64,
    #[serde(default)]
    pub maturity: Maturity,
    #[serde(default)]
    pub merged: bool,
    #[serde(default, skip_serializing)]
    pub merged_this_time_step: bool,
}

impl Cohort {
    pub fn new(
        id: CohortId,
        birth_time_step: u32,
        juvenile_mass: f64,
        adult_mass: f64,
        individual_body_mass: f64,
        abundance: f64,
    ) -> Self {
        Self {
            id,
            birth_time_step,
            adult_mass,
            juvenile_mass,
            individual_body_mass,
            maximum_achieved_body_mass: individual_body_mass,
            abundance,
            individual_reproductive_potential_mass: 0.0,
            maturity: Maturity::Immature,
            merged: false,
            merged_this_time_step: false,
        }
    }

    pub fn matured_at(mut self, time_step: u32) -> Self {
        self.maturity = Maturity::MaturedAt(time_step);
        self
    }

    pub fn with_reproductive_potential(mut self, mass: f64) -> Self {
        self.individual_reproductive_potential_mass = mass;
        self
    }

    pub fn biomass(&self) -> f64 {
        self.abundance * self.individual_body_mass
    }

    pub fn is_extinct(&self) -> bool {
        self.abundance <= 0.0
    }

    /// Bit-exact comparison of every mass trait consulted by duplicate merging.
    pub fn has_identical_traits(&self, other: &Cohort) -> bool {
        self.individual_body_mass.to_bits() == other.individual_body_mass.to_bits()
            && self.adult_mass.to_bits() == other.adult_mass.to_bits()
            && self.juvenile_mass.to_bits() == other.juvenile_mass.to_bits()
            && self.maximum_achieved_body_mass.to_bits()
                == other.maximum_achieved_body_mass.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maturity_classes() {
        assert!(Maturity::Immature.same_class(Maturity::Immature));
        assert!(Maturity::MaturedAt(3).same_class(Maturity::MaturedAt(40)));
        assert!(!Maturity::Immature.same_class(Maturity::MaturedAt(0)));
        assert!(!Maturity::MaturedAt(0).same_class(Maturity::Immature));
    }

    #[test]
    fn identical_traits_are_bit_exact() {
        let a = Cohort::new(1, 0, 1.0, 10.0, 5.0, 2.0);
        let mut b = Cohort::new(2, 4, 1.0, 10.0, 5.0, 9.0);
        assert!(a.has_identical_traits(&b));

        b.individual_body_mass = 5.0 + f64::EPSILON * 4.0;
        assert!(!a.has_identical_traits(&b));
    }

    #[test]
    fn maximum_achieved_mass_is_compared() {
        let a = Cohort::new(1, 0, 1.0, 10.0, 5.0, 2.0);
        let mut b = a.clone();
        b.maximum_achieved_body_mass = 6.0;
        assert!(!a.has_identical_traits(&b));
    }

    #[test]
    fn maturity_round_trips_through_json() {
        let cohort = Cohort::new(7, 0, 1.0, 10.0, 10.0, 3.0).matured_at(12);
        let json = serde_json::to_string(&cohort).expect("serialize cohort");
        assert!(json.contains("\"matured_at\":12"));
        let restored: Cohort = serde_json::from_str(&json).expect("deserialize cohort");
        assert_eq!(restored.maturity, Maturity::MaturedAt(12));
    }
}
