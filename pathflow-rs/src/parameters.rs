//! Configuration records for a projection run.
//!
//! Every record is validated once when it is built, either through its
//! `new` constructor or while being deserialized, so the engines can rely on
//! field domains without re-checking them.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{PathflowError, Result, check_name, check_non_negative, check_percent};

/// Fraction in [0, 1] for a percentage, clamping out-of-range input.
pub(crate) fn fraction(percent: f64) -> f64 {
    percent.clamp(0.0, 100.0) / 100.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathogenKind {
    #[default]
    Virus,
    Bacteria,
    Fungi,
    Parasite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmissionRoute {
    #[default]
    Airborne,
    Droplet,
    Contact,
    #[serde(alias = "Vector-borne")]
    VectorBorne,
    #[serde(alias = "Food-borne")]
    FoodBorne,
    #[serde(alias = "Water-borne")]
    WaterBorne,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(remote = "Self", default)]
pub struct PathogenProfile {
    pub kind: PathogenKind,
    pub transmission_route: TransmissionRoute,
    /// Percent of susceptible-infected contacts that transmit per day.
    pub transmission_rate: f64,
    /// Days; must be positive before the profile can drive the SEIR engine.
    pub incubation_period: u32,
    /// Days; must be positive before the profile can drive the SEIR engine.
    pub infectious_period: u32,
    pub recovery_rate: f64,
    pub mortality_rate: f64,
    pub mutation_rate: f64,
}

impl Default for PathogenProfile {
    fn default() -> Self {
        PathogenProfile {
            kind: PathogenKind::Virus,
            transmission_route: TransmissionRoute::Airborne,
            transmission_rate: 50.0,
            incubation_period: 5,
            infectious_period: 14,
            recovery_rate: 95.0,
            mortality_rate: 2.0,
            mutation_rate: 0.1,
        }
    }
}

impl PathogenProfile {
    pub fn new(
        transmission_rate: f64,
        incubation_period: u32,
        infectious_period: u32,
        recovery_rate: f64,
        mortality_rate: f64,
        mutation_rate: f64,
    ) -> Result<Self> {
        let profile = PathogenProfile {
            transmission_rate,
            incubation_period,
            infectious_period,
            recovery_rate,
            mortality_rate,
            mutation_rate,
            ..Default::default()
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        check_percent("transmission_rate", self.transmission_rate)?;
        check_percent("recovery_rate", self.recovery_rate)?;
        check_percent("mortality_rate", self.mortality_rate)?;
        check_percent("mutation_rate", self.mutation_rate)
    }
}

impl<'de> Deserialize<'de> for PathogenProfile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let profile = PathogenProfile::deserialize(deserializer)?;
        profile.validate().map_err(de::Error::custom)?;
        Ok(profile)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(remote = "Self")]
pub struct Variant {
    pub name: String,
    /// Cases per 1,000 people.
    pub daily_cases: f64,
    /// Symptom severity on a 1-10 scale.
    pub severity: u8,
    pub mortality_rate: f64,
    pub recovery_rate: f64,
    pub vaccine_effectiveness: f64,
}

impl Variant {
    pub fn new(
        name: impl Into<String>,
        daily_cases: f64,
        severity: u8,
        mortality_rate: f64,
        recovery_rate: f64,
        vaccine_effectiveness: f64,
    ) -> Result<Self> {
        let variant = Variant {
            name: name.into(),
            daily_cases,
            severity,
            mortality_rate,
            recovery_rate,
            vaccine_effectiveness,
        };
        variant.validate()?;
        Ok(variant)
    }

    pub fn validate(&self) -> Result<()> {
        check_name("variant.name", &self.name)?;
        check_non_negative("variant.daily_cases", self.daily_cases)?;
        if !(1..=10).contains(&self.severity) {
            return Err(PathflowError::invalid(
                "variant.severity",
                format!("{} is outside 1-10", self.severity),
            ));
        }
        check_percent("variant.mortality_rate", self.mortality_rate)?;
        check_percent("variant.recovery_rate", self.recovery_rate)?;
        check_percent("variant.vaccine_effectiveness", self.vaccine_effectiveness)
    }
}

impl<'de> Deserialize<'de> for Variant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let variant = Variant::deserialize(deserializer)?;
        variant.validate().map_err(de::Error::custom)?;
        Ok(variant)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(remote = "Self")]
pub struct Vaccine {
    pub name: String,
    pub population_vaccinated: f64,
    pub effectiveness: f64,
    /// Percent of protection lost per month.
    pub waning_immunity_rate: f64,
}

impl Vaccine {
    pub fn new(
        name: impl Into<String>,
        population_vaccinated: f64,
        effectiveness: f64,
        waning_immunity_rate: f64,
    ) -> Result<Self> {
        let vaccine = Vaccine {
            name: name.into(),
            population_vaccinated,
            effectiveness,
            waning_immunity_rate,
        };
        vaccine.validate()?;
        Ok(vaccine)
    }

    pub fn validate(&self) -> Result<()> {
        check_name("vaccine.name", &self.name)?;
        check_percent("vaccine.population_vaccinated", self.population_vaccinated)?;
        check_percent("vaccine.effectiveness", self.effectiveness)?;
        check_percent("vaccine.waning_immunity_rate", self.waning_immunity_rate)
    }
}

impl<'de> Deserialize<'de> for Vaccine {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let vaccine = Vaccine::deserialize(deserializer)?;
        vaccine.validate().map_err(de::Error::custom)?;
        Ok(vaccine)
    }
}

/// Health system resources. Bed, ICU and ventilator figures are per 10,000
/// population; only those and `transmission_rate` feed the load projection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(remote = "Self", default)]
pub struct HealthcareCapacity {
    pub hospital_beds: f64,
    pub icu_beds: f64,
    pub ventilators: f64,
    /// Base transmission percentage used by the load projection.
    pub transmission_rate: f64,
    pub healthcare_workers: f64,
    pub medicine_stock: f64,
    pub research_labs: f64,
    pub reporting_systems: f64,
    pub diagnostic_centers: f64,
    pub epidemiologists: f64,
    pub ppe_kits: f64,
    pub healthcare_budget: f64,
    pub daily_tests: f64,
    pub testing_accuracy: f64,
    pub daily_vaccinations: f64,
}

impl Default for HealthcareCapacity {
    fn default() -> Self {
        HealthcareCapacity {
            hospital_beds: 20.0,
            icu_beds: 5.0,
            ventilators: 2.0,
            transmission_rate: 5.0,
            healthcare_workers: 25.0,
            medicine_stock: 1000.0,
            research_labs: 1.0,
            reporting_systems: 10.0,
            diagnostic_centers: 3.0,
            epidemiologists: 2.0,
            ppe_kits: 50.0,
            healthcare_budget: 5000.0,
            daily_tests: 100.0,
            testing_accuracy: 95.0,
            daily_vaccinations: 100.0,
        }
    }
}

impl HealthcareCapacity {
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("hospital_beds", self.hospital_beds),
            ("icu_beds", self.icu_beds),
            ("ventilators", self.ventilators),
            ("healthcare_workers", self.healthcare_workers),
            ("medicine_stock", self.medicine_stock),
            ("research_labs", self.research_labs),
            ("reporting_systems", self.reporting_systems),
            ("diagnostic_centers", self.diagnostic_centers),
            ("epidemiologists", self.epidemiologists),
            ("ppe_kits", self.ppe_kits),
            ("healthcare_budget", self.healthcare_budget),
            ("daily_tests", self.daily_tests),
            ("daily_vaccinations", self.daily_vaccinations),
        ];
        for (name, value) in counts {
            check_non_negative(name, value)?;
        }
        check_percent("transmission_rate", self.transmission_rate)?;
        check_percent("testing_accuracy", self.testing_accuracy)
    }
}

impl<'de> Deserialize<'de> for HealthcareCapacity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let capacity = HealthcareCapacity::deserialize(deserializer)?;
        capacity.validate().map_err(de::Error::custom)?;
        Ok(capacity)
    }
}

/// Records stored in a [`NamedSet`] are keyed by name.
pub trait Named {
    /// Noun used in duplicate-key errors.
    const KIND: &'static str;

    fn name(&self) -> &str;
}

impl Named for Variant {
    const KIND: &'static str = "variant";

    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Vaccine {
    const KIND: &'static str = "vaccine";

    fn name(&self) -> &str {
        &self.name
    }
}

/// Insertion-ordered collection with unique names.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSet<T> {
    items: Vec<T>,
}

pub type VariantSet = NamedSet<Variant>;
pub type VaccineSet = NamedSet<Vaccine>;

impl<T> Default for NamedSet<T> {
    fn default() -> Self {
        NamedSet { items: Vec::new() }
    }
}

impl<T: Named> NamedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `item`, rejecting a name that is already present.
    pub fn insert(&mut self, item: T) -> Result<()> {
        if self.contains(item.name()) {
            return Err(PathflowError::DuplicateKey {
                kind: T::KIND,
                name: item.name().to_string(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.name() == name)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.iter().find(|item| item.name() == name)
    }

    /// A copy holding only the items that satisfy `keep`, in order.
    pub fn filtered(&self, mut keep: impl FnMut(&T) -> bool) -> Self
    where
        T: Clone,
    {
        // A subset of unique names is still unique.
        NamedSet {
            items: self.items.iter().filter(|&item| keep(item)).cloned().collect(),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Named> TryFrom<Vec<T>> for NamedSet<T> {
    type Error = PathflowError;

    fn try_from(items: Vec<T>) -> Result<Self> {
        let mut set = NamedSet::new();
        for item in items {
            set.insert(item)?;
        }
        Ok(set)
    }
}

impl<'a, T> IntoIterator for &'a NamedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'de, T: Named + Deserialize<'de>> Deserialize<'de> for NamedSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        NamedSet::try_from(items).map_err(de::Error::custom)
    }
}
