//! Hospital bed, ICU and ventilator demand for one region.
//!
//! Active cases follow a geometric recursion driven by an adjusted daily
//! transmission rate; a fixed share of them becomes severe and needs a bed,
//! and fixed shares of the severe cases need ICU care and ventilation.
//! Vaccination lowers both the growth rate and the severity shares.

use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::output::{ResourcePoint, ResourceSeries};
use crate::parameters::{HealthcareCapacity, VaccineSet, fraction};
use crate::region::{RegionRecord, mean};

pub const RECOVERY_RATE_DAILY: f64 = 0.10;
pub const MAX_VACCINATION_REDUCTION: f64 = 0.95;
const BASE_SEVERITY_RATE: f64 = 0.15;
const BASE_ICU_RATE: f64 = 0.30;
const BASE_VENTILATOR_RATE: f64 = 0.15;
const REFERENCE_DENSITY: f64 = 500.0;
const REFERENCE_HEALTH_CONDITIONS: f64 = 25.0;

/// Utilisation percentages at which a resource counts as strained.
pub const WARNING_UTILISATION: f64 = 75.0;
pub const CRITICAL_UTILISATION: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VaccinationSummary {
    pub vaccine_count: usize,
    pub average_coverage: f64,
    pub average_effectiveness: f64,
    /// Sum over vaccines of effectiveness x coverage x (1 - waning), in
    /// percent of the population protected.
    pub effective_protection: f64,
    /// Fractional cut in transmission, capped at 95%.
    pub vaccination_reduction: f64,
}

impl VaccinationSummary {
    pub fn from_vaccines(vaccines: &VaccineSet) -> Self {
        let effective_protection: f64 = vaccines
            .iter()
            .map(|v| {
                v.effectiveness.clamp(0.0, 100.0)
                    * fraction(v.population_vaccinated)
                    * (1.0 - fraction(v.waning_immunity_rate))
            })
            .sum();
        let count = vaccines.len();
        let average = |total: f64| if count == 0 { 0.0 } else { total / count as f64 };
        VaccinationSummary {
            vaccine_count: count,
            average_coverage: average(vaccines.iter().map(|v| v.population_vaccinated).sum()),
            average_effectiveness: average(vaccines.iter().map(|v| v.effectiveness).sum()),
            effective_protection,
            vaccination_reduction: (effective_protection / 100.0).min(MAX_VACCINATION_REDUCTION),
        }
    }
}

/// Scalars shared by every day of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionFactors {
    pub population_units: f64,
    pub density_factor: f64,
    pub health_factor: f64,
    pub adjusted_transmission: f64,
    pub severity_rate: f64,
    pub icu_rate: f64,
    pub ventilator_rate: f64,
}

impl ProjectionFactors {
    pub fn new(
        capacity: &HealthcareCapacity,
        vaccination: &VaccinationSummary,
        region: &RegionRecord,
    ) -> Self {
        let reduction = vaccination.vaccination_reduction;
        let density_factor = (region.population_density / REFERENCE_DENSITY).clamp(0.5, 1.5);
        let health_factor =
            (region.health_conditions_percentage / REFERENCE_HEALTH_CONDITIONS).clamp(0.5, 1.5);
        ProjectionFactors {
            population_units: region.population_units(),
            density_factor,
            health_factor,
            adjusted_transmission: fraction(capacity.transmission_rate)
                * density_factor
                * health_factor
                * (1.0 - reduction),
            severity_rate: BASE_SEVERITY_RATE * health_factor * (1.0 - reduction * 0.7),
            icu_rate: BASE_ICU_RATE * (1.0 - reduction * 0.8),
            ventilator_rate: BASE_VENTILATOR_RATE * (1.0 - reduction * 0.8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resource {
    HospitalBeds,
    Icu,
    Ventilators,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum StrainLevel {
    Normal,
    Warning,
    Critical,
}

impl StrainLevel {
    pub fn from_utilisation(percent: f64) -> Self {
        if percent > CRITICAL_UTILISATION {
            StrainLevel::Critical
        } else if percent >= WARNING_UTILISATION {
            StrainLevel::Warning
        } else {
            StrainLevel::Normal
        }
    }
}

/// Percentage of capacity in use; `None` when nothing is available.
fn utilisation(required: f64, available: f64) -> Option<f64> {
    (available > 0.0).then(|| required / available * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceNeedReduction {
    pub hospital_beds: f64,
    pub icu: f64,
    pub ventilators: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthcareProjection {
    pub factors: ProjectionFactors,
    pub vaccination: VaccinationSummary,
    pub series: ResourceSeries,
}

pub struct HealthcareProjector {}

impl HealthcareProjector {
    pub fn project(
        capacity: &HealthcareCapacity,
        vaccines: &VaccineSet,
        region: &RegionRecord,
        horizon_days: usize,
    ) -> Result<HealthcareProjection> {
        capacity.validate()?;
        for vaccine in vaccines {
            vaccine.validate()?;
        }
        region.validate()?;

        let vaccination = VaccinationSummary::from_vaccines(vaccines);
        let factors = ProjectionFactors::new(capacity, &vaccination, region);
        debug!(
            "{}: projection factors {:?}, vaccination {:?}",
            region.country, factors, vaccination
        );

        // Capacity figures are per 10,000 people.
        let scale = factors.population_units / 100.0;
        let available_beds = capacity.hospital_beds * scale;
        let available_icu = capacity.icu_beds * scale;
        let available_ventilators = capacity.ventilators * scale;
        let growth = 1.0 + factors.adjusted_transmission - RECOVERY_RATE_DAILY;

        let mut series = ResourceSeries::new(horizon_days);
        let mut active_cases = factors.population_units * factors.adjusted_transmission;
        for point in series.points.iter_mut() {
            let severe_cases = active_cases * factors.severity_rate;
            *point = ResourcePoint {
                day: point.day,
                active_cases,
                available_beds,
                required_beds: severe_cases,
                available_icu,
                required_icu: severe_cases * factors.icu_rate,
                available_ventilators,
                required_ventilators: severe_cases * factors.ventilator_rate,
            };
            active_cases *= growth;
        }

        Ok(HealthcareProjection {
            factors,
            vaccination,
            series,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyStrain {
    pub day: usize,
    pub beds_utilisation: Option<f64>,
    pub icu_utilisation: Option<f64>,
    pub ventilator_utilisation: Option<f64>,
    /// Highest strain across resources with any capacity.
    pub worst: Option<StrainLevel>,
}

impl HealthcareProjection {
    /// How far mean demand stays below twice the mean capacity, in percent,
    /// floored at zero.
    pub fn need_reduction(&self) -> ResourceNeedReduction {
        let points = &self.series.points;
        let reduction = |required: fn(&ResourcePoint) -> f64, available: fn(&ResourcePoint) -> f64| {
            let available = mean(points.iter().map(available));
            if available <= 0.0 {
                return 0.0;
            }
            let required = mean(points.iter().map(required));
            ((1.0 - required / (available * 2.0)) * 100.0).max(0.0)
        };
        ResourceNeedReduction {
            hospital_beds: reduction(|p| p.required_beds, |p| p.available_beds),
            icu: reduction(|p| p.required_icu, |p| p.available_icu),
            ventilators: reduction(|p| p.required_ventilators, |p| p.available_ventilators),
        }
    }

    pub fn strain(&self) -> Vec<DailyStrain> {
        self.series
            .points
            .iter()
            .map(|p| {
                let beds = utilisation(p.required_beds, p.available_beds);
                let icu = utilisation(p.required_icu, p.available_icu);
                let ventilators = utilisation(p.required_ventilators, p.available_ventilators);
                let worst = [beds, icu, ventilators]
                    .into_iter()
                    .flatten()
                    .map(StrainLevel::from_utilisation)
                    .max();
                DailyStrain {
                    day: p.day,
                    beds_utilisation: beds,
                    icu_utilisation: icu,
                    ventilator_utilisation: ventilators,
                    worst,
                }
            })
            .collect()
    }

    /// First day on which `resource` runs above the critical threshold.
    pub fn first_critical_day(&self, resource: Resource) -> Option<usize> {
        self.series
            .points
            .iter()
            .find(|p| {
                let (required, available) = match resource {
                    Resource::HospitalBeds => (p.required_beds, p.available_beds),
                    Resource::Icu => (p.required_icu, p.available_icu),
                    Resource::Ventilators => (p.required_ventilators, p.available_ventilators),
                };
                utilisation(required, available)
                    .is_some_and(|u| StrainLevel::from_utilisation(u) == StrainLevel::Critical)
            })
            .map(|p| p.day)
    }
}
