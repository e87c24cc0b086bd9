use log::debug;
use serde::Serialize;

use crate::error::{PathflowError, Result};
use crate::output::{InfectionSeries, SeirPoint};
use crate::parameters::{PathogenProfile, fraction};

pub const POPULATION: f64 = 100_000.0;
pub const INITIAL_INFECTED: f64 = 100.0;
pub const INITIAL_EXPOSED: f64 = 200.0;
pub const INITIAL_RECOVERED: f64 = 0.0;
pub const INITIAL_DECEASED: f64 = 0.0;

/// Daily transition rates derived from a pathogen profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeirRates {
    pub beta: f64,
    pub sigma: f64,
    pub gamma: f64,
    pub mu: f64,
}

impl SeirRates {
    pub fn from_profile(profile: &PathogenProfile) -> Result<Self> {
        profile.validate()?;
        if profile.incubation_period == 0 {
            return Err(PathflowError::invalid(
                "incubation_period",
                "must be at least one day",
            ));
        }
        if profile.infectious_period == 0 {
            return Err(PathflowError::invalid(
                "infectious_period",
                "must be at least one day",
            ));
        }
        Ok(SeirRates {
            beta: fraction(profile.transmission_rate),
            sigma: 1.0 / f64::from(profile.incubation_period),
            gamma: 1.0 / f64::from(profile.infectious_period),
            mu: fraction(profile.mortality_rate),
        })
    }
}

pub struct EpidemicEngine {}

impl EpidemicEngine {
    /// Steps the closed-population SEIR(D) model forward one day at a time
    /// with an explicit Euler update. Day 0 is the fixed initial state and
    /// the series has exactly `horizon_days` entries.
    pub fn run(profile: &PathogenProfile, horizon_days: usize) -> Result<InfectionSeries> {
        let rates = SeirRates::from_profile(profile)?;
        debug!("SEIR rates {:?} over {} days", rates, horizon_days);

        let mut output = InfectionSeries::new(horizon_days);
        let Some(first) = output.points.first_mut() else {
            return Ok(output);
        };
        first.infected = INITIAL_INFECTED;
        first.exposed = INITIAL_EXPOSED;
        first.recovered = INITIAL_RECOVERED;
        first.deceased = INITIAL_DECEASED;
        first.susceptible =
            POPULATION - INITIAL_INFECTED - INITIAL_EXPOSED - INITIAL_RECOVERED - INITIAL_DECEASED;

        for t in 1..horizon_days {
            let prev = output.points[t - 1];
            let new_exposed = rates.beta * prev.susceptible * prev.infected / POPULATION;
            let new_infected = rates.sigma * prev.exposed;
            let new_recovered = rates.gamma * prev.infected * (1.0 - rates.mu);
            let new_deceased = rates.gamma * prev.infected * rates.mu;

            let point = &mut output.points[t];
            point.susceptible = prev.susceptible - new_exposed;
            point.exposed = prev.exposed + new_exposed - new_infected;
            point.infected = prev.infected + new_infected - new_recovered - new_deceased;
            point.recovered = prev.recovered + new_recovered;
            point.deceased = prev.deceased + new_deceased;
        }
        Ok(output)
    }
}

/// Headline figures of an infection run, truncated to whole people the way
/// they are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InfectionSummary {
    pub peak_infected: u64,
    pub peak_day: Option<usize>,
    pub total_cases: u64,
    pub total_deceased: u64,
    pub mortality_percentage: f64,
}

impl InfectionSeries {
    pub fn peak_infected(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points
            .iter()
            .map(|p| p.infected)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// First day on which infections reach their maximum.
    pub fn peak_day(&self) -> Option<usize> {
        let mut best: Option<&SeirPoint> = None;
        for point in &self.points {
            if best.is_none_or(|b| point.infected > b.infected) {
                best = Some(point);
            }
        }
        best.map(|p| p.day)
    }

    /// Sum of active infections over every day (infection-days).
    pub fn total_cases(&self) -> f64 {
        self.points.iter().map(|p| p.infected).sum()
    }

    pub fn total_deceased(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.deceased)
    }

    pub fn overall_mortality_rate(&self) -> f64 {
        let total_cases = self.total_cases();
        if total_cases > 0.0 {
            self.total_deceased() / total_cases * 100.0
        } else {
            0.0
        }
    }

    /// Day-over-day change in active infections; day 0 has no predecessor.
    pub fn daily_new_cases(&self) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(self.points.len());
        let mut prev: Option<f64> = None;
        for point in &self.points {
            out.push(prev.map(|p| point.infected - p));
            prev = Some(point.infected);
        }
        out
    }

    pub fn summary(&self) -> InfectionSummary {
        let total_cases = self.total_cases() as u64;
        let total_deceased = self.total_deceased() as u64;
        let mortality_percentage = if total_cases > 0 {
            total_deceased as f64 / total_cases as f64 * 100.0
        } else {
            0.0
        };
        InfectionSummary {
            peak_infected: self.peak_infected() as u64,
            peak_day: self.peak_day(),
            total_cases,
            total_deceased,
            mortality_percentage,
        }
    }
}
