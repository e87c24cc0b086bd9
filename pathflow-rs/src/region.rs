use serde::{Deserialize, Serialize};

use crate::error::{PathflowError, Result, check_name, check_non_negative, check_percent};
use crate::parameters::{Named, NamedSet};

pub const WORLD: &str = "World";
pub const WORLD_CONTINENT: &str = "Global";

/// One country row of the reference dataset. Field names match the CSV
/// column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub country: String,
    pub continent: String,
    pub population: u64,
    /// People per square km.
    pub population_density: f64,
    pub air_quality_index: f64,
    pub water_quality_index: f64,
    pub age_distribution_young: f64,
    pub age_distribution_adult: f64,
    pub age_distribution_elderly: f64,
    /// Males per 100 females.
    pub gender_ratio: f64,
    pub health_conditions_percentage: f64,
}

impl RegionRecord {
    pub fn validate(&self) -> Result<()> {
        check_name("country", &self.country)?;
        check_non_negative("population_density", self.population_density)?;
        check_non_negative("air_quality_index", self.air_quality_index)?;
        check_non_negative("water_quality_index", self.water_quality_index)?;
        check_non_negative("gender_ratio", self.gender_ratio)?;
        check_percent(
            "health_conditions_percentage",
            self.health_conditions_percentage,
        )?;
        let age_total =
            self.age_distribution_young + self.age_distribution_adult + self.age_distribution_elderly;
        // Source data is rounded to one decimal per column.
        if !age_total.is_finite() || (age_total - 100.0).abs() > 1.0 {
            return Err(PathflowError::invalid(
                "age_distribution",
                format!("{} sums to {age_total}, expected 100", self.country),
            ));
        }
        Ok(())
    }

    /// Population in units of 100,000 people.
    pub fn population_units(&self) -> f64 {
        self.population as f64 / 100_000.0
    }
}

impl Named for RegionRecord {
    const KIND: &'static str = "country";

    fn name(&self) -> &str {
        &self.country
    }
}

/// Regions keyed by country name, in dataset order.
pub type RegionTable = NamedSet<RegionRecord>;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub total_countries: usize,
    /// Distinct continents in first-seen order.
    pub continents: Vec<String>,
    pub avg_population: f64,
    pub avg_air_quality: f64,
    pub avg_water_quality: f64,
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

impl NamedSet<RegionRecord> {
    /// The synthetic "World" row: summed population, mean of every other
    /// numeric column.
    pub fn world_aggregate(&self) -> Result<RegionRecord> {
        if self.is_empty() {
            return Err(PathflowError::EmptyInput("region table"));
        }
        Ok(RegionRecord {
            country: WORLD.to_string(),
            continent: WORLD_CONTINENT.to_string(),
            population: self.iter().map(|r| r.population).sum(),
            population_density: mean(self.iter().map(|r| r.population_density)),
            air_quality_index: mean(self.iter().map(|r| r.air_quality_index)),
            water_quality_index: mean(self.iter().map(|r| r.water_quality_index)),
            age_distribution_young: mean(self.iter().map(|r| r.age_distribution_young)),
            age_distribution_adult: mean(self.iter().map(|r| r.age_distribution_adult)),
            age_distribution_elderly: mean(self.iter().map(|r| r.age_distribution_elderly)),
            gender_ratio: mean(self.iter().map(|r| r.gender_ratio)),
            health_conditions_percentage: mean(
                self.iter().map(|r| r.health_conditions_percentage),
            ),
        })
    }

    /// A copy of the table with the "World" row appended.
    pub fn with_world(&self) -> Result<RegionTable> {
        let mut table = self.clone();
        table.insert(self.world_aggregate()?)?;
        Ok(table)
    }

    /// Rows on `continent`, plus the "World" row when present.
    pub fn filter_continent(&self, continent: &str) -> RegionTable {
        self.filtered(|r| r.continent == continent || r.country == WORLD)
    }

    /// The table without the "World" row.
    pub fn countries(&self) -> RegionTable {
        self.filtered(|r| r.country != WORLD)
    }

    pub fn region(&self, country: &str) -> Result<&RegionRecord> {
        self.get(country)
            .ok_or_else(|| PathflowError::UnknownRegion(country.to_string()))
    }

    pub fn stats(&self) -> RegionStats {
        let mut continents: Vec<String> = Vec::new();
        for region in self {
            if !continents.contains(&region.continent) {
                continents.push(region.continent.clone());
            }
        }
        RegionStats {
            total_countries: self.len(),
            continents,
            avg_population: mean(self.iter().map(|r| r.population as f64)),
            avg_air_quality: mean(self.iter().map(|r| r.air_quality_index)),
            avg_water_quality: mean(self.iter().map(|r| r.water_quality_index)),
        }
    }
}
