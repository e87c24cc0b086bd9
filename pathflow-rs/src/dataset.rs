//! Loading, saving and regenerating the country reference dataset.
//!
//! The core never falls back on its own; [`load`] is strict and
//! [`load_or_regenerate`] is the recovering collaborator used by the binary.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use log::{info, warn};
use rand::{SeedableRng, distr::Distribution, rngs::StdRng};
use rand_distr::Uniform;

use crate::error::{PathflowError, Result};
use crate::region::{RegionRecord, RegionTable};

pub const DEFAULT_SEED: u64 = 42;

pub const REQUIRED_COLUMNS: [&str; 11] = [
    "country",
    "continent",
    "population",
    "population_density",
    "air_quality_index",
    "water_quality_index",
    "age_distribution_young",
    "age_distribution_adult",
    "age_distribution_elderly",
    "gender_ratio",
    "health_conditions_percentage",
];

/// The 50 most populous countries with 2021 population estimates.
const COUNTRIES: [(&str, &str, u64); 50] = [
    ("China", "Asia", 1_439_323_776),
    ("India", "Asia", 1_380_004_385),
    ("United States", "North America", 331_002_651),
    ("Indonesia", "Asia", 273_523_615),
    ("Pakistan", "Asia", 220_892_340),
    ("Brazil", "South America", 212_559_417),
    ("Nigeria", "Africa", 206_139_589),
    ("Bangladesh", "Asia", 164_689_383),
    ("Russia", "Europe/Asia", 145_912_025),
    ("Mexico", "North America", 128_932_753),
    ("Japan", "Asia", 126_476_461),
    ("Ethiopia", "Africa", 114_963_588),
    ("Philippines", "Asia", 109_581_078),
    ("Egypt", "Africa", 102_334_404),
    ("Vietnam", "Asia", 97_338_579),
    ("DR Congo", "Africa", 89_561_403),
    ("Turkey", "Asia", 84_339_067),
    ("Iran", "Asia", 83_992_949),
    ("Germany", "Europe", 83_783_942),
    ("Thailand", "Asia", 69_799_978),
    ("United Kingdom", "Europe", 67_886_011),
    ("France", "Europe", 65_273_511),
    ("Italy", "Europe", 60_461_826),
    ("South Africa", "Africa", 59_308_690),
    ("Tanzania", "Africa", 59_734_218),
    ("Myanmar", "Asia", 54_409_800),
    ("South Korea", "Asia", 51_269_185),
    ("Colombia", "South America", 50_882_891),
    ("Kenya", "Africa", 53_771_296),
    ("Spain", "Europe", 46_754_778),
    ("Argentina", "South America", 45_195_774),
    ("Algeria", "Africa", 44_616_624),
    ("Sudan", "Africa", 43_849_260),
    ("Uganda", "Africa", 45_741_007),
    ("Iraq", "Asia", 40_462_701),
    ("Poland", "Europe", 37_846_611),
    ("Canada", "North America", 37_742_154),
    ("Morocco", "Africa", 36_910_560),
    ("Saudi Arabia", "Asia", 34_813_871),
    ("Uzbekistan", "Asia", 33_469_203),
    ("Malaysia", "Asia", 32_365_999),
    ("Peru", "South America", 32_971_854),
    ("Afghanistan", "Asia", 38_928_346),
    ("Venezuela", "South America", 28_435_943),
    ("Ghana", "Africa", 31_072_940),
    ("Angola", "Africa", 32_866_272),
    ("Nepal", "Asia", 29_136_808),
    ("Yemen", "Asia", 29_825_964),
    ("North Korea", "Asia", 25_778_816),
    ("Australia", "Oceania", 25_499_884),
];

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn uniform(name: &'static str, low: f64, high: f64) -> Result<Uniform<f64>> {
    Uniform::new(low, high).map_err(|e| PathflowError::invalid(name, e.to_string()))
}

/// Reads a region table, failing on a missing file, a missing required
/// column, an invalid row or a repeated country.
pub fn load(path: &Path) -> Result<RegionTable> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    let headers = reader.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(PathflowError::MissingColumn(missing.to_string()));
    }

    let mut table = RegionTable::new();
    for row in reader.deserialize() {
        let record: RegionRecord = row?;
        record.validate()?;
        table.insert(record)?;
    }
    Ok(table)
}

pub fn save(table: &RegionTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in table {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// The built-in 50-country table. Columns other than name, continent and
/// population are drawn uniformly from plausible ranges and rounded to one
/// decimal; the same seed always gives the same table.
pub fn default_dataset(seed: u64) -> Result<RegionTable> {
    let mut rng = StdRng::seed_from_u64(seed);
    let density = uniform("population_density", 3.0, 1300.0)?;
    let air_quality = uniform("air_quality_index", 30.0, 180.0)?;
    let water_quality = uniform("water_quality_index", 40.0, 95.0)?;
    let young = uniform("age_distribution_young", 15.0, 45.0)?;
    let gender_ratio = uniform("gender_ratio", 95.0, 105.0)?;
    let health = uniform("health_conditions_percentage", 15.0, 35.0)?;

    let mut table = RegionTable::new();
    for (country, continent, population) in COUNTRIES {
        let age_young = round1(young.sample(&mut rng));
        // Adults never crowd out the elderly share entirely.
        let age_adult =
            round1(uniform("age_distribution_adult", 40.0, 65.0_f64.min(100.0 - age_young))?.sample(&mut rng));
        table.insert(RegionRecord {
            country: country.to_string(),
            continent: continent.to_string(),
            population,
            population_density: round1(density.sample(&mut rng)),
            air_quality_index: round1(air_quality.sample(&mut rng)),
            water_quality_index: round1(water_quality.sample(&mut rng)),
            age_distribution_young: age_young,
            age_distribution_adult: age_adult,
            age_distribution_elderly: round1(100.0 - age_young - age_adult),
            gender_ratio: round1(gender_ratio.sample(&mut rng)),
            health_conditions_percentage: round1(health.sample(&mut rng)),
        })?;
    }
    Ok(table)
}

/// Loads `path`, or writes and returns the default dataset when the file is
/// absent or lacks a required column.
pub fn load_or_regenerate(path: &Path, seed: u64) -> Result<RegionTable> {
    match load(path) {
        Ok(table) => {
            info!("loaded {} regions from {}", table.len(), path.display());
            Ok(table)
        }
        Err(PathflowError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            warn!("no region dataset at {}, generating defaults", path.display());
            regenerate(path, seed)
        }
        Err(PathflowError::MissingColumn(column)) => {
            warn!(
                "region dataset {} is missing column `{column}`, generating defaults",
                path.display()
            );
            regenerate(path, seed)
        }
        Err(e) => Err(e),
    }
}

fn regenerate(path: &Path, seed: u64) -> Result<RegionTable> {
    let table = default_dataset(seed)?;
    save(&table, path)?;
    info!("saved {} default regions to {}", table.len(), path.display());
    Ok(table)
}
