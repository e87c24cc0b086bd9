use std::path::Path;

use log::{error, info};
use serde::Deserialize;
use thiserror::Error;

use pathflow::dataset::{self, DEFAULT_SEED};
use pathflow::healthcare::Resource;
use pathflow::region::WORLD;
use pathflow::risk::{self, RankingMetric};
use pathflow::{
    EpidemicEngine, HealthcareCapacity, HealthcareProjector, PathflowError, PathogenProfile,
    RegionTable, RiskScorer, RiskSnapshot, VaccineSet, VariantCompositor, VariantSet,
};
use pathflow_runner::{Environment, RunnerError, logging};

const DEFAULT_REGIONS_PATH: &str = "data/country_data.csv";

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Model(#[from] PathflowError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

type RunResult<T> = std::result::Result<T, RunError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Analysis {
    InfectionProgress,
    HealthcareLoad,
    GlobalSpread,
    VariantTracking,
}

fn default_country() -> String {
    WORLD.to_string()
}

fn default_top() -> usize {
    10
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunInput {
    analysis: Analysis,
    #[serde(default)]
    pathogen: PathogenProfile,
    #[serde(default)]
    variants: VariantSet,
    #[serde(default)]
    vaccines: VaccineSet,
    #[serde(default)]
    healthcare: HealthcareCapacity,
    #[serde(default = "default_country")]
    country: String,
    #[serde(default)]
    continent: Option<String>,
    #[serde(default)]
    horizon_days: Option<usize>,
    #[serde(default)]
    ranking: RankingMetric,
    #[serde(default)]
    ranking_variant: Option<String>,
    #[serde(default = "default_top")]
    top: usize,
}

impl RunInput {
    fn horizon(&self) -> usize {
        self.horizon_days.unwrap_or(match self.analysis {
            Analysis::HealthcareLoad => 30,
            _ => 100,
        })
    }
}

/// The country rows of the region dataset, without any "World" row.
fn load_countries(env: &Environment<RunInput>) -> RunResult<RegionTable> {
    let path = env
        .file("regions")
        .unwrap_or_else(|| Path::new(DEFAULT_REGIONS_PATH));
    let seed = if env.seed == 0 { DEFAULT_SEED } else { env.seed };
    Ok(dataset::load_or_regenerate(path, seed)?.countries())
}

fn infection_progress(env: &Environment<RunInput>) -> RunResult<()> {
    let series = EpidemicEngine::run(&env.input.pathogen, env.input.horizon())?;
    let summary = series.summary();
    info!(
        "peak of {} infected on day {:?}; {} total cases, {} deaths ({:.2}% mortality)",
        summary.peak_infected,
        summary.peak_day,
        summary.total_cases,
        summary.total_deceased,
        summary.mortality_percentage
    );
    env.write_records("infection_progress.csv", &series.points)?;
    Ok(())
}

fn healthcare_load(env: &Environment<RunInput>) -> RunResult<()> {
    let input = &env.input;
    let mut table = load_countries(env)?.with_world()?;
    if let Some(continent) = &input.continent {
        table = table.filter_continent(continent);
    }
    let region = table.region(&input.country)?;
    let projection =
        HealthcareProjector::project(&input.healthcare, &input.vaccines, region, input.horizon())?;

    let vaccination = &projection.vaccination;
    info!(
        "{}: {} vaccines, {:.1}% effective protection, transmission cut by {:.1}%",
        region.country,
        vaccination.vaccine_count,
        vaccination.effective_protection,
        vaccination.vaccination_reduction * 100.0
    );
    let reduction = projection.need_reduction();
    info!(
        "resource need reduction: beds {:.1}%, ICU {:.1}%, ventilators {:.1}%",
        reduction.hospital_beds, reduction.icu, reduction.ventilators
    );
    for resource in [Resource::HospitalBeds, Resource::Icu, Resource::Ventilators] {
        if let Some(day) = projection.first_critical_day(resource) {
            info!("{:?} critical from day {}", resource, day);
        }
    }

    env.write_records("healthcare_load.csv", &projection.series.points)?;
    env.write_records("healthcare_strain.csv", &projection.strain())?;
    Ok(())
}

fn global_spread(env: &Environment<RunInput>) -> RunResult<()> {
    let input = &env.input;
    // Normalise against every country, then narrow to the continent.
    let countries = load_countries(env)?;
    let snapshots: Vec<RiskSnapshot> =
        RiskScorer::score(&countries, &input.pathogen, &input.variants, &input.vaccines)?
            .into_iter()
            .filter(|s| {
                input
                    .continent
                    .as_deref()
                    .is_none_or(|continent| s.region.continent == continent)
            })
            .collect();
    let total_cases: u64 = snapshots.iter().map(|s| s.active_cases).sum();
    info!("{} regions scored, {} active cases", snapshots.len(), total_cases);

    let ranked = risk::rank(
        &snapshots,
        input.ranking,
        &input.variants,
        input.ranking_variant.as_deref(),
    )?;
    let headers = input.ranking.export_headers(&input.variants)?;
    let rows: Vec<Vec<String>> = risk::top_n(&ranked, input.top)
        .into_iter()
        .map(|snapshot| input.ranking.export_row(snapshot))
        .collect();
    env.write_csv(&input.ranking.file_name(), &headers, &rows)?;

    if !input.variants.is_empty() {
        env.write_records(
            "variant_totals.csv",
            &risk::variant_totals(&snapshots, &input.variants),
        )?;
    }
    Ok(())
}

fn variant_tracking(env: &Environment<RunInput>) -> RunResult<()> {
    let input = &env.input;
    info!(
        "combined transmission {:.3} (base {}), variant vaccine match {:.3}, severity weight {:.4}",
        VariantCompositor::combined_transmission_multiplier(
            &input.variants,
            input.pathogen.transmission_rate
        ),
        input.pathogen.transmission_rate,
        VariantCompositor::combined_vaccine_effectiveness(&input.variants, &input.vaccines),
        VariantCompositor::severity_contribution(&input.variants)
    );
    env.write_records(
        "variant_metrics.csv",
        &VariantCompositor::variant_metrics(&input.variants),
    )?;
    Ok(())
}

fn run(env: &Environment<RunInput>) -> RunResult<()> {
    info!(
        "{:?} run {} (seed {}, replicate {})",
        env.input.analysis,
        env.fingerprint(),
        env.seed,
        env.replicate
    );
    match env.input.analysis {
        Analysis::InfectionProgress => infection_progress(env),
        Analysis::HealthcareLoad => healthcare_load(env),
        Analysis::GlobalSpread => global_spread(env),
        Analysis::VariantTracking => variant_tracking(env),
    }
}

fn main() {
    if let Err(e) = logging::init() {
        eprintln!("logging unavailable: {e}");
    }
    let result = Environment::<RunInput>::load()
        .map_err(RunError::from)
        .and_then(|env| run(&env));
    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}
