//! Per-region risk scoring and the rankings built on top of it.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PathflowError, Result};
use crate::parameters::{PathogenProfile, VaccineSet, VariantSet, fraction};
use crate::region::{RegionRecord, RegionTable};
use crate::variants::VariantCompositor;

const DENSITY_WEIGHT: f64 = 0.3;
const AIR_QUALITY_WEIGHT: f64 = 0.2;
const WATER_QUALITY_WEIGHT: f64 = 0.2;
const HEALTH_WEIGHT: f64 = 0.3;

/// Largest value of each normalised column across a region table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnMaxima {
    pub population_density: f64,
    pub air_quality_index: f64,
    pub water_quality_index: f64,
    pub health_conditions_percentage: f64,
}

impl ColumnMaxima {
    pub fn reduce(regions: &RegionTable) -> Result<Self> {
        if regions.is_empty() {
            return Err(PathflowError::EmptyInput("region table"));
        }
        let max = |column: fn(&RegionRecord) -> f64| {
            regions.iter().map(column).fold(f64::NEG_INFINITY, f64::max)
        };
        Ok(ColumnMaxima {
            population_density: max(|r| r.population_density),
            air_quality_index: max(|r| r.air_quality_index),
            water_quality_index: max(|r| r.water_quality_index),
            health_conditions_percentage: max(|r| r.health_conditions_percentage),
        })
    }
}

/// `value / max`, or 0 for a column that is zero everywhere.
fn normalise(value: f64, max: f64) -> f64 {
    if max > 0.0 { value / max } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantCases {
    pub name: String,
    pub cases: u64,
}

/// A region with its scored outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSnapshot {
    pub region: RegionRecord,
    /// Composite environmental risk in [0, 1].
    pub risk_score: f64,
    /// Share of the population infected, in [0, 1].
    pub infection_rate: f64,
    pub active_cases: u64,
    /// Severity on a 0-10 scale.
    pub severity_index: f64,
    /// Case counts per variant, in variant-set order.
    pub variant_cases: Vec<VariantCases>,
}

impl RiskSnapshot {
    pub fn cases_of(&self, variant: &str) -> Option<u64> {
        self.variant_cases
            .iter()
            .find(|v| v.name == variant)
            .map(|v| v.cases)
    }

    /// Percentage of active cases attributed to `variant`.
    pub fn variant_share(&self, variant: &str) -> Option<f64> {
        let cases = self.cases_of(variant)?;
        Some(if self.active_cases > 0 {
            cases as f64 / self.active_cases as f64 * 100.0
        } else {
            0.0
        })
    }
}

/// Table-wide values that do not depend on the row being scored.
struct RunFactors {
    adjusted_transmission: f64,
    vaccine_protection: f64,
    mutation_factor: f64,
    severity_contribution: f64,
}

pub struct RiskScorer {}

impl RiskScorer {
    pub fn score(
        regions: &RegionTable,
        profile: &PathogenProfile,
        variants: &VariantSet,
        vaccines: &VaccineSet,
    ) -> Result<Vec<RiskSnapshot>> {
        profile.validate()?;
        for variant in variants {
            variant.validate()?;
        }
        for vaccine in vaccines {
            vaccine.validate()?;
        }
        for region in regions {
            region.validate()?;
        }

        let maxima = ColumnMaxima::reduce(regions)?;
        let factors = RunFactors {
            adjusted_transmission: VariantCompositor::combined_transmission_multiplier(
                variants,
                profile.transmission_rate,
            ),
            vaccine_protection: VariantCompositor::combined_vaccine_effectiveness(
                variants, vaccines,
            ),
            mutation_factor: 1.0 + fraction(profile.mutation_rate),
            severity_contribution: VariantCompositor::severity_contribution(variants),
        };
        debug!(
            "scoring {} regions: maxima {:?}, adjusted transmission {}, vaccine protection {}",
            regions.len(),
            maxima,
            factors.adjusted_transmission,
            factors.vaccine_protection
        );

        Ok(regions
            .iter()
            .map(|region| Self::score_region(region, &maxima, &factors, variants))
            .collect())
    }

    fn score_region(
        region: &RegionRecord,
        maxima: &ColumnMaxima,
        factors: &RunFactors,
        variants: &VariantSet,
    ) -> RiskSnapshot {
        let density = normalise(region.population_density, maxima.population_density);
        let risk_score = (DENSITY_WEIGHT * density
            + AIR_QUALITY_WEIGHT * normalise(region.air_quality_index, maxima.air_quality_index)
            + WATER_QUALITY_WEIGHT
                * normalise(region.water_quality_index, maxima.water_quality_index)
            + HEALTH_WEIGHT
                * normalise(
                    region.health_conditions_percentage,
                    maxima.health_conditions_percentage,
                ))
        .clamp(0.0, 1.0);

        let infection_rate = (risk_score
            * (factors.adjusted_transmission / 100.0)
            * (1.0 - factors.vaccine_protection)
            * factors.mutation_factor)
            .clamp(0.0, 1.0);
        let infected = region.population as f64 * infection_rate;

        let variant_cases = variants
            .iter()
            .map(|variant| VariantCases {
                name: variant.name.clone(),
                cases: (infected * (variant.daily_cases / 1000.0) * (f64::from(variant.severity) / 10.0))
                    .floor() as u64,
            })
            .collect();

        let base_severity = (0.4 * density
            + 0.3 * fraction(region.health_conditions_percentage)
            + 0.3 * infection_rate)
            .clamp(0.0, 1.0);
        let severity_index =
            (base_severity * (1.0 + factors.severity_contribution)).clamp(0.0, 1.0) * 10.0;

        RiskSnapshot {
            region: region.clone(),
            risk_score,
            infection_rate,
            active_cases: infected.floor() as u64,
            severity_index,
            variant_cases,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    #[default]
    TotalCases,
    SeverityIndex,
    VariantDistribution,
}

impl RankingMetric {
    pub fn slug(&self) -> &'static str {
        match self {
            RankingMetric::TotalCases => "total_cases",
            RankingMetric::SeverityIndex => "severity_index",
            RankingMetric::VariantDistribution => "variant_distribution",
        }
    }

    pub fn file_name(&self) -> String {
        format!("country_rankings_{}.csv", self.slug())
    }

    /// Column names of the exported ranking table.
    pub fn export_headers(&self, variants: &VariantSet) -> Result<Vec<String>> {
        let base: &[&str] = match self {
            RankingMetric::TotalCases => {
                &["country", "active_cases", "infection_rate", "severity_index"]
            }
            RankingMetric::SeverityIndex => {
                &["country", "severity_index", "active_cases", "infection_rate"]
            }
            RankingMetric::VariantDistribution => {
                if variants.is_empty() {
                    return Err(PathflowError::EmptyInput("variant set"));
                }
                &["country", "active_cases", "infection_rate", "severity_index"]
            }
        };
        let mut headers: Vec<String> = base.iter().map(|h| h.to_string()).collect();
        if *self == RankingMetric::VariantDistribution {
            headers.extend(variants.iter().map(|v| format!("{}_cases", v.name)));
        }
        Ok(headers)
    }

    pub fn export_row(&self, snapshot: &RiskSnapshot) -> Vec<String> {
        let country = snapshot.region.country.clone();
        let cases = snapshot.active_cases.to_string();
        let rate = snapshot.infection_rate.to_string();
        let severity = snapshot.severity_index.to_string();
        match self {
            RankingMetric::TotalCases => vec![country, cases, rate, severity],
            RankingMetric::SeverityIndex => vec![country, severity, cases, rate],
            RankingMetric::VariantDistribution => {
                let mut row = vec![country, cases, rate, severity];
                row.extend(snapshot.variant_cases.iter().map(|v| v.cases.to_string()));
                row
            }
        }
    }
}

/// Snapshots ordered highest first by `metric`; ties keep table order.
///
/// `VariantDistribution` ranks by the case count of `variant`, or of the
/// first variant when `variant` is `None`.
pub fn rank<'a>(
    snapshots: &'a [RiskSnapshot],
    metric: RankingMetric,
    variants: &VariantSet,
    variant: Option<&str>,
) -> Result<Vec<&'a RiskSnapshot>> {
    let mut ranked: Vec<&RiskSnapshot> = snapshots.iter().collect();
    match metric {
        RankingMetric::TotalCases => ranked.sort_by(|a, b| b.active_cases.cmp(&a.active_cases)),
        RankingMetric::SeverityIndex => {
            ranked.sort_by(|a, b| b.severity_index.total_cmp(&a.severity_index))
        }
        RankingMetric::VariantDistribution => {
            let name: &str = match variant {
                Some(name) => {
                    &variants
                        .get(name)
                        .ok_or_else(|| {
                            PathflowError::invalid(
                                "ranking_variant",
                                format!("no variant named `{name}`"),
                            )
                        })?
                        .name
                }
                None => {
                    &variants
                        .first()
                        .ok_or(PathflowError::EmptyInput("variant set"))?
                        .name
                }
            };
            ranked.sort_by_key(|s| std::cmp::Reverse(s.cases_of(name).unwrap_or(0)));
        }
    }
    Ok(ranked)
}

/// The first `n` entries of a ranking.
pub fn top_n<'a>(ranked: &[&'a RiskSnapshot], n: usize) -> Vec<&'a RiskSnapshot> {
    ranked.iter().take(n).copied().collect()
}

/// Cases of each variant summed over all regions, in variant-set order.
pub fn variant_totals(snapshots: &[RiskSnapshot], variants: &VariantSet) -> Vec<VariantCases> {
    variants
        .iter()
        .map(|variant| VariantCases {
            name: variant.name.clone(),
            cases: snapshots
                .iter()
                .filter_map(|s| s.cases_of(&variant.name))
                .sum(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{Vaccine, Variant};
    use crate::region::tests::region;
    use approx::assert_relative_eq;

    fn table() -> RegionTable {
        RegionTable::try_from(vec![
            region("Dense", "Asia", 10_000_000, 1000.0, 40.0),
            region("Sparse", "Oceania", 2_000_000, 100.0, 10.0),
            region("Middle", "Europe", 5_000_000, 500.0, 20.0),
        ])
        .unwrap()
    }

    fn profile(transmission: f64, mutation: f64) -> PathogenProfile {
        PathogenProfile::new(transmission, 5, 14, 95.0, 2.0, mutation).unwrap()
    }

    fn variant_set(specs: &[(&str, f64, u8)]) -> VariantSet {
        VariantSet::try_from(
            specs
                .iter()
                .map(|&(name, cases, severity)| {
                    Variant::new(name, cases, severity, 50.0, 50.0, 80.0).unwrap()
                })
                .collect::<Vec<_>>(),
        )
        .unwrap()
    }

    #[test]
    fn test_score_no_variants() {
        let snapshots =
            RiskScorer::score(&table(), &profile(50.0, 0.0), &VariantSet::new(), &VaccineSet::new())
                .unwrap();
        assert_eq!(snapshots.len(), 3);

        // Densest, sickest row with air and water at the column max.
        let dense = &snapshots[0];
        assert_relative_eq!(dense.risk_score, 1.0, epsilon = 1e-12);
        assert_relative_eq!(dense.infection_rate, 0.5, epsilon = 1e-12);
        assert_eq!(dense.active_cases, 5_000_000);
        assert_relative_eq!(
            dense.severity_index,
            (0.4 + 0.3 * 0.4 + 0.3 * 0.5) * 10.0,
            epsilon = 1e-9
        );
        assert!(dense.variant_cases.is_empty());

        let sparse = &snapshots[1];
        let risk = 0.3 * 0.1 + 0.2 + 0.2 + 0.3 * 0.25;
        assert_relative_eq!(sparse.risk_score, risk, epsilon = 1e-12);
        assert_eq!(sparse.active_cases, (2_000_000.0 * risk * 0.5).floor() as u64);
    }

    #[test]
    fn test_variant_cases_and_share() {
        let variants = variant_set(&[("Alpha", 20.0, 5), ("Beta", 10.0, 10)]);
        let snapshots =
            RiskScorer::score(&table(), &profile(50.0, 0.0), &variants, &VaccineSet::new())
                .unwrap();
        let dense = &snapshots[0];
        let infected = 10_000_000.0 * dense.infection_rate;
        assert_eq!(
            dense.cases_of("Alpha"),
            Some((infected * 0.02 * 0.5).floor() as u64)
        );
        assert_eq!(dense.cases_of("Beta"), Some((infected * 0.01).floor() as u64));
        assert_eq!(dense.cases_of("Gamma"), None);
        let share = dense.variant_share("Alpha").unwrap();
        assert_relative_eq!(
            share,
            dense.cases_of("Alpha").unwrap() as f64 / dense.active_cases as f64 * 100.0
        );

        let totals = variant_totals(&snapshots, &variants);
        assert_eq!(totals[0].name, "Alpha");
        assert_eq!(
            totals[0].cases,
            snapshots.iter().map(|s| s.cases_of("Alpha").unwrap()).sum::<u64>()
        );
    }

    #[test]
    fn test_vaccines_only_count_with_variants() {
        let vaccines =
            VaccineSet::try_from(vec![Vaccine::new("Vaccine 1", 60.0, 95.0, 5.0).unwrap()]).unwrap();
        let without = RiskScorer::score(&table(), &profile(50.0, 0.0), &VariantSet::new(), &VaccineSet::new())
            .unwrap();
        let vaccinated_only =
            RiskScorer::score(&table(), &profile(50.0, 0.0), &VariantSet::new(), &vaccines).unwrap();
        assert_eq!(without, vaccinated_only);

        let variants = variant_set(&[("Alpha", 20.0, 5)]);
        let unprotected =
            RiskScorer::score(&table(), &profile(50.0, 0.0), &variants, &VaccineSet::new()).unwrap();
        let protected = RiskScorer::score(&table(), &profile(50.0, 0.0), &variants, &vaccines).unwrap();
        assert!(protected[0].infection_rate < unprotected[0].infection_rate);
    }

    #[test]
    fn test_clamped_under_adversarial_inputs() {
        let variants = variant_set(&[("Alpha", 1000.0, 10), ("Beta", 5000.0, 10), ("Gamma", 800.0, 9)]);
        let snapshots =
            RiskScorer::score(&table().with_world().unwrap(), &profile(100.0, 100.0), &variants, &VaccineSet::new())
                .unwrap();
        for snapshot in &snapshots {
            assert!((0.0..=1.0).contains(&snapshot.infection_rate));
            assert!((0.0..=10.0).contains(&snapshot.severity_index));
            assert!((0.0..=1.0).contains(&snapshot.risk_score));
            assert!(snapshot.active_cases <= snapshot.region.population);
        }
        assert_eq!(snapshots[0].infection_rate, 1.0);
        assert_eq!(snapshots[0].severity_index, 10.0);
    }

    #[test]
    fn test_empty_table() {
        assert!(matches!(
            RiskScorer::score(
                &RegionTable::new(),
                &profile(50.0, 0.0),
                &VariantSet::new(),
                &VaccineSet::new()
            ),
            Err(PathflowError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_zero_max_column_contributes_nothing() {
        let mut a = region("A", "Asia", 1_000_000, 0.0, 0.0);
        let mut b = region("B", "Asia", 1_000_000, 0.0, 0.0);
        a.air_quality_index = 0.0;
        b.air_quality_index = 0.0;
        let regions = RegionTable::try_from(vec![a, b]).unwrap();
        let snapshots =
            RiskScorer::score(&regions, &profile(50.0, 0.0), &VariantSet::new(), &VaccineSet::new())
                .unwrap();
        for snapshot in &snapshots {
            assert!(snapshot.risk_score.is_finite());
            // Only water quality is non-zero.
            assert_relative_eq!(snapshot.risk_score, 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_world_row_scored() {
        let snapshots = RiskScorer::score(
            &table().with_world().unwrap(),
            &profile(50.0, 0.0),
            &VariantSet::new(),
            &VaccineSet::new(),
        )
        .unwrap();
        let world = snapshots.last().unwrap();
        assert_eq!(world.region.country, crate::region::WORLD);
        assert_eq!(world.region.population, 17_000_000);
        assert!(world.active_cases > 0);
    }

    #[test]
    fn test_rank_and_top_n() {
        let variants = variant_set(&[("Alpha", 20.0, 5), ("Beta", 10.0, 10)]);
        let snapshots =
            RiskScorer::score(&table(), &profile(50.0, 0.0), &variants, &VaccineSet::new()).unwrap();

        let by_cases = rank(&snapshots, RankingMetric::TotalCases, &variants, None).unwrap();
        let names: Vec<&str> = by_cases.iter().map(|s| s.region.country.as_str()).collect();
        assert_eq!(names, vec!["Dense", "Middle", "Sparse"]);
        assert!(by_cases.windows(2).all(|w| w[0].active_cases >= w[1].active_cases));

        let by_severity = rank(&snapshots, RankingMetric::SeverityIndex, &variants, None).unwrap();
        assert!(by_severity.windows(2).all(|w| w[0].severity_index >= w[1].severity_index));

        let by_beta =
            rank(&snapshots, RankingMetric::VariantDistribution, &variants, Some("Beta")).unwrap();
        assert_eq!(by_beta[0].region.country, "Dense");
        assert!(matches!(
            rank(&snapshots, RankingMetric::VariantDistribution, &variants, Some("Omega")),
            Err(PathflowError::InvalidParameter { name: "ranking_variant", .. })
        ));
        assert!(matches!(
            rank(&snapshots, RankingMetric::VariantDistribution, &VariantSet::new(), None),
            Err(PathflowError::EmptyInput(_))
        ));

        assert_eq!(top_n(&by_cases, 2).len(), 2);
        assert_eq!(top_n(&by_cases, 10).len(), 3);
    }

    #[test]
    fn test_rank_ties_keep_table_order() {
        let regions = RegionTable::try_from(vec![
            region("First", "Asia", 1_000_000, 100.0, 20.0),
            region("Second", "Asia", 1_000_000, 100.0, 20.0),
        ])
        .unwrap();
        let snapshots =
            RiskScorer::score(&regions, &profile(50.0, 0.0), &VariantSet::new(), &VaccineSet::new())
                .unwrap();
        let ranked = rank(&snapshots, RankingMetric::TotalCases, &VariantSet::new(), None).unwrap();
        assert_eq!(ranked[0].region.country, "First");
        assert_eq!(ranked[1].region.country, "Second");
    }

    #[test]
    fn test_export_columns() {
        let variants = variant_set(&[("Alpha", 20.0, 5), ("Beta", 10.0, 10)]);
        assert_eq!(
            RankingMetric::SeverityIndex.export_headers(&variants).unwrap(),
            vec!["country", "severity_index", "active_cases", "infection_rate"]
        );
        assert_eq!(
            RankingMetric::VariantDistribution.export_headers(&variants).unwrap(),
            vec![
                "country",
                "active_cases",
                "infection_rate",
                "severity_index",
                "Alpha_cases",
                "Beta_cases"
            ]
        );
        assert!(matches!(
            RankingMetric::VariantDistribution.export_headers(&VariantSet::new()),
            Err(PathflowError::EmptyInput(_))
        ));
        assert_eq!(
            RankingMetric::VariantDistribution.file_name(),
            "country_rankings_variant_distribution.csv"
        );

        let snapshots =
            RiskScorer::score(&table(), &profile(50.0, 0.0), &variants, &VaccineSet::new()).unwrap();
        let row = RankingMetric::TotalCases.export_row(&snapshots[0]);
        assert_eq!(row[0], "Dense");
        assert_eq!(row[1], snapshots[0].active_cases.to_string());
        assert_eq!(RankingMetric::VariantDistribution.export_row(&snapshots[0]).len(), 6);
    }

    #[test]
    fn test_metric_names() {
        let metric: RankingMetric = serde_json::from_str("\"severity_index\"").unwrap();
        assert_eq!(metric, RankingMetric::SeverityIndex);
        assert_eq!(RankingMetric::default().file_name(), "country_rankings_total_cases.csv");
    }
}
