//! Collapses a variant set into the scalar adjustments used by the
//! projections.

use serde::Serialize;

use crate::parameters::{VaccineSet, Variant, VariantSet, fraction};

/// Share of the tracked daily case load carried by one variant.
fn prevalence(variant: &Variant, total_cases: f64) -> f64 {
    if total_cases > 0.0 {
        variant.daily_cases / total_cases
    } else {
        0.0
    }
}

fn total_daily_cases(variants: &VariantSet) -> f64 {
    variants.iter().map(|v| v.daily_cases).sum()
}

/// Per-variant figures for side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantMetrics {
    pub name: String,
    /// Daily cases scaled by 10 onto a 0-100 style axis.
    pub relative_transmission: f64,
    pub severity: u8,
    pub mortality_rate: f64,
    pub vaccine_effectiveness: f64,
    pub prevalence: f64,
}

pub struct VariantCompositor {}

impl VariantCompositor {
    /// Base transmission amplified by the prevalence-weighted variant
    /// impact. Returns `base_transmission` untouched when there are no
    /// variants.
    pub fn combined_transmission_multiplier(variants: &VariantSet, base_transmission: f64) -> f64 {
        if variants.is_empty() {
            return base_transmission;
        }
        let total_cases = total_daily_cases(variants);
        let total_impact: f64 = variants
            .iter()
            .map(|variant| {
                let impact = (variant.daily_cases / 1000.0)
                    * (f64::from(variant.severity) / 10.0)
                    * fraction(variant.mortality_rate)
                    * (1.0 - fraction(variant.recovery_rate));
                impact * prevalence(variant, total_cases)
            })
            .sum();
        base_transmission * (1.0 + total_impact)
    }

    /// Protection in [0, 1] from how well vaccines match the circulating
    /// variants. Only the presence of vaccines matters here; their own
    /// coverage figures are used by the healthcare projection instead.
    pub fn combined_vaccine_effectiveness(variants: &VariantSet, vaccines: &VaccineSet) -> f64 {
        if variants.is_empty() || vaccines.is_empty() {
            return 0.0;
        }
        let total_cases = total_daily_cases(variants);
        let effectiveness: f64 = variants
            .iter()
            .map(|variant| fraction(variant.vaccine_effectiveness) * prevalence(variant, total_cases))
            .sum();
        effectiveness.clamp(0.0, 1.0)
    }

    /// Additive severity weight of all variants.
    pub fn severity_contribution(variants: &VariantSet) -> f64 {
        variants
            .iter()
            .map(|v| f64::from(v.severity) / 10.0 * (v.daily_cases / 1000.0))
            .sum()
    }

    pub fn variant_metrics(variants: &VariantSet) -> Vec<VariantMetrics> {
        let total_cases = total_daily_cases(variants);
        variants
            .iter()
            .map(|variant| VariantMetrics {
                name: variant.name.clone(),
                relative_transmission: variant.daily_cases * 10.0,
                severity: variant.severity,
                mortality_rate: variant.mortality_rate,
                vaccine_effectiveness: variant.vaccine_effectiveness,
                prevalence: prevalence(variant, total_cases),
            })
            .collect()
    }
}
