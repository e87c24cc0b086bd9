//! Deterministic outbreak projections.
//!
//! Four independent components share the typed configuration records in
//! [`parameters`]:
//!
//! - [`EpidemicEngine`] runs a closed-population SEIR(D) model.
//! - [`HealthcareProjector`] projects bed, ICU and ventilator demand for one
//!   region.
//! - [`VariantCompositor`] folds a set of variants into scalar adjustments.
//! - [`RiskScorer`] scores every row of a region table.
//!
//! Each call is a pure function of its inputs. The [`dataset`] module is the
//! file-backed collaborator that supplies region tables.

pub mod dataset;
pub mod error;
pub mod healthcare;
pub mod output;
pub mod parameters;
pub mod region;
pub mod risk;
pub mod seir;
pub mod variants;

pub use error::{PathflowError, Result};
pub use healthcare::{HealthcareProjection, HealthcareProjector};
pub use output::{InfectionSeries, ResourceSeries};
pub use parameters::{
    HealthcareCapacity, PathogenProfile, Vaccine, VaccineSet, Variant, VariantSet,
};
pub use region::{RegionRecord, RegionTable};
pub use risk::{RankingMetric, RiskScorer, RiskSnapshot};
pub use seir::EpidemicEngine;
pub use variants::VariantCompositor;
