use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathflowError {
    /// A rate, period or count outside the domain the formulas accept.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("duplicate {kind} name `{name}`")]
    DuplicateKey { kind: &'static str, name: String },
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
    #[error("region dataset is missing required column `{0}`")]
    MissingColumn(String),
    #[error("no region named `{0}`")]
    UnknownRegion(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PathflowError>;

impl PathflowError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PathflowError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub(crate) fn check_percent(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(PathflowError::invalid(
            name,
            format!("{value} is not a percentage in [0, 100]"),
        ))
    }
}

pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PathflowError::invalid(
            name,
            format!("{value} must be finite and non-negative"),
        ))
    }
}

pub(crate) fn check_name(name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(PathflowError::invalid(name, "must not be blank"))
    } else {
        Ok(())
    }
}
