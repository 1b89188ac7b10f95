//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the signal set is non-empty, unique, and deliverable here
//! - Check the log filter parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShutdownConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ShutdownConfig;
use crate::lifecycle::SignalKind;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("signals must list at least one signal")]
    NoSignals,

    #[error("signal {0} is listed more than once")]
    DuplicateSignal(SignalKind),

    #[error("signal {0} is not supported on this platform")]
    UnsupportedSignal(SignalKind),

    #[error("invalid log filter {0:?}")]
    InvalidLogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ShutdownConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.signals.is_empty() {
        errors.push(ValidationError::NoSignals);
    }

    let mut seen: Vec<SignalKind> = Vec::with_capacity(config.signals.len());
    for &kind in &config.signals {
        if seen.contains(&kind) {
            if !errors.contains(&ValidationError::DuplicateSignal(kind)) {
                errors.push(ValidationError::DuplicateSignal(kind));
            }
            continue;
        }
        seen.push(kind);
        if !kind.is_supported() {
            errors.push(ValidationError::UnsupportedSignal(kind));
        }
    }

    if EnvFilter::try_new(&config.logging.level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
