//! Fitness functions.
//!
//! A fitness function compares the output row of one genome position with
//! the target vector and returns an error: lower is better. The evaluator
//! maps any non-finite score to `+inf` so NaN never wins a comparison.

// Row counts are small enough to be represented exactly
#![allow(clippy::cast_precision_loss)]

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scores a signal against a target; lower is better.
pub trait FitnessFunction: Send + Sync {
    /// Error of `signal` with respect to `target`. Both have the same length.
    fn score(&self, signal: &[f64], target: &[f64]) -> f64;
}

impl<F> FitnessFunction for F
where
    F: Fn(&[f64], &[f64]) -> f64 + Send + Sync,
{
    fn score(&self, signal: &[f64], target: &[f64]) -> f64 {
        self(signal, target)
    }
}

/// Built-in error measures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMeasure {
    /// Sum of absolute differences.
    #[default]
    TotalError,
    /// Mean of absolute differences.
    MeanError,
    /// Binary cross-entropy; the signal is clamped into `(0, 1)`.
    LogLoss,
    /// Number of rows whose side of `threshold` differs from the target's.
    Misclassified {
        /// Class boundary.
        threshold: f64,
    },
}

/// Clamp used to keep logarithms finite.
const LOG_LOSS_EPSILON: f64 = 1e-15;

impl FitnessFunction for ErrorMeasure {
    fn score(&self, signal: &[f64], target: &[f64]) -> f64 {
        match *self {
            Self::TotalError => total_error(signal, target),
            Self::MeanError => {
                if target.is_empty() {
                    0.0
                } else {
                    total_error(signal, target) / target.len() as f64
                }
            }
            Self::LogLoss => {
                if target.is_empty() {
                    return 0.0;
                }
                let sum: f64 = signal
                    .iter()
                    .zip(target)
                    .map(|(&s, &t)| {
                        let p = s.clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON);
                        t * p.ln() + (1.0 - t) * (1.0 - p).ln()
                    })
                    .sum();
                -sum / target.len() as f64
            }
            Self::Misclassified { threshold } => signal
                .iter()
                .zip(target)
                .filter(|&(&s, &t)| (s > threshold) != (t > threshold))
                .count() as f64,
        }
    }
}

fn total_error(signal: &[f64], target: &[f64]) -> f64 {
    signal.iter().zip(target).map(|(s, t)| (s - t).abs()).sum()
}

impl fmt::Display for ErrorMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TotalError => write!(f, "total"),
            Self::MeanError => write!(f, "mean"),
            Self::LogLoss => write!(f, "logloss"),
            Self::Misclassified { threshold } => write!(f, "misclassified@{threshold}"),
        }
    }
}

impl FromStr for ErrorMeasure {
    type Err = ConfigError;

    /// Accepts `total`, `mean`, `logloss`, `misclassified` and
    /// `misclassified@<threshold>` (default threshold 0.5).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "total" => Ok(Self::TotalError),
            "mean" => Ok(Self::MeanError),
            "logloss" => Ok(Self::LogLoss),
            "misclassified" => Ok(Self::Misclassified { threshold: 0.5 }),
            _ => s
                .strip_prefix("misclassified@")
                .and_then(|t| t.parse().ok())
                .map(|threshold| Self::Misclassified { threshold })
                .ok_or_else(|| ConfigError::UnknownErrorMeasure(s.to_string())),
        }
    }
}
