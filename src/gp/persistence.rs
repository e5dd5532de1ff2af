//! Run reports and configuration files.
//!
//! Both are pretty-printed JSON. A report carries the configuration it was
//! produced with, so a run can be repeated from the report alone.

use crate::gp::evolution::{EvolutionConfig, Mep, SolveOutcome};
use crate::gp::genome::Chromosome;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Generations executed.
    pub generations: usize,
    /// Wall-clock time in seconds.
    pub elapsed_seconds: f64,
    /// Best error, `None` if no individual had a finite error.
    pub best_fitness: Option<f64>,
    /// Infix rendering of the best expression.
    pub expression: String,
    /// Input variable labels, in column order.
    pub labels: Vec<String>,
    /// The best chromosome.
    pub best: Chromosome,
    /// Configuration the run used.
    pub config: EvolutionConfig,
}

impl RunReport {
    /// Collect the report for an engine after `solve` returned `outcome`.
    #[must_use]
    pub fn new(mep: &Mep, outcome: &SolveOutcome) -> Self {
        let best_fitness = mep.best_fitness();
        Self {
            generations: outcome.generations,
            elapsed_seconds: outcome.elapsed.as_secs_f64(),
            best_fitness: best_fitness.is_finite().then_some(best_fitness),
            expression: mep.best_expression(),
            labels: mep.data().labels().to_vec(),
            best: mep.best().clone(),
            config: mep.config().clone(),
        }
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, json)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> io::Result<T> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Save a run report.
///
/// # Errors
///
/// Returns an error if serialization or file I/O fails.
pub fn save_report(report: &RunReport, path: &Path) -> io::Result<()> {
    write_json(report, path)
}

/// Load a run report.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid report.
pub fn load_report(path: &Path) -> io::Result<RunReport> {
    read_json(path)
}

/// Save an evolution configuration.
///
/// # Errors
///
/// Returns an error if serialization or file I/O fails.
pub fn save_config(config: &EvolutionConfig, path: &Path) -> io::Result<()> {
    write_json(config, path)
}

/// Load an evolution configuration. Missing fields take their defaults.
///
/// The result is not validated; [`Mep::new`] does that.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid JSON.
pub fn load_config(path: &Path) -> io::Result<EvolutionConfig> {
    read_json(path)
}
