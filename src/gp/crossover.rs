//! Crossover operators for MEP chromosomes.
//!
//! Both operators produce two offspring from two parents and keep program
//! and constant lengths. Genes keep their positions, so back-references
//! stay valid in the offspring without any repair.

use crate::error::ConfigError;
use crate::gp::genome::{Chromosome, check_probability};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available crossover operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossoverKind {
    /// Single cut point for genes and another for constants.
    #[default]
    OneCutPoint,
    /// Independent fair coin per gene and per constant.
    Uniform,
}

impl fmt::Display for CrossoverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneCutPoint => write!(f, "one-cut-point"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

impl FromStr for CrossoverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "one-cut-point" | "onecutpoint" | "one-point" => Ok(Self::OneCutPoint),
            "uniform" => Ok(Self::Uniform),
            other => Err(ConfigError::UnknownCrossover(other.to_string())),
        }
    }
}

/// Configuration for crossover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverConfig {
    /// Probability that a parent pair is recombined at all.
    pub probability: f64,
    /// Which operator to use.
    pub kind: CrossoverKind,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            probability: 0.9,
            kind: CrossoverKind::OneCutPoint,
        }
    }
}

impl CrossoverConfig {
    /// Check the probability range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Probability`] outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("crossover probability", self.probability)
    }
}

/// Recombine two parents into two offspring with the configured operator.
///
/// Offspring carry no evaluation.
#[must_use]
pub fn crossover<R: Rng>(
    parent1: &Chromosome,
    parent2: &Chromosome,
    kind: CrossoverKind,
    rng: &mut R,
) -> (Chromosome, Chromosome) {
    match kind {
        CrossoverKind::OneCutPoint => {
            let code_cut = rng.gen_range(0..parent1.code_length().max(1));
            let constants_cut = if parent1.constants.is_empty() {
                0
            } else {
                rng.gen_range(0..parent1.constants.len())
            };
            one_cut_point(parent1, parent2, code_cut, constants_cut)
        }
        CrossoverKind::Uniform => uniform(parent1, parent2, rng),
    }
}

/// One-cut-point crossover at fixed cut points.
///
/// Genes before `code_cut` and constants before `constants_cut` are
/// inherited straight; everything from the cut on is swapped. A cut of
/// zero swaps everything, a cut at the full length swaps nothing.
///
/// # Panics
///
/// Panics if the parents differ in program or constant length.
#[must_use]
pub fn one_cut_point(
    parent1: &Chromosome,
    parent2: &Chromosome,
    code_cut: usize,
    constants_cut: usize,
) -> (Chromosome, Chromosome) {
    assert_eq!(parent1.code_length(), parent2.code_length(), "parents differ in code length");
    assert_eq!(parent1.constants.len(), parent2.constants.len(), "parents differ in constant count");

    let (program1, program2) = cut_and_swap(&parent1.program, &parent2.program, code_cut);
    let (constants1, constants2) = cut_and_swap(&parent1.constants, &parent2.constants, constants_cut);
    (Chromosome::new(program1, constants1), Chromosome::new(program2, constants2))
}

fn cut_and_swap<T: Clone>(a: &[T], b: &[T], cut: usize) -> (Vec<T>, Vec<T>) {
    let cut = cut.min(a.len());
    let mut first = a[..cut].to_vec();
    first.extend_from_slice(&b[cut..]);
    let mut second = b[..cut].to_vec();
    second.extend_from_slice(&a[cut..]);
    (first, second)
}

/// Uniform crossover: a fair coin picks the source of every gene and
/// constant for the first offspring, the second gets the other parent's.
///
/// # Panics
///
/// Panics if the parents differ in program or constant length.
#[must_use]
pub fn uniform<R: Rng>(parent1: &Chromosome, parent2: &Chromosome, rng: &mut R) -> (Chromosome, Chromosome) {
    assert_eq!(parent1.code_length(), parent2.code_length(), "parents differ in code length");
    assert_eq!(parent1.constants.len(), parent2.constants.len(), "parents differ in constant count");

    let (program1, program2) = coin_swap(&parent1.program, &parent2.program, rng);
    let (constants1, constants2) = coin_swap(&parent1.constants, &parent2.constants, rng);
    (Chromosome::new(program1, constants1), Chromosome::new(program2, constants2))
}

fn coin_swap<T: Clone, R: Rng>(a: &[T], b: &[T], rng: &mut R) -> (Vec<T>, Vec<T>) {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            if rng.gen_bool(0.5) {
                (x.clone(), y.clone())
            } else {
                (y.clone(), x.clone())
            }
        })
        .unzip()
}
