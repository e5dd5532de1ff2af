//! Selection for steady-state MEP.
//!
//! Parents are picked by tournament: sample `k` indices with replacement
//! and keep the one with the strictly lowest error. The first sampled
//! index wins ties.

// Selection uses intentional casts for statistics
#![allow(clippy::cast_precision_loss)]

use crate::error::ConfigError;
use crate::gp::genome::Chromosome;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for parent selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Number of individuals competing in each tournament.
    pub tournament_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { tournament_size: 2 }
    }
}

impl SelectionConfig {
    /// Check the tournament size.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TournamentSize`] for a size of zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tournament_size == 0 {
            return Err(ConfigError::TournamentSize);
        }
        Ok(())
    }
}

/// Tournament selection over `population`; returns an index.
///
/// # Panics
///
/// Panics on an empty population.
pub fn tournament_select<R: Rng>(population: &[Chromosome], k: usize, rng: &mut R) -> usize {
    assert!(!population.is_empty(), "cannot select from an empty population");

    let mut best_idx = rng.gen_range(0..population.len());
    for _ in 1..k.max(1) {
        let idx = rng.gen_range(0..population.len());
        if population[idx].fitness < population[best_idx].fitness {
            best_idx = idx;
        }
    }
    best_idx
}

/// Summary of a population's errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionStats {
    /// Mean error over individuals with a finite error.
    pub mean_fitness: f64,
    /// Lowest error.
    pub best_fitness: f64,
    /// Highest error.
    pub worst_fitness: f64,
    /// Standard deviation over individuals with a finite error.
    pub fitness_std: f64,
}

impl SelectionStats {
    /// Calculate statistics from error values (lower is better).
    #[must_use]
    pub fn from_fitness(fitness: &[f64]) -> Self {
        let best = fitness.iter().copied().fold(f64::INFINITY, f64::min);
        let worst = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let finite: Vec<f64> = fitness.iter().copied().filter(|f| f.is_finite()).collect();
        if finite.is_empty() {
            return Self {
                mean_fitness: f64::INFINITY,
                best_fitness: best,
                worst_fitness: worst,
                fitness_std: 0.0,
            };
        }

        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        let variance = finite.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / finite.len() as f64;

        Self {
            mean_fitness: mean,
            best_fitness: best,
            worst_fitness: worst,
            fitness_std: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::genome::Instruction;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn population(fitness: &[f64]) -> Vec<Chromosome> {
        fitness
            .iter()
            .map(|&f| {
                let mut c = Chromosome::new(vec![Instruction::variable(0)], Vec::new());
                c.fitness = f;
                c.best_index = Some(0);
                c
            })
            .collect()
    }

    #[test]
    fn test_tournament_selection_prefers_fitter() {
        let mut rng = SmallRng::seed_from_u64(42);
        let pop = population(&[0.9, 0.5, 0.1, 0.8, 0.2]);

        let mut counts = [0usize; 5];
        for _ in 0..1000 {
            counts[tournament_select(&pop, 3, &mut rng)] += 1;
        }

        // Index 2 has the lowest error
        let max_idx = counts.iter().enumerate().max_by_key(|(_, c)| *c).unwrap().0;
        assert_eq!(max_idx, 2);
    }

    #[test]
    fn test_tournament_ties_keep_first_seen() {
        let mut rng = SmallRng::seed_from_u64(1);
        let pop = population(&[1.0; 8]);
        let mut replay = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            let picked = tournament_select(&pop, 4, &mut rng);
            let first = replay.gen_range(0..8usize);
            for _ in 1..4 {
                let _ = replay.gen_range(0..8usize);
            }
            assert_eq!(picked, first);
        }
    }

    #[test]
    fn test_infinite_error_never_beats_finite() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut replay = SmallRng::seed_from_u64(5);
        let pop = population(&[f64::INFINITY, 3.0]);
        for _ in 0..200 {
            let idx = tournament_select(&pop, 3, &mut rng);
            let sampled: Vec<usize> = (0..3).map(|_| replay.gen_range(0..2)).collect();
            assert_eq!(idx, usize::from(sampled.contains(&1)));
        }
    }

    #[test]
    fn test_selection_stats() {
        let stats = SelectionStats::from_fitness(&[1.0, 2.0, 3.0, 4.0, 5.0, f64::INFINITY]);
        assert!((stats.mean_fitness - 3.0).abs() < 0.001);
        assert!((stats.best_fitness - 1.0).abs() < 0.001);
        assert!(stats.worst_fitness.is_infinite());
        assert!((stats.fitness_std - 2.0f64.sqrt()).abs() < 0.001);
    }

    #[test]
    fn test_validate() {
        assert!(SelectionConfig::default().validate().is_ok());
        assert!(SelectionConfig { tournament_size: 0 }.validate().is_err());
    }
}
