//! Point mutation for MEP chromosomes.
//!
//! Every opcode, every operand address and every random constant is
//! redrawn independently with the configured probability. Redrawn genes
//! come from the same distribution as random generation, so the first
//! position stays a terminal and operands keep pointing backwards.

use crate::error::ConfigError;
use crate::gp::genome::{Chromosome, GeneSampler, check_probability};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Per-gene, per-operand and per-constant mutation probability.
    pub probability: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self { probability: 0.1 }
    }
}

impl MutationConfig {
    /// Check the probability range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Probability`] outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("mutation probability", self.probability)
    }
}

/// Mutate a chromosome in place and return the number of changes drawn.
///
/// The recorded evaluation is cleared when anything changed.
pub fn mutate<R: Rng>(chromosome: &mut Chromosome, sampler: &GeneSampler, config: &MutationConfig, rng: &mut R) -> usize {
    let p = config.probability;
    let mut changes = 0;

    for (position, inst) in chromosome.program.iter_mut().enumerate() {
        if rng.gen_bool(p) {
            inst.opcode = if position == 0 {
                sampler.random_terminal(rng)
            } else {
                sampler.random_opcode(rng)
            };
            changes += 1;
        }
        if position == 0 {
            continue;
        }
        for operand in &mut inst.operands {
            if rng.gen_bool(p) {
                *operand = sampler.random_operand(position, rng);
                changes += 1;
            }
        }
    }

    let fixed = sampler.num_fixed_constants();
    for constant in chromosome.constants.iter_mut().skip(fixed) {
        if rng.gen_bool(p) {
            *constant = sampler.random_constant(rng);
            changes += 1;
        }
    }

    if changes > 0 {
        chromosome.clear_evaluation();
    }
    changes
}
