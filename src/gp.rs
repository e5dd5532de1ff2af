//! Multi Expression Programming.
//!
//! A chromosome is a short linear program in which every gene is itself an
//! expression: a variable, a constant, or an operator applied to genes at
//! earlier positions. One evaluation pass scores all of them, and the best
//! position stands for the whole chromosome.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Mep: islands + ring migration     │
//! ├─────────────────────────────────────┤
//! │  Island: steady-state generation    │
//! ├─────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation   │
//! ├─────────────────────────────────────┤
//! │  Evaluator (self-repair) │ Fitness  │
//! ├─────────────────────────────────────┤
//! │  Chromosome │ Decoder → infix text  │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mep::data;
//! use mep::gp::{ErrorMeasure, EvolutionConfig, Mep};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let training = data::quartic_poly(&mut SmallRng::seed_from_u64(1), 30);
//! let mut mep = Mep::new(EvolutionConfig::default(), training, ErrorMeasure::TotalError)?;
//! let outcome = mep.solve(1000, 0.1);
//! println!("{} after {} generations", mep.best_expression(), outcome.generations);
//! # Ok::<(), mep::error::ConfigError>(())
//! ```

mod crossover;
mod decoder;
mod evaluator;
mod evolution;
mod fitness;
mod genome;
mod island;
mod mutation;
mod persistence;
mod selection;

pub use crossover::{CrossoverConfig, CrossoverKind, crossover, one_cut_point, uniform};
pub use decoder::{MAX_EXPRESSION_LEN, decode, decode_best};
pub use evaluator::{Evaluation, Evaluator};
pub use evolution::{EvolutionConfig, GenerationReport, MIN_CODE_LENGTH, Mep, RunState, SolveOutcome};
pub use fitness::{ErrorMeasure, FitnessFunction};
pub use genome::{Chromosome, ConstantsConfig, GeneConfig, GeneSampler, Instruction, Opcode};
pub use island::{GenerationContext, Island};
pub use mutation::{MutationConfig, mutate};
pub use persistence::{RunReport, load_config, load_report, save_config, save_report};
pub use selection::{SelectionConfig, SelectionStats, tournament_select};
