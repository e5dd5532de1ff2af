// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! MEP: Multi Expression Programming for symbolic regression.
//!
//! This crate evolves closed-form expressions that fit sample data:
//! - Linear genomes where every gene encodes a candidate expression
//! - Single-pass evaluation with self-repair of unsafe divisions
//! - Steady-state islands evolving in parallel with ring migration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     CLI (solve / operators / data)  │
//! ├─────────────────────────────────────┤
//! │     gp: engine, islands, genome     │
//! ├─────────────────────────────────────┤
//! │  operator registry │ training data  │
//! └─────────────────────────────────────┘
//! ```

pub mod data;
pub mod error;
pub mod gp;
pub mod operator;

pub use data::TrainingData;
pub use error::{ConfigError, DataError};
pub use gp::{Chromosome, ErrorMeasure, EvolutionConfig, Mep};
pub use operator::{Operator, OperatorSet};
