//! Error types for configuration and training data.
//!
//! Configuration errors are raised before any evolution starts. Domain
//! errors during evaluation (division by a near-zero row) are never
//! surfaced here: the evaluator repairs the offending gene instead.

use thiserror::Error;

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Sub-population size must be a positive even number.
    #[error("invalid sub-population size {0}: must be a positive even number")]
    PopulationSize(usize),
    /// At least one island is required.
    #[error("invalid island count: at least one island is required")]
    NoIslands,
    /// Code length below the minimum of four genes.
    #[error("invalid code length {0}: must be at least 4")]
    CodeLength(usize),
    /// A probability outside `[0, 1]`.
    #[error("invalid {name} {value}: must be within [0, 1]")]
    Probability {
        /// Name of the offending parameter.
        name: &'static str,
        /// The value supplied.
        value: f64,
    },
    /// Variable, operator and constant probabilities must sum to one.
    #[error("gene probabilities sum to {0}, expected 1.0")]
    ProbabilitySum(f64),
    /// Lower constant bound above the upper bound.
    #[error("invalid constant range [{min}, {max}]")]
    ConstantRange {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Tournament size of zero.
    #[error("tournament size must be at least 1")]
    TournamentSize,
    /// Unrecognised crossover name.
    #[error("unknown crossover type: {0}")]
    UnknownCrossover(String),
    /// Unrecognised operator name.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    /// Unrecognised error measure name.
    #[error("unknown error measure: {0}")]
    UnknownErrorMeasure(String),
    /// Operators may be drawn but none is enabled.
    #[error("operator probability is {0} but no operator is enabled")]
    NoOperators(f64),
}

/// Invalid or unreadable training data.
#[derive(Debug, Error)]
pub enum DataError {
    /// No rows at all.
    #[error("training data has no rows")]
    Empty,
    /// Rows without any input column.
    #[error("training data has no input columns")]
    NoColumns,
    /// A row with a different width than the first one.
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        found: usize,
    },
    /// Target vector not aligned with the input rows.
    #[error("target has {target} values for {rows} rows")]
    TargetLength {
        /// Number of input rows.
        rows: usize,
        /// Number of target values.
        target: usize,
    },
    /// Label count differs from the column count.
    #[error("{labels} labels for {columns} columns")]
    Labels {
        /// Number of input columns.
        columns: usize,
        /// Number of labels.
        labels: usize,
    },
    /// A field that is not a number.
    #[error("line {line}: cannot parse {field:?} as a number")]
    Parse {
        /// One-based line number.
        line: u64,
        /// The raw field.
        field: String,
    },
    /// Unknown synthetic dataset name.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),
    /// Field separator the CSV reader cannot use.
    #[error("separator {0:?} is not a single ASCII character")]
    Separator(char),
    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
