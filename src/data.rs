//! Training data for symbolic regression.
//!
//! A dataset is a row-major matrix of input values, one target value per
//! row and one label per input column. It is immutable once built.

use crate::error::DataError;
use rand::Rng;
use std::f64::consts::{E, PI};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Names of the synthetic datasets known to [`dataset_by_name`].
pub const DATASET_NAMES: [&str; 5] = ["quarticpoly", "pi", "pythagorean", "rastrigin", "ackley"];

/// Input rows, aligned target values and column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    rows: Vec<Vec<f64>>,
    target: Vec<f64>,
    labels: Vec<String>,
}

impl TrainingData {
    /// Build a dataset, checking its shape.
    ///
    /// Empty `labels` are replaced by `x0, x1, ...`.
    ///
    /// # Errors
    ///
    /// Returns an error when there are no rows or columns, when rows have
    /// different widths, or when target or labels are not aligned.
    pub fn new(rows: Vec<Vec<f64>>, target: Vec<f64>, labels: Vec<String>) -> Result<Self, DataError> {
        let first = rows.first().ok_or(DataError::Empty)?;
        let columns = first.len();
        if columns == 0 {
            return Err(DataError::NoColumns);
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns) {
            return Err(DataError::Ragged {
                row,
                expected: columns,
                found: r.len(),
            });
        }
        if target.len() != rows.len() {
            return Err(DataError::TargetLength {
                rows: rows.len(),
                target: target.len(),
            });
        }
        let labels = if labels.is_empty() {
            default_labels(columns)
        } else if labels.len() == columns {
            labels
        } else {
            return Err(DataError::Labels {
                columns,
                labels: labels.len(),
            });
        };

        Ok(Self {
            rows,
            target,
            labels,
        })
    }

    /// Parse delimited text: every non-blank record holds the inputs
    /// followed by the target. `separator` of `None` splits on runs of
    /// spaces and tabs.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or CSV failure, a non-ASCII separator,
    /// unparsable fields or a bad shape.
    pub fn from_delimited<R: Read>(
        reader: R,
        separator: Option<char>,
        has_header: bool,
    ) -> Result<Self, DataError> {
        let delimiter = match separator {
            Some(sep) => u8::try_from(sep)
                .ok()
                .filter(u8::is_ascii)
                .ok_or(DataError::Separator(sep))?,
            None => b' ',
        };
        let mut records = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        let mut target = Vec::new();
        let mut labels = Vec::new();
        let mut header_pending = has_header;
        let mut record = csv::StringRecord::new();

        while records.read_record(&mut record)? {
            let fields: Vec<&str> = if separator.is_some() {
                record.iter().collect()
            } else {
                record.iter().flat_map(str::split_whitespace).collect()
            };
            if fields.iter().all(|f| f.is_empty()) {
                continue;
            }

            if header_pending {
                header_pending = false;
                labels = fields
                    .iter()
                    .take(fields.len().saturating_sub(1))
                    .map(|s| (*s).to_string())
                    .collect();
                continue;
            }

            let line = record.position().map_or(0, csv::Position::line);
            let mut values = fields
                .iter()
                .map(|field| {
                    field.parse::<f64>().map_err(|_| DataError::Parse {
                        line,
                        field: (*field).to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            let last = values.pop().ok_or(DataError::NoColumns)?;
            rows.push(values);
            target.push(last);
        }

        Self::new(rows, target, labels)
    }

    /// Read a delimited file, see [`TrainingData::from_delimited`].
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened or parsed.
    pub fn read_file(path: &Path, separator: Option<char>, has_header: bool) -> Result<Self, DataError> {
        let file = File::open(path)?;
        Self::from_delimited(file, separator, has_header)
    }

    /// Number of training rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of input columns (variables).
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.labels.len()
    }

    /// Input rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Target values, one per row.
    #[must_use]
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Column labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Value of `variable` in `row`.
    #[must_use]
    pub fn value(&self, row: usize, variable: usize) -> f64 {
        self.rows[row][variable]
    }

    /// Copy one input column into `out`.
    pub fn copy_column(&self, variable: usize, out: &mut [f64]) {
        for (slot, row) in out.iter_mut().zip(&self.rows) {
            *slot = row[variable];
        }
    }

    /// Render as delimited text with a header line.
    #[must_use]
    pub fn to_delimited(&self, separator: char) -> String {
        let sep = separator.to_string();
        let mut out = self.labels.join(&sep);
        out.push_str(&sep);
        out.push_str("target\n");
        for (row, t) in self.rows.iter().zip(&self.target) {
            for v in row {
                out.push_str(&format!("{v}{sep}"));
            }
            out.push_str(&format!("{t}\n"));
        }
        out
    }
}

fn default_labels(columns: usize) -> Vec<String> {
    (0..columns).map(|i| format!("x{i}")).collect()
}

fn build<R, F>(rng: &mut R, rows: usize, vars: usize, range: (f64, f64), f: F) -> TrainingData
where
    R: Rng,
    F: Fn(&[f64]) -> f64,
{
    let (lo, hi) = range;
    let inputs: Vec<Vec<f64>> = (0..rows)
        .map(|_| (0..vars).map(|_| rng.gen_range(lo..=hi)).collect())
        .collect();
    let target = inputs.iter().map(|row| f(row)).collect();
    TrainingData {
        rows: inputs,
        target,
        labels: default_labels(vars),
    }
}

/// `x^4 + x^3 + x^2 + x` over `[-1, 1]`.
pub fn quartic_poly<R: Rng>(rng: &mut R, rows: usize) -> TrainingData {
    let mut data = build(rng, rows.max(1), 1, (-1.0, 1.0), |x| {
        let x = x[0];
        x.powi(4) + x.powi(3) + x.powi(2) + x
    });
    data.labels = vec!["x".to_string()];
    data
}

/// Constant target `pi` over inputs drawn from `[1, 100]`.
pub fn pi<R: Rng>(rng: &mut R, rows: usize, vars: usize) -> TrainingData {
    build(rng, rows.max(1), vars.max(1), (1.0, 100.0), |_| PI)
}

/// `sqrt(x0^2 + x1^2)` over `[0, 10]`.
pub fn pythagorean<R: Rng>(rng: &mut R, rows: usize) -> TrainingData {
    build(rng, rows.max(1), 2, (0.0, 10.0), |x| x[0].hypot(x[1]))
}

/// Rastrigin function over `[-5.12, 5.12]`.
pub fn rastrigin<R: Rng>(rng: &mut R, rows: usize, vars: usize) -> TrainingData {
    let vars = vars.max(1);
    #[allow(clippy::cast_precision_loss)]
    let offset = 10.0 * vars as f64;
    build(rng, rows.max(1), vars, (-5.12, 5.12), |x| {
        offset
            + x.iter()
                .map(|v| v * v - 10.0 * (2.0 * PI * v).cos())
                .sum::<f64>()
    })
}

/// Ackley function over `[-32, 32]`.
pub fn ackley<R: Rng>(rng: &mut R, rows: usize, vars: usize) -> TrainingData {
    let vars = vars.max(1);
    #[allow(clippy::cast_precision_loss)]
    let n = vars as f64;
    build(rng, rows.max(1), vars, (-32.0, 32.0), |x| {
        let squares = x.iter().map(|v| v * v).sum::<f64>();
        let cosines = x.iter().map(|v| (2.0 * PI * v).cos()).sum::<f64>();
        -20.0 * (-0.2 * (squares / n).sqrt()).exp() - (cosines / n).exp() + 20.0 + E
    })
}

/// Generate a synthetic dataset by name.
///
/// # Errors
///
/// Returns [`DataError::UnknownDataset`] for names outside [`DATASET_NAMES`].
pub fn dataset_by_name<R: Rng>(name: &str, rng: &mut R, rows: usize) -> Result<TrainingData, DataError> {
    match name {
        "quarticpoly" => Ok(quartic_poly(rng, rows)),
        "pi" => Ok(pi(rng, rows, 1)),
        "pythagorean" => Ok(pythagorean(rng, rows)),
        "rastrigin" => Ok(rastrigin(rng, rows, 2)),
        "ackley" => Ok(ackley(rng, rows, 2)),
        other => Err(DataError::UnknownDataset(other.to_string())),
    }
}
