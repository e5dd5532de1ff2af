//! Data command implementation.

use super::CliError;
use mep::data::{DATASET_NAMES, dataset_by_name};
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Print a synthetic dataset as delimited text.
pub(crate) fn execute(dataset: &str, rows: usize, seed: u64, separator: char) -> Result<(), CliError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let data = dataset_by_name(dataset, &mut rng, rows)
        .map_err(|e| CliError::new(format!("{e} (known: {})", DATASET_NAMES.join(", "))))?;
    print!("{}", data.to_delimited(separator));
    Ok(())
}
