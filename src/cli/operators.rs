//! Operators command implementation.

use mep::operator::OperatorSet;

/// Print the operator registry with default enable flags.
pub(crate) fn execute(only_enabled: bool) {
    let set = OperatorSet::default();

    println!("{:>5}  {:<8} {:>5}  enabled", "code", "name", "arity");
    for (op, enabled) in set.all() {
        if only_enabled && !enabled {
            continue;
        }
        println!(
            "{:>5}  {:<8} {:>5}  {}",
            op.code(),
            op.name(),
            op.arity(),
            if enabled { "yes" } else { "no" }
        );
    }
}
