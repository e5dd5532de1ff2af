//! Single-pass interpreter for MEP chromosomes.
//!
//! Genes are evaluated front to back over every training row at once. The
//! output of each position is cached in a results matrix so operator genes
//! read their operands instead of recomputing them, and so that a repaired
//! gene only costs one more row.
//!
//! # Self-repair
//!
//! A division-class gene whose divisor row contains any value with
//! magnitude below [`DIVISION_EPSILON`] is rewritten in place to a random
//! variable reference. The rewrite is permanent: it is part of the
//! chromosome that the caller keeps.

use crate::data::TrainingData;
use crate::gp::fitness::FitnessFunction;
use crate::gp::genome::{Chromosome, Opcode};
use crate::operator::{DIVISION_EPSILON, MAX_ARITY, Operator};
use rand::Rng;

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Lowest error over all positions; never NaN.
    pub fitness: f64,
    /// Position with the lowest error.
    pub best_index: usize,
    /// Positions rewritten to a variable by self-repair, ascending.
    pub repaired: Vec<usize>,
}

/// Scratch results matrix, `code_length` rows by `num_rows` columns.
///
/// One evaluator belongs to one island; it is never shared between
/// chromosomes evaluated concurrently.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    num_rows: usize,
    code_length: usize,
    matrix: Vec<f64>,
}

impl Evaluator {
    /// Allocate a matrix for the given shape.
    #[must_use]
    pub fn new(code_length: usize, num_rows: usize) -> Self {
        Self {
            num_rows,
            code_length,
            matrix: vec![0.0; code_length * num_rows],
        }
    }

    /// Output row of `position` from the last evaluation.
    #[must_use]
    pub fn row(&self, position: usize) -> &[f64] {
        let start = position * self.num_rows;
        &self.matrix[start..start + self.num_rows]
    }

    fn reshape(&mut self, code_length: usize, num_rows: usize) {
        if self.code_length != code_length || self.num_rows != num_rows {
            self.code_length = code_length;
            self.num_rows = num_rows;
            self.matrix.resize(code_length * num_rows, 0.0);
        }
    }

    /// Evaluate `chromosome` on `data`, repairing division genes as needed.
    ///
    /// The fitness and best index are written back to the chromosome and
    /// returned together with the list of repaired positions. Non-finite
    /// scores are treated as `+inf`.
    ///
    /// # Panics
    ///
    /// Panics on an empty program, an operator at position 0 or an operand
    /// that does not point before its own position. Generation and
    /// mutation never produce these.
    pub fn evaluate<R: Rng>(
        &mut self,
        chromosome: &mut Chromosome,
        data: &TrainingData,
        fitness: &dyn FitnessFunction,
        rng: &mut R,
    ) -> Evaluation {
        let code_length = chromosome.code_length();
        assert!(code_length > 0, "cannot evaluate an empty program");
        let n = data.num_rows();
        self.reshape(code_length, n);

        let mut best_fitness = f64::INFINITY;
        let mut best_index = 0;
        let mut repaired = Vec::new();

        for position in 0..code_length {
            let (done, rest) = self.matrix.split_at_mut(position * n);
            let out = &mut rest[..n];
            let inst = chromosome.program[position];

            match inst.opcode {
                Opcode::Variable(v) => data.copy_column(v, out),
                Opcode::Constant(c) => out.fill(chromosome.constants[c]),
                Opcode::Operator(op) => {
                    assert!(position > 0, "operator {op} at position 0");
                    for &addr in inst.active_operands() {
                        assert!(addr < position, "operand {addr} does not precede position {position}");
                    }

                    let near_zero_divisor = op.divisor_operand().is_some_and(|slot| {
                        let start = inst.operands[slot] * n;
                        done[start..start + n].iter().any(|v| v.abs() < DIVISION_EPSILON)
                    });

                    if near_zero_divisor {
                        let v = rng.gen_range(0..data.num_variables());
                        chromosome.program[position].opcode = Opcode::Variable(v);
                        data.copy_column(v, out);
                        repaired.push(position);
                    } else {
                        apply_operator(op, &inst.operands, done, n, out);
                    }
                }
            }

            let mut score = fitness.score(out, data.target());
            if !score.is_finite() {
                score = f64::INFINITY;
            }
            if position == 0 || score < best_fitness {
                best_fitness = score;
                best_index = position;
            }
        }

        chromosome.fitness = best_fitness;
        chromosome.best_index = Some(best_index);

        Evaluation {
            fitness: best_fitness,
            best_index,
            repaired,
        }
    }
}

/// Elementwise application over already computed rows.
#[allow(clippy::needless_range_loop)]
fn apply_operator(op: Operator, operands: &[usize; MAX_ARITY], done: &[f64], n: usize, out: &mut [f64]) {
    let arg = |slot: usize| {
        let start = operands[slot] * n;
        &done[start..start + n]
    };
    match op.arity() {
        1 => {
            for (o, &a) in out.iter_mut().zip(arg(0)) {
                *o = op.apply([a, 0.0, 0.0, 0.0]);
            }
        }
        2 => {
            for ((o, &a), &b) in out.iter_mut().zip(arg(0)).zip(arg(1)) {
                *o = op.apply([a, b, 0.0, 0.0]);
            }
        }
        3 => {
            let (a, b, c) = (arg(0), arg(1), arg(2));
            for k in 0..n {
                out[k] = op.apply([a[k], b[k], c[k], 0.0]);
            }
        }
        _ => {
            let (a, b, c, d) = (arg(0), arg(1), arg(2), arg(3));
            for k in 0..n {
                out[k] = op.apply([a[k], b[k], c[k], d[k]]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::fitness::ErrorMeasure;
    use crate::gp::genome::Instruction;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn data() -> TrainingData {
        TrainingData::new(
            vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]],
            vec![2.0, 4.0, 6.0],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_best_index_is_not_last_position() {
        let mut rng = SmallRng::seed_from_u64(1);
        let data = data();
        // 0: x0, 1: x0 + x0 (exact), 2: x0 * x0, 3: c0
        let mut c = Chromosome::new(
            vec![
                Instruction::variable(0),
                Instruction::operator(Operator::Add, &[0, 0], 1),
                Instruction::operator(Operator::Mul, &[0, 0], 2),
                Instruction::constant(0),
            ],
            vec![10.0],
        );
        let mut eval = Evaluator::new(4, 3);
        let result = eval.evaluate(&mut c, &data, &ErrorMeasure::TotalError, &mut rng);

        assert_eq!(result.best_index, 1);
        assert!(result.fitness.abs() < 1e-12);
        assert!(result.repaired.is_empty());
        assert_eq!(c.best_index, Some(1));
        assert_eq!(eval.row(2), &[1.0, 4.0, 9.0]);
        assert_eq!(eval.row(3), &[10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_division_by_zero_column_is_repaired() {
        let mut rng = SmallRng::seed_from_u64(2);
        let data = data();
        let mut c = Chromosome::new(
            vec![
                Instruction::variable(0),
                Instruction::variable(1),
                Instruction::operator(Operator::Div, &[0, 1], 2),
                Instruction::operator(Operator::Inv, &[1], 3),
                Instruction::operator(Operator::Div, &[1, 0], 4),
            ],
            Vec::new(),
        );
        let mut eval = Evaluator::new(5, 3);
        let result = eval.evaluate(&mut c, &data, &ErrorMeasure::TotalError, &mut rng);

        assert_eq!(result.repaired, vec![2, 3]);
        assert!(matches!(c.program[2].opcode, Opcode::Variable(_)));
        assert!(matches!(c.program[3].opcode, Opcode::Variable(_)));
        // 0 / x0 is well defined and stays a division.
        assert_eq!(c.program[4].opcode, Opcode::Operator(Operator::Div));
        for position in 0..5 {
            assert!(eval.row(position).iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_nan_fitness_never_wins() {
        let mut rng = SmallRng::seed_from_u64(3);
        let data = TrainingData::new(vec![vec![-1.0], vec![-4.0]], vec![100.0, 100.0], Vec::new()).unwrap();
        // log of a negative input is NaN; it must not displace the finite row.
        let mut c = Chromosome::new(
            vec![Instruction::variable(0), Instruction::operator(Operator::Log, &[0], 1)],
            Vec::new(),
        );
        let mut eval = Evaluator::new(2, 2);
        let result = eval.evaluate(&mut c, &data, &ErrorMeasure::TotalError, &mut rng);
        assert_eq!(result.best_index, 0);
        assert!((result.fitness - 205.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_non_finite_gives_infinite_fitness() {
        let mut rng = SmallRng::seed_from_u64(4);
        let data = TrainingData::new(vec![vec![-1.0]], vec![0.0], Vec::new()).unwrap();
        let nan = |_: &[f64], _: &[f64]| f64::NAN;
        let mut c = Chromosome::new(vec![Instruction::variable(0)], Vec::new());
        let result = Evaluator::default().evaluate(&mut c, &data, &nan, &mut rng);
        assert!(result.fitness.is_infinite());
        assert_eq!(result.best_index, 0);
    }

    #[test]
    fn test_conditionals() {
        let mut rng = SmallRng::seed_from_u64(5);
        let data = TrainingData::new(vec![vec![-2.0], vec![3.0]], vec![0.0, 0.0], Vec::new()).unwrap();
        let mut c = Chromosome::new(
            vec![
                Instruction::variable(0),
                Instruction::constant(0),
                Instruction::operator(Operator::IfLessThanZero, &[0, 1, 0], 2),
                Instruction::operator(Operator::IfLess, &[0, 1, 1, 0], 3),
            ],
            vec![7.0],
        );
        let mut eval = Evaluator::new(4, 2);
        let _ = eval.evaluate(&mut c, &data, &ErrorMeasure::TotalError, &mut rng);
        assert_eq!(eval.row(2), &[7.0, 3.0]);
        assert_eq!(eval.row(3), &[7.0, 7.0]);
    }

    #[test]
    #[should_panic(expected = "does not precede")]
    fn test_forward_reference_panics() {
        let mut rng = SmallRng::seed_from_u64(6);
        let data = data();
        let mut bad = Instruction::operator(Operator::Add, &[0, 0], 1);
        bad.operands[1] = 1;
        let mut c = Chromosome::new(vec![Instruction::variable(0), bad], Vec::new());
        let _ = Evaluator::default().evaluate(&mut c, &data, &ErrorMeasure::TotalError, &mut rng);
    }
}
