//! Genome representation for Multi Expression Programming.
//!
//! A chromosome is a fixed-length program of instructions plus a vector of
//! constants. Every instruction is either a terminal (a variable or a
//! constant reference) or an operator whose operands point strictly
//! backwards in the program. Because of that, the program is a
//! topologically ordered DAG and each position is itself a complete
//! expression.

use crate::error::ConfigError;
use crate::operator::{MAX_ARITY, Operator, OperatorSet};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What an instruction computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// Training column at this index.
    Variable(usize),
    /// Chromosome constant at this index.
    Constant(usize),
    /// Operator applied to earlier positions.
    Operator(Operator),
}

impl Opcode {
    /// Terminals have no operands.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Operator(_))
    }

    /// Number of operands read by this opcode.
    #[must_use]
    pub fn operand_count(self) -> usize {
        match self {
            Self::Operator(op) => op.arity(),
            Self::Variable(_) | Self::Constant(_) => 0,
        }
    }

    /// Flat integer encoding: variables are `0..num_variables`, constants
    /// follow them, operators use their negative registry codes.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn code(self, num_variables: usize) -> i32 {
        match self {
            Self::Variable(v) => v as i32,
            Self::Constant(c) => (num_variables + c) as i32,
            Self::Operator(op) => op.code(),
        }
    }

    /// Decode the flat integer encoding.
    #[must_use]
    pub fn from_code(code: i32, num_variables: usize) -> Option<Self> {
        if code < 0 {
            return Operator::from_code(code).map(Self::Operator);
        }
        let code = usize::try_from(code).ok()?;
        if code < num_variables {
            Some(Self::Variable(code))
        } else {
            Some(Self::Constant(code - num_variables))
        }
    }
}

/// One gene: an opcode and up to four back-references.
///
/// Operand addresses are kept even when the opcode is a terminal, so a
/// later opcode mutation back to an operator reuses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// What this gene computes.
    pub opcode: Opcode,
    /// Back-references into earlier positions.
    pub operands: [usize; MAX_ARITY],
}

impl Instruction {
    /// A variable reference.
    #[must_use]
    pub fn variable(index: usize) -> Self {
        Self {
            opcode: Opcode::Variable(index),
            operands: [0; MAX_ARITY],
        }
    }

    /// A constant reference.
    #[must_use]
    pub fn constant(index: usize) -> Self {
        Self {
            opcode: Opcode::Constant(index),
            operands: [0; MAX_ARITY],
        }
    }

    /// An operator gene placed at `position`.
    ///
    /// # Panics
    ///
    /// Panics if fewer operands than the arity are given or if any operand
    /// does not point strictly before `position`.
    #[must_use]
    pub fn operator(op: Operator, operands: &[usize], position: usize) -> Self {
        assert!(
            operands.len() >= op.arity(),
            "{op} needs {} operands, got {}",
            op.arity(),
            operands.len()
        );
        let mut addrs = [0; MAX_ARITY];
        for (slot, &addr) in addrs.iter_mut().zip(operands) {
            assert!(addr < position, "operand {addr} does not precede position {position}");
            *slot = addr;
        }
        Self {
            opcode: Opcode::Operator(op),
            operands: addrs,
        }
    }

    /// Operands actually read by the opcode.
    #[must_use]
    pub fn active_operands(&self) -> &[usize] {
        &self.operands[..self.opcode.operand_count()]
    }

    /// Whether this gene may sit at `position` of a program.
    #[must_use]
    pub fn is_valid_at(&self, position: usize, num_variables: usize, num_constants: usize) -> bool {
        match self.opcode {
            Opcode::Variable(v) => v < num_variables,
            Opcode::Constant(c) => c < num_constants,
            Opcode::Operator(_) => position > 0 && self.active_operands().iter().all(|&a| a < position),
        }
    }
}

/// Gene category weights used by random generation and mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneConfig {
    /// Probability of drawing a variable reference.
    pub variables_probability: f64,
    /// Probability of drawing an operator.
    pub operators_probability: f64,
    /// Probability of drawing a constant reference.
    pub constants_probability: f64,
}

impl Default for GeneConfig {
    fn default() -> Self {
        Self {
            variables_probability: 0.4,
            operators_probability: 0.5,
            constants_probability: 0.1,
        }
    }
}

impl GeneConfig {
    /// Check each probability and their sum.
    ///
    /// # Errors
    ///
    /// Returns an error for values outside `[0, 1]` or a sum other than 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("variables probability", self.variables_probability)?;
        check_probability("operators probability", self.operators_probability)?;
        check_probability("constants probability", self.constants_probability)?;
        let sum = self.variables_probability + self.operators_probability + self.constants_probability;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::ProbabilitySum(sum));
        }
        Ok(())
    }
}

/// Check that `value` lies in `[0, 1]`.
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { name, value })
    }
}

/// The constant vector: a fixed prefix and a randomly drawn suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantsConfig {
    /// Constants shared verbatim by every chromosome.
    pub fixed: Vec<f64>,
    /// Number of per-chromosome random constants.
    pub num_random: usize,
    /// Lower bound for random constants.
    pub min: f64,
    /// Upper bound for random constants.
    pub max: f64,
}

impl Default for ConstantsConfig {
    fn default() -> Self {
        Self {
            fixed: Vec::new(),
            num_random: 3,
            min: -1.0,
            max: 1.0,
        }
    }
}

impl ConstantsConfig {
    /// Total length of a chromosome's constant vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixed.len() + self.num_random
    }

    /// True when chromosomes carry no constants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the random range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConstantRange`] when `min > max` or a bound is
    /// not finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_random > 0 && !(self.min.is_finite() && self.max.is_finite() && self.min <= self.max) {
            return Err(ConfigError::ConstantRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Draws genes from the configured distribution.
///
/// Categories that cannot be drawn (no constants, no enabled operator)
/// have their weight folded into the remaining ones.
#[derive(Debug, Clone)]
pub struct GeneSampler {
    num_variables: usize,
    constants: ConstantsConfig,
    operators: OperatorSet,
    variables_weight: f64,
    operators_weight: f64,
    constants_weight: f64,
}

impl GeneSampler {
    /// Build a sampler for data with `num_variables` input columns.
    ///
    /// # Panics
    ///
    /// Panics if `num_variables` is zero; validated training data always
    /// has at least one column.
    #[must_use]
    pub fn new(genes: &GeneConfig, constants: &ConstantsConfig, operators: &OperatorSet, num_variables: usize) -> Self {
        assert!(num_variables > 0, "training data must have at least one variable");

        let mut constants_weight = genes.constants_probability;
        if constants.is_empty() && constants_weight > 0.0 {
            log::warn!("constants probability {constants_weight} ignored: no constants configured");
            constants_weight = 0.0;
        }
        let mut operators_weight = genes.operators_probability;
        if operators.is_empty() && operators_weight > 0.0 {
            log::warn!("operators probability {operators_weight} ignored: no operator enabled");
            operators_weight = 0.0;
        }

        Self {
            num_variables,
            constants: constants.clone(),
            operators: operators.clone(),
            variables_weight: genes.variables_probability,
            operators_weight,
            constants_weight,
        }
    }

    /// Number of input variables.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Length of the constant vector.
    #[must_use]
    pub fn num_constants(&self) -> usize {
        self.constants.len()
    }

    /// Operators that may be drawn.
    #[must_use]
    pub fn operators(&self) -> &OperatorSet {
        &self.operators
    }

    /// Draw a variable uniformly.
    pub fn random_variable<R: Rng>(&self, rng: &mut R) -> Opcode {
        Opcode::Variable(rng.gen_range(0..self.num_variables))
    }

    fn random_constant_ref<R: Rng>(&self, rng: &mut R) -> Opcode {
        Opcode::Constant(rng.gen_range(0..self.num_constants()))
    }

    /// Draw a terminal: variable or constant reference.
    pub fn random_terminal<R: Rng>(&self, rng: &mut R) -> Opcode {
        let total = self.variables_weight + self.constants_weight;
        if self.constants_weight <= 0.0 {
            return self.random_variable(rng);
        }
        if total <= 0.0 || rng.gen_range(0.0..total) >= self.variables_weight {
            self.random_constant_ref(rng)
        } else {
            self.random_variable(rng)
        }
    }

    /// Draw an opcode for a position past the first one.
    pub fn random_opcode<R: Rng>(&self, rng: &mut R) -> Opcode {
        let total = self.operators_weight + self.variables_weight + self.constants_weight;
        if total <= 0.0 {
            return self.random_variable(rng);
        }
        let p = rng.gen_range(0.0..total);
        if p < self.operators_weight {
            if let Some(op) = self.operators.choose(rng) {
                return Opcode::Operator(op);
            }
        }
        if p < self.operators_weight + self.variables_weight || self.constants_weight <= 0.0 {
            self.random_variable(rng)
        } else {
            self.random_constant_ref(rng)
        }
    }

    /// Draw an operand address for `position`, uniformly in `[0, position)`.
    ///
    /// # Panics
    ///
    /// Panics at position zero, which has no valid operand.
    pub fn random_operand<R: Rng>(&self, position: usize, rng: &mut R) -> usize {
        assert!(position > 0, "position 0 cannot hold operands");
        rng.gen_range(0..position)
    }

    /// Draw one random constant value.
    pub fn random_constant<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.constants.min..=self.constants.max)
    }

    /// Fixed constants followed by freshly drawn random ones.
    pub fn random_constants<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let mut out = self.constants.fixed.clone();
        out.extend((0..self.constants.num_random).map(|_| self.random_constant(rng)));
        out
    }

    /// Number of leading constants that never change.
    #[must_use]
    pub fn num_fixed_constants(&self) -> usize {
        self.constants.fixed.len()
    }

    /// Draw the gene at `position`.
    pub fn random_instruction<R: Rng>(&self, position: usize, rng: &mut R) -> Instruction {
        if position == 0 {
            return Instruction {
                opcode: self.random_terminal(rng),
                operands: [0; MAX_ARITY],
            };
        }
        let opcode = self.random_opcode(rng);
        let mut operands = [0; MAX_ARITY];
        for slot in &mut operands {
            *slot = self.random_operand(position, rng);
        }
        Instruction { opcode, operands }
    }
}

mod fitness_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_some(value)
        } else {
            s.serialize_none()
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

/// An individual: program, constants and its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromosome {
    /// Genes, evaluated front to back.
    pub program: Vec<Instruction>,
    /// Constant values referenced by constant genes.
    pub constants: Vec<f64>,
    /// Error of the best position; lower is better, `+inf` when unset.
    #[serde(with = "fitness_serde")]
    pub fitness: f64,
    /// Position whose expression gave `fitness`.
    pub best_index: Option<usize>,
}

impl Chromosome {
    /// Wrap a program and constants without an evaluation.
    #[must_use]
    pub fn new(program: Vec<Instruction>, constants: Vec<f64>) -> Self {
        Self {
            program,
            constants,
            fitness: f64::INFINITY,
            best_index: None,
        }
    }

    /// Random chromosome of `code_length` genes. Constants are drawn first.
    pub fn random<R: Rng>(sampler: &GeneSampler, code_length: usize, rng: &mut R) -> Self {
        let constants = sampler.random_constants(rng);
        let program = (0..code_length).map(|i| sampler.random_instruction(i, rng)).collect();
        Self::new(program, constants)
    }

    /// Number of genes.
    #[must_use]
    pub fn code_length(&self) -> usize {
        self.program.len()
    }

    /// Whether an evaluation has been recorded.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.best_index.is_some()
    }

    /// Forget the recorded evaluation.
    pub fn clear_evaluation(&mut self) {
        self.fitness = f64::INFINITY;
        self.best_index = None;
    }

    /// Overwrite this chromosome with `other` without reallocating.
    pub fn copy_from(&mut self, other: &Self) {
        self.program.clone_from(&other.program);
        self.constants.clone_from(&other.constants);
        self.fitness = other.fitness;
        self.best_index = other.best_index;
    }

    /// Check every gene against the back-reference and range rules.
    #[must_use]
    pub fn is_well_formed(&self, num_variables: usize) -> bool {
        let num_constants = self.constants.len();
        self.program
            .first()
            .is_some_and(|first| first.opcode.is_terminal())
            && self
                .program
                .iter()
                .enumerate()
                .all(|(i, inst)| inst.is_valid_at(i, num_variables, num_constants))
    }

    /// Operators used by the genes.
    pub fn operators(&self) -> impl Iterator<Item = Operator> + '_ {
        self.program.iter().filter_map(|inst| match inst.opcode {
            Opcode::Operator(op) => Some(op),
            Opcode::Variable(_) | Opcode::Constant(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn sampler(num_variables: usize) -> GeneSampler {
        GeneSampler::new(
            &GeneConfig::default(),
            &ConstantsConfig::default(),
            &OperatorSet::default(),
            num_variables,
        )
    }

    #[test]
    fn test_opcode_codes() {
        assert_eq!(Opcode::Variable(1).code(3), 1);
        assert_eq!(Opcode::Constant(1).code(3), 4);
        assert_eq!(Opcode::Operator(Operator::Mul).code(3), -3);
        for code in -4..6 {
            let op = Opcode::from_code(code, 3).unwrap();
            assert_eq!(op.code(3), code);
        }
        assert!(Opcode::Operator(Operator::Add).operand_count() == 2);
        assert!(Opcode::Constant(0).is_terminal());
    }

    #[test]
    fn test_random_chromosome_well_formed() {
        let mut rng = SmallRng::seed_from_u64(12345);
        let sampler = sampler(2);
        for _ in 0..50 {
            let c = Chromosome::random(&sampler, 20, &mut rng);
            assert_eq!(c.code_length(), 20);
            assert_eq!(c.constants.len(), 3);
            assert!(c.program[0].opcode.is_terminal());
            assert!(c.is_well_formed(2));
            assert!(!c.is_evaluated());
        }
    }

    #[test]
    fn test_constants_fixed_prefix() {
        let mut rng = SmallRng::seed_from_u64(3);
        let constants = ConstantsConfig {
            fixed: vec![std::f64::consts::PI, 2.0],
            num_random: 2,
            min: 5.0,
            max: 6.0,
        };
        let sampler = GeneSampler::new(&GeneConfig::default(), &constants, &OperatorSet::default(), 1);
        let values = sampler.random_constants(&mut rng);
        assert_eq!(values.len(), 4);
        assert!((values[0] - std::f64::consts::PI).abs() < f64::EPSILON);
        assert!((values[1] - 2.0).abs() < f64::EPSILON);
        assert!(values[2..].iter().all(|v| (5.0..=6.0).contains(v)));
        assert_eq!(sampler.num_fixed_constants(), 2);
    }

    #[test]
    fn test_no_constants_folds_weight() {
        let mut rng = SmallRng::seed_from_u64(9);
        let constants = ConstantsConfig {
            num_random: 0,
            ..ConstantsConfig::default()
        };
        let sampler = GeneSampler::new(&GeneConfig::default(), &constants, &OperatorSet::default(), 1);
        for i in 0..500 {
            let inst = sampler.random_instruction(i % 10, &mut rng);
            assert!(!matches!(inst.opcode, Opcode::Constant(_)));
        }
    }

    #[test]
    #[should_panic(expected = "does not precede")]
    fn test_operator_rejects_forward_reference() {
        let _ = Instruction::operator(Operator::Add, &[0, 3], 3);
    }

    #[test]
    fn test_gene_config_validate() {
        assert!(GeneConfig::default().validate().is_ok());
        let bad_sum = GeneConfig {
            variables_probability: 0.5,
            operators_probability: 0.5,
            constants_probability: 0.5,
        };
        assert!(matches!(bad_sum.validate(), Err(ConfigError::ProbabilitySum(_))));
        let negative = GeneConfig {
            variables_probability: -0.1,
            operators_probability: 1.0,
            constants_probability: 0.1,
        };
        assert!(matches!(negative.validate(), Err(ConfigError::Probability { .. })));
    }

    #[test]
    fn test_constant_range_validate() {
        let bad = ConstantsConfig {
            min: 1.0,
            max: -1.0,
            ..ConstantsConfig::default()
        };
        assert!(bad.validate().is_err());
        assert!(ConstantsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_fitness_serialization() {
        let c = Chromosome::new(vec![Instruction::variable(0)], vec![1.0]);
        let json = serde_json::to_string(&c).unwrap();
        let back: Chromosome = serde_json::from_str(&json).unwrap();
        assert!(back.fitness.is_infinite());
        assert_eq!(back.program, c.program);
    }
}
