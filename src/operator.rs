//! Operator registry.
//!
//! The palette is a closed set: every operator has a fixed negative code,
//! a display name and an arity. Only the enabled flag changes at runtime.
//! Random generation samples uniformly from the dense list of enabled
//! operators kept by [`OperatorSet`].

use crate::error::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest arity in the palette.
pub const MAX_ARITY: usize = 4;

/// Divisors with a magnitude below this trigger self-repair.
pub const DIVISION_EPSILON: f64 = 1e-6;

/// An operator from the fixed palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Addition.
    #[serde(rename = "+")]
    Add,
    /// Subtraction.
    #[serde(rename = "-")]
    Sub,
    /// Multiplication.
    #[serde(rename = "*")]
    Mul,
    /// Division (self-repairing).
    #[serde(rename = "/")]
    Div,
    /// `a` raised to the power `b`.
    #[serde(rename = "pow")]
    Pow,
    /// Minimum of two values.
    #[serde(rename = "min")]
    Min,
    /// Maximum of two values.
    #[serde(rename = "max")]
    Max,
    /// Reciprocal (self-repairing).
    #[serde(rename = "inv")]
    Inv,
    /// Negation.
    #[serde(rename = "neg")]
    Neg,
    /// Absolute value.
    #[serde(rename = "abs")]
    Abs,
    /// Square root.
    #[serde(rename = "sqrt")]
    Sqrt,
    /// Natural exponential.
    #[serde(rename = "exp")]
    Exp,
    /// Natural logarithm.
    #[serde(rename = "log")]
    Log,
    /// Sine.
    #[serde(rename = "sin")]
    Sin,
    /// Cosine.
    #[serde(rename = "cos")]
    Cos,
    /// Tangent.
    #[serde(rename = "tan")]
    Tan,
    /// `a < 0 ? b : c`.
    #[serde(rename = "iflz")]
    IfLessThanZero,
    /// `a < b ? c : d`.
    #[serde(rename = "ifalbcd")]
    IfLess,
}

impl Operator {
    /// Every operator, in registry order.
    pub const ALL: [Operator; 18] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Pow,
        Self::Min,
        Self::Max,
        Self::Inv,
        Self::Neg,
        Self::Abs,
        Self::Sqrt,
        Self::Exp,
        Self::Log,
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::IfLessThanZero,
        Self::IfLess,
    ];

    /// Number of operators in the palette.
    pub const COUNT: usize = Self::ALL.len();

    /// Operators enabled when nothing else is configured.
    pub const DEFAULT_ENABLED: [Operator; 4] = [Self::Add, Self::Sub, Self::Mul, Self::Div];

    /// Position in the registry.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Registry code: -1 for the first operator, -2 for the second, ...
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn code(self) -> i32 {
        -(self.index() as i32) - 1
    }

    /// Look up an operator by registry code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        let index = usize::try_from(code.checked_neg()?.checked_sub(1)?).ok()?;
        Self::ALL.get(index).copied()
    }

    /// Display name, also used for lookup.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "pow",
            Self::Min => "min",
            Self::Max => "max",
            Self::Inv => "inv",
            Self::Neg => "neg",
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::IfLessThanZero => "iflz",
            Self::IfLess => "ifalbcd",
        }
    }

    /// Number of operands consumed.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Pow | Self::Min | Self::Max => 2,
            Self::Inv
            | Self::Neg
            | Self::Abs
            | Self::Sqrt
            | Self::Exp
            | Self::Log
            | Self::Sin
            | Self::Cos
            | Self::Tan => 1,
            Self::IfLessThanZero => 3,
            Self::IfLess => 4,
        }
    }

    /// Operand slot holding the divisor, for division-class operators.
    #[must_use]
    pub fn divisor_operand(self) -> Option<usize> {
        match self {
            Self::Div => Some(1),
            Self::Inv => Some(0),
            _ => None,
        }
    }

    /// Whether the decoder treats this as an additive operator.
    #[must_use]
    pub fn is_additive(self) -> bool {
        matches!(self, Self::Add | Self::Sub)
    }

    /// Apply the operator to a single set of operand values.
    ///
    /// Operands beyond the arity are ignored. No guarding happens here:
    /// division-class operators are repaired by the evaluator before they
    /// ever see a near-zero divisor.
    #[must_use]
    pub fn apply(self, args: [f64; MAX_ARITY]) -> f64 {
        let [a, b, c, d] = args;
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Pow => a.powf(b),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
            Self::Inv => 1.0 / a,
            Self::Neg => -a,
            Self::Abs => a.abs(),
            Self::Sqrt => a.sqrt(),
            Self::Exp => a.exp(),
            Self::Log => a.ln(),
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Tan => a.tan(),
            Self::IfLessThanZero => {
                if a < 0.0 {
                    b
                } else {
                    c
                }
            }
            Self::IfLess => {
                if a < b {
                    c
                } else {
                    d
                }
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name() == name)
            .ok_or_else(|| ConfigError::UnknownOperator(name.to_string()))
    }
}

/// Runtime enable flags over the operator palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSet {
    enabled: [bool; Operator::COUNT],
    /// Enabled operators in registry order, sampled uniformly.
    active: Vec<Operator>,
}

impl Default for OperatorSet {
    fn default() -> Self {
        Self::from_enabled(Operator::DEFAULT_ENABLED)
    }
}

impl OperatorSet {
    /// A set with every operator disabled.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            enabled: [false; Operator::COUNT],
            active: Vec::new(),
        }
    }

    /// A set with exactly the given operators enabled.
    #[must_use]
    pub fn from_enabled<I: IntoIterator<Item = Operator>>(ops: I) -> Self {
        let mut set = Self::empty();
        for op in ops {
            set.enabled[op.index()] = true;
        }
        set.rebuild();
        set
    }

    /// Enable an operator for new genes.
    pub fn enable(&mut self, op: Operator) {
        self.enabled[op.index()] = true;
        self.rebuild();
    }

    /// Stop drawing an operator for new genes.
    ///
    /// Genes already carrying the operator are left untouched.
    pub fn disable(&mut self, op: Operator) {
        self.enabled[op.index()] = false;
        self.rebuild();
    }

    /// Enable an operator by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOperator`] for names outside the palette.
    pub fn enable_named(&mut self, name: &str) -> Result<(), ConfigError> {
        self.enable(name.parse()?);
        Ok(())
    }

    /// Disable an operator by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOperator`] for names outside the palette.
    pub fn disable_named(&mut self, name: &str) -> Result<(), ConfigError> {
        self.disable(name.parse()?);
        Ok(())
    }

    /// Whether an operator is currently enabled.
    #[must_use]
    pub fn is_enabled(&self, op: Operator) -> bool {
        self.enabled[op.index()]
    }

    /// Enabled operators in registry order.
    #[must_use]
    pub fn enabled(&self) -> &[Operator] {
        &self.active
    }

    /// Every operator with its enabled flag.
    pub fn all(&self) -> impl Iterator<Item = (Operator, bool)> + '_ {
        Operator::ALL.iter().map(|&op| (op, self.is_enabled(op)))
    }

    /// True when no operator is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Draw an enabled operator uniformly.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<Operator> {
        if self.active.is_empty() {
            None
        } else {
            Some(self.active[rng.gen_range(0..self.active.len())])
        }
    }

    fn rebuild(&mut self) {
        self.active = Operator::ALL
            .iter()
            .copied()
            .filter(|op| self.enabled[op.index()])
            .collect();
    }
}
