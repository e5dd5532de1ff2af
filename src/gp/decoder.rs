//! Infix rendering of the expression at a genome position.
//!
//! Binary arithmetic is written infix, with parentheses only around an
//! additive child where precedence requires them. Every other operator is
//! written as a call, and the conditionals as `iif(cond, then, else)`.

use crate::gp::genome::{Chromosome, Opcode};
use crate::operator::Operator;

/// Rendering stops descending once the text grows past this many bytes.
///
/// Shared sub-expressions are expanded at every use, so a short program
/// can describe an exponentially long expression.
pub const MAX_EXPRESSION_LEN: usize = 1 << 20;

/// Render the expression rooted at `position`.
///
/// `labels` name the input variables; missing labels render as `x<i>`.
///
/// # Panics
///
/// Panics if `position` is outside the program.
#[must_use]
pub fn decode(chromosome: &Chromosome, position: usize, labels: &[String]) -> String {
    let mut out = String::new();
    write_expr(chromosome, position, labels, &mut out);
    out
}

/// Render the expression at the chromosome's best position.
#[must_use]
pub fn decode_best(chromosome: &Chromosome, labels: &[String]) -> Option<String> {
    chromosome.best_index.map(|best| decode(chromosome, best, labels))
}

/// Which operator children need parentheses to keep their grouping.
#[derive(Clone, Copy)]
enum Wrap {
    Never,
    /// Left of `*` or `/`, right of `-`.
    Additive,
    /// Right of `*`: `a*(b/c)` must not read as `(a*b)/c`.
    AdditiveOrDivision,
    /// Right of `/`: both `a/(b*c)` and `a/(b/c)` regroup without them.
    AdditiveOrMultiplicative,
}

impl Wrap {
    fn applies(self, op: Operator) -> bool {
        match self {
            Self::Never => false,
            Self::Additive => op.is_additive(),
            Self::AdditiveOrDivision => op.is_additive() || op == Operator::Div,
            Self::AdditiveOrMultiplicative => op.is_additive() || matches!(op, Operator::Mul | Operator::Div),
        }
    }
}

fn write_child(chromosome: &Chromosome, position: usize, labels: &[String], out: &mut String, wrap: Wrap) {
    let wrap = matches!(chromosome.program[position].opcode, Opcode::Operator(op) if wrap.applies(op));
    if wrap {
        out.push('(');
    }
    write_expr(chromosome, position, labels, out);
    if wrap {
        out.push(')');
    }
}

fn write_expr(chromosome: &Chromosome, position: usize, labels: &[String], out: &mut String) {
    if out.len() > MAX_EXPRESSION_LEN {
        out.push_str("...");
        return;
    }

    let inst = &chromosome.program[position];
    let args = inst.operands;
    match inst.opcode {
        Opcode::Variable(v) => match labels.get(v) {
            Some(label) => out.push_str(label),
            None => out.push_str(&format!("x{v}")),
        },
        Opcode::Constant(c) => out.push_str(&format!("({})", chromosome.constants[c])),
        Opcode::Operator(op) => match op {
            Operator::Add => {
                write_child(chromosome, args[0], labels, out, Wrap::Never);
                out.push('+');
                write_child(chromosome, args[1], labels, out, Wrap::Never);
            }
            Operator::Sub => {
                write_child(chromosome, args[0], labels, out, Wrap::Never);
                out.push('-');
                write_child(chromosome, args[1], labels, out, Wrap::Additive);
            }
            Operator::Mul => {
                write_child(chromosome, args[0], labels, out, Wrap::Additive);
                out.push('*');
                write_child(chromosome, args[1], labels, out, Wrap::AdditiveOrDivision);
            }
            Operator::Div => {
                write_child(chromosome, args[0], labels, out, Wrap::Additive);
                out.push('/');
                write_child(chromosome, args[1], labels, out, Wrap::AdditiveOrMultiplicative);
            }
            Operator::IfLessThanZero => {
                out.push_str("iif(");
                write_expr(chromosome, args[0], labels, out);
                out.push_str("<0, ");
                write_expr(chromosome, args[1], labels, out);
                out.push_str(", ");
                write_expr(chromosome, args[2], labels, out);
                out.push(')');
            }
            Operator::IfLess => {
                out.push_str("iif(");
                write_expr(chromosome, args[0], labels, out);
                out.push('<');
                write_expr(chromosome, args[1], labels, out);
                out.push_str(", ");
                write_expr(chromosome, args[2], labels, out);
                out.push_str(", ");
                write_expr(chromosome, args[3], labels, out);
                out.push(')');
            }
            _ => {
                out.push_str(op.name());
                out.push('(');
                for (i, &arg) in args[..op.arity()].iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_expr(chromosome, arg, labels, out);
                }
                out.push(')');
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::genome::Instruction;

    fn labels() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_terminals() {
        let c = Chromosome::new(vec![Instruction::variable(1), Instruction::constant(0)], vec![2.5]);
        assert_eq!(decode(&c, 0, &labels()), "b");
        assert_eq!(decode(&c, 1, &labels()), "(2.5)");
        assert_eq!(decode(&c, 0, &[]), "x1");
    }

    #[test]
    fn test_precedence_parentheses() {
        // 0:a 1:b 2:a+b 3:a-(a+b) 4:(a+b)*b 5:(a-(a+b))/a
        let c = Chromosome::new(
            vec![
                Instruction::variable(0),
                Instruction::variable(1),
                Instruction::operator(Operator::Add, &[0, 1], 2),
                Instruction::operator(Operator::Sub, &[0, 2], 3),
                Instruction::operator(Operator::Mul, &[2, 1], 4),
                Instruction::operator(Operator::Div, &[3, 0], 5),
                Instruction::operator(Operator::Add, &[2, 3], 6),
            ],
            Vec::new(),
        );
        let l = labels();
        assert_eq!(decode(&c, 2, &l), "a+b");
        assert_eq!(decode(&c, 3, &l), "a-(a+b)");
        assert_eq!(decode(&c, 4, &l), "(a+b)*b");
        assert_eq!(decode(&c, 5, &l), "(a-(a+b))/a");
        assert_eq!(decode(&c, 6, &l), "a+b+a-(a+b)");
    }

    #[test]
    fn test_multiplicative_right_child_keeps_grouping() {
        // 0:a 1:b 2:a*b 3:a/(a*b) 4:a/b 5:b/(a/b) 6:a*(a/b) 7:(a*b)/b 8:(a/b)*b
        let c = Chromosome::new(
            vec![
                Instruction::variable(0),
                Instruction::variable(1),
                Instruction::operator(Operator::Mul, &[0, 1], 2),
                Instruction::operator(Operator::Div, &[0, 2], 3),
                Instruction::operator(Operator::Div, &[0, 1], 4),
                Instruction::operator(Operator::Div, &[1, 4], 5),
                Instruction::operator(Operator::Mul, &[0, 4], 6),
                Instruction::operator(Operator::Div, &[2, 1], 7),
                Instruction::operator(Operator::Mul, &[4, 1], 8),
            ],
            Vec::new(),
        );
        let l = labels();
        assert_eq!(decode(&c, 3, &l), "a/(a*b)");
        assert_eq!(decode(&c, 5, &l), "b/(a/b)");
        assert_eq!(decode(&c, 6, &l), "a*(a/b)");
        // Left-associative chains need no parentheses.
        assert_eq!(decode(&c, 7, &l), "a*b/b");
        assert_eq!(decode(&c, 8, &l), "a/b*b");
    }

    #[test]
    fn test_calls_and_conditionals() {
        let c = Chromosome::new(
            vec![
                Instruction::variable(0),
                Instruction::constant(0),
                Instruction::operator(Operator::Sqrt, &[0], 2),
                Instruction::operator(Operator::Pow, &[0, 1], 3),
                Instruction::operator(Operator::IfLessThanZero, &[0, 2, 1], 4),
                Instruction::operator(Operator::IfLess, &[0, 1, 2, 3], 5),
            ],
            vec![2.0],
        );
        let l = labels();
        assert_eq!(decode(&c, 2, &l), "sqrt(a)");
        assert_eq!(decode(&c, 3, &l), "pow(a, (2))");
        assert_eq!(decode(&c, 4, &l), "iif(a<0, sqrt(a), (2))");
        assert_eq!(decode(&c, 5, &l), "iif(a<(2), sqrt(a), pow(a, (2)))");
    }

    #[test]
    fn test_decode_best_uses_best_index() {
        let mut c = Chromosome::new(
            vec![Instruction::variable(0), Instruction::operator(Operator::Mul, &[0, 0], 1)],
            Vec::new(),
        );
        assert_eq!(decode_best(&c, &labels()), None);
        c.best_index = Some(0);
        assert_eq!(decode_best(&c, &labels()).as_deref(), Some("a"));
    }

    #[test]
    fn test_decoding_does_not_mutate() {
        let c = Chromosome::new(
            vec![Instruction::variable(0), Instruction::operator(Operator::Neg, &[0], 1)],
            Vec::new(),
        );
        let before = c.clone();
        assert_eq!(decode(&c, 1, &labels()), "neg(a)");
        assert_eq!(c, before);
    }

    #[test]
    fn test_exponential_expression_is_capped() {
        let mut program = vec![Instruction::variable(0)];
        for i in 1..60 {
            program.push(Instruction::operator(Operator::Mul, &[i - 1, i - 1], i));
        }
        let c = Chromosome::new(program, Vec::new());
        let text = decode(&c, 59, &labels());
        assert!(text.len() < 2 * MAX_EXPRESSION_LEN);
        assert!(text.ends_with("..."));
    }
}
