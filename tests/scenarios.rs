//! End-to-end regression scenarios.
//!
//! Run with: cargo test --release --test scenarios

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use mep::data::{self, TrainingData};
use mep::gp::{
    Chromosome, ConstantsConfig, ErrorMeasure, EvolutionConfig, Evaluator, Instruction, Mep, Opcode, RunState,
};
use mep::operator::Operator;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::f64::consts::PI;

fn every_chromosome(mep: &Mep) -> impl Iterator<Item = &Chromosome> {
    mep.islands().iter().flat_map(|island| island.population().iter())
}

#[test]
fn quartic_polynomial_is_found() {
    let training = data::quartic_poly(&mut SmallRng::seed_from_u64(2016), 30);

    let mut best = f64::INFINITY;
    for seed in [1, 2, 3] {
        let config = EvolutionConfig {
            sub_population_size: 100,
            code_length: 50,
            seed,
            ..EvolutionConfig::default()
        };
        let mut mep = Mep::new(config, training.clone(), ErrorMeasure::TotalError).unwrap();
        let outcome = mep.solve(1000, 0.1);
        assert!(outcome.generations <= 1000);
        best = best.min(mep.best_fitness());
        if outcome.state == RunState::Converged {
            assert!(mep.best_expression().contains('x'));
            break;
        }
    }
    assert!(best <= 0.1, "best error {best}");
}

#[test]
fn fixed_pi_constant_reaches_zero_error() {
    let training = data::pi(&mut SmallRng::seed_from_u64(5), 50, 1);
    let config = EvolutionConfig {
        constants: ConstantsConfig {
            fixed: vec![PI],
            ..ConstantsConfig::default()
        },
        ..EvolutionConfig::default()
    };
    let mut mep = Mep::new(config, training, ErrorMeasure::TotalError).unwrap();
    let outcome = mep.solve(200, 0.0);

    assert_eq!(outcome.state, RunState::Converged);
    assert!(mep.best_fitness() <= 0.0);

    let best = mep.best();
    let position = best.best_index.unwrap();
    assert_eq!(best.program[position].opcode, Opcode::Constant(0));
    assert_eq!(mep.best_expression(), format!("({PI})"));
}

fn zero_column_data() -> TrainingData {
    let mut rng = SmallRng::seed_from_u64(9);
    let source = data::pythagorean(&mut rng, 40);
    let rows = source.rows().iter().map(|row| vec![0.0, row[0] + 1.0]).collect();
    TrainingData::new(rows, source.target().to_vec(), vec!["zero".into(), "x".into()]).unwrap()
}

#[test]
fn division_by_zero_column_is_repaired() {
    let training = zero_column_data();
    let mut chromosome = Chromosome::new(
        vec![
            Instruction::variable(1),
            Instruction::variable(0),
            Instruction::operator(Operator::Div, &[0, 1], 2),
            Instruction::operator(Operator::Inv, &[1], 3),
            Instruction::operator(Operator::Div, &[1, 0], 4),
        ],
        Vec::new(),
    );

    let mut evaluator = Evaluator::new(5, training.num_rows());
    let mut rng = SmallRng::seed_from_u64(1);
    let evaluation = evaluator.evaluate(&mut chromosome, &training, &ErrorMeasure::TotalError, &mut rng);

    assert_eq!(evaluation.repaired, vec![2, 3]);
    assert!(matches!(chromosome.program[2].opcode, Opcode::Variable(_)));
    assert!(matches!(chromosome.program[3].opcode, Opcode::Variable(_)));
    assert_eq!(chromosome.program[4].opcode, Opcode::Operator(Operator::Div));
    for position in 0..5 {
        assert!(evaluator.row(position).iter().all(|v| v.is_finite()));
    }
    assert!(evaluation.fitness.is_finite());
}

#[test]
fn evolved_population_needs_no_further_repair() {
    let training = zero_column_data();
    let config = EvolutionConfig {
        sub_population_size: 30,
        num_islands: 2,
        code_length: 20,
        operators: vec![Operator::Add, Operator::Div, Operator::Inv],
        ..EvolutionConfig::default()
    };
    let mut mep = Mep::new(config, training.clone(), ErrorMeasure::TotalError).unwrap();
    mep.solve(20, 0.0);

    let mut evaluator = Evaluator::default();
    let mut rng = SmallRng::seed_from_u64(2);
    for chromosome in every_chromosome(&mep) {
        assert!(chromosome.is_well_formed(training.num_variables()));
        let mut copy = chromosome.clone();
        let evaluation = evaluator.evaluate(&mut copy, &training, &ErrorMeasure::TotalError, &mut rng);
        assert!(evaluation.repaired.is_empty());
        assert_eq!(copy.program, chromosome.program);
    }
}

#[test]
fn only_enabled_operators_appear() {
    let training = data::pythagorean(&mut SmallRng::seed_from_u64(11), 50);
    let mut config = EvolutionConfig {
        sub_population_size: 40,
        num_islands: 2,
        code_length: 30,
        ..EvolutionConfig::default()
    };
    let mut operators = config.operator_set();
    operators.enable(Operator::Sqrt);
    operators.disable(Operator::Div);
    operators.disable(Operator::Sub);
    config.operators = operators.enabled().to_vec();
    assert_eq!(config.operators, vec![Operator::Add, Operator::Mul, Operator::Sqrt]);

    let allowed = |op: Operator| matches!(op, Operator::Add | Operator::Mul | Operator::Sqrt);

    let mut mep = Mep::new(config, training, ErrorMeasure::MeanError).unwrap();
    assert!(every_chromosome(&mep).all(|c| c.operators().all(allowed)));

    let start = mep.best_fitness();
    mep.solve_with(60, 0.0, |_| {});
    assert!(every_chromosome(&mep).all(|c| c.operators().all(allowed)));
    assert!(mep.best_fitness() <= start);
    assert!(!mep.best_expression().contains('/'));
}
