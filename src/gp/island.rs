//! A steady-state sub-population.
//!
//! An island keeps its chromosomes sorted by ascending error, so the best
//! individual is always first and the worst always last. It owns its RNG
//! and its results matrix, which lets islands run their generations in
//! parallel; only migration touches more than one island.

use crate::data::TrainingData;
use crate::gp::crossover::{CrossoverConfig, crossover};
use crate::gp::evaluator::Evaluator;
use crate::gp::fitness::FitnessFunction;
use crate::gp::genome::{Chromosome, GeneSampler};
use crate::gp::mutation::{MutationConfig, mutate};
use crate::gp::selection::{SelectionConfig, tournament_select};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Everything a generation reads but never writes.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
    /// Training rows and target.
    pub data: &'a TrainingData,
    /// Error measure applied to every position.
    pub fitness: &'a dyn FitnessFunction,
    /// Distribution for new genes.
    pub sampler: &'a GeneSampler,
    /// Crossover settings.
    pub crossover: CrossoverConfig,
    /// Mutation settings.
    pub mutation: MutationConfig,
    /// Parent selection settings.
    pub selection: SelectionConfig,
}

impl std::fmt::Debug for GenerationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationContext")
            .field("rows", &self.data.num_rows())
            .field("crossover", &self.crossover)
            .field("mutation", &self.mutation)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

/// One sub-population with its own RNG and scratch matrix.
#[derive(Debug, Clone)]
pub struct Island {
    population: Vec<Chromosome>,
    evaluator: Evaluator,
    rng: SmallRng,
}

impl Island {
    /// Seed `size` random chromosomes of `code_length` genes and sort them.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn seed(size: usize, code_length: usize, seed: u64, ctx: &GenerationContext<'_>) -> Self {
        assert!(size > 0, "an island needs at least one individual");
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut evaluator = Evaluator::new(code_length, ctx.data.num_rows());

        let population = (0..size)
            .map(|_| {
                let mut c = Chromosome::random(ctx.sampler, code_length, &mut rng);
                evaluator.evaluate(&mut c, ctx.data, ctx.fitness, &mut rng);
                c
            })
            .collect();

        let mut island = Self {
            population,
            evaluator,
            rng,
        };
        island.sort();
        island
    }

    /// Chromosomes, best first.
    #[must_use]
    pub fn population(&self) -> &[Chromosome] {
        &self.population
    }

    /// Number of chromosomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.population.len()
    }

    /// Always false: islands are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    /// Lowest-error chromosome.
    #[must_use]
    pub fn best(&self) -> &Chromosome {
        &self.population[0]
    }

    /// Highest-error chromosome, the one replacement targets.
    #[must_use]
    pub fn worst(&self) -> &Chromosome {
        &self.population[self.population.len() - 1]
    }

    fn sort(&mut self) {
        self.population.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
    }

    /// Overwrite the worst slot if `candidate` is strictly better.
    fn replace_worst(&mut self, candidate: &Chromosome) -> bool {
        if candidate.fitness < self.worst().fitness {
            let last = self.population.len() - 1;
            self.population[last].copy_from(candidate);
            self.sort();
            true
        } else {
            false
        }
    }

    /// Run one steady-state generation: `len / 2` parent pairs, each
    /// producing two offspring that may replace the current worst.
    ///
    /// Returns the number of replacements made.
    pub fn step(&mut self, ctx: &GenerationContext<'_>) -> usize {
        let mut replacements = 0;

        for _ in (0..self.population.len()).step_by(2) {
            let r1 = tournament_select(&self.population, ctx.selection.tournament_size, &mut self.rng);
            let r2 = tournament_select(&self.population, ctx.selection.tournament_size, &mut self.rng);

            let (offspring1, offspring2) = if self.rng.gen_bool(ctx.crossover.probability) {
                crossover(
                    &self.population[r1],
                    &self.population[r2],
                    ctx.crossover.kind,
                    &mut self.rng,
                )
            } else {
                (self.population[r1].clone(), self.population[r2].clone())
            };

            for mut offspring in [offspring1, offspring2] {
                mutate(&mut offspring, ctx.sampler, &ctx.mutation, &mut self.rng);
                if !offspring.is_evaluated() {
                    self.evaluator
                        .evaluate(&mut offspring, ctx.data, ctx.fitness, &mut self.rng);
                }
                if self.replace_worst(&offspring) {
                    replacements += 1;
                }
            }
        }

        replacements
    }

    /// Copy of a uniformly chosen member, to send to the next island.
    #[must_use]
    pub fn pick_migrant(&mut self) -> Chromosome {
        let idx = self.rng.gen_range(0..self.population.len());
        self.population[idx].clone()
    }

    /// Accept a migrant if it is strictly better than the worst member.
    pub fn receive(&mut self, migrant: &Chromosome) -> bool {
        self.replace_worst(migrant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::gp::fitness::ErrorMeasure;
    use crate::gp::genome::{ConstantsConfig, GeneConfig};
    use crate::operator::OperatorSet;

    fn fixture() -> (TrainingData, GeneSampler) {
        let mut rng = SmallRng::seed_from_u64(10);
        let data = data::quartic_poly(&mut rng, 20);
        let sampler = GeneSampler::new(
            &GeneConfig::default(),
            &ConstantsConfig::default(),
            &OperatorSet::default(),
            data.num_variables(),
        );
        (data, sampler)
    }

    fn context<'a>(data: &'a TrainingData, sampler: &'a GeneSampler) -> GenerationContext<'a> {
        GenerationContext {
            data,
            fitness: &ErrorMeasure::TotalError,
            sampler,
            crossover: CrossoverConfig::default(),
            mutation: MutationConfig::default(),
            selection: SelectionConfig::default(),
        }
    }

    fn is_sorted(island: &Island) -> bool {
        island.population().windows(2).all(|w| w[0].fitness <= w[1].fitness)
    }

    #[test]
    fn test_seed_is_sorted_and_evaluated() {
        let (data, sampler) = fixture();
        let island = Island::seed(20, 15, 1, &context(&data, &sampler));
        assert_eq!(island.len(), 20);
        assert!(is_sorted(&island));
        assert!(island.population().iter().all(Chromosome::is_evaluated));
        assert!(island.best().fitness <= island.worst().fitness);
    }

    #[test]
    fn test_step_never_worsens_best() {
        let (data, sampler) = fixture();
        let ctx = context(&data, &sampler);
        let mut island = Island::seed(20, 15, 2, &ctx);
        let mut previous = island.best().fitness;
        for _ in 0..30 {
            island.step(&ctx);
            assert!(is_sorted(&island));
            assert!(island.best().fitness <= previous);
            previous = island.best().fitness;
        }
        assert!(island.population().iter().all(|c| c.is_well_formed(1)));
    }

    #[test]
    fn test_receive_only_strictly_better() {
        let (data, sampler) = fixture();
        let mut island = Island::seed(10, 10, 3, &context(&data, &sampler));

        let equal = island.worst().clone();
        let before = island.population().to_vec();
        assert!(!island.receive(&equal));
        assert_eq!(island.population(), before.as_slice());

        let mut better = island.best().clone();
        better.fitness = -1.0;
        assert!(island.receive(&better));
        assert!((island.best().fitness + 1.0).abs() < f64::EPSILON);
        assert!(is_sorted(&island));
    }

    #[test]
    fn test_same_seed_same_island() {
        let (data, sampler) = fixture();
        let ctx = context(&data, &sampler);
        let mut a = Island::seed(10, 12, 99, &ctx);
        let mut b = Island::seed(10, 12, 99, &ctx);
        a.step(&ctx);
        b.step(&ctx);
        assert_eq!(a.population(), b.population());
    }
}
