//! Island-model steady-state evolution.
//!
//! [`Mep`] owns the training data, the fitness function and every island.
//! One call to [`Mep::evolve`] runs a generation on all islands in
//! parallel, then migrates along the ring `0 -> 1 -> ... -> 0` in island
//! order. Migration is the only step that touches two islands, so it runs
//! serially after the parallel phase and the result does not depend on the
//! thread count.

use crate::data::TrainingData;
use crate::error::ConfigError;
use crate::gp::crossover::CrossoverConfig;
use crate::gp::decoder::decode_best;
use crate::gp::fitness::FitnessFunction;
use crate::gp::genome::{Chromosome, ConstantsConfig, GeneConfig, GeneSampler};
use crate::gp::island::{GenerationContext, Island};
use crate::gp::mutation::MutationConfig;
use crate::gp::selection::{SelectionConfig, SelectionStats};
use crate::operator::{Operator, OperatorSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Smallest program that can hold a terminal and a few operators.
pub const MIN_CODE_LENGTH: usize = 4;

/// Configuration for an evolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Individuals per island; must be even.
    pub sub_population_size: usize,
    /// Number of islands in the migration ring.
    pub num_islands: usize,
    /// Genes per chromosome.
    pub code_length: usize,
    /// Master RNG seed.
    pub seed: u64,
    /// Gene category probabilities.
    pub genes: GeneConfig,
    /// Fixed and random constants.
    pub constants: ConstantsConfig,
    /// Crossover configuration.
    pub crossover: CrossoverConfig,
    /// Mutation configuration.
    pub mutation: MutationConfig,
    /// Selection configuration.
    pub selection: SelectionConfig,
    /// Operators that new genes may use.
    pub operators: Vec<Operator>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            sub_population_size: 100,
            num_islands: 1,
            code_length: 50,
            seed: 42,
            genes: GeneConfig::default(),
            constants: ConstantsConfig::default(),
            crossover: CrossoverConfig::default(),
            mutation: MutationConfig::default(),
            selection: SelectionConfig::default(),
            operators: Operator::DEFAULT_ENABLED.to_vec(),
        }
    }
}

impl EvolutionConfig {
    /// Check every parameter before any evolution starts.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sub_population_size == 0 || !self.sub_population_size.is_multiple_of(2) {
            return Err(ConfigError::PopulationSize(self.sub_population_size));
        }
        if self.num_islands == 0 {
            return Err(ConfigError::NoIslands);
        }
        if self.code_length < MIN_CODE_LENGTH {
            return Err(ConfigError::CodeLength(self.code_length));
        }
        self.genes.validate()?;
        self.constants.validate()?;
        self.crossover.validate()?;
        self.mutation.validate()?;
        self.selection.validate()?;
        if self.operators.is_empty() && self.genes.operators_probability > 0.0 {
            return Err(ConfigError::NoOperators(self.genes.operators_probability));
        }
        Ok(())
    }

    /// Individuals across all islands.
    #[must_use]
    pub fn population_size(&self) -> usize {
        self.sub_population_size * self.num_islands
    }

    /// Enabled operators as a set.
    #[must_use]
    pub fn operator_set(&self) -> OperatorSet {
        OperatorSet::from_enabled(self.operators.iter().copied())
    }
}

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Populations seeded and sorted, no generation run yet.
    Initialized,
    /// At least one generation has run.
    Evolving,
    /// `solve` stopped because the threshold was reached.
    Converged,
    /// `solve` stopped at the generation limit.
    Terminated,
}

/// Summary of one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationReport {
    /// Generations completed, counting this one.
    pub generation: usize,
    /// Island holding the global best.
    pub best_island: usize,
    /// Error statistics over every individual.
    pub stats: SelectionStats,
    /// Offspring that replaced a worse individual.
    pub replacements: usize,
    /// Migrants accepted.
    pub migrations: usize,
}

/// Result of [`Mep::solve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOutcome {
    /// Generations executed by this call.
    pub generations: usize,
    /// Wall-clock time of this call.
    pub elapsed: Duration,
    /// Global best error at the end.
    pub best_fitness: f64,
    /// State the engine stopped in.
    pub state: RunState,
}

/// Multi Expression Programming engine.
pub struct Mep {
    config: EvolutionConfig,
    data: TrainingData,
    fitness: Box<dyn FitnessFunction>,
    operators: OperatorSet,
    sampler: GeneSampler,
    islands: Vec<Island>,
    best_island: usize,
    generation: usize,
    state: RunState,
}

impl std::fmt::Debug for Mep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mep")
            .field("config", &self.config)
            .field("rows", &self.data.num_rows())
            .field("operators", &self.operators.enabled())
            .field("generation", &self.generation)
            .field("best_island", &self.best_island)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Mep {
    /// Validate `config` and seed every island.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn new<F>(config: EvolutionConfig, data: TrainingData, fitness: F) -> Result<Self, ConfigError>
    where
        F: FitnessFunction + 'static,
    {
        config.validate()?;
        let operators = config.operator_set();
        let sampler = GeneSampler::new(&config.genes, &config.constants, &operators, data.num_variables());

        let mut engine = Self {
            config,
            data,
            fitness: Box::new(fitness),
            operators,
            sampler,
            islands: Vec::new(),
            best_island: 0,
            generation: 0,
            state: RunState::Initialized,
        };
        engine.seed_islands();
        Ok(engine)
    }

    fn context(&self) -> GenerationContext<'_> {
        GenerationContext {
            data: &self.data,
            fitness: self.fitness.as_ref(),
            sampler: &self.sampler,
            crossover: self.config.crossover,
            mutation: self.config.mutation,
            selection: self.config.selection,
        }
    }

    fn seed_islands(&mut self) {
        let ctx = self.context();
        let size = self.config.sub_population_size;
        let code_length = self.config.code_length;
        let seed = self.config.seed;

        let islands: Vec<Island> = (0..self.config.num_islands)
            .into_par_iter()
            .map(|i| Island::seed(size, code_length, seed.wrapping_add(i as u64), &ctx))
            .collect();

        self.islands = islands;
        self.generation = 0;
        self.state = RunState::Initialized;
        self.update_best_island();

        log::info!(
            "seeded {} island(s) of {} with code length {}, best error {}",
            self.config.num_islands,
            size,
            code_length,
            self.best_fitness()
        );
    }

    fn update_best_island(&mut self) {
        self.best_island = self
            .islands
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.best().fitness.total_cmp(&b.best().fitness))
            .map_or(0, |(i, _)| i);
    }

    /// Replace the configuration and reseed every island.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] and leaves the engine untouched if `config`
    /// is invalid.
    pub fn reconfigure(&mut self, config: EvolutionConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.operators = config.operator_set();
        self.sampler = GeneSampler::new(&config.genes, &config.constants, &self.operators, self.data.num_variables());
        self.config = config;
        self.seed_islands();
        Ok(())
    }

    /// Allow `op` in genes created from now on.
    pub fn enable_operator(&mut self, op: Operator) {
        self.operators.enable(op);
        self.refresh_sampler();
    }

    /// Stop `op` from appearing in genes created from now on.
    ///
    /// Genes that already use it are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoOperators`] and changes nothing if `op` is
    /// the last enabled operator while operator genes can still be drawn.
    /// The saved config must stay loadable.
    pub fn disable_operator(&mut self, op: Operator) -> Result<(), ConfigError> {
        let probability = self.config.genes.operators_probability;
        if probability > 0.0 && self.operators.enabled() == [op] {
            return Err(ConfigError::NoOperators(probability));
        }
        self.operators.disable(op);
        self.refresh_sampler();
        Ok(())
    }

    fn refresh_sampler(&mut self) {
        self.config.operators = self.operators.enabled().to_vec();
        self.sampler = GeneSampler::new(
            &self.config.genes,
            &self.config.constants,
            &self.operators,
            self.data.num_variables(),
        );
    }

    /// Run one generation on every island, then migrate.
    pub fn evolve(&mut self) -> GenerationReport {
        let ctx = GenerationContext {
            data: &self.data,
            fitness: self.fitness.as_ref(),
            sampler: &self.sampler,
            crossover: self.config.crossover,
            mutation: self.config.mutation,
            selection: self.config.selection,
        };
        let replacements: usize = self.islands.par_iter_mut().map(|island| island.step(&ctx)).sum();

        let migrations = self.migrate();
        self.generation += 1;
        self.state = RunState::Evolving;

        let fitness: Vec<f64> = self
            .islands
            .iter()
            .flat_map(|island| island.population().iter().map(|c| c.fitness))
            .collect();
        let report = GenerationReport {
            generation: self.generation,
            best_island: self.best_island,
            stats: SelectionStats::from_fitness(&fitness),
            replacements,
            migrations,
        };

        log::debug!(
            "gen {:>5}: best={:.6} mean={:.6} std={:.6} replaced={} migrated={}",
            report.generation,
            report.stats.best_fitness,
            report.stats.mean_fitness,
            report.stats.fitness_std,
            report.replacements,
            report.migrations
        );
        report
    }

    /// Ring migration in island order. A single island has no neighbour.
    fn migrate(&mut self) -> usize {
        let n = self.islands.len();
        let mut accepted = 0;

        for p in 0..n {
            if n > 1 {
                let migrant = self.islands[p].pick_migrant();
                let target = (p + 1) % n;
                if self.islands[target].receive(&migrant) {
                    accepted += 1;
                    log::debug!("migrant with error {} moved from island {p} to {target}", migrant.fitness);
                }
            }
            if self.islands[p].best().fitness < self.islands[self.best_island].best().fitness {
                self.best_island = p;
            }
        }
        accepted
    }

    /// Evolve until `max_generations` have run or the best error is at or
    /// below `threshold`.
    pub fn solve(&mut self, max_generations: usize, threshold: f64) -> SolveOutcome {
        self.solve_with(max_generations, threshold, |_| {})
    }

    /// Like [`Mep::solve`], calling `observer` after every generation.
    pub fn solve_with<F>(&mut self, max_generations: usize, threshold: f64, mut observer: F) -> SolveOutcome
    where
        F: FnMut(&GenerationReport),
    {
        let start = Instant::now();
        let mut generations = 0;

        while generations < max_generations && self.best_fitness() > threshold {
            let report = self.evolve();
            generations += 1;
            observer(&report);
        }

        self.state = if self.best_fitness() <= threshold {
            RunState::Converged
        } else {
            RunState::Terminated
        };

        let outcome = SolveOutcome {
            generations,
            elapsed: start.elapsed(),
            best_fitness: self.best_fitness(),
            state: self.state,
        };
        log::info!(
            "{:?} after {} generation(s) in {:.3}s, best error {}",
            outcome.state,
            outcome.generations,
            outcome.elapsed.as_secs_f64(),
            outcome.best_fitness
        );
        outcome
    }

    /// Lowest error over all islands.
    #[must_use]
    pub fn best_fitness(&self) -> f64 {
        self.best().fitness
    }

    /// The globally best chromosome.
    #[must_use]
    pub fn best(&self) -> &Chromosome {
        self.islands[self.best_island].best()
    }

    /// Infix rendering of the best chromosome's best expression.
    #[must_use]
    pub fn best_expression(&self) -> String {
        decode_best(self.best(), self.data.labels()).unwrap_or_default()
    }

    /// Index of the island holding the global best.
    #[must_use]
    pub fn best_island(&self) -> usize {
        self.best_island
    }

    /// All islands in ring order.
    #[must_use]
    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    /// Generations run since seeding.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Active configuration, including operator changes.
    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Operators new genes may use.
    #[must_use]
    pub fn operators(&self) -> &OperatorSet {
        &self.operators
    }

    /// Training data.
    #[must_use]
    pub fn data(&self) -> &TrainingData {
        &self.data
    }
}
