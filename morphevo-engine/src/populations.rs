//! A Population is a collection of genomes.
//! These are grouped into species, which can
//! be evolved using a genome evaluation function
//! as the source of selective pressure.
mod config;
mod errors;
mod offspring_factory;
mod species;

use crate::{ConnectionDensity, Genome, InnovationHistory};
pub use config::PopulationConfig;
pub use errors::{InvalidFitness, OffspringAllotmentError, PopulationValidityError};
use offspring_factory::OffspringFactory;
pub use species::{Species, SpeciesID};

use rand::prelude::Rng;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

/// A population of genomes.
///
/// A population is created empty; [`reset`] fills it with
/// randomized genomes. Deserialized populations keep their
/// genomes, innovation history and generation count, so
/// evolution resumes where it left off.
///
/// [`reset`]: Population::reset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Population<C, H, G> {
    species: Vec<Species<G>>,
    history: H,
    generation: usize,
    resets: usize,
    historical_species_count: usize,
    population_config: PopulationConfig,
    genetic_config: C,
}

impl<C, H, G> Population<C, H, G>
where
    G: Genome<InnovationHistory = H, Config = C> + Clone,
{
    /// Creates a new, empty population using the passed configurations.
    ///
    /// The type of `genetic_config` depends on the implementation
    /// of [`Genome`], and is effectively opaque to the population.
    ///
    /// [`Genome`]: crate::Genome
    ///
    /// # Examples
    /// ```
    /// # use morphevo_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use morphevo_engine::{Population, PopulationConfig};
    ///
    /// let pop_config = PopulationConfig {
    ///     // Set desired configuration
    ///     ..PopulationConfig::zero()
    /// };
    /// # let genetic_config = GeneticConfig::zero();
    ///
    /// // With `G` a suitable type implementing `Genome`...
    /// let population = Population::<_, _, G>::new(pop_config, genetic_config);
    /// assert_eq!(population.genomes().count(), 0);
    /// assert_eq!(population.resets(), 0);
    /// ```
    pub fn new(population_config: PopulationConfig, genetic_config: C) -> Population<C, H, G>
    where
        H: InnovationHistory<Config = C>,
    {
        Population {
            species: vec![],
            history: H::new(&genetic_config),
            generation: 0,
            resets: 0,
            historical_species_count: 0,
            population_config,
            genetic_config,
        }
    }

    /// Evaluates the fitness of each genome in the
    /// population using the passed evaluator.
    ///
    /// The return value of the evaluation function
    /// should be positive.
    ///
    /// # Examples
    /// ```
    /// # use morphevo_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use morphevo_engine::{Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig::zero(),
    ///     genetic_config,
    /// );
    /// population.reset();
    ///
    /// population.evaluate_fitness(|g| {
    ///     // Compute genome's fitness...
    ///     g.genes().count() as f32
    /// });
    /// ```
    pub fn evaluate_fitness<E>(&mut self, mut evaluator: E)
    where
        E: FnMut(&G) -> f32,
    {
        for genome in self.species.iter_mut().flat_map(|s| &mut s.genomes) {
            let fitness = evaluator(genome);
            assert!(fitness >= 0.0, "fitness function returned a negative value");
            genome.set_fitness(fitness);
        }
    }

    /// Evaluates the fitness of each genome in the population
    /// on the passed worker pool, blocking until every genome
    /// has been scored.
    ///
    /// Genomes the evaluator fails on, or scores with a negative
    /// or non-finite fitness, are given a fitness of 0.
    /// The errors are returned, one per failed genome, so callers
    /// can decide whether the generation is still usable.
    pub fn evaluate_fitness_par<E, Err>(&mut self, pool: &ThreadPool, evaluator: E) -> Vec<Err>
    where
        G: Send,
        E: Fn(&G) -> Result<f32, Err> + Sync,
        Err: From<InvalidFitness> + Send,
    {
        let species = &mut self.species;
        pool.install(|| {
            species
                .par_iter_mut()
                .flat_map_iter(|s| s.genomes.iter_mut())
                .filter_map(|genome| {
                    let outcome = evaluator(genome).and_then(|fitness| {
                        if fitness.is_finite() && fitness >= 0.0 {
                            Ok(fitness)
                        } else {
                            Err(Err::from(InvalidFitness(fitness)))
                        }
                    });
                    match outcome {
                        Ok(fitness) => {
                            genome.set_fitness(fitness);
                            None
                        }
                        Err(e) => {
                            genome.set_fitness(0.0);
                            Some(e)
                        }
                    }
                })
                .collect()
        })
    }

    /// Evolves the population by mating the best performing
    /// genomes of each species, and re-speciating genomes
    /// as appropiate.
    ///
    /// If the [adoption rate] is less than 1, offspring
    /// will have a chance of being placed into their parent's
    /// species without speciation, which seems to help NEAT
    /// find solutions faster. (See [[Nodine, T., 2010]].)
    ///
    /// # Panics
    /// This function will panic if
    /// `config.survival_threshold == 0.0` and
    /// `config.elitism` isn't high enough to cover
    /// the number of offspring assigned to a species,
    /// as there would be no parents from which to generate
    /// offspring.
    ///
    /// If no species has any adjusted fitness, as when every
    /// genome scored 0, offspring are allotted in proportion
    /// to species size instead.
    ///
    /// # Errors
    /// Returns an error if the population is empty.
    ///
    /// [adoption rate]: PopulationConfig::adoption_rate
    /// [Nodine, T., 2010]: https://citeseerx.ist.psu.edu/viewdoc/download?doi=10.1.1.175.2884&rep=rep1&type=pdf
    pub fn evolve(&mut self) -> Result<(), OffspringAllotmentError>
    where
        H: InnovationHistory<Config = C>,
    {
        let allotted_offspring = self.allot_offspring()?;
        self.species.iter_mut().for_each(Species::update_fitness);
        self.generate_offspring(&allotted_offspring);
        self.respeciate_all();
        self.remove_extinct_species();
        self.generation += 1;
        Ok(())
    }

    /// Allot the number of offspring for each species,
    /// based on proportional adjusted species fitness
    /// and stagnation status, or on species size when
    /// the population has no fitness to share out.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no genomes.
    fn allot_offspring(&self) -> Result<Vec<usize>, OffspringAllotmentError> {
        if self.species.is_empty() {
            return Err(OffspringAllotmentError::EmptyPopulation);
        }
        let shares = self
            .get_species_adjusted_fitness()
            .unwrap_or_else(|| self.get_species_member_shares());
        Ok(round_retain_sum(&shares))
    }

    /// Collects all species adjusted fitnesses.
    /// Returns `None` if population fitness sum is 0.
    fn get_species_adjusted_fitness(&self) -> Option<Vec<f32>> {
        let fitnesses = self.species_fitness_with_stagnation_penalty();
        let fitness_sum: f32 = fitnesses.iter().copied().sum();
        if fitness_sum <= 0.0 {
            return None;
        }
        Some(
            fitnesses
                .iter()
                .map(|f| *f / fitness_sum * self.population_config.size.get() as f32)
                .collect(),
        )
    }

    /// Each species' share of the population size,
    /// proportional to its member count.
    fn get_species_member_shares(&self) -> Vec<f32> {
        let member_count: usize = self.species.iter().map(|s| s.genomes.len()).sum();
        let size = self.population_config.size.get() as f32;
        if member_count == 0 {
            let uniform = size / self.species.len() as f32;
            return vec![uniform; self.species.len()];
        }
        self.species
            .iter()
            .map(|s| s.genomes.len() as f32 / member_count as f32 * size)
            .collect()
    }

    /// Returns each species' adjusted fitness,
    /// with stagnation penalties applied.
    fn species_fitness_with_stagnation_penalty(&self) -> Vec<f32> {
        self.species
            .iter()
            .map(|s| {
                if s.time_stagnated() >= self.population_config.stagnation_threshold.get() {
                    s.adjusted_fitness() * (1.0 - self.population_config.stagnation_penalty)
                } else {
                    s.adjusted_fitness()
                }
            })
            .collect()
    }

    /// Generates each species' assigned offspring,
    /// keeping the [species' elite] and mating the
    /// [top performers].
    ///
    /// [species' elite]: PopulationConfig::elitism
    /// [top performers]: PopulationConfig::survival_threshold
    fn generate_offspring(&mut self, allotted_offspring: &[usize])
    where
        H: InnovationHistory<Config = C>,
    {
        self.sort_species_members_by_decreasing_fitness();

        let mut species_offspring = OffspringFactory::new(
            &self.species,
            &mut self.history,
            &self.genetic_config,
            &self.population_config,
        )
        .generate_offspring(allotted_offspring);

        for species in &mut self.species {
            species.genomes = species_offspring.remove(&species.id()).unwrap_or_default();
        }
    }

    /// Sorts each species' members by fitness in descending order.
    fn sort_species_members_by_decreasing_fitness(&mut self) {
        for species in &mut self.species {
            species
                .genomes
                .sort_unstable_by(|g1, g2| g2.fitness().total_cmp(&g1.fitness()));
        }
    }

    /// Reassigns each genome to a species based on genetic
    /// distance to species representatives. Has a 1-[adoption rate]
    /// chance of not modifying a genome's assigned species.
    ///
    /// [adoption rate]: PopulationConfig::adoption_rate
    fn respeciate_all(&mut self) {
        let mut new_species_count = 0;
        for genome in self.drain_incompatible_genomes_from_species() {
            if self.respeciate(
                genome,
                SpeciesID(self.historical_species_count, new_species_count),
            ) {
                new_species_count += 1;
            }
        }
        if new_species_count > 0 {
            self.historical_species_count += 1;
        }
    }

    /// Assigns a genome to a species based on genetic distance
    /// to species representatives. Returns whether a new species
    /// was created to house the genome.
    fn respeciate(&mut self, genome: G, new_species_id: SpeciesID) -> bool {
        for species in &mut self.species {
            if species.genetic_distance(&genome, &self.genetic_config)
                < self.population_config.distance_threshold
            {
                species.add_genome(genome);
                return false;
            }
        }
        self.species.push(Species::new(new_species_id, genome));
        true
    }

    /// Removes and returns all genomes incompatible with their
    /// species, iff they are to be adopted.
    fn drain_incompatible_genomes_from_species(&mut self) -> Vec<G> {
        let mut incompatibles = vec![];
        let mut rng = rand::thread_rng();
        for species in &mut self.species {
            let mut i = 0;
            while i < species.genomes.len() {
                if rng.gen::<f32>() < self.population_config.adoption_rate
                    && species.genetic_distance(&species.genomes[i], &self.genetic_config)
                        >= self.population_config.distance_threshold
                {
                    incompatibles.push(species.genomes.swap_remove(i));
                } else {
                    i += 1;
                }
            }
        }
        incompatibles
    }

    /// Removes all extinct (0 assigned offspring)
    /// species from the population.
    fn remove_extinct_species(&mut self) {
        self.species.retain(|s| !s.genomes.is_empty());
        self.species.sort_unstable_by_key(|s| s.id());
    }

    /// Resets the population to an initial randomized state,
    /// discarding all genomes and innovation history.
    ///
    /// Fresh populations must be reset once before being
    /// evaluated. The generation count is kept, and the
    /// number of resets is recorded.
    ///
    /// # Examples
    /// ```
    /// # use morphevo_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use morphevo_engine::{Population, PopulationConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// // With `G` a suitable type implementing `Genome`...
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(12).unwrap(),
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// );
    ///
    /// population.reset();
    /// assert_eq!(population.genomes().count(), 12);
    /// assert_eq!(population.resets(), 1);
    /// ```
    pub fn reset(&mut self)
    where
        H: InnovationHistory<Config = C>,
    {
        let config = &self.genetic_config;
        let mut s0 = Species::new(SpeciesID(0, 0), G::new(config));
        s0.genomes
            .extend((1..self.population_config.size.get()).map(|_| G::new(config)));
        self.species = vec![s0];
        self.history = H::new(config);
        self.historical_species_count = 1;
        self.resets += 1;
    }

    /// Sets the chance of each initial gene being expressed in
    /// genomes created by subsequent [`reset`]s.
    ///
    /// [`reset`]: Population::reset
    pub fn set_initial_connection_density(&mut self, density: f32)
    where
        C: ConnectionDensity,
    {
        self.genetic_config.set_initial_connection_density(density);
    }

    /// Checks the population's structural invariants: it must
    /// contain genomes, have no empty species, and every genome
    /// must conform to the population's genetic configuration.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), PopulationValidityError> {
        if self.species.is_empty() {
            return Err(PopulationValidityError::EmptyPopulation);
        }
        if let Some(s) = self.species.iter().find(|s| s.genomes.is_empty()) {
            return Err(PopulationValidityError::EmptySpecies(s.id()));
        }
        for species in &self.species {
            if !species.representative().conforms_to(&self.genetic_config)
                || !species.genomes().all(|g| g.conforms_to(&self.genetic_config))
            {
                return Err(PopulationValidityError::NonconformingGenome(species.id()));
            }
        }
        Ok(())
    }

    /// Returns the currently best-performing genome,
    /// or `None` if the population is empty.
    pub fn champion(&self) -> Option<&G> {
        self.genomes()
            .max_by(|g1, g2| g1.fitness().total_cmp(&g2.fitness()))
    }

    /// Returns an iterator over all current genomes.
    pub fn genomes(&self) -> impl Iterator<Item = &G> {
        self.species.iter().flat_map(|s| &s.genomes)
    }

    /// Returns an iterator over all current species.
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.species.iter()
    }

    /// Returns the current generation number.
    ///
    /// # Examples
    /// ```
    /// # use morphevo_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use morphevo_engine::{Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// // With `G` a suitable type implementing `Genome`...
    /// let population = Population::<_, _, G>::new(PopulationConfig::zero(), genetic_config);
    ///
    /// assert_eq!(population.generation(), 0);
    /// ```
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns how many times the population has been
    /// randomized from scratch.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Returns the population's innovation history.
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Returns the configuration genomes are generated with.
    pub fn genetic_config(&self) -> &C {
        &self.genetic_config
    }

    /// Returns the population's evolution parameters.
    pub fn population_config(&self) -> &PopulationConfig {
        &self.population_config
    }
}

/// Rounds all values to positive whole numbers
/// while preserving their order and sum, assuming it is also whole.
/// Rounding is done in the manner that minimizes
/// the average error to the original set of values.
fn round_retain_sum(values: &[f32]) -> Vec<usize> {
    let total_sum = values.iter().sum::<f32>().round() as usize;
    let mut truncated: Vec<(usize, usize, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let u = f.floor();
            let e = f - u;
            (i, u as usize, e)
        })
        .collect();
    let truncated_sum: usize = truncated.iter().map(|(_, u, _)| *u).sum();
    let remainder = total_sum.saturating_sub(truncated_sum).min(truncated.len());
    // Sort in decreasing order of error
    truncated.sort_unstable_by(|a, b| b.2.total_cmp(&a.2));
    for (_, u, _) in &mut truncated[..remainder] {
        *u += 1;
    }
    truncated.sort_by_key(|(i, ..)| *i);
    truncated.iter().map(|(_, u, _)| *u).collect()
}
