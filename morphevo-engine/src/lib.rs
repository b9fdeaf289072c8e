//! A generational NeuroEvolution of Augmenting Topologies engine,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! The engine is generic over the genomic structure via the [`Genome`]
//! trait, so the same speciation and reproduction machinery drives
//! direct neural genomes, morphology-augmented genomes and the CPPNs
//! of indirect encodings. Concrete genomes and their decoders live in
//! the `morphevo-nn` crate.
//!
//! Besides the [`Population`] itself, the crate provides:
//! - [`EngineRuntime`]: the process-wide runtime owning the worker
//!   pools fitness evaluation fans out on. It is a scoped resource,
//!   released exactly once.
//! - [`Codec`]: the interface for decoding a genome into its phenotype.
//! - [`stats::Stats`]: summary statistics over a generation.
//!
//! # Example usage
//! ```
//! use morphevo_engine::{EngineRuntime, InvalidFitness, Population, PopulationConfig};
//! use morphevo_nn::genomics::{GeneticConfig, NNGenome};
//! use std::num::NonZeroUsize;
//!
//! let genetic_config = GeneticConfig {
//!     input_count: NonZeroUsize::new(2).unwrap(),
//!     output_count: NonZeroUsize::new(1).unwrap(),
//!     initial_expression_chance: 1.0,
//!     weight_bound: 5.0,
//!     weight_nudge_chance: 0.9,
//!     weight_mutation_power: 2.5,
//!     child_mutation_chance: 0.5,
//!     ..GeneticConfig::zero()
//! };
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(20).unwrap(),
//!     distance_threshold: 3.0,
//!     elitism: 1,
//!     survival_threshold: 0.5,
//!     sexual_reproduction_chance: 0.6,
//!     ..PopulationConfig::zero()
//! };
//!
//! let mut runtime = EngineRuntime::acquire().unwrap();
//! let pool = runtime.worker_pool(2).unwrap();
//!
//! let mut population = Population::<_, _, NNGenome>::new(population_config, genetic_config);
//! population.reset();
//! for _ in 0..5 {
//!     let failures = population.evaluate_fitness_par(&pool, |g| {
//!         Ok::<_, InvalidFitness>(g.genes().map(|gene| gene.weight().abs()).sum::<f32>())
//!     });
//!     assert!(failures.is_empty());
//!     population.evolve().unwrap();
//! }
//! assert_eq!(population.generation(), 5);
//! runtime.shutdown();
//! ```

mod codec;
mod genome;
mod populations;
mod runtime;
pub mod stats;

pub use codec::Codec;
pub use genome::*;
pub use populations::*;
pub use runtime::{EngineRuntime, RuntimeError};
