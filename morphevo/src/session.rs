//! Training sessions: a population bound to an evaluator,
//! its codec, and a worker pool.
use crate::errors::{ExperimentError, Result};
use crate::evaluator::ScoreEvaluator;
use crate::population::{Champion, EncodedPopulation};

use morphevo_engine::stats::Stats;
use morphevo_engine::{Codec, EngineRuntime, Genome, InnovationHistory, Population};
use morphevo_nn::networks::{Encoding, RobotNetwork};
use rayon::ThreadPool;

use std::sync::Arc;

/// A trainer advanced one generation at a time.
pub trait Trainer {
    /// Returns the encoding of the trained population.
    fn encoding(&self) -> Encoding;

    /// Runs one generation: scores every individual, updates the
    /// champion, and breeds the next generation.
    ///
    /// # Errors
    /// Returns [`ExperimentError::Evaluation`] if the generation
    /// yields no usable score.
    fn iteration(&mut self) -> Result<()>;

    /// Returns the iteration counter, which only ever increases.
    fn iteration_count(&self) -> usize;

    /// Returns the best score seen so far, or 0 before any iteration.
    fn best_score(&self) -> f32;

    /// Returns the score statistics of the last generation run.
    fn fitness_stats(&self) -> Option<Stats>;

    /// Returns the number of species of the last generation run.
    fn species_count(&self) -> usize;

    /// Returns the best individual seen so far.
    fn champion(&self) -> Option<&Champion>;

    /// Returns the trained population, if the trainer has one
    /// that can be stored and resumed.
    fn population(&self) -> Option<&EncodedPopulation>;
}

/// A population bound to a [`ScoreEvaluator`] and a worker pool.
pub struct TrainingSession<'a> {
    population: EncodedPopulation,
    evaluator: &'a dyn ScoreEvaluator,
    pool: Arc<ThreadPool>,
    champion: Option<Champion>,
    last_stats: Option<Stats>,
    last_species_count: usize,
}

/// Binds a population to an evaluator and to a worker pool of
/// `threads` threads (every available processor if 0) built by
/// `runtime`.
///
/// # Errors
/// Returns an error if the population is empty or the worker
/// pool cannot be built.
pub fn bind<'a>(
    population: EncodedPopulation,
    evaluator: &'a dyn ScoreEvaluator,
    threads: usize,
    runtime: &mut EngineRuntime,
) -> Result<TrainingSession<'a>> {
    if population.genome_count() == 0 {
        return Err(ExperimentError::Precondition(
            "cannot train an empty population".into(),
        ));
    }
    match &population {
        EncodedPopulation::Neat { codec, .. } => log::info!(
            "Binding NEAT trainer over a fixed {}-sensor morphology",
            codec.morphology().sensor_count()
        ),
        EncodedPopulation::Neatm { .. } => {
            log::info!("Binding NEATM trainer over evolved morphologies")
        }
        EncodedPopulation::HyperNeatm { codec, .. } => log::info!(
            "Binding HyperNEATM trainer over a substrate of {} candidate sensors",
            codec.substrate().input_count()
        ),
    }

    log::info!(
        "Available processors: {}",
        EngineRuntime::available_processors()
    );
    let pool = runtime.worker_pool(threads)?;
    log::info!("Evaluating on {} worker threads", pool.current_num_threads());

    Ok(TrainingSession {
        population,
        evaluator,
        pool,
        champion: None,
        last_stats: None,
        last_species_count: 0,
    })
}

/// What a generation produced, before it was bred.
struct GenerationReport<G> {
    stats: Option<Stats>,
    species_count: usize,
    best: Option<G>,
}

/// Scores every genome on the pool, then breeds the next generation.
fn run_generation<C, H, G, D>(
    population: &mut Population<C, H, G>,
    codec: &D,
    evaluator: &dyn ScoreEvaluator,
    pool: &ThreadPool,
) -> Result<GenerationReport<G>>
where
    G: Genome<Config = C, InnovationHistory = H> + Clone + Send,
    H: InnovationHistory<Config = C>,
    D: Codec<G, Output = RobotNetwork> + Sync,
{
    let iteration = population.generation();
    let genome_count = population.genomes().count();
    let failures =
        population.evaluate_fitness_par(pool, |genome| evaluator.score(&codec.decode(genome)));

    if failures.len() == genome_count {
        return Err(ExperimentError::Evaluation {
            iteration,
            reason: match failures.first() {
                Some(e) => format!("no individual could be scored ({})", e),
                None => "the population is empty".into(),
            },
        });
    }
    if let Some(e) = failures.first() {
        log::warn!(
            "{} of {} individuals could not be scored: {}",
            failures.len(),
            genome_count,
            e
        );
    }

    let report = GenerationReport {
        stats: Stats::from(population.genomes().map(|g| g.fitness())),
        species_count: population.species().count(),
        best: population.champion().cloned(),
    };
    population
        .evolve()
        .map_err(|e| ExperimentError::Evaluation {
            iteration,
            reason: e.to_string(),
        })?;
    Ok(report)
}

impl TrainingSession<'_> {
    /// Keeps `candidate` as the champion if it beats the current one.
    fn offer_champion(&mut self, candidate: Option<Champion>) {
        if let Some(candidate) = candidate {
            if self
                .champion
                .as_ref()
                .map_or(true, |c| candidate.fitness() > c.fitness())
            {
                log::debug!("New champion with score {:.3}", candidate.fitness());
                self.champion = Some(candidate);
            }
        }
    }

    /// Consumes the session, returning the best individual seen.
    pub fn into_champion(self) -> Option<Champion> {
        self.champion
    }
}

impl Trainer for TrainingSession<'_> {
    fn encoding(&self) -> Encoding {
        self.population.encoding()
    }

    fn iteration(&mut self) -> Result<()> {
        let evaluator = self.evaluator;
        let pool = Arc::clone(&self.pool);
        let (stats, species_count, candidate) = match &mut self.population {
            EncodedPopulation::Neat { population, codec } => {
                let report = run_generation(population, &*codec, evaluator, &pool)?;
                let candidate = report.best.map(|genome| Champion::Neat {
                    genome,
                    codec: codec.clone(),
                });
                (report.stats, report.species_count, candidate)
            }
            EncodedPopulation::Neatm { population, codec } => {
                let report = run_generation(population, &*codec, evaluator, &pool)?;
                let candidate = report.best.map(|genome| Champion::Neatm {
                    genome,
                    codec: *codec,
                });
                (report.stats, report.species_count, candidate)
            }
            EncodedPopulation::HyperNeatm { population, codec } => {
                let report = run_generation(population, &*codec, evaluator, &pool)?;
                let candidate = report.best.map(|genome| Champion::HyperNeatm {
                    genome,
                    codec: codec.clone(),
                });
                (report.stats, report.species_count, candidate)
            }
        };
        self.last_stats = stats;
        self.last_species_count = species_count;
        self.offer_champion(candidate);
        Ok(())
    }

    fn iteration_count(&self) -> usize {
        self.population.generation()
    }

    fn best_score(&self) -> f32 {
        self.champion.as_ref().map_or(0.0, Champion::fitness)
    }

    fn fitness_stats(&self) -> Option<Stats> {
        self.last_stats
    }

    fn species_count(&self) -> usize {
        self.last_species_count
    }

    fn champion(&self) -> Option<&Champion> {
        self.champion.as_ref()
    }

    fn population(&self) -> Option<&EncodedPopulation> {
        Some(&self.population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationError;
    use crate::test_util::{exclusive_runtime, ConstantEvaluator, FailingEvaluator};
    use morphevo_engine::PopulationConfig;
    use morphevo_nn::codecs::{HyperNeatmCodec, NeatCodec, NeatmCodec};
    use morphevo_nn::genomics::{GeneticConfig, MorphConfig};
    use morphevo_nn::morphology::SensorMorphology;
    use morphevo_nn::substrate::Substrate;
    use std::num::NonZeroUsize;

    fn config(size: usize) -> PopulationConfig {
        PopulationConfig::robot_defaults(NonZeroUsize::new(size).unwrap())
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn all_variants() -> Vec<EncodedPopulation> {
        let mut neat = Population::new(config(6), GeneticConfig::controller(nz(8), nz(2)));
        neat.reset();
        let mut neatm = Population::new(
            config(6),
            MorphConfig {
                network: GeneticConfig::controller(nz(4), nz(2)),
                ..MorphConfig::zero()
            },
        );
        neatm.reset();
        let mut cppns = Population::new(config(6), GeneticConfig::cppn(nz(5), nz(2)));
        cppns.reset();
        vec![
            EncodedPopulation::Neat {
                population: neat,
                codec: NeatCodec::new(SensorMorphology::khepera_iii()),
            },
            EncodedPopulation::Neatm {
                population: neatm,
                codec: NeatmCodec,
            },
            EncodedPopulation::HyperNeatm {
                population: cppns,
                codec: HyperNeatmCodec::new(Substrate::khepera(0.05, 0.1).unwrap()),
            },
        ]
    }

    #[test]
    fn every_variant_binds_to_its_own_encoding() {
        let (_lock, mut runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(5.0);
        for population in all_variants() {
            let encoding = population.encoding();
            let mut session = bind(population, &evaluator, 2, &mut runtime).unwrap();
            assert_eq!(session.encoding(), encoding);

            session.iteration().unwrap();
            assert_eq!(session.iteration_count(), 1);
            assert_eq!(session.best_score(), 5.0);
            let champion = session.champion().unwrap();
            assert_eq!(champion.encoding(), encoding);
            assert_eq!(champion.decode().encoding(), encoding);
        }
    }

    #[test]
    fn stats_describe_the_last_generation() {
        let (_lock, mut runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(2.0);
        let population = all_variants().remove(1);
        let mut session = bind(population, &evaluator, 1, &mut runtime).unwrap();
        assert!(session.fitness_stats().is_none());
        assert_eq!(session.best_score(), 0.0);

        session.iteration().unwrap();
        let stats = session.fitness_stats().unwrap();
        assert_eq!(stats.maximum, 2.0);
        assert_eq!(stats.mean, 2.0);
        assert!(session.species_count() >= 1);
    }

    #[test]
    fn unscoreable_generation_is_fatal() {
        let (_lock, mut runtime) = exclusive_runtime();
        let evaluator = FailingEvaluator(EvaluationError::Unscoreable("broken".into()));
        let population = all_variants().remove(0);
        let mut session = bind(population, &evaluator, 2, &mut runtime).unwrap();
        assert!(matches!(
            session.iteration(),
            Err(ExperimentError::Evaluation { iteration: 0, .. })
        ));
        assert_eq!(session.iteration_count(), 0);
        assert!(session.champion().is_none());
    }

    #[test]
    fn zero_score_generation_evolves() {
        let (_lock, mut runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(0.0);
        for population in all_variants() {
            let encoding = population.encoding();
            let mut session = bind(population, &evaluator, 2, &mut runtime).unwrap();
            session.iteration().unwrap();
            session.iteration().unwrap();
            assert_eq!(session.iteration_count(), 2, "{:?}", encoding);
            assert_eq!(session.best_score(), 0.0);
            assert_eq!(session.fitness_stats().unwrap().maximum, 0.0);
        }
    }

    #[test]
    fn invalid_scores_are_fatal_without_panicking() {
        let (_lock, mut runtime) = exclusive_runtime();
        for score in [f32::NAN, -1.0, f32::INFINITY] {
            let evaluator = ConstantEvaluator::new(score);
            let population = all_variants().remove(1);
            let mut session = bind(population, &evaluator, 2, &mut runtime).unwrap();
            match session.iteration() {
                Err(ExperimentError::Evaluation { iteration, reason }) => {
                    assert_eq!(iteration, 0);
                    assert!(reason.contains("invalid score"), "{}", reason);
                }
                other => panic!("expected an evaluation error, got {:?}", other),
            }
            assert_eq!(session.iteration_count(), 0);
        }
    }

    #[test]
    fn neatm_sensor_counts_evolve() {
        let (_lock, mut runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(1.0);
        let mut population = Population::new(
            config(12),
            MorphConfig {
                sensor_addition_chance: 0.5,
                sensor_deletion_chance: 0.5,
                ..crate::bootstrap::morph_config(nz(4))
            },
        );
        population.reset();
        let population = EncodedPopulation::Neatm {
            population,
            codec: NeatmCodec,
        };
        let mut session = bind(population, &evaluator, 2, &mut runtime).unwrap();

        let mut counts = std::collections::BTreeSet::new();
        for _ in 0..6 {
            session.iteration().unwrap();
            let population = session.population().unwrap();
            assert_eq!(population.validate(), Ok(()));
            match population {
                EncodedPopulation::Neatm { population, .. } => counts.extend(
                    population
                        .genomes()
                        .map(|g| g.morphology().sensor_count()),
                ),
                _ => panic!("expected a NEATM population"),
            }
        }
        assert!(counts.len() > 1, "sensor counts never changed: {:?}", counts);
        assert!(session.champion().unwrap().is_decodable());
    }

    #[test]
    fn empty_populations_cannot_be_bound() {
        let (_lock, mut runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(1.0);
        let population = EncodedPopulation::Neatm {
            population: Population::new(config(3), MorphConfig::zero()),
            codec: NeatmCodec,
        };
        assert!(matches!(
            bind(population, &evaluator, 1, &mut runtime),
            Err(ExperimentError::Precondition(_))
        ));
    }
}
