//! End of a run: runtime shutdown, champion decoding and demonstration.
use crate::errors::{ExperimentError, Result};
use crate::evaluator::ScoreEvaluator;
use crate::population::Champion;
use crate::session::Trainer;
use crate::store;

use morphevo_engine::EngineRuntime;
use morphevo_nn::networks::RobotNetwork;

use std::path::Path;

/// Ends a training run.
///
/// The session is dropped and the engine runtime shut down before
/// the champion is decoded and demonstrated, so the demonstration
/// never runs on the worker pools.
///
/// # Errors
/// Returns [`ExperimentError::Precondition`] if the session
/// never produced a champion.
pub fn finalize<T: Trainer>(
    session: T,
    evaluator: &dyn ScoreEvaluator,
    runtime: EngineRuntime,
) -> Result<RobotNetwork> {
    let champion = session.champion().cloned();
    drop(session);
    runtime.shutdown();

    let champion = champion.ok_or_else(|| {
        ExperimentError::Precondition("training produced no champion".into())
    })?;
    log::info!(
        "Best {} individual scored {:.3}",
        champion.encoding(),
        champion.fitness()
    );
    Ok(present(&champion, evaluator))
}

/// Replays the champion stored at `path` without training.
///
/// # Errors
/// Returns [`ExperimentError::Deserialization`] if the champion
/// cannot be read or cannot be decoded by its own codec.
pub fn demo(
    path: &Path,
    evaluator: &dyn ScoreEvaluator,
    runtime: EngineRuntime,
) -> Result<RobotNetwork> {
    runtime.shutdown();

    let champion: Champion = store::load(path)?;
    if !champion.is_decodable() {
        return Err(ExperimentError::Deserialization {
            path: path.to_path_buf(),
            reason: format!(
                "the {} genome does not fit its own codec",
                champion.encoding()
            ),
        });
    }
    log::info!(
        "Loaded {} champion scoring {:.3} from {}",
        champion.encoding(),
        champion.fitness(),
        path.display()
    );
    Ok(present(&champion, evaluator))
}

fn present(champion: &Champion, evaluator: &dyn ScoreEvaluator) -> RobotNetwork {
    let robot = champion.decode();
    evaluator.demo(&robot);
    robot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{exclusive_runtime, ConstantEvaluator, ScriptedTrainer};
    use morphevo_nn::codecs::NeatCodec;
    use morphevo_nn::genomics::{GeneticConfig, NNGenome};
    use morphevo_nn::morphology::SensorMorphology;
    use morphevo_nn::networks::Encoding;
    use std::num::NonZeroUsize;

    fn champion(sensors: usize) -> Champion {
        let mut genome = NNGenome::new(&GeneticConfig::controller(
            NonZeroUsize::new(sensors).unwrap(),
            NonZeroUsize::new(2).unwrap(),
        ));
        genome.set_fitness(42.0);
        Champion::Neat {
            genome,
            codec: NeatCodec::new(SensorMorphology::khepera_iii()),
        }
    }

    #[test]
    fn finalize_without_champion_still_shuts_down() {
        let (_lock, runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(1.0);
        let trainer = ScriptedTrainer::new(vec![], 0);
        assert!(matches!(
            finalize(trainer, &evaluator, runtime),
            Err(ExperimentError::Precondition(_))
        ));
        assert!(!EngineRuntime::is_active());
        assert_eq!(evaluator.demos(), 0);
    }

    #[test]
    fn finalize_demonstrates_the_session_champion() {
        use crate::population::EncodedPopulation;
        use crate::session::bind;
        use morphevo_engine::{Population, PopulationConfig};

        let (_lock, mut runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(3.0);
        let mut population = Population::new(
            PopulationConfig::robot_defaults(NonZeroUsize::new(4).unwrap()),
            GeneticConfig::controller(
                NonZeroUsize::new(8).unwrap(),
                NonZeroUsize::new(2).unwrap(),
            ),
        );
        population.reset();
        let population = EncodedPopulation::Neat {
            population,
            codec: NeatCodec::new(SensorMorphology::khepera_iii()),
        };
        let mut session = bind(population, &evaluator, 1, &mut runtime).unwrap();
        session.iteration().unwrap();

        let robot = finalize(session, &evaluator, runtime).unwrap();
        assert!(!EngineRuntime::is_active());
        assert_eq!(robot.encoding(), Encoding::Neat);
        assert_eq!(evaluator.demos(), 1);
    }

    #[test]
    fn demo_replays_a_stored_champion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("champion.ron");
        store::save(&path, &champion(8)).unwrap();

        let (_lock, runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(1.0);
        let robot = demo(&path, &evaluator, runtime).unwrap();
        assert!(!EngineRuntime::is_active());
        assert_eq!(robot.encoding(), Encoding::Neat);
        assert_eq!(robot.morphology(), &SensorMorphology::khepera_iii());
        assert_eq!(evaluator.demos(), 1);
    }

    #[test]
    fn undecodable_champion_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("champion.ron");
        store::save(&path, &champion(3)).unwrap();

        let (_lock, runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(1.0);
        assert!(matches!(
            demo(&path, &evaluator, runtime),
            Err(ExperimentError::Deserialization { .. })
        ));
        assert!(!EngineRuntime::is_active());
        assert_eq!(evaluator.demos(), 0);
    }

    #[test]
    fn missing_champion_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (_lock, runtime) = exclusive_runtime();
        let evaluator = ConstantEvaluator::new(1.0);
        assert!(matches!(
            demo(&dir.path().join("nothing.ron"), &evaluator, runtime),
            Err(ExperimentError::Deserialization { .. })
        ));
    }
}
