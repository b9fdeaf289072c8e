//! Evolutionary training of simulated robots.
//!
//! An experiment evolves neural controllers, and optionally the sensor
//! morphologies they are wired to, with one of three encodings:
//! - NEAT: direct controllers over a fixed morphology (control mode).
//! - NEATM: controllers evolved jointly with their morphologies.
//! - HyperNEATM: CPPNs queried over a robot-sensor substrate, deciding
//!   both the connection weights and which candidate sensors exist.
//!
//! A run resolves the control morphology, bootstraps (or resumes) a
//! population, binds it to a [`ScoreEvaluator`], drives generations
//! until the best score reaches
//! [`CONVERGENCE_THRESHOLD`](generation::CONVERGENCE_THRESHOLD) or the
//! generation budget runs out, and finally demonstrates the champion.
//!
//! # Example usage
//! ```no_run
//! use morphevo::config::{ExperimentConfig, SimConfig};
//! use morphevo::evaluator::ArenaEvaluator;
//!
//! let config = ExperimentConfig {
//!     generations: 10,
//!     hyper_neatm: false,
//!     ..ExperimentConfig::default()
//! };
//! let sim = SimConfig::default();
//! let evaluator = ArenaEvaluator::new(sim.clone(), config.trials);
//!
//! let report = morphevo::run(&config, &sim, &evaluator).unwrap();
//! println!("{}", report.robot);
//! ```
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod finalize;
pub mod generation;
pub mod morphology;
pub mod population;
pub mod session;
pub mod stats;
pub mod store;

#[cfg(test)]
mod test_util;

use config::{ExperimentConfig, SimConfig};
use errors::Result;
use evaluator::ScoreEvaluator;
use generation::LoopOutcome;
use stats::StatsRecorder;

use morphevo_engine::EngineRuntime;
use morphevo_nn::networks::RobotNetwork;

use std::path::PathBuf;

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// The demonstrated champion.
    pub robot: RobotNetwork,
    /// How training ended, unless a stored champion was replayed.
    pub outcome: Option<LoopOutcome>,
    /// Where stats and checkpoints were written, if anywhere.
    pub run_dir: Option<PathBuf>,
}

/// Runs one experiment: trains a population and demonstrates its
/// champion, or only replays the champion at `config.demo_path`.
///
/// The engine runtime is held for the whole run and released before
/// the champion is demonstrated, or on the first error.
///
/// # Errors
/// Returns the first fatal error of any stage.
pub fn run(
    config: &ExperimentConfig,
    sim: &SimConfig,
    evaluator: &dyn ScoreEvaluator,
) -> Result<RunReport> {
    config.validate()?;
    let mut runtime = EngineRuntime::acquire()?;

    if let Some(path) = &config.demo_path {
        log::info!("Replaying the champion stored at {}", path.display());
        let robot = finalize::demo(path, evaluator, runtime)?;
        return Ok(RunReport {
            robot,
            outcome: None,
            run_dir: None,
        });
    }

    let morphology =
        morphology::resolve(config.control_mode, config.morphology_path.as_deref())?;
    let population = bootstrap::bootstrap(config, sim, morphology)?;
    let mut recorder = StatsRecorder::create(&config.results_dir, population.encoding())?;
    let mut session = session::bind(population, evaluator, config.threads, &mut runtime)?;

    let outcome = generation::run(&mut session, config.generations, &mut recorder)?;
    let robot = finalize::finalize(session, evaluator, runtime)?;
    Ok(RunReport {
        robot,
        outcome: Some(outcome),
        run_dir: Some(recorder.run_dir().to_path_buf()),
    })
}
