//! Fakes shared by the unit tests.
use crate::errors::{ExperimentError, Result};
use crate::evaluator::{EvaluationError, ScoreEvaluator};
use crate::population::{Champion, EncodedPopulation};
use crate::session::Trainer;

use morphevo_engine::stats::Stats;
use morphevo_engine::EngineRuntime;
use morphevo_nn::networks::{Encoding, RobotNetwork};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

static RUNTIME_LOCK: Mutex<()> = Mutex::new(());

/// Acquires the engine runtime, waiting for other tests to release it.
pub(crate) fn exclusive_runtime() -> (MutexGuard<'static, ()>, EngineRuntime) {
    let lock = RUNTIME_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let runtime = EngineRuntime::acquire().unwrap();
    (lock, runtime)
}

/// Gives every robot the same score, counting demos.
#[derive(Debug)]
pub(crate) struct ConstantEvaluator(f32, AtomicUsize);

impl ConstantEvaluator {
    pub(crate) fn new(score: f32) -> ConstantEvaluator {
        ConstantEvaluator(score, AtomicUsize::new(0))
    }

    pub(crate) fn demos(&self) -> usize {
        self.1.load(Ordering::SeqCst)
    }
}

impl ScoreEvaluator for ConstantEvaluator {
    fn score(&self, _robot: &RobotNetwork) -> std::result::Result<f32, EvaluationError> {
        Ok(self.0)
    }

    fn demo(&self, _robot: &RobotNetwork) {
        self.1.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fails to score any robot.
pub(crate) struct FailingEvaluator(pub EvaluationError);

impl ScoreEvaluator for FailingEvaluator {
    fn score(&self, _robot: &RobotNetwork) -> std::result::Result<f32, EvaluationError> {
        Err(self.0.clone())
    }

    fn demo(&self, _robot: &RobotNetwork) {}
}

/// A trainer whose best score follows a script. It fails
/// once the script runs out.
pub(crate) struct ScriptedTrainer {
    scores: Vec<f32>,
    counter: usize,
    calls: usize,
    best: f32,
}

impl ScriptedTrainer {
    pub(crate) fn new(scores: Vec<f32>, start: usize) -> ScriptedTrainer {
        ScriptedTrainer {
            scores,
            counter: start,
            calls: 0,
            best: 0.0,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls
    }
}

impl Trainer for ScriptedTrainer {
    fn encoding(&self) -> Encoding {
        Encoding::Neatm
    }

    fn iteration(&mut self) -> Result<()> {
        let score = *self
            .scores
            .get(self.calls)
            .ok_or_else(|| ExperimentError::Evaluation {
                iteration: self.counter,
                reason: "script exhausted".into(),
            })?;
        self.best = self.best.max(score);
        self.counter += 1;
        self.calls += 1;
        Ok(())
    }

    fn iteration_count(&self) -> usize {
        self.counter
    }

    fn best_score(&self) -> f32 {
        self.best
    }

    fn fitness_stats(&self) -> Option<Stats> {
        let last = self.calls.checked_sub(1)?;
        Stats::from(std::iter::once(self.scores[last]))
    }

    fn species_count(&self) -> usize {
        1
    }

    fn champion(&self) -> Option<&Champion> {
        None
    }

    fn population(&self) -> Option<&EncodedPopulation> {
        None
    }
}
