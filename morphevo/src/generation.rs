//! The generation loop.
use crate::errors::Result;
use crate::session::Trainer;
use crate::stats::StatsSink;

use morphevo_engine::stats::Stats;

use std::time::{Duration, Instant};

/// Best score at which training stops.
///
/// [`ArenaEvaluator`](crate::evaluator::ArenaEvaluator) scores trials
/// in `[0, 120]`, and only trials in which the light is reached within
/// the first half of the allotted steps score 110 or more.
pub const CONVERGENCE_THRESHOLD: f32 = 110.0;

/// States of the generation loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// The best score reached the convergence threshold.
    Converged,
    /// The generation budget ran out first.
    Exhausted,
}

/// What happened in one iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    /// The iteration counter value of the generation just run.
    pub iteration: usize,
    /// Best score seen so far.
    pub best_score: f32,
    /// Wall time since the loop started.
    pub elapsed: Duration,
    /// Scores of the generation just run.
    pub stats: Option<Stats>,
    pub species_count: usize,
    pub converged: bool,
}

/// How the generation loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Either [`LoopState::Converged`] or [`LoopState::Exhausted`].
    pub state: LoopState,
    /// Iterations run by this loop.
    pub iterations_run: usize,
    /// The trainer's iteration counter at the end.
    pub iteration: usize,
}

/// Drives `trainer` from its current iteration counter until its best
/// score reaches [`CONVERGENCE_THRESHOLD`] or the counter reaches
/// `generation_budget`, recording every iteration in `sink`.
///
/// # Errors
/// Evaluation and recording failures end the loop and are returned.
pub fn run<T: Trainer>(
    trainer: &mut T,
    generation_budget: usize,
    sink: &mut dyn StatsSink,
) -> Result<LoopOutcome> {
    let start = Instant::now();
    let mut state = LoopState::Running;
    let mut iterations_run = 0;
    log::info!(
        "Training {} population from iteration {} to {}",
        trainer.encoding(),
        trainer.iteration_count(),
        generation_budget
    );

    while state == LoopState::Running {
        let iteration = trainer.iteration_count();
        if iteration >= generation_budget {
            state = LoopState::Exhausted;
            break;
        }

        trainer.iteration()?;
        iterations_run += 1;

        let best_score = trainer.best_score();
        let converged = best_score >= CONVERGENCE_THRESHOLD;
        let record = IterationRecord {
            iteration,
            best_score,
            elapsed: start.elapsed(),
            stats: trainer.fitness_stats(),
            species_count: trainer.species_count(),
            converged,
        };
        match &record.stats {
            Some(stats) => log::info!(
                "Iteration {}: best {:.2}, generation max {:.2} mean {:.2}, {} species",
                iteration,
                best_score,
                stats.maximum,
                stats.mean,
                record.species_count
            ),
            None => log::info!("Iteration {}: best {:.2}", iteration, best_score),
        }
        sink.record(&record, &*trainer)?;

        if converged {
            log::info!(
                "Convergence reached at epoch {}",
                trainer.iteration_count()
            );
            state = LoopState::Converged;
        }
    }

    if state == LoopState::Exhausted {
        log::info!(
            "Generation budget exhausted, best score {:.2}",
            trainer.best_score()
        );
    }
    Ok(LoopOutcome {
        state,
        iterations_run,
        iteration: trainer.iteration_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExperimentError;
    use crate::stats::MemorySink;
    use crate::test_util::ScriptedTrainer;

    #[test]
    fn stops_at_the_converging_iteration() {
        let mut trainer = ScriptedTrainer::new(vec![50.0, 109.9, 110.0, 115.0], 0);
        let mut sink = MemorySink::default();
        let outcome = run(&mut trainer, 10, &mut sink).unwrap();

        assert_eq!(outcome.state, LoopState::Converged);
        assert_eq!(outcome.iterations_run, 3);
        assert_eq!(outcome.iteration, 3);
        assert_eq!(trainer.calls(), 3);
        let converged: Vec<bool> = sink.records.iter().map(|r| r.converged).collect();
        assert_eq!(converged, vec![false, false, true]);
        assert_eq!(sink.records[2].best_score, 110.0);
        // The converging epoch is counted after the iteration ran.
        assert_eq!(sink.records[2].iteration, 2);
        assert_eq!(trainer.iteration_count(), 3);
    }

    #[test]
    fn exhausts_the_remaining_budget() {
        let mut trainer = ScriptedTrainer::new(vec![10.0; 20], 4);
        let mut sink = MemorySink::default();
        let outcome = run(&mut trainer, 9, &mut sink).unwrap();

        assert_eq!(outcome.state, LoopState::Exhausted);
        assert_eq!(outcome.iterations_run, 9 - 4);
        assert_eq!(outcome.iteration, 9);
        let iterations: Vec<usize> = sink.records.iter().map(|r| r.iteration).collect();
        assert_eq!(iterations, vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn spent_budget_runs_nothing() {
        let mut trainer = ScriptedTrainer::new(vec![10.0], 7);
        let mut sink = MemorySink::default();
        let outcome = run(&mut trainer, 5, &mut sink).unwrap();

        assert_eq!(outcome.state, LoopState::Exhausted);
        assert_eq!(outcome.iterations_run, 0);
        assert_eq!(trainer.calls(), 0);
        assert!(sink.records.is_empty());
    }

    #[test]
    fn evaluation_failures_end_the_loop() {
        // The script runs out after two iterations, and the trainer fails.
        let mut trainer = ScriptedTrainer::new(vec![1.0, 2.0], 0);
        let mut sink = MemorySink::default();
        assert!(matches!(
            run(&mut trainer, 10, &mut sink),
            Err(ExperimentError::Evaluation { iteration: 2, .. })
        ));
        assert_eq!(sink.records.len(), 2);
    }

    #[test]
    fn records_are_ordered_in_time() {
        let mut trainer = ScriptedTrainer::new(vec![1.0, 2.0, 3.0], 0);
        let mut sink = MemorySink::default();
        run(&mut trainer, 3, &mut sink).unwrap();
        assert!(sink
            .records
            .windows(2)
            .all(|w| w[0].elapsed <= w[1].elapsed));
    }
}
