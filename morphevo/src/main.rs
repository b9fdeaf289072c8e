use anyhow::Context;
use clap::Parser;

use morphevo::cli::Cli;
use morphevo::config::SimConfig;
use morphevo::evaluator::ArenaEvaluator;
use morphevo::generation::LoopState;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let config = cli.into_config();
    config.log_options();

    let result = SimConfig::load(&config.sim_config_path)
        .with_context(|| {
            format!(
                "failed to load the simulation config {}",
                config.sim_config_path.display()
            )
        })
        .and_then(|sim| {
            let evaluator = ArenaEvaluator::new(sim.clone(), config.trials);
            morphevo::run(&config, &sim, &evaluator).context("experiment failed")
        });

    match result {
        Ok(report) => {
            match report.outcome {
                Some(outcome) if outcome.state == LoopState::Converged => log::info!(
                    "Converged after {} iterations at iteration {}",
                    outcome.iterations_run,
                    outcome.iteration
                ),
                Some(outcome) => log::info!(
                    "Stopped without converging after {} iterations",
                    outcome.iterations_run
                ),
                None => {}
            }
            if let Some(dir) = report.run_dir {
                log::info!("Results written to {}", dir.display());
            }
            Ok(())
        }
        Err(e) => {
            log::error!("{:#}", e);
            Err(e)
        }
    }
}
