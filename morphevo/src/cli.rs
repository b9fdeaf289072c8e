//! Command-line options.
use crate::config::{ExperimentConfig, DEFAULT_SIM_CONFIG_PATH};

use clap::{ArgAction, Parser};

use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Simulation configuration file, in RON. Defaults to
    /// config/simConfig.ron, which replaces the YAML config/bossConfig.yml
    #[clap(short = 'c', long = "config", default_value = DEFAULT_SIM_CONFIG_PATH)]
    sim_config: PathBuf,
    /// Iteration at which training stops
    #[clap(short = 'g', long = "generations", default_value_t = 50)]
    generations: usize,
    /// Size of a freshly created population
    #[clap(short = 'p', long = "population-size", default_value_t = 75)]
    population_size: usize,
    /// Trials each individual is scored over
    #[clap(long, default_value_t = 3)]
    trials: usize,
    /// Chance of each initial connection being expressed
    #[clap(long = "conn-density", default_value_t = 0.5)]
    conn_density: f32,
    /// Replay a stored champion instead of training
    #[clap(long)]
    demo: Option<PathBuf>,
    /// Evolve controllers over a fixed morphology
    #[clap(long, default_value_t = false)]
    control: bool,
    /// Stored robot network whose morphology is used in control mode
    #[clap(long)]
    morphology: Option<PathBuf>,
    /// Use the HyperNEATM encoding
    #[clap(
        long = "HyperNEATM",
        action = ArgAction::Set,
        default_value_t = true,
        value_name = "BOOL"
    )]
    hyper_neatm: bool,
    /// Stored population to resume training
    #[clap(long)]
    population: Option<PathBuf>,
    /// Worker threads (0 uses every available processor)
    #[clap(long, default_value_t = 0)]
    threads: usize,
    /// Directory results are written to
    #[clap(long = "results-dir", default_value = "results")]
    results_dir: PathBuf,
    /// Log at debug level
    #[clap(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Converts the parsed options into an experiment configuration.
    pub fn into_config(self) -> ExperimentConfig {
        let Cli {
            sim_config,
            generations,
            population_size,
            trials,
            conn_density,
            demo,
            control,
            morphology,
            hyper_neatm,
            population,
            threads,
            results_dir,
            verbose: _,
        } = self;
        ExperimentConfig {
            sim_config_path: sim_config,
            generations,
            population_size,
            trials,
            connection_density: conn_density,
            demo_path: demo,
            control_mode: control,
            morphology_path: morphology,
            hyper_neatm,
            population_path: population,
            threads,
            results_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("morphevo").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_the_experiment_defaults() {
        let cli = parse(&[]);
        assert!(!cli.verbose);
        assert_eq!(cli.into_config(), ExperimentConfig::default());
    }

    #[test]
    fn every_option_is_forwarded() {
        let config = parse(&[
            "-c",
            "sim.ron",
            "-g",
            "7",
            "-p",
            "10",
            "--trials",
            "5",
            "--conn-density",
            "0.25",
            "--demo",
            "champion.ron",
            "--control",
            "--morphology",
            "robot.ron",
            "--HyperNEATM",
            "false",
            "--population",
            "population.ron",
            "--threads",
            "4",
            "--results-dir",
            "out",
        ])
        .into_config();
        assert_eq!(
            config,
            ExperimentConfig {
                sim_config_path: "sim.ron".into(),
                generations: 7,
                population_size: 10,
                trials: 5,
                connection_density: 0.25,
                demo_path: Some("champion.ron".into()),
                control_mode: true,
                morphology_path: Some("robot.ron".into()),
                hyper_neatm: false,
                population_path: Some("population.ron".into()),
                threads: 4,
                results_dir: "out".into(),
            }
        );
    }

    #[test]
    fn hyper_neatm_takes_an_explicit_value() {
        assert!(parse(&["--HyperNEATM", "true"]).hyper_neatm);
        assert!(!parse(&["--HyperNEATM=false"]).hyper_neatm);
        assert!(Cli::try_parse_from(["morphevo", "--HyperNEATM", "maybe"]).is_err());
    }

    #[test]
    fn help_names_the_ron_config_default() {
        use clap::CommandFactory;
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("config/simConfig.ron"));
        assert!(help.contains("bossConfig.yml"));
    }

    #[test]
    fn verbose_has_a_short_form() {
        assert!(parse(&["-v"]).verbose);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(Cli::try_parse_from(["morphevo", "-g", "many"]).is_err());
        assert!(Cli::try_parse_from(["morphevo", "--conn-density", "dense"]).is_err());
    }
}
