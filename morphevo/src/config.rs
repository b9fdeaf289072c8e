//! Experiment options and the simulation configuration.
//!
//! The simulation configuration is stored as RON, by default at
//! [`DEFAULT_SIM_CONFIG_PATH`].
use crate::errors::{ExperimentError, Result};
use crate::store;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Location of the simulation configuration when none is given.
pub const DEFAULT_SIM_CONFIG_PATH: &str = "config/simConfig.ron";

/// The options of one experiment run.
///
/// If `demo_path` is set, training is skipped entirely
/// and the stored champion is replayed instead.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentConfig {
    /// Simulation configuration file.
    pub sim_config_path: PathBuf,
    /// Iteration counter value at which training stops.
    pub generations: usize,
    /// Size of freshly created populations.
    pub population_size: usize,
    /// Trials each individual is scored over.
    pub trials: usize,
    /// Chance of each initial gene being expressed.
    pub connection_density: f32,
    /// Stored champion to replay.
    pub demo_path: Option<PathBuf>,
    /// Evolve controllers only, over a fixed morphology.
    pub control_mode: bool,
    /// Stored robot network whose morphology is reused in control mode.
    pub morphology_path: Option<PathBuf>,
    /// Use the HyperNEATM encoding.
    pub hyper_neatm: bool,
    /// Stored population to resume.
    pub population_path: Option<PathBuf>,
    /// Worker threads; 0 uses every available processor.
    pub threads: usize,
    /// Directory stats and checkpoints are written to.
    pub results_dir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> ExperimentConfig {
        ExperimentConfig {
            sim_config_path: PathBuf::from(DEFAULT_SIM_CONFIG_PATH),
            generations: 50,
            population_size: 75,
            trials: 3,
            connection_density: 0.5,
            demo_path: None,
            control_mode: false,
            morphology_path: None,
            hyper_neatm: true,
            population_path: None,
            threads: 0,
            results_dir: PathBuf::from("results"),
        }
    }
}

impl ExperimentConfig {
    /// Checks the options that do not depend on any input file.
    ///
    /// # Errors
    /// Returns [`ExperimentError::Precondition`] naming the first
    /// invalid option.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.connection_density) {
            return Err(ExperimentError::Precondition(format!(
                "--conn-density must lie in [0, 1], got {}",
                self.connection_density
            )));
        }
        if self.population_size == 0 {
            return Err(ExperimentError::Precondition(
                "-p must be at least 1".into(),
            ));
        }
        if self.trials == 0 {
            return Err(ExperimentError::Precondition(
                "--trials must be at least 1".into(),
            ));
        }
        if self.morphology_path.is_some() && !self.control_mode {
            log::warn!("--morphology is only used in control mode; ignoring it");
        }
        Ok(())
    }

    /// Returns the population size as a nonzero count.
    ///
    /// # Errors
    /// Returns [`ExperimentError::Precondition`] if the size is 0.
    pub fn population_size(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.population_size)
            .ok_or_else(|| ExperimentError::Precondition("-p must be at least 1".into()))
    }

    /// Logs every option.
    pub fn log_options(&self) {
        fn path_or_none(path: &Option<PathBuf>) -> String {
            path.as_ref()
                .map_or_else(|| "none".into(), |p| p.display().to_string())
        }
        log::info!("Simulation config: {}", self.sim_config_path.display());
        log::info!("Generations: {}", self.generations);
        log::info!("Population size: {}", self.population_size);
        log::info!("Trials per individual: {}", self.trials);
        log::info!("Initial connection density: {}", self.connection_density);
        log::info!("Demo genome: {}", path_or_none(&self.demo_path));
        log::info!("Control mode: {}", self.control_mode);
        log::info!("Morphology: {}", path_or_none(&self.morphology_path));
        log::info!("HyperNEATM: {}", self.hyper_neatm);
        log::info!("Resume population: {}", path_or_none(&self.population_path));
        log::info!(
            "Threads: {}",
            match self.threads {
                0 => "auto".to_string(),
                n => n.to_string(),
            }
        );
        log::info!("Results directory: {}", self.results_dir.display());
    }
}

/// Parameters of the simulated arena and robot.
///
/// Lengths are in meters, and durations in control steps.
/// Missing fields take their [default](SimConfig::default) values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side of the square arena.
    pub arena_size: f32,
    /// Radius of the round robot body.
    pub robot_radius: f32,
    /// Minimum spacing of candidate sensors along the body.
    pub min_dist_between_sensors: f32,
    /// Control steps per trial.
    pub steps_per_trial: usize,
    /// Distance a wheel covers in one step at full speed.
    pub wheel_speed: f32,
    /// Distance to the light at which a trial succeeds.
    pub target_radius: f32,
    /// Seed of the trial layouts.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> SimConfig {
        SimConfig {
            arena_size: 2.0,
            robot_radius: 0.1,
            min_dist_between_sensors: 0.05,
            steps_per_trial: 300,
            wheel_speed: 0.02,
            target_radius: 0.15,
            seed: 42,
        }
    }
}

impl SimConfig {
    /// Loads the simulation configuration stored at `path`.
    ///
    /// If `path` is the [default path](DEFAULT_SIM_CONFIG_PATH)
    /// and no such file exists, the built-in defaults are used.
    ///
    /// # Errors
    /// Returns an error if the file cannot be decoded, if a
    /// non-default path does not exist, or if the loaded values
    /// are not usable.
    pub fn load(path: &Path) -> Result<SimConfig> {
        let config = if path == Path::new(DEFAULT_SIM_CONFIG_PATH) && !path.exists() {
            log::info!(
                "{} not found, using built-in simulation defaults",
                path.display()
            );
            SimConfig::default()
        } else {
            store::load(path)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every length and count is positive.
    ///
    /// # Errors
    /// Returns [`ExperimentError::Precondition`] naming the first
    /// invalid value.
    pub fn validate(&self) -> Result<()> {
        let lengths = [
            ("arena_size", self.arena_size),
            ("robot_radius", self.robot_radius),
            ("min_dist_between_sensors", self.min_dist_between_sensors),
            ("wheel_speed", self.wheel_speed),
            ("target_radius", self.target_radius),
        ];
        if let Some((name, value)) = lengths
            .iter()
            .find(|(_, v)| !(v.is_finite() && *v > 0.0))
        {
            return Err(ExperimentError::Precondition(format!(
                "simulation {} must be positive, got {}",
                name, value
            )));
        }
        if self.steps_per_trial == 0 {
            return Err(ExperimentError::Precondition(
                "simulation steps_per_trial must be at least 1".into(),
            ));
        }
        if self.arena_size <= 4.0 * self.robot_radius {
            return Err(ExperimentError::Precondition(format!(
                "arena of size {} is too small for a robot of radius {}",
                self.arena_size, self.robot_radius
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ExperimentConfig::default().validate().is_ok());
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_options() {
        let density = ExperimentConfig {
            connection_density: 1.5,
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            density.validate(),
            Err(ExperimentError::Precondition(_))
        ));

        let size = ExperimentConfig {
            population_size: 0,
            ..ExperimentConfig::default()
        };
        assert!(size.validate().is_err());
        assert!(size.population_size().is_err());

        let trials = ExperimentConfig {
            trials: 0,
            ..ExperimentConfig::default()
        };
        assert!(trials.validate().is_err());
    }

    #[test]
    fn partial_sim_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.ron");
        std::fs::write(&path, "(arena_size: 3.0, seed: 7)").unwrap();

        let config = SimConfig::load(&path).unwrap();
        assert_eq!(config.arena_size, 3.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.robot_radius, SimConfig::default().robot_radius);
    }

    #[test]
    fn explicit_missing_sim_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SimConfig::load(&dir.path().join("absent.ron")),
            Err(ExperimentError::Deserialization { .. })
        ));
    }

    #[test]
    fn invalid_sim_values() {
        let config = SimConfig {
            robot_radius: -0.1,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());

        let cramped = SimConfig {
            arena_size: 0.3,
            ..SimConfig::default()
        };
        assert!(cramped.validate().is_err());
    }
}
