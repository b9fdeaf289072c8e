use crate::config::{ExperimentConfig, SimConfig};
use crate::errors::{ExperimentError, Result};
use crate::population::{EncodedPopulation, WHEEL_COUNT};
use crate::store;

use morphevo_engine::{Population, PopulationConfig};
use morphevo_nn::codecs::{
    HyperNeatmCodec, NeatCodec, NeatmCodec, CPPN_INPUT_COUNT, CPPN_OUTPUT_COUNT,
};
use morphevo_nn::genomics::{GeneticConfig, MorphConfig};
use morphevo_nn::morphology::{SensorMorphology, KHEPERA_III_SENSOR_COUNT};
use morphevo_nn::substrate::Substrate;

use std::num::NonZeroUsize;
use std::path::Path;

/// Returns the configuration of morphology-augmented genomes
/// starting with `sensor_count` sensors.
pub fn morph_config(sensor_count: NonZeroUsize) -> MorphConfig {
    MorphConfig {
        network: GeneticConfig::controller(sensor_count, wheels()),
        sensor_mutation_chance: 0.2,
        sensor_mutation_power: 0.1,
        morphology_distance_factor: 0.5,
        sensor_addition_chance: 0.05,
        sensor_deletion_chance: 0.05,
    }
}

fn wheels() -> NonZeroUsize {
    NonZeroUsize::new(WHEEL_COUNT).unwrap_or(NonZeroUsize::MIN)
}

/// Returns the population to train: the stored one if a resume
/// path is set, otherwise a fresh one of the configured encoding.
///
/// Fresh populations get the configured initial connection density
/// and are then randomized exactly once. Stored populations are
/// returned as they were saved.
///
/// # Errors
/// - [`ExperimentError::Deserialization`] if the stored population
///   cannot be read.
/// - [`ExperimentError::CorruptState`] if it breaks its invariants.
/// - [`ExperimentError::Precondition`] if a fixed-morphology
///   population is requested without a usable morphology, or the
///   substrate cannot be built from the simulation configuration.
pub fn bootstrap(
    config: &ExperimentConfig,
    sim: &SimConfig,
    morphology: Option<SensorMorphology>,
) -> Result<EncodedPopulation> {
    if let Some(path) = &config.population_path {
        return resume(path);
    }

    let population_config = PopulationConfig::robot_defaults(config.population_size()?);
    let mut population = if config.hyper_neatm {
        let substrate = Substrate::khepera(sim.min_dist_between_sensors, sim.robot_radius)
            .map_err(|e| ExperimentError::Precondition(e.to_string()))?;
        log::info!(
            "Creating HyperNEATM population over {} candidate sensors",
            substrate.input_count()
        );
        let genetic_config = GeneticConfig::cppn(
            NonZeroUsize::new(CPPN_INPUT_COUNT).unwrap_or(NonZeroUsize::MIN),
            NonZeroUsize::new(CPPN_OUTPUT_COUNT).unwrap_or(NonZeroUsize::MIN),
        );
        EncodedPopulation::HyperNeatm {
            population: Population::new(population_config, genetic_config),
            codec: HyperNeatmCodec::new(substrate),
        }
    } else if !config.control_mode {
        let sensors = NonZeroUsize::new(KHEPERA_III_SENSOR_COUNT).unwrap_or(NonZeroUsize::MIN);
        log::info!("Creating NEATM population starting from {} sensors", sensors);
        EncodedPopulation::Neatm {
            population: Population::new(population_config, morph_config(sensors)),
            codec: NeatmCodec,
        }
    } else {
        let morphology = morphology.ok_or_else(|| {
            ExperimentError::Precondition("control mode requires a morphology".into())
        })?;
        let sensors = NonZeroUsize::new(morphology.sensor_count()).ok_or_else(|| {
            ExperimentError::Precondition("the control morphology has no sensors".into())
        })?;
        log::info!("Creating NEAT population over {} sensors", sensors);
        EncodedPopulation::Neat {
            population: Population::new(
                population_config,
                GeneticConfig::controller(sensors, wheels()),
            ),
            codec: NeatCodec::new(morphology),
        }
    };

    population.set_initial_connection_density(config.connection_density);
    population.reset();
    Ok(population)
}

fn resume(path: &Path) -> Result<EncodedPopulation> {
    let population: EncodedPopulation = store::load(path)?;
    population
        .validate()
        .map_err(|reason| ExperimentError::CorruptState {
            path: path.to_path_buf(),
            reason,
        })?;
    log::info!(
        "Resuming {} population of {} genomes at iteration {}",
        population.encoding(),
        population.genome_count(),
        population.generation()
    );
    Ok(population)
}
