use super::{GeneticConfig, History, MutationError, NNGenome};
use crate::morphology::{Sensor, SensorMorphology};

use morphevo_engine::{ConnectionDensity, Genome, InnovationHistory};
use rand::prelude::Rng;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Configuration of morphology-augmented genomes.
///
/// The controller network has one input per sensor. Genomes start
/// with the network's [`input_count`] sensors, which mutation may
/// then add to or remove from.
///
/// [`input_count`]: GeneticConfig::input_count
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MorphConfig {
    /// Configuration of the controller network.
    pub network: GeneticConfig,
    /// Chance of each sensor being perturbed in a mutated child.
    pub sensor_mutation_chance: f32,
    /// Relative magnitude of sensor perturbations, in `[0, 1]`.
    pub sensor_mutation_power: f32,
    /// Weight of the morphology difference in genetic distance.
    pub morphology_distance_factor: f32,
    /// Chance of a mutated child gaining a random sensor.
    #[serde(default)]
    pub sensor_addition_chance: f32,
    /// Chance of a mutated child losing a random sensor.
    #[serde(default)]
    pub sensor_deletion_chance: f32,
}

impl MorphConfig {
    /// Returns a "zero-valued" configuration, as
    /// [`GeneticConfig::zero`] does.
    pub const fn zero() -> MorphConfig {
        MorphConfig {
            network: GeneticConfig::zero(),
            sensor_mutation_chance: 0.0,
            sensor_mutation_power: 0.0,
            morphology_distance_factor: 0.0,
            sensor_addition_chance: 0.0,
            sensor_deletion_chance: 0.0,
        }
    }

    /// Returns the number of sensors of a new genome.
    pub fn sensor_count(&self) -> usize {
        self.network.input_count.get()
    }
}

impl ConnectionDensity for MorphConfig {
    fn initial_connection_density(&self) -> f32 {
        self.network.initial_connection_density()
    }

    fn set_initial_connection_density(&mut self, density: f32) {
        self.network.set_initial_connection_density(density);
    }
}

/// Innovation history of morphology-augmented genomes.
/// Morphologies carry no innovations, so this tracks
/// the controller network's history only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphHistory(pub History);

impl InnovationHistory for MorphHistory {
    type Config = MorphConfig;

    fn new(config: &MorphConfig) -> MorphHistory {
        MorphHistory(History::new(&config.network))
    }
}

/// A controller genome evolved jointly with the
/// sensor morphology its inputs are wired to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MorphGenome {
    network: NNGenome,
    morphology: SensorMorphology,
}

impl MorphGenome {
    /// Returns the controller network genome.
    pub fn network(&self) -> &NNGenome {
        &self.network
    }

    /// Returns the evolved sensor morphology.
    pub fn morphology(&self) -> &SensorMorphology {
        &self.morphology
    }

    /// Adds a randomly placed sensor along with the network
    /// input it feeds.
    pub fn add_sensor(&mut self, history: &mut MorphHistory, config: &MorphConfig) {
        self.network.add_sensor(&mut history.0, &config.network);
        self.morphology.push(Sensor::random(&mut rand::thread_rng()));
    }

    /// Removes the sensor at `index` along with the network
    /// input it feeds, returning it.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such sensor,
    /// or it is the only one.
    pub fn remove_sensor(&mut self, index: usize) -> Result<Sensor, MutationError> {
        self.network.remove_sensor(index)?;
        self.morphology
            .remove(index)
            .ok_or(MutationError::NoSuchSensor(index))
    }

    fn mutate_sensor_count(&mut self, history: &mut MorphHistory, config: &MorphConfig) {
        let mut rng = rand::thread_rng();
        if self.morphology.sensor_count() > 1 && rng.gen::<f32>() < config.sensor_deletion_chance {
            let index = rng.gen_range(0..self.morphology.sensor_count());
            let _ = self.remove_sensor(index);
        }
        if rng.gen::<f32>() < config.sensor_addition_chance {
            self.add_sensor(history, config);
        }
    }

    /// Crosses the morphologies of `fitter`, whose sensors the child
    /// inherits, and `other`. Sensors pair up by their input's
    /// innovation number.
    fn inherit_morphology(fitter: &MorphGenome, other: &MorphGenome) -> SensorMorphology {
        let fitter_ids = fitter.network.sensor_ids();
        let other_ids = other.network.sensor_ids();
        SensorMorphology::crossover(&fitter.morphology, &other.morphology, |i| {
            other_ids.binary_search(&fitter_ids[i]).ok()
        })
    }
}

impl Genome for MorphGenome {
    type Config = MorphConfig;
    type InnovationHistory = MorphHistory;

    fn new(config: &MorphConfig) -> MorphGenome {
        MorphGenome {
            network: NNGenome::new(&config.network),
            morphology: SensorMorphology::random(config.sensor_count()),
        }
    }

    fn genetic_distance(first: &MorphGenome, second: &MorphGenome, config: &MorphConfig) -> f32 {
        NNGenome::genetic_distance(&first.network, &second.network, &config.network)
            + config.morphology_distance_factor * first.morphology.distance(&second.morphology)
    }

    /// The child has the sensors of the fitter parent, each taken
    /// from either parent when both have it. When the child is
    /// mutated, its sensors are perturbed, and one may be added
    /// or removed along with its network input.
    fn mate(
        parent1: &MorphGenome,
        parent2: &MorphGenome,
        history: &mut MorphHistory,
        config: &MorphConfig,
    ) -> MorphGenome {
        let (fitter, other) = if parent1.fitness() >= parent2.fitness() {
            (parent1, parent2)
        } else {
            (parent2, parent1)
        };
        let network = NNGenome::mate(&fitter.network, &other.network, &mut history.0, &config.network);
        let mut child = MorphGenome {
            network,
            morphology: Self::inherit_morphology(fitter, other),
        };
        if rand::thread_rng().gen::<f32>() < config.network.child_mutation_chance {
            child
                .morphology
                .mutate(config.sensor_mutation_chance, config.sensor_mutation_power);
            child.mutate_sensor_count(history, config);
        }
        child
    }

    fn set_fitness(&mut self, fitness: f32) {
        self.network.set_fitness(fitness);
    }

    fn fitness(&self) -> f32 {
        self.network.fitness()
    }

    fn conforms_to(&self, config: &MorphConfig) -> bool {
        self.network.conforms_to_actuators(&config.network)
            && self.network.input_count() == self.morphology.sensor_count()
            && self.morphology.is_within_bounds()
    }
}

impl fmt::Display for MorphGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with sensors {}", self.network, self.morphology)
    }
}
