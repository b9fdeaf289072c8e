//! Encoding-tagged populations and champions.
//!
//! Each variant carries the codec its genomes are decoded with, so a
//! population can only ever be decoded the way it was trained, and a
//! stored population or champion restores its codec along with it.
use morphevo_engine::{Codec, ConnectionDensity, Genome, Population};
use morphevo_nn::codecs::{
    HyperNeatmCodec, NeatCodec, NeatmCodec, CPPN_INPUT_COUNT, CPPN_OUTPUT_COUNT,
};
use morphevo_nn::genomics::{
    GeneticConfig, History, MorphConfig, MorphGenome, MorphHistory, NNGenome,
};
use morphevo_nn::networks::{Encoding, RobotNetwork};

use serde::{Deserialize, Serialize};

/// Number of controller outputs: the left and right wheel speeds.
pub const WHEEL_COUNT: usize = 2;

/// A population of direct neural genomes.
pub type NeatPopulation = Population<GeneticConfig, History, NNGenome>;
/// A population of morphology-augmented genomes.
pub type NeatmPopulation = Population<MorphConfig, MorphHistory, MorphGenome>;

/// A population tagged with its encoding and codec.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EncodedPopulation {
    /// Controllers over the codec's fixed morphology.
    Neat {
        population: NeatPopulation,
        codec: NeatCodec,
    },
    /// Controllers evolved jointly with their morphologies.
    Neatm {
        population: NeatmPopulation,
        codec: NeatmCodec,
    },
    /// CPPNs queried over the codec's substrate.
    HyperNeatm {
        population: NeatPopulation,
        codec: HyperNeatmCodec,
    },
}

impl EncodedPopulation {
    pub fn encoding(&self) -> Encoding {
        match self {
            EncodedPopulation::Neat { .. } => Encoding::Neat,
            EncodedPopulation::Neatm { .. } => Encoding::Neatm,
            EncodedPopulation::HyperNeatm { .. } => Encoding::HyperNeatm,
        }
    }

    /// Returns the iteration counter.
    pub fn generation(&self) -> usize {
        match self {
            EncodedPopulation::Neat { population, .. }
            | EncodedPopulation::HyperNeatm { population, .. } => population.generation(),
            EncodedPopulation::Neatm { population, .. } => population.generation(),
        }
    }

    /// Returns how many times the population was randomized.
    pub fn resets(&self) -> usize {
        match self {
            EncodedPopulation::Neat { population, .. }
            | EncodedPopulation::HyperNeatm { population, .. } => population.resets(),
            EncodedPopulation::Neatm { population, .. } => population.resets(),
        }
    }

    pub fn genome_count(&self) -> usize {
        match self {
            EncodedPopulation::Neat { population, .. }
            | EncodedPopulation::HyperNeatm { population, .. } => population.genomes().count(),
            EncodedPopulation::Neatm { population, .. } => population.genomes().count(),
        }
    }

    pub fn species_count(&self) -> usize {
        match self {
            EncodedPopulation::Neat { population, .. }
            | EncodedPopulation::HyperNeatm { population, .. } => population.species().count(),
            EncodedPopulation::Neatm { population, .. } => population.species().count(),
        }
    }

    /// Returns the number of inputs and outputs genomes are created
    /// with. NEATM genomes may since have gained or lost inputs.
    pub fn genome_shape(&self) -> (usize, usize) {
        fn shape(config: &GeneticConfig) -> (usize, usize) {
            (config.input_count.get(), config.output_count.get())
        }
        match self {
            EncodedPopulation::Neat { population, .. }
            | EncodedPopulation::HyperNeatm { population, .. } => {
                shape(population.genetic_config())
            }
            EncodedPopulation::Neatm { population, .. } => {
                shape(&population.genetic_config().network)
            }
        }
    }

    /// Sets the initial connection density of subsequent resets.
    pub fn set_initial_connection_density(&mut self, density: f32) {
        match self {
            EncodedPopulation::Neat { population, .. }
            | EncodedPopulation::HyperNeatm { population, .. } => {
                population.set_initial_connection_density(density)
            }
            EncodedPopulation::Neatm { population, .. } => {
                population.set_initial_connection_density(density)
            }
        }
    }

    /// Returns the initial connection density of subsequent resets.
    pub fn initial_connection_density(&self) -> f32 {
        match self {
            EncodedPopulation::Neat { population, .. }
            | EncodedPopulation::HyperNeatm { population, .. } => {
                population.genetic_config().initial_connection_density()
            }
            EncodedPopulation::Neatm { population, .. } => {
                population.genetic_config().initial_connection_density()
            }
        }
    }

    /// Randomizes the population from scratch.
    pub fn reset(&mut self) {
        match self {
            EncodedPopulation::Neat { population, .. }
            | EncodedPopulation::HyperNeatm { population, .. } => population.reset(),
            EncodedPopulation::Neatm { population, .. } => population.reset(),
        }
    }

    /// Checks the population's invariants: it holds genomes, all
    /// of them conform to its genetic configuration, and that
    /// configuration matches its codec.
    ///
    /// # Errors
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            EncodedPopulation::Neat { population, codec } => {
                population.validate().map_err(|e| e.to_string())?;
                let sensors = codec.morphology().sensor_count();
                if population.genetic_config().input_count.get() != sensors {
                    return Err(format!(
                        "genomes have {} inputs but the morphology has {} sensors",
                        population.genetic_config().input_count,
                        sensors
                    ));
                }
            }
            EncodedPopulation::Neatm { population, .. } => {
                population.validate().map_err(|e| e.to_string())?;
            }
            EncodedPopulation::HyperNeatm { population, codec } => {
                population.validate().map_err(|e| e.to_string())?;
                if self.genome_shape() != (CPPN_INPUT_COUNT, CPPN_OUTPUT_COUNT) {
                    return Err(format!(
                        "CPPNs must have {} inputs and {} outputs",
                        CPPN_INPUT_COUNT, CPPN_OUTPUT_COUNT
                    ));
                }
                if !codec.substrate().is_valid() {
                    return Err("the substrate is malformed".into());
                }
                return Ok(());
            }
        }
        if self.genome_shape().1 != WHEEL_COUNT {
            return Err(format!(
                "controllers must have {} outputs, not {}",
                WHEEL_COUNT,
                self.genome_shape().1
            ));
        }
        Ok(())
    }
}

/// A snapshot of the best genome found, with the codec it decodes with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Champion {
    Neat { genome: NNGenome, codec: NeatCodec },
    Neatm { genome: MorphGenome, codec: NeatmCodec },
    HyperNeatm { genome: NNGenome, codec: HyperNeatmCodec },
}

impl Champion {
    pub fn encoding(&self) -> Encoding {
        match self {
            Champion::Neat { .. } => Encoding::Neat,
            Champion::Neatm { .. } => Encoding::Neatm,
            Champion::HyperNeatm { .. } => Encoding::HyperNeatm,
        }
    }

    /// Returns the score the champion was recorded with.
    pub fn fitness(&self) -> f32 {
        match self {
            Champion::Neat { genome, .. } | Champion::HyperNeatm { genome, .. } => genome.fitness(),
            Champion::Neatm { genome, .. } => genome.fitness(),
        }
    }

    /// Returns whether the genome can be decoded by its codec.
    pub fn is_decodable(&self) -> bool {
        match self {
            Champion::Neat { genome, codec } => {
                genome.input_count() == codec.morphology().sensor_count()
            }
            Champion::Neatm { genome, .. } => {
                genome.network().input_count() == genome.morphology().sensor_count()
            }
            Champion::HyperNeatm { genome, codec } => {
                genome.input_count() == CPPN_INPUT_COUNT
                    && genome.output_count() == CPPN_OUTPUT_COUNT
                    && codec.substrate().is_valid()
            }
        }
    }

    /// Decodes the champion with its own codec.
    ///
    /// # Panics
    /// This function panics if the champion is not
    /// [decodable](Champion::is_decodable).
    pub fn decode(&self) -> RobotNetwork {
        match self {
            Champion::Neat { genome, codec } => codec.decode(genome),
            Champion::Neatm { genome, codec } => codec.decode(genome),
            Champion::HyperNeatm { genome, codec } => codec.decode(genome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morphevo_engine::PopulationConfig;
    use morphevo_nn::morphology::SensorMorphology;
    use morphevo_nn::substrate::Substrate;
    use std::num::NonZeroUsize;

    fn neat(sensors: usize) -> EncodedPopulation {
        let config = GeneticConfig::controller(
            NonZeroUsize::new(sensors).unwrap(),
            NonZeroUsize::new(WHEEL_COUNT).unwrap(),
        );
        let mut population = Population::new(
            PopulationConfig::robot_defaults(NonZeroUsize::new(5).unwrap()),
            config,
        );
        population.reset();
        EncodedPopulation::Neat {
            population,
            codec: NeatCodec::new(SensorMorphology::khepera_iii()),
        }
    }

    #[test]
    fn consistent_population_validates() {
        let population = neat(8);
        assert_eq!(population.encoding(), Encoding::Neat);
        assert_eq!(population.genome_count(), 5);
        assert_eq!(population.genome_shape(), (8, WHEEL_COUNT));
        assert!(population.validate().is_ok());
    }

    #[test]
    fn mismatched_morphology_is_invalid() {
        assert!(neat(3).validate().is_err());
    }

    #[test]
    fn empty_population_is_invalid() {
        let population = EncodedPopulation::Neatm {
            population: Population::new(PopulationConfig::zero(), MorphConfig::zero()),
            codec: NeatmCodec,
        };
        assert_eq!(population.genome_count(), 0);
        assert!(population.validate().is_err());
    }

    #[test]
    fn connection_density_applies_to_resets() {
        let mut population = neat(8);
        population.set_initial_connection_density(0.0);
        assert_eq!(population.initial_connection_density(), 0.0);
        population.reset();
        assert_eq!(population.resets(), 2);
        if let EncodedPopulation::Neat { population, .. } = &population {
            assert!(population.genomes().all(|g| g.genes().count() == 0));
        }
    }

    #[test]
    fn champions_decode_with_their_codec() {
        let config = GeneticConfig::cppn(
            NonZeroUsize::new(CPPN_INPUT_COUNT).unwrap(),
            NonZeroUsize::new(CPPN_OUTPUT_COUNT).unwrap(),
        );
        let mut genome = NNGenome::new(&config);
        genome.set_fitness(12.5);
        let champion = Champion::HyperNeatm {
            genome,
            codec: HyperNeatmCodec::new(Substrate::khepera(0.05, 0.1).unwrap()),
        };
        assert!(champion.is_decodable());
        assert_eq!(champion.fitness(), 12.5);
        assert_eq!(champion.decode().encoding(), champion.encoding());

        let malformed = Champion::Neat {
            genome: NNGenome::new(&GeneticConfig::zero()),
            codec: NeatCodec::new(SensorMorphology::khepera_iii()),
        };
        assert!(!malformed.is_decodable());
    }
}
