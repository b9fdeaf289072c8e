//! Decoders from each encoding's genome into a [`RobotNetwork`].
//!
//! | Encoding     | Genome          | Codec               |
//! |--------------|-----------------|---------------------|
//! | NEAT         | [`NNGenome`]    | [`NeatCodec`]       |
//! | NEATM        | [`MorphGenome`] | [`NeatmCodec`]      |
//! | HyperNEATM   | [`NNGenome`]    | [`HyperNeatmCodec`] |
use crate::genomics::{ActivationType, MorphGenome, NNGenome};
use crate::morphology::SensorMorphology;
use crate::networks::{CppnNetwork, Encoding, RealTimeNetwork, RobotNetwork};
use crate::substrate::{Point, Substrate};

use morphevo_engine::Codec;
use serde::{Deserialize, Serialize};

/// Number of inputs of a HyperNEATM CPPN: two
/// substrate points and a bias.
pub const CPPN_INPUT_COUNT: usize = 5;
/// Number of outputs of a HyperNEATM CPPN: a connection
/// weight and a sensor expression level.
pub const CPPN_OUTPUT_COUNT: usize = 2;
/// Expression levels above this value express a candidate sensor.
pub const EXPRESSION_THRESHOLD: f32 = 0.5;
/// CPPN weights with a magnitude at or below this value
/// leave their connection unexpressed.
pub const WEIGHT_THRESHOLD: f32 = 0.2;
/// Magnitude of the strongest substrate connection.
pub const MAX_WEIGHT: f32 = 3.0;

const WEIGHT_OUTPUT: usize = 0;
const EXPRESSION_OUTPUT: usize = 1;
const BIAS: f32 = 1.0;

/// Decodes controller genomes over a fixed morphology.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeatCodec {
    morphology: SensorMorphology,
}

impl NeatCodec {
    pub fn new(morphology: SensorMorphology) -> NeatCodec {
        NeatCodec { morphology }
    }

    /// Returns the morphology every decoded robot shares.
    pub fn morphology(&self) -> &SensorMorphology {
        &self.morphology
    }
}

impl Codec<NNGenome> for NeatCodec {
    type Output = RobotNetwork;

    /// # Panics
    /// This function panics if the genome does not have
    /// one input per sensor of the codec's morphology.
    fn decode(&self, genome: &NNGenome) -> RobotNetwork {
        RobotNetwork::new(
            RealTimeNetwork::new(genome),
            self.morphology.clone(),
            Encoding::Neat,
        )
    }
}

/// Decodes morphology-augmented genomes: each robot
/// carries the morphology evolved with its controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeatmCodec;

impl Codec<MorphGenome> for NeatmCodec {
    type Output = RobotNetwork;

    fn decode(&self, genome: &MorphGenome) -> RobotNetwork {
        RobotNetwork::new(
            RealTimeNetwork::new(genome.network()),
            genome.morphology().clone(),
            Encoding::Neatm,
        )
    }
}

/// Decodes CPPN genomes by querying them over a substrate.
///
/// A candidate sensor is expressed when the CPPN's expression
/// output at `(x, y, 0, 0)` exceeds [`EXPRESSION_THRESHOLD`].
/// The controller then connects the expressed inputs to the
/// hidden layer and the outputs, and the hidden layer to the
/// outputs, with the CPPN's weight output for each pair of
/// points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HyperNeatmCodec {
    substrate: Substrate,
}

impl HyperNeatmCodec {
    pub fn new(substrate: Substrate) -> HyperNeatmCodec {
        HyperNeatmCodec { substrate }
    }

    pub fn substrate(&self) -> &Substrate {
        &self.substrate
    }
}

impl Codec<NNGenome> for HyperNeatmCodec {
    type Output = RobotNetwork;

    /// # Panics
    /// This function panics if the genome does not have
    /// [`CPPN_INPUT_COUNT`] inputs and [`CPPN_OUTPUT_COUNT`] outputs.
    ///
    /// # Examples
    /// ```
    /// use morphevo_engine::{Codec, Genome};
    /// use morphevo_nn::codecs::{HyperNeatmCodec, CPPN_INPUT_COUNT, CPPN_OUTPUT_COUNT};
    /// use morphevo_nn::genomics::{GeneticConfig, NNGenome};
    /// use morphevo_nn::substrate::Substrate;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig::cppn(
    ///     NonZeroUsize::new(CPPN_INPUT_COUNT).unwrap(),
    ///     NonZeroUsize::new(CPPN_OUTPUT_COUNT).unwrap(),
    /// );
    /// let substrate = Substrate::khepera(0.05, 0.1).unwrap();
    /// let codec = HyperNeatmCodec::new(substrate);
    ///
    /// let robot = codec.decode(&NNGenome::new(&config));
    /// assert!(robot.morphology().sensor_count() <= 12);
    /// assert_eq!(robot.controller().output_count(), 2);
    /// ```
    fn decode(&self, genome: &NNGenome) -> RobotNetwork {
        let mut cppn = CppnNetwork::from(genome);
        let substrate = &self.substrate;

        let expressed: Vec<usize> = (0..substrate.input_count())
            .filter(|i| {
                let (x, y) = substrate.inputs()[*i];
                cppn.query(&[x, y, 0.0, 0.0, BIAS])[EXPRESSION_OUTPUT] > EXPRESSION_THRESHOLD
            })
            .collect();

        // Controller node indices: expressed inputs, outputs, hidden.
        let input_count = expressed.len();
        let output_base = input_count;
        let hidden_base = output_base + substrate.output_count();

        let mut connections = vec![];
        let mut connect = |from: Point, to: Point, from_index: usize, to_index: usize| {
            let query = [from.0, from.1, to.0, to.1, BIAS];
            if let Some(weight) = substrate_weight(cppn.query(&query)[WEIGHT_OUTPUT]) {
                connections.push((from_index, to_index, weight));
            }
        };
        for (index, input) in expressed.iter().enumerate() {
            let from = substrate.inputs()[*input];
            for (h, hidden) in substrate.hidden().iter().enumerate() {
                connect(from, *hidden, index, hidden_base + h);
            }
            for (o, output) in substrate.outputs().iter().enumerate() {
                connect(from, *output, index, output_base + o);
            }
        }
        for (h, hidden) in substrate.hidden().iter().enumerate() {
            for (o, output) in substrate.outputs().iter().enumerate() {
                connect(*hidden, *output, hidden_base + h, output_base + o);
            }
        }

        let controller = RealTimeNetwork::from_layout(
            input_count,
            &vec![ActivationType::Sigmoid; substrate.output_count()],
            &vec![ActivationType::Sigmoid; substrate.hidden().len()],
            connections,
        );
        let morphology = SensorMorphology::new(
            expressed
                .iter()
                .map(|i| substrate.candidate_sensors()[*i])
                .collect(),
        );
        RobotNetwork::new(controller, morphology, Encoding::HyperNeatm)
    }
}

/// Maps a raw CPPN weight output onto a connection weight,
/// or `None` if the connection is not expressed.
fn substrate_weight(raw: f32) -> Option<f32> {
    let raw = raw.clamp(-1.0, 1.0);
    if raw.abs() <= WEIGHT_THRESHOLD {
        return None;
    }
    let scaled = (raw.abs() - WEIGHT_THRESHOLD) / (1.0 - WEIGHT_THRESHOLD) * MAX_WEIGHT;
    Some(scaled.copysign(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::GeneticConfig;
    use morphevo_engine::Genome;
    use std::num::NonZeroUsize;

    fn cppn_config() -> GeneticConfig {
        GeneticConfig {
            initial_expression_chance: 0.0,
            ..GeneticConfig::cppn(
                NonZeroUsize::new(CPPN_INPUT_COUNT).unwrap(),
                NonZeroUsize::new(CPPN_OUTPUT_COUNT).unwrap(),
            )
        }
    }

    #[test]
    fn weights_are_thresholded_and_scaled() {
        assert_eq!(substrate_weight(0.1), None);
        assert_eq!(substrate_weight(-0.2), None);
        assert_eq!(substrate_weight(1.0), Some(MAX_WEIGHT));
        assert_eq!(substrate_weight(-5.0), Some(-MAX_WEIGHT));
        assert!((substrate_weight(0.6).unwrap() - 1.5).abs() < 1e-5);
    }

    #[test]
    fn neat_uses_fixed_morphology() {
        let config = GeneticConfig::controller(
            NonZeroUsize::new(8).unwrap(),
            NonZeroUsize::new(2).unwrap(),
        );
        let codec = NeatCodec::new(SensorMorphology::khepera_iii());
        let robot = codec.decode(&NNGenome::new(&config));
        assert_eq!(robot.encoding(), Encoding::Neat);
        assert_eq!(robot.morphology(), codec.morphology());
    }

    #[test]
    fn unconnected_cppn_expresses_nothing() {
        // With no genes every output sees a sum of 0: the expression
        // sigmoid gives exactly 0.5, which is not above the threshold.
        let genome = NNGenome::new(&cppn_config());
        let codec = HyperNeatmCodec::new(Substrate::khepera(0.05, 0.1).unwrap());
        let mut robot = codec.decode(&genome);
        assert_eq!(robot.encoding(), Encoding::HyperNeatm);
        assert_eq!(robot.morphology().sensor_count(), 0);
        assert_eq!(robot.controller().connection_count(), 0);
        assert_eq!(robot.step(&[]), vec![0.5, 0.5]);
    }

    #[test]
    fn bias_driven_cppn_expresses_everything() {
        let mut genome = NNGenome::new(&cppn_config());
        // Inputs are 0..5, outputs 5 (weight) and 6 (expression).
        genome.add_gene(0, 4, 6, 1.0).unwrap();
        genome.add_gene(1, 4, 5, 1.0).unwrap();

        let substrate = Substrate::khepera(0.05, 0.1).unwrap();
        let codec = HyperNeatmCodec::new(substrate.clone());
        let robot = codec.decode(&genome);

        let n = substrate.input_count();
        let hidden = substrate.hidden().len();
        let outputs = substrate.output_count();
        assert_eq!(robot.morphology().sensors(), substrate.candidate_sensors());
        assert_eq!(
            robot.controller().connection_count(),
            n * (hidden + outputs) + hidden * outputs
        );
        assert_eq!(robot.controller().hidden_count(), hidden);
    }

    #[test]
    fn decoding_is_pure() {
        let genome = NNGenome::new(&GeneticConfig {
            initial_expression_chance: 1.0,
            ..cppn_config()
        });
        let codec = HyperNeatmCodec::new(Substrate::khepera(0.02, 0.1).unwrap());
        assert_eq!(codec.decode(&genome), codec.decode(&genome));
    }
}
