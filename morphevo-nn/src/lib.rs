//! # MorphEvo-NN
//! Neural genome implementations of the [`morphevo-engine`](morphevo_engine)
//! crate's `Genome` trait, and the decoders that turn them into robot
//! controllers.
//!
//! Provides:
//! - [`NNGenome`]: a direct NEAT genome. Used as the controller genome of
//!   fixed-morphology experiments, and as the CPPN of HyperNEATM.
//! - [`MorphGenome`]: a NEAT genome evolved jointly with the
//!   [`SensorMorphology`] its inputs are wired to (NEATM).
//! - [`Substrate`]: the fixed geometry a CPPN is queried over.
//! - [`RealTimeNetwork`] and [`RobotNetwork`]: the executable phenotypes.
//! - [`codecs`]: one decoder per encoding.
//!
//! [`NNGenome`]: crate::genomics::NNGenome
//! [`MorphGenome`]: crate::genomics::MorphGenome
//! [`SensorMorphology`]: crate::morphology::SensorMorphology
//! [`Substrate`]: crate::substrate::Substrate
//! [`RealTimeNetwork`]: crate::networks::RealTimeNetwork
//! [`RobotNetwork`]: crate::networks::RobotNetwork
//!
//! # Example usage: decoding a NEATM genome
//! ```
//! use morphevo_engine::{Codec, Genome};
//! use morphevo_nn::codecs::NeatmCodec;
//! use morphevo_nn::genomics::{GeneticConfig, MorphConfig, MorphGenome};
//! use morphevo_nn::networks::Encoding;
//! use std::num::NonZeroUsize;
//!
//! let config = MorphConfig {
//!     network: GeneticConfig {
//!         input_count: NonZeroUsize::new(6).unwrap(),
//!         output_count: NonZeroUsize::new(2).unwrap(),
//!         initial_expression_chance: 0.5,
//!         weight_bound: 3.0,
//!         ..GeneticConfig::zero()
//!     },
//!     ..MorphConfig::zero()
//! };
//!
//! let genome = MorphGenome::new(&config);
//! let mut robot = NeatmCodec.decode(&genome);
//!
//! assert_eq!(robot.encoding(), Encoding::Neatm);
//! assert_eq!(robot.morphology().sensor_count(), 6);
//! let wheels = robot.step(&[0.0; 6]);
//! assert_eq!(wheels.len(), 2);
//! ```

pub mod codecs;
pub mod genomics;
pub mod morphology;
pub mod networks;
pub mod substrate;

/// Identifier type used to designate historically
/// identical mutations for the purposes of
/// genome comparison and genetic tracking.
pub type Innovation = usize;
