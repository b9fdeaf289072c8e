use crate::morphology::SensorMorphology;
use crate::networks::RealTimeNetwork;

use serde::{Deserialize, Serialize};

use std::fmt;

/// The genetic encodings robots can be evolved with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// Direct NEAT controller over a fixed morphology.
    Neat,
    /// NEAT controller evolved jointly with its morphology.
    Neatm,
    /// CPPN-generated controller and morphology over a substrate.
    HyperNeatm,
}

impl Encoding {
    /// Returns whether robots of this encoding have
    /// an evolved, rather than fixed, morphology.
    pub fn evolves_morphology(self) -> bool {
        !matches!(self, Encoding::Neat)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Neat => write!(f, "NEAT"),
            Encoding::Neatm => write!(f, "NEATM"),
            Encoding::HyperNeatm => write!(f, "HyperNEATM"),
        }
    }
}

/// A decoded robot: its controller network, the sensor
/// morphology feeding it, and the encoding it came from.
///
/// The i-th sensor of the morphology feeds the i-th input
/// of the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotNetwork {
    controller: RealTimeNetwork,
    morphology: SensorMorphology,
    encoding: Encoding,
}

impl RobotNetwork {
    /// Pairs a controller with its morphology.
    ///
    /// # Panics
    /// This function panics if the controller does not have
    /// exactly one input per sensor.
    pub fn new(
        controller: RealTimeNetwork,
        morphology: SensorMorphology,
        encoding: Encoding,
    ) -> RobotNetwork {
        assert_eq!(
            controller.input_count(),
            morphology.sensor_count(),
            "controller inputs do not match sensor count"
        );
        RobotNetwork {
            controller,
            morphology,
            encoding,
        }
    }

    /// Feeds one reading per sensor to the controller,
    /// activates it once, and returns its outputs.
    ///
    /// # Panics
    /// This function panics if `readings` does not have
    /// exactly one value per sensor.
    pub fn step(&mut self, readings: &[f32]) -> Vec<f32> {
        self.controller.set_inputs(readings);
        self.controller.activate();
        self.controller.outputs()
    }

    /// Clears the controller's recurrent state.
    pub fn reset(&mut self) {
        self.controller.clear_state();
    }

    pub fn controller(&self) -> &RealTimeNetwork {
        &self.controller
    }

    pub fn morphology(&self) -> &SensorMorphology {
        &self.morphology
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Consumes the robot, returning its morphology.
    pub fn into_morphology(self) -> SensorMorphology {
        self.morphology
    }
}

impl fmt::Display for RobotNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} robot: {} with {} sensors {}",
            self.encoding,
            self.controller,
            self.morphology.sensor_count(),
            self.morphology
        )
    }
}
