//! The fixed geometry a HyperNEATM CPPN is queried over.
//!
//! Coordinates are in the robot's frame, normalized to its radius:
//! `x` points forward and `y` to the left.
use crate::morphology::{wrap_angle, Sensor, MAX_FIELD_OF_VIEW, MIN_FIELD_OF_VIEW};

use serde::{Deserialize, Serialize};

use std::error::Error;
use std::f32::consts::TAU;
use std::fmt;

/// A point in the substrate.
pub type Point = (f32, f32);

/// Upper bound on candidate sensors, whatever the robot's size.
pub const MAX_CANDIDATE_SENSORS: usize = 64;
/// Number of hidden substrate nodes.
pub const HIDDEN_NODE_COUNT: usize = 8;

const HIDDEN_RING_RADIUS: f32 = 0.5;
const CANDIDATE_SENSOR_RANGE: f32 = 0.3;
const CANDIDATE_FIELD_OF_VIEW: f32 = (MIN_FIELD_OF_VIEW + MAX_FIELD_OF_VIEW) / 2.0;

/// A layered substrate: a ring of candidate sensor inputs on the
/// robot's perimeter, a ring of hidden nodes, and one output per
/// wheel (left, then right).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Substrate {
    candidate_sensors: Vec<Sensor>,
    inputs: Vec<Point>,
    hidden: Vec<Point>,
    outputs: Vec<Point>,
}

/// An error type indicating a substrate
/// cannot be built from the given geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubstrateError {
    /// The robot radius must be positive and finite.
    InvalidRobotRadius(f32),
    /// The sensor spacing must be positive and finite.
    InvalidSensorSpacing(f32),
}

impl Substrate {
    /// Builds the substrate of a round robot with the given radius,
    /// with candidate sensors spaced `min_dist_between_sensors`
    /// apart along its perimeter.
    ///
    /// # Errors
    /// Returns an error if either length is not positive and finite.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::substrate::Substrate;
    ///
    /// // A perimeter of 2π·0.1 fits 31 sensors 0.02 apart.
    /// let substrate = Substrate::khepera(0.02, 0.1).unwrap();
    /// assert_eq!(substrate.input_count(), 31);
    /// assert_eq!(substrate.output_count(), 2);
    ///
    /// assert!(Substrate::khepera(0.0, 0.1).is_err());
    /// ```
    pub fn khepera(
        min_dist_between_sensors: f32,
        robot_radius: f32,
    ) -> Result<Substrate, SubstrateError> {
        if !(robot_radius.is_finite() && robot_radius > 0.0) {
            return Err(SubstrateError::InvalidRobotRadius(robot_radius));
        }
        if !(min_dist_between_sensors.is_finite() && min_dist_between_sensors > 0.0) {
            return Err(SubstrateError::InvalidSensorSpacing(min_dist_between_sensors));
        }

        let perimeter = TAU * robot_radius;
        let candidate_count = ((perimeter / min_dist_between_sensors).floor() as usize)
            .clamp(1, MAX_CANDIDATE_SENSORS);

        let bearings: Vec<f32> = (0..candidate_count)
            .map(|i| wrap_angle(i as f32 * TAU / candidate_count as f32))
            .collect();
        let candidate_sensors = bearings
            .iter()
            .map(|b| Sensor::radial(*b, CANDIDATE_SENSOR_RANGE, CANDIDATE_FIELD_OF_VIEW))
            .collect();
        let inputs = bearings.iter().map(|b| (b.cos(), b.sin())).collect();
        let hidden = (0..HIDDEN_NODE_COUNT)
            .map(|i| i as f32 * TAU / HIDDEN_NODE_COUNT as f32)
            .map(|a| (HIDDEN_RING_RADIUS * a.cos(), HIDDEN_RING_RADIUS * a.sin()))
            .collect();
        let outputs = vec![(0.0, 0.25), (0.0, -0.25)];

        Ok(Substrate {
            candidate_sensors,
            inputs,
            hidden,
            outputs,
        })
    }

    /// Returns the sensor each input would be expressed as.
    pub fn candidate_sensors(&self) -> &[Sensor] {
        &self.candidate_sensors
    }

    pub fn inputs(&self) -> &[Point] {
        &self.inputs
    }

    pub fn hidden(&self) -> &[Point] {
        &self.hidden
    }

    pub fn outputs(&self) -> &[Point] {
        &self.outputs
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Returns whether the substrate's layers are consistent.
    pub fn is_valid(&self) -> bool {
        !self.inputs.is_empty()
            && self.inputs.len() == self.candidate_sensors.len()
            && !self.outputs.is_empty()
            && self.candidate_sensors.iter().all(Sensor::is_within_bounds)
    }
}

impl fmt::Display for SubstrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRobotRadius(r) => write!(f, "invalid robot radius {}", r),
            Self::InvalidSensorSpacing(d) => {
                write!(f, "invalid minimum distance between sensors {}", d)
            }
        }
    }
}

impl Error for SubstrateError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::angle_between;

    #[test]
    fn inputs_lie_on_the_unit_circle() {
        let substrate = Substrate::khepera(0.05, 0.1).unwrap();
        assert_eq!(substrate.input_count(), 12);
        for (x, y) in substrate.inputs() {
            assert!(((x * x + y * y).sqrt() - 1.0).abs() < 1e-5);
        }
        // The first candidate sensor faces forward.
        assert_eq!(substrate.inputs()[0], (1.0, 0.0));
        assert!(substrate.is_valid());
    }

    #[test]
    fn candidate_count_is_bounded() {
        assert_eq!(Substrate::khepera(1.0, 0.1).unwrap().input_count(), 1);
        assert_eq!(
            Substrate::khepera(1e-6, 0.1).unwrap().input_count(),
            MAX_CANDIDATE_SENSORS
        );
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        assert_eq!(
            Substrate::khepera(0.1, -1.0),
            Err(SubstrateError::InvalidRobotRadius(-1.0))
        );
        assert!(matches!(
            Substrate::khepera(f32::NAN, 0.1),
            Err(SubstrateError::InvalidSensorSpacing(_))
        ));
    }

    #[test]
    fn sensor_bearings_match_input_positions() {
        let substrate = Substrate::khepera(0.1, 0.1).unwrap();
        for (sensor, (x, y)) in substrate.candidate_sensors().iter().zip(substrate.inputs()) {
            assert!(angle_between(sensor.bearing, y.atan2(*x)).abs() < 1e-4);
        }
    }
}
