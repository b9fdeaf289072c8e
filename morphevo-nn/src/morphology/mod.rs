//! Sensor morphologies: where a robot's sensors sit on its body,
//! which way they look, and how far and wide they see.
//!
//! The i-th sensor of a morphology feeds the i-th input of the
//! controller network it is paired with.
mod khepera;

pub use khepera::KHEPERA_III_SENSOR_COUNT;

use rand::prelude::Rng;
use serde::{Deserialize, Serialize};

use std::f32::consts::{PI, TAU};
use std::fmt;

/// Shortest sensor range.
pub const MIN_RANGE: f32 = 0.05;
/// Longest sensor range.
pub const MAX_RANGE: f32 = 0.6;
/// Narrowest sensor field of view, in radians.
pub const MIN_FIELD_OF_VIEW: f32 = PI / 18.0;
/// Widest sensor field of view, in radians.
pub const MAX_FIELD_OF_VIEW: f32 = PI / 2.0;
/// Largest orientation offset from the body normal, in radians.
pub const MAX_ORIENTATION: f32 = PI / 2.0;

/// A single sensor.
///
/// Angles are in radians. `bearing` places the sensor on the
/// robot's perimeter, measured counter-clockwise from the robot's
/// heading; `orientation` is the sensor's look direction relative
/// to the outward body normal at that point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub bearing: f32,
    pub orientation: f32,
    pub range: f32,
    pub field_of_view: f32,
}

impl Sensor {
    /// Returns a sensor at `bearing` looking straight out
    /// from the body with the given range and field of view.
    pub fn radial(bearing: f32, range: f32, field_of_view: f32) -> Sensor {
        Sensor {
            bearing: wrap_angle(bearing),
            orientation: 0.0,
            range,
            field_of_view,
        }
    }

    /// Returns a sensor with random placement and
    /// parameters within the morphology bounds.
    pub fn random(rng: &mut impl Rng) -> Sensor {
        Sensor {
            bearing: rng.gen_range(-PI..PI),
            orientation: rng.gen_range(-MAX_ORIENTATION..=MAX_ORIENTATION),
            range: rng.gen_range(MIN_RANGE..=MAX_RANGE),
            field_of_view: rng.gen_range(MIN_FIELD_OF_VIEW..=MAX_FIELD_OF_VIEW),
        }
    }

    /// Returns the absolute look direction of the sensor
    /// relative to the robot's heading.
    pub fn heading(&self) -> f32 {
        wrap_angle(self.bearing + self.orientation)
    }

    /// Returns whether all parameters lie within the morphology bounds.
    pub fn is_within_bounds(&self) -> bool {
        self.bearing.is_finite()
            && self.bearing.abs() <= PI
            && self.orientation.abs() <= MAX_ORIENTATION
            && (MIN_RANGE..=MAX_RANGE).contains(&self.range)
            && (MIN_FIELD_OF_VIEW..=MAX_FIELD_OF_VIEW).contains(&self.field_of_view)
    }

    /// Perturbs each parameter by a uniform amount scaled by
    /// `power`, clamping the result back into bounds.
    fn perturb(&mut self, power: f32, rng: &mut impl Rng) {
        let mut nudge = |scale: f32| rng.gen_range(-1.0..=1.0) * power * scale;
        self.bearing = wrap_angle(self.bearing + nudge(PI));
        self.orientation =
            (self.orientation + nudge(MAX_ORIENTATION)).clamp(-MAX_ORIENTATION, MAX_ORIENTATION);
        self.range = (self.range + nudge(MAX_RANGE - MIN_RANGE)).clamp(MIN_RANGE, MAX_RANGE);
        self.field_of_view = (self.field_of_view + nudge(MAX_FIELD_OF_VIEW - MIN_FIELD_OF_VIEW))
            .clamp(MIN_FIELD_OF_VIEW, MAX_FIELD_OF_VIEW);
    }

    /// Normalized difference between two sensors, in `[0, 4]`.
    fn distance(&self, other: &Sensor) -> f32 {
        angle_between(self.bearing, other.bearing).abs() / PI
            + (self.orientation - other.orientation).abs() / (2.0 * MAX_ORIENTATION)
            + (self.range - other.range).abs() / (MAX_RANGE - MIN_RANGE)
            + (self.field_of_view - other.field_of_view).abs()
                / (MAX_FIELD_OF_VIEW - MIN_FIELD_OF_VIEW)
    }
}

/// An ordered collection of sensors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorMorphology {
    sensors: Vec<Sensor>,
}

impl SensorMorphology {
    /// Creates a morphology from a list of sensors.
    pub fn new(sensors: Vec<Sensor>) -> SensorMorphology {
        SensorMorphology { sensors }
    }

    /// Returns a morphology of `count` randomly placed sensors.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::morphology::SensorMorphology;
    ///
    /// let morphology = SensorMorphology::random(5);
    /// assert_eq!(morphology.sensor_count(), 5);
    /// assert!(morphology.is_within_bounds());
    /// ```
    pub fn random(count: usize) -> SensorMorphology {
        let mut rng = rand::thread_rng();
        SensorMorphology {
            sensors: (0..count).map(|_| Sensor::random(&mut rng)).collect(),
        }
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Returns whether every sensor lies within the morphology bounds.
    pub fn is_within_bounds(&self) -> bool {
        self.sensors.iter().all(Sensor::is_within_bounds)
    }

    /// Mutates each sensor with a chance of `chance`,
    /// perturbing its parameters proportionally to `power`.
    pub fn mutate(&mut self, chance: f32, power: f32) {
        let mut rng = rand::thread_rng();
        for sensor in &mut self.sensors {
            if rng.gen::<f32>() < chance {
                sensor.perturb(power, &mut rng);
            }
        }
    }

    /// Appends a sensor, which becomes the last input.
    pub fn push(&mut self, sensor: Sensor) {
        self.sensors.push(sensor);
    }

    /// Removes and returns the sensor at `index`, shifting
    /// later sensors down. Returns `None` if there is none.
    pub fn remove(&mut self, index: usize) -> Option<Sensor> {
        if index < self.sensors.len() {
            Some(self.sensors.remove(index))
        } else {
            None
        }
    }

    /// Returns a morphology shaped like `first`. Each sensor is
    /// taken from `first`, or with equal probability from its
    /// counterpart in `second`, where `counterpart` maps a sensor
    /// index of `first` to one of `second`.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::morphology::SensorMorphology;
    ///
    /// let first = SensorMorphology::random(3);
    /// let second = SensorMorphology::random(1);
    ///
    /// // Only the first sensors correspond.
    /// let child = SensorMorphology::crossover(&first, &second, |i| (i == 0).then(|| 0));
    /// assert_eq!(child.sensor_count(), 3);
    /// assert_eq!(child.sensors()[1..], first.sensors()[1..]);
    /// ```
    pub fn crossover(
        first: &SensorMorphology,
        second: &SensorMorphology,
        counterpart: impl Fn(usize) -> Option<usize>,
    ) -> SensorMorphology {
        let mut rng = rand::thread_rng();
        SensorMorphology {
            sensors: first
                .sensors
                .iter()
                .enumerate()
                .map(|(i, own)| {
                    match counterpart(i).and_then(|j| second.sensors.get(j)) {
                        Some(other) if rng.gen::<bool>() => *other,
                        _ => *own,
                    }
                })
                .collect(),
        }
    }

    /// Returns the average normalized difference between
    /// corresponding sensors. Morphologies of different sizes
    /// are additionally penalized by the difference in count.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::morphology::SensorMorphology;
    ///
    /// let khepera = SensorMorphology::khepera_iii();
    /// assert_eq!(khepera.distance(&khepera), 0.0);
    /// ```
    pub fn distance(&self, other: &SensorMorphology) -> f32 {
        let paired = self.sensor_count().min(other.sensor_count());
        let count_difference = self.sensor_count().abs_diff(other.sensor_count()) as f32;
        if paired == 0 {
            return count_difference;
        }
        let sensor_difference: f32 = self
            .sensors
            .iter()
            .zip(&other.sensors)
            .map(|(a, b)| a.distance(b))
            .sum();
        sensor_difference / paired as f32 + count_difference
    }
}

impl fmt::Display for SensorMorphology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.sensors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{:.0}°/{:+.0}° r={:.2} fov={:.0}°",
                s.bearing.to_degrees(),
                s.orientation.to_degrees(),
                s.range,
                s.field_of_view.to_degrees()
            )?;
        }
        write!(f, "]")
    }
}

/// Wraps an angle into `[-π, π]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    wrapped.clamp(-PI, PI)
}

/// Returns the signed smallest angle from `from` to `to`.
pub fn angle_between(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}
