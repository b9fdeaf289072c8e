use super::{Sensor, SensorMorphology};

/// Number of sensors of the [Khepera III](SensorMorphology::khepera_iii) layout.
pub const KHEPERA_III_SENSOR_COUNT: usize = 8;

const KHEPERA_III_BEARINGS: [f32; KHEPERA_III_SENSOR_COUNT] =
    [-150.0, -90.0, -45.0, -15.0, 15.0, 45.0, 90.0, 150.0];
const KHEPERA_III_RANGE: f32 = 0.25;
const KHEPERA_III_FIELD_OF_VIEW: f32 = 30.0;

impl SensorMorphology {
    /// Returns the sensor layout of a Khepera III robot:
    /// eight outward-facing proximity sensors, denser at the front.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::morphology::{SensorMorphology, KHEPERA_III_SENSOR_COUNT};
    ///
    /// let morphology = SensorMorphology::khepera_iii();
    /// assert_eq!(morphology.sensor_count(), KHEPERA_III_SENSOR_COUNT);
    /// assert_eq!(morphology, SensorMorphology::khepera_iii());
    /// assert!(morphology.is_within_bounds());
    /// ```
    pub fn khepera_iii() -> SensorMorphology {
        SensorMorphology::new(
            KHEPERA_III_BEARINGS
                .iter()
                .map(|bearing| {
                    Sensor::radial(
                        bearing.to_radians(),
                        KHEPERA_III_RANGE,
                        KHEPERA_III_FIELD_OF_VIEW.to_radians(),
                    )
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_symmetric() {
        let sensors = SensorMorphology::khepera_iii();
        let sensors = sensors.sensors();
        for (left, right) in sensors.iter().zip(sensors.iter().rev()) {
            assert!((left.bearing + right.bearing).abs() < 1e-5);
            assert_eq!(left.orientation, 0.0);
        }
    }
}
