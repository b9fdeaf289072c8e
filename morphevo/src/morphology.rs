//! Resolution of the fixed morphology used in control mode.
use crate::errors::{ExperimentError, Result};
use crate::store;

use morphevo_nn::morphology::SensorMorphology;
use morphevo_nn::networks::{Encoding, RobotNetwork};

use std::path::Path;

/// Returns the morphology controllers are evolved over, if any.
///
/// Outside control mode morphologies are evolved, so there is none.
/// In control mode the morphology is taken from the robot network
/// stored at `morphology_path`, which must come from a
/// morphology-evolving encoding, or is the Khepera III layout if
/// no path is given.
///
/// # Errors
/// Returns [`ExperimentError::Deserialization`] if the stored network
/// cannot be read or has a fixed, rather than evolved, morphology.
pub fn resolve(
    control_mode: bool,
    morphology_path: Option<&Path>,
) -> Result<Option<SensorMorphology>> {
    if !control_mode {
        return Ok(None);
    }
    let morphology = match morphology_path {
        Some(path) => {
            let robot: RobotNetwork = store::load(path)?;
            if robot.encoding() == Encoding::Neat {
                return Err(ExperimentError::Deserialization {
                    path: path.to_path_buf(),
                    reason: format!(
                        "the network was evolved with the fixed-morphology {} encoding",
                        Encoding::Neat
                    ),
                });
            }
            log::info!(
                "Using the {}-sensor morphology of {}",
                robot.morphology().sensor_count(),
                path.display()
            );
            robot.into_morphology()
        }
        None => {
            log::info!("Using the default Khepera III morphology");
            SensorMorphology::khepera_iii()
        }
    };
    Ok(Some(morphology))
}
