//! Scoring of decoded robots.
//!
//! [`ArenaEvaluator`] runs a phototaxis task: a differential-drive
//! robot starts in the middle of a square arena and must reach a
//! light using only its sensors. Trial layouts are derived from the
//! simulation seed, so every individual faces the same trials.
use crate::config::SimConfig;

use morphevo_engine::InvalidFitness;
use morphevo_nn::morphology::{angle_between, wrap_angle, MAX_RANGE};
use morphevo_nn::networks::RobotNetwork;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::f32::consts::TAU;

/// Score of a trial in which the light is reached on the very first step.
/// Trials in which the light is never reached score below
/// [`REACHED_SCORE`], so scores lie in `[0, MAX_TRIAL_SCORE]`.
pub const MAX_TRIAL_SCORE: f32 = 120.0;
/// Minimum score of a trial in which the light is reached.
pub const REACHED_SCORE: f32 = 100.0;

/// Network activations per control step.
const ACTIVATIONS_PER_STEP: usize = 2;
/// Sensor reach of a maximum-range sensor, in arena sizes.
const SENSOR_REACH: f32 = 1.5;
/// Distance of the light from the arena center, in arena sizes.
const LIGHT_DISTANCE: std::ops::RangeInclusive<f32> = 0.3..=0.4;
const DEMO_LOG_INTERVAL: usize = 20;

/// Errors marking an individual as unscoreable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("individual cannot be scored: {0}")]
    Unscoreable(String),
    /// The evaluator produced a negative or non-finite score.
    #[error("invalid score {0}")]
    InvalidScore(f32),
}

impl From<InvalidFitness> for EvaluationError {
    fn from(InvalidFitness(score): InvalidFitness) -> EvaluationError {
        EvaluationError::InvalidScore(score)
    }
}

/// Scores robots. Implementations are shared by the
/// worker threads of fitness evaluation.
pub trait ScoreEvaluator: Send + Sync {
    /// Returns the robot's score, which must be finite and non-negative.
    /// Any other score marks the robot as failed, with
    /// [`EvaluationError::InvalidScore`].
    ///
    /// # Errors
    /// Returns an error if the robot cannot be scored.
    fn score(&self, robot: &RobotNetwork) -> Result<f32, EvaluationError>;

    /// Replays the robot's behavior for inspection.
    fn demo(&self, robot: &RobotNetwork);
}

/// Position and heading of a robot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

/// Outcome of a single trial.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialReport {
    pub score: f32,
    /// Step at which the light was reached, if it was.
    pub reached_at: Option<usize>,
    pub closest_distance: f32,
}

/// The phototaxis arena.
#[derive(Clone, Debug)]
pub struct ArenaEvaluator {
    sim: SimConfig,
    trials: usize,
}

impl ArenaEvaluator {
    /// Creates an evaluator averaging `trials` trials per robot.
    pub fn new(sim: SimConfig, trials: usize) -> ArenaEvaluator {
        ArenaEvaluator {
            sim,
            trials: trials.max(1),
        }
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Returns the light position of trial `trial`.
    ///
    /// Lights are spread evenly around the arena center, starting
    /// from a seeded angle, at a seeded distance per trial.
    pub fn light_position(&self, trial: usize) -> (f32, f32) {
        let offset = StdRng::seed_from_u64(self.sim.seed).gen_range(0.0..TAU);
        let mut rng = StdRng::seed_from_u64(self.sim.seed.wrapping_add(trial as u64 + 1));
        let angle = offset + TAU * trial as f32 / self.trials as f32;
        let distance = rng.gen_range(LIGHT_DISTANCE) * self.sim.arena_size;
        let center = self.sim.arena_size / 2.0;
        (
            center + distance * angle.cos(),
            center + distance * angle.sin(),
        )
    }

    /// Runs one trial, reporting every pose to `observer`.
    ///
    /// # Errors
    /// Returns an error if the robot lacks wheel outputs or
    /// produces non-finite outputs.
    pub fn run_trial(
        &self,
        robot: &RobotNetwork,
        light: (f32, f32),
        mut observer: impl FnMut(usize, &Pose, f32),
    ) -> Result<TrialReport, EvaluationError> {
        let sim = &self.sim;
        let mut robot = robot.clone();
        robot.reset();

        let center = sim.arena_size / 2.0;
        let mut pose = Pose {
            x: center,
            y: center,
            heading: 0.0,
        };
        let initial_distance = distance_to(&pose, light);
        let mut closest_distance = initial_distance;

        for step in 1..=sim.steps_per_trial {
            let readings = self.sense(&robot, &pose, light);
            let mut outputs = vec![];
            for _ in 0..ACTIVATIONS_PER_STEP {
                outputs = robot.step(&readings);
            }
            let (left, right) = match outputs[..] {
                [left, right, ..] if left.is_finite() && right.is_finite() => (left, right),
                [_, _, ..] => {
                    return Err(EvaluationError::Unscoreable(format!(
                        "non-finite wheel outputs {:?}",
                        outputs
                    )))
                }
                _ => {
                    return Err(EvaluationError::Unscoreable(format!(
                        "{} outputs, 2 wheels needed",
                        outputs.len()
                    )))
                }
            };
            self.drive(&mut pose, left, right);

            let distance = distance_to(&pose, light);
            closest_distance = closest_distance.min(distance);
            observer(step, &pose, distance);

            if distance <= sim.target_radius {
                let speed_bonus = (MAX_TRIAL_SCORE - REACHED_SCORE)
                    * (1.0 - step as f32 / sim.steps_per_trial as f32);
                return Ok(TrialReport {
                    score: REACHED_SCORE + speed_bonus,
                    reached_at: Some(step),
                    closest_distance,
                });
            }
        }

        let progress = (1.0 - closest_distance / initial_distance).clamp(0.0, 1.0);
        Ok(TrialReport {
            score: REACHED_SCORE * progress,
            reached_at: None,
            closest_distance,
        })
    }

    /// Returns one light reading per sensor, in `[0, 1]`.
    ///
    /// A sensor sees the light when it lies within its field of view
    /// and reach; the reading falls off linearly with distance and
    /// with the angle off the sensor's axis.
    fn sense(&self, robot: &RobotNetwork, pose: &Pose, light: (f32, f32)) -> Vec<f32> {
        robot
            .morphology()
            .sensors()
            .iter()
            .map(|sensor| {
                let mount = pose.heading + sensor.bearing;
                let sx = pose.x + self.sim.robot_radius * mount.cos();
                let sy = pose.y + self.sim.robot_radius * mount.sin();
                let (dx, dy) = (light.0 - sx, light.1 - sy);
                let distance = (dx * dx + dy * dy).sqrt();
                let reach = sensor.range / MAX_RANGE * SENSOR_REACH * self.sim.arena_size;
                let off_axis = angle_between(pose.heading + sensor.heading(), dy.atan2(dx)).abs();
                let half_view = sensor.field_of_view / 2.0;
                if distance > reach || off_axis > half_view {
                    0.0
                } else {
                    (1.0 - distance / reach) * (1.0 - off_axis / half_view)
                }
            })
            .collect()
    }

    /// Advances the pose by one step. Outputs in `[0, 1]` map onto
    /// forward wheel speeds; the body is kept inside the arena.
    fn drive(&self, pose: &mut Pose, left: f32, right: f32) {
        let sim = &self.sim;
        let left = left.clamp(0.0, 1.0) * sim.wheel_speed;
        let right = right.clamp(0.0, 1.0) * sim.wheel_speed;
        let forward = (left + right) / 2.0;
        pose.heading = wrap_angle(pose.heading + (right - left) / (2.0 * sim.robot_radius));
        let low = sim.robot_radius;
        let high = sim.arena_size - sim.robot_radius;
        pose.x = (pose.x + forward * pose.heading.cos()).clamp(low, high);
        pose.y = (pose.y + forward * pose.heading.sin()).clamp(low, high);
    }
}

impl ScoreEvaluator for ArenaEvaluator {
    /// Returns the mean trial score, in `[0, MAX_TRIAL_SCORE]`.
    fn score(&self, robot: &RobotNetwork) -> Result<f32, EvaluationError> {
        let mut total = 0.0;
        for trial in 0..self.trials {
            total += self
                .run_trial(robot, self.light_position(trial), |_, _, _| {})?
                .score;
        }
        Ok(total / self.trials as f32)
    }

    fn demo(&self, robot: &RobotNetwork) {
        log::info!("Demonstrating {}", robot);
        let light = self.light_position(0);
        log::info!("Light at ({:.3}, {:.3})", light.0, light.1);
        let report = self.run_trial(robot, light, |step, pose, distance| {
            if step % DEMO_LOG_INTERVAL == 0 {
                log::info!(
                    "Step {:>4}: ({:.3}, {:.3}) heading {:>7.1}°, {:.3} from the light",
                    step,
                    pose.x,
                    pose.y,
                    pose.heading.to_degrees(),
                    distance
                );
            }
        });
        match report {
            Ok(report) => match report.reached_at {
                Some(step) => log::info!(
                    "Light reached at step {}, score {:.2}",
                    step,
                    report.score
                ),
                None => log::info!(
                    "Light not reached (closest {:.3}), score {:.2}",
                    report.closest_distance,
                    report.score
                ),
            },
            Err(e) => log::warn!("Demo aborted: {}", e),
        }
    }
}

fn distance_to(pose: &Pose, point: (f32, f32)) -> f32 {
    ((point.0 - pose.x).powi(2) + (point.1 - pose.y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use morphevo_nn::genomics::ActivationType;
    use morphevo_nn::morphology::{Sensor, SensorMorphology};
    use morphevo_nn::networks::{Encoding, RealTimeNetwork};

    fn sim() -> SimConfig {
        SimConfig {
            arena_size: 4.0,
            ..SimConfig::default()
        }
    }

    /// A robot without connections: both wheels run at half speed.
    fn cruiser() -> RobotNetwork {
        let controller = RealTimeNetwork::from_layout(
            0,
            &[ActivationType::Sigmoid, ActivationType::Sigmoid],
            &[],
            vec![],
        );
        RobotNetwork::new(controller, SensorMorphology::new(vec![]), Encoding::HyperNeatm)
    }

    /// A robot whose wheels never turn.
    fn parked() -> RobotNetwork {
        let controller = RealTimeNetwork::from_layout(
            0,
            &[ActivationType::Identity, ActivationType::Identity],
            &[],
            vec![],
        );
        RobotNetwork::new(controller, SensorMorphology::new(vec![]), Encoding::Neatm)
    }

    #[test]
    fn light_ahead_is_reached_quickly() {
        let evaluator = ArenaEvaluator::new(sim(), 1);
        let report = evaluator.run_trial(&cruiser(), (3.0, 2.0), |_, _, _| {}).unwrap();
        assert!(report.reached_at.is_some());
        assert!(report.score > 110.0);
        assert!(report.score <= MAX_TRIAL_SCORE);
    }

    #[test]
    fn light_behind_scores_nothing() {
        let evaluator = ArenaEvaluator::new(sim(), 1);
        let report = evaluator.run_trial(&cruiser(), (1.0, 2.0), |_, _, _| {}).unwrap();
        assert_eq!(report.reached_at, None);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn parked_robot_makes_no_progress() {
        let evaluator = ArenaEvaluator::new(sim(), 3);
        assert_eq!(evaluator.score(&parked()).unwrap(), 0.0);
    }

    #[test]
    fn scores_are_deterministic_and_bounded() {
        let evaluator = ArenaEvaluator::new(SimConfig::default(), 3);
        let robot = cruiser();
        let score = evaluator.score(&robot).unwrap();
        assert_eq!(evaluator.score(&robot).unwrap(), score);
        assert!((0.0..=MAX_TRIAL_SCORE).contains(&score));
    }

    #[test]
    fn lights_stay_inside_the_arena() {
        let config = SimConfig::default();
        let evaluator = ArenaEvaluator::new(config.clone(), 5);
        for trial in 0..5 {
            let (x, y) = evaluator.light_position(trial);
            assert!(x > 0.0 && x < config.arena_size);
            assert!(y > 0.0 && y < config.arena_size);
        }
    }

    #[test]
    fn sensors_see_only_within_their_field_of_view() {
        let evaluator = ArenaEvaluator::new(sim(), 1);
        let front = Sensor::radial(0.0, MAX_RANGE, std::f32::consts::FRAC_PI_2);
        let back = Sensor::radial(std::f32::consts::PI, MAX_RANGE, std::f32::consts::FRAC_PI_2);
        let controller = RealTimeNetwork::from_layout(
            2,
            &[ActivationType::Sigmoid, ActivationType::Sigmoid],
            &[],
            vec![],
        );
        let robot = RobotNetwork::new(
            controller,
            SensorMorphology::new(vec![front, back]),
            Encoding::Neatm,
        );
        let pose = Pose {
            x: 2.0,
            y: 2.0,
            heading: 0.0,
        };
        let readings = evaluator.sense(&robot, &pose, (3.0, 2.0));
        assert!(readings[0] > 0.5);
        assert_eq!(readings[1], 0.0);
    }

    #[test]
    fn missing_wheels_are_unscoreable() {
        let controller = RealTimeNetwork::from_layout(0, &[ActivationType::Sigmoid], &[], vec![]);
        let robot = RobotNetwork::new(controller, SensorMorphology::new(vec![]), Encoding::Neatm);
        let evaluator = ArenaEvaluator::new(sim(), 1);
        assert!(matches!(
            evaluator.score(&robot),
            Err(EvaluationError::Unscoreable(_))
        ));
    }
}
