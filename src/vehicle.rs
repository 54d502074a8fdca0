use std::collections::VecDeque;
use std::f32::consts::PI;

use rand::Rng;
use tracing::{debug, trace, warn};

use crate::config::{validate_bounds, ConfigError, VehicleConfig};
use crate::drive::{effective_dt, DriveIntegrator, Kinematics, MotorCommand, VehiclePose};
use crate::light_field::{inset_uniform, LightField};
use crate::math::Rotation;
use crate::policy::{Mode, ModeError, MotorPolicy};
use crate::sensor::{SensorArray, SensorPoints, SensorReading};

const BODY_LENGTH_FACTOR: f32 = 2.0;
const BODY_WIDTH_FACTOR: f32 = 1.2;

/// One Braitenberg vehicle: sensors, a motor policy and a differential drive.
#[derive(Clone, Debug)]
pub struct VehicleAgent {
    config: VehicleConfig,
    pose: VehiclePose,
    mode: Mode,
    policy: MotorPolicy,
    sensors: SensorArray,
    drive: DriveIntegrator,
    last_reading: SensorReading,
    last_command: MotorCommand,
    last_kinematics: Kinematics,
    trail: VecDeque<(f32, f32)>,
}

impl VehicleAgent {
    pub fn new(
        config: VehicleConfig,
        pose: VehiclePose,
        width: f32,
        height: f32,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        validate_bounds(width, height)?;

        let drive = DriveIntegrator::new(config.turn_gain, width, height);
        let mut pose = pose;
        drive.wrap(&mut pose);

        Ok(Self {
            config,
            pose,
            mode: config.initial_mode,
            policy: MotorPolicy::for_mode(config.initial_mode, &config.motor),
            sensors: SensorArray::new(config.sensors, config.falloff, config.body_radius),
            drive,
            last_reading: SensorReading::default(),
            last_command: MotorCommand::default(),
            last_kinematics: Kinematics::default(),
            trail: VecDeque::new(),
        })
    }

    /// One tick: sense, map, add noise, clamp, integrate. Never mutates `field`.
    /// A non-finite or non-positive `dt` counts as one tick.
    pub fn update<R: Rng + ?Sized>(&mut self, field: &LightField, dt: f32, rng: &mut R) {
        let dt = effective_dt(dt);
        let reading = self.sensors.sense(&self.pose, field);
        let mut raw = self.policy.map(reading.left, reading.right);

        let noise = self.config.motor_noise;
        if noise > 0.0 {
            raw.left += rng.random_range(-noise..=noise);
            raw.right += rng.random_range(-noise..=noise);
        }
        let command = self.config.wheels.clamp(raw);

        let jitter = self.config.heading_noise;
        if jitter > 0.0 {
            self.pose.heading += rng.random_range(-jitter..=jitter);
        }
        let kinematics = self.drive.step(&mut self.pose, command, dt);

        trace!(
            left_intensity = reading.left,
            right_intensity = reading.right,
            left_wheel = command.left,
            right_wheel = command.right,
            x = self.pose.x,
            y = self.pose.y,
            heading = self.pose.heading,
            "vehicle stepped"
        );

        self.last_reading = reading;
        self.last_command = command;
        self.last_kinematics = kinematics;
        self.push_trail();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.policy = MotorPolicy::for_mode(mode, &self.config.motor);
        debug!(mode = mode.name(), "vehicle mode set");
    }

    /// Unknown names are rejected and the current mode stays active.
    pub fn set_mode_by_name(&mut self, name: &str) -> Result<(), ModeError> {
        match name.parse::<Mode>() {
            Ok(mode) => {
                self.set_mode(mode);
                Ok(())
            }
            Err(err) => {
                warn!(name, current = self.mode.name(), "rejected vehicle mode");
                Err(err)
            }
        }
    }

    /// Random position inside the pose margin and heading in (-pi, pi]. Mode is kept.
    pub fn reset_pose<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (width, height) = self.drive.bounds();
        let margin = self.config.pose_margin;
        let x = inset_uniform(rng, width, margin);
        let y = inset_uniform(rng, height, margin);
        // Mirror [-pi, pi) so the interval is open at -pi.
        let heading = -rng.random_range(-PI..PI);
        self.pose = VehiclePose::new(x, y, heading);
        self.trail.clear();
        debug!(x, y, heading, "vehicle pose reset");
    }

    pub fn set_pose(&mut self, pose: VehiclePose) {
        self.pose = pose;
        self.drive.wrap(&mut self.pose);
    }

    pub fn set_bounds(&mut self, width: f32, height: f32) {
        self.drive.set_bounds(width, height);
        self.drive.wrap(&mut self.pose);
    }

    pub fn clear_trail(&mut self) {
        self.trail.clear();
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn pose(&self) -> VehiclePose {
        self.pose
    }

    pub fn position(&self) -> (f32, f32) {
        self.pose.position()
    }

    pub fn heading(&self) -> f32 {
        self.pose.heading
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn policy(&self) -> &MotorPolicy {
        &self.policy
    }

    pub fn last_reading(&self) -> SensorReading {
        self.last_reading
    }

    pub fn last_command(&self) -> MotorCommand {
        self.last_command
    }

    pub fn forward_speed(&self) -> f32 {
        self.last_kinematics.forward_speed
    }

    pub fn turn_rate(&self) -> f32 {
        self.last_kinematics.turn_rate
    }

    pub fn trail(&self) -> impl Iterator<Item = &(f32, f32)> + '_ {
        self.trail.iter()
    }

    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn sensor_positions(&self) -> SensorPoints {
        self.sensors.positions(&self.pose)
    }

    pub fn nose(&self) -> (f32, f32) {
        let half_length = self.config.body_radius * BODY_LENGTH_FACTOR * 0.5;
        Rotation::from_heading(self.pose.heading).local_to_world(
            self.pose.position(),
            half_length,
            0.0,
        )
    }

    /// Corners of the rectangular body, counter-clockwise from rear-right.
    pub fn body_outline(&self) -> [(f32, f32); 4] {
        let half_length = self.config.body_radius * BODY_LENGTH_FACTOR * 0.5;
        let half_width = self.config.body_radius * BODY_WIDTH_FACTOR * 0.5;
        let rotation = Rotation::from_heading(self.pose.heading);
        let origin = self.pose.position();
        [
            rotation.local_to_world(origin, -half_length, -half_width),
            rotation.local_to_world(origin, half_length, -half_width),
            rotation.local_to_world(origin, half_length, half_width),
            rotation.local_to_world(origin, -half_length, half_width),
        ]
    }

    fn push_trail(&mut self) {
        if self.config.max_trail_len == 0 {
            return;
        }
        while self.trail.len() >= self.config.max_trail_len {
            self.trail.pop_front();
        }
        self.trail.push_back(self.pose.position());
    }
}

#[cfg(test)]
mod tests {
    use super::VehicleAgent;
    use crate::config::{LightPattern, VehicleConfig, VehiclePreset};
    use crate::drive::{VehiclePose, WheelRange};
    use crate::light_field::LightField;
    use crate::policy::{Mode, ModeError};
    use rand::{rngs::SmallRng, SeedableRng};
    use std::f32::consts::PI;

    fn quiet_agent(mode: Mode, pose: VehiclePose) -> VehicleAgent {
        let mut config = VehiclePreset::Vehicle2.vehicle_config().without_noise();
        config.initial_mode = mode;
        VehicleAgent::new(config, pose, 800.0, 600.0).unwrap()
    }

    fn single_light(x: f32, y: f32) -> LightField {
        let mut field = LightField::new(800.0, 600.0, LightPattern::default());
        field.add(x, y);
        field
    }

    #[test]
    fn zero_noise_update_is_deterministic() {
        let field = single_light(400.0, 300.0);
        let pose = VehiclePose::new(220.0, 260.0, 0.4);
        let mut rng = SmallRng::seed_from_u64(1);

        for mode in Mode::ALL {
            let mut first = quiet_agent(mode, pose);
            let mut second = quiet_agent(mode, pose);
            for _ in 0..50 {
                first.update(&field, 1.0, &mut rng);
                second.update(&field, 1.0, &mut rng);
                assert_eq!(first.pose(), second.pose());
                assert_eq!(first.last_command(), second.last_command());
            }
        }
    }

    #[test]
    fn wheel_speeds_stay_in_range_with_coincident_light() {
        let mut rng = SmallRng::seed_from_u64(3);
        for preset in VehiclePreset::ALL {
            let config = preset.vehicle_config();
            for mode in Mode::ALL {
                let mut agent =
                    VehicleAgent::new(config, VehiclePose::new(300.0, 300.0, 1.0), 900.0, 700.0)
                        .unwrap();
                agent.set_mode(mode);
                let sensor = agent.sensor_positions().left();
                let mut field = LightField::new(900.0, 700.0, LightPattern::default());
                for _ in 0..5 {
                    field.add(sensor.0, sensor.1);
                }

                agent.update(&field, 1.0, &mut rng);
                let command = agent.last_command();
                for speed in [command.left, command.right] {
                    assert!(speed.is_finite());
                    assert!(speed >= config.wheels.min && speed <= config.wheels.max);
                }
                assert!(agent.position().0.is_finite() && agent.position().1.is_finite());
            }
        }
    }

    #[test]
    fn unknown_mode_keeps_previous_mode() {
        let mut agent = quiet_agent(Mode::Lover, VehiclePose::new(100.0, 100.0, 0.0));
        assert_eq!(
            agent.set_mode_by_name("teleport"),
            Err(ModeError::Unknown("teleport".to_string()))
        );
        assert_eq!(agent.mode(), Mode::Lover);

        assert!(agent.set_mode_by_name("explorer").is_ok());
        assert_eq!(agent.mode(), Mode::Explorer);
    }

    #[test]
    fn coward_turns_away_and_aggressive_turns_toward() {
        // Heading slightly toward +y puts the light on the right sensor's side.
        let field = single_light(400.0, 300.0);
        let pose = VehiclePose::new(250.0, 300.0, 0.2);
        let mut rng = SmallRng::seed_from_u64(5);

        let mut coward = quiet_agent(Mode::Coward, pose);
        coward.update(&field, 1.0, &mut rng);
        assert!(coward.last_reading().right > coward.last_reading().left);
        assert!(coward.heading() > 0.2);

        let mut aggressive = quiet_agent(Mode::Aggressive, pose);
        aggressive.update(&field, 1.0, &mut rng);
        assert!(aggressive.heading() < 0.2);
    }

    #[test]
    fn reset_pose_stays_in_margin_and_keeps_mode() {
        let mut agent = quiet_agent(Mode::Step, VehiclePose::new(10.0, 10.0, 0.0));
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..100 {
            agent.reset_pose(&mut rng);
            let pose = agent.pose();
            assert!(pose.x >= 100.0 && pose.x < 700.0);
            assert!(pose.y >= 100.0 && pose.y < 500.0);
            assert!(pose.heading > -PI && pose.heading <= PI);
        }
        assert_eq!(agent.mode(), Mode::Step);
    }

    #[test]
    fn trail_is_bounded() {
        let mut config = VehicleConfig::default().without_noise();
        config.max_trail_len = 5;
        let mut agent =
            VehicleAgent::new(config, VehiclePose::new(100.0, 100.0, 0.0), 800.0, 600.0).unwrap();
        let field = single_light(400.0, 300.0);
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..12 {
            agent.update(&field, 1.0, &mut rng);
        }
        assert_eq!(agent.trail_len(), 5);
        assert_eq!(agent.trail().last().copied(), Some(agent.position()));
        agent.clear_trail();
        assert_eq!(agent.trail_len(), 0);
    }

    #[test]
    fn body_outline_and_nose_follow_heading() {
        let agent = quiet_agent(Mode::Coward, VehiclePose::new(100.0, 100.0, 0.0));
        let outline = agent.body_outline();
        assert_eq!(outline[0], (75.0, 85.0));
        assert_eq!(outline[2], (125.0, 115.0));
        assert_eq!(agent.nose(), (125.0, 100.0));
    }

    #[test]
    fn invalid_dt_keeps_pose_finite() {
        let field = single_light(400.0, 300.0);
        let mut rng = SmallRng::seed_from_u64(8);
        let mut agent = quiet_agent(Mode::Coward, VehiclePose::new(250.0, 280.0, 0.3));
        let mut reference = agent.clone();

        agent.update(&field, f32::NAN, &mut rng);
        agent.update(&field, -2.0, &mut rng);
        reference.update(&field, 1.0, &mut rng);
        reference.update(&field, 1.0, &mut rng);

        assert_eq!(agent.pose(), reference.pose());
        assert!(agent.heading().is_finite());
        assert!(agent.last_reading().left < 1.5);
    }

    #[test]
    fn motor_noise_is_bounded_and_nonzero() {
        let amplitude = 0.4;
        let mut config = VehicleConfig::default().without_noise();
        config.motor_noise = amplitude;
        let base = config.motor.base_speed;
        let mut agent =
            VehicleAgent::new(config, VehiclePose::new(100.0, 100.0, 0.0), 800.0, 600.0).unwrap();
        let dark = LightField::new(800.0, 600.0, LightPattern::default());
        let mut rng = SmallRng::seed_from_u64(21);

        let mut max_deviation = 0.0_f32;
        let mut sides_differ = false;
        for _ in 0..1_000 {
            agent.update(&dark, 1.0, &mut rng);
            let command = agent.last_command();
            for speed in [command.left, command.right] {
                let deviation = (speed - base).abs();
                assert!(deviation <= amplitude + 1.0e-6, "deviation {deviation} exceeds {amplitude}");
                max_deviation = max_deviation.max(deviation);
            }
            sides_differ |= command.left != command.right;
        }
        assert!(max_deviation > 0.2);
        assert!(sides_differ);
    }

    #[test]
    fn motor_noise_lands_before_the_clamp() {
        let mut config = VehicleConfig::default().without_noise();
        config.motor.base_speed = 0.0;
        config.motor_noise = 0.4;
        config.wheels = WheelRange::unidirectional(8.0);
        let mut agent =
            VehicleAgent::new(config, VehiclePose::new(100.0, 100.0, 0.0), 800.0, 600.0).unwrap();
        let dark = LightField::new(800.0, 600.0, LightPattern::default());
        let mut rng = SmallRng::seed_from_u64(4);

        let mut clamped_to_zero = false;
        for _ in 0..200 {
            agent.update(&dark, 1.0, &mut rng);
            let command = agent.last_command();
            for speed in [command.left, command.right] {
                assert!((0.0..=0.4 + 1.0e-6).contains(&speed));
                clamped_to_zero |= speed == 0.0;
            }
        }
        assert!(clamped_to_zero);
    }

    #[test]
    fn heading_noise_jitters_within_amplitude() {
        let amplitude = 0.05;
        let mut config = VehicleConfig::default().without_noise();
        config.heading_noise = amplitude;
        let mut agent =
            VehicleAgent::new(config, VehiclePose::new(100.0, 100.0, 0.0), 800.0, 600.0).unwrap();
        let dark = LightField::new(800.0, 600.0, LightPattern::default());
        let mut rng = SmallRng::seed_from_u64(13);

        let mut moved = false;
        for _ in 0..500 {
            let before = agent.heading();
            agent.update(&dark, 1.0, &mut rng);
            // Equal wheels in the dark, so every heading change is jitter.
            assert_eq!(agent.turn_rate(), 0.0);
            let change = (agent.heading() - before).abs();
            assert!(change <= amplitude + 1.0e-5);
            moved |= change > 0.0;
        }
        assert!(moved);
    }

    #[test]
    fn construction_wraps_and_validates() {
        let agent = quiet_agent(Mode::Coward, VehiclePose::new(-3.0, 605.0, 0.0));
        assert_eq!(agent.position(), (797.0, 5.0));

        let mut config = VehicleConfig::default();
        config.turn_gain = -1.0;
        assert!(VehicleAgent::new(config, VehiclePose::new(0.0, 0.0, 0.0), 800.0, 600.0).is_err());
        assert!(
            VehicleAgent::new(VehicleConfig::default(), VehiclePose::new(0.0, 0.0, 0.0), 0.0, 600.0)
                .is_err()
        );
    }
}
