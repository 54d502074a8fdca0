use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::math::{clamp_finite, wrap_coordinate};

/// Tick length used when the caller passes a non-finite or non-positive `dt`.
pub const DEFAULT_DT: f32 = 1.0;

pub fn effective_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        DEFAULT_DT
    }
}

/// Heading is left unnormalized; only trig functions consume it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehiclePose {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

impl VehiclePose {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self { x, y, heading }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorCommand {
    pub left: f32,
    pub right: f32,
}

impl MotorCommand {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Allowed wheel speeds. `min` is 0 for unidirectional wheels, `-max` for reversible ones.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelRange {
    pub min: f32,
    pub max: f32,
}

impl WheelRange {
    pub fn reversible(max: f32) -> Self {
        Self { min: -max, max }
    }

    pub fn unidirectional(max: f32) -> Self {
        Self { min: 0.0, max }
    }

    pub fn clamp(&self, command: MotorCommand) -> MotorCommand {
        // Non-finite input stops the wheel rather than spreading NaN into the pose.
        let rest = 0.0_f32.clamp(self.min, self.max);
        MotorCommand::new(
            clamp_finite(command.left, self.min, self.max, rest),
            clamp_finite(command.right, self.min, self.max, rest),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = self.min.is_finite()
            && self.max.is_finite()
            && self.max > 0.0
            && self.min <= self.max
            && self.min >= -self.max;
        if !valid {
            return Err(ConfigError::InvalidWheelRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub forward_speed: f32,
    pub turn_rate: f32,
}

/// Differential-drive integration on a torus of `width` x `height`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriveIntegrator {
    turn_gain: f32,
    width: f32,
    height: f32,
}

impl DriveIntegrator {
    pub fn new(turn_gain: f32, width: f32, height: f32) -> Self {
        Self {
            turn_gain,
            width,
            height,
        }
    }

    pub fn set_bounds(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn kinematics(&self, command: MotorCommand) -> Kinematics {
        Kinematics {
            forward_speed: 0.5 * (command.left + command.right),
            turn_rate: (command.right - command.left) * self.turn_gain,
        }
    }

    /// Rotate first, then translate along the new heading, then wrap.
    pub fn step(&self, pose: &mut VehiclePose, command: MotorCommand, dt: f32) -> Kinematics {
        let dt = effective_dt(dt);
        let kinematics = self.kinematics(command);
        pose.heading += kinematics.turn_rate * dt;
        let (sin, cos) = pose.heading.sin_cos();
        pose.x += kinematics.forward_speed * cos * dt;
        pose.y += kinematics.forward_speed * sin * dt;
        self.wrap(pose);
        kinematics
    }

    pub fn wrap(&self, pose: &mut VehiclePose) {
        pose.x = wrap_coordinate(pose.x, self.width);
        pose.y = wrap_coordinate(pose.y, self.height);
    }
}
