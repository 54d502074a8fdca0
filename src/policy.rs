use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::drive::MotorCommand;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    #[error("unknown vehicle mode `{0}`")]
    Unknown(String),
}

/// Which motor each sensor drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wiring {
    SameSide,
    Crossed,
}

/// Contribution of one sensor intensity to one wheel, before the base speed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Curve {
    Excitatory { gain: f32 },
    Inhibitory { gain: f32 },
    /// Peaks at the preferred intensity `mu`.
    Bell { gain: f32, mu: f32, sigma: f32 },
    /// Staircase with levels 0, 0.5 and 1 split at `low` and `high`.
    Step { gain: f32, low: f32, high: f32 },
}

impl Curve {
    pub fn response(&self, intensity: f32) -> f32 {
        match *self {
            Self::Excitatory { gain } => gain * intensity,
            Self::Inhibitory { gain } => -gain * intensity,
            Self::Bell { gain, mu, sigma } => {
                let offset = intensity - mu;
                gain * (-(offset * offset) / (2.0 * sigma * sigma)).exp()
            }
            Self::Step { gain, low, high } => {
                let level = if intensity < low {
                    0.0
                } else if intensity < high {
                    0.5
                } else {
                    1.0
                };
                gain * level
            }
        }
    }
}

/// Gains and curve shape parameters shared by every mode of one vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorTuning {
    pub base_speed: f32,
    pub motor_gain: f32,
    /// Gain used by the crossed-inhibitory explorer instead of `motor_gain`.
    pub explorer_gain: f32,
    pub bell_mu: f32,
    pub bell_sigma: f32,
    pub step_low: f32,
    pub step_high: f32,
}

impl Default for MotorTuning {
    fn default() -> Self {
        Self {
            base_speed: 1.5,
            motor_gain: 6.0,
            explorer_gain: 2.0,
            bell_mu: 0.35,
            bell_sigma: 0.18,
            step_low: 0.15,
            step_high: 0.40,
        }
    }
}

impl MotorTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            self.base_speed,
            self.motor_gain,
            self.explorer_gain,
            self.bell_mu,
            self.bell_sigma,
            self.step_low,
            self.step_high,
        ];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(ConfigError::InvalidMotor("all tuning values must be finite"));
        }
        if self.bell_sigma <= 0.0 {
            return Err(ConfigError::InvalidMotor("bell_sigma must be positive"));
        }
        if self.step_low > self.step_high {
            return Err(ConfigError::InvalidMotor(
                "step_low must not exceed step_high",
            ));
        }
        Ok(())
    }
}

/// Runtime-selectable behavior. Each mode is a (wiring, curve) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Same-side excitatory: turns away from light.
    Coward,
    /// Crossed excitatory: turns toward light.
    Aggressive,
    /// Same-side inhibitory: turns toward light and slows near it.
    Lover,
    /// Crossed inhibitory: approaches from afar, veers off up close.
    Explorer,
    /// Same-side bell curve: orbits at a preferred brightness.
    Bell,
    /// Same-side staircase: discrete turning decisions.
    Step,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Coward,
        Mode::Aggressive,
        Mode::Lover,
        Mode::Explorer,
        Mode::Bell,
        Mode::Step,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Coward => "coward",
            Self::Aggressive => "aggressive",
            Self::Lover => "lover",
            Self::Explorer => "explorer",
            Self::Bell => "bell",
            Self::Step => "step",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Coward => "2a coward (same-side excitatory)",
            Self::Aggressive => "2b aggressive (crossed excitatory)",
            Self::Lover => "3a lover (same-side inhibitory)",
            Self::Explorer => "3b explorer (crossed inhibitory)",
            Self::Bell => "4a non-monotonic (bell)",
            Self::Step => "4b thresholds (step)",
        }
    }

    pub fn wiring(self) -> Wiring {
        match self {
            Self::Aggressive | Self::Explorer => Wiring::Crossed,
            Self::Coward | Self::Lover | Self::Bell | Self::Step => Wiring::SameSide,
        }
    }

    pub fn curve(self, tuning: &MotorTuning) -> Curve {
        match self {
            Self::Coward | Self::Aggressive => Curve::Excitatory {
                gain: tuning.motor_gain,
            },
            Self::Lover => Curve::Inhibitory {
                gain: tuning.motor_gain,
            },
            Self::Explorer => Curve::Inhibitory {
                gain: tuning.explorer_gain,
            },
            Self::Bell => Curve::Bell {
                gain: tuning.motor_gain,
                mu: tuning.bell_mu,
                sigma: tuning.bell_sigma,
            },
            Self::Step => Curve::Step {
                gain: tuning.motor_gain,
                low: tuning.step_low,
                high: tuning.step_high,
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = ModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "coward" | "2a" => Ok(Self::Coward),
            "aggressive" | "2b" => Ok(Self::Aggressive),
            "lover" | "love" | "3a" => Ok(Self::Lover),
            "explorer" | "3b" => Ok(Self::Explorer),
            "bell" | "4a" => Ok(Self::Bell),
            "step" | "threshold" | "4b" => Ok(Self::Step),
            _ => Err(ModeError::Unknown(value.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorPolicy {
    pub wiring: Wiring,
    pub curve: Curve,
    pub base_speed: f32,
}

impl MotorPolicy {
    pub fn new(wiring: Wiring, curve: Curve, base_speed: f32) -> Self {
        Self {
            wiring,
            curve,
            base_speed,
        }
    }

    pub fn for_mode(mode: Mode, tuning: &MotorTuning) -> Self {
        Self::new(mode.wiring(), mode.curve(tuning), tuning.base_speed)
    }

    /// Raw wheel speeds, before noise and clamping.
    pub fn map(&self, left_intensity: f32, right_intensity: f32) -> MotorCommand {
        let from_left = self.base_speed + self.curve.response(left_intensity);
        let from_right = self.base_speed + self.curve.response(right_intensity);
        match self.wiring {
            Wiring::SameSide => MotorCommand::new(from_left, from_right),
            Wiring::Crossed => MotorCommand::new(from_right, from_left),
        }
    }
}
