use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drive::{VehiclePose, WheelRange};
use crate::policy::{Mode, MotorTuning};
use crate::sensor::{Falloff, SensorLayout};

pub const DEFAULT_TRAIL_LEN: usize = 2_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("world bounds must be positive and finite, got {width}x{height}")]
    InvalidBounds { width: f32, height: f32 },
    #[error("invalid vehicle configuration: {0}")]
    InvalidVehicle(&'static str),
    #[error("invalid sensor layout: {0}")]
    InvalidSensors(&'static str),
    #[error("invalid falloff law: {0}")]
    InvalidFalloff(&'static str),
    #[error("invalid motor tuning: {0}")]
    InvalidMotor(&'static str),
    #[error("wheel range [{min}, {max}] must satisfy -max <= min <= max with max > 0")]
    InvalidWheelRange { min: f32, max: f32 },
    #[error("invalid light pattern: {0}")]
    InvalidLightPattern(&'static str),
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternLayout {
    /// Two lights left and right of the center.
    Pair,
    /// Four lights on the axes around the center.
    Cross,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightPattern {
    pub layout: PatternLayout,
    pub spread: f32,
    pub light_radius: f32,
    pub random_margin: f32,
}

impl Default for LightPattern {
    fn default() -> Self {
        Self {
            layout: PatternLayout::Cross,
            spread: 150.0,
            light_radius: 20.0,
            random_margin: 50.0,
        }
    }
}

impl LightPattern {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.spread.is_finite() || self.spread < 0.0 {
            return Err(ConfigError::InvalidLightPattern(
                "spread must be finite and non-negative",
            ));
        }
        if !self.light_radius.is_finite() || self.light_radius <= 0.0 {
            return Err(ConfigError::InvalidLightPattern(
                "light_radius must be finite and positive",
            ));
        }
        if !self.random_margin.is_finite() || self.random_margin < 0.0 {
            return Err(ConfigError::InvalidLightPattern(
                "random_margin must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Per-instance constants for one vehicle; the agent tracks the live mode separately.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub body_radius: f32,
    pub sensors: SensorLayout,
    pub falloff: Falloff,
    pub motor: MotorTuning,
    pub wheels: WheelRange,
    pub turn_gain: f32,
    pub motor_noise: f32,
    pub heading_noise: f32,
    pub initial_mode: Mode,
    pub pose_margin: f32,
    pub max_trail_len: usize,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        VehiclePreset::Vehicle2.vehicle_config()
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.body_radius.is_finite() || self.body_radius <= 0.0 {
            return Err(ConfigError::InvalidVehicle(
                "body_radius must be finite and positive",
            ));
        }
        if !self.turn_gain.is_finite() || self.turn_gain < 0.0 {
            return Err(ConfigError::InvalidVehicle(
                "turn_gain must be finite and non-negative",
            ));
        }
        if !self.motor_noise.is_finite()
            || self.motor_noise < 0.0
            || !self.heading_noise.is_finite()
            || self.heading_noise < 0.0
        {
            return Err(ConfigError::InvalidVehicle(
                "noise amplitudes must be finite and non-negative",
            ));
        }
        if !self.pose_margin.is_finite() || self.pose_margin < 0.0 {
            return Err(ConfigError::InvalidVehicle(
                "pose_margin must be finite and non-negative",
            ));
        }
        self.sensors.validate()?;
        self.falloff.validate()?;
        self.motor.validate()?;
        self.wheels.validate()?;
        Ok(())
    }

    /// Copy with both noise sources silenced.
    pub fn without_noise(mut self) -> Self {
        self.motor_noise = 0.0;
        self.heading_noise = 0.0;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleSetup {
    pub config: VehicleConfig,
    /// Starting pose; a random pose inside the config's margin when absent.
    #[serde(default)]
    pub pose: Option<VehiclePose>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub lights: LightPattern,
    pub vehicles: Vec<VehicleSetup>,
}

impl WorldConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn for_preset(preset: VehiclePreset) -> Self {
        let (width, height) = preset.world_size();
        Self::for_preset_in(preset, width, height)
    }

    /// Preset tuning in caller-chosen bounds; lights and start pose follow the bounds.
    pub fn for_preset_in(preset: VehiclePreset, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            seed: None,
            lights: preset.light_pattern(),
            vehicles: vec![VehicleSetup {
                config: preset.vehicle_config(),
                pose: preset.start_pose(width, height),
            }],
        }
    }

    /// Pads the vehicle list with copies of the first vehicle at random poses.
    pub fn with_vehicle_count(mut self, count: usize) -> Self {
        if let Some(first) = self.vehicles.first().copied() {
            while self.vehicles.len() < count {
                self.vehicles.push(VehicleSetup {
                    config: first.config,
                    pose: None,
                });
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bounds(self.width, self.height)?;
        self.lights.validate()?;
        for setup in &self.vehicles {
            setup.config.validate()?;
        }
        Ok(())
    }
}

pub fn validate_bounds(width: f32, height: f32) -> Result<(), ConfigError> {
    if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
        return Err(ConfigError::InvalidBounds { width, height });
    }
    Ok(())
}

/// Tunings of the individual vehicle programs this crate grew out of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehiclePreset {
    /// One forward sensor; speed follows brightness, heading wanders.
    /// Sized after the multi-light variant rather than the 500x500 single-light one.
    Vehicle1,
    /// Coward with a linear falloff and no motor noise.
    Vehicle2Linear,
    /// Coward / aggressive with inverse-square sensing.
    Vehicle2,
    /// Larger car-bodied coward / aggressive with narrower wheel range.
    Vehicle2Car,
    /// Lover / explorer on unidirectional wheels.
    Vehicle3,
    /// Bell and step value curves with tight turning.
    Vehicle4,
}

impl VehiclePreset {
    pub const ALL: [VehiclePreset; 6] = [
        VehiclePreset::Vehicle1,
        VehiclePreset::Vehicle2Linear,
        VehiclePreset::Vehicle2,
        VehiclePreset::Vehicle2Car,
        VehiclePreset::Vehicle3,
        VehiclePreset::Vehicle4,
    ];

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "vehicle1" => Ok(Self::Vehicle1),
            "vehicle2_linear" | "vehicle2-linear" => Ok(Self::Vehicle2Linear),
            "vehicle2" => Ok(Self::Vehicle2),
            "vehicle2_car" | "vehicle2-car" => Ok(Self::Vehicle2Car),
            "vehicle3" => Ok(Self::Vehicle3),
            "vehicle4" => Ok(Self::Vehicle4),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    pub fn world_size(self) -> (f32, f32) {
        match self {
            Self::Vehicle1 => (600.0, 600.0),
            Self::Vehicle4 => (900.0, 700.0),
            Self::Vehicle2Linear | Self::Vehicle2 | Self::Vehicle2Car | Self::Vehicle3 => {
                (800.0, 600.0)
            }
        }
    }

    pub fn light_pattern(self) -> LightPattern {
        match self {
            Self::Vehicle1 => LightPattern {
                layout: PatternLayout::Pair,
                spread: 100.0,
                light_radius: 20.0,
                random_margin: 50.0,
            },
            Self::Vehicle4 => LightPattern {
                layout: PatternLayout::Pair,
                spread: 120.0,
                light_radius: 18.0,
                random_margin: 60.0,
            },
            Self::Vehicle2Car => LightPattern {
                light_radius: 18.0,
                ..LightPattern::default()
            },
            Self::Vehicle2Linear | Self::Vehicle2 | Self::Vehicle3 => LightPattern::default(),
        }
    }

    pub fn start_pose(self, width: f32, height: f32) -> Option<VehiclePose> {
        match self {
            Self::Vehicle1 => Some(VehiclePose::new(width * 0.25, height * 0.5, 0.0)),
            Self::Vehicle4 => Some(VehiclePose::new(
                width * 0.5,
                height * 0.5 - 160.0,
                60.0_f32.to_radians(),
            )),
            Self::Vehicle2Linear | Self::Vehicle2 | Self::Vehicle2Car | Self::Vehicle3 => None,
        }
    }

    pub fn vehicle_config(self) -> VehicleConfig {
        match self {
            Self::Vehicle1 => VehicleConfig {
                body_radius: 20.0,
                sensors: SensorLayout::Single {
                    distance_factor: 1.25,
                },
                falloff: Falloff::InverseSquare {
                    gain: 5_000.0,
                    epsilon: 1.0,
                    per_light_cap: 1.0,
                    aggregate_cap: 1.0,
                },
                motor: MotorTuning {
                    base_speed: -0.1,
                    motor_gain: 5.0,
                    ..MotorTuning::default()
                },
                wheels: WheelRange::unidirectional(5.0),
                turn_gain: 0.06,
                motor_noise: 0.0,
                heading_noise: 0.05,
                initial_mode: Mode::Coward,
                pose_margin: 100.0,
                max_trail_len: DEFAULT_TRAIL_LEN,
            },
            Self::Vehicle2Linear => VehicleConfig {
                body_radius: 25.0,
                sensors: SensorLayout::Pair {
                    angle_deg: 25.0,
                    distance_factor: 1.2,
                },
                falloff: Falloff::Linear {
                    max_range: 250.0,
                    max_intensity: 1.0,
                    aggregate_cap: 1.0,
                },
                motor: MotorTuning {
                    base_speed: 0.0,
                    motor_gain: 4.0,
                    ..MotorTuning::default()
                },
                wheels: WheelRange::reversible(8.0),
                turn_gain: 0.06,
                motor_noise: 0.0,
                heading_noise: 0.0,
                initial_mode: Mode::Coward,
                pose_margin: 100.0,
                max_trail_len: DEFAULT_TRAIL_LEN,
            },
            Self::Vehicle2 => VehicleConfig {
                body_radius: 25.0,
                sensors: SensorLayout::Pair {
                    angle_deg: 55.0,
                    distance_factor: 1.8,
                },
                falloff: Falloff::default(),
                motor: MotorTuning {
                    base_speed: 1.5,
                    motor_gain: 6.0,
                    ..MotorTuning::default()
                },
                wheels: WheelRange::reversible(8.0),
                turn_gain: 0.06,
                motor_noise: 0.4,
                heading_noise: 0.0,
                initial_mode: Mode::Coward,
                pose_margin: 100.0,
                max_trail_len: DEFAULT_TRAIL_LEN,
            },
            Self::Vehicle2Car => VehicleConfig {
                body_radius: 30.0,
                sensors: SensorLayout::Pair {
                    angle_deg: 50.0,
                    distance_factor: 1.6,
                },
                falloff: Falloff::default(),
                motor: MotorTuning {
                    base_speed: 1.4,
                    motor_gain: 6.0,
                    ..MotorTuning::default()
                },
                wheels: WheelRange::reversible(7.0),
                turn_gain: 0.055,
                motor_noise: 0.3,
                heading_noise: 0.0,
                initial_mode: Mode::Coward,
                pose_margin: 80.0,
                max_trail_len: DEFAULT_TRAIL_LEN,
            },
            Self::Vehicle3 => VehicleConfig {
                body_radius: 25.0,
                sensors: SensorLayout::Pair {
                    angle_deg: 55.0,
                    distance_factor: 1.8,
                },
                falloff: Falloff::default(),
                motor: MotorTuning {
                    base_speed: 1.8,
                    motor_gain: 5.0,
                    explorer_gain: 2.0,
                    ..MotorTuning::default()
                },
                wheels: WheelRange::unidirectional(8.0),
                turn_gain: 0.06,
                motor_noise: 0.2,
                heading_noise: 0.0,
                initial_mode: Mode::Lover,
                pose_margin: 100.0,
                max_trail_len: DEFAULT_TRAIL_LEN,
            },
            Self::Vehicle4 => VehicleConfig {
                body_radius: 22.0,
                sensors: SensorLayout::Pair {
                    angle_deg: 55.0,
                    distance_factor: 2.2,
                },
                falloff: Falloff::default(),
                motor: MotorTuning {
                    base_speed: 0.2,
                    motor_gain: 9.0,
                    explorer_gain: 9.0,
                    bell_mu: 0.35,
                    bell_sigma: 0.18,
                    step_low: 0.15,
                    step_high: 0.40,
                },
                wheels: WheelRange::reversible(10.0),
                turn_gain: 0.18,
                motor_noise: 0.02,
                heading_noise: 0.0,
                initial_mode: Mode::Bell,
                pose_margin: 80.0,
                max_trail_len: DEFAULT_TRAIL_LEN,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, VehicleConfig, VehiclePreset, WorldConfig};
    use crate::drive::WheelRange;
    use crate::policy::Mode;

    #[test]
    fn every_preset_validates() {
        for preset in VehiclePreset::ALL {
            let config = WorldConfig::for_preset(preset);
            assert!(config.validate().is_ok(), "{preset:?} should validate");
        }
    }

    #[test]
    fn rejects_degenerate_values() {
        let mut config = VehicleConfig::default();
        config.body_radius = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVehicle(_))
        ));

        let mut config = VehicleConfig::default();
        config.wheels = WheelRange { min: -9.0, max: 8.0 };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWheelRange { .. })
        ));

        let mut config = VehicleConfig::default();
        config.motor_noise = f32::NAN;
        assert!(config.validate().is_err());

        let mut world = WorldConfig::for_preset(VehiclePreset::Vehicle2);
        world.width = -1.0;
        assert!(matches!(
            world.validate(),
            Err(ConfigError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn car_preset_uses_its_own_tuning() {
        let config = WorldConfig::for_preset(VehiclePreset::Vehicle2Car);
        assert_eq!((config.width, config.height), (800.0, 600.0));
        assert_eq!(config.lights.light_radius, 18.0);

        let vehicle = config.vehicles[0].config;
        assert_eq!(vehicle.body_radius, 30.0);
        assert_eq!(vehicle.wheels, WheelRange::reversible(7.0));
        assert_eq!(vehicle.motor.base_speed, 1.4);
        assert_eq!(vehicle.turn_gain, 0.055);
        assert_eq!(vehicle.initial_mode, Mode::Coward);
        assert!(config.vehicles[0].pose.is_none());
    }

    #[test]
    fn loads_world_from_json() {
        let mut expected = WorldConfig::for_preset(VehiclePreset::Vehicle3);
        expected.seed = Some(42);
        let json = serde_json::to_string(&expected).unwrap();

        let loaded = WorldConfig::from_json(&json).unwrap();
        assert_eq!(loaded.seed, Some(42));
        assert_eq!(loaded.vehicles[0].config.initial_mode, Mode::Lover);
        assert_eq!(loaded.vehicles[0].config.wheels.min, 0.0);
    }

    #[test]
    fn json_errors_surface_as_config_errors() {
        assert!(matches!(
            WorldConfig::from_json("{ \"width\": 800 "),
            Err(ConfigError::Json(_))
        ));
        assert_eq!(
            VehiclePreset::from_name("vehicle2-car").ok(),
            Some(VehiclePreset::Vehicle2Car)
        );
        assert!(matches!(
            VehiclePreset::from_name("vehicle9"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }
}
