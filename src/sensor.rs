use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::drive::VehiclePose;
use crate::light_field::LightField;
use crate::math::{distance_sq_2d, Rotation};

/// Where the sensors sit relative to the body, in units of body radius.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorLayout {
    /// One sensor straight ahead; both reading sides see the same value.
    Single { distance_factor: f32 },
    /// Two sensors at `±angle_deg` from heading, left on the positive side.
    Pair { angle_deg: f32, distance_factor: f32 },
}

impl SensorLayout {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (angle_deg, distance_factor) = match *self {
            Self::Single { distance_factor } => (0.0, distance_factor),
            Self::Pair {
                angle_deg,
                distance_factor,
            } => (angle_deg, distance_factor),
        };
        if !angle_deg.is_finite() {
            return Err(ConfigError::InvalidSensors("angle_deg must be finite"));
        }
        if !distance_factor.is_finite() || distance_factor <= 0.0 {
            return Err(ConfigError::InvalidSensors(
                "distance_factor must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// Per-light brightness law plus the cap applied to the per-sensor sum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law", rename_all = "snake_case")]
pub enum Falloff {
    /// `clamp(gain / (d² + epsilon), 0, per_light_cap)`.
    InverseSquare {
        gain: f32,
        epsilon: f32,
        per_light_cap: f32,
        aggregate_cap: f32,
    },
    /// `max_intensity * (max_range - d) / max_range` inside the range, zero beyond.
    Linear {
        max_range: f32,
        max_intensity: f32,
        aggregate_cap: f32,
    },
}

impl Default for Falloff {
    fn default() -> Self {
        Self::InverseSquare {
            gain: 800.0,
            epsilon: 1.0,
            per_light_cap: 1.5,
            aggregate_cap: 3.0,
        }
    }
}

impl Falloff {
    pub fn intensity(&self, distance_sq: f32) -> f32 {
        match *self {
            Self::InverseSquare {
                gain,
                epsilon,
                per_light_cap,
                ..
            } => (gain / (distance_sq.max(0.0) + epsilon)).clamp(0.0, per_light_cap),
            Self::Linear {
                max_range,
                max_intensity,
                ..
            } => {
                let distance = distance_sq.max(0.0).sqrt();
                if distance >= max_range {
                    0.0
                } else {
                    (max_range - distance) / max_range * max_intensity
                }
            }
        }
    }

    pub fn aggregate_cap(&self) -> f32 {
        match *self {
            Self::InverseSquare { aggregate_cap, .. } | Self::Linear { aggregate_cap, .. } => {
                aggregate_cap
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::InverseSquare {
                gain,
                epsilon,
                per_light_cap,
                aggregate_cap,
            } => {
                if !gain.is_finite() || gain <= 0.0 {
                    return Err(ConfigError::InvalidFalloff("gain must be finite and positive"));
                }
                if !epsilon.is_finite() || epsilon <= 0.0 {
                    return Err(ConfigError::InvalidFalloff(
                        "epsilon must be finite and positive",
                    ));
                }
                if !per_light_cap.is_finite() || per_light_cap <= 0.0 {
                    return Err(ConfigError::InvalidFalloff(
                        "per_light_cap must be finite and positive",
                    ));
                }
                if !aggregate_cap.is_finite() || aggregate_cap < per_light_cap {
                    return Err(ConfigError::InvalidFalloff(
                        "aggregate_cap must be finite and at least per_light_cap",
                    ));
                }
            }
            Self::Linear {
                max_range,
                max_intensity,
                aggregate_cap,
            } => {
                if !max_range.is_finite() || max_range <= 0.0 {
                    return Err(ConfigError::InvalidFalloff(
                        "max_range must be finite and positive",
                    ));
                }
                if !max_intensity.is_finite() || max_intensity <= 0.0 {
                    return Err(ConfigError::InvalidFalloff(
                        "max_intensity must be finite and positive",
                    ));
                }
                if !aggregate_cap.is_finite() || aggregate_cap <= 0.0 {
                    return Err(ConfigError::InvalidFalloff(
                        "aggregate_cap must be finite and positive",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub left: f32,
    pub right: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorPoints {
    Single((f32, f32)),
    Pair { left: (f32, f32), right: (f32, f32) },
}

impl SensorPoints {
    pub fn left(&self) -> (f32, f32) {
        match *self {
            Self::Single(point) => point,
            Self::Pair { left, .. } => left,
        }
    }

    pub fn right(&self) -> (f32, f32) {
        match *self {
            Self::Single(point) => point,
            Self::Pair { right, .. } => right,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SensorArray {
    layout: SensorLayout,
    falloff: Falloff,
    left_local: (f32, f32),
    right_local: (f32, f32),
}

impl SensorArray {
    pub fn new(layout: SensorLayout, falloff: Falloff, body_radius: f32) -> Self {
        let (left_local, right_local) = match layout {
            SensorLayout::Single { distance_factor } => {
                let ahead = (distance_factor * body_radius, 0.0);
                (ahead, ahead)
            }
            SensorLayout::Pair {
                angle_deg,
                distance_factor,
            } => {
                let distance = distance_factor * body_radius;
                let (sin, cos) = angle_deg.to_radians().sin_cos();
                ((cos * distance, sin * distance), (cos * distance, -sin * distance))
            }
        };

        Self {
            layout,
            falloff,
            left_local,
            right_local,
        }
    }

    pub fn falloff(&self) -> &Falloff {
        &self.falloff
    }

    pub fn positions(&self, pose: &VehiclePose) -> SensorPoints {
        let rotation = Rotation::from_heading(pose.heading);
        let origin = pose.position();
        let left = rotation.local_to_world(origin, self.left_local.0, self.left_local.1);
        match self.layout {
            SensorLayout::Single { .. } => SensorPoints::Single(left),
            SensorLayout::Pair { .. } => SensorPoints::Pair {
                left,
                right: rotation.local_to_world(origin, self.right_local.0, self.right_local.1),
            },
        }
    }

    /// Aggregate brightness at one point, summed over every light then capped.
    pub fn intensity_at(&self, point: (f32, f32), field: &LightField) -> f32 {
        let total: f32 = field
            .lights()
            .iter()
            .map(|light| {
                self.falloff
                    .intensity(distance_sq_2d(light.x - point.0, light.y - point.1))
            })
            .sum();
        total.clamp(0.0, self.falloff.aggregate_cap())
    }

    pub fn sense(&self, pose: &VehiclePose, field: &LightField) -> SensorReading {
        match self.positions(pose) {
            SensorPoints::Single(point) => {
                let intensity = self.intensity_at(point, field);
                SensorReading {
                    left: intensity,
                    right: intensity,
                }
            }
            SensorPoints::Pair { left, right } => SensorReading {
                left: self.intensity_at(left, field),
                right: self.intensity_at(right, field),
            },
        }
    }
}
