//! Braitenberg vehicle simulation: point lights, light sensors, sensor-to-motor
//! wiring policies and differential-drive kinematics on a wrapping 2D plane.
//!
//! The core types ([`World`], [`VehicleAgent`], [`LightField`]) are plain Rust;
//! [`Sim`] wraps a [`World`] for a browser host that owns drawing and input.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod drive;
pub mod light_field;
pub mod math;
pub mod policy;
pub mod sensor;
pub mod vehicle;
pub mod world;

pub use config::{ConfigError, LightPattern, VehicleConfig, VehiclePreset, WorldConfig};
pub use drive::{DriveIntegrator, MotorCommand, VehiclePose, WheelRange};
pub use light_field::{LightField, LightSource};
pub use policy::{Curve, Mode, ModeError, MotorPolicy, Wiring};
pub use sensor::{Falloff, SensorArray, SensorLayout, SensorReading};
pub use vehicle::VehicleAgent;
pub use world::World;

/// Floats per vehicle in [`Sim::vehicles`].
pub const VEHICLE_STRIDE: usize = 10;
/// Floats per light in [`Sim::lights`].
pub const LIGHT_STRIDE: usize = 3;

#[wasm_bindgen]
pub struct Sim {
    world: World,
}

#[wasm_bindgen]
impl Sim {
    /// `seed == 0` draws a seed from the platform entropy source.
    #[wasm_bindgen(constructor)]
    pub fn new(
        preset: &str,
        count: usize,
        seed: u32,
        width: f32,
        height: f32,
    ) -> Result<Sim, JsError> {
        let preset = VehiclePreset::from_name(preset)?;
        let mut config = WorldConfig::for_preset_in(preset, width, height).with_vehicle_count(count);
        config.seed = (seed != 0).then_some(u64::from(seed));
        Ok(Sim {
            world: World::new(config)?,
        })
    }

    #[wasm_bindgen(js_name = fromConfigJson)]
    pub fn from_config_json(json: &str) -> Result<Sim, JsError> {
        let config = WorldConfig::from_json(json)?;
        Ok(Sim {
            world: World::new(config)?,
        })
    }

    pub fn step(&mut self, dt: f32) {
        self.world.step(dt);
    }

    pub fn set_bounds(&mut self, width: f32, height: f32) -> Result<(), JsError> {
        self.world.set_bounds(width, height)?;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.world.vehicles().len()
    }

    pub fn width(&self) -> f32 {
        self.world.width()
    }

    pub fn height(&self) -> f32 {
        self.world.height()
    }

    pub fn tick(&self) -> f64 {
        self.world.tick() as f64
    }

    pub fn light_count(&self) -> usize {
        self.world.lights().len()
    }

    /// `[x, y, radius]` per light.
    pub fn lights(&self) -> Vec<f32> {
        let lights = self.world.lights().lights();
        let mut out = Vec::with_capacity(lights.len() * LIGHT_STRIDE);
        for light in lights {
            out.extend_from_slice(&[light.x, light.y, light.radius]);
        }
        out
    }

    /// `[x, y, heading, left_intensity, right_intensity, left_wheel, right_wheel,
    /// forward_speed, turn_rate, body_radius]` per vehicle.
    pub fn vehicles(&self) -> Vec<f32> {
        let vehicles = self.world.vehicles();
        let mut out = Vec::with_capacity(vehicles.len() * VEHICLE_STRIDE);
        for vehicle in vehicles {
            let pose = vehicle.pose();
            let reading = vehicle.last_reading();
            let command = vehicle.last_command();
            out.extend_from_slice(&[
                pose.x,
                pose.y,
                pose.heading,
                reading.left,
                reading.right,
                command.left,
                command.right,
                vehicle.forward_speed(),
                vehicle.turn_rate(),
                vehicle.config().body_radius,
            ]);
        }
        out
    }

    /// `[left_x, left_y, right_x, right_y]`; both pairs match for single-sensor bodies.
    pub fn sensors(&self, index: usize) -> Vec<f32> {
        self.world
            .vehicle(index)
            .map(|vehicle| {
                let points = vehicle.sensor_positions();
                let (left, right) = (points.left(), points.right());
                vec![left.0, left.1, right.0, right.1]
            })
            .unwrap_or_default()
    }

    /// Four body corners followed by the nose point, flattened.
    pub fn body_outline(&self, index: usize) -> Vec<f32> {
        self.world
            .vehicle(index)
            .map(|vehicle| {
                let mut out = Vec::with_capacity(10);
                for (x, y) in vehicle.body_outline() {
                    out.extend_from_slice(&[x, y]);
                }
                let (nose_x, nose_y) = vehicle.nose();
                out.extend_from_slice(&[nose_x, nose_y]);
                out
            })
            .unwrap_or_default()
    }

    pub fn trail(&self, index: usize) -> Vec<f32> {
        self.world
            .vehicle(index)
            .map(|vehicle| vehicle.trail().flat_map(|&(x, y)| [x, y]).collect())
            .unwrap_or_default()
    }

    pub fn mode(&self, index: usize) -> Option<String> {
        self.world
            .vehicle(index)
            .map(|vehicle| vehicle.mode().name().to_string())
    }

    pub fn mode_label(&self, index: usize) -> Option<String> {
        self.world
            .vehicle(index)
            .map(|vehicle| vehicle.mode().label().to_string())
    }

    /// `false` for an unknown name or index; the vehicle keeps its mode.
    pub fn set_mode(&mut self, index: usize, name: &str) -> bool {
        self.world.set_mode_by_name(index, name).unwrap_or(false)
    }

    pub fn reset_pose(&mut self, index: usize) -> bool {
        self.world.reset_pose(index)
    }

    pub fn add_light(&mut self, x: f32, y: f32) {
        self.world.add_light(x, y);
    }

    pub fn add_random_light(&mut self) {
        self.world.add_random_light();
    }

    /// Primary click: move the light under the cursor or drop a new one.
    pub fn click_light(&mut self, x: f32, y: f32) -> bool {
        self.world.move_nearest_light_or_add(x, y)
    }

    pub fn remove_light(&mut self, x: f32, y: f32) -> bool {
        self.world.remove_nearest_light(x, y)
    }

    pub fn reset_lights(&mut self) {
        self.world.reset_lights();
    }

    pub fn clear_lights(&mut self) {
        self.world.clear_lights();
    }

    pub fn clear_trails(&mut self) {
        self.world.clear_trails();
    }
}
