use rand::{rngs::SmallRng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{validate_bounds, ConfigError, VehiclePreset, WorldConfig};
use crate::drive::{effective_dt, VehiclePose};
use crate::light_field::{LightField, DEFAULT_HIT_THRESHOLD};
use crate::policy::{Mode, ModeError};
use crate::vehicle::VehicleAgent;

/// Owns the light field, the vehicles and the one random source they share.
#[derive(Debug)]
pub struct World {
    width: f32,
    height: f32,
    lights: LightField,
    vehicles: Vec<VehicleAgent>,
    rng: SmallRng,
    seed: u64,
    tick: u64,
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(entropy_seed);
        let mut rng = SmallRng::seed_from_u64(seed);
        let lights = LightField::with_default_pattern(config.width, config.height, config.lights);

        let mut vehicles = Vec::with_capacity(config.vehicles.len());
        for setup in &config.vehicles {
            let start = setup
                .pose
                .unwrap_or_else(|| VehiclePose::new(0.0, 0.0, 0.0));
            let mut agent = VehicleAgent::new(setup.config, start, config.width, config.height)?;
            if setup.pose.is_none() {
                agent.reset_pose(&mut rng);
            }
            vehicles.push(agent);
        }

        info!(
            width = config.width,
            height = config.height,
            seed,
            lights = lights.len(),
            vehicles = vehicles.len(),
            "world created"
        );

        Ok(Self {
            width: config.width,
            height: config.height,
            lights,
            vehicles,
            rng,
            seed,
            tick: 0,
        })
    }

    /// Preset world with `count` copies of the preset vehicle; extras start at random poses.
    pub fn from_preset(
        preset: VehiclePreset,
        count: usize,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let mut config = WorldConfig::for_preset(preset).with_vehicle_count(count);
        config.seed = seed;
        Self::new(config)
    }

    /// Advances every vehicle by one tick against the current light layout.
    pub fn step(&mut self, dt: f32) {
        let dt = effective_dt(dt);
        for vehicle in &mut self.vehicles {
            vehicle.update(&self.lights, dt, &mut self.rng);
        }
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn lights(&self) -> &LightField {
        &self.lights
    }

    pub fn vehicles(&self) -> &[VehicleAgent] {
        &self.vehicles
    }

    pub fn vehicle(&self, index: usize) -> Option<&VehicleAgent> {
        self.vehicles.get(index)
    }

    pub fn vehicle_mut(&mut self, index: usize) -> Option<&mut VehicleAgent> {
        self.vehicles.get_mut(index)
    }

    pub fn set_bounds(&mut self, width: f32, height: f32) -> Result<(), ConfigError> {
        validate_bounds(width, height)?;
        self.width = width;
        self.height = height;
        self.lights.set_bounds(width, height);
        for vehicle in &mut self.vehicles {
            vehicle.set_bounds(width, height);
        }
        debug!(width, height, "world bounds changed");
        Ok(())
    }

    pub fn add_light(&mut self, x: f32, y: f32) {
        self.lights.add(x, y);
    }

    pub fn add_light_with_radius(&mut self, x: f32, y: f32, radius: f32) {
        self.lights.add_with_radius(x, y, radius);
    }

    pub fn add_random_light(&mut self) {
        self.lights.add_random(&mut self.rng);
    }

    pub fn move_nearest_light(&mut self, x: f32, y: f32) -> bool {
        self.lights.move_nearest_or_none(x, y, DEFAULT_HIT_THRESHOLD)
    }

    /// Click handling: drag a nearby light or drop a new one. `true` when a light moved.
    pub fn move_nearest_light_or_add(&mut self, x: f32, y: f32) -> bool {
        self.lights.move_nearest_or_add(x, y, DEFAULT_HIT_THRESHOLD)
    }

    pub fn remove_nearest_light(&mut self, x: f32, y: f32) -> bool {
        self.lights.remove_nearest_if_close(x, y, DEFAULT_HIT_THRESHOLD)
    }

    pub fn reset_lights(&mut self) {
        self.lights.reset_to_default_pattern();
        self.clear_trails();
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear();
        self.clear_trails();
    }

    pub fn clear_trails(&mut self) {
        for vehicle in &mut self.vehicles {
            vehicle.clear_trail();
        }
    }

    pub fn set_mode(&mut self, index: usize, mode: Mode) -> bool {
        match self.vehicles.get_mut(index) {
            Some(vehicle) => {
                vehicle.set_mode(mode);
                true
            }
            None => false,
        }
    }

    pub fn set_mode_all(&mut self, mode: Mode) {
        for vehicle in &mut self.vehicles {
            vehicle.set_mode(mode);
        }
    }

    /// Applies a named mode to one vehicle; `Ok(false)` when the index is out of range.
    pub fn set_mode_by_name(&mut self, index: usize, name: &str) -> Result<bool, ModeError> {
        match self.vehicles.get_mut(index) {
            Some(vehicle) => vehicle.set_mode_by_name(name).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn reset_pose(&mut self, index: usize) -> bool {
        match self.vehicles.get_mut(index) {
            Some(vehicle) => {
                vehicle.reset_pose(&mut self.rng);
                true
            }
            None => false,
        }
    }

    pub fn reset_all_poses(&mut self) {
        for vehicle in &mut self.vehicles {
            vehicle.reset_pose(&mut self.rng);
        }
    }
}

fn entropy_seed() -> u64 {
    match getrandom::u64() {
        Ok(seed) => seed,
        Err(err) => {
            warn!(%err, "entropy unavailable, falling back to fixed seed");
            0x5eed_b8a1_7e4b_e7e5
        }
    }
}
