use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{LightPattern, PatternLayout};
use crate::math::distance_sq_2d;

pub const DEFAULT_HIT_THRESHOLD: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl LightSource {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn distance_sq_to(&self, x: f32, y: f32) -> f32 {
        distance_sq_2d(self.x - x, self.y - y)
    }

    /// Squared comparison only; boundary equality counts as a hit.
    pub fn is_hit(&self, x: f32, y: f32, threshold_factor: f32) -> bool {
        let reach = self.radius * threshold_factor;
        self.distance_sq_to(x, y) <= reach * reach
    }
}

/// Point lights in an unordered collection. Only mutated by explicit edits.
#[derive(Clone, Debug)]
pub struct LightField {
    lights: Vec<LightSource>,
    width: f32,
    height: f32,
    pattern: LightPattern,
}

impl LightField {
    pub fn new(width: f32, height: f32, pattern: LightPattern) -> Self {
        Self {
            lights: Vec::new(),
            width,
            height,
            pattern,
        }
    }

    pub fn with_default_pattern(width: f32, height: f32, pattern: LightPattern) -> Self {
        let mut field = Self::new(width, height, pattern);
        field.reset_to_default_pattern();
        field
    }

    pub fn set_bounds(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn pattern(&self) -> &LightPattern {
        &self.pattern
    }

    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn add(&mut self, x: f32, y: f32) {
        self.add_with_radius(x, y, self.pattern.light_radius);
    }

    pub fn add_with_radius(&mut self, x: f32, y: f32, radius: f32) {
        self.lights.push(LightSource::new(x, y, radius));
        debug!(x, y, radius, count = self.lights.len(), "light added");
    }

    pub fn add_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.add_random_with_radius(rng, self.pattern.light_radius);
    }

    /// Places a light uniformly inside the bounds inset by `max(random_margin, radius)`.
    pub fn add_random_with_radius<R: Rng + ?Sized>(&mut self, rng: &mut R, radius: f32) {
        let margin = self.pattern.random_margin.max(radius);
        let x = inset_uniform(rng, self.width, margin);
        let y = inset_uniform(rng, self.height, margin);
        self.add_with_radius(x, y, radius);
    }

    pub fn nearest_to(&self, x: f32, y: f32) -> Option<&LightSource> {
        self.nearest_index(x, y).map(|index| &self.lights[index])
    }

    pub fn move_nearest_or_none(&mut self, x: f32, y: f32, threshold_factor: f32) -> bool {
        let Some(index) = self.hit_index(x, y, threshold_factor) else {
            return false;
        };
        let light = &mut self.lights[index];
        debug!(from_x = light.x, from_y = light.y, x, y, "light moved");
        light.x = x;
        light.y = y;
        true
    }

    /// Moves the nearest light when the click hits it, otherwise adds one there.
    /// Returns `true` when an existing light was moved.
    pub fn move_nearest_or_add(&mut self, x: f32, y: f32, threshold_factor: f32) -> bool {
        if self.move_nearest_or_none(x, y, threshold_factor) {
            return true;
        }
        self.add(x, y);
        false
    }

    pub fn remove_nearest_if_close(&mut self, x: f32, y: f32, threshold_factor: f32) -> bool {
        let Some(index) = self.hit_index(x, y, threshold_factor) else {
            return false;
        };
        let removed = self.lights.swap_remove(index);
        debug!(x = removed.x, y = removed.y, count = self.lights.len(), "light removed");
        true
    }

    pub fn reset_to_default_pattern(&mut self) {
        self.lights.clear();
        let cx = self.width * 0.5;
        let cy = self.height * 0.5;
        let spread = self.pattern.spread;
        let radius = self.pattern.light_radius;

        self.lights.push(LightSource::new(cx - spread, cy, radius));
        self.lights.push(LightSource::new(cx + spread, cy, radius));
        if self.pattern.layout == PatternLayout::Cross {
            self.lights.push(LightSource::new(cx, cy - spread, radius));
            self.lights.push(LightSource::new(cx, cy + spread, radius));
        }
        debug!(count = self.lights.len(), spread, "lights reset to default pattern");
    }

    pub fn clear(&mut self) {
        self.lights.clear();
        debug!("lights cleared");
    }

    fn nearest_index(&self, x: f32, y: f32) -> Option<usize> {
        let mut nearest = None;
        let mut nearest_dist_sq = f32::MAX;
        for (index, light) in self.lights.iter().enumerate() {
            let dist_sq = light.distance_sq_to(x, y);
            if nearest.is_none() || dist_sq < nearest_dist_sq {
                nearest = Some(index);
                nearest_dist_sq = dist_sq;
            }
        }
        nearest
    }

    fn hit_index(&self, x: f32, y: f32, threshold_factor: f32) -> Option<usize> {
        self.nearest_index(x, y)
            .filter(|&index| self.lights[index].is_hit(x, y, threshold_factor))
    }
}

/// Uniform draw in `[margin, extent - margin)`, or the midpoint when the inset is empty.
pub(crate) fn inset_uniform<R: Rng + ?Sized>(rng: &mut R, extent: f32, margin: f32) -> f32 {
    let low = margin.max(0.0);
    let high = extent - margin;
    if high <= low {
        return extent * 0.5;
    }
    rng.random_range(low..high)
}

#[cfg(test)]
mod tests {
    use super::{LightField, DEFAULT_HIT_THRESHOLD};
    use crate::config::{LightPattern, PatternLayout};
    use rand::{rngs::SmallRng, SeedableRng};

    fn cross_pattern() -> LightPattern {
        LightPattern {
            layout: PatternLayout::Cross,
            spread: 150.0,
            light_radius: 20.0,
            random_margin: 50.0,
        }
    }

    fn empty_field() -> LightField {
        LightField::new(800.0, 600.0, cross_pattern())
    }

    #[test]
    fn empty_field_reports_no_match() {
        let mut field = empty_field();
        assert!(field.nearest_to(10.0, 10.0).is_none());
        assert!(!field.move_nearest_or_none(10.0, 10.0, DEFAULT_HIT_THRESHOLD));
        assert!(!field.remove_nearest_if_close(10.0, 10.0, DEFAULT_HIT_THRESHOLD));
        assert!(field.is_empty());
    }

    #[test]
    fn nearest_uses_squared_distance() {
        let mut field = empty_field();
        field.add(100.0, 100.0);
        field.add(300.0, 100.0);
        let nearest = field.nearest_to(250.0, 90.0).unwrap();
        assert_eq!(nearest.position(), (300.0, 100.0));
    }

    #[test]
    fn hit_threshold_boundary_counts_as_hit() {
        let mut field = empty_field();
        field.add_with_radius(0.0, 0.0, 20.0);

        // 24^2 + 32^2 == (20 * 2)^2 exactly.
        assert!(field.move_nearest_or_none(24.0, 32.0, 2.0));
        assert_eq!(field.lights()[0].position(), (24.0, 32.0));

        assert!(!field.move_nearest_or_none(24.0 + 40.5, 32.0, 2.0));
        assert_eq!(field.lights()[0].position(), (24.0, 32.0));
    }

    #[test]
    fn remove_only_when_close() {
        let mut field = empty_field();
        field.add(100.0, 100.0);
        field.add(400.0, 400.0);

        assert!(!field.remove_nearest_if_close(200.0, 200.0, DEFAULT_HIT_THRESHOLD));
        assert_eq!(field.len(), 2);

        assert!(field.remove_nearest_if_close(390.0, 410.0, DEFAULT_HIT_THRESHOLD));
        assert_eq!(field.len(), 1);
        assert_eq!(field.lights()[0].position(), (100.0, 100.0));
    }

    #[test]
    fn move_or_add_adds_on_miss() {
        let mut field = empty_field();
        field.add(100.0, 100.0);

        assert!(field.move_nearest_or_add(110.0, 100.0, DEFAULT_HIT_THRESHOLD));
        assert_eq!(field.len(), 1);

        assert!(!field.move_nearest_or_add(500.0, 500.0, DEFAULT_HIT_THRESHOLD));
        assert_eq!(field.len(), 2);
        assert_eq!(field.lights()[1].radius, 20.0);
    }

    #[test]
    fn default_patterns_are_symmetric_about_center() {
        let mut field = empty_field();
        field.reset_to_default_pattern();
        assert_eq!(field.len(), 4);
        let (sum_x, sum_y) = field
            .lights()
            .iter()
            .fold((0.0, 0.0), |acc, light| (acc.0 + light.x, acc.1 + light.y));
        assert_eq!(sum_x / 4.0, 400.0);
        assert_eq!(sum_y / 4.0, 300.0);

        let mut pair = LightField::with_default_pattern(
            900.0,
            700.0,
            LightPattern {
                layout: PatternLayout::Pair,
                spread: 120.0,
                light_radius: 18.0,
                random_margin: 60.0,
            },
        );
        assert_eq!(pair.len(), 2);
        assert_eq!(pair.lights()[0].position(), (330.0, 350.0));
        assert_eq!(pair.lights()[1].position(), (570.0, 350.0));

        pair.clear();
        assert!(pair.is_empty());
    }

    #[test]
    fn random_lights_stay_inside_inset() {
        let mut field = empty_field();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            field.add_random(&mut rng);
        }
        for light in field.lights() {
            assert!(light.x >= 50.0 && light.x < 750.0);
            assert!(light.y >= 50.0 && light.y < 550.0);
        }

        field.clear();
        field.add_random_with_radius(&mut rng, 80.0);
        let light = field.lights()[0];
        assert!(light.x >= 80.0 && light.x < 720.0);
    }
}
