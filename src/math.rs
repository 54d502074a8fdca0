pub const EPSILON: f32 = 1.0e-6;

pub fn distance_sq_2d(dx: f32, dy: f32) -> f32 {
    dx * dx + dy * dy
}

/// Precomputed heading rotation shared by sensor placement and body geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    cos: f32,
    sin: f32,
}

impl Rotation {
    pub fn from_heading(heading: f32) -> Self {
        let (sin, cos) = heading.sin_cos();
        Self { cos, sin }
    }

    pub fn rotate(self, local_x: f32, local_y: f32) -> (f32, f32) {
        (
            self.cos * local_x - self.sin * local_y,
            self.sin * local_x + self.cos * local_y,
        )
    }

    /// Maps a body-local offset to world coordinates around `origin`.
    pub fn local_to_world(self, origin: (f32, f32), local_x: f32, local_y: f32) -> (f32, f32) {
        let (rx, ry) = self.rotate(local_x, local_y);
        (origin.0 + rx, origin.1 + ry)
    }
}

/// Toroidal wrap into `[0, extent)`.
pub fn wrap_coordinate(value: f32, extent: f32) -> f32 {
    if !value.is_finite() || extent <= EPSILON {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid rounds tiny negatives up to `extent` itself.
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

pub fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}
