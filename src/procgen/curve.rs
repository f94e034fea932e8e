//! Road centre-line as a pure function of longitudinal distance.
//!
//! The road bends sideways with a sine of distance and rolls up and down with
//! a second sine. Everything here is stateless and can be shared freely.

use bevy::prelude::*;

/// Sampling step used to approximate the curve derivative.
pub const DIRECTION_SAMPLE_STEP: f32 = 0.5;

/// Parameters of the road centre-line.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct RoadCurve {
    /// Angular frequency of the lateral bend (radians per world unit).
    pub curve_frequency: f32,
    /// Peak lateral displacement.
    pub curve_amplitude: f32,
    /// Angular frequency of the hills.
    pub elevation_frequency: f32,
    /// Peak height above/below `base_height`.
    pub elevation_amplitude: f32,
    pub base_height: f32,
    /// Ignore the lateral term entirely.
    pub straight_only: bool,
}

impl Default for RoadCurve {
    fn default() -> Self {
        Self {
            curve_frequency: 0.02,
            curve_amplitude: 4.0,
            elevation_frequency: 0.015,
            elevation_amplitude: 2.0,
            base_height: 0.0,
            straight_only: false,
        }
    }
}

impl RoadCurve {
    /// Centre-line position at distance `z`.
    pub fn position_at(&self, z: f32) -> Vec3 {
        let x = if self.straight_only {
            0.0
        } else {
            self.curve_amplitude * (z * self.curve_frequency).sin()
        };
        Vec3::new(x, self.elevation_at(z), z)
    }

    /// Height of the road surface at distance `z`.
    pub fn elevation_at(&self, z: f32) -> f32 {
        self.elevation_amplitude * (z * self.elevation_frequency).sin() + self.base_height
    }

    /// Unit heading of the road at `z`.
    ///
    /// Never returns a zero vector: a degenerate sample falls back to +Z.
    pub fn direction_at(&self, z: f32) -> Vec3 {
        let delta = self.position_at(z + DIRECTION_SAMPLE_STEP) - self.position_at(z);
        let dir = delta.normalize_or_zero();
        if dir == Vec3::ZERO || !dir.is_finite() {
            Vec3::Z
        } else {
            dir
        }
    }

    /// Orientation whose local +Z faces along the road and whose up stays
    /// close to world Y.
    pub fn rotation_at(&self, z: f32) -> Quat {
        look_rotation(self.direction_at(z))
    }
}

/// Rotation mapping local +Z onto `forward` while keeping +Y as the up hint.
pub fn look_rotation(forward: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let right = Vec3::Y.cross(forward).normalize_or_zero();
    if right == Vec3::ZERO {
        // Looking straight up or down
        return Quat::IDENTITY;
    }
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}
