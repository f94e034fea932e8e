//! Player progress along the road.
//!
//! The viewpoint is the longitudinal reference every recycling threshold is
//! measured against. It scrolls forward at the player's speed each tick.

use bevy::prelude::*;

use crate::procgen::curve::{look_rotation, RoadCurve};

use super::{SimulationSet, SimulationTick};

pub struct ViewpointPlugin;

impl Plugin for ViewpointPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewpointConfig>()
            .add_systems(Startup, setup_viewpoint)
            .add_systems(
                Update,
                (advance_viewpoint, place_player)
                    .chain()
                    .in_set(SimulationSet::Viewpoint),
            );
    }
}

/// Starting speed and bounds for the player.
#[derive(Resource)]
pub struct ViewpointConfig {
    pub start_speed: f32,
    pub min_speed: f32,
    pub max_speed: f32,
}

impl Default for ViewpointConfig {
    fn default() -> Self {
        Self {
            start_speed: 20.0,
            min_speed: 5.0,
            max_speed: 30.0,
        }
    }
}

/// Snapshot of the player's speed and its allowed range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSpeed {
    pub current: f32,
    pub min: f32,
    pub max: f32,
}

impl PlayerSpeed {
    /// Where `current` sits in `[min, max]`, clamped to `[0, 1]`.
    pub fn ratio(&self) -> f32 {
        let span = self.max - self.min;
        if span <= f32::EPSILON {
            return 0.0;
        }
        ((self.current - self.min) / span).clamp(0.0, 1.0)
    }
}

/// The player's place on the road.
#[derive(Resource, Clone, Debug)]
pub struct Viewpoint {
    /// Distance travelled along the road.
    pub distance: f32,
    pub speed: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Sideways offset from the road centre.
    pub lateral: f32,
}

impl Viewpoint {
    pub fn new(config: &ViewpointConfig) -> Self {
        let mut viewpoint = Self {
            distance: 0.0,
            speed: config.min_speed,
            min_speed: config.min_speed,
            max_speed: config.max_speed.max(config.min_speed),
            lateral: 0.0,
        };
        viewpoint.set_speed(config.start_speed);
        viewpoint
    }

    pub fn player_speed(&self) -> PlayerSpeed {
        PlayerSpeed {
            current: self.speed,
            min: self.min_speed,
            max: self.max_speed,
        }
    }

    /// Change speed, respecting the bounds.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(self.min_speed, self.max_speed);
    }

    pub fn advance(&mut self, dt: f32) {
        self.distance += self.speed * dt;
    }

    /// World position and orientation of the player on `curve`.
    pub fn pose(&self, curve: &RoadCurve) -> (Vec3, Quat) {
        let center = curve.position_at(self.distance);
        let dir = curve.direction_at(self.distance);
        let right = Vec3::Y.cross(dir).normalize_or_zero();
        (center + right * self.lateral, look_rotation(dir))
    }
}

/// The player's car, posed on the road at the viewpoint.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Player;

fn setup_viewpoint(mut commands: Commands, config: Res<ViewpointConfig>) {
    let viewpoint = Viewpoint::new(&config);
    commands.spawn((Player, Transform::default()));
    info!(
        "Viewpoint ready at {:.1} u/s (range {:.1}-{:.1})",
        viewpoint.speed, viewpoint.min_speed, viewpoint.max_speed
    );
    commands.insert_resource(viewpoint);
}

fn advance_viewpoint(
    mut ticks: EventReader<SimulationTick>,
    viewpoint: Option<ResMut<Viewpoint>>,
) {
    let Some(mut viewpoint) = viewpoint else {
        ticks.clear();
        return;
    };
    for tick in ticks.read() {
        viewpoint.advance(tick.delta);
    }
}

fn place_player(
    viewpoint: Option<Res<Viewpoint>>,
    curve: Option<Res<RoadCurve>>,
    mut players: Query<&mut Transform, With<Player>>,
) {
    let (Some(viewpoint), Some(curve)) = (viewpoint, curve) else {
        return;
    };
    let (translation, rotation) = viewpoint.pose(&curve);
    for mut transform in players.iter_mut() {
        transform.translation = translation;
        transform.rotation = rotation;
    }
}
