//! Procedural road generation.
//!
//! - Analytic centre-line curve
//! - Rolling segment chain snapped anchor to anchor
//! - Decorative distant road past the chain

use bevy::prelude::*;

pub mod curve;
pub mod fake_road;
pub mod roads;
pub mod segment;
pub mod segment_chain;

pub struct ProcgenPlugin;

impl Plugin for ProcgenPlugin {
    fn build(&self, app: &mut App) {
        // Chain must advance before the distant road samples its far end
        app.add_plugins(roads::RoadsPlugin)
            .add_plugins(fake_road::FakeRoadPlugin);
    }
}
