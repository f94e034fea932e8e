//! Endless Road - headless core of an endless driving game
//!
//! Generates a winding road one segment at a time around a moving viewpoint
//! and fills it with AI traffic that keeps its distance and changes lanes.

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

mod procgen;
mod simulation;

fn main() {
    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
        )
        .add_plugins(LogPlugin::default())
        // Clock, viewpoint and traffic
        .add_plugins(simulation::SimulationPlugin)
        // Road chain and distant road
        .add_plugins(procgen::ProcgenPlugin)
        .run();
}
