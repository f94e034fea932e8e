//! Fixed-step simulation: viewpoint progress and traffic.
//!
//! The simulation runs on a fixed timestep (default 60 Hz) decoupled from the
//! frame rate. Systems listen for `SimulationTick` events and step their state
//! once per tick.

use bevy::prelude::*;

pub mod obstacle_probe;
pub mod traffic;
pub mod traffic_agent;
pub mod traffic_policy;
pub mod traffic_spawner;
pub mod viewpoint;

/// Ordering of per-frame work: the clock first, then the viewpoint, then
/// everything positioned relative to it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    Clock,
    Viewpoint,
    World,
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimulationConfig>()
            .init_resource::<SimulationStats>()
            .add_event::<SimulationTick>()
            .configure_sets(
                Update,
                (
                    SimulationSet::Clock,
                    SimulationSet::Viewpoint,
                    SimulationSet::World,
                )
                    .chain(),
            )
            .add_systems(Update, simulation_tick_system.in_set(SimulationSet::Clock))
            .add_plugins(viewpoint::ViewpointPlugin)
            .add_plugins(traffic::TrafficPlugin);
    }
}

/// Configuration for the simulation.
#[derive(Resource)]
pub struct SimulationConfig {
    /// Ticks per second.
    pub tick_rate: f32,
    /// Speed multiplier applied to frame time.
    pub speed: f32,
    /// Whether simulation is paused.
    pub paused: bool,
    /// Upper bound on ticks emitted in one frame, so a long stall does not
    /// turn into a burst of thousands of ticks.
    pub max_ticks_per_frame: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            speed: 1.0,
            paused: false,
            max_ticks_per_frame: 8,
        }
    }
}

/// Event sent each simulation tick (at tick_rate Hz).
#[derive(Event, Clone, Copy, Debug)]
pub struct SimulationTick {
    /// The tick number since simulation start.
    pub tick: u64,
    /// Delta time for this tick (1.0 / tick_rate).
    pub delta: f32,
    /// Simulated seconds elapsed at the end of this tick.
    pub time: f32,
}

/// Statistics about the simulation.
#[derive(Resource, Default)]
pub struct SimulationStats {
    /// Total ticks since simulation start.
    pub total_ticks: u64,
    /// Simulated seconds since start.
    pub elapsed: f32,
    /// Accumulated time for fixed timestep.
    pub accumulator: f32,
}

impl SimulationStats {
    /// Fold `frame_delta` seconds into the accumulator and return the ticks
    /// that are now due.
    pub fn accumulate(&mut self, config: &SimulationConfig, frame_delta: f32) -> Vec<SimulationTick> {
        let mut ticks = Vec::new();
        if config.paused || config.tick_rate <= 0.0 {
            return ticks;
        }

        self.accumulator += frame_delta * config.speed;
        let tick_duration = 1.0 / config.tick_rate;

        while self.accumulator >= tick_duration {
            if ticks.len() as u32 >= config.max_ticks_per_frame {
                // Drop the backlog rather than spiral
                self.accumulator = 0.0;
                break;
            }
            self.accumulator -= tick_duration;
            self.total_ticks += 1;
            self.elapsed += tick_duration;

            ticks.push(SimulationTick {
                tick: self.total_ticks,
                delta: tick_duration,
                time: self.elapsed,
            });
        }
        ticks
    }
}

/// System that generates simulation ticks at fixed intervals.
fn simulation_tick_system(
    config: Res<SimulationConfig>,
    mut stats: ResMut<SimulationStats>,
    time: Res<Time>,
    mut tick_events: EventWriter<SimulationTick>,
) {
    for tick in stats.accumulate(&config, time.delta_secs()) {
        tick_events.send(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_tick_per_step() {
        let config = SimulationConfig::default();
        let mut stats = SimulationStats::default();
        let ticks = stats.accumulate(&config, 3.5 / 60.0);
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[2].tick, 3);
        assert!((ticks[2].time - 3.0 / 60.0).abs() < 1e-6);
        assert!(stats.accumulator > 0.0);
    }

    #[test]
    fn paused_emits_nothing() {
        let config = SimulationConfig {
            paused: true,
            ..SimulationConfig::default()
        };
        let mut stats = SimulationStats::default();
        assert!(stats.accumulate(&config, 1.0).is_empty());
        assert_eq!(stats.total_ticks, 0);
    }

    #[test]
    fn long_stall_is_capped() {
        let config = SimulationConfig::default();
        let mut stats = SimulationStats::default();
        let ticks = stats.accumulate(&config, 5.0);
        assert_eq!(ticks.len(), 8);
        assert_eq!(stats.accumulator, 0.0);
    }

    #[test]
    fn speed_scales_time() {
        let config = SimulationConfig {
            speed: 2.0,
            ..SimulationConfig::default()
        };
        let mut stats = SimulationStats::default();
        assert_eq!(stats.accumulate(&config, 2.6 / 60.0).len(), 5);
    }
}
