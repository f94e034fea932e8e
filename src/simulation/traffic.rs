//! AI traffic on the endless road.
//!
//! One spawner per lane feeds agents onto the road ahead of the viewpoint.
//! Every tick the agents see a fresh snapshot of the road (other agents plus
//! the player), regulate speed and lane, and close in on the viewpoint until
//! they expire behind it.

use bevy::log::warn_once;
use bevy::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use crate::procgen::curve::{look_rotation, RoadCurve};

use super::obstacle_probe::TrafficField;
use super::traffic_agent::{AgentStatus, AgentTuning, TrafficAgent};
use super::traffic_policy::{TrafficPolicy, TravelDirection};
use super::traffic_spawner::{SpawnOutcome, TrafficSpawner, VehicleKind};
use super::viewpoint::Viewpoint;
use super::{SimulationSet, SimulationTick};

pub struct TrafficPlugin;

impl Plugin for TrafficPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrafficPolicy>()
            .init_resource::<AgentTuning>()
            .init_resource::<TrafficLayout>()
            .init_resource::<TrafficStats>()
            .add_systems(Startup, setup_lane_spawners)
            .add_systems(
                Update,
                (run_spawners, drive_agents, place_agents)
                    .chain()
                    .in_set(SimulationSet::World),
            );
    }
}

/// One lane of traffic.
#[derive(Clone, Copy, Debug)]
pub struct LaneSpec {
    pub lateral: f32,
    pub direction: TravelDirection,
}

/// Lane layout and spawn placement.
#[derive(Resource, Clone, Debug)]
pub struct TrafficLayout {
    pub lanes: Vec<LaneSpec>,
    /// Spawn sites sit this far ahead of the viewpoint.
    pub spawn_offset: f32,
    pub vehicle_pool: Vec<VehicleKind>,
    pub seed: u64,
}

impl Default for TrafficLayout {
    fn default() -> Self {
        let lane = |lateral, direction| LaneSpec { lateral, direction };
        Self {
            // Oncoming on the left, same-direction on the right
            lanes: vec![
                lane(-10.0, TravelDirection::Inbound),
                lane(-6.0, TravelDirection::Inbound),
                lane(-2.0, TravelDirection::Inbound),
                lane(2.0, TravelDirection::Outbound),
                lane(6.0, TravelDirection::Outbound),
                lane(10.0, TravelDirection::Outbound),
            ],
            spawn_offset: 150.0,
            vehicle_pool: vec![
                VehicleKind::Sedan,
                VehicleKind::Hatchback,
                VehicleKind::Van,
                VehicleKind::Truck,
            ],
            seed: 77777,
        }
    }
}

/// Running totals for traffic.
#[derive(Resource, Default, Debug)]
pub struct TrafficStats {
    pub spawned: u64,
    pub expired: u64,
    pub deferred: u64,
    pub empty_pool: u64,
}

fn setup_lane_spawners(mut commands: Commands, layout: Res<TrafficLayout>) {
    for lane in &layout.lanes {
        commands.spawn(TrafficSpawner::new(
            lane.direction,
            lane.lateral,
            layout.spawn_offset,
            layout.vehicle_pool.clone(),
        ));
    }
    info!(
        "Traffic ready: {} lanes, spawn sites {:.0} ahead",
        layout.lanes.len(),
        layout.spawn_offset
    );
}

fn snapshot(agents: &Query<(Entity, &TrafficAgent)>, viewpoint: &Viewpoint) -> TrafficField {
    let mut field = TrafficField::new();
    for (entity, agent) in agents.iter() {
        field.add_agent(entity, agent.lateral, agent.offset);
    }
    field.add_player(viewpoint.lateral);
    field
}

fn run_spawners(
    mut commands: Commands,
    mut ticks: EventReader<SimulationTick>,
    viewpoint: Option<Res<Viewpoint>>,
    policy: Res<TrafficPolicy>,
    layout: Res<TrafficLayout>,
    mut stats: ResMut<TrafficStats>,
    mut spawners: Query<&mut TrafficSpawner>,
    agents: Query<(Entity, &TrafficAgent)>,
    mut local_rng: Local<Option<StdRng>>,
) {
    let Some(viewpoint) = viewpoint else {
        ticks.clear();
        return;
    };
    let rng = local_rng.get_or_insert_with(|| StdRng::seed_from_u64(layout.seed));
    let player = viewpoint.player_speed();

    for tick in ticks.read() {
        let field = snapshot(&agents, &viewpoint);
        for mut spawner in spawners.iter_mut() {
            match spawner.tick(tick.time, player, &policy, &field, rng) {
                SpawnOutcome::Idle => {}
                SpawnOutcome::Deferred => stats.deferred += 1,
                SpawnOutcome::EmptyPool => {
                    stats.empty_pool += 1;
                    warn_once!("Traffic spawner has an empty vehicle pool; skipping spawns");
                }
                SpawnOutcome::Spawned(order) => {
                    stats.spawned += 1;
                    debug!(
                        "Spawned {:?} {:?} at lane {:.1}, {:.1} u/s",
                        order.kind, order.direction, order.lateral, order.speed
                    );
                    commands.spawn((
                        order.to_agent(),
                        order.kind,
                        Transform::from_rotation(order.rotation),
                    ));
                }
            }
        }
    }
}

fn drive_agents(
    mut commands: Commands,
    mut ticks: EventReader<SimulationTick>,
    viewpoint: Option<Res<Viewpoint>>,
    tuning: Res<AgentTuning>,
    layout: Res<TrafficLayout>,
    mut stats: ResMut<TrafficStats>,
    mut agents: ParamSet<(Query<(Entity, &TrafficAgent)>, Query<(Entity, &mut TrafficAgent)>)>,
    mut local_rng: Local<Option<StdRng>>,
) {
    let Some(viewpoint) = viewpoint else {
        ticks.clear();
        return;
    };
    let rng = local_rng.get_or_insert_with(|| StdRng::seed_from_u64(layout.seed ^ 0x5eed));
    let mut expired: Vec<Entity> = Vec::new();

    for tick in ticks.read() {
        let field = snapshot(&agents.p0(), &viewpoint);
        for (entity, mut agent) in agents.p1().iter_mut() {
            if expired.contains(&entity) {
                continue;
            }
            let status = agent.tick(tick.delta, tick.time, &tuning, &field, Some(entity), rng);
            if status == AgentStatus::Expired {
                expired.push(entity);
            }
        }
    }

    for entity in expired {
        stats.expired += 1;
        commands.entity(entity).despawn();
    }
}

/// Put agents into world space along the road.
fn place_agents(
    viewpoint: Option<Res<Viewpoint>>,
    curve: Res<RoadCurve>,
    mut agents: Query<(&TrafficAgent, &mut Transform)>,
) {
    let Some(viewpoint) = viewpoint else {
        return;
    };
    for (agent, mut transform) in agents.iter_mut() {
        let z = viewpoint.distance + agent.offset;
        let center = curve.position_at(z);
        let dir = curve.direction_at(z);
        let right = Vec3::Y.cross(dir).normalize_or_zero();
        transform.translation = center + right * agent.lateral;
        transform.rotation = look_rotation(dir * agent.direction().heading());
    }
}
