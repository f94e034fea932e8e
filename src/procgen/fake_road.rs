//! Decorative road pieces beyond the playable chain.
//!
//! The distant road sways and climbs toward randomly chosen targets so the
//! horizon looks like a winding road. The pieces have no collision and never
//! recycle; every tick they are re-posed from the real road's far end.
#![allow(dead_code)]

use bevy::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use smallvec::SmallVec;

use crate::simulation::viewpoint::Viewpoint;
use crate::simulation::{SimulationSet, SimulationTick};

use super::curve::{look_rotation, RoadCurve};
use super::roads::advance_road_chain;
use super::segment::SegmentCategory;
use super::segment_chain::SegmentChain;

pub struct FakeRoadPlugin;

impl Plugin for FakeRoadPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FakeRoadConfig>()
            .add_systems(Startup, setup_fake_road)
            .add_systems(
                Update,
                (update_fake_road, sync_fake_road_pieces)
                    .chain()
                    .in_set(SimulationSet::World)
                    .after(advance_road_chain),
            );
    }
}

/// Tunables for the distant road.
#[derive(Resource, Clone, Debug)]
pub struct FakeRoadConfig {
    pub segment_count: usize,
    pub segment_length: f32,
    /// Gap between the real road's far end and the first decorative piece.
    pub start_offset: f32,
    /// Seconds between new lateral targets.
    pub curve_change_interval: f32,
    pub curve_transition_speed: f32,
    pub min_curve_amplitude: f32,
    pub max_curve_amplitude: f32,
    /// Seconds between new height targets.
    pub elevation_change_interval: f32,
    pub elevation_transition_speed: f32,
    pub min_elevation_amplitude: f32,
    pub max_elevation_amplitude: f32,
    pub seed: u64,
}

impl Default for FakeRoadConfig {
    fn default() -> Self {
        Self {
            segment_count: 15,
            segment_length: 15.0,
            start_offset: 50.0,
            curve_change_interval: 3.0,
            curve_transition_speed: 2.0,
            min_curve_amplitude: 3.0,
            max_curve_amplitude: 8.0,
            elevation_change_interval: 4.0,
            elevation_transition_speed: 1.5,
            min_elevation_amplitude: 2.0,
            max_elevation_amplitude: 6.0,
            seed: 31337,
        }
    }
}

/// One decorative piece in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct FakeSegment {
    pub category: SegmentCategory,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Resource)]
pub struct FakeRoad {
    config: FakeRoadConfig,
    segments: Vec<FakeSegment>,
    curve_target: f32,
    curve_value: f32,
    next_curve_change: f32,
    elevation_target: f32,
    elevation_value: f32,
    next_elevation_change: f32,
}

impl FakeRoad {
    pub fn new(config: FakeRoadConfig) -> Self {
        // A A B, repeated
        let segments = (0..config.segment_count)
            .map(|i| FakeSegment {
                category: if i % 3 == 2 {
                    SegmentCategory::OrdinaryB
                } else {
                    SegmentCategory::OrdinaryA
                },
                position: Vec3::new(0.0, 0.0, config.start_offset + i as f32 * config.segment_length),
                rotation: Quat::IDENTITY,
            })
            .collect();

        Self {
            config,
            segments,
            curve_target: 0.0,
            curve_value: 0.0,
            next_curve_change: 0.0,
            elevation_target: 0.0,
            elevation_value: 0.0,
            next_elevation_change: 0.0,
        }
    }

    pub fn segments(&self) -> &[FakeSegment] {
        &self.segments
    }

    pub fn curve_value(&self) -> f32 {
        self.curve_value
    }

    pub fn elevation_value(&self) -> f32 {
        self.elevation_value
    }

    /// Advance targets and re-pose every piece.
    ///
    /// `origin` is where the real road ends, so the decoration continues
    /// from it without a step.
    pub fn update(&mut self, now: f32, dt: f32, origin: Vec3, rng: &mut impl Rng) {
        if now >= self.next_curve_change {
            self.curve_target = pick_target(
                self.config.min_curve_amplitude,
                self.config.max_curve_amplitude,
                rng,
            );
            self.next_curve_change = now + self.config.curve_change_interval;
        }
        if now >= self.next_elevation_change {
            self.elevation_target = pick_target(
                self.config.min_elevation_amplitude,
                self.config.max_elevation_amplitude,
                rng,
            );
            self.next_elevation_change = now + self.config.elevation_change_interval;
        }

        let curve_t = (self.config.curve_transition_speed * dt).clamp(0.0, 1.0);
        self.curve_value += (self.curve_target - self.curve_value) * curve_t;
        let elevation_t = (self.config.elevation_transition_speed * dt).clamp(0.0, 1.0);
        self.elevation_value += (self.elevation_target - self.elevation_value) * elevation_t;

        let last = self.segments.len().saturating_sub(1);
        for i in 0..self.segments.len() {
            let position = self.pose_point(i, origin);
            let rotation = if i >= last {
                Quat::IDENTITY
            } else {
                look_rotation(self.pose_point(i + 1, origin) - position)
            };
            let segment = &mut self.segments[i];
            segment.position = position;
            segment.rotation = rotation;
        }
    }

    fn pose_point(&self, i: usize, origin: Vec3) -> Vec3 {
        let span = self.config.segment_count.saturating_sub(1).max(1) as f32;
        let progress = smoothstep((i as f32 / span).clamp(0.0, 1.0));
        origin
            + Vec3::new(
                self.curve_value * progress,
                self.elevation_value * progress,
                self.config.start_offset + i as f32 * self.config.segment_length,
            )
    }
}

/// Entity mirror of one decorative piece.
#[derive(Component, Clone, Copy, Debug)]
pub struct FakeRoadPiece {
    pub slot: usize,
    pub category: SegmentCategory,
}

fn setup_fake_road(mut commands: Commands, config: Res<FakeRoadConfig>) {
    let fake = FakeRoad::new(config.clone());
    for (slot, segment) in fake.segments().iter().enumerate() {
        commands.spawn((
            FakeRoadPiece {
                slot,
                category: segment.category,
            },
            Transform::from_translation(segment.position),
        ));
    }
    info!(
        "Distant road ready: {} decorative segments, {:.0} past the road's end",
        config.segment_count, config.start_offset
    );
    commands.insert_resource(fake);
}

fn update_fake_road(
    mut ticks: EventReader<SimulationTick>,
    fake: Option<ResMut<FakeRoad>>,
    chain: Option<Res<SegmentChain>>,
    viewpoint: Option<Res<Viewpoint>>,
    curve: Res<RoadCurve>,
    config: Res<FakeRoadConfig>,
    mut local_rng: Local<Option<StdRng>>,
) {
    let Some(mut fake) = fake else {
        ticks.clear();
        return;
    };
    let rng = local_rng.get_or_insert_with(|| StdRng::seed_from_u64(config.seed));

    // Join the decoration to wherever the real road currently ends
    let origin = chain
        .as_ref()
        .and_then(|chain| chain.far_end())
        .unwrap_or_else(|| curve.position_at(viewpoint.map_or(0.0, |v| v.distance)));

    for tick in ticks.read() {
        fake.update(tick.time, tick.delta, origin, rng);
    }
}

fn sync_fake_road_pieces(
    fake: Option<Res<FakeRoad>>,
    mut pieces: Query<(&FakeRoadPiece, &mut Transform)>,
) {
    let Some(fake) = fake else {
        return;
    };
    if !fake.is_changed() {
        return;
    }
    for (piece, mut transform) in pieces.iter_mut() {
        if let Some(segment) = fake.segments().get(piece.slot) {
            transform.translation = segment.position;
            transform.rotation = segment.rotation;
        }
    }
}

/// Left/right (or down/up) at two strengths, or straight.
fn pick_target(min: f32, max: f32, rng: &mut impl Rng) -> f32 {
    let targets: SmallVec<[f32; 5]> = SmallVec::from_buf([-max, -min, 0.0, min, max]);
    targets[rng.gen_range(0..targets.len())]
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procgen::ProcgenPlugin;
    use crate::simulation::{SimulationConfig, SimulationPlugin};

    #[test]
    fn pieces_follow_short_pattern() {
        let road = FakeRoad::new(FakeRoadConfig::default());
        let cats: Vec<_> = road.segments().iter().take(6).map(|s| s.category).collect();
        use SegmentCategory::*;
        assert_eq!(cats, vec![OrdinaryA, OrdinaryA, OrdinaryB, OrdinaryA, OrdinaryA, OrdinaryB]);
    }

    #[test]
    fn near_end_joins_real_road() {
        let mut road = FakeRoad::new(FakeRoadConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        for step in 0..300 {
            road.update(step as f32 / 60.0, 1.0 / 60.0, Vec3::new(1.5, 4.25, 400.0), &mut rng);
            let first = &road.segments()[0];
            assert_eq!(first.position.x, 1.5);
            assert_eq!(first.position.y, 4.25);
            assert_eq!(first.position.z, 450.0);
        }
    }

    #[test]
    fn values_stay_within_amplitude() {
        let config = FakeRoadConfig::default();
        let mut road = FakeRoad::new(config.clone());
        let mut rng = StdRng::seed_from_u64(11);
        for step in 0..2000 {
            road.update(step as f32 * 0.05, 0.05, Vec3::ZERO, &mut rng);
            assert!(road.curve_value().abs() <= config.max_curve_amplitude + 1e-4);
            assert!(road.elevation_value().abs() <= config.max_elevation_amplitude + 1e-4);
            let far = road.segments().last().unwrap();
            assert!((far.position.x - road.curve_value()).abs() < 1e-4);
            assert_eq!(far.rotation, Quat::IDENTITY);
        }
    }

    #[test]
    fn pieces_face_their_successor() {
        let mut road = FakeRoad::new(FakeRoadConfig::default());
        let mut rng = StdRng::seed_from_u64(5);
        for step in 0..120 {
            road.update(step as f32 * 0.1, 0.1, Vec3::Y, &mut rng);
        }
        let segs = road.segments();
        for pair in segs.windows(2) {
            let heading = (pair[1].position - pair[0].position).normalize();
            assert!((pair[0].rotation * Vec3::Z - heading).length() < 1e-4);
        }
    }

    #[test]
    fn decoration_starts_past_the_real_road() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(SimulationPlugin)
            .add_plugins(ProcgenPlugin);
        app.update();
        app.world_mut().resource_mut::<SimulationConfig>().paused = true;

        app.world_mut().send_event(SimulationTick {
            tick: 1,
            delta: 1.0 / 60.0,
            time: 0.0,
        });
        app.update();

        let far_end = app
            .world()
            .resource::<SegmentChain>()
            .far_end()
            .unwrap();
        let start_offset = app.world().resource::<FakeRoadConfig>().start_offset;
        let fake = app.world().resource::<FakeRoad>();
        let first = &fake.segments()[0];
        assert!(first.position.z >= far_end.z + start_offset - 1e-3);
        assert!((first.position.y - far_end.y).abs() < 1e-4);
        let expected: Vec<Vec3> = fake.segments().iter().map(|s| s.position).collect();

        let mut query = app.world_mut().query::<(&FakeRoadPiece, &Transform)>();
        let mirrored: Vec<(usize, Vec3)> = query
            .iter(app.world())
            .map(|(piece, transform)| (piece.slot, transform.translation))
            .collect();
        assert_eq!(mirrored.len(), expected.len());
        for (slot, translation) in mirrored {
            assert_eq!(translation, expected[slot]);
        }
    }

    #[test]
    fn smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(0.5), 0.5);
    }
}
