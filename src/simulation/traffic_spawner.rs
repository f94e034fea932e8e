//! Spawn scheduling for one traffic lane.
#![allow(dead_code)]

use bevy::prelude::*;
use rand::Rng;

use crate::procgen::curve::look_rotation;

use super::obstacle_probe::{HitKind, ObstacleProbe, ProbeRay};
use super::traffic_agent::TrafficAgent;
use super::traffic_policy::{TrafficPolicy, TravelDirection};
use super::viewpoint::PlayerSpeed;

/// Body style of a spawned vehicle.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VehicleKind {
    Sedan,
    Hatchback,
    Van,
    Truck,
}

/// Everything needed to put a new agent on the road.
#[derive(Clone, Debug)]
pub struct SpawnOrder {
    pub kind: VehicleKind,
    pub speed: f32,
    pub direction: TravelDirection,
    pub lateral: f32,
    pub offset: f32,
    /// Faces the direction of travel.
    pub rotation: Quat,
}

impl SpawnOrder {
    pub fn to_agent(&self) -> TrafficAgent {
        TrafficAgent::init(self.speed, self.direction, self.lateral, self.offset)
    }
}

/// What a spawner did on a tick.
#[derive(Clone, Debug)]
pub enum SpawnOutcome {
    /// Not due yet (or just scheduled its first spawn).
    Idle,
    /// The spawn site was occupied; retrying shortly.
    Deferred,
    /// Due, but there was nothing to spawn.
    EmptyPool,
    Spawned(SpawnOrder),
}

#[derive(Component, Clone, Debug)]
pub struct TrafficSpawner {
    pub direction: TravelDirection,
    pub lateral: f32,
    /// Spawn site, ahead of the viewpoint.
    pub offset: f32,
    /// Sideways reach of the spawn-site check.
    pub check_half_width: f32,
    pub pool: Vec<VehicleKind>,
    next_spawn_at: Option<f32>,
}

impl TrafficSpawner {
    pub fn new(direction: TravelDirection, lateral: f32, offset: f32, pool: Vec<VehicleKind>) -> Self {
        Self {
            direction,
            lateral,
            offset,
            check_half_width: 1.5,
            pool,
            next_spawn_at: None,
        }
    }

    pub fn next_spawn_at(&self) -> Option<f32> {
        self.next_spawn_at
    }

    /// Seconds until the next spawn.
    ///
    /// The upper end of the base band shrinks toward the lower end as the
    /// player speeds up; the sample is then scaled by the direction's
    /// interval multiplier.
    pub fn schedule_delay(&self, player: PlayerSpeed, policy: &TrafficPolicy, rng: &mut impl Rng) -> f32 {
        let (low, high) = interval_band(player, policy);
        let delay = if high > low { rng.gen_range(low..=high) } else { low };
        delay * policy.interval_multiplier(self.direction)
    }

    /// Spawn speed for the current player speed, with jitter.
    pub fn spawn_speed(&self, player: PlayerSpeed, policy: &TrafficPolicy, rng: &mut impl Rng) -> f32 {
        let speed = (policy.base_speed + player.current * policy.player_speed_multiplier)
            * policy.speed_multiplier(self.direction);
        let spread = policy.speed_randomness.abs();
        let jitter = if spread > 0.0 {
            rng.gen_range(1.0 - spread..=1.0 + spread)
        } else {
            1.0
        };
        (speed * jitter).max(policy.min_spawn_speed)
    }

    pub fn tick(
        &mut self,
        now: f32,
        player: PlayerSpeed,
        policy: &TrafficPolicy,
        probe: &impl ObstacleProbe,
        rng: &mut impl Rng,
    ) -> SpawnOutcome {
        let Some(due) = self.next_spawn_at else {
            self.next_spawn_at = Some(now + self.schedule_delay(player, policy, rng));
            return SpawnOutcome::Idle;
        };
        if now < due {
            return SpawnOutcome::Idle;
        }

        // Agents drift toward the viewpoint, so the previous spawn sits on
        // that side of the site.
        let ray = ProbeRay {
            lateral: self.lateral,
            offset: self.offset,
            heading: -1.0,
            length: policy.spawn_check_distance,
            half_width: self.check_half_width,
            ignore: None,
        };
        let blocked = probe
            .cast(&ray)
            .is_some_and(|hit| matches!(hit.kind, HitKind::Agent | HitKind::Player));
        if blocked {
            self.next_spawn_at = Some(now + policy.blocked_retry_delay);
            return SpawnOutcome::Deferred;
        }

        self.next_spawn_at = Some(now + self.schedule_delay(player, policy, rng));

        if self.pool.is_empty() {
            return SpawnOutcome::EmptyPool;
        }
        let kind = self.pool[rng.gen_range(0..self.pool.len())];
        let speed = self.spawn_speed(player, policy, rng);

        SpawnOutcome::Spawned(SpawnOrder {
            kind,
            speed,
            direction: self.direction,
            lateral: self.lateral,
            offset: self.offset,
            rotation: look_rotation(Vec3::Z * self.direction.heading()),
        })
    }
}

/// Base delay band before direction scaling.
pub fn interval_band(player: PlayerSpeed, policy: &TrafficPolicy) -> (f32, f32) {
    let low = policy.base_min_interval.min(policy.base_max_interval);
    let high = policy.base_max_interval.max(low);
    let t = player.ratio();
    (low, high - (high - low) * t)
}
