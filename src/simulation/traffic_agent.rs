//! Per-vehicle traffic AI.
//!
//! Two independent loops run each tick:
//! - speed: slow down (oncoming) or speed up (same direction) while something
//!   is in front, otherwise drift back to base speed;
//! - lane: after a cooldown, hop one lane left or right if the road allows.
//!
//! Agents live in viewpoint-relative coordinates and always close in on the
//! viewpoint; they expire once they are far enough behind it.
#![allow(dead_code)]

use bevy::prelude::*;
use rand::Rng;
use smallvec::{smallvec, SmallVec};

use super::obstacle_probe::{HitKind, ObstacleProbe, ProbeRay};
use super::traffic_policy::TravelDirection;

/// AI settings shared by all agents.
#[derive(Resource, Clone, Debug)]
pub struct AgentTuning {
    /// Forward probe length.
    pub detect_distance: f32,
    /// Sideways reach of the probe.
    pub probe_half_width: f32,
    /// Oncoming cars slow to `base * factor`; same-direction cars speed up to
    /// `base * (2 - factor)`.
    pub slow_down_factor: f32,
    /// Relaxation rate while blocked (1/s).
    pub obstacle_response_rate: f32,
    /// Relaxation rate back to base speed on a free road (1/s).
    pub recovery_rate: f32,
    pub lane_width: f32,
    /// Maximum sideways speed while changing lanes.
    pub lane_change_speed: f32,
    pub lane_change_cooldown: f32,
    /// Lane targets must stay within `[-road_half_width, road_half_width]`.
    pub road_half_width: f32,
    pub lane_epsilon: f32,
    /// Offset behind the viewpoint at which an agent is removed.
    pub despawn_offset: f32,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            detect_distance: 15.0,
            probe_half_width: 1.5,
            slow_down_factor: 0.5,
            obstacle_response_rate: 4.0,
            recovery_rate: 2.0,
            lane_width: 4.0,
            lane_change_speed: 4.0,
            lane_change_cooldown: 1.0,
            road_half_width: 15.0,
            lane_epsilon: 0.05,
            despawn_offset: -50.0,
        }
    }
}

/// Whether an agent survives its tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentStatus {
    Active,
    Expired,
}

#[derive(Component, Clone, Debug)]
pub struct TrafficAgent {
    base_speed: f32,
    current_speed: f32,
    direction: TravelDirection,
    /// Sideways position.
    pub lateral: f32,
    /// Longitudinal position relative to the viewpoint.
    pub offset: f32,
    target_lateral: f32,
    changing_lane: bool,
    last_lane_change: Option<f32>,
}

impl TrafficAgent {
    /// Create an agent with its one-time speed and direction.
    pub fn init(speed: f32, direction: TravelDirection, lateral: f32, offset: f32) -> Self {
        let speed = speed.max(0.0);
        Self {
            base_speed: speed,
            current_speed: speed,
            direction,
            lateral,
            offset,
            target_lateral: lateral,
            changing_lane: false,
            last_lane_change: None,
        }
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn direction(&self) -> TravelDirection {
        self.direction
    }

    pub fn target_lateral(&self) -> f32 {
        self.target_lateral
    }

    pub fn is_changing_lane(&self) -> bool {
        self.changing_lane
    }

    /// Speed this agent aims for while something blocks it.
    pub fn blocked_target_speed(&self, tuning: &AgentTuning) -> f32 {
        match self.direction {
            TravelDirection::Inbound => self.base_speed * tuning.slow_down_factor,
            TravelDirection::Outbound => self.base_speed * (1.0 + (1.0 - tuning.slow_down_factor)),
        }
    }

    /// Run one step of AI and movement.
    pub fn tick(
        &mut self,
        dt: f32,
        now: f32,
        tuning: &AgentTuning,
        probe: &impl ObstacleProbe,
        me: Option<Entity>,
        rng: &mut impl Rng,
    ) -> AgentStatus {
        self.regulate(dt, now, tuning, probe, me, rng);
        self.drive(dt, tuning);

        if self.offset <= tuning.despawn_offset {
            AgentStatus::Expired
        } else {
            AgentStatus::Active
        }
    }

    fn regulate(
        &mut self,
        dt: f32,
        now: f32,
        tuning: &AgentTuning,
        probe: &impl ObstacleProbe,
        me: Option<Entity>,
        rng: &mut impl Rng,
    ) {
        let ray = ProbeRay {
            lateral: self.lateral,
            offset: self.offset,
            heading: self.direction.heading(),
            length: tuning.detect_distance,
            half_width: tuning.probe_half_width,
            ignore: me,
        };

        match probe.cast(&ray) {
            Some(hit) if matches!(hit.kind, HitKind::Agent | HitKind::Player) => {
                let target = self.blocked_target_speed(tuning);
                self.current_speed = relax(self.current_speed, target, tuning.obstacle_response_rate, dt);

                let ready = self
                    .last_lane_change
                    .map_or(true, |last| now - last >= tuning.lane_change_cooldown);
                if ready {
                    self.try_change_lane(tuning, rng);
                    self.last_lane_change = Some(now);
                }
            }
            // Scenery: hold speed
            Some(_) => {}
            None => {
                self.current_speed =
                    relax(self.current_speed, self.base_speed, tuning.recovery_rate, dt);
            }
        }

        self.current_speed = self.current_speed.max(0.0);
    }

    /// Pick a neighbouring lane, trying left and right in random order.
    fn try_change_lane(&mut self, tuning: &AgentTuning, rng: &mut impl Rng) -> bool {
        let mut sides: SmallVec<[f32; 2]> = smallvec![1.0, -1.0];
        if rng.gen_bool(0.5) {
            sides.swap(0, 1);
        }

        for side in sides {
            let candidate = self.lateral + side * tuning.lane_width;
            if candidate.abs() <= tuning.road_half_width {
                self.target_lateral = candidate;
                self.changing_lane = true;
                return true;
            }
        }
        false
    }

    fn drive(&mut self, dt: f32, tuning: &AgentTuning) {
        self.offset -= self.current_speed * dt;
        self.lateral = move_toward(self.lateral, self.target_lateral, tuning.lane_change_speed * dt);
        if (self.lateral - self.target_lateral).abs() < tuning.lane_epsilon {
            self.changing_lane = false;
        }
    }
}

/// Exponential approach of `value` to `target` at `rate` per second.
pub fn relax(value: f32, target: f32, rate: f32, dt: f32) -> f32 {
    value + (target - value) * (1.0 - (-rate * dt).exp())
}

/// Step `value` toward `target` by at most `max_step`.
pub fn move_toward(value: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - value;
    if delta.abs() <= max_step {
        target
    } else {
        value + delta.signum() * max_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::obstacle_probe::TrafficField;
    use rand::{rngs::StdRng, SeedableRng};

    const DT: f32 = 1.0 / 60.0;

    /// A car parked `gap` ahead of the agent in its own lane.
    fn blocked_field(agent: &TrafficAgent, gap: f32) -> TrafficField {
        let mut field = TrafficField::new();
        let ahead = agent.offset + agent.direction().heading() * gap;
        field.add_agent(Entity::from_raw(99), agent.lateral, ahead);
        field
    }

    #[test]
    fn init_sets_both_speeds() {
        let agent = TrafficAgent::init(12.0, TravelDirection::Outbound, 2.0, 150.0);
        assert_eq!(agent.base_speed(), 12.0);
        assert_eq!(agent.current_speed(), 12.0);
        assert_eq!(agent.direction(), TravelDirection::Outbound);
        assert!(!agent.is_changing_lane());
    }

    #[test]
    fn inbound_slows_toward_half_speed_without_undershoot() {
        let tuning = AgentTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut agent = TrafficAgent::init(15.0, TravelDirection::Inbound, -2.0, 150.0);
        let mut previous = agent.current_speed();
        for step in 0..300 {
            let field = blocked_field(&agent, 10.0);
            agent.tick(DT, step as f32 * DT, &tuning, &field, None, &mut rng);
            let speed = agent.current_speed();
            assert!(speed <= previous);
            assert!(speed >= 7.5);
            previous = speed;
        }
        assert!((agent.current_speed() - 7.5).abs() < 0.01);
    }

    #[test]
    fn outbound_speeds_up_to_pass_without_overshoot() {
        let tuning = AgentTuning::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut agent = TrafficAgent::init(10.0, TravelDirection::Outbound, 2.0, 150.0);
        let mut previous = agent.current_speed();
        for step in 0..300 {
            let field = blocked_field(&agent, 8.0);
            agent.tick(DT, step as f32 * DT, &tuning, &field, None, &mut rng);
            assert!(agent.current_speed() >= previous);
            assert!(agent.current_speed() <= 15.0);
            previous = agent.current_speed();
        }
        assert!((agent.current_speed() - 15.0).abs() < 0.01);
    }

    #[test]
    fn free_road_recovers_base_speed() {
        let tuning = AgentTuning::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut agent = TrafficAgent::init(15.0, TravelDirection::Inbound, 0.0, 500.0);
        for step in 0..60 {
            let field = blocked_field(&agent, 5.0);
            agent.tick(DT, step as f32 * DT, &tuning, &field, None, &mut rng);
        }
        let slowed = agent.current_speed();
        assert!(slowed < 15.0);

        let empty = TrafficField::new();
        for step in 60..600 {
            agent.tick(DT, step as f32 * DT, &tuning, &empty, None, &mut rng);
        }
        assert!(agent.current_speed() > slowed);
        assert!((agent.current_speed() - 15.0).abs() < 0.01);
    }

    #[test]
    fn scenery_hits_hold_speed() {
        let tuning = AgentTuning::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut agent = TrafficAgent::init(15.0, TravelDirection::Inbound, 0.0, 100.0);
        let mut field = TrafficField::new();
        field.add_static(0.0, 95.0);
        agent.tick(DT, 0.0, &tuning, &field, None, &mut rng);
        assert_eq!(agent.current_speed(), 15.0);
        assert!(!agent.is_changing_lane());
    }

    #[test]
    fn lane_change_picks_the_only_valid_side() {
        let tuning = AgentTuning::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut agent = TrafficAgent::init(15.0, TravelDirection::Inbound, 13.0, 100.0);
            let field = blocked_field(&agent, 5.0);
            agent.tick(DT, 0.0, &tuning, &field, None, &mut rng);
            assert_eq!(agent.target_lateral(), 9.0);
            assert!(agent.is_changing_lane());
        }
    }

    #[test]
    fn no_valid_lane_schedules_nothing() {
        let tuning = AgentTuning {
            lane_width: 40.0,
            ..AgentTuning::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut agent = TrafficAgent::init(15.0, TravelDirection::Inbound, 0.0, 100.0);
        let field = blocked_field(&agent, 5.0);
        agent.tick(DT, 0.0, &tuning, &field, None, &mut rng);
        assert_eq!(agent.target_lateral(), 0.0);
        assert!(!agent.is_changing_lane());
    }

    #[test]
    fn cooldown_limits_attempts() {
        let tuning = AgentTuning::default();
        let mut rng = StdRng::seed_from_u64(6);
        let mut agent = TrafficAgent::init(15.0, TravelDirection::Inbound, 0.0, 100.0);

        let field = blocked_field(&agent, 5.0);
        agent.tick(DT, 0.0, &tuning, &field, None, &mut rng);
        let first = agent.target_lateral();
        assert_eq!(first.abs(), 4.0);

        // Half a second later, still blocked: no new target
        let field = blocked_field(&agent, 5.0);
        agent.tick(DT, 0.5, &tuning, &field, None, &mut rng);
        assert_eq!(agent.target_lateral(), first);

        // Exactly one cooldown later a new attempt is allowed
        let field = blocked_field(&agent, 5.0);
        agent.tick(DT, 1.0, &tuning, &field, None, &mut rng);
        assert_ne!(agent.target_lateral(), first);
    }

    #[test]
    fn lateral_motion_is_rate_limited_and_settles() {
        let tuning = AgentTuning::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut agent = TrafficAgent::init(15.0, TravelDirection::Inbound, 0.0, 300.0);
        let field = blocked_field(&agent, 5.0);
        agent.tick(DT, 0.0, &tuning, &field, None, &mut rng);
        let target = agent.target_lateral();

        let empty = TrafficField::new();
        let mut last = agent.lateral;
        for step in 1..120 {
            agent.tick(DT, step as f32 * DT, &tuning, &empty, None, &mut rng);
            assert!((agent.lateral - last).abs() <= tuning.lane_change_speed * DT + 1e-5);
            last = agent.lateral;
        }
        assert_eq!(agent.lateral, target);
        assert!(!agent.is_changing_lane());
    }

    #[test]
    fn lateral_never_leaves_the_road() {
        let tuning = AgentTuning::default();
        let mut rng = StdRng::seed_from_u64(8);
        let mut agent = TrafficAgent::init(15.0, TravelDirection::Outbound, 10.0, 1.0e6);
        for step in 0..20_000 {
            let field = blocked_field(&agent, 3.0);
            agent.tick(DT, step as f32 * 0.3, &tuning, &field, None, &mut rng);
            assert!(agent.lateral.abs() <= tuning.road_half_width);
            assert!(agent.target_lateral().abs() <= tuning.road_half_width);
        }
    }

    #[test]
    fn expires_behind_viewpoint() {
        let tuning = AgentTuning::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut agent = TrafficAgent::init(20.0, TravelDirection::Inbound, 0.0, -49.0);
        let empty = TrafficField::new();
        assert_eq!(
            agent.tick(0.1, 0.0, &tuning, &empty, None, &mut rng),
            AgentStatus::Expired
        );
    }

    #[test]
    fn helpers_behave() {
        assert_eq!(move_toward(0.0, 4.0, 1.0), 1.0);
        assert_eq!(move_toward(3.5, 4.0, 1.0), 4.0);
        assert_eq!(move_toward(0.0, -4.0, 1.0), -1.0);
        assert_eq!(relax(10.0, 5.0, 4.0, 0.0), 10.0);
        let r = relax(10.0, 5.0, 4.0, 1.0);
        assert!(r > 5.0 && r < 10.0);
    }
}
