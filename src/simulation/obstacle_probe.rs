//! Forward obstacle queries for traffic.
//!
//! Agents and spawners look along the road for the nearest thing in their
//! lane. Positions are viewpoint-relative: `offset` is longitudinal distance
//! ahead of the viewpoint, `lateral` is sideways from the road centre.
#![allow(dead_code)]

use bevy::prelude::*;

/// What a probe ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitKind {
    Agent,
    Player,
    /// Scenery or anything else that traffic does not react to.
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeHit {
    pub distance: f32,
    pub kind: HitKind,
}

/// A longitudinal cast through one lane.
#[derive(Clone, Copy, Debug)]
pub struct ProbeRay {
    pub lateral: f32,
    pub offset: f32,
    /// +1 looks away from the viewpoint, -1 looks toward it.
    pub heading: f32,
    pub length: f32,
    /// Sideways reach of the probe on each side of `lateral`.
    pub half_width: f32,
    /// The caster, so it never hits itself.
    pub ignore: Option<Entity>,
}

pub trait ObstacleProbe {
    /// Nearest hit within the ray's length, if any.
    fn cast(&self, ray: &ProbeRay) -> Option<ProbeHit>;
}

#[derive(Clone, Copy, Debug)]
struct Occupant {
    entity: Option<Entity>,
    lateral: f32,
    offset: f32,
    kind: HitKind,
}

/// Snapshot of everything on the road for one tick.
#[derive(Default, Clone, Debug)]
pub struct TrafficField {
    occupants: Vec<Occupant>,
}

impl TrafficField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_agent(&mut self, entity: Entity, lateral: f32, offset: f32) {
        self.occupants.push(Occupant {
            entity: Some(entity),
            lateral,
            offset,
            kind: HitKind::Agent,
        });
    }

    /// The player sits at offset zero by definition.
    pub fn add_player(&mut self, lateral: f32) {
        self.occupants.push(Occupant {
            entity: None,
            lateral,
            offset: 0.0,
            kind: HitKind::Player,
        });
    }

    pub fn add_static(&mut self, lateral: f32, offset: f32) {
        self.occupants.push(Occupant {
            entity: None,
            lateral,
            offset,
            kind: HitKind::Other,
        });
    }

    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }
}

impl ObstacleProbe for TrafficField {
    fn cast(&self, ray: &ProbeRay) -> Option<ProbeHit> {
        self.occupants
            .iter()
            .filter(|o| ray.ignore.is_none() || o.entity != ray.ignore)
            .filter(|o| (o.lateral - ray.lateral).abs() <= ray.half_width)
            .filter_map(|o| {
                let distance = (o.offset - ray.offset) * ray.heading.signum();
                (distance >= 0.0 && distance <= ray.length).then_some(ProbeHit {
                    distance,
                    kind: o.kind,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray(lateral: f32, offset: f32, heading: f32) -> ProbeRay {
        ProbeRay {
            lateral,
            offset,
            heading,
            length: 15.0,
            half_width: 1.0,
            ignore: None,
        }
    }

    #[test]
    fn finds_nearest_in_lane() {
        let mut field = TrafficField::new();
        field.add_agent(Entity::from_raw(1), 2.0, 80.0);
        field.add_agent(Entity::from_raw(2), 2.2, 90.0);
        field.add_agent(Entity::from_raw(3), 6.0, 95.0);

        let hit = field.cast(&ray(2.0, 100.0, -1.0)).unwrap();
        assert_eq!(hit.kind, HitKind::Agent);
        assert!((hit.distance - 10.0).abs() < 1e-6);
    }

    #[test]
    fn heading_decides_what_is_ahead() {
        let mut field = TrafficField::new();
        field.add_agent(Entity::from_raw(1), 0.0, 110.0);
        assert!(field.cast(&ray(0.0, 100.0, -1.0)).is_none());
        assert!(field.cast(&ray(0.0, 100.0, 1.0)).is_some());
    }

    #[test]
    fn ignores_caster_and_out_of_range() {
        let me = Entity::from_raw(7);
        let mut field = TrafficField::new();
        field.add_agent(me, 0.0, 50.0);
        field.add_agent(Entity::from_raw(8), 0.0, 20.0);

        let mut r = ray(0.0, 50.0, -1.0);
        r.ignore = Some(me);
        assert!(field.cast(&r).is_none());
    }

    #[test]
    fn player_and_scenery_are_tagged() {
        let mut field = TrafficField::new();
        field.add_player(-2.0);
        field.add_static(4.0, 5.0);

        let hit = field.cast(&ray(-2.0, 8.0, -1.0)).unwrap();
        assert_eq!(hit.kind, HitKind::Player);
        assert_eq!(hit.distance, 8.0);

        let hit = field.cast(&ray(4.0, 12.0, -1.0)).unwrap();
        assert_eq!(hit.kind, HitKind::Other);
        assert_eq!(field.len(), 2);
    }
}
