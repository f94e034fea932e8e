//! Central traffic policy shared by every spawner.

use bevy::prelude::*;

/// Which way a vehicle travels relative to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TravelDirection {
    /// Oncoming: drives against the player's direction.
    Inbound,
    /// Same direction as the player.
    Outbound,
}

impl TravelDirection {
    /// Longitudinal sign of the vehicle's nose: inbound cars face the
    /// viewpoint, outbound cars face away from it.
    pub fn heading(self) -> f32 {
        match self {
            TravelDirection::Inbound => -1.0,
            TravelDirection::Outbound => 1.0,
        }
    }
}

/// Spawn-rate and speed settings for all traffic.
#[derive(Resource, Clone, Debug)]
pub struct TrafficPolicy {
    /// Delay band (seconds) before direction scaling.
    pub base_min_interval: f32,
    pub base_max_interval: f32,
    /// Free-road length a spawn site needs before it may fire.
    pub spawn_check_distance: f32,
    /// Seconds to wait after a blocked spawn site.
    pub blocked_retry_delay: f32,
    pub base_speed: f32,
    /// Uniform jitter on spawn speed, as a fraction.
    pub speed_randomness: f32,
    /// Share of player speed added to spawn speed.
    pub player_speed_multiplier: f32,
    /// Spawn speed never drops below this.
    pub min_spawn_speed: f32,
    pub inbound_interval_multiplier: f32,
    pub inbound_speed_multiplier: f32,
    pub outbound_interval_multiplier: f32,
    pub outbound_speed_multiplier: f32,
}

impl Default for TrafficPolicy {
    fn default() -> Self {
        Self {
            base_min_interval: 2.0,
            base_max_interval: 4.0,
            spawn_check_distance: 10.0,
            blocked_retry_delay: 0.5,
            base_speed: 15.0,
            speed_randomness: 0.2,
            player_speed_multiplier: 0.5,
            min_spawn_speed: 2.0,
            // Oncoming traffic is denser and quicker
            inbound_interval_multiplier: 0.7,
            inbound_speed_multiplier: 1.5,
            outbound_interval_multiplier: 1.2,
            outbound_speed_multiplier: 0.8,
        }
    }
}

impl TrafficPolicy {
    pub fn interval_multiplier(&self, direction: TravelDirection) -> f32 {
        match direction {
            TravelDirection::Inbound => self.inbound_interval_multiplier,
            TravelDirection::Outbound => self.outbound_interval_multiplier,
        }
    }

    pub fn speed_multiplier(&self, direction: TravelDirection) -> f32 {
        match direction {
            TravelDirection::Inbound => self.inbound_speed_multiplier,
            TravelDirection::Outbound => self.outbound_speed_multiplier,
        }
    }
}
