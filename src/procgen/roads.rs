//! The playable road: a segment chain that follows the viewpoint.
//!
//! The chain itself lives in a resource; each live segment is mirrored as an
//! entity carrying its world transform so downstream systems can query it.
#![allow(dead_code)]

use bevy::prelude::*;

use crate::simulation::viewpoint::Viewpoint;
use crate::simulation::{SimulationSet, SimulationTick};

use super::curve::RoadCurve;
use super::segment::{SegmentCatalog, SegmentCategory};
use super::segment_chain::{ChainSettings, SegmentChain};

pub struct RoadsPlugin;

impl Plugin for RoadsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RoadCurve>()
            .init_resource::<RoadConfig>()
            .add_systems(Startup, setup_road_chain)
            .add_systems(
                Update,
                (advance_road_chain, sync_segment_entities)
                    .chain()
                    .in_set(SimulationSet::World),
            );
    }
}

/// Settings for the playable road.
#[derive(Resource, Clone, Debug)]
pub struct RoadConfig {
    pub chain: ChainSettings,
    /// Number of crossing variants in the special pool.
    pub special_variants: u8,
    /// Seed for special placement, to keep runs reproducible.
    pub seed: u64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            chain: ChainSettings::default(),
            special_variants: 2,
            seed: 42,
        }
    }
}

/// Entity mirror of one live segment.
#[derive(Component, Clone, Copy, Debug)]
pub struct RoadSegment {
    pub index: u64,
    pub category: SegmentCategory,
}

fn setup_road_chain(mut commands: Commands, curve: Res<RoadCurve>, config: Res<RoadConfig>) {
    let catalog = SegmentCatalog::straight(config.chain.segment_length, config.special_variants);
    let chain = SegmentChain::new(*curve, catalog, config.chain.clone(), config.seed);
    info!(
        "Road chain ready: {} segments of {:.1}, specials every {}-{}",
        chain.len(),
        config.chain.segment_length,
        config.chain.min_normal_before_special,
        config.chain.max_normal_before_special
    );
    commands.insert_resource(chain);
}

pub(crate) fn advance_road_chain(
    mut ticks: EventReader<SimulationTick>,
    viewpoint: Option<Res<Viewpoint>>,
    chain: Option<ResMut<SegmentChain>>,
) {
    if ticks.read().count() == 0 {
        return;
    }
    let (Some(viewpoint), Some(mut chain)) = (viewpoint, chain) else {
        return;
    };
    chain.advance(viewpoint.distance);
}

fn sync_segment_entities(
    mut commands: Commands,
    chain: Option<Res<SegmentChain>>,
    existing: Query<(Entity, &RoadSegment)>,
    mut synced_up_to: Local<u64>,
) {
    let Some(chain) = chain else {
        return;
    };
    if !chain.is_changed() {
        return;
    }

    let oldest = chain
        .segments()
        .next()
        .map_or(chain.next_index(), |segment| segment.index);
    for (entity, segment) in existing.iter() {
        if segment.index < oldest {
            commands.entity(entity).despawn();
        }
    }

    for segment in chain.segments().filter(|s| s.index >= *synced_up_to) {
        commands.spawn((
            RoadSegment {
                index: segment.index,
                category: segment.category,
            },
            Transform::from_translation(segment.position).with_rotation(segment.rotation),
        ));
    }
    *synced_up_to = chain.next_index();
}
