//! Rolling window of road segments.
//!
//! The chain keeps `visible_segments` pieces alive ahead of the viewpoint.
//! Pieces that fall behind are evicted from the front and replaced at the far
//! end, each new piece snapped onto the previous piece's end anchor.
#![allow(dead_code)]

use std::collections::VecDeque;

use bevy::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::curve::RoadCurve;
use super::segment::{Segment, SegmentCatalog, SegmentCategory, SegmentError, SegmentTemplate};

/// Ordinary piece order, repeated forever: A A B A A B.
const ORDINARY_PATTERN: [SegmentCategory; 6] = [
    SegmentCategory::OrdinaryA,
    SegmentCategory::OrdinaryA,
    SegmentCategory::OrdinaryB,
    SegmentCategory::OrdinaryA,
    SegmentCategory::OrdinaryA,
    SegmentCategory::OrdinaryB,
];

/// Tunables for the chain.
#[derive(Clone, Debug)]
pub struct ChainSettings {
    /// Nominal length of one piece along the road.
    pub segment_length: f32,
    /// Forward nudge applied after anchor alignment.
    pub overlap_offset: f32,
    /// Number of live pieces.
    pub visible_segments: usize,
    /// How far behind the viewpoint a piece's far end may fall before it is
    /// recycled.
    pub delete_distance: f32,
    /// Inclusive bounds on ordinary pieces between two specials.
    pub min_normal_before_special: u32,
    pub max_normal_before_special: u32,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            segment_length: 15.0,
            overlap_offset: 0.5,
            visible_segments: 25,
            delete_distance: 30.0,
            min_normal_before_special: 10,
            max_normal_before_special: 20,
        }
    }
}

#[derive(Resource)]
pub struct SegmentChain {
    curve: RoadCurve,
    catalog: SegmentCatalog,
    settings: ChainSettings,
    rng: StdRng,
    segments: VecDeque<Segment>,
    /// World-space end anchor of the most recently placed piece.
    last_end: Option<Vec3>,
    next_index: u64,
    pattern_cursor: usize,
    normals_until_special: u32,
}

impl SegmentChain {
    /// Build a chain and fill its initial window.
    pub fn new(curve: RoadCurve, catalog: SegmentCatalog, settings: ChainSettings, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let normals_until_special = roll_spacing(&settings, &mut rng);
        let mut chain = Self {
            curve,
            catalog,
            segments: VecDeque::with_capacity(settings.visible_segments),
            settings,
            rng,
            last_end: None,
            next_index: 0,
            pattern_cursor: 0,
            normals_until_special,
        };
        chain.top_up();
        chain
    }

    pub fn curve(&self) -> &RoadCurve {
        &self.curve
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    /// Live pieces, oldest first.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index the next placed piece will receive.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// World-space end of the road, if any piece is live.
    pub fn far_end(&self) -> Option<Vec3> {
        self.segments.back().map(Segment::world_end)
    }

    /// Place one piece at the far end.
    ///
    /// The index and pattern cursors advance even when the template is
    /// malformed, so a broken piece is skipped rather than retried forever.
    pub fn extend(&mut self) -> Result<(), SegmentError> {
        let template = self.next_template();
        let index = self.next_index;
        self.next_index += 1;

        let (start_anchor, end_anchor) = template.anchors()?;

        // Sample the curve halfway along the step this piece covers, measured
        // from where the chain actually ends rather than from its index.
        let step = self.settings.segment_length + self.settings.overlap_offset;
        let nominal_z = match self.last_end {
            Some(prev_end) => prev_end.z + step * 0.5,
            None => 0.0,
        };
        let rotation = self.curve.rotation_at(nominal_z);

        let position = match self.last_end {
            Some(prev_end) => {
                let aligned = prev_end - rotation * start_anchor;
                aligned + rotation * Vec3::Z * self.settings.overlap_offset
            }
            None => self.curve.position_at(nominal_z),
        };

        let segment = Segment {
            index,
            category: template.category,
            start_anchor,
            end_anchor,
            position,
            rotation,
        };
        self.last_end = Some(segment.world_end());
        self.segments.push_back(segment);
        Ok(())
    }

    /// Recycle every piece whose far end has fallen more than
    /// `delete_distance` behind `viewpoint`, then refill the window.
    ///
    /// Returns how many pieces were evicted.
    pub fn advance(&mut self, viewpoint: f32) -> usize {
        let threshold = viewpoint - self.settings.delete_distance;
        let mut evicted = 0;

        while let Some(oldest) = self.segments.front() {
            if oldest.world_end().z >= threshold {
                break;
            }
            self.segments.pop_front();
            evicted += 1;
            if let Err(err) = self.extend() {
                error!("Discarding road segment {}: {}", self.next_index - 1, err);
            }
        }

        self.top_up();

        if evicted > 0 {
            debug!(
                "Recycled {} road segments, next index {}",
                evicted, self.next_index
            );
        }
        evicted
    }

    /// Refill the window after discarded pieces.
    fn top_up(&mut self) {
        let max_attempts = self.settings.visible_segments * 2 + ORDINARY_PATTERN.len();
        let mut attempts = 0;
        while self.segments.len() < self.settings.visible_segments && attempts < max_attempts {
            attempts += 1;
            if let Err(err) = self.extend() {
                error!("Discarding road segment {}: {}", self.next_index - 1, err);
            }
        }
        if self.segments.len() < self.settings.visible_segments {
            warn!(
                "Road window short: {} of {} segments placed",
                self.segments.len(),
                self.settings.visible_segments
            );
        }
    }

    fn next_template(&mut self) -> SegmentTemplate {
        if !self.catalog.specials.is_empty() && self.normals_until_special == 0 {
            self.normals_until_special = roll_spacing(&self.settings, &mut self.rng);
            let pick = self.rng.gen_range(0..self.catalog.specials.len());
            return self.catalog.specials[pick].clone();
        }

        self.normals_until_special = self.normals_until_special.saturating_sub(1);
        let category = ORDINARY_PATTERN[self.pattern_cursor];
        self.pattern_cursor = (self.pattern_cursor + 1) % ORDINARY_PATTERN.len();

        match category {
            SegmentCategory::OrdinaryB => self.catalog.ordinary_b.clone(),
            _ => self.catalog.ordinary_a.clone(),
        }
    }
}

fn roll_spacing(settings: &ChainSettings, rng: &mut impl Rng) -> u32 {
    let min = settings.min_normal_before_special;
    let max = settings.max_normal_before_special.max(min);
    rng.gen_range(min..=max)
}
