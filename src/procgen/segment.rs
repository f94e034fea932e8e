//! Road segment pieces and the templates they are built from.
#![allow(dead_code)]

use std::fmt;

use bevy::prelude::*;

/// Which kind of road piece a segment is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentCategory {
    /// Plain road, the common piece of the repeating pattern.
    OrdinaryA,
    /// Plain road variant used every third slot of the pattern.
    OrdinaryB,
    /// Crossing or other landmark piece, keyed by its slot in the special pool.
    Special(u8),
}

impl SegmentCategory {
    pub fn is_special(self) -> bool {
        matches!(self, SegmentCategory::Special(_))
    }
}

/// Prefab stand-in: alignment anchors in the piece's local frame.
///
/// Local +Z is the direction of travel. Anchors are optional because a
/// malformed piece is a runtime configuration error, not a type error.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentTemplate {
    pub category: SegmentCategory,
    pub start_anchor: Option<Vec3>,
    pub end_anchor: Option<Vec3>,
}

impl SegmentTemplate {
    /// A straight piece of `length` centred on its origin.
    pub fn straight(category: SegmentCategory, length: f32) -> Self {
        Self {
            category,
            start_anchor: Some(Vec3::new(0.0, 0.0, -length * 0.5)),
            end_anchor: Some(Vec3::new(0.0, 0.0, length * 0.5)),
        }
    }

    /// Both anchors, or the reason the piece cannot be placed.
    pub fn anchors(&self) -> Result<(Vec3, Vec3), SegmentError> {
        match (self.start_anchor, self.end_anchor) {
            (Some(start), Some(end)) => Ok((start, end)),
            (start, end) => Err(SegmentError::MissingAnchor {
                category: self.category,
                start_missing: start.is_none(),
                end_missing: end.is_none(),
            }),
        }
    }
}

/// The pieces a chain draws from.
#[derive(Clone, Debug)]
pub struct SegmentCatalog {
    pub ordinary_a: SegmentTemplate,
    pub ordinary_b: SegmentTemplate,
    pub specials: Vec<SegmentTemplate>,
}

impl SegmentCatalog {
    /// Straight pieces everywhere, with `special_count` crossing variants.
    pub fn straight(length: f32, special_count: u8) -> Self {
        Self {
            ordinary_a: SegmentTemplate::straight(SegmentCategory::OrdinaryA, length),
            ordinary_b: SegmentTemplate::straight(SegmentCategory::OrdinaryB, length),
            specials: (0..special_count)
                .map(|i| SegmentTemplate::straight(SegmentCategory::Special(i), length))
                .collect(),
        }
    }
}

/// A placed road piece in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Position along the chain, strictly increasing.
    pub index: u64,
    pub category: SegmentCategory,
    pub start_anchor: Vec3,
    pub end_anchor: Vec3,
    pub position: Vec3,
    pub rotation: Quat,
}

impl Segment {
    /// Local-to-world for a point on this piece.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    pub fn world_start(&self) -> Vec3 {
        self.to_world(self.start_anchor)
    }

    pub fn world_end(&self) -> Vec3 {
        self.to_world(self.end_anchor)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Errors raised while placing a segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentError {
    /// The template lacks one or both alignment anchors.
    MissingAnchor {
        category: SegmentCategory,
        start_missing: bool,
        end_missing: bool,
    },
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::MissingAnchor {
                category,
                start_missing,
                end_missing,
            } => {
                let which = match (start_missing, end_missing) {
                    (true, true) => "start and end anchors",
                    (true, false) => "start anchor",
                    _ => "end anchor",
                };
                write!(f, "{category:?} segment template is missing its {which}")
            }
        }
    }
}

impl std::error::Error for SegmentError {}
