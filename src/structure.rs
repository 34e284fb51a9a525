//! The generated tree structure: an arena of [`Stem`] records.
//!
//! Ownership is expressed through index lists: a stem owns its segments and
//! leaves directly, and owns its substems and split clones through
//! [`StemId`]s into [`Tree::stems`]. `parent` and `clone_source` point the
//! other way and are only used for metadata lookup.

use bevy::math::{Quat, Vec3};

use crate::diffusion::StemCounters;
use crate::params::TreeParameters;
use crate::pose::Pose;
use crate::taper::{StemProfile, stem_radius};

/// Index of a stem in [`Tree::stems`]. Only the generator hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StemId(pub(crate) usize);

impl StemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One sample along a segment; each becomes a cross-section ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subsegment {
    pub position: Vec3,
    pub radius: f32,
    /// Distance from the start of the owning segment.
    pub distance: f32,
}

/// One subdivision of a stem between two curvature changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Index along the stem, counted from the stem base even for clones.
    pub index: usize,
    /// Frame at the segment start; the segment runs along its +Z.
    pub pose: Pose,
    pub length: f32,
    pub samples: Vec<Subsegment>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leaf {
    /// Attachment frame before gravity bend; +Z along the blade.
    pub pose: Pose,
    /// World-space rotation applied on top of `pose` by gravity.
    pub bend: Quat,
}

impl Leaf {
    /// Final frame of the leaf after gravity bend.
    pub fn bent_pose(&self) -> Pose {
        Pose {
            position: self.pose.position,
            rotation: (self.bend * self.pose.rotation).normalize(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stem {
    pub level: usize,
    pub pose: Pose,
    pub length: f32,
    pub base_radius: f32,
    /// Upper bound for child length fractions, drawn once per stem.
    pub length_child_max: f32,
    pub taper: f32,
    pub segment_count: usize,
    /// First segment index this stem owns; non-zero only for split clones.
    pub first_segment: usize,
    /// Distance along the parent where this stem is attached. Clones share
    /// the offset of the stem they split from.
    pub attach_offset: f32,
    /// Diffusion state after the last segment was grown.
    pub counters: StemCounters,
    pub segments: Vec<Segment>,
    pub substems: Vec<StemId>,
    pub clones: Vec<StemId>,
    pub leaves: Vec<Leaf>,
    /// Parent stem; clones report the parent of their source, so trunk
    /// clones have none.
    pub parent: Option<StemId>,
    /// Stem that first split into this clone chain.
    pub clone_source: Option<StemId>,
}

impl Stem {
    pub fn is_clone(&self) -> bool {
        self.clone_source.is_some()
    }

    pub fn profile(&self, flare: f32) -> StemProfile {
        StemProfile {
            level: self.level,
            length: self.length,
            base_radius: self.base_radius,
            taper: self.taper,
            flare,
        }
    }
}

/// A generated tree. Immutable once [`crate::TreeGenerator`] returns it.
#[derive(Debug, Clone)]
pub struct Tree {
    pub params: TreeParameters,
    /// Frame the trunks grew from.
    pub root: Pose,
    pub stems: Vec<Stem>,
    pub roots: Vec<StemId>,
}

impl Tree {
    /// # Panics
    ///
    /// If `id` came from a different tree with more stems.
    pub fn stem(&self, id: StemId) -> &Stem {
        &self.stems[id.0]
    }

    /// Like [`Tree::stem`], but `None` for an id this tree does not hold.
    pub fn get(&self, id: StemId) -> Option<&Stem> {
        self.stems.get(id.0)
    }

    pub fn stem_count(&self) -> usize {
        self.stems.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.stems.iter().map(|stem| stem.leaves.len()).sum()
    }

    /// Radius of a stem `distance` units above its base.
    pub fn radius_at(&self, id: StemId, distance: f32) -> f32 {
        let stem = self.stem(id);
        stem_radius(distance, &stem.profile(self.params.flare))
    }

    /// The stem whose radius defines the texture scale of `id`: the head of
    /// its clone chain, or itself.
    pub fn uv_source(&self, id: StemId) -> StemId {
        self.stem(id).clone_source.unwrap_or(id)
    }

    /// Pre-order walk matching the emitter's visitation order: a stem, its
    /// substem subtrees, then its clone subtrees.
    pub fn iter_depth_first(&self) -> DepthFirst<'_> {
        let mut pending: Vec<StemId> = self.roots.clone();
        pending.reverse();
        DepthFirst {
            tree: self,
            pending,
        }
    }
}

pub struct DepthFirst<'a> {
    tree: &'a Tree,
    pending: Vec<StemId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = StemId;

    fn next(&mut self) -> Option<StemId> {
        let id = self.pending.pop()?;
        let stem = self.tree.stem(id);
        self.pending.extend(stem.clones.iter().rev());
        self.pending.extend(stem.substems.iter().rev());
        Some(id)
    }
}
