//! Recursive stem growth.
//!
//! [`TreeGenerator`] turns [`TreeParameters`] into a [`Tree`]. Each stem is
//! grown depth first: length and radius, optional envelope pruning, then one
//! segment at a time with children (or leaves) and split clones spawned as
//! soon as the segment exists. All randomness comes from a single
//! `ChaCha8Rng` seeded with [`TreeParameters::seed`], so the same parameters
//! always produce the same tree.

use std::f32::consts::TAU;

use bevy::log::{debug, warn};
use bevy::math::{Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::descriptor::LEVELS;
use crate::diffusion::StemCounters;
use crate::envelope::{Envelope, prune_length};
use crate::params::{DownAngle, LevelParameters, Phyllotaxis, TreeParameters};
use crate::pose::Pose;
use crate::shape::{ShapeKind, shape_ratio};
use crate::structure::{Leaf, Segment, Stem, StemId, Subsegment, Tree};
use crate::taper::{StemProfile, stem_radius};

/// Stems shorter than this are dropped.
pub const MIN_STEM_LENGTH: f32 = 1e-3;
/// Stems thinner than this at their base are dropped.
pub const MIN_STEM_RADIUS: f32 = 1e-4;
/// Hard cap on stems per tree; runaway split settings stop growing here.
pub const MAX_STEMS: usize = 250_000;

/// Samples in the last segment of a stem with a rounded tip.
const TIP_SAMPLES: usize = 10;
/// Samples in the first trunk segment when the trunk flares.
const FLARE_SAMPLES: usize = 10;
/// Samples per segment for periodic taper.
const PERIODIC_SAMPLES: usize = 10;

/// Where a new stem starts and who it hangs off.
#[derive(Debug, Clone, Copy)]
struct StemSeed {
    level: usize,
    pose: Pose,
    parent: Option<StemId>,
    offset: f32,
}

/// Random deviation of one segment from its planned curve.
#[derive(Debug, Clone, Copy, Default)]
struct Wobble {
    /// Direction of the wobble axis in the local XY plane.
    heading: f32,
    angle: f32,
}

/// Mutable per-stem state carried from segment to segment and copied into
/// split clones.
#[derive(Debug, Clone, Copy)]
struct Growth {
    counters: StemCounters,
    /// Branch and leaf density left after splits, `1 / Π(splits + 1)`.
    density: f32,
    /// Extra curvature per segment spreading split tilts along the stem.
    split_curve: f32,
    child_rotation: f32,
    child_sign: f32,
    leaf_rotation: f32,
    leaf_sign: f32,
}

pub struct TreeGenerator {
    params: TreeParameters,
    rng: ChaCha8Rng,
    stems: Vec<Stem>,
    /// Tree-wide scale drawn once per tree.
    tree_scale: f32,
    envelope: Option<Envelope>,
    capped: bool,
}

impl TreeGenerator {
    pub fn new(params: TreeParameters) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(params.seed as u64);
        Self {
            params,
            rng,
            stems: Vec::new(),
            tree_scale: 1.0,
            envelope: None,
            capped: false,
        }
    }

    /// Grows an upright tree rooted at `position`.
    pub fn generate_at(self, position: Vec3) -> Tree {
        self.generate(Pose::upright(position))
    }

    /// Grows a tree whose trunks start at `root` and grow along its +Z.
    pub fn generate(mut self, root: Pose) -> Tree {
        self.tree_scale = self.vary(self.params.scale, self.params.scale_v).max(0.0);
        let height = self.params.level[0].length * self.tree_scale;
        self.envelope = self
            .params
            .pruning
            .map(|prune| Envelope::new(root, height, self.params.base_size, prune));

        let trunks = self.params.trunks;
        let mut roots = Vec::with_capacity(trunks);
        for index in 0..trunks {
            let azimuth = index as f32 * TAU / trunks as f32;
            let tilt = self.trunk_tilt();
            let pose = root
                .rotated_local(Vec3::Z, azimuth)
                .rotated_local(Vec3::X, tilt);
            let seed = StemSeed {
                level: 0,
                pose,
                parent: None,
                offset: 0.0,
            };
            if let Some(id) = self.grow_stem(seed) {
                roots.push(id);
            }
        }

        let tree = Tree {
            params: self.params,
            root,
            stems: self.stems,
            roots,
        };
        debug!(
            "generated tree: {} trunks, {} stems, {} leaves",
            tree.roots.len(),
            tree.stem_count(),
            tree.leaf_count()
        );
        tree
    }

    fn vary(&mut self, base: f32, variation: f32) -> f32 {
        if variation == 0.0 {
            base
        } else {
            base + variation * self.rng.gen_range(-1.0f32..=1.0)
        }
    }

    fn trunk_tilt(&mut self) -> f32 {
        match self.params.level[0].down_angle {
            DownAngle::Fixed { angle, variation }
            | DownAngle::ShapeDependent { angle, variation } => self.vary(angle, variation),
        }
    }

    fn at_capacity(&mut self) -> bool {
        if self.stems.len() < MAX_STEMS {
            return false;
        }
        if !self.capped {
            warn!("tree reached {} stems; further growth skipped", MAX_STEMS);
            self.capped = true;
        }
        true
    }

    fn draw_wobble(&mut self, level: usize, segments: usize) -> Vec<Wobble> {
        let curve_v = self.params.level[level].curve_v;
        (0..segments)
            .map(|_| {
                if curve_v == 0.0 {
                    return Wobble::default();
                }
                Wobble {
                    heading: self.rng.gen_range(0.0..TAU),
                    angle: curve_v / segments as f32 * self.rng.gen_range(-1.0f32..=1.0),
                }
            })
            .collect()
    }

    fn new_growth(&mut self) -> Growth {
        Growth {
            counters: StemCounters::default(),
            density: 1.0,
            split_curve: 0.0,
            child_rotation: self.rng.gen_range(0.0..TAU),
            child_sign: 1.0,
            leaf_rotation: self.rng.gen_range(0.0..TAU),
            leaf_sign: 1.0,
        }
    }

    /// Length of a new stem, before pruning.
    fn stem_length(&mut self, seed: &StemSeed) -> f32 {
        let level = &self.params.level[seed.level];
        let (length, length_v) = (level.length, level.length_v);

        let Some(parent_id) = seed.parent else {
            return self.vary(length, length_v) * self.tree_scale;
        };

        let parent = &self.stems[parent_id.0];
        if seed.level == 1 {
            let base_length = self.params.base_size * parent.length;
            let position = relative_position(parent.length, base_length, seed.offset);
            parent.length * parent.length_child_max * shape_ratio(position, self.params.shape)
        } else {
            parent.length_child_max * (parent.length - 0.6 * seed.offset)
        }
    }

    /// Base radius of a new stem, clamped to its parent's radius at the
    /// attachment point.
    fn stem_base_radius(&self, seed: &StemSeed, length: f32) -> f32 {
        let Some(parent_id) = seed.parent else {
            return length * self.params.ratio;
        };

        let parent = &self.stems[parent_id.0];
        let relative = if parent.length > f32::EPSILON {
            (length / parent.length).max(0.0)
        } else {
            0.0
        };
        let radius = parent.base_radius * relative.powf(self.params.ratio_power);
        let limit = stem_radius(seed.offset, &parent.profile(self.params.flare));
        radius.min(limit)
    }

    /// Frame at the start of segment `index`, given the frame at the end of
    /// the previous segment.
    fn curved(
        &self,
        pose: Pose,
        level: usize,
        index: usize,
        segments: usize,
        wobble: Wobble,
        split_curve: f32,
    ) -> Pose {
        let params = &self.params.level[level];
        let count = segments as f32;
        let curve = if params.curve_back == 0.0 {
            params.curve / count
        } else {
            let half = (count / 2.0).max(1.0);
            if index < segments.div_ceil(2) {
                params.curve / half
            } else {
                params.curve_back / half
            }
        };

        let mut next = pose.rotated_local(Vec3::X, curve + split_curve);
        if wobble.angle != 0.0 {
            let (sin, cos) = wobble.heading.sin_cos();
            next = next.rotated_local(Vec3::new(cos, sin, 0.0), wobble.angle);
        }

        if level >= 2 && self.params.attraction_up != 0.0 {
            let heading = next.forward();
            let axis = heading.cross(Vec3::Y);
            if axis.length_squared() > 1e-8 {
                let declination = heading.angle_between(Vec3::Y);
                let turn = (self.params.attraction_up * declination * declination.sin() / count)
                    .clamp(declination - std::f32::consts::PI, declination);
                next = next.rotated_world(axis.normalize(), turn);
            }
        }
        next
    }

    /// Index of the first segment whose end leaves the envelope, if any.
    fn first_outside(
        &self,
        envelope: &Envelope,
        start: Pose,
        level: usize,
        length: f32,
        wobble: &[Wobble],
    ) -> Option<usize> {
        let segments = wobble.len();
        let segment_length = length / segments as f32;
        let mut pose = start;
        for (index, &jitter) in wobble.iter().enumerate() {
            if index > 0 {
                pose = self.curved(pose, level, index, segments, jitter, 0.0);
            }
            let end = pose.translated_z(segment_length);
            if !envelope.contains(end.position) {
                return Some(index);
            }
            pose = end;
        }
        None
    }

    fn grow_stem(&mut self, seed: StemSeed) -> Option<StemId> {
        if self.at_capacity() {
            return None;
        }

        let level_params = self.params.level[seed.level];
        let segments = level_params.segments.max(1);

        let mut length = self.stem_length(&seed);
        let length_child_max = if seed.level + 1 < LEVELS {
            let next = &self.params.level[seed.level + 1];
            let (fraction, variation) = (next.length, next.length_v);
            self.vary(fraction, variation).max(0.0)
        } else {
            0.0
        };
        if unusable(length, MIN_STEM_LENGTH) {
            return None;
        }

        let mut radius = self.stem_base_radius(&seed, length);
        if unusable(radius, MIN_STEM_RADIUS) {
            return None;
        }

        let wobble = self.draw_wobble(seed.level, segments);

        if let (true, Some(envelope)) = (seed.level > 0, self.envelope) {
            length = prune_length(
                length,
                segments,
                MIN_STEM_LENGTH,
                envelope.params.ratio,
                |candidate| {
                    self.first_outside(&envelope, seed.pose, seed.level, candidate, &wobble)
                },
            );
            if unusable(length, MIN_STEM_LENGTH) {
                return None;
            }
            radius = self.stem_base_radius(&seed, length);
            if unusable(radius, MIN_STEM_RADIUS) {
                return None;
            }
        }

        let id = StemId(self.stems.len());
        self.stems.push(Stem {
            level: seed.level,
            pose: seed.pose,
            length,
            base_radius: radius,
            length_child_max,
            taper: level_params.taper,
            segment_count: segments,
            first_segment: 0,
            attach_offset: seed.offset,
            counters: StemCounters::default(),
            segments: Vec::with_capacity(segments),
            substems: Vec::new(),
            clones: Vec::new(),
            leaves: Vec::new(),
            parent: seed.parent,
            clone_source: None,
        });

        let growth = self.new_growth();
        self.grow_segments(id, 0, seed.pose, growth, &wobble);
        Some(id)
    }

    /// Creates a clone of `source` continuing from segment `start`.
    fn grow_clone(
        &mut self,
        source: StemId,
        start: usize,
        pose: Pose,
        growth: Growth,
    ) -> Option<StemId> {
        if self.at_capacity() {
            return None;
        }

        // Clones are siblings of their source and share its attachment and
        // radius profile; `first_segment` marks where along it they start.
        let origin = &self.stems[source.0];
        let clone = Stem {
            level: origin.level,
            pose,
            length: origin.length,
            base_radius: origin.base_radius,
            length_child_max: origin.length_child_max,
            taper: origin.taper,
            segment_count: origin.segment_count,
            first_segment: start,
            attach_offset: origin.attach_offset,
            counters: growth.counters,
            segments: Vec::with_capacity(origin.segment_count - start),
            substems: Vec::new(),
            clones: Vec::new(),
            leaves: Vec::new(),
            parent: origin.parent,
            clone_source: Some(origin.clone_source.unwrap_or(source)),
        };
        let (level, segments) = (clone.level, clone.segment_count);

        let id = StemId(self.stems.len());
        self.stems.push(clone);

        let wobble = self.draw_wobble(level, segments);
        self.grow_segments(id, start, pose, growth, &wobble);
        Some(id)
    }

    fn grow_segments(
        &mut self,
        id: StemId,
        start: usize,
        mut pose: Pose,
        mut growth: Growth,
        wobble: &[Wobble],
    ) {
        let (level, length, segments, profile, is_clone) = {
            let stem = &self.stems[id.0];
            (
                stem.level,
                stem.length,
                stem.segment_count,
                stem.profile(self.params.flare),
                stem.is_clone(),
            )
        };
        let segment_length = length / segments as f32;
        let max_level = self.params.max_level();

        for index in start..segments {
            if index > 0 {
                pose = self.curved(pose, level, index, segments, wobble[index], growth.split_curve);
            }

            let samples =
                sample_segment(&profile, pose, index, index == start, segments, segment_length);
            self.stems[id.0].segments.push(Segment {
                index,
                pose,
                length: segment_length,
                samples,
            });

            if level < max_level {
                self.grow_substems(id, index, pose, &mut growth);
            } else {
                self.grow_leaves(id, index, pose, &mut growth);
            }

            let end = pose.translated_z(segment_length);
            if index + 1 < segments {
                let base_split =
                    level == 0 && index == 0 && !is_clone && self.params.base_splits > 0;
                let count = if base_split {
                    self.params.base_splits
                } else {
                    let target = self.params.level[level].seg_splits;
                    growth.counters.splits.next_count(target)
                };
                if count > 0 {
                    self.split(id, index, end, count, base_split, &mut growth);
                }
            }
            pose = end;
        }

        self.stems[id.0].counters = growth.counters;
    }

    /// Spawns `count` clones at the end of segment `index` and bends the
    /// stem itself by its share of the split.
    fn split(
        &mut self,
        id: StemId,
        index: usize,
        end: Pose,
        count: usize,
        base_split: bool,
        growth: &mut Growth,
    ) {
        let stem = &self.stems[id.0];
        let (level, segments) = (stem.level, stem.segment_count);
        let params = self.params.level[level];
        let remaining = (segments - index - 1) as f32;

        let even_step = TAU / (count + 1) as f32;
        let step = match (base_split, params.phyllotaxis) {
            (true, Phyllotaxis::Spiral { angle } | Phyllotaxis::Alternating { angle })
                if angle != 0.0 =>
            {
                angle
            }
            _ => even_step,
        };

        growth.density /= (count + 1) as f32;

        for clone_index in 1..=count {
            let tilt = self.vary(params.split_angle, params.split_angle_v);
            let mut clone_growth = *growth;
            clone_growth.split_curve += tilt / remaining;
            let pose = end.rotated_local(Vec3::Z, clone_index as f32 * step);
            if let Some(clone) = self.grow_clone(id, index + 1, pose, clone_growth) {
                self.stems[id.0].clones.push(clone);
            }
        }

        let tilt = self.vary(params.split_angle, params.split_angle_v);
        growth.split_curve += tilt / remaining;
    }

    fn grow_substems(&mut self, id: StemId, index: usize, pose: Pose, growth: &mut Growth) {
        let stem = &self.stems[id.0];
        let (level, length, segments) = (stem.level, stem.length, stem.segment_count);
        let child_level = level + 1;
        let child_params = self.params.level[child_level];

        let segment_length = length / segments as f32;
        let segment_start = index as f32 * segment_length;
        let segment_end = segment_start + segment_length;
        let clear_from = if level == 0 {
            (self.params.base_size * length).clamp(segment_start, segment_end)
        } else {
            segment_start
        };
        let span = segment_end - clear_from;
        if span <= 0.0 {
            return;
        }

        let target = child_params.branches * growth.density * span / segment_length;
        let count = growth.counters.substems.next_count(target);
        let base_length = if level == 0 {
            self.params.base_size * length
        } else {
            0.0
        };

        for child in 0..count {
            let along = self.spread(child, count);
            let local = clear_from - segment_start + along * span;
            let offset = segment_start + local;

            let rotation = self.next_rotation(
                &child_params,
                &mut growth.child_rotation,
                &mut growth.child_sign,
            );
            let position = relative_position(length, base_length, offset);
            let down = self.down_angle(&child_params, position);

            let child_pose = pose
                .translated_z(local)
                .rotated_local(Vec3::Z, rotation)
                .rotated_local(Vec3::X, down);
            let seed = StemSeed {
                level: child_level,
                pose: child_pose,
                parent: Some(id),
                offset,
            };
            if let Some(child_id) = self.grow_stem(seed) {
                self.stems[id.0].substems.push(child_id);
            }
        }
    }

    fn grow_leaves(&mut self, id: StemId, index: usize, pose: Pose, growth: &mut Growth) {
        let leaves = self.params.leaves;
        if leaves.per_segment <= 0.0 {
            return;
        }

        let stem = &self.stems[id.0];
        let (length, segments) = (stem.length, stem.segment_count);
        let segment_length = length / segments as f32;
        let leaf_params = *self.params.leaf_level();

        let count = growth.counters.leaves.next_count(leaves.per_segment * growth.density);
        for leaf in 0..count {
            let local = self.spread(leaf, count) * segment_length;
            let offset = index as f32 * segment_length + local;

            let rotation = self.next_rotation(
                &leaf_params,
                &mut growth.leaf_rotation,
                &mut growth.leaf_sign,
            );
            let down = self.down_angle(&leaf_params, relative_position(length, 0.0, offset));

            let leaf_pose = pose
                .translated_z(local)
                .rotated_local(Vec3::Z, rotation)
                .rotated_local(Vec3::X, down);
            let bend = gravity_bend(&leaf_pose, leaves.bend);
            self.stems[id.0].leaves.push(Leaf {
                pose: leaf_pose,
                bend,
            });
        }
    }

    /// Evenly spaced position in `(0, 1)` for item `index` of `count`, with
    /// jitter of up to a quarter spacing.
    fn spread(&mut self, index: usize, count: usize) -> f32 {
        let jitter = self.rng.gen_range(-0.25f32..=0.25);
        (index as f32 + 0.5 + jitter) / count as f32
    }

    fn next_rotation(
        &mut self,
        params: &LevelParameters,
        running: &mut f32,
        sign: &mut f32,
    ) -> f32 {
        let jitter = self.vary(0.0, params.rotate_v);
        match params.phyllotaxis {
            Phyllotaxis::Spiral { angle } => {
                *running = (*running + angle + jitter) % TAU;
                *running
            }
            Phyllotaxis::Alternating { angle } => {
                *sign = -*sign;
                *running + *sign * angle + jitter
            }
        }
    }

    fn down_angle(&mut self, params: &LevelParameters, position: f32) -> f32 {
        match params.down_angle {
            DownAngle::Fixed { angle, variation } => self.vary(angle, variation),
            DownAngle::ShapeDependent { angle, variation } => {
                angle + variation * (1.0 - 2.0 * shape_ratio(position, ShapeKind::Conical))
            }
        }
    }
}

/// Ring samples along one segment. Rounded tips and flared bases get
/// exponentially denser samples towards the discontinuity, periodic taper
/// gets uniform samples, and plain taper only needs the segment end.
fn sample_segment(
    profile: &StemProfile,
    pose: Pose,
    index: usize,
    include_start: bool,
    segments: usize,
    segment_length: f32,
) -> Vec<Subsegment> {
    let mut fractions: Vec<f32> = Vec::new();
    if include_start {
        fractions.push(0.0);
    }

    if profile.taper > 2.0 {
        fractions.extend((1..=PERIODIC_SAMPLES).map(|k| k as f32 / PERIODIC_SAMPLES as f32));
    } else if profile.taper > 1.0 && index + 1 == segments {
        fractions.extend((1..TIP_SAMPLES).map(|k| 1.0 - 0.5f32.powi(k as i32)));
        fractions.push(1.0);
    } else if profile.level == 0 && profile.flare != 0.0 && index == 0 {
        fractions.extend((1..=FLARE_SAMPLES).map(|k| 0.5f32.powi((FLARE_SAMPLES - k) as i32)));
    } else {
        fractions.push(1.0);
    }

    let segment_start = index as f32 * segment_length;
    fractions
        .into_iter()
        .map(|fraction| {
            let distance = fraction * segment_length;
            Subsegment {
                position: pose.translated_z(distance).position,
                radius: stem_radius(segment_start + distance, profile),
                distance,
            }
        })
        .collect()
}

/// NaN, infinite or smaller than `minimum`.
fn unusable(value: f32, minimum: f32) -> bool {
    !value.is_finite() || value < minimum
}

/// Normalized distance of `offset` from the stem tip, 0 at the tip and 1 at
/// the end of the bare base.
fn relative_position(length: f32, base_length: f32, offset: f32) -> f32 {
    let span = length - base_length;
    if span > f32::EPSILON {
        ((length - offset) / span).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Rotation drooping a leaf towards straight down by `bend` of the angle
/// between its blade and the downward direction.
fn gravity_bend(pose: &Pose, bend: f32) -> Quat {
    if bend == 0.0 {
        return Quat::IDENTITY;
    }
    let forward = pose.forward();
    let axis = forward.cross(Vec3::NEG_Y);
    if axis.length_squared() < 1e-8 {
        return Quat::IDENTITY;
    }
    let offset = forward.angle_between(Vec3::NEG_Y);
    Quat::from_axis_angle(axis.normalize(), bend * offset)
}
