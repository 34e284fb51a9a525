//! Runtime (floating point) growth parameters decoded from a
//! [`SpeciesDescriptor`].

use crate::descriptor::{GlobalDescriptor, LEVELS, LevelDescriptor, SpeciesDescriptor};
use crate::quantize::{self, f16_to_f32};
use crate::shape::ShapeKind;

/// Ring resolution at full smoothness, per level.
const MAX_MESH_POINTS: [usize; LEVELS] = [24, 12, 8, 4];
const MIN_MESH_POINTS: usize = 3;

/// How consecutive children are rotated around their parent's axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phyllotaxis {
    /// Each child adds `angle` to the running rotation.
    Spiral { angle: f32 },
    /// Children alternate between `+angle` and `-angle`.
    Alternating { angle: f32 },
}

/// How the down angle of children is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DownAngle {
    /// `angle ± variation`.
    Fixed { angle: f32, variation: f32 },
    /// `angle ± variation * (1 - 2 * conical(position))`: children near the
    /// base and near the tip of the parent lean differently.
    ShapeDependent { angle: f32, variation: f32 },
}

/// Decoded parameters of one recursion level.
///
/// Angles are radians. `length` is absolute for level 0 and a fraction of the
/// parent's length for every other level.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelParameters {
    /// Stems of this level spawned per segment of their parent.
    pub branches: f32,
    pub segments: usize,
    pub seg_splits: f32,
    pub split_angle: f32,
    pub split_angle_v: f32,
    pub curve: f32,
    pub curve_back: f32,
    pub curve_v: f32,
    pub down_angle: DownAngle,
    pub phyllotaxis: Phyllotaxis,
    pub rotate_v: f32,
    pub taper: f32,
    pub length: f32,
    pub length_v: f32,
    /// Vertices per cross-section ring.
    pub mesh_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PruneParameters {
    /// Blend between unpruned (0) and fully pruned (1) lengths.
    pub ratio: f32,
    /// Maximum envelope radius relative to tree scale.
    pub width: f32,
    /// Relative height of the envelope's widest point.
    pub width_peak: f32,
    pub power_low: f32,
    pub power_high: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeafParameters {
    /// Leaves per segment of a max-level stem.
    pub per_segment: f32,
    pub scale: f32,
    /// Width relative to `scale`.
    pub scale_x: f32,
    /// Petiole length between attachment point and blade.
    pub stem_length: f32,
    /// Fraction of the angle to straight-down a leaf droops by.
    pub bend: f32,
}

/// Floating point mirror of a [`SpeciesDescriptor`], owned by one tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeParameters {
    /// Seed of the growth random stream; decoding itself never draws from it.
    pub seed: u8,
    pub shape: ShapeKind,
    /// Number of recursion levels in use, 1..=4.
    pub levels: usize,
    pub trunks: usize,
    pub scale: f32,
    pub scale_v: f32,
    pub base_size: f32,
    pub ratio: f32,
    pub ratio_power: f32,
    pub flare: f32,
    pub lobes: u32,
    pub lobe_depth: f32,
    pub base_splits: usize,
    pub attraction_up: f32,
    pub smoothness: f32,
    pub pruning: Option<PruneParameters>,
    pub leaves: LeafParameters,
    pub level: [LevelParameters; LEVELS],
}

impl TreeParameters {
    /// Deepest level that still grows stems; it carries the leaves.
    pub fn max_level(&self) -> usize {
        self.levels.saturating_sub(1)
    }

    /// Level parameters used when placing leaves on a max-level stem.
    pub fn leaf_level(&self) -> &LevelParameters {
        &self.level[(self.max_level() + 1).min(LEVELS - 1)]
    }
}

impl Default for TreeParameters {
    fn default() -> Self {
        decode(&SpeciesDescriptor::default(), 0)
    }
}

/// Decodes a descriptor. Pure; `seed` is only recorded.
pub fn decode(descriptor: &SpeciesDescriptor, seed: u8) -> TreeParameters {
    let global = &descriptor.global;
    let smoothness = quantize::unit(global.smoothness);
    let level = std::array::from_fn(|index| {
        decode_level(&descriptor.levels[index], index, global, smoothness)
    });

    TreeParameters {
        seed,
        shape: ShapeKind::from_byte(global.shape),
        levels: (global.levels as usize).clamp(1, LEVELS),
        trunks: (global.trunks as usize).max(1),
        scale: finite_half(global.scale),
        scale_v: finite_half(global.scale_v),
        base_size: quantize::unit(global.base_size),
        ratio: quantize::ratio(global.ratio),
        ratio_power: quantize::thirty_seconds(global.ratio_power),
        flare: quantize::flare(global.flare),
        lobes: global.lobes as u32,
        lobe_depth: quantize::unit(global.lobe_depth),
        base_splits: global.base_splits as usize,
        attraction_up: quantize::attraction(global.attraction_up),
        smoothness,
        pruning: (global.prune_enabled != 0).then(|| PruneParameters {
            ratio: quantize::unit(global.prune_ratio),
            width: quantize::sixty_fourths(global.prune_width),
            width_peak: quantize::unit(global.prune_width_peak),
            power_low: quantize::thirty_seconds(global.prune_power_low),
            power_high: quantize::thirty_seconds(global.prune_power_high),
        }),
        leaves: LeafParameters {
            per_segment: quantize::eighths(global.leaves),
            scale: finite_half(global.leaf_scale),
            scale_x: quantize::sixty_fourths(global.leaf_scale_x),
            stem_length: quantize::unit(global.leaf_stem_length),
            bend: quantize::unit(global.leaf_bend),
        },
        level,
    }
}

fn decode_level(
    raw: &LevelDescriptor,
    index: usize,
    global: &GlobalDescriptor,
    smoothness: f32,
) -> LevelParameters {
    let down_angle = quantize::centidegrees(raw.down_angle);
    let down_angle_v = quantize::centidegrees(raw.down_angle_v);
    let rotate = quantize::centidegrees(raw.rotate);

    LevelParameters {
        branches: quantize::eighths(raw.branches),
        segments: raw.segments as usize,
        seg_splits: quantize::hundredths(raw.seg_splits),
        split_angle: quantize::half_turn(raw.split_angle),
        split_angle_v: quantize::half_turn(raw.split_angle_v),
        curve: quantize::centidegrees(raw.curve),
        curve_back: quantize::centidegrees(raw.curve_back),
        curve_v: quantize::double_degrees(raw.curve_v),
        down_angle: if raw.down_angle_v >= 0 {
            DownAngle::Fixed {
                angle: down_angle,
                variation: down_angle_v,
            }
        } else {
            DownAngle::ShapeDependent {
                angle: down_angle,
                variation: -down_angle_v,
            }
        },
        phyllotaxis: if raw.rotate >= 0 {
            Phyllotaxis::Spiral { angle: rotate }
        } else {
            Phyllotaxis::Alternating { angle: -rotate }
        },
        rotate_v: quantize::degrees(raw.rotate_v),
        taper: quantize::taper(raw.taper),
        length: finite_half(raw.length),
        length_v: finite_half(raw.length_v),
        mesh_points: mesh_points(index, smoothness, global.lobes),
    }
}

/// Ring resolution for a level: scales with smoothness, and on the trunk is
/// raised so every lobe gets at least four vertices.
pub fn mesh_points(level: usize, smoothness: f32, lobes: u8) -> usize {
    let max = MAX_MESH_POINTS[level.min(LEVELS - 1)];
    let points = MIN_MESH_POINTS
        + ((max - MIN_MESH_POINTS) as f32 * smoothness.clamp(0.0, 1.0)).round() as usize;
    if level == 0 && lobes > 0 {
        points.max(lobes as usize * 4)
    } else {
        points
    }
}

/// Half-float field as `f32`; infinities and NaN decode to zero.
fn finite_half(bits: u16) -> f32 {
    let value = f16_to_f32(bits);
    if value.is_finite() { value } else { 0.0 }
}
