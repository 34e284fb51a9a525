//! Quantized species descriptors and their fixed binary layout.
//!
//! A descriptor is four per-level blocks followed by one global block, all
//! little endian. The layout is bit-exact: [`SpeciesDescriptor::to_bytes`]
//! and [`SpeciesDescriptor::from_bytes`] are inverses of each other.
//!
//! Use [`crate::params::decode`] to turn a descriptor into runtime
//! [`crate::params::TreeParameters`].

use thiserror::Error;

use crate::quantize::{self, f32_to_f16};
use crate::shape::ShapeKind;

/// Number of recursion levels a descriptor describes.
pub const LEVELS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("species descriptor truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Quantized growth parameters of one recursion level.
///
/// Field domains are documented in [`crate::quantize`]; see
/// [`crate::params::LevelParameters`] for the decoded meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelDescriptor {
    pub branches: u8,
    pub segments: u8,
    pub seg_splits: u8,
    pub split_angle: u8,
    pub split_angle_v: u8,
    pub curve_v: u8,
    pub curve: i16,
    pub curve_back: i16,
    pub down_angle: i16,
    pub down_angle_v: i16,
    pub rotate: i16,
    pub rotate_v: u8,
    pub taper: u8,
    /// Half-precision float bits.
    pub length: u16,
    /// Half-precision float bits.
    pub length_v: u16,
}

impl LevelDescriptor {
    pub const ENCODED_LEN: usize = 22;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[
            self.branches,
            self.segments,
            self.seg_splits,
            self.split_angle,
            self.split_angle_v,
            self.curve_v,
        ]);
        for value in [
            self.curve,
            self.curve_back,
            self.down_angle,
            self.down_angle_v,
            self.rotate,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.push(self.rotate_v);
        out.push(self.taper);
        out.extend_from_slice(&self.length.to_le_bytes());
        out.extend_from_slice(&self.length_v.to_le_bytes());
    }

    fn read(reader: &mut ByteReader<'_>) -> Self {
        Self {
            branches: reader.u8(),
            segments: reader.u8(),
            seg_splits: reader.u8(),
            split_angle: reader.u8(),
            split_angle_v: reader.u8(),
            curve_v: reader.u8(),
            curve: reader.i16(),
            curve_back: reader.i16(),
            down_angle: reader.i16(),
            down_angle_v: reader.i16(),
            rotate: reader.i16(),
            rotate_v: reader.u8(),
            taper: reader.u8(),
            length: reader.u16(),
            length_v: reader.u16(),
        }
    }
}

/// Quantized tree-wide parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalDescriptor {
    pub shape: u8,
    pub levels: u8,
    pub trunks: u8,
    /// Half-precision float bits.
    pub scale: u16,
    /// Half-precision float bits.
    pub scale_v: u16,
    pub base_size: u8,
    pub ratio: u8,
    pub ratio_power: u8,
    pub flare: u8,
    pub lobes: u8,
    pub lobe_depth: u8,
    pub base_splits: u8,
    pub attraction_up: u8,
    pub prune_enabled: u8,
    pub prune_ratio: u8,
    pub prune_width: u8,
    pub prune_width_peak: u8,
    pub prune_power_low: u8,
    pub prune_power_high: u8,
    pub leaves: u8,
    /// Half-precision float bits.
    pub leaf_scale: u16,
    pub leaf_scale_x: u8,
    pub leaf_stem_length: u8,
    pub leaf_bend: u8,
    pub smoothness: u8,
}

impl GlobalDescriptor {
    pub const ENCODED_LEN: usize = 28;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.shape, self.levels, self.trunks]);
        out.extend_from_slice(&self.scale.to_le_bytes());
        out.extend_from_slice(&self.scale_v.to_le_bytes());
        out.extend_from_slice(&[
            self.base_size,
            self.ratio,
            self.ratio_power,
            self.flare,
            self.lobes,
            self.lobe_depth,
            self.base_splits,
            self.attraction_up,
            self.prune_enabled,
            self.prune_ratio,
            self.prune_width,
            self.prune_width_peak,
            self.prune_power_low,
            self.prune_power_high,
            self.leaves,
        ]);
        out.extend_from_slice(&self.leaf_scale.to_le_bytes());
        out.extend_from_slice(&[
            self.leaf_scale_x,
            self.leaf_stem_length,
            self.leaf_bend,
            self.smoothness,
        ]);
    }

    fn read(reader: &mut ByteReader<'_>) -> Self {
        Self {
            shape: reader.u8(),
            levels: reader.u8(),
            trunks: reader.u8(),
            scale: reader.u16(),
            scale_v: reader.u16(),
            base_size: reader.u8(),
            ratio: reader.u8(),
            ratio_power: reader.u8(),
            flare: reader.u8(),
            lobes: reader.u8(),
            lobe_depth: reader.u8(),
            base_splits: reader.u8(),
            attraction_up: reader.u8(),
            prune_enabled: reader.u8(),
            prune_ratio: reader.u8(),
            prune_width: reader.u8(),
            prune_width_peak: reader.u8(),
            prune_power_low: reader.u8(),
            prune_power_high: reader.u8(),
            leaves: reader.u8(),
            leaf_scale: reader.u16(),
            leaf_scale_x: reader.u8(),
            leaf_stem_length: reader.u8(),
            leaf_bend: reader.u8(),
            smoothness: reader.u8(),
        }
    }
}

/// Immutable, quantized description of a tree species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeciesDescriptor {
    pub levels: [LevelDescriptor; LEVELS],
    pub global: GlobalDescriptor,
}

impl SpeciesDescriptor {
    pub const ENCODED_LEN: usize =
        LEVELS * LevelDescriptor::ENCODED_LEN + GlobalDescriptor::ENCODED_LEN;

    /// Parses the fixed binary layout. Trailing bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(DescriptorError::Truncated {
                expected: Self::ENCODED_LEN,
                actual: bytes.len(),
            });
        }

        let mut reader = ByteReader { bytes, cursor: 0 };
        let levels = std::array::from_fn(|_| LevelDescriptor::read(&mut reader));
        let global = GlobalDescriptor::read(&mut reader);
        Ok(Self { levels, global })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        for level in &self.levels {
            level.write(&mut out);
        }
        self.global.write(&mut out);
        out
    }

    /// Broad deciduous tree with a spherical crown, three levels and leaves.
    pub fn oak() -> Self {
        let mut levels = [LevelDescriptor::default(); LEVELS];
        levels[0] = LevelDescriptor {
            branches: 0,
            segments: 10,
            seg_splits: 10,
            split_angle: quantize::to_half_turn(30f32.to_radians()),
            split_angle_v: quantize::to_half_turn(10f32.to_radians()),
            curve_v: quantize::to_double_degrees(20f32.to_radians()),
            curve: 0,
            curve_back: 0,
            down_angle: 0,
            down_angle_v: 0,
            rotate: 0,
            rotate_v: 0,
            taper: quantize::to_taper(0.9),
            length: f32_to_f16(12.0),
            length_v: f32_to_f16(1.5),
        };
        levels[1] = LevelDescriptor {
            branches: quantize::to_eighths(3.0),
            segments: 8,
            seg_splits: 20,
            split_angle: quantize::to_half_turn(25f32.to_radians()),
            split_angle_v: quantize::to_half_turn(10f32.to_radians()),
            curve_v: quantize::to_double_degrees(60f32.to_radians()),
            curve: quantize::to_centidegrees(-30f32.to_radians()),
            curve_back: quantize::to_centidegrees(30f32.to_radians()),
            down_angle: quantize::to_centidegrees(60f32.to_radians()),
            down_angle_v: quantize::to_centidegrees(-40f32.to_radians()),
            rotate: quantize::to_centidegrees(137.5f32.to_radians()),
            rotate_v: quantize::to_degrees(15f32.to_radians()),
            taper: quantize::to_taper(1.0),
            length: f32_to_f16(0.55),
            length_v: f32_to_f16(0.1),
        };
        levels[2] = LevelDescriptor {
            branches: quantize::to_eighths(2.0),
            segments: 5,
            seg_splits: 0,
            split_angle: 0,
            split_angle_v: 0,
            curve_v: quantize::to_double_degrees(40f32.to_radians()),
            curve: quantize::to_centidegrees(20f32.to_radians()),
            curve_back: 0,
            down_angle: quantize::to_centidegrees(45f32.to_radians()),
            down_angle_v: quantize::to_centidegrees(10f32.to_radians()),
            rotate: quantize::to_centidegrees(140f32.to_radians()),
            rotate_v: 0,
            taper: quantize::to_taper(1.0),
            length: f32_to_f16(0.4),
            length_v: f32_to_f16(0.05),
        };
        levels[3] = LevelDescriptor {
            down_angle: quantize::to_centidegrees(50f32.to_radians()),
            rotate: quantize::to_centidegrees(-90f32.to_radians()),
            rotate_v: quantize::to_degrees(20f32.to_radians()),
            length: f32_to_f16(0.3),
            ..LevelDescriptor::default()
        };

        Self {
            levels,
            global: GlobalDescriptor {
                shape: ShapeKind::Spherical.to_byte(),
                levels: 3,
                trunks: 1,
                scale: f32_to_f16(1.0),
                scale_v: f32_to_f16(0.1),
                base_size: quantize::to_unit(0.3),
                ratio: quantize::to_ratio(0.03),
                ratio_power: quantize::to_thirty_seconds(1.3),
                flare: quantize::to_flare(0.6),
                lobes: 5,
                lobe_depth: quantize::to_unit(0.07),
                base_splits: 0,
                attraction_up: quantize::to_attraction(0.5),
                prune_enabled: 0,
                prune_ratio: 0,
                prune_width: quantize::to_sixty_fourths(0.5),
                prune_width_peak: quantize::to_unit(0.6),
                prune_power_low: quantize::to_thirty_seconds(0.5),
                prune_power_high: quantize::to_thirty_seconds(0.5),
                leaves: quantize::to_eighths(4.0),
                leaf_scale: f32_to_f16(0.25),
                leaf_scale_x: quantize::to_sixty_fourths(0.6),
                leaf_stem_length: quantize::to_unit(0.05),
                leaf_bend: quantize::to_unit(0.3),
                smoothness: quantize::to_unit(0.5),
            },
        }
    }

    /// Tall, narrow tree with whorled, drooping branches and no splits.
    pub fn conifer() -> Self {
        let mut species = Self::oak();
        species.levels[0].seg_splits = 0;
        species.levels[0].segments = 12;
        species.levels[0].curve_v = quantize::to_double_degrees(4f32.to_radians());
        species.levels[0].taper = quantize::to_taper(1.0);
        species.levels[0].length = f32_to_f16(18.0);
        species.levels[1].branches = quantize::to_eighths(6.0);
        species.levels[1].seg_splits = 0;
        species.levels[1].curve = quantize::to_centidegrees(-10f32.to_radians());
        species.levels[1].curve_back = 0;
        species.levels[1].down_angle = quantize::to_centidegrees(80f32.to_radians());
        species.levels[1].down_angle_v = quantize::to_centidegrees(10f32.to_radians());
        species.levels[1].length = f32_to_f16(0.3);
        species.global.shape = ShapeKind::Conical.to_byte();
        species.global.base_size = quantize::to_unit(0.15);
        species.global.lobes = 0;
        species.global.attraction_up = quantize::to_attraction(-0.5);
        species.global.leaves = quantize::to_eighths(8.0);
        species.global.leaf_scale = f32_to_f16(0.12);
        species.global.leaf_scale_x = quantize::to_sixty_fourths(0.1);
        species
    }

    /// Weeping crown pruned to an envelope, with strong downward attraction.
    pub fn weeping() -> Self {
        let mut species = Self::oak();
        species.levels[1].curve = quantize::to_centidegrees(-80f32.to_radians());
        species.levels[1].curve_back = 0;
        species.levels[2].curve = quantize::to_centidegrees(-60f32.to_radians());
        species.levels[2].taper = quantize::to_taper(1.6);
        species.global.shape = ShapeKind::Envelope.to_byte();
        species.global.attraction_up = quantize::to_attraction(-3.0);
        species.global.prune_enabled = 1;
        species.global.prune_ratio = quantize::to_unit(1.0);
        species.global.prune_width = quantize::to_sixty_fourths(0.6);
        species.global.prune_width_peak = quantize::to_unit(0.4);
        species.global.prune_power_low = quantize::to_thirty_seconds(0.3);
        species.global.prune_power_high = quantize::to_thirty_seconds(1.5);
        species.global.leaf_bend = quantize::to_unit(0.8);
        species
    }
}

impl Default for SpeciesDescriptor {
    fn default() -> Self {
        Self::oak()
    }
}

/// Cursor over a slice already known to be long enough.
struct ByteReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl ByteReader<'_> {
    fn u8(&mut self) -> u8 {
        let value = self.bytes[self.cursor];
        self.cursor += 1;
        value
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes([self.u8(), self.u8()])
    }

    fn i16(&mut self) -> i16 {
        i16::from_le_bytes([self.u8(), self.u8()])
    }
}
