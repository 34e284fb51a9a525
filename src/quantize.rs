//! Scale table between quantized descriptor fields and runtime floats.
//!
//! Each conversion states its domain. Decoding accepts every input value;
//! encoding rounds and saturates into the field's storage type.

use std::f32::consts::PI;

/// `u8 → [0, 31.875]`, eighths. Branch and leaf counts per segment.
pub fn eighths(byte: u8) -> f32 {
    byte as f32 / 8.0
}

pub fn to_eighths(value: f32) -> u8 {
    saturate_u8(value * 8.0)
}

/// `u8 → [0, 2.55]`, hundredths. Splits per segment.
pub fn hundredths(byte: u8) -> f32 {
    byte as f32 / 100.0
}

pub fn to_hundredths(value: f32) -> u8 {
    saturate_u8(value * 100.0)
}

/// `u8 → [0, 1]`.
pub fn unit(byte: u8) -> f32 {
    byte as f32 / 255.0
}

pub fn to_unit(value: f32) -> u8 {
    saturate_u8(value * 255.0)
}

/// `u8 → [0, 0.125]`. Trunk radius to length ratio.
pub fn ratio(byte: u8) -> f32 {
    byte as f32 / 2040.0
}

pub fn to_ratio(value: f32) -> u8 {
    saturate_u8(value * 2040.0)
}

/// `u8 → [0, 7.97]`, 1/32 steps. Exponents and prune powers.
pub fn thirty_seconds(byte: u8) -> f32 {
    byte as f32 / 32.0
}

pub fn to_thirty_seconds(value: f32) -> u8 {
    saturate_u8(value * 32.0)
}

/// `u8 → [0, 3.98]`, 1/64 steps. Widths relative to tree scale.
pub fn sixty_fourths(byte: u8) -> f32 {
    byte as f32 / 64.0
}

pub fn to_sixty_fourths(value: f32) -> u8 {
    saturate_u8(value * 64.0)
}

/// `u8 → [0, 10]`. Root flare strength.
pub fn flare(byte: u8) -> f32 {
    byte as f32 / 25.5
}

pub fn to_flare(value: f32) -> u8 {
    saturate_u8(value * 25.5)
}

/// `u8 → [-10, 9.92]`, centered on 128. Upward attraction.
pub fn attraction(byte: u8) -> f32 {
    (byte as f32 - 128.0) / 12.8
}

pub fn to_attraction(value: f32) -> u8 {
    saturate_u8(value * 12.8 + 128.0)
}

/// `u8 → [0, 2.99]`. Taper regime selector.
pub fn taper(byte: u8) -> f32 {
    byte as f32 * 3.0 / 256.0
}

pub fn to_taper(value: f32) -> u8 {
    saturate_u8(value * 256.0 / 3.0)
}

/// `u8 → [0°, 180°]` in radians. Split angles.
pub fn half_turn(byte: u8) -> f32 {
    byte as f32 / 255.0 * PI
}

pub fn to_half_turn(radians: f32) -> u8 {
    saturate_u8(radians / PI * 255.0)
}

/// `u8 → [0°, 255°]` in radians.
pub fn degrees(byte: u8) -> f32 {
    (byte as f32).to_radians()
}

pub fn to_degrees(radians: f32) -> u8 {
    saturate_u8(radians.to_degrees())
}

/// `u8 → [0°, 510°]` in radians, two-degree steps. Curve variation.
pub fn double_degrees(byte: u8) -> f32 {
    (byte as f32 * 2.0).to_radians()
}

pub fn to_double_degrees(radians: f32) -> u8 {
    saturate_u8(radians.to_degrees() / 2.0)
}

/// `i16 → [-327.68°, 327.67°]` in radians, centidegrees.
pub fn centidegrees(value: i16) -> f32 {
    (value as f32 / 100.0).to_radians()
}

pub fn to_centidegrees(radians: f32) -> i16 {
    let scaled = (radians.to_degrees() * 100.0).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn saturate_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// IEEE 754 binary16 bits to `f32`.
pub fn f16_to_f32(bits: u16) -> f32 {
    let sign = ((bits >> 15) as u32) << 31;
    let exponent = ((bits >> 10) & 0x1f) as u32;
    let mantissa = (bits & 0x03ff) as u32;

    let out = match (exponent, mantissa) {
        (0, 0) => sign,
        (0, _) => {
            // Subnormal: value = mantissa * 2^-24.
            let magnitude = mantissa as f32 * f32::from_bits(0x3380_0000);
            return if sign != 0 { -magnitude } else { magnitude };
        }
        (0x1f, 0) => sign | 0x7f80_0000,
        (0x1f, _) => sign | 0x7fc0_0000 | (mantissa << 13),
        _ => sign | ((exponent + 112) << 23) | (mantissa << 13),
    };
    f32::from_bits(out)
}

/// `f32` to IEEE 754 binary16 bits, round to nearest even. Values beyond the
/// half range become infinity.
pub fn f32_to_f16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    if exponent == 0xff {
        let nan = if mantissa != 0 { 0x0200 } else { 0 };
        return sign | 0x7c00 | nan;
    }

    let half_exponent = exponent - 127 + 15;
    if half_exponent >= 0x1f {
        return sign | 0x7c00;
    }

    if half_exponent <= 0 {
        if half_exponent < -10 {
            return sign;
        }
        let full = mantissa | 0x0080_0000;
        let shift = (14 - half_exponent) as u32;
        let half_mantissa = full >> shift;
        let remainder = full & ((1 << shift) - 1);
        let halfway = 1 << (shift - 1);
        let round_up =
            remainder > halfway || (remainder == halfway && (half_mantissa & 1) == 1);
        return sign | (half_mantissa + round_up as u32) as u16;
    }

    let half_mantissa = mantissa >> 13;
    let remainder = mantissa & 0x1fff;
    let mut out = ((half_exponent as u32) << 10) | half_mantissa;
    if remainder > 0x1000 || (remainder == 0x1000 && (half_mantissa & 1) == 1) {
        // Carry may roll into the exponent, which is the correct rounding.
        out += 1;
    }
    sign | out as u16
}
