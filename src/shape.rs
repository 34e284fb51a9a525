//! Silhouette curves mapping a normalized height to a length multiplier.

use std::f32::consts::PI;

/// Overall crown silhouette of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeKind {
    #[default]
    Conical,
    Spherical,
    Hemispherical,
    Cylindrical,
    TaperedCylindrical,
    Flame,
    InverseConical,
    TendFlame,
    /// Silhouette is produced by envelope pruning instead of a curve.
    Envelope,
}

impl ShapeKind {
    pub const ALL: &'static [ShapeKind] = &[
        ShapeKind::Conical,
        ShapeKind::Spherical,
        ShapeKind::Hemispherical,
        ShapeKind::Cylindrical,
        ShapeKind::TaperedCylindrical,
        ShapeKind::Flame,
        ShapeKind::InverseConical,
        ShapeKind::TendFlame,
        ShapeKind::Envelope,
    ];

    /// Unknown bytes fall back to [`ShapeKind::Conical`].
    pub fn from_byte(byte: u8) -> Self {
        Self::ALL
            .get(byte as usize)
            .copied()
            .unwrap_or(ShapeKind::Conical)
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Conical => "Conical",
            ShapeKind::Spherical => "Spherical",
            ShapeKind::Hemispherical => "Hemispherical",
            ShapeKind::Cylindrical => "Cylindrical",
            ShapeKind::TaperedCylindrical => "Tapered Cylindrical",
            ShapeKind::Flame => "Flame",
            ShapeKind::InverseConical => "Inverse Conical",
            ShapeKind::TendFlame => "Tend Flame",
            ShapeKind::Envelope => "Envelope",
        }
    }
}

/// Length/density multiplier for a branch whose normalized distance from the
/// crown top is `ratio`.
///
/// `ratio` is expected in `[0, 1]`; callers clamp before calling.
pub fn shape_ratio(ratio: f32, kind: ShapeKind) -> f32 {
    match kind {
        ShapeKind::Conical => ratio,
        ShapeKind::Spherical => 0.2 + 0.8 * (PI * ratio).sin(),
        ShapeKind::Hemispherical => 0.2 + 0.8 * (0.5 * PI * ratio).sin(),
        ShapeKind::Cylindrical => 1.0,
        ShapeKind::TaperedCylindrical => 0.5 + 0.5 * ratio,
        ShapeKind::Flame => {
            if ratio <= 0.7 {
                ratio / 0.7
            } else {
                (1.0 - ratio) / 0.3
            }
        }
        ShapeKind::InverseConical => 1.0 - 0.8 * ratio,
        ShapeKind::TendFlame => {
            if ratio <= 0.7 {
                0.5 + 0.5 * ratio / 0.7
            } else {
                0.5 + 0.5 * (1.0 - ratio) / 0.3
            }
        }
        ShapeKind::Envelope => 1.0,
    }
}
