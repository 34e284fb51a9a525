//! Stem cross-section radius as a function of distance from the stem base.
//!
//! The taper value selects one of three regimes:
//!
//! - `[0, 1]`: linear taper towards `base_radius * (1 - taper)` at the tip.
//! - `(1, 2]`: linear taper with rate `2 - taper`, capped by a spherical tip.
//! - `(2, 3)`: periodic bulges along the stem, amplitude `taper - 2`.
//!
//! Level 0 stems additionally flare out near the ground when `flare > 0`.

/// Everything [`stem_radius`] needs to know about a stem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StemProfile {
    pub level: usize,
    pub length: f32,
    pub base_radius: f32,
    pub taper: f32,
    pub flare: f32,
}

/// Fraction of the trunk height affected by root flare.
pub const FLARE_HEIGHT: f32 = 0.125;

/// Radius of the stem `distance` units above its base.
pub fn stem_radius(distance: f32, stem: &StemProfile) -> f32 {
    if stem.length <= 0.0 || stem.base_radius <= 0.0 {
        return 0.0;
    }

    let z = (distance / stem.length).clamp(0.0, 1.0);
    let taper = stem.taper.max(0.0);

    let unit_taper = if taper <= 1.0 {
        taper
    } else if taper <= 2.0 {
        2.0 - taper
    } else {
        0.0
    };

    // Linear profile; every other regime is expressed relative to it.
    let taper_z = stem.base_radius * (1.0 - unit_taper * z);

    let radius = if taper <= 1.0 {
        taper_z
    } else {
        // Distance left to the tip, evaluated before anything depends on it.
        let to_tip = (1.0 - z) * stem.length;

        let (depth, chord) = if taper <= 2.0 {
            (1.0, to_tip)
        } else {
            let period = 2.0 * taper_z;
            let folded = if period > f32::EPSILON {
                (to_tip - period * (to_tip / period + 0.5).floor()).abs()
            } else {
                0.0
            };
            let depth = if to_tip < taper_z {
                1.0
            } else {
                (taper - 2.0).min(1.0)
            };
            (depth, folded)
        };

        if taper <= 2.0 && chord >= taper_z {
            taper_z
        } else {
            let offset = chord - taper_z;
            let cap = (taper_z * taper_z - offset * offset).max(0.0).sqrt();
            (1.0 - depth) * taper_z + depth * cap
        }
    };

    if stem.level == 0 && stem.flare != 0.0 {
        radius * flare_multiplier(z, stem.flare)
    } else {
        radius
    }
}

/// Exponential flare boost, 1.0 above [`FLARE_HEIGHT`].
pub fn flare_multiplier(z: f32, flare: f32) -> f32 {
    let y = (1.0 - z / FLARE_HEIGHT).max(0.0);
    flare * (100f32.powf(y) - 1.0) / 100.0 + 1.0
}
