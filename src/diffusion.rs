//! Error diffusion: turns a fractional "count per segment" into whole counts
//! whose running mean tracks the fraction.

/// Accumulated rounding error for one counting purpose.
///
/// Each stem carries independent diffusers for substems, splits and leaves,
/// see [`StemCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErrorDiffuser {
    pub error: f32,
}

impl ErrorDiffuser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next whole count for a fractional `target`.
    ///
    /// Negative (or NaN) targets are clamped to zero before diffusion, so the
    /// returned count is never negative and the error stays bounded.
    pub fn next_count(&mut self, target: f32) -> usize {
        let target = if target > 0.0 { target } else { 0.0 };
        let effective = (target + self.error).round().max(0.0);
        self.error -= effective - target;
        effective as usize
    }
}

/// Per-stem diffusion state, one accumulator per purpose.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StemCounters {
    pub substems: ErrorDiffuser,
    pub splits: ErrorDiffuser,
    pub leaves: ErrorDiffuser,
}
