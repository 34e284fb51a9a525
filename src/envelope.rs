//! Pruning envelope: an implicit volume the crown is trimmed to.
//!
//! The envelope is a solid of revolution around the trunk axis. Its radius
//! grows from the crown base to the peak with `power_low`, then shrinks to the
//! crown top with `power_high`.

use bevy::log::trace;
use bevy::math::Vec3;

use crate::params::PruneParameters;
use crate::pose::Pose;

/// Minimum fraction of its length a stem loses per pruning iteration.
pub const MIN_PRUNE_SHRINK: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Trunk frame; envelope height is measured along its +Z.
    pub origin: Pose,
    pub height: f32,
    pub base_size: f32,
    pub params: PruneParameters,
}

impl Envelope {
    pub fn new(origin: Pose, height: f32, base_size: f32, params: PruneParameters) -> Self {
        Self {
            origin,
            height,
            base_size,
            params,
        }
    }

    /// Whether a world-space point lies inside the envelope.
    pub fn contains(&self, world: Vec3) -> bool {
        if self.height <= f32::EPSILON {
            return true;
        }

        let local = self.origin.rotation.inverse() * (world - self.origin.position);
        let crown_height = (self.height * (1.0 - self.base_size)).max(f32::EPSILON);
        // 0 at the crown top, 1 at the crown base.
        let ratio = (self.height - local.z) / crown_height;
        if !(0.0..=1.0).contains(&ratio) {
            return false;
        }

        let peak = self.params.width_peak.clamp(f32::EPSILON, 1.0 - f32::EPSILON);
        let profile = if ratio < 1.0 - peak {
            (ratio / (1.0 - peak)).powf(self.params.power_high)
        } else {
            ((1.0 - ratio) / peak).powf(self.params.power_low)
        };

        let radial = Vec3::new(local.x, local.y, 0.0).length();
        radial / self.height < self.params.width * profile
    }
}

/// Shortens a stem until `first_outside(length)` reports no segment outside
/// the envelope, then blends the result with `original` by the prune ratio.
///
/// `first_outside` returns the index of the first segment whose endpoint
/// leaves the envelope for a stem of the given length. Each iteration removes
/// at least [`MIN_PRUNE_SHRINK`] of the length, so the loop terminates; once
/// the length falls below `min_length` the stem counts as fully pruned.
pub fn prune_length(
    original: f32,
    segments: usize,
    min_length: f32,
    ratio: f32,
    mut first_outside: impl FnMut(f32) -> Option<usize>,
) -> f32 {
    let segments = segments.max(1);
    let mut length = original;

    while let Some(failing) = first_outside(length) {
        let fitted = length * failing as f32 / segments as f32;
        let next = fitted.min(length * (1.0 - MIN_PRUNE_SHRINK));
        trace!(
            "pruning stem: {:.4} -> {:.4} (segment {} outside)",
            length, next, failing
        );
        length = next;
        if length < min_length {
            length = 0.0;
            break;
        }
    }

    original + (length - original) * ratio.clamp(0.0, 1.0)
}
