//! Position + orientation frames used while growing stems.
//!
//! Every stem grows along its local +Z axis. The tree itself lives in Bevy's
//! Y-up world, so [`Pose::upright`] is the usual starting frame for a trunk.

use bevy::math::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// A frame at `position` whose local +Z points along world +Y.
    pub fn upright(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
        }
    }

    /// Transforms a point from this frame's local space into the parent space.
    pub fn apply(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Rotates a direction from local space into the parent space.
    pub fn apply_direction(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// `self ∘ other`: `other` expressed in this frame.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            position: self.apply(other.position),
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    /// Rotates the frame about one of its own axes.
    pub fn rotated_local(&self, axis: Vec3, angle: f32) -> Pose {
        if angle == 0.0 {
            return *self;
        }
        Pose {
            position: self.position,
            rotation: (self.rotation * Quat::from_axis_angle(axis, angle)).normalize(),
        }
    }

    /// Rotates the frame about a world-space axis passing through its origin.
    pub fn rotated_world(&self, axis: Vec3, angle: f32) -> Pose {
        if angle == 0.0 {
            return *self;
        }
        Pose {
            position: self.position,
            rotation: (Quat::from_axis_angle(axis, angle) * self.rotation).normalize(),
        }
    }

    /// Moves the origin along the local +Z axis.
    pub fn translated_z(&self, distance: f32) -> Pose {
        Pose {
            position: self.position + self.forward() * distance,
            rotation: self.rotation,
        }
    }

    /// Growth direction (local +Z) in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Local +Y in world space; the leaf surface normal for leaf poses.
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Local +X in world space.
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }
}
