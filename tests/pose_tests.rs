use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use bevy_arbor::Pose;

fn assert_vec_close(actual: Vec3, expected: Vec3, what: &str) {
    assert!(
        actual.abs_diff_eq(expected, 1e-5),
        "{what}: expected {expected:?}, got {actual:?}"
    );
}

#[test]
fn test_upright_grows_along_world_up() {
    let pose = Pose::upright(Vec3::new(1.0, 2.0, 3.0));
    assert_vec_close(pose.forward(), Vec3::Y, "forward");
    assert_vec_close(pose.translated_z(2.0).position, Vec3::new(1.0, 4.0, 3.0), "tip");
}

#[test]
fn test_local_rotation_bends_forward() {
    let pose = Pose::IDENTITY.rotated_local(Vec3::X, FRAC_PI_2);
    assert_vec_close(pose.forward(), Vec3::NEG_Y, "bent forward");
    assert_vec_close(pose.right(), Vec3::X, "axis is unchanged");
}

#[test]
fn test_local_and_world_rotation_differ() {
    let upright = Pose::upright(Vec3::ZERO);

    // About its own Z (world Y) the heading does not change.
    let spun = upright.rotated_local(Vec3::Z, 1.0);
    assert_vec_close(spun.forward(), Vec3::Y, "spin about own axis");

    // About world Z the heading tips over.
    let tipped = upright.rotated_world(Vec3::Z, FRAC_PI_2);
    assert_vec_close(tipped.forward(), Vec3::NEG_X, "tip about world Z");
}

#[test]
fn test_zero_rotation_is_exact() {
    let pose = Pose::new(Vec3::ONE, Quat::from_rotation_y(0.3));
    assert_eq!(pose.rotated_local(Vec3::X, 0.0), pose);
    assert_eq!(pose.rotated_world(Vec3::X, 0.0), pose);
}

#[test]
fn test_compose_and_apply() {
    let parent = Pose::new(Vec3::new(0.0, 5.0, 0.0), Quat::from_rotation_z(FRAC_PI_2));
    let child = Pose::new(Vec3::X, Quat::IDENTITY);

    let world = parent.compose(&child);
    assert_vec_close(world.position, Vec3::new(0.0, 6.0, 0.0), "composed position");
    assert_vec_close(parent.apply(Vec3::X), world.position, "apply matches compose");
    assert_vec_close(parent.apply_direction(Vec3::X), Vec3::Y, "direction");

    assert_eq!(Pose::default(), Pose::IDENTITY);
}
