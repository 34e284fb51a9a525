use std::collections::HashSet;

use bevy::prelude::*;
use bevy_arbor::descriptor::{GlobalDescriptor, LevelDescriptor};
use bevy_arbor::quantize::{self, f32_to_f16};
use bevy_arbor::{
    ShapeKind, SpeciesDescriptor, StemId, Tree, TreeGenerator, TreeParameters, decode,
};

/// A ten unit trunk with four segments and three straight branches per
/// segment. Every count in it is integral, so no diffusion error builds up.
fn simple_species() -> SpeciesDescriptor {
    let mut levels = [LevelDescriptor::default(); 4];
    levels[0] = LevelDescriptor {
        segments: 4,
        taper: quantize::to_taper(0.7),
        length: f32_to_f16(10.0),
        ..LevelDescriptor::default()
    };
    levels[1] = LevelDescriptor {
        branches: quantize::to_eighths(3.0),
        segments: 3,
        down_angle: quantize::to_centidegrees(45f32.to_radians()),
        rotate: quantize::to_centidegrees(140f32.to_radians()),
        taper: quantize::to_taper(1.0),
        length: f32_to_f16(0.5),
        ..LevelDescriptor::default()
    };

    SpeciesDescriptor {
        levels,
        global: GlobalDescriptor {
            shape: ShapeKind::Cylindrical.to_byte(),
            levels: 2,
            trunks: 1,
            scale: f32_to_f16(1.0),
            ratio: quantize::to_ratio(0.05),
            ratio_power: quantize::to_thirty_seconds(1.0),
            attraction_up: quantize::to_attraction(0.0),
            leaf_scale: f32_to_f16(0.2),
            leaf_scale_x: quantize::to_sixty_fourths(0.5),
            smoothness: quantize::to_unit(1.0),
            ..GlobalDescriptor::default()
        },
    }
}

fn grow(species: &SpeciesDescriptor, seed: u8) -> Tree {
    TreeGenerator::new(decode(species, seed)).generate_at(Vec3::ZERO)
}

#[test]
fn test_simple_tree_structure() {
    let tree = grow(&simple_species(), 0);

    assert_eq!(tree.roots.len(), 1);
    let trunk = tree.stem(tree.roots[0]);
    assert_eq!(trunk.level, 0);
    assert!((trunk.length - 10.0).abs() < 1e-4);
    assert!((trunk.base_radius - 0.5).abs() < 1e-3);
    assert_eq!(trunk.segments.len(), 4);
    assert!(trunk.clones.is_empty());

    // 3 branches on each of 4 segments.
    assert_eq!(trunk.substems.len(), 12);
    assert_eq!(tree.stem_count(), 13);
    assert_eq!(tree.leaf_count(), 0);

    for &id in &trunk.substems {
        let branch = tree.stem(id);
        assert_eq!(branch.level, 1);
        assert_eq!(branch.parent, Some(tree.roots[0]));
        assert!((branch.length - 5.0).abs() < 1e-3, "Cylindrical shape keeps full length");
        assert_eq!(branch.segments.len(), 3);
        assert!(branch.substems.is_empty(), "Max level grows no substems");
    }
}

#[test]
fn test_trunk_grows_up_from_its_root() {
    let position = Vec3::new(3.0, -1.0, 7.0);
    let tree = TreeGenerator::new(decode(&simple_species(), 0)).generate_at(position);
    let trunk = tree.stem(tree.roots[0]);

    assert_eq!(trunk.pose.position, position);
    let tip = trunk.segments.last().expect("Trunk has segments");
    let end = tip.samples.last().expect("Segment has samples").position;
    assert!(
        end.abs_diff_eq(position + Vec3::Y * 10.0, 1e-3),
        "Straight trunk should end ten units above its root, got {end:?}"
    );
}

#[test]
fn test_generation_is_deterministic() {
    let species = SpeciesDescriptor::oak();
    let a = grow(&species, 7);
    let b = grow(&species, 7);

    assert_eq!(a.stems, b.stems, "Same seed must grow the same tree");
    assert_eq!(a.roots, b.roots);

    let c = grow(&species, 8);
    assert_ne!(a.stems, c.stems, "Different seeds should differ");
}

#[test]
fn test_presets_grow_full_trees() {
    for species in [
        SpeciesDescriptor::oak(),
        SpeciesDescriptor::conifer(),
        SpeciesDescriptor::weeping(),
    ] {
        let tree = grow(&species, 1);
        assert!(tree.stem_count() > 10, "Preset grew only {} stems", tree.stem_count());
        assert!(tree.leaf_count() > 0, "Presets carry leaves");
    }
}

#[test]
fn test_child_radius_never_exceeds_parent() {
    let tree = grow(&SpeciesDescriptor::oak(), 3);

    for (index, stem) in tree.stems.iter().enumerate() {
        let Some(parent) = stem.parent else {
            continue;
        };
        let limit = tree.radius_at(parent, stem.attach_offset);
        assert!(
            stem.base_radius <= limit + 1e-5,
            "Stem {index} has radius {} above its parent's {limit}",
            stem.base_radius
        );
    }
}

#[test]
fn test_split_clones_respect_parent_radius() {
    let mut species = simple_species();
    species.levels[1].seg_splits = quantize::to_hundredths(1.0);
    species.levels[1].split_angle = quantize::to_half_turn(20f32.to_radians());
    species.levels[1].taper = quantize::to_taper(0.9);
    species.levels[1].length = f32_to_f16(0.8);

    let tree = grow(&species, 0);
    let mut checked = 0;
    for id in tree.iter_depth_first() {
        let stem = tree.stem(id);
        let Some(source) = stem.clone_source else {
            continue;
        };
        let source = tree.stem(source);
        assert_eq!(stem.parent, source.parent, "Clones share their source's parent");
        assert_eq!(stem.attach_offset, source.attach_offset);

        let parent = stem.parent.expect("Branch clones hang off the trunk");
        let limit = tree.radius_at(parent, stem.attach_offset);
        assert!(
            stem.base_radius <= limit + 1e-5,
            "Clone radius {} exceeds parent radius {limit}",
            stem.base_radius
        );
        checked += 1;
    }
    assert!(checked > 0, "Expected some branch clones");
}

#[test]
fn test_depth_first_order() {
    let tree = grow(&SpeciesDescriptor::oak(), 5);
    let order: Vec<StemId> = tree.iter_depth_first().collect();

    assert_eq!(order.len(), tree.stem_count());
    let unique: HashSet<StemId> = order.iter().copied().collect();
    assert_eq!(unique.len(), order.len(), "Each stem is visited once");

    let mut seen = HashSet::new();
    for id in order {
        if let Some(parent) = tree.stem(id).parent {
            assert!(seen.contains(&parent), "Parent must precede {id:?}");
        }
        seen.insert(id);
    }
}

#[test]
fn test_splits_create_clones() {
    let mut species = simple_species();
    species.global.levels = 1;
    species.levels[0].seg_splits = quantize::to_hundredths(1.0);
    species.levels[0].split_angle = quantize::to_half_turn(20f32.to_radians());

    let tree = grow(&species, 0);

    // One split at the end of every segment but the last doubles each
    // remaining chain: 1 + 4 + 2 + 1.
    assert_eq!(tree.stem_count(), 8);
    assert_eq!(tree.roots.len(), 1);

    let root = tree.roots[0];
    for id in tree.iter_depth_first() {
        let stem = tree.stem(id);
        if id == root {
            assert!(!stem.is_clone());
            continue;
        }
        assert!(stem.is_clone());
        assert_eq!(stem.parent, None, "Trunk clones are roots' siblings");
        assert_eq!(tree.uv_source(id), root);
        assert!(stem.first_segment > 0);
        assert_eq!(stem.segments[0].index, stem.first_segment);
        assert_eq!(stem.segments.len(), stem.segment_count - stem.first_segment);
    }
}

#[test]
fn test_base_splits_only_on_the_trunk_base() {
    let mut species = simple_species();
    species.global.levels = 1;
    species.global.base_splits = 2;

    let tree = grow(&species, 0);
    let trunk = tree.stem(tree.roots[0]);
    assert_eq!(trunk.clones.len(), 2);
    for &clone in &trunk.clones {
        assert_eq!(tree.stem(clone).first_segment, 1);
        assert!(tree.stem(clone).clones.is_empty(), "Clones never base split");
    }
}

#[test]
fn test_multiple_trunks() {
    let mut species = simple_species();
    species.global.trunks = 3;
    species.levels[0].down_angle = quantize::to_centidegrees(15f32.to_radians());

    let tree = grow(&species, 0);
    assert_eq!(tree.roots.len(), 3);

    let headings: Vec<Vec3> = tree
        .roots
        .iter()
        .map(|&id| tree.stem(id).pose.forward())
        .collect();
    for heading in &headings {
        let tilt = heading.angle_between(Vec3::Y).to_degrees();
        assert!((tilt - 15.0).abs() < 0.1, "Trunk tilt was {tilt}");
    }
    assert!(!headings[0].abs_diff_eq(headings[1], 1e-3), "Trunks fan out");
}

#[test]
fn test_degenerate_trees_are_empty() {
    let mut species = simple_species();
    species.global.scale = f32_to_f16(0.0);
    let tree = grow(&species, 0);
    assert_eq!(tree.stem_count(), 0);
    assert!(tree.roots.is_empty());

    let mut species = simple_species();
    species.global.ratio = 0;
    assert_eq!(grow(&species, 0).stem_count(), 0, "Zero radius drops the trunk");

    let mut species = simple_species();
    species.levels[0].length = 0x7C00;
    assert_eq!(grow(&species, 0).stem_count(), 0, "Infinite length decodes to zero");
}

#[test]
fn test_leaves_on_max_level() {
    let mut species = simple_species();
    species.global.leaves = quantize::to_eighths(2.0);

    let tree = grow(&species, 0);
    // 12 branches, 3 segments each, 2 leaves per segment.
    assert_eq!(tree.leaf_count(), 72);
    assert!(tree.stem(tree.roots[0]).leaves.is_empty(), "Trunk is not max level");

    for stem in &tree.stems {
        for leaf in &stem.leaves {
            let pose = leaf.bent_pose();
            assert!(pose.position.is_finite());
            assert!((pose.rotation.length() - 1.0).abs() < 1e-4);
        }
    }
}

#[test]
fn test_parameters_can_be_built_directly() {
    let mut params = TreeParameters::default();
    params.levels = 1;
    params.leaves.per_segment = 0.0;
    params.level[0].seg_splits = 0.0;

    let tree = TreeGenerator::new(params).generate_at(Vec3::ZERO);
    assert_eq!(tree.stem_count(), 1);
    assert_eq!(tree.leaf_count(), 0);
}

#[test]
fn test_foreign_stem_ids_are_rejected() {
    let tree = grow(&simple_species(), 0);
    let mut species = simple_species();
    species.global.scale = f32_to_f16(0.0);
    let empty = grow(&species, 0);

    let last = tree.iter_depth_first().last().expect("Tree has stems");
    assert_eq!(last.index(), tree.stem_count() - 1);
    assert!(tree.get(last).is_some());
    assert!(empty.get(last).is_none(), "An empty tree holds no stems");
}
