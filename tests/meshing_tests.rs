use bevy::prelude::*;
use bevy_arbor::descriptor::{GlobalDescriptor, LevelDescriptor};
use bevy_arbor::mesher::{BRANCH_SMOOTH_ANGLE, LEAF_SMOOTH_ANGLE};
use bevy_arbor::quantize::{self, f32_to_f16};
use bevy_arbor::{ShapeKind, SpeciesDescriptor, Tree, TreeGenerator, TreeMeshBuilder, decode};

// Helper to create a small, fully predictable species
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

fn trunk_only(taper: u8) -> SpeciesDescriptor {
    let mut species = simple_species();
    species.global.levels = 1;
    species.levels[0].taper = taper;
    species
}

fn grow(species: &SpeciesDescriptor) -> Tree {
    TreeGenerator::new(decode(species, 0)).generate_at(Vec3::ZERO)
}

#[test]
fn test_mesh_generation_basics() {
    let tree = grow(&simple_species());
    let output = TreeMeshBuilder::new()
        .with_ring_jitter(0.0)
        .build_branches(&tree);
    let mesh = &output.mesh;

    // Trunk: 5 rings of 24. Branches: 12 stems with 4 rings of 12.
    assert_eq!(mesh.vertices.len(), 5 * 24 + 12 * 4 * 12);
    // Trunk: 4 bands of 24 quads. Branches: 3 bands of 12 quads.
    assert_eq!(mesh.polygons.len(), 4 * 24 + 12 * 3 * 12);
    assert!(mesh.polygons.iter().all(|polygon| polygon.corners == 4));

    let count = mesh.vertices.len() as u32;
    for polygon in &mesh.polygons {
        for &index in polygon.corner_indices() {
            assert!(index < count, "Index {index} out of bounds");
        }
    }
    assert!(
        mesh.vertices.iter().all(|vertex| vertex.secondary.is_none()),
        "Branch vertices carry no attachment point"
    );
}

#[test]
fn test_empty_tree() {
    let mut species = simple_species();
    species.global.scale = f32_to_f16(0.0);
    let tree = grow(&species);

    let output = TreeMeshBuilder::default().build_branches(&tree);
    assert!(output.mesh.is_empty());
    assert!(output.mesh.vertices.is_empty());
    assert!(output.hierarchy.is_empty());
}

#[test]
fn test_smooth_group_angles() {
    let tree = grow(&simple_species());
    let builder = TreeMeshBuilder::default();

    assert_eq!(builder.build_branches(&tree).mesh.smooth_group_angle, BRANCH_SMOOTH_ANGLE);
    assert_eq!(builder.build_leaves(&tree).mesh.smooth_group_angle, LEAF_SMOOTH_ANGLE);
    assert_eq!(BRANCH_SMOOTH_ANGLE, 0.5);
    assert_eq!(LEAF_SMOOTH_ANGLE, 60.0);
}

#[test]
fn test_rounded_tip_closes_with_a_fan() {
    // Taper 1.5: the last segment gets ten samples and ends in a point.
    let tree = grow(&trunk_only(128));
    let trunk = tree.stem(tree.roots[0]);
    assert_eq!(trunk.segments[0].samples.len(), 2);
    assert_eq!(trunk.segments[3].samples.len(), 10);

    let mesh = TreeMeshBuilder::new()
        .with_ring_jitter(0.0)
        .build_branches(&tree)
        .mesh;

    // 2 + 1 + 1 + 9 full rings and one tip vertex.
    assert_eq!(mesh.vertices.len(), 13 * 24 + 1);
    let triangles = mesh.polygons.iter().filter(|p| p.corners == 3).count();
    let quads = mesh.polygons.iter().filter(|p| p.corners == 4).count();
    assert_eq!(triangles, 24, "One fan triangle per ring vertex");
    assert_eq!(quads, 12 * 24);

    let tip = (mesh.vertices.len() - 1) as u32;
    for polygon in mesh.polygons.iter().filter(|p| p.corners == 3) {
        assert!(polygon.corner_indices().contains(&tip));
    }
}

#[test]
fn test_flared_trunk_sampling() {
    let mut species = trunk_only(quantize::to_taper(0.5));
    species.global.flare = quantize::to_flare(1.0);
    let tree = grow(&species);
    let trunk = tree.stem(tree.roots[0]);

    // Start sample plus ten samples crowding towards the ground.
    let samples = &trunk.segments[0].samples;
    assert_eq!(samples.len(), 11);
    for pair in samples.windows(2) {
        assert!(pair[1].distance > pair[0].distance);
        assert!(pair[1].radius <= pair[0].radius, "Flare narrows with height");
    }
    assert!(samples[0].radius > 1.5 * samples[10].radius);

    // Later segments only need their end point.
    assert_eq!(trunk.segments[1].samples.len(), 1);
}

#[test]
fn test_periodic_taper_sampling() {
    let tree = grow(&trunk_only(200));
    let trunk = tree.stem(tree.roots[0]);

    let total: usize = trunk.segments.iter().map(|s| s.samples.len()).sum();
    assert_eq!(total, 1 + 4 * 10);
}

#[test]
fn test_lobed_trunk_rings() {
    let mut species = trunk_only(0);
    species.global.lobes = 4;
    species.global.lobe_depth = quantize::to_unit(0.2);
    let tree = grow(&species);

    let mesh = TreeMeshBuilder::new()
        .with_ring_jitter(0.0)
        .build_branches(&tree)
        .mesh;
    let distances: Vec<f32> = mesh.vertices[..24]
        .iter()
        .map(|vertex| vertex.position.length())
        .collect();
    let max = distances.iter().copied().fold(f32::MIN, f32::max);
    let min = distances.iter().copied().fold(f32::MAX, f32::min);

    // Radius 0.5 modulated by roughly ±20%.
    assert!((max - 0.6).abs() < 0.01, "Lobe crest at {max}");
    assert!((min - 0.4).abs() < 0.01, "Lobe trough at {min}");
}

#[test]
fn test_leaf_cards() {
    let mut species = simple_species();
    species.global.leaves = quantize::to_eighths(2.0);
    let tree = grow(&species);

    let output = TreeMeshBuilder::default().build_leaves(&tree);
    let mesh = &output.mesh;
    assert_eq!(mesh.polygons.len(), 72);
    assert_eq!(mesh.vertices.len(), 72 * 4);

    for polygon in &mesh.polygons {
        assert_eq!(polygon.corners, 4);
        assert_eq!(polygon.uvs[0][0], Vec2::ZERO);
        assert_eq!(polygon.uvs[0][2], Vec2::ONE);

        let direction = Vec3::new(polygon.uvs[2][0].x, polygon.uvs[2][0].y, polygon.uvs[3][0].x);
        assert!(
            (direction.length() - 1.0).abs() < 1e-4,
            "Leaf direction must be a unit vector"
        );
    }

    for vertex in &mesh.vertices {
        let attach = vertex.secondary.expect("Leaf vertices carry their attachment point");
        let reach = vertex.position.distance(attach);
        assert!(reach > 0.0 && reach < 1.0, "Leaf corner {reach} from its stem");
    }
}
