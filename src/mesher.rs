use std::f32::consts::TAU;

use bevy::log::debug;
use bevy::math::{Quat, Vec2, Vec3};

use crate::descriptor::LEVELS;
use crate::mesh::{BranchRecord, Polygon, TreeMesh};
use crate::structure::{Stem, StemId, Tree};

/// Seed both emission passes start from.
pub const DENSITY_SEED: u32 = 1;
/// Smoothing threshold (degrees) reported for branch geometry: hard edges
/// between segments.
pub const BRANCH_SMOOTH_ANGLE: f32 = 0.5;
/// Smoothing threshold (degrees) reported for leaf geometry.
pub const LEAF_SMOOTH_ANGLE: f32 = 60.0;
/// Radius scale of the first segment of a split clone.
pub const CLONE_JUNCTION_SCALE: f32 = 0.9;
/// Radii at or below this collapse a ring into a single tip vertex.
const TIP_RADIUS: f32 = 1e-6;

/// The 15-bit linear congruential generator driving LOD culling.
///
/// It is a plain value: the emitter copies it to save and restore the
/// sequence around substems and clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityRng {
    state: u32,
}

impl DensityRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_value(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(214_013).wrapping_add(2_531_011);
        (self.state >> 16) & 0x7fff
    }

    /// Uniform value in `[0, 1]`.
    pub fn next_unit(&mut self) -> f32 {
        self.next_value() as f32 / 32767.0
    }

    /// Consumes one value and decides whether a stem survives `density`.
    /// 255 keeps everything, 0 drops everything.
    pub fn admits(&mut self, density: u8) -> bool {
        let roll = self.next_value() % 255;
        density != 0 && roll <= density as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionPass {
    Branches,
    Leaves,
}

/// Result of one emission pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeMeshOutput {
    pub mesh: TreeMesh,
    /// One record per visited stem, in depth-first visitation order.
    pub hierarchy: Vec<BranchRecord>,
}

/// Emits renderable geometry for a generated [`Tree`].
///
/// Branch and leaf geometry are emitted by separate passes. Both passes walk
/// the tree identically and reseed the culling generator, so with the same
/// density array they keep exactly the same stems.
pub struct TreeMeshBuilder {
    density: [u8; LEVELS],
    ring_jitter: f32,
}

impl Default for TreeMeshBuilder {
    fn default() -> Self {
        Self {
            density: [255; LEVELS],
            ring_jitter: 0.02,
        }
    }
}

impl TreeMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-level inclusion density, 0 (nothing) to 255 (everything).
    /// Trunks are always kept.
    pub fn with_density(mut self, density: [u8; LEVELS]) -> Self {
        self.density = density;
        self
    }

    /// Relative random radius variation per ring, clamped to `[0, 0.5]`.
    pub fn with_ring_jitter(mut self, jitter: f32) -> Self {
        self.ring_jitter = jitter.clamp(0.0, 0.5);
        self
    }

    pub fn build_branches(&self, tree: &Tree) -> TreeMeshOutput {
        self.build(tree, EmissionPass::Branches)
    }

    pub fn build_leaves(&self, tree: &Tree) -> TreeMeshOutput {
        self.build(tree, EmissionPass::Leaves)
    }

    pub fn build(&self, tree: &Tree, pass: EmissionPass) -> TreeMeshOutput {
        let mut emitter = Emitter {
            tree,
            pass,
            density: self.density,
            ring_jitter: self.ring_jitter,
            mesh: TreeMesh::default(),
            hierarchy: Vec::new(),
            record_of: vec![None; tree.stem_count()],
        };

        let mut rng = DensityRng::new(DENSITY_SEED);
        for &root in &tree.roots {
            emitter.visit(root, &mut rng);
        }

        let mut mesh = emitter.mesh;
        mesh.smooth_group_angle = match pass {
            EmissionPass::Branches => BRANCH_SMOOTH_ANGLE,
            EmissionPass::Leaves => LEAF_SMOOTH_ANGLE,
        };
        debug!(
            "emitted {:?}: {} vertices, {} polygons, {} stems visited",
            pass,
            mesh.vertices.len(),
            mesh.polygons.len(),
            emitter.hierarchy.len()
        );

        TreeMeshOutput {
            mesh,
            hierarchy: emitter.hierarchy,
        }
    }
}

/// Texture repeat count around a stem of this radius.
pub fn circumference_uv_scale(radius: f32) -> f32 {
    (TAU * radius).round().max(1.0)
}

/// Vertex index of corner `i` and its wrapping neighbour on a ring.
fn ring_pair(i: usize, points: usize) -> (u32, u32) {
    (i as u32, ((i + 1) % points) as u32)
}

#[derive(Debug, Clone, Copy)]
enum Ring {
    Full { start: u32, v: f32 },
    Tip { vertex: u32, v: f32 },
}

struct Emitter<'a> {
    tree: &'a Tree,
    pass: EmissionPass,
    density: [u8; LEVELS],
    ring_jitter: f32,
    mesh: TreeMesh,
    hierarchy: Vec<BranchRecord>,
    record_of: Vec<Option<i32>>,
}

impl Emitter<'_> {
    fn visit(&mut self, id: StemId, rng: &mut DensityRng) {
        let tree = self.tree;
        let stem = tree.stem(id);

        let parent = stem
            .parent
            .and_then(|parent| self.record_of[parent.0])
            .unwrap_or(-1);
        self.record_of[id.0] = Some(self.hierarchy.len() as i32);
        self.hierarchy.push(BranchRecord {
            rotation: stem.pose.rotation,
            position: stem.pose.position,
            parent,
        });

        let saved = *rng;
        for &child in &stem.substems {
            if rng.admits(self.density[tree.stem(child).level]) {
                self.visit(child, rng);
            }
        }
        *rng = saved;
        for &clone in &stem.clones {
            if rng.admits(self.density[tree.stem(clone).level]) {
                self.visit(clone, rng);
            }
        }

        // Drawn in both passes so the sequence stays aligned between them.
        let ring_scales = self.ring_scales(stem, rng);
        match self.pass {
            EmissionPass::Branches => self.emit_stem(id, stem, &ring_scales),
            EmissionPass::Leaves => self.emit_leaves(stem),
        }
    }

    fn ring_scales(&self, stem: &Stem, rng: &mut DensityRng) -> Vec<f32> {
        stem.segments
            .iter()
            .flat_map(|segment| segment.samples.iter())
            .map(|_| 1.0 + self.ring_jitter * (rng.next_unit() * 2.0 - 1.0))
            .collect()
    }

    fn emit_stem(&mut self, id: StemId, stem: &Stem, ring_scales: &[f32]) {
        let tree = self.tree;
        let params = &tree.params;
        let points = params.level[stem.level].mesh_points.max(3);
        // Clones share the texture scale of the stem they split from.
        let uv_scale = circumference_uv_scale(tree.stem(tree.uv_source(id)).base_radius);
        let (lobes, lobe_depth) = if stem.level == 0 {
            (params.lobes, params.lobe_depth)
        } else {
            (0, 0.0)
        };

        let mut scales = ring_scales.iter();
        let mut previous: Option<Ring> = None;
        for segment in &stem.segments {
            let junction = stem.is_clone() && segment.index == stem.first_segment;
            let segment_start = segment.index as f32 * segment.length;

            for sample in &segment.samples {
                let mut radius = sample.radius * scales.next().copied().unwrap_or(1.0);
                if junction {
                    radius *= CLONE_JUNCTION_SCALE;
                }
                let v = segment_start + sample.distance;

                let ring = if radius <= TIP_RADIUS {
                    Ring::Tip {
                        vertex: self.mesh.add_vertex(sample.position, None),
                        v,
                    }
                } else {
                    let start = self.add_ring(
                        sample.position,
                        segment.pose.rotation,
                        radius,
                        points,
                        lobes,
                        lobe_depth,
                    );
                    Ring::Full { start, v }
                };

                if let Some(previous) = previous {
                    self.connect_rings(previous, ring, points, uv_scale);
                }
                previous = Some(ring);
            }
        }
    }

    fn add_ring(
        &mut self,
        center: Vec3,
        rotation: Quat,
        radius: f32,
        points: usize,
        lobes: u32,
        lobe_depth: f32,
    ) -> u32 {
        let start = self.mesh.vertices.len() as u32;
        for i in 0..points {
            let theta = i as f32 / points as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            let lobed = if lobes > 0 {
                radius * (1.0 + lobe_depth * (lobes as f32 * theta).cos())
            } else {
                radius
            };
            let local = Vec3::new(cos * lobed, sin * lobed, 0.0);
            self.mesh.add_vertex(center + rotation * local, None);
        }
        start
    }

    fn connect_rings(&mut self, bottom: Ring, top: Ring, points: usize, uv_scale: f32) {
        let u = |i: usize| i as f32 / points as f32 * uv_scale;

        match (bottom, top) {
            (Ring::Full { start: a, v: va }, Ring::Full { start: b, v: vb }) => {
                for i in 0..points {
                    let (current, next) = ring_pair(i, points);
                    self.mesh.add_polygon(Polygon::quad(
                        [a + current, a + next, b + next, b + current],
                        [
                            Vec2::new(u(i), va),
                            Vec2::new(u(i + 1), va),
                            Vec2::new(u(i + 1), vb),
                            Vec2::new(u(i), vb),
                        ],
                    ));
                }
            }
            (Ring::Full { start: a, v: va }, Ring::Tip { vertex, v: vb }) => {
                for i in 0..points {
                    let (current, next) = ring_pair(i, points);
                    self.mesh.add_polygon(Polygon::triangle(
                        [a + current, a + next, vertex],
                        [
                            Vec2::new(u(i), va),
                            Vec2::new(u(i + 1), va),
                            Vec2::new((u(i) + u(i + 1)) * 0.5, vb),
                        ],
                    ));
                }
            }
            (Ring::Tip { vertex, v: va }, Ring::Full { start: b, v: vb }) => {
                for i in 0..points {
                    let (current, next) = ring_pair(i, points);
                    self.mesh.add_polygon(Polygon::triangle(
                        [vertex, b + next, b + current],
                        [
                            Vec2::new((u(i) + u(i + 1)) * 0.5, va),
                            Vec2::new(u(i + 1), vb),
                            Vec2::new(u(i), vb),
                        ],
                    ));
                }
            }
            (Ring::Tip { .. }, Ring::Tip { .. }) => {}
        }
    }

    fn emit_leaves(&mut self, stem: &Stem) {
        let leaves = self.tree.params.leaves;
        let height = leaves.scale;
        let half_width = 0.5 * leaves.scale * leaves.scale_x;
        let base = leaves.stem_length;
        // Counter-clockwise seen from the leaf's +Y side.
        let template = [
            Vec3::new(half_width, 0.0, base),
            Vec3::new(-half_width, 0.0, base),
            Vec3::new(-half_width, 0.0, base + height),
            Vec3::new(half_width, 0.0, base + height),
        ];
        let corner_uvs = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];

        for leaf in &stem.leaves {
            let pose = leaf.bent_pose();
            let attach = pose.position;
            let indices =
                template.map(|corner| self.mesh.add_vertex(pose.apply(corner), Some(attach)));

            let forward = pose.forward();
            let mut polygon = Polygon::quad(indices, corner_uvs);
            polygon.uvs[2] = [Vec2::new(forward.x, forward.y); 4];
            polygon.uvs[3] = [Vec2::new(forward.z, 0.0); 4];
            self.mesh.add_polygon(polygon);
        }
    }
}
