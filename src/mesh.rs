//! Output geometry of the emitter and its conversion to a Bevy [`Mesh`].
//!
//! [`TreeMesh`] stores polygons with per-corner UVs so that seams (the ring
//! wrap, leaf corners) never need duplicated vertices. The renderer-facing
//! [`TreeMesh::to_bevy_mesh`] unwelds it into a plain triangle list.

use bevy::asset::RenderAssetUsages;
use bevy::math::{Quat, Vec2, Vec3};
use bevy::mesh::{MeshVertexAttribute, PrimitiveTopology};
use bevy::prelude::Mesh;
use bevy::render::render_resource::VertexFormat;

/// UV channels carried per polygon corner.
pub const UV_CHANNELS: usize = 4;

/// Third UV channel; leaves store the blade direction's x/y here.
pub const ATTRIBUTE_UV_2: MeshVertexAttribute =
    MeshVertexAttribute::new("Vertex_Uv_2", 0x7a5e_0002, VertexFormat::Float32x2);
/// Fourth UV channel; leaves store the blade direction's z here.
pub const ATTRIBUTE_UV_3: MeshVertexAttribute =
    MeshVertexAttribute::new("Vertex_Uv_3", 0x7a5e_0003, VertexFormat::Float32x2);
/// Secondary position: the attachment point of a leaf.
pub const ATTRIBUTE_ATTACH_POINT: MeshVertexAttribute =
    MeshVertexAttribute::new("Vertex_AttachPoint", 0x7a5e_0004, VertexFormat::Float32x3);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub secondary: Option<Vec3>,
}

/// A triangle or quad. Unused trailing slots of `indices`/`uvs` are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polygon {
    pub indices: [u32; 4],
    /// 3 or 4.
    pub corners: u8,
    /// `uvs[channel][corner]`.
    pub uvs: [[Vec2; 4]; UV_CHANNELS],
}

impl Polygon {
    pub fn triangle(indices: [u32; 3], uv: [Vec2; 3]) -> Self {
        let mut uvs = [[Vec2::ZERO; 4]; UV_CHANNELS];
        uvs[0] = [uv[0], uv[1], uv[2], Vec2::ZERO];
        Self {
            indices: [indices[0], indices[1], indices[2], 0],
            corners: 3,
            uvs,
        }
    }

    pub fn quad(indices: [u32; 4], uv: [Vec2; 4]) -> Self {
        let mut uvs = [[Vec2::ZERO; 4]; UV_CHANNELS];
        uvs[0] = uv;
        Self {
            indices,
            corners: 4,
            uvs,
        }
    }

    pub fn corner_indices(&self) -> &[u32] {
        &self.indices[..self.corners as usize]
    }
}

/// Append-only geometry buffer produced by one emission pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeMesh {
    pub vertices: Vec<Vertex>,
    pub polygons: Vec<Polygon>,
    /// Smoothing threshold in degrees for the renderer's normal calculation.
    pub smooth_group_angle: f32,
}

impl TreeMesh {
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn add_vertex(&mut self, position: Vec3, secondary: Option<Vec3>) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(Vertex {
            position,
            secondary,
        });
        index
    }

    pub fn add_polygon(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    /// Unwelded triangle list with positions, UV channels 0–3 and the
    /// attachment point. Normals are left to the renderer.
    pub fn to_bevy_mesh(&self) -> Mesh {
        let triangles = self
            .polygons
            .iter()
            .map(|polygon| polygon.corners as usize - 2)
            .sum::<usize>();
        let capacity = triangles * 3;

        let mut positions: Vec<[f32; 3]> = Vec::with_capacity(capacity);
        let mut attach: Vec<[f32; 3]> = Vec::with_capacity(capacity);
        let mut channels: [Vec<[f32; 2]>; UV_CHANNELS] =
            std::array::from_fn(|_| Vec::with_capacity(capacity));

        for polygon in &self.polygons {
            let fan: &[[usize; 3]] = if polygon.corners == 4 {
                &[[0, 1, 2], [0, 2, 3]]
            } else {
                &[[0, 1, 2]]
            };
            for triangle in fan {
                for &corner in triangle {
                    let vertex = &self.vertices[polygon.indices[corner] as usize];
                    positions.push(vertex.position.to_array());
                    attach.push(vertex.secondary.unwrap_or(vertex.position).to_array());
                    for (channel, uvs) in channels.iter_mut().enumerate() {
                        uvs.push(polygon.uvs[channel][corner].to_array());
                    }
                }
            }
        }

        let [uv0, uv1, uv2, uv3] = channels;
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uv0);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_1, uv1);
        mesh.insert_attribute(ATTRIBUTE_UV_2, uv2);
        mesh.insert_attribute(ATTRIBUTE_UV_3, uv3);
        mesh.insert_attribute(ATTRIBUTE_ATTACH_POINT, attach);
        mesh
    }
}

/// Hierarchy metadata for one visited stem, for external animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchRecord {
    pub rotation: Quat,
    pub position: Vec3,
    /// Index of the parent record, `-1` for trunks.
    pub parent: i32,
}
