//! Parametric tree generation and LOD-aware mesh emission for Bevy.
//!
//! This crate grows botanical tree structures from a compact, quantized
//! [`SpeciesDescriptor`] and turns them into renderable geometry plus
//! hierarchy metadata for animation.
//!
//! # Pipeline
//!
//! 1. **Decode**: [`decode`] converts a [`SpeciesDescriptor`] and a seed into
//!    floating point [`TreeParameters`].
//! 2. **Grow**: [`TreeGenerator`] recursively builds an immutable [`Tree`]:
//!    trunks, branches, split clones and leaves, with shape and taper
//!    functions, error-diffused branch counts and optional envelope pruning.
//! 3. **Emit**: [`TreeMeshBuilder`] walks the tree twice, once for branch
//!    geometry and once for leaves, culling stems per level with a
//!    deterministic generator so both passes keep the same stems.
//!
//! Growth is fully reproducible: the same descriptor, seed and density array
//! always produce identical meshes and [`BranchRecord`]s.
//!
//! # Feature Flags
//!
//! - `serde`: derives `Serialize`/`Deserialize` for descriptors and decoded
//!   parameters.
//!
//! # Example
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_arbor::{SpeciesDescriptor, TreeGenerator, TreeMeshBuilder, decode};
//!
//! fn spawn_tree(
//!     mut commands: Commands,
//!     mut meshes: ResMut<Assets<Mesh>>,
//!     mut materials: ResMut<Assets<StandardMaterial>>,
//! ) {
//!     let params = decode(&SpeciesDescriptor::oak(), 7);
//!     let tree = TreeGenerator::new(params).generate_at(Vec3::ZERO);
//!
//!     let builder = TreeMeshBuilder::new().with_density([255, 255, 200, 160]);
//!     let branches = builder.build_branches(&tree);
//!     let leaves = builder.build_leaves(&tree);
//!
//!     let bark = materials.add(Color::srgb(0.35, 0.25, 0.2));
//!     let foliage = materials.add(Color::srgb(0.2, 0.55, 0.2));
//!     commands.spawn((
//!         Mesh3d(meshes.add(branches.mesh.to_bevy_mesh())),
//!         MeshMaterial3d(bark),
//!     ));
//!     commands.spawn((
//!         Mesh3d(meshes.add(leaves.mesh.to_bevy_mesh())),
//!         MeshMaterial3d(foliage),
//!     ));
//! }
//! ```

pub mod descriptor;
pub mod diffusion;
pub mod envelope;
pub mod generator;
pub mod mesh;
pub mod mesher;
pub mod params;
pub mod pose;
pub mod quantize;
pub mod shape;
pub mod structure;
pub mod taper;

pub use descriptor::{DescriptorError, SpeciesDescriptor};
pub use diffusion::ErrorDiffuser;
pub use generator::TreeGenerator;
pub use mesh::{BranchRecord, TreeMesh};
pub use mesher::{TreeMeshBuilder, TreeMeshOutput};
pub use params::{TreeParameters, decode};
pub use pose::Pose;
pub use shape::{ShapeKind, shape_ratio};
pub use structure::{Stem, StemId, Tree};
pub use taper::{StemProfile, stem_radius};
