//! Mesh geometry owned by rigid nodes
//!
//! Geometry arrives already tessellated from the host CAD; this module only
//! models it for serialization. Each `Mesh` carries the GUID of the rigid
//! node that owns it so the mesh container can be cross-referenced from the
//! skeleton document.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single vertex: position and normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }
}

/// Three indices into the owning sub-mesh's vertex sequence
///
/// Degenerate triangles (repeated indices) are permitted and passed through
/// unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }
}

/// A group of triangles sharing one RGB color
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Surface {
    pub color: [u8; 3],
    pub triangles: Vec<Triangle>,
}

impl Surface {
    pub fn new(color: [u8; 3]) -> Self {
        Self {
            color,
            triangles: Vec::new(),
        }
    }

    pub fn add_triangles(&mut self, triangles: impl IntoIterator<Item = Triangle>) {
        self.triangles.extend(triangles);
    }
}

/// An ordered vertex sequence plus the surfaces indexing into it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubMesh {
    pub vertices: Vec<Vertex>,
    pub surfaces: Vec<Surface>,
}

impl SubMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertices(&mut self, vertices: impl IntoIterator<Item = Vertex>) {
        self.vertices.extend(vertices);
    }

    pub fn add_surface(&mut self, surface: Surface) {
        self.surfaces.push(surface);
    }

    /// Check that every triangle index is within the vertex count
    pub fn validate(&self) -> bool {
        let count = self.vertices.len() as u32;
        self.surfaces
            .iter()
            .flat_map(|s| &s.triangles)
            .all(|t| t.indices.iter().all(|&i| i < count))
    }

    /// Total triangle count across all surfaces
    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.triangles.len()).sum()
    }
}

/// One rigid node's geometry, tagged with the owning node's GUID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub guid: Uuid,
    pub sub_meshes: Vec<SubMesh>,
}

impl Mesh {
    pub fn new(guid: Uuid) -> Self {
        Self {
            guid,
            sub_meshes: Vec::new(),
        }
    }

    pub fn add_sub_mesh(&mut self, sub_mesh: SubMesh) {
        self.sub_meshes.push(sub_mesh);
    }

    /// Check index bounds across all sub-meshes
    pub fn validate(&self) -> bool {
        self.sub_meshes.iter().all(|s| s.validate())
    }

    pub fn is_empty(&self) -> bool {
        self.sub_meshes.is_empty()
    }
}
