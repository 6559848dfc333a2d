//! Polygon mesh data as read from the host.

use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};

/// A mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    /// Position in object space.
    pub co: [f32; 3],
    /// Smoothed vertex normal.
    #[serde(default)]
    pub no: [f32; 3],
}

impl Vertex {
    pub fn new(co: [f32; 3], no: [f32; 3]) -> Self {
        Self { co, no }
    }
}

/// Vertex indices of a face. Faces always have three or four corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub enum FaceVertices {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

/// Corner triples of each triangle a face splits into. Quads always split
/// along the 0-2 diagonal.
const TRIANGLE_CORNERS: &[[usize; 3]] = &[[0, 1, 2]];
const QUAD_CORNERS: &[[usize; 3]] = &[[0, 1, 2], [0, 2, 3]];

impl FaceVertices {
    pub fn as_slice(&self) -> &[u32] {
        match self {
            FaceVertices::Triangle(v) => v,
            FaceVertices::Quad(v) => v,
        }
    }

    /// Number of corners (3 or 4).
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of triangles after triangulation.
    pub fn triangle_count(&self) -> usize {
        self.corner_triangles().len()
    }

    /// Face-corner index triples of the triangulated face.
    pub fn corner_triangles(&self) -> &'static [[usize; 3]] {
        match self {
            FaceVertices::Triangle(_) => TRIANGLE_CORNERS,
            FaceVertices::Quad(_) => QUAD_CORNERS,
        }
    }

    /// Vertex index triples of the triangulated face.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let v = self.as_slice();
        self.corner_triangles()
            .iter()
            .map(move |c| [v[c[0]], v[c[1]], v[c[2]]])
    }
}

impl TryFrom<Vec<u32>> for FaceVertices {
    type Error = String;

    fn try_from(v: Vec<u32>) -> std::result::Result<Self, Self::Error> {
        match v.as_slice() {
            &[a, b, c] => Ok(FaceVertices::Triangle([a, b, c])),
            &[a, b, c, d] => Ok(FaceVertices::Quad([a, b, c, d])),
            other => Err(format!("face must have 3 or 4 vertices, got {}", other.len())),
        }
    }
}

impl From<FaceVertices> for Vec<u32> {
    fn from(f: FaceVertices) -> Self {
        f.as_slice().to_vec()
    }
}

/// A mesh face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    #[serde(rename = "v")]
    pub vertices: FaceVertices,
    /// Flat face normal.
    #[serde(default)]
    pub normal: [f32; 3],
    #[serde(default)]
    pub smooth: bool,
    /// One UV pair per corner, when the mesh carries face UVs.
    #[serde(default)]
    pub uv: Option<Vec<[f32; 2]>>,
    /// Index into the mesh's material list.
    #[serde(default)]
    pub material: u32,
}

impl Face {
    pub fn new(vertices: FaceVertices) -> Self {
        Self {
            vertices,
            normal: [0.0, 0.0, 1.0],
            smooth: false,
            uv: None,
            material: 0,
        }
    }

    pub fn smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn with_uv(mut self, uv: Vec<[f32; 2]>) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_material(mut self, material: u32) -> Self {
        self.material = material;
        self
    }
}

/// A polygon mesh with its assigned materials.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub faces: Vec<Face>,
    /// Names of the materials in slot order.
    #[serde(default)]
    pub materials: Vec<String>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    pub fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    /// Add a triangle face by vertex indices.
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.add_face(Face::new(FaceVertices::Triangle([i0, i1, i2])));
    }

    /// Add a quad face by vertex indices.
    pub fn add_quad(&mut self, i0: u32, i1: u32, i2: u32, i3: u32) {
        self.add_face(Face::new(FaceVertices::Quad([i0, i1, i2, i3])));
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles after splitting quads.
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.vertices.triangle_count()).sum()
    }

    /// Whether every face carries UVs.
    pub fn has_face_uv(&self) -> bool {
        !self.faces.is_empty() && self.faces.iter().all(|f| f.uv.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Check that faces only reference existing vertices and carry one UV per
    /// corner.
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face
                .vertices
                .as_slice()
                .iter()
                .find(|&&v| v as usize >= count)
            {
                return Err(ExportError::InvalidScene(format!(
                    "face {} references vertex {} but the mesh has {} vertices",
                    i, bad, count
                )));
            }
            if let Some(uv) = &face.uv {
                if uv.len() != face.vertices.len() {
                    return Err(ExportError::InvalidScene(format!(
                        "face {} has {} corners but {} UVs",
                        i,
                        face.vertices.len(),
                        uv.len()
                    )));
                }
            }
        }
        Ok(())
    }
}
