//! World transforms for scene objects.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A 4x4 world matrix in column-vector convention.
///
/// Serialized as four columns of four floats. The last column holds the
/// translation, which matches a row-vector host matrix read row by row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f32; 4]; 4]", into = "[[f32; 4]; 4]")]
pub struct Transform(pub Mat4);

impl Transform {
    pub const IDENTITY: Transform = Transform(Mat4::IDENTITY);

    pub fn from_translation(t: [f32; 3]) -> Self {
        Self(Mat4::from_translation(Vec3::from(t)))
    }

    /// Transform a point (w = 1).
    pub fn point(&self, p: Vec3) -> Vec3 {
        self.0.transform_point3(p)
    }

    /// Transform a direction (w = 0).
    pub fn vector(&self, v: Vec3) -> Vec3 {
        self.0.transform_vector3(v)
    }

    /// World-space position of the local origin.
    pub fn origin(&self) -> Vec3 {
        self.point(Vec3::ZERO)
    }

    /// Third row of the inverse matrix: the local +Z axis as seen from world
    /// space, which is the direction a sun lamp's light comes from.
    pub fn inverse_z_axis(&self) -> Vec3 {
        self.0.inverse().row(2).truncate()
    }

    /// The sixteen entries column by column, as `transform col` expects.
    pub fn to_cols_array(&self) -> [f32; 16] {
        self.0.to_cols_array()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[[f32; 4]; 4]> for Transform {
    fn from(cols: [[f32; 4]; 4]) -> Self {
        Self(Mat4::from_cols_array_2d(&cols))
    }
}

impl From<Transform> for [[f32; 4]; 4] {
    fn from(t: Transform) -> Self {
        t.0.to_cols_array_2d()
    }
}

impl From<Mat4> for Transform {
    fn from(m: Mat4) -> Self {
        Self(m)
    }
}
