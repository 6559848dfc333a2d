//! Host scene graph interface.
//!
//! The exporter never owns the scene. It reads objects, meshes, materials,
//! lamps and cameras through [`SceneSource`], which a host application (or
//! the JSON-backed [`MemoryScene`]) implements.

mod material;
pub mod memory;
mod mesh;

pub use material::{Material, MaterialModes, Texture, TextureSlot};
pub use memory::MemoryScene;
pub use mesh::{Face, FaceVertices, Mesh, Vertex};

use crate::types::{Rgb, Transform};
use serde::{Deserialize, Serialize};

/// Object names starting with this prefix are exported as emissive geometry.
pub const MESH_LIGHT_PREFIX: &str = "meshlight";

/// The host type of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Mesh,
    /// Curve or NURBS surface, exported through its tessellated mesh.
    Surface,
    Lamp,
    Camera,
    /// Anything else (empties, armatures, ...). Never exported.
    Other,
}

/// A top-level object in the host scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    /// Name of the data block (mesh, lamp or camera) this object instances.
    #[serde(default)]
    pub data: String,
    /// World transform at the scene's current frame.
    #[serde(default)]
    pub matrix: Transform,
    /// Visibility layer the object lives on.
    #[serde(default = "default_layer")]
    pub layer: u32,
    /// Reference count held by the host.
    #[serde(default = "default_users")]
    pub users: u32,
}

fn default_layer() -> u32 {
    1
}

fn default_users() -> u32 {
    2
}

impl SceneObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            data: data.into(),
            matrix: Transform::IDENTITY,
            layer: default_layer(),
            users: default_users(),
        }
    }

    pub fn with_matrix(mut self, matrix: Transform) -> Self {
        self.matrix = matrix;
        self
    }

    /// Mesh or surface object.
    pub fn is_geometry(&self) -> bool {
        matches!(self.kind, ObjectKind::Mesh | ObjectKind::Surface)
    }

    /// Geometry whose name marks it as an emitter.
    pub fn is_mesh_light(&self) -> bool {
        self.is_geometry() && self.name.starts_with(MESH_LIGHT_PREFIX)
    }

    /// Whether the object takes part in an export pass: it must be referenced
    /// more than once and live on one of the active layers.
    pub fn is_exported(&self, active_layers: &[u32]) -> bool {
        self.users > 1 && active_layers.contains(&self.layer)
    }
}

/// Lamp types, numbered as the host numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LampKind {
    Point,
    Sun,
    Spot,
    Hemi,
    Area,
}

/// Lamp data block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lamp {
    pub kind: LampKind,
    #[serde(default)]
    pub color: Rgb,
    #[serde(default = "default_energy")]
    pub energy: f32,
    /// Area lamp extent along local X.
    #[serde(default = "default_area_size")]
    pub area_size: f32,
    /// Area lamp extent along local Y. `None` means a square lamp.
    #[serde(default)]
    pub area_size_y: Option<f32>,
    /// Full spot cone angle in degrees.
    #[serde(default = "default_spot_size")]
    pub spot_size: f32,
    /// Spot throw distance.
    #[serde(default = "default_spot_distance")]
    pub spot_distance: f32,
}

fn default_energy() -> f32 {
    1.0
}

fn default_area_size() -> f32 {
    1.0
}

fn default_spot_size() -> f32 {
    45.0
}

fn default_spot_distance() -> f32 {
    20.0
}

impl Lamp {
    pub fn new(kind: LampKind) -> Self {
        Self {
            kind,
            color: Rgb::WHITE,
            energy: default_energy(),
            area_size: default_area_size(),
            area_size_y: None,
            spot_size: default_spot_size(),
            spot_distance: default_spot_distance(),
        }
    }

    /// Half extents of an area lamp in its local XY plane.
    pub fn half_extents(&self) -> (f32, f32) {
        let x = self.area_size * 0.5;
        let y = self.area_size_y.map_or(x, |y| y * 0.5);
        (x, y)
    }
}

/// Camera data block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Focal length in millimetres.
    #[serde(default = "default_lens")]
    pub lens: f32,
    /// Distance to the focal plane for depth of field.
    #[serde(default = "default_dof_distance")]
    pub dof_distance: f32,
}

fn default_lens() -> f32 {
    35.0
}

fn default_dof_distance() -> f32 {
    10.0
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            lens: default_lens(),
            dof_distance: default_dof_distance(),
        }
    }
}

/// Read access to the host scene graph for one export pass.
///
/// Everything but the frame cursor is read-only. Implementations resolve
/// per-frame transforms whenever [`set_current_frame`](Self::set_current_frame)
/// is called.
pub trait SceneSource {
    /// Top-level objects of the scene, in host order.
    fn objects(&self) -> Box<dyn Iterator<Item = &SceneObject> + '_>;

    /// The mesh instanced by a mesh or surface object.
    fn mesh(&self, object: &SceneObject) -> Option<&Mesh>;

    /// Every material known to the host, in host order.
    fn materials(&self) -> Box<dyn Iterator<Item = &Material> + '_>;

    /// Look up a material by name.
    fn material(&self, name: &str) -> Option<&Material>;

    /// The lamp data of a lamp object.
    fn lamp(&self, object: &SceneObject) -> Option<&Lamp>;

    /// The camera data of a camera object.
    fn camera(&self, object: &SceneObject) -> Option<&Camera>;

    /// The scene's active camera object, if any.
    fn active_camera(&self) -> Option<&SceneObject>;

    /// Layers currently visible.
    fn active_layers(&self) -> &[u32];

    /// Look up a texture by name.
    fn texture(&self, name: &str) -> Option<&Texture>;

    /// Output resolution `(width, height)` in pixels.
    fn resolution(&self) -> (u32, u32);

    /// Inclusive animation frame range `(start, end)`.
    fn frame_range(&self) -> (i32, i32);

    fn current_frame(&self) -> i32;

    /// Move the frame cursor and re-resolve every object's transform.
    fn set_current_frame(&mut self, frame: i32);
}
