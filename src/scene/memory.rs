//! In-memory scene loaded from a JSON scene description.
//!
//! This is the [`SceneSource`] used by the command line tool and the tests.
//! Data blocks (meshes, lamps, cameras, textures) are keyed by name and
//! objects reference them through [`SceneObject::data`].

use super::{Camera, Lamp, Material, Mesh, SceneObject, SceneSource, Texture};
use crate::error::{ExportError, Result};
use crate::types::Transform;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A complete host scene held in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryScene {
    /// Output resolution `[width, height]`.
    #[serde(default = "default_resolution")]
    pub resolution: [u32; 2],
    /// Inclusive animation frame range `[start, end]`.
    #[serde(default = "default_frames")]
    pub frames: [i32; 2],
    #[serde(default = "default_frame")]
    pub current_frame: i32,
    #[serde(default = "default_layers")]
    pub active_layers: Vec<u32>,
    /// Name of the active camera object.
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub meshes: HashMap<String, Mesh>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub lamps: HashMap<String, Lamp>,
    #[serde(default)]
    pub cameras: HashMap<String, Camera>,
    #[serde(default)]
    pub textures: HashMap<String, Texture>,
    /// Keyed world transforms per object name. Between keys the last key
    /// holds; before the first key the first key applies.
    #[serde(default)]
    pub animation: HashMap<String, BTreeMap<i32, Transform>>,
}

fn default_resolution() -> [u32; 2] {
    [640, 480]
}

fn default_frames() -> [i32; 2] {
    [1, 1]
}

fn default_frame() -> i32 {
    1
}

fn default_layers() -> Vec<u32> {
    vec![1]
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            frames: default_frames(),
            current_frame: default_frame(),
            active_layers: default_layers(),
            camera: None,
            objects: Vec::new(),
            meshes: HashMap::new(),
            materials: Vec::new(),
            lamps: HashMap::new(),
            cameras: HashMap::new(),
            textures: HashMap::new(),
            animation: HashMap::new(),
        }
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a scene description and resolve transforms for its current frame.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut scene: MemoryScene = serde_json::from_str(json)?;
        scene.validate()?;
        let frame = scene.current_frame;
        scene.set_current_frame(frame);
        Ok(scene)
    }

    /// Load a scene description file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check every mesh for out-of-range indices and UV mismatches.
    pub fn validate(&self) -> Result<()> {
        for (name, mesh) in &self.meshes {
            mesh.validate()
                .map_err(|e| ExportError::InvalidScene(format!("mesh \"{}\": {}", name, e)))?;
        }
        Ok(())
    }

    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn add_mesh(&mut self, name: impl Into<String>, mesh: Mesh) {
        self.meshes.insert(name.into(), mesh);
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.push(material);
    }

    pub fn add_lamp(&mut self, name: impl Into<String>, lamp: Lamp) {
        self.lamps.insert(name.into(), lamp);
    }

    pub fn add_camera(&mut self, name: impl Into<String>, camera: Camera) {
        self.cameras.insert(name.into(), camera);
    }

    pub fn add_texture(&mut self, name: impl Into<String>, texture: Texture) {
        self.textures.insert(name.into(), texture);
    }

    /// Key a world transform for an object at a frame.
    pub fn add_keyframe(&mut self, object: impl Into<String>, frame: i32, matrix: Transform) {
        self.animation
            .entry(object.into())
            .or_default()
            .insert(frame, matrix);
    }

    /// Number of objects that pass the layer and reference filter.
    pub fn exported_object_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.is_exported(&self.active_layers))
            .count()
    }
}

/// Transform in effect at `frame` for a keyed object.
fn keyed_transform(keys: &BTreeMap<i32, Transform>, frame: i32) -> Option<Transform> {
    keys.range(..=frame)
        .next_back()
        .or_else(|| keys.iter().next())
        .map(|(_, t)| *t)
}

impl SceneSource for MemoryScene {
    fn objects(&self) -> Box<dyn Iterator<Item = &SceneObject> + '_> {
        Box::new(self.objects.iter())
    }

    fn mesh(&self, object: &SceneObject) -> Option<&Mesh> {
        self.meshes.get(&object.data)
    }

    fn materials(&self) -> Box<dyn Iterator<Item = &Material> + '_> {
        Box::new(self.materials.iter())
    }

    fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    fn lamp(&self, object: &SceneObject) -> Option<&Lamp> {
        self.lamps.get(&object.data)
    }

    fn camera(&self, object: &SceneObject) -> Option<&Camera> {
        self.cameras.get(&object.data)
    }

    fn active_camera(&self) -> Option<&SceneObject> {
        let name = self.camera.as_deref()?;
        self.objects.iter().find(|o| o.name == name)
    }

    fn active_layers(&self) -> &[u32] {
        &self.active_layers
    }

    fn texture(&self, name: &str) -> Option<&Texture> {
        self.textures.get(name)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.resolution[0], self.resolution[1])
    }

    fn frame_range(&self) -> (i32, i32) {
        (self.frames[0], self.frames[1])
    }

    fn current_frame(&self) -> i32 {
        self.current_frame
    }

    fn set_current_frame(&mut self, frame: i32) {
        self.current_frame = frame;
        for object in &mut self.objects {
            if let Some(matrix) = self
                .animation
                .get(&object.name)
                .and_then(|keys| keyed_transform(keys, frame))
            {
                object.matrix = matrix;
            }
        }
    }
}
