//! Material and texture data as read from the host.

use crate::types::Rgb;
use serde::{Deserialize, Serialize};

/// Raytracing mode flags of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialModes {
    #[serde(default)]
    pub ray_mirror: bool,
    #[serde(default)]
    pub ray_transparency: bool,
}

/// A texture bound to one of a material's slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSlot {
    /// Name of the bound texture.
    pub texture: String,
    /// Blend factor applied to the diffuse color channel.
    #[serde(default = "one")]
    pub color_factor: f32,
    /// Blend factor applied to the specular channel.
    #[serde(default = "one")]
    pub specular_factor: f32,
    /// Blend factor applied to the surface normal.
    #[serde(default)]
    pub normal_factor: f32,
    /// UV repeat factors.
    #[serde(default = "unit_repeat")]
    pub repeat: [f32; 2],
    /// The image stores tangent-space normals rather than heights.
    #[serde(default)]
    pub normal_map: bool,
}

fn one() -> f32 {
    1.0
}

fn unit_repeat() -> [f32; 2] {
    [1.0, 1.0]
}

impl TextureSlot {
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            color_factor: 1.0,
            specular_factor: 1.0,
            normal_factor: 0.0,
            repeat: unit_repeat(),
            normal_map: false,
        }
    }
}

/// A host texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Texture {
    /// Backed by an image file. The path may be unset when the host lost the
    /// image.
    Image {
        #[serde(default)]
        path: Option<String>,
    },
    /// Generated by the host. Has no file the renderer could read.
    Procedural,
}

impl Texture {
    pub fn image(path: impl Into<String>) -> Self {
        Texture::Image {
            path: Some(path.into()),
        }
    }

    /// The image file path, when the texture is image-backed and has one.
    pub fn image_path(&self) -> Option<&str> {
        match self {
            Texture::Image { path } => path.as_deref().filter(|p| !p.is_empty()),
            Texture::Procedural => None,
        }
    }
}

/// A host material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Number of objects referencing the material.
    #[serde(default = "one_user")]
    pub users: u32,
    #[serde(default = "default_color")]
    pub color: Rgb,
    #[serde(default)]
    pub spec_color: Rgb,
    /// Specular hardness (phong exponent).
    #[serde(default = "default_hardness")]
    pub hardness: u32,
    /// Index of refraction.
    #[serde(default = "one")]
    pub ior: f32,
    /// Mirror reflectivity amount.
    #[serde(default)]
    pub mirror: f32,
    #[serde(default)]
    pub modes: MaterialModes,
    /// Texture slots in order. Unbound slots are `None`.
    #[serde(default)]
    pub textures: Vec<Option<TextureSlot>>,
}

fn one_user() -> u32 {
    1
}

fn default_color() -> Rgb {
    Rgb::splat(0.8)
}

fn default_hardness() -> u32 {
    50
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: one_user(),
            color: default_color(),
            spec_color: Rgb::WHITE,
            hardness: default_hardness(),
            ior: 1.0,
            mirror: 0.0,
            modes: MaterialModes::default(),
            textures: Vec::new(),
        }
    }

    /// The texture bound to slot `index`, if any.
    pub fn slot(&self, index: usize) -> Option<&TextureSlot> {
        self.textures.get(index).and_then(Option::as_ref)
    }

    /// Bind a texture to slot `index`, growing the slot list as needed.
    pub fn with_slot(mut self, index: usize, slot: TextureSlot) -> Self {
        if self.textures.len() <= index {
            self.textures.resize(index + 1, None);
        }
        self.textures[index] = Some(slot);
        self
    }
}
