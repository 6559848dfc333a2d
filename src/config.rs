//! Export options and persisted renderer settings.
//!
//! [`ExportConfig`] is built once before an export pass and handed to every
//! mapper by reference. It never changes while a pass runs.

use crate::error::Result;
use crate::types::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Triangle count above which a mesh is written to a binary sidecar.
pub const LARGE_MESH_THRESHOLD: usize = 100_000;

/// Pixel reconstruction filter of the image block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFilter {
    Box,
    #[default]
    Gaussian,
    Mitchell,
    Triangle,
    CatmullRom,
    BlackmanHarris,
    Sinc,
    Lanczos,
}

impl ImageFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFilter::Box => "box",
            ImageFilter::Gaussian => "gaussian",
            ImageFilter::Mitchell => "mitchell",
            ImageFilter::Triangle => "triangle",
            ImageFilter::CatmullRom => "catmull-rom",
            ImageFilter::BlackmanHarris => "blackman-harris",
            ImageFilter::Sinc => "sinc",
            ImageFilter::Lanczos => "lanczos",
        }
    }
}

impl fmt::Display for ImageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anti-aliasing and filtering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub min_aa: i32,
    pub max_aa: i32,
    pub samples: u32,
    pub filter: ImageFilter,
    pub jitter: bool,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            min_aa: -2,
            max_aa: 0,
            samples: 1,
            filter: ImageFilter::default(),
            jitter: false,
        }
    }
}

/// Maximum ray depths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceDepths {
    pub diffuse: u32,
    pub reflection: u32,
    pub refraction: u32,
}

impl Default for TraceDepths {
    fn default() -> Self {
        Self {
            diffuse: 1,
            reflection: 4,
            refraction: 4,
        }
    }
}

/// Global illumination engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GiMode {
    #[default]
    None,
    /// Ambient occlusion using the [`OcclusionSettings`] colors.
    AmbientOcclusion,
    Path {
        samples: u32,
    },
    Igi {
        samples: u32,
        sets: u32,
        bias: f32,
        bias_samples: u32,
    },
    IrrCache {
        samples: u32,
        tolerance: f32,
        min_spacing: f32,
        max_spacing: f32,
    },
    Fake {
        up: [f32; 3],
        sky: Rgb,
        ground: Rgb,
    },
}

/// Camera lens model. Exactly one is active per export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CameraMode {
    #[default]
    Pinhole,
    /// Depth of field. The focus distance comes from the camera data.
    ThinLens {
        lens_radius: f32,
        /// Aperture polygon side count, 0 for a round aperture.
        #[serde(default)]
        sides: u32,
        /// Aperture rotation in degrees.
        #[serde(default)]
        rotation: f32,
    },
    Spherical,
    Fisheye,
}

/// Light export options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    /// Sample count for area, mesh, sun and image-based lights.
    pub direct_samples: u32,
    /// Multiplier applied to point and spot lamp energy.
    pub lamp_power: f32,
    /// Radiance multiplier for area lamps and emissive meshes.
    pub meshlight_power: f32,
    /// Export sun lamps as a physical sun and sky.
    pub import_sun: bool,
    /// Export unsupported lamp types as point lights instead of dropping them.
    pub convert_unknown_lamps: bool,
    /// Name of the host texture used as image-based light.
    pub ibl_texture: String,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            direct_samples: 16,
            lamp_power: 1.0,
            meshlight_power: 1.0,
            import_sun: true,
            convert_unknown_lamps: false,
            ibl_texture: "ibllight".to_string(),
        }
    }
}

/// Ambient occlusion colors shared by occlusion shaders, the override and
/// the occlusion GI engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionSettings {
    pub bright: Rgb,
    pub dark: Rgb,
    pub samples: u32,
    pub distance: f32,
}

impl Default for OcclusionSettings {
    fn default() -> Self {
        Self {
            bright: Rgb::WHITE,
            dark: Rgb::BLACK,
            samples: 32,
            distance: 0.0,
        }
    }
}

/// Options for one export pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Force every surface through a single ambient occlusion shader.
    pub ao_override: bool,
    /// Background color. `None` leaves the background black and unwritten.
    pub background: Option<Rgb>,
    /// Triangle count above which meshes go to a binary sidecar file.
    pub large_mesh_threshold: usize,
    pub image: ImageSettings,
    pub trace_depths: TraceDepths,
    pub gi: GiMode,
    pub camera: CameraMode,
    pub lights: LightSettings,
    pub occlusion: OcclusionSettings,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ao_override: false,
            background: None,
            large_mesh_threshold: LARGE_MESH_THRESHOLD,
            image: ImageSettings::default(),
            trace_depths: TraceDepths::default(),
            gi: GiMode::default(),
            camera: CameraMode::default(),
            lights: LightSettings::default(),
            occlusion: OcclusionSettings::default(),
        }
    }
}

impl ExportConfig {
    /// Load options from a TOML file. Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Settings persisted between sessions for launching the renderer.
///
/// The exporter itself never reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Path to the renderer jar or launcher.
    pub renderer_path: String,
    /// Java heap limit in megabytes.
    pub memory_mb: u32,
    /// Render threads, 0 for one per core.
    pub threads: u32,
    /// Path to the Java runtime.
    pub java_path: String,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            renderer_path: String::new(),
            memory_mb: 1024,
            threads: 0,
            java_path: "java".to_string(),
        }
    }
}

impl RendererSettings {
    /// Load the settings file, falling back to defaults when it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
