//! # Sunflow Exporter
//!
//! A Rust library for writing 3D scenes as Sunflow `.sc` scene files.
//!
//! ## Overview
//!
//! The exporter reads a host scene (cameras, lamps, meshes, materials)
//! through the [`SceneSource`] trait and writes a renderer scene description:
//! a main file with render settings, shaders, camera and lights, a geometry
//! file with the meshes, and binary `.ra3` sidecars for meshes too large to
//! inline.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sunflow_exporter::{ExportConfig, ExportMode, Exporter, MemoryScene};
//!
//! // Load a scene description
//! let mut scene = MemoryScene::load("scene.json")?;
//!
//! // Export the current frame to scene.sc and scene.geo.sc
//! let exporter = Exporter::new(ExportConfig::default());
//! let summary = exporter.export(&mut scene, "scene.sc", ExportMode::SingleFrame)?;
//! ```
//!
//! ## Material Naming
//!
//! Shader kinds are chosen by material name: an optional `sf` prefix and a
//! three letter code (`dif`, `shi`, `amb`, `pho`, `war`, `mir`, `gla`,
//! `con`, `ube`). `sfpho_plastic` becomes a phong shader, `sfmir_chrome` a
//! mirror when the material has ray mirror enabled. Objects whose names start
//! with `meshlight` are exported as emitters.

pub mod config;
pub mod error;
pub mod export;
pub mod scene;
pub mod types;

// Re-export main types for convenience
pub use config::{CameraMode, ExportConfig, GiMode, ImageFilter, RendererSettings};
pub use error::{ExportError, Result};
pub use export::{ExportMode, ExportSummary, Exporter};
pub use scene::{
    Camera, Lamp, LampKind, Material, MemoryScene, Mesh, ObjectKind, SceneObject, SceneSource,
};
pub use types::{Rgb, Transform};

/// Export the current frame of a scene with the given options.
pub fn export_scene<S, P>(scene: &mut S, path: P, config: ExportConfig) -> Result<ExportSummary>
where
    S: SceneSource + ?Sized,
    P: AsRef<std::path::Path>,
{
    Exporter::new(config).export(scene, path, ExportMode::SingleFrame)
}
