//! Sunflow scene export.
//!
//! The mappers (`geometry`, `material`, `light`) turn host entities into
//! records from `sc`; the driver decides which files the records go to.

pub mod driver;
pub mod geometry;
pub mod light;
pub mod material;
pub mod sc;

pub use driver::{ExportMode, ExportSummary, Exporter};
pub use geometry::{classify_normals, encode_object, encode_sidecar, EncodedGeometry, NormalMode};
pub use light::{field_of_view, map_camera, map_ibl, map_lamp};
pub use material::{classify, map_material, map_modifier, MaterialTag, ShaderClass};
