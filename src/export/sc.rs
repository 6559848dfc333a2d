//! Records of the Sunflow `.sc` scene format.
//!
//! Every record renders itself through [`Display`](fmt::Display) as one
//! block. Mappers build records; only [`ScWriter`] touches an output stream.

use crate::config::{GiMode, ImageSettings, OcclusionSettings, TraceDepths};
use crate::types::{Rgb, Transform};
use glam::Vec3;
use std::fmt;
use std::io::{self, Write};

/// A quoted string token. The format has no escapes, so embedded double
/// quotes become single quotes.
pub struct Quoted<'a>(pub &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.replace('"', "'"))
    }
}

/// Writes records to a stream, one blank line between blocks.
pub struct ScWriter<W: Write> {
    inner: W,
    records: usize,
}

impl<W: Write> ScWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, records: 0 }
    }

    /// Write one record.
    pub fn record(&mut self, record: &dyn fmt::Display) -> io::Result<()> {
        if self.records > 0 {
            writeln!(self.inner)?;
        }
        writeln!(self.inner, "{}", record)?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Flush and hand back the underlying stream.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

fn write_vec3(f: &mut fmt::Formatter<'_>, key: &str, v: Vec3) -> fmt::Result {
    writeln!(f, "\t{} {} {} {}", key, v.x, v.y, v.z)
}

fn write_floats(f: &mut fmt::Formatter<'_>, values: &[f32]) -> fmt::Result {
    f.write_str("\t\t")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", v)?;
    }
    writeln!(f)
}

/// The `image` block.
pub struct ImageRecord<'a> {
    pub resolution: (u32, u32),
    pub settings: &'a ImageSettings,
}

impl fmt::Display for ImageRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.settings;
        writeln!(f, "image {{")?;
        writeln!(f, "\tresolution {} {}", self.resolution.0, self.resolution.1)?;
        writeln!(f, "\taa {} {}", s.min_aa, s.max_aa)?;
        writeln!(f, "\tsamples {}", s.samples)?;
        writeln!(f, "\tfilter {}", s.filter)?;
        if s.jitter {
            writeln!(f, "\tjitter true")?;
        }
        write!(f, "}}")
    }
}

/// The `trace-depths` block.
pub struct TraceDepthsRecord<'a>(pub &'a TraceDepths);

impl fmt::Display for TraceDepthsRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trace-depths {{")?;
        writeln!(f, "\tdiff {}", self.0.diffuse)?;
        writeln!(f, "\trefl {}", self.0.reflection)?;
        writeln!(f, "\trefr {}", self.0.refraction)?;
        write!(f, "}}")
    }
}

/// The `background` block.
pub struct BackgroundRecord(pub Rgb);

impl fmt::Display for BackgroundRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "background {{\n\tcolor {}\n}}", self.0)
    }
}

/// The `gi` block. Never built for [`GiMode::None`].
pub struct GiRecord<'a> {
    mode: &'a GiMode,
    occlusion: &'a OcclusionSettings,
}

impl<'a> GiRecord<'a> {
    pub fn new(mode: &'a GiMode, occlusion: &'a OcclusionSettings) -> Option<Self> {
        match mode {
            GiMode::None => None,
            _ => Some(Self { mode, occlusion }),
        }
    }
}

impl fmt::Display for GiRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "gi {{")?;
        match self.mode {
            GiMode::None => {}
            GiMode::AmbientOcclusion => {
                let o = self.occlusion;
                writeln!(f, "\ttype ambocc")?;
                writeln!(f, "\tbright {}", o.bright)?;
                writeln!(f, "\tdark {}", o.dark)?;
                writeln!(f, "\tsamples {}", o.samples)?;
                writeln!(f, "\tmaxdist {}", o.distance)?;
            }
            GiMode::Path { samples } => {
                writeln!(f, "\ttype path")?;
                writeln!(f, "\tsamples {}", samples)?;
            }
            GiMode::Igi {
                samples,
                sets,
                bias,
                bias_samples,
            } => {
                writeln!(f, "\ttype igi")?;
                writeln!(f, "\tsamples {}", samples)?;
                writeln!(f, "\tsets {}", sets)?;
                writeln!(f, "\tc {}", bias)?;
                writeln!(f, "\tbias-samples {}", bias_samples)?;
            }
            GiMode::IrrCache {
                samples,
                tolerance,
                min_spacing,
                max_spacing,
            } => {
                writeln!(f, "\ttype irr-cache")?;
                writeln!(f, "\tsamples {}", samples)?;
                writeln!(f, "\ttolerance {}", tolerance)?;
                writeln!(f, "\tspacing {} {}", min_spacing, max_spacing)?;
            }
            GiMode::Fake { up, sky, ground } => {
                writeln!(f, "\ttype fake")?;
                write_vec3(f, "up", Vec3::from(*up))?;
                writeln!(f, "\tsky {}", sky)?;
                writeln!(f, "\tground {}", ground)?;
            }
        }
        write!(f, "}}")
    }
}

/// Name of a shader as referenced from shader, override and object records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderRef {
    /// The built-in `def` shader.
    Default,
    /// The scene-wide ambient occlusion override shader.
    Occlusion,
    /// The shader generated for a host material.
    Material(String),
}

impl fmt::Display for ShaderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderRef::Default => f.write_str("def"),
            ShaderRef::Occlusion => f.write_str("amboccshader"),
            ShaderRef::Material(name) => write!(f, "{}", Quoted(&format!("{}.shader", name))),
        }
    }
}

/// Where a shader's primary color comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    Color(Rgb),
    /// Path of an image texture.
    Texture(String),
}

impl Surface {
    /// Write as `<color_key> {color}` or `texture "path"`.
    fn write(&self, f: &mut fmt::Formatter<'_>, color_key: &str) -> fmt::Result {
        match self {
            Surface::Color(c) => writeln!(f, "\t{} {}", color_key, c),
            Surface::Texture(path) => writeln!(f, "\ttexture \"{}\"", path),
        }
    }
}

/// A texture channel of the uber shader.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendTexture {
    pub path: String,
    pub blend: f32,
}

/// Kind-specific fields of a shader.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderBody {
    Diffuse {
        diff: Surface,
    },
    Phong {
        diff: Surface,
        spec: Rgb,
        power: u32,
        samples: u32,
    },
    AmbientOcclusion {
        bright: Surface,
        dark: Rgb,
        samples: u32,
        distance: f32,
    },
    Mirror {
        refl: Rgb,
    },
    Glass {
        eta: f32,
        color: Rgb,
        absorption_distance: f32,
        absorption_color: Rgb,
    },
    Shiny {
        diff: Surface,
        refl: f32,
    },
    Ward {
        diff: Surface,
        spec: Rgb,
        rough: (f32, f32),
        samples: u32,
    },
    Constant {
        color: Rgb,
    },
    Uber {
        diff: Rgb,
        diff_texture: Option<BlendTexture>,
        spec: Rgb,
        spec_texture: Option<BlendTexture>,
        glossy: f32,
        samples: u32,
    },
}

impl ShaderBody {
    /// The `type` keyword of the shader.
    pub fn kind(&self) -> &'static str {
        match self {
            ShaderBody::Diffuse { .. } => "diffuse",
            ShaderBody::Phong { .. } => "phong",
            ShaderBody::AmbientOcclusion { .. } => "amb-occ",
            ShaderBody::Mirror { .. } => "mirror",
            ShaderBody::Glass { .. } => "glass",
            ShaderBody::Shiny { .. } => "shiny",
            ShaderBody::Ward { .. } => "ward",
            ShaderBody::Constant { .. } => "constant",
            ShaderBody::Uber { .. } => "uber",
        }
    }
}

/// A `shader` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderRecord {
    pub name: ShaderRef,
    pub body: ShaderBody,
}

impl fmt::Display for ShaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shader {{")?;
        writeln!(f, "\tname {}", self.name)?;
        writeln!(f, "\ttype {}", self.body.kind())?;
        match &self.body {
            ShaderBody::Diffuse { diff } => diff.write(f, "diff")?,
            ShaderBody::Phong {
                diff,
                spec,
                power,
                samples,
            } => {
                diff.write(f, "diff")?;
                writeln!(f, "\tspec {} {}", spec, power)?;
                writeln!(f, "\tsamples {}", samples)?;
            }
            ShaderBody::AmbientOcclusion {
                bright,
                dark,
                samples,
                distance,
            } => {
                bright.write(f, "bright")?;
                writeln!(f, "\tdark {}", dark)?;
                writeln!(f, "\tsamples {}", samples)?;
                writeln!(f, "\tdist {}", distance)?;
            }
            ShaderBody::Mirror { refl } => writeln!(f, "\trefl {}", refl)?,
            ShaderBody::Glass {
                eta,
                color,
                absorption_distance,
                absorption_color,
            } => {
                writeln!(f, "\teta {}", eta)?;
                writeln!(f, "\tcolor {}", color)?;
                writeln!(f, "\tabsorbtion.distance {}", absorption_distance)?;
                writeln!(f, "\tabsorbtion.color {}", absorption_color)?;
            }
            ShaderBody::Shiny { diff, refl } => {
                diff.write(f, "diff")?;
                writeln!(f, "\trefl {}", refl)?;
            }
            ShaderBody::Ward {
                diff,
                spec,
                rough,
                samples,
            } => {
                diff.write(f, "diff")?;
                writeln!(f, "\tspec {}", spec)?;
                writeln!(f, "\trough {} {}", rough.0, rough.1)?;
                writeln!(f, "\tsamples {}", samples)?;
            }
            ShaderBody::Constant { color } => writeln!(f, "\tcolor {}", color)?,
            ShaderBody::Uber {
                diff,
                diff_texture,
                spec,
                spec_texture,
                glossy,
                samples,
            } => {
                writeln!(f, "\tdiff {}", diff)?;
                if let Some(t) = diff_texture {
                    writeln!(f, "\tdiff.texture \"{}\"", t.path)?;
                    writeln!(f, "\tdiff.blend {}", t.blend)?;
                }
                writeln!(f, "\tspec {}", spec)?;
                if let Some(t) = spec_texture {
                    writeln!(f, "\tspec.texture \"{}\"", t.path)?;
                    writeln!(f, "\tspec.blend {}", t.blend)?;
                }
                writeln!(f, "\tglossy {}", glossy)?;
                writeln!(f, "\tsamples {}", samples)?;
            }
        }
        write!(f, "}}")
    }
}

/// `override SHADER PHOTONS`: force every surface through one shader.
pub struct OverrideRecord {
    pub shader: ShaderRef,
    pub photons: bool,
}

impl fmt::Display for OverrideRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "override {} {}", self.shader, self.photons)
    }
}

/// Surface perturbation of a modifier.
#[derive(Debug, Clone, PartialEq)]
pub enum ModifierKind {
    Bump { texture: String, scale: f32 },
    NormalMap { texture: String },
}

/// A `modifier` block named after its material.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierRecord {
    pub material: String,
    pub kind: ModifierKind,
}

/// Token naming a material's modifier.
pub fn modifier_name(material: &str) -> String {
    Quoted(&format!("{}.modifier", material)).to_string()
}

impl fmt::Display for ModifierRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "modifier {{")?;
        writeln!(f, "\tname {}", modifier_name(&self.material))?;
        match &self.kind {
            ModifierKind::Bump { texture, scale } => {
                writeln!(f, "\ttype bump")?;
                writeln!(f, "\ttexture \"{}\"", texture)?;
                writeln!(f, "\tscale {}", scale)?;
            }
            ModifierKind::NormalMap { texture } => {
                writeln!(f, "\ttype normalmap")?;
                writeln!(f, "\ttexture \"{}\"", texture)?;
            }
        }
        write!(f, "}}")
    }
}

/// Lens of a camera record with its lens-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Lens {
    Pinhole {
        fov: f32,
        aspect: f32,
    },
    ThinLens {
        fov: f32,
        aspect: f32,
        focus_distance: f32,
        radius: f32,
        sides: u32,
        rotation: f32,
    },
    Spherical,
    Fisheye,
}

impl Lens {
    pub fn kind(&self) -> &'static str {
        match self {
            Lens::Pinhole { .. } => "pinhole",
            Lens::ThinLens { .. } => "thinlens",
            Lens::Spherical => "spherical",
            Lens::Fisheye => "fisheye",
        }
    }
}

/// A `camera` block.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRecord {
    pub lens: Lens,
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl fmt::Display for CameraRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "camera {{")?;
        writeln!(f, "\ttype {}", self.lens.kind())?;
        write_vec3(f, "eye", self.eye)?;
        write_vec3(f, "target", self.target)?;
        write_vec3(f, "up", self.up)?;
        match &self.lens {
            Lens::Pinhole { fov, aspect } => {
                writeln!(f, "\tfov {}", fov)?;
                writeln!(f, "\taspect {}", aspect)?;
            }
            Lens::ThinLens {
                fov,
                aspect,
                focus_distance,
                radius,
                sides,
                rotation,
            } => {
                writeln!(f, "\tfov {}", fov)?;
                writeln!(f, "\taspect {}", aspect)?;
                writeln!(f, "\tfdist {}", focus_distance)?;
                writeln!(f, "\tlensr {}", radius)?;
                if *sides > 0 {
                    writeln!(f, "\tsides {}", sides)?;
                    writeln!(f, "\trotation {}", rotation)?;
                }
            }
            Lens::Spherical | Lens::Fisheye => {}
        }
        write!(f, "}}")
    }
}

/// A `light` block.
#[derive(Debug, Clone, PartialEq)]
pub enum LightRecord {
    Point {
        color: Rgb,
        power: f32,
        position: Vec3,
    },
    SunSky {
        direction: Vec3,
        samples: u32,
    },
    MeshLight {
        name: String,
        emit: Rgb,
        radiance: f32,
        samples: u32,
        points: Vec<[f32; 3]>,
        triangles: Vec<[u32; 3]>,
    },
    /// Cylindrical beam from `source` towards `target`.
    Directional {
        source: Vec3,
        target: Vec3,
        radius: f32,
        emit: Rgb,
        intensity: f32,
    },
    Ibl {
        image: String,
        samples: u32,
    },
}

impl LightRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            LightRecord::Point { .. } => "point",
            LightRecord::SunSky { .. } => "sunsky",
            LightRecord::MeshLight { .. } => "meshlight",
            LightRecord::Directional { .. } => "directional",
            LightRecord::Ibl { .. } => "ibl",
        }
    }
}

impl fmt::Display for LightRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "light {{")?;
        writeln!(f, "\ttype {}", self.kind())?;
        match self {
            LightRecord::Point {
                color,
                power,
                position,
            } => {
                writeln!(f, "\tcolor {}", color)?;
                writeln!(f, "\tpower {}", power)?;
                write_vec3(f, "p", *position)?;
            }
            LightRecord::SunSky { direction, samples } => {
                writeln!(f, "\tup 0 0 1")?;
                writeln!(f, "\teast 0 1 0")?;
                write_vec3(f, "sundir", *direction)?;
                writeln!(f, "\tturbidity 6")?;
                writeln!(f, "\tsamples {}", samples)?;
            }
            LightRecord::MeshLight {
                name,
                emit,
                radiance,
                samples,
                points,
                triangles,
            } => {
                writeln!(f, "\tname {}", Quoted(name))?;
                writeln!(f, "\temit {}", emit)?;
                writeln!(f, "\tradiance {}", radiance)?;
                writeln!(f, "\tsamples {}", samples)?;
                write_points(f, points)?;
                write_triangles(f, triangles)?;
            }
            LightRecord::Directional {
                source,
                target,
                radius,
                emit,
                intensity,
            } => {
                write_vec3(f, "source", *source)?;
                write_vec3(f, "target", *target)?;
                writeln!(f, "\tradius {}", radius)?;
                writeln!(f, "\temit {}", emit)?;
                writeln!(f, "\tintensity {}", intensity)?;
            }
            LightRecord::Ibl { image, samples } => {
                writeln!(f, "\timage \"{}\"", image)?;
                writeln!(f, "\tcenter 1 0 0")?;
                writeln!(f, "\tup 0 0 1")?;
                writeln!(f, "\tlock true")?;
                writeln!(f, "\tsamples {}", samples)?;
            }
        }
        write!(f, "}}")
    }
}

fn write_points(f: &mut fmt::Formatter<'_>, points: &[[f32; 3]]) -> fmt::Result {
    writeln!(f, "\tpoints {}", points.len())?;
    for p in points {
        write_floats(f, p)?;
    }
    Ok(())
}

fn write_triangles(f: &mut fmt::Formatter<'_>, triangles: &[[u32; 3]]) -> fmt::Result {
    writeln!(f, "\ttriangles {}", triangles.len())?;
    for t in triangles {
        writeln!(f, "\t\t{} {} {}", t[0], t[1], t[2])?;
    }
    Ok(())
}

/// Normals block of a generic mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum Normals {
    None,
    /// One normal per point.
    Vertex(Vec<[f32; 3]>),
    /// Three normals per triangle.
    FaceVarying(Vec<[f32; 9]>),
}

impl Normals {
    pub fn kind(&self) -> &'static str {
        match self {
            Normals::None => "none",
            Normals::Vertex(_) => "vertex",
            Normals::FaceVarying(_) => "facevarying",
        }
    }
}

/// UV block of a generic mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum Uvs {
    None,
    /// Three UV pairs per triangle.
    FaceVarying(Vec<[f32; 6]>),
}

/// Inline triangle mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericMesh {
    pub points: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
    pub normals: Normals,
    pub uvs: Uvs,
    /// Per-triangle shader index, only for multi-material meshes.
    pub face_shaders: Option<Vec<u32>>,
}

/// Geometry payload of an object record.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectGeometry {
    Generic(GenericMesh),
    /// Geometry stored in a binary sidecar next to the scene file.
    File { filename: String },
}

/// An `object` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    /// One entry per material slot. Empty means the default shader.
    pub shaders: Vec<ShaderRef>,
    /// Modifier per material slot, parallel to `shaders`.
    pub modifiers: Vec<Option<String>>,
    pub transform: Transform,
    pub name: String,
    pub geometry: ObjectGeometry,
}

impl ObjectRecord {
    fn write_shaders(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shaders.as_slice() {
            [] => writeln!(f, "\tshader {}", ShaderRef::Default),
            [single] => writeln!(f, "\tshader {}", single),
            many => {
                writeln!(f, "\tshaders {}", many.len())?;
                for shader in many {
                    writeln!(f, "\t\t{}", shader)?;
                }
                Ok(())
            }
        }
    }

    fn write_modifiers(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.iter().all(Option::is_none) {
            return Ok(());
        }
        match self.modifiers.as_slice() {
            [Some(single)] => writeln!(f, "\tmodifier {}", modifier_name(single)),
            many => {
                writeln!(f, "\tmodifiers {}", many.len())?;
                for m in many {
                    match m {
                        Some(material) => writeln!(f, "\t\t{}", modifier_name(material))?,
                        None => writeln!(f, "\t\t\"None\"")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ObjectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "object {{")?;
        self.write_shaders(f)?;
        self.write_modifiers(f)?;
        writeln!(f, "\ttransform col")?;
        for column in self.transform.to_cols_array().chunks(4) {
            write_floats(f, column)?;
        }
        match &self.geometry {
            ObjectGeometry::Generic(mesh) => {
                writeln!(f, "\ttype generic-mesh")?;
                writeln!(f, "\tname {}", Quoted(&self.name))?;
                write_points(f, &mesh.points)?;
                write_triangles(f, &mesh.triangles)?;
                writeln!(f, "\tnormals {}", mesh.normals.kind())?;
                match &mesh.normals {
                    Normals::None => {}
                    Normals::Vertex(normals) => {
                        for n in normals {
                            write_floats(f, n)?;
                        }
                    }
                    Normals::FaceVarying(normals) => {
                        for n in normals {
                            write_floats(f, n)?;
                        }
                    }
                }
                match &mesh.uvs {
                    Uvs::None => writeln!(f, "\tuvs none")?,
                    Uvs::FaceVarying(uvs) => {
                        writeln!(f, "\tuvs facevarying")?;
                        for uv in uvs {
                            write_floats(f, uv)?;
                        }
                    }
                }
                if let Some(face_shaders) = &mesh.face_shaders {
                    writeln!(f, "\tface_shaders")?;
                    for index in face_shaders {
                        writeln!(f, "\t\t{}", index)?;
                    }
                }
            }
            ObjectGeometry::File { filename } => {
                writeln!(f, "\ttype file-mesh")?;
                writeln!(f, "\tname {}", Quoted(&self.name))?;
                writeln!(f, "\tfilename {}", Quoted(filename))?;
            }
        }
        write!(f, "}}")
    }
}

/// `include "PATH"`.
pub struct IncludeRecord<'a>(pub &'a str);

impl fmt::Display for IncludeRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "include \"{}\"", self.0)
    }
}
