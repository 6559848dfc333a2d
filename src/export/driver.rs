//! Scene assembly: walks the host scene and writes the `.sc` files.
//!
//! A single-frame export writes a main file (settings, shaders, camera and
//! lights) that includes a separate geometry file. An animation export
//! writes a settings file once, one complete file per frame, and a small
//! script that loads both for the frame being rendered.

use super::geometry::{encode_object, EncodedGeometry};
use super::light::{map_camera, map_ibl, map_lamp};
use super::material::{default_shader, map_material, map_modifier, occlusion_override};
use super::sc::{
    BackgroundRecord, GiRecord, ImageRecord, IncludeRecord, ScWriter, TraceDepthsRecord,
};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::scene::{ObjectKind, SceneObject, SceneSource};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Extension of scene files.
pub const SCENE_EXTENSION: &str = ".sc";

/// Which files an export pass produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// The current frame, split into a main file and a geometry file.
    #[default]
    SingleFrame,
    /// Every frame of the scene's frame range.
    Animation,
}

/// Files written by an export pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    /// Every file written, in the order it was written.
    pub files: Vec<PathBuf>,
    /// Frames exported.
    pub frames: Vec<i32>,
}

/// Writes scenes with a fixed set of export options.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export `scene` to `path`. A missing `.sc` extension is added.
    ///
    /// Problems with individual entities are logged and worked around. Only
    /// I/O failures and an empty animation frame range abort the pass; files
    /// written before the failure stay on disk.
    pub fn export<S: SceneSource + ?Sized>(
        &self,
        scene: &mut S,
        path: impl AsRef<Path>,
        mode: ExportMode,
    ) -> Result<ExportSummary> {
        let path = scene_path(path.as_ref());
        match mode {
            ExportMode::SingleFrame => self.export_frame(scene, &path),
            ExportMode::Animation => self.export_animation(scene, &path),
        }
    }

    fn export_frame<S: SceneSource + ?Sized>(&self, scene: &S, path: &Path) -> Result<ExportSummary> {
        let pass = Pass {
            scene,
            config: &self.config,
        };
        let mut summary = ExportSummary {
            frames: vec![scene.current_frame()],
            ..Default::default()
        };
        let geo_path = sibling(path, ".geo.sc");

        write_file(path, &mut summary, |out, summary| {
            pass.write_settings(out)?;
            pass.write_shaders(out)?;
            pass.write_lights(out, path, summary)?;
            out.record(&IncludeRecord(&file_name(&geo_path)))?;
            Ok(())
        })?;
        write_file(&geo_path, &mut summary, |out, summary| {
            pass.write_geometry(out, &geo_path, summary)
        })?;

        log::info!("Export finished: {} files", summary.files.len());
        Ok(summary)
    }

    fn export_animation<S: SceneSource + ?Sized>(
        &self,
        scene: &mut S,
        path: &Path,
    ) -> Result<ExportSummary> {
        let (start, end) = scene.frame_range();
        if start > end {
            return Err(ExportError::InvalidFrameRange { start, end });
        }

        let mut summary = ExportSummary::default();
        let base = file_name(path);
        let base = base.strip_suffix(SCENE_EXTENSION).unwrap_or(&base);

        let script_path = sibling(path, ".java");
        log::info!("Writing frame script {:?}", script_path);
        std::fs::write(&script_path, frame_script(base))?;
        summary.files.push(script_path);

        let settings_path = sibling(path, ".settings.sc");
        write_file(&settings_path, &mut summary, |out, _| {
            Pass {
                scene: &*scene,
                config: &self.config,
            }
            .write_settings(out)
        })?;

        let guard = FrameGuard::new(scene);
        for frame in start..=end {
            guard.scene.set_current_frame(frame);
            let pass = Pass {
                scene: &*guard.scene,
                config: &self.config,
            };
            let frame_path = sibling(path, &format!(".{}.sc", frame));
            write_file(&frame_path, &mut summary, |out, summary| {
                pass.write_shaders(out)?;
                pass.write_lights(out, &frame_path, summary)?;
                pass.write_geometry(out, &frame_path, summary)
            })?;
            summary.frames.push(frame);
        }

        log::info!(
            "Export finished: {} frames, {} files",
            summary.frames.len(),
            summary.files.len()
        );
        Ok(summary)
    }
}

type Out = ScWriter<BufWriter<File>>;

/// Create `path`, fill it and record it in the summary.
fn write_file<F>(path: &Path, summary: &mut ExportSummary, fill: F) -> Result<()>
where
    F: FnOnce(&mut Out, &mut ExportSummary) -> Result<()>,
{
    log::info!("Exporting to {:?}", path);
    let mut out = ScWriter::new(BufWriter::new(File::create(path)?));
    summary.files.push(path.to_path_buf());
    fill(&mut out, summary)?;
    log::debug!("{} records written to {:?}", out.records(), path);
    out.finish()?;
    Ok(())
}

/// Restores the scene's frame cursor when dropped.
struct FrameGuard<'s, S: SceneSource + ?Sized> {
    scene: &'s mut S,
    original: i32,
}

impl<'s, S: SceneSource + ?Sized> FrameGuard<'s, S> {
    fn new(scene: &'s mut S) -> Self {
        let original = scene.current_frame();
        Self { scene, original }
    }
}

impl<S: SceneSource + ?Sized> Drop for FrameGuard<'_, S> {
    fn drop(&mut self) {
        self.scene.set_current_frame(self.original);
    }
}

/// One frame's worth of mapping over a scene.
struct Pass<'a, S: SceneSource + ?Sized> {
    scene: &'a S,
    config: &'a ExportConfig,
}

/// Objects on an active layer with more than one user.
fn exported_objects<'s, S: SceneSource + ?Sized>(
    scene: &'s S,
) -> impl Iterator<Item = &'s SceneObject> + 's {
    let layers = scene.active_layers();
    scene.objects().filter(move |o| o.is_exported(layers))
}

impl<S: SceneSource + ?Sized> Pass<'_, S> {
    fn write_settings(&self, out: &mut Out) -> Result<()> {
        let config = self.config;
        out.record(&ImageRecord {
            resolution: self.scene.resolution(),
            settings: &config.image,
        })?;
        out.record(&TraceDepthsRecord(&config.trace_depths))?;
        if let Some(gi) = GiRecord::new(&config.gi, &config.occlusion) {
            out.record(&gi)?;
        }
        if let Some(color) = config.background {
            out.record(&BackgroundRecord(color))?;
        }
        Ok(())
    }

    fn write_shaders(&self, out: &mut Out) -> Result<()> {
        out.record(&default_shader())?;
        if let Some((shader, directive)) = occlusion_override(self.config) {
            out.record(&shader)?;
            out.record(&directive)?;
        }
        for material in self.scene.materials() {
            if let Some(shader) = map_material(self.scene, material, self.config) {
                out.record(&shader)?;
            }
        }
        for material in self.scene.materials() {
            if let Some(modifier) = map_modifier(self.scene, material) {
                out.record(&modifier)?;
            }
        }
        Ok(())
    }

    /// Image-based light, camera, lamps and mesh lights.
    fn write_lights(&self, out: &mut Out, file: &Path, summary: &mut ExportSummary) -> Result<()> {
        if let Some(ibl) = map_ibl(self.scene, self.config) {
            out.record(&ibl)?;
        }
        match self.scene.active_camera() {
            Some(camera) => out.record(&map_camera(self.scene, camera, self.config))?,
            None => log::warn!("Scene has no active camera"),
        }
        for object in exported_objects(self.scene) {
            if object.kind == ObjectKind::Lamp {
                if let Some(light) = map_lamp(self.scene, object, self.config) {
                    out.record(&light)?;
                }
            } else if object.is_mesh_light() {
                self.write_object(out, object, file, summary)?;
            }
        }
        Ok(())
    }

    /// Every ordinary mesh and surface.
    fn write_geometry(&self, out: &mut Out, file: &Path, summary: &mut ExportSummary) -> Result<()> {
        for object in exported_objects(self.scene) {
            if object.is_geometry() && !object.is_mesh_light() {
                self.write_object(out, object, file, summary)?;
            }
        }
        Ok(())
    }

    fn write_object(
        &self,
        out: &mut Out,
        object: &SceneObject,
        file: &Path,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let sidecar = sibling(file, &format!("_{}.ra3", sidecar_stem(&object.name)));
        match encode_object(self.scene, object, self.config, &file_name(&sidecar)) {
            Some(EncodedGeometry::Object(record)) => out.record(&record)?,
            Some(EncodedGeometry::Light(record)) => out.record(&record)?,
            Some(EncodedGeometry::Sidecar { record, data }) => {
                std::fs::write(&sidecar, data)?;
                summary.files.push(sidecar);
                out.record(&record)?;
            }
            None => {}
        }
        Ok(())
    }
}

/// Add the `.sc` extension when missing.
pub fn scene_path(path: &Path) -> PathBuf {
    if file_name(path).ends_with(SCENE_EXTENSION) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(SCENE_EXTENSION);
        PathBuf::from(name)
    }
}

/// Path next to a scene file with its `.sc` extension replaced by `suffix`.
pub fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = file_name(path);
    let base = name.strip_suffix(SCENE_EXTENSION).unwrap_or(&name);
    path.with_file_name(format!("{}{}", base, suffix))
}

/// Object name made safe for use inside a file name.
fn sidecar_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem != name {
        log::warn!("Object \"{}\" mesh file written as \"{}\"", name, stem);
    }
    stem
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Script that makes the renderer load the settings and the current frame.
pub fn frame_script(base: &str) -> String {
    format!(
        "public void build() {{\n\tparse(\"{base}\" + \".settings.sc\");\n\tparse(\"{base}\" + \".\" + getCurrentFrame() + \".sc\");\n}}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GiMode;
    use crate::scene::{Camera, Face, FaceVertices, Lamp, LampKind, Material, MemoryScene, Mesh, Vertex};
    use crate::types::{Rgb, Transform};

    fn triangle_mesh(smooth: bool, materials: &[&str]) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]));
        mesh.add_vertex(Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]));
        mesh.add_vertex(Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]));
        mesh.add_face(Face::new(FaceVertices::Triangle([0, 1, 2])).smooth(smooth));
        mesh.materials = materials.iter().map(|m| m.to_string()).collect();
        mesh
    }

    /// Pinhole camera, a point lamp at (0, 5, 0) and a triangle named Cube.
    fn basic_scene(smooth: bool) -> MemoryScene {
        let mut scene = MemoryScene::new();
        scene.add_camera("CamData", Camera::default());
        scene.add_object(
            SceneObject::new("Camera", ObjectKind::Camera, "CamData")
                .with_matrix(Transform::from_translation([0.0, -10.0, 0.0])),
        );
        scene.camera = Some("Camera".to_string());

        let mut lamp = Lamp::new(LampKind::Point);
        lamp.color = Rgb::WHITE;
        lamp.energy = 100.0;
        scene.add_lamp("LampData", lamp);
        scene.add_object(
            SceneObject::new("Lamp", ObjectKind::Lamp, "LampData")
                .with_matrix(Transform::from_translation([0.0, 5.0, 0.0])),
        );

        scene.add_material(Material::new("sfdif_red"));
        scene.add_mesh("CubeMesh", triangle_mesh(smooth, &["sfdif_red"]));
        scene.add_object(SceneObject::new("Cube", ObjectKind::Mesh, "CubeMesh"));
        scene
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_single_frame_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);

        let summary = Exporter::default()
            .export(&mut scene, dir.path().join("scene.sc"), ExportMode::SingleFrame)
            .unwrap();

        let main_path = dir.path().join("scene.sc");
        let geo_path = dir.path().join("scene.geo.sc");
        assert_eq!(summary.files, vec![main_path.clone(), geo_path.clone()]);
        assert_eq!(summary.frames, vec![1]);

        let main = read(&main_path);
        assert!(main.starts_with("image {\n\tresolution 640 480\n"));
        assert_eq!(main.matches("camera {").count(), 1);
        assert!(main.contains("camera {\n\ttype pinhole\n"));
        assert_eq!(main.matches("light {").count(), 1);
        assert!(main.contains("\ttype point\n"));
        assert!(main.contains("\tp 0 5 0\n"));
        assert!(main.contains("\tpower 100\n"));
        assert!(main.contains("shader {\n\tname def\n"));
        assert!(main.contains("\tname \"sfdif_red.shader\"\n\ttype diffuse\n"));
        assert!(main.ends_with("include \"scene.geo.sc\"\n"));
        assert!(!main.contains("object {"));

        let geo = read(&geo_path);
        assert_eq!(geo.matches("object {").count(), 1);
        assert!(geo.contains("\tshader \"sfdif_red.shader\"\n"));
        assert!(geo.contains("\tname \"Cube\"\n"));
        assert!(geo.contains("\tpoints 3\n"));
        assert!(geo.contains("\ttriangles 1\n"));
        assert!(geo.contains("\tnormals none\n"));
    }

    #[test]
    fn test_smooth_triangle_has_vertex_normals() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(true);
        Exporter::default()
            .export(&mut scene, dir.path().join("smooth"), ExportMode::SingleFrame)
            .unwrap();

        let geo = read(&dir.path().join("smooth.geo.sc"));
        assert!(geo.contains("\tnormals vertex\n\t\t0 0 1\n\t\t0 0 1\n\t\t0 0 1\n\tuvs none\n"));
    }

    #[test]
    fn test_material_count_branching() {
        for count in [0usize, 1, 2, 5] {
            let dir = tempfile::tempdir().unwrap();
            let names: Vec<String> = (0..count).map(|i| format!("sfdif_{}", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();

            let mut scene = MemoryScene::new();
            scene.add_mesh("data", triangle_mesh(false, &refs));
            scene.add_object(SceneObject::new("Tri", ObjectKind::Mesh, "data"));
            Exporter::default()
                .export(&mut scene, dir.path().join("m.sc"), ExportMode::SingleFrame)
                .unwrap();

            let geo = read(&dir.path().join("m.geo.sc"));
            match count {
                0 => assert!(geo.contains("\tshader def\n")),
                1 => assert!(geo.contains("\tshader \"sfdif_0.shader\"\n")),
                n => {
                    assert!(geo.contains(&format!("\tshaders {}\n", n)));
                    assert!(geo.contains(&format!("\t\t\"sfdif_{}.shader\"\n", n - 1)));
                    assert!(geo.contains("\tface_shaders\n\t\t0\n}"));
                }
            }
            if count < 2 {
                assert!(!geo.contains("face_shaders"));
            }
        }
    }

    #[test]
    fn test_selection_filter_and_mesh_lights() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);
        let mut hidden = SceneObject::new("Hidden", ObjectKind::Mesh, "CubeMesh");
        hidden.layer = 2;
        scene.add_object(hidden);
        let mut orphan = SceneObject::new("Orphan", ObjectKind::Mesh, "CubeMesh");
        orphan.users = 1;
        scene.add_object(orphan);
        scene.add_object(SceneObject::new("meshlight.panel", ObjectKind::Mesh, "CubeMesh"));

        Exporter::default()
            .export(&mut scene, dir.path().join("f.sc"), ExportMode::SingleFrame)
            .unwrap();

        let main = read(&dir.path().join("f.sc"));
        assert!(main.contains("\ttype meshlight\n\tname \"meshlight.panel\"\n"));
        let geo = read(&dir.path().join("f.geo.sc"));
        assert_eq!(geo.matches("object {").count(), 1);
        assert!(!geo.contains("Hidden"));
        assert!(!geo.contains("Orphan"));
        assert!(!geo.contains("meshlight"));
    }

    #[test]
    fn test_large_mesh_writes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);
        let config = ExportConfig {
            large_mesh_threshold: 0,
            ..Default::default()
        };

        let summary = Exporter::new(config)
            .export(&mut scene, dir.path().join("big.sc"), ExportMode::SingleFrame)
            .unwrap();

        let sidecar = dir.path().join("big.geo_Cube.ra3");
        assert!(summary.files.contains(&sidecar));
        let data = std::fs::read(&sidecar).unwrap();
        assert_eq!(&data[0..8], &[3, 0, 0, 0, 1, 0, 0, 0]);

        let geo = read(&dir.path().join("big.geo.sc"));
        assert!(geo.contains("\ttype file-mesh\n\tname \"Cube\"\n\tfilename \"big.geo_Cube.ra3\"\n"));
    }

    #[test]
    fn test_settings_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);
        let mut config = ExportConfig::default();
        config.background = Some(Rgb::new(0.5, 0.5, 0.5));
        config.gi = GiMode::Path { samples: 8 };
        config.ao_override = true;

        Exporter::new(config)
            .export(&mut scene, dir.path().join("s.sc"), ExportMode::SingleFrame)
            .unwrap();

        let main = read(&dir.path().join("s.sc"));
        let order: Vec<usize> = ["image {", "trace-depths {", "gi {", "background {", "shader {", "camera {", "light {", "include"]
            .iter()
            .map(|key| main.find(key).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(main.contains("override amboccshader true"));
    }

    #[test]
    fn test_animation_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);
        scene.frames = [1, 3];
        scene.add_keyframe("Lamp", 1, Transform::from_translation([0.0, 5.0, 0.0]));
        scene.add_keyframe("Lamp", 3, Transform::from_translation([0.0, 7.0, 0.0]));
        scene.set_current_frame(2);

        let summary = Exporter::default()
            .export(&mut scene, dir.path().join("anim.sc"), ExportMode::Animation)
            .unwrap();

        assert_eq!(summary.frames, vec![1, 2, 3]);
        let names: Vec<String> = summary.files.iter().map(|p| file_name(p)).collect();
        assert_eq!(
            names,
            vec!["anim.java", "anim.settings.sc", "anim.1.sc", "anim.2.sc", "anim.3.sc"]
        );

        let script = read(&dir.path().join("anim.java"));
        assert!(script.contains("parse(\"anim\" + \".settings.sc\");"));
        assert!(script.contains("parse(\"anim\" + \".\" + getCurrentFrame() + \".sc\");"));

        let settings = read(&dir.path().join("anim.settings.sc"));
        assert!(settings.contains("image {"));
        assert!(!settings.contains("shader {"));

        let frame1 = read(&dir.path().join("anim.1.sc"));
        let frame3 = read(&dir.path().join("anim.3.sc"));
        assert!(!frame1.contains("image {"));
        assert!(!frame1.contains("include"));
        assert!(frame1.contains("camera {") && frame1.contains("object {"));
        assert!(frame1.contains("\tp 0 5 0\n"));
        assert!(frame3.contains("\tp 0 7 0\n"));

        // The cursor is back where it was
        assert_eq!(scene.current_frame(), 2);
        assert!(!dir.path().join("anim.geo.sc").exists());
    }

    #[test]
    fn test_animation_failure_restores_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);
        scene.frames = [1, 3];
        scene.set_current_frame(7);
        std::fs::create_dir(dir.path().join("anim.2.sc")).unwrap();

        let result = Exporter::default().export(&mut scene, dir.path().join("anim.sc"), ExportMode::Animation);

        assert!(matches!(result, Err(ExportError::Io(_))));
        assert_eq!(scene.current_frame(), 7);
        assert!(dir.path().join("anim.1.sc").is_file());
        assert!(!dir.path().join("anim.3.sc").exists());
    }

    #[test]
    fn test_sidecar_name_from_unsafe_object_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);
        scene.add_object(SceneObject::new("parts/\"gear\"", ObjectKind::Mesh, "CubeMesh"));
        let config = ExportConfig {
            large_mesh_threshold: 0,
            ..Default::default()
        };

        let summary = Exporter::new(config)
            .export(&mut scene, dir.path().join("big.sc"), ExportMode::SingleFrame)
            .unwrap();

        let sidecar = dir.path().join("big.geo_parts__gear_.ra3");
        assert!(summary.files.contains(&sidecar));
        assert!(sidecar.is_file());
        let geo = read(&dir.path().join("big.geo.sc"));
        assert!(geo.contains("\tname \"parts/'gear'\"\n\tfilename \"big.geo_parts__gear_.ra3\"\n"));
    }

    #[test]
    fn test_inverted_frame_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);
        scene.frames = [5, 2];

        let result = Exporter::default().export(&mut scene, dir.path().join("bad.sc"), ExportMode::Animation);
        assert!(matches!(
            result,
            Err(ExportError::InvalidFrameRange { start: 5, end: 2 })
        ));
        assert!(!dir.path().join("bad.java").exists());
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = basic_scene(false);
        let result = Exporter::default().export(
            &mut scene,
            dir.path().join("missing").join("scene.sc"),
            ExportMode::SingleFrame,
        );
        assert!(matches!(result, Err(ExportError::Io(_))));
    }

    #[test]
    fn test_scene_without_camera_or_objects() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = MemoryScene::new();
        Exporter::default()
            .export(&mut scene, dir.path().join("empty.sc"), ExportMode::SingleFrame)
            .unwrap();

        let main = read(&dir.path().join("empty.sc"));
        assert!(!main.contains("camera {"));
        assert!(main.contains("include \"empty.geo.sc\""));
        assert!(read(&dir.path().join("empty.geo.sc")).is_empty());
    }

    #[test]
    fn test_sidecar_stem() {
        assert_eq!(sidecar_stem("Cube.001"), "Cube.001");
        assert_eq!(sidecar_stem("a/b\\c:d"), "a_b_c_d");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(scene_path(Path::new("out/scene")), PathBuf::from("out/scene.sc"));
        assert_eq!(scene_path(Path::new("out/scene.sc")), PathBuf::from("out/scene.sc"));
        assert_eq!(
            sibling(Path::new("out/scene.sc"), ".geo.sc"),
            PathBuf::from("out/scene.geo.sc")
        );
        assert_eq!(
            sibling(Path::new("out/scene.4.sc"), "_Big.ra3"),
            PathBuf::from("out/scene.4_Big.ra3")
        );
    }
}
