//! Geometry encoding: host meshes to object records, mesh lights and
//! binary sidecars.

use super::material;
use super::sc::{GenericMesh, LightRecord, Normals, ObjectGeometry, ObjectRecord, ShaderRef, Uvs};
use crate::config::ExportConfig;
use crate::scene::{Mesh, SceneObject, SceneSource};
use crate::types::Rgb;
use glam::Vec3;

/// How a mesh's normals are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalMode {
    /// Every face is flat shaded.
    None,
    /// Every face is smooth: one normal per vertex.
    Vertex,
    /// Mixed shading: three normals per triangle.
    FaceVarying,
}

/// Classify a mesh's normals over all of its faces.
pub fn classify_normals(mesh: &Mesh) -> NormalMode {
    if mesh.faces.iter().all(|f| !f.smooth) {
        NormalMode::None
    } else if mesh.faces.iter().all(|f| f.smooth) {
        NormalMode::Vertex
    } else {
        NormalMode::FaceVarying
    }
}

/// Triangle indices of the whole mesh, quads split along their 0-2 diagonal.
pub fn triangulate(mesh: &Mesh) -> Vec<[u32; 3]> {
    let mut triangles = Vec::with_capacity(mesh.triangle_count());
    for face in &mesh.faces {
        triangles.extend(face.vertices.triangles());
    }
    triangles
}

/// Encode a mesh as a little-endian binary sidecar: vertex and triangle
/// counts, then positions, then triangle indices.
pub fn encode_sidecar(mesh: &Mesh) -> Vec<u8> {
    let triangles = triangulate(mesh);
    let mut data = Vec::with_capacity(8 + mesh.vertices.len() * 12 + triangles.len() * 12);

    data.extend_from_slice(&(mesh.vertices.len() as u32).to_le_bytes());
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for vertex in &mesh.vertices {
        for c in vertex.co {
            data.extend_from_slice(&c.to_le_bytes());
        }
    }
    for triangle in &triangles {
        for i in triangle {
            data.extend_from_slice(&i.to_le_bytes());
        }
    }
    data
}

/// Result of encoding one geometry object.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedGeometry {
    Object(ObjectRecord),
    /// Emissive `meshlight` geometry.
    Light(LightRecord),
    /// Oversized mesh: a file-mesh record and the sidecar bytes it points at.
    Sidecar { record: ObjectRecord, data: Vec<u8> },
}

/// Encode a mesh or surface object.
///
/// `sidecar_name` is the file name the record uses if the mesh turns out to
/// be too large to inline. Returns `None` when there is nothing to write:
/// no mesh data, an invalid mesh, or a mesh without vertices.
pub fn encode_object<S: SceneSource + ?Sized>(
    scene: &S,
    object: &SceneObject,
    config: &ExportConfig,
    sidecar_name: &str,
) -> Option<EncodedGeometry> {
    let Some(mesh) = scene.mesh(object) else {
        log::warn!("Object \"{}\" has no mesh data, skipping", object.name);
        return None;
    };
    if let Err(e) = mesh.validate() {
        log::warn!("Skipping mesh \"{}\": {}", object.name, e);
        return None;
    }
    if mesh.is_empty() {
        log::debug!("Mesh \"{}\" has no vertices", object.name);
        return None;
    }

    let triangle_count = mesh.triangle_count();
    if triangle_count > config.large_mesh_threshold {
        log::info!(
            "Large mesh \"{}\" ({} triangles), writing {}",
            object.name,
            triangle_count,
            sidecar_name
        );
        let record = ObjectRecord {
            shaders: shader_refs(mesh),
            modifiers: modifier_refs(scene, mesh),
            transform: object.matrix,
            name: object.name.clone(),
            geometry: ObjectGeometry::File {
                filename: sidecar_name.to_string(),
            },
        };
        return Some(EncodedGeometry::Sidecar {
            record,
            data: encode_sidecar(mesh),
        });
    }

    if object.is_mesh_light() {
        log::info!("Exporting mesh light \"{}\"", object.name);
        return Some(EncodedGeometry::Light(encode_mesh_light(
            scene, object, mesh, config,
        )));
    }

    log::info!("Exporting mesh \"{}\"", object.name);
    let normals = match classify_normals(mesh) {
        NormalMode::None => Normals::None,
        NormalMode::Vertex => Normals::Vertex(mesh.vertices.iter().map(|v| v.no).collect()),
        NormalMode::FaceVarying => Normals::FaceVarying(face_varying_normals(mesh)),
    };
    let face_shaders = (mesh.materials.len() > 1).then(|| {
        mesh.faces
            .iter()
            .flat_map(|f| std::iter::repeat(f.material).take(f.vertices.triangle_count()))
            .collect()
    });

    Some(EncodedGeometry::Object(ObjectRecord {
        shaders: shader_refs(mesh),
        modifiers: modifier_refs(scene, mesh),
        transform: object.matrix,
        name: object.name.clone(),
        geometry: ObjectGeometry::Generic(GenericMesh {
            points: mesh.vertices.iter().map(|v| v.co).collect(),
            triangles: triangulate(mesh),
            normals,
            uvs: face_uvs(scene, mesh),
            face_shaders,
        }),
    }))
}

fn shader_refs(mesh: &Mesh) -> Vec<ShaderRef> {
    mesh.materials
        .iter()
        .map(|name| ShaderRef::Material(name.clone()))
        .collect()
}

fn modifier_refs<S: SceneSource + ?Sized>(scene: &S, mesh: &Mesh) -> Vec<Option<String>> {
    mesh.materials
        .iter()
        .map(|name| {
            scene
                .material(name)
                .and_then(|m| material::modifier_kind(scene, m))
                .map(|_| name.clone())
        })
        .collect()
}

fn face_varying_normals(mesh: &Mesh) -> Vec<[f32; 9]> {
    let mut normals = Vec::with_capacity(mesh.triangle_count());
    for face in &mesh.faces {
        for tri in face.vertices.triangles() {
            let [a, b, c] = if face.smooth {
                tri.map(|i| mesh.vertices[i as usize].no)
            } else {
                [face.normal; 3]
            };
            normals.push([a[0], a[1], a[2], b[0], b[1], b[2], c[0], c[1], c[2]]);
        }
    }
    normals
}

/// Face-varying UVs scaled by the repeat of the first material's first
/// texture slot.
fn face_uvs<S: SceneSource + ?Sized>(scene: &S, mesh: &Mesh) -> Uvs {
    if !mesh.has_face_uv() {
        return Uvs::None;
    }
    let [tx, ty] = mesh
        .materials
        .first()
        .and_then(|name| scene.material(name))
        .and_then(|m| m.slot(0))
        .map_or([1.0, 1.0], |slot| slot.repeat);

    let mut uvs = Vec::with_capacity(mesh.triangle_count());
    for face in &mesh.faces {
        let Some(uv) = &face.uv else { continue };
        for corners in face.vertices.corner_triangles() {
            let [a, b, c] = [uv[corners[0]], uv[corners[1]], uv[corners[2]]];
            uvs.push([
                tx * a[0],
                ty * a[1],
                tx * b[0],
                ty * b[1],
                tx * c[0],
                ty * c[1],
            ]);
        }
    }
    Uvs::FaceVarying(uvs)
}

fn encode_mesh_light<S: SceneSource + ?Sized>(
    scene: &S,
    object: &SceneObject,
    mesh: &Mesh,
    config: &ExportConfig,
) -> LightRecord {
    let emit = mesh
        .materials
        .first()
        .and_then(|name| scene.material(name))
        .map_or(Rgb::WHITE, |m| m.color);

    LightRecord::MeshLight {
        name: object.name.clone(),
        emit,
        radiance: config.lights.meshlight_power,
        samples: config.lights.direct_samples,
        points: mesh
            .vertices
            .iter()
            .map(|v| object.matrix.point(Vec3::from(v.co)).to_array())
            .collect(),
        triangles: triangulate(mesh),
    }
}
