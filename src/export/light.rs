//! Lamp and camera mapping.

use super::material::{texture_image, SlotImage};
use super::sc::{CameraRecord, LightRecord, Lens};
use crate::config::{CameraMode, ExportConfig};
use crate::scene::{Camera, Lamp, LampKind, SceneObject, SceneSource};
use glam::Vec3;

/// Sensor half-width in millimetres used to derive the field of view.
const SENSOR_HALF_WIDTH: f32 = 16.0;

/// Horizontal field of view in degrees for a focal length in millimetres.
pub fn field_of_view(lens: f32) -> f32 {
    360.0 * (SENSOR_HALF_WIDTH / lens).atan() / std::f32::consts::PI
}

/// Beam radius of a spot lamp approximated by a cylinder: the cone's
/// radius at its throw distance.
pub fn spot_radius(lamp: &Lamp) -> f32 {
    let half = (lamp.spot_size * 0.5).to_radians();
    lamp.spot_distance / half.cos() * half.sin()
}

/// Map a lamp object to a light record.
///
/// Returns `None` for lamps without data and for unsupported lamp types,
/// unless `convert_unknown_lamps` turns the latter into point lights.
pub fn map_lamp<S: SceneSource + ?Sized>(
    scene: &S,
    object: &SceneObject,
    config: &ExportConfig,
) -> Option<LightRecord> {
    let Some(lamp) = scene.lamp(object) else {
        log::warn!("Lamp \"{}\" has no lamp data, skipping", object.name);
        return None;
    };
    let lights = &config.lights;
    let m = &object.matrix;

    let point = || LightRecord::Point {
        color: lamp.color,
        power: lamp.energy * lights.lamp_power,
        position: m.origin(),
    };

    let record = match lamp.kind {
        LampKind::Point => point(),
        LampKind::Sun if lights.import_sun => LightRecord::SunSky {
            direction: m.inverse_z_axis(),
            samples: lights.direct_samples,
        },
        LampKind::Sun => point(),
        LampKind::Spot => LightRecord::Directional {
            source: m.origin(),
            target: m.point(Vec3::NEG_Z),
            radius: spot_radius(lamp),
            emit: lamp.color,
            intensity: lamp.energy * lights.lamp_power,
        },
        LampKind::Area => {
            let (x, y) = lamp.half_extents();
            let corners = [
                Vec3::new(-x, y, 0.0),
                Vec3::new(x, y, 0.0),
                Vec3::new(x, -y, 0.0),
                Vec3::new(-x, -y, 0.0),
            ];
            LightRecord::MeshLight {
                name: object.name.clone(),
                emit: lamp.color,
                radiance: lamp.energy * lights.meshlight_power,
                samples: lights.direct_samples,
                points: corners.iter().map(|&c| m.point(c).to_array()).collect(),
                triangles: vec![[0, 1, 2], [0, 2, 3]],
            }
        }
        LampKind::Hemi if lights.convert_unknown_lamps => {
            log::info!("Converting {:?} lamp \"{}\" to a point light", lamp.kind, object.name);
            point()
        }
        LampKind::Hemi => {
            log::warn!("Unsupported {:?} lamp \"{}\", skipping", lamp.kind, object.name);
            return None;
        }
    };

    log::info!("Exporting {} light \"{}\"", record.kind(), object.name);
    Some(record)
}

/// Map the camera object to a camera record.
pub fn map_camera<S: SceneSource + ?Sized>(
    scene: &S,
    object: &SceneObject,
    config: &ExportConfig,
) -> CameraRecord {
    let fallback = Camera::default();
    let camera = scene.camera(object).unwrap_or_else(|| {
        log::warn!("Camera \"{}\" has no camera data, using defaults", object.name);
        &fallback
    });

    let (width, height) = scene.resolution();
    let aspect = if height > 0 {
        width as f32 / height as f32
    } else {
        1.0
    };
    let fov = field_of_view(camera.lens);

    let lens = match &config.camera {
        CameraMode::Pinhole => Lens::Pinhole { fov, aspect },
        CameraMode::ThinLens {
            lens_radius,
            sides,
            rotation,
        } => Lens::ThinLens {
            fov,
            aspect,
            focus_distance: camera.dof_distance,
            radius: *lens_radius,
            sides: *sides,
            rotation: *rotation,
        },
        CameraMode::Spherical => Lens::Spherical,
        CameraMode::Fisheye => Lens::Fisheye,
    };

    let m = &object.matrix;
    log::info!("Exporting {} camera \"{}\"", lens.kind(), object.name);
    CameraRecord {
        lens,
        eye: m.origin(),
        target: m.point(Vec3::NEG_Z),
        up: m.vector(Vec3::Y),
    }
}

/// Image-based light from the texture named in the light settings, if the
/// scene has one backed by an image.
pub fn map_ibl<S: SceneSource + ?Sized>(scene: &S, config: &ExportConfig) -> Option<LightRecord> {
    let name = &config.lights.ibl_texture;
    match texture_image(scene, name) {
        SlotImage::Image(path) => {
            log::info!("Exporting image based light \"{}\"", path);
            Some(LightRecord::Ibl {
                image: path.to_string(),
                samples: config.lights.direct_samples,
            })
        }
        SlotImage::Missing if scene.texture(name).is_some() => {
            log::warn!("Texture \"{}\" has no usable image, no image based light", name);
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MemoryScene, ObjectKind, Texture};
    use crate::types::{Rgb, Transform};
    use glam::Mat4;

    fn lamp_scene(lamp: Lamp, matrix: Transform) -> (MemoryScene, SceneObject) {
        let mut scene = MemoryScene::new();
        scene.add_lamp("LampData", lamp);
        let object = SceneObject::new("Lamp", ObjectKind::Lamp, "LampData").with_matrix(matrix);
        scene.add_object(object.clone());
        (scene, object)
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_point_lamp() {
        let mut lamp = Lamp::new(LampKind::Point);
        lamp.energy = 100.0;
        let (scene, object) = lamp_scene(lamp, Transform::from_translation([0.0, 5.0, 0.0]));

        let mut config = ExportConfig::default();
        config.lights.lamp_power = 2.0;
        let record = map_lamp(&scene, &object, &config).unwrap();
        assert_eq!(
            record,
            LightRecord::Point {
                color: Rgb::WHITE,
                power: 200.0,
                position: Vec3::new(0.0, 5.0, 0.0)
            }
        );
        assert_eq!(
            record.to_string(),
            "light {\n\ttype point\n\tcolor { \"sRGB nonlinear\" 1 1 1 }\n\tpower 200\n\tp 0 5 0\n}"
        );
    }

    #[test]
    fn test_sun_lamp() {
        let rotation = Transform(Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let (scene, object) = lamp_scene(Lamp::new(LampKind::Sun), rotation);

        let config = ExportConfig::default();
        match map_lamp(&scene, &object, &config) {
            Some(LightRecord::SunSky { direction, samples }) => {
                assert!(approx(direction, Vec3::new(0.0, -1.0, 0.0)));
                assert_eq!(samples, 16);
            }
            other => panic!("expected sunsky, got {:?}", other),
        }

        let mut config = ExportConfig::default();
        config.lights.import_sun = false;
        assert!(matches!(
            map_lamp(&scene, &object, &config),
            Some(LightRecord::Point { .. })
        ));
    }

    #[test]
    fn test_spot_lamp_cylinder() {
        let mut lamp = Lamp::new(LampKind::Spot);
        lamp.spot_size = 90.0;
        lamp.spot_distance = 10.0;
        let (scene, object) = lamp_scene(lamp, Transform::from_translation([1.0, 2.0, 3.0]));

        match map_lamp(&scene, &object, &ExportConfig::default()) {
            Some(LightRecord::Directional {
                source,
                target,
                radius,
                ..
            }) => {
                assert_eq!(source, Vec3::new(1.0, 2.0, 3.0));
                assert_eq!(target, Vec3::new(1.0, 2.0, 2.0));
                // tan(45 degrees) * 10
                assert!((radius - 10.0).abs() < 1e-4);
            }
            other => panic!("expected directional light, got {:?}", other),
        }
    }

    #[test]
    fn test_area_lamp_corners() {
        let mut lamp = Lamp::new(LampKind::Area);
        lamp.area_size = 2.0;
        lamp.area_size_y = Some(4.0);
        lamp.energy = 3.0;
        let (scene, object) = lamp_scene(lamp, Transform::from_translation([0.0, 0.0, 10.0]));

        let mut config = ExportConfig::default();
        config.lights.meshlight_power = 2.0;
        match map_lamp(&scene, &object, &config) {
            Some(LightRecord::MeshLight {
                name,
                radiance,
                points,
                triangles,
                ..
            }) => {
                assert_eq!(name, "Lamp");
                assert_eq!(radiance, 6.0);
                assert_eq!(
                    points,
                    vec![
                        [-1.0, 2.0, 10.0],
                        [1.0, 2.0, 10.0],
                        [1.0, -2.0, 10.0],
                        [-1.0, -2.0, 10.0]
                    ]
                );
                assert_eq!(triangles, vec![[0, 1, 2], [0, 2, 3]]);
            }
            other => panic!("expected mesh light, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_lamp() {
        let (scene, object) = lamp_scene(Lamp::new(LampKind::Hemi), Transform::IDENTITY);
        assert!(map_lamp(&scene, &object, &ExportConfig::default()).is_none());

        let mut config = ExportConfig::default();
        config.lights.convert_unknown_lamps = true;
        assert!(matches!(
            map_lamp(&scene, &object, &config),
            Some(LightRecord::Point { .. })
        ));
    }

    #[test]
    fn test_field_of_view() {
        // 32mm sensor at 16mm focal length sees 90 degrees
        assert!((field_of_view(16.0) - 90.0).abs() < 1e-4);
        assert!(field_of_view(50.0) < field_of_view(35.0));
    }

    fn camera_scene() -> (MemoryScene, SceneObject) {
        let mut scene = MemoryScene::new();
        scene.resolution = [800, 400];
        scene.add_camera("CamData", Camera { lens: 16.0, dof_distance: 7.5 });
        let object = SceneObject::new("Camera", ObjectKind::Camera, "CamData")
            .with_matrix(Transform::from_translation([0.0, 0.0, 5.0]));
        scene.add_object(object.clone());
        (scene, object)
    }

    #[test]
    fn test_pinhole_camera() {
        let (scene, object) = camera_scene();
        let record = map_camera(&scene, &object, &ExportConfig::default());

        assert_eq!(record.eye, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(record.target, Vec3::new(0.0, 0.0, 4.0));
        // The up vector ignores translation
        assert_eq!(record.up, Vec3::Y);
        match record.lens {
            Lens::Pinhole { fov, aspect } => {
                assert!((fov - 90.0).abs() < 1e-4);
                assert_eq!(aspect, 2.0);
            }
            other => panic!("expected pinhole, got {:?}", other),
        }
    }

    #[test]
    fn test_camera_modes() {
        let (scene, object) = camera_scene();
        let mut config = ExportConfig::default();

        config.camera = CameraMode::ThinLens {
            lens_radius: 0.1,
            sides: 0,
            rotation: 0.0,
        };
        let text = map_camera(&scene, &object, &config).to_string();
        assert!(text.contains("\tfdist 7.5\n\tlensr 0.1\n}"));

        config.camera = CameraMode::Spherical;
        let text = map_camera(&scene, &object, &config).to_string();
        assert!(text.contains("\ttype spherical\n"));
        assert!(!text.contains("fov"));

        config.camera = CameraMode::Fisheye;
        assert_eq!(map_camera(&scene, &object, &config).lens, Lens::Fisheye);
    }

    #[test]
    fn test_ibl_light() {
        let mut scene = MemoryScene::new();
        let config = ExportConfig::default();
        assert!(map_ibl(&scene, &config).is_none());

        scene.add_texture("ibllight", Texture::image("sky/env.hdr"));
        let text = map_ibl(&scene, &config).unwrap().to_string();
        assert!(text.contains("\ttype ibl\n\timage \"sky/env.hdr\"\n\tcenter 1 0 0\n"));
        assert!(text.contains("\tsamples 16\n"));

        scene.add_texture("ibllight", Texture::Procedural);
        assert!(map_ibl(&scene, &config).is_none());
    }
}
