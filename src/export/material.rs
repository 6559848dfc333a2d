//! Material mapping.
//!
//! A material's shader kind is encoded in its name: an optional `sf` prefix
//! followed by a three letter code (`sfdif_red`, `pho_plastic`, `uber_car`).
//! [`classify`] turns the name, the texture slots and the raytracing flags
//! into a [`ShaderClass`] once, and [`map_material`] builds the record from
//! it.

use super::sc::{
    BlendTexture, ModifierKind, ModifierRecord, OverrideRecord, ShaderBody, ShaderRecord,
    ShaderRef, Surface,
};
use crate::config::ExportConfig;
use crate::scene::{Material, SceneSource, Texture, TextureSlot};
use crate::types::Rgb;

/// Slot holding the diffuse (or primary) texture.
pub const DIFFUSE_SLOT: usize = 0;
/// Slot holding the bump or normal map.
pub const MODIFIER_SLOT: usize = 1;
/// Slot holding the uber shader's specular texture.
pub const SPECULAR_SLOT: usize = 2;

const PHONG_SAMPLES: u32 = 4;
const WARD_SAMPLES: u32 = 4;
const WARD_ROUGHNESS: (f32, f32) = (0.2, 0.1);
const UBER_GLOSSY: f32 = 0.1;
const UBER_SAMPLES: u32 = 4;
const GLASS_ABSORPTION_DISTANCE: f32 = 5.0;

/// Shader kind requested by a material name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialTag {
    Uber,
    AmbientOcclusion,
    Diffuse,
    Phong,
    Ward,
    Shiny,
    Mirror,
    Glass,
    Constant,
    /// No known prefix.
    Unknown,
}

impl MaterialTag {
    /// Read the tag from a material name.
    pub fn from_name(name: &str) -> Self {
        let code = name.strip_prefix("sf").unwrap_or(name);
        match code.get(..3) {
            Some("ube") => MaterialTag::Uber,
            Some("amb") => MaterialTag::AmbientOcclusion,
            Some("dif") => MaterialTag::Diffuse,
            Some("pho") => MaterialTag::Phong,
            Some("war") => MaterialTag::Ward,
            Some("shi") => MaterialTag::Shiny,
            Some("mir") => MaterialTag::Mirror,
            Some("gla") => MaterialTag::Glass,
            Some("con") => MaterialTag::Constant,
            _ => MaterialTag::Unknown,
        }
    }
}

/// What a texture slot resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotImage<'a> {
    /// An image file the renderer can load.
    Image(&'a str),
    /// Bound, but the texture or its image cannot be found.
    Missing,
    /// Bound to a texture with no image behind it.
    NotImage,
}

/// Resolve the image behind a texture slot.
pub fn slot_image<'a, S: SceneSource + ?Sized>(scene: &'a S, slot: &TextureSlot) -> SlotImage<'a> {
    texture_image(scene, &slot.texture)
}

/// Resolve the image behind a named texture. The path must carry an
/// extension of a known image format.
pub fn texture_image<'a, S: SceneSource + ?Sized>(scene: &'a S, name: &str) -> SlotImage<'a> {
    match scene.texture(name) {
        None => SlotImage::Missing,
        Some(Texture::Procedural) => SlotImage::NotImage,
        Some(texture) => match texture.image_path() {
            Some(path) if image::ImageFormat::from_path(path).is_ok() => SlotImage::Image(path),
            _ => SlotImage::Missing,
        },
    }
}

/// The shader variant selected for a material.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderClass<'a> {
    /// Multi-channel shader. Each channel carries its texture path and blend
    /// factor when the slot resolves to an image.
    Uber {
        diffuse: Option<(&'a str, f32)>,
        specular: Option<(&'a str, f32)>,
    },
    /// Texture-driven variant of `Diffuse`, `AmbientOcclusion`, `Phong`,
    /// `Ward` or `Shiny`.
    Textured { tag: MaterialTag, path: &'a str },
    /// The diffuse slot is bound but its image cannot be resolved.
    MissingTexture,
    /// Flat-color variant. Never `Unknown` or `Uber`.
    Flat(MaterialTag),
}

/// Select the shader variant for a material. First match wins: uber prefix,
/// diffuse slot image, flat color by prefix and raytracing flags.
pub fn classify<'a, S: SceneSource + ?Sized>(scene: &'a S, material: &Material) -> ShaderClass<'a> {
    let tag = MaterialTag::from_name(&material.name);

    if tag == MaterialTag::Uber {
        let channel = |index: usize| {
            let slot = material.slot(index)?;
            match slot_image(scene, slot) {
                SlotImage::Image(path) => Some((path, slot)),
                SlotImage::Missing => {
                    log::warn!(
                        "Texture \"{}\" of material \"{}\" has no image, using flat color",
                        slot.texture,
                        material.name
                    );
                    None
                }
                SlotImage::NotImage => None,
            }
        };
        return ShaderClass::Uber {
            diffuse: channel(DIFFUSE_SLOT).map(|(p, s)| (p, s.color_factor)),
            specular: channel(SPECULAR_SLOT).map(|(p, s)| (p, s.specular_factor)),
        };
    }

    if let Some(slot) = material.slot(DIFFUSE_SLOT) {
        match slot_image(scene, slot) {
            SlotImage::Image(path) => {
                let tag = match tag {
                    MaterialTag::AmbientOcclusion
                    | MaterialTag::Phong
                    | MaterialTag::Ward
                    | MaterialTag::Shiny => tag,
                    _ => MaterialTag::Diffuse,
                };
                return ShaderClass::Textured { tag, path };
            }
            SlotImage::Missing => return ShaderClass::MissingTexture,
            SlotImage::NotImage => {}
        }
    }

    let modes = material.modes;
    ShaderClass::Flat(match tag {
        MaterialTag::Shiny | MaterialTag::Mirror if !modes.ray_mirror => MaterialTag::Diffuse,
        MaterialTag::Glass if !modes.ray_transparency => MaterialTag::Diffuse,
        MaterialTag::Unknown | MaterialTag::Uber => MaterialTag::Diffuse,
        tag => tag,
    })
}

/// Build the shader record for a material. Materials nothing references get
/// no record.
pub fn map_material<S: SceneSource + ?Sized>(
    scene: &S,
    material: &Material,
    config: &ExportConfig,
) -> Option<ShaderRecord> {
    if material.users == 0 {
        log::debug!("Material \"{}\" is unused, skipping", material.name);
        return None;
    }

    let class = classify(scene, material);
    let body = match class {
        ShaderClass::Uber { diffuse, specular } => ShaderBody::Uber {
            diff: material.color,
            diff_texture: diffuse.map(|(path, blend)| BlendTexture {
                path: path.to_string(),
                blend,
            }),
            spec: material.spec_color,
            spec_texture: specular.map(|(path, blend)| BlendTexture {
                path: path.to_string(),
                blend,
            }),
            glossy: UBER_GLOSSY,
            samples: UBER_SAMPLES,
        },
        ShaderClass::Textured { tag, path } => {
            surface_body(tag, Surface::Texture(path.to_string()), material, config)
        }
        ShaderClass::MissingTexture => {
            log::warn!(
                "Material \"{}\" references a texture without a usable image, exporting as diffuse",
                material.name
            );
            ShaderBody::Diffuse {
                diff: Surface::Color(material.color),
            }
        }
        ShaderClass::Flat(tag) => surface_body(tag, Surface::Color(material.color), material, config),
    };

    log::info!("Exporting {} shader \"{}\"", body.kind(), material.name);
    Some(ShaderRecord {
        name: ShaderRef::Material(material.name.clone()),
        body,
    })
}

fn surface_body(
    tag: MaterialTag,
    diff: Surface,
    material: &Material,
    config: &ExportConfig,
) -> ShaderBody {
    match tag {
        MaterialTag::AmbientOcclusion => ShaderBody::AmbientOcclusion {
            bright: diff,
            dark: material.spec_color,
            samples: config.occlusion.samples,
            distance: config.occlusion.distance,
        },
        MaterialTag::Phong => ShaderBody::Phong {
            diff,
            spec: material.spec_color,
            power: material.hardness,
            samples: PHONG_SAMPLES,
        },
        MaterialTag::Ward => ShaderBody::Ward {
            diff,
            spec: material.spec_color,
            rough: WARD_ROUGHNESS,
            samples: WARD_SAMPLES,
        },
        MaterialTag::Shiny => ShaderBody::Shiny {
            diff,
            refl: material.mirror,
        },
        MaterialTag::Mirror => ShaderBody::Mirror {
            refl: Rgb::splat(material.mirror),
        },
        MaterialTag::Glass => ShaderBody::Glass {
            eta: material.ior,
            color: material.color,
            absorption_distance: GLASS_ABSORPTION_DISTANCE,
            absorption_color: Rgb::WHITE,
        },
        MaterialTag::Constant => ShaderBody::Constant {
            color: material.color,
        },
        MaterialTag::Diffuse | MaterialTag::Uber | MaterialTag::Unknown => {
            ShaderBody::Diffuse { diff }
        }
    }
}

/// The `def` shader used by objects without materials.
pub fn default_shader() -> ShaderRecord {
    ShaderRecord {
        name: ShaderRef::Default,
        body: ShaderBody::Diffuse {
            diff: Surface::Color(Rgb::WHITE),
        },
    }
}

/// The scene-wide ambient occlusion shader and the directive forcing every
/// surface through it.
pub fn occlusion_override(config: &ExportConfig) -> Option<(ShaderRecord, OverrideRecord)> {
    if !config.ao_override {
        return None;
    }
    let o = &config.occlusion;
    let shader = ShaderRecord {
        name: ShaderRef::Occlusion,
        body: ShaderBody::AmbientOcclusion {
            bright: Surface::Color(o.bright),
            dark: o.dark,
            samples: o.samples,
            distance: o.distance,
        },
    };
    let directive = OverrideRecord {
        shader: ShaderRef::Occlusion,
        photons: true,
    };
    Some((shader, directive))
}

/// Surface modifier of a material, without logging. Unused materials have none,
/// so objects never reference a modifier that was not written.
pub fn modifier_kind<S: SceneSource + ?Sized>(scene: &S, material: &Material) -> Option<ModifierKind> {
    if material.users == 0 {
        return None;
    }
    let slot = material.slot(MODIFIER_SLOT)?;
    let SlotImage::Image(path) = slot_image(scene, slot) else {
        return None;
    };
    if slot.normal_map {
        Some(ModifierKind::NormalMap {
            texture: path.to_string(),
        })
    } else if slot.normal_factor != 0.0 {
        Some(ModifierKind::Bump {
            texture: path.to_string(),
            scale: slot.normal_factor,
        })
    } else {
        None
    }
}

/// Build the modifier record for a material's bump or normal map slot.
pub fn map_modifier<S: SceneSource + ?Sized>(
    scene: &S,
    material: &Material,
) -> Option<ModifierRecord> {
    if material.users == 0 {
        return None;
    }
    let slot = material.slot(MODIFIER_SLOT)?;
    if slot_image(scene, slot) == SlotImage::Missing {
        log::warn!(
            "Modifier texture \"{}\" of material \"{}\" has no image, skipping",
            slot.texture,
            material.name
        );
        return None;
    }
    let kind = modifier_kind(scene, material)?;
    log::info!("Exporting modifier \"{}\"", material.name);
    Some(ModifierRecord {
        material: material.name.clone(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MaterialModes, MemoryScene};

    fn scene_with_textures() -> MemoryScene {
        let mut scene = MemoryScene::new();
        scene.add_texture("wood", Texture::image("textures/wood.png"));
        scene.add_texture("gloss", Texture::image("textures/gloss.jpg"));
        scene.add_texture("lost", Texture::Image { path: None });
        scene.add_texture("noise", Texture::Procedural);
        scene
    }

    fn body(scene: &MemoryScene, material: &Material) -> ShaderBody {
        map_material(scene, material, &ExportConfig::default())
            .unwrap()
            .body
    }

    #[test]
    fn test_tag_from_name() {
        assert_eq!(MaterialTag::from_name("sfmir_test"), MaterialTag::Mirror);
        assert_eq!(MaterialTag::from_name("mir_test"), MaterialTag::Mirror);
        assert_eq!(MaterialTag::from_name("sfuber_car"), MaterialTag::Uber);
        assert_eq!(MaterialTag::from_name("sfambocc"), MaterialTag::AmbientOcclusion);
        assert_eq!(MaterialTag::from_name("Material.001"), MaterialTag::Unknown);
        assert_eq!(MaterialTag::from_name("sf"), MaterialTag::Unknown);
        assert_eq!(MaterialTag::from_name(""), MaterialTag::Unknown);
    }

    #[test]
    fn test_mirror_requires_flag() {
        let scene = MemoryScene::new();
        let mut mat = Material::new("sfmir_test");
        mat.mirror = 0.75;

        assert_eq!(
            body(&scene, &mat),
            ShaderBody::Diffuse {
                diff: Surface::Color(mat.color)
            }
        );

        mat.modes = MaterialModes {
            ray_mirror: true,
            ray_transparency: false,
        };
        let record = map_material(&scene, &mat, &ExportConfig::default()).unwrap();
        assert_eq!(
            record.body,
            ShaderBody::Mirror {
                refl: Rgb::splat(0.75)
            }
        );
        assert!(record
            .to_string()
            .contains("\trefl { \"sRGB nonlinear\" 0.75 0.75 0.75 }\n"));
    }

    #[test]
    fn test_glass_and_shiny_flags() {
        let scene = MemoryScene::new();
        let mut glass = Material::new("sfgla_window");
        glass.ior = 1.5;
        assert_eq!(classify(&scene, &glass), ShaderClass::Flat(MaterialTag::Diffuse));
        glass.modes.ray_transparency = true;
        assert!(matches!(body(&scene, &glass), ShaderBody::Glass { eta, .. } if eta == 1.5));

        let mut shiny = Material::new("sfshi_chrome");
        assert_eq!(classify(&scene, &shiny), ShaderClass::Flat(MaterialTag::Diffuse));
        shiny.modes.ray_mirror = true;
        assert_eq!(classify(&scene, &shiny), ShaderClass::Flat(MaterialTag::Shiny));
    }

    #[test]
    fn test_flat_variants() {
        let scene = MemoryScene::new();
        let mut amb = Material::new("sfamb_room");
        amb.color = Rgb::new(0.9, 0.9, 0.9);
        amb.spec_color = Rgb::new(0.1, 0.1, 0.1);
        assert_eq!(
            body(&scene, &amb),
            ShaderBody::AmbientOcclusion {
                bright: Surface::Color(Rgb::new(0.9, 0.9, 0.9)),
                dark: Rgb::new(0.1, 0.1, 0.1),
                samples: 32,
                distance: 0.0,
            }
        );

        let mut phong = Material::new("sfpho_plastic");
        phong.hardness = 80;
        assert!(matches!(body(&scene, &phong), ShaderBody::Phong { power: 80, samples: 4, .. }));

        assert!(matches!(
            body(&scene, &Material::new("sfcon_sky")),
            ShaderBody::Constant { .. }
        ));
        assert!(matches!(
            body(&scene, &Material::new("Material")),
            ShaderBody::Diffuse { .. }
        ));
    }

    #[test]
    fn test_textured_variants() {
        let scene = scene_with_textures();
        let slot = TextureSlot::new("wood");

        let phong = Material::new("sfpho_wood").with_slot(0, slot.clone());
        assert_eq!(
            classify(&scene, &phong),
            ShaderClass::Textured {
                tag: MaterialTag::Phong,
                path: "textures/wood.png"
            }
        );

        // Mirror has no textured form
        let mirror = Material::new("sfmir_wood").with_slot(0, slot.clone());
        assert_eq!(
            classify(&scene, &mirror),
            ShaderClass::Textured {
                tag: MaterialTag::Diffuse,
                path: "textures/wood.png"
            }
        );

        let text = map_material(&scene, &phong, &ExportConfig::default())
            .unwrap()
            .to_string();
        assert!(text.contains("\ttype phong\n\ttexture \"textures/wood.png\"\n\tspec "));
    }

    #[test]
    fn test_missing_texture_falls_back_to_diffuse() {
        let scene = scene_with_textures();
        for texture in ["lost", "not-in-scene"] {
            let mat = Material::new("sfpho_broken").with_slot(0, TextureSlot::new(texture));
            assert_eq!(classify(&scene, &mat), ShaderClass::MissingTexture);
            assert_eq!(
                body(&scene, &mat),
                ShaderBody::Diffuse {
                    diff: Surface::Color(mat.color)
                }
            );
        }
    }

    #[test]
    fn test_procedural_texture_uses_flat_rules() {
        let scene = scene_with_textures();
        let mat = Material::new("sfpho_noise").with_slot(0, TextureSlot::new("noise"));
        assert_eq!(classify(&scene, &mat), ShaderClass::Flat(MaterialTag::Phong));
    }

    #[test]
    fn test_uber_channels() {
        let scene = scene_with_textures();
        let mut diffuse = TextureSlot::new("wood");
        diffuse.color_factor = 0.5;
        let mut specular = TextureSlot::new("gloss");
        specular.specular_factor = 0.25;
        let mat = Material::new("sfuber_car")
            .with_slot(0, diffuse)
            .with_slot(2, specular);

        let text = map_material(&scene, &mat, &ExportConfig::default())
            .unwrap()
            .to_string();
        assert!(text.contains("\ttype uber\n"));
        assert!(text.contains("\tdiff.texture \"textures/wood.png\"\n\tdiff.blend 0.5\n"));
        assert!(text.contains("\tspec.texture \"textures/gloss.jpg\"\n\tspec.blend 0.25\n"));

        // Unresolvable specular image falls back to the flat color
        let mat = Material::new("uber_car")
            .with_slot(0, TextureSlot::new("wood"))
            .with_slot(2, TextureSlot::new("lost"));
        assert_eq!(
            classify(&scene, &mat),
            ShaderClass::Uber {
                diffuse: Some(("textures/wood.png", 1.0)),
                specular: None
            }
        );
    }

    #[test]
    fn test_unused_material_skipped() {
        let scene = MemoryScene::new();
        let mut mat = Material::new("sfdif_unused");
        mat.users = 0;
        assert!(map_material(&scene, &mat, &ExportConfig::default()).is_none());
    }

    #[test]
    fn test_modifiers() {
        let scene = scene_with_textures();

        let mut bump = TextureSlot::new("wood");
        bump.normal_factor = 0.5;
        let mat = Material::new("sfdif_bumpy").with_slot(1, bump);
        let record = map_modifier(&scene, &mat).unwrap();
        assert_eq!(
            record.kind,
            ModifierKind::Bump {
                texture: "textures/wood.png".to_string(),
                scale: 0.5
            }
        );
        assert!(record.to_string().contains("\tname \"sfdif_bumpy.modifier\"\n\ttype bump\n"));

        let mut normal = TextureSlot::new("gloss");
        normal.normal_map = true;
        let mat = Material::new("sfdif_normal").with_slot(1, normal);
        assert!(matches!(
            modifier_kind(&scene, &mat),
            Some(ModifierKind::NormalMap { .. })
        ));

        // A bump slot with zero strength does nothing
        let mat = Material::new("sfdif_flat").with_slot(1, TextureSlot::new("wood"));
        assert!(map_modifier(&scene, &mat).is_none());

        let mat = Material::new("sfdif_lost").with_slot(1, TextureSlot::new("lost"));
        assert!(map_modifier(&scene, &mat).is_none());
    }

    #[test]
    fn test_unused_material_has_no_modifier() {
        let scene = scene_with_textures();
        let mut bump = TextureSlot::new("wood");
        bump.normal_factor = 0.5;
        let mut mat = Material::new("sfdif_bumpy").with_slot(1, bump);
        mat.users = 0;
        assert!(modifier_kind(&scene, &mat).is_none());
        assert!(map_modifier(&scene, &mat).is_none());
    }

    #[test]
    fn test_default_and_override_shaders() {
        assert_eq!(
            default_shader().to_string(),
            "shader {\n\tname def\n\ttype diffuse\n\tdiff { \"sRGB nonlinear\" 1 1 1 }\n}"
        );

        let mut config = ExportConfig::default();
        assert!(occlusion_override(&config).is_none());
        config.ao_override = true;
        let (shader, directive) = occlusion_override(&config).unwrap();
        assert!(shader.to_string().contains("\tname amboccshader\n\ttype amb-occ\n"));
        assert_eq!(directive.to_string(), "override amboccshader true");
    }
}
