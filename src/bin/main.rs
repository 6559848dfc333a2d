//! Sunflow Exporter CLI
//!
//! Export JSON scene descriptions to Sunflow scene files.

use clap::{Parser, Subcommand, ValueEnum};
use sunflow_exporter::{
    CameraMode, ExportConfig, ExportMode, Exporter, GiMode, MemoryScene, ObjectKind,
    RendererSettings, SceneSource,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sunflow-exporter")]
#[command(author, version, about = "Export 3D scenes to Sunflow scene files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene description to .sc files
    Export {
        /// Input JSON scene description
        #[arg(short, long)]
        scene: PathBuf,

        /// Output scene file (".sc" is added when missing)
        #[arg(short, long)]
        output: PathBuf,

        /// TOML file with export options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Export every frame of the scene's frame range
        #[arg(long)]
        animation: bool,

        /// Camera lens, overriding the config file
        #[arg(long, value_enum)]
        camera: Option<CameraArg>,

        /// Global illumination engine, overriding the config file
        #[arg(long, value_enum)]
        gi: Option<GiArg>,

        /// Render every surface with the ambient occlusion shader
        #[arg(long)]
        ao_override: bool,

        /// Minimum anti-aliasing level
        #[arg(long, allow_hyphen_values = true)]
        min_aa: Option<i32>,

        /// Maximum anti-aliasing level
        #[arg(long, allow_hyphen_values = true)]
        max_aa: Option<i32>,
    },

    /// Show information about a scene description
    Info {
        /// Input JSON scene description
        #[arg(short, long)]
        scene: PathBuf,
    },

    /// Show or update the renderer settings file
    Settings {
        /// Settings file
        #[arg(short, long, default_value = "sunflow-settings.toml")]
        file: PathBuf,

        /// Path to the renderer
        #[arg(long)]
        renderer_path: Option<String>,

        /// Java heap limit in megabytes
        #[arg(long)]
        memory_mb: Option<u32>,

        /// Render threads (0 for one per core)
        #[arg(long)]
        threads: Option<u32>,

        /// Path to the Java runtime
        #[arg(long)]
        java_path: Option<String>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CameraArg {
    Pinhole,
    /// Depth of field, using the lens radius from the config file
    Thinlens,
    Spherical,
    Fisheye,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum GiArg {
    None,
    Ambocc,
    Path,
}

const DEFAULT_LENS_RADIUS: f32 = 1.0;
const DEFAULT_PATH_SAMPLES: u32 = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            scene,
            output,
            config,
            animation,
            camera,
            gi,
            ao_override,
            min_aa,
            max_aa,
        } => {
            let mut export_config = match config {
                Some(path) => ExportConfig::load(&path)?,
                None => ExportConfig::default(),
            };
            if let Some(camera) = camera {
                export_config.camera = camera_mode(camera, &export_config.camera);
            }
            if let Some(gi) = gi {
                export_config.gi = match gi {
                    GiArg::None => GiMode::None,
                    GiArg::Ambocc => GiMode::AmbientOcclusion,
                    GiArg::Path => GiMode::Path {
                        samples: DEFAULT_PATH_SAMPLES,
                    },
                };
            }
            export_config.ao_override |= ao_override;
            if let Some(min_aa) = min_aa {
                export_config.image.min_aa = min_aa;
            }
            if let Some(max_aa) = max_aa {
                export_config.image.max_aa = max_aa;
            }

            let mode = if animation {
                ExportMode::Animation
            } else {
                ExportMode::SingleFrame
            };
            export(&scene, &output, export_config, mode)?;
        }
        Commands::Info { scene } => {
            show_scene_info(&scene)?;
        }
        Commands::Settings {
            file,
            renderer_path,
            memory_mb,
            threads,
            java_path,
        } => {
            let mut settings = RendererSettings::load_or_default(&file)?;
            let changed = renderer_path.is_some()
                || memory_mb.is_some()
                || threads.is_some()
                || java_path.is_some();
            if let Some(v) = renderer_path {
                settings.renderer_path = v;
            }
            if let Some(v) = memory_mb {
                settings.memory_mb = v;
            }
            if let Some(v) = threads {
                settings.threads = v;
            }
            if let Some(v) = java_path {
                settings.java_path = v;
            }
            if changed {
                settings.save(&file)?;
                println!("Saved settings to {:?}", file);
            }
            println!("Renderer: {}", settings.renderer_path);
            println!("Memory: {} MB", settings.memory_mb);
            println!("Threads: {}", settings.threads);
            println!("Java: {}", settings.java_path);
        }
    }

    Ok(())
}

/// Keep thin lens parameters from the config file when the lens is chosen
/// on the command line.
fn camera_mode(arg: CameraArg, current: &CameraMode) -> CameraMode {
    match arg {
        CameraArg::Pinhole => CameraMode::Pinhole,
        CameraArg::Thinlens => match current {
            CameraMode::ThinLens { .. } => current.clone(),
            _ => CameraMode::ThinLens {
                lens_radius: DEFAULT_LENS_RADIUS,
                sides: 0,
                rotation: 0.0,
            },
        },
        CameraArg::Spherical => CameraMode::Spherical,
        CameraArg::Fisheye => CameraMode::Fisheye,
    }
}

fn export(
    scene_path: &PathBuf,
    output: &PathBuf,
    config: ExportConfig,
    mode: ExportMode,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene from {:?}...", scene_path);
    let mut scene = MemoryScene::load(scene_path)?;
    println!(
        "  Found {} objects, {} materials",
        scene.objects.len(),
        scene.materials.len()
    );

    let summary = Exporter::new(config).export(&mut scene, output, mode)?;

    println!("Exported {} frame(s):", summary.frames.len());
    for file in &summary.files {
        println!("  {:?}", file);
    }
    Ok(())
}

fn show_scene_info(scene_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene from {:?}...", scene_path);
    let scene = MemoryScene::load(scene_path)?;

    let count = |kind: ObjectKind| scene.objects().filter(|o| o.kind == kind).count();
    let (width, height) = scene.resolution();
    let (start, end) = scene.frame_range();

    println!("\nScene Info:");
    println!("  Resolution: {}x{}", width, height);
    println!("  Frames: {}..={} (current {})", start, end, scene.current_frame());
    println!("  Objects: {} ({} exported)", scene.objects.len(), scene.exported_object_count());
    println!("    Meshes: {}", count(ObjectKind::Mesh) + count(ObjectKind::Surface));
    println!("    Mesh lights: {}", scene.objects().filter(|o| o.is_mesh_light()).count());
    println!("    Lamps: {}", count(ObjectKind::Lamp));
    println!("    Cameras: {}", count(ObjectKind::Camera));
    println!("  Materials: {}", scene.materials.len());
    println!("  Textures: {}", scene.textures.len());
    match scene.active_camera() {
        Some(camera) => println!("  Active camera: {}", camera.name),
        None => println!("  Active camera: none"),
    }

    Ok(())
}
