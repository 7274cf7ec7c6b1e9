//! Replays a synthetic head-motion track through a try-on session.

use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use vto_pose::{
    app::{LoadEvent, TryOnSession},
    config::{Config, EXAMPLE_CONFIG},
    loader::DescriptorSource,
    scene::{EntityKind, MemoryScene},
    tracking::{CameraFrame, FaceMesh, FacePose, FaceSample, TrackingState},
    transform::AnchorMode,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Number of frames to replay
    #[arg(short, long, default_value = "240")]
    frames: usize,

    /// Anchoring mode (world, screen)
    #[arg(short, long)]
    mode: Option<String>,

    /// Peak head yaw of the synthetic track in radians
    #[arg(long, default_value = "0.4")]
    yaw_amplitude: f32,

    /// Directory holding model descriptors
    #[arg(long, default_value = "assets/models")]
    model_dir: String,

    /// Model to load, overrides the configuration file
    #[arg(long)]
    model: Option<String>,

    /// Frame at which tracking drops out for ten frames
    #[arg(long)]
    dropout: Option<usize>,

    /// Mirror the output for a front-facing camera
    #[arg(long)]
    mirror: bool,

    /// Show the occluder proxies
    #[arg(long)]
    debug_overlay: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Write an example configuration file and exit
    #[arg(long)]
    write_example_config: Option<String>,
}

/// Frame rate of the synthetic track
const TRACK_FPS: f32 = 60.0;

/// Head turns per second
const YAW_FREQUENCY: f32 = 0.25;

/// Face mesh grid (26 rows × 18 columns = 468 vertices)
const MESH_ROWS: usize = 26;
const MESH_COLS: usize = 18;

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if let Some(path) = &args.write_example_config {
        std::fs::write(path, EXAMPLE_CONFIG)?;
        info!("Example configuration written to {}", path);
        return Ok(());
    }

    info!("Virtual try-on pose pipeline");

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    if let Some(mode) = &args.mode {
        config.render_mode = match mode.as_str() {
            "screen" => AnchorMode::ScreenSpace,
            "world" => AnchorMode::WorldSpace,
            other => {
                warn!("Unknown mode '{}', using world-space", other);
                AnchorMode::WorldSpace
            }
        };
    }
    if args.model.is_some() {
        config.model_url = args.model.clone();
    }
    config.mirror |= args.mirror;
    config.debug_overlay |= args.debug_overlay;

    let source = Arc::new(DescriptorSource::new(&args.model_dir));
    let mut session = TryOnSession::new(config.clone(), source)?;
    session.set_on_load(|event| match event {
        LoadEvent::Loaded { url } => info!("Model ready: {}", url),
        LoadEvent::Failed { url, reason } => warn!("Model {} unavailable: {}", url, reason),
    });

    let mut scene = MemoryScene::new();
    session.setup(&mut scene)?;
    if config.model_url.is_some() && !session.wait_for_model(Duration::from_secs(5), &mut scene) {
        warn!("Continuing without a model");
    }

    let aspect = config.viewport.aspect_ratio();
    let camera = CameraFrame::new(
        Matrix4::identity(),
        Matrix4::new_perspective(aspect, 1.0, 0.01, 100.0),
    );
    let mesh = synthetic_mesh();

    let mut tracked_frames = 0usize;
    let mut left_frames = 0usize;
    let mut right_frames = 0usize;

    for frame in 0..args.frames {
        let t = frame as f32 / TRACK_FPS;
        let yaw = args.yaw_amplitude * (2.0 * PI * YAW_FREQUENCY * t).sin();
        let mut sample = synthetic_sample(yaw, t, &mesh);
        if args.dropout.is_some_and(|start| (start..start + 10).contains(&frame)) {
            sample.tracking_state = TrackingState::NotTracking;
        }

        let report = session.render_frame(Some(&sample), Some(&camera), &mut scene);
        if report.tracking {
            tracked_frames += 1;
        }
        if report.visibility.left_back_plane {
            left_frames += 1;
        }
        if report.visibility.right_back_plane {
            right_frames += 1;
        }

        if frame % 30 == 0 {
            let translation = report.transform.map(|m| Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]));
            info!(
                "Frame {:4}: yaw {:+.3} translation {:?} planes L{} R{}",
                frame,
                yaw,
                translation.map(|v| (v.x, v.y, v.z)),
                u8::from(report.visibility.left_back_plane),
                u8::from(report.visibility.right_back_plane),
            );
        }
    }

    info!(
        "Replayed {} frames: {} tracked, left plane {} frames, right plane {} frames",
        args.frames, tracked_frames, left_frames, right_frames
    );
    info!(
        "Scene: {} entities, {} model entities active, {} transform writes",
        scene.len(),
        scene.active_names(EntityKind::Model).len(),
        scene.transform_writes()
    );

    session.destroy(&mut scene);
    Ok(())
}

/// Front half of an ellipsoid roughly the size of a face, as a triangle grid
fn synthetic_mesh() -> FaceMesh {
    let mut vertices = Vec::with_capacity(MESH_ROWS * MESH_COLS);
    for row in 0..MESH_ROWS {
        let latitude = -1.0 + 2.0 * row as f32 / (MESH_ROWS - 1) as f32;
        for col in 0..MESH_COLS {
            let longitude = -1.3 + 2.6 * col as f32 / (MESH_COLS - 1) as f32;
            vertices.push(Vector3::new(
                0.075 * longitude.sin() * latitude.cos(),
                0.1 * latitude.sin(),
                0.06 * longitude.cos() * latitude.cos() - 0.03,
            ));
        }
    }

    let mut indices = Vec::with_capacity((MESH_ROWS - 1) * (MESH_COLS - 1) * 6);
    for row in 0..MESH_ROWS - 1 {
        for col in 0..MESH_COLS - 1 {
            let a = (row * MESH_COLS + col) as u16;
            let b = a + 1;
            let c = a + MESH_COLS as u16;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    FaceMesh::new(vertices, indices)
}

/// Face half a metre in front of the camera, turning and bobbing slightly
fn synthetic_sample(yaw: f32, t: f32, mesh: &FaceMesh) -> FaceSample {
    let pitch = 0.05 * (2.0 * PI * 0.4 * t).sin();
    let rotation = UnitQuaternion::from_euler_angles(pitch, yaw, 0.0).into_inner();
    let position = Vector3::new(0.0, 0.005 * (2.0 * PI * 0.8 * t).sin(), -0.5);
    FaceSample::tracked(FacePose::new(position, rotation), mesh.clone())
}
