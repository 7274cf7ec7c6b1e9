//! Benchmarks for the per-frame pose pipeline

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};
use vto_pose::app::TryOnSession;
use vto_pose::config::Config;
use vto_pose::filters::{KalmanFilter, PositionFilter, QuaternionKalmanFilter};
use vto_pose::loader::{BoundingBox, ModelData, ModelSource};
use vto_pose::occlusion::OcclusionController;
use vto_pose::scene::MemoryScene;
use vto_pose::tracking::{CameraFrame, FaceMesh, FacePose, FaceSample};
use vto_pose::transform::{AnchorMode, PipelineParams, PosePipeline};
use vto_pose::Result;

struct StaticSource;

impl ModelSource for StaticSource {
    fn fetch(&self, url: &str) -> Result<ModelData> {
        Ok(ModelData {
            url: url.to_string(),
            parts: vec!["frame".to_string(), "lenses".to_string()],
            bounds: BoundingBox {
                min: [-70.0, -20.0, -5.0],
                max: [70.0, 20.0, 140.0],
            },
        })
    }
}

/// Face mesh with the given vertex count laid out on a grid
fn grid_mesh(vertex_count: usize) -> FaceMesh {
    let cols = 18;
    let rows = vertex_count / cols;
    let vertices = (0..rows * cols)
        .map(|i| {
            let (row, col) = ((i / cols) as f32, (i % cols) as f32);
            Vector3::new(0.008 * col - 0.07, 0.008 * row - 0.1, -0.03 + 0.0005 * (row + col))
        })
        .collect();
    let mut indices = Vec::new();
    for row in 0..rows - 1 {
        for col in 0..cols - 1 {
            let a = (row * cols + col) as u16;
            let c = a + cols as u16;
            indices.extend_from_slice(&[a, c, a + 1, a + 1, c, c + 1]);
        }
    }
    FaceMesh::new(vertices, indices)
}

/// Noisy head track: yaw sweep with jitter
fn samples(mesh: &FaceMesh, count: usize) -> Vec<FaceSample> {
    (0..count)
        .map(|i| {
            let t = i as f32 / 60.0;
            let yaw = 0.4 * (t * 1.5).sin() + 0.01 * rand::random::<f32>();
            let rotation = UnitQuaternion::from_euler_angles(0.0, yaw, 0.0).into_inner();
            let position = Vector3::new(0.002 * rand::random::<f32>(), 0.0, -0.5);
            FaceSample::tracked(FacePose::new(position, rotation), mesh.clone())
        })
        .collect()
}

fn benchmark_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters");

    let measurements: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin() + 0.05 * rand::random::<f32>()).collect();

    group.bench_function("kalman_sequence_100", |b| {
        let mut filter = KalmanFilter::new(0.1, 0.05, 0.0);
        b.iter(|| {
            filter.reset_to(0.0);
            for &m in &measurements {
                black_box(filter.update(black_box(m)));
            }
        });
    });

    group.bench_function("position_update", |b| {
        let mut filter = PositionFilter::new(0.1, 0.05);
        let sample = Vector3::new(0.01, 0.02, -0.45);
        b.iter(|| black_box(filter.update(black_box(&sample))));
    });

    group.bench_function("quaternion_update", |b| {
        let mut filter = QuaternionKalmanFilter::new(0.1, 0.05);
        let rotation = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.05).into_inner();
        b.iter(|| black_box(filter.update(black_box(&rotation))));
    });

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let mesh = grid_mesh(468);
    let track = samples(&mesh, 120);
    let camera = CameraFrame::new(Matrix4::identity(), Matrix4::new_perspective(0.5625, 1.0, 0.01, 100.0));

    for mode in [AnchorMode::WorldSpace, AnchorMode::ScreenSpace] {
        let params = PipelineParams {
            mode,
            landmark_a: 168,
            landmark_b: 6,
            forward_offset: 0.004,
            mirror: false,
            base_scale: 0.001,
            aspect_ratio: 0.5625,
        };
        let mut pipeline = PosePipeline::new(params, 0.1, 0.05);
        group.bench_with_input(BenchmarkId::new("compute", format!("{mode:?}")), &track, |b, track| {
            b.iter(|| {
                pipeline.reset();
                for sample in track {
                    black_box(pipeline.compute(black_box(sample), Some(&camera)));
                }
            });
        });
    }

    for vertex_count in [468, 1220] {
        let mesh = grid_mesh(vertex_count);
        let sample = FaceSample::tracked(FacePose::new(Vector3::new(0.0, 0.0, -0.5), Quaternion::identity()), mesh);
        let mut scene = MemoryScene::new();
        let mut controller = OcclusionController::default();
        controller.setup(&mut scene);
        group.bench_with_input(BenchmarkId::new("occlusion_update", vertex_count), &sample, |b, sample| {
            b.iter(|| black_box(controller.update(black_box(sample), &mut scene)));
        });
    }

    group.finish();
}

fn benchmark_session(c: &mut Criterion) {
    let mesh = grid_mesh(468);
    let track = samples(&mesh, 120);

    let config = Config {
        model_url: Some("aviator".to_string()),
        ..Config::default()
    };
    let mut scene = MemoryScene::new();
    let Ok(mut session) = TryOnSession::new(config, Arc::new(StaticSource)) else {
        return;
    };
    if session.setup(&mut scene).is_err() {
        return;
    }
    session.wait_for_model(Duration::from_secs(5), &mut scene);

    c.bench_function("session_render_120_frames", |b| {
        b.iter(|| {
            for sample in &track {
                black_box(session.render_frame(Some(sample), None, &mut scene));
            }
        });
    });
}

criterion_group!(benches, benchmark_filters, benchmark_pipeline, benchmark_session);
criterion_main!(benches);
