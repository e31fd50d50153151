use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;
use tracing::{error, info, warn};

use crate::{
    camera::{CameraSettings, FramePool, SyntheticCamera},
    config::Config,
    engine::{
        assets::AssetLoader,
        frame::{FrameClock, LoopHandle},
    },
    pose::{LatestPose, LoggingObserver, PoseAnalyzer, SyntheticPoseDetector},
    viewer::{HeadlessRenderer, JointSpinner, SceneGraph, WireframeRenderer, run_frame_loop},
};

mod camera;
mod config;
mod engine;
mod pose;
mod viewer;

#[derive(clap::Parser)]
struct Opts {
    /// Path to the data directory holding model assets and interlock.toml.
    path: PathBuf,

    /// Run without opening a window.
    #[arg(long)]
    headless: bool,

    /// Stop after this many rendered frames (headless runs default to 300).
    #[arg(long)]
    frames: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt().init();

    let opts = Opts::parse();
    let config = Config::load_or_default(opts.path.join("interlock.toml"));

    let assets = AssetLoader::new(&opts.path);
    let model = assets
        .load_model(&config.model.file)
        .expect("load model asset");

    let mut graph = SceneGraph::from_model(&model, &config.model.joint_prefix);
    graph.fit_to_unit_cube();
    graph.set_background(config.viewer.background);

    info!(
        "Loaded {:?} with {} entities",
        config.model.file,
        graph.entity_count()
    );
    for (_, node) in graph.joints() {
        info!("Joint entity: {}", node.name);
    }

    let mut spinners = Vec::with_capacity(config.spin.len());
    for spin in config.spin.iter() {
        match JointSpinner::resolve(
            &graph,
            &spin.joint,
            Vec3::from(spin.axis),
            spin.degrees_per_second.to_radians(),
        ) {
            Ok(spinner) => {
                info!("Spinning {:?} as {:?}", spin.joint, spinner.node());
                spinners.push(spinner);
            }
            Err(err) => warn!("Skipping spinner: {err}"),
        }
    }

    // The pose pipeline runs beside the render loop; its results are observed,
    // not applied to the model.
    let latest_pose = LatestPose::default();
    let analyzer = PoseAnalyzer::spawn(
        SyntheticPoseDetector::default(),
        LoggingObserver::new(latest_pose.clone()),
        config.camera.queue_depth,
    );
    let pool = FramePool::new(config.camera.pool_capacity);
    let camera = SyntheticCamera::start(
        CameraSettings {
            fps: config.camera.fps,
            width: config.camera.width,
            height: config.camera.height,
        },
        pool.clone(),
        analyzer.queue(),
    );

    let handle = LoopHandle::new();
    let mut clock = FrameClock::new(config.viewer.target_fps);

    let result = if opts.headless {
        let mut renderer = HeadlessRenderer::new(opts.frames.or(Some(300)));
        run_frame_loop(&mut graph, &spinners, &mut renderer, &mut clock, &handle)
    } else {
        let mut renderer = WireframeRenderer::new(
            "Interlock",
            config.viewer.width,
            config.viewer.height,
            latest_pose.clone(),
        )
        .expect("create viewer window");
        run_frame_loop(&mut graph, &spinners, &mut renderer, &mut clock, &handle)
    };

    // Teardown order matters: the loop first, then the frame source, then the
    // analyzer, which blocks until the last queued frame is drained.
    handle.cancel();
    let dropped = camera.stop();
    analyzer.shutdown();

    match result {
        Ok(stats) => info!("Rendered {} frames", stats.ticks),
        Err(err) => error!("Render loop failed! - {err}"),
    }

    let stats = pool.stats();
    info!(
        "Camera frames: {} analyzed, {} released, {} dropped at capacity",
        stats.acquired, stats.released, dropped
    );
    if !stats.balanced() {
        warn!(
            "Frame release imbalance: {} acquired vs {} released ({} still outstanding)",
            stats.acquired,
            stats.released,
            pool.outstanding()
        );
    }
}
