pub mod graph;
pub mod render;
pub mod spin;

pub use graph::{Node, NodeHandle, SceneError, SceneGraph};
pub use render::{HeadlessRenderer, RenderError, SceneRenderer, WireframeRenderer};
pub use spin::JointSpinner;

use crate::engine::frame::{FrameClock, LoopHandle};

#[derive(Clone, Copy, Debug, Default)]
pub struct LoopStats {
    pub ticks: u64,
}

/// The per-frame loop: tick the clock, advance the joint spinners, render.
/// Runs until the handle is cancelled or the render surface closes; after it
/// returns nothing mutates the scene graph anymore.
pub fn run_frame_loop(
    graph: &mut SceneGraph,
    spinners: &[JointSpinner],
    renderer: &mut dyn SceneRenderer,
    clock: &mut FrameClock,
    handle: &LoopHandle,
) -> Result<LoopStats, RenderError> {
    let mut stats = LoopStats::default();

    while !handle.is_cancelled() && renderer.is_open() {
        let tick = clock.tick();

        for spinner in spinners {
            spinner.apply(graph, tick.elapsed);
        }

        renderer.render(graph, &tick)?;
        stats.ticks += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::glb::{ModelAsset, tests as glb_tests};
    use crate::engine::frame::FrameTick;
    use glam::Vec3;

    fn rig_graph() -> SceneGraph {
        let bytes = glb_tests::container(glb_tests::RIG);
        let asset = ModelAsset::read(&mut std::io::Cursor::new(bytes)).unwrap();
        SceneGraph::from_model(&asset, "mixamorig:")
    }

    /// Records the spun joint's rotation angle relative to rest on every
    /// rendered tick.
    struct AngleRecorder {
        node: NodeHandle,
        rest_rotation: glam::Quat,
        angles: Vec<f32>,
        budget: u64,
    }

    impl SceneRenderer for AngleRecorder {
        fn is_open(&self) -> bool {
            (self.angles.len() as u64) < self.budget
        }

        fn render(&mut self, graph: &SceneGraph, _tick: &FrameTick) -> Result<(), RenderError> {
            let rotation = graph.local_transform(self.node).unwrap().rotation;
            let relative = self.rest_rotation.inverse() * rotation;
            self.angles.push(relative.to_axis_angle().1);
            Ok(())
        }
    }

    struct FailingRenderer;

    impl SceneRenderer for FailingRenderer {
        fn render(&mut self, _graph: &SceneGraph, _tick: &FrameTick) -> Result<(), RenderError> {
            Err(RenderError::Window(minifb::Error::UpdateFailed(
                "surface lost".to_string(),
            )))
        }
    }

    #[test]
    fn cancelled_loop_never_touches_the_scene() {
        let mut graph = rig_graph();
        let spinner = JointSpinner::resolve(&graph, "mixamorig:RightArm", Vec3::X, 5.0).unwrap();
        let node = spinner.node();
        let before = graph.local_transform(node).unwrap().clone();

        let handle = LoopHandle::new();
        handle.cancel();

        let mut renderer = HeadlessRenderer::new(None);
        let mut clock = FrameClock::new(1000);
        let stats = run_frame_loop(
            &mut graph,
            std::slice::from_ref(&spinner),
            &mut renderer,
            &mut clock,
            &handle,
        )
        .unwrap();

        assert_eq!(stats.ticks, 0);
        assert_eq!(graph.local_transform(node).unwrap(), &before);
    }

    #[test]
    fn spun_angle_increases_while_the_loop_runs() {
        let mut graph = rig_graph();
        let spinner = JointSpinner::resolve(&graph, "mixamorig:RightArm", Vec3::X, 1.0).unwrap();

        let mut recorder = AngleRecorder {
            node: spinner.node(),
            rest_rotation: graph.local_transform(spinner.node()).unwrap().rotation,
            angles: Vec::new(),
            budget: 5,
        };

        let handle = LoopHandle::new();
        let mut clock = FrameClock::new(1000);
        let stats = run_frame_loop(
            &mut graph,
            std::slice::from_ref(&spinner),
            &mut recorder,
            &mut clock,
            &handle,
        )
        .unwrap();

        assert_eq!(stats.ticks, 5);
        for window in recorder.angles.windows(2) {
            assert!(window[1] >= window[0]);
        }
        assert!(recorder.angles.last().unwrap() > recorder.angles.first().unwrap());
    }

    #[test]
    fn renderer_failure_stops_the_loop() {
        let mut graph = rig_graph();
        let handle = LoopHandle::new();
        let mut clock = FrameClock::new(1000);

        let result = run_frame_loop(
            &mut graph,
            &[],
            &mut FailingRenderer,
            &mut clock,
            &handle,
        );

        assert!(result.is_err());
    }
}
