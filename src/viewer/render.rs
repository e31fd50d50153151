use glam::Vec3;
use minifb::{Key, Window, WindowOptions};

use crate::{engine::frame::FrameTick, pose::LatestPose};

use super::graph::SceneGraph;

const BONE_COLOR: u32 = 0x00FF_FF00;
const JOINT_COLOR: u32 = 0x0000_FF00;
const OVERLAY_COLOR: u32 = 0x0000_FFAA;
const OVERLAY_LOW_COLOR: u32 = 0x00FF_0000;

const OVERLAY_MIN_LIKELIHOOD: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Window error: {0}")]
    Window(#[from] minifb::Error),
}

/// Where rendered frames go. The engine behind this seam is replaceable;
/// the loop only needs to present a scene for a tick.
pub trait SceneRenderer {
    /// Whether the surface can still present frames.
    fn is_open(&self) -> bool {
        true
    }

    fn render(&mut self, graph: &SceneGraph, tick: &FrameTick) -> Result<(), RenderError>;
}

/// Counts ticks without presenting anything. With a budget it reports closed
/// once the budget is spent, which bounds headless runs.
pub struct HeadlessRenderer {
    rendered: u64,
    budget: Option<u64>,
}

impl HeadlessRenderer {
    pub fn new(budget: Option<u64>) -> Self {
        Self {
            rendered: 0,
            budget,
        }
    }
}

impl SceneRenderer for HeadlessRenderer {
    fn is_open(&self) -> bool {
        match self.budget {
            Some(budget) => self.rendered < budget,
            None => true,
        }
    }

    fn render(&mut self, _graph: &SceneGraph, _tick: &FrameTick) -> Result<(), RenderError> {
        self.rendered += 1;
        Ok(())
    }
}

/// Software wireframe view of the scene: joints as dots, parent/child joint
/// links as lines, plus a small overlay of the latest detected pose.
pub struct WireframeRenderer {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    overlay: LatestPose,
}

impl WireframeRenderer {
    pub fn new(
        title: &str,
        width: usize,
        height: usize,
        overlay: LatestPose,
    ) -> Result<Self, RenderError> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self {
            window,
            buffer: vec![0_u32; width * height],
            width,
            height,
            overlay,
        })
    }

    fn clear(&mut self, background: [f32; 3]) {
        let color = pack_color(background);
        self.buffer.fill(color);
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: u32) {
        let (x0, y0) = from;
        let (x1, y1) = to;
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let (mut x, mut y) = (x0, y0);
        loop {
            self.set_pixel(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_dot(&mut self, center: (i32, i32), radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(center.0 + dx, center.1 + dy, color);
                }
            }
        }
    }

    fn draw_scene(&mut self, graph: &SceneGraph) {
        let joints: Vec<_> = graph
            .joints()
            .map(|(handle, node)| {
                (
                    handle,
                    node.parent,
                    project(self.width, self.height, world_position(graph, handle)),
                )
            })
            .collect();

        for (_, parent, position) in joints.iter() {
            if let Some(parent) = parent {
                if graph.node(*parent).is_some_and(|node| node.is_joint) {
                    let parent_position =
                        project(self.width, self.height, world_position(graph, *parent));
                    self.draw_line(parent_position, *position, BONE_COLOR);
                }
            }
        }

        for (_, _, position) in joints.iter() {
            self.draw_dot(*position, 3, JOINT_COLOR);
        }
    }

    fn draw_overlay(&mut self) {
        let Some(pose) = self.overlay.snapshot() else {
            return;
        };
        if pose.average_likelihood() < OVERLAY_MIN_LIKELIHOOD {
            return;
        }

        let scale = 0.1 * self.width.min(self.height) as f32;
        let center_x = (self.width as f32 * 0.15) as i32;
        let center_y = (self.height as f32 * 0.3) as i32;

        for point in pose.points().iter() {
            let x = center_x + (point.position.x * scale) as i32;
            let y = center_y - (point.position.y * scale) as i32;
            let color = if point.is_confident(OVERLAY_MIN_LIKELIHOOD) {
                OVERLAY_COLOR
            } else {
                OVERLAY_LOW_COLOR
            };
            self.draw_dot((x, y), 1, color);
        }
    }
}

impl SceneRenderer for WireframeRenderer {
    fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    fn render(&mut self, graph: &SceneGraph, tick: &FrameTick) -> Result<(), RenderError> {
        self.clear(graph.background());
        self.draw_scene(graph);
        self.draw_overlay();

        if tick.sequence % 30 == 0 && tick.delta > 0.0 {
            self.window
                .set_title(&format!("Interlock - {:0.1} fps", 1.0 / tick.delta));
        }

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }
}

fn world_position(graph: &SceneGraph, handle: super::graph::NodeHandle) -> Vec3 {
    graph.world_transform(handle).transform_point3(Vec3::ZERO)
}

/// Orthographic projection of a unit-cube scene onto the window, y up.
fn project(width: usize, height: usize, position: Vec3) -> (i32, i32) {
    let scale = 0.8 * width.min(height) as f32;
    let x = width as f32 * 0.5 + position.x * scale;
    let y = height as f32 * 0.5 - position.y * scale;
    (x as i32, y as i32)
}

fn pack_color(rgb: [f32; 3]) -> u32 {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0) as u32;
    (channel(rgb[0]) << 16) | (channel(rgb[1]) << 8) | channel(rgb[2])
}
