use glam::{Quat, Vec3};

use crate::engine::transform::Transform;

use super::graph::{NodeHandle, SceneError, SceneGraph};

/// Rotates one skeleton joint at a fixed angular velocity about a fixed
/// axis. The joint name is resolved to a handle once, up front; per-frame
/// application never looks anything up by name.
pub struct JointSpinner {
    node: NodeHandle,
    rest: Transform,
    axis: Vec3,
    /// Radians per second.
    angular_velocity: f32,
}

impl JointSpinner {
    pub fn resolve(
        graph: &SceneGraph,
        name: &str,
        axis: Vec3,
        angular_velocity: f32,
    ) -> Result<Self, SceneError> {
        let node = graph
            .node_by_name(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))?;
        let rest = graph
            .local_transform(node)
            .cloned()
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))?;

        Ok(Self {
            node,
            rest,
            axis: axis.try_normalize().unwrap_or(Vec3::X),
            angular_velocity,
        })
    }

    pub fn node(&self) -> NodeHandle {
        self.node
    }

    /// The rotation angle at `elapsed` seconds. Grows without bound; the
    /// trigonometry inside the rotation normalizes it implicitly.
    pub fn angle_at(&self, elapsed: f32) -> f32 {
        self.angular_velocity * elapsed
    }

    /// Write the rotated rest transform back to the joint.
    pub fn apply(&self, graph: &mut SceneGraph, elapsed: f32) {
        let rotation = Quat::from_axis_angle(self.axis, self.angle_at(elapsed));
        graph.set_local_transform(self.node, self.rest.rotated_by(rotation));
    }
}
