use ahash::{HashMap, HashMapExt};
use glam::{Mat4, Vec3};
use tracing::warn;

use crate::engine::{
    arena::{Arena, Handle},
    assets::ModelAsset,
    bounds::Aabb,
    transform::Transform,
};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("No node named {0:?} in the scene")]
    NodeNotFound(String),
}

/// A transformable entity in the scene graph.
pub struct Node {
    pub name: String,
    pub parent: Option<NodeHandle>,
    pub transform: Transform,
    pub bounds: Option<Aabb>,
    pub is_joint: bool,
}

pub type NodeHandle = Handle<Node>;

/// The imported model as a hierarchy of named nodes under a synthetic root.
/// Names are resolved to handles once, when the graph is built; per-frame
/// callers address nodes by handle only.
pub struct SceneGraph {
    nodes: Arena<Node>,
    root: NodeHandle,
    by_name: HashMap<String, NodeHandle>,
    background: [f32; 3],
}

impl SceneGraph {
    /// Build a graph from an imported model. Nodes whose name starts with
    /// `joint_prefix` are treated as joints in addition to skin membership.
    pub fn from_model(asset: &ModelAsset, joint_prefix: &str) -> Self {
        let mut nodes = Arena::default();

        let root = nodes.insert(Node {
            name: "__root".to_string(),
            parent: None,
            transform: Transform::IDENTITY,
            bounds: None,
            is_joint: false,
        });

        // Handles line up with model node indices, offset by the root.
        let handle_of = |index: usize| NodeHandle::raw(index + 1);

        for (index, model_node) in asset.nodes.iter().enumerate() {
            let is_joint = model_node.is_joint
                || (!joint_prefix.is_empty() && model_node.name.starts_with(joint_prefix));

            let inserted = nodes.insert(Node {
                name: model_node.name.clone(),
                parent: Some(model_node.parent.map(handle_of).unwrap_or(root)),
                transform: model_node.transform.clone(),
                bounds: model_node.bounds,
                is_joint,
            });
            debug_assert_eq!(inserted, handle_of(index));
        }

        let mut by_name = HashMap::with_capacity(nodes.len());
        for (handle, node) in nodes.iter() {
            if by_name.contains_key(&node.name) {
                warn!("Duplicate node name {:?}, keeping the first", node.name);
                continue;
            }
            by_name.insert(node.name.clone(), handle);
        }

        Self {
            nodes,
            root,
            by_name,
            background: [0.0, 0.0, 0.0],
        }
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.by_name.get(name).copied()
    }

    /// Number of nodes, not counting the synthetic root.
    pub fn entity_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter()
    }

    pub fn joints(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter().filter(|(_, node)| node.is_joint)
    }

    pub fn local_transform(&self, handle: NodeHandle) -> Option<&Transform> {
        self.nodes.get(handle).map(|node| &node.transform)
    }

    pub fn set_local_transform(&mut self, handle: NodeHandle, transform: Transform) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform = transform;
        }
    }

    pub fn world_transform(&self, handle: NodeHandle) -> Mat4 {
        let Some(node) = self.nodes.get(handle) else {
            return Mat4::IDENTITY;
        };
        match node.parent {
            Some(parent) => self.world_transform(parent) * node.transform.to_mat4(),
            None => node.transform.to_mat4(),
        }
    }

    pub fn background(&self) -> [f32; 3] {
        self.background
    }

    pub fn set_background(&mut self, background: [f32; 3]) {
        self.background = background;
    }

    /// The world-space bounding box over all mesh bounds in the graph.
    pub fn world_bounds(&self) -> Option<Aabb> {
        let mut result: Option<Aabb> = None;
        for (handle, node) in self.nodes() {
            let Some(bounds) = node.bounds else { continue };
            let world = bounds.transformed(self.world_transform(handle));
            result = Some(match result {
                Some(existing) => existing.union(&world),
                None => world,
            });
        }
        result
    }

    /// Rewrite the root transform so the model is centered at the origin with
    /// its longest extent scaled to one. Returns false, leaving the graph
    /// untouched, when there is nothing to normalize.
    pub fn fit_to_unit_cube(&mut self) -> bool {
        let Some(bounds) = self.world_bounds() else {
            warn!("Scene has no mesh bounds, skipping unit cube normalization");
            return false;
        };

        let extent = bounds.extents().max_element();
        if !bounds.is_finite() || extent <= 0.0 {
            warn!("Scene bounds are degenerate, skipping unit cube normalization");
            return false;
        }

        let scale = 1.0 / extent;
        let center = bounds.center();
        self.set_local_transform(
            self.root,
            Transform::new(
                -center * scale,
                glam::Quat::IDENTITY,
                Vec3::splat(scale),
            ),
        );

        true
    }
}
