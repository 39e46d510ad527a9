//! Arena of scene nodes addressed by generational handles.
//!
//! Removing a node frees its slot for reuse; a stale [`ObjectId`] simply stops
//! resolving instead of dangling. Node kinds are a closed enum, so "is this a
//! mesh" is a `match`, not a runtime type query.

use glam::Mat4;
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use tracing::{debug, trace};

use crate::snapshot::{MeshId, RenderableInstance, SceneSnapshot, TextureId};
use crate::transform::Transform;

new_key_type! {
    /// Stable handle to a node in a [`Scene`].
    pub struct ObjectId;
}

/// Errors returned by structural scene edits.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene object {0:?} does not exist")]
    UnknownObject(ObjectId),

    #[error("parenting {child:?} under {parent:?} would create a cycle")]
    Cycle { child: ObjectId, parent: ObjectId },
}

/// Mesh and material references of a drawable node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshComponent {
    pub mesh: Option<MeshId>,
    pub base_color_texture: Option<TextureId>,
    pub normal_texture: Option<TextureId>,
}

impl MeshComponent {
    pub fn new(mesh: MeshId) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::default()
        }
    }

    pub fn with_textures(mut self, base_color: TextureId, normal: TextureId) -> Self {
        self.base_color_texture = Some(base_color);
        self.normal_texture = Some(normal);
        self
    }
}

/// What a node contributes to rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Pure transform node, useful as a pivot for children.
    Empty,
    Mesh(MeshComponent),
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub transform: Transform,
    pub kind: NodeKind,
    parent: Option<ObjectId>,
}

impl SceneNode {
    #[inline]
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    #[inline]
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }
}

/// Owns every node and tracks when the renderable population changes.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<ObjectId, SceneNode>,
    topology_version: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Incremented whenever a mesh node appears, disappears or changes mesh.
    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn spawn_empty(&mut self, transform: Transform) -> ObjectId {
        self.insert(transform, NodeKind::Empty)
    }

    pub fn spawn_mesh(&mut self, transform: Transform, mesh: MeshComponent) -> ObjectId {
        self.insert(transform, NodeKind::Mesh(mesh))
    }

    fn insert(&mut self, transform: Transform, kind: NodeKind) -> ObjectId {
        let is_mesh = matches!(kind, NodeKind::Mesh(_));
        let id = self.nodes.insert(SceneNode {
            transform,
            kind,
            parent: None,
        });
        if is_mesh {
            self.bump_topology();
        }
        trace!("Spawned scene object {:?}", id);
        id
    }

    /// Removes a node. Its children stay in the scene as roots.
    pub fn despawn(&mut self, id: ObjectId) -> Option<SceneNode> {
        let node = self.nodes.remove(id)?;

        for (_, child) in self.nodes.iter_mut() {
            if child.parent == Some(id) {
                child.parent = None;
            }
        }

        if node.is_mesh() {
            self.bump_topology();
        }
        debug!("Despawned scene object {:?}", id);
        Some(node)
    }

    pub fn set_transform(&mut self, id: ObjectId, transform: Transform) -> Result<(), SceneError> {
        self.node_mut(id)?.transform = transform;
        Ok(())
    }

    /// Swaps the mesh drawn by a node. Non-mesh nodes become mesh nodes.
    pub fn set_mesh(&mut self, id: ObjectId, mesh: Option<MeshId>) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        let changed = if let NodeKind::Mesh(component) = &mut node.kind {
            let changed = component.mesh != mesh;
            component.mesh = mesh;
            changed
        } else {
            node.kind = NodeKind::Mesh(MeshComponent {
                mesh,
                ..MeshComponent::default()
            });
            true
        };

        if changed {
            self.bump_topology();
        }
        Ok(())
    }

    /// Replaces a mesh node's textures. Has no effect on empty nodes.
    pub fn set_textures(
        &mut self,
        id: ObjectId,
        base_color: Option<TextureId>,
        normal: Option<TextureId>,
    ) -> Result<(), SceneError> {
        if let NodeKind::Mesh(component) = &mut self.node_mut(id)?.kind {
            component.base_color_texture = base_color;
            component.normal_texture = normal;
        }
        Ok(())
    }

    /// Attaches `child` under `parent`, or detaches it when `parent` is `None`.
    pub fn set_parent(
        &mut self,
        child: ObjectId,
        parent: Option<ObjectId>,
    ) -> Result<(), SceneError> {
        if !self.nodes.contains_key(child) {
            return Err(SceneError::UnknownObject(child));
        }

        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(SceneError::UnknownObject(parent));
            }

            let mut cursor = Some(parent);
            while let Some(ancestor) = cursor {
                if ancestor == child {
                    return Err(SceneError::Cycle { child, parent });
                }
                cursor = self.nodes.get(ancestor).and_then(|node| node.parent);
            }
        }

        self.node_mut(child)?.parent = parent;
        Ok(())
    }

    /// Local matrices composed from the root down to `id`.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        let mut world = node.transform.local_matrix();
        let mut cursor = node.parent;

        while let Some(parent_id) = cursor {
            let Some(parent) = self.nodes.get(parent_id) else {
                break;
            };
            world = parent.transform.local_matrix() * world;
            cursor = parent.parent;
        }

        Some(world)
    }

    /// Collects every mesh node, in arena order, with resolved world matrices.
    ///
    /// The order only changes when nodes are spawned or despawned, both of
    /// which also change the topology version recorded in the snapshot.
    pub fn snapshot(&self) -> SceneSnapshot {
        let instances = self
            .nodes
            .iter()
            .filter_map(|(id, node)| match node.kind {
                NodeKind::Mesh(component) => Some(RenderableInstance {
                    mesh: component.mesh,
                    world_transform: self.world_matrix(id).unwrap_or(Mat4::IDENTITY),
                    base_color_texture: component.base_color_texture,
                    normal_texture: component.normal_texture,
                }),
                NodeKind::Empty => None,
            })
            .collect();

        SceneSnapshot::new(instances, self.topology_version)
    }

    fn node_mut(&mut self, id: ObjectId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::UnknownObject(id))
    }

    fn bump_topology(&mut self) {
        self.topology_version = self.topology_version.wrapping_add(1);
    }
}
