//! Read-only view of the scene handed to the renderer once per tick.

use glam::Mat4;

/// Identity of a mesh whose vertex and index buffers live in the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Identity of a sampled texture registered with the renderer backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// One drawable copy of a mesh.
///
/// Any reference may be `None` while its asset is still streaming in; the
/// renderer skips what it cannot resolve instead of failing the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderableInstance {
    pub mesh: Option<MeshId>,
    pub world_transform: Mat4,
    pub base_color_texture: Option<TextureId>,
    pub normal_texture: Option<TextureId>,
}

impl RenderableInstance {
    /// Instance of `mesh` at `world_transform` with no textures bound yet.
    pub fn new(mesh: MeshId, world_transform: Mat4) -> Self {
        Self {
            mesh: Some(mesh),
            world_transform,
            base_color_texture: None,
            normal_texture: None,
        }
    }

    pub fn with_textures(mut self, base_color: TextureId, normal: TextureId) -> Self {
        self.base_color_texture = Some(base_color);
        self.normal_texture = Some(normal);
        self
    }
}

/// Ordered instances plus the scene topology version they were taken at.
///
/// The version changes whenever instances are added, removed or switch mesh,
/// which is the renderer's signal to regroup. Indices into
/// [`SceneSnapshot::instances`] stay meaningful for as long as the version
/// does not change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneSnapshot {
    instances: Vec<RenderableInstance>,
    topology_version: u64,
}

impl SceneSnapshot {
    pub fn new(instances: Vec<RenderableInstance>, topology_version: u64) -> Self {
        Self {
            instances,
            topology_version,
        }
    }

    #[inline]
    pub fn instances(&self) -> &[RenderableInstance] {
        &self.instances
    }

    #[inline]
    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
