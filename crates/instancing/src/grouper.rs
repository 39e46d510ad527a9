//! Partitioning of a snapshot into per-mesh instance groups.

use std::collections::HashMap;

use renderer_scene::{MeshId, SceneSnapshot};
use tracing::debug;

use crate::backend::MaterialBinding;

/// Instances of one mesh, as indices into the snapshot they came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceGroup {
    mesh_id: MeshId,
    indices: Vec<usize>,
}

impl InstanceGroup {
    #[inline]
    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    /// Snapshot indices in snapshot order.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Textures of the group's first instance, if it has both.
    ///
    /// A group shares one descriptor set, so its first instance decides
    /// which textures are bound.
    pub fn material(&self, snapshot: &SceneSnapshot) -> Option<MaterialBinding> {
        let first = snapshot.instances().get(*self.indices.first()?)?;
        Some(MaterialBinding {
            base_color: first.base_color_texture?,
            normal: first.normal_texture?,
        })
    }
}

/// Groups renderable instances by mesh.
///
/// Group order is sticky: a mesh keeps its position for as long as it keeps
/// appearing, new meshes are appended in first-seen order, and meshes that
/// no longer appear are dropped.
#[derive(Debug, Default)]
pub struct InstanceGrouper {
    groups: Vec<InstanceGroup>,
}

impl InstanceGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the groups from `snapshot`. Instances without a mesh are skipped.
    pub fn regroup(&mut self, snapshot: &SceneSnapshot) -> &[InstanceGroup] {
        let mut positions: HashMap<MeshId, usize> = HashMap::with_capacity(self.groups.len());
        for (position, group) in self.groups.iter_mut().enumerate() {
            group.indices.clear();
            positions.insert(group.mesh_id, position);
        }

        let mut skipped = 0usize;
        for (index, instance) in snapshot.instances().iter().enumerate() {
            let Some(mesh_id) = instance.mesh else {
                skipped += 1;
                continue;
            };

            let position = *positions.entry(mesh_id).or_insert_with(|| {
                self.groups.push(InstanceGroup {
                    mesh_id,
                    indices: Vec::new(),
                });
                self.groups.len() - 1
            });
            self.groups[position].indices.push(index);
        }

        self.groups.retain(|group| !group.indices.is_empty());

        debug!(
            groups = self.groups.len(),
            instances = snapshot.len(),
            skipped,
            topology = snapshot.topology_version(),
            "Regrouped scene snapshot"
        );

        &self.groups
    }

    /// Groups from the last [`regroup`](Self::regroup).
    #[inline]
    pub fn groups(&self) -> &[InstanceGroup] {
        &self.groups
    }
}
