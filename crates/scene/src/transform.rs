//! Local transform of a scene node.
//!
//! A [`Transform`] is always relative to the node's parent. Parent links live
//! in the [`Scene`](crate::Scene) arena rather than in the transform itself, so
//! world matrices are composed by walking node handles:
//!
//! ```
//! use renderer_scene::{MeshComponent, MeshId, Scene, Transform};
//! use glam::Vec3;
//!
//! let mut scene = Scene::new();
//! let parent = scene.spawn_empty(Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
//! let child = scene.spawn_mesh(
//!     Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
//!     MeshComponent::new(MeshId(7)),
//! );
//! scene.set_parent(child, Some(parent)).unwrap();
//!
//! let world = scene.world_matrix(child).unwrap();
//! assert!((world.transform_point3(Vec3::ZERO) - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
//! ```

use glam::{Mat4, Quat, Vec3};

/// Translation, rotation and scale relative to the parent node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a new transform at the origin.
    pub fn new() -> Self {
        Self::IDENTITY
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Create a transform with the given position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Create a transform with the given rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Create a transform with the given scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Scale, then rotate, then translate.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
