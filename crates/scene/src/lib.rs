//! Scene storage and the per-tick snapshot the renderer consumes.
//!
//! This crate provides:
//! - An arena of scene nodes with stable handles
//! - Local transforms composed through parent handles
//! - Camera and light inputs for the global uniforms
//! - [`SceneSnapshot`], the read-only instance list handed to the renderer

pub mod camera;
pub mod light;
pub mod scene;
pub mod snapshot;
pub mod transform;

pub use camera::{Camera, Projection};
pub use light::Light;
pub use scene::{MeshComponent, NodeKind, ObjectId, Scene, SceneError, SceneNode};
pub use snapshot::{MeshId, RenderableInstance, SceneSnapshot, TextureId};
pub use transform::Transform;
