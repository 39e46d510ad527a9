//! GPU-side data blocks written every frame.
//!
//! Both structures are consumed by the mesh shaders, so their layout is part
//! of the shader interface and must not change without the shaders changing
//! too. All vec3 members are padded to 16 bytes (std140).

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use renderer_scene::Light;

/// Light parameters inside [`GlobalUniformBlock`].
///
/// | Offset | Size | Field        |
/// |--------|------|--------------|
/// | 0      | 12   | position     |
/// | 16     | 12   | ambient      |
/// | 32     | 12   | diffuse      |
/// | 48     | 12   | specular     |
/// | 64     | 12   | attenuation  |
/// | 76     | 4    | shininess    |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightBlock {
    /// View-space position.
    pub position: Vec3,
    pub _pad0: f32,
    pub ambient: Vec3,
    pub _pad1: f32,
    pub diffuse: Vec3,
    pub _pad2: f32,
    pub specular: Vec3,
    pub _pad3: f32,
    pub attenuation: Vec3,
    pub shininess: f32,
}

impl LightBlock {
    /// Copies `light`, moving its position into view space with `view`.
    pub fn from_light(light: &Light, view: Mat4) -> Self {
        Self {
            position: view.transform_point3(light.position),
            ambient: light.ambient,
            diffuse: light.diffuse,
            specular: light.specular,
            attenuation: light.attenuation,
            shininess: light.shininess,
            ..Self::zeroed()
        }
    }
}

/// Per-slot uniform block bound at descriptor binding 0.
///
/// | Offset | Size | Field           |
/// |--------|------|-----------------|
/// | 0      | 64   | view            |
/// | 64     | 64   | projection      |
/// | 128    | 12   | camera_position |
/// | 144    | 80   | light           |
/// | total  | 224  |                 |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GlobalUniformBlock {
    pub view: Mat4,
    pub projection: Mat4,
    /// World-space camera position.
    pub camera_position: Vec3,
    pub _padding: f32,
    pub light: LightBlock,
}

impl GlobalUniformBlock {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(view: Mat4, projection: Mat4, camera_position: Vec3, light: &Light) -> Self {
        Self {
            view,
            projection,
            camera_position,
            _padding: 0.0,
            light: LightBlock::from_light(light, view),
        }
    }
}

/// One element of a group's instance buffer, read through vertex stream 1.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    pub model: Mat4,
    pub model_view: Mat4,
    /// Inverse transpose of the upper 3x3 of `model_view`, widened to 4x4.
    pub normal_matrix: Mat4,
}

impl InstanceRecord {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Number of `mat4` columns groups the vertex input sees.
    pub const MATRIX_COUNT: u32 = 3;

    pub fn new(model: Mat4, view: Mat4) -> Self {
        let model_view = view * model;
        Self {
            model,
            model_view,
            normal_matrix: compute_normal_matrix(model_view),
        }
    }
}

/// `transpose(inverse(mat3(model_view)))` as a 4x4 matrix.
///
/// Singular inputs (for example a zero scale axis) produce the identity
/// instead of NaNs. Tiny but invertible scales are inverted exactly.
pub fn compute_normal_matrix(model_view: Mat4) -> Mat4 {
    let upper = Mat3::from_mat4(model_view);
    if upper.determinant() == 0.0 {
        return Mat4::IDENTITY;
    }

    let normal = upper.inverse().transpose();
    if normal.is_finite() {
        Mat4::from_mat3(normal)
    } else {
        Mat4::IDENTITY
    }
}
