//! Vertex input layout of the instanced mesh pipelines.
//!
//! Two vertex streams feed every draw:
//!
//! | Binding | Rate     | Locations | Contents                                     |
//! |---------|----------|-----------|----------------------------------------------|
//! | 0       | vertex   | 0-3       | [`Vertex`]: position, normal, uv, tangent    |
//! | 1       | instance | 4-15      | three column-major 4x4 matrices per instance |
//!
//! A `mat4` vertex input occupies four consecutive locations, one per column,
//! so the instance stream is described as twelve `vec4` attributes.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

/// Binding index of the per-vertex stream.
pub const VERTEX_STREAM_BINDING: u32 = 0;
/// Binding index of the per-instance stream.
pub const INSTANCE_STREAM_BINDING: u32 = 1;
/// First shader location used by the per-instance stream.
pub const INSTANCE_FIRST_LOCATION: u32 = 4;

const MAT4_COLUMN_BYTES: u32 = 16;
const MAT4_BYTES: u32 = MAT4_COLUMN_BYTES * 4;

/// Mesh vertex.
///
/// | Offset | Size | Field     | Location |
/// |--------|------|-----------|----------|
/// | 0      | 12   | position  | 0        |
/// | 12     | 12   | normal    | 1        |
/// | 24     | 8    | tex_coord | 2        |
/// | 32     | 16   | tangent   | 3        |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
    /// Tangent with handedness in w.
    pub tangent: Vec4,
}

impl Vertex {
    #[inline]
    pub const fn new(position: Vec3, normal: Vec3, tex_coord: Vec2, tangent: Vec4) -> Self {
        Self {
            position,
            normal,
            tex_coord,
            tangent,
        }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: VERTEX_STREAM_BINDING,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        let attribute = |location, format, offset| vk::VertexInputAttributeDescription {
            binding: VERTEX_STREAM_BINDING,
            location,
            format,
            offset,
        };

        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, 0),
            attribute(1, vk::Format::R32G32B32_SFLOAT, 12),
            attribute(2, vk::Format::R32G32_SFLOAT, 24),
            attribute(3, vk::Format::R32G32B32A32_SFLOAT, 32),
        ]
    }
}

/// Per-instance binding for records of `stride` bytes.
pub fn instance_binding_description(stride: u32) -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: INSTANCE_STREAM_BINDING,
        stride,
        input_rate: vk::VertexInputRate::INSTANCE,
    }
}

/// Attributes for a per-instance record made of `matrix_count` packed `mat4`s.
pub fn instance_matrix_attributes(matrix_count: u32) -> Vec<vk::VertexInputAttributeDescription> {
    (0..matrix_count * 4)
        .map(|column| vk::VertexInputAttributeDescription {
            binding: INSTANCE_STREAM_BINDING,
            location: INSTANCE_FIRST_LOCATION + column,
            format: vk::Format::R32G32B32A32_SFLOAT,
            offset: column * MAT4_COLUMN_BYTES,
        })
        .collect()
}

/// Bytes taken by `matrix_count` packed `mat4`s.
pub const fn instance_matrix_stride(matrix_count: u32) -> u32 {
    matrix_count * MAT4_BYTES
}
