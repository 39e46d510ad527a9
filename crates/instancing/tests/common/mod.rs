//! CPU stand-ins for the GPU seams.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3, Vec4};
use renderer_core::RendererConfig;
use renderer_instancing::{
    CommandRecorder, GpuBackend, GraphicsDeviceContext, HostBuffer, MaterialBinding,
    OutputExtent, SceneRenderer,
};
use renderer_rhi::buffer::BufferUsage;
use renderer_rhi::vertex::Vertex;
use renderer_rhi::{RhiError, RhiResult, vk};
use renderer_scene::{MeshId, RenderableInstance, TextureId};

pub const BASE_COLOR: TextureId = TextureId(1);
pub const NORMAL_MAP: TextureId = TextureId(2);

// =============================================================================
// Backend
// =============================================================================

pub struct MockBuffer {
    pub id: usize,
    pub usage: BufferUsage,
    size: u64,
    storage: Vec<Vec4>,
    live: Rc<Cell<usize>>,
}

impl HostBuffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn mapped_bytes(&self) -> RhiResult<&[u8]> {
        Ok(&bytemuck::cast_slice(&self.storage)[..self.size as usize])
    }

    fn mapped_bytes_mut(&mut self) -> RhiResult<&mut [u8]> {
        let size = self.size as usize;
        Ok(&mut bytemuck::cast_slice_mut(&mut self.storage)[..size])
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockSet(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct MockPipeline(pub &'static str);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescriptorWrite {
    pub set: MockSet,
    pub uniform_buffer: usize,
    pub material: MaterialBinding,
}

#[derive(Default)]
pub struct MockBackend {
    next_buffer: Cell<usize>,
    live_buffers: Rc<Cell<usize>>,
    pub buffers_created: RefCell<Vec<(BufferUsage, u64)>>,
    next_set: Cell<u32>,
    pub live_sets: RefCell<HashSet<MockSet>>,
    pub sets_allocated: Cell<usize>,
    pub sets_freed: Cell<usize>,
    pub textures: RefCell<HashSet<TextureId>>,
    pub descriptor_writes: RefCell<Vec<DescriptorWrite>>,
    fail_buffers_larger_than: Cell<Option<u64>>,
}

impl MockBackend {
    pub fn with_textures(textures: &[TextureId]) -> Self {
        let backend = Self::default();
        for &texture in textures {
            backend.register_texture(texture);
        }
        backend
    }

    pub fn register_texture(&self, texture: TextureId) {
        self.textures.borrow_mut().insert(texture);
    }

    /// Buffer creations above `size` bytes fail with out-of-device-memory.
    pub fn fail_buffers_larger_than(&self, size: u64) {
        self.fail_buffers_larger_than.set(Some(size));
    }

    /// Buffers plus descriptor sets allocated so far.
    pub fn allocations(&self) -> usize {
        self.buffers_created.borrow().len() + self.sets_allocated.get()
    }

    pub fn buffers_created_with(&self, usage: BufferUsage) -> usize {
        self.buffers_created
            .borrow()
            .iter()
            .filter(|(u, _)| *u == usage)
            .count()
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers.get()
    }

    pub fn live_sets(&self) -> usize {
        self.live_sets.borrow().len()
    }

    pub fn descriptor_write_count(&self) -> usize {
        self.descriptor_writes.borrow().len()
    }
}

impl GpuBackend for MockBackend {
    type Buffer = MockBuffer;
    type DescriptorSet = MockSet;
    type Pipeline = MockPipeline;

    fn create_buffer(&self, usage: BufferUsage, size: u64) -> RhiResult<MockBuffer> {
        if size == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer size must be greater than 0".to_string(),
            ));
        }
        if self.fail_buffers_larger_than.get().is_some_and(|limit| size > limit) {
            return Err(RhiError::VulkanError(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        }

        let id = self.next_buffer.get();
        self.next_buffer.set(id + 1);
        self.buffers_created.borrow_mut().push((usage, size));
        self.live_buffers.set(self.live_buffers.get() + 1);

        Ok(MockBuffer {
            id,
            usage,
            size,
            storage: vec![Vec4::ZERO; size.div_ceil(16) as usize],
            live: Rc::clone(&self.live_buffers),
        })
    }

    fn allocate_descriptor_set(&self) -> RhiResult<MockSet> {
        let set = MockSet(self.next_set.get());
        self.next_set.set(set.0 + 1);
        self.sets_allocated.set(self.sets_allocated.get() + 1);
        self.live_sets.borrow_mut().insert(set);
        Ok(set)
    }

    fn free_descriptor_set(&self, set: MockSet) -> RhiResult<()> {
        if !self.live_sets.borrow_mut().remove(&set) {
            return Err(RhiError::InvalidHandle(format!("{set:?} freed twice")));
        }
        self.sets_freed.set(self.sets_freed.get() + 1);
        Ok(())
    }

    fn has_texture(&self, texture: TextureId) -> bool {
        self.textures.borrow().contains(&texture)
    }

    fn write_descriptor_set(
        &self,
        set: MockSet,
        uniform: &MockBuffer,
        material: MaterialBinding,
    ) -> RhiResult<()> {
        assert!(self.has_texture(material.base_color));
        assert!(self.has_texture(material.normal));
        assert_eq!(uniform.usage, BufferUsage::Uniform);

        self.descriptor_writes.borrow_mut().push(DescriptorWrite {
            set,
            uniform_buffer: uniform.id,
            material,
        });
        Ok(())
    }
}

// =============================================================================
// Recorder and device context
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BindPipeline(&'static str),
    Viewport(OutputExtent),
    BindSet(MockSet),
    BindStreams { vertices: usize, instances: usize },
    BindIndex(usize),
    Draw { index_count: u32, instance_count: u32 },
}

pub struct MockRecorder {
    pub slot: usize,
    pub commands: Vec<Command>,
}

impl CommandRecorder<MockBackend> for MockRecorder {
    fn bind_pipeline(&mut self, pipeline: &MockPipeline) {
        self.commands.push(Command::BindPipeline(pipeline.0));
    }

    fn set_viewport_and_scissor(&mut self, extent: OutputExtent) {
        self.commands.push(Command::Viewport(extent));
    }

    fn bind_descriptor_set(&mut self, _pipeline: &MockPipeline, set: MockSet) {
        self.commands.push(Command::BindSet(set));
    }

    fn bind_vertex_streams(&mut self, vertices: &MockBuffer, instances: &MockBuffer) {
        assert_eq!(vertices.usage, BufferUsage::Vertex);
        assert_eq!(instances.usage, BufferUsage::Instance);
        self.commands.push(Command::BindStreams {
            vertices: vertices.id,
            instances: instances.id,
        });
    }

    fn bind_index_buffer(&mut self, indices: &MockBuffer) {
        assert_eq!(indices.usage, BufferUsage::Index);
        self.commands.push(Command::BindIndex(indices.id));
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.commands.push(Command::Draw {
            index_count,
            instance_count,
        });
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    WaitSlot(usize),
    Begin(usize),
    Submit { slot: usize, commands: Vec<Command> },
    WaitIdle,
}

pub struct MockContext {
    frames: usize,
    current: usize,
    pub extent: OutputExtent,
    pub events: Vec<Event>,
}

impl MockContext {
    pub fn new(frames: usize) -> Self {
        Self {
            frames,
            current: 0,
            extent: OutputExtent::new(1280, 720),
            events: Vec::new(),
        }
    }

    /// Context sized from `config` the way the Vulkan frame context sizes itself.
    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.clone().validate().frames_in_flight)
    }

    /// Commands of every submission, oldest first.
    pub fn submissions(&self) -> Vec<&[Command]> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Submit { commands, .. } => Some(commands.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn last_submission(&self) -> &[Command] {
        self.submissions().last().copied().unwrap_or(&[])
    }

    pub fn position(&self, wanted: &Event) -> Option<usize> {
        self.events.iter().position(|event| event == wanted)
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events.iter().filter(|event| *event == wanted).count()
    }
}

impl GraphicsDeviceContext<MockBackend> for MockContext {
    type Recorder = MockRecorder;

    fn frames_in_flight(&self) -> usize {
        self.frames
    }

    fn current_frame_slot(&self) -> usize {
        self.current
    }

    fn output_extent(&self) -> OutputExtent {
        self.extent
    }

    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()> {
        self.events.push(Event::WaitSlot(slot));
        Ok(())
    }

    fn begin_commands(&mut self, slot: usize) -> RhiResult<MockRecorder> {
        assert_eq!(slot, self.current);
        self.events.push(Event::Begin(slot));
        Ok(MockRecorder {
            slot,
            commands: Vec::new(),
        })
    }

    fn submit_commands(&mut self, slot: usize, recorder: MockRecorder) -> RhiResult<()> {
        assert_eq!(recorder.slot, slot);
        self.events.push(Event::Submit {
            slot,
            commands: recorder.commands,
        });
        self.current = (self.current + 1) % self.frames;
        Ok(())
    }

    fn wait_device_idle(&mut self) -> RhiResult<()> {
        self.events.push(Event::WaitIdle);
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Unit quad: 4 vertices, 6 indices.
pub fn quad() -> (Vec<Vertex>, Vec<u32>) {
    let corner = |x: f32, y: f32| {
        Vertex::new(
            Vec3::new(x, y, 0.0),
            Vec3::Z,
            Vec2::new(x + 0.5, y + 0.5),
            Vec4::new(1.0, 0.0, 0.0, 1.0),
        )
    };
    let vertices = vec![
        corner(-0.5, -0.5),
        corner(0.5, -0.5),
        corner(0.5, 0.5),
        corner(-0.5, 0.5),
    ];
    (vertices, vec![0, 1, 2, 2, 3, 0])
}

/// Textured instance of `mesh` at `translation`.
pub fn instance(mesh: u32, translation: Vec3) -> RenderableInstance {
    RenderableInstance::new(MeshId(mesh), Mat4::from_translation(translation))
        .with_textures(BASE_COLOR, NORMAL_MAP)
}

pub fn config(frames_in_flight: usize) -> RendererConfig {
    RendererConfig {
        frames_in_flight,
        ..RendererConfig::default()
    }
}

/// Renderer with meshes 1..=3 uploaded, both test textures registered and
/// two pipeline variants (`phong`, `blinn_phong`).
pub fn renderer(frames_in_flight: usize) -> SceneRenderer<MockBackend> {
    renderer_with(config(frames_in_flight))
}

pub fn renderer_with(config: RendererConfig) -> SceneRenderer<MockBackend> {
    let backend = MockBackend::with_textures(&[BASE_COLOR, NORMAL_MAP]);
    let mut renderer = SceneRenderer::new(backend, &config).unwrap();

    let (vertices, indices) = quad();
    for mesh in 1..=3 {
        renderer
            .upload_mesh(MeshId(mesh), &vertices, &indices)
            .unwrap();
    }
    renderer.add_pipeline_variant("phong", MockPipeline("phong"));
    renderer.add_pipeline_variant("blinn_phong", MockPipeline("blinn_phong"));
    renderer
}

pub fn draws(commands: &[Command]) -> Vec<u32> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::Draw { instance_count, .. } => Some(*instance_count),
            _ => None,
        })
        .collect()
}
