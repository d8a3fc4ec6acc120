//! [`Gpu`] on top of wgpu.
//!
//! wgpu has no immediate mode, so calls are recorded as they arrive and
//! replayed by [`WgpuBackend::flush`] inside a single render pass. Uniform
//! writes go to a CPU copy of the program's uniform block; every draw takes an
//! aligned snapshot of that copy, and the snapshots are uploaded together and
//! selected per draw with a dynamic offset. Depth testing is always on.

use super::{
    context::GfxContext,
    reflect::{self, ShaderInterface, UniformBlock, VertexInput},
    targets::{DepthTarget, DEPTH_FORMAT},
};
use crate::gpu::{
    AttribLocation, BufferId, Gpu, ProgramId, ShaderError, UniformLocation, UniformValue,
};
use glam::Vec4;
use std::collections::HashMap;
use std::num::NonZeroU32;
use wgpu::util::DeviceExt;

/// Draws the uniform buffer has room for before it first grows.
const INITIAL_DRAW_CAPACITY: u64 = 16;

#[inline]
fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

#[inline]
fn id_for(index: usize) -> NonZeroU32 {
    NonZeroU32::MIN.saturating_add(index as u32)
}

#[inline]
fn index_of(id: NonZeroU32) -> usize {
    (id.get() - 1) as usize
}

/// CPU side of a program's uniform block: the values as last written, plus
/// one aligned copy of them per draw recorded this frame.
#[derive(Debug, Clone)]
struct UniformStaging {
    align: u64,
    current: Vec<u8>,
    staging: Vec<u8>,
}

impl UniformStaging {
    fn new(block_size: u64, align: u64) -> Self {
        Self {
            align,
            current: vec![0; block_size as usize],
            staging: Vec::new(),
        }
    }

    /// Returns false, leaving the block untouched, if the value would run
    /// past its end.
    fn write(&mut self, location: UniformLocation, value: UniformValue) -> bool {
        let bytes = value.as_bytes();
        let start = location.0 as usize;
        let end = start + bytes.len();
        match self.current.get_mut(start..end) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                true
            }
            None => {
                log::warn!(
                    "uniform write of {} bytes at offset {} overruns the {}-byte block",
                    bytes.len(),
                    start,
                    self.current.len()
                );
                false
            }
        }
    }

    /// Appends the current values and returns their dynamic offset.
    fn snapshot(&mut self) -> u32 {
        let offset = align_up(self.staging.len() as u64, self.align);
        self.staging.resize(offset as usize, 0);
        self.staging.extend_from_slice(&self.current);
        offset as u32
    }

    #[cfg(test)]
    fn snapshot_at(&self, offset: u32) -> &[u8] {
        let start = offset as usize;
        &self.staging[start..start + self.current.len()]
    }

    fn pending(&self) -> &[u8] {
        &self.staging
    }

    /// Drops this frame's snapshots. Current values are kept.
    fn discard(&mut self) {
        self.staging.clear();
    }
}

struct UniformSlots {
    block: UniformBlock,
    layout: wgpu::BindGroupLayout,
    values: UniformStaging,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
}

impl UniformSlots {
    fn new(
        device: &wgpu::Device,
        block: UniformBlock,
        layout: wgpu::BindGroupLayout,
        align: u64,
    ) -> Self {
        let capacity = align_up(block.size, align) * INITIAL_DRAW_CAPACITY;
        let buffer = Self::create_buffer(device, capacity);
        let bind_group = Self::create_bind_group(device, &layout, &buffer, &block);

        Self {
            values: UniformStaging::new(block.size, align),
            block,
            layout,
            buffer,
            bind_group,
            capacity,
        }
    }

    fn create_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Piece Uniforms"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
        block: &UniformBlock,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Piece Uniforms BindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: block.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(block.size),
                }),
            }],
        })
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.values.pending().is_empty() {
            return;
        }

        let needed = self.values.pending().len() as u64;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            self.buffer = Self::create_buffer(device, self.capacity);
            self.bind_group =
                Self::create_bind_group(device, &self.layout, &self.buffer, &self.block);
            log::debug!("Grew piece uniform buffer to {} bytes", self.capacity);
        }

        queue.write_buffer(&self.buffer, 0, self.values.pending());
        self.values.discard();
    }
}

struct Program {
    interface: ShaderInterface,
    pipeline: wgpu::RenderPipeline,
    uniforms: Option<UniformSlots>,
}

#[derive(Debug, Default, Clone, Copy)]
struct AttribState {
    enabled: bool,
    source: Option<(BufferId, u32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttribProblem {
    Disabled,
    Unbound,
    Components { bound: u32 },
    TooShort { holds: u64 },
}

impl std::fmt::Display for AttribProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttribProblem::Disabled => f.write_str("not enabled"),
            AttribProblem::Unbound => f.write_str("no buffer bound"),
            AttribProblem::Components { bound } => {
                write!(f, "buffer bound with {bound} components")
            }
            AttribProblem::TooShort { holds } => write!(f, "buffer holds only {holds} vertices"),
        }
    }
}

/// Checks that `input` can feed vertices `..end` from its bound buffer.
/// `buffer_size` looks up the byte size of a bound buffer.
fn check_attrib(
    input: &VertexInput,
    state: AttribState,
    end: u64,
    buffer_size: impl Fn(BufferId) -> u64,
) -> Result<BufferId, AttribProblem> {
    if !state.enabled {
        return Err(AttribProblem::Disabled);
    }
    let (buffer, components) = state.source.ok_or(AttribProblem::Unbound)?;
    if components != input.components() {
        return Err(AttribProblem::Components { bound: components });
    }
    let holds = buffer_size(buffer) / input.format.size();
    if end > holds {
        return Err(AttribProblem::TooShort { holds });
    }
    Ok(buffer)
}

struct RecordedDraw {
    program: usize,
    uniform_offset: Option<u32>,
    /// Indexed by vertex buffer slot.
    buffers: Vec<BufferId>,
    first: u32,
    count: u32,
}

pub struct WgpuBackend {
    pub gfx: GfxContext,
    depth: DepthTarget,
    uniform_align: u64,

    programs: Vec<Program>,
    buffers: Vec<wgpu::Buffer>,

    // GL-style bound state; persists across frames.
    current: Option<usize>,
    attribs: HashMap<u32, AttribState>,

    // This frame's work, consumed by `flush`.
    clear: Option<wgpu::Color>,
    draws: Vec<RecordedDraw>,
}

impl WgpuBackend {
    pub fn new(gfx: GfxContext) -> Self {
        let depth = DepthTarget::new(&gfx.device, gfx.size);
        let uniform_align = gfx.device.limits().min_uniform_buffer_offset_alignment as u64;

        Self {
            gfx,
            depth,
            uniform_align,
            programs: Vec::new(),
            buffers: Vec::new(),
            current: None,
            attribs: HashMap::new(),
            clear: None,
            draws: Vec::new(),
        }
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.depth.resize(&self.gfx.device, new_size);
        }
    }

    /// Replays the recorded frame into `target` and submits it.
    ///
    /// A frame with no recorded clear still clears to black; the swap chain
    /// image is undefined otherwise.
    pub fn flush(&mut self, target: &wgpu::TextureView) {
        let draws = std::mem::take(&mut self.draws);
        let clear = self.clear.take().unwrap_or(wgpu::Color::BLACK);

        for program in &mut self.programs {
            if let Some(uniforms) = program.uniforms.as_mut() {
                uniforms.upload(&self.gfx.device, &self.gfx.queue);
            }
        }

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Piece Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &draws {
                let program = &self.programs[draw.program];
                pass.set_pipeline(&program.pipeline);

                if let (Some(uniforms), Some(offset)) = (&program.uniforms, draw.uniform_offset) {
                    pass.set_bind_group(0, &uniforms.bind_group, &[offset]);
                }
                for (slot, buffer) in draw.buffers.iter().enumerate() {
                    pass.set_vertex_buffer(slot as u32, self.buffers[index_of(buffer.0)].slice(..));
                }

                pass.draw(draw.first..draw.first + draw.count, 0..1);
            }
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_pipeline(
        &self,
        interface: &ShaderInterface,
        vertex_src: &str,
        fragment_src: &str,
        uniform_layout: Option<&wgpu::BindGroupLayout>,
    ) -> wgpu::RenderPipeline {
        let device = &self.gfx.device;

        let vs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Piece Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(vertex_src.into()),
        });
        let fs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Piece Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(fragment_src.into()),
        });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = uniform_layout.into_iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Piece PipelineLayout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        // One tightly packed buffer per vertex input, slot order = location order.
        let attributes: Vec<[wgpu::VertexAttribute; 1]> = interface
            .inputs
            .iter()
            .map(|input| {
                [wgpu::VertexAttribute {
                    format: input.format,
                    offset: 0,
                    shader_location: input.location,
                }]
            })
            .collect();
        let vbuf_layouts: Vec<wgpu::VertexBufferLayout> = interface
            .inputs
            .iter()
            .zip(&attributes)
            .map(|(input, attributes)| wgpu::VertexBufferLayout {
                array_stride: input.format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Piece Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs,
                entry_point: &interface.vertex_entry,
                buffers: &vbuf_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            fragment: Some(wgpu::FragmentState {
                module: &fs,
                entry_point: &interface.fragment_entry,
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.gfx.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }
}

impl Gpu for WgpuBackend {
    fn create_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramId, ShaderError> {
        let interface = reflect::reflect(vertex_src, fragment_src)?;
        let device = &self.gfx.device;

        let uniform_layout = interface.uniforms.as_ref().map(|block| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Piece Uniforms Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: block.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(block.size),
                    },
                    count: None,
                }],
            })
        });

        // Reflection already validated each stage; this catches mismatches
        // between them and anything wgpu rejects on this device.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline =
            self.create_pipeline(&interface, vertex_src, fragment_src, uniform_layout.as_ref());
        if let Some(err) = pollster::block_on(self.gfx.device.pop_error_scope()) {
            return Err(ShaderError::Link(err.to_string()));
        }

        let uniforms = match (interface.uniforms.clone(), uniform_layout) {
            (Some(block), Some(layout)) => Some(UniformSlots::new(
                &self.gfx.device,
                block,
                layout,
                self.uniform_align,
            )),
            _ => None,
        };

        self.programs.push(Program {
            interface,
            pipeline,
            uniforms,
        });
        Ok(ProgramId(id_for(self.programs.len() - 1)))
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        let program = self.programs.get(index_of(program.0))?;
        program
            .interface
            .input(name)
            .map(|input| AttribLocation(input.location))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let program = self.programs.get(index_of(program.0))?;
        program
            .uniforms
            .as_ref()?
            .block
            .member(name)
            .map(|member| UniformLocation(member.offset))
    }

    fn create_static_buffer(&mut self, label: &str, contents: &[u8]) -> BufferId {
        let buffer = self
            .gfx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.buffers.push(buffer);
        BufferId(id_for(self.buffers.len() - 1))
    }

    fn clear(&mut self, color: Vec4) {
        // Anything drawn before a clear is overwritten by it.
        self.draws.clear();
        for program in &mut self.programs {
            if let Some(uniforms) = program.uniforms.as_mut() {
                uniforms.values.discard();
            }
        }

        self.clear = Some(wgpu::Color {
            r: color.x as f64,
            g: color.y as f64,
            b: color.z as f64,
            a: color.w as f64,
        });
    }

    fn use_program(&mut self, program: ProgramId) {
        let index = index_of(program.0);
        if index < self.programs.len() {
            self.current = Some(index);
        } else {
            log::warn!("use_program: unknown program {:?}", program);
        }
    }

    fn set_uniform(&mut self, location: Option<UniformLocation>, value: UniformValue) {
        let Some(location) = location else {
            return;
        };
        let Some(index) = self.current else {
            log::warn!("set_uniform with no program in use");
            return;
        };
        if let Some(uniforms) = self.programs[index].uniforms.as_mut() {
            uniforms.values.write(location, value);
        }
    }

    fn enable_attrib(&mut self, location: Option<AttribLocation>) {
        if let Some(location) = location {
            self.attribs.entry(location.0).or_default().enabled = true;
        }
    }

    fn disable_attrib(&mut self, location: Option<AttribLocation>) {
        if let Some(location) = location {
            self.attribs.entry(location.0).or_default().enabled = false;
        }
    }

    fn attrib_pointer(
        &mut self,
        location: Option<AttribLocation>,
        buffer: BufferId,
        components: u32,
    ) {
        if let Some(location) = location {
            self.attribs.entry(location.0).or_default().source = Some((buffer, components));
        }
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        if count == 0 {
            return;
        }
        let Some(index) = self.current else {
            log::warn!("draw with no program in use");
            return;
        };

        let program = &mut self.programs[index];
        let end = first as u64 + count as u64;
        let mut buffers = Vec::with_capacity(program.interface.inputs.len());

        for input in &program.interface.inputs {
            let state = self.attribs.get(&input.location).copied().unwrap_or_default();
            let buffer_size = |id: BufferId| self.buffers[index_of(id.0)].size();
            match check_attrib(input, state, end, buffer_size) {
                Ok(buffer) => buffers.push(buffer),
                Err(problem) => {
                    log::warn!(
                        "draw skipped: attribute `{}` (location {}): {}",
                        input.name,
                        input.location,
                        problem
                    );
                    return;
                }
            }
        }

        let uniform_offset = program
            .uniforms
            .as_mut()
            .map(|uniforms| uniforms.values.snapshot());

        self.draws.push(RecordedDraw {
            program: index,
            uniform_offset,
            buffers,
            first,
            count,
        });
    }
}
