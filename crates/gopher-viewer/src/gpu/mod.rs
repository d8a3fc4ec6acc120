//! The immediate-mode rendering contract the piece renderer is written
//! against.
//!
//! The shape follows a classic GL-style API: programs are linked from a
//! vertex/fragment source pair, attributes and uniforms are looked up by
//! name, vertex data lives in static buffers, and a frame is a sequence of
//! state changes followed by triangle-list draws. The production
//! implementation is [`crate::renderer::backend::WgpuBackend`].

#[cfg(test)]
pub mod recording;

use glam::{Mat4, Vec3, Vec4};
use std::num::NonZeroU32;
use thiserror::Error;

/// A linked shader program. Ids are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub NonZeroU32);

/// A static vertex buffer. Ids are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub NonZeroU32);

/// Vertex attribute slot (`@location` in WGSL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribLocation(pub u32);

/// Uniform slot. For the wgpu backend this is the byte offset of the member
/// inside the program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    /// Raw bytes as they are laid out in a uniform block.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(m) => bytemuck::bytes_of(m),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{message}")]
    Compile { stage: ShaderStage, message: String },

    #[error("program failed to link: {0}")]
    Link(String),
}

/// Everything the renderer needs from the graphics API.
///
/// Lookups that name something the program does not declare return `None`;
/// every setter accepts `None` and ignores it, the same way GL ignores
/// location `-1`.
pub trait Gpu {
    fn create_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramId, ShaderError>;

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation>;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Creates a write-once, read-many vertex buffer holding `contents`.
    fn create_static_buffer(&mut self, label: &str, contents: &[u8]) -> BufferId;

    /// Clears color to `color` and depth to the far plane.
    fn clear(&mut self, color: Vec4);

    fn use_program(&mut self, program: ProgramId);

    /// Writes a uniform of the program currently in use.
    fn set_uniform(&mut self, location: Option<UniformLocation>, value: UniformValue);

    fn enable_attrib(&mut self, location: Option<AttribLocation>);

    fn disable_attrib(&mut self, location: Option<AttribLocation>);

    /// Sources `location` from `buffer` as tightly packed f32 tuples of
    /// `components` elements.
    fn attrib_pointer(
        &mut self,
        location: Option<AttribLocation>,
        buffer: BufferId,
        components: u32,
    );

    /// Draws `count` vertices as a triangle list, starting at `first`.
    fn draw_triangles(&mut self, first: u32, count: u32);
}
