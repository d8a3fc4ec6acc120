//! In-memory [`Gpu`] that records every call, for tests.

use super::*;

pub const LIGHTING_ATTRIBS: &[&str] = &["position", "normal"];

pub const LIGHTING_UNIFORMS: &[&str] = &[
    "lightDirection",
    "lightAmbientColor",
    "lightDiffuseColor",
    "materialAmbientFactor",
    "materialDiffuseFactor",
    "model",
    "view",
    "projection",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateProgram(ProgramId),
    CreateBuffer {
        id: BufferId,
        label: String,
        len: usize,
    },
    Clear(Vec4),
    UseProgram(ProgramId),
    Uniform {
        location: UniformLocation,
        value: UniformValue,
    },
    EnableAttrib(AttribLocation),
    DisableAttrib(AttribLocation),
    AttribPointer {
        location: AttribLocation,
        buffer: BufferId,
        components: u32,
    },
    Draw {
        first: u32,
        count: u32,
    },
}

pub struct RecordingGpu {
    pub calls: Vec<Call>,
    /// Number of upcoming `create_program` calls that fail to link.
    pub failing_links: usize,
    pub attribs: Vec<&'static str>,
    pub uniforms: Vec<&'static str>,
    pub(crate) next_id: u32,
}

impl Default for RecordingGpu {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            failing_links: 0,
            attribs: LIGHTING_ATTRIBS.to_vec(),
            uniforms: LIGHTING_UNIFORMS.to_vec(),
            next_id: 0,
        }
    }
}

impl RecordingGpu {
    fn next(&mut self) -> NonZeroU32 {
        self.next_id += 1;
        NonZeroU32::new(self.next_id).expect("ids start at one")
    }

    pub fn draws(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    pub fn buffers_created(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::CreateBuffer { .. }))
            .count()
    }

    pub fn programs_created(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::CreateProgram(_)))
            .count()
    }

    /// Values written to `location`, in call order.
    pub fn uniform_writes(&self, location: UniformLocation) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Uniform { location: l, value } if *l == location => Some(*value),
                _ => None,
            })
            .collect()
    }
}

impl Gpu for RecordingGpu {
    fn create_program(&mut self, _: &str, _: &str) -> Result<ProgramId, ShaderError> {
        if self.failing_links > 0 {
            self.failing_links -= 1;
            return Err(ShaderError::Link("recording gpu told to fail".into()));
        }
        let id = ProgramId(self.next());
        self.calls.push(Call::CreateProgram(id));
        Ok(id)
    }

    fn attrib_location(&self, _: ProgramId, name: &str) -> Option<AttribLocation> {
        self.attribs
            .iter()
            .position(|a| *a == name)
            .map(|i| AttribLocation(i as u32))
    }

    fn uniform_location(&self, _: ProgramId, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .position(|u| *u == name)
            .map(|i| UniformLocation(i as u32 * 16))
    }

    fn create_static_buffer(&mut self, label: &str, contents: &[u8]) -> BufferId {
        let id = BufferId(self.next());
        self.calls.push(Call::CreateBuffer {
            id,
            label: label.to_string(),
            len: contents.len(),
        });
        id
    }

    fn clear(&mut self, color: Vec4) {
        self.calls.push(Call::Clear(color));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(Call::UseProgram(program));
    }

    fn set_uniform(&mut self, location: Option<UniformLocation>, value: UniformValue) {
        if let Some(location) = location {
            self.calls.push(Call::Uniform { location, value });
        }
    }

    fn enable_attrib(&mut self, location: Option<AttribLocation>) {
        if let Some(location) = location {
            self.calls.push(Call::EnableAttrib(location));
        }
    }

    fn disable_attrib(&mut self, location: Option<AttribLocation>) {
        if let Some(location) = location {
            self.calls.push(Call::DisableAttrib(location));
        }
    }

    fn attrib_pointer(
        &mut self,
        location: Option<AttribLocation>,
        buffer: BufferId,
        components: u32,
    ) {
        if let Some(location) = location {
            self.calls.push(Call::AttribPointer {
                location,
                buffer,
                components,
            });
        }
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        self.calls.push(Call::Draw { first, count });
    }
}
