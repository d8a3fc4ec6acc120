//! The lighting program and the handles the draw loop writes through.

use crate::gpu::{AttribLocation, Gpu, ProgramId, ShaderError, UniformLocation};

pub const VERTEX_SHADER: &str = include_str!("../../shaders/lighting.vert.wgsl");
pub const FRAGMENT_SHADER: &str = include_str!("../../shaders/lighting.frag.wgsl");

/// A linked program plus its resolved attribute and uniform slots. Built once,
/// never mutated.
#[derive(Debug, Clone)]
pub struct ShaderPipeline {
    pub program: ProgramId,

    pub position: Option<AttribLocation>,
    pub normal: Option<AttribLocation>,

    pub light_direction: Option<UniformLocation>,
    pub light_ambient_color: Option<UniformLocation>,
    pub light_diffuse_color: Option<UniformLocation>,
    pub material_ambient_factor: Option<UniformLocation>,
    pub material_diffuse_factor: Option<UniformLocation>,
    pub model: Option<UniformLocation>,
    pub view: Option<UniformLocation>,
    pub projection: Option<UniformLocation>,
}

impl ShaderPipeline {
    /// Links the built-in lighting shader.
    pub fn lighting<G: Gpu>(gpu: &mut G) -> Result<Self, ShaderError> {
        Self::initialize(gpu, VERTEX_SHADER, FRAGMENT_SHADER)
    }

    pub fn initialize<G: Gpu>(
        gpu: &mut G,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, ShaderError> {
        let program = gpu.create_program(vertex_src, fragment_src)?;

        let attrib = |name: &str| {
            let loc = gpu.attrib_location(program, name);
            if loc.is_none() {
                log::debug!("attribute `{}` is not used by the program", name);
            }
            loc
        };
        let position = attrib("position");
        let normal = attrib("normal");

        let uniform = |name: &str| {
            let loc = gpu.uniform_location(program, name);
            if loc.is_none() {
                log::debug!("uniform `{}` is not used by the program", name);
            }
            loc
        };

        Ok(Self {
            program,
            position,
            normal,
            light_direction: uniform("lightDirection"),
            light_ambient_color: uniform("lightAmbientColor"),
            light_diffuse_color: uniform("lightDiffuseColor"),
            material_ambient_factor: uniform("materialAmbientFactor"),
            material_diffuse_factor: uniform("materialDiffuseFactor"),
            model: uniform("model"),
            view: uniform("view"),
            projection: uniform("projection"),
        })
    }
}
