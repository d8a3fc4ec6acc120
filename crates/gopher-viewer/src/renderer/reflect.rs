//! WGSL reflection: which vertex inputs and uniform members a program
//! declares, and where they live.

use crate::gpu::{ShaderError, ShaderStage};
use naga::valid::{Capabilities, ValidationFlags, Validator};

/// One `@location(n)` input of the vertex entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

impl VertexInput {
    pub fn components(&self) -> u32 {
        (self.format.size() / 4) as u32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
}

/// The program's single `var<uniform>` struct at `@group(0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    pub binding: u32,
    pub size: u64,
    pub members: Vec<UniformMember>,
}

impl UniformBlock {
    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ShaderInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    /// Sorted by location; index is the vertex buffer slot.
    pub inputs: Vec<VertexInput>,
    pub uniforms: Option<UniformBlock>,
}

impl ShaderInterface {
    pub fn input(&self, name: &str) -> Option<&VertexInput> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

/// Parses and validates one stage.
pub fn compile(stage: ShaderStage, source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage,
            message: e.emit_to_string(source),
        })?;

    Ok(module)
}

/// Compiles both stages and extracts the interface the renderer binds to.
pub fn reflect(vertex_src: &str, fragment_src: &str) -> Result<ShaderInterface, ShaderError> {
    let vs = compile(ShaderStage::Vertex, vertex_src)?;
    let fs = compile(ShaderStage::Fragment, fragment_src)?;

    let vertex_ep = vs
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex)
        .ok_or_else(|| ShaderError::Link("vertex source has no @vertex entry point".into()))?;
    let fragment_ep = fs
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Fragment)
        .ok_or_else(|| ShaderError::Link("fragment source has no @fragment entry point".into()))?;

    let mut inputs = Vec::new();
    for arg in &vertex_ep.function.arguments {
        match &arg.binding {
            Some(binding) => {
                if let Some(input) = vertex_input(&vs, arg.name.as_deref(), binding, arg.ty)? {
                    inputs.push(input);
                }
            }
            // Inputs grouped in a struct carry their bindings on the members.
            None => {
                if let naga::TypeInner::Struct { members, .. } = &vs.types[arg.ty].inner {
                    for member in members {
                        if let Some(binding) = &member.binding {
                            if let Some(input) =
                                vertex_input(&vs, member.name.as_deref(), binding, member.ty)?
                            {
                                inputs.push(input);
                            }
                        }
                    }
                }
            }
        }
    }
    inputs.sort_by_key(|i| i.location);

    let uniforms = match uniform_block(&vs)? {
        Some(block) => Some(block),
        None => uniform_block(&fs)?,
    };

    Ok(ShaderInterface {
        vertex_entry: vertex_ep.name.clone(),
        fragment_entry: fragment_ep.name.clone(),
        inputs,
        uniforms,
    })
}

fn vertex_input(
    module: &naga::Module,
    name: Option<&str>,
    binding: &naga::Binding,
    ty: naga::Handle<naga::Type>,
) -> Result<Option<VertexInput>, ShaderError> {
    let naga::Binding::Location { location, .. } = *binding else {
        // Builtins such as vertex_index are not fed from buffers.
        return Ok(None);
    };

    let name = name.unwrap_or_default().to_string();
    let format = vertex_format(&module.types[ty].inner).ok_or_else(|| {
        ShaderError::Link(format!(
            "vertex input `{}` at location {} must be f32, vec2, vec3 or vec4 of f32",
            name, location
        ))
    })?;

    Ok(Some(VertexInput {
        name,
        location,
        format,
    }))
}

fn vertex_format(inner: &naga::TypeInner) -> Option<wgpu::VertexFormat> {
    let is_f32 = |s: naga::Scalar| s.kind == naga::ScalarKind::Float && s.width == 4;
    match *inner {
        naga::TypeInner::Scalar(scalar) if is_f32(scalar) => Some(wgpu::VertexFormat::Float32),
        naga::TypeInner::Vector { size, scalar } if is_f32(scalar) => Some(match size {
            naga::VectorSize::Bi => wgpu::VertexFormat::Float32x2,
            naga::VectorSize::Tri => wgpu::VertexFormat::Float32x3,
            naga::VectorSize::Quad => wgpu::VertexFormat::Float32x4,
        }),
        _ => None,
    }
}

fn uniform_block(module: &naga::Module) -> Result<Option<UniformBlock>, ShaderError> {
    let Some(var) = module
        .global_variables
        .iter()
        .map(|(_, var)| var)
        .find(|var| var.space == naga::AddressSpace::Uniform)
    else {
        return Ok(None);
    };

    let Some(binding) = &var.binding else {
        return Ok(None);
    };
    if binding.group != 0 {
        return Err(ShaderError::Link(format!(
            "uniform block must be in @group(0), found @group({})",
            binding.group
        )));
    }

    let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
        return Err(ShaderError::Link(
            "uniform block must be a struct so members can be looked up by name".into(),
        ));
    };

    let members = members
        .iter()
        .map(|m| UniformMember {
            name: m.name.clone().unwrap_or_default(),
            offset: m.offset,
        })
        .collect();

    Ok(Some(UniformBlock {
        binding: binding.binding,
        size: *span as u64,
        members,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shader::{FRAGMENT_SHADER, VERTEX_SHADER};

    #[test]
    fn lighting_shader_interface() {
        let iface = reflect(VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        assert_eq!(iface.vertex_entry, "vs_main");
        assert_eq!(iface.fragment_entry, "fs_main");

        let position = iface.input("position").unwrap();
        assert_eq!(position.location, 0);
        assert_eq!(position.format, wgpu::VertexFormat::Float32x3);
        assert_eq!(position.components(), 3);
        assert_eq!(iface.input("normal").unwrap().location, 1);

        let block = iface.uniforms.unwrap();
        assert_eq!(block.binding, 0);
        assert_eq!(block.size, 272);
        for (name, offset) in [
            ("model", 0),
            ("view", 64),
            ("projection", 128),
            ("lightAmbientColor", 192),
            ("lightDiffuseColor", 208),
            ("materialAmbientFactor", 224),
            ("materialDiffuseFactor", 240),
            ("lightDirection", 256),
        ] {
            assert_eq!(block.member(name).map(|m| m.offset), Some(offset), "{name}");
        }
        assert!(block.member("materialShininess").is_none());
    }

    #[test]
    fn struct_inputs_are_found() {
        let vs = r#"
            struct In {
                @location(2) uv: vec2<f32>,
                @location(0) pos: vec4<f32>,
                @builtin(vertex_index) index: u32,
            }
            @vertex
            fn main(v: In) -> @builtin(position) vec4<f32> {
                return v.pos + vec4<f32>(v.uv, 0.0, 0.0);
            }
        "#;
        let fs = r#"
            @fragment
            fn main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
        "#;
        let iface = reflect(vs, fs).unwrap();
        let locations: Vec<_> = iface
            .inputs
            .iter()
            .map(|i| (i.name.as_str(), i.location))
            .collect();
        assert_eq!(locations, [("pos", 0), ("uv", 2)]);
        assert!(iface.uniforms.is_none());
    }

    #[test]
    fn syntax_error_names_the_stage() {
        let err = reflect(VERTEX_SHADER, "@fragment fn fs_main( {").unwrap_err();
        assert!(
            matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }),
            "{err}"
        );
    }

    #[test]
    fn integer_inputs_are_rejected() {
        let vs = r#"
            @vertex
            fn main(@location(0) id: u32) -> @builtin(position) vec4<f32> {
                return vec4<f32>(f32(id));
            }
        "#;
        let err = reflect(vs, FRAGMENT_SHADER).unwrap_err();
        assert!(matches!(err, ShaderError::Link(_)), "{err}");
    }
}
