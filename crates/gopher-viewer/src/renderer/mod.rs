//! The piece renderer. Owns initialization state and issues one frame's worth
//! of GPU calls per `draw`.

pub mod backend;
pub mod context;
pub mod mesh;
pub mod reflect;
pub mod shader;
pub mod targets;

use self::{mesh::GpuMesh, shader::ShaderPipeline};
use crate::{
    assets::AssetStore,
    camera::{SurfaceSize, TransformController, Transforms},
    gpu::{Gpu, UniformValue},
    touch::TouchSample,
};
use glam::{Vec3, Vec4};
use meshpack::MeshpackError;
use thiserror::Error;

pub const CLEAR_COLOR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);
pub const LIGHT_DIRECTION: Vec3 = Vec3::new(0.5, 0.5, 0.0);
pub const MATERIAL_DIFFUSE_FACTOR: Vec4 = Vec4::new(0.8, 0.8, 0.8, 1.0);
pub const MATERIAL_AMBIENT_FACTOR: Vec4 = Vec4::new(0.5, 0.5, 0.5, 0.5);

#[derive(Debug, Error)]
pub enum RenderError {
    /// Compiled-in mesh data failed to unpack. Not recoverable.
    #[error("embedded mesh data for piece `{piece}` is corrupt")]
    AssetCorruption {
        piece: String,
        #[source]
        source: MeshpackError,
    },
}

/// Everything that exists once initialization has succeeded.
#[derive(Debug)]
pub struct Scene {
    pub pipeline: ShaderPipeline,
    pub meshes: Vec<GpuMesh>,
}

#[derive(Debug)]
pub enum RendererState {
    Uninitialized,
    Initializing,
    Ready(Scene),
}

/// What a call to [`Renderer::draw`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn { draw_calls: usize },
    /// Initialization did not complete; nothing was drawn.
    Skipped,
}

pub struct Renderer {
    state: RendererState,
    assets: AssetStore,
    transforms: TransformController,
}

impl Renderer {
    pub fn new(assets: AssetStore) -> Self {
        Self::with_transforms(assets, TransformController::default())
    }

    pub fn with_transforms(assets: AssetStore, transforms: TransformController) -> Self {
        Self {
            state: RendererState::Uninitialized,
            assets,
            transforms,
        }
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::Ready(_))
    }

    pub fn scene(&self) -> Option<&Scene> {
        match &self.state {
            RendererState::Ready(scene) => Some(scene),
            _ => None,
        }
    }

    /// Renders one frame, initializing first if needed.
    ///
    /// A shader failure leaves the renderer uninitialized and the frame
    /// skipped; the next call tries again. Corrupt embedded assets are
    /// returned as an error and should end the process.
    pub fn draw<G: Gpu>(
        &mut self,
        gpu: &mut G,
        touch: TouchSample,
        surface: SurfaceSize,
    ) -> Result<FrameOutcome, RenderError> {
        if matches!(self.state, RendererState::Uninitialized) {
            self.initialize(gpu)?;
        }

        let RendererState::Ready(scene) = &self.state else {
            return Ok(FrameOutcome::Skipped);
        };

        let transforms = self.transforms.compute(touch, surface);
        let draw_calls = draw_scene(gpu, scene, &transforms);
        Ok(FrameOutcome::Drawn { draw_calls })
    }

    fn initialize<G: Gpu>(&mut self, gpu: &mut G) -> Result<(), RenderError> {
        self.state = RendererState::Initializing;

        let pipeline = match ShaderPipeline::lighting(gpu) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                log::error!("error creating GPU program: {}", err);
                self.state = RendererState::Uninitialized;
                return Ok(());
            }
        };

        let meshes = match mesh::upload_all(gpu, &self.assets) {
            Ok(meshes) => meshes,
            Err(err) => {
                self.state = RendererState::Uninitialized;
                return Err(err);
            }
        };

        log::info!(
            "Rendering initialized: {} pieces, {} vertices.",
            meshes.len(),
            meshes.iter().map(|m| m.vertex_count as u64).sum::<u64>()
        );

        self.state = RendererState::Ready(Scene { pipeline, meshes });
        Ok(())
    }
}

/// Issues the GPU calls for one frame. Returns the number of draw calls.
fn draw_scene<G: Gpu>(gpu: &mut G, scene: &Scene, t: &Transforms) -> usize {
    let p = &scene.pipeline;

    gpu.clear(CLEAR_COLOR);
    gpu.use_program(p.program);

    gpu.set_uniform(p.projection, UniformValue::Mat4(t.projection));
    gpu.set_uniform(p.view, UniformValue::Mat4(t.view));
    gpu.set_uniform(p.model, UniformValue::Mat4(t.model));

    gpu.set_uniform(p.light_direction, UniformValue::Vec3(LIGHT_DIRECTION));
    gpu.set_uniform(p.material_diffuse_factor, UniformValue::Vec4(MATERIAL_DIFFUSE_FACTOR));
    gpu.set_uniform(p.material_ambient_factor, UniformValue::Vec4(MATERIAL_AMBIENT_FACTOR));

    gpu.enable_attrib(p.normal);
    gpu.enable_attrib(p.position);

    for mesh in &scene.meshes {
        // One color feeds both light terms.
        gpu.set_uniform(p.light_diffuse_color, UniformValue::Vec4(mesh.color));
        gpu.set_uniform(p.light_ambient_color, UniformValue::Vec4(mesh.color));

        gpu.attrib_pointer(p.position, mesh.vertices, mesh::COMPONENTS);
        gpu.attrib_pointer(p.normal, mesh.normals, mesh::COMPONENTS);

        gpu.draw_triangles(0, mesh.vertex_count);
    }

    gpu.disable_attrib(p.normal);
    gpu.disable_attrib(p.position);

    scene.meshes.len()
}
