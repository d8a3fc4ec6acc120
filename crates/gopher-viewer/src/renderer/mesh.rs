//! GPU-resident copies of the pieces.

use crate::assets::AssetStore;
use crate::gpu::{BufferId, Gpu};
use crate::renderer::RenderError;
use glam::Vec4;
use meshpack::{DecodedPiece, COORDS_PER_VERTEX};

/// Tightly packed f32 components per vertex in both buffers.
pub const COMPONENTS: u32 = COORDS_PER_VERTEX as u32;

/// Position and normal buffers for one piece, created once per GPU context.
#[derive(Debug, Clone)]
pub struct GpuMesh {
    pub name: String,
    pub vertices: BufferId,
    pub normals: BufferId,
    pub vertex_count: u32,
    pub color: Vec4,
}

impl GpuMesh {
    pub fn upload<G: Gpu>(gpu: &mut G, name: &str, color: Vec4, piece: &DecodedPiece) -> Self {
        let vertices = gpu.create_static_buffer(&format!("{name} vertices"), &piece.vertices);
        let normals = gpu.create_static_buffer(&format!("{name} normals"), &piece.normals);

        Self {
            name: name.to_string(),
            vertices,
            normals,
            vertex_count: piece.vertex_count() as u32,
            color,
        }
    }
}

/// Decodes every piece, then uploads them in declaration order.
///
/// Nothing is allocated on the GPU unless every piece decodes.
pub fn upload_all<G: Gpu>(gpu: &mut G, store: &AssetStore) -> Result<Vec<GpuMesh>, RenderError> {
    let decoded = store.decode_all()?;

    let meshes = store
        .pieces()
        .iter()
        .zip(&decoded)
        .map(|(asset, piece)| {
            let mesh = GpuMesh::upload(gpu, &asset.name, asset.color, piece);
            if !log::log_enabled!(log::Level::Debug) {
                return mesh;
            }
            if let Some(aabb) = meshpack::bounds(&meshpack::decode_vec3s(&piece.vertices)) {
                log::debug!(
                    "Piece {}: vertices={}, bounds min={:?} max={:?}",
                    mesh.name,
                    mesh.vertex_count,
                    aabb.min,
                    aabb.max
                );
            }
            mesh
        })
        .collect();

    Ok(meshes)
}
