//! MESHPACK: deflate-packed per-piece mesh payloads.
//!
//! Every piece of a model ships as two independent streams:
//!
//!   vertices : raw deflate( f32 x, f32 y, f32 z  per vertex )
//!   normals  : raw deflate( f32 nx, f32 ny, f32 nz per vertex )
//!
//! Floats are little-endian and tightly packed (stride 12). Vertices form a
//! triangle list, so three consecutive vertices make one triangle. There is no
//! header and no zlib wrapper; the streams are produced offline and embedded in
//! the binary, which is why a payload that fails to inflate is treated as a
//! build error by callers rather than something to recover from.
//!
//! Invariants checked by [`decode_piece`]:
//!   - both inflated streams are non-empty,
//!   - both are a multiple of [`BYTES_PER_VERTEX`],
//!   - both have the same length.

use miniz_oxide::deflate::compress_to_vec;
use miniz_oxide::inflate::decompress_to_vec;
use thiserror::Error;

/// Components per position/normal.
pub const COORDS_PER_VERTEX: usize = 3;

/// Four bytes per f32 component.
pub const BYTES_PER_VERTEX: usize = COORDS_PER_VERTEX * std::mem::size_of::<f32>();

/// Compression level the asset pipeline uses.
pub const DEFAULT_LEVEL: u8 = 9;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshpackError {
    #[error("deflate stream is corrupt ({status})")]
    Inflate { status: String },

    #[error("{stream} stream inflated to zero bytes")]
    Empty { stream: Stream },

    #[error("{stream} stream is {len} bytes, not a multiple of 12")]
    Misaligned { stream: Stream, len: usize },

    #[error("vertex stream is {vertices} bytes but normal stream is {normals} bytes")]
    LengthMismatch { vertices: usize, normals: usize },
}

/// Which of the two per-piece streams an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Vertices,
    Normals,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stream::Vertices => f.write_str("vertex"),
            Stream::Normals => f.write_str("normal"),
        }
    }
}

/// Inflates a whole raw deflate stream in one call.
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>, MeshpackError> {
    decompress_to_vec(compressed).map_err(|e| MeshpackError::Inflate {
        status: format!("{:?}", e.status),
    })
}

/// Deflates `raw` without a zlib header, the inverse of [`inflate`].
pub fn deflate(raw: &[u8], level: u8) -> Vec<u8> {
    compress_to_vec(raw, level)
}

/// Inflated, validated geometry for one piece.
#[derive(Debug, Clone)]
pub struct DecodedPiece {
    pub vertices: Vec<u8>,
    pub normals: Vec<u8>,
}

impl DecodedPiece {
    /// Number of vertices in the triangle list.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / BYTES_PER_VERTEX
    }
}

/// Inflates both streams of a piece and checks that they describe the same
/// number of tightly packed vec3s.
pub fn decode_piece(vertices: &[u8], normals: &[u8]) -> Result<DecodedPiece, MeshpackError> {
    let vertices = inflate(vertices)?;
    check_stream(Stream::Vertices, &vertices)?;

    let normals = inflate(normals)?;
    check_stream(Stream::Normals, &normals)?;

    if vertices.len() != normals.len() {
        return Err(MeshpackError::LengthMismatch {
            vertices: vertices.len(),
            normals: normals.len(),
        });
    }

    Ok(DecodedPiece { vertices, normals })
}

#[inline]
fn check_stream(stream: Stream, bytes: &[u8]) -> Result<(), MeshpackError> {
    if bytes.is_empty() {
        return Err(MeshpackError::Empty { stream });
    }
    if bytes.len() % BYTES_PER_VERTEX != 0 {
        return Err(MeshpackError::Misaligned {
            stream,
            len: bytes.len(),
        });
    }
    Ok(())
}

/// Packs floats as little-endian bytes, the layout both streams use.
pub fn encode_f32s(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Reads an inflated stream back as vec3s. Trailing bytes that do not form a
/// whole vec3 are ignored.
pub fn decode_vec3s(bytes: &[u8]) -> Vec<[f32; 3]> {
    bytes
        .chunks_exact(BYTES_PER_VERTEX)
        .map(|c| {
            [
                f32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                f32::from_le_bytes([c[4], c[5], c[6], c[7]]),
                f32::from_le_bytes([c[8], c[9], c[10], c[11]]),
            ]
        })
        .collect()
}

/// Axis-aligned bounds of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

pub fn bounds(points: &[[f32; 3]]) -> Option<Aabb> {
    let (first, rest) = points.split_first()?;
    let mut aabb = Aabb {
        min: *first,
        max: *first,
    };
    for p in rest {
        for axis in 0..3 {
            aabb.min[axis] = aabb.min[axis].min(p[axis]);
            aabb.max[axis] = aabb.max[axis].max(p[axis]);
        }
    }
    Some(aabb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<f32> {
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
    }

    fn packed(values: &[f32]) -> Vec<u8> {
        deflate(&encode_f32s(values), DEFAULT_LEVEL)
    }

    #[test]
    fn decodes_single_triangle() {
        let normals = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let piece = decode_piece(&packed(&triangle()), &packed(&normals)).unwrap();

        assert_eq!(piece.vertices.len(), 36);
        assert_eq!(piece.vertex_count(), 3);
        assert_eq!(decode_vec3s(&piece.normals)[2], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn rejects_corrupt_stream() {
        let mut vertices = packed(&triangle());
        // 0b11 in the block-type bits is a reserved (invalid) deflate block.
        vertices[0] |= 0b110;
        let err = decode_piece(&vertices, &packed(&triangle())).unwrap_err();
        assert!(matches!(err, MeshpackError::Inflate { .. }), "{err:?}");
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut six = triangle();
        six.extend(triangle());
        let err = decode_piece(&packed(&triangle()), &packed(&six)).unwrap_err();
        assert_eq!(
            err,
            MeshpackError::LengthMismatch {
                vertices: 36,
                normals: 72
            }
        );
    }

    #[test]
    fn rejects_misaligned_and_empty_streams() {
        let err = decode_piece(&packed(&[1.0, 2.0]), &packed(&[1.0, 2.0])).unwrap_err();
        assert_eq!(
            err,
            MeshpackError::Misaligned {
                stream: Stream::Vertices,
                len: 8
            }
        );

        let err = decode_piece(&packed(&triangle()), &packed(&[])).unwrap_err();
        assert_eq!(
            err,
            MeshpackError::Empty {
                stream: Stream::Normals
            }
        );
    }

    #[test]
    fn bounds_cover_all_points() {
        let pts = decode_vec3s(&encode_f32s(&[1.0, -2.0, 3.0, -1.0, 4.0, 0.5]));
        let aabb = bounds(&pts).unwrap();
        assert_eq!(aabb.min, [-1.0, -2.0, 0.5]);
        assert_eq!(aabb.max, [1.0, 4.0, 3.0]);
        assert!(bounds(&[]).is_none());
    }
}
