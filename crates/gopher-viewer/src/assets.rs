//! Embedded gopher geometry and the store that unpacks it.

use crate::renderer::RenderError;
use glam::Vec4;
use meshpack::DecodedPiece;
use rayon::prelude::*;
use std::borrow::Cow;

/// Brownish.
pub const GOPHER_SKIN: Vec4 = Vec4::new(0.761, 0.442, 0.180, 1.0);
/// Blue.
pub const GOPHER_FUR: Vec4 = Vec4::new(0.0, 0.537, 0.8, 1.0);
pub const WHITE: Vec4 = Vec4::new(1.0, 1.0, 1.0, 1.0);

/// One rigid part of the model: two deflated vec3 streams and a color.
#[derive(Debug, Clone)]
pub struct PieceAsset {
    pub name: Cow<'static, str>,
    pub vertices: Cow<'static, [u8]>,
    pub normals: Cow<'static, [u8]>,
    pub color: Vec4,
}

impl PieceAsset {
    pub const fn embedded(
        name: &'static str,
        vertices: &'static [u8],
        normals: &'static [u8],
        color: Vec4,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            vertices: Cow::Borrowed(vertices),
            normals: Cow::Borrowed(normals),
            color,
        }
    }

    /// Inflates and validates both streams.
    pub fn decode(&self) -> Result<DecodedPiece, RenderError> {
        meshpack::decode_piece(&self.vertices, &self.normals).map_err(|source| {
            RenderError::AssetCorruption {
                piece: self.name.to_string(),
                source,
            }
        })
    }
}

macro_rules! gopher_piece {
    ($name:literal, $color:expr) => {
        PieceAsset::embedded(
            $name,
            include_bytes!(concat!("../assets/gopher/", $name, ".vertices.deflate")),
            include_bytes!(concat!("../assets/gopher/", $name, ".normals.deflate")),
            $color,
        )
    };
}

/// Declaration order is draw order.
static GOPHER_PIECES: [PieceAsset; 12] = [
    gopher_piece!("body", GOPHER_FUR),
    gopher_piece!("tail", GOPHER_SKIN),
    gopher_piece!("foot_r_001", GOPHER_SKIN),
    gopher_piece!("foot_r", GOPHER_SKIN),
    gopher_piece!("hand_l", GOPHER_SKIN),
    gopher_piece!("hand_r", GOPHER_SKIN),
    gopher_piece!("tooth", WHITE),
    gopher_piece!("ear_r", GOPHER_FUR),
    gopher_piece!("ear_l", GOPHER_FUR),
    gopher_piece!("nose", GOPHER_SKIN),
    gopher_piece!("eye_r", WHITE),
    gopher_piece!("eye_l", WHITE),
];

/// Ordered list of pieces making up the model.
#[derive(Debug, Clone)]
pub struct AssetStore {
    pieces: Vec<PieceAsset>,
}

impl AssetStore {
    pub fn new(pieces: Vec<PieceAsset>) -> Self {
        Self { pieces }
    }

    /// The built-in 12-piece gopher.
    pub fn gopher() -> Self {
        Self::new(GOPHER_PIECES.to_vec())
    }

    pub fn pieces(&self) -> &[PieceAsset] {
        &self.pieces
    }

    pub fn pieces_mut(&mut self) -> &mut [PieceAsset] {
        &mut self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Inflates a single embedded stream.
    pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, meshpack::MeshpackError> {
        meshpack::inflate(bytes)
    }

    /// Decodes every piece. Pieces are independent, so this runs in parallel;
    /// results keep declaration order.
    pub fn decode_all(&self) -> Result<Vec<DecodedPiece>, RenderError> {
        self.pieces.par_iter().map(PieceAsset::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshpack::BYTES_PER_VERTEX;

    #[test]
    fn gopher_has_twelve_pieces_in_order() {
        let store = AssetStore::gopher();
        let names: Vec<_> = store.pieces().iter().map(|p| p.name.as_ref()).collect();
        assert_eq!(
            names,
            [
                "body", "tail", "foot_r_001", "foot_r", "hand_l", "hand_r", "tooth", "ear_r",
                "ear_l", "nose", "eye_r", "eye_l"
            ]
        );
        assert_eq!(store.pieces()[0].color, GOPHER_FUR);
        assert_eq!(store.pieces()[1].color, Vec4::new(0.761, 0.442, 0.180, 1.0));
    }

    #[test]
    fn every_piece_decodes_to_matching_streams() {
        let store = AssetStore::gopher();
        let decoded = store.decode_all().unwrap();
        assert_eq!(decoded.len(), store.len());

        for (asset, piece) in store.pieces().iter().zip(&decoded) {
            let raw = AssetStore::decompress(&asset.vertices).unwrap();
            assert_eq!(raw.len(), piece.vertices.len(), "{}", asset.name);
            assert_eq!(piece.vertices.len(), piece.normals.len(), "{}", asset.name);
            assert_eq!(piece.vertices.len() % BYTES_PER_VERTEX, 0, "{}", asset.name);
            assert_eq!(piece.vertex_count(), piece.vertices.len() / 12);
            assert!(piece.vertex_count() > 0);
            assert_eq!(piece.vertex_count() % 3, 0, "{} is not a triangle list", asset.name);
        }
    }

    #[test]
    fn normals_are_unit_length() {
        let store = AssetStore::gopher();
        let piece = store.pieces()[0].decode().unwrap();
        for n in meshpack::decode_vec3s(&piece.normals) {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-4, "{n:?}");
        }
    }

    #[test]
    fn corrupt_piece_names_itself() {
        let mut store = AssetStore::gopher();
        let mut bytes = store.pieces()[3].vertices.to_vec();
        bytes[0] |= 0b110;
        store.pieces_mut()[3].vertices = Cow::Owned(bytes);

        match store.decode_all() {
            Err(RenderError::AssetCorruption { piece, .. }) => assert_eq!(piece, "foot_r"),
            other => panic!("expected corruption, got {other:?}"),
        }
    }
}
