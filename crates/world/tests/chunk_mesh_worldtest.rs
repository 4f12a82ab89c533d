//! Chunk geometry at full streaming resolution.

use std::sync::Arc;
use wanderworld_core::{BiomeId, ChunkKey};
use wanderworld_world::{ChunkMeshBuilder, GenerationRequest, NoiseField};

#[test]
fn full_resolution_chunk_has_unit_normals_and_valid_indices() {
    let builder = ChunkMeshBuilder::new(Arc::new(NoiseField::with_seed(2024)));
    let payload = builder
        .build(&GenerationRequest::new(ChunkKey::new(-1, 2), 128.0, 64))
        .unwrap();

    assert_eq!(payload.indices.len(), 64 * 64 * 6);
    let vertex_count = payload.vertex_count() as u32;
    assert_eq!(vertex_count, 65 * 65);
    assert!(payload.indices.iter().all(|&i| i < vertex_count));

    for n in payload.normals.chunks_exact(3) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-3, "normal length {len}");
        assert!(n[1] > 0.0, "heightfield normals face up");
    }

    assert!(payload.world_vertices.iter().all(|v| v.is_finite()));
    assert!(payload
        .biome_ids
        .iter()
        .all(|&id| BiomeId::from_u8(id).is_some()));
}

#[test]
fn min_max_height_bracket_every_vertex() {
    let builder = ChunkMeshBuilder::new(Arc::new(NoiseField::with_seed(11)));
    let payload = builder
        .build(&GenerationRequest::new(ChunkKey::new(7, 7), 64.0, 32))
        .unwrap();
    for y in payload.positions.chunks_exact(3).map(|p| p[1]) {
        assert!(y >= payload.min_height && y <= payload.max_height);
    }
}
