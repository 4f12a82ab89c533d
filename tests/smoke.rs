use glam::Vec3;
use std::path::Path;
use std::sync::Arc;
use wanderworld_physics::{PhysicsWorld, TerrainPhysics};
use wanderworld_render::{RenderScene, SceneGraph};
use wanderworld_streaming::{
    CloudConfig, EntityDescriptor, ExplorerSettings, StreamingConfig, TerrainExplorer,
};
use wanderworld_testkit::ManualBackend;
use wanderworld_world::{ChunkMeshBuilder, NoiseField, TerrainConfig};

fn repo_file(relative: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[test]
fn shipped_world_config_parses() {
    let raw = std::fs::read_to_string(repo_file("config/world.toml")).expect("world.toml exists");
    let value: toml::Value = toml::from_str(&raw).expect("valid toml");

    let terrain: TerrainConfig = value["terrain"].clone().try_into().expect("terrain table");
    let streaming: StreamingConfig = value["streaming"].clone().try_into().expect("streaming table");
    let clouds: CloudConfig = value["clouds"].clone().try_into().expect("clouds table");

    assert_eq!(terrain, TerrainConfig::default());
    assert_eq!(streaming, StreamingConfig::default());
    assert_eq!(clouds, CloudConfig::default());
    assert!(streaming.validate().is_ok());
}

#[test]
fn shipped_entity_descriptors_load() {
    let descriptors =
        EntityDescriptor::load_list(&repo_file("config/entities.json")).expect("entities.json");
    let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["rock", "tree", "grass", "deer", "fox", "wolf", "horse"]);
    assert!(descriptors.iter().all(|d| d.max_instances > 0));
    assert!(descriptors.iter().all(|d| d.scale_variance[0] <= d.scale_variance[1]));
}

#[test]
fn explorer_streams_over_a_manual_backend() {
    let settings = ExplorerSettings {
        seed: 42,
        streaming: StreamingConfig {
            chunk_size: 64.0,
            resolution: 8,
            render_distance: 1,
            max_chunks_per_frame: 9,
            worker_threads: 1,
            water_level: None,
        },
        ..Default::default()
    };
    let builder = ChunkMeshBuilder::new(Arc::new(NoiseField::new(42, TerrainConfig::default())));
    let mut explorer = TerrainExplorer::new(settings, SceneGraph::new(), TerrainPhysics::new());
    let (backend, handle) = ManualBackend::new();
    explorer
        .initialize_with_backend(Box::new(backend))
        .expect("initialize");

    explorer.update(0.016, &Vec3::ZERO).expect("first frame");
    assert_eq!(handle.outstanding_keys().len(), 9);
    assert_eq!(handle.complete_all(&builder), 9);
    explorer.update(0.016, &Vec3::ZERO).expect("second frame");

    let manager = explorer.manager().expect("initialized");
    assert_eq!(manager.store().len(), 9);
    assert!(manager.is_idle());
    assert_eq!(explorer.physics().collider_count(), 9);
    assert!(explorer.ground_height(0.0, 0.0).is_some());

    explorer.dispose();
    assert!(handle.is_shut_down());
    assert_eq!(explorer.scene().mesh_count(), 0);
}
