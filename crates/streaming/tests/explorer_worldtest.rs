//! Full explorer runs over the threaded generation pool.
//!
//! These tests spin real worker threads, so they poll with a short sleep
//! until the scheduler settles instead of counting frames.

use glam::Vec3;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use wanderworld_core::{BiomeId, ChunkKey};
use wanderworld_physics::{PhysicsWorld, TerrainPhysics};
use wanderworld_render::{RenderScene, SceneGraph};
use wanderworld_streaming::{
    BiomeDensities, EntityDescriptor, ExplorerSettings, StreamingConfig, StreamingError,
    TerrainExplorer, CLOUD_BATCH,
};
use wanderworld_testkit::{
    payload_hash, ChunkMeshMetric, EntityMetrics, MeshMetricSink, MetricsReportBuilder,
    MetricsSink, StreamingMetrics, TestExecutionMetrics, WalkingPlayer,
};

type Explorer = TerrainExplorer<SceneGraph, TerrainPhysics>;

fn settings() -> ExplorerSettings {
    let meadow = BiomeDensities::default()
        .with(BiomeId::Grassland, 0.2)
        .with(BiomeId::Forest, 0.3)
        .with(BiomeId::Rocky, 0.05);
    ExplorerSettings {
        seed: 2024,
        streaming: StreamingConfig {
            chunk_size: 128.0,
            resolution: 64,
            render_distance: 2,
            max_chunks_per_frame: 2,
            worker_threads: 4,
            water_level: Some(-6.0),
        },
        entities: vec![
            EntityDescriptor {
                name: "tree".into(),
                max_instances: 500,
                scale_variance: [0.8, 1.2],
                max_placement_slope: 0.7,
                density: meadow,
                ..Default::default()
            },
            EntityDescriptor {
                name: "rock".into(),
                max_instances: 200,
                align_to_normal: true,
                density: BiomeId::all()
                    .iter()
                    .fold(BiomeDensities::default(), |d, b| d.with(*b, 0.05)),
                ..Default::default()
            },
        ],
        placement_stride: 4,
        terrain_texture: Some(PathBuf::from("/definitely/not/here/terrain.png")),
        ..Default::default()
    }
}

fn settle(explorer: &mut Explorer, player: Vec3, expected: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(60);
    let mut frames = 0;
    loop {
        explorer.update(1.0 / 60.0, &player).expect("streaming healthy");
        frames += 1;
        let manager = explorer.manager().expect("initialized");
        if manager.is_idle() && manager.store().len() == expected {
            return frames;
        }
        assert!(Instant::now() < deadline, "explorer did not settle: {:?}", manager.queue_depths());
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn update_before_initialize_is_an_error() {
    let mut explorer = Explorer::new(settings(), SceneGraph::new(), TerrainPhysics::new());
    assert_eq!(
        explorer.update(0.016, &Vec3::ZERO),
        Err(StreamingError::NotInitialized)
    );
    assert_eq!(explorer.chunk_key(-1.0, 130.0), ChunkKey::new(-1, 1));
}

#[test]
fn origin_start_realizes_five_by_five_grid() {
    let mut explorer = Explorer::new(settings(), SceneGraph::new(), TerrainPhysics::new());
    explorer.initialize().expect("initialize");
    settle(&mut explorer, Vec3::ZERO, 25);

    let manager = explorer.manager().expect("initialized");
    let realized: HashSet<ChunkKey> = manager.store().keys().collect();
    let expected: HashSet<ChunkKey> = (-2..=2)
        .flat_map(|z| (-2..=2).map(move |x| ChunkKey::new(x, z)))
        .collect();
    assert_eq!(realized, expected);

    for key in &expected {
        let record = manager.store().get(*key).expect("realized");
        let payload = record.payload();
        assert_eq!(payload.indices.len(), 64 * 64 * 6);
        assert_eq!(payload.normals.len(), 65 * 65 * 3);
        for n in payload.normals.chunks_exact(3) {
            let len = Vec3::new(n[0], n[1], n[2]).length();
            assert!((len - 1.0).abs() <= 1e-3, "normal length {len} in {key}");
        }
        let mesh = explorer.scene().mesh(record.mesh()).expect("attached");
        assert_eq!(mesh.mesh.indices.len(), 64 * 64 * 6);
    }

    // The texture path is bogus, so terrain draws with the debug material.
    let terrain = explorer
        .scene()
        .mesh(manager.store().get(ChunkKey::new(0, 0)).unwrap().mesh())
        .unwrap()
        .material;
    assert!(explorer.scene().material(terrain).unwrap().is_fallback);

    assert_eq!(explorer.physics().collider_count(), 25);
    let ground = explorer.ground_height(10.0, -20.0).expect("ground under player");
    assert!(ground.is_finite());
    assert!(explorer.scene().batch(CLOUD_BATCH).is_some());
    assert!(manager.entities().pools().all(|(_, pool)| pool.is_partitioned()));
}

#[test]
fn same_seed_streams_identical_terrain() {
    let mut a = Explorer::new(settings(), SceneGraph::new(), TerrainPhysics::new());
    let mut b = Explorer::new(settings(), SceneGraph::new(), TerrainPhysics::new());
    a.initialize().unwrap();
    b.initialize().unwrap();
    settle(&mut a, Vec3::ZERO, 25);
    settle(&mut b, Vec3::ZERO, 25);

    let store_a = a.manager().unwrap().store();
    let store_b = b.manager().unwrap().store();
    let mut keys: Vec<ChunkKey> = store_a.keys().collect();
    keys.sort_by_key(|k| (k.z, k.x));
    let mut metrics = Vec::new();
    for key in keys {
        let payload_b = store_b.get(key).expect("both runs realize the same chunks").payload();
        let metric = ChunkMeshMetric::from_payload(store_a.get(key).unwrap().payload());
        assert_eq!(metric.hash, payload_hash(payload_b), "chunk {key} differs between runs");
        metrics.push(metric);
    }
    assert_eq!(metrics.len(), 25);

    let path = std::env::temp_dir().join("wanderworld-worldtests/same_seed_meshes.json");
    let mut sink = MeshMetricSink::create(&path).expect("mesh metric sink");
    sink.write(&metrics).expect("mesh metrics written");
    let pools_a: Vec<_> = a.manager().unwrap().entities().pools().map(|(_, p)| p.live_count()).collect();
    let pools_b: Vec<_> = b.manager().unwrap().entities().pools().map(|(_, p)| p.live_count()).collect();
    assert_eq!(pools_a, pools_b);
}

#[test]
fn dispose_detaches_everything() {
    let mut explorer = Explorer::new(settings(), SceneGraph::new(), TerrainPhysics::new());
    explorer.initialize().unwrap();
    settle(&mut explorer, Vec3::ZERO, 25);

    explorer.dispose();
    assert!(!explorer.is_initialized());
    assert_eq!(explorer.scene().mesh_count(), 0);
    assert_eq!(explorer.physics().collider_count(), 0);
    assert_eq!(
        explorer.update(0.016, &Vec3::ZERO),
        Err(StreamingError::NotInitialized)
    );
}

#[test]
fn walking_stream_worldtest() {
    let started = Instant::now();
    let mut config = settings();
    config.streaming.resolution = 16;
    let mut explorer = Explorer::new(config, SceneGraph::new(), TerrainPhysics::new());
    explorer.initialize().unwrap();

    let mut player = WalkingPlayer::new(
        Vec3::ZERO,
        vec![Vec3::new(1200.0, 0.0, 0.0), Vec3::new(1200.0, 0.0, 900.0)],
        60.0,
    );
    let dt = 1.0 / 30.0;
    let mut frames = 0;
    let mut peak_pending = 0;
    while !player.arrived() {
        let position = player.step(dt);
        explorer.update(dt, &position).expect("streaming healthy");
        let manager = explorer.manager().unwrap();
        peak_pending = peak_pending.max(manager.queue_depths().pending);
        frames += 1;
        thread::sleep(Duration::from_millis(1));
    }
    frames += settle(&mut explorer, player.position(), 25);

    let manager = explorer.manager().unwrap();
    let stats = manager.stats();
    let center = explorer.chunk_key(f64::from(player.position().x), f64::from(player.position().z));
    assert!(manager
        .store()
        .keys()
        .all(|key| key.chebyshev_distance(center) <= 2));
    assert_eq!(stats.faults, 0);
    assert_eq!(stats.failed, 0);
    assert!(stats.destroyed > 0, "walking never evicted a chunk");
    assert_eq!(stats.materialized - stats.destroyed, 25);
    assert!(explorer.scene().mesh_count() >= 25);
    assert!(manager.entities().pools().all(|(_, pool)| pool.is_partitioned()));

    let by_type: BTreeMap<String, usize> = manager
        .entities()
        .pools()
        .map(|(d, p)| (d.name.clone(), p.live_count()))
        .collect();
    let report = MetricsReportBuilder::new("walking_stream_worldtest")
        .streaming(StreamingMetrics {
            frames,
            requested: stats.requested,
            materialized: stats.materialized,
            destroyed: stats.destroyed,
            cancelled: stats.cancelled,
            discarded_late: stats.discarded_late,
            rescued: stats.rescued,
            peak_pending,
            realized_at_end: manager.store().len(),
        })
        .entities(EntityMetrics {
            types: by_type.len(),
            live_instances: manager.entities().live_instances(),
            capacity: manager.entities().pools().map(|(_, p)| p.capacity()).sum(),
            by_type: Some(by_type),
        })
        .execution(TestExecutionMetrics {
            duration_seconds: started.elapsed().as_secs_f64(),
            assertions_checked: Some(8),
        })
        .build();

    let path = std::env::temp_dir().join("wanderworld-worldtests/walking_stream.json");
    let sink = MetricsSink::create(&path).expect("metrics sink");
    sink.write(&report).expect("metrics written");
    assert!(path.exists());
}
