//! The terrain explorer facade: one object the application drives per frame.

use crate::clouds::{CloudConfig, CloudField};
use crate::config::StreamingConfig;
use crate::entities::{EntityDescriptor, EntityManager};
use crate::error::StreamingError;
use crate::scheduler::ChunkManager;
use crate::store::{ChunkMaterials, ChunkStore};
use glam::Vec3;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use wanderworld_core::ChunkKey;
use wanderworld_physics::PhysicsWorld;
use wanderworld_render::{Material, RenderScene};
use wanderworld_world::{
    ChunkMeshBuilder, GenerationBackend, GenerationPool, NoiseField, TerrainConfig,
};

/// Anything that can report where the player is.
pub trait PlayerPosition {
    /// Current world position.
    fn position(&self) -> Vec3;
}

impl PlayerPosition for Vec3 {
    fn position(&self) -> Vec3 {
        *self
    }
}

/// Everything the explorer needs to build a world.
#[derive(Debug, Clone, Default)]
pub struct ExplorerSettings {
    /// Root seed of every noise layer and random stream.
    pub seed: u32,
    /// Height field configuration.
    pub terrain: TerrainConfig,
    /// Chunk streaming parameters.
    pub streaming: StreamingConfig,
    /// Entity types to scatter.
    pub entities: Vec<EntityDescriptor>,
    /// Grid stride used when scattering entities.
    pub placement_stride: usize,
    /// Cloud layer.
    pub clouds: CloudConfig,
    /// Terrain albedo texture; missing or broken files fall back to a debug material.
    pub terrain_texture: Option<PathBuf>,
}

/// Streams terrain, entities and clouds around a moving player.
pub struct TerrainExplorer<S: RenderScene, P: PhysicsWorld> {
    settings: ExplorerSettings,
    field: Arc<NoiseField>,
    scene: S,
    physics: P,
    manager: Option<ChunkManager>,
    clouds: Option<CloudField>,
}

impl<S: RenderScene, P: PhysicsWorld> TerrainExplorer<S, P> {
    /// Create an explorer. Nothing streams until [`initialize`](Self::initialize).
    pub fn new(settings: ExplorerSettings, scene: S, physics: P) -> Self {
        let field = Arc::new(NoiseField::new(settings.seed, settings.terrain.clone()));
        Self {
            settings,
            field,
            scene,
            physics,
            manager: None,
            clouds: None,
        }
    }

    /// Spawn the generation worker pool and load assets.
    pub fn initialize(&mut self) -> Result<(), StreamingError> {
        let builder = ChunkMeshBuilder::new(Arc::clone(&self.field));
        let pool = GenerationPool::spawn(Arc::new(builder), self.settings.streaming.worker_threads)?;
        self.initialize_with_backend(Box::new(pool))
    }

    /// Initialize over a caller-supplied generation backend.
    pub fn initialize_with_backend(
        &mut self,
        backend: Box<dyn GenerationBackend>,
    ) -> Result<(), StreamingError> {
        if self.manager.is_some() {
            warn!("Terrain explorer already initialized");
            return Ok(());
        }
        self.settings.streaming.validate()?;

        let terrain = Material::terrain_or_fallback(self.settings.terrain_texture.as_deref());
        let materials = ChunkMaterials {
            terrain: self.scene.register_material(terrain),
            water: self.scene.register_material(Material::water()),
        };
        let store = ChunkStore::new(materials, self.settings.streaming.water_level);
        let entities = EntityManager::new(
            self.settings.entities.clone(),
            self.settings.placement_stride,
            u64::from(self.settings.seed),
        );
        let manager = ChunkManager::new(self.settings.streaming.clone(), backend, store, entities)?;

        let clouds_seed = u64::from(self.settings.seed) ^ 0xc10d;
        self.clouds = Some(CloudField::new(self.settings.clouds.clone(), clouds_seed));
        self.manager = Some(manager);

        info!(
            seed = self.settings.seed,
            render_distance = self.settings.streaming.render_distance,
            entity_types = self.settings.entities.len(),
            "Terrain explorer initialized"
        );
        Ok(())
    }

    /// Advance one frame: stream chunks around the player and drift clouds.
    ///
    /// The frame always completes; a generation fault is reported afterwards
    /// as [`StreamingError::Halted`] while realized chunks stay in place.
    pub fn update(&mut self, dt: f32, player: &impl PlayerPosition) -> Result<(), StreamingError> {
        let position = player.position();
        let manager = self.manager.as_mut().ok_or(StreamingError::NotInitialized)?;
        manager.update(position, &mut self.scene, &mut self.physics);

        if let Some(clouds) = self.clouds.as_mut() {
            clouds.update(dt, position);
            clouds.flush(&mut self.scene);
        }

        match manager.fault() {
            Some(fault) => Err(StreamingError::Halted(fault.clone())),
            None => Ok(()),
        }
    }

    /// Chunk key for a world position.
    pub fn chunk_key(&self, x: f64, z: f64) -> ChunkKey {
        ChunkKey::from_world(x, z, self.settings.streaming.chunk_size)
    }

    /// Height of realized terrain under `(x, z)`.
    pub fn ground_height(&self, x: f32, z: f32) -> Option<f32> {
        self.physics.ground_height(x, z)
    }

    /// Release every chunk, entity slot and worker thread.
    pub fn dispose(&mut self) {
        if let Some(mut manager) = self.manager.take() {
            manager.dispose(&mut self.scene, &mut self.physics);
        }
        self.clouds = None;
        info!("Terrain explorer disposed");
    }

    /// Whether [`initialize`](Self::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.manager.is_some()
    }

    /// Streaming scheduler, once initialized.
    pub fn manager(&self) -> Option<&ChunkManager> {
        self.manager.as_ref()
    }

    /// Cloud layer, once initialized.
    pub fn clouds(&self) -> Option<&CloudField> {
        self.clouds.as_ref()
    }

    /// Shared noise field.
    pub fn field(&self) -> &Arc<NoiseField> {
        &self.field
    }

    /// Render scene.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Physics world.
    pub fn physics(&self) -> &P {
        &self.physics
    }
}

impl<S: RenderScene, P: PhysicsWorld> Drop for TerrainExplorer<S, P> {
    fn drop(&mut self) {
        if self.manager.is_some() {
            self.dispose();
        }
    }
}
