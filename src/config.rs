use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use wanderworld_streaming::{
    CloudConfig, EntityDescriptor, EntityManager, ExplorerSettings, StreamingConfig,
};
use wanderworld_world::TerrainConfig;

pub const DEFAULT_WORLD_PATH: &str = "config/world.toml";
const DEFAULT_ENTITIES_PATH: &str = "config/entities.json";

/// Everything `config/world.toml` can set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u32,
    pub terrain: TerrainConfig,
    pub streaming: StreamingConfig,
    pub entities: EntitiesConfig,
    pub clouds: CloudConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EntitiesConfig {
    /// Grid stride for entity placement candidates.
    pub placement_stride: usize,
    /// JSON list of entity descriptors.
    pub descriptors: PathBuf,
    pub terrain_texture: Option<PathBuf>,
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            placement_stride: EntityManager::DEFAULT_STRIDE,
            descriptors: PathBuf::from(DEFAULT_ENTITIES_PATH),
            terrain_texture: None,
        }
    }
}

impl WorldConfig {
    /// Load world configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_WORLD_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<WorldConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    WorldConfig::default()
                }
            },
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!("World config not found at {}. Using defaults", path.display());
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                WorldConfig::default()
            }
        }
    }

    /// Load configuration, returning errors to the caller (`--strict`).
    pub fn load_strict(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read world config at {}", path.display()))?;
        let config: WorldConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse world config at {}", path.display()))?;
        config
            .streaming
            .validate()
            .with_context(|| format!("invalid [streaming] in {}", path.display()))?;
        Ok(config)
    }

    /// Explorer settings, with entity descriptors loaded leniently: a broken
    /// descriptor file means a world without entities, not a failed start.
    pub fn explorer_settings(&self) -> ExplorerSettings {
        let entities = match EntityDescriptor::load_list(&self.entities.descriptors) {
            Ok(list) => list,
            Err(err) => {
                warn!("{err:#}. Continuing without entities");
                Vec::new()
            }
        };
        self.settings_with(entities)
    }

    /// Explorer settings, failing if the descriptor file cannot be loaded.
    pub fn explorer_settings_strict(&self) -> Result<ExplorerSettings> {
        let entities = EntityDescriptor::load_list(&self.entities.descriptors)?;
        Ok(self.settings_with(entities))
    }

    fn settings_with(&self, entities: Vec<EntityDescriptor>) -> ExplorerSettings {
        info!(
            seed = self.seed,
            entity_types = entities.len(),
            "World configuration resolved"
        );
        ExplorerSettings {
            seed: self.seed,
            terrain: self.terrain.clone(),
            streaming: self.streaming.clone(),
            entities,
            placement_stride: self.entities.placement_stride,
            clouds: self.clouds.clone(),
            terrain_texture: self.entities.terrain_texture.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("wanderworld-{nanos}-{name}"))
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: WorldConfig = toml::from_str(
            r#"
            seed = 9
            [streaming]
            render_distance = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.streaming.render_distance, 4);
        assert_eq!(config.streaming.chunk_size, 128.0);
        assert_eq!(config.terrain, TerrainConfig::default());
        assert_eq!(config.entities.placement_stride, EntityManager::DEFAULT_STRIDE);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = WorldConfig::load_from_path(&temp_path("missing.toml"));
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn broken_file_uses_defaults_but_strict_fails() {
        let path = temp_path("broken.toml");
        fs::write(&path, "seed = \"not a number\"").unwrap();
        assert_eq!(WorldConfig::load_from_path(&path), WorldConfig::default());
        assert!(WorldConfig::load_strict(&path).is_err());
    }

    #[test]
    fn strict_load_rejects_unusable_streaming() {
        let path = temp_path("zero-budget.toml");
        fs::write(&path, "[streaming]\nmax_chunks_per_frame = 0\n").unwrap();
        let err = WorldConfig::load_strict(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_chunks_per_frame"));
    }

    #[test]
    fn missing_descriptors_mean_no_entities() {
        let config = WorldConfig {
            entities: EntitiesConfig {
                descriptors: temp_path("entities.json"),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.explorer_settings().entities.is_empty());
        assert!(config.explorer_settings_strict().is_err());
    }
}
