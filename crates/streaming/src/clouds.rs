//! Drifting cloud sprites that follow the player around.

use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use wanderworld_render::{InstanceBuffer, InstanceTransform, RenderScene};

/// Render batch name for clouds.
pub const CLOUD_BATCH: &str = "clouds";

/// Cloud layer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Number of clouds.
    pub count: usize,
    /// Radius of the disc clouds live in, centred on the player.
    pub area_radius: f32,
    /// Lowest cloud altitude.
    pub min_height: f32,
    /// Highest cloud altitude.
    pub max_height: f32,
    /// Sprite size before per-cloud variation.
    pub base_size: f32,
    /// Drift speed in world units per second.
    pub drift_speed: f32,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            count: 80,
            area_radius: 1000.0,
            min_height: 80.0,
            max_height: 130.0,
            base_size: 60.0,
            drift_speed: 0.1,
        }
    }
}

/// One cloud sprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cloud {
    /// World position.
    pub position: Vec3,
    /// Horizontal drift per second.
    pub drift: Vec3,
    /// Sprite size.
    pub size: f32,
}

/// Fixed set of clouds drifting over the world.
pub struct CloudField {
    config: CloudConfig,
    clouds: Vec<Cloud>,
    buffer: InstanceBuffer,
    rng: StdRng,
}

impl CloudField {
    /// Scatter clouds over the disc around the origin.
    pub fn new(config: CloudConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let clouds = (0..config.count)
            .map(|_| {
                let angle = rng.gen_range(0.0..TAU);
                let radius = rng.gen::<f32>() * config.area_radius;
                let height = altitude(&config, &mut rng);
                let size = config.base_size * rng.gen_range(0.7..1.3);
                let heading = rng.gen_range(0.0..TAU);
                let speed = config.drift_speed * rng.gen_range(0.5..1.5);
                Cloud {
                    position: Vec3::new(angle.cos() * radius, height, angle.sin() * radius),
                    drift: Vec3::new(heading.cos(), 0.0, heading.sin()) * speed,
                    size,
                }
            })
            .collect();

        let mut field = Self {
            buffer: InstanceBuffer::new(config.count),
            config,
            clouds,
            rng,
        };
        field.write_buffer();
        field
    }

    /// Advance every cloud and wrap those that strayed too far from the
    /// player back onto a ring around them.
    pub fn update(&mut self, dt: f32, player: Vec3) {
        let wrap = self.config.area_radius * 1.2;
        let wrap_sq = wrap * wrap;
        for cloud in &mut self.clouds {
            cloud.position += cloud.drift * dt;
            let rel_x = cloud.position.x - player.x;
            let rel_z = cloud.position.z - player.z;
            if rel_x * rel_x + rel_z * rel_z > wrap_sq {
                let angle = self.rng.gen_range(0.0..TAU);
                let radius = self.config.area_radius * self.rng.gen_range(0.9..1.1);
                cloud.position.x = player.x + angle.cos() * radius;
                cloud.position.z = player.z + angle.sin() * radius;
            }
        }
        self.write_buffer();
    }

    /// Upload sprite transforms if they changed.
    pub fn flush<S: RenderScene + ?Sized>(&mut self, scene: &mut S) {
        if self.buffer.take_dirty() {
            scene.upload_instances(CLOUD_BATCH, &self.buffer);
        }
    }

    /// Current clouds.
    pub fn clouds(&self) -> &[Cloud] {
        &self.clouds
    }

    fn write_buffer(&mut self) {
        for (slot, cloud) in self.clouds.iter().enumerate() {
            self.buffer.set(
                slot,
                InstanceTransform::from_trs(cloud.position, Quat::IDENTITY, cloud.size),
            );
        }
        self.buffer.set_visible(self.clouds.len());
    }
}

fn altitude(config: &CloudConfig, rng: &mut impl Rng) -> f32 {
    if config.max_height > config.min_height {
        rng.gen_range(config.min_height..config.max_height)
    } else {
        config.min_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clouds_start_inside_area_and_band() {
        let config = CloudConfig::default();
        let field = CloudField::new(config.clone(), 4);
        assert_eq!(field.clouds().len(), config.count);
        for cloud in field.clouds() {
            let r = Vec3::new(cloud.position.x, 0.0, cloud.position.z).length();
            assert!(r <= config.area_radius + 1e-3);
            assert!(cloud.position.y >= config.min_height && cloud.position.y <= config.max_height);
        }
    }

    #[test]
    fn clouds_drift_with_time() {
        let mut field = CloudField::new(CloudConfig::default(), 4);
        let before = field.clouds()[0].position;
        field.update(10.0, Vec3::ZERO);
        let after = field.clouds()[0].position;
        let expected = before + field.clouds()[0].drift * 10.0;
        assert!(after.abs_diff_eq(expected, 1e-3));
    }

    #[test]
    fn distant_clouds_wrap_around_player() {
        let config = CloudConfig::default();
        let mut field = CloudField::new(config.clone(), 9);
        let player = Vec3::new(50_000.0, 0.0, -20_000.0);
        field.update(0.0, player);
        for cloud in field.clouds() {
            let d = Vec3::new(cloud.position.x - player.x, 0.0, cloud.position.z - player.z).length();
            assert!(d <= config.area_radius * 1.1 + 1e-2, "cloud {d} away");
            assert!(d >= config.area_radius * 0.9 - 1e-2);
        }
    }

    #[test]
    fn same_seed_same_sky() {
        let a = CloudField::new(CloudConfig::default(), 21);
        let b = CloudField::new(CloudConfig::default(), 21);
        assert_eq!(a.clouds(), b.clouds());
    }
}
