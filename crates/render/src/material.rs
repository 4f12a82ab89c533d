//! Surface materials and texture loading.
//!
//! Texture failures never stop terrain from streaming: callers ask for a
//! material "or fallback" and get the debug checker material instead.

use image::ImageReader;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Failure loading a cosmetic asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// File could not be opened.
    #[error("failed to open asset: {0}")]
    Io(#[from] std::io::Error),
    /// Image decoding failed.
    #[error("failed to decode texture: {0}")]
    Image(#[from] image::ImageError),
    /// Decoded image has a zero dimension.
    #[error("texture has zero size ({width}x{height})")]
    Empty {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

/// Decoded RGBA8 texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixels (width × height × 4).
    pub pixels: Vec<u8>,
}

impl Texture {
    /// Decode an image file into RGBA8.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let rgba = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(AssetError::Empty { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// Magenta/black checkerboard used when a real texture is missing.
    pub fn checkerboard(size: u32, cell: u32) -> Self {
        let size = size.max(1);
        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let on = ((x / cell) + (y / cell)) % 2 == 0;
                let px = if on { [255, 0, 255, 255] } else { [0, 0, 0, 255] };
                pixels.extend_from_slice(&px);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }
}

/// Index of a material registered with a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Surface description for a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Name for logs and debugging.
    pub name: String,
    /// Linear RGBA tint.
    pub base_color: [f32; 4],
    /// Optional albedo texture.
    pub texture: Option<Texture>,
    /// Whether the mesh is alpha blended.
    pub transparent: bool,
    /// True for the fallback material.
    pub is_fallback: bool,
}

impl Material {
    /// Untextured material with a flat colour.
    pub fn solid(name: impl Into<String>, base_color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            base_color,
            texture: None,
            transparent: base_color[3] < 1.0,
            is_fallback: false,
        }
    }

    /// Debug checker material.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: [1.0; 4],
            texture: Some(Texture::checkerboard(64, 8)),
            transparent: false,
            is_fallback: true,
        }
    }

    /// Terrain material textured from `path`, degrading to the fallback
    /// material when the file is missing or undecodable.
    pub fn terrain_or_fallback(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::solid("terrain", [1.0; 4]);
        };
        match Texture::load(path) {
            Ok(texture) => {
                info!(
                    path = %path.display(),
                    width = texture.width,
                    height = texture.height,
                    "Loaded terrain texture"
                );
                Self {
                    texture: Some(texture),
                    ..Self::solid("terrain", [1.0; 4])
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Terrain texture unavailable; using fallback material");
                Self::fallback("terrain-fallback")
            }
        }
    }

    /// Translucent material for water overlays.
    pub fn water() -> Self {
        Self::solid("water", [0.1, 0.35, 0.6, 0.7])
    }
}
