use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use image::{Rgba, RgbaImage};

use crate::error::LookupError;
use crate::surface::Color;

/// Shared, immutable RGBA image that surfaces can blit from.
#[derive(Clone, Debug)]
pub struct ImageHandle(Arc<RgbaImage>);

impl ImageHandle {
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    /// Decode an encoded image (PNG) from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self::from_rgba(image))
    }

    /// A single-color image, handy for placeholders and generated sheets.
    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        Self::from_rgba(RgbaImage::from_pixel(width, height, to_rgba8(color)))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }

    /// True if both handles refer to the same underlying image.
    pub fn ptr_eq(&self, other: &ImageHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

pub(crate) fn to_rgba8(color: Color) -> Rgba<u8> {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([c(color[0]), c(color[1]), c(color[2]), c(color[3])])
}

/// Read-only lookup of loaded images by key.
pub trait AssetProvider {
    fn get(&self, key: &str) -> Result<ImageHandle, LookupError>;
}

/// Registers image files by key and decodes them in one batch.
///
/// Call [`AssetLoader::load_all`] before starting the engine; scenes then
/// fetch images with [`AssetProvider::get`].
#[derive(Debug, Default)]
pub struct AssetLoader {
    pending: Vec<(String, PathBuf)>,
    images: HashMap<String, ImageHandle>,
}

impl AssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an image file for loading under `key`.
    pub fn image(&mut self, key: impl Into<String>, path: impl AsRef<Path>) -> &mut Self {
        self.pending.push((key.into(), path.as_ref().to_path_buf()));
        self
    }

    /// Decode every queued image. Keys already loaded are not reloaded.
    pub fn load_all(&mut self) -> Result<()> {
        for (key, path) in std::mem::take(&mut self.pending) {
            if self.images.contains_key(&key) {
                continue;
            }
            let bytes = fs::read(&path)
                .with_context(|| format!("Failed to load asset: {}", path.display()))?;
            let handle = ImageHandle::from_bytes(&bytes)
                .map_err(|e| anyhow!("Failed to decode asset {}: {}", path.display(), e))?;
            log::debug!("loaded asset \"{key}\" ({}x{})", handle.width(), handle.height());
            self.images.insert(key, handle);
        }
        Ok(())
    }

    /// Store an already-decoded or generated image under `key`.
    pub fn insert(&mut self, key: impl Into<String>, image: ImageHandle) {
        self.images.insert(key.into(), image);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.images.contains_key(key)
    }

    /// Number of images queued but not yet loaded.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl AssetProvider for AssetLoader {
    fn get(&self, key: &str) -> Result<ImageHandle, LookupError> {
        self.images
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::AssetNotFound(key.to_string()))
    }
}
