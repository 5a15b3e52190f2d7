//! GPU texture wrapper.
//!
//! A [`Texture`] owns a native texture object, its RGBA8 pixel payload, and
//! its sampling parameters. Pixels are staged CPU-side with
//! [`Texture::set_pixels`] (or decoded from a file with
//! [`Texture::load_file`]) and pushed with [`Texture::upload`]; changing the
//! payload invalidates the upload until the next `upload` call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use silene_core::color::Color;

use crate::backend::{TextureFilter, TextureHandle, TextureParameter, TextureUnit, TextureWrap};
use crate::device::RenderDevice;
use crate::error::{RenderError, RenderResult};

/// Sampling parameters applied to a texture at upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSettings {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::ClampToBorder,
        }
    }
}

impl TextureSettings {
    fn parameters(&self) -> [TextureParameter; 4] {
        [
            TextureParameter::MinFilter(self.min_filter),
            TextureParameter::MagFilter(self.mag_filter),
            TextureParameter::WrapS(self.wrap_s),
            TextureParameter::WrapT(self.wrap_t),
        ]
    }
}

/// A 2D RGBA8 texture.
pub struct Texture {
    device: Arc<RenderDevice>,
    handle: TextureHandle,
    width: u32,
    height: u32,
    pixels: Vec<Color>,
    settings: TextureSettings,
    uploaded: bool,
    valid: bool,
    disposed: AtomicBool,
}

impl Texture {
    /// Create an empty texture with default sampling parameters.
    pub fn new(device: &Arc<RenderDevice>) -> Self {
        let handle = device.backend().create_texture();
        Self {
            device: Arc::clone(device),
            handle,
            width: 0,
            height: 0,
            pixels: Vec::new(),
            settings: TextureSettings::default(),
            uploaded: false,
            valid: false,
            disposed: AtomicBool::new(false),
        }
    }

    /// The native texture handle.
    pub fn id(&self) -> TextureHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The current sampling parameters.
    pub fn settings(&self) -> TextureSettings {
        self.settings
    }

    /// The staged pixel payload.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Whether the native handle has been released.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Stage a pixel payload.
    ///
    /// Fails with [`RenderError::InvalidArgument`] if the pixel count does
    /// not match `width * height`. Invalidates any previous upload.
    pub fn set_pixels(&mut self, width: u32, height: u32, pixels: Vec<Color>) -> RenderResult<()> {
        if pixels.len() != (width as usize) * (height as usize) {
            return Err(RenderError::InvalidArgument(format!(
                "expected {} pixels for a {width}x{height} texture, got {}",
                (width as usize) * (height as usize),
                pixels.len()
            )));
        }
        self.width = width;
        self.height = height;
        self.pixels = pixels;
        self.invalidate();
        Ok(())
    }

    /// Replace the sampling parameters, applying them immediately.
    pub fn set_settings(&mut self, settings: TextureSettings) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        self.settings = settings;
        let backend = self.device.backend();
        for parameter in self.settings.parameters() {
            backend.tex_parameter(self.handle, parameter);
        }
        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }
        Ok(())
    }

    /// Manually invalidate the upload; requires another [`Texture::upload`]
    /// before the texture can be bound again.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Push the staged pixels to the GPU.
    ///
    /// No-op if the upload is still valid. Uploads the image, regenerates
    /// the mipmap chain, and re-applies the sampling parameters.
    pub fn upload(&mut self) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if self.valid {
            return Ok(());
        }
        if self.pixels.is_empty() {
            return Err(RenderError::InvalidArgument(
                "texture has no pixel data to upload".to_owned(),
            ));
        }

        let backend = self.device.backend();
        backend.tex_image_2d(
            self.handle,
            self.width,
            self.height,
            bytemuck::cast_slice(&self.pixels),
        );
        backend.generate_mipmap(self.handle);
        for parameter in self.settings.parameters() {
            backend.tex_parameter(self.handle, parameter);
        }

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }

        self.uploaded = true;
        self.valid = true;
        Ok(())
    }

    /// Bind the texture on a unit.
    ///
    /// Fails with [`RenderError::Disposed`] after destruction,
    /// [`RenderError::NotUploaded`] before the first upload, and
    /// [`RenderError::InvalidState`] when the staged payload has changed
    /// since the last upload.
    pub fn bind(&self, unit: TextureUnit) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if !self.uploaded {
            return Err(RenderError::NotUploaded);
        }
        if !self.valid {
            return Err(RenderError::InvalidState(
                "texture data has been invalidated since the last upload".to_owned(),
            ));
        }

        let backend = self.device.backend();
        backend.bind_texture(unit, Some(self.handle));

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }
        Ok(())
    }

    /// Decode an image file from the assets directory into the pixel
    /// payload.
    #[cfg(feature = "image-loading")]
    pub fn load_file(
        &mut self,
        name: &str,
        paths: &silene_core::paths::AssetPaths,
    ) -> RenderResult<()> {
        if name.is_empty() {
            return Err(RenderError::InvalidArgument(
                "texture file name is required".to_owned(),
            ));
        }
        let path = paths.asset_file(name);
        let decoded = image::open(&path)
            .map_err(|_| RenderError::ResourceNotFound(path.display().to_string()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let pixels = bytemuck::cast_slice::<u8, Color>(decoded.as_raw()).to_vec();
        self.set_pixels(width, height, pixels)
    }

    /// Release the native texture handle. Exactly once; further calls are
    /// no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.device.backend().delete_texture(self.handle);
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.handle)
            .field("size", &(self.width, self.height))
            .field("uploaded", &self.uploaded)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn test_texture() -> (Texture, Arc<RenderDevice>) {
        let device = RenderDevice::headless();
        (Texture::new(&device), device)
    }

    fn pixels(count: usize) -> Vec<Color> {
        vec![Color::WHITE; count]
    }

    #[test]
    fn set_pixels_validates_count() {
        let (mut texture, _device) = test_texture();
        assert!(matches!(
            texture.set_pixels(2, 2, pixels(3)),
            Err(RenderError::InvalidArgument(_))
        ));
        texture.set_pixels(2, 2, pixels(4)).unwrap();
    }

    #[test]
    fn bind_before_upload_fails() {
        let (mut texture, _device) = test_texture();
        texture.set_pixels(1, 1, pixels(1)).unwrap();
        assert!(matches!(
            texture.bind(TextureUnit::Unit0),
            Err(RenderError::NotUploaded)
        ));
    }

    #[test]
    fn upload_then_bind() {
        let (mut texture, _device) = test_texture();
        texture.set_pixels(2, 2, pixels(4)).unwrap();
        texture.upload().unwrap();
        texture.bind(TextureUnit::Unit2).unwrap();
    }

    #[test]
    fn invalidation_blocks_binding_until_reupload() {
        let (mut texture, _device) = test_texture();
        texture.set_pixels(1, 1, pixels(1)).unwrap();
        texture.upload().unwrap();

        texture.set_pixels(1, 1, vec![Color::BLACK]).unwrap();
        assert!(matches!(
            texture.bind(TextureUnit::Unit0),
            Err(RenderError::InvalidState(_))
        ));

        texture.upload().unwrap();
        texture.bind(TextureUnit::Unit0).unwrap();
    }

    #[test]
    fn upload_without_pixels_is_rejected() {
        let (mut texture, _device) = test_texture();
        assert!(matches!(
            texture.upload(),
            Err(RenderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn dispose_is_idempotent() {
        let (texture, _device) = test_texture();
        texture.dispose();
        texture.dispose();
        assert!(texture.is_disposed());
        assert!(matches!(
            texture.bind(TextureUnit::Unit0),
            Err(RenderError::Disposed)
        ));
    }

    #[test]
    fn default_settings_match_the_scaffold_defaults() {
        let settings = TextureSettings::default();
        assert_eq!(settings.min_filter, TextureFilter::Nearest);
        assert_eq!(settings.mag_filter, TextureFilter::Nearest);
        assert_eq!(settings.wrap_s, TextureWrap::Repeat);
        assert_eq!(settings.wrap_t, TextureWrap::ClampToBorder);
    }
}
