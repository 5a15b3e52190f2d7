//! Offscreen render target.
//!
//! A [`RenderTarget`] owns a native framebuffer with a texture color
//! attachment. Set a size, upload, then bind to redirect draws into the
//! attachment; [`RenderTarget::bind_default`] restores the window surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use silene_core::color::Color;

use crate::backend::FramebufferHandle;
use crate::device::RenderDevice;
use crate::error::{RenderError, RenderResult};
use crate::texture::Texture;

/// A framebuffer with a texture color attachment.
pub struct RenderTarget {
    device: Arc<RenderDevice>,
    framebuffer: FramebufferHandle,
    color: Texture,
    width: u32,
    height: u32,
    valid: bool,
    disposed: AtomicBool,
}

impl RenderTarget {
    /// Create a render target with no storage allocated yet.
    pub fn new(device: &Arc<RenderDevice>) -> Self {
        Self {
            device: Arc::clone(device),
            framebuffer: device.backend().create_framebuffer(),
            color: Texture::new(device),
            width: 0,
            height: 0,
            valid: false,
            disposed: AtomicBool::new(false),
        }
    }

    /// The native framebuffer handle.
    pub fn id(&self) -> FramebufferHandle {
        self.framebuffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The color attachment texture.
    pub fn color_texture(&self) -> &Texture {
        &self.color
    }

    /// Whether the native handles have been released.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Allocate attachment storage for the given size. Invalidates the
    /// target until the next [`RenderTarget::upload`].
    pub fn set_size(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidArgument(
                "render target size must be non-zero".to_owned(),
            ));
        }
        self.width = width;
        self.height = height;
        self.color.set_pixels(
            width,
            height,
            vec![Color::TRANSPARENT; (width as usize) * (height as usize)],
        )?;
        self.valid = false;
        Ok(())
    }

    /// Upload the attachment and wire it to the framebuffer.
    pub fn upload(&mut self) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if self.valid {
            return Ok(());
        }
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidState(
                "render target has no size; call set_size first".to_owned(),
            ));
        }

        self.color.upload()?;

        let backend = self.device.backend();
        backend.framebuffer_color_texture(self.framebuffer, self.color.id());

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }

        self.valid = true;
        Ok(())
    }

    /// Redirect subsequent draws into this target.
    pub fn bind(&self) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if !self.valid {
            return Err(RenderError::NotUploaded);
        }

        let backend = self.device.backend();
        backend.bind_framebuffer(Some(self.framebuffer));

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }
        Ok(())
    }

    /// Restore the default framebuffer on a device.
    pub fn bind_default(device: &RenderDevice) {
        device.backend().bind_framebuffer(None);
    }

    /// Release the framebuffer and attachment handles. Exactly once;
    /// further calls are no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.device.backend().delete_framebuffer(self.framebuffer);
        self.color.dispose();
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("id", &self.framebuffer)
            .field("size", &(self.width, self.height))
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
