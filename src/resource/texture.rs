//! Sampler-backed texture resources.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::{
    Context, InternalFormat, TexelType, TextureFilter, TextureFormat, TextureId, TextureWrap,
};
use crate::renderer::Renderer;

static TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

// Uploaded while a texture has neither data nor dimensions, so sampling
// stays valid before the real payload arrives.
const EMPTY_PIXEL: [u8; 4] = [0, 0, 0, 0];

/// Construction parameters for a [`Texture`].
#[derive(Clone, Debug)]
pub struct TextureOptions {
    /// Raw texel bytes. `None` allocates storage only, which is what
    /// render targets want.
    pub image: Option<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub generate_mipmaps: bool,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub format: TextureFormat,
    pub internal_format: InternalFormat,
    pub texel_type: TexelType,
    pub premultiply_alpha: bool,
    pub unpack_alignment: u32,
    pub flip_y: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        TextureOptions {
            image: None,
            width: 0,
            height: 0,
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            generate_mipmaps: true,
            min_filter: TextureFilter::LinearMipmapLinear,
            mag_filter: TextureFilter::Linear,
            format: TextureFormat::Rgba,
            internal_format: InternalFormat::Rgba,
            texel_type: TexelType::U8,
            premultiply_alpha: false,
            unpack_alignment: 4,
            flip_y: true,
        }
    }
}

// Sampler parameters already applied to the GPU object, kept to skip
// redundant parameter calls on re-upload.
#[derive(Clone, Copy, Debug)]
struct AppliedParams {
    min_filter: Option<TextureFilter>,
    mag_filter: Option<TextureFilter>,
    wrap_s: Option<TextureWrap>,
    wrap_t: Option<TextureWrap>,
}

/// Texel data plus the sampler state that goes with it.
///
/// The GPU object is created eagerly but stays empty until the first
/// [`Texture::update`], which runs when a program binds the texture to a
/// unit. Setting [`needs_update`](Texture::needs_update) after mutating
/// the image triggers a re-upload on the next bind.
pub struct Texture {
    /// Unique id, used by the renderer's per-unit binding cache.
    pub id: u64,
    ctx: Context,
    handle: TextureId,
    pub image: Option<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub generate_mipmaps: bool,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub format: TextureFormat,
    pub internal_format: InternalFormat,
    pub texel_type: TexelType,
    pub premultiply_alpha: bool,
    pub unpack_alignment: u32,
    pub flip_y: bool,
    pub needs_update: bool,
    applied: AppliedParams,
}

impl Texture {
    pub fn new(ctx: &Context, options: TextureOptions) -> Texture {
        let handle = ctx.create_texture();
        Texture {
            id: TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            ctx: ctx.clone(),
            handle,
            image: options.image,
            width: options.width,
            height: options.height,
            wrap_s: options.wrap_s,
            wrap_t: options.wrap_t,
            generate_mipmaps: options.generate_mipmaps,
            min_filter: options.min_filter,
            mag_filter: options.mag_filter,
            format: options.format,
            internal_format: options.internal_format,
            texel_type: options.texel_type,
            premultiply_alpha: options.premultiply_alpha,
            unpack_alignment: options.unpack_alignment,
            flip_y: options.flip_y,
            needs_update: true,
            applied: AppliedParams {
                min_filter: None,
                mag_filter: None,
                wrap_s: None,
                wrap_t: None,
            },
        }
    }

    /// The underlying GPU handle, needed for framebuffer attachment.
    pub fn handle(&self) -> TextureId {
        self.handle
    }

    /// Binds the texture to `unit` and pushes any pending state or data.
    ///
    /// Binding goes through the renderer's active-texture and per-unit
    /// caches, so repeat binds of an unchanged texture cost nothing.
    pub fn update(&mut self, renderer: &mut Renderer, unit: u32) {
        let needs_update = self.needs_update;

        // Make sure the texture is bound to its unit
        if needs_update || renderer.texture_at_unit(unit) != Some(self.id) {
            renderer.set_active_texture(unit);
            renderer.bind_texture(self.id, self.handle);
        }

        if !needs_update {
            return;
        }
        self.needs_update = false;

        renderer.set_pixel_store_flip_y(self.flip_y);
        renderer.set_pixel_store_premultiply_alpha(self.premultiply_alpha);
        renderer.set_pixel_store_unpack_alignment(self.unpack_alignment);

        if self.applied.min_filter != Some(self.min_filter)
            || self.applied.mag_filter != Some(self.mag_filter)
        {
            self.ctx.tex_filter(self.min_filter, self.mag_filter);
            self.applied.min_filter = Some(self.min_filter);
            self.applied.mag_filter = Some(self.mag_filter);
        }

        if self.applied.wrap_s != Some(self.wrap_s) || self.applied.wrap_t != Some(self.wrap_t) {
            self.ctx.tex_wrap(self.wrap_s, self.wrap_t);
            self.applied.wrap_s = Some(self.wrap_s);
            self.applied.wrap_t = Some(self.wrap_t);
        }

        if let Some(image) = &self.image {
            self.ctx.tex_image_2d(
                self.width,
                self.height,
                self.internal_format,
                self.format,
                self.texel_type,
                Some(image.as_slice()),
            );
            if self.generate_mipmaps {
                self.ctx.generate_mipmap();
            }
        } else if self.width > 0 {
            // Image intentionally absent: allocate storage for render targets.
            self.ctx.tex_image_2d(
                self.width,
                self.height,
                self.internal_format,
                self.format,
                self.texel_type,
                None,
            );
        } else {
            self.ctx.tex_image_2d(
                1,
                1,
                InternalFormat::Rgba,
                TextureFormat::Rgba,
                TexelType::U8,
                Some(&EMPTY_PIXEL[..]),
            );
        }
    }

    /// Deletes the GPU texture and drops it from the renderer's per-unit
    /// binding cache. The object must not be bound afterwards.
    pub fn remove(&mut self, renderer: &mut Renderer) {
        renderer.forget_texture(self.id);
        self.ctx.delete_texture(self.handle);
    }
}

// The device context is not Debug, so print the identifying bits by hand.
impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("needs_update", &self.needs_update)
            .finish()
    }
}
