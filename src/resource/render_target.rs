//! Offscreen render targets backed by a framebuffer object.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::{
    Attachment, Context, FramebufferId, InternalFormat, RenderbufferFormat, RenderbufferId,
    TexelType, TextureFilter, TextureFormat, TextureWrap,
};
use crate::renderer::Renderer;
use crate::resource::{Texture, TextureOptions};

/// Construction parameters for a `RenderTarget`.
pub struct RenderTargetOptions {
    pub width: u32,
    pub height: u32,
    /// Number of colour attachments. More than one requires the
    /// draw-buffers capability on the context.
    pub color: u32,
    pub depth: bool,
    pub stencil: bool,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: Option<TextureFilter>,
    pub format: TextureFormat,
    pub internal_format: InternalFormat,
    pub texel_type: TexelType,
    pub unpack_alignment: u32,
    pub premultiply_alpha: bool,
}

impl Default for RenderTargetOptions {
    fn default() -> RenderTargetOptions {
        RenderTargetOptions {
            width: 300,
            height: 150,
            color: 1,
            depth: true,
            stencil: false,
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            min_filter: TextureFilter::Linear,
            mag_filter: None,
            format: TextureFormat::Rgba,
            internal_format: InternalFormat::Rgba,
            texel_type: TexelType::U8,
            unpack_alignment: 4,
            premultiply_alpha: false,
        }
    }
}

/// A framebuffer with one or more colour textures and optional
/// depth/stencil storage.
///
/// Rendering into a target happens through `Renderer::render` by
/// passing the target along with the scene.
pub struct RenderTarget {
    ctx: Context,
    handle: Option<FramebufferId>,
    pub width: u32,
    pub height: u32,
    pub depth: bool,
    textures: Vec<Rc<RefCell<Texture>>>,
    renderbuffers: Vec<RenderbufferId>,
}

impl RenderTarget {
    /// Allocates the framebuffer, its colour textures and any
    /// requested depth/stencil renderbuffers.
    pub fn new(renderer: &mut Renderer, options: RenderTargetOptions) -> RenderTarget {
        let ctx = renderer.context().clone();
        let handle = ctx.create_framebuffer();
        renderer.bind_framebuffer(Some(handle));

        // Half-float targets need a wider internal format than the
        // plain texture default.
        let internal_format =
            if options.texel_type == TexelType::F16 && options.internal_format == InternalFormat::Rgba {
                InternalFormat::Rgba16F
            } else {
                options.internal_format
            };

        let mut textures = Vec::with_capacity(options.color as usize);
        let mut draw_buffers = Vec::with_capacity(options.color as usize);
        for i in 0..options.color {
            let texture = Texture::new(
                &ctx,
                TextureOptions {
                    width: options.width,
                    height: options.height,
                    wrap_s: options.wrap_s,
                    wrap_t: options.wrap_t,
                    min_filter: options.min_filter,
                    mag_filter: options.mag_filter.unwrap_or(options.min_filter),
                    format: options.format,
                    internal_format,
                    texel_type: options.texel_type,
                    unpack_alignment: options.unpack_alignment,
                    premultiply_alpha: options.premultiply_alpha,
                    generate_mipmaps: false,
                    flip_y: false,
                    ..TextureOptions::default()
                },
            );
            let texture = Rc::new(RefCell::new(texture));
            texture.borrow_mut().update(renderer, 0);
            ctx.framebuffer_texture_2d(Attachment::Color(i), texture.borrow().handle());
            draw_buffers.push(Attachment::Color(i));
            textures.push(texture);
        }
        if draw_buffers.len() > 1 && renderer.capabilities().draw_buffers {
            ctx.draw_buffers(&draw_buffers);
        }

        let mut renderbuffers = Vec::new();
        if options.depth && !options.stencil {
            let buffer = ctx.create_renderbuffer();
            ctx.bind_renderbuffer(Some(buffer));
            ctx.renderbuffer_storage(
                RenderbufferFormat::DepthComponent16,
                options.width,
                options.height,
            );
            ctx.framebuffer_renderbuffer(Attachment::Depth, buffer);
            renderbuffers.push(buffer);
        }
        if options.stencil && !options.depth {
            let buffer = ctx.create_renderbuffer();
            ctx.bind_renderbuffer(Some(buffer));
            ctx.renderbuffer_storage(
                RenderbufferFormat::StencilIndex8,
                options.width,
                options.height,
            );
            ctx.framebuffer_renderbuffer(Attachment::Stencil, buffer);
            renderbuffers.push(buffer);
        }
        if options.depth && options.stencil {
            let buffer = ctx.create_renderbuffer();
            ctx.bind_renderbuffer(Some(buffer));
            ctx.renderbuffer_storage(
                RenderbufferFormat::DepthStencil,
                options.width,
                options.height,
            );
            ctx.framebuffer_renderbuffer(Attachment::DepthStencil, buffer);
            renderbuffers.push(buffer);
        }
        renderer.bind_framebuffer(None);

        RenderTarget {
            ctx,
            handle: Some(handle),
            width: options.width,
            height: options.height,
            depth: options.depth,
            textures,
            renderbuffers,
        }
    }

    pub(crate) fn framebuffer(&self) -> Option<FramebufferId> {
        self.handle
    }

    /// The first colour attachment, or `None` for a target built with
    /// `color: 0` or one that has been removed.
    pub fn texture(&self) -> Option<Rc<RefCell<Texture>>> {
        let texture = self.textures.first().cloned();
        if texture.is_none() {
            log::warn!("render target has no colour attachment to sample");
        }
        texture
    }

    /// All colour attachments, in attachment order.
    pub fn textures(&self) -> &[Rc<RefCell<Texture>>] {
        &self.textures
    }

    /// Frees the framebuffer, attached textures and renderbuffers.
    pub fn remove(&mut self, renderer: &mut Renderer) {
        if let Some(handle) = self.handle.take() {
            renderer.forget_framebuffer(handle);
            self.ctx.delete_framebuffer(handle);
        }
        for texture in self.textures.drain(..) {
            texture.borrow_mut().remove(renderer);
        }
        for buffer in self.renderbuffers.drain(..) {
            self.ctx.delete_renderbuffer(buffer);
        }
    }
}
