//! Double-buffered render targets for feedback effects.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::camera::Camera;
use crate::context::{InternalFormat, TexelType, TextureFilter, TextureWrap};
use crate::renderer::{RenderOptions, Renderer};
use crate::resource::{RenderTarget, RenderTargetOptions, Texture};
use crate::scene::SceneNode;

/// How the buffer's texture wraps when sampled outside [0, 1].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tiling {
    /// Clamp to the edge texels.
    Regular,
    /// Tile with mirroring at the seams.
    Tiling,
    /// Tile by straight repetition.
    Mirror,
}

impl Tiling {
    fn wrap(self) -> TextureWrap {
        match self {
            Tiling::Regular => TextureWrap::ClampToEdge,
            Tiling::Tiling => TextureWrap::MirroredRepeat,
            Tiling::Mirror => TextureWrap::Repeat,
        }
    }
}

/// The per-channel precision of the buffer's texels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TexDepth {
    UnsignedByte,
    HalfFloat,
    Float,
}

impl TexDepth {
    fn formats(self) -> (TexelType, InternalFormat) {
        match self {
            TexDepth::UnsignedByte => (TexelType::U8, InternalFormat::Rgba),
            // Rgba here gets promoted to the sized half-float format
            // when the target allocates its textures.
            TexDepth::HalfFloat => (TexelType::F16, InternalFormat::Rgba),
            TexDepth::Float => (TexelType::F32, InternalFormat::Rgba32F),
        }
    }
}

/// Construction parameters for a [`Framebuffer`].
#[derive(Clone, Copy, Debug)]
pub struct FramebufferOptions {
    /// Size in logical pixels; physical size is scaled by `dpr`.
    pub width: u32,
    pub height: u32,
    pub dpr: f32,
    pub tiling: Tiling,
    pub depth: TexDepth,
    pub min_filter: TextureFilter,
    pub mag_filter: Option<TextureFilter>,
    pub premultiply_alpha: bool,
}

impl Default for FramebufferOptions {
    fn default() -> FramebufferOptions {
        FramebufferOptions {
            width: 300,
            height: 150,
            dpr: 1.0,
            tiling: Tiling::Regular,
            depth: TexDepth::HalfFloat,
            min_filter: TextureFilter::Linear,
            mag_filter: None,
            premultiply_alpha: false,
        }
    }
}

/// A read/write pair of equally sized render targets.
///
/// Simulation-style effects sample the previous frame while writing the
/// next one; [`render`](Framebuffer::render) draws into the write
/// target and swaps, so [`texture`](Framebuffer::texture) always holds
/// the most recently completed frame.
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub dpr: f32,
    tiling: Tiling,
    depth: TexDepth,
    min_filter: TextureFilter,
    mag_filter: Option<TextureFilter>,
    premultiply_alpha: bool,
    read: RenderTarget,
    write: RenderTarget,
}

impl Framebuffer {
    pub fn new(renderer: &mut Renderer, options: FramebufferOptions) -> Framebuffer {
        let read = create_target(renderer, &options);
        let write = create_target(renderer, &options);
        Framebuffer {
            width: options.width,
            height: options.height,
            dpr: options.dpr,
            tiling: options.tiling,
            depth: options.depth,
            min_filter: options.min_filter,
            mag_filter: options.mag_filter,
            premultiply_alpha: options.premultiply_alpha,
            read,
            write,
        }
    }

    /// Exchanges the read and write targets.
    pub fn swap(&mut self) {
        mem::swap(&mut self.read, &mut self.write);
    }

    /// Draws `scene` into the write target, then swaps so the result
    /// becomes readable.
    pub fn render(
        &mut self,
        renderer: &mut Renderer,
        scene: &SceneNode,
        camera: Option<&mut Camera>,
        options: RenderOptions,
    ) {
        renderer.render(scene, camera, Some(&self.write), options);
        self.swap();
    }

    /// The target holding the last completed frame.
    pub fn read(&self) -> &RenderTarget {
        &self.read
    }

    /// The target the next [`render`](Framebuffer::render) draws into.
    pub fn write(&self) -> &RenderTarget {
        &self.write
    }

    /// The last completed frame's texture.
    pub fn texture(&self) -> Option<Rc<RefCell<Texture>>> {
        self.read.texture()
    }

    /// Throws both targets away and reallocates them at the new size.
    /// The buffered contents are lost.
    pub fn resize(&mut self, renderer: &mut Renderer, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.read.remove(renderer);
        self.write.remove(renderer);
        let options = FramebufferOptions {
            width,
            height,
            dpr: self.dpr,
            tiling: self.tiling,
            depth: self.depth,
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
            premultiply_alpha: self.premultiply_alpha,
        };
        self.read = create_target(renderer, &options);
        self.write = create_target(renderer, &options);
    }
}

fn create_target(renderer: &mut Renderer, options: &FramebufferOptions) -> RenderTarget {
    let (texel_type, internal_format) = options.depth.formats();
    let wrap = options.tiling.wrap();
    RenderTarget::new(
        renderer,
        RenderTargetOptions {
            width: (options.width as f32 * options.dpr) as u32,
            height: (options.height as f32 * options.dpr) as u32,
            depth: false,
            wrap_s: wrap,
            wrap_t: wrap,
            min_filter: options.min_filter,
            mag_filter: options.mag_filter,
            texel_type,
            internal_format,
            premultiply_alpha: options.premultiply_alpha,
            ..RenderTargetOptions::default()
        },
    )
}
