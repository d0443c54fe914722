//! Frame submission and the cached device-state mirror.

pub use crate::renderer::renderer::{RenderOptions, Renderer, RendererOptions};

mod renderer;
