//! Offscreen passes built on render targets.

pub use crate::post_processing::framebuffer::{Framebuffer, FramebufferOptions, TexDepth, Tiling};

mod framebuffer;
