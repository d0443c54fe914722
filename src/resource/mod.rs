//! GPU resources: geometry, programs, textures, and render targets.

pub use crate::resource::geometry::{Bounds, DrawRange, Geometry};
pub use crate::resource::geometry_attribute::{AttributeData, GeometryAttribute};
pub use crate::resource::program::{Program, ProgramOptions};
pub use crate::resource::render_target::{RenderTarget, RenderTargetOptions};
pub use crate::resource::texture::{Texture, TextureOptions};
pub use crate::resource::uniform::UniformValue;

mod geometry;
mod geometry_attribute;
mod program;
mod render_target;
mod texture;
pub(crate) mod uniform;
