//! The transform hierarchy and its drawable payloads.

pub use crate::scene::mesh::Mesh;
pub use crate::scene::node::{SceneNode, SceneNodeData};

mod mesh;
mod node;
