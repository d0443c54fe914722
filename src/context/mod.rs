//! The abstraction over the underlying graphics device.

pub use crate::context::context::*;

mod context;
