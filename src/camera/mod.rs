//! Projection cameras and interactive camera controllers.

pub use crate::camera::camera::{Camera, CameraOptions};
pub use crate::camera::dolly::{DollyCamera, DollyCameraOptions, ZoomStyle};

mod camera;
mod dolly;
