//! Input events fed to interactive cameras.
//!
//! The crate never listens to a windowing system itself; the host
//! translates its native pointer/touch events into these and hands them
//! to [`DollyCamera::handle_event`](crate::camera::DollyCamera::handle_event).

use glam::Vec2;

/// What a pressed pointer button means to the camera.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerButton {
    /// Usually the primary button.
    Orbit,
    /// Usually the middle button.
    Zoom,
    /// Usually the secondary button.
    Pan,
}

/// A camera input event, in surface pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum CameraEvent {
    PointerDown { button: PointerButton, position: Vec2 },
    PointerMove { position: Vec2 },
    PointerUp,
    /// Positive `delta_y` scrolls away, zooming out.
    Wheel { delta_y: f32 },
    TouchStart { touches: Vec<Vec2> },
    TouchMove { touches: Vec<Vec2> },
    TouchEnd,
}
