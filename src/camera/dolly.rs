//! An orbiting camera controller with eased, inertial motion.

use std::f32::consts::{PI, TAU};
use std::ops::{Deref, DerefMut};

use glam::{Mat4, Vec2, Vec3};

use crate::camera::Camera;
use crate::event::{CameraEvent, PointerButton};

/// How zooming changes the view.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ZoomStyle {
    /// Move the camera along the view axis.
    Dolly,
    /// Narrow or widen the field of view in place.
    Fov,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DragState {
    None,
    Rotate,
    Dolly,
    Pan,
    DollyPan,
}

// Radius, polar angle, azimuth angle. The controller keeps three of
// these: the per-frame delta, the target, and the eased current value.
#[derive(Copy, Clone, Debug)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn new(radius: f32) -> Spherical {
        Spherical {
            radius,
            phi: 0.0,
            theta: 0.0,
        }
    }
}

/// Construction parameters for a [`DollyCamera`].
#[derive(Clone, Copy, Debug)]
pub struct DollyCameraOptions {
    pub enabled: bool,
    /// The world point the camera orbits and looks at.
    pub target: Vec3,
    /// Fraction of the remaining distance covered per update tick.
    pub ease: f32,
    /// Per-tick decay of pointer-driven deltas after release.
    pub inertia: f32,
    pub enable_rotate: bool,
    pub rotate_speed: f32,
    pub auto_rotate: bool,
    /// Full revolutions per 60 updates-per-second minute.
    pub auto_rotate_speed: f32,
    pub enable_zoom: bool,
    pub zoom_speed: f32,
    pub zoom_style: ZoomStyle,
    pub enable_pan: bool,
    pub pan_speed: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_azimuth_angle: f32,
    pub max_azimuth_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Height in pixels of the host surface; rotate and pan gestures
    /// are scaled against it.
    pub element_height: f32,
}

impl Default for DollyCameraOptions {
    fn default() -> DollyCameraOptions {
        DollyCameraOptions {
            enabled: true,
            target: Vec3::ZERO,
            ease: 0.25,
            inertia: 0.5,
            enable_rotate: true,
            rotate_speed: 0.5,
            auto_rotate: false,
            auto_rotate_speed: 1.0,
            enable_zoom: true,
            zoom_speed: 1.0,
            zoom_style: ZoomStyle::Dolly,
            enable_pan: true,
            pan_speed: 0.5,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            min_azimuth_angle: f32::NEG_INFINITY,
            max_azimuth_angle: f32::INFINITY,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            element_height: 150.0,
        }
    }
}

/// Orbit/zoom/pan control wrapped around a [`Camera`].
///
/// Feed it [`CameraEvent`]s and call [`update`](DollyCamera::update)
/// once per frame; motion eases towards its target and keeps coasting
/// with inertia after the pointer is released. Dereferences to the
/// wrapped camera.
pub struct DollyCamera {
    pub camera: Camera,
    pub enabled: bool,
    pub target: Vec3,
    pub ease: f32,
    pub inertia: f32,
    pub enable_rotate: bool,
    pub rotate_speed: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    pub enable_zoom: bool,
    pub zoom_speed: f32,
    pub zoom_style: ZoomStyle,
    pub enable_pan: bool,
    pub pan_speed: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_azimuth_angle: f32,
    pub max_azimuth_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub element_height: f32,
    spherical_delta: Spherical,
    spherical_target: Spherical,
    spherical: Spherical,
    pan_delta: Vec3,
    rotate_start: Vec2,
    pan_start: Vec2,
    dolly_start: Vec2,
    state: DragState,
}

impl DollyCamera {
    /// Wraps `camera`, deriving the initial orbit from its current
    /// position relative to the target.
    pub fn new(camera: Camera, options: DollyCameraOptions) -> DollyCamera {
        let mut dolly = DollyCamera {
            camera,
            enabled: options.enabled,
            target: options.target,
            ease: options.ease,
            inertia: options.inertia,
            enable_rotate: options.enable_rotate,
            rotate_speed: options.rotate_speed,
            auto_rotate: options.auto_rotate,
            auto_rotate_speed: options.auto_rotate_speed,
            enable_zoom: options.enable_zoom,
            zoom_speed: options.zoom_speed,
            zoom_style: options.zoom_style,
            enable_pan: options.enable_pan,
            pan_speed: options.pan_speed,
            min_polar_angle: options.min_polar_angle,
            max_polar_angle: options.max_polar_angle,
            min_azimuth_angle: options.min_azimuth_angle,
            max_azimuth_angle: options.max_azimuth_angle,
            min_distance: options.min_distance,
            max_distance: options.max_distance,
            element_height: options.element_height,
            spherical_delta: Spherical::new(1.0),
            spherical_target: Spherical::new(1.0),
            spherical: Spherical::new(1.0),
            pan_delta: Vec3::ZERO,
            rotate_start: Vec2::ZERO,
            pan_start: Vec2::ZERO,
            dolly_start: Vec2::ZERO,
            state: DragState::None,
        };
        dolly.force_position();
        dolly
    }

    /// Moves the camera and re-derives the orbit from the new position.
    pub fn set_position(&mut self, position: Vec3) {
        self.camera.node.data_mut().position = position;
        self.force_position();
    }

    /// Snaps the orbit state to wherever the camera currently is,
    /// discarding any eased motion in flight.
    pub fn force_position(&mut self) {
        let position = self.camera.node.data().position;
        let offset = position - self.target;
        let radius = offset.length();
        let theta = offset.x.atan2(offset.z);
        let phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        self.spherical.radius = radius;
        self.spherical_target.radius = radius;
        self.spherical.theta = theta;
        self.spherical_target.theta = theta;
        self.spherical.phi = phi;
        self.spherical_target.phi = phi;
        self.camera.look_at(self.target);
    }

    /// Advances the eased orbit by one tick and repositions the camera.
    ///
    /// Motion is tied to the update rate, not to wall-clock time: each
    /// call covers `ease` of the remaining distance, so a faster loop
    /// settles faster.
    pub fn update(&mut self) {
        if self.auto_rotate {
            self.handle_auto_rotate();
        }

        self.spherical_target.radius *= self.spherical_delta.radius;
        self.spherical_target.theta += self.spherical_delta.theta;
        self.spherical_target.phi += self.spherical_delta.phi;

        self.spherical_target.theta = self
            .spherical_target
            .theta
            .clamp(self.min_azimuth_angle, self.max_azimuth_angle);
        self.spherical_target.phi = self
            .spherical_target
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle);
        self.spherical_target.radius = self
            .spherical_target
            .radius
            .clamp(self.min_distance, self.max_distance);

        self.spherical.phi += (self.spherical_target.phi - self.spherical.phi) * self.ease;
        self.spherical.theta += (self.spherical_target.theta - self.spherical.theta) * self.ease;
        self.spherical.radius += (self.spherical_target.radius - self.spherical.radius) * self.ease;

        self.target += self.pan_delta;

        // Back to cartesian, keeping the polar angle off the pole so the
        // look-at basis stays well defined.
        let phi = self.spherical.phi.max(0.000_001);
        let sin_phi_radius = self.spherical.radius * phi.sin();
        let offset = Vec3::new(
            sin_phi_radius * self.spherical.theta.sin(),
            self.spherical.radius * phi.cos(),
            sin_phi_radius * self.spherical.theta.cos(),
        );

        self.camera.node.data_mut().position = self.target + offset;
        self.camera.look_at(self.target);

        self.spherical_delta.theta *= self.inertia;
        self.spherical_delta.phi *= self.inertia;
        self.pan_delta *= self.inertia;
        self.spherical_delta.radius = 1.0;
    }

    /// Routes a host input event into the orbit state machine.
    pub fn handle_event(&mut self, event: &CameraEvent) {
        if !self.enabled {
            return;
        }
        match event {
            CameraEvent::PointerDown { button, position } => match button {
                PointerButton::Orbit => {
                    if self.enable_rotate {
                        self.rotate_start = *position;
                        self.state = DragState::Rotate;
                    }
                }
                PointerButton::Zoom => {
                    if self.enable_zoom {
                        self.dolly_start = *position;
                        self.state = DragState::Dolly;
                    }
                }
                PointerButton::Pan => {
                    if self.enable_pan {
                        self.pan_start = *position;
                        self.state = DragState::Pan;
                    }
                }
            },
            CameraEvent::PointerMove { position } => match self.state {
                DragState::Rotate => {
                    if self.enable_rotate {
                        self.handle_move_rotate(*position);
                    }
                }
                DragState::Dolly => {
                    if self.enable_zoom {
                        self.handle_move_dolly(*position);
                    }
                }
                DragState::Pan => {
                    if self.enable_pan {
                        self.handle_move_pan(*position);
                    }
                }
                _ => {}
            },
            CameraEvent::PointerUp => self.state = DragState::None,
            CameraEvent::Wheel { delta_y } => {
                if !self.enable_zoom
                    || (self.state != DragState::None && self.state != DragState::Rotate)
                {
                    return;
                }
                if *delta_y < 0.0 {
                    self.dolly(1.0 / self.zoom_scale());
                } else if *delta_y > 0.0 {
                    self.dolly(self.zoom_scale());
                }
            }
            CameraEvent::TouchStart { touches } => match touches.as_slice() {
                [touch] => {
                    if self.enable_rotate {
                        self.rotate_start = *touch;
                        self.state = DragState::Rotate;
                    }
                }
                [a, b] => {
                    self.handle_touch_start_dolly_pan(*a, *b);
                    self.state = DragState::DollyPan;
                }
                _ => self.state = DragState::None,
            },
            CameraEvent::TouchMove { touches } => match touches.as_slice() {
                [touch] => self.handle_move_rotate(*touch),
                [a, b] => self.handle_touch_move_dolly_pan(*a, *b),
                _ => self.state = DragState::None,
            },
            CameraEvent::TouchEnd => self.state = DragState::None,
        }
    }

    fn handle_auto_rotate(&mut self) {
        let angle = TAU / 60.0 / 60.0 * self.auto_rotate_speed;
        self.spherical_delta.theta -= angle;
    }

    fn handle_move_rotate(&mut self, position: Vec2) {
        let movement = (position - self.rotate_start) * self.rotate_speed;
        self.spherical_delta.theta -= TAU * movement.x / self.element_height;
        self.spherical_delta.phi -= TAU * movement.y / self.element_height;
        self.rotate_start = position;
    }

    fn handle_move_dolly(&mut self, position: Vec2) {
        let delta_y = position.y - self.dolly_start.y;
        if delta_y > 0.0 {
            self.dolly(self.zoom_scale());
        } else if delta_y < 0.0 {
            self.dolly(1.0 / self.zoom_scale());
        }
        self.dolly_start = position;
    }

    fn handle_move_pan(&mut self, position: Vec2) {
        let movement = (position - self.pan_start) * self.pan_speed;
        self.pan(movement);
        self.pan_start = position;
    }

    fn handle_touch_start_dolly_pan(&mut self, a: Vec2, b: Vec2) {
        if self.enable_zoom {
            self.dolly_start = Vec2::new(0.0, a.distance(b));
        }
        if self.enable_pan {
            self.pan_start = (a + b) * 0.5;
        }
    }

    fn handle_touch_move_dolly_pan(&mut self, a: Vec2, b: Vec2) {
        if self.enable_zoom {
            let zoom = Vec2::new(0.0, a.distance(b));
            let scale = (zoom.y / self.dolly_start.y).powf(self.zoom_speed);
            self.dolly(scale);
            self.dolly_start = zoom;
        }
        if self.enable_pan {
            self.handle_move_pan((a + b) * 0.5);
        }
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    fn dolly(&mut self, scale: f32) {
        match self.zoom_style {
            ZoomStyle::Dolly => self.spherical_delta.radius /= scale,
            ZoomStyle::Fov => {
                self.camera.fov /= scale;
                self.camera.update_projection();
            }
        }
    }

    // Pan offsets come from the camera matrix's basis vectors, so the
    // motion stays screen-aligned no matter the orbit.
    fn pan(&mut self, delta: Vec2) {
        let (position, matrix) = {
            let data = self.camera.node.data();
            (data.position, data.matrix)
        };
        let mut target_distance = (position - self.target).length();
        target_distance *= (self.camera.fov.to_radians() / 2.0).tan();

        self.pan_left(2.0 * delta.x * target_distance / self.element_height, &matrix);
        self.pan_up(2.0 * delta.y * target_distance / self.element_height, &matrix);
    }

    fn pan_left(&mut self, distance: f32, matrix: &Mat4) {
        self.pan_delta += matrix.x_axis.truncate() * -distance;
    }

    fn pan_up(&mut self, distance: f32, matrix: &Mat4) {
        self.pan_delta += matrix.y_axis.truncate() * distance;
    }
}

impl Deref for DollyCamera {
    type Target = Camera;

    fn deref(&self) -> &Camera {
        &self.camera
    }
}

impl DerefMut for DollyCamera {
    fn deref_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }
}
