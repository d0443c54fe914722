//! Projection cameras and frustum tests.

use glam::{Mat4, Vec3};

use crate::scene::{Mesh, SceneNode};

/// Construction parameters for a [`Camera`].
///
/// Supplying `left` or `right` makes the camera orthographic; otherwise
/// `fov` and `aspect` define a perspective projection.
#[derive(Clone, Copy, Debug)]
pub struct CameraOptions {
    pub near: f32,
    pub far: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub left: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
    pub top: Option<f32>,
    pub zoom: f32,
}

impl Default for CameraOptions {
    fn default() -> CameraOptions {
        CameraOptions {
            near: 0.1,
            far: 100.0,
            fov: 45.0,
            aspect: 1.0,
            left: None,
            right: None,
            bottom: None,
            top: None,
            zoom: 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ProjectionKind {
    Perspective,
    Orthographic,
}

// One frustum plane in constant-offset form.
#[derive(Copy, Clone, Debug, Default)]
struct Plane {
    normal: Vec3,
    constant: f32,
}

/// A perspective or orthographic camera.
///
/// The camera owns a scene node for its transform but normally lives
/// outside the rendered scene; the renderer updates its matrices
/// separately each frame. The derived view, world-position and
/// projection-view values are valid after
/// [`update_matrix_world`](Camera::update_matrix_world).
pub struct Camera {
    pub node: SceneNode,
    pub near: f32,
    pub far: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub zoom: f32,
    kind: ProjectionKind,
    pub projection_matrix: Mat4,
    pub view_matrix: Mat4,
    pub projection_view_matrix: Mat4,
    pub world_position: Vec3,
    frustum: [Plane; 6],
}

impl Camera {
    pub fn new(options: CameraOptions) -> Camera {
        let kind = if options.left.is_some() || options.right.is_some() {
            ProjectionKind::Orthographic
        } else {
            ProjectionKind::Perspective
        };

        let mut camera = Camera {
            node: SceneNode::new(),
            near: options.near,
            far: options.far,
            fov: options.fov,
            aspect: options.aspect,
            left: options.left.unwrap_or(0.0),
            right: options.right.unwrap_or(0.0),
            bottom: options.bottom.unwrap_or(0.0),
            top: options.top.unwrap_or(0.0),
            zoom: options.zoom,
            kind,
            projection_matrix: Mat4::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_view_matrix: Mat4::IDENTITY,
            world_position: Vec3::ZERO,
            frustum: [Plane::default(); 6],
        };
        match kind {
            ProjectionKind::Orthographic => camera.orthographic(),
            ProjectionKind::Perspective => camera.perspective(),
        }
        camera
    }

    /// Rebuilds a perspective projection from `fov`, `aspect`, `near`
    /// and `far`, and makes the camera perspective.
    pub fn perspective(&mut self) {
        self.projection_matrix =
            Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far);
        self.kind = ProjectionKind::Perspective;
    }

    /// Rebuilds an orthographic projection from the frustum planes
    /// scaled by `zoom`, and makes the camera orthographic.
    pub fn orthographic(&mut self) {
        self.projection_matrix = Mat4::orthographic_rh_gl(
            self.left / self.zoom,
            self.right / self.zoom,
            self.bottom / self.zoom,
            self.top / self.zoom,
            self.near,
            self.far,
        );
        self.kind = ProjectionKind::Orthographic;
    }

    pub fn is_orthographic(&self) -> bool {
        self.kind == ProjectionKind::Orthographic
    }

    /// Rebuilds the projection with whichever mode is current.
    pub(crate) fn update_projection(&mut self) {
        match self.kind {
            ProjectionKind::Orthographic => self.orthographic(),
            ProjectionKind::Perspective => self.perspective(),
        }
    }

    /// Updates the node's world matrix and derives the view matrix,
    /// world position and projection-view matrix from it.
    pub fn update_matrix_world(&mut self) {
        self.node.update_matrix_world();
        let world_matrix = self.node.data().world_matrix;
        self.view_matrix = world_matrix.inverse();
        self.world_position = world_matrix.w_axis.truncate();
        self.projection_view_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Points the camera at `target`.
    pub fn look_at(&self, target: Vec3) {
        self.node.data_mut().look_at(target, true);
    }

    /// Extracts the six frustum planes from the projection-view matrix.
    pub fn update_frustum(&mut self) {
        let m = self.projection_view_matrix;
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];
        let planes = [
            rows[3] - rows[0],
            rows[3] + rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[3] - rows[2],
            rows[3] + rows[2],
        ];
        for (plane, raw) in self.frustum.iter_mut().zip(planes.iter()) {
            let normal = raw.truncate();
            let inv_len = 1.0 / normal.length();
            plane.normal = normal * inv_len;
            plane.constant = raw.w * inv_len;
        }
    }

    /// Whether a world-space sphere touches the frustum. Conservative:
    /// spheres near edges can pass the plane tests while being outside.
    pub fn frustum_intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        for plane in &self.frustum {
            let distance = plane.normal.dot(center) + plane.constant;
            if distance < -radius {
                return false;
            }
        }
        true
    }

    /// Whether a mesh's bounding sphere, carried into world space by
    /// `world_matrix`, touches the frustum.
    ///
    /// Geometry bounds are computed lazily on first use; a geometry
    /// without position data is never culled.
    pub fn frustum_intersects_mesh(&self, mesh: &Mesh, world_matrix: Mat4) -> bool {
        let mut geometry = mesh.geometry.borrow_mut();
        if !geometry.attributes.contains_key("position") {
            return true;
        }
        if geometry
            .bounds
            .map_or(true, |bounds| bounds.radius.is_infinite())
        {
            geometry.compute_bounding_sphere();
        }
        let bounds = match geometry.bounds {
            Some(bounds) => bounds,
            None => return true,
        };

        let center = world_matrix.transform_point3(bounds.center);
        let radius = bounds.radius * max_axis_scale(&world_matrix);
        self.frustum_intersects_sphere(center, radius)
    }
}

// The largest scale factor the matrix applies along any basis axis,
// used to carry a bounding radius into world space.
fn max_axis_scale(m: &Mat4) -> f32 {
    let x = m.x_axis.truncate().length_squared();
    let y = m.y_axis.truncate().length_squared();
    let z = m.z_axis.truncate().length_squared();
    x.max(y).max(z).sqrt()
}
