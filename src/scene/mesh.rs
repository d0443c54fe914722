//! The drawable payload of a scene node.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat3, Mat4};

use crate::camera::Camera;
use crate::context::DrawMode;
use crate::renderer::Renderer;
use crate::resource::{Geometry, Program, UniformValue};

static MESH_ID: AtomicU64 = AtomicU64::new(1);

/// A geometry drawn with a program.
///
/// Geometry and program are shared handles: many meshes may draw the
/// same geometry, and the VAO and program caches make that cheap.
pub struct Mesh {
    /// Unique id, the final tie-breaker of the draw sort.
    pub id: u64,
    pub geometry: Rc<RefCell<Geometry>>,
    pub program: Rc<RefCell<Program>>,
    pub mode: DrawMode,
    /// Whether the renderer may skip this mesh when its bounding sphere
    /// falls outside the camera frustum.
    pub frustum_culled: bool,
    /// Primary sort key. Meshes with equal render order fall back to
    /// program grouping and depth.
    pub render_order: i32,
    // View-space depth of the node's origin, written by the renderer
    // while sorting.
    pub(crate) z_depth: f32,
}

impl Mesh {
    pub fn new(geometry: Rc<RefCell<Geometry>>, program: Rc<RefCell<Program>>) -> Mesh {
        Mesh {
            id: MESH_ID.fetch_add(1, Ordering::Relaxed),
            geometry,
            program,
            mode: DrawMode::Triangles,
            frustum_culled: true,
            render_order: 0,
            z_depth: 0.0,
        }
    }

    /// Feeds the transform uniforms, binds the program, and submits the
    /// geometry.
    ///
    /// With a camera the full set of built-in uniforms is supplied:
    /// `modelMatrix`, `viewMatrix`, `modelViewMatrix`, `normalMatrix`,
    /// `projectionMatrix` and `cameraPosition`. Without one only the
    /// model matrix is. The front-face winding is flipped for this draw
    /// when the world matrix is mirrored, so culling keeps working on
    /// negatively scaled objects.
    pub fn draw(&self, renderer: &mut Renderer, world_matrix: Mat4, camera: Option<&Camera>) {
        let mut program = self.program.borrow_mut();

        program
            .uniforms
            .insert("modelMatrix".to_string(), UniformValue::from(world_matrix));
        if let Some(camera) = camera {
            let model_view = camera.view_matrix * world_matrix;
            program.uniforms.insert(
                "projectionMatrix".to_string(),
                UniformValue::from(camera.projection_matrix),
            );
            program.uniforms.insert(
                "cameraPosition".to_string(),
                UniformValue::from(camera.world_position),
            );
            program.uniforms.insert(
                "viewMatrix".to_string(),
                UniformValue::from(camera.view_matrix),
            );
            program.uniforms.insert(
                "modelViewMatrix".to_string(),
                UniformValue::from(model_view),
            );
            program.uniforms.insert(
                "normalMatrix".to_string(),
                UniformValue::from(Mat3::from_mat4(model_view)),
            );
        }

        let flip_faces = program.cull_face.is_some() && world_matrix.determinant() < 0.0;
        program.use_program(renderer, flip_faces);
        self.geometry.borrow_mut().draw(renderer, &program, self.mode);
    }
}
