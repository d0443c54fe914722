//! Uniform values and the low-level set-call dispatch.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::context::{ProgramId, UniformKind, UniformLocation};
use crate::renderer::Renderer;
use crate::resource::Texture;

/// A value supplied for a shader uniform.
///
/// Uniform values are not owned by a single program; the same value may be
/// shared across several programs (a time uniform, for instance). The
/// caller mutates them between frames and the program resolves them
/// against its introspected locations at draw time.
#[derive(Clone, Debug)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Int(i32),
    IntVec2([i32; 2]),
    IntVec3([i32; 3]),
    IntVec4([i32; 4]),
    Bool(bool),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
    /// A flat float array: scalar arrays or pre-flattened vector arrays.
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
    Texture(Rc<RefCell<Texture>>),
    TextureArray(Vec<Rc<RefCell<Texture>>>),
}

impl UniformValue {
    /// Flattens the value into a scalar slice ready for the device call.
    ///
    /// Texture values have no scalar form of their own; the program turns
    /// them into texture-unit indices before dispatch.
    pub(crate) fn flatten(&self) -> Option<UniformData> {
        let data = match self {
            UniformValue::Float(v) => UniformData::Floats(vec![*v]),
            UniformValue::Vec2(v) => UniformData::Floats(v.to_array().to_vec()),
            UniformValue::Vec3(v) => UniformData::Floats(v.to_array().to_vec()),
            UniformValue::Vec4(v) => UniformData::Floats(v.to_array().to_vec()),
            UniformValue::Int(v) => UniformData::Ints(vec![*v]),
            UniformValue::IntVec2(v) => UniformData::Ints(v.to_vec()),
            UniformValue::IntVec3(v) => UniformData::Ints(v.to_vec()),
            UniformValue::IntVec4(v) => UniformData::Ints(v.to_vec()),
            UniformValue::Bool(v) => UniformData::Ints(vec![*v as i32]),
            UniformValue::Mat2(m) => UniformData::Floats(m.to_cols_array().to_vec()),
            UniformValue::Mat3(m) => UniformData::Floats(m.to_cols_array().to_vec()),
            UniformValue::Mat4(m) => UniformData::Floats(m.to_cols_array().to_vec()),
            UniformValue::FloatArray(v) => UniformData::Floats(v.clone()),
            UniformValue::IntArray(v) => UniformData::Ints(v.clone()),
            UniformValue::Texture(_) | UniformValue::TextureArray(_) => return None,
        };
        Some(data)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(m: Mat3) -> Self {
        UniformValue::Mat3(m)
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        UniformValue::Mat4(m)
    }
}

impl From<Rc<RefCell<Texture>>> for UniformValue {
    fn from(t: Rc<RefCell<Texture>>) -> Self {
        UniformValue::Texture(t)
    }
}

/// A flattened uniform payload, also used as the renderer's last-set
/// cache entry.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum UniformData {
    Floats(Vec<f32>),
    Ints(Vec<i32>),
}

/// Issues the device call matching the introspected uniform kind.
///
/// Consults the renderer's per-location cache first and returns without
/// touching the device when the value has not changed since the last set.
pub(crate) fn set_uniform(
    renderer: &mut Renderer,
    program: ProgramId,
    kind: UniformKind,
    location: UniformLocation,
    data: UniformData,
) {
    if !renderer.update_uniform_cache(program, location, &data) {
        return;
    }

    let ctx = renderer.context();
    match (kind, &data) {
        (UniformKind::Float, UniformData::Floats(v)) => {
            // Scalar float arrays share the FLOAT introspection tag.
            match v.as_slice() {
                [single] => ctx.uniform1f(location, *single),
                _ => ctx.uniform1fv(location, v),
            }
        }
        (UniformKind::FloatVec2, UniformData::Floats(v)) => ctx.uniform2fv(location, v),
        (UniformKind::FloatVec3, UniformData::Floats(v)) => ctx.uniform3fv(location, v),
        (UniformKind::FloatVec4, UniformData::Floats(v)) => ctx.uniform4fv(location, v),
        (
            UniformKind::Int
            | UniformKind::Bool
            | UniformKind::Sampler2D
            | UniformKind::SamplerCube,
            UniformData::Ints(v),
        ) => {
            match v.as_slice() {
                [single] => ctx.uniform1i(location, *single),
                _ => ctx.uniform1iv(location, v),
            }
        }
        (UniformKind::IntVec2 | UniformKind::BoolVec2, UniformData::Ints(v)) => {
            ctx.uniform2iv(location, v)
        }
        (UniformKind::IntVec3 | UniformKind::BoolVec3, UniformData::Ints(v)) => {
            ctx.uniform3iv(location, v)
        }
        (UniformKind::IntVec4 | UniformKind::BoolVec4, UniformData::Ints(v)) => {
            ctx.uniform4iv(location, v)
        }
        (UniformKind::Mat2, UniformData::Floats(v)) => ctx.uniform_matrix2fv(location, v),
        (UniformKind::Mat3, UniformData::Floats(v)) => ctx.uniform_matrix3fv(location, v),
        (UniformKind::Mat4, UniformData::Floats(v)) => ctx.uniform_matrix4fv(location, v),
        _ => log::warn!(
            "uniform at {:?} has a value that does not match its declared kind {:?}",
            location,
            kind
        ),
    }
}
