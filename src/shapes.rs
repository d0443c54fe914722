//! Ready-made geometries for common meshes.
//!
//! Each constructor allocates a [`Geometry`] with `position`, and where
//! it makes sense `normal`, `uv` and `index` attributes already filled
//! in. Extra attributes can be added afterwards with
//! [`Geometry::add_attribute`].

use crate::renderer::Renderer;
use crate::resource::{AttributeData, Geometry, GeometryAttribute};

/// A single triangle that covers the whole of clip space.
///
/// The classic full-screen triangle for post-processing passes: three
/// vertices, no index buffer, uvs running past 1 so that the visible
/// [0, 1] square maps exactly onto the viewport.
pub fn triangle(renderer: &mut Renderer) -> Geometry {
    let position = vec![-1.0, -1.0, 3.0, -1.0, -1.0, 3.0];
    let uv = vec![0.0, 0.0, 2.0, 0.0, 0.0, 2.0];
    Geometry::new(
        renderer,
        vec![
            (
                "position".to_string(),
                GeometryAttribute::new(2, AttributeData::F32(position)),
            ),
            (
                "uv".to_string(),
                GeometryAttribute::new(2, AttributeData::F32(uv)),
            ),
        ],
    )
}

/// A `position` attribute holding one point per particle, with `fill`
/// writing the coordinates.
///
/// `fill` receives the whole coordinate slice
/// (`particles * dimensions` floats, zeroed) and the dimension count,
/// so scattering strategies stay with the caller.
pub fn point_cloud(
    renderer: &mut Renderer,
    particles: usize,
    dimensions: usize,
    mut fill: impl FnMut(&mut [f32], usize),
) -> Geometry {
    let mut points = vec![0.0; particles * dimensions];
    fill(&mut points, dimensions);
    Geometry::new(
        renderer,
        vec![(
            "position".to_string(),
            GeometryAttribute::new(dimensions, AttributeData::F32(points)),
        )],
    )
}

/// An axis-aligned subdivided quad in the xy plane, facing +z.
pub fn plane(
    renderer: &mut Renderer,
    width: f32,
    height: f32,
    width_segments: usize,
    height_segments: usize,
) -> Geometry {
    let vertices = (width_segments + 1) * (height_segments + 1);
    let index_count = width_segments * height_segments * 6;

    let mut position = vec![0.0; vertices * 3];
    let mut normal = vec![0.0; vertices * 3];
    let mut uv = vec![0.0; vertices * 2];
    let mut index = vec![0u32; index_count];

    build_face(
        &mut position,
        &mut normal,
        &mut uv,
        &mut index,
        width,
        height,
        0.0,
        width_segments,
        height_segments,
        Face {
            u: 0,
            v: 1,
            w: 2,
            u_dir: 1.0,
            v_dir: -1.0,
            vertex_offset: 0,
            quad_offset: 0,
        },
    );

    assemble(renderer, position, normal, uv, index, index_count > 65536)
}

/// An axis-aligned box built from six subdivided faces.
///
/// Normals point outwards and each face carries its own [0, 1] uv
/// square.
pub fn cuboid(
    renderer: &mut Renderer,
    width: f32,
    height: f32,
    depth: f32,
    width_segments: usize,
    height_segments: usize,
    depth_segments: usize,
) -> Geometry {
    let (w_segs, h_segs, d_segs) = (width_segments, height_segments, depth_segments);
    let vertices = (w_segs + 1) * (h_segs + 1) * 2
        + (w_segs + 1) * (d_segs + 1) * 2
        + (h_segs + 1) * (d_segs + 1) * 2;
    let index_count = (w_segs * h_segs * 2 + w_segs * d_segs * 2 + h_segs * d_segs * 2) * 6;

    let mut position = vec![0.0; vertices * 3];
    let mut normal = vec![0.0; vertices * 3];
    let mut uv = vec![0.0; vertices * 2];
    let mut index = vec![0u32; index_count];

    let mut vertex_offset = 0;
    let mut quad_offset = 0;
    // (plane width, plane height, signed depth, segments, axis mapping)
    let faces: [(f32, f32, f32, usize, usize, usize, usize, usize, f32, f32); 6] = [
        // left, right
        (depth, height, width, d_segs, h_segs, 2, 1, 0, -1.0, -1.0),
        (depth, height, -width, d_segs, h_segs, 2, 1, 0, 1.0, -1.0),
        // top, bottom
        (width, depth, height, w_segs, d_segs, 0, 2, 1, 1.0, 1.0),
        (width, depth, -height, w_segs, d_segs, 0, 2, 1, 1.0, -1.0),
        // front, back
        (width, height, -depth, w_segs, h_segs, 0, 1, 2, -1.0, -1.0),
        (width, height, depth, w_segs, h_segs, 0, 1, 2, 1.0, -1.0),
    ];
    for (fw, fh, fd, fw_segs, fh_segs, u, v, w, u_dir, v_dir) in faces {
        build_face(
            &mut position,
            &mut normal,
            &mut uv,
            &mut index,
            fw,
            fh,
            fd,
            fw_segs,
            fh_segs,
            Face {
                u,
                v,
                w,
                u_dir,
                v_dir,
                vertex_offset,
                quad_offset,
            },
        );
        vertex_offset += (fw_segs + 1) * (fh_segs + 1);
        quad_offset += fw_segs * fh_segs;
    }

    assemble(renderer, position, normal, uv, index, vertices > 65536)
}

// Axis mapping for one face: `u`/`v`/`w` pick which of x/y/z each plane
// coordinate lands in, the dir factors flip handedness per face.
struct Face {
    u: usize,
    v: usize,
    w: usize,
    u_dir: f32,
    v_dir: f32,
    vertex_offset: usize,
    quad_offset: usize,
}

#[allow(clippy::too_many_arguments)]
fn build_face(
    position: &mut [f32],
    normal: &mut [f32],
    uv: &mut [f32],
    index: &mut [u32],
    width: f32,
    height: f32,
    depth: f32,
    w_segs: usize,
    h_segs: usize,
    face: Face,
) {
    let seg_w = width / w_segs as f32;
    let seg_h = height / h_segs as f32;
    let mut i = face.vertex_offset;
    let mut quad = face.quad_offset;
    for iy in 0..=h_segs {
        let y = iy as f32 * seg_h - height / 2.0;
        for ix in 0..=w_segs {
            let x = ix as f32 * seg_w - width / 2.0;
            position[i * 3 + face.u] = x * face.u_dir;
            position[i * 3 + face.v] = y * face.v_dir;
            position[i * 3 + face.w] = depth / 2.0;
            normal[i * 3 + face.u] = 0.0;
            normal[i * 3 + face.v] = 0.0;
            normal[i * 3 + face.w] = if depth >= 0.0 { 1.0 } else { -1.0 };
            uv[i * 2] = ix as f32 / w_segs as f32;
            uv[i * 2 + 1] = 1.0 - iy as f32 / h_segs as f32;

            if iy < h_segs && ix < w_segs {
                let a = (face.vertex_offset + ix + iy * (w_segs + 1)) as u32;
                let b = (face.vertex_offset + ix + (iy + 1) * (w_segs + 1)) as u32;
                let c = b + 1;
                let d = a + 1;
                index[quad * 6..quad * 6 + 6].copy_from_slice(&[a, b, d, b, c, d]);
                quad += 1;
            }
            i += 1;
        }
    }
}

fn assemble(
    renderer: &mut Renderer,
    position: Vec<f32>,
    normal: Vec<f32>,
    uv: Vec<f32>,
    index: Vec<u32>,
    wide_index: bool,
) -> Geometry {
    let index = if wide_index {
        AttributeData::U32(index)
    } else {
        AttributeData::U16(index.into_iter().map(|i| i as u16).collect())
    };
    Geometry::new(
        renderer,
        vec![
            (
                "position".to_string(),
                GeometryAttribute::new(3, AttributeData::F32(position)),
            ),
            (
                "normal".to_string(),
                GeometryAttribute::new(3, AttributeData::F32(normal)),
            ),
            (
                "uv".to_string(),
                GeometryAttribute::new(2, AttributeData::F32(uv)),
            ),
            ("index".to_string(), GeometryAttribute::new(1, index)),
        ],
    )
}
