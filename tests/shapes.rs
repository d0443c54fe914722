mod common;

use std::rc::Rc;

use common::RecordingContext;
use slimgl::context::{Context, DataType};
use slimgl::renderer::{Renderer, RendererOptions};
use slimgl::resource::AttributeData;
use slimgl::shapes;

fn renderer(ctx: &Rc<RecordingContext>) -> Renderer {
    let context: Context = ctx.clone();
    Renderer::new(context, RendererOptions::default())
}

fn floats(data: &AttributeData) -> &[f32] {
    match data {
        AttributeData::F32(values) => values,
        other => panic!("expected f32 data, got {:?}", other),
    }
}

#[test]
fn triangle_covers_clip_space_with_three_vertices() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    let triangle = shapes::triangle(&mut renderer);

    assert_eq!(triangle.draw_range.count, 3);
    let position = &triangle.attributes["position"];
    assert_eq!(position.size, 2);
    // The third vertex overshoots to (3, -1) / (-1, 3) so the triangle
    // still covers the whole [-1, 1] square.
    assert_eq!(floats(&position.data), &[-1.0, -1.0, 3.0, -1.0, -1.0, 3.0]);
    let uv = &triangle.attributes["uv"];
    assert_eq!(floats(&uv.data), &[0.0, 0.0, 2.0, 0.0, 0.0, 2.0]);
    assert!(!triangle.attributes.contains_key("index"));
}

#[test]
fn plane_vertex_and_index_counts_follow_the_segments() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    let plane = shapes::plane(&mut renderer, 2.0, 1.0, 2, 3);

    let position = &plane.attributes["position"];
    assert_eq!(position.count, (2 + 1) * (3 + 1));
    let index = &plane.attributes["index"];
    assert_eq!(index.kind, DataType::U16);
    assert_eq!(index.data.len(), 2 * 3 * 6);
    // Indexed geometries draw one element per index.
    assert_eq!(plane.draw_range.count, 2 * 3 * 6);
}

#[test]
fn plane_corners_sit_at_half_the_extents() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    let mut plane = shapes::plane(&mut renderer, 4.0, 2.0, 1, 1);
    plane.compute_bounding_box();

    let bounds = plane.bounds.unwrap();
    assert_eq!(bounds.min.x, -2.0);
    assert_eq!(bounds.max.x, 2.0);
    assert_eq!(bounds.min.y, -1.0);
    assert_eq!(bounds.max.y, 1.0);
    assert_eq!(bounds.min.z, 0.0);
    assert_eq!(bounds.max.z, 0.0);
}

#[test]
fn plane_normals_face_positive_z() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    let plane = shapes::plane(&mut renderer, 1.0, 1.0, 1, 1);

    let normal = floats(&plane.attributes["normal"].data);
    for vertex in 0..4 {
        assert_eq!(normal[vertex * 3], 0.0);
        assert_eq!(normal[vertex * 3 + 1], 0.0);
        assert_eq!(normal[vertex * 3 + 2], 1.0);
    }
}

#[test]
fn cuboid_builds_six_faces() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    let cuboid = shapes::cuboid(&mut renderer, 1.0, 1.0, 1.0, 1, 1, 1);

    // Four vertices and two triangles per face.
    let position = &cuboid.attributes["position"];
    assert_eq!(position.count, 24);
    let index = &cuboid.attributes["index"];
    assert_eq!(index.kind, DataType::U16);
    assert_eq!(index.data.len(), 36);
    assert_eq!(cuboid.draw_range.count, 36);
}

#[test]
fn cuboid_fills_its_extents() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    let mut cuboid = shapes::cuboid(&mut renderer, 2.0, 4.0, 6.0, 1, 1, 1);
    cuboid.compute_bounding_box();

    let bounds = cuboid.bounds.unwrap();
    assert_eq!(bounds.min.x, -1.0);
    assert_eq!(bounds.max.x, 1.0);
    assert_eq!(bounds.min.y, -2.0);
    assert_eq!(bounds.max.y, 2.0);
    assert_eq!(bounds.min.z, -3.0);
    assert_eq!(bounds.max.z, 3.0);
}

#[test]
fn point_cloud_hands_the_fill_closure_every_coordinate() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    let cloud = shapes::point_cloud(&mut renderer, 16, 3, |points, dimensions| {
        assert_eq!(dimensions, 3);
        for (i, value) in points.iter_mut().enumerate() {
            *value = i as f32;
        }
    });

    let position = &cloud.attributes["position"];
    assert_eq!(position.size, 3);
    assert_eq!(position.count, 16);
    assert_eq!(floats(&position.data)[47], 47.0);
    assert_eq!(cloud.draw_range.count, 16);
}

#[test]
fn flat_point_clouds_keep_their_dimension_as_the_attribute_size() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    let cloud = shapes::point_cloud(&mut renderer, 8, 2, |_, _| {});

    let position = &cloud.attributes["position"];
    assert_eq!(position.size, 2);
    assert_eq!(position.count, 8);
}
