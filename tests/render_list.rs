mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{position_only_program, triangle_positions, RecordingContext};
use slimgl::camera::{Camera, CameraOptions};
use slimgl::context::{ActiveUniform, Context, UniformKind, UniformLocation};
use slimgl::glam::Vec3;
use slimgl::renderer::{RenderOptions, Renderer, RendererOptions};
use slimgl::resource::{AttributeData, Geometry, GeometryAttribute, Program, ProgramOptions};
use slimgl::scene::{Mesh, SceneNode};

fn setup(ctx: &Rc<RecordingContext>) -> (Renderer, Camera) {
    let _ = env_logger::builder().is_test(true).try_init();
    let context: Context = ctx.clone();
    let renderer = Renderer::new(context, RendererOptions::default());
    let camera = Camera::new(CameraOptions::default());
    (renderer, camera)
}

fn triangle_geometry(renderer: &mut Renderer) -> Rc<RefCell<Geometry>> {
    let geometry = Geometry::new(
        renderer,
        vec![(
            "position".to_string(),
            GeometryAttribute::new(3, AttributeData::F32(triangle_positions())),
        )],
    );
    Rc::new(RefCell::new(geometry))
}

fn program(
    ctx: &Rc<RecordingContext>,
    renderer: &Renderer,
    transparent: bool,
    depth_test: bool,
) -> Rc<RefCell<Program>> {
    let (uniforms, attributes) = position_only_program();
    ctx.script_program(uniforms, attributes);
    Rc::new(RefCell::new(Program::new(
        renderer,
        ProgramOptions {
            transparent,
            depth_test,
            ..ProgramOptions::default()
        },
    )))
}

fn node_at(mesh: Mesh, position: Vec3) -> SceneNode {
    let node = SceneNode::with_drawable(mesh);
    node.set_position(position);
    node
}

fn use_program_position(ctx: &Rc<RecordingContext>, program: &Rc<RefCell<Program>>) -> usize {
    let handle = program.borrow().handle().unwrap();
    ctx.position(&format!("use_program({:?})", handle))
        .unwrap_or_else(|| panic!("{:?} was never used", handle))
}

#[test]
fn opaque_draws_before_transparent_regardless_of_scene_order() {
    let ctx = RecordingContext::new();
    let (mut renderer, mut camera) = setup(&ctx);

    let geometry = triangle_geometry(&mut renderer);
    let transparent_program = program(&ctx, &renderer, true, true);
    let opaque_program = program(&ctx, &renderer, false, true);

    let scene = SceneNode::new();
    scene.add_child(&node_at(
        Mesh::new(geometry.clone(), transparent_program.clone()),
        Vec3::new(0.0, 0.0, -3.0),
    ));
    scene.add_child(&node_at(
        Mesh::new(geometry, opaque_program.clone()),
        Vec3::new(0.0, 0.0, -5.0),
    ));

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());

    assert!(
        use_program_position(&ctx, &opaque_program)
            < use_program_position(&ctx, &transparent_program)
    );
    assert_eq!(ctx.count("draw_arrays"), 2);
}

#[test]
fn depthless_transparent_meshes_draw_last() {
    let ctx = RecordingContext::new();
    let (mut renderer, mut camera) = setup(&ctx);

    let geometry = triangle_geometry(&mut renderer);
    let ui_program = program(&ctx, &renderer, true, false);
    let transparent_program = program(&ctx, &renderer, true, true);
    let opaque_program = program(&ctx, &renderer, false, true);

    let scene = SceneNode::new();
    scene.add_child(&node_at(
        Mesh::new(geometry.clone(), ui_program.clone()),
        Vec3::new(0.0, 0.0, -2.0),
    ));
    scene.add_child(&node_at(
        Mesh::new(geometry.clone(), transparent_program.clone()),
        Vec3::new(0.0, 0.0, -3.0),
    ));
    scene.add_child(&node_at(
        Mesh::new(geometry, opaque_program.clone()),
        Vec3::new(0.0, 0.0, -5.0),
    ));

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());

    let opaque = use_program_position(&ctx, &opaque_program);
    let transparent = use_program_position(&ctx, &transparent_program);
    let ui = use_program_position(&ctx, &ui_program);
    assert!(opaque < transparent);
    assert!(transparent < ui);
}

#[test]
fn transparent_meshes_draw_back_to_front() {
    let ctx = RecordingContext::new();
    let (mut renderer, mut camera) = setup(&ctx);

    let near_geometry = triangle_geometry(&mut renderer);
    // Six vertices so the two draws are distinguishable in the log.
    let far_positions: Vec<f32> = triangle_positions()
        .iter()
        .chain(triangle_positions().iter())
        .copied()
        .collect();
    let far_geometry = Rc::new(RefCell::new(Geometry::new(
        &mut renderer,
        vec![(
            "position".to_string(),
            GeometryAttribute::new(3, AttributeData::F32(far_positions)),
        )],
    )));
    let shared_program = program(&ctx, &renderer, true, true);

    let scene = SceneNode::new();
    scene.add_child(&node_at(
        Mesh::new(near_geometry, shared_program.clone()),
        Vec3::new(0.0, 0.0, -3.0),
    ));
    scene.add_child(&node_at(
        Mesh::new(far_geometry, shared_program),
        Vec3::new(0.0, 0.0, -8.0),
    ));

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());

    let far_draw = ctx.position("draw_arrays(Triangles, 0, 6)").unwrap();
    let near_draw = ctx.position("draw_arrays(Triangles, 0, 3)").unwrap();
    assert!(far_draw < near_draw);
}

#[test]
fn meshes_outside_the_frustum_are_culled() {
    let ctx = RecordingContext::new();
    let (mut renderer, mut camera) = setup(&ctx);

    let geometry = triangle_geometry(&mut renderer);
    let visible_program = program(&ctx, &renderer, false, true);
    let culled_program = program(&ctx, &renderer, false, true);

    let scene = SceneNode::new();
    scene.add_child(&node_at(
        Mesh::new(geometry.clone(), visible_program),
        Vec3::new(0.0, 0.0, -5.0),
    ));
    // Far plane is at 100
    scene.add_child(&node_at(
        Mesh::new(geometry, culled_program),
        Vec3::new(0.0, 0.0, -200.0),
    ));

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());
    assert_eq!(ctx.count("draw_arrays"), 1);

    renderer.render(
        &scene,
        Some(&mut camera),
        None,
        RenderOptions {
            frustum_cull: false,
            ..RenderOptions::default()
        },
    );
    assert_eq!(ctx.count("draw_arrays"), 3);
}

#[test]
fn invisible_subtrees_are_pruned() {
    let ctx = RecordingContext::new();
    let (mut renderer, mut camera) = setup(&ctx);

    let geometry = triangle_geometry(&mut renderer);
    let program = program(&ctx, &renderer, false, true);

    let scene = SceneNode::new();
    let group = SceneNode::new();
    group.add_child(&node_at(
        Mesh::new(geometry, program),
        Vec3::new(0.0, 0.0, -5.0),
    ));
    scene.add_child(&group);

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());
    assert_eq!(ctx.count("draw_arrays"), 1);

    group.set_visible(false);
    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());
    assert_eq!(ctx.count("draw_arrays"), 1);
}

#[test]
fn unchanged_uniform_values_are_set_once_across_frames() {
    let ctx = RecordingContext::new();
    let (mut renderer, mut camera) = setup(&ctx);

    let geometry = triangle_geometry(&mut renderer);
    let (_, attributes) = position_only_program();
    ctx.script_program(
        vec![ActiveUniform {
            name: "modelMatrix".to_string(),
            kind: UniformKind::Mat4,
            size: 1,
            location: UniformLocation(0),
        }],
        attributes,
    );
    let program = Rc::new(RefCell::new(Program::new(
        &renderer,
        ProgramOptions::default(),
    )));

    let scene = SceneNode::new();
    scene.add_child(&node_at(
        Mesh::new(geometry, program),
        Vec3::new(0.0, 0.0, -5.0),
    ));

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());
    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());

    // The model matrix never changed, so the second frame's set call is
    // swallowed by the uniform cache. The program bind is cached too.
    assert_eq!(ctx.count("uniform_matrix4fv"), 1);
    assert_eq!(ctx.count("use_program("), 1);
    assert_eq!(ctx.count("draw_arrays"), 2);
}

#[test]
fn forgetting_a_program_evicts_its_cached_uniforms() {
    let ctx = RecordingContext::new();
    let (mut renderer, mut camera) = setup(&ctx);

    let geometry = triangle_geometry(&mut renderer);
    let (_, attributes) = position_only_program();
    ctx.script_program(
        vec![ActiveUniform {
            name: "modelMatrix".to_string(),
            kind: UniformKind::Mat4,
            size: 1,
            location: UniformLocation(0),
        }],
        attributes,
    );
    let program = Rc::new(RefCell::new(Program::new(
        &renderer,
        ProgramOptions::default(),
    )));

    let scene = SceneNode::new();
    scene.add_child(&node_at(
        Mesh::new(geometry, program.clone()),
        Vec3::new(0.0, 0.0, -5.0),
    ));

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());
    assert_eq!(ctx.count("uniform_matrix4fv"), 1);

    // The device may recycle a deleted program's handle, so eviction has
    // to force the next frame to upload its uniforms again.
    let handle = program.borrow().handle().unwrap();
    renderer.forget_program(handle);

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());
    assert_eq!(ctx.count("uniform_matrix4fv"), 2);
}

#[test]
fn removing_a_program_deletes_it_and_unlinks_it() {
    let ctx = RecordingContext::new();
    let (mut renderer, _camera) = setup(&ctx);

    let (_, attributes) = position_only_program();
    ctx.script_program(vec![], attributes);
    let mut program = Program::new(&renderer, ProgramOptions::default());
    assert!(program.linked());

    program.remove(&mut renderer);
    assert!(!program.linked());
    assert_eq!(ctx.count("delete_program"), 1);

    // A second remove is a no-op.
    program.remove(&mut renderer);
    assert_eq!(ctx.count("delete_program"), 1);
}

#[test]
fn auto_clear_clears_color_and_depth_with_depth_writes_on() {
    let ctx = RecordingContext::new();
    let (mut renderer, mut camera) = setup(&ctx);
    let scene = SceneNode::new();

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());
    assert_eq!(ctx.count("clear(ClearMask(COLOR | DEPTH))"), 1);
    assert_eq!(ctx.count("enable(DepthTest)"), 1);
    // Depth writes are on in the state mirror's initial value, so no
    // depth_mask call needs to reach the device.
    assert_eq!(ctx.count("depth_mask"), 0);

    renderer.render(
        &scene,
        Some(&mut camera),
        None,
        RenderOptions {
            clear: Some(false),
            ..RenderOptions::default()
        },
    );
    assert_eq!(ctx.count("clear("), 1);
}
