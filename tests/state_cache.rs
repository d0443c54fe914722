mod common;

use common::RecordingContext;
use slimgl::context::{BlendEquation, BlendFactor, Capability, Context};
use slimgl::renderer::{Renderer, RendererOptions};

fn renderer(ctx: &std::rc::Rc<RecordingContext>) -> Renderer {
    let context: Context = ctx.clone();
    Renderer::new(context, RendererOptions::default())
}

#[test]
fn repeated_enable_reaches_the_device_once() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    renderer.enable(Capability::DepthTest);
    renderer.enable(Capability::DepthTest);
    renderer.enable(Capability::DepthTest);

    assert_eq!(ctx.count("enable(DepthTest)"), 1);
}

#[test]
fn toggling_a_capability_reaches_the_device_each_flip() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    renderer.enable(Capability::Blend);
    renderer.disable(Capability::Blend);
    renderer.disable(Capability::Blend);
    renderer.enable(Capability::Blend);

    assert_eq!(ctx.count("enable(Blend)"), 2);
    assert_eq!(ctx.count("disable(Blend)"), 1);
}

#[test]
fn unchanged_blend_func_is_elided() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    renderer.set_blend_func(
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        None,
        None,
    );
    renderer.set_blend_func(
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        None,
        None,
    );
    assert_eq!(ctx.count("blend_func"), 1);

    renderer.set_blend_func(BlendFactor::One, BlendFactor::OneMinusSrcAlpha, None, None);
    assert_eq!(ctx.count("blend_func"), 2);
}

#[test]
fn separate_alpha_factors_use_the_separate_call() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    renderer.set_blend_func(
        BlendFactor::One,
        BlendFactor::OneMinusSrcAlpha,
        Some(BlendFactor::One),
        Some(BlendFactor::Zero),
    );

    assert_eq!(ctx.count("blend_func_separate"), 1);
    assert_eq!(ctx.count("blend_func("), 0);
}

#[test]
fn unchanged_blend_equation_is_elided() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    // Add with no separate alpha is the cache's initial state already.
    renderer.set_blend_equation(BlendEquation::Add, None);
    assert_eq!(ctx.count("blend_equation"), 0);

    renderer.set_blend_equation(BlendEquation::Subtract, None);
    renderer.set_blend_equation(BlendEquation::Subtract, None);
    assert_eq!(ctx.count("blend_equation"), 1);
}

#[test]
fn unchanged_viewport_is_elided() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer(&ctx);

    renderer.set_viewport(0, 0, 800, 600);
    renderer.set_viewport(0, 0, 800, 600);
    renderer.set_viewport(0, 0, 640, 480);

    assert_eq!(ctx.count("viewport"), 2);
}

#[test]
fn dimensions_scale_by_the_device_pixel_ratio() {
    let ctx = RecordingContext::new();
    let context: Context = ctx.clone();
    let _renderer = Renderer::new(
        context,
        RendererOptions {
            width: 400,
            height: 300,
            dpr: 2.0,
            ..RendererOptions::default()
        },
    );

    assert_eq!(ctx.count("set_surface_size(800, 600)"), 1);
}
