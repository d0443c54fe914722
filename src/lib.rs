/*!
# slimgl

A small GL-flavoured rendering layer: scene graph, cameras, programs,
geometries, and a renderer that never issues the same device call twice.

The crate does not talk to a graphics API itself. It drives anything
implementing [`context::RenderingContext`]: a WebGL2 wrapper, a desktop
GL binding, or a recording fake in tests. Everything above that trait is
plain Rust with [glam](https://docs.rs/glam/) math.

## Features

* a renderer front-end that mirrors device state and drops redundant
  calls (capability toggles, blend state, program and texture binds,
  uniform values).
* a scene graph with lazy, dirty-flagged world-matrix propagation.
* perspective and orthographic cameras with frustum culling, plus an
  eased orbiting [`DollyCamera`](camera::DollyCamera).
* draw-list sorting into opaque, transparent and ui passes.
* geometries with per-program VAO caching and instancing, plus
  ready-made [`shapes`] (full-screen triangle, plane, cuboid, point
  cloud).
* shader programs with uniform introspection, struct/array uniform
  resolution and automatic texture-unit assignment.
* render targets and a ping-pong [`Framebuffer`](post_processing::Framebuffer)
  for feedback effects.

A frame looks like this:

```no_run
use slimgl::prelude::*;

fn frame(ctx: Context) {
    let mut renderer = Renderer::new(ctx, RendererOptions::default());
    let mut camera = Camera::new(CameraOptions::default());
    camera.node.set_position(Vec3::new(0.0, 0.0, 5.0));

    let geometry = Geometry::new(
        &mut renderer,
        vec![(
            "position".to_string(),
            GeometryAttribute::new(3, AttributeData::F32(vec![
                -0.5, -0.5, 0.0,
                0.5, -0.5, 0.0,
                0.0, 0.5, 0.0,
            ])),
        )],
    );
    let program = Program::new(
        &mut renderer,
        ProgramOptions {
            vertex: VERTEX_SRC.to_string(),
            fragment: FRAGMENT_SRC.to_string(),
            ..ProgramOptions::default()
        },
    );

    let scene = SceneNode::new();
    let mesh = Mesh::new(
        Rc::new(RefCell::new(geometry)),
        Rc::new(RefCell::new(program)),
    );
    scene.add_child(&SceneNode::with_drawable(mesh));

    renderer.render(&scene, Some(&mut camera), None, RenderOptions::default());
}
# const VERTEX_SRC: &str = "";
# const FRAGMENT_SRC: &str = "";
```

The whole crate is single-threaded by design: resources hold
`Rc<RefCell<...>>` handles and a frame is one linear pass over them.
*/

#![allow(clippy::module_inception)]

#[macro_use]
extern crate bitflags;

pub use glam;

pub mod camera;
pub mod context;
pub mod event;
pub mod post_processing;
pub mod renderer;
pub mod resource;
pub mod scene;
pub mod shapes;

/// One-stop import for the commonly used types.
pub mod prelude {
    pub use std::cell::RefCell;
    pub use std::rc::Rc;

    pub use crate::camera::{Camera, CameraOptions, DollyCamera, DollyCameraOptions, ZoomStyle};
    pub use crate::context::{
        ClearMask, Context, ContextCapabilities, DrawMode, RenderingContext,
    };
    pub use crate::event::{CameraEvent, PointerButton};
    pub use crate::post_processing::{Framebuffer, FramebufferOptions, TexDepth, Tiling};
    pub use crate::renderer::{RenderOptions, Renderer, RendererOptions};
    pub use crate::resource::{
        AttributeData, Geometry, GeometryAttribute, Program, ProgramOptions, RenderTarget,
        RenderTargetOptions, Texture, TextureOptions, UniformValue,
    };
    pub use crate::scene::{Mesh, SceneNode};
    pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
}
