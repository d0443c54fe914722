//! The renderer: state cache, draw-list assembly, and frame submission.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::camera::Camera;
use crate::context::{
    BlendEquation, BlendFactor, BufferId, Capability, ClearMask, Context, ContextCapabilities,
    CullFaceMode, DepthFunc, FramebufferId, ProgramId, TextureId, UniformLocation, VaoId, Winding,
};
use crate::resource::uniform::UniformData;
use crate::resource::RenderTarget;
use crate::scene::SceneNode;

/// Construction parameters for a [`Renderer`].
#[derive(Clone, Copy, Debug)]
pub struct RendererOptions {
    /// Surface size in logical pixels.
    pub width: u32,
    pub height: u32,
    /// Device pixel ratio. Physical surface size is logical size
    /// scaled by this.
    pub dpr: f32,
    /// Which buffers [`Renderer::render`] clears when clearing is on.
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
    /// Whether the surface expects premultiplied alpha. Picks the
    /// default blend function of transparent programs.
    pub premultiplied_alpha: bool,
    /// Clear at the start of every `render` unless overridden per call.
    pub auto_clear: bool,
}

impl Default for RendererOptions {
    fn default() -> RendererOptions {
        RendererOptions {
            width: 300,
            height: 150,
            dpr: 1.0,
            color: true,
            depth: true,
            stencil: false,
            premultiplied_alpha: false,
            auto_clear: true,
        }
    }
}

/// Per-call overrides for [`Renderer::render`].
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Recompute scene world matrices before drawing.
    pub update: bool,
    /// Sort the draw list into opaque/transparent/ui passes.
    pub sort: bool,
    /// Cull meshes whose bounding sphere is outside the camera frustum.
    pub frustum_cull: bool,
    /// Clear before drawing; `None` falls back to the renderer's
    /// `auto_clear`.
    pub clear: Option<bool>,
}

impl Default for RenderOptions {
    fn default() -> RenderOptions {
        RenderOptions {
            update: true,
            sort: true,
            frustum_cull: true,
            clear: None,
        }
    }
}

// The mirror of every piece of device state the renderer routes, used
// to drop redundant calls before they reach the context.
struct RenderState {
    capabilities: HashMap<Capability, bool>,
    blend_func: (BlendFactor, BlendFactor, Option<BlendFactor>, Option<BlendFactor>),
    blend_equation: (BlendEquation, Option<BlendEquation>),
    cull_face: Option<CullFaceMode>,
    front_face: Winding,
    depth_mask: bool,
    depth_func: DepthFunc,
    flip_y: bool,
    premultiply_alpha: bool,
    unpack_alignment: u32,
    framebuffer: Option<FramebufferId>,
    viewport: Option<(i32, i32, u32, u32)>,
    texture_units: HashMap<u32, u64>,
    active_texture_unit: u32,
    bound_buffer: Option<BufferId>,
    current_program: Option<u64>,
    current_geometry: Option<(u64, String)>,
    uniforms: HashMap<(ProgramId, UniformLocation), UniformData>,
}

impl RenderState {
    fn new() -> RenderState {
        RenderState {
            capabilities: HashMap::new(),
            blend_func: (BlendFactor::One, BlendFactor::Zero, None, None),
            blend_equation: (BlendEquation::Add, None),
            cull_face: None,
            front_face: Winding::Ccw,
            depth_mask: true,
            depth_func: DepthFunc::Less,
            flip_y: false,
            premultiply_alpha: false,
            unpack_alignment: 4,
            framebuffer: None,
            viewport: None,
            texture_units: HashMap::new(),
            active_texture_unit: 0,
            bound_buffer: None,
            current_program: None,
            current_geometry: None,
            uniforms: HashMap::new(),
        }
    }
}

// One mesh-bearing node with the sort keys snapshotted, so comparisons
// don't re-borrow node internals.
struct RenderItem {
    node: SceneNode,
    mesh_id: u64,
    render_order: i32,
    program_id: u64,
    transparent: bool,
    depth_test: bool,
    z_depth: f32,
}

/// The frame driver.
///
/// Owns the mirror of all routed device state; programs, geometries and
/// textures push their state through it so repeated values never reach
/// the context. One renderer per context: a second renderer on the same
/// context would desynchronize the mirror.
pub struct Renderer {
    ctx: Context,
    width: u32,
    height: u32,
    /// Device pixel ratio applied to surface and viewport sizes.
    pub dpr: f32,
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
    pub auto_clear: bool,
    premultiplied_alpha: bool,
    capabilities: ContextCapabilities,
    state: RenderState,
}

impl Renderer {
    pub fn new(ctx: Context, options: RendererOptions) -> Renderer {
        let capabilities = ctx.capabilities();
        let mut renderer = Renderer {
            ctx,
            width: 0,
            height: 0,
            dpr: options.dpr,
            color: options.color,
            depth: options.depth,
            stencil: options.stencil,
            auto_clear: options.auto_clear,
            premultiplied_alpha: options.premultiplied_alpha,
            capabilities,
            state: RenderState::new(),
        };
        renderer.set_dimensions(options.width, options.height);
        renderer
    }

    /// Resizes the backing surface. Sizes are logical pixels; the
    /// physical surface is scaled by `dpr`.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.ctx.set_surface_size(
            (width as f32 * self.dpr) as u32,
            (height as f32 * self.dpr) as u32,
        );
    }

    /// The surface size in logical pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn capabilities(&self) -> ContextCapabilities {
        self.capabilities
    }

    pub fn premultiplied_alpha(&self) -> bool {
        self.premultiplied_alpha
    }

    // ==================
    // Cached state routing
    // ==================

    pub fn enable(&mut self, capability: Capability) {
        if self.state.capabilities.get(&capability) == Some(&true) {
            return;
        }
        self.ctx.enable(capability);
        self.state.capabilities.insert(capability, true);
    }

    pub fn disable(&mut self, capability: Capability) {
        if self.state.capabilities.get(&capability) == Some(&false) {
            return;
        }
        self.ctx.disable(capability);
        self.state.capabilities.insert(capability, false);
    }

    pub fn set_blend_func(
        &mut self,
        src: BlendFactor,
        dst: BlendFactor,
        src_alpha: Option<BlendFactor>,
        dst_alpha: Option<BlendFactor>,
    ) {
        if self.state.blend_func == (src, dst, src_alpha, dst_alpha) {
            return;
        }
        self.state.blend_func = (src, dst, src_alpha, dst_alpha);
        match (src_alpha, dst_alpha) {
            (Some(src_alpha), Some(dst_alpha)) => {
                self.ctx.blend_func_separate(src, dst, src_alpha, dst_alpha)
            }
            _ => self.ctx.blend_func(src, dst),
        }
    }

    pub fn set_blend_equation(&mut self, mode_rgb: BlendEquation, mode_alpha: Option<BlendEquation>) {
        if self.state.blend_equation == (mode_rgb, mode_alpha) {
            return;
        }
        self.state.blend_equation = (mode_rgb, mode_alpha);
        match mode_alpha {
            Some(mode_alpha) => self.ctx.blend_equation_separate(mode_rgb, mode_alpha),
            None => self.ctx.blend_equation(mode_rgb),
        }
    }

    pub fn set_cull_face(&mut self, mode: CullFaceMode) {
        if self.state.cull_face == Some(mode) {
            return;
        }
        self.state.cull_face = Some(mode);
        self.ctx.cull_face(mode);
    }

    pub fn set_front_face(&mut self, winding: Winding) {
        if self.state.front_face == winding {
            return;
        }
        self.state.front_face = winding;
        self.ctx.front_face(winding);
    }

    pub fn set_depth_mask(&mut self, enabled: bool) {
        if self.state.depth_mask == enabled {
            return;
        }
        self.state.depth_mask = enabled;
        self.ctx.depth_mask(enabled);
    }

    pub fn set_depth_func(&mut self, func: DepthFunc) {
        if self.state.depth_func == func {
            return;
        }
        self.state.depth_func = func;
        self.ctx.depth_func(func);
    }

    pub fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        if self.state.viewport == Some((x, y, width, height)) {
            return;
        }
        self.state.viewport = Some((x, y, width, height));
        self.ctx.viewport(x, y, width, height);
    }

    /// Binds `framebuffer`, or the default surface for `None`.
    pub fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        if self.state.framebuffer == framebuffer {
            return;
        }
        self.state.framebuffer = framebuffer;
        self.ctx.bind_framebuffer(framebuffer);
    }

    pub fn set_active_texture(&mut self, unit: u32) {
        if self.state.active_texture_unit == unit {
            return;
        }
        self.state.active_texture_unit = unit;
        self.ctx.active_texture(unit);
    }

    /// The texture id bound to `unit`, as far as the mirror knows.
    pub fn texture_at_unit(&self, unit: u32) -> Option<u64> {
        self.state.texture_units.get(&unit).copied()
    }

    // Binds to the active unit and records it under that unit.
    pub(crate) fn bind_texture(&mut self, id: u64, handle: TextureId) {
        self.state
            .texture_units
            .insert(self.state.active_texture_unit, id);
        self.ctx.bind_texture(Some(handle));
    }

    pub(crate) fn set_pixel_store_flip_y(&mut self, flip: bool) {
        if self.state.flip_y == flip {
            return;
        }
        self.state.flip_y = flip;
        self.ctx.pixel_store_flip_y(flip);
    }

    pub(crate) fn set_pixel_store_premultiply_alpha(&mut self, premultiply: bool) {
        if self.state.premultiply_alpha == premultiply {
            return;
        }
        self.state.premultiply_alpha = premultiply;
        self.ctx.pixel_store_premultiply_alpha(premultiply);
    }

    pub(crate) fn set_pixel_store_unpack_alignment(&mut self, alignment: u32) {
        if self.state.unpack_alignment == alignment {
            return;
        }
        self.state.unpack_alignment = alignment;
        self.ctx.pixel_store_unpack_alignment(alignment);
    }

    /// No-op when the context has no VAO support; geometries then
    /// re-bind their attributes on every draw instead.
    pub(crate) fn bind_vertex_array(&mut self, vao: Option<VaoId>) {
        if !self.capabilities.vertex_array_objects {
            return;
        }
        self.ctx.bind_vertex_array(vao);
    }

    pub(crate) fn is_current_geometry(&self, id: u64, attribute_order: &str) -> bool {
        match &self.state.current_geometry {
            Some((current_id, order)) => *current_id == id && order == attribute_order,
            None => false,
        }
    }

    pub(crate) fn set_current_geometry(&mut self, id: u64, attribute_order: &str) {
        self.state.current_geometry = Some((id, attribute_order.to_string()));
    }

    pub(crate) fn clear_current_geometry(&mut self) {
        self.state.current_geometry = None;
    }

    pub(crate) fn bound_buffer(&self) -> Option<BufferId> {
        self.state.bound_buffer
    }

    pub(crate) fn set_bound_buffer(&mut self, buffer: BufferId) {
        self.state.bound_buffer = Some(buffer);
    }

    pub(crate) fn current_program(&self) -> Option<u64> {
        self.state.current_program
    }

    pub(crate) fn set_current_program(&mut self, id: u64) {
        self.state.current_program = Some(id);
    }

    // Records a uniform value about to be set. Returns false when the
    // cached value already matches, meaning the set call can be skipped.
    pub(crate) fn update_uniform_cache(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        data: &UniformData,
    ) -> bool {
        match self.state.uniforms.get(&(program, location)) {
            Some(existing) if existing == data => false,
            _ => {
                self.state.uniforms.insert((program, location), data.clone());
                true
            }
        }
    }

    /// Drops every cached uniform value recorded for `program`.
    ///
    /// Must run before the device program is deleted: the device may hand
    /// the same handle to a later program, and stale cache entries would
    /// then suppress real uniform uploads.
    pub fn forget_program(&mut self, program: ProgramId) {
        self.state.uniforms.retain(|&(p, _), _| p != program);
    }

    /// Drops the texture `id` from the per-unit binding mirror.
    pub fn forget_texture(&mut self, id: u64) {
        self.state.texture_units.retain(|_, bound| *bound != id);
    }

    // Deleting a bound framebuffer rebinds the default surface.
    pub(crate) fn forget_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.state.framebuffer == Some(framebuffer) {
            self.state.framebuffer = None;
        }
    }

    // ==================
    // Draw-list assembly
    // ==================

    /// Collects the visible mesh-bearing nodes under `scene`, culled
    /// against the camera frustum and sorted into the three passes:
    /// opaque, then transparent, then depth-ignoring ui.
    pub fn get_render_list(
        &mut self,
        scene: &SceneNode,
        mut camera: Option<&mut Camera>,
        frustum_cull: bool,
        sort: bool,
    ) -> Vec<SceneNode> {
        if frustum_cull {
            if let Some(camera) = camera.as_mut() {
                camera.update_frustum();
            }
        }
        let camera = camera.as_deref();

        let mut nodes = Vec::new();
        scene.traverse(&mut |node| {
            if !node.data().visible {
                return true;
            }
            let culled = {
                let data = node.data();
                match &data.drawable {
                    None => return false,
                    Some(mesh) => {
                        frustum_cull
                            && mesh.frustum_culled
                            && camera.map_or(false, |camera| {
                                !camera.frustum_intersects_mesh(mesh, data.world_matrix)
                            })
                    }
                }
            };
            if !culled {
                nodes.push(node.clone());
            }
            false
        });

        if !sort {
            return nodes;
        }

        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        let mut ui = Vec::new();

        for node in nodes {
            let item = {
                let data = node.data();
                let mesh = match &data.drawable {
                    Some(mesh) => mesh,
                    None => continue,
                };
                let program = mesh.program.borrow();
                let z_depth = match camera {
                    // Only sort by depth where depth actually decides
                    // visibility and no explicit order was given.
                    Some(camera) if mesh.render_order == 0 && program.depth_test => camera
                        .projection_view_matrix
                        .project_point3(data.world_matrix.w_axis.truncate())
                        .z,
                    _ => 0.0,
                };
                RenderItem {
                    node: node.clone(),
                    mesh_id: mesh.id,
                    render_order: mesh.render_order,
                    program_id: program.id,
                    transparent: program.transparent,
                    depth_test: program.depth_test,
                    z_depth,
                }
            };
            if let Some(mesh) = node.data_mut().drawable.as_mut() {
                mesh.z_depth = item.z_depth;
            }

            if !item.transparent {
                opaque.push(item);
            } else if item.depth_test {
                transparent.push(item);
            } else {
                ui.push(item);
            }
        }

        opaque.sort_by(sort_opaque);
        transparent.sort_by(sort_transparent);
        ui.sort_by(sort_ui);

        opaque
            .into_iter()
            .chain(transparent)
            .chain(ui)
            .map(|item| item.node)
            .collect()
    }

    // ==================
    // Frame submission
    // ==================

    /// Draws `scene`, either to the surface or into `target`.
    ///
    /// The frame sequence is: bind the output and its viewport, clear
    /// if requested, refresh scene and camera matrices, assemble the
    /// draw list, draw. Passing the camera is optional; without one no
    /// culling, depth sorting, or view uniforms apply.
    pub fn render(
        &mut self,
        scene: &SceneNode,
        mut camera: Option<&mut Camera>,
        target: Option<&RenderTarget>,
        options: RenderOptions,
    ) {
        match target {
            None => {
                self.bind_framebuffer(None);
                let width = (self.width as f32 * self.dpr) as u32;
                let height = (self.height as f32 * self.dpr) as u32;
                self.set_viewport(0, 0, width, height);
            }
            Some(target) => {
                self.bind_framebuffer(target.framebuffer());
                self.set_viewport(0, 0, target.width, target.height);
            }
        }

        if options.clear.unwrap_or(self.auto_clear) {
            // Ensure depth buffer is writable before clearing it
            if self.depth && target.map_or(true, |target| target.depth) {
                self.enable(Capability::DepthTest);
                self.set_depth_mask(true);
            }
            let mut mask = ClearMask::empty();
            if self.color {
                mask |= ClearMask::COLOR;
            }
            if self.depth {
                mask |= ClearMask::DEPTH;
            }
            if self.stencil {
                mask |= ClearMask::STENCIL;
            }
            self.ctx.clear(mask);
        }

        if options.update {
            scene.update_matrix_world();
        }
        if let Some(camera) = camera.as_mut() {
            camera.update_matrix_world();
        }

        let list = self.get_render_list(
            scene,
            camera.as_deref_mut(),
            options.frustum_cull,
            options.sort,
        );

        for node in &list {
            let world_matrix = node.data().world_matrix;
            let data = node.data();
            if let Some(mesh) = &data.drawable {
                mesh.draw(self, world_matrix, camera.as_deref());
            }
        }
    }
}

// Opaque pass: explicit order, then program to minimize rebinds, then
// front to back for early-z.
fn sort_opaque(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(a.program_id.cmp(&b.program_id))
        .then(a.z_depth.total_cmp(&b.z_depth))
        .then(b.mesh_id.cmp(&a.mesh_id))
}

// Transparent pass: explicit order, then back to front so blending
// composes correctly.
fn sort_transparent(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(b.z_depth.total_cmp(&a.z_depth))
        .then(b.mesh_id.cmp(&a.mesh_id))
}

// Ui pass ignores depth entirely; group by program.
fn sort_ui(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(a.program_id.cmp(&b.program_id))
        .then(b.mesh_id.cmp(&a.mesh_id))
}
