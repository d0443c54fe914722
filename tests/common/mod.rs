//! A recording fake device shared by the integration tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use slimgl::context::{
    ActiveAttribute, ActiveUniform, Attachment, BlendEquation, BlendFactor, BufferId, BufferTarget,
    Capability, ClearMask, Context, ContextCapabilities, CullFaceMode, DataType, DepthFunc,
    DrawMode, FramebufferId, InternalFormat, LinkedProgram, ProgramError, ProgramId,
    RenderbufferFormat, RenderbufferId, RenderingContext, TexelType, TextureFilter, TextureFormat,
    TextureId, TextureWrap, UniformLocation, VaoId, Winding,
};

/// Records every device call as a formatted line, hands out sequential
/// handles, and replies to `compile_program` from a queue of scripted
/// introspection results.
pub struct RecordingContext {
    pub calls: RefCell<Vec<String>>,
    next_handle: Cell<u64>,
    capabilities: Cell<ContextCapabilities>,
    scripted_programs: RefCell<Vec<(Vec<ActiveUniform>, Vec<ActiveAttribute>)>>,
}

impl RecordingContext {
    pub fn new() -> Rc<RecordingContext> {
        Rc::new(RecordingContext {
            calls: RefCell::new(Vec::new()),
            next_handle: Cell::new(1),
            capabilities: Cell::new(ContextCapabilities::default()),
            scripted_programs: RefCell::new(Vec::new()),
        })
    }

    pub fn with_capabilities(capabilities: ContextCapabilities) -> Rc<RecordingContext> {
        let ctx = RecordingContext::new();
        ctx.capabilities.set(capabilities);
        ctx
    }

    /// Queues the introspection result the next `compile_program`
    /// returns. Results are consumed in FIFO order.
    pub fn script_program(
        &self,
        uniforms: Vec<ActiveUniform>,
        attributes: Vec<ActiveAttribute>,
    ) {
        self.scripted_programs.borrow_mut().push((uniforms, attributes));
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Index of the first recorded call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls
            .borrow()
            .iter()
            .position(|call| call.starts_with(prefix))
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn handle(&self) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }
}

/// A `RecordingContext` already coerced to the crate's context handle.
pub fn recording_context() -> (Rc<RecordingContext>, Context) {
    let recording = RecordingContext::new();
    let ctx: Context = recording.clone();
    (recording, ctx)
}

impl RenderingContext for RecordingContext {
    fn set_surface_size(&self, width: u32, height: u32) {
        self.record(format!("set_surface_size({}, {})", width, height));
    }

    fn capabilities(&self) -> ContextCapabilities {
        self.capabilities.get()
    }

    fn create_buffer(&self) -> BufferId {
        let buffer = BufferId(self.handle());
        self.record(format!("create_buffer -> {:?}", buffer));
        buffer
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>) {
        self.record(format!("bind_buffer({:?}, {:?})", target, buffer));
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        self.record(format!("buffer_data({:?}, {} bytes)", target, data.len()));
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.record(format!("delete_buffer({:?})", buffer));
    }

    fn create_vertex_array(&self) -> VaoId {
        let vao = VaoId(self.handle());
        self.record(format!("create_vertex_array -> {:?}", vao));
        vao
    }

    fn bind_vertex_array(&self, vao: Option<VaoId>) {
        self.record(format!("bind_vertex_array({:?})", vao));
    }

    fn delete_vertex_array(&self, vao: VaoId) {
        self.record(format!("delete_vertex_array({:?})", vao));
    }

    fn vertex_attrib_pointer(
        &self,
        location: u32,
        size: u32,
        kind: DataType,
        normalized: bool,
        stride: usize,
        offset: usize,
    ) {
        self.record(format!(
            "vertex_attrib_pointer({}, {}, {:?}, {}, {}, {})",
            location, size, kind, normalized, stride, offset
        ));
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        self.record(format!("enable_vertex_attrib_array({})", location));
    }

    fn vertex_attrib_divisor(&self, location: u32, divisor: u32) {
        self.record(format!("vertex_attrib_divisor({}, {})", location, divisor));
    }

    fn draw_arrays(&self, mode: DrawMode, first: usize, count: usize) {
        self.record(format!("draw_arrays({:?}, {}, {})", mode, first, count));
    }

    fn draw_elements(&self, mode: DrawMode, count: usize, kind: DataType, offset: usize) {
        self.record(format!(
            "draw_elements({:?}, {}, {:?}, {})",
            mode, count, kind, offset
        ));
    }

    fn draw_arrays_instanced(&self, mode: DrawMode, first: usize, count: usize, instances: usize) {
        self.record(format!(
            "draw_arrays_instanced({:?}, {}, {}, {})",
            mode, first, count, instances
        ));
    }

    fn draw_elements_instanced(
        &self,
        mode: DrawMode,
        count: usize,
        kind: DataType,
        offset: usize,
        instances: usize,
    ) {
        self.record(format!(
            "draw_elements_instanced({:?}, {}, {:?}, {}, {})",
            mode, count, kind, offset, instances
        ));
    }

    fn compile_program(
        &self,
        _vertex: &str,
        _fragment: &str,
    ) -> Result<LinkedProgram, ProgramError> {
        let handle = ProgramId(self.handle());
        self.record(format!("compile_program -> {:?}", handle));
        let (uniforms, attributes) = if self.scripted_programs.borrow().is_empty() {
            (Vec::new(), Vec::new())
        } else {
            self.scripted_programs.borrow_mut().remove(0)
        };
        Ok(LinkedProgram {
            handle,
            uniforms,
            attributes,
        })
    }

    fn use_program(&self, program: ProgramId) {
        self.record(format!("use_program({:?})", program));
    }

    fn delete_program(&self, program: ProgramId) {
        self.record(format!("delete_program({:?})", program));
    }

    fn uniform1f(&self, location: UniformLocation, v: f32) {
        self.record(format!("uniform1f({:?}, {})", location, v));
    }

    fn uniform1fv(&self, location: UniformLocation, v: &[f32]) {
        self.record(format!("uniform1fv({:?}, len {})", location, v.len()));
    }

    fn uniform2fv(&self, location: UniformLocation, v: &[f32]) {
        self.record(format!("uniform2fv({:?}, {:?})", location, v));
    }

    fn uniform3fv(&self, location: UniformLocation, v: &[f32]) {
        self.record(format!("uniform3fv({:?}, {:?})", location, v));
    }

    fn uniform4fv(&self, location: UniformLocation, v: &[f32]) {
        self.record(format!("uniform4fv({:?}, {:?})", location, v));
    }

    fn uniform1i(&self, location: UniformLocation, v: i32) {
        self.record(format!("uniform1i({:?}, {})", location, v));
    }

    fn uniform1iv(&self, location: UniformLocation, v: &[i32]) {
        self.record(format!("uniform1iv({:?}, {:?})", location, v));
    }

    fn uniform2iv(&self, location: UniformLocation, v: &[i32]) {
        self.record(format!("uniform2iv({:?}, {:?})", location, v));
    }

    fn uniform3iv(&self, location: UniformLocation, v: &[i32]) {
        self.record(format!("uniform3iv({:?}, {:?})", location, v));
    }

    fn uniform4iv(&self, location: UniformLocation, v: &[i32]) {
        self.record(format!("uniform4iv({:?}, {:?})", location, v));
    }

    fn uniform_matrix2fv(&self, location: UniformLocation, _v: &[f32]) {
        self.record(format!("uniform_matrix2fv({:?})", location));
    }

    fn uniform_matrix3fv(&self, location: UniformLocation, _v: &[f32]) {
        self.record(format!("uniform_matrix3fv({:?})", location));
    }

    fn uniform_matrix4fv(&self, location: UniformLocation, _v: &[f32]) {
        self.record(format!("uniform_matrix4fv({:?})", location));
    }

    fn enable(&self, capability: Capability) {
        self.record(format!("enable({:?})", capability));
    }

    fn disable(&self, capability: Capability) {
        self.record(format!("disable({:?})", capability));
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.record(format!("blend_func({:?}, {:?})", src, dst));
    }

    fn blend_func_separate(
        &self,
        src: BlendFactor,
        dst: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.record(format!(
            "blend_func_separate({:?}, {:?}, {:?}, {:?})",
            src, dst, src_alpha, dst_alpha
        ));
    }

    fn blend_equation(&self, mode: BlendEquation) {
        self.record(format!("blend_equation({:?})", mode));
    }

    fn blend_equation_separate(&self, mode_rgb: BlendEquation, mode_alpha: BlendEquation) {
        self.record(format!(
            "blend_equation_separate({:?}, {:?})",
            mode_rgb, mode_alpha
        ));
    }

    fn cull_face(&self, mode: CullFaceMode) {
        self.record(format!("cull_face({:?})", mode));
    }

    fn front_face(&self, winding: Winding) {
        self.record(format!("front_face({:?})", winding));
    }

    fn depth_mask(&self, enabled: bool) {
        self.record(format!("depth_mask({})", enabled));
    }

    fn depth_func(&self, func: DepthFunc) {
        self.record(format!("depth_func({:?})", func));
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.record(format!("viewport({}, {}, {}, {})", x, y, width, height));
    }

    fn clear(&self, mask: ClearMask) {
        self.record(format!("clear({:?})", mask));
    }

    fn active_texture(&self, unit: u32) {
        self.record(format!("active_texture({})", unit));
    }

    fn create_texture(&self) -> TextureId {
        let texture = TextureId(self.handle());
        self.record(format!("create_texture -> {:?}", texture));
        texture
    }

    fn bind_texture(&self, texture: Option<TextureId>) {
        self.record(format!("bind_texture({:?})", texture));
    }

    fn tex_image_2d(
        &self,
        width: u32,
        height: u32,
        internal_format: InternalFormat,
        format: TextureFormat,
        texel_type: TexelType,
        data: Option<&[u8]>,
    ) {
        self.record(format!(
            "tex_image_2d({}, {}, {:?}, {:?}, {:?}, {})",
            width,
            height,
            internal_format,
            format,
            texel_type,
            match data {
                Some(data) => format!("{} bytes", data.len()),
                None => "no data".to_string(),
            }
        ));
    }

    fn tex_filter(&self, min: TextureFilter, mag: TextureFilter) {
        self.record(format!("tex_filter({:?}, {:?})", min, mag));
    }

    fn tex_wrap(&self, wrap_s: TextureWrap, wrap_t: TextureWrap) {
        self.record(format!("tex_wrap({:?}, {:?})", wrap_s, wrap_t));
    }

    fn generate_mipmap(&self) {
        self.record("generate_mipmap".to_string());
    }

    fn pixel_store_flip_y(&self, flip: bool) {
        self.record(format!("pixel_store_flip_y({})", flip));
    }

    fn pixel_store_premultiply_alpha(&self, premultiply: bool) {
        self.record(format!("pixel_store_premultiply_alpha({})", premultiply));
    }

    fn pixel_store_unpack_alignment(&self, alignment: u32) {
        self.record(format!("pixel_store_unpack_alignment({})", alignment));
    }

    fn delete_texture(&self, texture: TextureId) {
        self.record(format!("delete_texture({:?})", texture));
    }

    fn create_framebuffer(&self) -> FramebufferId {
        let framebuffer = FramebufferId(self.handle());
        self.record(format!("create_framebuffer -> {:?}", framebuffer));
        framebuffer
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        self.record(format!("bind_framebuffer({:?})", framebuffer));
    }

    fn framebuffer_texture_2d(&self, attachment: Attachment, texture: TextureId) {
        self.record(format!(
            "framebuffer_texture_2d({:?}, {:?})",
            attachment, texture
        ));
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        self.record(format!("delete_framebuffer({:?})", framebuffer));
    }

    fn create_renderbuffer(&self) -> RenderbufferId {
        let renderbuffer = RenderbufferId(self.handle());
        self.record(format!("create_renderbuffer -> {:?}", renderbuffer));
        renderbuffer
    }

    fn bind_renderbuffer(&self, renderbuffer: Option<RenderbufferId>) {
        self.record(format!("bind_renderbuffer({:?})", renderbuffer));
    }

    fn renderbuffer_storage(&self, format: RenderbufferFormat, width: u32, height: u32) {
        self.record(format!(
            "renderbuffer_storage({:?}, {}, {})",
            format, width, height
        ));
    }

    fn framebuffer_renderbuffer(&self, attachment: Attachment, renderbuffer: RenderbufferId) {
        self.record(format!(
            "framebuffer_renderbuffer({:?}, {:?})",
            attachment, renderbuffer
        ));
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId) {
        self.record(format!("delete_renderbuffer({:?})", renderbuffer));
    }

    fn draw_buffers(&self, attachments: &[Attachment]) {
        self.record(format!("draw_buffers({:?})", attachments));
    }
}

/// A triangle-shaped position stream sized to fit inside a unit sphere.
pub fn triangle_positions() -> Vec<f32> {
    vec![-0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.0, 0.5, 0.0]
}

/// Introspection data for a program with one vec3 `position` attribute
/// and no uniforms.
pub fn position_only_program() -> (Vec<ActiveUniform>, Vec<ActiveAttribute>) {
    (
        Vec::new(),
        vec![ActiveAttribute {
            name: "position".to_string(),
            kind: slimgl::context::AttributeKind::FloatVec3,
            location: 0,
        }],
    )
}
