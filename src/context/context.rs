//! The device boundary: everything this crate needs from the GPU.
//!
//! The core is a pure command-recording layer. It never talks to a real
//! graphics API directly; instead it drives a [`RenderingContext`]
//! implementation supplied by the host (a WebGL2 wrapper, a glow binding,
//! a recording fake in tests, ...). All state-dependent calls are funneled
//! through the renderer's state cache, so context implementations should
//! be plain, unconditional pass-throughs.

use std::fmt;
use std::rc::Rc;

/// A shared handle to the rendering device.
pub type Context = Rc<dyn RenderingContext>;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub u64);
    };
}

handle!(
    /// A GPU buffer handle.
    BufferId
);
handle!(
    /// A linked GPU program handle.
    ProgramId
);
handle!(
    /// A vertex array object handle.
    VaoId
);
handle!(
    /// A GPU texture handle.
    TextureId
);
handle!(
    /// A framebuffer handle. `None` in binding calls means the default
    /// surface.
    FramebufferId
);
handle!(
    /// A renderbuffer handle.
    RenderbufferId
);

/// The location of an active uniform within a linked program.
///
/// Locations are only meaningful together with the program they were
/// introspected from; the renderer keys its uniform-value cache by the
/// `(ProgramId, UniformLocation)` pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A capability that can be toggled with `enable`/`disable`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    CullFace,
    DepthTest,
    StencilTest,
    ScissorTest,
}

/// A blending factor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

/// A blending equation mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Which faces get culled when culling is enabled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CullFaceMode {
    Front,
    Back,
    FrontAndBack,
}

/// Triangle winding order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Winding {
    Ccw,
    Cw,
}

impl Winding {
    /// The opposite winding. Used when a mirrored world matrix flips faces.
    #[inline]
    pub fn flipped(self) -> Winding {
        match self {
            Winding::Ccw => Winding::Cw,
            Winding::Cw => Winding::Ccw,
        }
    }
}

/// Depth comparison function.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DepthFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Primitive assembly mode for draw calls.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// The element type of a vertex attribute stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataType {
    F32,
    U16,
    U32,
}

impl DataType {
    /// Size of one element in bytes.
    #[inline]
    pub fn byte_size(self) -> usize {
        match self {
            DataType::F32 | DataType::U32 => 4,
            DataType::U16 => 2,
        }
    }
}

/// Buffer binding targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// Texture minification/magnification filters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Texture coordinate wrapping.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Pixel formats for texture uploads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb,
    Rgba,
}

/// The per-channel storage type of a texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TexelType {
    U8,
    F16,
    F32,
}

/// Sized internal formats for texture storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InternalFormat {
    Rgb,
    Rgba,
    Rgba16F,
    Rgba32F,
}

/// Renderbuffer storage formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderbufferFormat {
    DepthComponent16,
    StencilIndex8,
    DepthStencil,
}

/// Framebuffer attachment points.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Attachment {
    Color(u32),
    Depth,
    Stencil,
    DepthStencil,
}

bitflags! {
    /// Which buffers a `clear` call wipes.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ClearMask: u32 {
        const COLOR = 1;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// The introspected type tag of an active uniform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    Bool,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
}

/// The introspected type tag of an active vertex attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AttributeKind {
    /// Matrix attributes occupy one location per column.
    #[inline]
    pub fn num_locations(self) -> u32 {
        match self {
            AttributeKind::Mat2 => 2,
            AttributeKind::Mat3 => 3,
            AttributeKind::Mat4 => 4,
            _ => 1,
        }
    }
}

/// An active uniform reported by program introspection.
///
/// The device drops uniforms that the linker optimized out, so this list
/// is the authoritative set of uniforms a program will ever bind.
#[derive(Clone, Debug)]
pub struct ActiveUniform {
    /// The full name as reported by the device, e.g. `lights[0].position`.
    pub name: String,
    pub kind: UniformKind,
    /// Array length for array uniforms, 1 otherwise.
    pub size: u32,
    pub location: UniformLocation,
}

/// An active attribute reported by program introspection.
#[derive(Clone, Debug)]
pub struct ActiveAttribute {
    pub name: String,
    pub kind: AttributeKind,
    pub location: u32,
}

/// The result of a successful compile+link.
#[derive(Clone, Debug)]
pub struct LinkedProgram {
    pub handle: ProgramId,
    pub uniforms: Vec<ActiveUniform>,
    pub attributes: Vec<ActiveAttribute>,
}

/// A failed compile or link, carrying the device's info log.
#[derive(Clone, Debug)]
pub enum ProgramError {
    /// The vertex shader failed to compile.
    VertexCompile(String),
    /// The fragment shader failed to compile.
    FragmentCompile(String),
    /// Both shaders compiled but the link failed.
    Link(String),
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::VertexCompile(log) => write!(f, "vertex shader: {}", log),
            ProgramError::FragmentCompile(log) => write!(f, "fragment shader: {}", log),
            ProgramError::Link(log) => write!(f, "program link: {}", log),
        }
    }
}

impl std::error::Error for ProgramError {}

/// Device limits and optional features.
///
/// When an optional feature is absent the corresponding operations
/// degrade to no-ops rather than erroring (instanced draws simply don't
/// happen, geometries re-bind attributes instead of using VAOs).
#[derive(Copy, Clone, Debug)]
pub struct ContextCapabilities {
    pub max_texture_units: u32,
    pub instancing: bool,
    pub vertex_array_objects: bool,
    pub draw_buffers: bool,
}

impl Default for ContextCapabilities {
    fn default() -> Self {
        ContextCapabilities {
            max_texture_units: 16,
            instancing: true,
            vertex_array_objects: true,
            draw_buffers: true,
        }
    }
}

/// The GL-style device surface this crate renders through.
///
/// Implementations take `&self`: the single-threaded frame loop (see the
/// crate docs) is the only caller, and implementations are expected to
/// use interior mutability for whatever bookkeeping they need.
///
/// Implementations must not second-guess calls: redundant-call
/// elimination is the renderer's job, and a context that skips or
/// reorders calls on its own will desynchronize the renderer's state
/// cache.
pub trait RenderingContext {
    // ==================
    // Surface
    // ==================

    /// Resizes the backing surface, in physical pixels.
    fn set_surface_size(&self, width: u32, height: u32);

    /// Reports device limits and optional features.
    fn capabilities(&self) -> ContextCapabilities;

    // ==================
    // Buffers
    // ==================

    fn create_buffer(&self) -> BufferId;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>);
    /// Uploads `data` to the buffer currently bound at `target`.
    fn buffer_data(&self, target: BufferTarget, data: &[u8]);
    fn delete_buffer(&self, buffer: BufferId);

    // ==================
    // Vertex array objects
    // ==================

    fn create_vertex_array(&self) -> VaoId;
    fn bind_vertex_array(&self, vao: Option<VaoId>);
    fn delete_vertex_array(&self, vao: VaoId);
    fn vertex_attrib_pointer(
        &self,
        location: u32,
        size: u32,
        kind: DataType,
        normalized: bool,
        stride: usize,
        offset: usize,
    );
    fn enable_vertex_attrib_array(&self, location: u32);
    fn vertex_attrib_divisor(&self, location: u32, divisor: u32);

    // ==================
    // Draws
    // ==================

    fn draw_arrays(&self, mode: DrawMode, first: usize, count: usize);
    fn draw_elements(&self, mode: DrawMode, count: usize, kind: DataType, offset: usize);
    fn draw_arrays_instanced(&self, mode: DrawMode, first: usize, count: usize, instances: usize);
    fn draw_elements_instanced(
        &self,
        mode: DrawMode,
        count: usize,
        kind: DataType,
        offset: usize,
        instances: usize,
    );

    // ==================
    // Programs
    // ==================

    /// Compiles and links a shader pair and introspects its active
    /// uniforms and attributes.
    fn compile_program(&self, vertex: &str, fragment: &str)
        -> Result<LinkedProgram, ProgramError>;
    fn use_program(&self, program: ProgramId);
    fn delete_program(&self, program: ProgramId);

    // ==================
    // Uniform set calls
    // ==================

    fn uniform1f(&self, location: UniformLocation, v: f32);
    fn uniform1fv(&self, location: UniformLocation, v: &[f32]);
    fn uniform2fv(&self, location: UniformLocation, v: &[f32]);
    fn uniform3fv(&self, location: UniformLocation, v: &[f32]);
    fn uniform4fv(&self, location: UniformLocation, v: &[f32]);
    fn uniform1i(&self, location: UniformLocation, v: i32);
    fn uniform1iv(&self, location: UniformLocation, v: &[i32]);
    fn uniform2iv(&self, location: UniformLocation, v: &[i32]);
    fn uniform3iv(&self, location: UniformLocation, v: &[i32]);
    fn uniform4iv(&self, location: UniformLocation, v: &[i32]);
    fn uniform_matrix2fv(&self, location: UniformLocation, v: &[f32]);
    fn uniform_matrix3fv(&self, location: UniformLocation, v: &[f32]);
    fn uniform_matrix4fv(&self, location: UniformLocation, v: &[f32]);

    // ==================
    // Global state
    // ==================

    fn enable(&self, capability: Capability);
    fn disable(&self, capability: Capability);
    fn blend_func(&self, src: BlendFactor, dst: BlendFactor);
    fn blend_func_separate(
        &self,
        src: BlendFactor,
        dst: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );
    fn blend_equation(&self, mode: BlendEquation);
    fn blend_equation_separate(&self, mode_rgb: BlendEquation, mode_alpha: BlendEquation);
    fn cull_face(&self, mode: CullFaceMode);
    fn front_face(&self, winding: Winding);
    fn depth_mask(&self, enabled: bool);
    fn depth_func(&self, func: DepthFunc);
    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);
    fn clear(&self, mask: ClearMask);
    fn active_texture(&self, unit: u32);

    // ==================
    // Textures
    // ==================

    fn create_texture(&self) -> TextureId;
    fn bind_texture(&self, texture: Option<TextureId>);
    /// Uploads pixel data, or allocates storage when `data` is `None`.
    fn tex_image_2d(
        &self,
        width: u32,
        height: u32,
        internal_format: InternalFormat,
        format: TextureFormat,
        texel_type: TexelType,
        data: Option<&[u8]>,
    );
    fn tex_filter(&self, min: TextureFilter, mag: TextureFilter);
    fn tex_wrap(&self, wrap_s: TextureWrap, wrap_t: TextureWrap);
    fn generate_mipmap(&self);
    fn pixel_store_flip_y(&self, flip: bool);
    fn pixel_store_premultiply_alpha(&self, premultiply: bool);
    fn pixel_store_unpack_alignment(&self, alignment: u32);
    fn delete_texture(&self, texture: TextureId);

    // ==================
    // Framebuffers
    // ==================

    fn create_framebuffer(&self) -> FramebufferId;
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>);
    fn framebuffer_texture_2d(&self, attachment: Attachment, texture: TextureId);
    fn delete_framebuffer(&self, framebuffer: FramebufferId);
    fn create_renderbuffer(&self) -> RenderbufferId;
    fn bind_renderbuffer(&self, renderbuffer: Option<RenderbufferId>);
    fn renderbuffer_storage(&self, format: RenderbufferFormat, width: u32, height: u32);
    fn framebuffer_renderbuffer(&self, attachment: Attachment, renderbuffer: RenderbufferId);
    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId);
    /// Declares which color attachments fragment outputs write to.
    fn draw_buffers(&self, attachments: &[Attachment]);
}
