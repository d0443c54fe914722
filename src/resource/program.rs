//! Shader program compilation, introspection, and per-draw binding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::context::{
    ActiveAttribute, BlendEquation, BlendFactor, Capability, Context, CullFaceMode, DepthFunc,
    ProgramError, ProgramId, UniformKind, UniformLocation, Winding,
};
use crate::renderer::Renderer;
use crate::resource::uniform::{set_uniform, UniformData, UniformValue};

static PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

// Missing-uniform warnings are capped process-wide so a 60fps loop with a
// bad shader does not flood the log.
static WARN_COUNT: AtomicUsize = AtomicUsize::new(0);
const WARN_CAP: usize = 100;

fn warn_limited(message: std::fmt::Arguments<'_>) {
    let count = WARN_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= WARN_CAP {
        return;
    }
    log::warn!("{}", message);
    if count + 1 == WARN_CAP {
        log::warn!("more than {} program warnings, stopping logs", WARN_CAP);
    }
}

/// Source and render-state parameters for a [`Program`].
pub struct ProgramOptions {
    pub vertex: String,
    pub fragment: String,
    pub uniforms: HashMap<String, UniformValue>,
    pub transparent: bool,
    /// `None` disables face culling entirely.
    pub cull_face: Option<CullFaceMode>,
    pub front_face: Winding,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: DepthFunc,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        ProgramOptions {
            vertex: String::new(),
            fragment: String::new(),
            uniforms: HashMap::new(),
            transparent: false,
            cull_face: Some(CullFaceMode::Back),
            front_face: Winding::Ccw,
            depth_test: true,
            depth_write: true,
            depth_func: DepthFunc::Less,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct BlendFuncState {
    src: BlendFactor,
    dst: BlendFactor,
    src_alpha: Option<BlendFactor>,
    dst_alpha: Option<BlendFactor>,
}

// One introspected uniform, with its pre-parsed lookup key.
#[derive(Clone, Debug)]
struct UniformBinding {
    key: String,
    kind: UniformKind,
    location: UniformLocation,
}

/// A compiled and linked shader pair plus the render state drawn with it.
///
/// Introspection runs once at link time; the binding tables are immutable
/// afterwards. A failed compile or link is logged with numbered source
/// and leaves the program unusable but inert: `use_program` becomes a
/// no-op and `linked()` reports `false`.
pub struct Program {
    /// Monotonic id, used by the renderer to skip redundant program binds
    /// and to group draws in the opaque/ui sort.
    pub id: u64,
    ctx: Context,
    /// Caller-supplied uniform values, keyed by flat uniform name
    /// (`name`, `name.prop`, or `name[i].prop` for struct members).
    pub uniforms: HashMap<String, UniformValue>,
    pub transparent: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_face: Option<CullFaceMode>,
    pub front_face: Winding,
    pub depth_func: DepthFunc,
    blend_func: Option<BlendFuncState>,
    blend_equation: (BlendEquation, Option<BlendEquation>),
    handle: Option<ProgramId>,
    uniform_bindings: Vec<UniformBinding>,
    attributes: Vec<ActiveAttribute>,
    attribute_order: String,
}

impl Program {
    /// Compiles and links the shader pair.
    ///
    /// # Arguments
    /// * `renderer` - The renderer this program will draw through. Needed
    ///   here to pick the default blend function for transparent programs.
    /// * `options` - Shader sources, uniform values, and render state.
    pub fn new(renderer: &Renderer, options: ProgramOptions) -> Program {
        let ctx = renderer.context().clone();

        let mut program = Program {
            id: PROGRAM_ID.fetch_add(1, Ordering::Relaxed),
            ctx,
            uniforms: options.uniforms,
            transparent: options.transparent,
            depth_test: options.depth_test,
            depth_write: options.depth_write,
            cull_face: options.cull_face,
            front_face: options.front_face,
            depth_func: options.depth_func,
            blend_func: None,
            blend_equation: (BlendEquation::Add, None),
            handle: None,
            uniform_bindings: Vec::new(),
            attributes: Vec::new(),
            attribute_order: String::new(),
        };

        // Default blend func for transparent programs
        if program.transparent {
            if renderer.premultiplied_alpha() {
                program.set_blend_func(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
            } else {
                program.set_blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
            }
        }

        match program.ctx.compile_program(&options.vertex, &options.fragment) {
            Ok(linked) => {
                program.uniform_bindings = linked
                    .uniforms
                    .iter()
                    .map(|uniform| UniformBinding {
                        key: parse_uniform_key(&uniform.name),
                        kind: uniform.kind,
                        location: uniform.location,
                    })
                    .collect();

                let mut attributes = linked.attributes;
                attributes.sort_by_key(|attribute| attribute.location);
                program.attribute_order = attributes
                    .iter()
                    .map(|attribute| attribute.name.as_str())
                    .collect();
                program.attributes = attributes;
                program.handle = Some(linked.handle);
            }
            Err(ProgramError::VertexCompile(info)) => {
                log::warn!("{}\nvertex shader\n{}", info, add_line_numbers(&options.vertex));
            }
            Err(ProgramError::FragmentCompile(info)) => {
                log::warn!(
                    "{}\nfragment shader\n{}",
                    info,
                    add_line_numbers(&options.fragment)
                );
            }
            Err(ProgramError::Link(info)) => {
                log::warn!("program link failed: {}", info);
            }
        }

        program
    }

    /// Whether the compile and link succeeded.
    pub fn linked(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<ProgramId> {
        self.handle
    }

    /// The program's active attributes, ordered by bind location.
    pub(crate) fn attributes(&self) -> &[ActiveAttribute] {
        &self.attributes
    }

    /// The attribute-layout signature used to key geometry VAO caches.
    pub fn attribute_order(&self) -> &str {
        &self.attribute_order
    }

    /// Sets the blend factors. Marks the program transparent, since a
    /// blend function only takes effect with blending enabled.
    pub fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.blend_func = Some(BlendFuncState {
            src,
            dst,
            src_alpha: None,
            dst_alpha: None,
        });
        self.transparent = true;
    }

    /// Like [`set_blend_func`](Program::set_blend_func) with separate
    /// alpha-channel factors.
    pub fn set_blend_func_separate(
        &mut self,
        src: BlendFactor,
        dst: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.blend_func = Some(BlendFuncState {
            src,
            dst,
            src_alpha: Some(src_alpha),
            dst_alpha: Some(dst_alpha),
        });
        self.transparent = true;
    }

    pub fn set_blend_equation(&mut self, mode_rgb: BlendEquation, mode_alpha: Option<BlendEquation>) {
        self.blend_equation = (mode_rgb, mode_alpha);
    }

    /// Makes this the active program and binds its uniforms and state.
    ///
    /// Only uniforms the linker kept active are bound. Each is resolved
    /// from [`uniforms`](Program::uniforms) by its flat name; a missing
    /// value logs a rate-limited warning and the draw proceeds without
    /// it. Texture values are assigned units from a counter that restarts
    /// every call, then bound through the texture cache.
    ///
    /// # Arguments
    /// * `flip_faces` - Invert the front-face winding for this draw. Set
    ///   when the drawn object's world matrix is mirrored.
    pub fn use_program(&mut self, renderer: &mut Renderer, flip_faces: bool) {
        let handle = match self.handle {
            Some(handle) => handle,
            None => return,
        };

        let mut texture_unit: i32 = -1;

        // Avoid the device call if this program is already active
        if renderer.current_program() != Some(self.id) {
            renderer.context().use_program(handle);
            renderer.set_current_program(self.id);
        }

        for binding in &self.uniform_bindings {
            let value = match self.uniforms.get(&binding.key) {
                Some(value) => value,
                None => {
                    warn_limited(format_args!(
                        "active uniform {} has not been supplied",
                        binding.key
                    ));
                    continue;
                }
            };

            match value {
                UniformValue::Texture(texture) => {
                    texture_unit += 1;
                    texture.borrow_mut().update(renderer, texture_unit as u32);
                    set_uniform(
                        renderer,
                        handle,
                        binding.kind,
                        binding.location,
                        UniformData::Ints(vec![texture_unit]),
                    );
                }
                UniformValue::TextureArray(textures) => {
                    let mut units = Vec::with_capacity(textures.len());
                    for texture in textures {
                        texture_unit += 1;
                        texture.borrow_mut().update(renderer, texture_unit as u32);
                        units.push(texture_unit);
                    }
                    set_uniform(
                        renderer,
                        handle,
                        binding.kind,
                        binding.location,
                        UniformData::Ints(units),
                    );
                }
                value => {
                    if let Some(data) = value.flatten() {
                        set_uniform(renderer, handle, binding.kind, binding.location, data);
                    }
                }
            }
        }

        self.apply_state(renderer);
        if flip_faces {
            renderer.set_front_face(self.front_face.flipped());
        }
    }

    /// Pushes the program's render state through the renderer's cache.
    fn apply_state(&self, renderer: &mut Renderer) {
        if self.depth_test {
            renderer.enable(Capability::DepthTest);
        } else {
            renderer.disable(Capability::DepthTest);
        }

        if self.cull_face.is_some() {
            renderer.enable(Capability::CullFace);
        } else {
            renderer.disable(Capability::CullFace);
        }

        if self.blend_func.is_some() {
            renderer.enable(Capability::Blend);
        } else {
            renderer.disable(Capability::Blend);
        }

        if let Some(mode) = self.cull_face {
            renderer.set_cull_face(mode);
        }
        renderer.set_front_face(self.front_face);
        renderer.set_depth_mask(self.depth_write);
        renderer.set_depth_func(self.depth_func);
        if let Some(blend) = self.blend_func {
            renderer.set_blend_func(blend.src, blend.dst, blend.src_alpha, blend.dst_alpha);
        }
        renderer.set_blend_equation(self.blend_equation.0, self.blend_equation.1);
    }

    /// Deletes the GPU program and evicts its cached uniform values.
    pub fn remove(&mut self, renderer: &mut Renderer) {
        if let Some(handle) = self.handle.take() {
            renderer.forget_program(handle);
            self.ctx.delete_program(handle);
        }
    }
}

// Turns an introspected uniform name into the flat key its value is
// looked up by: `lights[2].intensity` and `light.position` stay as-is,
// array uniforms like `weights[0]` reduce to their base name.
fn parse_uniform_key(name: &str) -> String {
    let tokens: Vec<&str> = name
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .collect();
    match tokens.as_slice() {
        [base, index, property] if index.parse::<usize>().is_ok() => {
            format!("{}[{}].{}", base, index, property)
        }
        [base, property] if property.parse::<usize>().is_err() => {
            format!("{}.{}", base, property)
        }
        [base, ..] => (*base).to_string(),
        [] => String::new(),
    }
}

fn add_line_numbers(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{}: {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}
