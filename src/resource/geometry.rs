//! Attribute collections, VAO caching, and draw submission.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use glam::Vec3;

use crate::context::{BufferTarget, Context, DrawMode};
use crate::renderer::Renderer;
use crate::resource::{GeometryAttribute, Program};

static GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

// One warning for the whole process, not one per frame.
static BOUNDS_WARNED: AtomicBool = AtomicBool::new(false);

/// The range of elements a draw call submits.
#[derive(Clone, Copy, Debug)]
pub struct DrawRange {
    pub start: usize,
    pub count: usize,
}

/// Axis-aligned bounds and bounding sphere of a geometry, in local space.
#[derive(Clone, Copy, Debug)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    pub center: Vec3,
    pub scale: Vec3,
    pub radius: f32,
}

/// A named collection of vertex attributes.
///
/// The `"index"` attribute is special: it targets the element-array
/// binding and makes draws indexed. VAOs are cached per program
/// attribute-layout signature, because the same geometry drawn by two
/// programs with different bind orders needs two distinct VAOs.
pub struct Geometry {
    /// Unique id, paired with a program's attribute order to form the
    /// renderer's last-bound-geometry key.
    pub id: u64,
    ctx: Context,
    pub attributes: HashMap<String, GeometryAttribute>,
    vaos: HashMap<String, crate::context::VaoId>,
    pub draw_range: DrawRange,
    pub instanced_count: usize,
    is_instanced: bool,
    pub bounds: Option<Bounds>,
}

impl Geometry {
    /// Creates a geometry and uploads the given attributes.
    ///
    /// Attributes are added in order; see
    /// [`add_attribute`](Geometry::add_attribute) for how each one
    /// affects the draw range and instance count.
    pub fn new(
        renderer: &mut Renderer,
        attributes: Vec<(String, GeometryAttribute)>,
    ) -> Geometry {
        // Unbind the current VAO so new buffers don't attach to a live mesh
        renderer.bind_vertex_array(None);
        renderer.clear_current_geometry();

        let mut geometry = Geometry {
            id: GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            ctx: renderer.context().clone(),
            attributes: HashMap::new(),
            vaos: HashMap::new(),
            draw_range: DrawRange { start: 0, count: 0 },
            instanced_count: 0,
            is_instanced: false,
            bounds: None,
        };

        for (key, attribute) in attributes {
            geometry.add_attribute(renderer, &key, attribute);
        }

        geometry
    }

    /// Adds one attribute, allocating and filling its buffer.
    ///
    /// Instanced attributes contribute `count * divisor` to the instance
    /// count; mismatched instanced lengths warn and clamp to the minimum.
    /// The `"index"` attribute fixes the draw count; otherwise the draw
    /// count is the maximum over non-indexed attributes.
    pub fn add_attribute(
        &mut self,
        renderer: &mut Renderer,
        key: &str,
        mut attribute: GeometryAttribute,
    ) {
        attribute.target = if key == "index" {
            BufferTarget::ElementArray
        } else {
            BufferTarget::Array
        };
        if attribute.count == 0 {
            attribute.count = if attribute.stride != 0 {
                attribute.data.byte_len() / attribute.stride
            } else {
                attribute.data.len() / attribute.size
            };
        }
        attribute.needs_update = false;

        if attribute.buffer.is_none() {
            attribute.buffer = Some(self.ctx.create_buffer());
            upload(renderer, &self.ctx, &mut attribute);
        }

        // Update geometry counts. If indexed, ignore regular attributes.
        if attribute.divisor != 0 {
            self.is_instanced = true;
            let count = attribute.count * attribute.divisor as usize;
            if self.instanced_count != 0 && self.instanced_count != count {
                log::warn!("geometry has multiple instanced buffers of different length");
                self.instanced_count = self.instanced_count.min(count);
                self.attributes.insert(key.to_string(), attribute);
                return;
            }
            self.instanced_count = count;
        } else if key == "index" {
            self.draw_range.count = attribute.count;
        } else if !self.attributes.contains_key("index") {
            self.draw_range.count = self.draw_range.count.max(attribute.count);
        }

        self.attributes.insert(key.to_string(), attribute);
    }

    /// Re-uploads a named attribute's data immediately.
    pub fn update_attribute(&mut self, renderer: &mut Renderer, name: &str) {
        if let Some(attribute) = self.attributes.get_mut(name) {
            upload(renderer, &self.ctx, attribute);
        }
    }

    pub fn set_draw_range(&mut self, start: usize, count: usize) {
        self.draw_range.start = start;
        self.draw_range.count = count;
    }

    pub fn set_instanced_count(&mut self, count: usize) {
        self.instanced_count = count;
    }

    // Builds a VAO for this program's attribute layout and caches it
    // under the layout signature.
    fn create_vao(&mut self, renderer: &mut Renderer, program: &Program) {
        let vao = self.ctx.create_vertex_array();
        self.vaos.insert(program.attribute_order().to_string(), vao);
        renderer.bind_vertex_array(Some(vao));
        self.bind_attributes(renderer, program);
    }

    // Points every location the program declares at this geometry's
    // buffers. Matrix attributes occupy one location per column.
    fn bind_attributes(&mut self, renderer: &mut Renderer, program: &Program) {
        let instancing = renderer.capabilities().instancing;

        for active in program.attributes() {
            let attribute = match self.attributes.get(&active.name) {
                Some(attribute) => attribute,
                None => {
                    log::warn!("active attribute {} not being supplied", active.name);
                    continue;
                }
            };
            let buffer = match attribute.buffer {
                Some(buffer) => buffer,
                None => continue,
            };

            self.ctx.bind_buffer(attribute.target, Some(buffer));
            renderer.set_bound_buffer(buffer);

            let num_loc = active.kind.num_locations() as usize;
            let size = attribute.size / num_loc;
            let stride = if num_loc == 1 { 0 } else { num_loc * num_loc * num_loc };
            let offset = if num_loc == 1 { 0 } else { num_loc * num_loc };

            for i in 0..num_loc {
                let location = active.location + i as u32;
                self.ctx.vertex_attrib_pointer(
                    location,
                    size as u32,
                    attribute.kind,
                    attribute.normalized,
                    attribute.stride + stride,
                    attribute.offset + i * offset,
                );
                self.ctx.enable_vertex_attrib_array(location);

                // Divisor must be reset to 0 as well, in case an
                // instanced draw left a stale value on this location.
                if instancing {
                    self.ctx.vertex_attrib_divisor(location, attribute.divisor);
                }
            }
        }

        // Bind indices if the geometry is indexed
        if let Some(index) = self.attributes.get("index") {
            if let Some(buffer) = index.buffer {
                self.ctx.bind_buffer(BufferTarget::ElementArray, Some(buffer));
            }
        }
    }

    /// Binds the right VAO for `program` and issues the draw call.
    ///
    /// The VAO bind is skipped when the renderer's last-bound pair
    /// already matches this geometry and attribute order; the VAO is
    /// built lazily on the first draw with a given program layout.
    /// Attributes flagged `needs_update` are re-uploaded first.
    pub fn draw(&mut self, renderer: &mut Renderer, program: &Program, mode: DrawMode) {
        let capabilities = renderer.capabilities();

        if capabilities.vertex_array_objects {
            if !renderer.is_current_geometry(self.id, program.attribute_order()) {
                if !self.vaos.contains_key(program.attribute_order()) {
                    self.create_vao(renderer, program);
                }
                let vao = self.vaos.get(program.attribute_order()).copied();
                renderer.bind_vertex_array(vao);
                renderer.set_current_geometry(self.id, program.attribute_order());
            }
        } else {
            // No VAO support: re-point every attribute each draw
            self.bind_attributes(renderer, program);
        }

        // Re-upload any attribute flagged for update
        for active in program.attributes() {
            if let Some(attribute) = self.attributes.get_mut(&active.name) {
                if attribute.needs_update {
                    upload(renderer, &self.ctx, attribute);
                }
            }
        }

        let index = self.attributes.get("index");
        if self.is_instanced {
            if !capabilities.instancing {
                return;
            }
            match index {
                Some(index) => self.ctx.draw_elements_instanced(
                    mode,
                    self.draw_range.count,
                    index.kind,
                    index.offset + self.draw_range.start * 2,
                    self.instanced_count,
                ),
                None => self.ctx.draw_arrays_instanced(
                    mode,
                    self.draw_range.start,
                    self.draw_range.count,
                    self.instanced_count,
                ),
            }
        } else {
            match index {
                Some(index) => self.ctx.draw_elements(
                    mode,
                    self.draw_range.count,
                    index.kind,
                    index.offset + self.draw_range.start * 2,
                ),
                None => self
                    .ctx
                    .draw_arrays(mode, self.draw_range.start, self.draw_range.count),
            }
        }
    }

    fn position(&self) -> Option<&GeometryAttribute> {
        let attribute = self.attributes.get("position");
        if attribute.is_none() && !BOUNDS_WARNED.swap(true, Ordering::Relaxed) {
            log::warn!("no position buffer data found to compute bounds");
        }
        attribute
    }

    /// Computes the axis-aligned bounding box over the position data.
    pub fn compute_bounding_box(&mut self) {
        let attribute = match self.position() {
            Some(attribute) => attribute,
            None => return,
        };
        let offset = attribute.offset;
        let step = if attribute.stride != 0 {
            attribute.stride
        } else {
            attribute.size
        };
        let len = attribute.data.len();

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        let mut i = offset;
        while i + 2 < len {
            let point = Vec3::new(
                attribute.data.value_at(i),
                attribute.data.value_at(i + 1),
                attribute.data.value_at(i + 2),
            );
            min = min.min(point);
            max = max.max(point);
            i += step;
        }

        let radius = self.bounds.map(|bounds| bounds.radius).unwrap_or(f32::INFINITY);
        self.bounds = Some(Bounds {
            min,
            max,
            center: (min + max) * 0.5,
            scale: max - min,
            radius,
        });
    }

    /// Computes the bounding sphere over the position data. Used by
    /// frustum culling; runs lazily the first time a mesh is culled.
    pub fn compute_bounding_sphere(&mut self) {
        if self.bounds.is_none() {
            self.compute_bounding_box();
        }
        let center = match self.bounds {
            Some(bounds) => bounds.center,
            None => return,
        };
        let attribute = match self.position() {
            Some(attribute) => attribute,
            None => return,
        };
        let offset = attribute.offset;
        let step = if attribute.stride != 0 {
            attribute.stride
        } else {
            attribute.size
        };
        let len = attribute.data.len();

        let mut max_radius_sq = 0f32;
        let mut i = offset;
        while i + 2 < len {
            let point = Vec3::new(
                attribute.data.value_at(i),
                attribute.data.value_at(i + 1),
                attribute.data.value_at(i + 2),
            );
            max_radius_sq = max_radius_sq.max(center.distance_squared(point));
            i += step;
        }

        if let Some(bounds) = &mut self.bounds {
            bounds.radius = max_radius_sq.sqrt();
        }
    }

    /// Deletes every cached VAO and attribute buffer.
    pub fn remove(&mut self) {
        for (_, vao) in self.vaos.drain() {
            self.ctx.delete_vertex_array(vao);
        }
        for (_, attribute) in self.attributes.drain() {
            if let Some(buffer) = attribute.buffer {
                self.ctx.delete_buffer(buffer);
            }
        }
    }
}

// Pushes an attribute's data to its buffer, binding it first unless it
// is already the renderer's bound buffer.
fn upload(renderer: &mut Renderer, ctx: &Context, attribute: &mut GeometryAttribute) {
    let buffer = match attribute.buffer {
        Some(buffer) => buffer,
        None => {
            let buffer = ctx.create_buffer();
            attribute.buffer = Some(buffer);
            buffer
        }
    };
    if renderer.bound_buffer() != Some(buffer) {
        ctx.bind_buffer(attribute.target, Some(buffer));
        renderer.set_bound_buffer(buffer);
    }
    ctx.buffer_data(attribute.target, attribute.data.as_bytes());
    attribute.needs_update = false;
}
