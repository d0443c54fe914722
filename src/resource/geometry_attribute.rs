//! A single vertex data stream and its GPU buffer.

use crate::context::{BufferId, BufferTarget, DataType};

/// The typed payload of a [`GeometryAttribute`].
///
/// Index attributes carry `U16` or `U32` data; everything else is `F32`.
#[derive(Clone, Debug)]
pub enum AttributeData {
    F32(Vec<f32>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl AttributeData {
    /// The number of elements in the payload.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::F32(v) => v.len(),
            AttributeData::U16(v) => v.len(),
            AttributeData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.data_type().byte_size()
    }

    /// The device element type this payload implies.
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeData::F32(_) => DataType::F32,
            AttributeData::U16(_) => DataType::U16,
            AttributeData::U32(_) => DataType::U32,
        }
    }

    /// The raw bytes, ready for buffer upload.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::F32(v) => bytemuck::cast_slice(v),
            AttributeData::U16(v) => bytemuck::cast_slice(v),
            AttributeData::U32(v) => bytemuck::cast_slice(v),
        }
    }

    // Element at a flat index as f32, used by the bounds computation.
    pub(crate) fn value_at(&self, index: usize) -> f32 {
        match self {
            AttributeData::F32(v) => v[index],
            AttributeData::U16(v) => f32::from(v[index]),
            AttributeData::U32(v) => v[index] as f32,
        }
    }
}

/// One vertex data stream (positions, uvs, indices, ...) and the GPU
/// buffer it owns.
///
/// The buffer handle is allocated when the attribute is added to a
/// [`Geometry`](crate::resource::Geometry). Mutate `data` and raise
/// `needs_update` to have the next draw re-upload it.
#[derive(Clone, Debug)]
pub struct GeometryAttribute {
    /// Components per element: 3 for 3d positions, 2 for uvs, and so on.
    pub size: usize,
    pub data: AttributeData,
    /// Device element type, inferred from `data`.
    pub kind: DataType,
    pub normalized: bool,
    /// Byte stride for interleaved layouts, 0 when tightly packed.
    pub stride: usize,
    /// Byte offset into the buffer.
    pub offset: usize,
    /// Instancing divisor; 0 means per-vertex.
    pub divisor: u32,
    /// Element count. `byte_len / stride` for strided layouts, else
    /// `data.len() / size`. Derived when the attribute is added.
    pub count: usize,
    pub needs_update: bool,
    pub(crate) buffer: Option<BufferId>,
    pub(crate) target: BufferTarget,
}

impl GeometryAttribute {
    pub fn new(size: usize, data: AttributeData) -> GeometryAttribute {
        let kind = data.data_type();
        GeometryAttribute {
            size,
            data,
            kind,
            normalized: false,
            stride: 0,
            offset: 0,
            divisor: 0,
            count: 0,
            needs_update: false,
            buffer: None,
            target: BufferTarget::Array,
        }
    }

    /// Marks the attribute as instanced with the given divisor.
    pub fn instanced(mut self, divisor: u32) -> GeometryAttribute {
        self.divisor = divisor;
        self
    }
}
