// buffer.rs — Runtime buffer handle
//
// The concrete multi-dimensional array bound to a buffer parameter for
// immediate execution. Only the shape metadata the parameter model checks
// against (name, element type, per-axis min/extent/stride) is carried here;
// storage and execution belong to the runtime.
//
// Preconditions: none.
// Postconditions: clones share one buffer; `same_as` is identity.
// Failure modes: dense construction rejects non-positive extents and
//   strides that overflow `i32` (`ShapeError`).
// Side effects: `Buffer::new` draws a unique name from a process-wide counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::types::Type;

/// A dense shape that cannot be laid out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("extent {extent} of axis {axis} is not positive")]
    NonPositiveExtent { axis: usize, extent: i32 },

    #[error("stride of axis {axis} overflows int32")]
    StrideOverflow { axis: usize },
}

/// Shape of one buffer axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferDim {
    pub min: i32,
    pub extent: i32,
    pub stride: i32,
}

struct BufferContents {
    name: String,
    ty: Type,
    dims: Vec<BufferDim>,
}

/// A possibly-undefined shared handle to a runtime buffer.
#[derive(Clone, Default)]
pub struct Buffer(Option<Arc<BufferContents>>);

static NEXT_BUFFER: AtomicU64 = AtomicU64::new(0);

impl Buffer {
    /// A dense buffer with zero mins and an auto-generated name.
    pub fn new(ty: Type, extents: &[i32]) -> Result<Self, ShapeError> {
        let n = NEXT_BUFFER.fetch_add(1, Ordering::Relaxed);
        Self::with_name(ty, extents, format!("b{}", n))
    }

    /// A dense buffer: axis 0 has stride 1, each later axis strides over
    /// the previous ones.
    pub fn with_name(ty: Type, extents: &[i32], name: impl Into<String>) -> Result<Self, ShapeError> {
        let mut dims = Vec::with_capacity(extents.len());
        let mut stride = 1i32;
        for (axis, &extent) in extents.iter().enumerate() {
            if extent <= 0 {
                return Err(ShapeError::NonPositiveExtent { axis, extent });
            }
            if axis > 0 {
                stride = stride
                    .checked_mul(extents[axis - 1])
                    .ok_or(ShapeError::StrideOverflow { axis })?;
            }
            dims.push(BufferDim {
                min: 0,
                extent,
                stride,
            });
        }
        Ok(Self::from_dims(ty, dims, name))
    }

    pub fn from_dims(ty: Type, dims: Vec<BufferDim>, name: impl Into<String>) -> Self {
        Buffer(Some(Arc::new(BufferContents {
            name: name.into(),
            ty,
            dims,
        })))
    }

    pub fn defined(&self) -> bool {
        self.0.is_some()
    }

    pub fn same_as(&self, other: &Buffer) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.name.as_str())
    }

    pub fn ty(&self) -> Option<Type> {
        self.0.as_ref().map(|c| c.ty)
    }

    pub fn dimensions(&self) -> usize {
        self.dims().len()
    }

    pub fn dims(&self) -> &[BufferDim] {
        self.0.as_ref().map(|c| c.dims.as_slice()).unwrap_or(&[])
    }

    pub fn dim(&self, i: usize) -> Option<BufferDim> {
        self.dims().get(i).copied()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(c) => f
                .debug_struct("Buffer")
                .field("name", &c.name)
                .field("ty", &c.ty)
                .field("dims", &c.dims)
                .finish(),
            None => write!(f, "Buffer(<undefined>)"),
        }
    }
}
