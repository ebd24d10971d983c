// parameter.rs — Shared parameter handle
//
// A `Parameter` is a reference-counted handle to one contents block: the
// immutable identity of a pipeline input (name, element type, scalar or
// buffer, dimensionality) plus its mutable payload (per-dimension constraint
// table, scalar range, live scalar/buffer binding, host alignment).
// Clones share the block, so a write through any clone is visible through
// all of them.
//
// Preconditions: none; every operation checks its own contract.
// Postconditions: a failed operation leaves the contents unchanged.
// Failure modes: undefined handle, scalar/buffer kind mismatch, dimension
//   index out of range, scalar type mismatch (all `ParamError`).
// Side effects: construction may register the block with an
//   `InstanceRegistry`; the entry is removed when the last handle drops.
//
// Concurrency: the reference count and the payload lock are thread-safe,
// so handles may be cloned and dropped on any thread. Nothing orders
// binding updates against a pipeline executing with the same parameter;
// callers serialize those themselves.

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::buffer::Buffer;
use crate::error::ParamError;
use crate::expr::Expr;
use crate::registry::{InstanceKind, InstanceRegistry, Registration};
use crate::scalar::{ScalarType, ScalarValue};
use crate::types::Type;

// ── Contents ────────────────────────────────────────────────────────────────

/// Constraints and estimates declared for one buffer axis.
#[derive(Debug, Clone, Default)]
pub(crate) struct BufferConstraint {
    pub min: Expr,
    pub extent: Expr,
    pub stride: Expr,
    pub min_estimate: Expr,
    pub extent_estimate: Expr,
}

#[derive(Debug)]
struct ParameterState {
    constraints: Vec<BufferConstraint>,
    min_value: Expr,
    max_value: Expr,
    estimate: Expr,
    buffer: Buffer,
    host_alignment: usize,
}

struct ParameterContents {
    ty: Type,
    is_buffer: bool,
    dimensions: usize,
    name: String,
    is_explicit_name: bool,
    is_bound_before_lowering: bool,
    state: RwLock<ParameterState>,
    /// Live scalar value. Lives inside the shared block, so its address is
    /// fixed for the block's lifetime.
    scalar_slot: AtomicU64,
    /// Dropped together with the block, which removes the registry entry.
    _registration: Option<Registration>,
}

static NEXT_PARAM: AtomicU64 = AtomicU64::new(0);

fn unique_name() -> String {
    format!("p{}", NEXT_PARAM.fetch_add(1, Ordering::Relaxed))
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Named construction of a `Parameter`.
///
/// ```
/// use pparam::{InstanceRegistry, Parameter, Type};
///
/// let registry = InstanceRegistry::new();
/// let p = Parameter::builder(Type::float(32), true, 2)
///     .with_name("input")
///     .with_explicit_name(true)
///     .with_registry(&registry)
///     .build()
///     .unwrap();
/// assert_eq!(p.name().unwrap(), "input");
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    ty: Type,
    is_buffer: bool,
    dimensions: usize,
    name: Option<String>,
    is_explicit_name: bool,
    registry: Option<InstanceRegistry>,
    is_bound_before_lowering: bool,
}

impl ParameterBuilder {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark the name as chosen by the user rather than generated.
    pub fn with_explicit_name(mut self, explicit: bool) -> Self {
        self.is_explicit_name = explicit;
        self
    }

    /// Register the contents block with `registry` for its lifetime.
    pub fn with_registry(mut self, registry: &InstanceRegistry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    /// Mark the parameter as replaced by a constant before lowering.
    pub fn bound_before_lowering(mut self, bound: bool) -> Self {
        self.is_bound_before_lowering = bound;
        self
    }

    pub fn build(self) -> Result<Parameter, ParamError> {
        let name = self.name.unwrap_or_else(unique_name);
        let invalid = |reason: &str| ParamError::InvalidDeclaration {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.ty.bits() == 0 || self.ty.lanes() == 0 {
            return Err(invalid("element type must have at least one bit and one lane"));
        }
        if self.is_buffer && self.dimensions == 0 {
            return Err(invalid("buffer parameters need at least one dimension"));
        }
        if !self.is_buffer && self.dimensions != 0 {
            return Err(invalid("scalar parameters must be zero-dimensional"));
        }
        if !self.is_buffer && ScalarValue::zero(self.ty).is_none() {
            return Err(ParamError::InvalidDeclaration {
                name: name.clone(),
                reason: format!("type {} has no scalar representation", self.ty),
            });
        }

        // Validation is complete; nothing below can fail, so a registration
        // is never left behind by a rejected declaration.
        let kind = if self.is_buffer {
            InstanceKind::BufferParameter
        } else {
            InstanceKind::ScalarParameter
        };
        let registration = self.registry.as_ref().map(|r| r.register(kind, &name));

        debug!(
            name = %name,
            ty = %self.ty,
            is_buffer = self.is_buffer,
            dimensions = self.dimensions,
            registered = registration.is_some(),
            "created parameter"
        );

        let contents = ParameterContents {
            ty: self.ty,
            is_buffer: self.is_buffer,
            dimensions: self.dimensions,
            name,
            is_explicit_name: self.is_explicit_name,
            is_bound_before_lowering: self.is_bound_before_lowering,
            state: RwLock::new(ParameterState {
                constraints: vec![BufferConstraint::default(); self.dimensions],
                min_value: Expr::undefined(),
                max_value: Expr::undefined(),
                estimate: Expr::undefined(),
                buffer: Buffer::default(),
                host_alignment: self.ty.bytes(),
            }),
            scalar_slot: AtomicU64::new(0),
            _registration: registration,
        };

        Ok(Parameter {
            contents: Some(Arc::new(contents)),
        })
    }
}

// ── Parameter ───────────────────────────────────────────────────────────────

/// A reference-counted handle to a scalar or buffer pipeline input.
/// `Parameter::default()` is the undefined handle.
#[derive(Clone, Default)]
pub struct Parameter {
    contents: Option<Arc<ParameterContents>>,
}

impl Parameter {
    /// A new parameter with a unique auto-generated name.
    pub fn new(ty: Type, is_buffer: bool, dimensions: usize) -> Result<Self, ParamError> {
        Self::builder(ty, is_buffer, dimensions).build()
    }

    pub fn builder(ty: Type, is_buffer: bool, dimensions: usize) -> ParameterBuilder {
        ParameterBuilder {
            ty,
            is_buffer,
            dimensions,
            name: None,
            is_explicit_name: false,
            registry: None,
            is_bound_before_lowering: false,
        }
    }

    /// Explicitly named scalar parameter.
    pub fn scalar(ty: Type, name: impl Into<String>) -> Result<Self, ParamError> {
        Self::builder(ty, false, 0)
            .with_name(name)
            .with_explicit_name(true)
            .build()
    }

    /// Explicitly named buffer parameter.
    pub fn buffer(ty: Type, dimensions: usize, name: impl Into<String>) -> Result<Self, ParamError> {
        Self::builder(ty, true, dimensions)
            .with_name(name)
            .with_explicit_name(true)
            .build()
    }

    // ── Contract checks ──

    fn check_defined(&self) -> Result<&ParameterContents, ParamError> {
        self.contents.as_deref().ok_or(ParamError::Undefined)
    }

    fn check_is_buffer(&self) -> Result<&ParameterContents, ParamError> {
        let c = self.check_defined()?;
        if !c.is_buffer {
            return Err(ParamError::NotABuffer {
                name: c.name.clone(),
            });
        }
        Ok(c)
    }

    fn check_is_scalar(&self) -> Result<&ParameterContents, ParamError> {
        let c = self.check_defined()?;
        if c.is_buffer {
            return Err(ParamError::NotAScalar {
                name: c.name.clone(),
            });
        }
        Ok(c)
    }

    fn check_dim_ok(&self, dim: usize) -> Result<&ParameterContents, ParamError> {
        let c = self.check_is_buffer()?;
        if dim >= c.dimensions {
            return Err(ParamError::DimensionOutOfRange {
                name: c.name.clone(),
                dim,
                dimensions: c.dimensions,
            });
        }
        Ok(c)
    }

    fn check_expr_type(c: &ParameterContents, what: &'static str, e: &Expr) -> Result<(), ParamError> {
        match e.ty() {
            Some(t) if t != c.ty => Err(ParamError::ExprTypeMismatch {
                name: c.name.clone(),
                what,
                declared: c.ty,
                actual: t.to_string(),
            }),
            _ => Ok(()),
        }
    }

    // ── Identity queries ──

    pub fn ty(&self) -> Result<Type, ParamError> {
        Ok(self.check_defined()?.ty)
    }

    /// Zero for scalars.
    pub fn dimensions(&self) -> Result<usize, ParamError> {
        Ok(self.check_defined()?.dimensions)
    }

    pub fn name(&self) -> Result<&str, ParamError> {
        Ok(&self.check_defined()?.name)
    }

    pub fn is_explicit_name(&self) -> Result<bool, ParamError> {
        Ok(self.check_defined()?.is_explicit_name)
    }

    /// True iff this parameter is replaced with a constant at the start of
    /// lowering, and so must not be collected as a pipeline input.
    pub fn is_bound_before_lowering(&self) -> Result<bool, ParamError> {
        Ok(self.check_defined()?.is_bound_before_lowering)
    }

    pub fn is_buffer(&self) -> Result<bool, ParamError> {
        Ok(self.check_defined()?.is_buffer)
    }

    pub fn defined(&self) -> bool {
        self.contents.is_some()
    }

    /// True iff both handles refer to the same contents block.
    pub fn same_as(&self, other: &Parameter) -> bool {
        match (&self.contents, &other.contents) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    // ── Live scalar binding ──

    /// Current value of a scalar parameter. `T` must match the declared
    /// type, except that handle parameters may also be read as `u64`.
    pub fn get_scalar<T: ScalarType>(&self) -> Result<T, ParamError> {
        let c = self.check_is_scalar()?;
        let mismatch = || ParamError::ScalarTypeMismatch {
            name: c.name.clone(),
            declared: c.ty,
            requested: T::TYPE,
        };
        if c.ty.is_handle() && T::TYPE == Type::uint(64) {
            return T::from_value(ScalarValue::UInt64(self.handle_bits()?)).ok_or_else(mismatch);
        }
        if c.ty != T::TYPE {
            return Err(mismatch());
        }
        T::from_value(self.scalar_value()?).ok_or_else(mismatch)
    }

    /// Set the value of a scalar parameter. Same type rule as `get_scalar`.
    pub fn set_scalar<T: ScalarType>(&mut self, value: T) -> Result<(), ParamError> {
        let c = self.check_is_scalar()?;
        if c.ty.is_handle() && T::TYPE == Type::uint(64) {
            if let ScalarValue::UInt64(bits) = value.into_value() {
                return self.set_handle_bits(bits);
            }
        }
        if c.ty != T::TYPE {
            return Err(ParamError::ScalarTypeMismatch {
                name: c.name.clone(),
                declared: c.ty,
                requested: T::TYPE,
            });
        }
        self.set_scalar_value(value.into_value())
    }

    /// Current value as a tagged union.
    pub fn scalar_value(&self) -> Result<ScalarValue, ParamError> {
        let c = self.check_is_scalar()?;
        let bits = c.scalar_slot.load(Ordering::Relaxed);
        // Construction rejects types without a scalar representation.
        ScalarValue::from_bits(c.ty, bits).ok_or_else(|| ParamError::InvalidDeclaration {
            name: c.name.clone(),
            reason: format!("type {} has no scalar representation", c.ty),
        })
    }

    /// Set the value from a tagged union whose type matches the declaration.
    pub fn set_scalar_value(&mut self, value: ScalarValue) -> Result<(), ParamError> {
        let c = self.check_is_scalar()?;
        if value.ty() != c.ty {
            return Err(ParamError::ScalarTypeMismatch {
                name: c.name.clone(),
                declared: c.ty,
                requested: value.ty(),
            });
        }
        c.scalar_slot.store(value.to_bits(), Ordering::Relaxed);
        trace!(name = %c.name, %value, "set scalar");
        Ok(())
    }

    /// Bit pattern of a handle parameter's value.
    pub fn handle_bits(&self) -> Result<u64, ParamError> {
        let c = self.check_handle()?;
        Ok(c.scalar_slot.load(Ordering::Relaxed))
    }

    /// Set a handle parameter's value from its bit pattern.
    pub fn set_handle_bits(&mut self, bits: u64) -> Result<(), ParamError> {
        let c = self.check_handle()?;
        c.scalar_slot.store(bits, Ordering::Relaxed);
        trace!(name = %c.name, bits, "set handle");
        Ok(())
    }

    fn check_handle(&self) -> Result<&ParameterContents, ParamError> {
        let c = self.check_is_scalar()?;
        if !c.ty.is_handle() {
            return Err(ParamError::NotAHandle {
                name: c.name.clone(),
                declared: c.ty,
            });
        }
        Ok(c)
    }

    /// A literal holding the scalar value at the time of the call. Later
    /// `set_scalar` calls do not change an expression already returned.
    pub fn get_scalar_expr(&self) -> Result<Expr, ParamError> {
        Ok(self.scalar_value()?.to_expr())
    }

    /// Address of the live scalar slot, for binding into compiled code.
    /// Fixed for the lifetime of the contents block. The slot holds the
    /// value's native bytes in its low addresses.
    pub fn get_scalar_address(&self) -> Result<NonNull<u8>, ParamError> {
        let c = self.check_is_scalar()?;
        Ok(NonNull::from(&c.scalar_slot).cast::<u8>())
    }

    // ── Live buffer binding ──

    /// Currently bound buffer; undefined until `set_buffer`.
    pub fn get_buffer(&self) -> Result<Buffer, ParamError> {
        Ok(self.check_is_buffer()?.state.read().buffer.clone())
    }

    /// Bind a buffer. A defined buffer must match the declared element type
    /// and dimensionality; an undefined buffer clears the binding.
    pub fn set_buffer(&mut self, buffer: Buffer) -> Result<(), ParamError> {
        let c = self.check_is_buffer()?;
        if let Some(bty) = buffer.ty() {
            if bty != c.ty || buffer.dimensions() != c.dimensions {
                return Err(ParamError::BufferMismatch {
                    name: c.name.clone(),
                    buffer: buffer.name().unwrap_or_default().to_string(),
                    expected: format!("{}, {} dimensions", c.ty, c.dimensions),
                    actual: format!("{}, {} dimensions", bty, buffer.dimensions()),
                });
            }
        }
        trace!(name = %c.name, buffer = ?buffer.name(), "set buffer");
        c.state.write().buffer = buffer;
        Ok(())
    }

    // ── Buffer constraints ──

    fn read_constraint(&self, dim: usize, f: impl FnOnce(&BufferConstraint) -> Expr) -> Result<Expr, ParamError> {
        let c = self.check_dim_ok(dim)?;
        let state = c.state.read();
        Ok(f(&state.constraints[dim]))
    }

    fn write_constraint(&mut self, dim: usize, f: impl FnOnce(&mut BufferConstraint)) -> Result<(), ParamError> {
        let c = self.check_dim_ok(dim)?;
        let mut state = c.state.write();
        f(&mut state.constraints[dim]);
        Ok(())
    }

    pub fn set_min_constraint(&mut self, dim: usize, e: impl Into<Expr>) -> Result<(), ParamError> {
        let e = e.into();
        self.write_constraint(dim, |k| k.min = e)
    }

    pub fn set_extent_constraint(&mut self, dim: usize, e: impl Into<Expr>) -> Result<(), ParamError> {
        let e = e.into();
        self.write_constraint(dim, |k| k.extent = e)
    }

    pub fn set_stride_constraint(&mut self, dim: usize, e: impl Into<Expr>) -> Result<(), ParamError> {
        let e = e.into();
        self.write_constraint(dim, |k| k.stride = e)
    }

    pub fn set_min_constraint_estimate(&mut self, dim: usize, e: impl Into<Expr>) -> Result<(), ParamError> {
        let e = e.into();
        self.write_constraint(dim, |k| k.min_estimate = e)
    }

    pub fn set_extent_constraint_estimate(
        &mut self,
        dim: usize,
        e: impl Into<Expr>,
    ) -> Result<(), ParamError> {
        let e = e.into();
        self.write_constraint(dim, |k| k.extent_estimate = e)
    }

    pub fn min_constraint(&self, dim: usize) -> Result<Expr, ParamError> {
        self.read_constraint(dim, |k| k.min.clone())
    }

    pub fn extent_constraint(&self, dim: usize) -> Result<Expr, ParamError> {
        self.read_constraint(dim, |k| k.extent.clone())
    }

    pub fn stride_constraint(&self, dim: usize) -> Result<Expr, ParamError> {
        self.read_constraint(dim, |k| k.stride.clone())
    }

    pub fn min_constraint_estimate(&self, dim: usize) -> Result<Expr, ParamError> {
        self.read_constraint(dim, |k| k.min_estimate.clone())
    }

    pub fn extent_constraint_estimate(&self, dim: usize) -> Result<Expr, ParamError> {
        self.read_constraint(dim, |k| k.extent_estimate.clone())
    }

    /// Promised alignment of the host pointer, in bytes. Defaults to the
    /// element size.
    pub fn host_alignment(&self) -> Result<usize, ParamError> {
        Ok(self.check_is_buffer()?.state.read().host_alignment)
    }

    pub fn set_host_alignment(&mut self, bytes: usize) -> Result<(), ParamError> {
        let c = self.check_is_buffer()?;
        if !bytes.is_power_of_two() {
            return Err(ParamError::InvalidDeclaration {
                name: c.name.clone(),
                reason: format!("host alignment {} is not a power of two", bytes),
            });
        }
        c.state.write().host_alignment = bytes;
        Ok(())
    }

    // ── Scalar range ──

    pub fn set_min_value(&mut self, e: impl Into<Expr>) -> Result<(), ParamError> {
        let e = e.into();
        let c = self.check_is_scalar()?;
        Self::check_expr_type(c, "min value", &e)?;
        c.state.write().min_value = e;
        Ok(())
    }

    pub fn get_min_value(&self) -> Result<Expr, ParamError> {
        Ok(self.check_is_scalar()?.state.read().min_value.clone())
    }

    pub fn set_max_value(&mut self, e: impl Into<Expr>) -> Result<(), ParamError> {
        let e = e.into();
        let c = self.check_is_scalar()?;
        Self::check_expr_type(c, "max value", &e)?;
        c.state.write().max_value = e;
        Ok(())
    }

    pub fn get_max_value(&self) -> Result<Expr, ParamError> {
        Ok(self.check_is_scalar()?.state.read().max_value.clone())
    }

    pub fn set_estimate(&mut self, e: impl Into<Expr>) -> Result<(), ParamError> {
        let e = e.into();
        let c = self.check_is_scalar()?;
        Self::check_expr_type(c, "estimate", &e)?;
        c.state.write().estimate = e;
        Ok(())
    }

    pub fn get_estimate(&self) -> Result<Expr, ParamError> {
        Ok(self.check_is_scalar()?.state.read().estimate.clone())
    }

    // ── Views ──

    /// Read one axis of a handle already known to be a buffer with `dim` in
    /// range. Used by the dimension views, which validate on creation.
    pub(crate) fn constraint_or_default(&self, dim: usize, f: impl FnOnce(&BufferConstraint) -> Expr) -> Expr {
        self.contents
            .as_deref()
            .and_then(|c| c.state.read().constraints.get(dim).map(f))
            .unwrap_or_default()
    }

    /// Write one axis of a handle already known to be a buffer with `dim`
    /// in range.
    pub(crate) fn update_constraint(&self, dim: usize, f: impl FnOnce(&mut BufferConstraint)) {
        if let Some(c) = self.contents.as_deref() {
            if let Some(k) = c.state.write().constraints.get_mut(dim) {
                f(k);
            }
        }
    }

    /// Validate that `dim` is an axis of this buffer parameter.
    pub(crate) fn validate_dim(&self, dim: usize) -> Result<(), ParamError> {
        self.check_dim_ok(dim).map(|_| ())
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.contents.as_deref() {
            Some(c) => f
                .debug_struct("Parameter")
                .field("name", &c.name)
                .field("ty", &c.ty)
                .field("is_buffer", &c.is_buffer)
                .field("dimensions", &c.dimensions)
                .finish(),
            None => write!(f, "Parameter(<undefined>)"),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
