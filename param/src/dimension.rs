// dimension.rs — Per-axis views of a buffer parameter
//
// `DimensionRef` reads and `Dimension` reads and writes the constraint table
// of one axis of a buffer parameter. Neither holds state of its own: both
// carry a handle to the parameter and an axis index, so every view over the
// same axis sees every write immediately.
//
// Views are created only through `DimensionedParameter::dim` (read-only) and
// `DimensionedParameter::dim_mut` (mutable), which validate the axis once.
// A read-only view can only navigate to other read-only views.

use std::ops::Deref;

use crate::error::ParamError;
use crate::expr::Expr;
use crate::parameter::Parameter;

/// Read-only view of one axis of a buffer parameter.
#[derive(Debug, Clone)]
pub struct DimensionRef {
    param: Parameter,
    d: usize,
}

impl DimensionRef {
    pub(crate) fn new(param: Parameter, d: usize) -> Result<Self, ParamError> {
        param.validate_dim(d)?;
        Ok(DimensionRef { param, d })
    }

    /// Axis index.
    pub fn index(&self) -> usize {
        self.d
    }

    /// The parameter this axis belongs to.
    pub fn parameter(&self) -> &Parameter {
        &self.param
    }

    /// Declared minimum coordinate; undefined if never set.
    pub fn min(&self) -> Expr {
        self.param.constraint_or_default(self.d, |k| k.min.clone())
    }

    /// Declared extent; undefined if never set.
    pub fn extent(&self) -> Expr {
        self.param.constraint_or_default(self.d, |k| k.extent.clone())
    }

    /// `min + extent - 1`, derived from the current min and extent on every
    /// call. Undefined unless both are set.
    pub fn max(&self) -> Expr {
        self.min() + self.extent() - 1
    }

    /// Declared stride; undefined if never set.
    pub fn stride(&self) -> Expr {
        self.param.constraint_or_default(self.d, |k| k.stride.clone())
    }

    /// Estimated minimum, used only by auto-scheduling. Undefined if never set.
    pub fn min_estimate(&self) -> Expr {
        self.param.constraint_or_default(self.d, |k| k.min_estimate.clone())
    }

    /// Estimated extent, used only by auto-scheduling. Undefined if never set.
    pub fn extent_estimate(&self) -> Expr {
        self.param.constraint_or_default(self.d, |k| k.extent_estimate.clone())
    }

    /// Another axis of the same parameter.
    pub fn dim(&self, i: usize) -> Result<DimensionRef, ParamError> {
        DimensionRef::new(self.param.clone(), i)
    }
}

/// Mutable view of one axis of a buffer parameter.
///
/// Setters consume and return the view so calls chain, including across
/// axes:
///
/// ```
/// use pparam::{DimensionedParameter, Parameter, Type};
///
/// let mut im = Parameter::buffer(Type::uint(8), 3, "im").unwrap();
/// im.dim_mut(0).unwrap()
///     .set_bounds(0, 640)
///     .set_stride(1)
///     .dim(2).unwrap()
///     .set_extent(3);
/// assert_eq!(im.dim(2).unwrap().extent().as_int(), Some(3));
/// ```
#[derive(Debug)]
pub struct Dimension {
    view: DimensionRef,
}

impl Dimension {
    pub(crate) fn new(param: Parameter, d: usize) -> Result<Self, ParamError> {
        Ok(Dimension {
            view: DimensionRef::new(param, d)?,
        })
    }

    fn update(self, f: impl FnOnce(&mut crate::parameter::BufferConstraint)) -> Self {
        self.view.param.update_constraint(self.view.d, f);
        self
    }

    /// Constrain the minimum coordinate. An integer literal also becomes
    /// the min estimate.
    pub fn set_min(self, e: impl Into<Expr>) -> Self {
        let e = e.into();
        let propagate = e.as_int().is_some();
        self.update(|k| {
            if propagate {
                k.min_estimate = e.clone();
            }
            k.min = e;
        })
    }

    /// Constrain the extent. Buffers that violate it are rejected at run
    /// time. An integer literal also becomes the extent estimate.
    pub fn set_extent(self, e: impl Into<Expr>) -> Self {
        let e = e.into();
        let propagate = e.as_int().is_some();
        self.update(|k| {
            if propagate {
                k.extent_estimate = e.clone();
            }
            k.extent = e;
        })
    }

    /// Constrain the stride. Known strides on the innermost axis let the
    /// code generator emit dense vector loads.
    pub fn set_stride(self, e: impl Into<Expr>) -> Self {
        let e = e.into();
        self.update(|k| k.stride = e)
    }

    pub fn set_bounds(self, min: impl Into<Expr>, extent: impl Into<Expr>) -> Self {
        self.set_min(min).set_extent(extent)
    }

    pub fn set_min_estimate(self, e: impl Into<Expr>) -> Self {
        let e = e.into();
        self.update(|k| k.min_estimate = e)
    }

    pub fn set_extent_estimate(self, e: impl Into<Expr>) -> Self {
        let e = e.into();
        self.update(|k| k.extent_estimate = e)
    }

    pub fn set_bounds_estimate(self, min: impl Into<Expr>, extent: impl Into<Expr>) -> Self {
        self.set_min_estimate(min).set_extent_estimate(extent)
    }

    /// Another axis of the same parameter, still mutable.
    pub fn dim(self, i: usize) -> Result<Dimension, ParamError> {
        Dimension::new(self.view.param, i)
    }
}

impl Deref for Dimension {
    type Target = DimensionRef;

    fn deref(&self) -> &DimensionRef {
        &self.view
    }
}
