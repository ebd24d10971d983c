// dimensioned.rs — Buffer-shaped parameter capability
//
// Anything that owns a buffer parameter (image inputs, generator inputs and
// outputs) implements `DimensionedParameter` by returning that parameter;
// axis access and image geometry come for free. Geometry follows the image
// convention (axis 0 horizontal, axis 1 vertical, axis 2 channels); higher
// dimensional callers use `dim(i)` directly.
//
// Also hosts the two explicit conversions handed to the extern-call and
// reduction-domain subsystems, and the coordinate check for calls into a
// dimensioned input.

use crate::buffer::Buffer;
use crate::dimension::{Dimension, DimensionRef};
use crate::error::ParamError;
use crate::expr::{Expr, ExprNode};
use crate::parameter::Parameter;
use crate::types::Type;

/// An entity backed by one buffer parameter.
pub trait DimensionedParameter {
    /// The backing parameter.
    fn parameter(&self) -> Parameter;

    /// Read-only view of axis `i`.
    fn dim(&self, i: usize) -> Result<DimensionRef, ParamError> {
        DimensionRef::new(self.parameter(), i)
    }

    /// Mutable view of axis `i`, for declaring constraints.
    fn dim_mut(&mut self, i: usize) -> Result<Dimension, ParamError> {
        Dimension::new(self.parameter(), i)
    }

    fn dimensions(&self) -> Result<usize, ParamError> {
        self.parameter().dimensions()
    }

    /// Promised host pointer alignment in bytes.
    fn host_alignment(&self) -> Result<usize, ParamError> {
        self.parameter().host_alignment()
    }

    fn set_host_alignment(&mut self, bytes: usize) -> Result<&mut Self, ParamError>
    where
        Self: Sized,
    {
        self.parameter().set_host_alignment(bytes)?;
        Ok(self)
    }

    /// Minimum coordinate of axis 0.
    fn left(&self) -> Result<Expr, ParamError> {
        Ok(self.dim(0)?.min())
    }

    /// Maximum coordinate of axis 0.
    fn right(&self) -> Result<Expr, ParamError> {
        Ok(self.dim(0)?.max())
    }

    /// Minimum coordinate of axis 1.
    fn top(&self) -> Result<Expr, ParamError> {
        Ok(self.dim(1)?.min())
    }

    /// Maximum coordinate of axis 1.
    fn bottom(&self) -> Result<Expr, ParamError> {
        Ok(self.dim(1)?.max())
    }

    fn width(&self) -> Result<Expr, ParamError> {
        Ok(self.dim(0)?.extent())
    }

    fn height(&self) -> Result<Expr, ParamError> {
        Ok(self.dim(1)?.extent())
    }

    fn channels(&self) -> Result<Expr, ParamError> {
        Ok(self.dim(2)?.extent())
    }

    /// Pass this input to an extern stage.
    fn to_call_argument(&self) -> CallArgument {
        CallArgument::Parameter(self.parameter())
    }

    /// Use this input as the domain of a reduction.
    fn to_range_domain(&self) -> RangeDomainInput {
        RangeDomainInput {
            param: self.parameter(),
        }
    }
}

impl DimensionedParameter for Parameter {
    fn parameter(&self) -> Parameter {
        self.clone()
    }
}

// ── Adaptation tokens ───────────────────────────────────────────────────────

/// An argument to an extern stage. Interpreted by the extern-call lowering.
#[derive(Debug, Clone)]
pub enum CallArgument {
    Expr(Expr),
    Buffer(Buffer),
    Parameter(Parameter),
}

impl CallArgument {
    pub fn is_expr(&self) -> bool {
        matches!(self, CallArgument::Expr(_))
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, CallArgument::Buffer(_))
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, CallArgument::Parameter(_))
    }

    pub fn defined(&self) -> bool {
        match self {
            CallArgument::Expr(e) => e.defined(),
            CallArgument::Buffer(b) => b.defined(),
            CallArgument::Parameter(p) => p.defined(),
        }
    }
}

impl From<Expr> for CallArgument {
    fn from(e: Expr) -> Self {
        CallArgument::Expr(e)
    }
}

impl From<Buffer> for CallArgument {
    fn from(b: Buffer) -> Self {
        CallArgument::Buffer(b)
    }
}

/// A buffer input used as a reduction domain. Interpreted by the reduction
/// domain subsystem.
#[derive(Debug, Clone)]
pub struct RangeDomainInput {
    param: Parameter,
}

impl RangeDomainInput {
    pub fn parameter(&self) -> &Parameter {
        &self.param
    }
}

impl DimensionedParameter for RangeDomainInput {
    fn parameter(&self) -> Parameter {
        self.param.clone()
    }
}

// ── Call coordinates ────────────────────────────────────────────────────────

/// Validate the coordinates of a call into `name`, which has `dims`
/// dimensions. Coordinates must be defined and integer-typed; those that
/// widen losslessly to `int32` are wrapped in a cast.
pub fn check_call_arg_types(name: &str, args: &mut [Expr], dims: usize) -> Result<(), ParamError> {
    if args.len() != dims {
        return Err(ParamError::CallArity {
            name: name.to_string(),
            args: args.len(),
            dims,
        });
    }
    for (index, arg) in args.iter_mut().enumerate() {
        let Some(t) = arg.ty() else {
            return Err(ParamError::UndefinedCallArg {
                name: name.to_string(),
                index,
            });
        };
        let lossy = t.is_float()
            || t.is_handle()
            || (t.is_uint() && t.bits() >= 32)
            || (t.is_int() && t.bits() > 32);
        if lossy {
            return Err(ParamError::ImplicitCast {
                name: name.to_string(),
                index,
                from: t,
            });
        }
        if t != Type::int(32) {
            *arg = Expr::cast(Type::int(32), arg.clone());
        }
    }
    Ok(())
}

/// True iff `e` is an `int32` coordinate produced by `check_call_arg_types`.
pub fn is_widened_coordinate(e: &Expr) -> bool {
    matches!(e.node(), Some(ExprNode::Cast { ty, .. }) if *ty == Type::int(32))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An image input that owns its parameter.
    struct ImageInput {
        param: Parameter,
    }

    impl ImageInput {
        fn new(name: &str) -> Self {
            ImageInput {
                param: Parameter::buffer(Type::uint(8), 3, name).unwrap(),
            }
        }
    }

    impl DimensionedParameter for ImageInput {
        fn parameter(&self) -> Parameter {
            self.param.clone()
        }
    }

    #[test]
    fn geometry_conventions() {
        let mut im = ImageInput::new("im");
        im.dim_mut(0).unwrap().set_bounds(0, 640);
        im.dim_mut(1).unwrap().set_bounds(10, 480);
        im.dim_mut(2).unwrap().set_extent(3);

        assert_eq!(im.left().unwrap(), Expr::int(0));
        assert_eq!(im.right().unwrap(), Expr::int(0) + Expr::int(640) - 1);
        assert_eq!(im.top().unwrap(), Expr::int(10));
        assert_eq!(im.bottom().unwrap(), Expr::int(10) + Expr::int(480) - 1);
        assert_eq!(im.width().unwrap(), Expr::int(640));
        assert_eq!(im.height().unwrap(), Expr::int(480));
        assert_eq!(im.channels().unwrap(), Expr::int(3));
        assert_eq!(im.dimensions().unwrap(), 3);
    }

    #[test]
    fn geometry_needs_enough_axes() {
        let p = Parameter::buffer(Type::float(32), 1, "line").unwrap();
        assert!(p.width().is_ok());
        assert!(matches!(
            p.height(),
            Err(ParamError::DimensionOutOfRange { dim: 1, .. })
        ));
        assert!(p.channels().is_err());
    }

    #[test]
    fn host_alignment_chains() {
        let mut im = ImageInput::new("im");
        let width = im.set_host_alignment(32).unwrap().width().unwrap();
        assert!(!width.defined());
        assert_eq!(im.host_alignment().unwrap(), 32);
        assert_eq!(im.param.host_alignment().unwrap(), 32);
    }

    #[test]
    fn scalar_has_no_axes() {
        let s = Parameter::scalar(Type::int(32), "k").unwrap();
        assert!(matches!(s.dim(0), Err(ParamError::NotABuffer { .. })));
        assert!(matches!(s.width(), Err(ParamError::NotABuffer { .. })));
    }

    #[test]
    fn conversions_forward_the_parameter() {
        let im = ImageInput::new("im");
        match im.to_call_argument() {
            CallArgument::Parameter(p) => assert!(p.same_as(&im.param)),
            other => panic!("expected parameter argument, got {:?}", other),
        }
        let rdom = im.to_range_domain();
        assert!(rdom.parameter().same_as(&im.param));
        assert_eq!(rdom.dimensions().unwrap(), 3);
    }

    #[test]
    fn call_arguments() {
        let mut args = vec![Expr::var("x"), Expr::var_of(Type::uint(8), "c")];
        check_call_arg_types("im", &mut args, 2).unwrap();
        assert_eq!(args[0], Expr::var("x"));
        assert!(is_widened_coordinate(&args[1]));

        let mut wrong = vec![Expr::var("x")];
        assert!(matches!(
            check_call_arg_types("im", &mut wrong, 2),
            Err(ParamError::CallArity { args: 1, dims: 2, .. })
        ));

        let mut float = vec![Expr::from(0.5f32)];
        assert!(matches!(
            check_call_arg_types("im", &mut float, 1),
            Err(ParamError::ImplicitCast { index: 0, .. })
        ));

        let mut wide = vec![Expr::var_of(Type::uint(32), "u")];
        assert!(check_call_arg_types("im", &mut wide, 1).is_err());

        let mut undefined = vec![Expr::undefined()];
        assert!(matches!(
            check_call_arg_types("im", &mut undefined, 1),
            Err(ParamError::UndefinedCallArg { index: 0, .. })
        ));
    }
}
