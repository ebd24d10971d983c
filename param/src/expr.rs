// expr.rs — Symbolic expression handle
//
// Shared, immutable expression trees used for every constraint, estimate and
// scalar bound. The parameter model only stores and retrieves expressions,
// synthesizes literals from live scalar values, and composes `min + extent - 1`
// for dimension maxima; simplification and type rules live elsewhere.
//
// Preconditions: none.
// Postconditions: equality is structural; `same_as` is node identity.
// Failure modes: arithmetic over an undefined operand yields an undefined
//   expression rather than an error.
// Side effects: none.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

use crate::types::Type;

/// A possibly-undefined, cheaply clonable expression handle.
#[derive(Clone, Default)]
pub struct Expr(Option<Arc<ExprNode>>);

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    IntImm { ty: Type, value: i64 },
    UIntImm { ty: Type, value: u64 },
    FloatImm { ty: Type, value: f64 },
    Variable { ty: Type, name: String },
    Cast { ty: Type, value: Expr },
    Add(Expr, Expr),
    Sub(Expr, Expr),
    Mul(Expr, Expr),
    Div(Expr, Expr),
}

impl Expr {
    fn from_node(node: ExprNode) -> Self {
        Expr(Some(Arc::new(node)))
    }

    /// The undefined expression.
    pub fn undefined() -> Self {
        Expr(None)
    }

    /// `int32` literal.
    pub fn int(value: i32) -> Self {
        Self::int_of(Type::int(32), value as i64)
    }

    pub fn int_of(ty: Type, value: i64) -> Self {
        Self::from_node(ExprNode::IntImm { ty, value })
    }

    pub fn uint_of(ty: Type, value: u64) -> Self {
        Self::from_node(ExprNode::UIntImm { ty, value })
    }

    pub fn float_of(ty: Type, value: f64) -> Self {
        Self::from_node(ExprNode::FloatImm { ty, value })
    }

    /// `int32` variable.
    pub fn var(name: impl Into<String>) -> Self {
        Self::var_of(Type::int(32), name)
    }

    pub fn var_of(ty: Type, name: impl Into<String>) -> Self {
        Self::from_node(ExprNode::Variable {
            ty,
            name: name.into(),
        })
    }

    pub fn cast(ty: Type, value: Expr) -> Self {
        if !value.defined() {
            return Expr::undefined();
        }
        Self::from_node(ExprNode::Cast { ty, value })
    }

    /// A literal of type `ty` holding `value`, as used for the right-hand
    /// side of `e + 1` style arithmetic.
    pub fn const_like(ty: Type, value: i64) -> Self {
        if ty.is_float() {
            Self::float_of(ty, value as f64)
        } else if ty.is_uint() || ty.is_handle() {
            Self::uint_of(ty, value as u64)
        } else {
            Self::int_of(ty, value)
        }
    }

    pub fn defined(&self) -> bool {
        self.0.is_some()
    }

    /// True iff both handles point at the same node (or both are undefined).
    pub fn same_as(&self, other: &Expr) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    pub fn node(&self) -> Option<&ExprNode> {
        self.0.as_deref()
    }

    /// Result type. Binary nodes take the type of their left operand.
    pub fn ty(&self) -> Option<Type> {
        match self.node()? {
            ExprNode::IntImm { ty, .. }
            | ExprNode::UIntImm { ty, .. }
            | ExprNode::FloatImm { ty, .. }
            | ExprNode::Variable { ty, .. }
            | ExprNode::Cast { ty, .. } => Some(*ty),
            ExprNode::Add(a, _) | ExprNode::Sub(a, _) | ExprNode::Mul(a, _) | ExprNode::Div(a, _) => {
                a.ty()
            }
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.node()? {
            ExprNode::IntImm { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self.node()? {
            ExprNode::UIntImm { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.node()? {
            ExprNode::FloatImm { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self.node(),
            Some(ExprNode::IntImm { .. } | ExprNode::UIntImm { .. } | ExprNode::FloatImm { .. })
        )
    }

    fn binary(a: Expr, b: Expr, make: fn(Expr, Expr) -> ExprNode) -> Expr {
        if !a.defined() || !b.defined() {
            return Expr::undefined();
        }
        Self::from_node(make(a, b))
    }

    fn binary_const(a: Expr, b: i32, make: fn(Expr, Expr) -> ExprNode) -> Expr {
        match a.ty() {
            Some(ty) => {
                let rhs = Expr::const_like(ty, b as i64);
                Self::from_node(make(a, rhs))
            }
            None => Expr::undefined(),
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || **a == **b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::int(value)
    }
}

impl From<f32> for Expr {
    fn from(value: f32) -> Self {
        Expr::float_of(Type::float(32), value as f64)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::float_of(Type::float(64), value)
    }
}

macro_rules! impl_arith {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl $trait<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary(self, rhs, ExprNode::$variant)
            }
        }

        impl $trait<i32> for Expr {
            type Output = Expr;
            fn $method(self, rhs: i32) -> Expr {
                Expr::binary_const(self, rhs, ExprNode::$variant)
            }
        }
    };
}

impl_arith!(Add, add, Add);
impl_arith!(Sub, sub, Sub);
impl_arith!(Mul, mul, Mul);
impl_arith!(Div, div, Div);

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(node) = self.node() else {
            return write!(f, "<undefined>");
        };
        match node {
            ExprNode::IntImm { ty, value } if *ty == Type::int(32) => write!(f, "{}", value),
            ExprNode::IntImm { ty, value } => write!(f, "({}){}", ty, value),
            ExprNode::UIntImm { ty, value } => write!(f, "({}){}", ty, value),
            ExprNode::FloatImm { ty, value } if *ty == Type::float(32) => write!(f, "{}f", value),
            ExprNode::FloatImm { ty, value } => write!(f, "({}){}", ty, value),
            ExprNode::Variable { name, .. } => write!(f, "{}", name),
            ExprNode::Cast { ty, value } => write!(f, "{}({})", ty, value),
            ExprNode::Add(a, b) => write!(f, "({} + {})", a, b),
            ExprNode::Sub(a, b) => write!(f, "({} - {})", a, b),
            ExprNode::Mul(a, b) => write!(f, "({}*{})", a, b),
            ExprNode::Div(a, b) => write!(f, "({}/{})", a, b),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({})", self)
    }
}
