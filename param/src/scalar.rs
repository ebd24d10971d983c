// scalar.rs — Live scalar values
//
// `ScalarValue` is the tagged union a scalar parameter's live binding can
// hold; `ScalarType` ties each Rust scalar type to its element `Type`.
// Values are stored in a 64-bit slot using the native in-memory layout of the
// element, so compiled code reading the slot address as `T*` sees the value.
//
// Preconditions: none.
// Postconditions: `from_bits(v.ty(), v.to_bits()) == Some(v)` for every value.
// Failure modes: element types wider than 64 bits, vector types and float16
//   have no scalar representation (`zero` returns `None`).
// Side effects: none.

use std::fmt;

use crate::expr::Expr;
use crate::types::{Type, TypeCode};

/// A concrete scalar value tagged with its element type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    /// Opaque pointer-like value, carried as its 64-bit representation.
    Handle(u64),
}

fn take<const N: usize>(bytes: &[u8; 8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn put(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_ne_bytes(buf)
}

impl ScalarValue {
    /// The zero value of `ty`, or `None` if `ty` has no scalar representation.
    pub fn zero(ty: Type) -> Option<Self> {
        Self::from_bits(ty, 0)
    }

    pub fn ty(&self) -> Type {
        match self {
            ScalarValue::Bool(_) => Type::bool(),
            ScalarValue::Int8(_) => Type::int(8),
            ScalarValue::Int16(_) => Type::int(16),
            ScalarValue::Int32(_) => Type::int(32),
            ScalarValue::Int64(_) => Type::int(64),
            ScalarValue::UInt8(_) => Type::uint(8),
            ScalarValue::UInt16(_) => Type::uint(16),
            ScalarValue::UInt32(_) => Type::uint(32),
            ScalarValue::UInt64(_) => Type::uint(64),
            ScalarValue::Float32(_) => Type::float(32),
            ScalarValue::Float64(_) => Type::float(64),
            ScalarValue::Handle(_) => Type::handle(),
        }
    }

    /// Slot encoding: the element's native bytes in the low addresses.
    pub fn to_bits(&self) -> u64 {
        match *self {
            ScalarValue::Bool(v) => put(&[v as u8]),
            ScalarValue::Int8(v) => put(&v.to_ne_bytes()),
            ScalarValue::Int16(v) => put(&v.to_ne_bytes()),
            ScalarValue::Int32(v) => put(&v.to_ne_bytes()),
            ScalarValue::Int64(v) => put(&v.to_ne_bytes()),
            ScalarValue::UInt8(v) => put(&v.to_ne_bytes()),
            ScalarValue::UInt16(v) => put(&v.to_ne_bytes()),
            ScalarValue::UInt32(v) => put(&v.to_ne_bytes()),
            ScalarValue::UInt64(v) | ScalarValue::Handle(v) => v,
            ScalarValue::Float32(v) => put(&v.to_ne_bytes()),
            ScalarValue::Float64(v) => put(&v.to_ne_bytes()),
        }
    }

    /// Decode a slot holding a value of type `ty`.
    pub fn from_bits(ty: Type, bits: u64) -> Option<Self> {
        if !ty.is_scalar() {
            return None;
        }
        let b = bits.to_ne_bytes();
        let value = match (ty.code(), ty.bits()) {
            (TypeCode::UInt, 1) => ScalarValue::Bool(b[0] != 0),
            (TypeCode::Int, 8) => ScalarValue::Int8(i8::from_ne_bytes(take(&b))),
            (TypeCode::Int, 16) => ScalarValue::Int16(i16::from_ne_bytes(take(&b))),
            (TypeCode::Int, 32) => ScalarValue::Int32(i32::from_ne_bytes(take(&b))),
            (TypeCode::Int, 64) => ScalarValue::Int64(i64::from_ne_bytes(b)),
            (TypeCode::UInt, 8) => ScalarValue::UInt8(b[0]),
            (TypeCode::UInt, 16) => ScalarValue::UInt16(u16::from_ne_bytes(take(&b))),
            (TypeCode::UInt, 32) => ScalarValue::UInt32(u32::from_ne_bytes(take(&b))),
            (TypeCode::UInt, 64) => ScalarValue::UInt64(bits),
            (TypeCode::Float, 32) => ScalarValue::Float32(f32::from_ne_bytes(take(&b))),
            (TypeCode::Float, 64) => ScalarValue::Float64(f64::from_ne_bytes(b)),
            (TypeCode::Handle, 64) => ScalarValue::Handle(bits),
            _ => return None,
        };
        Some(value)
    }

    /// Convert an integer literal to a value of type `ty`. Integer targets
    /// take it exactly or not at all; float targets round to nearest.
    pub fn from_int(ty: Type, v: i128) -> Option<Self> {
        let value = match Self::zero(ty)? {
            ScalarValue::Bool(_) if v == 0 || v == 1 => ScalarValue::Bool(v != 0),
            ScalarValue::Int8(_) => ScalarValue::Int8(i8::try_from(v).ok()?),
            ScalarValue::Int16(_) => ScalarValue::Int16(i16::try_from(v).ok()?),
            ScalarValue::Int32(_) => ScalarValue::Int32(i32::try_from(v).ok()?),
            ScalarValue::Int64(_) => ScalarValue::Int64(i64::try_from(v).ok()?),
            ScalarValue::UInt8(_) => ScalarValue::UInt8(u8::try_from(v).ok()?),
            ScalarValue::UInt16(_) => ScalarValue::UInt16(u16::try_from(v).ok()?),
            ScalarValue::UInt32(_) => ScalarValue::UInt32(u32::try_from(v).ok()?),
            ScalarValue::UInt64(_) => ScalarValue::UInt64(u64::try_from(v).ok()?),
            ScalarValue::Float32(_) => ScalarValue::Float32(v as f32),
            ScalarValue::Float64(_) => ScalarValue::Float64(v as f64),
            _ => return None,
        };
        Some(value)
    }

    /// Convert a floating-point literal to a value of type `ty`. Integer
    /// targets reject fractional, non-finite or out-of-range input; handles
    /// are never literal.
    pub fn from_f64(ty: Type, v: f64) -> Option<Self> {
        match Self::zero(ty)? {
            ScalarValue::Float32(_) => Some(ScalarValue::Float32(v as f32)),
            ScalarValue::Float64(_) => Some(ScalarValue::Float64(v)),
            ScalarValue::Handle(_) => None,
            _ => {
                // 2^127 bounds every supported integer type, so the cast to
                // i128 is exact and `from_int` does the range check.
                if !v.is_finite() || v.fract() != 0.0 || v.abs() >= 2f64.powi(127) {
                    return None;
                }
                Self::from_int(ty, v as i128)
            }
        }
    }

    /// A literal expression holding this value. Handles become `uint64`
    /// literals of their bit pattern.
    pub fn to_expr(&self) -> Expr {
        let ty = self.ty();
        match *self {
            ScalarValue::Bool(v) => Expr::uint_of(ty, v as u64),
            ScalarValue::Int8(v) => Expr::int_of(ty, v as i64),
            ScalarValue::Int16(v) => Expr::int_of(ty, v as i64),
            ScalarValue::Int32(v) => Expr::int_of(ty, v as i64),
            ScalarValue::Int64(v) => Expr::int_of(ty, v),
            ScalarValue::UInt8(v) => Expr::uint_of(ty, v as u64),
            ScalarValue::UInt16(v) => Expr::uint_of(ty, v as u64),
            ScalarValue::UInt32(v) => Expr::uint_of(ty, v as u64),
            ScalarValue::UInt64(v) => Expr::uint_of(ty, v),
            ScalarValue::Float32(v) => Expr::float_of(ty, v as f64),
            ScalarValue::Float64(v) => Expr::float_of(ty, v),
            ScalarValue::Handle(v) => Expr::uint_of(Type::uint(64), v),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(v) => write!(f, "{}", v),
            ScalarValue::Int8(v) => write!(f, "{}", v),
            ScalarValue::Int16(v) => write!(f, "{}", v),
            ScalarValue::Int32(v) => write!(f, "{}", v),
            ScalarValue::Int64(v) => write!(f, "{}", v),
            ScalarValue::UInt8(v) => write!(f, "{}", v),
            ScalarValue::UInt16(v) => write!(f, "{}", v),
            ScalarValue::UInt32(v) => write!(f, "{}", v),
            ScalarValue::UInt64(v) => write!(f, "{}", v),
            ScalarValue::Float32(v) => write!(f, "{}", v),
            ScalarValue::Float64(v) => write!(f, "{}", v),
            ScalarValue::Handle(v) => write!(f, "{:#x}", v),
        }
    }
}

// ── Rust scalar types ───────────────────────────────────────────────────────

/// A Rust type usable with `Parameter::get_scalar` / `set_scalar`.
pub trait ScalarType: Copy + fmt::Debug + Send + Sync + 'static {
    /// The element type this Rust type corresponds to.
    const TYPE: Type;

    fn into_value(self) -> ScalarValue;

    fn from_value(value: ScalarValue) -> Option<Self>;
}

macro_rules! scalar_type {
    ($rust:ty, $variant:ident, $ty:expr) => {
        impl ScalarType for $rust {
            const TYPE: Type = $ty;

            fn into_value(self) -> ScalarValue {
                ScalarValue::$variant(self)
            }

            fn from_value(value: ScalarValue) -> Option<Self> {
                match value {
                    ScalarValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

scalar_type!(bool, Bool, Type::bool());
scalar_type!(i8, Int8, Type::int(8));
scalar_type!(i16, Int16, Type::int(16));
scalar_type!(i32, Int32, Type::int(32));
scalar_type!(i64, Int64, Type::int(64));
scalar_type!(u8, UInt8, Type::uint(8));
scalar_type!(u16, UInt16, Type::uint(16));
scalar_type!(u32, UInt32, Type::uint(32));
scalar_type!(u64, UInt64, Type::uint(64));
scalar_type!(f32, Float32, Type::float(32));
scalar_type!(f64, Float64, Type::float(64));
