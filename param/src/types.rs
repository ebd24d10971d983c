// types.rs — Element type descriptor
//
// Describes the element type of a parameter: a type code (signed int,
// unsigned int, float, opaque handle), a bit width, and a vector-lane count.
// Spellings follow the pipeline's surface syntax: `int32`, `uint8`, `bool`,
// `float32`, `handle`, with an optional `xN` lane suffix (`uint8x4`).
//
// Preconditions: none.
// Postconditions: `Display` and `FromStr` round-trip for every valid spelling.
// Failure modes: unknown spellings produce `ParseTypeError`.
// Side effects: none.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Element type family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
    /// Opaque pointer-like value. Always 64 bits wide.
    Handle,
}

/// Element type: code, bit width, lane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    code: TypeCode,
    bits: u8,
    lanes: u16,
}

impl Type {
    pub const fn new(code: TypeCode, bits: u8, lanes: u16) -> Self {
        Type { code, bits, lanes }
    }

    pub const fn int(bits: u8) -> Self {
        Self::new(TypeCode::Int, bits, 1)
    }

    pub const fn uint(bits: u8) -> Self {
        Self::new(TypeCode::UInt, bits, 1)
    }

    pub const fn float(bits: u8) -> Self {
        Self::new(TypeCode::Float, bits, 1)
    }

    pub const fn bool() -> Self {
        Self::uint(1)
    }

    pub const fn handle() -> Self {
        Self::new(TypeCode::Handle, 64, 1)
    }

    /// Same element type with a different lane count.
    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self::new(self.code, self.bits, lanes)
    }

    pub fn code(&self) -> TypeCode {
        self.code
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn lanes(&self) -> u16 {
        self.lanes
    }

    /// Bytes per lane, rounded up (`bool` occupies one byte).
    pub fn bytes(&self) -> usize {
        (self.bits as usize).div_ceil(8)
    }

    pub fn is_int(&self) -> bool {
        self.code == TypeCode::Int
    }

    pub fn is_uint(&self) -> bool {
        self.code == TypeCode::UInt
    }

    pub fn is_float(&self) -> bool {
        self.code == TypeCode::Float
    }

    pub fn is_handle(&self) -> bool {
        self.code == TypeCode::Handle
    }

    pub fn is_bool(&self) -> bool {
        self.code == TypeCode::UInt && self.bits == 1
    }

    pub fn is_scalar(&self) -> bool {
        self.lanes == 1
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            TypeCode::Int => write!(f, "int{}", self.bits)?,
            TypeCode::UInt if self.bits == 1 => write!(f, "bool")?,
            TypeCode::UInt => write!(f, "uint{}", self.bits)?,
            TypeCode::Float => write!(f, "float{}", self.bits)?,
            TypeCode::Handle => write!(f, "handle")?,
        }
        if self.lanes != 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}

/// Unrecognized type spelling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown element type: '{0}'")]
pub struct ParseTypeError(pub String);

impl FromStr for Type {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTypeError(s.to_string());
        let s = s.trim();

        // Lane suffix: the last 'x' followed only by digits.
        let (base, lanes) = match s.rfind('x') {
            Some(idx) if idx + 1 < s.len() && s[idx + 1..].bytes().all(|b| b.is_ascii_digit()) => {
                let lanes: u16 = s[idx + 1..].parse().map_err(|_| err())?;
                (&s[..idx], lanes)
            }
            _ => (s, 1),
        };
        if lanes == 0 {
            return Err(err());
        }

        let scalar = match base {
            "bool" => Type::bool(),
            "handle" => Type::handle(),
            _ => {
                let (code, digits) = if let Some(d) = base.strip_prefix("uint") {
                    (TypeCode::UInt, d)
                } else if let Some(d) = base.strip_prefix("int") {
                    (TypeCode::Int, d)
                } else if let Some(d) = base.strip_prefix("float") {
                    (TypeCode::Float, d)
                } else {
                    return Err(err());
                };
                let bits: u8 = digits.parse().map_err(|_| err())?;
                let valid = match code {
                    TypeCode::Int => matches!(bits, 8 | 16 | 32 | 64),
                    TypeCode::UInt => matches!(bits, 1 | 8 | 16 | 32 | 64),
                    TypeCode::Float => matches!(bits, 16 | 32 | 64),
                    TypeCode::Handle => false,
                };
                if !valid {
                    return Err(err());
                }
                Type::new(code, bits, 1)
            }
        };

        Ok(scalar.with_lanes(lanes))
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
