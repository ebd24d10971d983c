// error.rs — Contract violations
//
// Every precondition a parameter operation states is checked at the call
// site and reported as a `ParamError`. These are programmer errors: there is
// no retry, and the failing operation leaves the parameter unchanged.
//
// Preconditions: none (types only).
// Postconditions: each message names the parameter (when it has one) and
//   the expected vs. actual type, kind or range.
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::types::Type;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    pub const UNDEFINED: DiagCode = DiagCode("E0100");
    pub const NOT_A_BUFFER: DiagCode = DiagCode("E0101");
    pub const NOT_A_SCALAR: DiagCode = DiagCode("E0102");
    pub const DIM_OUT_OF_RANGE: DiagCode = DiagCode("E0103");
    pub const SCALAR_TYPE_MISMATCH: DiagCode = DiagCode("E0104");
    pub const NOT_A_HANDLE: DiagCode = DiagCode("E0105");
    pub const EXPR_TYPE_MISMATCH: DiagCode = DiagCode("E0106");
    pub const BUFFER_MISMATCH: DiagCode = DiagCode("E0107");
    pub const INVALID_DECLARATION: DiagCode = DiagCode("E0108");
    pub const CALL_ARITY: DiagCode = DiagCode("E0110");
    pub const UNDEFINED_CALL_ARG: DiagCode = DiagCode("E0111");
    pub const IMPLICIT_CAST: DiagCode = DiagCode("E0112");
}

// ── Error ────────────────────────────────────────────────────────────────

/// A violated parameter contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("Parameter is undefined")]
    Undefined,

    #[error("Parameter {name} is not a Buffer")]
    NotABuffer { name: String },

    #[error("Parameter {name} is a Buffer, not a scalar")]
    NotAScalar { name: String },

    #[error("Dimension {dim} of Parameter {name} is not in the range [0, {dimensions})")]
    DimensionOutOfRange {
        name: String,
        dim: usize,
        dimensions: usize,
    },

    #[error("Can't access Param<{declared}> {name} as scalar of type {requested}")]
    ScalarTypeMismatch {
        name: String,
        declared: Type,
        requested: Type,
    },

    #[error("Parameter {name} of type {declared} is not a handle")]
    NotAHandle { name: String, declared: Type },

    #[error("Can't set {what} of Parameter {name} of type {declared} to an expression of type {actual}")]
    ExprTypeMismatch {
        name: String,
        what: &'static str,
        declared: Type,
        actual: String,
    },

    #[error("Can't bind Parameter {name} ({expected}) to Buffer {buffer} ({actual})")]
    BufferMismatch {
        name: String,
        buffer: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid declaration of Parameter {name}: {reason}")]
    InvalidDeclaration { name: String, reason: String },

    #[error("{args}-argument call to \"{name}\", which has {dims} dimensions")]
    CallArity { name: String, args: usize, dims: usize },

    #[error("Argument {index} to call to \"{name}\" is an undefined Expr")]
    UndefinedCallArg { name: String, index: usize },

    #[error("Implicit cast from {from} to int in argument {index} in call to \"{name}\" is not allowed; use an explicit cast")]
    ImplicitCast { name: String, index: usize, from: Type },
}

impl ParamError {
    /// The stable diagnostic code for this violation.
    pub fn code(&self) -> DiagCode {
        match self {
            ParamError::Undefined => codes::UNDEFINED,
            ParamError::NotABuffer { .. } => codes::NOT_A_BUFFER,
            ParamError::NotAScalar { .. } => codes::NOT_A_SCALAR,
            ParamError::DimensionOutOfRange { .. } => codes::DIM_OUT_OF_RANGE,
            ParamError::ScalarTypeMismatch { .. } => codes::SCALAR_TYPE_MISMATCH,
            ParamError::NotAHandle { .. } => codes::NOT_A_HANDLE,
            ParamError::ExprTypeMismatch { .. } => codes::EXPR_TYPE_MISMATCH,
            ParamError::BufferMismatch { .. } => codes::BUFFER_MISMATCH,
            ParamError::InvalidDeclaration { .. } => codes::INVALID_DECLARATION,
            ParamError::CallArity { .. } => codes::CALL_ARITY,
            ParamError::UndefinedCallArg { .. } => codes::UNDEFINED_CALL_ARG,
            ParamError::ImplicitCast { .. } => codes::IMPLICIT_CAST,
        }
    }

    /// `error[E0104]: ...` rendering used by the CLI.
    pub fn render(&self) -> String {
        format!("error[{}]: {}", self.code(), self)
    }
}
