// pparam — Pipeline parameter model
//
// Library root. Scalar and buffer inputs of a symbolically-described
// pipeline: constraint declaration for ahead-of-time builds and live value
// binding for immediate execution, behind one shared handle.

pub mod argument;
pub mod buffer;
pub mod config;
pub mod dimension;
pub mod dimensioned;
pub mod error;
pub mod expr;
pub mod parameter;
pub mod registry;
pub mod scalar;
pub mod types;

pub use buffer::{Buffer, ShapeError};
pub use dimension::{Dimension, DimensionRef};
pub use dimensioned::{CallArgument, DimensionedParameter, RangeDomainInput};
pub use error::ParamError;
pub use expr::Expr;
pub use parameter::{Parameter, ParameterBuilder};
pub use registry::InstanceRegistry;
pub use scalar::{ScalarType, ScalarValue};
pub use types::Type;
