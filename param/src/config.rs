// config.rs — Parameter declaration files
//
// Loads a JSON description of a pipeline's inputs and builds the
// corresponding parameters. Constraint fields take an integer (an `int32`
// literal) or a string (an `int32` variable of that name); scalar range
// fields take a number (a literal of the parameter's type) or a string (a
// variable of the parameter's type). Integer literals convert exactly:
// a value that does not fit the parameter's integer type is an error.
//
// Example:
//
//   {"parameters": [
//     {"name": "input", "type": "uint8", "buffer": true, "dimensions": 3,
//      "dims": [{"min": 0, "extent": "width", "stride": 1}],
//      "host_alignment": 16},
//     {"name": "gain", "type": "float32", "value": 1.5,
//      "min_value": 0.0, "max_value": 4.0}
//   ]}
//
// Preconditions: none.
// Postconditions: one parameter per declaration, in file order.
// Failure modes: I/O, malformed JSON, unknown type spellings, invalid
//   literal values, and any parameter contract violation.
// Side effects: reads the declaration file; built parameters register with
//   the registry passed to `build`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::dimensioned::DimensionedParameter;
use crate::error::ParamError;
use crate::expr::Expr;
use crate::parameter::Parameter;
use crate::registry::InstanceRegistry;
use crate::scalar::ScalarValue;
use crate::types::Type;

/// Errors while loading or building declarations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed declaration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parameter '{name}': unknown type '{spelling}'")]
    UnknownType { name: String, spelling: String },

    #[error("parameter '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error(transparent)]
    Param(#[from] ParamError),
}

/// A literal or a variable name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExprSpec {
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Number(f64),
    Symbol(String),
}

impl fmt::Display for ExprSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprSpec::Int(v) => write!(f, "{}", v),
            ExprSpec::UInt(v) => write!(f, "{}", v),
            ExprSpec::Number(v) => write!(f, "{}", v),
            ExprSpec::Symbol(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimDecl {
    pub min: Option<ExprSpec>,
    pub extent: Option<ExprSpec>,
    pub stride: Option<ExprSpec>,
    pub min_estimate: Option<ExprSpec>,
    pub extent_estimate: Option<ExprSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub buffer: bool,
    #[serde(default)]
    pub dimensions: usize,
    #[serde(default)]
    pub dims: Vec<DimDecl>,
    pub host_alignment: Option<usize>,
    pub value: Option<ExprSpec>,
    pub min_value: Option<ExprSpec>,
    pub max_value: Option<ExprSpec>,
    pub estimate: Option<ExprSpec>,
    #[serde(default)]
    pub bound_before_lowering: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declarations {
    pub parameters: Vec<ParamDecl>,
}

impl Declarations {
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&source)
    }

    /// Build every declared parameter, registering each with `registry`
    /// when one is given.
    pub fn build(&self, registry: Option<&InstanceRegistry>) -> Result<Vec<Parameter>, ConfigError> {
        let params = self
            .parameters
            .iter()
            .map(|decl| decl.build(registry))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = params.len(), "built declared parameters");
        Ok(params)
    }
}

impl ParamDecl {
    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Dimension constraint: integers are `int32` literals.
    fn dim_expr(&self, spec: &ExprSpec) -> Result<Expr, ConfigError> {
        match spec {
            ExprSpec::Int(v) => i32::try_from(*v)
                .map(Expr::int)
                .map_err(|_| self.invalid(format!("{} does not fit in int32", v))),
            ExprSpec::UInt(v) => Err(self.invalid(format!("{} does not fit in int32", v))),
            ExprSpec::Number(v) => Err(self.invalid(format!("dimension bound {} is not an integer", v))),
            ExprSpec::Symbol(s) => Ok(Expr::var(s.as_str())),
        }
    }

    /// Scalar bound: literals take the parameter's own type.
    fn scalar_expr(&self, ty: Type, spec: &ExprSpec) -> Result<Expr, ConfigError> {
        match spec {
            ExprSpec::Symbol(s) => Ok(Expr::var_of(ty, s.as_str())),
            _ => Ok(self.scalar_value(ty, spec)?.to_expr()),
        }
    }

    fn scalar_value(&self, ty: Type, spec: &ExprSpec) -> Result<ScalarValue, ConfigError> {
        let value = match spec {
            ExprSpec::Int(v) => ScalarValue::from_int(ty, *v as i128),
            ExprSpec::UInt(v) => ScalarValue::from_int(ty, *v as i128),
            ExprSpec::Number(v) => ScalarValue::from_f64(ty, *v),
            ExprSpec::Symbol(s) => {
                return Err(self.invalid(format!("scalar value must be a number, found '{}'", s)))
            }
        };
        value.ok_or_else(|| self.invalid(format!("{} is not a valid {} value", spec, ty)))
    }

    pub fn build(&self, registry: Option<&InstanceRegistry>) -> Result<Parameter, ConfigError> {
        let ty: Type = self.ty.parse().map_err(|_| ConfigError::UnknownType {
            name: self.name.clone(),
            spelling: self.ty.clone(),
        })?;

        let mut builder = Parameter::builder(ty, self.buffer, self.dimensions)
            .with_name(self.name.as_str())
            .with_explicit_name(true)
            .bound_before_lowering(self.bound_before_lowering);
        if let Some(r) = registry {
            builder = builder.with_registry(r);
        }
        let mut p = builder.build()?;

        for (i, dim) in self.dims.iter().enumerate() {
            let mut view = p.dim_mut(i)?;
            if let Some(e) = &dim.min {
                view = view.set_min(self.dim_expr(e)?);
            }
            if let Some(e) = &dim.extent {
                view = view.set_extent(self.dim_expr(e)?);
            }
            if let Some(e) = &dim.stride {
                view = view.set_stride(self.dim_expr(e)?);
            }
            if let Some(e) = &dim.min_estimate {
                view = view.set_min_estimate(self.dim_expr(e)?);
            }
            if let Some(e) = &dim.extent_estimate {
                view.set_extent_estimate(self.dim_expr(e)?);
            }
        }

        if let Some(bytes) = self.host_alignment {
            p.set_host_alignment(bytes)?;
        }
        if let Some(v) = &self.value {
            p.set_scalar_value(self.scalar_value(ty, v)?)?;
        }
        if let Some(e) = &self.min_value {
            p.set_min_value(self.scalar_expr(ty, e)?)?;
        }
        if let Some(e) = &self.max_value {
            p.set_max_value(self.scalar_expr(ty, e)?)?;
        }
        if let Some(e) = &self.estimate {
            p.set_estimate(self.scalar_expr(ty, e)?)?;
        }

        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"{
        "parameters": [
            {"name": "input", "type": "uint8", "buffer": true, "dimensions": 3,
             "dims": [{"min": 0, "extent": "width", "stride": 1},
                      {"min": 0, "extent": 480, "extent_estimate": 1080}],
             "host_alignment": 16},
            {"name": "gain", "type": "float32", "value": 1.5,
             "min_value": 0.0, "max_value": 4, "estimate": "g"},
            {"name": "bits", "type": "int32", "value": 8, "bound_before_lowering": true}
        ]
    }"#;

    #[test]
    fn builds_declared_parameters() {
        let registry = InstanceRegistry::new();
        let params = Declarations::from_json(EXAMPLE)
            .unwrap()
            .build(Some(&registry))
            .unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(registry.len(), 3);

        let input = &params[0];
        assert_eq!(input.dimensions().unwrap(), 3);
        assert_eq!(input.host_alignment().unwrap(), 16);
        assert_eq!(input.dim(0).unwrap().extent(), Expr::var("width"));
        assert_eq!(input.dim(1).unwrap().extent_estimate().as_int(), Some(1080));
        assert!(!input.dim(2).unwrap().min().defined());

        let gain = &params[1];
        assert_eq!(gain.get_scalar::<f32>().unwrap(), 1.5);
        assert_eq!(gain.get_max_value().unwrap().as_float(), Some(4.0));
        assert_eq!(gain.get_estimate().unwrap(), Expr::var_of(Type::float(32), "g"));

        assert!(params[2].is_bound_before_lowering().unwrap());

        drop(params);
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_type() {
        let err = Declarations::from_json(r#"{"parameters":[{"name":"x","type":"int7"}]}"#)
            .unwrap()
            .build(None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownType { .. }), "got: {}", err);
    }

    #[test]
    fn too_many_dims_is_a_contract_violation() {
        let err = Declarations::from_json(
            r#"{"parameters":[{"name":"b","type":"float32","buffer":true,"dimensions":1,
                "dims":[{}, {"extent": 4}]}]}"#,
        )
        .unwrap()
        .build(None)
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Param(ParamError::DimensionOutOfRange { dim: 1, .. })
        ));
    }

    #[test]
    fn bad_scalar_values() {
        let out_of_range = r#"{"parameters":[{"name":"u","type":"uint8","value":300}]}"#;
        let err = Declarations::from_json(out_of_range).unwrap().build(None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let symbolic = r#"{"parameters":[{"name":"u","type":"uint8","value":"x"}]}"#;
        assert!(Declarations::from_json(symbolic).unwrap().build(None).is_err());

        let fractional_dim = r#"{"parameters":[{"name":"b","type":"uint8","buffer":true,
            "dimensions":1,"dims":[{"extent":1.5}]}]}"#;
        assert!(Declarations::from_json(fractional_dim).unwrap().build(None).is_err());
    }

    fn single_value(ty: &str, value: &str) -> Result<Parameter, ConfigError> {
        let src = format!(
            r#"{{"parameters":[{{"name":"v","type":"{}","value":{}}}]}}"#,
            ty, value
        );
        Declarations::from_json(&src)?
            .build(None)
            .map(|mut ps| ps.remove(0))
    }

    #[test]
    fn wide_integers_are_exact() {
        let p = single_value("int64", "9007199254740993").unwrap();
        assert_eq!(p.get_scalar::<i64>().unwrap(), 9007199254740993);

        let p = single_value("int64", "-9223372036854775808").unwrap();
        assert_eq!(p.get_scalar::<i64>().unwrap(), i64::MIN);

        let p = single_value("uint64", "18446744073709551615").unwrap();
        assert_eq!(p.get_scalar::<u64>().unwrap(), u64::MAX);
    }

    #[test]
    fn out_of_range_integers_rejected() {
        let err = single_value("uint64", "18446744073709551616").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }), "got: {}", err);

        let err = single_value("int64", "9223372036854775808").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }), "got: {}", err);

        assert!(single_value("uint32", "-1").is_err());
        assert!(single_value("int32", "2.0e10").is_err());
    }

    #[test]
    fn integral_floats_accepted_for_integer_types() {
        let p = single_value("int32", "8.0").unwrap();
        assert_eq!(p.get_scalar::<i32>().unwrap(), 8);
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = Declarations::from_json(r#"{"parameters":[{"name":"x","type":"int32","colour":1}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn failed_build_leaves_registry_clean() {
        let registry = InstanceRegistry::new();
        let src = r#"{"parameters":[
            {"name":"a","type":"int32"},
            {"name":"b","type":"int32","value":1.5}
        ]}"#;
        assert!(Declarations::from_json(src).unwrap().build(Some(&registry)).is_err());
        assert!(registry.is_empty());
    }
}
