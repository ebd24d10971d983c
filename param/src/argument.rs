// argument.rs — Pipeline argument descriptors
//
// Flattens parameters into serializable descriptors for the stages that
// consume the constraint table without linking against it: argument
// manifests for ahead-of-time builds, a human-readable table, and a
// signature fingerprint for caching compiled pipelines.
//
// Preconditions: every parameter passed in is defined.
// Postconditions: descriptor order and JSON are deterministic for a given
//   input order; the fingerprint ignores live scalar values.
// Failure modes: undefined parameters (`ParamError::Undefined`).
// Side effects: none.

use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::dimensioned::DimensionedParameter;
use crate::error::ParamError;
use crate::expr::Expr;
use crate::parameter::Parameter;
use crate::types::Type;

// ── Descriptors ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    InputScalar,
    InputBuffer,
}

/// Constraints and estimates of one axis, rendered as text. `None` means
/// never set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionDescriptor {
    pub min: Option<String>,
    pub extent: Option<String>,
    pub stride: Option<String>,
    pub min_estimate: Option<String>,
    pub extent_estimate: Option<String>,
}

/// Range, estimate and live value of a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalarDescriptor {
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub estimate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Everything a downstream stage needs to know about one pipeline input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub kind: ArgumentKind,
    #[serde(rename = "type")]
    pub ty: Type,
    pub dimensions: usize,
    pub explicit_name: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_alignment: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dims: Vec<DimensionDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalar: Option<ScalarDescriptor>,
}

fn text(e: Expr) -> Option<String> {
    e.defined().then(|| e.to_string())
}

impl ArgumentDescriptor {
    pub fn from_parameter(p: &Parameter) -> Result<Self, ParamError> {
        let is_buffer = p.is_buffer()?;
        let mut desc = ArgumentDescriptor {
            name: p.name()?.to_string(),
            kind: if is_buffer {
                ArgumentKind::InputBuffer
            } else {
                ArgumentKind::InputScalar
            },
            ty: p.ty()?,
            dimensions: p.dimensions()?,
            explicit_name: p.is_explicit_name()?,
            host_alignment: None,
            dims: Vec::new(),
            scalar: None,
        };

        if is_buffer {
            desc.host_alignment = Some(p.host_alignment()?);
            for i in 0..desc.dimensions {
                let d = p.dim(i)?;
                desc.dims.push(DimensionDescriptor {
                    min: text(d.min()),
                    extent: text(d.extent()),
                    stride: text(d.stride()),
                    min_estimate: text(d.min_estimate()),
                    extent_estimate: text(d.extent_estimate()),
                });
            }
        } else {
            desc.scalar = Some(ScalarDescriptor {
                min_value: text(p.get_min_value()?),
                max_value: text(p.get_max_value()?),
                estimate: text(p.get_estimate()?),
                value: Some(p.scalar_value()?.to_string()),
            });
        }

        Ok(desc)
    }

    /// The descriptor with the live scalar value removed.
    pub fn without_binding(&self) -> Self {
        let mut d = self.clone();
        if let Some(s) = d.scalar.as_mut() {
            s.value = None;
        }
        d
    }
}

// ── Argument inference ──────────────────────────────────────────────────────

/// The pipeline inputs among `params`: duplicates (by identity) and
/// parameters bound before lowering are dropped; buffers come first, then
/// scalars, each sorted by name.
pub fn infer_arguments<'a>(
    params: impl IntoIterator<Item = &'a Parameter>,
) -> Result<Vec<Parameter>, ParamError> {
    let mut out: Vec<Parameter> = Vec::new();
    for p in params {
        if p.is_bound_before_lowering()? {
            continue;
        }
        if out.iter().any(|q| q.same_as(p)) {
            continue;
        }
        out.push(p.clone());
    }

    let mut keyed = out
        .into_iter()
        .map(|p| Ok((!p.is_buffer()?, p.name()?.to_string(), p)))
        .collect::<Result<Vec<_>, ParamError>>()?;
    keyed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    Ok(keyed.into_iter().map(|(_, _, p)| p).collect())
}

pub fn describe_arguments<'a>(
    params: impl IntoIterator<Item = &'a Parameter>,
) -> Result<Vec<ArgumentDescriptor>, ParamError> {
    params
        .into_iter()
        .map(ArgumentDescriptor::from_parameter)
        .collect()
}

// ── Output forms ────────────────────────────────────────────────────────────

/// Compact JSON of the descriptors, without live values.
pub fn canonical_json(descs: &[ArgumentDescriptor]) -> Result<String, serde_json::Error> {
    let stripped: Vec<ArgumentDescriptor> = descs.iter().map(|d| d.without_binding()).collect();
    serde_json::to_string(&stripped)
}

/// SHA-256 of `canonical_json`, as lowercase hex. Two argument lists with
/// the same declarations fingerprint identically whatever their live values.
pub fn signature_fingerprint(descs: &[ArgumentDescriptor]) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(descs)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in digest {
        let _ = write!(hex, "{:02x}", b);
    }
    Ok(hex)
}

fn or_blank(s: &Option<String>) -> &str {
    s.as_deref().unwrap_or("_")
}

/// One line per input plus one per buffer axis.
pub fn render_table(descs: &[ArgumentDescriptor]) -> String {
    let mut out = String::new();
    for d in descs {
        match (&d.kind, &d.scalar) {
            (ArgumentKind::InputScalar, Some(s)) => {
                let _ = writeln!(
                    out,
                    "{}: scalar<{}> value={} min={} max={} estimate={}",
                    d.name,
                    d.ty,
                    or_blank(&s.value),
                    or_blank(&s.min_value),
                    or_blank(&s.max_value),
                    or_blank(&s.estimate),
                );
            }
            _ => {
                let _ = writeln!(
                    out,
                    "{}: buffer<{}, {}> align={}",
                    d.name,
                    d.ty,
                    d.dimensions,
                    d.host_alignment.unwrap_or(0),
                );
                for (i, dim) in d.dims.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "  [{}] min={} extent={} stride={} estimate=({}, {})",
                        i,
                        or_blank(&dim.min),
                        or_blank(&dim.extent),
                        or_blank(&dim.stride),
                        or_blank(&dim.min_estimate),
                        or_blank(&dim.extent_estimate),
                    );
                }
            }
        }
    }
    out
}
