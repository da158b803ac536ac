//! Typed extraction of tool arguments.
//!
//! Arguments arrive as an untyped JSON object. Every helper here either
//! returns a typed value or a [`ParamError`] naming the offending field.

use crate::error::ParamError;
use serde_json::{Map, Value};

pub type Args = Map<String, Value>;

const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    pub fn is_requested(&self) -> bool {
        self.page > 0 || self.per_page > 0
    }
}

/// View a tool-call `arguments` value as an object. Absent arguments are an empty map.
pub fn as_args(value: &Value) -> Result<Args, ParamError> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        _ => Err(ParamError::InvalidArguments),
    }
}

fn present<'a>(args: &'a Args, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

pub fn required_str(args: &Args, name: &str) -> Result<String, ParamError> {
    let value = optional_str(args, name)?;
    if value.is_empty() {
        return Err(ParamError::Missing(name.to_string()));
    }
    Ok(value)
}

pub fn optional_str(args: &Args, name: &str) -> Result<String, ParamError> {
    match present(args, name) {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ParamError::TypeMismatch {
            name: name.to_string(),
            expected: "string",
        }),
    }
}

// JSON clients commonly send integers as floats; fractional parts are truncated.
fn coerce_int(name: &str, value: &Value) -> Result<i64, ParamError> {
    let mismatch = || ParamError::TypeMismatch {
        name: name.to_string(),
        expected: "number",
    };
    let Value::Number(n) = value else {
        return Err(mismatch());
    };
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
        _ => Err(mismatch()),
    }
}

fn non_negative(name: &str, v: i64) -> Result<u64, ParamError> {
    u64::try_from(v).map_err(|_| ParamError::InvalidValue {
        name: name.to_string(),
        reason: "must not be negative".into(),
    })
}

pub fn required_int(args: &Args, name: &str) -> Result<u64, ParamError> {
    let Some(value) = present(args, name) else {
        return Err(ParamError::Missing(name.to_string()));
    };
    match coerce_int(name, value)? {
        0 => Err(ParamError::Missing(name.to_string())),
        v if v < 0 => Err(ParamError::InvalidValue {
            name: name.to_string(),
            reason: "must be a positive integer".into(),
        }),
        v => non_negative(name, v),
    }
}

pub fn optional_int(args: &Args, name: &str) -> Result<u64, ParamError> {
    match present(args, name) {
        None => Ok(0),
        Some(value) => non_negative(name, coerce_int(name, value)?),
    }
}

pub fn optional_pagination(args: &Args) -> Result<Pagination, ParamError> {
    let page = optional_int(args, "page")?;
    let per_page = optional_int(args, "per_page")?;
    if per_page > MAX_PER_PAGE {
        return Err(ParamError::InvalidValue {
            name: "per_page".into(),
            reason: format!("must be at most {}", MAX_PER_PAGE),
        });
    }
    Ok(Pagination { page, per_page })
}
