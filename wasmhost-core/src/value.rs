//! Numeric values passed to and returned from WASM exports.
//!
//! WebAssembly functions exchange a small closed set of number types, so
//! arguments and results are modeled as a tagged enum and checked against
//! the export's declared [`Signature`] before any call is made.

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The type of a WASM numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        })
    }
}

impl FromStr for ValueType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "i32" => Ok(Self::I32),
            "i64" => Ok(Self::I64),
            "f32" => Ok(Self::F32),
            "f64" => Ok(Self::F64),
            _ => Err(ParseValueError::UnknownType(s.to_string())),
        }
    }
}

/// A WASM numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// 32-bit integer.
    I32(i32),
    /// 64-bit integer.
    I64(i64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
}

impl Value {
    /// Get the type of this value.
    pub const fn ty(&self) -> ValueType {
        match self {
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
        }
    }

    /// Parse a textual argument as a value of the given type.
    ///
    /// Integers accept both the signed and the unsigned range of their
    /// width; unsigned values are reinterpreted bit-for-bit, matching how
    /// WASM itself treats `i32`/`i64`.
    pub fn parse(ty: ValueType, text: &str) -> std::result::Result<Self, ParseValueError> {
        let text = text.trim();
        let invalid = || ParseValueError::Invalid {
            ty,
            text: text.to_string(),
        };

        match ty {
            ValueType::I32 => text
                .parse::<i32>()
                .or_else(|_| text.parse::<u32>().map(|v| v as i32))
                .map(Self::I32)
                .map_err(|_| invalid()),
            ValueType::I64 => text
                .parse::<i64>()
                .or_else(|_| text.parse::<u64>().map(|v| v as i64))
                .map(Self::I64)
                .map_err(|_| invalid()),
            ValueType::F32 => text.parse::<f32>().map(Self::F32).map_err(|_| invalid()),
            ValueType::F64 => text.parse::<f64>().map(Self::F64).map_err(|_| invalid()),
        }
    }

    /// Get the value as an `i32`, if it is one.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an `i64`, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an `f32`, if it is one.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an `f64`, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::I32(v as i32)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

/// Error parsing a textual value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseValueError {
    /// The type name is not one of `i32`, `i64`, `f32`, `f64`.
    #[error("unknown value type '{0}'")]
    UnknownType(String),

    /// The text is not a valid literal of the requested type.
    #[error("'{text}' is not a valid {ty}")]
    Invalid {
        /// The requested type.
        ty: ValueType,
        /// The rejected text.
        text: String,
    },
}

/// Parameter and result types of a WASM function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Signature {
    /// Parameter types, in order.
    pub params: Vec<ValueType>,
    /// Result types, in order.
    pub results: Vec<ValueType>,
}

impl Signature {
    /// Create a new signature.
    pub fn new(params: Vec<ValueType>, results: Vec<ValueType>) -> Self {
        Self { params, results }
    }

    /// Check that `args` match the declared parameters exactly.
    pub fn check_args(&self, export: &str, args: &[Value]) -> Result<()> {
        let matches = args.len() == self.params.len()
            && args.iter().zip(&self.params).all(|(a, p)| a.ty() == *p);

        if matches {
            Ok(())
        } else {
            Err(HarnessError::ArityOrType {
                export: export.to_string(),
                expected: format_types(&self.params),
                actual: format_types(&args.iter().map(Value::ty).collect::<Vec<_>>()),
            })
        }
    }

    /// Parse textual arguments against the declared parameter types.
    pub fn parse_args<S: AsRef<str>>(&self, export: &str, args: &[S]) -> Result<Vec<Value>> {
        if args.len() != self.params.len() {
            return Err(HarnessError::ArityOrType {
                export: export.to_string(),
                expected: format_types(&self.params),
                actual: format!("{} argument(s)", args.len()),
            });
        }

        self.params
            .iter()
            .zip(args)
            .map(|(ty, text)| {
                Value::parse(*ty, text.as_ref()).map_err(|e| HarnessError::ArityOrType {
                    export: export.to_string(),
                    expected: format_types(&self.params),
                    actual: e.to_string(),
                })
            })
            .collect()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_types(&self.params))?;
        if !self.results.is_empty() {
            write!(f, " -> {}", format_types(&self.results))?;
        }
        Ok(())
    }
}

fn format_types(types: &[ValueType]) -> String {
    let inner: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("({})", inner.join(", "))
}
