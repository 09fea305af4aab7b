//! Conversions between harness types and Wasmtime types.

use wasmhost_core::{Signature, TrapKind, Value, ValueType};
use wasmtime::{ExternType, FuncType, Trap, Val, ValType};

/// Shape of a module import or export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternKind {
    /// A function with numeric parameters and results.
    Function(Signature),
    /// A function using types the harness cannot pass (vectors, references).
    UnsupportedFunction(String),
    /// A linear memory, sizes in pages.
    Memory {
        /// Minimum size in pages.
        minimum: u64,
        /// Maximum size in pages, if bounded.
        maximum: Option<u64>,
    },
    /// A table.
    Table,
    /// A global.
    Global,
}

impl ExternKind {
    /// Short human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::Function(sig) => format!("func {}", sig),
            Self::UnsupportedFunction(ty) => format!("func {} (unsupported)", ty),
            Self::Memory { minimum, maximum } => match maximum {
                Some(max) => format!("memory {}..{} pages", minimum, max),
                None => format!("memory {}.. pages", minimum),
            },
            Self::Table => "table".to_string(),
            Self::Global => "global".to_string(),
        }
    }
}

/// An import declared by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    /// Import namespace.
    pub module: String,
    /// Import name.
    pub name: String,
    /// What the module expects.
    pub kind: ExternKind,
}

/// An export provided by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInfo {
    /// Export name.
    pub name: String,
    /// What the export is.
    pub kind: ExternKind,
}

pub(crate) fn value_type_of(ty: &ValType) -> Option<ValueType> {
    match ty {
        ValType::I32 => Some(ValueType::I32),
        ValType::I64 => Some(ValueType::I64),
        ValType::F32 => Some(ValueType::F32),
        ValType::F64 => Some(ValueType::F64),
        _ => None,
    }
}

/// Convert a Wasmtime function type, if every parameter and result is numeric.
pub(crate) fn signature_of(ty: &FuncType) -> Option<Signature> {
    let params = ty
        .params()
        .map(|p| value_type_of(&p))
        .collect::<Option<Vec<_>>>()?;
    let results = ty
        .results()
        .map(|r| value_type_of(&r))
        .collect::<Option<Vec<_>>>()?;
    Some(Signature::new(params, results))
}

pub(crate) fn extern_kind_of(ty: &ExternType) -> ExternKind {
    match ty {
        ExternType::Func(f) => match signature_of(f) {
            Some(sig) => ExternKind::Function(sig),
            None => ExternKind::UnsupportedFunction(format!("{:?}", f)),
        },
        ExternType::Memory(m) => ExternKind::Memory {
            minimum: m.minimum(),
            maximum: m.maximum(),
        },
        ExternType::Table(_) => ExternKind::Table,
        ExternType::Global(_) => ExternKind::Global,
    }
}

pub(crate) fn to_val(value: Value) -> Val {
    match value {
        Value::I32(v) => Val::I32(v),
        Value::I64(v) => Val::I64(v),
        Value::F32(v) => Val::F32(v.to_bits()),
        Value::F64(v) => Val::F64(v.to_bits()),
    }
}

pub(crate) fn from_val(val: &Val) -> Option<Value> {
    match val {
        Val::I32(v) => Some(Value::I32(*v)),
        Val::I64(v) => Some(Value::I64(*v)),
        Val::F32(bits) => Some(Value::F32(f32::from_bits(*bits))),
        Val::F64(bits) => Some(Value::F64(f64::from_bits(*bits))),
        _ => None,
    }
}

/// Placeholder used to size a result buffer before a call.
pub(crate) fn zero_val(ty: ValueType) -> Val {
    match ty {
        ValueType::I32 => Val::I32(0),
        ValueType::I64 => Val::I64(0),
        ValueType::F32 => Val::F32(0),
        ValueType::F64 => Val::F64(0),
    }
}

pub(crate) fn trap_kind_of(trap: &Trap) -> TrapKind {
    match trap {
        Trap::MemoryOutOfBounds | Trap::HeapMisaligned => TrapKind::MemoryOutOfBounds,
        Trap::TableOutOfBounds => TrapKind::TableOutOfBounds,
        Trap::IndirectCallToNull | Trap::BadSignature => TrapKind::BadIndirectCall,
        Trap::IntegerDivisionByZero => TrapKind::IntegerDivisionByZero,
        Trap::IntegerOverflow => TrapKind::IntegerOverflow,
        Trap::BadConversionToInteger => TrapKind::BadConversionToInteger,
        Trap::UnreachableCodeReached => TrapKind::Unreachable,
        Trap::StackOverflow => TrapKind::StackOverflow,
        Trap::OutOfFuel => TrapKind::OutOfFuel,
        _ => TrapKind::Other,
    }
}
