use std::fmt;
use std::time::Duration;

use crate::value::ConfigValue;

/// The fixed set of primitive target types the Coercer knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Duration,
    String,
    /// `Vec<String>`: a sequence of strings or a comma-separated string.
    StringSeq,
    /// `Vec<f32>`: a sequence of floats or a comma-separated string.
    F32Seq,
    /// `Vec<f64>`: a sequence of floats or a comma-separated string.
    F64Seq,
    /// Stored as-is, no coercion.
    Opaque,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::Isize => "isize",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::Usize => "usize",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Duration => "duration",
            ScalarKind::String => "string",
            ScalarKind::StringSeq => "[string]",
            ScalarKind::F32Seq => "[f32]",
            ScalarKind::F64Seq => "[f64]",
            ScalarKind::Opaque => "any",
        };
        f.write_str(name)
    }
}

/// The declared structural kind of a bind target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar(ScalarKind),
    Record,
    Mapping,
    Sequence,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar(kind) => write!(f, "{kind}"),
            Shape::Record => f.write_str("record"),
            Shape::Mapping => f.write_str("mapping"),
            Shape::Sequence => f.write_str("sequence"),
        }
    }
}

/// A coerced value of exactly one [`ScalarKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Duration(Duration),
    String(String),
    StringSeq(Vec<String>),
    F32Seq(Vec<f32>),
    F64Seq(Vec<f64>),
    Opaque(ConfigValue),
}

impl ScalarValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::Bool(_) => ScalarKind::Bool,
            ScalarValue::I8(_) => ScalarKind::I8,
            ScalarValue::I16(_) => ScalarKind::I16,
            ScalarValue::I32(_) => ScalarKind::I32,
            ScalarValue::I64(_) => ScalarKind::I64,
            ScalarValue::Isize(_) => ScalarKind::Isize,
            ScalarValue::U8(_) => ScalarKind::U8,
            ScalarValue::U16(_) => ScalarKind::U16,
            ScalarValue::U32(_) => ScalarKind::U32,
            ScalarValue::U64(_) => ScalarKind::U64,
            ScalarValue::Usize(_) => ScalarKind::Usize,
            ScalarValue::F32(_) => ScalarKind::F32,
            ScalarValue::F64(_) => ScalarKind::F64,
            ScalarValue::Duration(_) => ScalarKind::Duration,
            ScalarValue::String(_) => ScalarKind::String,
            ScalarValue::StringSeq(_) => ScalarKind::StringSeq,
            ScalarValue::F32Seq(_) => ScalarKind::F32Seq,
            ScalarValue::F64Seq(_) => ScalarKind::F64Seq,
            ScalarValue::Opaque(_) => ScalarKind::Opaque,
        }
    }
}
