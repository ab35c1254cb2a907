use thiserror::Error;

use crate::types::{ScalarKind, Shape};

#[derive(Debug, Error)]
pub enum BindError {
    #[error("Bind target must be a record, found {found}")]
    InvalidTarget { found: Shape },

    #[error("Bind target is an optional record that holds no value")]
    AbsentRecord,

    #[error("Shape mismatch at '{path}' (field {field}): expected {expected}, found {found}")]
    ShapeMismatch {
        field: &'static str,
        path: String,
        expected: Shape,
        found: &'static str,
    },

    #[error("Invalid value at '{path}' (field {field}): {source}")]
    Coercion {
        field: &'static str,
        path: String,
        source: CoercionError,
    },

    #[error("Duplicate key at '{path}' (field {field}): {key:?} names an entry already bound")]
    DuplicateKey {
        field: &'static str,
        path: String,
        key: String,
    },

    #[error("Failed to serialize bind source: {0}")]
    Serialize(#[from] crate::ser::SerializeError),
}

impl BindError {
    /// Dotted path of the offending key, when the error is tied to one.
    pub fn path(&self) -> Option<&str> {
        match self {
            BindError::ShapeMismatch { path, .. }
            | BindError::Coercion { path, .. }
            | BindError::DuplicateKey { path, .. } => Some(path.as_str()),
            BindError::InvalidTarget { .. }
            | BindError::AbsentRecord
            | BindError::Serialize(_) => None,
        }
    }
}

/// A raw value could not be converted into the declared scalar kind.
#[derive(Debug, Error, PartialEq)]
#[error("cannot coerce {raw} into {kind}: {cause}")]
pub struct CoercionError {
    pub kind: ScalarKind,
    /// Rendering of the offending raw value.
    pub raw: String,
    pub cause: CoercionCause,
}

#[derive(Debug, Error, PartialEq)]
pub enum CoercionCause {
    #[error("unsupported input type {found}")]
    Unsupported { found: &'static str },

    #[error("{0}")]
    Parse(String),

    #[error("value out of range")]
    Overflow,

    #[error("negative value not allowed")]
    Negative,

    #[error("element {index} is a {found}")]
    Element { index: usize, found: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_error_formats_kind_and_raw() {
        let err = CoercionError {
            kind: ScalarKind::I8,
            raw: "\"99999\"".into(),
            cause: CoercionCause::Overflow,
        };
        let msg = err.to_string();
        assert!(msg.contains("i8"));
        assert!(msg.contains("99999"));
        assert!(msg.contains("out of range"));
    }

    #[test]
    fn coercion_wrapped_with_path() {
        let err = BindError::Coercion {
            field: "retries",
            path: "server.retries".into(),
            source: CoercionError {
                kind: ScalarKind::I32,
                raw: "\"x\"".into(),
                cause: CoercionCause::Parse("invalid digit found in string".into()),
            },
        };
        assert_eq!(err.path(), Some("server.retries"));
        let msg = err.to_string();
        assert!(msg.contains("server.retries"));
        assert!(msg.contains("field retries"));
    }

    #[test]
    fn duplicate_key_reports_path_and_key() {
        let err = BindError::DuplicateKey {
            field: "weights",
            path: "weights.1".into(),
            key: "1".into(),
        };
        assert_eq!(err.path(), Some("weights.1"));
        assert!(err.to_string().contains("\"1\""));
    }

    #[test]
    fn absent_record_has_own_message() {
        let msg = BindError::AbsentRecord.to_string();
        assert!(msg.contains("optional record"));
        assert!(!msg.contains("must be a record"));
    }

    #[test]
    fn invalid_target_names_shape() {
        let err = BindError::InvalidTarget {
            found: Shape::Scalar(ScalarKind::U8),
        };
        assert!(err.to_string().contains("u8"));
        assert_eq!(err.path(), None);
    }
}
