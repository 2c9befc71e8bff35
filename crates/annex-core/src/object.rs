//! Object encodings for stored vectors.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Encoding used by the engine to store vector elements.
///
/// Fixed at index creation/load time and never changes for the lifetime
/// of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// 32-bit floating point elements, stored exactly.
    Float32,
    /// 8-bit unsigned integer elements; inserts are rounded and clamped
    /// to `0..=255`, so reconstruction is quantization-bounded.
    Uint8,
}

impl ObjectKind {
    /// Returns the canonical configuration name for this encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Uint8 => "uint8",
        }
    }

    /// Discriminant used in the persisted index header.
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Float32 => 0,
            Self::Uint8 => 1,
        }
    }

    /// Decodes a persisted header discriminant.
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::Float32),
            1 => Ok(Self::Uint8),
            _ => Err(Error::UnsupportedObjectType),
        }
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "float" | "float32" => Ok(Self::Float32),
            "uint8" | "integer" => Ok(Self::Uint8),
            other => Err(Error::OptionApply(format!(
                "unknown object kind {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_from_str() {
        assert_eq!("float32".parse::<ObjectKind>().unwrap(), ObjectKind::Float32);
        assert_eq!("float".parse::<ObjectKind>().unwrap(), ObjectKind::Float32);
        assert_eq!("uint8".parse::<ObjectKind>().unwrap(), ObjectKind::Uint8);
        assert!("float64".parse::<ObjectKind>().is_err());
    }

    #[test]
    fn test_object_kind_discriminant_round_trip() {
        for kind in [ObjectKind::Float32, ObjectKind::Uint8] {
            assert_eq!(ObjectKind::from_u8(kind.as_u8()).unwrap(), kind);
        }
        assert!(matches!(
            ObjectKind::from_u8(9),
            Err(Error::UnsupportedObjectType)
        ));
    }
}
