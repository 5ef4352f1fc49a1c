//! Typed scalar values returned by device actions.
//!
//! Action results map string keys to dynamically typed values. The variants
//! below cover the data types the device reports; anything else is kept as
//! `Unknown` so extraction sites can decide how to treat it.

use serde::{Serialize, Serializer};
use std::fmt;

/// One value from an action result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    /// Text value (`string`, `uuid`, `dateTime`, ...).
    Text(Box<str>),
    /// Unsigned integer (`ui1`, `ui2`, `ui4`, `ui8`).
    Unsigned(u64),
    /// Signed integer (`i1`, `i2`, `i4`, `int`).
    Signed(i64),
    /// Boolean flag.
    Boolean(bool),
    /// A value whose remote data type has no mapping. Carries the type name.
    Unknown(Box<str>),
}

impl ScalarValue {
    /// Build a text value.
    pub fn text(value: impl Into<Box<str>>) -> Self {
        Self::Text(value.into())
    }

    /// Convert a raw value using its declared remote data type.
    ///
    /// Numeric types that fail to parse and unmapped types yield `Unknown`
    /// carrying the declared type name.
    pub fn from_typed(data_type: &str, raw: &str) -> Self {
        let raw = raw.trim();
        match data_type {
            "ui1" | "ui2" | "ui4" | "ui8" => raw
                .parse::<u64>()
                .map_or_else(|_| Self::Unknown(data_type.into()), Self::Unsigned),
            "i1" | "i2" | "i4" | "i8" | "int" => raw
                .parse::<i64>()
                .map_or_else(|_| Self::Unknown(data_type.into()), Self::Signed),
            "boolean" => match raw {
                "1" | "true" | "yes" => Self::Boolean(true),
                "0" | "false" | "no" => Self::Boolean(false),
                _ => Self::Unknown(data_type.into()),
            },
            "string" | "uuid" | "dateTime" | "char" => Self::Text(raw.into()),
            other => Self::Unknown(other.into()),
        }
    }

    /// Stable name of the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Text(_) => "string",
            Self::Unsigned(_) => "unsigned",
            Self::Signed(_) => "signed",
            Self::Boolean(_) => "boolean",
            Self::Unknown(data_type) => data_type,
        }
    }

    /// Returns the value when it is an unsigned integer.
    #[must_use]
    pub const fn as_unsigned(&self) -> Option<u64> {
        match self {
            Self::Unsigned(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text when it is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => formatter.write_str(value),
            Self::Unsigned(value) => write!(formatter, "{value}"),
            Self::Signed(value) => write!(formatter, "{value}"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::Unknown(data_type) => write!(formatter, "<{data_type}>"),
        }
    }
}

impl From<u64> for ScalarValue {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Signed(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(value) => serializer.serialize_str(value),
            Self::Unsigned(value) => serializer.serialize_u64(*value),
            Self::Signed(value) => serializer.serialize_i64(*value),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::Unknown(_) => serializer.serialize_none(),
        }
    }
}
