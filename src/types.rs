//! Element types accepted inside `hll{...}` literals and the `HYPERLOGLOG` native type.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::codec::compare_packed;
use crate::error::HllError;

/// Declared type of the elements added to a hyperloglog column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Ascii,
    Text,
    Blob,
    Boolean,
    Int,
    BigInt,
    Double,
    Timestamp,
    Uuid,
}

impl ElementType {
    /// CQL name of the type
    pub const fn as_cql(self) -> &'static str {
        match self {
            ElementType::Ascii => "ascii",
            ElementType::Text => "text",
            ElementType::Blob => "blob",
            ElementType::Boolean => "boolean",
            ElementType::Int => "int",
            ElementType::BigInt => "bigint",
            ElementType::Double => "double",
            ElementType::Timestamp => "timestamp",
            ElementType::Uuid => "uuid",
        }
    }

    /// Whether `bytes` is a valid serialized value of this type.
    pub fn accepts(self, bytes: &[u8]) -> bool {
        match self {
            ElementType::Ascii => bytes.is_ascii(),
            ElementType::Text => std::str::from_utf8(bytes).is_ok(),
            ElementType::Blob => true,
            ElementType::Boolean => bytes.len() == 1,
            ElementType::Int => bytes.len() == 4,
            ElementType::BigInt | ElementType::Double | ElementType::Timestamp => bytes.len() == 8,
            ElementType::Uuid => bytes.len() == 16,
        }
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_cql())
    }
}

impl FromStr for ElementType {
    type Err = HllError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" => Ok(ElementType::Ascii),
            "text" | "varchar" => Ok(ElementType::Text),
            "blob" => Ok(ElementType::Blob),
            "boolean" => Ok(ElementType::Boolean),
            "int" => Ok(ElementType::Int),
            "bigint" => Ok(ElementType::BigInt),
            "double" => Ok(ElementType::Double),
            "timestamp" => Ok(ElementType::Timestamp),
            "uuid" => Ok(ElementType::Uuid),
            _ => Err(HllError::InvalidOption {
                name: "element_type".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Native type tags as seen in schema metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    HyperLogLog,
    Ascii,
    Text,
    Blob,
}

impl TypeTag {
    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::HyperLogLog => "HYPERLOGLOG",
            TypeTag::Ascii => "ASCII",
            TypeTag::Text => "TEXT",
            TypeTag::Blob => "BLOB",
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The `hyperloglog` column type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HyperLogLogType;

impl HyperLogLogType {
    pub const TAG: TypeTag = TypeTag::HyperLogLog;

    pub const fn as_cql(self) -> &'static str {
        "hyperloglog"
    }

    /// Order two packed sketches for indexing purposes.
    #[inline]
    pub fn compare(self, lhs: &[u8], rhs: &[u8]) -> Ordering {
        compare_packed(lhs, rhs)
    }

    /// Whether a column previously declared as `previous` may be redeclared as hyperloglog.
    /// Ascii and text compare bytewise as well, so their orderings agree.
    pub fn is_compatible_with(self, previous: TypeTag) -> bool {
        matches!(
            previous,
            TypeTag::HyperLogLog | TypeTag::Ascii | TypeTag::Text
        )
    }

    /// Any stored value can be read back as packed bytes.
    pub fn is_value_compatible_with(self, _previous: TypeTag) -> bool {
        true
    }
}
