//! ## `hll{ e1, e2, ... }` literals
//! The parser hands over each element as raw serialized bytes. Binding validates every
//! element against the column's declared element type and deduplicates by exact byte
//! equality (not by hash). Deduplication only saves register computations: adding an
//! element twice is a no-op anyway.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use tracing::debug;

use crate::error::{HllError, Result};
use crate::schema::ColumnSchema;

/// Element values are limited to what an unsigned short length prefix can describe.
pub const MAX_ELEMENT_LEN: usize = 65_535;

/// One element of a parsed literal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Value(Vec<u8>),
    Null,
    /// Unresolved bind marker (`?` or `:name`)
    BindMarker(String),
}

impl Term {
    pub fn text(s: &str) -> Self {
        Term::Value(s.as_bytes().to_vec())
    }

    pub fn int(v: i32) -> Self {
        Term::Value(v.to_be_bytes().to_vec())
    }

    pub fn bigint(v: i64) -> Self {
        Term::Value(v.to_be_bytes().to_vec())
    }

    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Term::Value(bytes.into())
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Value(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) if !s.chars().any(char::is_control) => write!(f, "'{s}'"),
                _ => {
                    f.write_str("0x")?;
                    bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
                }
            },
            Term::Null => f.write_str("null"),
            Term::BindMarker(name) if name.is_empty() => f.write_str("?"),
            Term::BindMarker(name) => write!(f, ":{name}"),
        }
    }
}

/// A parsed hyperloglog literal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Literal {
    pub elements: Vec<Term>,
}

impl Literal {
    pub fn new(elements: Vec<Term>) -> Self {
        Self { elements }
    }

    /// Whether every concrete element validates against the column's element type.
    /// Nulls and bind markers are rejected later, at bind time.
    pub fn is_assignable_to(&self, schema: &ColumnSchema) -> bool {
        self.elements.iter().all(|term| match term {
            Term::Value(bytes) => schema.element_type().accepts(bytes),
            Term::Null | Term::BindMarker(_) => true,
        })
    }
}

impl FromIterator<Term> for Literal {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("hll{")?;
        for (i, term) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{term}")?;
        }
        f.write_str("}")
    }
}

/// Validated, deduplicated element bytes, consumed once by a write operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingElements(BTreeSet<Vec<u8>>);

impl PendingElements {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(Vec::as_slice)
    }
}

/// Validate `literal` against `schema` and collect its distinct element bytes.
pub fn bind(literal: &Literal, schema: &ColumnSchema) -> Result<PendingElements> {
    let element_type = schema.element_type();
    let mut elements = BTreeSet::new();

    for term in &literal.elements {
        let bytes = match term {
            Term::BindMarker(_) => {
                return Err(HllError::BindMarkerUnsupported {
                    column: schema.name().to_string(),
                })
            }
            Term::Null => {
                return Err(HllError::NullElement {
                    column: schema.name().to_string(),
                })
            }
            Term::Value(bytes) => bytes,
        };
        if bytes.len() > MAX_ELEMENT_LEN {
            return Err(HllError::ValueTooLarge {
                len: bytes.len(),
                limit: MAX_ELEMENT_LEN,
            });
        }
        if !element_type.accepts(bytes) {
            return Err(HllError::TypeMismatch {
                column: schema.value_spec_name(),
                value: term.to_string(),
                expected: element_type,
            });
        }
        elements.insert(bytes.clone());
    }

    debug!(
        column = schema.name(),
        given = literal.elements.len(),
        distinct = elements.len(),
        "bound hyperloglog literal"
    );
    Ok(PendingElements(elements))
}
