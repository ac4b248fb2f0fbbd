//! Column schema entries for hyperloglog columns.
//!
//! Options are given as a string map, the way `WITH` clauses reach the schema layer:
//!
//! | option      | values                       | default   |
//! |-------------|------------------------------|-----------|
//! | `precision` | integer in `[4, 16]`         | `12`      |
//! | `estimator` | `classic` or `loglog_beta`   | `classic` |
//!
//! The precision is fixed when the column is created. Changing it would make every
//! stored register meaningless, so [`ColumnSchema::check_alteration`] rejects it.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{HllError, Result};
use crate::hyperloglog::Precision;
use crate::types::{ElementType, HyperLogLogType, TypeTag};

pub const PRECISION_OPTION: &str = "precision";
pub const ESTIMATOR_OPTION: &str = "estimator";

/// Cardinality estimator used when a column is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EstimatorKind {
    /// HyperLogLog with linear counting and large range corrections
    #[default]
    Classic,
    /// LogLog-Beta bias corrected estimator
    LogLogBeta,
}

impl FromStr for EstimatorKind {
    type Err = HllError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "classic" => Ok(EstimatorKind::Classic),
            "loglog_beta" => Ok(EstimatorKind::LogLogBeta),
            _ => Err(HllError::InvalidOption {
                name: ESTIMATOR_OPTION.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl Display for EstimatorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimatorKind::Classic => f.write_str("classic"),
            EstimatorKind::LogLogBeta => f.write_str("loglog_beta"),
        }
    }
}

/// Schema metadata of one hyperloglog column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSchema {
    name: String,
    precision: Precision,
    element_type: ElementType,
    estimator: EstimatorKind,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, precision: Precision, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            precision,
            element_type,
            estimator: EstimatorKind::default(),
        }
    }

    /// Build a schema entry from `WITH`-style options.
    pub fn from_options(
        name: impl Into<String>,
        element_type: ElementType,
        options: &HashMap<String, String>,
    ) -> Result<Self> {
        let precision = match options.get(PRECISION_OPTION) {
            Some(value) => {
                let p: i64 = value.trim().parse().map_err(|_| HllError::InvalidOption {
                    name: PRECISION_OPTION.to_string(),
                    value: value.clone(),
                })?;
                Precision::try_from(p)?
            }
            None => Precision::default(),
        };
        let estimator = match options.get(ESTIMATOR_OPTION) {
            Some(value) => value.trim().parse()?,
            None => EstimatorKind::default(),
        };

        Ok(Self::new(name, precision, element_type).with_estimator(estimator))
    }

    pub fn with_estimator(mut self, estimator: EstimatorKind) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn estimator(&self) -> EstimatorKind {
        self.estimator
    }

    pub fn type_tag(&self) -> TypeTag {
        HyperLogLogType::TAG
    }

    /// Name of the receiver of literal elements, used in error messages.
    pub fn value_spec_name(&self) -> String {
        format!("value({})", self.name)
    }

    /// Validate replacing `self` with `altered`.
    pub fn check_alteration(&self, altered: &ColumnSchema) -> Result<()> {
        if self.precision != altered.precision {
            return Err(HllError::PrecisionChange {
                column: self.name.clone(),
                from: self.precision.get(),
                to: altered.precision.get(),
            });
        }
        let compatible = self.element_type == altered.element_type
            || matches!(
                (self.element_type, altered.element_type),
                (ElementType::Ascii, ElementType::Text) | (_, ElementType::Blob)
            );
        if !compatible {
            return Err(HllError::InvalidOption {
                name: "element_type".to_string(),
                value: altered.element_type.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let schema = ColumnSchema::from_options("visitors", ElementType::Text, &options(&[]))
            .unwrap();
        assert_eq!(schema.precision().get(), 12);
        assert_eq!(schema.estimator(), EstimatorKind::Classic);
        assert_eq!(schema.value_spec_name(), "value(visitors)");
        assert_eq!(schema.type_tag(), TypeTag::HyperLogLog);
    }

    #[test_case("4" => matches Ok(4))]
    #[test_case(" 16 " => matches Ok(16))]
    #[test_case("3" => matches Err(HllError::PrecisionOutOfRange(3)))]
    #[test_case("-1" => matches Err(HllError::PrecisionOutOfRange(-1)))]
    #[test_case("300" => matches Err(HllError::PrecisionOutOfRange(300)))]
    #[test_case("fourteen" => matches Err(HllError::InvalidOption { .. }))]
    fn test_precision_option(value: &str) -> Result<u8> {
        ColumnSchema::from_options("c", ElementType::Blob, &options(&[("precision", value)]))
            .map(|schema| schema.precision().get())
    }

    #[test_case("classic" => matches Ok(EstimatorKind::Classic))]
    #[test_case("loglog_beta" => matches Ok(EstimatorKind::LogLogBeta))]
    #[test_case("hyperloglog++" => matches Err(HllError::InvalidOption { .. }))]
    fn test_estimator_option(value: &str) -> Result<EstimatorKind> {
        ColumnSchema::from_options("c", ElementType::Blob, &options(&[("estimator", value)]))
            .map(|schema| schema.estimator())
    }

    #[test]
    fn test_precision_change_is_rejected() {
        let p12 = ColumnSchema::new("c", Precision::new(12).unwrap(), ElementType::Text);
        let p14 = ColumnSchema::new("c", Precision::new(14).unwrap(), ElementType::Text);
        assert!(matches!(
            p12.check_alteration(&p14),
            Err(HllError::PrecisionChange { from: 12, to: 14, .. })
        ));
        assert!(p12
            .check_alteration(&p12.clone().with_estimator(EstimatorKind::LogLogBeta))
            .is_ok());
    }

    #[test_case(ElementType::Ascii, ElementType::Text => true)]
    #[test_case(ElementType::Text, ElementType::Blob => true)]
    #[test_case(ElementType::Text, ElementType::Ascii => false)]
    #[test_case(ElementType::Int, ElementType::BigInt => false)]
    fn test_element_type_alteration(from: ElementType, to: ElementType) -> bool {
        let p = Precision::default();
        ColumnSchema::new("c", p, from)
            .check_alteration(&ColumnSchema::new("c", p, to))
            .is_ok()
    }
}
