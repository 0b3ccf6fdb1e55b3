use std::sync::Arc;

use serde_json::Value as Json;

use super::{AttributeType, ValueType};
use crate::validation::InclusionValidator;
use crate::value::AttrValue;

/// A type which can only hold one of a set of predetermined values.
///
/// ```ignore
/// // Required to be one of two values
/// s.attribute("state", "enum", AttributeOptions::new().of(vec!["placed", "confirmed"]))?;
///
/// // Optionally allowing null
/// s.attribute("folding", "enum", AttributeOptions::new().of(vec![None, Some("top"), Some("bottom")]))?;
///
/// // Casting input/output using another type
/// s.attribute("loves_pizza", "enum", AttributeOptions::new().of(vec![true]).inner("boolean"))?;
/// ```
///
/// Membership is not enforced on cast; the host attaches the
/// [`InclusionValidator`] returned by [`EnumType::validator`].
#[derive(Debug, Clone)]
pub struct EnumType {
    options: Arc<[AttrValue]>,
    inner: Box<AttributeType>,
}

impl EnumType {
    pub const NAME: &'static str = "enum";

    /// Without an inner type values pass through uncast.
    pub fn new(options: Vec<AttrValue>, inner: Option<AttributeType>) -> Self {
        Self {
            options: options.into(),
            inner: Box::new(inner.unwrap_or_else(|| AttributeType::primitive(ValueType))),
        }
    }

    pub fn options(&self) -> &[AttrValue] {
        &self.options
    }

    pub fn validator(&self, attribute: &str) -> InclusionValidator {
        InclusionValidator::new(attribute, Arc::clone(&self.options))
    }

    pub fn cast(&self, value: AttrValue) -> AttrValue {
        self.inner.cast(value).into_value().unwrap_or(AttrValue::Null)
    }

    pub fn deserialize(&self, stored: &Json) -> AttrValue {
        self.inner.deserialize(stored)
    }

    pub fn serialize(&self, value: &AttrValue) -> Json {
        self.inner.serialize(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BooleanType;

    #[test]
    fn options_are_exposed_in_order() {
        let ty = EnumType::new(vec!["placed".into(), "confirmed".into()], None);
        assert_eq!(
            ty.options(),
            &[AttrValue::from("placed"), AttrValue::from("confirmed")][..]
        );
    }

    #[test]
    fn untyped_values_pass_through() {
        let ty = EnumType::new(vec!["placed".into(), "confirmed".into()], None);
        assert_eq!(ty.cast("placed".into()), AttrValue::from("placed"));
        assert_eq!(ty.cast("unknown".into()), AttrValue::from("unknown"));
    }

    #[test]
    fn inner_type_casts() {
        let ty = EnumType::new(
            vec![true.into(), false.into()],
            Some(AttributeType::primitive(BooleanType)),
        );
        assert_eq!(ty.cast("off".into()), AttrValue::Bool(false));
        assert_eq!(ty.cast("yes".into()), AttrValue::Bool(true));
    }

    #[test]
    fn validator_shares_options() {
        let ty = EnumType::new(vec![AttrValue::Null, "a".into()], None);
        let validator = ty.validator("status");
        assert_eq!(validator.attribute(), "status");
        assert_eq!(validator.options(), ty.options());
    }
}
