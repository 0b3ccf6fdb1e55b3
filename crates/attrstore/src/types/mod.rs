//! # Attribute Types
//!
//! Every registered attribute is backed by an [`AttributeType`], which knows how
//! to turn caller input into a canonical [`AttrValue`] (`cast`), how to read
//! and write the blob's stored form (`deserialize` / `serialize`), and whether a
//! value differs from its prior stored form (`changed_in_place`).
//!
//! | Variant | Built from | Behaviour |
//! |---------|------------|-----------|
//! | `Primitive` | `boolean`, `string`, `datetime`, ... | Delegates to a [`PrimitiveType`] |
//! | `Array` | `array: true` option | List of the inner type; `null` clears |
//! | `Enum` | `enum` with `of: [...]` | Closed option set, optional inner type |
//!
//! Primitive types are not hardwired: a [`TypeResolver`] maps type identifiers to
//! types and is injected into every store. [`BuiltinTypes`] is the stock resolver.

mod array;
mod enum_type;
mod primitive;
mod resolver;

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::error::{AttrError, Result};
use crate::validation::InclusionValidator;
use crate::value::AttrValue;

pub use array::ArrayWrapper;
pub use enum_type::EnumType;
pub use primitive::{
    BooleanType, DateTimeType, DecimalType, FloatType, IntegerType, StringType, ValueType,
};
pub use resolver::{BuiltinTypes, PrimitiveFactory, TypeOptions, TypeRef, TypeResolver};

/// Capability surface of an externally supplied primitive type.
///
/// Casting is lenient: input that cannot be coerced becomes `Null`, the way a
/// form field holding garbage reads back as blank.
pub trait PrimitiveType: fmt::Debug + Send + Sync {
    /// Type identifier, used for `attribute_names` filtering.
    fn name(&self) -> &'static str;

    fn cast(&self, value: AttrValue) -> AttrValue;

    fn deserialize(&self, stored: &Json) -> AttrValue;

    fn serialize(&self, value: &AttrValue) -> Json;

    /// Whether `new` differs from the value stored as `old_raw`.
    ///
    /// The comparison happens on typed values so that equivalent stored forms
    /// (`"1.50"` and `1.5` for a decimal) do not count as changes.
    fn changed_in_place(&self, old_raw: &Json, new: &AttrValue) -> bool {
        self.deserialize(old_raw) != *new
    }
}

/// Outcome of casting input for assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Cast {
    /// Store this value under the attribute's key.
    Value(AttrValue),
    /// Remove the key so later reads fall through to the default.
    Clear,
}

impl Cast {
    pub fn is_clear(&self) -> bool {
        matches!(self, Cast::Clear)
    }

    /// The value to store, or `None` for [`Cast::Clear`].
    pub fn into_value(self) -> Option<AttrValue> {
        match self {
            Cast::Value(v) => Some(v),
            Cast::Clear => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AttributeType {
    Primitive(Arc<dyn PrimitiveType>),
    Array(ArrayWrapper),
    Enum(EnumType),
}

impl AttributeType {
    pub fn primitive(ty: impl PrimitiveType + 'static) -> Self {
        AttributeType::Primitive(Arc::new(ty))
    }

    /// Wrap a type for list-valued attributes. Enums cannot be wrapped.
    pub fn array(inner: AttributeType) -> Result<Self> {
        if inner.element().as_enum().is_some() {
            return Err(enum_array_error());
        }
        Ok(AttributeType::Array(ArrayWrapper::new(inner)))
    }

    pub fn cast(&self, value: AttrValue) -> Cast {
        match self {
            AttributeType::Primitive(ty) => Cast::Value(ty.cast(value)),
            AttributeType::Array(array) => array.cast(value),
            AttributeType::Enum(enumeration) => Cast::Value(enumeration.cast(value)),
        }
    }

    pub fn deserialize(&self, stored: &Json) -> AttrValue {
        match self {
            AttributeType::Primitive(ty) => ty.deserialize(stored),
            AttributeType::Array(array) => array.deserialize(stored),
            AttributeType::Enum(enumeration) => enumeration.deserialize(stored),
        }
    }

    pub fn serialize(&self, value: &AttrValue) -> Json {
        match self {
            AttributeType::Primitive(ty) => ty.serialize(value),
            AttributeType::Array(array) => array.serialize(value),
            AttributeType::Enum(enumeration) => enumeration.serialize(value),
        }
    }

    pub fn changed_in_place(&self, old_raw: &Json, new: &AttrValue) -> bool {
        match self {
            AttributeType::Primitive(ty) => ty.changed_in_place(old_raw, new),
            AttributeType::Array(_) | AttributeType::Enum(_) => self.deserialize(old_raw) != *new,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, AttributeType::Array(_))
    }

    /// The innermost non-array type.
    pub fn element(&self) -> &AttributeType {
        match self {
            AttributeType::Array(array) => array.inner().element(),
            other => other,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            AttributeType::Enum(enumeration) => Some(enumeration),
            _ => None,
        }
    }

    /// Type identifier of this variant, looking through array wrapping.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeType::Primitive(ty) => ty.name(),
            AttributeType::Array(array) => array.inner().type_name(),
            AttributeType::Enum(_) => EnumType::NAME,
        }
    }

    /// Validation rule this type wants attached to its host, if any.
    pub fn validator(&self, attribute: &str) -> Option<InclusionValidator> {
        self.as_enum().map(|enumeration| enumeration.validator(attribute))
    }
}

pub(crate) fn enum_array_error() -> AttrError {
    AttrError::Configuration("Enum-arrays not currently supported".to_string())
}
