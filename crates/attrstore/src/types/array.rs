use serde_json::Value as Json;

use super::{AttributeType, Cast};
use crate::value::AttrValue;

/// List-valued attribute over an inner type.
///
/// Casting does not coerce elements; element typing is applied on the
/// `deserialize` path only, so a freshly assigned list reads back exactly as
/// given until the record is reloaded.
#[derive(Debug, Clone)]
pub struct ArrayWrapper {
    inner: Box<AttributeType>,
}

impl ArrayWrapper {
    /// Unchecked; [`AttributeType::array`] is the public constructor.
    pub(crate) fn new(inner: AttributeType) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn inner(&self) -> &AttributeType {
        &self.inner
    }

    /// `null` clears the attribute (array attributes always have a default to
    /// fall back to); anything else is coerced to a list.
    pub fn cast(&self, value: AttrValue) -> Cast {
        match value {
            AttrValue::Null | AttrValue::Json(Json::Null) => Cast::Clear,
            AttrValue::List(items) => Cast::Value(AttrValue::List(items)),
            AttrValue::Json(Json::Array(items)) => Cast::Value(AttrValue::List(
                items.iter().map(AttrValue::from_json).collect(),
            )),
            other => Cast::Value(AttrValue::List(vec![other])),
        }
    }

    pub fn deserialize(&self, stored: &Json) -> AttrValue {
        match stored {
            Json::Array(items) => AttrValue::List(
                items
                    .iter()
                    .map(|item| self.inner.deserialize(item))
                    .collect(),
            ),
            Json::Null => AttrValue::List(Vec::new()),
            scalar => AttrValue::List(vec![self.inner.deserialize(scalar)]),
        }
    }

    pub fn serialize(&self, value: &AttrValue) -> Json {
        match value {
            AttrValue::List(items) => {
                Json::Array(items.iter().map(|item| self.inner.serialize(item)).collect())
            }
            AttrValue::Null => Json::Null,
            scalar => Json::Array(vec![self.inner.serialize(scalar)]),
        }
    }
}
