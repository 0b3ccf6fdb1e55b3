//! # Column Types and the Store Adapter
//!
//! A host model describes each physical column with a [`ColumnType`]: how a raw
//! stored value is read into memory and written back. Blob columns start out as
//! a plain [`JsonColumn`]. Once a [`Store`] is bound to a column, the model
//! replaces that column type with a [`StoreColumn`], which wraps the original
//! and splits the blob into a typed [`AttributeSet`] on the way in and
//! recomposes it on the way out.
//!
//! ```text
//!  raw row value ──► original.deserialize ──► JSON object ──► AttributeSet
//!                                                              │
//!  raw row value ◄── original.serialize  ◄── JSON object ◄─────┘
//! ```
//!
//! Anything that is not a JSON object (a `NULL` column, a bare string) passes
//! through the adapter untouched.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use crate::config::UnknownKeys;
use crate::error::{AttrError, Result};
use crate::store::{DefaultValue, Store};
use crate::value::AttrValue;

/// In-memory value of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// Whatever the original column type produced.
    Raw(Json),
    /// A decomposed blob.
    Attributes(AttributeSet),
}

impl ColumnValue {
    pub fn as_attributes(&self) -> Option<&AttributeSet> {
        match self {
            ColumnValue::Attributes(set) => Some(set),
            ColumnValue::Raw(_) => None,
        }
    }
}

impl From<AttributeSet> for ColumnValue {
    fn from(set: AttributeSet) -> Self {
        ColumnValue::Attributes(set)
    }
}

impl From<Json> for ColumnValue {
    fn from(raw: Json) -> Self {
        ColumnValue::Raw(raw)
    }
}

/// Typed values of one blob column for one record.
///
/// A key that is absent is *unset*: reads fall back to the attribute's
/// default. Keys that no attribute claims are kept apart in `passthrough`
/// when the adapter is configured to preserve them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    values: BTreeMap<String, AttrValue>,
    passthrough: Map<String, Json>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttrValue> {
        self.values.get_mut(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) -> Option<AttrValue> {
        self.values.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.values.remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, AttrValue> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Stored entries no attribute claims, kept verbatim.
    pub fn passthrough(&self) -> &Map<String, Json> {
        &self.passthrough
    }

    pub fn passthrough_mut(&mut self) -> &mut Map<String, Json> {
        &mut self.passthrough
    }
}

impl<K: Into<String>> FromIterator<(K, AttrValue)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (K, AttrValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            passthrough: Map::new(),
        }
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = (&'a String, &'a AttrValue);
    type IntoIter = btree_map::Iter<'a, String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// How a host column reads and writes its raw stored value.
pub trait ColumnType: fmt::Debug + Send + Sync {
    /// Coerce a value assigned by the application.
    fn cast(&self, value: ColumnValue) -> Result<ColumnValue> {
        Ok(value)
    }

    fn deserialize(&self, raw: &Json) -> Result<ColumnValue>;

    fn serialize(&self, value: &ColumnValue) -> Result<Json>;

    /// Whether `new` differs from what was loaded as `old_raw`.
    fn changed_in_place(&self, old_raw: &Json, new: &ColumnValue) -> Result<bool> {
        Ok(self.deserialize(old_raw)? != *new)
    }

    /// Raw value of the column on a fresh record.
    fn default_raw(&self) -> Json {
        Json::Null
    }
}

/// How a [`JsonColumn`] keeps its document in the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonEncoding {
    /// The row holds the JSON value itself.
    #[default]
    Native,
    /// The row holds the document as JSON text.
    Text,
}

/// A column holding a JSON document, defaulting to `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonColumn {
    pub encoding: JsonEncoding,
}

impl JsonColumn {
    pub fn native() -> Self {
        Self {
            encoding: JsonEncoding::Native,
        }
    }

    pub fn text() -> Self {
        Self {
            encoding: JsonEncoding::Text,
        }
    }
}

impl ColumnType for JsonColumn {
    fn deserialize(&self, raw: &Json) -> Result<ColumnValue> {
        match (self.encoding, raw) {
            (JsonEncoding::Text, Json::String(text)) => {
                Ok(ColumnValue::Raw(serde_json::from_str(text)?))
            }
            _ => Ok(ColumnValue::Raw(raw.clone())),
        }
    }

    fn serialize(&self, value: &ColumnValue) -> Result<Json> {
        let document = match value {
            ColumnValue::Raw(json) => json.clone(),
            ColumnValue::Attributes(set) => {
                let mut object = set.passthrough().clone();
                for (name, value) in set {
                    object.insert(name.clone(), value.to_json());
                }
                Json::Object(object)
            }
        };
        Ok(match (self.encoding, document) {
            (JsonEncoding::Text, Json::Null) => Json::Null,
            (JsonEncoding::Text, document) => Json::String(serde_json::to_string(&document)?),
            (JsonEncoding::Native, document) => document,
        })
    }

    fn default_raw(&self) -> Json {
        match self.encoding {
            JsonEncoding::Native => Json::Object(Map::new()),
            JsonEncoding::Text => Json::String("{}".to_string()),
        }
    }
}

/// An ordinary scalar column; values pass through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainColumn;

impl ColumnType for PlainColumn {
    fn deserialize(&self, raw: &Json) -> Result<ColumnValue> {
        Ok(ColumnValue::Raw(raw.clone()))
    }

    fn serialize(&self, value: &ColumnValue) -> Result<Json> {
        match value {
            ColumnValue::Raw(json) => Ok(json.clone()),
            ColumnValue::Attributes(_) => Err(AttrError::InvalidStoredValue {
                attribute: "column".to_string(),
                reason: "a plain column cannot hold an attribute set".to_string(),
            }),
        }
    }
}

/// Column adapter routing a blob column through a [`Store`].
#[derive(Debug, Clone)]
pub struct StoreColumn {
    original: Arc<dyn ColumnType>,
    store: Arc<Store>,
    unknown_keys: UnknownKeys,
}

impl StoreColumn {
    pub fn new(
        original: Arc<dyn ColumnType>,
        store: Arc<Store>,
        unknown_keys: UnknownKeys,
    ) -> Self {
        Self {
            original,
            store,
            unknown_keys,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn original(&self) -> &Arc<dyn ColumnType> {
        &self.original
    }

    /// Typed view of a stored object.
    ///
    /// Present keys are deserialized by their attribute; absent keys get the
    /// literal default when there is one. Computed defaults are left for the
    /// accessor, which has the record to evaluate them against.
    fn decompose(&self, object: &Map<String, Json>) -> Result<AttributeSet> {
        let mut set = AttributeSet::new();
        for (name, ty) in self.store.attributes() {
            match object.get(name) {
                Some(stored) => {
                    set.insert(name, ty.deserialize(stored));
                }
                None => {
                    if let Some(DefaultValue::Value(default)) = self.store.default_spec(name) {
                        set.insert(name, default.clone());
                    }
                }
            }
        }

        for (key, stored) in object {
            if self.store.contains(key) {
                continue;
            }
            match self.unknown_keys {
                UnknownKeys::Drop => {
                    warn!(
                        column = self.store.column(),
                        key = %key,
                        "dropping unregistered blob key"
                    );
                }
                UnknownKeys::Preserve => {
                    debug!(
                        column = self.store.column(),
                        key = %key,
                        "preserving unregistered blob key"
                    );
                    set.passthrough_mut().insert(key.clone(), stored.clone());
                }
                UnknownKeys::Reject => {
                    return Err(AttrError::UnknownKey {
                        key: key.clone(),
                        column: self.store.column().to_string(),
                    });
                }
            }
        }
        Ok(set)
    }

    fn compose(&self, set: &AttributeSet) -> Result<Map<String, Json>> {
        let mut object = set.passthrough().clone();
        for (name, value) in set {
            object.insert(name.clone(), self.store.serialize(name, value)?);
        }
        Ok(object)
    }
}

impl ColumnType for StoreColumn {
    /// A plain object gets the same typed coercion as a load.
    fn cast(&self, value: ColumnValue) -> Result<ColumnValue> {
        match value {
            ColumnValue::Raw(Json::Object(object)) => {
                Ok(ColumnValue::Attributes(self.decompose(&object)?))
            }
            ColumnValue::Attributes(set) => Ok(ColumnValue::Attributes(set)),
            other => self.original.cast(other),
        }
    }

    fn deserialize(&self, raw: &Json) -> Result<ColumnValue> {
        match self.original.deserialize(raw)? {
            ColumnValue::Raw(Json::Object(object)) => {
                Ok(ColumnValue::Attributes(self.decompose(&object)?))
            }
            other => Ok(other),
        }
    }

    fn serialize(&self, value: &ColumnValue) -> Result<Json> {
        match value {
            ColumnValue::Attributes(set) => {
                let object = self.compose(set)?;
                self.original.serialize(&ColumnValue::Raw(Json::Object(object)))
            }
            raw => self.original.serialize(raw),
        }
    }

    fn changed_in_place(&self, old_raw: &Json, new: &ColumnValue) -> Result<bool> {
        if self.deserialize(old_raw)? != *new {
            return Ok(true);
        }

        let (ColumnValue::Attributes(set), ColumnValue::Raw(Json::Object(old))) =
            (new, self.original.deserialize(old_raw)?)
        else {
            return Ok(false);
        };
        for (name, value) in set {
            if let Some(old_value) = old.get(name) {
                if self.store.attribute_type(name)?.changed_in_place(old_value, value) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn default_raw(&self) -> Json {
        self.original.default_raw()
    }
}
