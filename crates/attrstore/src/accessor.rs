//! Per-attribute accessors.
//!
//! Every attribute registered on a model gets an [`Accessor`]: a getter, a
//! presence predicate and a setter, all bound to the attribute's [`Store`] and
//! its host column. The model keeps them in an [`Accessors`] table keyed by
//! attribute name, and [`Record`] dispatches `get`/`set`/`predicate` through
//! it.

use std::collections::btree_map::{self, BTreeMap};
use std::sync::Arc;

use tracing::trace;

use crate::column::ColumnValue;
use crate::error::{AttrError, Result};
use crate::model::Record;
use crate::store::{DefaultContext, Store};
use crate::types::Cast;
use crate::value::AttrValue;

#[derive(Debug, Clone)]
pub struct Accessor {
    name: String,
    column: String,
    store: Arc<Store>,
    array: bool,
}

impl Accessor {
    pub fn new(name: impl Into<String>, store: Arc<Store>) -> Result<Self> {
        let name = name.into();
        let array = store.attribute_type(&name)?.is_array();
        Ok(Self {
            column: store.column().to_string(),
            name,
            store,
            array,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Array attributes have no predicate.
    pub fn has_predicate(&self) -> bool {
        !self.array
    }

    /// The stored value, or the default when the key is unset.
    ///
    /// Reading never writes the default back into the record.
    pub fn get(&self, record: &Record) -> Result<AttrValue> {
        let stored = record
            .attribute_set(&self.column)?
            .and_then(|set| set.get(&self.name))
            .cloned();
        match stored {
            Some(value) => Ok(value),
            None => self
                .store
                .default(&self.name, Some(record as &dyn DefaultContext)),
        }
    }

    pub fn predicate(&self, record: &Record) -> Result<bool> {
        if self.array {
            return Err(AttrError::NotPredicable(self.name.clone()));
        }
        Ok(self.get(record)?.is_truthy())
    }

    /// Cast and assign; a cast to [`Cast::Clear`] unsets the key.
    pub fn set(&self, record: &mut Record, value: AttrValue) -> Result<()> {
        let cast = self.store.cast(&self.name, value)?;
        let mut set = record
            .attribute_set(&self.column)?
            .cloned()
            .unwrap_or_default();
        match cast {
            Cast::Value(value) => {
                set.insert(self.name.clone(), value);
            }
            Cast::Clear => {
                trace!(attribute = %self.name, "clearing attribute");
                set.remove(&self.name);
            }
        }
        record.write_column(&self.column, ColumnValue::Attributes(set))
    }
}

/// Accessor table of a model, keyed by attribute name.
///
/// Names are global to the model, so a name is bound on one column only.
#[derive(Debug, Clone, Default)]
pub struct Accessors {
    entries: BTreeMap<String, Accessor>,
}

impl Accessors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Accessor> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, accessor: Accessor) {
        self.entries.insert(accessor.name.clone(), accessor);
    }

    /// Drop every accessor bound to `column`.
    pub fn remove_column(&mut self, column: &str) {
        self.entries.retain(|_, accessor| accessor.column != column);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, Accessor> {
        self.entries.values()
    }
}
