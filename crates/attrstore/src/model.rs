//! # Host Model and Records
//!
//! [`Model`] stands in for a host record type: it has a name, a set of
//! physical columns (its schema, which may be loaded after the attribute
//! declarations), the stores bound to its blob columns, the accessor table and
//! the validators. [`Record`] is one instance: per column, the value currently
//! held in memory and the raw value last persisted.
//!
//! ## Declare, then finalize
//!
//! `serialize_attributes` records the binding straight away and installs the
//! [`StoreColumn`] adapter as soon as the column's original type is known:
//! immediately when the schema is already loaded, otherwise on
//! [`Model::load_schema`]. Either way each store is installed exactly once.
//!
//! ```ignore
//! let mut model = Model::new("Order");
//! model.serialize_attributes("data", |s| {
//!     s.attribute("flag", "boolean", AttributeOptions::new().with_default(false))?;
//!     Ok(())
//! })?;
//! model.load_schema(Schema::new().column("data", JsonColumn::native()))?;
//! let model = Arc::new(model);
//!
//! let mut order = Record::new(&model)?;
//! order.set("flag", "yes")?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::debug;
use uuid::Uuid;

use crate::accessor::{Accessor, Accessors};
use crate::column::{AttributeSet, ColumnType, ColumnValue, StoreColumn};
use crate::config::AttrstoreConfig;
use crate::error::{AttrError, Result};
use crate::store::{DefaultContext, Store, StoreBuilder};
use crate::types::{BuiltinTypes, TypeResolver};
use crate::validation::{Errors, InclusionValidator};
use crate::value::AttrValue;

/// Raw stored values of one record, keyed by column name.
pub type Row = BTreeMap<String, Json>;

/// Physical columns of a model with their original types.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<(String, Arc<dyn ColumnType>)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, ty: impl ColumnType + 'static) -> Self {
        self.columns.push((name.into(), Arc::new(ty)));
        self
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    fn get(&self, name: &str) -> Option<&Arc<dyn ColumnType>> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, ty)| ty)
    }
}

pub struct Model {
    name: String,
    config: AttrstoreConfig,
    resolver: Arc<dyn TypeResolver>,
    schema: Option<Schema>,
    stores: BTreeMap<String, Arc<Store>>,
    adapters: BTreeMap<String, Arc<dyn ColumnType>>,
    pending: Vec<String>,
    accessors: Accessors,
    validators: Vec<InclusionValidator>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .field("pending", &self.pending)
            .finish()
    }
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, AttrstoreConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: AttrstoreConfig) -> Self {
        Self {
            name: name.into(),
            config,
            resolver: Arc::new(BuiltinTypes::new()),
            schema: None,
            stores: BTreeMap::new(),
            adapters: BTreeMap::new(),
            pending: Vec::new(),
            accessors: Accessors::new(),
            validators: Vec::new(),
        }
    }

    /// Resolve type identifiers of later declarations through `resolver`.
    pub fn with_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AttrstoreConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<dyn TypeResolver> {
        &self.resolver
    }

    pub fn schema_loaded(&self) -> bool {
        self.schema.is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .as_ref()
            .map(|schema| schema.column_names().collect())
            .unwrap_or_default()
    }

    /// Load column metadata and install every adapter still waiting for it.
    pub fn load_schema(&mut self, schema: Schema) -> Result<()> {
        self.schema = Some(schema);
        for column in std::mem::take(&mut self.pending) {
            self.finalize(&column)?;
        }
        Ok(())
    }

    /// Bind a store to `column`, replacing any previous binding.
    ///
    /// Accessors are created for every registered attribute. A name already
    /// bound on another column is a `Configuration` error. The store's enum
    /// membership validators run on [`Record::validate`] against this column.
    pub fn serialize_attributes<F>(&mut self, column: &str, define: F) -> Result<Arc<Store>>
    where
        F: FnOnce(&mut StoreBuilder) -> Result<()>,
    {
        let store = Arc::new(Store::build(
            self.name.clone(),
            column,
            Arc::clone(&self.resolver),
            define,
        )?);

        for (name, _) in store.attributes() {
            if let Some(existing) = self.accessors.get(name) {
                if existing.column() != column {
                    return Err(AttrError::Configuration(format!(
                        "The attribute {} is already defined on the {} column of the {} model",
                        name,
                        existing.column(),
                        self.name
                    )));
                }
            }
        }

        if self.stores.insert(column.to_string(), Arc::clone(&store)).is_some() {
            self.accessors.remove_column(column);
            debug!(model = %self.name, column, "replacing serialized attributes binding");
        }

        for (name, _) in store.attributes() {
            self.accessors.insert(Accessor::new(name, Arc::clone(&store))?);
        }

        if self.schema_loaded() {
            self.finalize(column)?;
        } else if !self.pending.iter().any(|pending| pending == column) {
            self.pending.push(column.to_string());
        }
        Ok(store)
    }

    fn finalize(&mut self, column: &str) -> Result<()> {
        let store = self.store(column)?;
        let original = self
            .schema
            .as_ref()
            .ok_or_else(|| AttrError::SchemaNotLoaded(self.name.clone()))?
            .get(column)
            .cloned()
            .ok_or_else(|| AttrError::UnknownColumn {
                column: column.to_string(),
                model: self.name.clone(),
            })?;

        let adapter = StoreColumn::new(original, Arc::clone(store), self.config.unknown_keys);
        self.adapters.insert(column.to_string(), Arc::new(adapter));
        debug!(model = %self.name, column, "installed serialized attributes adapter");
        Ok(())
    }

    /// The effective type of `column`: its adapter when a store is bound.
    pub fn column_type(&self, column: &str) -> Result<Arc<dyn ColumnType>> {
        if let Some(adapter) = self.adapters.get(column) {
            return Ok(Arc::clone(adapter));
        }
        self.schema
            .as_ref()
            .ok_or_else(|| AttrError::SchemaNotLoaded(self.name.clone()))?
            .get(column)
            .cloned()
            .ok_or_else(|| AttrError::UnknownColumn {
                column: column.to_string(),
                model: self.name.clone(),
            })
    }

    pub fn store(&self, column: &str) -> Result<&Arc<Store>> {
        self.stores.get(column).ok_or_else(|| AttrError::NoStore {
            column: column.to_string(),
            model: self.name.clone(),
        })
    }

    /// Attribute names stored in `column`; see [`Store::attribute_names`].
    pub fn attribute_names_on(
        &self,
        column: &str,
        type_filter: Option<&str>,
        array: Option<bool>,
    ) -> Result<Vec<&str>> {
        self.store(column)?.attribute_names(type_filter, array)
    }

    pub fn accessor(&self, name: &str) -> Result<&Accessor> {
        self.accessors
            .get(name)
            .ok_or_else(|| AttrError::UnknownAttribute {
                attribute: name.to_string(),
                model: self.name.clone(),
            })
    }

    pub fn accessors(&self) -> &Accessors {
        &self.accessors
    }

    /// Attach a validation rule checked by [`Record::validate`].
    pub fn validates_with(&mut self, validator: InclusionValidator) {
        self.validators.push(validator);
    }

    /// Validators of the bound stores, then those attached by hand.
    pub fn validators(&self) -> Vec<&InclusionValidator> {
        self.stores
            .values()
            .flat_map(|store| store.validations())
            .chain(&self.validators)
            .collect()
    }
}

#[derive(Debug, Clone)]
struct ColumnState {
    persisted: Option<Json>,
    value: ColumnValue,
}

/// One instance of a [`Model`].
#[derive(Debug, Clone)]
pub struct Record {
    model: Arc<Model>,
    id: Option<Uuid>,
    columns: BTreeMap<String, ColumnState>,
    errors: Errors,
}

impl Record {
    /// A fresh, unsaved record with every column at its default.
    pub fn new(model: &Arc<Model>) -> Result<Self> {
        if !model.schema_loaded() {
            return Err(AttrError::SchemaNotLoaded(model.name().to_string()));
        }
        let mut columns = BTreeMap::new();
        for column in model.column_names() {
            let ty = model.column_type(column)?;
            let value = ty.deserialize(&ty.default_raw())?;
            columns.insert(
                column.to_string(),
                ColumnState {
                    persisted: None,
                    value,
                },
            );
        }
        Ok(Self {
            model: Arc::clone(model),
            id: None,
            columns,
            errors: Errors::new(),
        })
    }

    /// A fresh record with the given attributes assigned through their setters.
    pub fn build<I, K, V>(model: &Arc<Model>, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        let mut record = Self::new(model)?;
        for (name, value) in attributes {
            record.set(name.as_ref(), value)?;
        }
        Ok(record)
    }

    /// A persisted record read back from its raw row.
    ///
    /// Columns missing from the row load as `NULL`.
    pub fn load(model: &Arc<Model>, id: Uuid, row: &Row) -> Result<Self> {
        if !model.schema_loaded() {
            return Err(AttrError::SchemaNotLoaded(model.name().to_string()));
        }
        let mut columns = BTreeMap::new();
        for column in model.column_names() {
            let raw = row.get(column).cloned().unwrap_or(Json::Null);
            let value = model.column_type(column)?.deserialize(&raw)?;
            columns.insert(
                column.to_string(),
                ColumnState {
                    persisted: Some(raw),
                    value,
                },
            );
        }
        Ok(Self {
            model: Arc::clone(model),
            id: Some(id),
            columns,
            errors: Errors::new(),
        })
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn read_column(&self, column: &str) -> Result<&ColumnValue> {
        self.columns
            .get(column)
            .map(|state| &state.value)
            .ok_or_else(|| self.unknown_column(column))
    }

    /// Assign a column value, cast through the column's type.
    pub fn write_column(&mut self, column: &str, value: ColumnValue) -> Result<()> {
        let value = self.model.column_type(column)?.cast(value)?;
        let state = self
            .columns
            .get_mut(column)
            .ok_or_else(|| AttrError::UnknownColumn {
                column: column.to_string(),
                model: self.model.name().to_string(),
            })?;
        state.value = value;
        Ok(())
    }

    /// The decomposed blob of `column`; `None` when the column holds `NULL`.
    pub fn attribute_set(&self, column: &str) -> Result<Option<&AttributeSet>> {
        match self.read_column(column)? {
            ColumnValue::Attributes(set) => Ok(Some(set)),
            ColumnValue::Raw(Json::Null) => Ok(None),
            ColumnValue::Raw(other) => Err(not_an_object(column, other)),
        }
    }

    /// Mutable access to the decomposed blob of `column`.
    ///
    /// Changes made here are picked up by [`Record::changed`] through the
    /// adapter's in-place comparison.
    pub fn attributes_mut(&mut self, column: &str) -> Result<&mut AttributeSet> {
        let state = self
            .columns
            .get_mut(column)
            .ok_or_else(|| AttrError::UnknownColumn {
                column: column.to_string(),
                model: self.model.name().to_string(),
            })?;
        if let ColumnValue::Raw(Json::Null) = state.value {
            state.value = ColumnValue::Attributes(AttributeSet::new());
        }
        match &mut state.value {
            ColumnValue::Attributes(set) => Ok(set),
            ColumnValue::Raw(other) => Err(not_an_object(column, other)),
        }
    }

    pub fn get(&self, name: &str) -> Result<AttrValue> {
        self.model.accessor(name)?.get(self)
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) -> Result<()> {
        let model = Arc::clone(&self.model);
        model.accessor(name)?.set(self, value.into())
    }

    pub fn predicate(&self, name: &str) -> Result<bool> {
        self.model.accessor(name)?.predicate(self)
    }

    /// Every attribute of `column` as the getters see it, in registration order.
    pub fn serialized_attributes_on(&self, column: &str) -> Result<Vec<(String, AttrValue)>> {
        let store = self.model.store(column)?;
        store
            .attributes()
            .map(|(name, _)| Ok((name.to_string(), self.get(name)?)))
            .collect()
    }

    pub fn changed(&self) -> Result<bool> {
        Ok(!self.changed_columns()?.is_empty())
    }

    /// Columns whose value differs from the last persisted raw value, or from
    /// the column default on an unsaved record.
    pub fn changed_columns(&self) -> Result<Vec<&str>> {
        let mut changed = Vec::new();
        for (column, state) in &self.columns {
            let ty = self.model.column_type(column)?;
            let original = state.persisted.clone().unwrap_or_else(|| ty.default_raw());
            if ty.changed_in_place(&original, &state.value)? {
                changed.push(column.as_str());
            }
        }
        Ok(changed)
    }

    /// Raw row for persistence.
    pub fn to_row(&self) -> Result<Row> {
        self.columns
            .iter()
            .map(|(column, state)| {
                let raw = self.model.column_type(column)?.serialize(&state.value)?;
                Ok((column.clone(), raw))
            })
            .collect()
    }

    /// Record `row` as the persisted state under `id`.
    pub fn mark_persisted(&mut self, id: Uuid, row: &Row) {
        self.id = Some(id);
        for (column, state) in self.columns.iter_mut() {
            state.persisted = Some(row.get(column).cloned().unwrap_or(Json::Null));
        }
    }

    /// Run the model's validators, replacing any previous errors.
    ///
    /// Store validators read their attribute from the store's own column.
    /// A column that cannot be read fails the whole call.
    pub fn validate(&mut self) -> Result<bool> {
        self.errors.clear();
        let model = Arc::clone(&self.model);
        let mut errors = Errors::new();

        for store in model.stores.values() {
            for validator in store.validations() {
                let value = Accessor::new(validator.attribute(), Arc::clone(store))?.get(self)?;
                errors.extend(validator.validate(&value, model.config()));
            }
        }
        for validator in &model.validators {
            let value = self.get(validator.attribute())?;
            errors.extend(validator.validate(&value, model.config()));
        }

        self.errors = errors;
        Ok(self.errors.is_empty())
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    fn unknown_column(&self, column: &str) -> AttrError {
        AttrError::UnknownColumn {
            column: column.to_string(),
            model: self.model.name().to_string(),
        }
    }
}

impl DefaultContext for Record {
    fn read(&self, name: &str) -> AttrValue {
        self.get(name).unwrap_or(AttrValue::Null)
    }
}

fn not_an_object(column: &str, raw: &Json) -> AttrError {
    AttrError::InvalidStoredValue {
        attribute: column.to_string(),
        reason: format!("expected a JSON object, found {}", raw),
    }
}
