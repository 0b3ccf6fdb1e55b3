//! Shared fixtures for unit and integration tests.
//!
//! `my_model` is an order-like model with a JSON `data` column carrying one
//! attribute of every flavour, next to an ordinary `normal_column`.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::column::{JsonColumn, PlainColumn};
use crate::error::Result;
use crate::model::{Model, Record, Row, Schema};
use crate::store::{AttributeOptions, StoreBuilder};
use crate::table::MemTable;
use crate::value::AttrValue;

pub const ENUMY_OPTIONS: [Option<&str>; 3] = [None, Some("placed"), Some("confirmed")];

/// Attributes of the `data` column, in registration order.
pub const MY_MODEL_ATTRIBUTES: [&str; 8] = [
    "booly",
    "booly_default",
    "stringy",
    "timestamp",
    "listy",
    "listy_integer",
    "enumy",
    "decy",
];

pub fn define_data(s: &mut StoreBuilder) -> Result<()> {
    s.attribute("booly", "boolean", AttributeOptions::new())?;
    s.attribute("booly_default", "boolean", AttributeOptions::new().with_default(true))?;
    s.attribute("stringy", "string", AttributeOptions::new())?;
    s.attribute("timestamp", "datetime", AttributeOptions::new())?;
    s.attribute("listy", "string", AttributeOptions::new().array())?;
    s.attribute("listy_integer", "integer", AttributeOptions::new().array())?;
    s.attribute("enumy", "enum", AttributeOptions::new().of(ENUMY_OPTIONS.to_vec()))?;
    s.attribute("decy", "decimal", AttributeOptions::new())?;
    Ok(())
}

pub fn my_schema() -> Schema {
    Schema::new()
        .column("normal_column", PlainColumn)
        .column("data", JsonColumn::native())
}

/// `MyModel` with its schema loaded and the `data` store installed.
pub fn my_model() -> Arc<Model> {
    let mut model = Model::new("MyModel");
    model
        .serialize_attributes("data", define_data)
        .expect("fixture attributes are valid");
    model
        .load_schema(my_schema())
        .expect("fixture schema is valid");
    Arc::new(model)
}

/// A model paired with a table to save its records in.
pub struct RecordFixture {
    pub model: Arc<Model>,
    pub table: MemTable,
}

impl Default for RecordFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordFixture {
    pub fn new() -> Self {
        Self::with_model(my_model())
    }

    pub fn with_model(model: Arc<Model>) -> Self {
        Self {
            model,
            table: MemTable::new(),
        }
    }

    /// Build a record through its setters and save it.
    pub fn create<I, K, V>(&self, attributes: I) -> Record
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        let mut record = Record::build(&self.model, attributes).expect("fixture attributes");
        self.table.insert(&mut record).expect("fixture insert");
        record
    }

    /// Save a record whose columns are written raw, then load it back.
    pub fn create_raw(&self, columns: &[(&str, Json)]) -> Record {
        let mut record = Record::new(&self.model).expect("fixture record");
        for (column, raw) in columns {
            record
                .write_column(column, Json::clone(raw).into())
                .expect("fixture column");
        }
        let id = self.table.insert(&mut record).expect("fixture insert");
        self.table.find(&self.model, id).expect("fixture find")
    }

    pub fn row(&self, record: &Record) -> Row {
        record
            .id()
            .and_then(|id| self.table.raw_row(id))
            .expect("record is saved")
    }
}
