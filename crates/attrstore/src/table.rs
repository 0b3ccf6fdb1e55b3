use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::{AttrError, Result};
use crate::model::{Model, Record, Row};

/// In-memory row table for one model.
///
/// Rows are kept in their raw stored form, exactly as a database column would
/// hold them, so a save followed by a `find` exercises the full
/// serialize/deserialize path.
///
/// Uses `RefCell` for interior mutability; a table is meant to be used from
/// one thread.
#[derive(Default)]
pub struct MemTable {
    rows: RefCell<HashMap<Uuid, Row>>,
    simulate_write_error: RefCell<bool>,
}

impl MemTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Insert a new row, assigning an id when the record has none.
    pub fn insert(&self, record: &mut Record) -> Result<Uuid> {
        let id = record.id().unwrap_or_else(Uuid::new_v4);
        self.write(id, record)?;
        Ok(id)
    }

    /// Overwrite the row of a persisted record.
    pub fn update(&self, record: &mut Record) -> Result<()> {
        let id = record
            .id()
            .filter(|id| self.rows.borrow().contains_key(id))
            .ok_or_else(|| AttrError::RecordNotFound(record.id().unwrap_or_default()))?;
        self.write(id, record)
    }

    /// Insert or update depending on whether the record was saved before.
    pub fn save(&self, record: &mut Record) -> Result<Uuid> {
        match record.id() {
            Some(id) if self.rows.borrow().contains_key(&id) => {
                self.update(record)?;
                Ok(id)
            }
            _ => self.insert(record),
        }
    }

    pub fn find(&self, model: &Arc<Model>, id: Uuid) -> Result<Record> {
        let rows = self.rows.borrow();
        let row = rows.get(&id).ok_or(AttrError::RecordNotFound(id))?;
        Record::load(model, id, row)
    }

    /// Replace `record` with a fresh load of its row.
    pub fn reload(&self, record: &mut Record) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| AttrError::RecordNotFound(Uuid::nil()))?;
        *record = self.find(record.model(), id)?;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.rows
            .borrow_mut()
            .remove(&id)
            .map(|_| ())
            .ok_or(AttrError::RecordNotFound(id))
    }

    /// The raw stored row, as persisted.
    pub fn raw_row(&self, id: Uuid) -> Option<Row> {
        self.rows.borrow().get(&id).cloned()
    }

    fn write(&self, id: Uuid, record: &mut Record) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(AttrError::Table("Simulated write error".to_string()));
        }
        let row = record.to_row()?;
        debug!(model = record.model().name(), %id, "writing row");
        self.rows.borrow_mut().insert(id, row.clone());
        record.mark_persisted(id, &row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::JsonColumn;
    use crate::model::Schema;
    use crate::store::AttributeOptions;
    use crate::value::AttrValue;
    use serde_json::json;

    fn model() -> Arc<Model> {
        let mut model = Model::new("Order");
        model.load_schema(Schema::new().column("data", JsonColumn::native())).unwrap();
        model
            .serialize_attributes("data", |s| {
                s.attribute("flag", "boolean", AttributeOptions::new().with_default(false))?;
                s.attribute("tags", "string", AttributeOptions::new().array())?;
                Ok(())
            })
            .unwrap();
        Arc::new(model)
    }

    #[test]
    fn insert_then_find() {
        let model = model();
        let table = MemTable::new();
        let mut record = Record::build(&model, [("tags", vec!["a", "b"])]).unwrap();
        let id = table.insert(&mut record).unwrap();

        assert_eq!(record.id(), Some(id));
        assert!(!record.changed().unwrap());

        let found = table.find(&model, id).unwrap();
        assert_eq!(found.get("tags").unwrap(), AttrValue::from(vec!["a", "b"]));
        assert_eq!(
            table.raw_row(id).unwrap()["data"],
            json!({"flag": false, "tags": ["a", "b"]})
        );
    }

    #[test]
    fn save_updates_existing_rows() {
        let model = model();
        let table = MemTable::new();
        let mut record = Record::new(&model).unwrap();
        let id = table.save(&mut record).unwrap();

        record.set("flag", true).unwrap();
        assert_eq!(table.save(&mut record).unwrap(), id);
        assert_eq!(table.len(), 1);
        assert_eq!(table.raw_row(id).unwrap()["data"]["flag"], json!(true));
    }

    #[test]
    fn update_of_unsaved_record_fails() {
        let table = MemTable::new();
        let mut record = Record::new(&model()).unwrap();
        assert!(matches!(
            table.update(&mut record),
            Err(AttrError::RecordNotFound(_))
        ));
    }

    #[test]
    fn reload_discards_unsaved_changes() {
        let model = model();
        let table = MemTable::new();
        let mut record = Record::new(&model).unwrap();
        table.insert(&mut record).unwrap();

        record.set("flag", true).unwrap();
        table.reload(&mut record).unwrap();
        assert_eq!(record.get("flag").unwrap(), AttrValue::Bool(false));
    }

    #[test]
    fn find_missing_row() {
        let table = MemTable::new();
        let id = Uuid::new_v4();
        match table.find(&model(), id) {
            Err(AttrError::RecordNotFound(missing)) => assert_eq!(missing, id),
            other => panic!("Expected RecordNotFound, got {:?}", other),
        }
    }

    #[test]
    fn simulated_write_error() {
        let table = MemTable::new();
        table.set_simulate_write_error(true);
        let mut record = Record::new(&model()).unwrap();
        assert!(table.insert(&mut record).is_err());
        assert!(table.is_empty());
        assert!(!record.is_persisted());
    }

    #[test]
    fn delete_row() {
        let model = model();
        let table = MemTable::new();
        let mut record = Record::new(&model).unwrap();
        let id = table.insert(&mut record).unwrap();
        table.delete(id).unwrap();
        assert!(table.raw_row(id).is_none());
        assert!(table.delete(id).is_err());
    }
}
