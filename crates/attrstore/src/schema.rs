//! # Declarative Schema Files
//!
//! A model and its serialized attributes can be described in TOML instead of
//! code. This is what the `attrstore` CLI reads.
//!
//! ```toml
//! [model]
//! name = "Order"
//!
//! [[columns]]
//! name = "data"
//! encoding = "native"        # or "text" for JSON kept as a string
//!
//! [[columns.attributes]]
//! name = "flag"
//! type = "boolean"
//! default = false
//!
//! [[columns.attributes]]
//! name = "tags"
//! type = "string"
//! array = true
//!
//! [[columns.attributes]]
//! name = "status"
//! type = "enum"
//! of = ["placed", "confirmed"]
//! allow_null = true          # prepends a null option
//! ```
//!
//! TOML has no null, so `allow_null` stands in for a null enum option and an
//! omitted `default` means "no default".

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::column::{JsonColumn, JsonEncoding};
use crate::config::AttrstoreConfig;
use crate::error::{AttrError, Result};
use crate::model::{Model, Schema};
use crate::store::AttributeOptions;
use crate::types::TypeResolver;
use crate::value::AttrValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    pub model: ModelSection,
    #[serde(default)]
    pub columns: Vec<ColumnSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSection {
    pub name: String,
    #[serde(default)]
    pub encoding: JsonEncoding,
    #[serde(default)]
    pub attributes: Vec<AttributeSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSection {
    pub name: String,
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Json>,
    #[serde(default)]
    pub array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub of: Option<Vec<Json>>,
    #[serde(default)]
    pub allow_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

impl AttributeSection {
    fn options(&self) -> AttributeOptions {
        let mut options = AttributeOptions::new();
        if let Some(default) = &self.default {
            options = options.with_default(AttrValue::from_json(default));
        }
        if self.array {
            options = options.array();
        }
        if self.of.is_some() || self.allow_null {
            let mut values = Vec::new();
            if self.allow_null {
                values.push(AttrValue::Null);
            }
            values.extend(self.of.iter().flatten().map(AttrValue::from_json));
            options = options.of(values);
        }
        if let Some(inner) = &self.inner {
            options = options.inner(inner.as_str());
        }
        if let Some(precision) = self.precision {
            options = options.precision(precision);
        }
        if let Some(scale) = self.scale {
            options = options.scale(scale);
        }
        options
    }
}

impl SchemaFile {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AttrError::Config(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AttrError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSection> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Declare every column's attributes, then load the column schema.
    pub fn build_model(
        &self,
        resolver: Arc<dyn TypeResolver>,
        config: AttrstoreConfig,
    ) -> Result<Model> {
        let mut model = Model::with_config(self.model.name.clone(), config).with_resolver(resolver);
        let mut schema = Schema::new();

        for column in &self.columns {
            if !column.attributes.is_empty() {
                model.serialize_attributes(&column.name, |s| {
                    for attribute in &column.attributes {
                        s.attribute(
                            attribute.name.as_str(),
                            attribute.type_id.as_str(),
                            attribute.options(),
                        )?;
                    }
                    Ok(())
                })?;
            }
            schema = schema.column(
                column.name.clone(),
                JsonColumn {
                    encoding: column.encoding,
                },
            );
        }

        model.load_schema(schema)?;
        Ok(model)
    }
}
