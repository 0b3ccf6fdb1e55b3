use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AttrError {
    /// Lookup of a name the store never registered. A programmer error.
    #[error("The attribute {attribute} is not defined in serialize_attributes on the {model} model")]
    UnknownAttribute { attribute: String, model: String },

    #[error("{0}")]
    Configuration(String),

    #[error("`{0}` attribute is not an enum type")]
    NotAnEnum(String),

    #[error("Unknown attribute type: {0}")]
    UnknownType(String),

    #[error("Column {column} is not defined on the {model} model")]
    UnknownColumn { column: String, model: String },

    #[error("Column {column} has no serialized attributes store on the {model} model")]
    NoStore { column: String, model: String },

    #[error("Schema for the {0} model has not been loaded")]
    SchemaNotLoaded(String),

    #[error("Key {key} in column {column} is not a registered attribute")]
    UnknownKey { key: String, column: String },

    #[error("Array attribute {0} has no predicate")]
    NotPredicable(String),

    #[error("Invalid stored value for {attribute}: {reason}")]
    InvalidStoredValue { attribute: String, reason: String },

    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Table error: {0}")]
    Table(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AttrError>;
