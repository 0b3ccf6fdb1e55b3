//! # Attrstore Architecture
//!
//! Attrstore gives a record type a set of statically named, independently
//! typed attributes that are physically stored together in one JSON blob
//! column. Reads decompose the blob into typed values, writes cast input and
//! recompose it, and the record never sees the raw document unless it asks for
//! it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Host Layer (model.rs, accessor.rs, table.rs)               │
//! │  - Model: schema, bound stores, accessor table, validators  │
//! │  - Record: get / set / predicate, change tracking           │
//! │  - MemTable: raw rows, save and reload                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Column Layer (column.rs)                                   │
//! │  - ColumnType: how a physical column reads and writes       │
//! │  - StoreColumn: wraps a blob column, yields AttributeSets   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Registry Layer (store.rs)                                  │
//! │  - Immutable name → type and name → default registry        │
//! │  - cast / deserialize / serialize / default / enum_options  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Type Layer (types/, value.rs)                              │
//! │  - Primitive, Array and Enum attribute types                │
//! │  - TypeResolver: identifier → type, injected per store      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Three states of an attribute
//!
//! Within a record's [`column::AttributeSet`] an attribute is either *set* to a
//! value (possibly null), or *unset* because its key is absent. Unset
//! attributes read as their default. Assigning null to an array attribute
//! casts to [`types::Cast::Clear`], which unsets the key again so the default
//! (possibly non-empty) shows through on the next read.
//!
//! ## Sharing
//!
//! A [`store::Store`] is frozen when its builder returns and is shared as
//! `Arc<Store>`; stores, types and resolvers are `Send + Sync`. Records are
//! plain owned values.
//!
//! ## Testing Strategy
//!
//! - Each module carries unit tests next to the code.
//! - `tests/` exercises whole models through save and reload, plus the
//!   round-trip and idempotence properties with `proptest`.
//! - Fixtures live in `test_utils`, behind the `test_utils` feature.

pub mod accessor;
pub mod column;
pub mod config;
pub mod error;
pub mod model;
pub mod schema;
pub mod store;
pub mod table;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod types;
pub mod validation;
pub mod value;

pub use column::{AttributeSet, ColumnType, ColumnValue, JsonColumn, StoreColumn};
pub use config::{AttrstoreConfig, UnknownKeys};
pub use error::{AttrError, Result};
pub use model::{Model, Record, Row, Schema};
pub use store::{AttributeOptions, DefaultContext, DefaultValue, Store, StoreBuilder};
pub use types::{AttributeType, BuiltinTypes, Cast, TypeResolver};
pub use value::AttrValue;
