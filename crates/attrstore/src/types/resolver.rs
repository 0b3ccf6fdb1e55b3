//! Type identifier resolution.
//!
//! Stores never look types up in process-wide state: a [`TypeResolver`] is
//! handed to the store builder, and every `"boolean"`, `"enum"`, ... identifier
//! goes through it. [`BuiltinTypes`] knows the stock primitives and can be
//! extended with custom [`PrimitiveType`]s.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{
    AttributeType, BooleanType, DateTimeType, DecimalType, EnumType, FloatType, IntegerType,
    PrimitiveType, StringType, ValueType,
};
use crate::error::{AttrError, Result};
use crate::value::AttrValue;

/// Either a type identifier or an already-built type.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Id(String),
    Type(AttributeType),
}

impl From<&str> for TypeRef {
    fn from(id: &str) -> Self {
        TypeRef::Id(id.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(id: String) -> Self {
        TypeRef::Id(id)
    }
}

impl From<AttributeType> for TypeRef {
    fn from(ty: AttributeType) -> Self {
        TypeRef::Type(ty)
    }
}

/// Options handed to the resolver along with a type identifier.
#[derive(Debug, Clone, Default)]
pub struct TypeOptions {
    /// Permitted values (`enum` only)
    pub of: Option<Vec<AttrValue>>,
    /// Type used to cast enum values (`enum` only)
    pub inner: Option<Box<TypeRef>>,
    /// Fractional-second digits (`datetime`)
    pub precision: Option<u16>,
    /// Digits after the decimal point (`decimal`)
    pub scale: Option<u32>,
}

pub trait TypeResolver: Send + Sync {
    fn resolve(&self, id: &str, options: &TypeOptions) -> Result<AttributeType>;

    /// Resolve a [`TypeRef`], passing prebuilt types through.
    fn resolve_ref(&self, type_ref: &TypeRef, options: &TypeOptions) -> Result<AttributeType> {
        match type_ref {
            TypeRef::Id(id) => self.resolve(id, options),
            TypeRef::Type(ty) => Ok(ty.clone()),
        }
    }
}

pub type PrimitiveFactory = Arc<dyn Fn(&TypeOptions) -> Arc<dyn PrimitiveType> + Send + Sync>;

/// The stock resolver.
///
/// | Identifier | Type |
/// |------------|------|
/// | `boolean`, `bool` | [`BooleanType`] |
/// | `string`, `text` | [`StringType`] |
/// | `integer` | [`IntegerType`] |
/// | `float` | [`FloatType`] |
/// | `decimal` | [`DecimalType`] (honours `scale`) |
/// | `datetime` | [`DateTimeType`] (honours `precision`) |
/// | `value` | [`ValueType`] |
/// | `enum` | [`EnumType`] (honours `of` and `inner`) |
#[derive(Clone)]
pub struct BuiltinTypes {
    factories: HashMap<String, PrimitiveFactory>,
    aliases: HashMap<String, String>,
}

impl fmt::Debug for BuiltinTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("BuiltinTypes").field("types", &ids).finish()
    }
}

impl Default for BuiltinTypes {
    fn default() -> Self {
        let mut types = Self {
            factories: HashMap::new(),
            aliases: HashMap::new(),
        };
        types.register("boolean", |_| Arc::new(BooleanType));
        types.register("string", |_| Arc::new(StringType));
        types.register("integer", |_| Arc::new(IntegerType));
        types.register("float", |_| Arc::new(FloatType));
        types.register("decimal", |options| Arc::new(DecimalType { scale: options.scale }));
        types.register("datetime", |options| {
            Arc::new(
                options
                    .precision
                    .map(DateTimeType::with_precision)
                    .unwrap_or_default(),
            )
        });
        types.register("value", |_| Arc::new(ValueType));
        types.alias("bool", "boolean");
        types.alias("text", "string");
        types
    }
}

impl BuiltinTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a primitive type under `id`.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&TypeOptions) -> Arc<dyn PrimitiveType> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }

    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) -> &mut Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    fn canonical<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }

    fn resolve_enum(&self, options: &TypeOptions) -> Result<AttributeType> {
        let inner = match options.inner.as_deref() {
            Some(inner) => {
                let ty = self.resolve_ref(inner, &TypeOptions::default())?;
                if ty.as_enum().is_some() || ty.is_array() {
                    return Err(AttrError::Configuration(
                        "Enum inner type must be a primitive type".to_string(),
                    ));
                }
                Some(ty)
            }
            None => None,
        };
        let values = options.of.clone().unwrap_or_default();
        Ok(AttributeType::Enum(EnumType::new(values, inner)))
    }
}

impl TypeResolver for BuiltinTypes {
    fn resolve(&self, id: &str, options: &TypeOptions) -> Result<AttributeType> {
        let id = self.canonical(id);
        if id == EnumType::NAME {
            return self.resolve_enum(options);
        }
        self.factories
            .get(id)
            .map(|factory| AttributeType::Primitive(factory(options)))
            .ok_or_else(|| AttrError::UnknownType(id.to_string()))
    }
}
