//! # Serialized Attributes Store
//!
//! A [`Store`] is the registry of attributes kept inside one blob column of one
//! model. It is built exactly once, through a [`StoreBuilder`] callback, and is
//! immutable afterwards: the builder is consumed by the build and `Store` has no
//! mutating methods, so a built store can be shared across threads freely.
//!
//! ```ignore
//! let store = Store::build("Order", "data", resolver, |s| {
//!     s.attribute("flag", "boolean", AttributeOptions::new().with_default(false))?;
//!     s.attribute("tags", "string", AttributeOptions::new().array())?;
//!     s.attribute("status", "enum", AttributeOptions::new().of(vec![None, Some("placed")]))?;
//!     Ok(())
//! })?;
//! ```
//!
//! ## Defaults
//!
//! A default is either a literal or a computation evaluated on read against a
//! [`DefaultContext`], usually the owning record. Array attributes without an
//! explicit default get `[]`.
//!
//! The registry cannot be extended once built:
//!
//! ```compile_fail
//! use attrstore::store::Store;
//! fn extend(store: &Store) {
//!     store.attribute("late", "string", Default::default());
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::{debug, trace, warn};

use crate::error::{AttrError, Result};
use crate::types::{enum_array_error, AttributeType, Cast, TypeOptions, TypeRef, TypeResolver};
use crate::validation::InclusionValidator;
use crate::value::AttrValue;

/// Read-only view of sibling attributes, handed to computed defaults.
pub trait DefaultContext {
    fn read(&self, name: &str) -> AttrValue;
}

pub type ComputedDefault = Arc<dyn Fn(&dyn DefaultContext) -> AttrValue + Send + Sync>;

#[derive(Clone)]
pub enum DefaultValue {
    Value(AttrValue),
    Computed(ComputedDefault),
}

impl DefaultValue {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&dyn DefaultContext) -> AttrValue + Send + Sync + 'static,
    {
        DefaultValue::Computed(Arc::new(f))
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, DefaultValue::Computed(_))
    }

    pub fn evaluate(&self, context: &dyn DefaultContext) -> AttrValue {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Computed(f) => f(context),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Options for [`StoreBuilder::attribute`].
///
/// Everything except `default` and `array` is handed to the type resolver.
#[derive(Debug, Clone, Default)]
pub struct AttributeOptions {
    pub default: Option<DefaultValue>,
    pub array: bool,
    pub type_options: TypeOptions,
}

impl AttributeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: impl Into<AttrValue>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn with_computed_default<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn DefaultContext) -> AttrValue + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::computed(f));
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Permitted values of an `enum` attribute.
    pub fn of<T: Into<AttrValue>>(mut self, options: Vec<T>) -> Self {
        self.type_options.of = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Type used to cast `enum` values.
    pub fn inner(mut self, ty: impl Into<TypeRef>) -> Self {
        self.type_options.inner = Some(Box::new(ty.into()));
        self
    }

    pub fn precision(mut self, precision: u16) -> Self {
        self.type_options.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.type_options.scale = Some(scale);
        self
    }
}

#[derive(Debug, Clone)]
struct Attribute {
    name: String,
    ty: AttributeType,
}

/// Registration context handed to the [`Store::build`] callback.
pub struct StoreBuilder {
    model: String,
    column: String,
    resolver: Arc<dyn TypeResolver>,
    attributes: Vec<Attribute>,
    defaults: HashMap<String, DefaultValue>,
    validations: Vec<InclusionValidator>,
}

impl StoreBuilder {
    /// Register an attribute.
    ///
    /// Registering a name twice replaces the first definition in place.
    pub fn attribute(
        &mut self,
        name: impl Into<String>,
        ty: impl Into<TypeRef>,
        options: AttributeOptions,
    ) -> Result<&mut Self> {
        let name = name.into();
        let AttributeOptions {
            default,
            array,
            type_options,
        } = options;

        let mut ty = self.resolver.resolve_ref(&ty.into(), &type_options)?;
        if ty.is_array() && ty.element().as_enum().is_some() {
            return Err(enum_array_error());
        }
        if array {
            ty = AttributeType::array(ty)?;
        }

        self.validations.retain(|v| v.attribute() != name);
        if let Some(validator) = ty.validator(&name) {
            self.validations.push(validator);
        }

        match default {
            Some(default) => {
                self.defaults.insert(name.clone(), default);
            }
            None if array => {
                self.defaults
                    .insert(name.clone(), DefaultValue::Value(AttrValue::List(Vec::new())));
            }
            None => {
                self.defaults.remove(&name);
            }
        }

        debug!(
            model = %self.model,
            column = %self.column,
            attribute = %name,
            ty = ty.type_name(),
            array,
            "registered serialized attribute"
        );

        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.ty = ty,
            None => self.attributes.push(Attribute { name, ty }),
        }
        Ok(self)
    }

    /// Register an attribute backed by an already-built type.
    pub fn attribute_type(
        &mut self,
        name: impl Into<String>,
        ty: AttributeType,
        options: AttributeOptions,
    ) -> Result<&mut Self> {
        self.attribute(name, TypeRef::Type(ty), options)
    }
}

pub struct Store {
    model: String,
    column: String,
    resolver: Arc<dyn TypeResolver>,
    attributes: Vec<Attribute>,
    index: HashMap<String, usize>,
    defaults: HashMap<String, DefaultValue>,
    validations: Vec<InclusionValidator>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("model", &self.model)
            .field("column", &self.column)
            .field("attributes", &self.attributes)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Store {
    /// Build and freeze a store for `column` of `model`.
    pub fn build<F>(
        model: impl Into<String>,
        column: impl Into<String>,
        resolver: Arc<dyn TypeResolver>,
        define: F,
    ) -> Result<Store>
    where
        F: FnOnce(&mut StoreBuilder) -> Result<()>,
    {
        let mut builder = StoreBuilder {
            model: model.into(),
            column: column.into(),
            resolver,
            attributes: Vec::new(),
            defaults: HashMap::new(),
            validations: Vec::new(),
        };
        define(&mut builder)?;

        let StoreBuilder {
            model,
            column,
            resolver,
            attributes,
            defaults,
            validations,
        } = builder;
        let index = attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name.clone(), i))
            .collect();

        debug!(%model, %column, attributes = attributes.len(), "built serialized attributes store");
        Ok(Store {
            model,
            column,
            resolver,
            attributes,
            index,
            defaults,
            validations,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered attributes with their types, in registration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeType)> {
        self.attributes.iter().map(|a| (a.name.as_str(), &a.ty))
    }

    /// Enum membership rules for the host to attach.
    pub fn validations(&self) -> &[InclusionValidator] {
        &self.validations
    }

    pub fn attribute_type(&self, name: &str) -> Result<&AttributeType> {
        self.index
            .get(name)
            .map(|&i| &self.attributes[i].ty)
            .ok_or_else(|| self.unknown(name))
    }

    /// Names of the attributes managed by this store, in registration order.
    ///
    /// `type_filter` keeps attributes whose type (looking through array
    /// wrapping) resolves to the same identifier; `array` keeps only array or
    /// only non-array attributes.
    ///
    /// ```ignore
    /// store.attribute_names(None, None)?;              // [user_name, subscribed, subscriptions]
    /// store.attribute_names(Some("string"), None)?;    // [user_name, subscriptions]
    /// store.attribute_names(Some("string"), Some(true))?;  // [subscriptions]
    /// ```
    pub fn attribute_names(
        &self,
        type_filter: Option<&str>,
        array: Option<bool>,
    ) -> Result<Vec<&str>> {
        let type_name = match type_filter {
            Some(id) => Some(self.resolver.resolve(id, &TypeOptions::default())?.type_name()),
            None => None,
        };
        Ok(self
            .attributes
            .iter()
            .filter(|a| array.map_or(true, |array| a.ty.is_array() == array))
            .filter(|a| type_name.map_or(true, |name| a.ty.type_name() == name))
            .map(|a| a.name.as_str())
            .collect())
    }

    /// Cast input for assignment.
    ///
    /// ```ignore
    /// store.cast("user_name", 42)?  // Cast::Value("42")
    /// ```
    pub fn cast(&self, name: &str, value: impl Into<AttrValue>) -> Result<Cast> {
        let cast = self.attribute_type(name)?.cast(value.into());
        trace!(column = %self.column, attribute = name, ?cast, "cast attribute");
        Ok(cast)
    }

    /// Deserialize a value as stored in the blob.
    ///
    /// ```ignore
    /// store.deserialize("subscribed", &json!("0"))?  // Bool(false)
    /// ```
    pub fn deserialize(&self, name: &str, stored: &Json) -> Result<AttrValue> {
        Ok(self.attribute_type(name)?.deserialize(stored))
    }

    pub fn serialize(&self, name: &str, value: &AttrValue) -> Result<Json> {
        Ok(self.attribute_type(name)?.serialize(value))
    }

    /// The default for `name`; computed defaults are evaluated against
    /// `context`, or against the store itself when none is given.
    ///
    /// A computed default that ends up reading its own attribute, directly or
    /// through another computed default, gets a `Configuration` error for the
    /// inner read, which a [`DefaultContext`] sees as null.
    pub fn default(&self, name: &str, context: Option<&dyn DefaultContext>) -> Result<AttrValue> {
        self.attribute_type(name)?;
        let default = match self.defaults.get(name) {
            Some(computed @ DefaultValue::Computed(_)) => computed,
            Some(DefaultValue::Value(value)) => return Ok(value.clone()),
            None => return Ok(AttrValue::Null),
        };

        let Some(_guard) = Evaluating::enter(self, name) else {
            warn!(column = %self.column, attribute = name, "computed default reads itself");
            return Err(AttrError::Configuration(format!(
                "Computed default for {} on the {} model reads itself",
                name, self.model
            )));
        };
        Ok(default.evaluate(context.unwrap_or(self)))
    }

    pub fn default_spec(&self, name: &str) -> Option<&DefaultValue> {
        self.defaults.get(name)
    }

    pub fn enum_options(&self, name: &str) -> Result<&[AttrValue]> {
        self.attribute_type(name)?
            .as_enum()
            .map(|enumeration| enumeration.options())
            .ok_or_else(|| AttrError::NotAnEnum(name.to_string()))
    }

    fn unknown(&self, name: &str) -> AttrError {
        AttrError::UnknownAttribute {
            attribute: name.to_string(),
            model: self.model.clone(),
        }
    }
}

thread_local! {
    static EVALUATING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a computed default as being evaluated on this thread.
struct Evaluating;

impl Evaluating {
    fn enter(store: &Store, name: &str) -> Option<Self> {
        let key = (store as *const Store as usize, name.to_string());
        EVALUATING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                return None;
            }
            stack.push(key);
            Some(Evaluating)
        })
    }
}

impl Drop for Evaluating {
    fn drop(&mut self) {
        EVALUATING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Without a record, defaults see the other attributes' defaults.
impl DefaultContext for Store {
    fn read(&self, name: &str) -> AttrValue {
        self.default(name, None).unwrap_or(AttrValue::Null)
    }
}
