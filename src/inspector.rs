//! Property enumeration and name matching.
//!
//! [`SchemaTypeInspector`] reads descriptors from the schema. Decorators rename
//! ([`NamingConventionTypeInspector`]), reorder ([`OrderedTypeInspector`]) and memoize
//! ([`CachedTypeInspector`]) the list. Matching rules live in the trait's provided
//! [`TypeInspector::find_property`] so every decorator shares them.

use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, DecodeError};
use crate::location::Location;
use crate::naming::NamingConvention;
use crate::schema::{PropertyDescriptor, Schema};

pub type Properties = Arc<[PropertyDescriptor]>;

pub trait TypeInspector: Send + Sync {
    /// Properties of object type `ty` in emission order.
    fn properties(&self, ty: &str) -> Result<Properties, ConfigurationError>;

    /// Property of `ty` whose document name is `name`.
    ///
    /// No match yields `Ok(None)` when `ignore_unmatched` is set and `PropertyNotFound`
    /// otherwise. More than one match is always `AmbiguousProperty`, listing every
    /// candidate.
    fn find_property(
        &self,
        ty: &str,
        name: &str,
        case_insensitive: bool,
        ignore_unmatched: bool,
    ) -> Result<Option<PropertyDescriptor>, DecodeError> {
        let properties = self.properties(ty)?;
        let folded = name.to_lowercase();
        let candidates: Vec<&PropertyDescriptor> = properties
            .iter()
            .filter(|p| {
                if case_insensitive {
                    p.name.to_lowercase() == folded
                } else {
                    &*p.name == name
                }
            })
            .collect();

        match candidates.as_slice() {
            [] if ignore_unmatched => Ok(None),
            [] => Err(DecodeError::PropertyNotFound {
                property: name.to_owned(),
                ty: ty.to_owned(),
                location: Location::UNKNOWN,
            }),
            [only] => Ok(Some((*only).clone())),
            many => Err(DecodeError::AmbiguousProperty {
                property: name.to_owned(),
                ty: ty.to_owned(),
                candidates: many.iter().map(|p| p.name.to_string()).collect(),
                location: Location::UNKNOWN,
            }),
        }
    }
}

/// Reads properties straight from the schema, inherited ones first.
#[derive(Debug, Clone)]
pub struct SchemaTypeInspector {
    schema: Arc<Schema>,
}

impl SchemaTypeInspector {
    pub fn new(schema: Arc<Schema>) -> Self {
        SchemaTypeInspector { schema }
    }
}

impl TypeInspector for SchemaTypeInspector {
    fn properties(&self, ty: &str) -> Result<Properties, ConfigurationError> {
        Ok(self.schema.properties(ty)?.into())
    }
}

/// Applies a naming convention to every property without an explicit alias.
pub struct NamingConventionTypeInspector {
    inner: Box<dyn TypeInspector>,
    convention: Arc<dyn NamingConvention>,
}

impl NamingConventionTypeInspector {
    pub fn new(inner: Box<dyn TypeInspector>, convention: Arc<dyn NamingConvention>) -> Self {
        NamingConventionTypeInspector { inner, convention }
    }
}

impl TypeInspector for NamingConventionTypeInspector {
    fn properties(&self, ty: &str) -> Result<Properties, ConfigurationError> {
        let properties = self.inner.properties(ty)?;
        Ok(properties
            .iter()
            .map(|p| {
                let mut p = p.clone();
                if p.alias.is_none() {
                    p.name = Arc::from(self.convention.apply(&p.member));
                }
                p
            })
            .collect())
    }
}

/// Secondary ordering for properties that share an `order` value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyOrder {
    /// Declaration order (inherited properties first).
    #[default]
    Declared,
    /// By document name.
    Alphabetical,
}

/// Sorts explicitly ordered properties first, by `order`, then the rest.
pub struct OrderedTypeInspector {
    inner: Box<dyn TypeInspector>,
    order: PropertyOrder,
}

impl OrderedTypeInspector {
    pub fn new(inner: Box<dyn TypeInspector>, order: PropertyOrder) -> Self {
        OrderedTypeInspector { inner, order }
    }
}

impl TypeInspector for OrderedTypeInspector {
    fn properties(&self, ty: &str) -> Result<Properties, ConfigurationError> {
        let mut properties = self.inner.properties(ty)?.to_vec();
        // sort_by is stable: equal keys keep declaration order
        properties.sort_by(|a, b| {
            let key = |p: &PropertyDescriptor| (p.order.is_none(), p.order.unwrap_or(0));
            let primary = key(a).cmp(&key(b));
            match self.order {
                PropertyOrder::Declared => primary,
                PropertyOrder::Alphabetical => primary.then_with(|| a.name.cmp(&b.name)),
            }
        });
        Ok(properties.into())
    }
}

/// Memoizes the property list per type.
pub struct CachedTypeInspector {
    inner: Box<dyn TypeInspector>,
    cache: RwLock<AHashMap<String, Properties>>,
}

impl CachedTypeInspector {
    pub fn new(inner: Box<dyn TypeInspector>) -> Self {
        CachedTypeInspector {
            inner,
            cache: RwLock::new(AHashMap::new()),
        }
    }
}

impl TypeInspector for CachedTypeInspector {
    fn properties(&self, ty: &str) -> Result<Properties, ConfigurationError> {
        if let Ok(cache) = self.cache.read() {
            if let Some(properties) = cache.get(ty) {
                return Ok(properties.clone());
            }
        }
        let properties = self.inner.properties(ty)?;
        trace!("cached {} properties of `{ty}`", properties.len());
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(ty.to_owned(), properties.clone());
        }
        Ok(properties)
    }
}
