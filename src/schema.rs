//! Explicitly registered type descriptions.
//!
//! The schema replaces runtime reflection: every composite type lists its properties,
//! every enum its variants, and self-describing types register their own read/write
//! routine. The mapper consults it through the type inspector and the object factory.

use std::fmt;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use crate::converter::YamlConvertible;
use crate::error::ConfigurationError;
use crate::events::ScalarStyle;
use crate::types::Type;

/// One addressable member of a composite type.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDescriptor {
    /// Declared member name. Object values store fields under this name.
    pub member: Arc<str>,
    /// Name in the document. Starts as the alias or the member name; the naming
    /// convention rewrites it unless an alias was given.
    pub name: Arc<str>,
    /// Explicit document name, exempt from naming conventions.
    pub alias: Option<Arc<str>>,
    pub ty: Type,
    pub can_read: bool,
    pub can_write: bool,
    /// Explicit emission order; unordered properties follow ordered ones.
    pub order: Option<i32>,
    /// Emitted as a comment above the key when comments are enabled.
    pub description: Option<Arc<str>>,
    /// Scalar style override for the value.
    pub style: Option<ScalarStyle>,
    /// Reading fails with `MissingProperty` when absent.
    pub required: bool,
}

impl PropertyDescriptor {
    pub fn new(member: &str, ty: Type) -> Self {
        let member: Arc<str> = Arc::from(member);
        PropertyDescriptor {
            name: member.clone(),
            member,
            alias: None,
            ty,
            can_read: true,
            can_write: true,
            order: None,
            description: None,
            style: None,
            required: false,
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        let alias: Arc<str> = Arc::from(alias);
        self.name = alias.clone();
        self.alias = Some(alias);
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(Arc::from(text));
        self
    }

    pub fn style(mut self, style: ScalarStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Emitted but never populated from a document.
    pub fn read_only(mut self) -> Self {
        self.can_write = false;
        self
    }

    /// Populated from a document but never emitted.
    pub fn write_only(mut self) -> Self {
        self.can_read = false;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDescriptor {
    pub name: Arc<str>,
    pub base: Option<Arc<str>>,
    pub properties: Vec<PropertyDescriptor>,
}

impl ObjectDescriptor {
    pub fn new(name: &str) -> Self {
        ObjectDescriptor {
            name: Arc::from(name),
            base: None,
            properties: Vec::new(),
        }
    }

    /// Declare `base` as the supertype; its properties are inherited.
    pub fn extends(mut self, base: &str) -> Self {
        self.base = Some(Arc::from(base));
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDescriptor {
    pub name: Arc<str>,
    pub variants: Vec<Arc<str>>,
}

impl EnumDescriptor {
    pub fn new(name: &str, variants: &[&str]) -> Self {
        EnumDescriptor {
            name: Arc::from(name),
            variants: variants.iter().map(|v| Arc::from(*v)).collect(),
        }
    }
}

/// Registered type descriptions. Immutable once handed to a mapper.
#[derive(Clone, Default)]
pub struct Schema {
    objects: AHashMap<Arc<str>, ObjectDescriptor>,
    enums: AHashMap<Arc<str>, EnumDescriptor>,
    convertibles: AHashMap<Arc<str>, Arc<dyn YamlConvertible>>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("objects", &self.objects.keys().collect::<Vec<_>>())
            .field("enums", &self.enums.keys().collect::<Vec<_>>())
            .field("convertibles", &self.convertibles.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a composite type. Fails when two properties share a member name.
    pub fn add_object(&mut self, descriptor: ObjectDescriptor) -> Result<&mut Self, ConfigurationError> {
        let mut seen = AHashSet::new();
        for property in &descriptor.properties {
            if !seen.insert(property.member.clone()) {
                return Err(ConfigurationError::DuplicateProperty {
                    ty: descriptor.name.to_string(),
                    property: property.member.to_string(),
                });
            }
        }
        self.objects.insert(descriptor.name.clone(), descriptor);
        Ok(self)
    }

    pub fn add_enum(&mut self, descriptor: EnumDescriptor) -> &mut Self {
        self.enums.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Register a self-describing type under `name`. Values of `Type::Custom(name)`
    /// (and of an object type with that name) are read and written by `routine`.
    pub fn add_convertible<C>(&mut self, name: &str, routine: C) -> &mut Self
    where
        C: YamlConvertible + 'static,
    {
        self.convertibles.insert(Arc::from(name), Arc::new(routine));
        self
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDescriptor> {
        self.objects.get(name)
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectDescriptor> {
        self.objects.values()
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums.get(name)
    }

    pub fn convertible(&self, name: &str) -> Option<&Arc<dyn YamlConvertible>> {
        self.convertibles.get(name)
    }

    /// Declared properties of `name`, inherited ones first.
    pub fn properties(&self, name: &str) -> Result<Vec<PropertyDescriptor>, ConfigurationError> {
        let mut chain = Vec::new();
        let mut current = Some(name);
        while let Some(ty) = current {
            let descriptor = self.objects.get(ty).ok_or_else(|| ConfigurationError::UnknownType {
                ty: ty.to_owned(),
            })?;
            if chain.iter().any(|d: &&ObjectDescriptor| d.name == descriptor.name) {
                return Err(ConfigurationError::InvalidOptions(format!(
                    "type `{name}` inherits from itself"
                )));
            }
            chain.push(descriptor);
            current = descriptor.base.as_deref();
        }
        let mut properties: Vec<PropertyDescriptor> = Vec::new();
        for descriptor in chain.iter().rev() {
            for property in &descriptor.properties {
                // a redeclared member shadows the inherited one in place
                match properties.iter_mut().find(|p| p.member == property.member) {
                    Some(slot) => *slot = property.clone(),
                    None => properties.push(property.clone()),
                }
            }
        }
        Ok(properties)
    }

    /// True when a value of type `from` can stand where `to` is expected.
    pub fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        if from == to || matches!(to, Type::Any) {
            return true;
        }
        match (from, to) {
            (Type::Nullable(f), Type::Nullable(t)) => self.is_assignable(f, t),
            (f, Type::Nullable(t)) => self.is_assignable(f, t),
            (Type::Object(f), Type::Object(t)) => {
                let mut current = self.objects.get(f).and_then(|d| d.base.clone());
                let mut hops = 0;
                while let Some(base) = current {
                    if base == *t {
                        return true;
                    }
                    hops += 1;
                    if hops > self.objects.len() {
                        return false;
                    }
                    current = self.objects.get(&base).and_then(|d| d.base.clone());
                }
                false
            }
            (Type::Seq(f), Type::Seq(t)) | (Type::Array(f), Type::Array(t)) => self.is_assignable(f, t),
            _ => false,
        }
    }

    /// Check that every referenced type is registered and no inheritance loops.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for descriptor in self.objects.values() {
            self.properties(&descriptor.name)?;
            for property in &descriptor.properties {
                self.check_type(&property.ty)?;
            }
        }
        Ok(())
    }

    pub(crate) fn check_type(&self, ty: &Type) -> Result<(), ConfigurationError> {
        match ty {
            Type::Nullable(inner) | Type::Seq(inner) | Type::Array(inner) => self.check_type(inner),
            Type::Map(k, v) => {
                self.check_type(k)?;
                self.check_type(v)
            }
            Type::Object(name) if !self.objects.contains_key(name) && !self.convertibles.contains_key(name) => {
                Err(ConfigurationError::UnknownType { ty: name.to_string() })
            }
            Type::Enum(name) if !self.enums.contains_key(name) => {
                Err(ConfigurationError::UnknownType { ty: name.to_string() })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> Schema {
        let mut schema = Schema::new();
        schema
            .add_object(
                ObjectDescriptor::new("Shape")
                    .property(PropertyDescriptor::new("Name", Type::Str))
                    .property(PropertyDescriptor::new("Area", Type::Float).read_only()),
            )
            .unwrap();
        schema
            .add_object(
                ObjectDescriptor::new("Circle")
                    .extends("Shape")
                    .property(PropertyDescriptor::new("Radius", Type::Float))
                    .property(PropertyDescriptor::new("Area", Type::Float)),
            )
            .unwrap();
        schema
    }

    #[test]
    fn inherited_properties_come_first() {
        let properties = shapes().properties("Circle").unwrap();
        let names: Vec<&str> = properties.iter().map(|p| &*p.member).collect();
        assert_eq!(names, ["Name", "Area", "Radius"]);
        // redeclared member replaces the inherited one
        assert!(properties[1].can_write);
    }

    #[test]
    fn subtype_is_assignable_to_base() {
        let schema = shapes();
        assert!(schema.is_assignable(&Type::object("Circle"), &Type::object("Shape")));
        assert!(schema.is_assignable(&Type::object("Circle"), &Type::nullable(Type::object("Shape"))));
        assert!(!schema.is_assignable(&Type::object("Shape"), &Type::object("Circle")));
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let mut schema = Schema::new();
        let err = schema
            .add_object(
                ObjectDescriptor::new("Dup")
                    .property(PropertyDescriptor::new("A", Type::Int))
                    .property(PropertyDescriptor::new("A", Type::Str)),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateProperty { .. }));
    }

    #[test]
    fn validate_reports_unknown_types() {
        let mut schema = Schema::new();
        schema
            .add_object(ObjectDescriptor::new("Holder").property(PropertyDescriptor::new("Inner", Type::object("Missing"))))
            .unwrap();
        assert_eq!(
            schema.validate(),
            Err(ConfigurationError::UnknownType { ty: "Missing".into() })
        );
    }
}
