//! Instance creation, decoupled from the node deserializers.
//!
//! Containers are created empty and filled in place afterwards, which is what lets an
//! anchored node be registered before its children are read. Arrays have no empty
//! phase: they are built in one step once every element is known.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{ConfigurationError, DecodeError};
use crate::location::Location;
use crate::schema::Schema;
use crate::types::Type;
use crate::value::{Mapping, Object, Value};

pub trait ObjectFactory: Send + Sync {
    /// Create an empty, mutable instance of `ty` (object, sequence or mapping).
    fn create(&self, ty: &Type, schema: &Schema) -> Result<Value, DecodeError>;

    /// True when `ty` is a fixed-shape array built by [`ObjectFactory::build_array`].
    fn is_array(&self, ty: &Type) -> bool;

    /// Build an array of `len` elements of type `element`.
    fn build_array(
        &self,
        element: &Type,
        len: usize,
        items: &mut dyn Iterator<Item = Value>,
    ) -> Result<Value, DecodeError>;
}

/// Populates a freshly created object before the document is read into it.
pub type Initializer = fn(&mut Object);

#[derive(Default, Clone)]
pub struct DefaultObjectFactory {
    initializers: AHashMap<Arc<str>, Initializer>,
}

impl DefaultObjectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `init` on every new instance of object type `ty`, e.g. to preset defaults.
    pub fn with_initializer(mut self, ty: &str, init: Initializer) -> Self {
        self.initializers.insert(Arc::from(ty), init);
        self
    }
}

impl ObjectFactory for DefaultObjectFactory {
    fn create(&self, ty: &Type, schema: &Schema) -> Result<Value, DecodeError> {
        match ty.non_null() {
            Type::Object(name) => {
                let descriptor = schema.object(name).ok_or_else(|| ConfigurationError::UnknownType {
                    ty: name.to_string(),
                })?;
                let mut object = Object::new(descriptor.name.clone());
                if let Some(init) = self.initializers.get(name) {
                    init(&mut object);
                }
                Ok(Value::Object(Rc::new(RefCell::new(object))))
            }
            Type::Seq(_) => Ok(Value::seq(Vec::new())),
            Type::Map(..) => Ok(Value::Map(Rc::new(RefCell::new(Mapping::new())))),
            other => Err(DecodeError::UnresolvableType {
                ty: other.to_string(),
                location: Location::UNKNOWN,
            }),
        }
    }

    fn is_array(&self, ty: &Type) -> bool {
        matches!(ty.non_null(), Type::Array(_))
    }

    fn build_array(
        &self,
        _element: &Type,
        len: usize,
        items: &mut dyn Iterator<Item = Value>,
    ) -> Result<Value, DecodeError> {
        let mut buffer = Vec::with_capacity(len);
        buffer.extend(items.take(len));
        if buffer.len() != len {
            return Err(DecodeError::msg(format!(
                "array expected {len} elements, got {}",
                buffer.len()
            )));
        }
        Ok(Value::array(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ObjectDescriptor;

    fn with_defaults(object: &mut Object) {
        object.set("Retries", Value::Int(3));
    }

    #[test]
    fn initializer_presets_fields() {
        let mut schema = Schema::new();
        schema.add_object(ObjectDescriptor::new("Job")).unwrap();
        let factory = DefaultObjectFactory::new().with_initializer("Job", with_defaults);
        let job = factory.create(&Type::object("Job"), &schema).unwrap();
        assert_eq!(job.field("Retries"), Some(Value::Int(3)));
    }

    #[test]
    fn unknown_object_type_is_a_configuration_error() {
        let factory = DefaultObjectFactory::new();
        let err = factory.create(&Type::object("Nope"), &Schema::new()).unwrap_err();
        assert!(matches!(err, DecodeError::Configuration(ConfigurationError::UnknownType { .. })));
    }

    #[test]
    fn array_is_built_in_one_step() {
        let factory = DefaultObjectFactory::new();
        let mut items = vec![Value::Int(1), Value::Int(2)].into_iter();
        let array = factory.build_array(&Type::Int, 2, &mut items).unwrap();
        assert_eq!(array, Value::array(vec![Value::Int(1), Value::Int(2)]));
    }
}
