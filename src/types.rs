//! Runtime type descriptors.
//!
//! A [`Type`] is what the caller asks for on the read path and what a value is declared
//! as on the write path. Composite types are referenced by name and described in the
//! [`Schema`](crate::Schema), which keeps recursive object types free of reference cycles.

use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// No static expectation: the shape of the node decides.
    Any,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    /// `T` or null.
    Nullable(Box<Type>),
    /// Growable sequence.
    Seq(Box<Type>),
    /// Fixed-shape array built by the object factory once its length is known.
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    /// Enumeration registered in the schema.
    Enum(Arc<str>),
    /// Composite type registered in the schema.
    Object(Arc<str>),
    /// Type handled by a type converter or a self-describing registration.
    Custom(Arc<str>),
}

impl Type {
    pub fn nullable(inner: Type) -> Type {
        Type::Nullable(Box::new(inner))
    }

    pub fn seq(element: Type) -> Type {
        Type::Seq(Box::new(element))
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn enumeration(name: &str) -> Type {
        Type::Enum(Arc::from(name))
    }

    pub fn object(name: &str) -> Type {
        Type::Object(Arc::from(name))
    }

    pub fn custom(name: &str) -> Type {
        Type::Custom(Arc::from(name))
    }

    /// Strip one `Nullable` layer.
    pub fn non_null(&self) -> &Type {
        match self {
            Type::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_) | Type::Any)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self.non_null(),
            Type::Bool | Type::Int | Type::Float | Type::Str | Type::Bytes | Type::Enum(_)
        )
    }

    /// Name of a schema-registered type, if this is one.
    pub fn schema_name(&self) -> Option<&str> {
        match self.non_null() {
            Type::Enum(name) | Type::Object(name) | Type::Custom(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("any"),
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::Str => f.write_str("str"),
            Type::Bytes => f.write_str("bytes"),
            Type::Nullable(inner) => write!(f, "{inner}?"),
            Type::Seq(inner) => write!(f, "seq<{inner}>"),
            Type::Array(inner) => write!(f, "array<{inner}>"),
            Type::Map(k, v) => write!(f, "map<{k}, {v}>"),
            Type::Enum(name) | Type::Object(name) | Type::Custom(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_fully_qualified() {
        let ty = Type::map(Type::Str, Type::seq(Type::nullable(Type::object("app.User"))));
        assert_eq!(ty.to_string(), "map<str, seq<app.User?>>");
    }

    #[test]
    fn non_null_strips_one_layer() {
        let ty = Type::nullable(Type::Int);
        assert_eq!(ty.non_null(), &Type::Int);
        assert!(ty.is_scalar());
        assert!(!Type::seq(Type::Int).is_scalar());
    }
}
