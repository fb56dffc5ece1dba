//! Type converters and self-describing types.
//!
//! A [`TypeConverter`] takes over reading and writing of every type it claims. The
//! [`ConverterRegistry`] evaluates `accepts` once per distinct type and caches the
//! answer; more than one claimant for a type is a configuration error.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use log::trace;

use crate::de::ReadContext;
use crate::error::{ConfigurationError, DecodeError, EncodeError};
use crate::events::{Scalar, ScalarStyle};
use crate::ser::WriteContext;
use crate::types::Type;
use crate::value::Value;

/// Custom conversion between a node and a value of the claimed types.
pub trait TypeConverter: Send + Sync {
    /// True when this converter handles `ty`. Must give the same answer for the
    /// lifetime of the converter.
    fn accepts(&self, ty: &Type) -> bool;

    /// Consume exactly one node from `ctx.events()` and produce its value.
    fn read(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Value, DecodeError>;

    /// Emit exactly one node for `value`.
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value, ty: &Type) -> Result<(), EncodeError>;
}

/// A type that declares its own read and write routine, registered with
/// [`Schema::add_convertible`](crate::Schema::add_convertible).
pub trait YamlConvertible: Send + Sync {
    fn read(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Value, DecodeError>;

    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), EncodeError>;
}

/// Ordered converters with a per-type claim cache.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn TypeConverter>>,
    claims: RwLock<AHashMap<Type, Option<usize>>>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.converters.len())
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new(converters: Vec<Arc<dyn TypeConverter>>) -> Self {
        ConverterRegistry {
            converters,
            claims: RwLock::new(AHashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// The converter claiming `ty`, if any.
    pub fn find(&self, ty: &Type) -> Result<Option<&Arc<dyn TypeConverter>>, ConfigurationError> {
        if self.converters.is_empty() {
            return Ok(None);
        }
        if let Ok(claims) = self.claims.read() {
            if let Some(index) = claims.get(ty) {
                return Ok(index.and_then(|i| self.converters.get(i)));
            }
        }

        let claimants: Vec<usize> = self
            .converters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.accepts(ty))
            .map(|(i, _)| i)
            .collect();
        if claimants.len() > 1 {
            return Err(ConfigurationError::AmbiguousConverter {
                ty: ty.to_string(),
                count: claimants.len(),
            });
        }
        let index = claimants.first().copied();
        trace!("converter claim for `{ty}` cached: {index:?}");
        // poisoned: answer without caching
        if let Ok(mut claims) = self.claims.write() {
            claims.insert(ty.clone(), index);
        }
        Ok(index.and_then(|i| self.converters.get(i)))
    }
}

/// 128-bit globally unique identifier in the 8-4-4-4-12 hex form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(pub u128);

impl Guid {
    /// Name under which [`GuidConverter`] claims `Type::Custom`.
    pub const TYPE_NAME: &'static str = "Guid";

    pub fn ty() -> Type {
        Type::custom(Self::TYPE_NAME)
    }

    pub fn value(self) -> Value {
        Value::custom(Self::TYPE_NAME, self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid GUID `{0}`")]
pub struct GuidParseError(String);

impl FromStr for Guid {
    type Err = GuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = || GuidParseError(s.to_owned());
        let t = s.trim();
        let t = t
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .unwrap_or(t);
        let hex: String = if t.len() == 36 {
            let groups: Vec<&str> = t.split('-').collect();
            let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
            if lengths != [8, 4, 4, 4, 12] {
                return Err(fail());
            }
            groups.concat()
        } else if t.len() == 32 {
            t.to_owned()
        } else {
            return Err(fail());
        };
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(fail());
        }
        u128::from_str_radix(&hex, 16).map(Guid).map_err(|_| fail())
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = format!("{:032x}", self.0);
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

/// Reads and writes [`Guid`] values as plain scalars.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuidConverter;

impl TypeConverter for GuidConverter {
    fn accepts(&self, ty: &Type) -> bool {
        matches!(ty, Type::Custom(name) if &**name == Guid::TYPE_NAME)
    }

    fn read(&self, ctx: &mut ReadContext<'_>, _ty: &Type) -> Result<Value, DecodeError> {
        let scalar: Scalar = ctx.consume()?;
        let guid = scalar
            .value
            .parse::<Guid>()
            .map_err(|err| DecodeError::custom(err).with_location(scalar.location))?;
        Ok(guid.value())
    }

    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value, ty: &Type) -> Result<(), EncodeError> {
        let guid = value.as_custom::<Guid>().ok_or_else(|| EncodeError::Unsupported {
            value: value.kind(),
            ty: ty.to_string(),
        })?;
        ctx.emit_scalar(guid.to_string(), ScalarStyle::Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_text_forms() {
        let g: Guid = "3fa85f64-5717-4562-b3fc-2c963f66afa6".parse().unwrap();
        assert_eq!(g.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
        let braced: Guid = "{3FA85F64-5717-4562-B3FC-2C963F66AFA6}".parse().unwrap();
        assert_eq!(g, braced);
        let compact: Guid = "3fa85f6457174562b3fc2c963f66afa6".parse().unwrap();
        assert_eq!(g, compact);
        assert!("3fa85f64-5717-4562-b3fc".parse::<Guid>().is_err());
        assert!("3fa85f64-5717-4562-b3fc-2c963f66afaz".parse::<Guid>().is_err());
    }

    struct ClaimsAll;

    impl TypeConverter for ClaimsAll {
        fn accepts(&self, _ty: &Type) -> bool {
            true
        }

        fn read(&self, _ctx: &mut ReadContext<'_>, _ty: &Type) -> Result<Value, DecodeError> {
            Ok(Value::Null)
        }

        fn write(&self, _ctx: &mut WriteContext<'_>, _value: &Value, _ty: &Type) -> Result<(), EncodeError> {
            Ok(())
        }
    }

    #[test]
    fn registry_caches_and_detects_ambiguity() {
        let registry = ConverterRegistry::new(vec![Arc::new(GuidConverter)]);
        assert!(registry.find(&Guid::ty()).unwrap().is_some());
        assert!(registry.find(&Type::Str).unwrap().is_none());
        assert_eq!(registry.claims.read().unwrap().len(), 2);

        let ambiguous = ConverterRegistry::new(vec![Arc::new(GuidConverter), Arc::new(ClaimsAll)]);
        assert!(ambiguous.find(&Type::Str).unwrap().is_some());
        assert_eq!(
            ambiguous.find(&Guid::ty()).err(),
            Some(ConfigurationError::AmbiguousConverter {
                ty: "Guid".into(),
                count: 2
            })
        );
    }
}
