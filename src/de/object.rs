use std::sync::Arc;

use ahash::AHashSet;
use log::trace;

use crate::de::{NodeDeserializer, ReadContext};
use crate::error::DecodeError;
use crate::events::{Event, MappingEnd, MappingStart, Scalar};
use crate::options::DuplicateKeyPolicy;
use crate::types::Type;
use crate::value::Value;

/// Composite objects: keys are matched to properties through the type inspector and
/// each value is read as the property's declared type.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectNodeDeserializer;

impl NodeDeserializer for ObjectNodeDeserializer {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError> {
        let Type::Object(name) = ty.non_null() else {
            return Ok(None);
        };
        if !matches!(ctx.peek()?, Some(Event::MappingStart(_))) {
            return Ok(None);
        }

        let start = ctx.consume::<MappingStart>()?;
        let mapper = ctx.mapper();
        let options = ctx.options();
        let instance = mapper.factory.create(ty, ctx.schema())?;
        let object = instance.as_object().cloned().ok_or_else(|| {
            DecodeError::type_mismatch(ty, instance.kind()).with_location(start.location)
        })?;
        ctx.register_placeholder(&instance)?;

        let mut assigned: AHashSet<Arc<str>> = AHashSet::new();
        loop {
            if ctx.try_consume::<MappingEnd>()?.is_some() {
                break;
            }
            let key = ctx.consume::<Scalar>()?;
            let property = mapper
                .inspector
                .find_property(
                    name,
                    &key.value,
                    options.case_insensitive_properties,
                    options.ignore_unmatched_properties,
                )
                .map_err(|err| err.with_location(key.location))?;
            let Some(property) = property else {
                trace!("`{name}`: skipping unmatched key `{}`", key.value);
                ctx.skip_node()?;
                continue;
            };
            if !property.can_write {
                ctx.skip_node()?;
                continue;
            }
            if !assigned.insert(property.member.clone()) {
                match options.duplicate_keys {
                    DuplicateKeyPolicy::FirstWins => {
                        ctx.skip_node()?;
                        continue;
                    }
                    DuplicateKeyPolicy::LastWins => {}
                    DuplicateKeyPolicy::Error => {
                        return Err(DecodeError::DuplicateKey {
                            key: key.value,
                            location: key.location,
                        });
                    }
                }
            }
            let value = ctx.deserialize(&property.ty)?;
            object.borrow_mut().set(property.member.clone(), value);
        }

        for property in mapper.inspector.properties(name)?.iter() {
            if property.required && property.can_write && !assigned.contains(&property.member) {
                return Err(DecodeError::MissingProperty {
                    property: property.name.to_string(),
                    ty: name.to_string(),
                    location: start.location,
                });
            }
        }
        Ok(Some(instance))
    }
}
