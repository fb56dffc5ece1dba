use crate::de::{NodeDeserializer, ReadContext};
use crate::error::DecodeError;
use crate::events::{Event, MappingEnd, MappingStart, SequenceEnd, SequenceStart};
use crate::options::DuplicateKeyPolicy;
use crate::types::Type;
use crate::value::Value;

/// Growable sequences, created empty by the object factory and filled in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionNodeDeserializer;

impl NodeDeserializer for CollectionNodeDeserializer {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError> {
        let element = match ty.non_null() {
            Type::Seq(element) => (**element).clone(),
            Type::Any => Type::Any,
            _ => return Ok(None),
        };
        if !matches!(ctx.peek()?, Some(Event::SequenceStart(_))) {
            return Ok(None);
        }

        let start = ctx.consume::<SequenceStart>()?;
        let mapper = ctx.mapper();
        let instance = mapper
            .factory
            .create(&Type::seq(element.clone()), ctx.schema())?;
        let items = instance.as_seq().cloned().ok_or_else(|| {
            DecodeError::type_mismatch("sequence", instance.kind()).with_location(start.location)
        })?;
        ctx.register_placeholder(&instance)?;

        while ctx.try_consume::<SequenceEnd>()?.is_none() {
            let item = ctx.deserialize(&element)?;
            items.borrow_mut().push(item);
        }
        Ok(Some(instance))
    }
}

/// Key/value mappings, created empty by the object factory and filled in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct MappingNodeDeserializer;

impl NodeDeserializer for MappingNodeDeserializer {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError> {
        let (key_ty, value_ty) = match ty.non_null() {
            Type::Map(key, value) => ((**key).clone(), (**value).clone()),
            Type::Any => (Type::Any, Type::Any),
            _ => return Ok(None),
        };
        if !matches!(ctx.peek()?, Some(Event::MappingStart(_))) {
            return Ok(None);
        }

        let start = ctx.consume::<MappingStart>()?;
        let mapper = ctx.mapper();
        let instance = mapper
            .factory
            .create(&Type::map(key_ty.clone(), value_ty.clone()), ctx.schema())?;
        let entries = instance.as_map().cloned().ok_or_else(|| {
            DecodeError::type_mismatch("mapping", instance.kind()).with_location(start.location)
        })?;
        ctx.register_placeholder(&instance)?;

        let policy = ctx.options().duplicate_keys;
        loop {
            let key_location = match ctx.peek()? {
                Some(Event::MappingEnd(_)) => break,
                Some(event) => event.location(),
                None => return Err(DecodeError::eof()),
            };
            let key = ctx.deserialize(&key_ty)?;
            if entries.borrow().contains_key(&key) {
                match policy {
                    DuplicateKeyPolicy::FirstWins => {
                        ctx.skip_node()?;
                        continue;
                    }
                    DuplicateKeyPolicy::LastWins => {}
                    DuplicateKeyPolicy::Error => {
                        return Err(DecodeError::DuplicateKey {
                            key: describe_key(&key),
                            location: key_location,
                        });
                    }
                }
            }
            let value = ctx.deserialize(&value_ty)?;
            entries.borrow_mut().insert(key, value);
        }
        ctx.consume::<MappingEnd>()?;
        Ok(Some(instance))
    }
}

fn describe_key(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}
