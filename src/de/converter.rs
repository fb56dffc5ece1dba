use crate::de::{NodeDeserializer, ReadContext};
use crate::error::DecodeError;
use crate::types::Type;
use crate::value::Value;

/// Delegates to the registered type converter claiming the type, if any.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeConverterNodeDeserializer;

impl NodeDeserializer for TypeConverterNodeDeserializer {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError> {
        let mapper = ctx.mapper();
        match mapper.converters.find(ty)? {
            Some(converter) => converter.read(ctx, ty).map(Some),
            None => Ok(None),
        }
    }
}
