use crate::de::{NodeDeserializer, ReadContext};
use crate::error::DecodeError;
use crate::types::Type;
use crate::value::Value;

/// Hands the node to the type's own read routine when the schema has one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConvertibleNodeDeserializer;

impl NodeDeserializer for ConvertibleNodeDeserializer {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError> {
        let schema = ctx.schema();
        let Type::Custom(name) = ty else {
            return Ok(None);
        };
        match schema.convertible(name) {
            Some(routine) => routine.read(ctx, ty).map(Some),
            None => Ok(None),
        }
    }
}
