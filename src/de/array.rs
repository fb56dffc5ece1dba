use smallvec::SmallVec;

use crate::de::{NodeDeserializer, ReadContext};
use crate::error::DecodeError;
use crate::events::{Event, SequenceEnd, SequenceStart};
use crate::types::Type;
use crate::value::Value;

/// Collects a sequence into scratch space and hands it to the object factory, which
/// builds the fixed-shape array in one step.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayNodeDeserializer;

impl NodeDeserializer for ArrayNodeDeserializer {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError> {
        let factory = &ctx.mapper().factory;
        if !factory.is_array(ty) || !matches!(ctx.peek()?, Some(Event::SequenceStart(_))) {
            return Ok(None);
        }
        let element = match ty.non_null() {
            Type::Array(element) => (**element).clone(),
            _ => Type::Any,
        };

        ctx.consume::<SequenceStart>()?;
        let mut scratch: SmallVec<[Value; 8]> = SmallVec::new();
        while ctx.try_consume::<SequenceEnd>()?.is_none() {
            scratch.push(ctx.deserialize(&element)?);
        }
        let len = scratch.len();
        factory
            .build_array(&element, len, &mut scratch.into_iter())
            .map(Some)
    }
}
