use base64::{Engine as _, engine::general_purpose::STANDARD as B64};

use crate::de::{NodeDeserializer, ReadContext, is_null_event};
use crate::error::DecodeError;
use crate::events::{Event, Scalar};
use crate::parse_scalars::{parse_bool, parse_float, parse_int};
use crate::tags::{self, CoreTag};
use crate::types::Type;
use crate::value::Value;

/// Claims null nodes wherever the target type admits null.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNodeDeserializer;

impl NodeDeserializer for NullNodeDeserializer {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError> {
        if !ty.is_nullable() {
            return Ok(None);
        }
        match ctx.peek()? {
            Some(event) if is_null_event(event) => {}
            _ => return Ok(None),
        }
        ctx.consume::<Scalar>()?;
        Ok(Some(Value::Null))
    }
}

/// Reads scalar nodes into primitives, strings, bytes and enum names.
///
/// Untyped (`Any`) plain scalars are inferred in the order null, bool, int, float and
/// fall back to a string. Quoted and block scalars are always strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarNodeDeserializer;

impl NodeDeserializer for ScalarNodeDeserializer {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError> {
        let target = ty.non_null();
        if !(target.is_scalar() || matches!(target, Type::Any)) {
            return Ok(None);
        }
        if !matches!(ctx.peek()?, Some(Event::Scalar(_))) {
            return Ok(None);
        }
        let scalar = ctx.consume::<Scalar>()?;
        let strict = ctx.options().strict_booleans;
        read_scalar(&scalar, target, strict)
            .map(Some)
            .map_err(|err| err.or_location(scalar.location))
    }
}

fn read_scalar(scalar: &Scalar, target: &Type, strict: bool) -> Result<Value, DecodeError> {
    let text = scalar.value.as_str();
    let invalid = || DecodeError::invalid_scalar(text, target);
    match target {
        Type::Bool => parse_bool(text, strict).map(Value::Bool).ok_or_else(invalid),
        Type::Int => parse_int(text).map(Value::Int).ok_or_else(invalid),
        Type::Float => parse_float(text).map(Value::Float).ok_or_else(invalid),
        Type::Bytes => decode_binary(text).ok_or_else(invalid),
        Type::Str if !tags::can_parse_into_string(scalar.tag.as_deref()) => infer(scalar, strict),
        Type::Str | Type::Enum(_) => Ok(Value::Str(scalar.value.clone())),
        _ => infer(scalar, strict),
    }
}

/// Implicit typing of a scalar read as `Any`, honoring a core tag when present.
fn infer(scalar: &Scalar, strict: bool) -> Result<Value, DecodeError> {
    let text = scalar.value.as_str();
    let core = scalar.tag.as_deref().and_then(CoreTag::parse);
    let typed = |target: Type| read_scalar(scalar, &target, strict);
    match core {
        Some(CoreTag::Bool) => return typed(Type::Bool),
        Some(CoreTag::Int) => return typed(Type::Int),
        Some(CoreTag::Float) => return typed(Type::Float),
        Some(CoreTag::Binary) => return typed(Type::Bytes),
        Some(CoreTag::Null) => return Ok(Value::Null),
        Some(CoreTag::Str) => return Ok(Value::Str(scalar.value.clone())),
        Some(CoreTag::Seq | CoreTag::Map) => {
            return Err(DecodeError::type_mismatch(
                scalar.tag.as_deref().unwrap_or_default(),
                "scalar",
            ));
        }
        None => {}
    }
    if !scalar.style.is_plain() || scalar.tag.is_some() {
        return Ok(Value::Str(scalar.value.clone()));
    }
    if scalar.is_plain_null() {
        return Ok(Value::Null);
    }
    if let Some(b) = parse_bool(text, strict) {
        return Ok(Value::Bool(b));
    }
    if let Some(i) = parse_int(text) {
        return Ok(Value::Int(i));
    }
    if let Some(f) = parse_float(text) {
        return Ok(Value::Float(f));
    }
    Ok(Value::Str(scalar.value.clone()))
}

/// Base64 payload of a `!!binary` scalar. Line breaks and blanks are ignored.
fn decode_binary(text: &str) -> Option<Value> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    B64.decode(compact).ok().map(Value::Bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ScalarStyle;

    fn any(scalar: Scalar) -> Value {
        read_scalar(&scalar, &Type::Any, false).unwrap()
    }

    #[test]
    fn plain_scalars_are_inferred() {
        assert_eq!(any(Scalar::new("~")), Value::Null);
        assert_eq!(any(Scalar::new("yes")), Value::Bool(true));
        assert_eq!(any(Scalar::new("0x1F")), Value::Int(31));
        assert_eq!(any(Scalar::new("1.5")), Value::Float(1.5));
        assert_eq!(any(Scalar::new("hello")), Value::str("hello"));
    }

    #[test]
    fn strict_booleans_leave_yaml11_forms_as_text() {
        let value = read_scalar(&Scalar::new("yes"), &Type::Any, true).unwrap();
        assert_eq!(value, Value::str("yes"));
    }

    #[test]
    fn quoted_scalars_stay_strings() {
        let quoted = Scalar::new("42").with_style(ScalarStyle::DoubleQuoted);
        assert_eq!(any(quoted), Value::str("42"));
    }

    #[test]
    fn core_tags_drive_inference() {
        assert_eq!(any(Scalar::new("7").with_tag("tag:yaml.org,2002:str")), Value::str("7"));
        assert_eq!(any(Scalar::new("7").with_tag("!!float")), Value::Float(7.0));
    }

    #[test]
    fn binary_is_base64_decoded() {
        let value = read_scalar(&Scalar::new("aGVs\n bG8="), &Type::Bytes, false).unwrap();
        assert_eq!(value, Value::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn bad_int_is_invalid_scalar() {
        let err = read_scalar(&Scalar::new("twelve"), &Type::Int, false).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidScalar { ref value, .. } if value == "twelve"));
    }
}
