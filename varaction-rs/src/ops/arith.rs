//! `*`, `/`, `+`, `-`.

use super::unsupported;
use crate::error::{Error, Result};
use crate::strbuf;
use crate::value::Value;

pub fn mul(left: &Value, right: &Value) -> Result<Value> {
    match left {
        Value::U16(a) => Ok(Value::U16(a.wrapping_mul(right.as_u16()?))),
        Value::U32(a) => Ok(Value::U32(a.wrapping_mul(right.as_u32()?))),
        Value::Float(a) => Ok(Value::Float(a * right.as_f32()?)),
        Value::Str(_) => Err(unsupported("Mul", left)),
    }
}

/// Integer division by zero is an invalid argument; float division follows
/// IEEE rules.
pub fn div(left: &Value, right: &Value) -> Result<Value> {
    match left {
        Value::U16(a) => a
            .checked_div(right.as_u16()?)
            .map(Value::U16)
            .ok_or_else(|| Error::invalid("division by zero")),
        Value::U32(a) => a
            .checked_div(right.as_u32()?)
            .map(Value::U32)
            .ok_or_else(|| Error::invalid("division by zero")),
        Value::Float(a) => Ok(Value::Float(a / right.as_f32()?)),
        Value::Str(_) => Err(unsupported("Div", left)),
    }
}

/// Numeric addition.
pub fn sum(left: &Value, right: &Value) -> Result<Value> {
    match left {
        Value::U16(a) => Ok(Value::U16(a.wrapping_add(right.as_u16()?))),
        Value::U32(a) => Ok(Value::U32(a.wrapping_add(right.as_u32()?))),
        Value::Float(a) => Ok(Value::Float(a + right.as_f32()?)),
        Value::Str(_) => Err(unsupported("Add", left)),
    }
}

/// `left + right` into `result`.
///
/// Strings concatenate into `result`'s own buffer, which is reused when
/// large enough.
pub fn add(result: &mut Value, left: &Value, right: &Value) -> Result<()> {
    let Value::Str(a) = left else {
        *result = sum(left, right)?;
        return Ok(());
    };
    let b = right.as_str_ref()?;
    let mut slot = match std::mem::take(result) {
        Value::Str(slot) => slot,
        _ => None,
    };
    let outcome = strbuf::concat(&mut slot, a.as_ref(), b);
    *result = Value::Str(slot);
    outcome.map(|_| ())
}

pub fn sub(left: &Value, right: &Value) -> Result<Value> {
    match left {
        Value::U16(a) => Ok(Value::U16(a.wrapping_sub(right.as_u16()?))),
        Value::U32(a) => Ok(Value::U32(a.wrapping_sub(right.as_u32()?))),
        Value::Float(a) => Ok(Value::Float(a - right.as_f32()?)),
        Value::Str(_) => Err(unsupported("Sub", left)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint32_add_wraps() {
        assert_eq!(sum(&Value::U32(0xFFFF_FFFF), &Value::U32(1)).unwrap(), Value::U32(0));
    }

    #[test]
    fn uint16_sub_wraps() {
        assert_eq!(sub(&Value::U16(0), &Value::U16(1)).unwrap(), Value::U16(0xFFFF));
    }

    #[test]
    fn result_type_follows_left() {
        assert_eq!(mul(&Value::U16(300), &Value::U16(300)).unwrap(), Value::U16(300u16.wrapping_mul(300)));
        assert_eq!(mul(&Value::Float(1.5), &Value::Float(2.0)).unwrap(), Value::Float(3.0));
    }

    #[test]
    fn integer_division_by_zero() {
        assert!(matches!(div(&Value::U16(1), &Value::U16(0)), Err(Error::InvalidArgument(_))));
        assert_eq!(div(&Value::U32(9), &Value::U32(2)).unwrap(), Value::U32(4));
    }

    #[test]
    fn float_division_by_zero_is_infinite() {
        match div(&Value::Float(1.0), &Value::Float(0.0)).unwrap() {
            Value::Float(x) => assert!(x.is_infinite()),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn string_add_concatenates() {
        let mut result = Value::Str(None);
        add(&mut result, &Value::string("foo"), &Value::string("bar")).unwrap();
        assert_eq!(result, Value::string("foobar"));
    }

    #[test]
    fn string_add_with_null_fails() {
        let mut result = Value::Str(None);
        let err = add(&mut result, &Value::string("foo"), &Value::Str(None)).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn string_sub_unsupported() {
        assert!(matches!(
            sub(&Value::string("a"), &Value::string("b")),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn mixed_string_and_number_unsupported() {
        assert!(sum(&Value::U16(1), &Value::string("1")).is_err());
    }
}
