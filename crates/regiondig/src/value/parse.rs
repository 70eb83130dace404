//! Value literal grammar.
//!
//! Integers: optional `-`, then `0x` (hex, unsigned) or a leading `0`
//! (octal, unsigned) or plain decimal, then an optional `u` and an optional
//! width suffix `o` (8 bit), `h` (16 bit), `q` (64 bit). No width suffix
//! means 32 bit. The `0x`/`0` prefixes are only recognised at the very start
//! of the literal, so `-05` is decimal.
//!
//! The suffix is the trailing run of characters that are not digits of the
//! radix. When everything before it is digits the literal is an integer and
//! an unknown suffix makes it invalid, so `08` and `3f` are rejected rather
//! than read as floats. Anything else is a float: a trailing `f` selects 32
//! bit, otherwise 64 bit.

use crate::error::{Error, Result};
use crate::value::TypedValue;

const INTEGER_SUFFIXES: &[&str] = &["", "u", "o", "uo", "h", "uh", "q", "uq"];

pub(crate) fn parse_literal(text: &str) -> Result<TypedValue> {
    if text.is_empty() {
        return Err(Error::ValueParseInvalid(text.to_string()));
    }

    if let Some(result) = parse_integer(text) {
        return result;
    }

    parse_float(text).ok_or_else(|| Error::ValueParseInvalid(text.to_string()))
}

/// `None` when `text` is not shaped like an integer literal
fn parse_integer(text: &str) -> Option<Result<TypedValue>> {
    let invalid = || Error::ValueParseInvalid(text.to_string());

    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (radix, prefixed, body) = if negative {
        (10, false, rest)
    } else if let Some(body) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, true, body)
    } else if let Some(body) = rest.strip_prefix('0') {
        (8, true, body)
    } else {
        (10, false, rest)
    };

    let split = body.trim_end_matches(|c: char| !c.is_digit(radix)).len();
    let (digits, suffix) = body.split_at(split);

    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    if !INTEGER_SUFFIXES.contains(&suffix) {
        return Some(Err(invalid()));
    }
    // A bare leading zero is the octal literal `0`
    if digits.is_empty() && radix != 8 {
        return Some(Err(invalid()));
    }

    let overflow = || Error::ValueParseOverflow(text.to_string());

    let magnitude = if digits.is_empty() {
        0
    } else {
        match u128::from_str_radix(digits, radix) {
            Ok(v) => v,
            Err(_) => return Some(Err(overflow())),
        }
    };

    let unsigned = prefixed || suffix.starts_with('u');
    let width = suffix.trim_start_matches('u');

    if unsigned {
        if negative && magnitude != 0 {
            return Some(Err(overflow()));
        }
        let value = match width {
            "o" => u8::try_from(magnitude).map(TypedValue::U8).ok(),
            "h" => u16::try_from(magnitude).map(TypedValue::U16).ok(),
            "q" => u64::try_from(magnitude).map(TypedValue::U64).ok(),
            _ => u32::try_from(magnitude).map(TypedValue::U32).ok(),
        };
        return Some(value.ok_or_else(overflow));
    }

    let Ok(signed) = i128::try_from(magnitude) else {
        return Some(Err(overflow()));
    };
    let signed = if negative { -signed } else { signed };
    let value = match width {
        "o" => i8::try_from(signed).map(TypedValue::I8).ok(),
        "h" => i16::try_from(signed).map(TypedValue::I16).ok(),
        "q" => i64::try_from(signed).map(TypedValue::I64).ok(),
        _ => i32::try_from(signed).map(TypedValue::I32).ok(),
    };
    Some(value.ok_or_else(overflow))
}

fn parse_float(text: &str) -> Option<TypedValue> {
    match text.strip_suffix('f') {
        Some(body) => body.parse::<f32>().ok().map(TypedValue::F32),
        None => text.parse::<f64>().ok().map(TypedValue::F64),
    }
}
