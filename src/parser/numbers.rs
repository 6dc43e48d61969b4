//! The number-literal decoder: the sole place that converts source-text
//! numbers into runtime-shaped values.
//!
//! Handles decimal and `0x`-prefixed hexadecimal integers, signed values,
//! decimal and hexadecimal floating point (`.`, `e`/`E`, or `p`/`P`
//! exponent), and the `inf`/`nan`/`nan:0x...` special float forms. Digit
//! group separators (`_`) are accepted anywhere a digit is, per the
//! text-format grammar.

use crate::ast::NumericValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberDecodeError(pub String);

/// Decodes `raw` into either an integer or a floating-point value. The
/// caller (the parser's opcode signature table) decides which is expected
/// for a given operand position; this function only reports what the text
/// actually denotes.
pub fn decode(raw: &str) -> Result<NumericValue, NumberDecodeError> {
    let (negative, body) = split_sign(raw);
    let lower = body.to_ascii_lowercase();

    if lower == "inf" {
        return Ok(NumericValue::Float(signed_infinity(negative)));
    }

    if lower == "nan" {
        return Ok(NumericValue::Float(signed_nan(negative, None)));
    }

    if let Some(hex_payload) = lower.strip_prefix("nan:0x") {
        let payload = u64::from_str_radix(&strip_underscores(hex_payload), 16)
            .map_err(|_| NumberDecodeError(format!("invalid NaN payload in '{raw}'")))?;
        return Ok(NumericValue::Float(signed_nan(negative, Some(payload))));
    }

    let cleaned = strip_underscores(&lower);
    let is_hex = cleaned.starts_with("0x");
    let digits = if is_hex { &cleaned[2..] } else { cleaned.as_str() };

    let is_float = if is_hex {
        digits.contains('.') || digits.contains('p')
    } else {
        digits.contains('.') || digits.contains('e')
    };

    if is_float {
        let value = if is_hex {
            decode_hex_float(digits)?
        } else {
            decode_decimal_float(digits)?
        };
        Ok(NumericValue::Float(if negative { -value } else { value }))
    } else {
        let magnitude = if is_hex {
            i128::from_str_radix(digits, 16)
                .map_err(|_| NumberDecodeError(format!("invalid hex integer '{raw}'")))?
        } else {
            digits
                .parse::<i128>()
                .map_err(|_| NumberDecodeError(format!("invalid integer '{raw}'")))?
        };
        let value = if negative { -magnitude } else { magnitude };
        Ok(NumericValue::Int(value as i64))
    }
}

/// Clamps/sign-extends a decoded integer literal to signed 32-bit, for use
/// as a memory index, offset, or alignment.
pub fn parse32i(raw: &str) -> Result<i32, NumberDecodeError> {
    match decode(raw)? {
        NumericValue::Int(v) => Ok(((v as i128) & 0xFFFF_FFFF) as u32 as i32),
        NumericValue::Float(_) => Err(NumberDecodeError(format!("'{raw}' is not an integer"))),
    }
}

fn split_sign(raw: &str) -> (bool, &str) {
    match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    }
}

fn strip_underscores(s: &str) -> String {
    s.chars().filter(|c| *c != '_').collect()
}

fn signed_infinity(negative: bool) -> f64 {
    if negative {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    }
}

fn signed_nan(negative: bool, payload: Option<u64>) -> f64 {
    let magnitude = match payload {
        None => f64::NAN,
        Some(p) => f64::from_bits(0x7FF8_0000_0000_0000 | (p & 0x000F_FFFF_FFFF_FFFF)),
    };
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn decode_decimal_float(digits: &str) -> Result<f64, NumberDecodeError> {
    digits
        .parse::<f64>()
        .map_err(|_| NumberDecodeError(format!("invalid float '{digits}'")))
}

/// Decodes a hex float body (without sign or `0x` prefix), e.g.
/// `1.8p3` or `abcp-2`, as `mantissa * 2^exponent`.
fn decode_hex_float(digits: &str) -> Result<f64, NumberDecodeError> {
    let (mantissa_part, exponent_part) = match digits.split_once('p') {
        Some((m, e)) => (m, Some(e)),
        None => (digits, None),
    };

    let (int_part, frac_part) = match mantissa_part.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa_part, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(NumberDecodeError(format!("invalid hex float '{digits}'")));
    }

    let mut mantissa = 0f64;
    for c in int_part.chars() {
        let digit = c
            .to_digit(16)
            .ok_or_else(|| NumberDecodeError(format!("invalid hex digit in '{digits}'")))?;
        mantissa = mantissa * 16.0 + digit as f64;
    }

    let mut scale = 1f64 / 16.0;
    for c in frac_part.chars() {
        let digit = c
            .to_digit(16)
            .ok_or_else(|| NumberDecodeError(format!("invalid hex digit in '{digits}'")))?;
        mantissa += digit as f64 * scale;
        scale /= 16.0;
    }

    let exponent = match exponent_part {
        Some(e) => e
            .parse::<i32>()
            .map_err(|_| NumberDecodeError(format!("invalid hex float exponent in '{digits}'")))?,
        None => 0,
    };

    Ok(mantissa * 2f64.powi(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_decimal_integer() {
        assert_eq!(decode("42").unwrap(), NumericValue::Int(42));
        assert_eq!(decode("-7").unwrap(), NumericValue::Int(-7));
    }

    #[test]
    fn decodes_hex_integer() {
        assert_eq!(decode("0x2a").unwrap(), NumericValue::Int(42));
        assert_eq!(decode("-0x01").unwrap(), NumericValue::Int(-1));
    }

    #[test]
    fn decodes_underscored_integer() {
        assert_eq!(decode("1_000_000").unwrap(), NumericValue::Int(1_000_000));
    }

    #[test]
    fn decodes_decimal_float() {
        match decode("0.5").unwrap() {
            NumericValue::Float(f) => assert_eq!(f, 0.5),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn decodes_hex_float() {
        match decode("0x1.8p3").unwrap() {
            NumericValue::Float(f) => assert_eq!(f, 12.0),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn decodes_inf_and_nan() {
        match decode("inf").unwrap() {
            NumericValue::Float(f) => assert!(f.is_infinite() && f.is_sign_positive()),
            other => panic!("unexpected {other:?}"),
        }
        match decode("-inf").unwrap() {
            NumericValue::Float(f) => assert!(f.is_infinite() && f.is_sign_negative()),
            other => panic!("unexpected {other:?}"),
        }
        match decode("nan").unwrap() {
            NumericValue::Float(f) => assert!(f.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse32i_wraps_large_hex_to_signed_32_bit() {
        assert_eq!(parse32i("0xffffffff").unwrap(), -1);
        assert_eq!(parse32i("4294967295").unwrap(), -1);
    }
}
