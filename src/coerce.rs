//! The coercion matrix: convert a raw [`ConfigValue`] into exactly one
//! [`ScalarKind`], or fail with a [`CoercionError`].
//!
//! | target | accepted raw forms |
//! |--------|--------------------|
//! | bool | bool, boolean literal string, integer (nonzero = true) |
//! | integers | integer, unsigned, base-10 string; narrowed with range check |
//! | floats | float, integer, base-10 string; `f32` rejects finite values beyond its range |
//! | duration | duration, integer milliseconds, digit-only string (ms), `1h30m`-style string |
//! | string | any scalar, via its display form |
//! | `[string]` | sequence of strings, comma-separated string (untrimmed) |
//! | `[f32]`/`[f64]` | sequence of numbers, comma-separated string (trimmed) |
//! | any | stored as-is |
//!
//! Nothing here writes to a target; callers assign only on success.

use std::num::IntErrorKind;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoercionCause, CoercionError};
use crate::types::{ScalarKind, ScalarValue};
use crate::value::ConfigValue;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Durations given as bare digits are milliseconds.
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid digits regex"));

/// One `<number><unit>` segment of a human-readable duration.
static SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([0-9]+)(?:\.([0-9]*))?|\.([0-9]+))(ns|us|µs|μs|ms|h|m|s)")
        .expect("valid duration segment regex")
});

/// Coerce `raw` into the scalar kind `kind`.
pub fn coerce(kind: ScalarKind, raw: &ConfigValue) -> Result<ScalarValue, CoercionError> {
    let value = match kind {
        ScalarKind::Bool => ScalarValue::Bool(boolean(raw)?),
        ScalarKind::I8 => ScalarValue::I8(integer(kind, raw)?),
        ScalarKind::I16 => ScalarValue::I16(integer(kind, raw)?),
        ScalarKind::I32 => ScalarValue::I32(integer(kind, raw)?),
        ScalarKind::I64 => ScalarValue::I64(integer(kind, raw)?),
        ScalarKind::Isize => ScalarValue::Isize(integer(kind, raw)?),
        ScalarKind::U8 => ScalarValue::U8(integer(kind, raw)?),
        ScalarKind::U16 => ScalarValue::U16(integer(kind, raw)?),
        ScalarKind::U32 => ScalarValue::U32(integer(kind, raw)?),
        ScalarKind::U64 => ScalarValue::U64(integer(kind, raw)?),
        ScalarKind::Usize => ScalarValue::Usize(integer(kind, raw)?),
        ScalarKind::F32 => ScalarValue::F32(float32(raw)?),
        ScalarKind::F64 => ScalarValue::F64(float(kind, raw)?),
        ScalarKind::Duration => ScalarValue::Duration(duration(raw)?),
        ScalarKind::String => ScalarValue::String(string(raw)?),
        ScalarKind::StringSeq => ScalarValue::StringSeq(string_seq(raw)?),
        ScalarKind::F32Seq => ScalarValue::F32Seq(float32_seq(raw)?),
        ScalarKind::F64Seq => ScalarValue::F64Seq(float_seq(kind, raw)?),
        ScalarKind::Opaque => ScalarValue::Opaque(raw.clone()),
    };
    Ok(value)
}

fn fail(kind: ScalarKind, raw: &ConfigValue, cause: CoercionCause) -> CoercionError {
    CoercionError {
        kind,
        raw: raw.to_string(),
        cause,
    }
}

fn unsupported(kind: ScalarKind, raw: &ConfigValue) -> CoercionError {
    fail(
        kind,
        raw,
        CoercionCause::Unsupported {
            found: raw.type_name(),
        },
    )
}

pub fn boolean(raw: &ConfigValue) -> Result<bool, CoercionError> {
    match raw {
        ConfigValue::Bool(b) => Ok(*b),
        ConfigValue::Integer(i) => Ok(*i != 0),
        ConfigValue::Unsigned(u) => Ok(*u != 0),
        ConfigValue::String(s) => parse_bool(s).ok_or_else(|| {
            fail(
                ScalarKind::Bool,
                raw,
                CoercionCause::Parse(format!("invalid boolean literal {s:?}")),
            )
        }),
        _ => Err(unsupported(ScalarKind::Bool, raw)),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Read any integer-like input at full width, then narrow to `T`.
///
/// Strings parse as base-10 `i64`.
pub fn integer<T: TryFrom<i128>>(kind: ScalarKind, raw: &ConfigValue) -> Result<T, CoercionError> {
    let wide: i128 = match raw {
        ConfigValue::Integer(i) => (*i).into(),
        ConfigValue::Unsigned(u) => (*u).into(),
        ConfigValue::String(s) => s
            .parse::<i64>()
            .map_err(|e| {
                let cause = match e.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                        CoercionCause::Overflow
                    }
                    _ => CoercionCause::Parse(e.to_string()),
                };
                fail(kind, raw, cause)
            })?
            .into(),
        _ => return Err(unsupported(kind, raw)),
    };
    T::try_from(wide).map_err(|_| fail(kind, raw, CoercionCause::Overflow))
}

/// Produce an `f64`; `f32` targets go through [`float32`].
pub fn float(kind: ScalarKind, raw: &ConfigValue) -> Result<f64, CoercionError> {
    match raw {
        ConfigValue::Float(x) => Ok(*x),
        ConfigValue::Integer(i) => Ok(*i as f64),
        ConfigValue::Unsigned(u) => Ok(*u as f64),
        ConfigValue::String(s) => s
            .parse::<f64>()
            .map_err(|e| fail(kind, raw, CoercionCause::Parse(e.to_string()))),
        _ => Err(unsupported(kind, raw)),
    }
}

pub fn float32(raw: &ConfigValue) -> Result<f32, CoercionError> {
    let kind = ScalarKind::F32;
    narrow_f32(kind, raw, float(kind, raw)?)
}

/// Finite values that only fit an `f64` overflow instead of becoming `inf`.
fn narrow_f32(kind: ScalarKind, raw: &ConfigValue, x: f64) -> Result<f32, CoercionError> {
    let narrow = x as f32;
    if x.is_finite() && narrow.is_infinite() {
        return Err(fail(kind, raw, CoercionCause::Overflow));
    }
    Ok(narrow)
}

pub fn duration(raw: &ConfigValue) -> Result<Duration, CoercionError> {
    let kind = ScalarKind::Duration;
    match raw {
        ConfigValue::Duration(d) => Ok(*d),
        ConfigValue::Integer(i) => u64::try_from(*i)
            .map(Duration::from_millis)
            .map_err(|_| fail(kind, raw, CoercionCause::Negative)),
        ConfigValue::Unsigned(u) => Ok(Duration::from_millis(*u)),
        ConfigValue::String(s) if DIGITS.is_match(s) => s
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| fail(kind, raw, CoercionCause::Overflow)),
        ConfigValue::String(s) => parse_duration(s).map_err(|cause| fail(kind, raw, cause)),
        _ => Err(unsupported(kind, raw)),
    }
}

/// Parse `1h30m`, `500ms`, `1.5s`, `2h45m10.5s` and friends.
fn parse_duration(s: &str) -> Result<Duration, CoercionCause> {
    let invalid = || CoercionCause::Parse(format!("invalid duration {s:?}"));

    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest.starts_with('-') {
        return Err(CoercionCause::Negative);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let caps = SEGMENT.captures(rest).ok_or_else(invalid)?;
        let unit = caps
            .get(4)
            .and_then(|m| unit_nanos(m.as_str()))
            .ok_or_else(invalid)?;
        let whole: u128 = match caps.get(1) {
            Some(m) => m.as_str().parse().map_err(|_| CoercionCause::Overflow)?,
            None => 0,
        };
        let frac = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());

        total = whole
            .checked_mul(unit)
            .and_then(|n| n.checked_add(fraction_nanos(frac, unit)))
            .and_then(|n| total.checked_add(n))
            .ok_or(CoercionCause::Overflow)?;

        let consumed = caps.get(0).map_or(rest.len(), |m| m.end());
        rest = &rest[consumed..];
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| CoercionCause::Overflow)?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3_600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Nanoseconds contributed by the fractional digits of a segment.
/// Digits past the 18th cannot matter at nanosecond resolution.
fn fraction_nanos(frac: &str, unit: u128) -> u128 {
    let digits = frac.get(..frac.len().min(18)).unwrap_or("");
    if digits.is_empty() {
        return 0;
    }
    let value: u128 = digits.parse().unwrap_or(0);
    value * unit / 10u128.pow(digits.len() as u32)
}

pub fn string(raw: &ConfigValue) -> Result<String, CoercionError> {
    match raw {
        ConfigValue::Bool(b) => Ok(b.to_string()),
        ConfigValue::Integer(i) => Ok(i.to_string()),
        ConfigValue::Unsigned(u) => Ok(u.to_string()),
        ConfigValue::Float(x) => Ok(x.to_string()),
        ConfigValue::String(s) => Ok(s.clone()),
        ConfigValue::Duration(d) => Ok(format!("{d:?}")),
        ConfigValue::Sequence(_) | ConfigValue::Mapping(_) => {
            Err(unsupported(ScalarKind::String, raw))
        }
    }
}

/// Comma-separated strings are split without trimming.
pub fn string_seq(raw: &ConfigValue) -> Result<Vec<String>, CoercionError> {
    let kind = ScalarKind::StringSeq;
    match raw {
        ConfigValue::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                ConfigValue::String(s) => Ok(s.clone()),
                other => Err(fail(
                    kind,
                    raw,
                    CoercionCause::Element {
                        index,
                        found: other.type_name(),
                    },
                )),
            })
            .collect(),
        ConfigValue::String(s) => Ok(s.split(',').map(str::to_string).collect()),
        _ => Err(unsupported(kind, raw)),
    }
}

/// Comma-separated tokens and string elements are trimmed before parsing.
pub fn float_seq(kind: ScalarKind, raw: &ConfigValue) -> Result<Vec<f64>, CoercionError> {
    let parse = |token: &str| {
        token
            .trim()
            .parse::<f64>()
            .map_err(|e| fail(kind, raw, CoercionCause::Parse(format!("{token:?}: {e}"))))
    };
    match raw {
        ConfigValue::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                ConfigValue::Float(x) => Ok(*x),
                ConfigValue::Integer(i) => Ok(*i as f64),
                ConfigValue::Unsigned(u) => Ok(*u as f64),
                ConfigValue::String(s) => parse(s.as_str()),
                other => Err(fail(
                    kind,
                    raw,
                    CoercionCause::Element {
                        index,
                        found: other.type_name(),
                    },
                )),
            })
            .collect(),
        ConfigValue::String(s) => s.split(',').map(parse).collect(),
        _ => Err(unsupported(kind, raw)),
    }
}

pub fn float32_seq(raw: &ConfigValue) -> Result<Vec<f32>, CoercionError> {
    let kind = ScalarKind::F32Seq;
    float_seq(kind, raw)?
        .into_iter()
        .map(|x| narrow_f32(kind, raw, x))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Table;

    fn s(v: &str) -> ConfigValue {
        ConfigValue::from(v)
    }

    #[test]
    fn bool_from_literals() {
        assert!(boolean(&s("true")).unwrap());
        assert!(boolean(&s("T")).unwrap());
        assert!(boolean(&s("1")).unwrap());
        assert!(!boolean(&s("False")).unwrap());
        assert!(!boolean(&s("0")).unwrap());
    }

    #[test]
    fn bool_rejects_unknown_literal() {
        let err = boolean(&s("notabool")).unwrap_err();
        assert_eq!(err.kind, ScalarKind::Bool);
        assert!(matches!(err.cause, CoercionCause::Parse(_)));
    }

    #[test]
    fn bool_from_integer_zero_is_false() {
        assert!(!boolean(&ConfigValue::Integer(0)).unwrap());
        assert!(boolean(&ConfigValue::Integer(-3)).unwrap());
        assert!(boolean(&ConfigValue::Unsigned(1)).unwrap());
    }

    #[test]
    fn bool_rejects_float() {
        let err = boolean(&ConfigValue::Float(1.0)).unwrap_err();
        assert_eq!(err.cause, CoercionCause::Unsupported { found: "float" });
    }

    #[test]
    fn integer_from_string() {
        let v: i32 = integer(ScalarKind::I32, &s("-42")).unwrap();
        assert_eq!(v, -42);
    }

    #[test]
    fn integer_narrowing_overflow() {
        let err = integer::<i8>(ScalarKind::I8, &s("99999")).unwrap_err();
        assert_eq!(err.kind, ScalarKind::I8);
        assert_eq!(err.cause, CoercionCause::Overflow);
    }

    #[test]
    fn negative_into_unsigned_overflows() {
        let err = integer::<u16>(ScalarKind::U16, &ConfigValue::Integer(-1)).unwrap_err();
        assert_eq!(err.cause, CoercionCause::Overflow);
    }

    #[test]
    fn string_beyond_i64_is_overflow() {
        let err = integer::<u64>(ScalarKind::U64, &s("99999999999999999999")).unwrap_err();
        assert_eq!(err.cause, CoercionCause::Overflow);
    }

    #[test]
    fn large_unsigned_into_u64() {
        let v: u64 = integer(ScalarKind::U64, &ConfigValue::Unsigned(u64::MAX)).unwrap();
        assert_eq!(v, u64::MAX);
    }

    #[test]
    fn integer_rejects_float_and_garbage() {
        assert!(integer::<i64>(ScalarKind::I64, &ConfigValue::Float(1.0)).is_err());
        let err = integer::<i64>(ScalarKind::I64, &s("12abc")).unwrap_err();
        assert!(matches!(err.cause, CoercionCause::Parse(_)));
    }

    #[test]
    fn float_promotes_integers() {
        assert_eq!(float(ScalarKind::F64, &ConfigValue::Integer(3)).unwrap(), 3.0);
        assert_eq!(float(ScalarKind::F64, &s("2.5")).unwrap(), 2.5);
        assert!(float(ScalarKind::F64, &ConfigValue::Bool(true)).is_err());
    }

    #[test]
    fn f32_out_of_range_overflows() {
        let err = coerce(ScalarKind::F32, &s("1e300")).unwrap_err();
        assert_eq!(err.kind, ScalarKind::F32);
        assert_eq!(err.cause, CoercionCause::Overflow);

        let err = float32_seq(&s("1.0, -1e300")).unwrap_err();
        assert_eq!(err.kind, ScalarKind::F32Seq);
        assert_eq!(err.cause, CoercionCause::Overflow);
    }

    #[test]
    fn f32_keeps_explicit_infinity() {
        assert_eq!(float32(&s("inf")).unwrap(), f32::INFINITY);
        assert!(float32(&s("NaN")).unwrap().is_nan());
    }

    #[test]
    fn f32_via_dispatch() {
        assert_eq!(
            coerce(ScalarKind::F32, &s("0.5")).unwrap(),
            ScalarValue::F32(0.5)
        );
    }

    #[test]
    fn duration_integer_is_millis() {
        assert_eq!(
            duration(&ConfigValue::Integer(500)).unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(duration(&s("500")).unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn duration_human_grammar() {
        assert_eq!(duration(&s("1h30m")).unwrap(), Duration::from_secs(5400));
        assert_eq!(duration(&s("500ms")).unwrap(), Duration::from_millis(500));
        assert_eq!(duration(&s("1.5s")).unwrap(), Duration::from_millis(1500));
        assert_eq!(duration(&s("+2m")).unwrap(), Duration::from_secs(120));
        assert_eq!(duration(&s("10us")).unwrap(), Duration::from_micros(10));
        assert_eq!(duration(&s("10µs")).unwrap(), Duration::from_micros(10));
        assert_eq!(duration(&s("7ns")).unwrap(), Duration::from_nanos(7));
        assert_eq!(duration(&s(".5h")).unwrap(), Duration::from_secs(1800));
        assert_eq!(
            duration(&s("2h45m10.5s")).unwrap(),
            Duration::from_millis((2 * 3600 + 45 * 60 + 10) * 1000 + 500)
        );
    }

    #[test]
    fn duration_rejects_bad_input() {
        assert!(matches!(
            duration(&s("1x")).unwrap_err().cause,
            CoercionCause::Parse(_)
        ));
        assert!(matches!(
            duration(&s("")).unwrap_err().cause,
            CoercionCause::Parse(_)
        ));
        assert!(matches!(
            duration(&s("1h junk")).unwrap_err().cause,
            CoercionCause::Parse(_)
        ));
        assert_eq!(
            duration(&s("-5s")).unwrap_err().cause,
            CoercionCause::Negative
        );
        assert_eq!(
            duration(&ConfigValue::Integer(-1)).unwrap_err().cause,
            CoercionCause::Negative
        );
        assert!(duration(&ConfigValue::Float(1.0)).is_err());
    }

    #[test]
    fn string_from_any_scalar() {
        assert_eq!(string(&ConfigValue::Integer(3)).unwrap(), "3");
        assert_eq!(string(&ConfigValue::Bool(true)).unwrap(), "true");
        assert_eq!(string(&ConfigValue::Float(1.5)).unwrap(), "1.5");
        assert_eq!(string(&s("plain")).unwrap(), "plain");
        assert!(string(&ConfigValue::Mapping(Table::new())).is_err());
    }

    #[test]
    fn string_seq_splits_without_trimming() {
        assert_eq!(string_seq(&s("a,b,c")).unwrap(), vec!["a", "b", "c"]);
        assert_eq!(string_seq(&s("a, b")).unwrap(), vec!["a", " b"]);
    }

    #[test]
    fn string_seq_requires_string_elements() {
        let raw = ConfigValue::Sequence(vec![s("a"), ConfigValue::Integer(1)]);
        let err = string_seq(&raw).unwrap_err();
        assert_eq!(
            err.cause,
            CoercionCause::Element {
                index: 1,
                found: "integer"
            }
        );
    }

    #[test]
    fn float_seq_trims_tokens() {
        assert_eq!(
            float_seq(ScalarKind::F64Seq, &s("1.5, 2.5,3.5")).unwrap(),
            vec![1.5, 2.5, 3.5]
        );
    }

    #[test]
    fn float_seq_from_mixed_sequence() {
        let raw = ConfigValue::Sequence(vec![
            ConfigValue::Float(1.5),
            ConfigValue::Integer(2),
            s(" 3 "),
        ]);
        assert_eq!(
            coerce(ScalarKind::F32Seq, &raw).unwrap(),
            ScalarValue::F32Seq(vec![1.5, 2.0, 3.0])
        );
    }

    #[test]
    fn float_seq_bad_token() {
        let err = float_seq(ScalarKind::F64Seq, &s("1.0,x")).unwrap_err();
        assert!(matches!(err.cause, CoercionCause::Parse(_)));
    }

    #[test]
    fn opaque_passthrough() {
        let raw = ConfigValue::Sequence(vec![s("x")]);
        assert_eq!(
            coerce(ScalarKind::Opaque, &raw).unwrap(),
            ScalarValue::Opaque(raw.clone())
        );
    }

    #[test]
    fn dispatch_reports_requested_kind() {
        for kind in [ScalarKind::U8, ScalarKind::Isize, ScalarKind::Duration] {
            let value = coerce(kind, &s("7")).unwrap();
            assert_eq!(value.kind(), kind);
        }
    }
}
