//! Scalar datatype validation
//!
//! Template queries only need to know whether a value is acceptable for a
//! built-in XSD datatype. [`DatatypeValidator`] is that narrow contract;
//! [`BuiltinDatatypes`] implements it for the common built-ins. Names that
//! are not recognised are accepted.

use crate::error::{Error, Result, ValidationError};
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

lazy_static::lazy_static! {
    static ref LANGUAGE_REGEX: Regex = Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").unwrap();
    static ref NMTOKEN_REGEX: Regex = Regex::new(r"^[\w.\-:\u{B7}]+$").unwrap();
    static ref HEX_BINARY_REGEX: Regex = Regex::new(r"^([0-9a-fA-F]{2})*$").unwrap();
    static ref DURATION_REGEX: Regex =
        Regex::new(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$").unwrap();
    static ref TIMEZONE_REGEX: Regex = Regex::new(r"(Z|[+-]\d{2}:\d{2})$").unwrap();
    static ref GYEAR_REGEX: Regex = Regex::new(r"^-?\d{4,}(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref GYEAR_MONTH_REGEX: Regex =
        Regex::new(r"^-?\d{4,}-(0[1-9]|1[0-2])(Z|[+-]\d{2}:\d{2})?$").unwrap();
}

/// Checks a lexical value against a named datatype
pub trait DatatypeValidator: Send + Sync {
    /// Validate `value` against the datatype with local name `type_name`
    fn validate(&self, type_name: &str, value: &str) -> Result<()>;
}

/// Validator for the XSD built-in datatypes
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDatatypes;

impl BuiltinDatatypes {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }
}

impl DatatypeValidator for BuiltinDatatypes {
    fn validate(&self, type_name: &str, value: &str) -> Result<()> {
        let check = match type_name {
            "string" | "anySimpleType" | "anyType" => Ok(()),
            "normalizedString" => validate_normalized_string(value),
            "token" => validate_token(value),
            "language" => validate_pattern(value, &LANGUAGE_REGEX, "language"),
            "Name" | "NCName" | "ID" | "IDREF" | "ENTITY" => validate_name(type_name, value),
            "NMTOKEN" => validate_pattern(value.trim(), &NMTOKEN_REGEX, "NMTOKEN"),
            "NMTOKENS" | "IDREFS" | "ENTITIES" => validate_list(type_name, value),
            "boolean" => validate_boolean(value),
            "decimal" => validate_decimal(value),
            "integer" => validate_integer(value, i128::MIN, i128::MAX),
            "long" => validate_integer(value, i64::MIN as i128, i64::MAX as i128),
            "int" => validate_integer(value, i32::MIN as i128, i32::MAX as i128),
            "short" => validate_integer(value, i16::MIN as i128, i16::MAX as i128),
            "byte" => validate_integer(value, i8::MIN as i128, i8::MAX as i128),
            "nonNegativeInteger" => validate_integer(value, 0, i128::MAX),
            "positiveInteger" => validate_integer(value, 1, i128::MAX),
            "nonPositiveInteger" => validate_integer(value, i128::MIN, 0),
            "negativeInteger" => validate_integer(value, i128::MIN, -1),
            "unsignedLong" => validate_integer(value, 0, u64::MAX as i128),
            "unsignedInt" => validate_integer(value, 0, u32::MAX as i128),
            "unsignedShort" => validate_integer(value, 0, u16::MAX as i128),
            "unsignedByte" => validate_integer(value, 0, u8::MAX as i128),
            "float" | "double" => validate_float(value),
            "date" => validate_date(value),
            "dateTime" => validate_datetime(value),
            "time" => validate_time(value),
            "duration" => validate_pattern(value, &DURATION_REGEX, "duration").and_then(|_| {
                if value.ends_with('P') || value.ends_with('T') {
                    Err(invalid("duration has no components"))
                } else {
                    Ok(())
                }
            }),
            "gYear" => validate_pattern(value, &GYEAR_REGEX, "gYear"),
            "gYearMonth" => validate_pattern(value, &GYEAR_MONTH_REGEX, "gYearMonth"),
            "anyURI" => validate_any_uri(value),
            "base64Binary" => validate_base64_binary(value),
            "hexBinary" => validate_pattern(value.trim(), &HEX_BINARY_REGEX, "hexBinary"),
            "QName" | "NOTATION" => validate_qname(value),
            _ => Ok(()),
        };
        check.map_err(|err| match err {
            Error::Validation(e) => Error::Validation(e.with_type(type_name).with_value(value)),
            other => other,
        })
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Validation(ValidationError::new(message))
}

fn validate_pattern(value: &str, pattern: &Regex, type_name: &str) -> Result<()> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(invalid(format!("invalid {} value", type_name)))
    }
}

fn validate_normalized_string(value: &str) -> Result<()> {
    if value.contains(['\n', '\r', '\t']) {
        return Err(invalid("normalizedString cannot contain newline or tab characters"));
    }
    Ok(())
}

fn validate_token(value: &str) -> Result<()> {
    validate_normalized_string(value)?;
    if value.starts_with(' ') || value.ends_with(' ') || value.contains("  ") {
        return Err(invalid("token cannot have leading, trailing or repeated spaces"));
    }
    Ok(())
}

fn validate_name(type_name: &str, value: &str) -> Result<()> {
    let valid = if type_name == "Name" {
        crate::names::is_valid_qname(value) || crate::names::is_valid_ncname(value)
    } else {
        crate::names::is_valid_ncname(value)
    };
    if valid {
        Ok(())
    } else {
        Err(invalid(format!("'{}' is not a valid {}", value, type_name)))
    }
}

fn validate_list(type_name: &str, value: &str) -> Result<()> {
    let item_type = type_name.trim_end_matches('S');
    let mut items = value.split_whitespace().peekable();
    if items.peek().is_none() {
        return Err(invalid(format!("{} cannot be empty", type_name)));
    }
    for item in items {
        match item_type {
            "NMTOKEN" => validate_pattern(item, &NMTOKEN_REGEX, item_type)?,
            _ => validate_name(item_type, item)?,
        }
    }
    Ok(())
}

fn validate_boolean(value: &str) -> Result<()> {
    match value.trim() {
        "true" | "false" | "1" | "0" => Ok(()),
        _ => Err(invalid("boolean must be true, false, 1 or 0")),
    }
}

fn validate_decimal(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.contains(['e', 'E']) {
        return Err(invalid("decimal cannot use exponent notation"));
    }
    Decimal::from_str(trimmed)
        .map(|_| ())
        .map_err(|_| invalid("invalid decimal value"))
}

fn validate_integer(value: &str, min: i128, max: i128) -> Result<()> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let parsed: i128 = trimmed
        .parse()
        .map_err(|_| invalid("invalid integer value"))?;
    if parsed < min || parsed > max {
        return Err(invalid(format!(
            "value {} out of range [{}, {}]",
            parsed, min, max
        )));
    }
    Ok(())
}

fn validate_float(value: &str) -> Result<()> {
    match value.trim() {
        "INF" | "-INF" | "+INF" | "NaN" => Ok(()),
        other => other
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| invalid("invalid floating point value")),
    }
}

fn strip_timezone(value: &str) -> &str {
    match TIMEZONE_REGEX.find(value) {
        Some(tz) => &value[..tz.start()],
        None => value,
    }
}

fn validate_date(value: &str) -> Result<()> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(strip_timezone(trimmed), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| invalid("invalid date format"))
}

fn validate_datetime(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if DateTime::parse_from_rfc3339(trimmed).is_ok() {
        return Ok(());
    }
    NaiveDateTime::parse_from_str(strip_timezone(trimmed), "%Y-%m-%dT%H:%M:%S%.f")
        .map(|_| ())
        .map_err(|_| invalid("invalid dateTime format"))
}

fn validate_time(value: &str) -> Result<()> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(strip_timezone(trimmed), "%H:%M:%S%.f")
        .map(|_| ())
        .map_err(|_| invalid("invalid time format"))
}

fn validate_any_uri(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.contains(['\n', '\r', '\t', ' ']) {
        return Err(invalid("anyURI cannot contain whitespace"));
    }
    if let Some((scheme, _)) = trimmed.split_once(':') {
        let looks_absolute = scheme.len() > 1
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if looks_absolute {
            url::Url::parse(trimmed).map_err(|e| invalid(format!("invalid URI: {}", e)))?;
        }
    }
    Ok(())
}

fn validate_base64_binary(value: &str) -> Result<()> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(());
    }
    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map(|_| ())
        .map_err(|_| invalid("not a valid base64 encoding"))
}

fn validate_qname(value: &str) -> Result<()> {
    if crate::names::is_valid_qname(value.trim()) {
        Ok(())
    } else {
        Err(invalid(format!("'{}' is not a valid QName", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(type_name: &str, value: &str) -> bool {
        BuiltinDatatypes::new().validate(type_name, value).is_ok()
    }

    #[test]
    fn test_strings() {
        assert!(ok("string", "anything\nat all"));
        assert!(!ok("normalizedString", "a\tb"));
        assert!(ok("token", "a b"));
        assert!(!ok("token", " a"));
        assert!(ok("language", "en-US"));
        assert!(!ok("language", "english language"));
        assert!(ok("NCName", "item-1"));
        assert!(!ok("NCName", "1item"));
        assert!(ok("NMTOKENS", "a b c"));
    }

    #[test]
    fn test_numbers() {
        assert!(ok("boolean", "true"));
        assert!(!ok("boolean", "yes"));
        assert!(ok("decimal", "-12.50"));
        assert!(!ok("decimal", "1e3"));
        assert!(ok("integer", "+42"));
        assert!(ok("byte", "-128"));
        assert!(!ok("byte", "128"));
        assert!(!ok("positiveInteger", "0"));
        assert!(ok("unsignedLong", "18446744073709551615"));
        assert!(ok("double", "INF"));
        assert!(ok("float", "1.5e10"));
        assert!(!ok("float", "one"));
    }

    #[test]
    fn test_dates() {
        assert!(ok("date", "2024-02-29"));
        assert!(!ok("date", "2023-02-29"));
        assert!(ok("date", "2024-01-01Z"));
        assert!(ok("dateTime", "2024-01-01T10:30:00Z"));
        assert!(ok("dateTime", "2024-01-01T10:30:00.5"));
        assert!(!ok("dateTime", "2024-01-01"));
        assert!(ok("time", "23:59:59+01:00"));
        assert!(!ok("time", "25:00:00"));
        assert!(ok("gYear", "2024"));
        assert!(ok("duration", "P1Y2M"));
        assert!(!ok("duration", "P"));
    }

    #[test]
    fn test_binary_uri_qname() {
        assert!(ok("hexBinary", "0FA1"));
        assert!(!ok("hexBinary", "0FA"));
        assert!(ok("base64Binary", "aGVsbG8="));
        assert!(!ok("base64Binary", "not base64!"));
        assert!(ok("anyURI", "http://example.org/a"));
        assert!(ok("anyURI", "relative/path.xml"));
        assert!(!ok("anyURI", "has space"));
        assert!(ok("QName", "xs:string"));
        assert!(!ok("QName", "a:b:c"));
    }

    #[test]
    fn test_error_carries_type_and_value() {
        let err = BuiltinDatatypes::new().validate("int", "x").unwrap_err();
        match err {
            Error::Validation(e) => {
                assert_eq!(e.type_name.as_deref(), Some("int"));
                assert_eq!(e.value.as_deref(), Some("x"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_types_are_accepted() {
        assert!(ok("somethingElse", "whatever"));
    }
}
