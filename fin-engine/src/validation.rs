//! SWIFT field validation
//!
//! Stateless checks for the SWIFT "X" character set, field lengths,
//! reference format, BIC and IBAN shape. Every check returns a structured
//! [`ValidationError`] carrying a stable code and the offending field, so
//! the assembler can collect the complete list in a [`ValidationReport`]
//! instead of stopping at the first problem.
//!
//! # Character set
//!
//! ```text
//! A-Z a-z 0-9 / - ? : ( ) . , ' + space
//! ```
//!
//! Line breaks (LF or CRLF) are accepted only by [`validate_free_text`] and
//! [`validate_continuation_text`], i.e. inside multiline narrative fields.
//! A carriage return outside a CRLF pair is rejected.

use crate::error::ValidationFailure;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of fields :20 and :21
pub const REFERENCE_MAX_LENGTH: usize = 16;

/// Maximum length of an amount in SWIFT comma notation
pub const AMOUNT_MAX_LENGTH: usize = 15;

static BIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{8}([A-Z0-9]{3})?$").expect("BIC pattern compiles"));

static IBAN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{11,30}$").expect("IBAN pattern compiles"));

static CURRENCY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency pattern compiles"));

static ISIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}[0-9]$").expect("ISIN pattern compiles"));

/// Stable validation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Mandatory value is blank
    Empty,
    /// Value exceeds the field maximum
    TooLong,
    /// Character outside the X character set
    BadCharset,
    /// Reference starts or ends with `/`, or contains `//`
    BadSlash,
    /// Continuation line starts with `:` or `-`
    BadLineStart,
    /// BIC shape
    InvalidBic,
    /// IBAN shape or checksum
    InvalidIban,
    /// ISO 4217 code shape
    InvalidCurrency,
    /// Non-positive or over-long amount
    InvalidAmount,
    /// ISIN shape
    InvalidIsin,
    /// Date ordering
    InvalidDate,
    /// Numeric value outside its wire range
    OutOfRange,
    /// Conditional field required by the MT type
    MissingField,
    /// Field not carried by the MT type
    FieldNotAllowed,
    /// MT category outside 1..=9
    UnsupportedMtType,
    /// Line wider than the field layout
    LineTooLong,
    /// More lines than the field layout
    TooManyLines,
}

impl ValidationCode {
    /// Wire/display code
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::Empty => "EMPTY",
            ValidationCode::TooLong => "TOO_LONG",
            ValidationCode::BadCharset => "BAD_CHARSET",
            ValidationCode::BadSlash => "BAD_SLASH",
            ValidationCode::BadLineStart => "BAD_LINE_START",
            ValidationCode::InvalidBic => "INVALID_BIC",
            ValidationCode::InvalidIban => "INVALID_IBAN",
            ValidationCode::InvalidCurrency => "INVALID_CURRENCY",
            ValidationCode::InvalidAmount => "INVALID_AMOUNT",
            ValidationCode::InvalidIsin => "INVALID_ISIN",
            ValidationCode::InvalidDate => "INVALID_DATE",
            ValidationCode::OutOfRange => "OUT_OF_RANGE",
            ValidationCode::MissingField => "MISSING_FIELD",
            ValidationCode::FieldNotAllowed => "FIELD_NOT_ALLOWED",
            ValidationCode::UnsupportedMtType => "UNSUPPORTED_MT_TYPE",
            ValidationCode::LineTooLong => "LINE_TOO_LONG",
            ValidationCode::TooManyLines => "TOO_MANY_LINES",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field tag (`:20`, `:79`) or header field name (`receiverBic`)
    pub field: String,

    /// Stable code
    pub code: ValidationCode,

    /// Human readable message
    pub message: String,
}

impl ValidationError {
    /// Create a new error
    pub fn new(field: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.field, self.code, self.message)
    }
}

/// Collected errors and warnings of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Blocking errors
    pub errors: Vec<ValidationError>,

    /// Non-blocking findings (layout, ignored fields)
    pub warnings: Vec<ValidationError>,
}

impl ValidationReport {
    /// Empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the error of a failed check and hand back the success value
    pub fn check<T>(&mut self, outcome: Result<T, ValidationError>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    /// Add an error
    pub fn add_error(&mut self, field: &str, code: ValidationCode, message: impl Into<String>) {
        self.errors.push(ValidationError::new(field, code, message));
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: &str, code: ValidationCode, message: impl Into<String>) {
        self.warnings.push(ValidationError::new(field, code, message));
    }

    /// Append several warnings
    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = ValidationError>) {
        self.warnings.extend(warnings);
    }

    /// Any blocking error
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Convert into the failure returned to callers
    pub fn into_failure(self) -> ValidationFailure {
        ValidationFailure::new(self.errors)
    }
}

/// Is `c` in the SWIFT X character set
pub fn is_x_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '/' | '-' | '?' | ':' | '(' | ')' | '.' | ',' | '\'' | '+' | ' ')
}

fn check_charset(field: &str, value: &str, multiline: bool) -> Result<(), ValidationError> {
    let offending = value
        .chars()
        .find(|&c| !(is_x_char(c) || (multiline && c == '\n')));
    match offending {
        Some(c) => Err(ValidationError::new(
            field,
            ValidationCode::BadCharset,
            format!("character {:?} is outside the SWIFT X character set", c),
        )),
        None => Ok(()),
    }
}

fn check_length(field: &str, value: &str, max_length: usize) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length > max_length {
        return Err(ValidationError::new(
            field,
            ValidationCode::TooLong,
            format!("length {} exceeds maximum {}", length, max_length),
        ));
    }
    Ok(())
}

fn validate_reference(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, ValidationCode::Empty, "reference is required"));
    }
    check_charset(field, value, false)?;
    check_length(field, value, REFERENCE_MAX_LENGTH)?;
    if value.starts_with('/') || value.ends_with('/') || value.contains("//") {
        return Err(ValidationError::new(
            field,
            ValidationCode::BadSlash,
            "reference must not start or end with '/' or contain '//'",
        ));
    }
    Ok(())
}

/// Validate the transaction reference (field :20)
pub fn validate_ref20(value: &str) -> Result<(), ValidationError> {
    validate_reference(":20", value)
}

/// Validate the related reference (field :21); blank is accepted
pub fn validate_ref21(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    validate_reference(":21", value)
}

/// Validate multiline narrative text against a caller-supplied maximum.
///
/// LF and CRLF line breaks are allowed. Continuation lines must not start
/// with `:` or `-`, which would be read back as a new tag or as the end of
/// block 4.
pub fn validate_free_text(field: &str, value: &str, max_length: usize) -> Result<(), ValidationError> {
    check_narrative(field, value, max_length, 1)
}

/// Validate narrative text rendered below another line of the same field
/// (an account line, an identifier), so its first line is a continuation
/// line as well.
pub fn validate_continuation_text(field: &str, value: &str, max_length: usize) -> Result<(), ValidationError> {
    check_narrative(field, value, max_length, 0)
}

fn check_narrative(field: &str, value: &str, max_length: usize, first_checked: usize) -> Result<(), ValidationError> {
    let normalized = value.replace("\r\n", "\n");
    check_charset(field, &normalized, true)?;
    check_length(field, &normalized, max_length)?;
    if let Some((index, _)) = normalized
        .split('\n')
        .enumerate()
        .skip(first_checked)
        .find(|(_, line)| line.starts_with(':') || line.starts_with('-'))
    {
        return Err(ValidationError::new(
            field,
            ValidationCode::BadLineStart,
            format!("line {} must not start with ':' or '-'", index + 1),
        ));
    }
    Ok(())
}

/// Validate a single-line text field
pub fn validate_text(field: &str, value: &str, max_length: usize) -> Result<(), ValidationError> {
    check_charset(field, value, false)?;
    check_length(field, value, max_length)
}

/// Uppercase and strip whitespace
pub fn normalize_code(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Validate a BIC and return its normalized form
pub fn validate_bic(field: &str, value: &str) -> Result<String, ValidationError> {
    let bic = normalize_code(value);
    if bic.is_empty() {
        return Err(ValidationError::new(field, ValidationCode::Empty, "BIC is required"));
    }
    if !BIC_PATTERN.is_match(&bic) {
        return Err(ValidationError::new(
            field,
            ValidationCode::InvalidBic,
            format!("'{}' is not an 8 or 11 character BIC", bic),
        ));
    }
    Ok(bic)
}

/// Validate IBAN shape and length; the mod-97 check runs only when
/// `verify_checksum` is set. Returns the normalized IBAN.
pub fn validate_iban(field: &str, value: &str, verify_checksum: bool) -> Result<String, ValidationError> {
    let iban = normalize_code(value);
    if !IBAN_PATTERN.is_match(&iban) {
        return Err(ValidationError::new(
            field,
            ValidationCode::InvalidIban,
            "IBAN must be a country code, 2 check digits and 11-30 alphanumerics",
        ));
    }
    if verify_checksum && iban_mod97(&iban) != 1 {
        return Err(ValidationError::new(
            field,
            ValidationCode::InvalidIban,
            "IBAN check digits do not verify",
        ));
    }
    Ok(iban)
}

/// ISO 7064 mod 97-10 remainder of an uppercase IBAN
fn iban_mod97(iban: &str) -> u32 {
    let (head, tail) = iban.split_at(4);
    tail.chars().chain(head.chars()).fold(0u32, |acc, c| match c.to_digit(36) {
        Some(d) if d >= 10 => (acc * 100 + d) % 97,
        Some(d) => (acc * 10 + d) % 97,
        None => acc,
    })
}

/// Validate an ISO 4217 currency code shape
pub fn validate_currency(field: &str, value: &str) -> Result<(), ValidationError> {
    if !CURRENCY_PATTERN.is_match(value) {
        return Err(ValidationError::new(
            field,
            ValidationCode::InvalidCurrency,
            format!("'{}' is not a 3-letter currency code", value),
        ));
    }
    Ok(())
}

/// Validate an ISIN shape
pub fn validate_isin(field: &str, value: &str) -> Result<String, ValidationError> {
    let isin = normalize_code(value);
    if !ISIN_PATTERN.is_match(&isin) {
        return Err(ValidationError::new(
            field,
            ValidationCode::InvalidIsin,
            format!("'{}' is not a 12 character ISIN", isin),
        ));
    }
    Ok(isin)
}

/// Validate a positive amount and return it in SWIFT comma notation
pub fn validate_amount(field: &str, amount: Decimal) -> Result<String, ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::new(
            field,
            ValidationCode::InvalidAmount,
            "amount must be positive",
        ));
    }
    let formatted = format_amount(amount);
    if formatted.len() > AMOUNT_MAX_LENGTH {
        return Err(ValidationError::new(
            field,
            ValidationCode::InvalidAmount,
            format!("amount {} exceeds {} characters", formatted, AMOUNT_MAX_LENGTH),
        ));
    }
    Ok(formatted)
}

/// Render a decimal with a comma separator, always carrying the comma
/// (`1000` → `1000,`, `12.50` → `12,5`)
pub fn format_amount(amount: Decimal) -> String {
    let plain = amount.normalize().to_string();
    match plain.split_once('.') {
        Some((units, fraction)) => format!("{},{}", units, fraction),
        None => format!("{},", plain),
    }
}

/// Layout findings (warnings) for a field of `max_lines` × `line_width`
pub fn check_line_layout(field: &str, value: &str, max_lines: usize, line_width: usize) -> Vec<ValidationError> {
    let mut findings = Vec::new();
    let normalized = value.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    if lines.len() > max_lines {
        findings.push(ValidationError::new(
            field,
            ValidationCode::TooManyLines,
            format!("{} lines exceed the {} line layout", lines.len(), max_lines),
        ));
    }
    if let Some((index, line)) = lines
        .iter()
        .enumerate()
        .find(|(_, line)| line.chars().count() > line_width)
    {
        findings.push(ValidationError::new(
            field,
            ValidationCode::LineTooLong,
            format!("line {} has {} characters, layout allows {}", index + 1, line.chars().count(), line_width),
        ));
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_ref20_rules() {
        assert!(validate_ref20("REF123456").is_ok());
        assert_eq!(validate_ref20("  ").unwrap_err().code, ValidationCode::Empty);
        assert_eq!(validate_ref20("ABCDEFGHIJKLMNOPQ").unwrap_err().code, ValidationCode::TooLong);
        assert_eq!(validate_ref20("REF@1").unwrap_err().code, ValidationCode::BadCharset);
        assert_eq!(validate_ref20("REF\n1").unwrap_err().code, ValidationCode::BadCharset);
        assert_eq!(validate_ref20("/REF1").unwrap_err().code, ValidationCode::BadSlash);
        assert_eq!(validate_ref20("RE//F1").unwrap_err().code, ValidationCode::BadSlash);
        assert_eq!(validate_ref20("REF#1").unwrap_err().field, ":20");
    }

    #[test]
    fn test_ref21_optional() {
        assert!(validate_ref21("").is_ok());
        let err = validate_ref21("BAD#REF").unwrap_err();
        assert_eq!(err.field, ":21");
        assert_eq!(err.code, ValidationCode::BadCharset);
    }

    #[test]
    fn test_free_text_allows_line_breaks() {
        assert!(validate_free_text(":79", "Line one\r\nLine two", 3500).is_ok());
        assert_eq!(
            validate_free_text(":79", "semi;colon", 3500).unwrap_err().code,
            ValidationCode::BadCharset
        );
        assert_eq!(
            validate_free_text(":79", &"A".repeat(3501), 3500).unwrap_err().code,
            ValidationCode::TooLong
        );
        assert_eq!(
            validate_free_text(":79", "first\n:20:fake", 3500).unwrap_err().code,
            ValidationCode::BadLineStart
        );
        assert_eq!(
            validate_free_text(":79", "first\n- dash", 3500).unwrap_err().code,
            ValidationCode::BadLineStart
        );
        assert!(validate_free_text(":79", ":20:first line is inline", 3500).is_ok());
    }

    #[test]
    fn test_bare_carriage_return_rejected() {
        assert_eq!(
            validate_free_text(":79", "Line one\r", 3500).unwrap_err().code,
            ValidationCode::BadCharset
        );
        assert_eq!(
            validate_free_text(":79", "Line\rone", 3500).unwrap_err().code,
            ValidationCode::BadCharset
        );
        assert!(validate_free_text(":79", "Line one\r\nLine two\r\n", 3500).is_ok());
        assert!(validate_free_text(":79", "Line one\r\nLine two", 3500).is_ok());
    }

    #[test]
    fn test_continuation_text_checks_first_line() {
        assert!(validate_continuation_text(":35B", "APPLE INC\nCOMMON", 105).is_ok());
        for value in [":20:X", "-X", "APPLE\n:20:X"] {
            assert_eq!(
                validate_continuation_text(":35B", value, 105).unwrap_err().code,
                ValidationCode::BadLineStart,
                "{:?}",
                value
            );
        }
    }

    #[test]
    fn test_bic_normalization() {
        assert_eq!(validate_bic("receiverBic", " cobadeff xxx").unwrap(), "COBADEFFXXX");
        assert_eq!(validate_bic("receiverBic", "DEUTDEFF").unwrap(), "DEUTDEFF");
        let err = validate_bic("receiverBic", "AB").unwrap_err();
        assert_eq!(err.field, "receiverBic");
        assert_eq!(err.code, ValidationCode::InvalidBic);
        assert_eq!(validate_bic("receiverBic", "DEUTDEFF1").unwrap_err().code, ValidationCode::InvalidBic);
    }

    #[test]
    fn test_iban_shape_and_checksum() {
        assert_eq!(
            validate_iban(":59", "DE89 3704 0044 0532 0130 00", true).unwrap(),
            "DE89370400440532013000"
        );
        assert!(validate_iban(":59", "DE88370400440532013000", false).is_ok());
        assert!(validate_iban(":59", "DE88370400440532013000", true).is_err());
        assert!(validate_iban(":59", "12345", false).is_err());
    }

    #[test]
    fn test_amount_format() {
        assert_eq!(format_amount(dec("1000")), "1000,");
        assert_eq!(format_amount(dec("1000.50")), "1000,5");
        assert_eq!(format_amount(dec("0.25")), "0,25");
        assert!(validate_amount(":32A", dec("0")).is_err());
        assert!(validate_amount(":32A", dec("123456789012345")).is_err());
        assert_eq!(validate_amount(":32A", dec("250.00")).unwrap(), "250,");
    }

    #[test]
    fn test_line_layout_warnings() {
        assert!(check_line_layout(":70", "short\nlines", 4, 35).is_empty());
        let findings = check_line_layout(":70", "a\nb\nc\nd\ne", 4, 35);
        assert_eq!(findings[0].code, ValidationCode::TooManyLines);
        let findings = check_line_layout(":70", &"x".repeat(36), 4, 35);
        assert_eq!(findings[0].code, ValidationCode::LineTooLong);
    }

    #[test]
    fn test_report_collects_everything() {
        let mut report = ValidationReport::new();
        assert!(report.check(validate_ref20("")).is_none());
        assert_eq!(report.check(validate_bic("receiverBic", "COBADEFFXXX")), Some("COBADEFFXXX".to_string()));
        assert!(report.check(validate_bic("senderBic", "X")).is_none());
        assert_eq!(report.errors.len(), 2);
        let failure = report.into_failure();
        assert!(!failure.valid);
        assert!(failure.has(":20", ValidationCode::Empty));
    }
}
