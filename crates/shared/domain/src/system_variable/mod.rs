//! System variables: typed per-organization settings.
//!
//! Every variable has a [`VariableType`] and optional [`ValidationRules`]
//! applied whenever a value is set. Incremental variables never take a value
//! directly; their value is the last code produced by [`IncrementalConfig`].

mod incremental;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_VARIABLE_KEY_LENGTH;
use crate::error::{DomainError, DomainResult};

pub use incremental::{
    expand_tokens, GeneratedNumber, IncrementalConfig, IncrementalSettings, ResetFrequency,
};

// Upper bound kept in step with MAX_VARIABLE_KEY_LENGTH.
static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.]{0,99}$").expect("valid variable key regex"));

/// Plain decimal notation: optional sign, digits, optional fraction.
static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+(\.[0-9]+)?$").expect("valid number regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Text,
    Number,
    Boolean,
    Date,
    Json,
    Incremental,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::Text => "text",
            VariableType::Number => "number",
            VariableType::Boolean => "boolean",
            VariableType::Date => "date",
            VariableType::Json => "json",
            VariableType::Incremental => "incremental",
        }
    }

    pub fn is_incremental(&self) -> bool {
        matches!(self, VariableType::Incremental)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(VariableType::Text),
            "number" => Ok(VariableType::Number),
            "boolean" => Ok(VariableType::Boolean),
            "date" => Ok(VariableType::Date),
            "json" => Ok(VariableType::Json),
            "incremental" => Ok(VariableType::Incremental),
            other => Err(DomainError::validation(format!(
                "Unknown variable type '{}'",
                other
            ))),
        }
    }
}

/// Constraints applied to a value before it is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ValidationRules {
    #[serde(default)]
    pub is_required: bool,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    /// Regular expression the whole value must match.
    pub pattern: Option<String>,
}

impl ValidationRules {
    /// Check that the rules themselves are coherent.
    pub fn validate(&self) -> DomainResult<()> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(DomainError::validation(
                    "Minimum length cannot exceed maximum length",
                ));
            }
        }
        if self.pattern.is_some() {
            self.compiled_pattern()?;
        }
        Ok(())
    }

    fn compiled_pattern(&self) -> DomainResult<Option<Regex>> {
        match self.pattern.as_deref().filter(|p| !p.is_empty()) {
            None => Ok(None),
            Some(pattern) => Regex::new(&format!("^(?:{})$", pattern))
                .map(Some)
                .map_err(|e| DomainError::validation(format!("Invalid pattern: {}", e))),
        }
    }

    fn check(&self, value: &str) -> DomainResult<()> {
        let length = value.chars().count();
        if let Some(min) = self.min_length {
            if length < min as usize {
                return Err(DomainError::validation(format!(
                    "Value must be at least {} characters",
                    min
                )));
            }
        }
        if let Some(max) = self.max_length {
            if length > max as usize {
                return Err(DomainError::validation(format!(
                    "Value must be at most {} characters",
                    max
                )));
            }
        }
        if let Some(regex) = self.compiled_pattern()? {
            if !regex.is_match(value) {
                return Err(DomainError::validation(
                    "Value does not match the required pattern",
                ));
            }
        }
        Ok(())
    }
}

/// Validate and normalize a raw value for a variable.
///
/// Returns `Ok(None)` when an optional value is cleared.
pub fn validate_value(
    data_type: VariableType,
    rules: &ValidationRules,
    raw: Option<&str>,
) -> DomainResult<Option<String>> {
    if data_type.is_incremental() {
        return Err(DomainError::validation(
            "Incremental values are generated and cannot be set directly",
        ));
    }

    let raw = match raw {
        Some(value) if !value.trim().is_empty() => value,
        _ if rules.is_required => return Err(DomainError::validation("A value is required")),
        _ => return Ok(None),
    };

    let normalized = match data_type {
        VariableType::Text => raw.to_string(),
        VariableType::Number => normalize_number(raw)?,
        VariableType::Boolean => normalize_boolean(raw)?,
        VariableType::Date => normalize_date(raw)?,
        VariableType::Json => normalize_json(raw)?,
        VariableType::Incremental => unreachable!("handled above"),
    };

    rules.check(&normalized)?;
    Ok(Some(normalized))
}

fn normalize_number(raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if NUMBER_PATTERN.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(DomainError::validation("Value must be a number"))
    }
}

fn normalize_boolean(raw: &str) -> DomainResult<String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok("true".to_string()),
        "false" | "0" | "no" => Ok("false".to_string()),
        _ => Err(DomainError::validation("Value must be true or false")),
    }
}

fn normalize_date(raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    let shape_ok = trimmed.len() == 10
        && trimmed.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(DomainError::validation("Date must be formatted as YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| DomainError::validation("Date is not a valid calendar date"))
}

fn normalize_json(raw: &str) -> DomainResult<String> {
    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| DomainError::validation(format!("Value must be valid JSON: {}", e)))?;
    serde_json::to_string(&parsed).map_err(|e| DomainError::internal(e.to_string()))
}

pub fn validate_variable_key(key: &str) -> DomainResult<String> {
    let key = key.trim();
    if !KEY_PATTERN.is_match(key) {
        return Err(DomainError::validation(format!(
            "Key must start with a lowercase letter and contain only a-z, 0-9, '_' or '.' (max {} characters)",
            MAX_VARIABLE_KEY_LENGTH
        )));
    }
    Ok(key.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SystemVariableGroup {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SystemVariable {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub group_id: Option<Uuid>,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub data_type: VariableType,
    pub validation: ValidationRules,
    pub default_value: Option<String>,
    /// Stored value; for incremental variables, the last generated code.
    pub value: Option<String>,
    pub incremental: Option<IncrementalConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SystemVariable {
    /// The stored value, falling back to the default.
    pub fn effective_value(&self) -> Option<&str> {
        self.value.as_deref().or(self.default_value.as_deref())
    }
}

/// Ledger entry for a code issued by an incremental variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GeneratedCode {
    pub id: Uuid,
    pub variable_id: Uuid,
    pub code: String,
    pub number: i64,
    pub generated_by: Option<Uuid>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ValidationRules {
        ValidationRules::default()
    }

    #[test]
    fn required_rejects_empty() {
        let required = ValidationRules {
            is_required: true,
            ..rules()
        };
        assert!(validate_value(VariableType::Text, &required, None).is_err());
        assert!(validate_value(VariableType::Text, &required, Some("  ")).is_err());
    }

    #[test]
    fn empty_optional_value_clears() {
        assert_eq!(validate_value(VariableType::Number, &rules(), Some("")).unwrap(), None);
        assert_eq!(validate_value(VariableType::Text, &rules(), None).unwrap(), None);
    }

    #[test]
    fn length_counts_characters() {
        let bounded = ValidationRules {
            min_length: Some(2),
            max_length: Some(3),
            ..rules()
        };
        assert!(validate_value(VariableType::Text, &bounded, Some("ééé")).is_ok());
        assert!(validate_value(VariableType::Text, &bounded, Some("é")).is_err());
        assert!(validate_value(VariableType::Text, &bounded, Some("éééé")).is_err());
    }

    #[test]
    fn pattern_must_match_whole_value() {
        let digits = ValidationRules {
            pattern: Some(r"\d{3}".to_string()),
            ..rules()
        };
        assert!(validate_value(VariableType::Text, &digits, Some("123")).is_ok());
        assert!(validate_value(VariableType::Text, &digits, Some("1234")).is_err());
        assert!(validate_value(VariableType::Text, &digits, Some("a123")).is_err());
    }

    #[test]
    fn numbers_use_plain_decimal_notation() {
        for (input, expected) in [(" 12.5 ", "12.5"), ("-3", "-3"), ("+0.25", "+0.25"), ("007", "007")] {
            assert_eq!(
                validate_value(VariableType::Number, &rules(), Some(input)).unwrap(),
                Some(expected.to_string())
            );
        }
        for bad in ["abc", "NaN", "inf", "1,5", "1e3", ".5", "5.", "0x1F", "1 000"] {
            assert!(validate_value(VariableType::Number, &rules(), Some(bad)).is_err(), "{bad}");
        }
    }

    #[test]
    fn booleans_normalize() {
        for (input, expected) in [("YES", "true"), ("1", "true"), ("False", "false"), ("no", "false")] {
            assert_eq!(
                validate_value(VariableType::Boolean, &rules(), Some(input)).unwrap(),
                Some(expected.to_string())
            );
        }
        assert!(validate_value(VariableType::Boolean, &rules(), Some("maybe")).is_err());
    }

    #[test]
    fn dates_require_iso_calendar_dates() {
        assert_eq!(
            validate_value(VariableType::Date, &rules(), Some("2024-02-29")).unwrap(),
            Some("2024-02-29".to_string())
        );
        assert!(validate_value(VariableType::Date, &rules(), Some("2023-02-29")).is_err());
        assert!(validate_value(VariableType::Date, &rules(), Some("2024-2-9")).is_err());
        assert!(validate_value(VariableType::Date, &rules(), Some("29/02/2024")).is_err());
    }

    #[test]
    fn json_is_compacted() {
        assert_eq!(
            validate_value(VariableType::Json, &rules(), Some("{ \"a\" : [1, 2] }")).unwrap(),
            Some(r#"{"a":[1,2]}"#.to_string())
        );
        assert!(validate_value(VariableType::Json, &rules(), Some("{oops")).is_err());
    }

    #[test]
    fn incremental_values_cannot_be_set() {
        assert!(validate_value(VariableType::Incremental, &rules(), Some("INV-1")).is_err());
        assert!(validate_value(VariableType::Incremental, &rules(), None).is_err());
    }

    #[test]
    fn rule_consistency() {
        let inverted = ValidationRules {
            min_length: Some(5),
            max_length: Some(2),
            ..rules()
        };
        assert!(inverted.validate().is_err());

        let broken = ValidationRules {
            pattern: Some("(".to_string()),
            ..rules()
        };
        assert!(broken.validate().is_err());
        assert!(rules().validate().is_ok());
    }

    #[test]
    fn variable_keys() {
        assert_eq!(validate_variable_key("invoice.number").unwrap(), "invoice.number");
        assert!(validate_variable_key("a").is_ok());
        assert!(validate_variable_key(&"a".repeat(100)).is_ok());
        assert!(validate_variable_key(&"a".repeat(101)).is_err());
        for bad in ["1abc", "Invoice", "with-dash", "", "_x"] {
            assert!(validate_variable_key(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn variable_types_round_trip_through_strings() {
        for t in [
            VariableType::Text,
            VariableType::Number,
            VariableType::Boolean,
            VariableType::Date,
            VariableType::Json,
            VariableType::Incremental,
        ] {
            assert_eq!(t.as_str().parse::<VariableType>().unwrap(), t);
        }
        assert!("enum".parse::<VariableType>().is_err());
    }
}
