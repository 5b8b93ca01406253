//! Incremental document numbering.
//!
//! A counter with a formatted code: `prefix + zero-padded number + suffix`.
//! Prefix and suffix may carry `{YYYY}`, `{YY}`, `{MM}` and `{DD}` tokens that
//! expand from the generation instant (UTC).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PADDING, MAX_AFFIX_LENGTH, MAX_PADDING, TOKEN_DAY, TOKEN_MONTH, TOKEN_YEAR_FULL,
    TOKEN_YEAR_SHORT,
};
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ResetFrequency {
    #[default]
    Never,
    Yearly,
    Monthly,
}

impl ResetFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetFrequency::Never => "never",
            ResetFrequency::Yearly => "yearly",
            ResetFrequency::Monthly => "monthly",
        }
    }

    /// Comparable period index of an instant, `None` when resets are off.
    fn period(&self, at: DateTime<Utc>) -> Option<i64> {
        match self {
            ResetFrequency::Never => None,
            ResetFrequency::Yearly => Some(i64::from(at.year())),
            ResetFrequency::Monthly => Some(i64::from(at.year()) * 12 + i64::from(at.month0())),
        }
    }
}

impl fmt::Display for ResetFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResetFrequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(ResetFrequency::Never),
            "yearly" => Ok(ResetFrequency::Yearly),
            "monthly" => Ok(ResetFrequency::Monthly),
            other => Err(DomainError::validation(format!(
                "Unknown reset frequency '{}'",
                other
            ))),
        }
    }
}

/// User-editable part of an incremental configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct IncrementalSettings {
    pub prefix: String,
    pub suffix: String,
    pub padding: u32,
    pub start_number: i64,
    pub reset_frequency: ResetFrequency,
}

impl Default for IncrementalSettings {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            padding: DEFAULT_PADDING,
            start_number: 1,
            reset_frequency: ResetFrequency::Never,
        }
    }
}

impl IncrementalSettings {
    pub fn validate(&self) -> DomainResult<()> {
        if self.padding > MAX_PADDING {
            return Err(DomainError::validation(format!(
                "Padding must be between 0 and {}",
                MAX_PADDING
            )));
        }
        if self.prefix.chars().count() > MAX_AFFIX_LENGTH
            || self.suffix.chars().count() > MAX_AFFIX_LENGTH
        {
            return Err(DomainError::validation(format!(
                "Prefix and suffix must be at most {} characters",
                MAX_AFFIX_LENGTH
            )));
        }
        if self.start_number < 0 {
            return Err(DomainError::validation("Start number must not be negative"));
        }

        let has = |token: &str| self.prefix.contains(token) || self.suffix.contains(token);
        let has_year = has(TOKEN_YEAR_FULL) || has(TOKEN_YEAR_SHORT);
        match self.reset_frequency {
            ResetFrequency::Never => {}
            ResetFrequency::Yearly if !has_year => {
                return Err(DomainError::validation(
                    "A yearly reset requires a {YYYY} or {YY} token in the prefix or suffix",
                ));
            }
            ResetFrequency::Monthly if !(has_year && has(TOKEN_MONTH)) => {
                return Err(DomainError::validation(
                    "A monthly reset requires a year token and a {MM} token in the prefix or suffix",
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Outcome of one generation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GeneratedNumber {
    pub number: i64,
    pub code: String,
    /// The counter was restarted by this step.
    pub reset: bool,
}

/// Counter state of an incremental variable.
///
/// `current_number` holds the last issued number; a config that has never
/// issued anything holds `start_number - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IncrementalConfig {
    #[serde(flatten)]
    pub settings: IncrementalSettings,
    pub current_number: i64,
    pub last_reset_at: DateTime<Utc>,
}

impl IncrementalConfig {
    pub fn new(settings: IncrementalSettings, now: DateTime<Utc>) -> DomainResult<Self> {
        settings.validate()?;
        Ok(Self {
            current_number: settings.start_number - 1,
            settings,
            last_reset_at: now,
        })
    }

    /// Apply new settings. The counter only moves forward.
    ///
    /// A higher `start_number` lifts the counter so the next code is at least
    /// the new start. A lower one leaves the counter where it is.
    ///
    /// Changing the reset frequency starts a new period at `now`, so codes
    /// already issued in the current period are not reissued.
    pub fn reconfigure(&mut self, settings: IncrementalSettings, now: DateTime<Utc>) -> DomainResult<()> {
        settings.validate()?;
        if settings.reset_frequency != self.settings.reset_frequency {
            self.last_reset_at = now;
        }
        self.current_number = self.current_number.max(settings.start_number - 1);
        self.settings = settings;
        Ok(())
    }

    pub fn needs_reset(&self, now: DateTime<Utc>) -> bool {
        let frequency = self.settings.reset_frequency;
        match (frequency.period(now), frequency.period(self.last_reset_at)) {
            (Some(current), Some(last)) => current > last,
            _ => false,
        }
    }

    /// Number the next generation at `now` would issue, with its reset flag.
    fn next_number(&self, now: DateTime<Utc>) -> DomainResult<(i64, bool)> {
        if self.needs_reset(now) {
            return Ok((self.settings.start_number, true));
        }
        let next = self
            .current_number
            .checked_add(1)
            .ok_or_else(|| DomainError::validation("Incremental counter is exhausted"))?;
        Ok((next.max(self.settings.start_number), false))
    }

    /// Issue the next number and record it as current.
    pub fn advance(&mut self, now: DateTime<Utc>) -> DomainResult<GeneratedNumber> {
        let (number, reset) = self.next_number(now)?;
        if reset {
            self.last_reset_at = now;
        }
        self.current_number = number;
        Ok(GeneratedNumber {
            number,
            code: self.format(number, now),
            reset,
        })
    }

    /// The code `advance(now)` would produce, leaving state untouched.
    pub fn preview(&self, now: DateTime<Utc>) -> DomainResult<GeneratedNumber> {
        let (number, reset) = self.next_number(now)?;
        Ok(GeneratedNumber {
            number,
            code: self.format(number, now),
            reset,
        })
    }

    pub fn format(&self, number: i64, at: DateTime<Utc>) -> String {
        let width = self.settings.padding as usize;
        format!(
            "{}{:0width$}{}",
            expand_tokens(&self.settings.prefix, at),
            number,
            expand_tokens(&self.settings.suffix, at),
            width = width
        )
    }
}

/// Replace date tokens with values from `at`. Unknown braces are kept as-is.
pub fn expand_tokens(template: &str, at: DateTime<Utc>) -> String {
    if !template.contains('{') {
        return template.to_string();
    }
    template
        .replace(TOKEN_YEAR_FULL, &format!("{:04}", at.year()))
        .replace(TOKEN_YEAR_SHORT, &format!("{:02}", at.year().rem_euclid(100)))
        .replace(TOKEN_MONTH, &format!("{:02}", at.month()))
        .replace(TOKEN_DAY, &format!("{:02}", at.day()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn settings(prefix: &str, padding: u32, reset: ResetFrequency) -> IncrementalSettings {
        IncrementalSettings {
            prefix: prefix.to_string(),
            suffix: String::new(),
            padding,
            start_number: 1,
            reset_frequency: reset,
        }
    }

    #[test]
    fn fresh_config_issues_start_number_first() {
        let mut config =
            IncrementalConfig::new(settings("INV-", 5, ResetFrequency::Never), at(2024, 1, 1))
                .unwrap();
        assert_eq!(config.current_number, 0);

        let first = config.advance(at(2024, 1, 2)).unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.code, "INV-00001");
        assert!(!first.reset);

        let second = config.advance(at(2024, 1, 2)).unwrap();
        assert_eq!(second.code, "INV-00002");
        assert_eq!(config.current_number, 2);
    }

    #[test]
    fn wide_numbers_are_not_truncated() {
        let mut config =
            IncrementalConfig::new(settings("", 2, ResetFrequency::Never), at(2024, 1, 1))
                .unwrap();
        config.current_number = 12344;
        assert_eq!(config.advance(at(2024, 1, 1)).unwrap().code, "12345");
    }

    #[test]
    fn tokens_expand_from_generation_instant() {
        let config = IncrementalConfig::new(
            IncrementalSettings {
                prefix: "PO/{YYYY}/{MM}/".to_string(),
                suffix: "-{YY}{DD}".to_string(),
                padding: 4,
                start_number: 1,
                reset_frequency: ResetFrequency::Monthly,
            },
            at(2024, 3, 1),
        )
        .unwrap();
        assert_eq!(config.format(7, at(2024, 3, 9)), "PO/2024/03/0007-2409");
    }

    #[test]
    fn formatting_is_deterministic() {
        let config =
            IncrementalConfig::new(settings("{YYYY}-", 3, ResetFrequency::Yearly), at(2024, 1, 1))
                .unwrap();
        let when = at(2024, 6, 1);
        assert_eq!(config.preview(when).unwrap(), config.preview(when).unwrap());
    }

    #[test]
    fn yearly_reset_happens_once_per_new_year() {
        let mut config =
            IncrementalConfig::new(settings("{YYYY}-", 3, ResetFrequency::Yearly), at(2024, 1, 1))
                .unwrap();
        config.advance(at(2024, 5, 1)).unwrap();
        config.advance(at(2024, 12, 31)).unwrap();

        let rolled = config.advance(at(2025, 1, 1)).unwrap();
        assert!(rolled.reset);
        assert_eq!(rolled.code, "2025-001");
        assert_eq!(config.last_reset_at, at(2025, 1, 1));

        let next = config.advance(at(2025, 1, 2)).unwrap();
        assert!(!next.reset);
        assert_eq!(next.code, "2025-002");
    }

    #[test]
    fn monthly_reset_compares_year_and_month() {
        let mut config = IncrementalConfig::new(
            settings("{YYYY}{MM}-", 2, ResetFrequency::Monthly),
            at(2024, 12, 1),
        )
        .unwrap();
        config.advance(at(2024, 12, 5)).unwrap();
        config.advance(at(2024, 12, 6)).unwrap();

        // January of the next year is a later period even though month < 12.
        let rolled = config.advance(at(2025, 1, 3)).unwrap();
        assert!(rolled.reset);
        assert_eq!(rolled.code, "202501-01");
    }

    #[test]
    fn clock_moving_backwards_never_resets() {
        let mut config =
            IncrementalConfig::new(settings("{YYYY}-", 0, ResetFrequency::Yearly), at(2025, 1, 1))
                .unwrap();
        config.advance(at(2025, 2, 1)).unwrap();
        let earlier = config.advance(at(2024, 12, 31)).unwrap();
        assert!(!earlier.reset);
        assert_eq!(earlier.number, 2);
    }

    #[test]
    fn never_frequency_ignores_calendar() {
        let mut config =
            IncrementalConfig::new(settings("A", 0, ResetFrequency::Never), at(2020, 1, 1))
                .unwrap();
        config.advance(at(2020, 1, 1)).unwrap();
        assert!(!config.needs_reset(at(2030, 1, 1)));
        assert_eq!(config.advance(at(2030, 1, 1)).unwrap().code, "A2");
    }

    #[test]
    fn preview_leaves_state_untouched() {
        let config =
            IncrementalConfig::new(settings("Q", 3, ResetFrequency::Never), at(2024, 1, 1))
                .unwrap();
        let before = config.clone();
        assert_eq!(config.preview(at(2024, 1, 1)).unwrap().code, "Q001");
        assert_eq!(config, before);
    }

    #[test]
    fn reset_frequencies_require_matching_tokens() {
        assert!(settings("INV-", 5, ResetFrequency::Yearly).validate().is_err());
        assert!(settings("INV-{YY}-", 5, ResetFrequency::Yearly).validate().is_ok());
        assert!(settings("INV-{YYYY}-", 5, ResetFrequency::Monthly).validate().is_err());
        assert!(settings("{MM}-", 5, ResetFrequency::Monthly).validate().is_err());
        assert!(settings("{YYYY}{MM}-", 5, ResetFrequency::Monthly).validate().is_ok());
    }

    #[test]
    fn settings_bounds() {
        assert!(settings("", 21, ResetFrequency::Never).validate().is_err());
        assert!(settings(&"p".repeat(51), 0, ResetFrequency::Never).validate().is_err());
        let mut negative = settings("", 0, ResetFrequency::Never);
        negative.start_number = -1;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn reconfigure_never_moves_counter_backwards() {
        let mut config =
            IncrementalConfig::new(settings("A", 0, ResetFrequency::Never), at(2024, 1, 1))
                .unwrap();
        for _ in 0..10 {
            config.advance(at(2024, 1, 1)).unwrap();
        }

        let mut lower = settings("B", 0, ResetFrequency::Never);
        lower.start_number = 1;
        config.reconfigure(lower, at(2024, 1, 1)).unwrap();
        assert_eq!(config.current_number, 10);
        assert_eq!(config.advance(at(2024, 1, 1)).unwrap().code, "B11");

        let mut higher = settings("B", 0, ResetFrequency::Never);
        higher.start_number = 100;
        config.reconfigure(higher, at(2024, 1, 1)).unwrap();
        assert_eq!(config.advance(at(2024, 1, 1)).unwrap().number, 100);
    }

    #[test]
    fn switching_to_yearly_keeps_the_current_year() {
        let mut config =
            IncrementalConfig::new(settings("{YYYY}-", 3, ResetFrequency::Never), at(2023, 6, 1))
                .unwrap();
        assert_eq!(config.advance(at(2024, 2, 1)).unwrap().code, "2024-001");
        assert_eq!(config.advance(at(2024, 2, 2)).unwrap().code, "2024-002");

        config
            .reconfigure(settings("{YYYY}-", 3, ResetFrequency::Yearly), at(2024, 2, 10))
            .unwrap();
        assert_eq!(config.last_reset_at, at(2024, 2, 10));

        let next = config.advance(at(2024, 3, 1)).unwrap();
        assert!(!next.reset);
        assert_eq!(next.code, "2024-003");

        let rolled = config.advance(at(2025, 1, 2)).unwrap();
        assert!(rolled.reset);
        assert_eq!(rolled.code, "2025-001");
    }

    #[test]
    fn unchanged_frequency_keeps_the_reset_anchor() {
        let mut config =
            IncrementalConfig::new(settings("{YYYY}-", 3, ResetFrequency::Yearly), at(2023, 6, 1))
                .unwrap();
        config
            .reconfigure(settings("{YYYY}/", 4, ResetFrequency::Yearly), at(2024, 2, 10))
            .unwrap();
        assert_eq!(config.last_reset_at, at(2023, 6, 1));
        assert!(config.advance(at(2024, 3, 1)).unwrap().reset);
    }

    #[test]
    fn exhausted_counter_is_an_error() {
        let mut config =
            IncrementalConfig::new(settings("", 0, ResetFrequency::Never), at(2024, 1, 1))
                .unwrap();
        config.current_number = i64::MAX;
        assert!(config.advance(at(2024, 1, 1)).is_err());
        assert_eq!(config.current_number, i64::MAX);
    }

    #[test]
    fn reset_frequency_parses_case_insensitively() {
        assert_eq!("Monthly".parse::<ResetFrequency>().unwrap(), ResetFrequency::Monthly);
        assert!("weekly".parse::<ResetFrequency>().is_err());
        assert_eq!(ResetFrequency::Yearly.to_string(), "yearly");
    }
}
