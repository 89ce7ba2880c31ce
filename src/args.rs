//! Shared CLI argument structs for consistent flag definitions across commands.
//!
//! Use `#[command(flatten)]` to include them in command-specific Args structs.

use chrono::{Days, Local, NaiveDate};
use clap::{Args, ValueEnum};

use crate::config;
use crate::model::DATE_FORMAT;
use crate::output::OutputFormat;

pub const FORMAT_ENV: &str = "DAILIES_FORMAT";

// ============================================================================
// FormatArgs - Output format flags
// ============================================================================

/// Common output format flags.
///
/// Provides consistent --format/-f and --json flags across commands.
/// Use `resolve()` to get the effective format with TTY auto-detection.
#[derive(Args, Clone, Debug, Default)]
pub struct FormatArgs {
    /// Output format (auto-detects TTY for pretty vs plain)
    #[arg(short = 'f', long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Output as JSON (shorthand for --format=json)
    #[arg(long, conflicts_with = "format", global = true)]
    pub json: bool,
}

impl FormatArgs {
    /// Resolve the effective output format.
    ///
    /// --json, then --format, then DAILIES_FORMAT, then pretty; pretty falls back
    /// to plain off a TTY.
    pub fn resolve(&self) -> OutputFormat {
        if self.json {
            return OutputFormat::Json;
        }
        self.format
            .or_else(|| {
                config::env_string(FORMAT_ENV)
                    .and_then(|v| OutputFormat::from_str(&v, true).ok())
            })
            .unwrap_or_default()
            .resolve()
    }
}

// ============================================================================
// DateArg - Journal date argument
// ============================================================================

/// Optional positional date (defaults to today).
#[derive(Args, Clone, Debug, Default)]
pub struct DateArg {
    /// Date: YYYY-MM-DD, today, or yesterday (default: today)
    #[arg(value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

impl DateArg {
    pub fn resolve(&self) -> NaiveDate {
        self.date.unwrap_or_else(today)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a date argument relative to the local calendar.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_date_from(s, today())
}

fn parse_date_from(s: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    match s.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| "date out of range".to_string()),
        other => NaiveDate::parse_from_str(other, DATE_FORMAT)
            .map_err(|_| format!("invalid date '{}': expected YYYY-MM-DD, today or yesterday", s)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_keywords() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(parse_date_from("today", today), Ok(today));
        assert_eq!(parse_date_from(" Today ", today), Ok(today));
        assert_eq!(
            parse_date_from("yesterday", today),
            Ok(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()),
            "yesterday must cross month boundaries"
        );
    }

    #[test]
    fn test_parse_date_literal() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(
            parse_date_from("2025-12-31", today),
            Ok(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap())
        );
        for bad in ["2025-13-01", "31/12/2025", "tomorrow", ""] {
            assert!(parse_date_from(bad, today).is_err(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_format_json_shorthand() {
        let args = FormatArgs {
            format: None,
            json: true,
        };
        assert_eq!(args.resolve(), OutputFormat::Json);

        let args = FormatArgs {
            format: Some(OutputFormat::Yaml),
            json: false,
        };
        assert_eq!(args.resolve(), OutputFormat::Yaml);
    }
}
