//! Output formatting utilities with TTY auto-detection and semantic styling.

use std::io::IsTerminal;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use regex::Regex;
use serde::Serialize;
use termimad::MadSkin;

use crate::model::TodoStatus;

/// Output format for commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-optimized: colors, tables, relative dates
    #[default]
    Pretty,
    /// Script-friendly: no colors, pipe-delimited, full ids
    Plain,
    /// Machine-readable JSON with ISO 8601 timestamps
    Json,
    /// Machine-readable YAML with ISO 8601 timestamps
    Yaml,
}

impl OutputFormat {
    /// Resolve the output format, applying TTY auto-detection.
    ///
    /// If format is Pretty but stdout is not a TTY, returns Plain.
    pub fn resolve(self) -> Self {
        match self {
            OutputFormat::Pretty if !std::io::stdout().is_terminal() => OutputFormat::Plain,
            other => other,
        }
    }
}

/// Print a value as JSON or YAML.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<(), String> {
    match format {
        OutputFormat::Yaml => {
            print!(
                "{}",
                serde_yaml::to_string(value).map_err(|e| format!("YAML error: {}", e))?
            );
        }
        _ => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).map_err(|e| format!("JSON error: {}", e))?
            );
        }
    }
    Ok(())
}

/// Render markdown for the terminal with identity markers hidden.
pub fn render_markdown(markdown: &str) -> String {
    let skin = MadSkin::default();
    let mut buf = Vec::new();
    skin.write_text_on(&mut buf, &hide_markers(markdown)).ok();
    String::from_utf8_lossy(&buf).trim_end().to_string()
}

// ============================================================================
// Semantic Styling
// ============================================================================

/// Checkbox glyph for a status: green when done, yellow while open.
pub fn style_status(status: TodoStatus) -> ColoredString {
    match status {
        TodoStatus::Done => "☑".green(),
        TodoStatus::Open => "☐".yellow(),
    }
}

/// Style for IDs - always dimmed.
pub fn style_id(id: &str) -> ColoredString {
    id.dimmed()
}

/// Style for topic names.
pub fn style_topic(name: &str) -> ColoredString {
    name.blue()
}

/// Length of the id prefix shown in tables.
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

// ============================================================================
// Terminal utilities
// ============================================================================

/// Get terminal width, defaulting to 80 if unavailable.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

// ============================================================================
// Text utilities
// ============================================================================

static MARKER_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*<!--todo:[a-f0-9-]{8,}-->").unwrap());

/// Remove identity markers for display.
pub fn hide_markers(markdown: &str) -> String {
    MARKER_COMMENT_RE.replace_all(markdown, "").to_string()
}

/// Truncate a string from the back, showing "prefix…".
pub fn truncate_back(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else if max_chars <= 1 {
        "…".to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 1).collect();
        format!("{}…", truncated)
    }
}

// ============================================================================
// Date formatting
// ============================================================================

/// Format a datetime as short relative time (e.g., "5m", "3h", "2d", "1w", "2mo", "1y").
pub fn format_relative_short(dt: DateTime<Local>) -> String {
    let duration = Local::now().signed_duration_since(dt);

    let seconds = duration.num_seconds().abs();
    let minutes = duration.num_minutes().abs();
    let hours = duration.num_hours().abs();
    let days = duration.num_days().abs();

    if seconds < 60 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if hours < 24 {
        format!("{}h", hours)
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}

/// Relative age of a millisecond timestamp, or "-" if out of range.
pub fn relative_ms(ms: i64) -> String {
    crate::model::local_from_ms(ms)
        .map(format_relative_short)
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_truncate_back() {
        let cases = [
            ("short", 10, "short"),
            ("exactly", 7, "exactly"),
            ("truncate me", 6, "trunc…"),
            ("héllo wörld", 4, "hél…"),
            ("abc", 1, "…"),
        ];
        for (input, max, want) in cases {
            assert_eq!(truncate_back(input, max), want, "input {:?} max {}", input, max);
        }
    }

    #[test]
    fn test_format_relative_short() {
        let now = Local::now();
        assert_eq!(format_relative_short(now), "now");
        assert_eq!(format_relative_short(now - Duration::minutes(5)), "5m");
        assert_eq!(format_relative_short(now - Duration::hours(3)), "3h");
        assert_eq!(format_relative_short(now - Duration::days(2)), "2d");
        assert_eq!(format_relative_short(now - Duration::days(14)), "2w");
        assert_eq!(format_relative_short(now - Duration::days(400)), "1y");
    }

    #[test]
    fn test_hide_markers() {
        let md = "- [ ] Buy milk <!--todo:aaaaaaaa-1111-4a11-8a11-111111111111-->\nplain";
        assert_eq!(hide_markers(md), "- [ ] Buy milk\nplain");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("aaaaaaaa-1111"), "aaaaaaaa");
        assert_eq!(short_id("abc"), "abc");
    }
}
