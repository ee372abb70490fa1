// src/daily/template.rs
//! Date-variable template rendering for daily content.
//!
//! Only a fixed set of `{{variable}}` date placeholders is supported;
//! there is no expression language and no code execution. Unknown
//! variables pass through verbatim so a typo is visible in the
//! published page instead of silently vanishing.

use chrono::{DateTime, Datelike, Local, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("variable pattern is valid"));

/// Substitutes date variables into a template string.
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Render with the current local time.
    pub fn render_now(&self, template: &str) -> String {
        self.render(template, Local::now())
    }

    /// Render with an explicit timestamp.
    pub fn render(&self, template: &str, date: DateTime<Local>) -> String {
        VARIABLE_PATTERN
            .replace_all(template, |caps: &regex::Captures<'_>| {
                expand(&caps[1], date).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn expand(name: &str, dt: DateTime<Local>) -> Option<String> {
    let value = match name {
        "date" => dt.format("%Y-%m-%d").to_string(),
        "year" => dt.format("%Y").to_string(),
        "month" => format!("{:02}", dt.month()),
        "day" => format!("{:02}", dt.day()),
        "weekday" => dt.format("%A").to_string(),
        "weekday_short" => dt.format("%a").to_string(),
        "month_name" => dt.format("%B").to_string(),
        "month_short" => dt.format("%b").to_string(),
        // iso_date keeps sub-second precision; iso_datetime is
        // truncated to whole seconds.
        "iso_date" => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        "iso_datetime" => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "time" => dt.format("%H:%M").to_string(),
        "hour" => format!("{:02}", dt.hour()),
        "minute" => format!("{:02}", dt.minute()),
        "timestamp" => dt.timestamp().to_string(),
        "week_number" => format!("{:02}", dt.iso_week().week()),
        "day_of_year" => format!("{:03}", dt.ordinal()),
        "quarter" => ((dt.month() - 1) / 3 + 1).to_string(),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fixed() -> DateTime<Local> {
        // A Wednesday in Q3.
        Local.with_ymd_and_hms(2025, 8, 6, 9, 5, 0).unwrap()
    }

    #[test]
    fn substitutes_date_variables() {
        let engine = TemplateEngine::new();
        let out = engine.render("# {{date}} ({{weekday}})", fixed());
        assert_eq!(out, "# 2025-08-06 (Wednesday)");
    }

    #[test]
    fn pads_numeric_variables() {
        let engine = TemplateEngine::new();
        let out = engine.render("{{month}}/{{day}} {{hour}}:{{minute}}", fixed());
        assert_eq!(out, "08/06 09:05");
    }

    #[test]
    fn quarter_and_day_of_year() {
        let engine = TemplateEngine::new();
        assert_eq!(engine.render("Q{{quarter}}", fixed()), "Q3");
        assert_eq!(engine.render("{{day_of_year}}", fixed()), "218");
    }

    #[test]
    fn iso_date_carries_subsecond_precision() {
        let engine = TemplateEngine::new();
        let dt = fixed() + chrono::Duration::microseconds(123_456);
        assert_eq!(
            engine.render("{{iso_date}}", dt),
            "2025-08-06T09:05:00.123456"
        );
        assert_eq!(engine.render("{{iso_datetime}}", dt), "2025-08-06T09:05:00");
    }

    #[test]
    fn unknown_variable_passes_through() {
        let engine = TemplateEngine::new();
        let out = engine.render("{{date}} {{custom_thing}}", fixed());
        assert_eq!(out, "2025-08-06 {{custom_thing}}");
    }

    #[test]
    fn repeated_variables_all_expand() {
        let engine = TemplateEngine::new();
        let out = engine.render("{{year}}-{{year}}", fixed());
        assert_eq!(out, "2025-2025");
    }
}
