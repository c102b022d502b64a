// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Display Helpers
//!
//! Terminal output formatting and styling.

use console::style;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracekit_core::api::{TracingEvent, TracingState};
use tracekit_core::matching::{DiagnosisKey, ExposureSummary, SimplifiedRisk};
use tracekit_core::time::DayNumber;
use tracekit_core::{DailyTracingKey, ExposureRecord};

/// Prints a success message.
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Prints an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Prints a warning message.
pub fn warning(msg: &str) {
    println!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Prints an info message.
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// "today", "yesterday" or "N days ago".
pub fn relative_day(day: DayNumber, today: DayNumber) -> String {
    match day.days_until(today) {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        n => format!("{} days ago", n),
    }
}

pub fn state(state: TracingState) -> String {
    let text = state.to_string();
    if state.is_error() {
        style(text).red().to_string()
    } else if state == TracingState::Active {
        style(text).green().to_string()
    } else {
        style(text).yellow().to_string()
    }
}

/// One-line description of a controller event, or None for events the
/// caller handles itself.
pub fn event_line(event: &TracingEvent) -> Option<String> {
    match event {
        TracingEvent::StateChanged { from, to } => {
            Some(format!("state: {} → {}", from, state(*to)))
        }
        TracingEvent::Contact { summary } => Some(format!(
            "{} {}",
            style("possible exposure:").red().bold(),
            summary_line(summary)
        )),
        TracingEvent::UploadRequested { keys } => {
            Some(format!("{} key(s) ready for upload", keys.len()))
        }
        TracingEvent::ProvideKeysRequested => {
            Some("diagnosis keys requested; run 'tracekit provide <feed>'".to_string())
        }
        TracingEvent::Error { status, message } => Some(format!(
            "{} {}: {}",
            style("error").red().bold(),
            status,
            message
        )),
        TracingEvent::ConsentRequested => None,
    }
}

pub fn summary_line(summary: &ExposureSummary) -> String {
    match summary.days_since_last_exposure {
        Some(days) => format!(
            "{} matching key(s), last contact {} day(s) ago, highest risk score {}",
            summary.matched_key_count, days, summary.maximum_risk_score
        ),
        None => "no matching keys".to_string(),
    }
}

#[derive(Tabled)]
struct ExposureRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Attenuation")]
    attenuation: String,
    #[tabled(rename = "Keys")]
    keys: u32,
    #[tabled(rename = "Score")]
    score: u8,
    #[tabled(rename = "Risk")]
    risk: String,
}

/// Displays exposure records as a table.
pub fn display_exposures_table(records: &[ExposureRecord], today: DayNumber) {
    let rows: Vec<ExposureRow> = records
        .iter()
        .map(|r| ExposureRow {
            day: relative_day(r.date, today),
            duration: format!("{} min", r.duration_secs / 60),
            attenuation: format!("{} dB", r.attenuation),
            keys: r.matched_key_count,
            score: r.total_risk_score,
            risk: SimplifiedRisk::from_score(r.total_risk_score).to_string(),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}

#[derive(Tabled)]
struct KeyRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Start interval")]
    start: u32,
    #[tabled(rename = "Risk level")]
    risk: u8,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
}

/// Displays own daily keys as a table. Key material is never printed.
pub fn display_keys_table(keys: &[DailyTracingKey], today: DayNumber) {
    let rows: Vec<KeyRow> = keys
        .iter()
        .map(|k| {
            let mut fingerprint = DiagnosisKey::unsigned(k.clone()).fingerprint();
            fingerprint.truncate(16);
            KeyRow {
                day: relative_day(k.day(), today),
                start: k.rolling_start_number().0,
                risk: k.transmission_risk_level(),
                fingerprint,
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_day() {
        let today = DayNumber(100);
        assert_eq!(relative_day(today, today), "today");
        assert_eq!(relative_day(DayNumber(99), today), "yesterday");
        assert_eq!(relative_day(DayNumber(90), today), "10 days ago");
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            summary_line(&ExposureSummary::default()),
            "no matching keys"
        );
        let summary = ExposureSummary {
            days_since_last_exposure: Some(2),
            matched_key_count: 3,
            maximum_risk_score: 6,
            updated: Vec::new(),
        };
        assert!(summary_line(&summary).contains("3 matching key(s)"));
    }

    #[test]
    fn test_consent_requests_are_left_to_the_caller() {
        assert!(event_line(&TracingEvent::ConsentRequested).is_none());
        assert!(event_line(&TracingEvent::ProvideKeysRequested).is_some());
    }
}
