//! Line protocol between the pipeline and its host process.
//!
//! Consumers read newline-delimited tagged lines from stdout:
//!
//! - `EVENT_JSON:{...}` — one bare serialized [`CanonicalRecord`] per
//!   completed listing, emitted as the run progresses;
//! - `EVENT_EXCEL_SAVED:<filename>` — the spreadsheet export landed;
//! - `RESULTADO_JSON:[...]` — the terminal line, always emitted exactly
//!   once, carrying the full record array (`[]` on failure or cancellation).
//!
//! Anything not carrying one of these tags is log noise consumers ignore.

use anyhow::Result;
use serde_json::Value;

use crate::record::CanonicalRecord;

pub const EVENT_TAG: &str = "EVENT_JSON:";
pub const EXPORT_TAG: &str = "EVENT_EXCEL_SAVED:";
pub const RESULT_TAG: &str = "RESULTADO_JSON:";

/// Format a progress event line.
pub fn format_event(payload: &Value) -> String {
    format!("{EVENT_TAG}{payload}")
}

/// Format the export notification line.
pub fn format_export(filename: &str) -> String {
    format!("{EXPORT_TAG}{filename}")
}

/// Format the terminal result line. Serialization of canonical records
/// cannot fail; a defensive empty array keeps the terminal-line guarantee.
pub fn format_result(records: &[CanonicalRecord]) -> String {
    let body = serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string());
    format!("{RESULT_TAG}{body}")
}

/// A parsed protocol line, for consumers and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Event(Value),
    ExportSaved(String),
    Result(Vec<CanonicalRecord>),
    /// Untagged output (log lines, diagnostics).
    Noise(String),
}

/// Classify one stdout line.
pub fn parse_line(line: &str) -> Result<Line> {
    if let Some(body) = line.strip_prefix(EVENT_TAG) {
        return Ok(Line::Event(serde_json::from_str(body)?));
    }
    if let Some(name) = line.strip_prefix(EXPORT_TAG) {
        return Ok(Line::ExportSaved(name.trim().to_string()));
    }
    if let Some(body) = line.strip_prefix(RESULT_TAG) {
        return Ok(Line::Result(serde_json::from_str(body)?));
    }
    Ok(Line::Noise(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_line_carries_the_bare_record() {
        let rec = CanonicalRecord {
            title: "Gol".to_string(),
            ..Default::default()
        };
        let payload = serde_json::to_value(&rec).unwrap();
        let line = format_event(&payload);
        assert!(line.starts_with("EVENT_JSON:{"));
        match parse_line(&line).unwrap() {
            Line::Event(v) => {
                assert_eq!(v["title"], "Gol");
                // No event envelope on the wire.
                assert!(v.get("type").is_none());
                assert!(v.get("record").is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn export_line_round_trips() {
        let line = format_export("anuncios_carros.csv");
        assert_eq!(line, "EVENT_EXCEL_SAVED:anuncios_carros.csv");
        assert_eq!(
            parse_line(&line).unwrap(),
            Line::ExportSaved("anuncios_carros.csv".to_string())
        );
    }

    #[test]
    fn result_line_round_trips_including_empty() {
        let line = format_result(&[]);
        assert_eq!(line, "RESULTADO_JSON:[]");
        assert_eq!(parse_line(&line).unwrap(), Line::Result(vec![]));

        let rec = CanonicalRecord {
            title: "Fiat Argo".to_string(),
            ..Default::default()
        };
        let line = format_result(&[rec.clone()]);
        match parse_line(&line).unwrap() {
            Line::Result(records) => assert_eq!(records, vec![rec]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn untagged_lines_are_noise() {
        match parse_line("2026-01-01 INFO traversal page=2").unwrap() {
            Line::Noise(_) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_tagged_payload_is_an_error() {
        assert!(parse_line("EVENT_JSON:not json").is_err());
        assert!(parse_line("RESULTADO_JSON:{oops").is_err());
    }
}
