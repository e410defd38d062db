//! Structured response parsing.
//!
//! Generation prompts in this crate ask the model to answer with line-oriented
//! markers (`ASSUMPTION: ...`, `CONFIDENCE: 0.8`, `PROS: a; b`). This module
//! is the single place that decodes such responses into [`RawRecord`]s; the
//! reasoning modules convert records into their own typed structures. Keeping
//! the grammar isolated here means the wire format can be swapped (e.g. for
//! strict JSON output) without touching any caller.
//!
//! Parsing is deliberately lenient and total: malformed or empty input yields
//! zero records, malformed numeric fields yield the documented default of
//! 0.5, and unrecognized lines are ignored. A response that fails to parse is
//! a silent-empty condition, never an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A line-marker grammar: one record-opening marker plus field markers.
#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    /// Marker that opens a new record; its value is the record's primary
    /// field (statement / description).
    pub primary: &'static str,
    /// Recognized field markers within a record.
    pub fields: &'static [&'static str],
}

/// One marker-delimited record decoded from a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// The record's primary value (statement, description, ...).
    pub primary: String,
    /// Field values keyed by canonical (uppercase) marker name. Repeated
    /// markers accumulate.
    pub fields: HashMap<String, Vec<String>>,
}

impl RawRecord {
    fn with_primary(primary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            fields: HashMap::new(),
        }
    }

    fn push_field(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.fields
            .entry(name.to_ascii_uppercase())
            .or_default()
            .push(value.to_string());
    }

    /// First value recorded for a field, if any.
    pub fn first_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_uppercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values recorded for a field.
    pub fn field_values(&self, name: &str) -> &[String] {
        self.fields
            .get(&name.to_ascii_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All values for a field, each split as a `;`/`,` list and flattened.
    pub fn list_field(&self, name: &str) -> Vec<String> {
        self.field_values(name)
            .iter()
            .flat_map(|value| split_list(value))
            .collect()
    }
}

/// Decode marker-delimited records from a raw completion.
///
/// A section opens at the primary marker (or at any recognized field marker,
/// in which case the first unmarked non-empty line supplies the primary
/// value) and closes at a blank line or the next primary marker. Records
/// that never acquire a primary value are dropped. Free prose outside any
/// section is ignored, so arbitrary text produces an empty `Vec`.
pub fn parse_records(raw: &str, grammar: &Grammar) -> Vec<RawRecord> {
    let mut records: Vec<RawRecord> = Vec::new();
    let mut current: Option<RawRecord> = None;

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            close_record(&mut current, &mut records);
            continue;
        }

        if let Some(value) = strip_marker(trimmed, grammar.primary) {
            close_record(&mut current, &mut records);
            current = Some(RawRecord::with_primary(value));
            continue;
        }

        if let Some((field, value)) = match_field(trimmed, grammar.fields) {
            current
                .get_or_insert_with(RawRecord::default)
                .push_field(field, value);
            continue;
        }

        if looks_like_marker(trimmed) {
            // Unrecognized marker line
            continue;
        }

        if let Some(record) = current.as_mut() {
            if record.primary.is_empty() {
                record.primary = trimmed.to_string();
            }
        }
        // Prose outside a section is ignored.
    }

    close_record(&mut current, &mut records);
    records
}

fn close_record(current: &mut Option<RawRecord>, records: &mut Vec<RawRecord>) {
    if let Some(record) = current.take() {
        if !record.primary.is_empty() {
            records.push(record);
        }
    }
}

fn match_field<'a, 'b>(line: &'a str, fields: &'b [&'b str]) -> Option<(&'b str, &'a str)> {
    for field in fields {
        if let Some(value) = strip_marker(line, field) {
            return Some((field, value));
        }
    }
    None
}

fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let head = line.get(..marker.len())?;
    if !head.eq_ignore_ascii_case(marker) {
        return None;
    }
    let rest = line.get(marker.len()..)?.trim_start();
    let rest = rest.strip_prefix(':')?;
    Some(rest.trim())
}

fn looks_like_marker(line: &str) -> bool {
    match line.find(':') {
        Some(pos) if pos > 0 && pos <= 24 => line[..pos]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '_' || c == ' '),
        _ => false,
    }
}

/// Coerce a confidence field, defaulting to 0.5 on malformed input.
///
/// Accepts bare floats and percentages; results are clamped to [0.0, 1.0].
pub fn parse_confidence(value: &str) -> f64 {
    parse_unit_interval(value)
}

/// Coerce a probability field, defaulting to 0.5 on malformed input.
pub fn parse_probability(value: &str) -> f64 {
    parse_unit_interval(value)
}

fn parse_unit_interval(value: &str) -> f64 {
    let trimmed = value.trim();
    let (number, scale) = match trimmed.strip_suffix('%') {
        Some(percent) => (percent.trim_end(), 100.0),
        None => (trimmed, 1.0),
    };
    number
        .parse::<f64>()
        .map(|n| (n / scale).clamp(0.0, 1.0))
        .unwrap_or(0.5)
}

/// First keyword (in priority order) contained in the value,
/// case-insensitively. Used for all enumerated fields so that e.g.
/// "CRITICAL" outranks "HIGH" regardless of surrounding prose.
pub fn match_keyword<'a>(value: &str, keywords: &[&'a str]) -> Option<&'a str> {
    let lower = value.to_lowercase();
    keywords
        .iter()
        .find(|keyword| lower.contains(&keyword.to_lowercase()))
        .copied()
}

/// Split a `;`/`,`-separated list field into trimmed, non-empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split([';', ','])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ASSUMPTION_GRAMMAR: Grammar = Grammar {
        primary: "ASSUMPTION",
        fields: &["CONTEXT", "CONFIDENCE", "CATEGORY"],
    };

    #[test]
    fn test_parse_single_record() {
        let raw = "ASSUMPTION: The cache is shared\nCONFIDENCE: 0.8\nCATEGORY: technical";
        let records = parse_records(raw, &ASSUMPTION_GRAMMAR);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].primary, "The cache is shared");
        assert_eq!(records[0].first_field("CONFIDENCE"), Some("0.8"));
        assert_eq!(records[0].first_field("CATEGORY"), Some("technical"));
    }

    #[test]
    fn test_parse_multiple_records_split_by_marker() {
        let raw = "ASSUMPTION: First\nCONFIDENCE: 0.9\nASSUMPTION: Second\nCONFIDENCE: 0.2";
        let records = parse_records(raw, &ASSUMPTION_GRAMMAR);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].primary, "First");
        assert_eq!(records[1].primary, "Second");
        assert_eq!(records[1].first_field("CONFIDENCE"), Some("0.2"));
    }

    #[test]
    fn test_parse_blank_line_closes_section() {
        let raw = "ASSUMPTION: First\n\nASSUMPTION: Second";
        let records = parse_records(raw, &ASSUMPTION_GRAMMAR);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_primary_from_unmarked_line() {
        // A field marker opens the section; the bare line supplies the
        // primary value.
        let raw = "CONFIDENCE: 0.7\nThe disk is local\nCATEGORY: technical";
        let records = parse_records(raw, &ASSUMPTION_GRAMMAR);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].primary, "The disk is local");
        assert_eq!(records[0].first_field("CONFIDENCE"), Some("0.7"));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_records("", &ASSUMPTION_GRAMMAR).is_empty());
        assert!(parse_records("   \n\n  ", &ASSUMPTION_GRAMMAR).is_empty());
    }

    #[test]
    fn test_parse_prose_yields_zero_records() {
        let raw = "This response ignores the requested format entirely.\nIt just talks.";
        assert!(parse_records(raw, &ASSUMPTION_GRAMMAR).is_empty());
    }

    #[test]
    fn test_parse_unrecognized_marker_ignored() {
        let raw = "ASSUMPTION: Real\nNOTE: this marker is not in the grammar\nCONFIDENCE: 0.6";
        let records = parse_records(raw, &ASSUMPTION_GRAMMAR);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].primary, "Real");
        assert_eq!(records[0].first_field("CONFIDENCE"), Some("0.6"));
        assert!(records[0].first_field("NOTE").is_none());
    }

    #[test]
    fn test_parse_marker_case_insensitive() {
        let raw = "assumption: lower case works\nconfidence: 0.4";
        let records = parse_records(raw, &ASSUMPTION_GRAMMAR);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].first_field("confidence"), Some("0.4"));
    }

    #[test]
    fn test_parse_repeated_fields_accumulate() {
        let raw = "ASSUMPTION: X\nCONTEXT: first\nCONTEXT: second";
        let records = parse_records(raw, &ASSUMPTION_GRAMMAR);
        assert_eq!(records[0].field_values("CONTEXT").len(), 2);
    }

    #[test]
    fn test_parse_record_without_primary_dropped() {
        let raw = "CONFIDENCE: 0.9\nCATEGORY: technical";
        assert!(parse_records(raw, &ASSUMPTION_GRAMMAR).is_empty());
    }

    #[test]
    fn test_round_trip_statement_confidence_category() {
        let raw = format!(
            "ASSUMPTION: {}\nCONFIDENCE: {}\nCATEGORY: {}",
            "Traffic stays under 1k rps", 0.85, "performance"
        );
        let records = parse_records(&raw, &ASSUMPTION_GRAMMAR);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].primary, "Traffic stays under 1k rps");
        let confidence = parse_confidence(records[0].first_field("CONFIDENCE").unwrap());
        assert!((confidence - 0.85).abs() < 0.001);
        assert_eq!(records[0].first_field("CATEGORY"), Some("performance"));
    }

    #[test]
    fn test_list_field_flattens() {
        let raw = "ASSUMPTION: X\nCONTEXT: a; b\nCONTEXT: c, d";
        let records = parse_records(raw, &ASSUMPTION_GRAMMAR);
        assert_eq!(records[0].list_field("CONTEXT"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parse_confidence_defaults() {
        assert_eq!(parse_confidence("not a number"), 0.5);
        assert_eq!(parse_confidence(""), 0.5);
    }

    #[test]
    fn test_parse_confidence_clamps() {
        assert_eq!(parse_confidence("1.7"), 1.0);
        assert_eq!(parse_confidence("-0.3"), 0.0);
        assert_eq!(parse_confidence("0.42"), 0.42);
    }

    #[test]
    fn test_parse_confidence_percent() {
        assert_eq!(parse_confidence("80%"), 0.8);
        assert_eq!(parse_confidence("150%"), 1.0);
    }

    #[test]
    fn test_parse_probability_default() {
        assert_eq!(parse_probability("maybe"), 0.5);
        assert_eq!(parse_probability("0.25"), 0.25);
    }

    #[test]
    fn test_match_keyword_priority_order() {
        // "CRITICAL" outranks "HIGH" when both appear.
        let keywords = ["critical", "high", "medium"];
        assert_eq!(
            match_keyword("critically high risk", &keywords),
            Some("critical")
        );
        assert_eq!(match_keyword("HIGH exposure", &keywords), Some("high"));
        assert_eq!(match_keyword("low", &keywords), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a; b;c"), vec!["a", "b", "c"]);
        assert_eq!(split_list("one, two"), vec!["one", "two"]);
        assert!(split_list(" ; , ").is_empty());
    }
}
