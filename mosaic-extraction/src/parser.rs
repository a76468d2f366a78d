//! Parsing and validation of model output.
//!
//! Models wrap JSON in prose or markdown fences more often than not;
//! the parser digs the array out before handing it to serde.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use mosaic_core::constants::{EXTRACTION_MAX_THEMES, MAX_THEME_NAME_CHARS};
use mosaic_core::errors::ExtractionError;
use mosaic_core::models::ThemeCandidate;

#[derive(Deserialize)]
struct RawCandidate {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```").expect("static regex"))
}

/// Locate the JSON array inside raw model output.
fn json_array_slice(raw: &str) -> Option<&str> {
    if let Some(captures) = fence_regex().captures(raw) {
        return captures.get(1).map(|m| m.as_str());
    }
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end > start {
        Some(&raw[start..=end])
    } else {
        None
    }
}

/// Parse raw model output into validated theme candidates.
///
/// Trims fields, drops empty descriptions and over-budget names,
/// deduplicates by case-folded name keeping the first occurrence, and
/// caps the list at the extraction maximum.
pub fn parse_candidates(raw: &str) -> Result<Vec<ThemeCandidate>, ExtractionError> {
    let slice = json_array_slice(raw).ok_or_else(|| ExtractionError::ParseFailed {
        reason: "no JSON array in model output".to_string(),
    })?;

    let parsed: Vec<RawCandidate> =
        serde_json::from_str(slice).map_err(|e| ExtractionError::ParseFailed {
            reason: format!("JSON array did not match the schema: {e}"),
        })?;

    let mut seen: Vec<String> = Vec::new();
    let mut candidates = Vec::new();
    for raw in parsed {
        let name = raw.name.trim().to_string();
        let description = raw.description.trim().to_string();
        if name.is_empty() || description.is_empty() {
            continue;
        }
        if name.chars().count() > MAX_THEME_NAME_CHARS {
            continue;
        }
        let folded = name.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        candidates.push(ThemeCandidate { name, description });
        if candidates.len() == EXTRACTION_MAX_THEMES {
            break;
        }
    }
    Ok(candidates)
}

/// Clean a refreshed description: strip fences, quotes, and whitespace
/// down to the single sentence the prompt asked for.
pub fn clean_description(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        text = stripped.trim_start_matches("json").trim();
        if let Some(end) = text.rfind("```") {
            text = text[..end].trim();
        }
    }
    text.trim_matches('"').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_array() {
        let raw = r#"[{"name": "API Challenges", "description": "Trouble with the API."},
                      {"name": "Documentation Gaps", "description": "Docs are lacking."}]"#;
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "API Challenges");
    }

    #[test]
    fn parses_fenced_json_with_prose() {
        let raw = "Here are the themes I found:\n```json\n[{\"name\": \"Pricing\", \
                   \"description\": \"Costs too much.\"}]\n```\nHope this helps!";
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Pricing");
    }

    #[test]
    fn garbage_is_parse_failed() {
        assert!(parse_candidates("I could not find any themes, sorry.").is_err());
        assert!(parse_candidates("{\"name\": \"not an array\"}").is_err());
    }

    #[test]
    fn dedupes_case_folded_names_keeping_first() {
        let raw = r#"[{"name": "Pricing", "description": "first"},
                      {"name": "PRICING", "description": "second"}]"#;
        let candidates = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].description, "first");
    }

    #[test]
    fn drops_empty_descriptions_and_long_names() {
        let long_name = "x".repeat(61);
        let raw = format!(
            r#"[{{"name": "Good", "description": "kept"}},
                {{"name": "No Description", "description": "  "}},
                {{"name": "{long_name}", "description": "name too long"}}]"#
        );
        let candidates = parse_candidates(&raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Good");
    }

    #[test]
    fn caps_at_extraction_maximum() {
        let items: Vec<String> = (0..20)
            .map(|i| format!(r#"{{"name": "Theme {i}", "description": "d{i}"}}"#))
            .collect();
        let raw = format!("[{}]", items.join(","));
        let candidates = parse_candidates(&raw).unwrap();
        assert_eq!(candidates.len(), EXTRACTION_MAX_THEMES);
    }

    #[test]
    fn clean_description_strips_wrapping() {
        assert_eq!(clean_description("\"A sentence.\"\n"), "A sentence.");
        assert_eq!(clean_description("```\nA sentence.\n```"), "A sentence.");
        assert_eq!(clean_description("  plain  "), "plain");
    }
}
