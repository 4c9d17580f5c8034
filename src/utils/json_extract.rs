//! Recovering a JSON value from completion text.
//!
//! Two stages: strip known wrapping markers (code fences), then strictly parse either the whole
//! remainder or the first outermost balanced `{...}`/`[...]` span that parses. Nothing is ever
//! repaired, and members of a malformed span are never promoted to the result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How much noise around the JSON payload is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// The trimmed text must be JSON.
    Strict,
    /// Code fences are stripped first.
    Fenced,
    /// Fences are stripped and the first balanced object/array is taken from surrounding prose.
    #[default]
    Lenient,
}

pub trait StripCodeBlock {
    fn strip_code_block(&self) -> &str;
}

impl StripCodeBlock for str {
    fn strip_code_block(&self) -> &str {
        let trimmed = self.trim();
        let Some(rest) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        // Drop the info string (`json`, `JSON`, ...) up to the end of the opening fence line.
        let inner = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        match inner.rfind("```") {
            Some(end) => inner[..end].trim(),
            None => inner.trim(),
        }
    }
}

/// Returns the parsed JSON value, or a short reason why none could be extracted.
pub fn extract_json(text: &str, mode: ExtractionMode) -> Result<Value, String> {
    let candidate = match mode {
        ExtractionMode::Strict => text.trim(),
        ExtractionMode::Fenced | ExtractionMode::Lenient => text.strip_code_block(),
    };

    if candidate.is_empty() {
        return Err("response is empty".to_string());
    }

    let strict_err = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if mode != ExtractionMode::Lenient {
        return Err(format!("response is not valid JSON: {strict_err}"));
    }

    // Fences may sit in the middle of prose, so scan the original text.
    top_level_spans(text)
        .into_iter()
        .find_map(|span| serde_json::from_str::<Value>(span).ok())
        .ok_or_else(|| format!("no valid JSON object or array found: {strict_err}"))
}

/// Outermost balanced `{...}` / `[...]` spans, in order, found in one pass.
///
/// Brackets nested inside a span are never candidates on their own, so a malformed object cannot
/// yield one of its members. A span closed by the wrong bracket is abandoned at that point.
fn top_level_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if stack.is_empty() {
            match c {
                '{' => stack.push('}'),
                '[' => stack.push(']'),
                _ => continue,
            }
            start = i;
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    stack.clear();
                } else if stack.is_empty() {
                    spans.push(&text[start..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_block() {
        assert_eq!("```json\n{\"a\": 1}\n```".strip_code_block(), "{\"a\": 1}");
        assert_eq!("```\n[1, 2]\n```".strip_code_block(), "[1, 2]");
        assert_eq!("```json{\"a\": 1}```".strip_code_block(), "{\"a\": 1}");
        assert_eq!("  {\"a\": 1}  ".strip_code_block(), "{\"a\": 1}");
    }

    #[test]
    fn test_plain_json_in_every_mode() {
        for mode in [ExtractionMode::Strict, ExtractionMode::Fenced, ExtractionMode::Lenient] {
            assert_eq!(extract_json(" {\"ok\": true} ", mode).unwrap(), json!({"ok": true}));
        }
    }

    #[test]
    fn test_fenced_json_needs_fenced_mode() {
        let text = "```json\n{\"steps\": []}\n```";
        assert!(extract_json(text, ExtractionMode::Strict).is_err());
        assert_eq!(extract_json(text, ExtractionMode::Fenced).unwrap(), json!({"steps": []}));
        assert_eq!(extract_json(text, ExtractionMode::Lenient).unwrap(), json!({"steps": []}));
    }

    #[test]
    fn test_surrounding_prose_needs_lenient_mode() {
        let text = "Sure! Here is the plan:\n```json\n{\"task\": \"x\", \"steps\": [{\"tool\": \"github\"}]}\n```\nLet me know if you need more.";
        assert!(extract_json(text, ExtractionMode::Fenced).is_err());
        let value = extract_json(text, ExtractionMode::Lenient).unwrap();
        assert_eq!(value["steps"][0]["tool"], "github");
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_balance() {
        let text = r#"Result: {"summary": "used } and { and \" quotes", "n": [1, {"x": 2}]} trailing"#;
        let value = extract_json(text, ExtractionMode::Lenient).unwrap();
        assert_eq!(value["n"][1]["x"], 2);
        assert_eq!(value["summary"], "used } and { and \" quotes");
    }

    #[test]
    fn test_skips_unparseable_bracket_spans() {
        let text = "[note: draft] {\"status\": \"complete\"}";
        assert_eq!(
            extract_json(text, ExtractionMode::Lenient).unwrap(),
            json!({"status": "complete"})
        );
    }

    #[test]
    fn test_never_repairs_malformed_json() {
        let text = "{\"task\": \"x\", \"steps\": [}";
        assert!(extract_json(text, ExtractionMode::Lenient).is_err());
        let trailing_comma = "{\"a\": 1,}";
        assert!(extract_json(trailing_comma, ExtractionMode::Lenient).is_err());
    }

    #[test]
    fn test_malformed_outer_object_does_not_yield_inner_member() {
        let text = r#"{"status": "complete", "completeness_score": 90, "findings": {"key_results": ["x"], "data_quality": "good", "missing_information": []},}"#;
        assert!(extract_json(text, ExtractionMode::Lenient).is_err());

        let prose = format!("Verification:\n{text}\nDone.");
        assert!(extract_json(&prose, ExtractionMode::Lenient).is_err());

        let wrong_close = r#"{"steps": [{"tool": "github"}}"#;
        assert!(extract_json(wrong_close, ExtractionMode::Lenient).is_err());
    }

    #[test]
    fn test_top_level_spans_skip_nested_brackets() {
        let text = r#"a {"x": [1, {"y": 2}]} b [3] c {"#;
        assert_eq!(top_level_spans(text), vec![r#"{"x": [1, {"y": 2}]}"#, "[3]"]);

        let many_unclosed = "{".repeat(10_000);
        assert!(top_level_spans(&many_unclosed).is_empty());
    }

    #[test]
    fn test_empty_response() {
        assert!(extract_json("   ", ExtractionMode::Lenient).is_err());
        assert!(extract_json("no json here at all", ExtractionMode::Lenient).is_err());
    }
}
