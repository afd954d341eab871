use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use storage::models::ProsCons;

use super::{Verdict, Winner};
use crate::{EvaluatorError, Result};

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?m)^\s*```[A-Za-z]*\s*$").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

/// Parse a judge reply. A strict parse is tried first, then a single repair pass.
/// The winner is never guessed: a reply without a recognisable winner is a format error.
pub fn parse_verdict(raw: &str) -> Result<Verdict> {
    let value = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) if value.is_object() => value,
        _ => repair(raw)?,
    };
    verdict_from_value(&value)
}

fn repair(raw: &str) -> Result<Value> {
    let unfenced = CODE_FENCE.replace_all(raw, "");
    let start = unfenced.find('{');
    let end = unfenced.rfind('}');
    let object = match (start, end) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => {
            return Err(EvaluatorError::JudgeFormat(
                "reply contains no JSON object".to_string(),
            ));
        }
    };

    let cleaned = TRAILING_COMMA.replace_all(object, "$1");
    serde_json::from_str::<Value>(&cleaned)
        .map_err(|e| EvaluatorError::JudgeFormat(format!("unparseable verdict: {}", e)))
}

fn verdict_from_value(value: &Value) -> Result<Verdict> {
    let raw_winner = value
        .get("winner")
        .and_then(Value::as_str)
        .ok_or_else(|| EvaluatorError::JudgeFormat("verdict has no winner".to_string()))?;
    let winner = normalize_winner(raw_winner).ok_or_else(|| {
        EvaluatorError::JudgeFormat(format!("unrecognised winner '{}'", raw_winner))
    })?;

    Ok(Verdict {
        winner,
        rationale: text_field(value, &["rationale", "reasoning", "explanation"]),
        feedback_a: text_field(value, &["feedback_a"]),
        feedback_b: text_field(value, &["feedback_b"]),
        pros_cons_a: value
            .get("pros_cons_a")
            .map(ProsCons::from_value_lenient)
            .unwrap_or_default(),
        pros_cons_b: value
            .get("pros_cons_b")
            .map(ProsCons::from_value_lenient)
            .unwrap_or_default(),
    })
}

fn normalize_winner(raw: &str) -> Option<Winner> {
    let lowered = raw.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.').to_lowercase();
    let label = lowered
        .strip_prefix("submission ")
        .or_else(|| lowered.strip_prefix("project "))
        .unwrap_or(&lowered)
        .trim();

    match label {
        "a" | "first" | "1" => Some(Winner::A),
        "b" | "second" | "2" => Some(Winner::B),
        "tie" | "draw" | "equal" | "neither" | "both" => Some(Winner::Tie),
        _ => None,
    }
}

fn text_field(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_verdict() {
        let verdict = parse_verdict(
            r#"{"winner": "B", "rationale": "B has navigation", "feedback_a": "Static page",
               "feedback_b": "Multiple views", "pros_cons_a": {"pros": [], "cons": ["No routing"]},
               "pros_cons_b": {"pros": ["Routing"], "cons": []}}"#,
        )
        .unwrap();

        assert_eq!(verdict.winner, Winner::B);
        assert_eq!(verdict.rationale, "B has navigation");
        assert_eq!(verdict.pros_cons_a.cons, vec!["No routing"]);
        assert_eq!(verdict.pros_cons_b.pros, vec!["Routing"]);
    }

    #[test]
    fn test_repair_strips_fences_prose_and_trailing_commas() {
        let raw = "Here is my evaluation:\n```json\n{\n  \"winner\": \"Submission A\",\n  \"rationale\": \"Modal dialogs\",\n  \"pros_cons_a\": {\"pros\": [\"Modals\",], \"cons\": []},\n}\n```\nThanks!";

        let verdict = parse_verdict(raw).unwrap();

        assert_eq!(verdict.winner, Winner::A);
        assert_eq!(verdict.pros_cons_a.pros, vec!["Modals"]);
        assert!(verdict.pros_cons_b.is_empty());
        assert_eq!(verdict.feedback_b, "");
    }

    #[test]
    fn test_winner_spellings() {
        for (raw, expected) in [
            ("a", Winner::A),
            (" Project B ", Winner::B),
            ("TIE", Winner::Tie),
            ("draw", Winner::Tie),
            ("first", Winner::A),
        ] {
            assert_eq!(normalize_winner(raw), Some(expected), "{}", raw);
        }
        assert_eq!(normalize_winner("C"), None);
    }

    #[test]
    fn test_missing_winner_is_format_error() {
        let err = parse_verdict(r#"{"rationale": "both are fine"}"#).unwrap_err();
        assert!(matches!(err, EvaluatorError::JudgeFormat(_)));
    }

    #[test]
    fn test_unknown_winner_is_not_fabricated() {
        let err = parse_verdict(r#"{"winner": "the second one probably"}"#).unwrap_err();
        assert!(matches!(err, EvaluatorError::JudgeFormat(_)));
    }

    #[test]
    fn test_prose_without_json_is_format_error() {
        let err = parse_verdict("I think A is better overall.").unwrap_err();
        assert!(matches!(err, EvaluatorError::JudgeFormat(_)));
        assert!(err.is_retryable());
    }
}
