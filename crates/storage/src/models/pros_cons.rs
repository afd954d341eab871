use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Structured strengths and weaknesses attached to a submission or one side of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProsCons {
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

impl ProsCons {
    pub fn new(pros: Vec<String>, cons: Vec<String>) -> Self {
        Self { pros, cons }
    }

    /// Reads a pros/cons payload without failing: anything that is not an object with
    /// string arrays degrades to empty lists. A bare string is treated as a single entry.
    pub fn from_value_lenient(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self {
                pros: string_list(map.get("pros")),
                cons: string_list(map.get("cons")),
            },
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pros.is_empty() && self.cons.is_empty()
    }

    /// Appends the other lists, skipping phrases that are a case-insensitive
    /// substring of an existing entry (or contain one).
    pub fn merge(&mut self, other: &ProsCons) {
        merge_phrases(&mut self.pros, &other.pros);
        merge_phrases(&mut self.cons, &other.cons);
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn merge_phrases(target: &mut Vec<String>, incoming: &[String]) {
    for phrase in incoming {
        let candidate = phrase.trim();
        if candidate.is_empty() {
            continue;
        }
        let lowered = candidate.to_lowercase();
        let duplicate = target.iter().any(|existing| {
            let existing = existing.to_lowercase();
            existing.contains(&lowered) || lowered.contains(&existing)
        });
        if !duplicate {
            target.push(candidate.to_string());
        }
    }
}
