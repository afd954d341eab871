use storage::models::{ComparisonResult, ProsCons};
use uuid::Uuid;

use super::aggregator::Tally;

const MAX_NOTES: usize = 3;

const TECHNICAL_SIGNALS: &[&str] = &[
    "architecture",
    "navigation",
    "routing",
    "interactiv",
    "modal",
    "form",
    "state",
    "api",
    "database",
    "authentication",
    "validation",
    "dynamic",
    "component",
    "feature",
    "page",
];

/// Builds the feedback text and merged pros/cons for one ranked submission.
pub fn synthesize_feedback(
    submission_id: Uuid,
    tally: &Tally,
    comparisons: &[ComparisonResult],
) -> (String, ProsCons) {
    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    let mut pros_cons = ProsCons::default();

    for comparison in comparisons.iter().filter(|c| c.involves(submission_id)) {
        let Some((side_feedback, side_pros_cons)) = comparison.side(submission_id) else {
            continue;
        };
        pros_cons.merge(side_pros_cons);

        if comparison.degraded {
            continue;
        }
        let note = if side_feedback.trim().is_empty() {
            comparison.rationale.as_str()
        } else {
            side_feedback
        };
        match comparison.winner_id {
            Some(winner) if winner == submission_id => strengths.push(note),
            Some(_) => improvements.push(note),
            None => {}
        }
    }

    let total = tally.wins + tally.losses + tally.ties;
    let mut feedback = format!(
        "Won {} of {} comparisons ({} losses, {} ties).",
        tally.wins, total, tally.losses, tally.ties
    );
    if tally.degraded > 0 {
        feedback.push_str(&format!(
            " {} comparison(s) could not be judged and were counted as ties.",
            tally.degraded
        ));
    }

    let strengths = prioritised_sentences(&strengths);
    if !strengths.is_empty() {
        feedback.push_str("\n\nStrengths: ");
        feedback.push_str(&strengths.join(" "));
    }

    let improvements = prioritised_sentences(&improvements);
    if !improvements.is_empty() {
        feedback.push_str("\n\nAreas to improve: ");
        feedback.push_str(&improvements.join(" "));
    }

    (feedback, pros_cons)
}

/// Distinct sentences from the notes, those mentioning technical depth first.
fn prioritised_sentences(notes: &[&str]) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    for note in notes {
        for sentence in split_sentences(note) {
            let lowered = sentence.to_lowercase();
            if !sentences.iter().any(|s| s.to_lowercase() == lowered) {
                sentences.push(sentence);
            }
        }
    }

    sentences.sort_by_key(|sentence| !has_technical_signal(sentence));
    sentences.truncate(MAX_NOTES);
    sentences
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.len() < 3 {
        return;
    }
    if trimmed.ends_with(['.', '!', '?']) {
        sentences.push(trimmed.to_string());
    } else {
        sentences.push(format!("{}.", trimmed));
    }
}

fn has_technical_signal(sentence: &str) -> bool {
    let lowered = sentence.to_lowercase();
    TECHNICAL_SIGNALS.iter().any(|signal| lowered.contains(signal))
}
