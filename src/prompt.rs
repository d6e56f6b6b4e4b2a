//! Deterministic prompt assembly.
//!
//! Builds the bounded prompt fed to the generation model: system preamble,
//! numbered context blocks in rank order, the most recent history turns, and
//! the question/answer cue. No size limit is enforced here — the generation
//! client's timeout and the operator's `top_k`/`max_history` settings bound
//! the context window.

use crate::models::{RetrievalResult, Turn};

const PREAMBLE: &str =
    "You are a helpful AI assistant. Answer the following question based on the provided context.";

/// Assemble the generation prompt.
///
/// Passages are rendered as `[1]`, `[2]`, ... in the order they were ranked.
/// At most `max_history` most-recent turns are included, in chronological
/// order, each as `ROLE: text`; `max_history == 0` means no history. An empty
/// passage list omits the context section entirely.
pub fn build_prompt(
    query: &str,
    passages: &[RetrievalResult],
    history: &[Turn],
    max_history: usize,
) -> String {
    let mut out = String::new();
    out.push_str(PREAMBLE);
    out.push_str("\n\n");

    if !passages.is_empty() {
        out.push_str("Context:\n");
        for (i, result) in passages.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n\n", i + 1, result.passage.text));
        }
    }

    let recent: &[Turn] = if max_history == 0 {
        &[]
    } else {
        &history[history.len().saturating_sub(max_history)..]
    };

    if !recent.is_empty() {
        out.push_str("\nChat History:\n");
        for turn in recent {
            out.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.text));
        }
    }

    out.push_str(&format!("\nQuestion: {}\n\n", query));
    out.push_str("Answer: ");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Passage, PassageMetadata, Role};

    fn result(text: &str) -> RetrievalResult {
        RetrievalResult {
            passage: Passage {
                document_id: "d1".to_string(),
                owner_id: "u1".to_string(),
                chunk_index: 0,
                text: text.to_string(),
                embedding: vec![0.0; 3],
                metadata: PassageMetadata {
                    source_label: "a.pdf".to_string(),
                    total_chunks: 1,
                },
            },
            score: 0.9,
        }
    }

    fn turn(role: Role, text: &str, ts: i64) -> Turn {
        Turn {
            role,
            text: text.to_string(),
            timestamp: ts,
            retrieved_context: None,
        }
    }

    #[test]
    fn test_context_blocks_numbered_in_rank_order() {
        let passages = vec![result("first passage"), result("second passage")];
        let prompt = build_prompt("what?", &passages, &[], 0);
        assert!(prompt.contains("[1] first passage"));
        assert!(prompt.contains("[2] second passage"));
        assert!(prompt.find("[1]").unwrap() < prompt.find("[2]").unwrap());
    }

    #[test]
    fn test_empty_passages_omit_context_section() {
        let prompt = build_prompt("what?", &[], &[], 0);
        assert!(!prompt.contains("Context:"));
        assert!(prompt.starts_with(PREAMBLE));
        assert!(prompt.ends_with("Answer: "));
    }

    #[test]
    fn test_max_history_keeps_most_recent_in_order() {
        let history = vec![
            turn(Role::User, "one", 1),
            turn(Role::Assistant, "two", 2),
            turn(Role::User, "three", 3),
            turn(Role::Assistant, "four", 4),
            turn(Role::User, "five", 5),
        ];
        let prompt = build_prompt("next?", &[], &history, 2);
        assert!(!prompt.contains("USER: three"));
        assert!(prompt.contains("ASSISTANT: four"));
        assert!(prompt.contains("USER: five"));
        assert!(prompt.find("ASSISTANT: four").unwrap() < prompt.find("USER: five").unwrap());
    }

    #[test]
    fn test_zero_max_history_omits_history_section() {
        let history = vec![turn(Role::User, "hello", 1)];
        let prompt = build_prompt("q", &[], &history, 0);
        assert!(!prompt.contains("Chat History:"));
    }

    #[test]
    fn test_question_and_answer_cues() {
        let prompt = build_prompt("what is rust?", &[], &[], 0);
        assert!(prompt.contains("\nQuestion: what is rust?\n\n"));
        assert!(prompt.ends_with("Answer: "));
    }

    #[test]
    fn test_deterministic() {
        let passages = vec![result("p")];
        let history = vec![turn(Role::User, "h", 1)];
        let a = build_prompt("q", &passages, &history, 5);
        let b = build_prompt("q", &passages, &history, 5);
        assert_eq!(a, b);
    }
}
