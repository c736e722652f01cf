//! Conversation transcript with a token budget.
//!
//! Token counts are estimated with a chars-per-token heuristic rather than a
//! real tokenizer, which keeps counting infallible: the budget check fails
//! open by construction. Budget enforcement discards the oldest non-system
//! turns but never touches the system instruction at index 0 and never
//! shrinks the transcript below two messages.

use crate::models::Message;

/// Approximate chars-per-token ratio for budget estimation.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a piece of text, rounding up.
pub fn count_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Sum of estimated token counts across all message contents.
pub fn total_tokens(messages: &[Message]) -> usize {
    messages.iter().map(|m| count_tokens(&m.content)).sum()
}

/// A caller-owned conversation transcript.
///
/// Always begins with exactly one system message. Callers construct one per
/// session and thread it through each turn; there is no hidden global state.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Transcript {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop the oldest non-system message while the estimated total exceeds
    /// `budget`. Stops once only the system message and one other message
    /// remain, so enforcement can never erase all context.
    pub fn enforce_budget(&mut self, budget: usize) {
        while total_tokens(&self.messages) > budget {
            if self.messages.len() <= 2 {
                break;
            }
            self.messages.remove(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_count_tokens_rounds_up() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(count_tokens("abc"), 1);
        assert_eq!(count_tokens("abcd"), 1);
        assert_eq!(count_tokens("abcde"), 2);
    }

    #[test]
    fn test_total_tokens_sums_messages() {
        let messages = vec![Message::system("abcd"), Message::user("abcdefgh")];
        assert_eq!(total_tokens(&messages), 3);
    }

    #[test]
    fn test_under_budget_untouched() {
        let mut t = Transcript::new("be kind");
        t.push_user("hello");
        t.push_assistant("hi there");
        let before = t.len();
        t.enforce_budget(10_000);
        assert_eq!(t.len(), before);
    }

    #[test]
    fn test_over_budget_drops_oldest_first() {
        let mut t = Transcript::new("sys");
        t.push_user("a".repeat(400));
        t.push_assistant("b".repeat(400));
        t.push_user("c".repeat(400));
        t.enforce_budget(150);
        // Oldest non-system turns removed; newest survives.
        assert!(t.messages().iter().any(|m| m.content.starts_with('c')));
        assert!(!t.messages().iter().any(|m| m.content.starts_with('a')));
    }

    #[test]
    fn test_never_below_two_messages() {
        let mut t = Transcript::new("s".repeat(4000));
        t.push_user("u".repeat(4000));
        for _ in 0..5 {
            t.enforce_budget(1);
        }
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_system_message_never_removed() {
        let mut t = Transcript::new("the system prompt");
        for i in 0..20 {
            t.push_user(format!("{} {}", i, "x".repeat(200)));
        }
        t.enforce_budget(50);
        assert_eq!(t.messages()[0].role, Role::System);
        assert_eq!(t.messages()[0].content, "the system prompt");
    }
}
