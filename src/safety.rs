//! Crisis keyword filter.
//!
//! A case-insensitive substring scan against a configured phrase list. The
//! check runs before any retrieval or model work and short-circuits to a
//! fixed safety message; this path performs no I/O and cannot fail.

/// Returns true when `text` contains any of `phrases`, ignoring case.
pub fn is_crisis(text: &str, phrases: &[String]) -> bool {
    let lowered = text.to_lowercase();
    phrases
        .iter()
        .any(|p| !p.is_empty() && lowered.contains(&p.to_lowercase()))
}
