//! Strict filter applied before suggestions reach the review screen.
//!
//! Stricter than the matcher on purpose: a suggestion offered for one-click
//! acceptance must name a canonical category literally. Fuzzy resolution is
//! reserved for names the user has already accepted, not for deciding what
//! to present.

use crate::category::Category;
use crate::suggestion::Suggestion;

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    /// Suggestions whose name is a literal, case-sensitive category name.
    pub accepted: Vec<Suggestion>,
    /// Everything else, kept for warn-level reporting.
    pub rejected: Vec<Suggestion>,
}

pub fn validate_suggestions(suggestions: Vec<Suggestion>, categories: &[Category]) -> Validated {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for suggestion in suggestions {
        if categories.iter().any(|c| c.name == suggestion.name) {
            accepted.push(suggestion);
        } else {
            rejected.push(suggestion);
        }
    }
    Validated { accepted, rejected }
}
