//! The pure half of the approval gate.
//!
//! `ApprovalRequest` is everything the review screen needs for one
//! transaction: the transaction itself, the validated suggestions annotated
//! with resolved ids and confidence buckets, and the full category snapshot
//! as the manual fallback selector. The interactive half renders it and
//! resolves exactly one [`Decision`].

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::matcher::match_exact;
use crate::suggestion::{ConfidenceBucket, Suggestion, normalize_confidence};
use crate::transaction::Transaction;

/// The single outcome of reviewing one transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    Commit(i64),
    Skip,
    Cancel,
}

/// Gate lifecycle. `Presenting` covers the initial render;
/// `AwaitingDecision` holds until exactly one decision event arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Presenting,
    AwaitingDecision,
    Resolved,
}

/// A validated suggestion, decorated for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedSuggestion {
    pub name: String,
    /// Resolved via exact (tier 1-2) lookup against the canonical set.
    pub category_id: Option<i64>,
    /// Normalized to `[0, 1]`.
    pub confidence: Option<f64>,
    pub bucket: Option<ConfidenceBucket>,
    pub justification: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub transaction: Transaction,
    pub suggestions: Vec<AnnotatedSuggestion>,
    /// Active category snapshot, the manual fallback selector.
    pub categories: Vec<Category>,
    /// Id the selector starts on: the top suggestion's resolved id.
    pub preselected: Option<i64>,
    /// Set when the suggestion fetch failed and the list is empty because
    /// of it, not because the model had nothing to say.
    pub provider_error: Option<String>,
}

impl ApprovalRequest {
    pub fn new(
        transaction: Transaction,
        validated: &[Suggestion],
        categories: Vec<Category>,
        provider_error: Option<String>,
    ) -> Self {
        let suggestions: Vec<AnnotatedSuggestion> = validated
            .iter()
            .map(|s| annotate(s, &categories))
            .collect();
        let preselected = suggestions.first().and_then(|s| s.category_id);
        Self {
            transaction,
            suggestions,
            categories,
            preselected,
            provider_error,
        }
    }
}

fn annotate(suggestion: &Suggestion, categories: &[Category]) -> AnnotatedSuggestion {
    let confidence = suggestion.confidence.and_then(normalize_confidence);
    AnnotatedSuggestion {
        name: suggestion.name.clone(),
        category_id: match_exact(&suggestion.name, categories),
        confidence,
        bucket: confidence.map(ConfidenceBucket::from_normalized),
        justification: suggestion.justification.clone(),
    }
}
