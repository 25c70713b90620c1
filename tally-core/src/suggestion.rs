//! Model-backend category suggestions and confidence handling.

use serde::{Deserialize, Serialize};

/// Most suggestions a backend response contributes per transaction.
pub const MAX_SUGGESTIONS: usize = 3;

/// A candidate category proposed by a model backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub name: String,
    #[serde(default)]
    pub justification: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Suggestion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            justification: None,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }
}

/// Normalize a raw confidence to `[0, 1]`.
///
/// Backends report either a fraction in `[0, 1]` or a percentage above 1;
/// both are accepted. Negative or non-finite values carry no usable signal
/// and normalize to `None`. Percentages above 100 clamp to 1.0.
pub fn normalize_confidence(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let value = if raw > 1.0 { raw / 100.0 } else { raw };
    Some(value.min(1.0))
}

/// Display classification of a normalized confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    /// high >= 0.80, medium >= 0.50, low otherwise.
    pub fn from_normalized(confidence: f64) -> Self {
        if confidence >= 0.80 {
            ConfidenceBucket::High
        } else if confidence >= 0.50 {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBucket::High => "high",
            ConfidenceBucket::Medium => "medium",
            ConfidenceBucket::Low => "low",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_passes_through() {
        assert_eq!(normalize_confidence(0.9), Some(0.9));
        assert_eq!(normalize_confidence(0.0), Some(0.0));
        assert_eq!(normalize_confidence(1.0), Some(1.0));
    }

    #[test]
    fn test_percentage_is_divided() {
        assert_eq!(normalize_confidence(85.0), Some(0.85));
        assert_eq!(normalize_confidence(100.0), Some(1.0));
    }

    #[test]
    fn test_out_of_range_values() {
        assert_eq!(normalize_confidence(-1.0), None);
        assert_eq!(normalize_confidence(f64::NAN), None);
        assert_eq!(normalize_confidence(f64::INFINITY), None);
        // over-100 percentages clamp rather than vanish
        assert_eq!(normalize_confidence(250.0), Some(1.0));
    }

    #[test]
    fn test_buckets() {
        assert_eq!(ConfidenceBucket::from_normalized(0.95), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_normalized(0.80), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_normalized(0.79), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_normalized(0.50), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_normalized(0.45), ConfidenceBucket::Low);
        assert_eq!(ConfidenceBucket::from_normalized(0.0), ConfidenceBucket::Low);
    }

    #[test]
    fn test_bucket_labels() {
        assert_eq!(ConfidenceBucket::High.label(), "high");
        assert_eq!(ConfidenceBucket::Medium.label(), "medium");
        assert_eq!(ConfidenceBucket::Low.label(), "low");
    }
}
