//! Resolution of a suggested name to a canonical category id.

use crate::category::Category;

/// Which tier produced a match. Substring hits are a last-resort heuristic
/// and callers must treat them as low-confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    CaseInsensitive,
    Substring,
}

impl MatchTier {
    pub fn is_fuzzy(&self) -> bool {
        matches!(self, MatchTier::Substring)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMatch {
    pub id: i64,
    pub tier: MatchTier,
}

/// Three-tier lookup, each tier short-circuiting on its first hit:
/// case-sensitive equality, case-insensitive equality, then a bidirectional
/// lowercase substring scan. The substring tier can land on an unrelated
/// category for short names; it is unbounded on purpose and flagged fuzzy.
pub fn match_category(name: &str, categories: &[Category]) -> Option<CategoryMatch> {
    if let Some(cat) = categories.iter().find(|c| c.name == name) {
        return Some(CategoryMatch {
            id: cat.id,
            tier: MatchTier::Exact,
        });
    }

    let query = name.to_lowercase();
    if let Some(cat) = categories.iter().find(|c| c.name.to_lowercase() == query) {
        return Some(CategoryMatch {
            id: cat.id,
            tier: MatchTier::CaseInsensitive,
        });
    }

    if let Some(cat) = categories.iter().find(|c| {
        let candidate = c.name.to_lowercase();
        candidate.contains(&query) || query.contains(&candidate)
    }) {
        return Some(CategoryMatch {
            id: cat.id,
            tier: MatchTier::Substring,
        });
    }

    None
}

/// Tiers 1 and 2 only. Used when annotating suggestions for review, where a
/// fuzzy hit would silently point the selector at the wrong category.
pub fn match_exact(name: &str, categories: &[Category]) -> Option<i64> {
    match_category(name, categories).and_then(|m| match m.tier {
        MatchTier::Exact | MatchTier::CaseInsensitive => Some(m.id),
        MatchTier::Substring => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<Category> {
        vec![
            Category::new(1, "Groceries"),
            Category::new(2, "Gas, Transportation"),
            Category::new(3, "Dining Out"),
        ]
    }

    #[test]
    fn test_tier1_exact() {
        let m = match_category("Groceries", &categories()).unwrap();
        assert_eq!(m.id, 1);
        assert_eq!(m.tier, MatchTier::Exact);
        assert!(!m.tier.is_fuzzy());
    }

    #[test]
    fn test_tier2_case_insensitive() {
        let m = match_category("groceries", &categories()).unwrap();
        assert_eq!(m.id, 1);
        assert_eq!(m.tier, MatchTier::CaseInsensitive);
    }

    #[test]
    fn test_tier3_substring_is_fuzzy() {
        let m = match_category("Gas", &categories()).unwrap();
        assert_eq!(m.id, 2);
        assert_eq!(m.tier, MatchTier::Substring);
        assert!(m.tier.is_fuzzy());
    }

    #[test]
    fn test_tier3_reverse_substring() {
        // query longer than the category name
        let m = match_category("dining out downtown", &categories()).unwrap();
        assert_eq!(m.id, 3);
        assert_eq!(m.tier, MatchTier::Substring);
    }

    #[test]
    fn test_tier3_first_in_iteration_order_wins() {
        let cats = vec![Category::new(7, "Gas, Transportation"), Category::new(8, "Gas Utility")];
        let m = match_category("Gas", &cats).unwrap();
        assert_eq!(m.id, 7);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(match_category("Zzz", &categories()), None);
    }

    #[test]
    fn test_match_exact_rejects_fuzzy() {
        assert_eq!(match_exact("Groceries", &categories()), Some(1));
        assert_eq!(match_exact("GROCERIES", &categories()), Some(1));
        assert_eq!(match_exact("Gas", &categories()), None);
    }
}
