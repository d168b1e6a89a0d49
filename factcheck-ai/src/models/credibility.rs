//! Source credibility tiers and scores

use serde::{Deserialize, Serialize};
use std::fmt;

/// Four ordered trust categories for a source domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CredibilityTier {
    #[serde(rename = "Tier 1 – Highly Credible")]
    HighlyCredible = 1,
    #[serde(rename = "Tier 2 – Credible")]
    Credible = 2,
    #[serde(rename = "Tier 3 – Low Credibility")]
    LowCredibility = 3,
    #[serde(rename = "Tier 4 – Unreliable/Unknown")]
    Unreliable = 4,
}

impl CredibilityTier {
    /// Tier for a base (pre-recency) domain score
    pub fn from_base_score(base: u8) -> Self {
        match base {
            9..=u8::MAX => CredibilityTier::HighlyCredible,
            6..=8 => CredibilityTier::Credible,
            3..=5 => CredibilityTier::LowCredibility,
            _ => CredibilityTier::Unreliable,
        }
    }

    /// Tier number 1-4
    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            CredibilityTier::HighlyCredible => "Tier 1 – Highly Credible",
            CredibilityTier::Credible => "Tier 2 – Credible",
            CredibilityTier::LowCredibility => "Tier 3 – Low Credibility",
            CredibilityTier::Unreliable => "Tier 4 – Unreliable/Unknown",
        }
    }
}

impl fmt::Display for CredibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of scoring one source URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceScore {
    /// Normalized host ("" for malformed URLs)
    pub domain: String,
    /// Final score, base + recency clamped to 0..=10
    pub score: u8,
    /// Domain score before the recency modifier
    pub base_score: u8,
    /// Tier derived from `base_score`
    pub tier: CredibilityTier,
    /// -1, 0 or +1
    pub recency_modifier: i8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(CredibilityTier::from_base_score(10), CredibilityTier::HighlyCredible);
        assert_eq!(CredibilityTier::from_base_score(9), CredibilityTier::HighlyCredible);
        assert_eq!(CredibilityTier::from_base_score(8), CredibilityTier::Credible);
        assert_eq!(CredibilityTier::from_base_score(6), CredibilityTier::Credible);
        assert_eq!(CredibilityTier::from_base_score(5), CredibilityTier::LowCredibility);
        assert_eq!(CredibilityTier::from_base_score(3), CredibilityTier::LowCredibility);
        assert_eq!(CredibilityTier::from_base_score(2), CredibilityTier::Unreliable);
        assert_eq!(CredibilityTier::from_base_score(0), CredibilityTier::Unreliable);
    }

    #[test]
    fn test_tier_serializes_as_label() {
        let json = serde_json::to_string(&CredibilityTier::Credible).unwrap();
        assert_eq!(json, "\"Tier 2 – Credible\"");
        assert_eq!(CredibilityTier::Unreliable.number(), 4);
    }
}
