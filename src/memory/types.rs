//! Memory record and query result types.

use serde::Serialize;

/// A stored memory returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub content: String,
    /// L2 distance to the query embedding, rounded to 4 decimals. Lower is closer.
    pub score: f64,
}

/// Outcome of [`MemoryStore::query`](super::MemoryStore::query).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Matching records, nearest first. Empty when nothing is stored.
    Matches(Vec<Candidate>),
    /// Candidates were found but none scored below the threshold.
    NoneRelevant { candidates: usize, best_score: f64 },
}

impl QueryOutcome {
    pub fn matches(&self) -> &[Candidate] {
        match self {
            Self::Matches(found) => found,
            Self::NoneRelevant { .. } => &[],
        }
    }
}

/// Round a raw distance for display.
pub fn round_score(distance: f64) -> f64 {
    (distance * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_round_to_four_places() {
        assert_eq!(round_score(0.123_456), 0.1235);
        assert_eq!(round_score(1.414_213_56), 1.4142);
    }

    #[test]
    fn none_relevant_has_no_matches() {
        let outcome = QueryOutcome::NoneRelevant {
            candidates: 3,
            best_score: 0.9,
        };
        assert!(outcome.matches().is_empty());
    }
}
