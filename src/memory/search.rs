//! Read path: KNN over `memories_vec` followed by threshold filtering.

use anyhow::Result;
use rusqlite::{params, Connection};

use super::types::{round_score, Candidate, QueryOutcome};

/// The `limit` nearest memories to `embedding`, nearest first, with raw L2 distances.
pub fn nearest(conn: &Connection, embedding: &[f32], limit: usize) -> Result<Vec<Candidate>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let embedding_bytes = super::embedding_to_bytes(embedding);
    let mut stmt = conn.prepare(
        "SELECT v.id, v.distance, m.content \
         FROM (SELECT id, distance FROM memories_vec \
               WHERE embedding MATCH ?1 AND k = ?2) v \
         JOIN memories m ON m.id = v.id \
         ORDER BY v.distance",
    )?;
    let results = stmt
        .query_map(params![embedding_bytes, limit as i64], |row| {
            Ok(Candidate {
                id: row.get(0)?,
                score: row.get(1)?,
                content: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Keep candidates strictly closer than `threshold`.
///
/// An empty input is an empty match list; a non-empty input with nothing under the
/// threshold is [`QueryOutcome::NoneRelevant`].
pub fn filter_relevant(candidates: Vec<Candidate>, threshold: f64) -> QueryOutcome {
    if candidates.is_empty() {
        return QueryOutcome::Matches(Vec::new());
    }

    let total = candidates.len();
    let best_score = candidates
        .iter()
        .map(|c| c.score)
        .fold(f64::INFINITY, f64::min);

    let relevant: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.score < threshold)
        .map(|c| Candidate {
            score: round_score(c.score),
            ..c
        })
        .collect();

    if relevant.is_empty() {
        QueryOutcome::NoneRelevant {
            candidates: total,
            best_score: round_score(best_score),
        }
    } else {
        QueryOutcome::Matches(relevant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, score: f64) -> Candidate {
        Candidate {
            id: id.into(),
            content: format!("content of {id}"),
            score,
        }
    }

    #[test]
    fn empty_candidates_are_no_match() {
        assert_eq!(
            filter_relevant(Vec::new(), 0.7),
            QueryOutcome::Matches(Vec::new())
        );
    }

    #[test]
    fn threshold_is_strict() {
        let outcome = filter_relevant(vec![candidate("a", 0.2), candidate("b", 0.7)], 0.7);
        let ids: Vec<&str> = outcome.matches().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn all_rejected_reports_none_relevant() {
        let outcome = filter_relevant(vec![candidate("a", 0.91234), candidate("b", 1.3)], 0.7);
        assert_eq!(
            outcome,
            QueryOutcome::NoneRelevant {
                candidates: 2,
                best_score: 0.9123
            }
        );
    }

    #[test]
    fn kept_scores_are_rounded() {
        let outcome = filter_relevant(vec![candidate("a", 0.123_456_7)], 0.7);
        assert_eq!(outcome.matches()[0].score, 0.1235);
    }
}
