//! Public result tallying.

use serde::{Deserialize, Serialize};

use crate::model::{db::Candidate, mongodb::Id};

/// One candidate's line in the public results.
#[derive(Debug, Serialize, Deserialize)]
pub struct TallyRow {
    pub candidate_id: Id,
    pub name: String,
    pub photo: Option<String>,
    pub votes: u64,
    /// Share of the total vote, 0 to 100. Zero when no ballots exist.
    pub percentage: f64,
}

/// Turn per-candidate vote counts into result rows, preserving the input
/// order. Candidates with zero votes still get a row.
pub fn tally_rows(counts: Vec<(Candidate, u64)>) -> Vec<TallyRow> {
    let total: u64 = counts.iter().map(|(_, votes)| votes).sum();

    counts
        .into_iter()
        .map(|(candidate, votes)| TallyRow {
            candidate_id: candidate.id,
            votes,
            percentage: if total == 0 {
                0.0
            } else {
                100.0 * votes as f64 / total as f64
            },
            name: candidate.candidate.name,
            photo: candidate.candidate.photo,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_candidate(name: &str) -> Candidate {
        let mut candidate = Candidate::example();
        candidate.name = name.to_string();
        candidate
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let rows = tally_rows(vec![
            (named_candidate("A"), 3),
            (named_candidate("B"), 1),
            (named_candidate("C"), 0),
        ]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].votes, 3);
        assert_eq!(rows[0].percentage, 75.0);
        assert_eq!(rows[1].percentage, 25.0);
        assert_eq!(rows[2].percentage, 0.0);

        let sum: f64 = rows.iter().map(|row| row.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_election_yields_all_zero() {
        let rows = tally_rows(vec![
            (named_candidate("A"), 0),
            (named_candidate("B"), 0),
        ]);

        assert!(rows.iter().all(|row| row.votes == 0));
        assert!(rows.iter().all(|row| row.percentage == 0.0));
    }

    #[test]
    fn input_order_is_preserved() {
        let rows = tally_rows(vec![
            (named_candidate("Trailing"), 1),
            (named_candidate("Leading"), 5),
        ]);

        assert_eq!(rows[0].name, "Trailing");
        assert_eq!(rows[1].name, "Leading");
    }
}
