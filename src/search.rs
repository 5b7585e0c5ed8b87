//! Recency and subject filtering plus the newest-match pick.
//!
//! Pure functions over [`Candidate`]s so the selection rules can be exercised
//! without a server.

use crate::models::{Candidate, SearchWindow};

/// Case-insensitive substring match on the decoded subject.
pub fn subject_matches(subject: &str, filter: &str) -> bool {
    subject.to_lowercase().contains(&filter.to_lowercase())
}

/// Whether a parsed candidate passes both the window and the subject filter.
pub fn is_match(candidate: &Candidate, window: &SearchWindow, filter: &str) -> bool {
    window.contains(candidate.timestamp) && subject_matches(&candidate.subject, filter)
}

/// Newest candidate first; equal timestamps keep their original order.
pub fn sort_newest_first(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// The single newest candidate, or `None` when there are none.
pub fn most_recent(mut candidates: Vec<Candidate>) -> Option<Candidate> {
    sort_newest_first(&mut candidates);
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn candidate(id: u32, timestamp: NaiveDateTime, subject: &str) -> Candidate {
        Candidate {
            id,
            timestamp,
            date: String::new(),
            subject: subject.to_string(),
            raw: Vec::new(),
        }
    }

    fn ids(candidates: &[Candidate]) -> Vec<u32> {
        candidates.iter().map(|c| c.id).collect()
    }

    #[test]
    fn subject_match_folds_case() {
        assert!(subject_matches("Re: IBM WINS big", "ibm wins"));
        assert!(subject_matches("ibm wins", "IBM Wins"));
        assert!(subject_matches("Café au lait", "CAFÉ"));
        assert!(!subject_matches("IBM loses", "ibm wins"));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(subject_matches("anything", ""));
        assert!(subject_matches("", ""));
    }

    #[test]
    fn filter_requires_both_window_and_subject() {
        let window = SearchWindow::ending_at(at(12, 30), 10).unwrap();
        let all = vec![
            candidate(1, at(12, 25), "IBM wins"),
            candidate(2, at(12, 19), "IBM wins"),
            candidate(3, at(12, 26), "Weekly digest"),
            candidate(4, at(12, 20), "re: ibm WINS"),
            candidate(5, at(13, 0), "IBM wins (future dated)"),
        ];
        let kept: Vec<Candidate> = all
            .into_iter()
            .filter(|c| is_match(c, &window, "IBM wins"))
            .collect();
        assert_eq!(ids(&kept), vec![1, 4, 5]);
    }

    #[test]
    fn picks_strictly_newest() {
        let picked = most_recent(vec![
            candidate(1, at(12, 21), "a"),
            candidate(2, at(12, 29), "b"),
            candidate(3, at(12, 25), "c"),
        ])
        .unwrap();
        assert_eq!(picked.id, 2);
    }

    #[test]
    fn ties_keep_server_order() {
        let picked = most_recent(vec![
            candidate(1, at(12, 21), "a"),
            candidate(2, at(12, 28), "b"),
            candidate(3, at(12, 28), "c"),
        ])
        .unwrap();
        assert_eq!(picked.id, 2);

        let mut all = vec![
            candidate(4, at(12, 28), "d"),
            candidate(5, at(12, 28), "e"),
            candidate(6, at(12, 29), "f"),
        ];
        sort_newest_first(&mut all);
        assert_eq!(ids(&all), vec![6, 4, 5]);
    }

    #[test]
    fn nothing_to_pick_from_empty() {
        assert!(most_recent(Vec::new()).is_none());
    }
}
