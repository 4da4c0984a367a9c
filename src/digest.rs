use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::models::{DigestSnapshot, Job, Preferences};
use crate::query::score_all;

pub const DIGEST_SIZE: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("Set your preferences first: the digest ranks jobs by match score")]
    MissingPreferences,
}

/// Picks today's top jobs: highest match score first, more recent postings
/// first among equal scores. Dashboard filters are deliberately not applied.
pub fn generate_digest(
    jobs: &[Job],
    prefs: Option<&Preferences>,
    date: NaiveDate,
) -> Result<DigestSnapshot, DigestError> {
    let prefs = prefs.ok_or(DigestError::MissingPreferences)?;

    let mut ranked = score_all(jobs, Some(prefs));
    ranked.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then(a.job.posted_days_ago.cmp(&b.job.posted_days_ago))
    });
    ranked.truncate(DIGEST_SIZE);

    info!(%date, jobs = ranked.len(), "Generated digest");

    Ok(DigestSnapshot { date, jobs: ranked })
}

/// Plain-text rendering of a digest, suitable for pasting into an email.
pub fn format_digest_text(snapshot: &DigestSnapshot) -> String {
    let mut text = String::new();
    text.push_str("TOP 10 JOBS FOR YOU — 9AM DIGEST\n");
    text.push_str(&format!("{}\n\n", format_long_date(snapshot.date)));

    for (i, scored) in snapshot.jobs.iter().enumerate() {
        let job = &scored.job;
        text.push_str(&format!("{}. {}\n", i + 1, job.title));
        text.push_str(&format!("   {} • {}\n", job.company, job.location));
        text.push_str(&format!("   {} • {}% match\n", job.experience, scored.match_score));
        text.push_str(&format!("   Apply: {}\n\n", job.apply_url));
    }

    text.push_str("---\n");
    text.push_str("This digest was generated based on your preferences.\n");
    text
}

pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tests::{sample_job, sample_prefs};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn jobs(n: i64) -> Vec<Job> {
        (1..=n)
            .map(|id| {
                let mut job = sample_job();
                job.id = id;
                job.title = format!("Job {}", id);
                job.posted_days_ago = id as u32;
                job
            })
            .collect()
    }

    #[test]
    fn test_missing_preferences_is_an_error() {
        let result = generate_digest(&jobs(3), None, date());
        assert_eq!(result, Err(DigestError::MissingPreferences));
    }

    #[test]
    fn test_digest_caps_at_ten() {
        let snapshot = generate_digest(&jobs(25), Some(&sample_prefs()), date()).unwrap();
        assert_eq!(snapshot.jobs.len(), DIGEST_SIZE);
        assert_eq!(snapshot.date, date());
    }

    #[test]
    fn test_digest_returns_all_when_fewer_than_ten() {
        let snapshot = generate_digest(&jobs(4), Some(&sample_prefs()), date()).unwrap();
        assert_eq!(snapshot.jobs.len(), 4);

        let snapshot = generate_digest(&[], Some(&sample_prefs()), date()).unwrap();
        assert!(snapshot.jobs.is_empty());
    }

    #[test]
    fn test_equal_scores_rank_recent_first() {
        let prefs = Preferences {
            role_keywords: vec!["react".to_string()],
            preferred_locations: vec!["Pune".to_string()],
            skills: vec!["css".to_string()],
            ..Default::default()
        };
        // title 25 + location 15 + skills 15, plus 5 from either LinkedIn or freshness
        let mut older = sample_job();
        older.id = 1;
        older.posted_days_ago = 5;
        let mut recent = sample_job();
        recent.id = 2;
        recent.posted_days_ago = 1;
        recent.source = "Indeed".to_string();

        let snapshot = generate_digest(&[older, recent], Some(&prefs), date()).unwrap();
        let got: Vec<(i64, u8)> = snapshot.jobs.iter().map(|j| (j.job.id, j.match_score)).collect();
        assert_eq!(got, vec![(2, 60), (1, 60)]);
    }

    #[test]
    fn test_higher_score_beats_recency() {
        let mut strong = sample_job();
        strong.id = 1;
        strong.posted_days_ago = 20;
        let mut weak = sample_job();
        weak.id = 2;
        weak.title = "Data Analyst".to_string();
        weak.posted_days_ago = 0;

        let snapshot = generate_digest(&[weak, strong], Some(&sample_prefs()), date()).unwrap();
        assert_eq!(snapshot.jobs[0].job.id, 1);
    }

    #[test]
    fn test_regenerating_reflects_changed_collection() {
        let prefs = sample_prefs();
        let first = generate_digest(&jobs(3), Some(&prefs), date()).unwrap();
        let again = generate_digest(&jobs(3), Some(&prefs), date()).unwrap();
        assert_eq!(first, again);

        let changed = generate_digest(&jobs(12), Some(&prefs), date()).unwrap();
        assert_ne!(first, changed);
        assert_eq!(changed.date, first.date);
    }

    #[test]
    fn test_format_digest_text() {
        let snapshot = generate_digest(&jobs(1), Some(&sample_prefs()), date()).unwrap();
        let text = format_digest_text(&snapshot);
        assert!(text.starts_with("TOP 10 JOBS FOR YOU — 9AM DIGEST\nOctober 16, 2026\n\n"));
        assert!(text.contains("1. Job 1\n   Acme • Pune\n   1-3 • 60% match\n   Apply: https://example.com/jobs/1\n"));
        assert!(text.ends_with("---\nThis digest was generated based on your preferences.\n"));
    }

    #[test]
    fn test_format_long_date_has_no_padding() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(format_long_date(date), "March 5, 2026");
    }
}
