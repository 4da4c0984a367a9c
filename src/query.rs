use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::{FilterSpec, Job, JobStatus, Preferences, ScoredJob, SortKey};
use crate::scoring::calculate_match_score;

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Annotates every job with its match score, applies the optional threshold
/// filter and the attribute filters, then sorts by `filters.sort`.
///
/// The input slice is never modified. `statuses` is the current status map;
/// jobs missing from it count as `Not Applied`.
pub fn filter_and_sort(
    jobs: &[Job],
    prefs: Option<&Preferences>,
    filters: &FilterSpec,
    only_matches: bool,
    statuses: &HashMap<i64, JobStatus>,
) -> Vec<ScoredJob> {
    let mut results = score_all(jobs, prefs);
    let total = results.len();

    if only_matches {
        if let Some(prefs) = prefs {
            results.retain(|j| j.match_score >= prefs.min_match_score);
        }
    }
    let above_threshold = results.len();

    results.retain(|j| matches_filters(&j.job, filters, statuses));

    sort_jobs(&mut results, filters.sort);

    debug!(
        total,
        above_threshold,
        returned = results.len(),
        sort = %filters.sort,
        "Filtered job list"
    );

    results
}

/// Attaches a match score to every job, keeping input order.
pub fn score_all(jobs: &[Job], prefs: Option<&Preferences>) -> Vec<ScoredJob> {
    jobs.iter()
        .map(|job| ScoredJob {
            match_score: calculate_match_score(job, prefs),
            job: job.clone(),
        })
        .collect()
}

fn matches_filters(job: &Job, filters: &FilterSpec, statuses: &HashMap<i64, JobStatus>) -> bool {
    if !filters.keyword.is_empty() {
        let keyword = filters.keyword.to_lowercase();
        if !job.title.to_lowercase().contains(&keyword)
            && !job.company.to_lowercase().contains(&keyword)
        {
            return false;
        }
    }

    let exact = [
        (&filters.location, &job.location),
        (&filters.mode, &job.mode),
        (&filters.experience, &job.experience),
        (&filters.source, &job.source),
    ];
    for (wanted, actual) in exact {
        if !wanted.is_empty() && wanted.to_lowercase() != actual.to_lowercase() {
            return false;
        }
    }

    if !filters.status.is_empty() {
        let current = statuses.get(&job.id).copied().unwrap_or_default();
        if current.as_str() != filters.status {
            return false;
        }
    }

    true
}

/// Stable sort: jobs with equal keys keep their relative order.
pub fn sort_jobs(jobs: &mut [ScoredJob], sort: SortKey) {
    match sort {
        SortKey::Latest => jobs.sort_by_key(|j| j.job.posted_days_ago),
        SortKey::Oldest => jobs.sort_by(|a, b| b.job.posted_days_ago.cmp(&a.job.posted_days_ago)),
        SortKey::Match => jobs.sort_by(|a, b| b.match_score.cmp(&a.match_score)),
        SortKey::Salary => jobs.sort_by(|a, b| {
            extract_salary(&b.job.salary_range).cmp(&extract_salary(&a.job.salary_range))
        }),
    }
}

/// Returns the first run of ASCII digits in a salary string, or 0 if there is none.
///
/// "₹12-18 LPA" gives 12. This is a sort heuristic, not a salary parser.
pub fn extract_salary(salary: &str) -> u64 {
    DIGIT_RUN
        .find(salary)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .unwrap_or(0)
}
