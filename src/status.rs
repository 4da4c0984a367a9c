use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{Job, JobStatus, StatusChange};
use crate::store::StatusStore;

pub const HISTORY_LIMIT: usize = 20;

/// Current status of a job; jobs that were never touched are `Not Applied`.
pub fn get_status(store: &dyn StatusStore, job_id: i64) -> Result<JobStatus> {
    Ok(store.status(job_id)?.unwrap_or_default())
}

/// Overwrites the job's status. Any status may follow any other.
///
/// The title and company are copied into the history entry so later edits to
/// the job data do not rewrite history.
pub fn set_status(
    store: &dyn StatusStore,
    job: &Job,
    status: JobStatus,
    now: DateTime<Utc>,
) -> Result<StatusChange> {
    let change = StatusChange {
        job_id: job.id,
        job_title: job.title.clone(),
        job_company: job.company.clone(),
        status,
        changed_at: now,
    };
    store.record_status(&change, HISTORY_LIMIT)?;
    info!(job_id = job.id, status = %status, "Updated job status");
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tests::sample_job;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_job_is_not_applied() {
        let store = MemoryStore::new();
        assert_eq!(get_status(&store, 999).unwrap(), JobStatus::NotApplied);
    }

    #[test]
    fn test_any_transition_is_allowed() {
        let store = MemoryStore::new();
        let job = sample_job();
        for status in [JobStatus::Selected, JobStatus::NotApplied, JobStatus::Rejected, JobStatus::Applied] {
            set_status(&store, &job, status, t0()).unwrap();
            assert_eq!(get_status(&store, job.id).unwrap(), status);
        }
        assert_eq!(store.history().unwrap().len(), 4);
    }

    #[test]
    fn test_history_captures_job_at_time_of_change() {
        let store = MemoryStore::new();
        let mut job = sample_job();
        set_status(&store, &job, JobStatus::Applied, t0()).unwrap();

        job.title = "Renamed".to_string();
        let history = store.history().unwrap();
        assert_eq!(history[0].job_title, "React Developer");
        assert_eq!(history[0].job_company, "Acme");
        assert_eq!(history[0].changed_at, t0());
    }

    #[test]
    fn test_history_keeps_twenty_newest_first() {
        let store = MemoryStore::new();
        for id in 1..=25 {
            let mut job = sample_job();
            job.id = id;
            set_status(&store, &job, JobStatus::Applied, t0() + Duration::minutes(id)).unwrap();
        }

        let history = store.history().unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        let ids: Vec<i64> = history.iter().map(|c| c.job_id).collect();
        let expected: Vec<i64> = (6..=25).rev().collect();
        assert_eq!(ids, expected);

        // Status map is not trimmed with the history
        assert_eq!(get_status(&store, 1).unwrap(), JobStatus::Applied);
    }
}
