use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::BTreeMap;

use crate::models::{DigestSnapshot, JobStatus, Preferences, StatusChange};

// --- Repository traits ---
//
// The core never touches storage directly. `Database` backs these with SQLite;
// `MemoryStore` is the in-process implementation used by tests.

pub trait PreferenceStore {
    fn preferences(&self) -> Result<Option<Preferences>>;
    fn set_preferences(&self, prefs: &Preferences) -> Result<()>;
    fn clear_preferences(&self) -> Result<()>;
}

pub trait SavedJobStore {
    /// Saved ids in the order they were saved.
    fn saved_job_ids(&self) -> Result<Vec<i64>>;
    /// No-op if the job is already saved.
    fn save_job(&self, job_id: i64) -> Result<()>;
    fn unsave_job(&self, job_id: i64) -> Result<()>;

    fn is_saved(&self, job_id: i64) -> Result<bool> {
        Ok(self.saved_job_ids()?.contains(&job_id))
    }
}

pub trait StatusStore {
    fn status(&self, job_id: i64) -> Result<Option<JobStatus>>;
    fn statuses(&self) -> Result<HashMap<i64, JobStatus>>;
    /// Sets the job's current status and prepends `change` to the history,
    /// keeping at most `history_limit` entries. Must happen as one step.
    fn record_status(&self, change: &StatusChange, history_limit: usize) -> Result<()>;
    /// Newest first.
    fn history(&self) -> Result<Vec<StatusChange>>;
}

pub trait DigestStore {
    /// `None` means no digest was generated for that date, which is not the
    /// same as a generated digest with no jobs.
    fn digest(&self, date: NaiveDate) -> Result<Option<DigestSnapshot>>;
    /// Replaces any digest already stored for the snapshot's date.
    fn put_digest(&self, snapshot: &DigestSnapshot) -> Result<()>;
}

/// Flips the saved state of a job and returns the new state.
pub fn toggle_saved(store: &dyn SavedJobStore, job_id: i64) -> Result<bool> {
    if store.is_saved(job_id)? {
        store.unsave_job(job_id)?;
        Ok(false)
    } else {
        store.save_job(job_id)?;
        Ok(true)
    }
}

// --- In-memory implementation ---

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    preferences: RefCell<Option<Preferences>>,
    saved: RefCell<Vec<i64>>,
    statuses: RefCell<HashMap<i64, JobStatus>>,
    history: RefCell<Vec<StatusChange>>,
    digests: RefCell<BTreeMap<NaiveDate, DigestSnapshot>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl PreferenceStore for MemoryStore {
    fn preferences(&self) -> Result<Option<Preferences>> {
        Ok(self.preferences.borrow().clone())
    }

    fn set_preferences(&self, prefs: &Preferences) -> Result<()> {
        *self.preferences.borrow_mut() = Some(prefs.clone());
        Ok(())
    }

    fn clear_preferences(&self) -> Result<()> {
        *self.preferences.borrow_mut() = None;
        Ok(())
    }
}

#[cfg(test)]
impl SavedJobStore for MemoryStore {
    fn saved_job_ids(&self) -> Result<Vec<i64>> {
        Ok(self.saved.borrow().clone())
    }

    fn save_job(&self, job_id: i64) -> Result<()> {
        let mut saved = self.saved.borrow_mut();
        if !saved.contains(&job_id) {
            saved.push(job_id);
        }
        Ok(())
    }

    fn unsave_job(&self, job_id: i64) -> Result<()> {
        self.saved.borrow_mut().retain(|id| *id != job_id);
        Ok(())
    }
}

#[cfg(test)]
impl StatusStore for MemoryStore {
    fn status(&self, job_id: i64) -> Result<Option<JobStatus>> {
        Ok(self.statuses.borrow().get(&job_id).copied())
    }

    fn statuses(&self) -> Result<HashMap<i64, JobStatus>> {
        Ok(self.statuses.borrow().clone())
    }

    fn record_status(&self, change: &StatusChange, history_limit: usize) -> Result<()> {
        self.statuses.borrow_mut().insert(change.job_id, change.status);
        let mut history = self.history.borrow_mut();
        history.insert(0, change.clone());
        history.truncate(history_limit);
        Ok(())
    }

    fn history(&self) -> Result<Vec<StatusChange>> {
        Ok(self.history.borrow().clone())
    }
}

#[cfg(test)]
impl DigestStore for MemoryStore {
    fn digest(&self, date: NaiveDate) -> Result<Option<DigestSnapshot>> {
        Ok(self.digests.borrow().get(&date).cloned())
    }

    fn put_digest(&self, snapshot: &DigestSnapshot) -> Result<()> {
        self.digests.borrow_mut().insert(snapshot.date, snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_is_idempotent_and_ordered() {
        let store = MemoryStore::new();
        store.save_job(3).unwrap();
        store.save_job(1).unwrap();
        store.save_job(3).unwrap();
        assert_eq!(store.saved_job_ids().unwrap(), vec![3, 1]);

        store.unsave_job(3).unwrap();
        assert_eq!(store.saved_job_ids().unwrap(), vec![1]);
        assert!(!store.is_saved(3).unwrap());
    }

    #[test]
    fn test_toggle_saved() {
        let store = MemoryStore::new();
        assert!(toggle_saved(&store, 5).unwrap());
        assert!(store.is_saved(5).unwrap());
        assert!(!toggle_saved(&store, 5).unwrap());
        assert!(!store.is_saved(5).unwrap());
    }

    #[test]
    fn test_preferences_absent_until_set() {
        let store = MemoryStore::new();
        assert!(store.preferences().unwrap().is_none());

        store.set_preferences(&Preferences::default()).unwrap();
        assert_eq!(store.preferences().unwrap(), Some(Preferences::default()));

        store.clear_preferences().unwrap();
        assert!(store.preferences().unwrap().is_none());
    }

    #[test]
    fn test_digest_absent_differs_from_empty() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert!(store.digest(date).unwrap().is_none());

        store.put_digest(&DigestSnapshot { date, jobs: Vec::new() }).unwrap();
        let stored = store.digest(date).unwrap();
        assert_eq!(stored.map(|d| d.jobs.len()), Some(0));
    }
}
