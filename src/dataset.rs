use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::models::Job;

const BUNDLED_JOBS: &str = include_str!("../data/jobs.json");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("Duplicate job id {0} in dataset")]
    DuplicateId(i64),
}

pub fn load_jobs(path: &Path) -> Result<Vec<Job>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read jobs file: {}", path.display()))?;
    parse_jobs(&content).with_context(|| format!("Invalid jobs file: {}", path.display()))
}

/// The job collection compiled into the binary.
pub fn bundled_jobs() -> Result<Vec<Job>> {
    parse_jobs(BUNDLED_JOBS).context("Bundled dataset is invalid")
}

pub fn parse_jobs(content: &str) -> Result<Vec<Job>> {
    let jobs: Vec<Job> = serde_json::from_str(content).context("Failed to parse job records")?;
    check_unique_ids(&jobs)?;
    Ok(jobs)
}

fn check_unique_ids(jobs: &[Job]) -> Result<(), DatasetError> {
    let mut seen = HashSet::new();
    for job in jobs {
        if !seen.insert(job.id) {
            return Err(DatasetError::DuplicateId(job.id));
        }
    }
    Ok(())
}

pub fn find_job(jobs: &[Job], id: i64) -> Option<&Job> {
    jobs.iter().find(|j| j.id == id)
}
