use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MIN_MATCH_SCORE: u8 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub mode: String,       // "Remote", "Hybrid", "Onsite"
    pub experience: String, // "Fresher", "0-1", "1-3"
    pub salary_range: String,
    pub source: String, // "LinkedIn", "Naukri", "Indeed"
    pub description: String,
    pub apply_url: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub posted_days_ago: u32,
}

/// The user's job-search profile. Absence of a profile is a distinct state
/// from an empty one: see `scoring::calculate_match_score`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub role_keywords: Vec<String>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    #[serde(default)]
    pub preferred_mode: Vec<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_min_match_score")]
    pub min_match_score: u8,
}

fn default_min_match_score() -> u8 {
    DEFAULT_MIN_MATCH_SCORE
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            role_keywords: Vec::new(),
            preferred_locations: Vec::new(),
            preferred_mode: Vec::new(),
            experience_level: None,
            skills: Vec::new(),
            min_match_score: DEFAULT_MIN_MATCH_SCORE,
        }
    }
}

impl Preferences {
    /// Builds a profile from settings-form style input, where list fields are
    /// comma separated.
    pub fn from_form(
        role_keywords: &str,
        preferred_locations: &str,
        preferred_mode: &str,
        experience_level: Option<&str>,
        skills: &str,
        min_match_score: u8,
    ) -> Self {
        Self {
            role_keywords: split_list(role_keywords),
            preferred_locations: split_list(preferred_locations),
            preferred_mode: split_list(preferred_mode),
            experience_level: experience_level
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            skills: split_list(skills),
            min_match_score,
        }
    }
}

pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredJob {
    #[serde(flatten)]
    pub job: Job,
    pub match_score: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Latest,
    Oldest,
    Match,
    Salary,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Latest => "latest",
            SortKey::Oldest => "oldest",
            SortKey::Match => "match",
            SortKey::Salary => "salary",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortKey::Latest => SortKey::Match,
            SortKey::Match => SortKey::Salary,
            SortKey::Salary => SortKey::Oldest,
            SortKey::Oldest => SortKey::Latest,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(SortKey::Latest),
            "oldest" => Ok(SortKey::Oldest),
            "match" => Ok(SortKey::Match),
            "salary" => Ok(SortKey::Salary),
            other => Err(anyhow::anyhow!(
                "Unknown sort '{}'. Available: latest, oldest, match, salary",
                other
            )),
        }
    }
}

/// Attribute filters for the dashboard. Empty strings mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub keyword: String,
    pub location: String,
    pub mode: String,
    pub experience: String,
    pub source: String,
    pub status: String,
    pub sort: SortKey,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "Not Applied")]
    NotApplied,
    Applied,
    Rejected,
    Selected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotApplied => "Not Applied",
            JobStatus::Applied => "Applied",
            JobStatus::Rejected => "Rejected",
            JobStatus::Selected => "Selected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not applied" | "not-applied" | "not_applied" => Ok(JobStatus::NotApplied),
            "applied" => Ok(JobStatus::Applied),
            "rejected" => Ok(JobStatus::Rejected),
            "selected" => Ok(JobStatus::Selected),
            other => Err(anyhow::anyhow!(
                "Unknown status '{}'. Available: not-applied, applied, rejected, selected",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub job_id: i64,
    pub job_title: String,   // denormalized at time of change
    pub job_company: String, // denormalized at time of change
    pub status: JobStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSnapshot {
    pub date: NaiveDate,
    pub jobs: Vec<ScoredJob>,
}
