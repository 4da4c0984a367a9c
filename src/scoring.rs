use crate::models::{Job, Preferences};

pub const MAX_SCORE: u8 = 100;

const TITLE_KEYWORD_POINTS: u8 = 25;
const DESCRIPTION_KEYWORD_POINTS: u8 = 15;
const LOCATION_POINTS: u8 = 15;
const MODE_POINTS: u8 = 10;
const EXPERIENCE_POINTS: u8 = 10;
const SKILL_POINTS: u8 = 15;
const FRESHNESS_POINTS: u8 = 5;
const PREFERRED_SOURCE_POINTS: u8 = 5;

const FRESH_WITHIN_DAYS: u32 = 2;
const PREFERRED_SOURCE: &str = "LinkedIn";

/// Scores a job 0-100 against the user's preferences.
///
/// Without preferences every job scores 0. Each rule is checked on its own,
/// so a job collects points from every rule it satisfies:
///
/// | rule | points |
/// |---|---|
/// | any role keyword in title | 25 |
/// | any role keyword in description | 15 |
/// | location in preferred locations | 15 |
/// | mode in preferred modes | 10 |
/// | experience equals experience level | 10 |
/// | any skill overlap | 15 |
/// | posted within 2 days | 5 |
/// | source is LinkedIn | 5 |
pub fn calculate_match_score(job: &Job, prefs: Option<&Preferences>) -> u8 {
    let Some(prefs) = prefs else { return 0 };

    let mut score: u32 = 0;

    if contains_any(&job.title, &prefs.role_keywords) {
        score += TITLE_KEYWORD_POINTS as u32;
    }

    if contains_any(&job.description, &prefs.role_keywords) {
        score += DESCRIPTION_KEYWORD_POINTS as u32;
    }

    if equals_any(&job.location, &prefs.preferred_locations) {
        score += LOCATION_POINTS as u32;
    }

    if equals_any(&job.mode, &prefs.preferred_mode) {
        score += MODE_POINTS as u32;
    }

    // Exact enum match, case-sensitive
    if prefs.experience_level.as_deref() == Some(job.experience.as_str()) {
        score += EXPERIENCE_POINTS as u32;
    }

    if job.skills.iter().any(|skill| equals_any(skill, &prefs.skills)) {
        score += SKILL_POINTS as u32;
    }

    if job.posted_days_ago <= FRESH_WITHIN_DAYS {
        score += FRESHNESS_POINTS as u32;
    }

    if job.source == PREFERRED_SOURCE {
        score += PREFERRED_SOURCE_POINTS as u32;
    }

    score.min(MAX_SCORE as u32) as u8
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    if needles.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.to_lowercase()))
}

fn equals_any(value: &str, candidates: &[String]) -> bool {
    let value = value.to_lowercase();
    candidates.iter().any(|c| c.to_lowercase() == value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchBadge {
    Excellent,
    Good,
    Fair,
    Low,
}

impl MatchBadge {
    pub fn for_score(score: u8) -> Self {
        match score {
            80.. => MatchBadge::Excellent,
            60..=79 => MatchBadge::Good,
            40..=59 => MatchBadge::Fair,
            _ => MatchBadge::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchBadge::Excellent => "excellent",
            MatchBadge::Good => "good",
            MatchBadge::Fair => "fair",
            MatchBadge::Low => "low",
        }
    }
}
