mod config;
mod dataset;
mod db;
mod digest;
mod models;
mod query;
mod scoring;
mod state;
mod status;
mod store;
mod tui;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Database;
use digest::{format_digest_text, format_long_date, generate_digest};
use models::{Job, JobStatus, Preferences, ScoredJob, SortKey};
use scoring::MatchBadge;
use state::{reduce, Action, DashboardState};
use store::{DigestStore, PreferenceStore, SavedJobStore, StatusStore};

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job postings, score them against your preferences, and keep a daily digest")]
struct Cli {
    /// Jobs dataset (JSON array); defaults to the bundled dataset
    #[arg(long, global = true)]
    jobs: Option<PathBuf>,

    /// Database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// List jobs with filters and sorting
    Jobs {
        /// Search title or company
        #[arg(short, long)]
        keyword: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// Remote, Hybrid or Onsite
        #[arg(short, long)]
        mode: Option<String>,

        /// Fresher, 0-1 or 1-3
        #[arg(short, long)]
        experience: Option<String>,

        /// LinkedIn, Naukri or Indeed
        #[arg(long)]
        source: Option<String>,

        /// Application status (not-applied, applied, rejected, selected)
        #[arg(long)]
        status: Option<JobStatus>,

        /// latest, oldest, match or salary
        #[arg(long, default_value = "latest")]
        sort: SortKey,

        /// Only show jobs at or above your minimum match score
        #[arg(long)]
        only_matches: bool,
    },

    /// Show job details
    Show {
        /// Job ID
        id: i64,
    },

    /// Manage your job preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Bookmark a job
    Save {
        /// Job ID
        id: i64,
    },

    /// Remove a bookmark
    Unsave {
        /// Job ID
        id: i64,
    },

    /// List bookmarked jobs
    Saved,

    /// Track application status
    Status {
        #[command(subcommand)]
        command: StatusCommands,
    },

    /// Daily top 10 digest
    Digest {
        #[command(subcommand)]
        command: DigestCommands,
    },

    /// Browse jobs interactively
    Browse,
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show current preferences
    Show,

    /// Replace preferences
    Set {
        /// Comma-separated role keywords
        #[arg(short, long, default_value = "")]
        keywords: String,

        /// Comma-separated preferred locations
        #[arg(short, long, default_value = "")]
        locations: String,

        /// Comma-separated preferred modes
        #[arg(short, long, default_value = "")]
        modes: String,

        /// Fresher, 0-1 or 1-3
        #[arg(short, long)]
        experience: Option<String>,

        /// Comma-separated skills
        #[arg(short, long, default_value = "")]
        skills: String,

        /// Minimum match score (0-100)
        #[arg(long, default_value_t = models::DEFAULT_MIN_MATCH_SCORE, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_score: u8,
    },

    /// Delete preferences
    Reset,
}

#[derive(Subcommand)]
enum StatusCommands {
    /// Set a job's status
    Set {
        /// Job ID
        id: i64,

        /// not-applied, applied, rejected or selected
        status: JobStatus,
    },

    /// Show a job's status
    Show {
        /// Job ID
        id: i64,
    },

    /// Show recent status changes
    History,
}

#[derive(Subcommand)]
enum DigestCommands {
    /// Generate the digest, replacing any digest for the same date
    Generate {
        /// Date key (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show a generated digest
    Show {
        /// Date key (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn init_logging(config: &Config) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), config.log_level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_jobs(config: &Config) -> Result<Vec<Job>> {
    let jobs = match &config.jobs_path {
        Some(path) => dataset::load_jobs(path)?,
        None => dataset::bundled_jobs()?,
    };
    info!(count = jobs.len(), "Loaded jobs");
    Ok(jobs)
}

fn find_job(jobs: &[Job], id: i64) -> Result<&Job> {
    dataset::find_job(jobs, id).ok_or_else(|| anyhow!("Job #{} not found", id))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().with_overrides(cli.db, cli.jobs);
    init_logging(&config);

    let db = Database::open(&config.db_path)?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Jobs {
            keyword,
            location,
            mode,
            experience,
            source,
            status,
            sort,
            only_matches,
        } => {
            db.ensure_initialized()?;
            let jobs = load_jobs(&config)?;
            let prefs = db.preferences()?;
            let statuses = db.statuses()?;

            let actions = [
                Action::SetKeyword(keyword.unwrap_or_default()),
                Action::SetLocation(location.unwrap_or_default()),
                Action::SetMode(mode.unwrap_or_default()),
                Action::SetExperience(experience.unwrap_or_default()),
                Action::SetSource(source.unwrap_or_default()),
                Action::SetStatus(status.map(|s| s.to_string()).unwrap_or_default()),
                Action::SetSort(sort),
            ];
            let mut dashboard = actions.into_iter().fold(DashboardState::default(), reduce);
            if only_matches {
                dashboard = reduce(dashboard, Action::ToggleOnlyMatches);
            }

            if prefs.is_none() {
                if only_matches {
                    println!("No preferences set; --only-matches ignored.");
                } else {
                    println!("Set your preferences to activate matching: jobtrack prefs set --help");
                }
            }

            let results = query::filter_and_sort(
                &jobs,
                prefs.as_ref(),
                &dashboard.filters,
                dashboard.only_matches,
                &statuses,
            );
            if results.is_empty() {
                println!("No jobs match your search.");
            } else {
                print_job_table(&results, prefs.is_some(), &statuses);
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            let jobs = load_jobs(&config)?;
            match dataset::find_job(&jobs, id) {
                Some(job) => {
                    let prefs = db.preferences()?;
                    println!("Job #{}", job.id);
                    println!("Title: {}", job.title);
                    println!("Company: {}", job.company);
                    if prefs.is_some() {
                        let score = scoring::calculate_match_score(job, prefs.as_ref());
                        println!("Match: {}% ({})", score, MatchBadge::for_score(score).as_str());
                    }
                    println!("Status: {}", status::get_status(&db, job.id)?);
                    if db.is_saved(job.id)? {
                        println!("Saved: yes");
                    }
                    println!("Location: {} ({})", job.location, job.mode);
                    println!("Experience: {}", job.experience);
                    println!("Salary: {}", job.salary_range);
                    println!("Source: {}", job.source);
                    println!("Posted: {}", format_posted(job.posted_days_ago));
                    if !job.skills.is_empty() {
                        println!("Skills: {}", job.skills.join(", "));
                    }
                    println!("Apply: {}", job.apply_url);
                    println!("\n--- Description ---\n{}", job.description);
                }
                None => {
                    println!("Job #{} not found.", id);
                }
            }
        }

        Commands::Prefs { command } => {
            db.ensure_initialized()?;
            match command {
                PrefsCommands::Show => match db.preferences()? {
                    Some(prefs) => print_preferences(&prefs),
                    None => println!("No preferences set."),
                },

                PrefsCommands::Set {
                    keywords,
                    locations,
                    modes,
                    experience,
                    skills,
                    min_score,
                } => {
                    let prefs = Preferences::from_form(
                        &keywords,
                        &locations,
                        &modes,
                        experience.as_deref(),
                        &skills,
                        min_score,
                    );
                    db.set_preferences(&prefs)?;
                    info!("Preferences replaced");
                    println!("Preferences saved.");
                    print_preferences(&prefs);
                }

                PrefsCommands::Reset => {
                    db.clear_preferences()?;
                    println!("Preferences reset.");
                }
            }
        }

        Commands::Save { id } => {
            db.ensure_initialized()?;
            let jobs = load_jobs(&config)?;
            let job = find_job(&jobs, id)?;
            db.save_job(job.id)?;
            println!("Saved job #{} ({}).", job.id, job.title);
        }

        Commands::Unsave { id } => {
            db.ensure_initialized()?;
            db.unsave_job(id)?;
            println!("Removed job #{} from saved jobs.", id);
        }

        Commands::Saved => {
            db.ensure_initialized()?;
            let jobs = load_jobs(&config)?;
            let saved_ids = db.saved_job_ids()?;
            let saved: Vec<Job> = jobs
                .into_iter()
                .filter(|job| saved_ids.contains(&job.id))
                .collect();

            if saved.is_empty() {
                println!("No saved jobs.");
            } else {
                let prefs = db.preferences()?;
                let results = query::score_all(&saved, prefs.as_ref());
                print_job_table(&results, prefs.is_some(), &db.statuses()?);
            }
        }

        Commands::Status { command } => {
            db.ensure_initialized()?;
            match command {
                StatusCommands::Set { id, status } => {
                    let jobs = load_jobs(&config)?;
                    let job = find_job(&jobs, id)?;
                    status::set_status(&db, job, status, Utc::now())?;
                    println!("Job #{} ({}) marked as {}.", job.id, job.title, status);
                }

                StatusCommands::Show { id } => {
                    println!("Job #{}: {}", id, status::get_status(&db, id)?);
                }

                StatusCommands::History => {
                    let history = db.history()?;
                    if history.is_empty() {
                        println!("No status changes yet.");
                    } else {
                        println!("{:<17} {:<6} {:<12} {:<28} {:<20}", "WHEN", "ID", "STATUS", "TITLE", "COMPANY");
                        println!("{}", "-".repeat(86));
                        for change in history {
                            println!(
                                "{:<17} {:<6} {:<12} {:<28} {:<20}",
                                change.changed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
                                change.job_id,
                                change.status,
                                truncate(&change.job_title, 26),
                                truncate(&change.job_company, 18)
                            );
                        }
                    }
                }
            }
        }

        Commands::Digest { command } => {
            db.ensure_initialized()?;
            match command {
                DigestCommands::Generate { date } => {
                    let date = date.unwrap_or_else(today);
                    let jobs = load_jobs(&config)?;
                    let prefs = db.preferences()?;
                    let snapshot = generate_digest(&jobs, prefs.as_ref(), date)
                        .context("Cannot generate digest. Run 'jobtrack prefs set' first")?;
                    db.put_digest(&snapshot)?;
                    print!("{}", format_digest_text(&snapshot));
                }

                DigestCommands::Show { date } => {
                    let date = date.unwrap_or_else(today);
                    match db.digest(date)? {
                        None => {
                            println!(
                                "No digest generated for {} yet. Run 'jobtrack digest generate'.",
                                format_long_date(date)
                            );
                        }
                        Some(snapshot) if snapshot.jobs.is_empty() => {
                            println!("The digest for {} has no jobs.", format_long_date(date));
                        }
                        Some(snapshot) => {
                            print!("{}", format_digest_text(&snapshot));
                        }
                    }
                }
            }
        }

        Commands::Browse => {
            db.ensure_initialized()?;
            let jobs = load_jobs(&config)?;
            tui::run_browse(&db, jobs)?;
        }
    }

    Ok(())
}

fn print_job_table(results: &[ScoredJob], show_scores: bool, statuses: &HashMap<i64, JobStatus>) {
    println!(
        "{:<6} {:>5} {:<12} {:<28} {:<16} {:<10} {:<8} {:<14} {:>10}",
        "ID", "MATCH", "STATUS", "TITLE", "COMPANY", "LOCATION", "MODE", "SALARY", "POSTED"
    );
    println!("{}", "-".repeat(116));
    for scored in results {
        let job = &scored.job;
        let score = if show_scores {
            format!("{}%", scored.match_score)
        } else {
            "-".to_string()
        };
        println!(
            "{:<6} {:>5} {:<12} {:<28} {:<16} {:<10} {:<8} {:<14} {:>10}",
            job.id,
            score,
            statuses.get(&job.id).copied().unwrap_or_default(),
            truncate(&job.title, 26),
            truncate(&job.company, 14),
            truncate(&job.location, 10),
            job.mode,
            truncate(&job.salary_range, 14),
            format_posted(job.posted_days_ago)
        );
    }
}

fn print_preferences(prefs: &Preferences) {
    println!("Role keywords:  {}", prefs.role_keywords.join(", "));
    println!("Locations:      {}", prefs.preferred_locations.join(", "));
    println!("Modes:          {}", prefs.preferred_mode.join(", "));
    println!("Experience:     {}", prefs.experience_level.as_deref().unwrap_or("-"));
    println!("Skills:         {}", prefs.skills.join(", "));
    println!("Min match:      {}%", prefs.min_match_score);
}

fn format_posted(days_ago: u32) -> String {
    match days_ago {
        0 => "Today".to_string(),
        1 => "1 day ago".to_string(),
        n => format!("{} days ago", n),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
