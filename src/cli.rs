use std::io::Write;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::models::{ActivityCategory, Narrative, NarrativeField, NewActivity};
use crate::period::{PayrollPeriod, format_date, is_deadline_approaching_at, is_submission_day};
use crate::report::write_report;
use crate::utils::{parse_date, parse_hours, today};
use crate::workspace::{Workspace, WorkspaceError};

#[derive(Parser)]
#[command(name = "wk")]
#[command(about = "Staff time log and bi-monthly payroll reports")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive dashboard (default if no subcommand)
    Tui,
    /// Log a work activity
    Log(LogArgs),
    /// List unsubmitted activities of the current period
    List {
        /// Show every activity, submitted or not
        #[arg(long)]
        all: bool,
        /// Use the period containing this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete an unsubmitted activity
    Delete {
        id: String,
    },
    /// Polish the write-up of an unsubmitted activity
    Polish {
        id: String,
    },
    /// Suggest a category for a task title
    Suggest {
        task: String,
    },
    /// Show the payroll period for a date
    Period {
        /// Date to resolve (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Hours, activity count and deadline for the current period
    Status {
        #[arg(long)]
        date: Option<String>,
    },
    /// Submit the current period's activities for payroll
    Submit {
        #[arg(long)]
        date: Option<String>,
    },
    /// List past submissions
    History,
    /// Write the current period's activity report, or a past submission's
    Report {
        /// Output directory (defaults to `report_dir` from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, conflicts_with = "submission")]
        date: Option<String>,
        /// Id of a past submission (see `wk history`)
        #[arg(long)]
        submission: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct LogArgs {
    /// Task title
    pub task: String,
    /// Activity date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<String>,
    /// Category (Maintenance, Customer Service, Locksmith, Transport, Admin, Other)
    #[arg(long, conflicts_with = "suggest")]
    pub category: Option<String>,
    /// Ask the assistant to pick the category
    #[arg(long)]
    pub suggest: bool,
    /// Duration in hours
    #[arg(long, default_value = "1")]
    pub hours: String,
    /// Run the narrative through the assistant before saving
    #[arg(long)]
    pub polish: bool,
    #[arg(long)]
    pub accomplishments: Option<String>,
    #[arg(long)]
    pub positive_impact: Option<String>,
    #[arg(long)]
    pub challenges: Option<String>,
    #[arg(long)]
    pub overcoming_challenges: Option<String>,
    #[arg(long)]
    pub future_plans: Option<String>,
    #[arg(long)]
    pub achievement_strategy: Option<String>,
    #[arg(long)]
    pub achievement_timeframe: Option<String>,
    #[arg(long)]
    pub company_benefit: Option<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

fn resolve_date(date: Option<&str>) -> Result<NaiveDate, CliError> {
    match date {
        Some(s) => parse_date(s)
            .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", s, e))),
        None => Ok(today()),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Handle the log command
pub fn handle_log(args: LogArgs, ws: &mut Workspace, out: &mut dyn Write) -> Result<(), CliError> {
    let date = resolve_date(args.date.as_deref())?;
    let hours = parse_hours(&args.hours).map_err(CliError::InvalidArgument)?;

    let category = if args.suggest {
        let suggested = ws.suggest_category(&args.task);
        writeln!(out, "Suggested category: {}", suggested)?;
        suggested
    } else {
        match args.category {
            Some(ref c) => c
                .parse::<ActivityCategory>()
                .map_err(|e| CliError::InvalidArgument(e.to_string()))?,
            None => ActivityCategory::Maintenance,
        }
    };

    let mut narrative = Narrative::default();
    narrative.set(NarrativeField::Accomplishments, args.accomplishments);
    narrative.set(NarrativeField::PositiveImpact, args.positive_impact);
    narrative.set(NarrativeField::Challenges, args.challenges);
    narrative.set(NarrativeField::OvercomingChallenges, args.overcoming_challenges);
    narrative.set(NarrativeField::FuturePlans, args.future_plans);
    narrative.set(NarrativeField::AchievementStrategy, args.achievement_strategy);
    narrative.set(NarrativeField::AchievementTimeframe, args.achievement_timeframe);
    narrative.set(NarrativeField::CompanyBenefit, args.company_benefit);

    let new = NewActivity {
        date,
        category,
        task: args.task,
        narrative,
        duration_hours: hours,
    };
    let id = ws.log_activity(new, args.polish)?;
    writeln!(out, "Activity logged (ID: {})", id)?;

    let period = PayrollPeriod::containing(date);
    if period != PayrollPeriod::containing(today()) {
        writeln!(out, "Note: this activity belongs to {}", period.label)?;
    }
    Ok(())
}

/// Handle the list command
pub fn handle_list(all: bool, date: Option<&str>, ws: &Workspace, out: &mut dyn Write) -> Result<(), CliError> {
    let period = PayrollPeriod::containing(resolve_date(date)?);
    let activities: Vec<_> = if all {
        ws.state.activities.iter().collect()
    } else {
        ws.state.pending_in(&period)
    };

    if activities.is_empty() {
        if all {
            writeln!(out, "No activities logged")?;
        } else {
            writeln!(out, "No unsubmitted activities in {}", period.label)?;
        }
        return Ok(());
    }

    if !all {
        writeln!(out, "{}", period.label)?;
    }
    for a in activities {
        let marker = if a.submitted { "✓" } else { "○" };
        writeln!(
            out,
            "{} {}  {}  {:>5.1}h  {:<16} {}",
            marker,
            a.id,
            a.date.format("%Y-%m-%d"),
            a.duration_hours,
            a.category.as_str(),
            a.task
        )?;
    }
    Ok(())
}

pub fn handle_delete(id: &str, ws: &mut Workspace, out: &mut dyn Write) -> Result<(), CliError> {
    ws.delete_activity(id)?;
    writeln!(out, "Activity {} deleted", id)?;
    Ok(())
}

pub fn handle_polish(id: &str, ws: &mut Workspace, out: &mut dyn Write) -> Result<(), CliError> {
    let changed = ws.polish_activity(id)?;
    if changed == 0 {
        writeln!(out, "Nothing to polish for {} (text kept as written)", id)?;
    } else {
        writeln!(out, "Polished {} field(s) of {}", changed, id)?;
    }
    Ok(())
}

pub fn handle_suggest(task: &str, ws: &Workspace, out: &mut dyn Write) -> Result<(), CliError> {
    writeln!(out, "{}", ws.suggest_category(task))?;
    Ok(())
}

pub fn handle_period(date: Option<&str>, out: &mut dyn Write) -> Result<(), CliError> {
    let period = PayrollPeriod::containing(resolve_date(date)?);
    writeln!(out, "{}", period.label)?;
    writeln!(out, "  Period:   {} - {}", format_date(period.start), format_date(period.end))?;
    writeln!(out, "  Deadline: {}", period.deadline.format("%b %-d, %Y %H:%M:%S"))?;
    writeln!(out, "  Payment:  {}", format_date(period.payment_date))?;
    if is_deadline_approaching_at(period.deadline, now()) {
        writeln!(out, "  Deadline is less than 48 hours away")?;
    }
    Ok(())
}

pub fn handle_status(date: Option<&str>, ws: &Workspace, out: &mut dyn Write) -> Result<(), CliError> {
    let day = resolve_date(date)?;
    let period = PayrollPeriod::containing(day);
    let summary = ws.summary(&period);

    writeln!(out, "{}", period.label)?;
    writeln!(out, "  Logged hours:        {:.1}h", summary.total_hours)?;
    writeln!(out, "  Activities recorded: {}", summary.activity_count)?;
    let urgent = if is_deadline_approaching_at(period.deadline, now()) { "  (approaching)" } else { "" };
    writeln!(out, "  Submission deadline: {}{}", format_date(period.deadline.date()), urgent)?;
    if is_submission_day(day) {
        writeln!(out, "  Today is a submission day")?;
    }

    if !summary.by_category.is_empty() {
        writeln!(out, "  Breakdown:")?;
        let max = summary.by_category.iter().map(|(_, h)| *h).fold(0.0_f64, f64::max);
        for (category, hours) in &summary.by_category {
            let bar = "█".repeat(((hours / max) * 20.0).round() as usize);
            writeln!(out, "    {:<16} {:<20} {:.1}h", category.as_str(), bar, hours)?;
        }
    }
    Ok(())
}

pub fn handle_submit(date: Option<&str>, ws: &mut Workspace, out: &mut dyn Write) -> Result<(), CliError> {
    let period = PayrollPeriod::containing(resolve_date(date)?);
    writeln!(out, "Submitting {}...", period.label)?;
    let submission = ws.submit(&period, now())?;
    writeln!(
        out,
        "Submitted {} activities ({:.1}h) as {} [{}]",
        submission.activity_count,
        submission.total_hours,
        submission.id,
        submission.remote_id.as_deref().unwrap_or("-")
    )?;
    Ok(())
}

pub fn handle_history(ws: &Workspace, out: &mut dyn Write) -> Result<(), CliError> {
    if ws.state.submissions.is_empty() {
        writeln!(out, "No submissions yet")?;
        return Ok(());
    }
    for s in &ws.state.submissions {
        writeln!(
            out,
            "{}  {:<28} {} - {}  {:>3} activities  {:>6.1}h  {:<8} submitted {}",
            s.id,
            s.period_label,
            format_date(s.period_start),
            format_date(s.period_end),
            s.activity_count,
            s.total_hours,
            s.status,
            s.submitted_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    Ok(())
}

pub fn handle_report(
    output: Option<PathBuf>,
    date: Option<&str>,
    submission: Option<&str>,
    ws: &Workspace,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let report = match submission {
        Some(id) => {
            let submission = ws.state.submission(id).map_err(WorkspaceError::from)?;
            ws.compile_submission_report(submission, now())?
        }
        None => {
            let period = PayrollPeriod::containing(resolve_date(date)?);
            ws.compile_report(&period, today(), now())?
        }
    };
    let dir = output.unwrap_or_else(|| ws.config.get_report_dir());
    let path = write_report(&dir, &report).map_err(WorkspaceError::from)?;
    let kind = if report.is_final { "Final" } else { "Draft" };
    writeln!(out, "{} report written to {}", kind, path.display())?;
    Ok(())
}
