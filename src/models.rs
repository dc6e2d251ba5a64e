use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ID_LEN: usize = 9;

/// Generate a short record id (9 lowercase alphanumerics)
pub fn new_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityCategory {
    Maintenance,
    #[serde(rename = "Customer Service")]
    CustomerService,
    Locksmith,
    Transport,
    Admin,
    Other,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 6] = [
        ActivityCategory::Maintenance,
        ActivityCategory::CustomerService,
        ActivityCategory::Locksmith,
        ActivityCategory::Transport,
        ActivityCategory::Admin,
        ActivityCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Maintenance => "Maintenance",
            ActivityCategory::CustomerService => "Customer Service",
            ActivityCategory::Locksmith => "Locksmith",
            ActivityCategory::Transport => "Transport",
            ActivityCategory::Admin => "Admin",
            ActivityCategory::Other => "Other",
        }
    }

    /// Next category in display order, wrapping around
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for ActivityCategory {
    type Err = UnknownCategory;

    /// Accepts display names case-insensitively, plus kebab and snake forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "maintenance" => Ok(ActivityCategory::Maintenance),
            "customerservice" => Ok(ActivityCategory::CustomerService),
            "locksmith" => Ok(ActivityCategory::Locksmith),
            "transport" => Ok(ActivityCategory::Transport),
            "admin" => Ok(ActivityCategory::Admin),
            "other" => Ok(ActivityCategory::Other),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// The free-text reporting fields of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeField {
    Accomplishments,
    PositiveImpact,
    Challenges,
    OvercomingChallenges,
    FuturePlans,
    AchievementStrategy,
    AchievementTimeframe,
    CompanyBenefit,
}

impl NarrativeField {
    pub const ALL: [NarrativeField; 8] = [
        NarrativeField::Accomplishments,
        NarrativeField::PositiveImpact,
        NarrativeField::Challenges,
        NarrativeField::OvercomingChallenges,
        NarrativeField::FuturePlans,
        NarrativeField::AchievementStrategy,
        NarrativeField::AchievementTimeframe,
        NarrativeField::CompanyBenefit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NarrativeField::Accomplishments => "Accomplishments",
            NarrativeField::PositiveImpact => "Positive impact",
            NarrativeField::Challenges => "Challenges",
            NarrativeField::OvercomingChallenges => "Overcoming challenges",
            NarrativeField::FuturePlans => "Future plans",
            NarrativeField::AchievementStrategy => "Achievement strategy",
            NarrativeField::AchievementTimeframe => "Achievement timeframe",
            NarrativeField::CompanyBenefit => "Company benefit",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    #[serde(default)]
    pub accomplishments: Option<String>,
    #[serde(default)]
    pub positive_impact: Option<String>,
    #[serde(default)]
    pub challenges: Option<String>,
    #[serde(default)]
    pub overcoming_challenges: Option<String>,
    #[serde(default)]
    pub future_plans: Option<String>,
    #[serde(default)]
    pub achievement_strategy: Option<String>,
    #[serde(default)]
    pub achievement_timeframe: Option<String>,
    #[serde(default)]
    pub company_benefit: Option<String>,
}

impl Narrative {
    pub fn get(&self, field: NarrativeField) -> Option<&str> {
        let value = match field {
            NarrativeField::Accomplishments => &self.accomplishments,
            NarrativeField::PositiveImpact => &self.positive_impact,
            NarrativeField::Challenges => &self.challenges,
            NarrativeField::OvercomingChallenges => &self.overcoming_challenges,
            NarrativeField::FuturePlans => &self.future_plans,
            NarrativeField::AchievementStrategy => &self.achievement_strategy,
            NarrativeField::AchievementTimeframe => &self.achievement_timeframe,
            NarrativeField::CompanyBenefit => &self.company_benefit,
        };
        value.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn set(&mut self, field: NarrativeField, value: Option<String>) {
        let slot = match field {
            NarrativeField::Accomplishments => &mut self.accomplishments,
            NarrativeField::PositiveImpact => &mut self.positive_impact,
            NarrativeField::Challenges => &mut self.challenges,
            NarrativeField::OvercomingChallenges => &mut self.overcoming_challenges,
            NarrativeField::FuturePlans => &mut self.future_plans,
            NarrativeField::AchievementStrategy => &mut self.achievement_strategy,
            NarrativeField::AchievementTimeframe => &mut self.achievement_timeframe,
            NarrativeField::CompanyBenefit => &mut self.company_benefit,
        };
        *slot = value.filter(|s| !s.trim().is_empty());
    }

    /// Non-empty fields in display order
    pub fn filled(&self) -> Vec<(NarrativeField, &str)> {
        NarrativeField::ALL
            .iter()
            .filter_map(|f| self.get(*f).map(|v| (*f, v)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filled().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub date: NaiveDate,
    pub category: ActivityCategory,
    pub task: String,
    #[serde(flatten)]
    pub narrative: Narrative,
    pub duration_hours: f64,
    pub submitted: bool,
    #[serde(default)]
    pub submission_id: Option<String>,
    pub created_at: String,
}

/// Input for logging a new activity
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub date: NaiveDate,
    pub category: ActivityCategory,
    pub task: String,
    pub narrative: Narrative,
    pub duration_hours: f64,
}

impl NewActivity {
    pub fn new(task: impl Into<String>, date: NaiveDate, duration_hours: f64) -> Self {
        Self {
            date,
            category: ActivityCategory::Maintenance,
            task: task.into(),
            narrative: Narrative::default(),
            duration_hours,
        }
    }

    pub fn with_category(mut self, category: ActivityCategory) -> Self {
        self.category = category;
        self
    }
}

impl Activity {
    pub fn from_new(new: NewActivity) -> Self {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            id: new_id(),
            date: new.date,
            category: new.category,
            task: new.task,
            narrative: new.narrative,
            duration_hours: new.duration_hours,
            submitted: false,
            submission_id: None,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Paid,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "Pending",
            SubmissionStatus::Approved => "Approved",
            SubmissionStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown submission status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for SubmissionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(SubmissionStatus::Pending),
            "Approved" => Ok(SubmissionStatus::Approved),
            "Paid" => Ok(SubmissionStatus::Paid),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Snapshot of a period's activities at the moment it was submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub period_label: String,
    pub submitted_at: NaiveDateTime,
    pub total_hours: f64,
    pub activity_count: usize,
    pub activities: Vec<Activity>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub remote_id: Option<String>,
}
