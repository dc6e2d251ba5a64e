use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, PayrollBackend};
use crate::models::{Activity, ActivityCategory, NewActivity, Submission, SubmissionStatus, new_id};
use crate::period::PayrollPeriod;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Activity not found: {0}")]
    NotFound(String),
    #[error("Activity {0} has already been submitted")]
    AlreadySubmitted(String),
    #[error("Submission not found: {0}")]
    SubmissionNotFound(String),
    #[error("No unsubmitted activities in {0}")]
    EmptyPeriod(String),
    #[error("Invalid activity: {0}")]
    Invalid(String),
    #[error("Submission was rejected by the payroll backend")]
    Rejected,
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Everything the log persists: activities and past submissions, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogState {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

/// Aggregates for the unsubmitted work of one period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub total_hours: f64,
    pub activity_count: usize,
    pub by_category: Vec<(ActivityCategory, f64)>,
}

impl LogState {
    pub fn add_activity(&mut self, new: NewActivity) -> Result<&Activity, LedgerError> {
        if new.task.trim().is_empty() {
            return Err(LedgerError::Invalid("task title is empty".to_string()));
        }
        if !new.duration_hours.is_finite() || new.duration_hours <= 0.0 {
            return Err(LedgerError::Invalid(format!(
                "duration must be a positive number of hours, got {}",
                new.duration_hours
            )));
        }

        let activity = Activity::from_new(new);
        debug!(id = %activity.id, date = %activity.date, "activity logged");
        self.activities.insert(0, activity);
        Ok(&self.activities[0])
    }

    /// Remove an activity; submitted activities belong to their submission
    pub fn delete_activity(&mut self, id: &str) -> Result<Activity, LedgerError> {
        let index = self
            .activities
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        if self.activities[index].submitted {
            return Err(LedgerError::AlreadySubmitted(id.to_string()));
        }

        Ok(self.activities.remove(index))
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn submission(&self, id: &str) -> Result<&Submission, LedgerError> {
        self.submissions
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| LedgerError::SubmissionNotFound(id.to_string()))
    }

    /// Mutable access to an activity that has not been submitted yet
    pub fn editable_activity(&mut self, id: &str) -> Result<&mut Activity, LedgerError> {
        let activity = self
            .activities
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        if activity.submitted {
            return Err(LedgerError::AlreadySubmitted(id.to_string()));
        }
        Ok(activity)
    }

    /// Unsubmitted activities dated inside `period`
    pub fn pending_in(&self, period: &PayrollPeriod) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| !a.submitted && period.contains(a.date))
            .collect()
    }

    pub fn summarize(&self, period: &PayrollPeriod) -> PeriodSummary {
        let pending = self.pending_in(period);
        let total_hours = pending.iter().map(|a| a.duration_hours).sum();

        let by_category = ActivityCategory::ALL
            .iter()
            .filter_map(|category| {
                let hours: f64 = pending
                    .iter()
                    .filter(|a| a.category == *category)
                    .map(|a| a.duration_hours)
                    .sum();
                (hours > 0.0).then_some((*category, hours))
            })
            .collect();

        PeriodSummary {
            total_hours,
            activity_count: pending.len(),
            by_category,
        }
    }

    /// Build the snapshot for `period` without changing any state
    pub fn prepare_submission(
        &self,
        period: &PayrollPeriod,
        now: NaiveDateTime,
    ) -> Result<Submission, LedgerError> {
        let activities: Vec<Activity> = self.pending_in(period).into_iter().cloned().collect();
        if activities.is_empty() {
            return Err(LedgerError::EmptyPeriod(period.label.clone()));
        }

        Ok(Submission {
            id: new_id(),
            period_start: period.start,
            period_end: period.end,
            period_label: period.label.clone(),
            submitted_at: now,
            total_hours: activities.iter().map(|a| a.duration_hours).sum(),
            activity_count: activities.len(),
            activities,
            status: SubmissionStatus::Pending,
            remote_id: None,
        })
    }

    /// Mark the snapshot's activities as submitted and keep the snapshot
    pub fn record_submission(&mut self, submission: Submission) {
        for activity in self.activities.iter_mut() {
            if submission.activities.iter().any(|s| s.id == activity.id) {
                activity.submitted = true;
                activity.submission_id = Some(submission.id.clone());
            }
        }
        self.submissions.insert(0, submission);
    }

    /// Submit the pending work of `period` through `backend`
    ///
    /// State is only touched once the backend has accepted the submission.
    pub fn submit_period(
        &mut self,
        period: &PayrollPeriod,
        backend: &dyn PayrollBackend,
        now: NaiveDateTime,
    ) -> Result<&Submission, LedgerError> {
        let mut submission = self.prepare_submission(period, now)?;
        let receipt = backend.submit_payroll(&submission)?;
        if !receipt.success {
            warn!(submission = %submission.id, "payroll backend rejected submission");
            return Err(LedgerError::Rejected);
        }

        submission.remote_id = Some(receipt.remote_id);
        info!(
            submission = %submission.id,
            period = %submission.period_label,
            activities = submission.activity_count,
            "period submitted"
        );
        self.record_submission(submission);
        Ok(&self.submissions[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CompanySettings, MockBackend, SubmitReceipt};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log(state: &mut LogState, task: &str, date: NaiveDate, hours: f64, cat: ActivityCategory) -> String {
        state
            .add_activity(NewActivity::new(task, date, hours).with_category(cat))
            .unwrap()
            .id
            .clone()
    }

    struct RejectingBackend;

    impl PayrollBackend for RejectingBackend {
        fn sync_activities(&self, _: &[Activity]) -> Result<(), BackendError> {
            Ok(())
        }
        fn submit_payroll(&self, _: &Submission) -> Result<SubmitReceipt, BackendError> {
            Ok(SubmitReceipt {
                success: false,
                remote_id: String::new(),
            })
        }
        fn company_settings(&self) -> CompanySettings {
            MockBackend::instant().company_settings()
        }
    }

    #[test]
    fn new_activities_are_prepended() {
        let mut state = LogState::default();
        log(&mut state, "first", ymd(2024, 3, 1), 1.0, ActivityCategory::Admin);
        log(&mut state, "second", ymd(2024, 3, 2), 1.0, ActivityCategory::Admin);
        assert_eq!(state.activities[0].task, "second");
        assert!(!state.activities[0].submitted);
    }

    #[test]
    fn rejects_empty_title_and_bad_hours() {
        let mut state = LogState::default();
        let date = ymd(2024, 3, 1);
        assert!(matches!(
            state.add_activity(NewActivity::new("  ", date, 1.0)),
            Err(LedgerError::Invalid(_))
        ));
        assert!(matches!(
            state.add_activity(NewActivity::new("task", date, 0.0)),
            Err(LedgerError::Invalid(_))
        ));
        assert!(matches!(
            state.add_activity(NewActivity::new("task", date, f64::NAN)),
            Err(LedgerError::Invalid(_))
        ));
        assert!(state.activities.is_empty());
    }

    #[test]
    fn summary_only_counts_pending_activities_in_period() {
        let mut state = LogState::default();
        log(&mut state, "rekey", ymd(2024, 3, 2), 2.0, ActivityCategory::Locksmith);
        log(&mut state, "drive", ymd(2024, 3, 14), 1.5, ActivityCategory::Transport);
        log(&mut state, "lockout", ymd(2024, 3, 5), 0.5, ActivityCategory::Locksmith);
        log(&mut state, "later", ymd(2024, 3, 15), 4.0, ActivityCategory::Admin);

        let period = PayrollPeriod::containing(ymd(2024, 3, 3));
        let summary = state.summarize(&period);
        assert_eq!(summary.activity_count, 3);
        assert_eq!(summary.total_hours, 4.0);
        assert_eq!(
            summary.by_category,
            vec![
                (ActivityCategory::Locksmith, 2.5),
                (ActivityCategory::Transport, 1.5)
            ]
        );
    }

    #[test]
    fn submit_marks_activities_and_stores_snapshot() {
        let mut state = LogState::default();
        let a = log(&mut state, "rekey", ymd(2024, 3, 2), 2.0, ActivityCategory::Locksmith);
        let b = log(&mut state, "later", ymd(2024, 3, 20), 3.0, ActivityCategory::Admin);
        let period = PayrollPeriod::containing(ymd(2024, 3, 2));
        let now = ymd(2024, 3, 14).and_hms_opt(17, 0, 0).unwrap();

        let submission = state
            .submit_period(&period, &MockBackend::instant(), now)
            .unwrap()
            .clone();

        assert_eq!(submission.activity_count, 1);
        assert_eq!(submission.total_hours, 2.0);
        assert_eq!(submission.status, SubmissionStatus::Pending);
        assert!(submission.remote_id.as_deref().unwrap().starts_with("REM-"));
        assert_eq!(submission.activities[0].id, a);

        let submitted = state.activity(&a).unwrap();
        assert!(submitted.submitted);
        assert_eq!(submitted.submission_id.as_deref(), Some(submission.id.as_str()));
        assert!(!state.activity(&b).unwrap().submitted);
        assert_eq!(state.submissions.len(), 1);

        // Nothing left to submit for the same period
        assert!(matches!(
            state.submit_period(&period, &MockBackend::instant(), now),
            Err(LedgerError::EmptyPeriod(_))
        ));
    }

    #[test]
    fn submitted_activities_cannot_be_deleted_or_edited() {
        let mut state = LogState::default();
        let id = log(&mut state, "rekey", ymd(2024, 3, 2), 2.0, ActivityCategory::Locksmith);
        let period = PayrollPeriod::containing(ymd(2024, 3, 2));
        let now = ymd(2024, 3, 10).and_hms_opt(8, 0, 0).unwrap();
        state.submit_period(&period, &MockBackend::instant(), now).unwrap();

        assert!(matches!(state.delete_activity(&id), Err(LedgerError::AlreadySubmitted(_))));
        assert!(matches!(state.editable_activity(&id), Err(LedgerError::AlreadySubmitted(_))));
        assert_eq!(state.activities.len(), 1);
    }

    #[test]
    fn delete_unknown_and_pending() {
        let mut state = LogState::default();
        let id = log(&mut state, "rekey", ymd(2024, 3, 2), 2.0, ActivityCategory::Locksmith);
        assert!(matches!(state.delete_activity("nope"), Err(LedgerError::NotFound(_))));
        let removed = state.delete_activity(&id).unwrap();
        assert_eq!(removed.task, "rekey");
        assert!(state.activities.is_empty());
    }

    #[test]
    fn rejected_submission_leaves_state_untouched() {
        let mut state = LogState::default();
        log(&mut state, "rekey", ymd(2024, 3, 2), 2.0, ActivityCategory::Locksmith);
        let before = state.clone();
        let period = PayrollPeriod::containing(ymd(2024, 3, 2));
        let now = ymd(2024, 3, 10).and_hms_opt(8, 0, 0).unwrap();

        assert!(matches!(
            state.submit_period(&period, &RejectingBackend, now),
            Err(LedgerError::Rejected)
        ));
        assert_eq!(state, before);
    }
}
