use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::assistant::{self, TextAssistant, build_assistant};
use crate::backend::{MockBackend, PayrollBackend};
use crate::config::Config;
use crate::ledger::{LedgerError, LogState, PeriodSummary};
use crate::models::{ActivityCategory, Narrative, NarrativeField, NewActivity, Submission};
use crate::period::{PayrollPeriod, format_date, is_submission_day};
use crate::report::{PeriodReport, ReportError};
use crate::store::{Store, StoreError, open_store};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("Payroll accepted submission {submission_id} (receipt {remote_id}) but saving it failed: {source}")]
    UnsavedSubmission {
        submission_id: String,
        remote_id: String,
        #[source]
        source: Box<WorkspaceError>,
    },
}

/// Loaded log state together with the collaborators that act on it
pub struct Workspace {
    pub config: Config,
    pub state: LogState,
    store: Box<dyn Store>,
    assistant: Box<dyn TextAssistant>,
    backend: Box<dyn PayrollBackend>,
}

impl Workspace {
    /// Open the configured store, assistant and backend
    pub fn open(config: Config) -> Result<Self, WorkspaceError> {
        let store = open_store(&config)?;
        let assistant = build_assistant(&config.assistant, &config.company.name);
        let mut backend_config = config.backend.clone();
        if backend_config.sync_path.is_none() {
            backend_config.sync_path = Some(
                config
                    .get_database_path()
                    .with_file_name("activities_sync.json")
                    .to_string_lossy()
                    .to_string(),
            );
        }
        let backend = Box::new(MockBackend::new(&backend_config, &config.company));
        Self::with_parts(config, store, assistant, backend)
    }

    pub fn with_parts(
        config: Config,
        store: Box<dyn Store>,
        assistant: Box<dyn TextAssistant>,
        backend: Box<dyn PayrollBackend>,
    ) -> Result<Self, WorkspaceError> {
        let state = store.load()?;
        debug!(
            activities = state.activities.len(),
            submissions = state.submissions.len(),
            "log loaded"
        );
        Ok(Self {
            config,
            state,
            store,
            assistant,
            backend,
        })
    }

    pub fn assistant(&self) -> &dyn TextAssistant {
        self.assistant.as_ref()
    }

    /// Persist the state, then push activities to the backend
    ///
    /// A failed sync is logged and otherwise ignored; the local save is what
    /// counts.
    pub fn commit(&mut self) -> Result<(), WorkspaceError> {
        self.store.save(&self.state)?;
        if let Err(e) = self.backend.sync_activities(&self.state.activities) {
            warn!("activity sync failed: {}", e);
        }
        Ok(())
    }

    pub fn suggest_category(&self, task: &str) -> ActivityCategory {
        assistant::classify_or_other(self.assistant(), task)
    }

    /// Run every filled narrative field through the assistant
    pub fn polish_narrative(&self, task: &str, narrative: &mut Narrative) -> usize {
        let mut changed = 0;
        let fields: Vec<(NarrativeField, String)> = narrative
            .filled()
            .into_iter()
            .map(|(f, t)| (f, t.to_string()))
            .collect();
        for (field, text) in fields {
            let polished = assistant::enhance_or_original(self.assistant(), task, &text);
            if polished != text {
                narrative.set(field, Some(polished));
                changed += 1;
            }
        }
        changed
    }

    pub fn log_activity(&mut self, mut new: NewActivity, polish: bool) -> Result<String, WorkspaceError> {
        if polish {
            let task = new.task.clone();
            self.polish_narrative(&task, &mut new.narrative);
        }
        let id = self.state.add_activity(new)?.id.clone();
        self.commit()?;
        Ok(id)
    }

    /// Polish an unsubmitted activity in place; returns how many fields changed
    pub fn polish_activity(&mut self, id: &str) -> Result<usize, WorkspaceError> {
        let activity = self.state.editable_activity(id)?;
        let task = activity.task.clone();
        let mut narrative = activity.narrative.clone();

        let changed = self.polish_narrative(&task, &mut narrative);
        if changed > 0 {
            self.state.editable_activity(id)?.narrative = narrative;
            self.commit()?;
        }
        Ok(changed)
    }

    pub fn delete_activity(&mut self, id: &str) -> Result<(), WorkspaceError> {
        self.state.delete_activity(id)?;
        self.commit()?;
        Ok(())
    }

    pub fn summary(&self, period: &PayrollPeriod) -> PeriodSummary {
        self.state.summarize(period)
    }

    pub fn submit(&mut self, period: &PayrollPeriod, now: NaiveDateTime) -> Result<Submission, WorkspaceError> {
        let submission = self
            .state
            .submit_period(period, self.backend.as_ref(), now)?
            .clone();
        // The backend already holds this submission; a retry would send it twice
        if let Err(e) = self.commit() {
            let remote_id = submission.remote_id.clone().unwrap_or_default();
            error!(submission = %submission.id, remote_id = %remote_id, "submission not saved: {}", e);
            return Err(WorkspaceError::UnsavedSubmission {
                submission_id: submission.id,
                remote_id,
                source: Box::new(e),
            });
        }
        Ok(submission)
    }

    /// Report of the pending activities of `period`
    pub fn compile_report(
        &self,
        period: &PayrollPeriod,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<PeriodReport, WorkspaceError> {
        let activities: Vec<_> = self.state.pending_in(period).into_iter().cloned().collect();
        if activities.is_empty() {
            return Err(ReportError::NoActivities(period.label.clone()).into());
        }
        let summary = assistant::summarize_or_default(self.assistant(), &activities);
        Ok(PeriodReport::compile(
            &self.backend.company_settings().company_name,
            &period.label,
            activities,
            summary,
            now,
            is_submission_day(today),
        )?)
    }

    /// Report of the activities frozen in a past submission
    ///
    /// Labelled by date range, e.g. `Feb 1, 2024 - Feb 14, 2024`, and always
    /// final since the snapshot can no longer change.
    pub fn compile_submission_report(
        &self,
        submission: &Submission,
        now: NaiveDateTime,
    ) -> Result<PeriodReport, WorkspaceError> {
        let label = format!(
            "{} - {}",
            format_date(submission.period_start),
            format_date(submission.period_end)
        );
        if submission.activities.is_empty() {
            return Err(ReportError::NoActivities(label).into());
        }
        let summary = assistant::summarize_or_default(self.assistant(), &submission.activities);
        Ok(PeriodReport::compile(
            &self.backend.company_settings().company_name,
            &label,
            submission.activities.clone(),
            summary,
            now,
            true,
        )?)
    }
}
