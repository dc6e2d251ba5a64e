use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{BackendConfig, CompanyConfig};
use crate::models::{Activity, Submission};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to write sync snapshot: {0}")]
    SyncWrite(String),
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Acknowledgement returned for a payroll submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub success: bool,
    pub remote_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySettings {
    pub submission_days: [u32; 2],
    pub payment_days: [u32; 2],
    pub company_name: String,
    pub currency: String,
}

/// Remote side of the payroll workflow
pub trait PayrollBackend {
    fn sync_activities(&self, activities: &[Activity]) -> Result<(), BackendError>;
    fn submit_payroll(&self, submission: &Submission) -> Result<SubmitReceipt, BackendError>;
    fn company_settings(&self) -> CompanySettings;
}

/// Stand-in backend: sleeps to imitate latency, always accepts
pub struct MockBackend {
    sync_delay: Duration,
    submit_delay: Duration,
    sync_path: Option<PathBuf>,
    company: CompanyConfig,
}

impl MockBackend {
    pub fn new(config: &BackendConfig, company: &CompanyConfig) -> Self {
        Self {
            sync_delay: Duration::from_millis(config.sync_delay_ms),
            submit_delay: Duration::from_millis(config.submit_delay_ms),
            sync_path: config.sync_path.as_deref().map(crate::utils::expand_path),
            company: company.clone(),
        }
    }

    /// No latency and no snapshot file
    pub fn instant() -> Self {
        Self {
            sync_delay: Duration::ZERO,
            submit_delay: Duration::ZERO,
            sync_path: None,
            company: CompanyConfig::default(),
        }
    }

    pub fn with_sync_path(mut self, path: PathBuf) -> Self {
        self.sync_path = Some(path);
        self
    }
}

impl PayrollBackend for MockBackend {
    fn sync_activities(&self, activities: &[Activity]) -> Result<(), BackendError> {
        thread::sleep(self.sync_delay);

        if let Some(ref path) = self.sync_path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| BackendError::SyncWrite(e.to_string()))?;
            }
            let json = serde_json::to_string_pretty(activities)?;
            fs::write(path, json).map_err(|e| BackendError::SyncWrite(e.to_string()))?;
        }

        debug!(count = activities.len(), "activities synced");
        Ok(())
    }

    fn submit_payroll(&self, submission: &Submission) -> Result<SubmitReceipt, BackendError> {
        thread::sleep(self.submit_delay);

        let remote_id = format!("REM-{}", rand::rng().random_range(0..100_000));
        info!(
            submission = %submission.id,
            remote_id = %remote_id,
            hours = submission.total_hours,
            "payroll submission accepted"
        );
        Ok(SubmitReceipt {
            success: true,
            remote_id,
        })
    }

    fn company_settings(&self) -> CompanySettings {
        CompanySettings {
            submission_days: [
                crate::period::FIRST_HALF_END_DAY,
                crate::period::SECOND_HALF_DEADLINE_DAY,
            ],
            payment_days: [
                crate::period::FIRST_HALF_END_DAY + 1,
                crate::period::SECOND_HALF_PAYMENT_CAP,
            ],
            company_name: self.company.name.clone(),
            currency: self.company.currency.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{NewActivity, SubmissionStatus};

    fn sample_activity() -> Activity {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        Activity::from_new(NewActivity::new("Van inspection", date, 1.0))
    }

    #[test]
    fn sync_writes_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sync.json");
        let backend = MockBackend::instant().with_sync_path(path.clone());

        backend.sync_activities(&[sample_activity()]).unwrap();

        let written: Vec<Activity> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].task, "Van inspection");
    }

    #[test]
    fn submit_returns_remote_id() {
        let activity = sample_activity();
        let submission = Submission {
            id: "abc123xyz".to_string(),
            period_start: activity.date,
            period_end: activity.date,
            period_label: "First Half of May".to_string(),
            submitted_at: activity.date.and_hms_opt(9, 0, 0).unwrap(),
            total_hours: 1.0,
            activity_count: 1,
            activities: vec![activity],
            status: SubmissionStatus::Pending,
            remote_id: None,
        };

        let receipt = MockBackend::instant().submit_payroll(&submission).unwrap();
        assert!(receipt.success);
        let number: u32 = receipt.remote_id.strip_prefix("REM-").unwrap().parse().unwrap();
        assert!(number < 100_000);
    }

    #[test]
    fn company_settings_follow_period_rules() {
        let settings = MockBackend::instant().company_settings();
        assert_eq!(settings.submission_days, [14, 29]);
        assert_eq!(settings.payment_days, [15, 30]);
        assert_eq!(settings.company_name, "Wheels & Keys Inc.");
        assert_eq!(settings.currency, "USD");
    }
}
