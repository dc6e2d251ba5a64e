use chrono::{NaiveDate, NaiveDateTime};
use wk::assistant::{AssistantError, OfflineAssistant, SUMMARY_FALLBACK, TextAssistant};
use wk::backend::MockBackend;
use wk::ledger::LedgerError;
use wk::models::{Activity, ActivityCategory, NarrativeField, NewActivity};
use wk::store::{JsonFileStore, MemoryStore, Store};
use wk::workspace::WorkspaceError;
use wk::{Config, PayrollPeriod, Workspace};

/// Assistant with fixed, recognisable answers
struct Scripted;

impl TextAssistant for Scripted {
    fn enhance(&self, _task: &str, draft: &str) -> Result<String, AssistantError> {
        Ok(format!("Professionally: {}", draft))
    }

    fn classify(&self, _task: &str) -> Result<ActivityCategory, AssistantError> {
        Ok(ActivityCategory::Locksmith)
    }

    fn summarize(&self, activities: &[Activity]) -> Result<String, AssistantError> {
        Ok(format!("{} activities completed.", activities.len()))
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(date: NaiveDate, h: u32) -> NaiveDateTime {
    date.and_hms_opt(h, 0, 0).unwrap()
}

fn workspace(assistant: Box<dyn TextAssistant>) -> Workspace {
    Workspace::with_parts(
        Config::default(),
        Box::new(MemoryStore::default()),
        assistant,
        Box::new(MockBackend::instant()),
    )
    .unwrap()
}

fn new_activity(task: &str, date: NaiveDate, hours: f64, accomplishments: &str) -> NewActivity {
    let mut new = NewActivity::new(task, date, hours);
    new.narrative.set(NarrativeField::Accomplishments, Some(accomplishments.to_string()));
    new
}

#[test]
fn log_with_polish_rewrites_narrative_before_saving() {
    let mut ws = workspace(Box::new(Scripted));
    let id = ws
        .log_activity(new_activity("Rekey", ymd(2024, 5, 3), 2.0, "did the locks"), true)
        .unwrap();

    let activity = ws.state.activity(&id).unwrap();
    assert_eq!(
        activity.narrative.get(NarrativeField::Accomplishments),
        Some("Professionally: did the locks")
    );
    assert_eq!(activity.narrative.get(NarrativeField::Challenges), None);
}

#[test]
fn offline_assistant_never_blocks_logging() {
    let mut ws = workspace(Box::new(OfflineAssistant));
    let id = ws
        .log_activity(new_activity("Rekey", ymd(2024, 5, 3), 2.0, "did the locks"), true)
        .unwrap();
    assert_eq!(ws.polish_activity(&id).unwrap(), 0);
    assert_eq!(
        ws.state.activity(&id).unwrap().narrative.get(NarrativeField::Accomplishments),
        Some("did the locks")
    );
    assert_eq!(ws.suggest_category("Rekey"), ActivityCategory::Other);
}

#[test]
fn submit_snapshots_only_the_period() {
    let mut ws = workspace(Box::new(Scripted));
    let first = ws.log_activity(new_activity("A", ymd(2024, 5, 2), 1.5, "x"), false).unwrap();
    let second = ws.log_activity(new_activity("B", ymd(2024, 5, 14), 2.0, "y"), false).unwrap();
    let later = ws.log_activity(new_activity("C", ymd(2024, 5, 15), 4.0, "z"), false).unwrap();

    let period = PayrollPeriod::containing(ymd(2024, 5, 10));
    let submission = ws.submit(&period, at(ymd(2024, 5, 14), 18)).unwrap();

    assert_eq!(submission.activity_count, 2);
    assert_eq!(submission.total_hours, 3.5);
    assert_eq!(submission.period_label, "First Half of May");
    assert!(submission.remote_id.as_deref().unwrap().starts_with("REM-"));

    for id in [&first, &second] {
        let a = ws.state.activity(id).unwrap();
        assert!(a.submitted);
        assert_eq!(a.submission_id.as_deref(), Some(submission.id.as_str()));
    }
    assert!(!ws.state.activity(&later).unwrap().submitted);

    // Submitted work is locked
    assert!(matches!(
        ws.delete_activity(&first),
        Err(WorkspaceError::Ledger(LedgerError::AlreadySubmitted(_)))
    ));
    assert!(matches!(
        ws.polish_activity(&first),
        Err(WorkspaceError::Ledger(LedgerError::AlreadySubmitted(_)))
    ));

    // Nothing left to submit in that period
    assert!(matches!(
        ws.submit(&period, at(ymd(2024, 5, 14), 19)),
        Err(WorkspaceError::Ledger(LedgerError::EmptyPeriod(_)))
    ));
}

#[test]
fn report_uses_summary_and_final_flag() {
    let mut ws = workspace(Box::new(Scripted));
    ws.log_activity(new_activity("Van keys", ymd(2024, 4, 20), 3.0, "cut"), false).unwrap();
    let period = PayrollPeriod::containing(ymd(2024, 4, 20));

    let draft = ws.compile_report(&period, ymd(2024, 4, 21), at(ymd(2024, 4, 21), 9)).unwrap();
    assert!(!draft.is_final);
    assert_eq!(draft.summary, "1 activities completed.");

    let last = ws.compile_report(&period, ymd(2024, 4, 29), at(ymd(2024, 4, 29), 9)).unwrap();
    assert!(last.is_final);
    assert!(last.render().contains("(FINAL)"));
}

#[test]
fn report_falls_back_when_summary_fails() {
    let mut ws = workspace(Box::new(OfflineAssistant));
    ws.log_activity(new_activity("Van keys", ymd(2024, 4, 2), 3.0, "cut"), false).unwrap();
    let period = PayrollPeriod::containing(ymd(2024, 4, 2));
    let report = ws.compile_report(&period, ymd(2024, 4, 3), at(ymd(2024, 4, 3), 9)).unwrap();
    assert_eq!(report.summary, SUMMARY_FALLBACK);
}

#[test]
fn submitted_period_reports_from_its_snapshot() {
    let mut ws = workspace(Box::new(Scripted));
    ws.log_activity(new_activity("Lock swap", ymd(2024, 2, 3), 2.0, "new cylinders"), false).unwrap();
    ws.log_activity(new_activity("Key cutting", ymd(2024, 2, 9), 1.0, "twelve keys"), false).unwrap();
    let period = PayrollPeriod::containing(ymd(2024, 2, 3));
    let submission = ws.submit(&period, at(ymd(2024, 2, 14), 17)).unwrap();

    // Later work in another period does not leak into the snapshot
    ws.log_activity(new_activity("Van service", ymd(2024, 2, 20), 3.0, "oil"), false).unwrap();

    let report = ws.compile_submission_report(&submission, at(ymd(2024, 3, 2), 10)).unwrap();
    assert_eq!(report.period_label, "Feb 1, 2024 - Feb 14, 2024");
    assert_eq!(report.activities, submission.activities);
    assert_eq!(report.total_hours(), 3.0);
    assert_eq!(report.summary, "2 activities completed.");
    assert!(report.is_final);
}

#[test]
fn empty_period_has_no_report() {
    let ws = workspace(Box::new(Scripted));
    let period = PayrollPeriod::containing(ymd(2024, 4, 2));
    assert!(ws.compile_report(&period, ymd(2024, 4, 3), at(ymd(2024, 4, 3), 9)).is_err());
}

#[test]
fn state_survives_reopen_through_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wk.json");

    let id = {
        let mut ws = Workspace::with_parts(
            Config::default(),
            Box::new(JsonFileStore::new(&path)),
            Box::new(OfflineAssistant),
            Box::new(MockBackend::instant()),
        )
        .unwrap();
        let id = ws.log_activity(new_activity("Keep me", ymd(2024, 6, 1), 1.0, "a"), false).unwrap();
        ws.submit(&PayrollPeriod::containing(ymd(2024, 6, 1)), at(ymd(2024, 6, 14), 12))
            .unwrap();
        id
    };

    let reopened = JsonFileStore::new(&path).load().unwrap();
    assert_eq!(reopened.submissions.len(), 1);
    assert!(reopened.activities.iter().any(|a| a.id == id && a.submitted));
}

#[test]
fn sync_snapshot_follows_every_commit() {
    let dir = tempfile::tempdir().unwrap();
    let sync = dir.path().join("activities_sync.json");
    let mut ws = Workspace::with_parts(
        Config::default(),
        Box::new(MemoryStore::default()),
        Box::new(OfflineAssistant),
        Box::new(MockBackend::instant().with_sync_path(sync.clone())),
    )
    .unwrap();

    let id = ws.log_activity(new_activity("Sync me", ymd(2024, 6, 1), 1.0, "a"), false).unwrap();
    let synced: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&sync).unwrap()).unwrap();
    assert_eq!(synced[0]["id"], id.as_str());

    ws.delete_activity(&id).unwrap();
    let synced: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&sync).unwrap()).unwrap();
    assert_eq!(synced.as_array().unwrap().len(), 0);
}

/// Memory store whose saves start failing once `broken` is set
struct BreakableStore {
    inner: MemoryStore,
    broken: std::rc::Rc<std::cell::Cell<bool>>,
}

impl Store for BreakableStore {
    fn load(&self) -> Result<wk::LogState, wk::store::StoreError> {
        self.inner.load()
    }

    fn save(&mut self, state: &wk::LogState) -> Result<(), wk::store::StoreError> {
        if self.broken.get() {
            return Err(wk::store::StoreError::Io {
                path: "wk.json".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.save(state)
    }
}

#[test]
fn unsaved_submission_reports_its_receipt() {
    let broken = std::rc::Rc::new(std::cell::Cell::new(false));
    let store = BreakableStore {
        inner: MemoryStore::default(),
        broken: broken.clone(),
    };
    let mut ws = Workspace::with_parts(
        Config::default(),
        Box::new(store),
        Box::new(OfflineAssistant),
        Box::new(MockBackend::instant()),
    )
    .unwrap();
    let date = ymd(2024, 7, 2);
    ws.log_activity(NewActivity::new("Lockout call", date, 1.0), false).unwrap();

    broken.set(true);
    let period = PayrollPeriod::containing(date);
    match ws.submit(&period, at(date, 16)) {
        Err(WorkspaceError::UnsavedSubmission { remote_id, source, .. }) => {
            assert!(remote_id.starts_with("REM-"));
            assert!(matches!(*source, WorkspaceError::Store(_)));
        }
        other => panic!("expected an unsaved submission error, got {:?}", other.map(|s| s.id)),
    }
}
