use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use ratatui::widgets::ListState;

use crate::Config;
use crate::models::{Activity, ActivityCategory, Narrative, NarrativeField, NewActivity, Submission};
use crate::period::PayrollPeriod;
use crate::report::write_report;
use crate::utils::{parse_date, parse_hours, today};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Logs,
    History,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Dashboard, Tab::Logs, Tab::History];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Logs => "Logs",
            Tab::History => "History",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Dashboard => 0,
            Tab::Logs => 1,
            Tab::History => 2,
        }
    }

    pub fn left(&self) -> Tab {
        Tab::ALL[self.index().saturating_sub(1)]
    }

    pub fn right(&self) -> Tab {
        Tab::ALL[(self.index() + 1).min(Tab::ALL.len() - 1)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Create,
    ConfirmDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Date,
    Task,
    Category,
    Hours,
    Narrative(NarrativeField),
}

impl FormField {
    /// Fields in tab order
    pub fn all() -> Vec<FormField> {
        let mut fields = vec![
            FormField::Date,
            FormField::Task,
            FormField::Category,
            FormField::Hours,
        ];
        fields.extend(NarrativeField::ALL.iter().map(|f| FormField::Narrative(*f)));
        fields
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Date => "Date",
            FormField::Task => "Task",
            FormField::Category => "Category",
            FormField::Hours => "Hours",
            FormField::Narrative(f) => f.label(),
        }
    }
}

/// Input state of the "new activity" form
#[derive(Debug, Clone)]
pub struct ActivityForm {
    pub date: String,
    pub task: String,
    pub category: ActivityCategory,
    pub hours: String,
    /// One entry per `NarrativeField::ALL`
    pub narrative: Vec<String>,
    pub current: usize,
}

impl ActivityForm {
    pub fn new() -> Self {
        Self {
            date: today().format("%Y-%m-%d").to_string(),
            task: String::new(),
            category: ActivityCategory::Maintenance,
            hours: "1".to_string(),
            narrative: vec![String::new(); NarrativeField::ALL.len()],
            current: 0,
        }
    }

    pub fn current_field(&self) -> FormField {
        FormField::all()[self.current]
    }

    pub fn next_field(&mut self) {
        self.current = (self.current + 1) % FormField::all().len();
    }

    pub fn prev_field(&mut self) {
        let len = FormField::all().len();
        self.current = (self.current + len - 1) % len;
    }

    fn narrative_index(field: NarrativeField) -> usize {
        NarrativeField::ALL.iter().position(|f| *f == field).unwrap_or(0)
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Date => &self.date,
            FormField::Task => &self.task,
            FormField::Category => self.category.as_str(),
            FormField::Hours => &self.hours,
            FormField::Narrative(f) => &self.narrative[Self::narrative_index(f)],
        }
    }

    /// Text buffer behind the current field; `None` for the category selector
    fn current_text_mut(&mut self) -> Option<&mut String> {
        match self.current_field() {
            FormField::Date => Some(&mut self.date),
            FormField::Task => Some(&mut self.task),
            FormField::Category => None,
            FormField::Hours => Some(&mut self.hours),
            FormField::Narrative(f) => Some(&mut self.narrative[Self::narrative_index(f)]),
        }
    }

    pub fn insert_char(&mut self, c: char) {
        match self.current_text_mut() {
            Some(text) => text.push(c),
            None if c == ' ' => self.category = self.category.next(),
            None => {}
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.current_text_mut() {
            text.pop();
        }
    }

    pub fn cycle_category(&mut self, forward: bool) {
        if forward {
            self.category = self.category.next();
        } else {
            // Walk forward len-1 times
            for _ in 0..ActivityCategory::ALL.len() - 1 {
                self.category = self.category.next();
            }
        }
    }

    /// Validate the inputs into an activity ready to log
    pub fn to_new_activity(&self) -> Result<NewActivity, String> {
        let date = parse_date(&self.date).map_err(|_| format!("Invalid date '{}' (use YYYY-MM-DD)", self.date))?;
        let task = self.task.trim();
        if task.is_empty() {
            return Err("Task title is required".to_string());
        }
        let duration_hours = parse_hours(&self.hours)?;

        let mut narrative = Narrative::default();
        for (field, text) in NarrativeField::ALL.iter().zip(&self.narrative) {
            narrative.set(*field, Some(text.clone()));
        }

        Ok(NewActivity {
            date,
            category: self.category,
            task: task.to_string(),
            narrative,
            duration_hours,
        })
    }
}

impl Default for ActivityForm {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub current_tab: Tab,
    pub mode: Mode,
    pub selected_index: usize,
    pub list_state: ListState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            current_tab: Tab::Dashboard,
            mode: Mode::View,
            selected_index: 0,
            list_state: ListState::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct ModalState {
    /// Id of the activity awaiting delete confirmation
    pub delete_confirmation: Option<String>,
    /// 0 = Delete, 1 = Cancel
    pub delete_modal_selection: usize,
}

pub struct App {
    pub workspace: Workspace,
    pub ui: UiState,
    pub form: Option<ActivityForm>,
    pub modals: ModalState,
    pub status: StatusState,
}

impl App {
    pub fn new(workspace: Workspace) -> Self {
        let mut app = Self {
            workspace,
            ui: UiState::default(),
            form: None,
            modals: ModalState::default(),
            status: StatusState::default(),
        };
        app.sync_list_state();
        app
    }

    pub fn config(&self) -> &Config {
        &self.workspace.config
    }

    pub fn current_period(&self) -> PayrollPeriod {
        PayrollPeriod::current()
    }

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.workspace.state.activities
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.workspace.state.submissions
    }

    pub fn selected_activity(&self) -> Option<&Activity> {
        if self.ui.current_tab != Tab::Logs {
            return None;
        }
        self.activities().get(self.ui.selected_index)
    }

    pub fn selected_submission(&self) -> Option<&Submission> {
        if self.ui.current_tab != Tab::History {
            return None;
        }
        self.submissions().get(self.ui.selected_index)
    }

    fn current_len(&self) -> usize {
        match self.ui.current_tab {
            Tab::Dashboard => 0,
            Tab::Logs => self.activities().len(),
            Tab::History => self.submissions().len(),
        }
    }

    pub fn sync_list_state(&mut self) {
        if self.current_len() == 0 {
            self.ui.list_state.select(None);
        } else {
            self.ui.list_state.select(Some(self.ui.selected_index));
        }
    }

    /// Keep the selection inside the current list after it shrinks
    pub fn adjust_selected_index(&mut self) {
        let len = self.current_len();
        if self.ui.selected_index >= len {
            self.ui.selected_index = len.saturating_sub(1);
        }
        self.sync_list_state();
    }

    pub fn move_selection_up(&mut self) {
        if self.ui.selected_index > 0 {
            self.ui.selected_index -= 1;
            self.sync_list_state();
        }
    }

    pub fn move_selection_down(&mut self) {
        if self.ui.selected_index < self.current_len().saturating_sub(1) {
            self.ui.selected_index += 1;
            self.sync_list_state();
        }
    }

    pub fn switch_tab(&mut self, new_tab: Tab) {
        self.ui.current_tab = new_tab;
        self.ui.selected_index = 0;
        self.sync_list_state();
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Check if status message should be auto-cleared (after 3 seconds)
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    pub fn enter_create_mode(&mut self) {
        self.form = Some(ActivityForm::new());
        self.ui.mode = Mode::Create;
    }

    pub fn cancel_create(&mut self) {
        self.form = None;
        self.ui.mode = Mode::View;
    }

    /// Fill the form's category from the assistant
    pub fn suggest_category(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if form.task.trim().is_empty() {
            self.set_status_message("Enter a task title first".to_string());
            return;
        }
        let category = self.workspace.suggest_category(&form.task);
        form.category = category;
        self.set_status_message(format!("Suggested category: {}", category));
    }

    pub fn save_form(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let new = match form.to_new_activity() {
            Ok(new) => new,
            Err(msg) => {
                self.set_status_message(msg);
                return;
            }
        };
        match self.workspace.log_activity(new, false) {
            Ok(id) => {
                self.form = None;
                self.ui.mode = Mode::View;
                self.switch_tab(Tab::Logs);
                self.set_status_message(format!("Activity logged ({})", id));
            }
            Err(e) => self.set_status_message(format!("Failed to log activity: {}", e)),
        }
    }

    /// Open the delete confirmation for the selected activity
    pub fn request_delete(&mut self) {
        let Some(activity) = self.selected_activity() else {
            return;
        };
        if activity.submitted {
            self.set_status_message("Submitted activities cannot be deleted".to_string());
            return;
        }
        self.modals.delete_confirmation = Some(activity.id.clone());
        self.modals.delete_modal_selection = 1;
        self.ui.mode = Mode::ConfirmDelete;
    }

    pub fn close_delete_confirmation(&mut self) {
        self.modals.delete_confirmation = None;
        self.ui.mode = Mode::View;
    }

    pub fn confirm_delete(&mut self) {
        if let Some(id) = self.modals.delete_confirmation.take() {
            match self.workspace.delete_activity(&id) {
                Ok(()) => {
                    self.adjust_selected_index();
                    self.set_status_message("Activity deleted".to_string());
                }
                Err(e) => self.set_status_message(format!("Failed to delete activity: {}", e)),
            }
        }
        self.ui.mode = Mode::View;
    }

    pub fn polish_selected(&mut self) {
        let Some(id) = self.selected_activity().map(|a| a.id.clone()) else {
            return;
        };
        match self.workspace.polish_activity(&id) {
            Ok(0) => self.set_status_message("Nothing polished (text kept as written)".to_string()),
            Ok(n) => self.set_status_message(format!("Polished {} field(s)", n)),
            Err(e) => self.set_status_message(format!("Failed to polish: {}", e)),
        }
    }

    pub fn submit_current_period(&mut self) {
        let period = self.current_period();
        match self.workspace.submit(&period, Self::now()) {
            Ok(submission) => {
                self.adjust_selected_index();
                self.set_status_message(format!(
                    "Submitted {} activities ({:.1}h) for {}",
                    submission.activity_count, submission.total_hours, submission.period_label
                ));
            }
            Err(e) => self.set_status_message(format!("Submission failed: {}", e)),
        }
    }

    /// Report the selected submission on the History tab, the current period elsewhere
    pub fn generate_report(&mut self) {
        let report = match self.selected_submission() {
            Some(submission) => self.workspace.compile_submission_report(submission, Self::now()),
            None if self.ui.current_tab == Tab::History => {
                self.set_status_message("No submission selected".to_string());
                return;
            }
            None => {
                let period = self.current_period();
                self.workspace.compile_report(&period, today(), Self::now())
            }
        };
        let result = report.and_then(|report| {
            write_report(&self.workspace.config.get_report_dir(), &report).map_err(Into::into)
        });
        match result {
            Ok(path) => self.set_status_message(format!("Report written to {}", path.display())),
            Err(e) => self.set_status_message(format!("Report failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::OfflineAssistant;
    use crate::backend::MockBackend;
    use crate::store::MemoryStore;

    fn app() -> App {
        let workspace = Workspace::with_parts(
            Config::default(),
            Box::new(MemoryStore::default()),
            Box::new(OfflineAssistant),
            Box::new(MockBackend::instant()),
        )
        .unwrap();
        App::new(workspace)
    }

    fn fill(form: &mut ActivityForm, task: &str) {
        form.current = 1;
        for c in task.chars() {
            form.insert_char(c);
        }
    }

    #[test]
    fn tab_neighbours_stop_at_edges() {
        assert_eq!(Tab::Dashboard.left(), Tab::Dashboard);
        assert_eq!(Tab::Dashboard.right(), Tab::Logs);
        assert_eq!(Tab::History.right(), Tab::History);
    }

    #[test]
    fn form_field_cycle_wraps() {
        let mut form = ActivityForm::new();
        form.prev_field();
        assert_eq!(form.current_field(), FormField::Narrative(NarrativeField::CompanyBenefit));
        form.next_field();
        assert_eq!(form.current_field(), FormField::Date);
    }

    #[test]
    fn space_on_category_field_cycles() {
        let mut form = ActivityForm::new();
        form.current = 2;
        form.insert_char(' ');
        assert_eq!(form.category, ActivityCategory::Maintenance.next());
        form.cycle_category(false);
        assert_eq!(form.category, ActivityCategory::Maintenance);
    }

    #[test]
    fn form_requires_a_title() {
        let form = ActivityForm::new();
        assert!(form.to_new_activity().is_err());
    }

    #[test]
    fn save_form_logs_and_switches_to_logs() {
        let mut app = app();
        app.enter_create_mode();
        fill(app.form.as_mut().unwrap(), "Fleet key audit");
        app.save_form();

        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.ui.current_tab, Tab::Logs);
        assert_eq!(app.activities().len(), 1);
        assert_eq!(app.selected_activity().unwrap().task, "Fleet key audit");
    }

    #[test]
    fn invalid_form_stays_open() {
        let mut app = app();
        app.enter_create_mode();
        let form = app.form.as_mut().unwrap();
        fill(form, "Rekey");
        form.hours = "-1".to_string();
        app.save_form();

        assert_eq!(app.ui.mode, Mode::Create);
        assert!(app.status.message.is_some());
        assert!(app.activities().is_empty());
    }

    #[test]
    fn delete_goes_through_confirmation() {
        let mut app = app();
        app.enter_create_mode();
        fill(app.form.as_mut().unwrap(), "Temp");
        app.save_form();

        app.request_delete();
        assert_eq!(app.ui.mode, Mode::ConfirmDelete);
        app.confirm_delete();
        assert!(app.activities().is_empty());
        assert_eq!(app.ui.list_state.selected(), None);
    }

    #[test]
    fn submit_marks_current_period_activities() {
        let mut app = app();
        app.enter_create_mode();
        fill(app.form.as_mut().unwrap(), "Lockout call");
        app.save_form();

        app.submit_current_period();
        assert_eq!(app.submissions().len(), 1);
        assert!(app.activities()[0].submitted);

        app.request_delete();
        assert_eq!(app.ui.mode, Mode::View);
    }

    #[test]
    fn report_key_on_history_uses_selected_submission() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.report_dir = Some(dir.path().to_string_lossy().to_string());
        let workspace = Workspace::with_parts(
            config,
            Box::new(MemoryStore::default()),
            Box::new(OfflineAssistant),
            Box::new(MockBackend::instant()),
        )
        .unwrap();
        let mut app = App::new(workspace);

        app.switch_tab(Tab::History);
        app.generate_report();
        assert_eq!(app.status.message.as_deref(), Some("No submission selected"));

        app.enter_create_mode();
        fill(app.form.as_mut().unwrap(), "Lockout call");
        app.save_form();
        app.submit_current_period();

        app.switch_tab(Tab::History);
        app.generate_report();
        let submission = &app.submissions()[0];
        let label = format!(
            "{} - {}",
            crate::period::format_date(submission.period_start),
            crate::period::format_date(submission.period_end)
        );
        let written = std::fs::read_to_string(dir.path().join(crate::report::report_file_name(&label))).unwrap();
        assert!(written.contains("LOCKOUT CALL"));
        assert!(written.contains("(FINAL)"));
    }
}
