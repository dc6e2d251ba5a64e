use chrono::Local;
use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};

use crate::tui::app::{Mode, Tab};
use crate::tui::widgets::{
    activity_list::{render_activity_detail, render_activity_list},
    color::Palette,
    confirm_delete::render_confirm_delete,
    dashboard::{DashboardData, render_dashboard},
    form::render_activity_form,
    history::{render_history_list, render_submission_detail},
    status_bar::render_status_bar,
    tabs::render_tabs,
};
use crate::tui::{App, Layout};
use crate::utils::format_key_binding_for_display;

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let palette = Palette::from_config(app.config());

    let company = app.config().company.name.clone();
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} · Time Log ", company))
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(palette.fg).bg(palette.bg));
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.ui.current_tab, &palette);

    if app.ui.mode == Mode::Create {
        if let Some(ref form) = app.form {
            render_activity_form(f, layout.main_area, form, &palette);
        }
    } else {
        match app.ui.current_tab {
            Tab::Dashboard => {
                let period = app.current_period();
                let summary = app.workspace.summary(&period);
                let data = DashboardData {
                    company: &company,
                    period: &period,
                    summary: &summary,
                    now: Local::now().naive_local(),
                };
                render_dashboard(f, layout.main_area, &data, &palette);
            }
            Tab::Logs => {
                let (list_area, detail_area) = Layout::split_list_detail(layout.main_area);
                render_activity_list(
                    f,
                    list_area,
                    &app.workspace.state.activities,
                    &mut app.ui.list_state,
                    &palette,
                );
                render_activity_detail(f, detail_area, app.selected_activity(), &palette);
            }
            Tab::History => {
                let (list_area, detail_area) = Layout::split_list_detail(layout.main_area);
                render_history_list(
                    f,
                    list_area,
                    &app.workspace.state.submissions,
                    &mut app.ui.list_state,
                    &palette,
                );
                render_submission_detail(f, detail_area, app.selected_submission(), &palette);
            }
        }
    }

    // Delete confirmation overlays the normal content
    if app.ui.mode == Mode::ConfirmDelete {
        let pending = app
            .modals
            .delete_confirmation
            .as_ref()
            .and_then(|id| app.workspace.state.activity(id));
        if let Some(activity) = pending {
            render_confirm_delete(f, f.area(), activity, app.modals.delete_modal_selection, &palette);
        }
    }

    let key_hints = get_key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_ref(), &key_hints, &palette);
}

fn get_key_hints(app: &App) -> Vec<String> {
    let keys = &app.config().key_bindings;
    let hint = |binding: &str, action: &str| format!("{}: {}", format_key_binding_for_display(binding), action);

    match app.ui.mode {
        Mode::Create => vec![
            "Tab/Enter: Next field".to_string(),
            "Shift+Tab: Previous field".to_string(),
            "Space/←/→: Category".to_string(),
            hint(&keys.save, "Save"),
            hint(&keys.suggest, "Suggest category"),
            "Esc: Cancel".to_string(),
        ],
        Mode::ConfirmDelete => vec!["Enter: Confirm".to_string(), "Esc: Cancel".to_string()],
        Mode::View => {
            let mut hints = vec![hint(&keys.quit, "Quit"), hint(&keys.new, "New")];
            if app.ui.current_tab == Tab::Logs {
                hints.push(hint(&keys.delete, "Delete"));
                hints.push(hint(&keys.polish, "Polish"));
            }
            hints.push(hint(&keys.submit, "Submit period"));
            if app.ui.current_tab == Tab::History {
                hints.push(hint(&keys.report, "Report submission"));
            } else {
                hints.push(hint(&keys.report, "Report"));
            }
            hints.push(format!(
                "{}/{}/{}: Tabs",
                keys.tab_1, keys.tab_2, keys.tab_3
            ));
            hints
        }
    }
}
