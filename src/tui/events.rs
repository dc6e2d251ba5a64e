use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size as terminal_size,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use tracing::debug;

use crate::tui::app::{App, FormField, Mode, Tab};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::tui::widgets::confirm_delete::OPTIONS;
use crate::utils::{has_primary_modifier, parse_key_binding};

/// Restores the terminal on drop, including during a panic unwind
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore explicitly on normal exit; drop is then a no-op
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Check size before entering the alternate screen so the error is readable
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width, min_height
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    debug!("tui started");

    loop {
        app.check_status_message_timeout();

        let size = terminal.size()?;
        let terminal_rect = Rect::new(0, 0, size.width, size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(terminal_rect);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        // Only Press events; Windows also reports Release
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                    break;
                }
            }
        }
    }

    guard.restore()?;
    debug!("tui stopped");
    Ok(())
}

fn matches_binding(key_event: &KeyEvent, binding: &str) -> Result<bool, TuiError> {
    let parsed = parse_key_binding(binding).map_err(TuiError::KeyBindingError)?;
    Ok(parsed.matches(key_event))
}

/// Returns `true` when the app should quit
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match app.ui.mode {
        Mode::ConfirmDelete => {
            handle_delete_confirmation_modal(app, key_event);
            Ok(false)
        }
        Mode::Create => {
            handle_create_mode(app, key_event)?;
            Ok(false)
        }
        Mode::View => handle_view_mode(app, key_event),
    }
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) {
    let last = OPTIONS.len() - 1;
    match key_event.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.modals.delete_modal_selection = app.modals.delete_modal_selection.checked_sub(1).unwrap_or(last);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.modals.delete_modal_selection = (app.modals.delete_modal_selection + 1) % OPTIONS.len();
        }
        KeyCode::Enter => {
            if app.modals.delete_modal_selection == 0 {
                app.confirm_delete();
            } else {
                app.close_delete_confirmation();
            }
        }
        KeyCode::Esc => app.close_delete_confirmation(),
        _ => {}
    }
}

fn handle_create_mode(app: &mut App, key_event: KeyEvent) -> Result<(), TuiError> {
    // Ctrl bindings first so they never reach the text fields
    if matches_binding(&key_event, &app.config().key_bindings.save)? {
        app.save_form();
        return Ok(());
    }
    if matches_binding(&key_event, &app.config().key_bindings.suggest)? {
        app.suggest_category();
        return Ok(());
    }

    if key_event.code == KeyCode::Esc {
        app.cancel_create();
        return Ok(());
    }

    let Some(form) = app.form.as_mut() else {
        app.ui.mode = Mode::View;
        return Ok(());
    };

    match key_event.code {
        KeyCode::Tab | KeyCode::Enter | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Left if form.current_field() == FormField::Category => form.cycle_category(false),
        KeyCode::Right if form.current_field() == FormField::Category => form.cycle_category(true),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => form.insert_char(c),
        _ => {}
    }
    Ok(())
}

fn handle_view_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let keys = app.config().key_bindings.clone();

    if matches_binding(&key_event, &keys.quit)? {
        return Ok(true);
    }

    // Tabs
    let tab_targets = [(&keys.tab_1, Tab::Dashboard), (&keys.tab_2, Tab::Logs), (&keys.tab_3, Tab::History)];
    for (binding, tab) in tab_targets {
        if matches_binding(&key_event, binding)? {
            app.switch_tab(tab);
            return Ok(false);
        }
    }
    if matches_binding(&key_event, &keys.tab_left)? {
        app.switch_tab(app.ui.current_tab.left());
        return Ok(false);
    }
    if matches_binding(&key_event, &keys.tab_right)? {
        app.switch_tab(app.ui.current_tab.right());
        return Ok(false);
    }

    // List navigation (arrow keys always work)
    if key_event.code == KeyCode::Up || matches_binding(&key_event, &keys.list_up)? {
        app.move_selection_up();
        return Ok(false);
    }
    if key_event.code == KeyCode::Down || matches_binding(&key_event, &keys.list_down)? {
        app.move_selection_down();
        return Ok(false);
    }

    if matches_binding(&key_event, &keys.new)? {
        app.enter_create_mode();
    } else if matches_binding(&key_event, &keys.delete)? {
        app.request_delete();
    } else if matches_binding(&key_event, &keys.polish)? {
        app.polish_selected();
    } else if matches_binding(&key_event, &keys.submit)? {
        app.submit_current_period();
    } else if matches_binding(&key_event, &keys.report)? {
        app.generate_report();
    }
    Ok(false)
}
