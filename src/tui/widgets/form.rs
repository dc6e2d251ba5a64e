use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::app::{ActivityForm, FormField};
use crate::tui::widgets::color::Palette;

const LABEL_WIDTH: u16 = 26;

/// Render the new-activity form, one row per field, and place the cursor
pub fn render_activity_form(f: &mut Frame, area: Rect, form: &ActivityForm, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("New Activity")
        .style(Style::default().fg(palette.fg).bg(palette.bg));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let fields = FormField::all();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(fields.iter().map(|_| Constraint::Length(1)).chain([Constraint::Min(0)]))
        .split(inner);

    let value_width = inner.width.saturating_sub(LABEL_WIDTH) as usize;
    for (i, field) in fields.iter().enumerate() {
        let active = i == form.current;
        let label_style = if active {
            Style::default().fg(palette.highlight_fg).bg(palette.highlight_bg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.fg)
        };

        let value = form.value(*field);
        // Show the tail of long values so the cursor stays visible
        let shown: String = if value.chars().count() > value_width {
            value.chars().skip(value.chars().count() - value_width).collect()
        } else {
            value.to_string()
        };
        let value = if *field == FormField::Category {
            format!("< {} >", shown)
        } else {
            shown
        };

        let line = Line::from(vec![
            Span::styled(format!("{:<width$}", field.label(), width = LABEL_WIDTH as usize), label_style),
            Span::raw(value.clone()),
        ]);
        f.render_widget(Paragraph::new(line), rows[i]);

        if active && *field != FormField::Category {
            let x = rows[i].x + LABEL_WIDTH + value.chars().count() as u16;
            f.set_cursor_position(Position::new(x.min(rows[i].right().saturating_sub(1)), rows[i].y));
        }
    }
}
