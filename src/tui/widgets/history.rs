use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::models::Submission;
use crate::period::format_date;
use crate::tui::widgets::color::Palette;

pub fn render_history_list(
    f: &mut Frame,
    area: Rect,
    submissions: &[Submission],
    list_state: &mut ListState,
    palette: &Palette,
) {
    let items: Vec<ListItem> = submissions
        .iter()
        .map(|s| {
            ListItem::new(vec![
                Line::from(s.period_label.clone()),
                Line::from(format!("  {:.1}h · {} activities · {}", s.total_hours, s.activity_count, s.status)),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!("Submissions ({})", submissions.len())))
        .style(Style::default().fg(palette.fg).bg(palette.bg))
        .highlight_style(Style::default().fg(palette.highlight_fg).bg(palette.highlight_bg))
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, list_state);
}

pub fn render_submission_detail(f: &mut Frame, area: Rect, submission: Option<&Submission>, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Submission")
        .style(Style::default().fg(palette.fg).bg(palette.bg));

    let Some(s) = submission else {
        f.render_widget(Paragraph::new("No submissions yet").block(block), area);
        return;
    };

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(s.period_label.clone(), bold)),
        Line::from(format!("{} - {}", format_date(s.period_start), format_date(s.period_end))),
        Line::from(format!("Submitted: {}", s.submitted_at.format("%Y-%m-%d %H:%M:%S"))),
        Line::from(format!("Status: {}", s.status)),
        Line::from(format!("Reference: {} / {}", s.id, s.remote_id.as_deref().unwrap_or("-"))),
        Line::from(format!("Total: {:.1}h across {} activities", s.total_hours, s.activity_count)),
        Line::from(""),
    ];
    lines.extend(s.activities.iter().map(|a| {
        Line::from(format!(
            "• {} {:>4.1}h {:<16} {}",
            a.date.format("%m-%d"),
            a.duration_hours,
            a.category.as_str(),
            a.task
        ))
    }));

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}
