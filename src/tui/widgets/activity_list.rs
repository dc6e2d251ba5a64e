use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::models::Activity;
use crate::tui::widgets::color::Palette;

/// One list row: status marker, date, hours, title
pub fn activity_row(activity: &Activity, max_width: usize) -> String {
    let marker = if activity.submitted { "✓" } else { "○" };
    let row = format!(
        "{} {} {:>4.1}h {}",
        marker,
        activity.date.format("%m-%d"),
        activity.duration_hours,
        activity.task
    );
    if row.chars().count() > max_width {
        row.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        row
    }
}

pub fn render_activity_list(
    f: &mut Frame,
    area: Rect,
    activities: &[Activity],
    list_state: &mut ListState,
    palette: &Palette,
) {
    // 2 for borders, 2 for the highlight symbol
    let max_width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = activities
        .iter()
        .map(|a| ListItem::new(activity_row(a, max_width)))
        .collect();

    let pending = activities.iter().filter(|a| !a.submitted).count();
    let title = format!("Activities ({} pending / {})", pending, activities.len());

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(palette.fg).bg(palette.bg))
        .highlight_style(
            Style::default()
                .fg(palette.highlight_fg)
                .bg(palette.highlight_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, list_state);
}

pub fn render_activity_detail(f: &mut Frame, area: Rect, activity: Option<&Activity>, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Details")
        .style(Style::default().fg(palette.fg).bg(palette.bg));

    let Some(activity) = activity else {
        let empty = Paragraph::new("No activities yet. Press the new key to log one.")
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(empty, area);
        return;
    };

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(activity.task.clone(), bold)),
        Line::from(format!(
            "{} · {}h · {}",
            activity.date.format("%Y-%m-%d"),
            activity.duration_hours,
            activity.category
        )),
    ];
    let status = match activity.submission_id {
        Some(ref id) => format!("Submitted ({})", id),
        None => "Pending submission".to_string(),
    };
    lines.push(Line::from(Span::styled(status, Style::default().fg(palette.warning))));
    lines.push(Line::from(format!("ID: {}", activity.id)));

    let filled = activity.narrative.filled();
    if filled.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("No specific details logged."));
    }
    for (field, text) in filled {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("{}:", field.label()), bold)));
        lines.extend(text.lines().map(|l| Line::from(l.to_string())));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewActivity;
    use chrono::NaiveDate;

    #[test]
    fn rows_are_truncated_to_width() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let activity = Activity::from_new(NewActivity::new("Transponder programming for fleet", date, 2.0));
        assert_eq!(activity_row(&activity, 80), "○ 03-04  2.0h Transponder programming for fleet");
        let short = activity_row(&activity, 20);
        assert_eq!(short.chars().count(), 20);
        assert!(short.ends_with("..."));
    }
}
