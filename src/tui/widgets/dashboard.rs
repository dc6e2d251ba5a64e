use chrono::NaiveDateTime;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};

use crate::ledger::PeriodSummary;
use crate::period::{PayrollPeriod, format_date, is_deadline_approaching_at, is_submission_day};
use crate::tui::widgets::color::Palette;

pub struct DashboardData<'a> {
    pub company: &'a str,
    pub period: &'a PayrollPeriod,
    pub summary: &'a PeriodSummary,
    pub now: NaiveDateTime,
}

pub fn render_dashboard(f: &mut Frame, area: Rect, data: &DashboardData, palette: &Palette) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Cards
            Constraint::Min(3),    // Category chart
            Constraint::Length(4), // Period info
        ])
        .split(area);

    render_stats_cards(f, vertical[0], data, palette);
    render_category_chart(f, vertical[1], data.summary, palette);
    render_period_info(f, vertical[2], data, palette);
}

fn card<'a>(title: &'a str, value: String, detail: String, value_style: Style, palette: &Palette) -> Paragraph<'a> {
    Paragraph::new(vec![
        Line::from(Span::styled(value, value_style.add_modifier(Modifier::BOLD))),
        Line::from(detail),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title(title))
    .style(Style::default().fg(palette.fg).bg(palette.bg))
}

fn render_stats_cards(f: &mut Frame, area: Rect, data: &DashboardData, palette: &Palette) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let period = data.period;
    let normal = Style::default().fg(palette.fg);
    let approaching = is_deadline_approaching_at(period.deadline, data.now);
    let (deadline_style, deadline_detail) = if approaching {
        (Style::default().fg(palette.warning), "Due within 48h".to_string())
    } else {
        (normal, period.deadline.format("%H:%M:%S").to_string())
    };

    let cards = [
        card(
            "Current Period",
            period.label.clone(),
            format!("{} - {}", period.start.format("%b %-d"), period.end.format("%b %-d")),
            normal,
            palette,
        ),
        card(
            "Logged Hours",
            format!("{:.1}h", data.summary.total_hours),
            "unsubmitted".to_string(),
            normal,
            palette,
        ),
        card(
            "Activities",
            data.summary.activity_count.to_string(),
            "recorded".to_string(),
            normal,
            palette,
        ),
        card(
            "Deadline",
            format_date(period.deadline.date()),
            deadline_detail,
            deadline_style,
            palette,
        ),
    ];

    for (card, area) in cards.into_iter().zip(columns.iter()) {
        f.render_widget(card, *area);
    }
}

fn render_category_chart(f: &mut Frame, area: Rect, summary: &PeriodSummary, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Hours by Category")
        .style(Style::default().fg(palette.fg).bg(palette.bg));

    if summary.by_category.is_empty() {
        let empty = Paragraph::new("No unsubmitted activities this period")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    // Bar values are tenths of an hour
    let bars: Vec<Bar> = summary
        .by_category
        .iter()
        .map(|(category, hours)| {
            Bar::default()
                .value((hours * 10.0).round() as u64)
                .label(Line::from(category.as_str()))
                .text_value(format!("{:.1}h", hours))
                .style(Style::default().fg(palette.highlight_bg))
                .value_style(Style::default().fg(palette.highlight_fg).bg(palette.highlight_bg))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

fn render_period_info(f: &mut Frame, area: Rect, data: &DashboardData, palette: &Palette) {
    let period = data.period;
    let mut lines = vec![Line::from(format!(
        "Payment date: {}   Deadline: {}",
        format_date(period.payment_date),
        period.deadline.format("%b %-d, %Y %H:%M")
    ))];
    if is_submission_day(data.now.date()) {
        lines.push(Line::from(Span::styled(
            "Today is a submission day: reports are final",
            Style::default().fg(palette.warning),
        )));
    } else {
        lines.push(Line::from("Reports generated today are drafts"));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(data.company))
        .style(Style::default().fg(palette.fg).bg(palette.bg));
    f.render_widget(paragraph, area);
}
