//! Monitor rendering.

use crate::tui::app::MonitorApp;
use crate::types::JobStatus;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};

pub fn render(frame: &mut Frame, app: &MonitorApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Job table
            Constraint::Length(3), // Selected job progress
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    render_jobs(frame, chunks[1], app);
    render_progress(frame, chunks[2], app);
    render_status_bar(frame, chunks[3], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "Sendfleet",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" job monitor"),
        Span::styled(
            format!("  refresh {}s", app.refresh_interval_secs),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(title, area);
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Pending => Style::default().fg(Color::Yellow),
        JobStatus::Processing => Style::default().fg(Color::Cyan),
        JobStatus::Completed => Style::default().fg(Color::Green),
        JobStatus::Failed => Style::default().fg(Color::Red),
        JobStatus::Paused => Style::default().fg(Color::Magenta),
    }
}

fn render_jobs(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let header = Row::new(vec!["JOB", "STATUS", "SENT", "FAILED", "TOTAL", "SERVER", "UPDATED"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .jobs
        .iter()
        .map(|job| {
            let server = job
                .server_info
                .as_ref()
                .map(|s| s.server_name.clone())
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                Cell::from(job.job_id.clone()),
                Cell::from(job.status.to_string()).style(status_style(job.status)),
                Cell::from(job.sent_emails.to_string()),
                Cell::from(job.failed_emails.to_string()),
                Cell::from(job.total_emails.to_string()),
                Cell::from(server),
                Cell::from(job.updated_at.format("%H:%M:%S").to_string()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Min(10),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(Block::default().title(" Jobs ").borders(Borders::ALL))
    .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol("> ");

    let mut state = TableState::default();
    if !app.jobs.is_empty() {
        state.select(Some(app.selected));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_progress(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let Some(job) = app.selected_job() else {
        let empty = Paragraph::new("no job selected")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title(" Progress ").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let percent = job.display_progress() as u16;
    let label = format!(
        "{percent}%  ({}/{} sent, {} failed)",
        job.sent_emails, job.total_emails, job.failed_emails
    );
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(format!(" {} ", job.job_id))
                .borders(Borders::ALL),
        )
        .gauge_style(status_style(job.status))
        .percent(percent.min(100))
        .label(label);

    frame.render_widget(gauge, area);
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let (can_pause, can_resume) = app.selected_controls();
    let mut hints = vec![Span::styled(
        "[q] Close  [↑/↓] Select  [g] Refresh",
        Style::default().fg(Color::DarkGray),
    )];
    if can_pause {
        hints.push(Span::styled("  [p] Pause", Style::default().fg(Color::Yellow)));
    }
    if can_resume {
        hints.push(Span::styled("  [r] Resume", Style::default().fg(Color::Yellow)));
    }
    hints.push(Span::raw("  "));
    hints.push(Span::raw(app.status_line.clone()));

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}
