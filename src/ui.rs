use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::*;
use unicode_width::UnicodeWidthStr;

use crate::app::{AppState, ConnectionStatus, Focus, Popup};
use crate::export::format_speed;

pub fn draw(frame: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(5),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(frame.size());

    draw_header(frame, chunks[0], app);
    draw_readouts(frame, chunks[1], app);
    draw_inputs(frame, chunks[2], app);
    draw_results(frame, chunks[3], app);
    draw_footer(frame, chunks[4], app);

    if let Some(popup) = &app.popup {
        draw_popup(frame, popup);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = Vec::new();
    spans.push(Span::styled(
        " doppler ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw("  Esc:quit  TAB:focus  F5:start  F6:stop  F7:delete  F8:export "));
    spans.push(Span::styled(
        format!(" {} @ {} ", app.port_name, app.baud_rate),
        Style::default().fg(Color::Yellow),
    ));
    let (label, style) = match app.status {
        ConnectionStatus::Connected => (
            " Connection with sensor: Connected ",
            Style::default().fg(Color::Black).bg(Color::Green),
        ),
        ConnectionStatus::NotConnected => (
            " Connection with sensor: Not connected ",
            Style::default().fg(Color::Black).bg(Color::Red),
        ),
    };
    spans.push(Span::styled(label, style));

    let block = Block::default().borders(Borders::ALL).title("Sensor");
    let p = Paragraph::new(Text::from(Line::from(spans))).block(block);
    frame.render_widget(p, area);
}

fn draw_readouts(frame: &mut Frame, area: Rect, app: &AppState) {
    let (frequency, speed) = match app.session.latest() {
        Some(r) => (format!("{:.2}", r.frequency_hz), format!("{:.2}", r.speed_kmh)),
        None => ("N/A".to_string(), "N/A".to_string()),
    };
    let state = app.session.state();
    let max_line = if !state.is_measuring {
        Line::from(Span::styled(
            "Max Speed: Not measuring",
            Style::default().fg(Color::Red),
        ))
    } else if state.samples == 0 {
        Line::from(Span::styled(
            "Max Speed: N/A km/h",
            Style::default().fg(Color::Green),
        ))
    } else {
        Line::from(Span::styled(
            format!("Max Speed: {}", format_speed(state.max_speed_kmh)),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ))
    };

    let lines = vec![
        Line::from(format!("Frequency: {frequency} Hz")),
        Line::from(format!("Speed: {speed} km/h")),
        max_line,
    ];
    let block = Block::default().borders(Borders::ALL).title("Live");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_inputs(frame: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let locked = app.session.is_measuring();
    let fields = [
        (Focus::PlayerName, "Player name", &app.player_name, chunks[0]),
        (Focus::Team, "Team", &app.team, chunks[1]),
    ];
    for (focus, title, value, rect) in fields {
        let style = if locked {
            Style::default().fg(Color::DarkGray)
        } else if app.focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let p = Paragraph::new(value.as_str()).style(style).block(block);
        frame.render_widget(p, rect);

        if app.focus == focus && !locked && app.popup.is_none() {
            frame.set_cursor(rect.x + 1 + value.width() as u16, rect.y + 1);
        }
    }
}

fn draw_results(frame: &mut Frame, area: Rect, app: &AppState) {
    let header = Row::new(vec!["Order", "Player Name", "Team", "Max Speed"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .session
        .results()
        .records()
        .iter()
        .map(|r| {
            Row::new(vec![
                r.rank.to_string(),
                r.player_name.clone(),
                r.team.clone(),
                format_speed(r.max_speed_kmh),
            ])
        })
        .collect();

    let border_style = if app.focus == Focus::Results {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let widths = [
        Constraint::Length(6),
        Constraint::Percentage(35),
        Constraint::Percentage(35),
        Constraint::Length(14),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title("RESULTS"),
        )
        .highlight_style(Style::default().bg(Color::Blue))
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(app.selected_result);
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &AppState) {
    let last = app.messages.back().map(String::as_str).unwrap_or("");
    let block = Block::default().borders(Borders::ALL).title("Log");
    frame.render_widget(Paragraph::new(last).block(block), area);
}

fn draw_popup(frame: &mut Frame, popup: &Popup) {
    let (title, body, color) = match popup {
        Popup::Alert(message) => ("Error", format!("{message}\n\n[Enter] OK"), Color::Red),
        Popup::ConfirmDelete(_) => (
            "Confirmation",
            "Are you sure you want to delete this record?\n\n[y] yes  [n] no".to_string(),
            Color::Yellow,
        ),
        Popup::ExportPath(path) => (
            "Save as CSV",
            format!("{path}\n\n[Enter] save  [Esc] cancel"),
            Color::Cyan,
        ),
    };

    let area = centered_rect(60, 7, frame.size());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: false }),
        area,
    );

    if let Popup::ExportPath(path) = popup {
        frame.set_cursor(area.x + 1 + path.width() as u16, area.y + 1);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(height),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}
