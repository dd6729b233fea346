//! Layout components (panels and status bar)

use crate::app::App;
use crate::state::View;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Screen areas for one frame
pub struct Panels {
    pub form: Rect,
    pub actions: Rect,
    pub inspector: Rect,
    pub status: Rect,
}

/// Split the screen into form, action panel, inspector and status bar
pub fn create_layout(area: Rect) -> Panels {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(40),        // Form
            Constraint::Length(24),     // Actions
            Constraint::Percentage(35), // Inspector
        ])
        .split(rows[0]);

    Panels {
        form: columns[0],
        actions: columns[1],
        inspector: columns[2],
        status: rows[1],
    }
}

/// Draw the status bar
pub fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        format!(" {} ", app.state.current_view.title()),
        Style::default().fg(Color::Black).bg(Color::Cyan),
    )];

    spans.push(Span::styled(
        format!(" {}", get_view_hints(&app.state.current_view)),
        Style::default().fg(Color::Gray),
    ));

    if let Some(msg) = &app.state.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg, Style::default().fg(Color::Yellow)));
    }

    if let Some(msg) = &app.copy_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg, Style::default().fg(Color::Green)));
    }

    let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, area);

    let quit_hint = " Esc/^C:quit ";
    let quit_area = Rect {
        x: area.x + area.width.saturating_sub(quit_hint.len() as u16),
        y: area.y,
        width: (quit_hint.len() as u16).min(area.width),
        height: 1,
    };
    let quit_widget =
        Paragraph::new(quit_hint).style(Style::default().bg(Color::DarkGray).fg(Color::Gray));
    frame.render_widget(quit_widget, quit_area);
}

/// Get keyboard hints for the current view
fn get_view_hints(view: &View) -> String {
    let common = "Tab:next  ^U:clear  F2:switch form";
    match view {
        View::Channel => format!("{common}  ^A/^D:phones"),
        View::Login => common.to_string(),
    }
}
