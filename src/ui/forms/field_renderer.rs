//! Field rendering utilities for forms

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Rows taken by one input (borders + value)
pub const FIELD_HEIGHT: u16 = 3;

/// Everything needed to draw one input
#[derive(Debug, Clone, Default)]
pub struct FieldView<'a> {
    pub label: &'a str,
    pub value: String,
    pub is_active: bool,
    pub is_disabled: bool,
    pub is_dirty: bool,
    pub is_validating: bool,
    pub error: Option<String>,
}

/// Draw a bordered input; the error sits in the bottom border
pub fn draw_field(frame: &mut Frame, area: Rect, field: &FieldView) {
    let border_color = match (field.is_active, field.error.is_some(), field.is_disabled) {
        (_, _, true) => Color::DarkGray,
        (true, _, _) => Color::Cyan,
        (false, true, _) => Color::Red,
        (false, false, _) => Color::Gray,
    };
    let value_style = if field.is_disabled {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else if field.is_active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let display = if field.value.is_empty() && !field.is_active {
        "(empty)".to_string()
    } else {
        field.value.clone()
    };
    let mut spans = vec![Span::styled(display, value_style)];
    if field.is_active {
        spans.push(Span::styled("▌", Style::default().fg(Color::Cyan)));
    }
    if field.is_validating {
        spans.push(Span::styled(
            "  checking…",
            Style::default().fg(Color::Yellow),
        ));
    }

    let dirty_marker = if field.is_dirty { "*" } else { "" };
    let disabled_marker = if field.is_disabled { " (disabled)" } else { "" };
    let mut block = Block::default()
        .title(format!(" {}{dirty_marker}{disabled_marker} ", field.label))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    if let Some(error) = &field.error {
        block = block.title_bottom(Line::from(Span::styled(
            format!(" {error} "),
            Style::default().fg(Color::Red),
        )));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
