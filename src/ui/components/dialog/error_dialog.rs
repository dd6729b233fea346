//! Error dialog component

use super::base::{render_dialog, DialogConfig};
use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
    Frame,
};

/// Render the oldest queued error; `queued` counts every error still waiting
pub fn render_error_dialog(frame: &mut Frame, error_message: &str, queued: usize) {
    let key = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let hint = vec![
        Span::raw("Press "),
        Span::styled("Enter", key),
        Span::raw(" or "),
        Span::styled("Esc", key),
        Span::raw(" to dismiss"),
    ];

    render_dialog(
        frame,
        DialogConfig {
            title: "Error",
            title_color: Color::Red,
            border_color: Color::Red,
            message: error_message,
            hint: Some(hint),
            footer: (queued > 1).then(|| format!("1 of {queued}")),
            max_width: 60,
        },
    );
}
