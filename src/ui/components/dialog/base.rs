//! Base dialog component

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Configuration for rendering a dialog
pub struct DialogConfig<'a> {
    pub title: &'a str,
    pub title_color: Color,
    pub border_color: Color,
    /// Message content (can be multi-line with \n)
    pub message: &'a str,
    /// Hint text shown at the bottom (e.g., "Press Enter to dismiss")
    pub hint: Option<Vec<Span<'a>>>,
    /// Shown in the bottom-right corner of the border
    pub footer: Option<String>,
    pub max_width: u16,
}

impl Default for DialogConfig<'_> {
    fn default() -> Self {
        Self {
            title: "Dialog",
            title_color: Color::White,
            border_color: Color::White,
            message: "",
            hint: None,
            footer: None,
            max_width: 60,
        }
    }
}

/// Width and height of a dialog showing `lines` under `title`
fn dialog_size(lines: &[String], title: &str, has_hint: bool, max_width: u16) -> (u16, u16) {
    let padding = 4u16;
    let content_width = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(title.chars().count()) as u16;
    // +2 for borders
    let width = (content_width + padding + 2).min(max_width);
    let hint_lines = if has_hint { 2 } else { 0 };
    let height = (2 + lines.len() as u16 + hint_lines + 2).max(5);
    (width, height)
}

/// Render a centered dialog overlay
pub fn render_dialog(frame: &mut Frame, config: DialogConfig) {
    let area = frame.area();
    let max_line_width = config.max_width.saturating_sub(6).max(10) as usize;
    let wrapped_lines = wrap_text(config.message, max_line_width);
    let (dialog_width, dialog_height) = dialog_size(
        &wrapped_lines,
        config.title,
        config.hint.is_some(),
        config.max_width,
    );

    let dialog_area = Rect {
        x: area.x + area.width.saturating_sub(dialog_width) / 2,
        y: area.y + area.height.saturating_sub(dialog_height) / 2,
        width: dialog_width.min(area.width),
        height: dialog_height.min(area.height),
    };

    frame.render_widget(Clear, dialog_area);

    let mut content = vec![
        Line::from(Span::styled(
            config.title,
            Style::default()
                .fg(config.title_color)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    content.extend(wrapped_lines.into_iter().map(Line::from));
    if let Some(hint_spans) = config.hint {
        content.push(Line::from(""));
        content.push(Line::from(hint_spans));
    }

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(config.border_color))
        .style(Style::default().bg(Color::Black));
    if let Some(footer) = config.footer {
        block = block.title_bottom(Line::from(format!(" {footer} ")).right_aligned());
    }

    let dialog = Paragraph::new(content)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(dialog, dialog_area);
}

/// Greedy word wrap; words longer than `max_width` get a line of their own
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = current.chars().count() + word.chars().count() + 1;
            if needed > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }

    lines
}
