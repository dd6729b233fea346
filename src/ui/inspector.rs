//! Live view of the form state

use crate::form::{FieldPath, FormSnapshot};
use crate::state::DemoForm;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::collections::BTreeSet;

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ))
}

fn flag(name: &str, on: bool) -> Span<'static> {
    let color = if on { Color::Green } else { Color::DarkGray };
    Span::styled(format!("{name} "), Style::default().fg(color))
}

fn path_list(paths: &BTreeSet<FieldPath>) -> String {
    if paths.is_empty() {
        return "-".to_string();
    }
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lines describing `snapshot`
fn inspector_lines(
    snapshot: &FormSnapshot,
    mode: &str,
    last_change: Option<String>,
) -> Vec<Line<'static>> {
    let state = snapshot.state;
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Phase: "),
            Span::styled(
                snapshot.phase.label(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  Mode: {mode}  Submits: {}", state.submit_count)),
        ]),
        Line::from(vec![
            flag("dirty", state.is_dirty),
            flag("valid", state.is_valid),
            flag("validating", state.is_validating),
            flag("submitting", state.is_submitting),
            flag("submitted", state.is_submitted),
            flag("successful", state.is_submit_successful),
        ]),
        Line::from(""),
        heading("Values"),
    ];

    let values = serde_json::to_string_pretty(&snapshot.values).unwrap_or_default();
    lines.extend(values.lines().map(|line| Line::from(line.to_string())));

    lines.push(Line::from(""));
    lines.push(heading("Errors"));
    if snapshot.errors.is_empty() {
        lines.push(Line::from("-"));
    }
    for (path, error) in &snapshot.errors {
        lines.push(Line::from(Span::styled(
            format!("{path}: {error}"),
            Style::default().fg(Color::Red),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(format!("Touched: {}", path_list(&snapshot.touched))));
    lines.push(Line::from(format!("Dirty: {}", path_list(&snapshot.dirty))));
    lines.push(Line::from(format!(
        "Validating: {}",
        path_list(&snapshot.validating)
    )));
    if let Some(changed) = last_change {
        lines.push(Line::from(format!("Last change: {changed}")));
    }

    if !snapshot.diagnostics.is_empty() {
        lines.push(Line::from(""));
        lines.push(heading("Diagnostics"));
        for message in &snapshot.diagnostics {
            lines.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Magenta),
            )));
        }
    }
    lines
}

pub fn draw(frame: &mut Frame, area: Rect, form: &DemoForm) {
    let controller = form.controller();
    let lines = inspector_lines(
        &controller.snapshot(),
        controller.mode().label(),
        form.last_change(),
    );
    let block = Block::default()
        .title(" Form state ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}
