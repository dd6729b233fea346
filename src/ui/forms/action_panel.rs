//! Action panel listing the form commands

use crate::form::FieldPath;
use crate::platform;
use crate::state::DemoForm;
use crate::ui::components::{render_action_button, BUTTON_HEIGHT};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    Frame,
};

/// One entry of the action panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormAction {
    pub label: &'static str,
    pub shortcut: &'static str,
    pub enabled: bool,
    pub accent: Option<Color>,
}

impl FormAction {
    fn new(label: &'static str, shortcut: &'static str, enabled: bool) -> Self {
        Self {
            label,
            shortcut,
            enabled,
            accent: None,
        }
    }

    fn accent(mut self, color: Color) -> Self {
        self.accent = Some(color);
        self
    }
}

/// Path re-validated by the single-field trigger
pub fn trigger_target() -> FieldPath {
    FieldPath::of("channel")
}

/// Actions for `form` with their enabled state
pub fn form_actions(form: &DemoForm) -> Vec<FormAction> {
    let has_array = form.array().is_some();
    let focused_removable = form
        .focused()
        .and_then(|row| row.entry)
        .is_some_and(|entry| entry.removable);
    let has_trigger_target = form.controller().is_registered(&trigger_target());

    vec![
        FormAction::new("Submit", platform::SUBMIT_SHORTCUT, form.can_submit())
            .accent(Color::Green),
        FormAction::new("Reset", platform::RESET_SHORTCUT, true).accent(Color::Yellow),
        FormAction::new("Get values", platform::GET_VALUES_SHORTCUT, true),
        FormAction::new("Set values", platform::SET_VALUES_SHORTCUT, true),
        FormAction::new("Validate all", platform::TRIGGER_SHORTCUT, true),
        FormAction::new(
            "Validate channel",
            platform::TRIGGER_FIELD_SHORTCUT,
            has_trigger_target,
        ),
        FormAction::new("Add phone", platform::ADD_ENTRY_SHORTCUT, has_array),
        FormAction::new(
            "Remove phone",
            platform::REMOVE_ENTRY_SHORTCUT,
            focused_removable,
        ),
        FormAction::new("Copy values", platform::COPY_SHORTCUT, true),
    ]
}

/// Draw the action buttons stacked from the top
pub fn draw_action_panel(frame: &mut Frame, area: Rect, form: &DemoForm) {
    let actions = form_actions(form);
    let mut constraints: Vec<Constraint> = actions
        .iter()
        .map(|_| Constraint::Length(BUTTON_HEIGHT))
        .collect();
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (action, chunk) in actions.iter().zip(chunks.iter()) {
        render_action_button(
            frame,
            *chunk,
            &format!("{} {}", action.shortcut, action.label),
            false,
            action.enabled,
            action.accent,
        );
    }
}
