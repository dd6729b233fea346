//! UI module for rendering the TUI

mod components;
mod forms;
mod inspector;
mod layout;

pub use forms::trigger_target;

use crate::app::App;
use components::render_error_dialog;
use ratatui::Frame;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let panels = layout::create_layout(frame.area());
    let form = app.form();

    forms::draw_form(frame, panels.form, form);
    forms::draw_action_panel(frame, panels.actions, form);
    inspector::draw(frame, panels.inspector, form);
    layout::draw_status_bar(frame, panels.status, app);

    // Error dialog overlays everything
    if let Some(message) = app.state.current_error() {
        render_error_dialog(frame, message, app.state.error_count());
    }
}
