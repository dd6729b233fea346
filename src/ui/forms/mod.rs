//! Form rendering module
//!
//! - `field_renderer`: one bordered input
//! - `action_panel`: the command buttons beside a form

mod action_panel;
mod field_renderer;

pub use action_panel::{draw_action_panel, trigger_target};
pub use field_renderer::{draw_field, FieldView, FIELD_HEIGHT};

use crate::state::DemoForm;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame,
};

/// First row to draw so that `focus` stays visible
fn scroll_offset(focus: usize, visible: usize) -> usize {
    if visible == 0 {
        return focus;
    }
    (focus + 1).saturating_sub(visible)
}

/// Draw every row of `form`, scrolled around the focused one
pub fn draw_form(frame: &mut Frame, area: Rect, form: &DemoForm) {
    let phase = form.controller().phase();
    let block = Block::default()
        .title(format!(" {} ", form.title()))
        .title_bottom(format!(" {} ", phase.label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = form.rows();
    let visible = (inner.height / FIELD_HEIGHT) as usize;
    let offset = scroll_offset(form.focus(), visible);

    for (slot, (index, row)) in rows.iter().enumerate().skip(offset).take(visible).enumerate() {
        let path = &row.field.path;
        let meta = form.controller().meta(path);
        let field = FieldView {
            label: &row.field.label,
            value: form.display_value(&row.field),
            is_active: index == form.focus(),
            is_disabled: form.controller().is_disabled(path),
            is_dirty: meta.is_some_and(|meta| meta.dirty),
            is_validating: meta.is_some_and(|meta| meta.validating),
            error: meta.and_then(|meta| meta.error.as_ref()).map(ToString::to_string),
        };
        let field_area = Rect {
            x: inner.x,
            y: inner.y + slot as u16 * FIELD_HEIGHT,
            width: inner.width,
            height: FIELD_HEIGHT,
        };
        draw_field(frame, field_area, &field);
    }
}
