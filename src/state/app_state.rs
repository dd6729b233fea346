//! Top-level application state

use std::collections::VecDeque;

/// Available views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Channel,
    Login,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Channel => "Channel sign-up",
            View::Login => "Login",
        }
    }

    /// The other demo form
    pub fn toggle(&self) -> Self {
        match self {
            View::Channel => View::Login,
            View::Login => View::Channel,
        }
    }
}

/// Main application state
#[derive(Debug, Default)]
pub struct AppState {
    pub current_view: View,
    /// Errors waiting to be shown, oldest first
    errors: VecDeque<String>,
    /// One-line feedback shown in the status bar
    pub status_message: Option<String>,
}

impl AppState {
    pub fn push_error(&mut self, message: String) {
        tracing::warn!("{message}");
        self.errors.push_back(message);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Errors still waiting, the visible one included
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn current_error(&self) -> Option<&str> {
        self.errors.front().map(String::as_str)
    }

    pub fn dismiss_error(&mut self) {
        self.errors.pop_front();
    }
}
