//! Application state and core logic

use crate::config::TuiConfig;
use crate::directory::InMemoryDirectory;
use crate::form::{
    FieldPath, FormError, SetValueOptions, SubmitResult, ValidationJob, ValidationOutcome, Value,
};
use crate::state::{channel_form, login_form, AppState, DemoForm, Edit, View};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Results coming back from background validation
#[derive(Debug)]
pub enum AppEvent {
    Validated {
        view: View,
        outcome: ValidationOutcome,
    },
    Submitted {
        view: View,
        outcomes: Vec<ValidationOutcome>,
    },
}

/// Main application struct
pub struct App {
    /// Current application state
    pub state: AppState,
    channel: DemoForm,
    login: DemoForm,
    config: TuiConfig,
    /// Whether the app should quit
    quit: bool,
    /// Copy feedback message
    pub copy_message: Option<String>,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    /// Spawned tasks whose event has not arrived yet
    in_flight: usize,
}

impl App {
    /// Create a new App instance
    pub fn new(config: TuiConfig) -> Result<Self> {
        let directory = Arc::new(
            InMemoryDirectory::seeded(config.lookup_latency()).offline(config.directory_offline()),
        );
        let today = chrono::Local::now().date_naive();
        let mode = config.validation_mode();
        let revalidate = config.revalidate_mode();
        let channel = channel_form(directory, mode, revalidate, today)?;
        let login = login_form(mode, revalidate)?;
        let (events_tx, events_rx) = unbounded_channel();

        tracing::info!(
            "Forms mounted (mode {}, revalidate {})",
            mode.label(),
            revalidate.label()
        );

        Ok(Self {
            state: AppState::default(),
            channel,
            login,
            config,
            quit: false,
            copy_message: None,
            events_tx,
            events_rx,
            in_flight: 0,
        })
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Form shown in the current view
    pub fn form(&self) -> &DemoForm {
        self.form_for(self.state.current_view)
    }

    fn form_for(&self, view: View) -> &DemoForm {
        match view {
            View::Channel => &self.channel,
            View::Login => &self.login,
        }
    }

    fn form_mut(&mut self, view: View) -> &mut DemoForm {
        match view {
            View::Channel => &mut self.channel,
            View::Login => &mut self.login,
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle error dialog dismissal first (modal)
        if self.state.has_errors() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.state.dismiss_error();
            }
            return Ok(());
        }

        // Clear any status messages on key press
        self.copy_message = None;

        let view = self.state.current_view;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if key.code == KeyCode::Char('y') && key.modifiers.contains(crate::platform::COPY_MODIFIER) {
            self.copy_values();
            return Ok(());
        }

        // Only read-only keys get through while a submit is in flight
        let read_only = matches!(key.code, KeyCode::F(2) | KeyCode::Esc)
            || (ctrl && key.code == KeyCode::Char('g'));
        if self.is_submitting(view) && !read_only {
            self.state.status_message = Some("Submit in progress".to_string());
            return Ok(());
        }

        if let KeyCode::Char(c) = key.code {
            if ctrl {
                let result = match c {
                    's' => {
                        self.submit(view);
                        Ok(())
                    }
                    'r' => self.reset(view),
                    'g' => {
                        self.log_values(view);
                        Ok(())
                    }
                    'v' => self.set_values(view),
                    't' => self.trigger(view, None),
                    'l' => self.trigger(view, Some(crate::ui::trigger_target())),
                    'a' => self.append_entry(view),
                    'd' => self.remove_entry(view),
                    'u' => self.edit(view, Edit::Clear),
                    _ => Ok(()),
                };
                self.report(result);
                return Ok(());
            }
        }

        let result = match key.code {
            KeyCode::Tab | KeyCode::Down => self.move_focus(view, true),
            KeyCode::BackTab | KeyCode::Up => self.move_focus(view, false),
            KeyCode::F(2) => self.switch_view(view),
            KeyCode::Esc => {
                self.quit = true;
                Ok(())
            }
            KeyCode::Char(c) => self.edit(view, Edit::Insert(c)),
            KeyCode::Backspace => self.edit(view, Edit::Backspace),
            _ => Ok(()),
        };
        self.report(result);
        Ok(())
    }

    fn report(&mut self, result: Result<(), FormError>) {
        if let Err(err) = result {
            self.state.push_error(err.to_string());
        }
    }

    fn is_submitting(&self, view: View) -> bool {
        self.form_for(view).controller().state().is_submitting
    }

    fn edit(&mut self, view: View, edit: Edit) -> Result<(), FormError> {
        if let Some(job) = self.form_mut(view).edit(edit)? {
            self.spawn_validation(view, job);
        }
        Ok(())
    }

    /// Blur the focused field, then move focus
    fn move_focus(&mut self, view: View, forward: bool) -> Result<(), FormError> {
        let form = self.form_mut(view);
        let job = form.blur_focused()?;
        form.move_focus(forward);
        if let Some(job) = job {
            self.spawn_validation(view, job);
        }
        Ok(())
    }

    fn switch_view(&mut self, view: View) -> Result<(), FormError> {
        if let Some(job) = self.form_mut(view).blur_focused()? {
            self.spawn_validation(view, job);
        }
        self.state.current_view = view.toggle();
        self.state.status_message = None;
        Ok(())
    }

    fn spawn_validation(&mut self, view: View, job: ValidationJob) {
        tracing::debug!("Validating `{}` in the background", job.path());
        let tx = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = job.run().await;
            let _ = tx.send(AppEvent::Validated { view, outcome });
        });
    }

    fn submit(&mut self, view: View) {
        let form = self.form_mut(view);
        if !form.can_submit() {
            self.state.status_message = Some("Nothing to submit".to_string());
            return;
        }
        let pending = form.controller_mut().begin_submit();
        let tx = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcomes = pending.run().await;
            let _ = tx.send(AppEvent::Submitted { view, outcomes });
        });
        self.state.status_message = Some("Submitting…".to_string());
    }

    fn reset(&mut self, view: View) -> Result<(), FormError> {
        let form = self.form_mut(view);
        form.controller_mut().reset()?;
        form.forget_buffers();
        form.refresh_gates()?;
        self.state.status_message = Some("Form reset".to_string());
        Ok(())
    }

    /// Log the whole tree, one subtree and a pick of fields
    fn log_values(&mut self, view: View) {
        let controller = self.form_for(view).controller();
        let all = json(controller.get_values());
        tracing::info!("Get values: {all}");
        let social = json(&controller.get_value(&FieldPath::of("social")));
        tracing::info!("Get values of social: {social}");
        let picked = controller.get_many(&[FieldPath::of("username"), FieldPath::of("channel")]);
        let picked = json(&Value::List(picked));
        tracing::info!("Get values of [username, channel]: {picked}");
        self.state.status_message = Some(all);
    }

    /// Clear the username through `set_value` with every flag raised
    fn set_values(&mut self, view: View) -> Result<(), FormError> {
        let path = FieldPath::of("username");
        let form = self.form_mut(view);
        if !form.controller().is_registered(&path) {
            self.state.status_message = Some("This form has no username".to_string());
            return Ok(());
        }
        let jobs = form
            .controller_mut()
            .set_value(&path, Value::text(""), SetValueOptions::all())?;
        form.forget_buffers();
        for job in jobs {
            self.spawn_validation(view, job);
        }
        self.state.status_message = Some("Username cleared".to_string());
        Ok(())
    }

    fn trigger(&mut self, view: View, path: Option<FieldPath>) -> Result<(), FormError> {
        if path
            .as_ref()
            .is_some_and(|path| !self.form_for(view).controller().is_registered(path))
        {
            return Ok(());
        }
        let jobs = self
            .form_mut(view)
            .controller_mut()
            .begin_trigger(path.as_ref())?;
        for job in jobs {
            self.spawn_validation(view, job);
        }
        Ok(())
    }

    fn append_entry(&mut self, view: View) -> Result<(), FormError> {
        if let Some(id) = self.form_mut(view).append_entry()? {
            tracing::debug!("Added entry {id}");
        }
        Ok(())
    }

    fn remove_entry(&mut self, view: View) -> Result<(), FormError> {
        if self.form_mut(view).remove_focused_entry()?.is_none() {
            self.state.status_message = Some("Focus a removable phone first".to_string());
        }
        Ok(())
    }

    fn copy_values(&mut self) {
        let values =
            serde_json::to_string_pretty(self.form().controller().get_values()).unwrap_or_default();
        self.copy_message = Some(match self.copy_to_clipboard(&values) {
            Ok(()) => "Values copied".to_string(),
            Err(err) => {
                tracing::warn!("Clipboard unavailable: {err:#}");
                "Copy failed".to_string()
            }
        });
    }

    /// Apply every event that has already arrived
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let view = match &event {
            AppEvent::Validated { view, .. } | AppEvent::Submitted { view, .. } => *view,
        };
        let seen = self.form_for(view).controller().diagnostics().len();

        let submitted = match event {
            AppEvent::Validated { outcome, .. } => {
                self.form_mut(view).controller_mut().apply_outcome(outcome);
                None
            }
            AppEvent::Submitted { outcomes, .. } => Some(
                self.form_mut(view).controller_mut().finish_submit(
                    outcomes,
                    |values| tracing::info!("Submitted values: {}", json(values)),
                    |errors| tracing::info!("Submit rejected: {} invalid fields", errors.len()),
                ),
            ),
        };

        let fresh: Vec<String> = self
            .form_for(view)
            .controller()
            .diagnostics()
            .iter()
            .skip(seen)
            .cloned()
            .collect();
        for message in fresh {
            self.state.push_error(message);
        }

        match submitted {
            Some(SubmitResult::Valid(values)) => {
                self.state.status_message = Some(format!("Submitted {}", json(&values)));
                if self.config.reset_after_submit() {
                    let result = self.reset(view);
                    self.report(result);
                }
            }
            Some(SubmitResult::Invalid(errors)) => {
                self.state.status_message = Some(format!("Submit failed: {} invalid", errors.len()));
            }
            None => {}
        }
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        use arboard::Clipboard;
        let mut clipboard = Clipboard::new()?;
        clipboard.set_text(text)?;
        Ok(())
    }

    /// Wait for every spawned task and apply its event
    #[cfg(test)]
    async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }
}

fn json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
