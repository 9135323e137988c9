use chikitsa_core::{CompletedSubmission, Config, ConversationController, SubmitError};
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub controller: ConversationController,

    // Input state
    pub input_cursor: usize, // cursor position in chars

    // Submission in flight, polled on every tick
    pub submit_task: Option<JoinHandle<CompletedSubmission>>,

    // Chat pane
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height, updated during render
    pub follow_tail: bool,

    // History panel
    pub show_history: bool,
    pub history_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Write language changes back to the config file
    pub persist_language: bool,
}

impl App {
    pub fn new(controller: ConversationController, persist_language: bool) -> Self {
        Self {
            should_quit: false,
            controller,
            input_cursor: 0,
            submit_task: None,
            chat_scroll: 0,
            chat_height: 0,
            follow_tail: true,
            show_history: false,
            history_state: ListState::default(),
            animation_frame: 0,
            persist_language,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.controller.state().is_submitting()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_submitting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing. All edits go through the controller, which ignores
    // them while a submission is in flight.

    pub fn insert_char(&mut self, c: char) {
        let mut text = self.controller.state().pending_input().to_string();
        let byte_pos = char_to_byte_index(&text, self.input_cursor);
        text.insert(byte_pos, c);
        if self.controller.edit_input(text) {
            self.input_cursor += 1;
        }
    }

    pub fn backspace(&mut self) {
        if self.input_cursor == 0 {
            return;
        }
        let mut text = self.controller.state().pending_input().to_string();
        let byte_pos = char_to_byte_index(&text, self.input_cursor - 1);
        text.remove(byte_pos);
        if self.controller.edit_input(text) {
            self.input_cursor -= 1;
        }
    }

    pub fn delete(&mut self) {
        let mut text = self.controller.state().pending_input().to_string();
        if self.input_cursor < text.chars().count() {
            let byte_pos = char_to_byte_index(&text, self.input_cursor);
            text.remove(byte_pos);
            self.controller.edit_input(text);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.controller.state().pending_input().chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.controller.state().pending_input().chars().count();
    }

    /// Start a submission in the background. Empty input and a second
    /// submission while one is running are silently ignored.
    pub fn submit(&mut self) {
        match self.controller.begin_submit() {
            Ok(pending) => {
                debug!(id = %pending.id(), "spawning submission");
                self.submit_task = Some(tokio::spawn(pending.run()));
                self.animation_frame = 0;
                self.follow_tail = true;
            }
            Err(SubmitError::EmptyInput) | Err(SubmitError::InFlight) => {}
        }
    }

    /// Apply the submission result once its task has finished.
    pub async fn poll_submission(&mut self) {
        let finished = self
            .submit_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.submit_task.take() {
            match task.await {
                Ok(done) => {
                    self.controller.complete_submit(done);
                }
                Err(e) => {
                    error!(error = %e, "submission task failed");
                    self.controller.fail_submit();
                }
            }
            self.input_cursor = 0;
            self.follow_tail = true;
        }
    }

    pub fn toggle_language(&mut self) {
        match self.controller.toggle_language() {
            Ok(language) => {
                if self.persist_language {
                    if let Err(e) = Config::save_default_language(language) {
                        warn!(error = %e, "could not save language preference");
                    }
                }
            }
            Err(e) => error!(error = %e, "language switch rejected"),
        }
    }

    pub fn new_chat(&mut self) {
        if self.controller.new_chat().is_ok() {
            self.input_cursor = 0;
            self.chat_scroll = 0;
            self.follow_tail = true;
        }
    }

    pub fn toggle_history(&mut self) {
        self.show_history = !self.show_history;
        let len = self.controller.state().history().len();
        if self.show_history && len > 0 {
            self.history_state.select(Some(len - 1));
        }
    }

    pub fn scroll_up(&mut self) {
        if self.show_history {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some(i.saturating_sub(1)));
        } else {
            self.follow_tail = false;
            self.chat_scroll = self.chat_scroll.saturating_sub(1);
        }
    }

    pub fn scroll_down(&mut self) {
        if self.show_history {
            let len = self.controller.state().history().len();
            if len > 0 {
                let i = self.history_state.selected().map(|i| i + 1).unwrap_or(0);
                self.history_state.select(Some(i.min(len - 1)));
            }
        } else {
            self.follow_tail = false;
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_half_page_up(&mut self) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(self.chat_height / 2);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_add(self.chat_height / 2);
    }

    /// Clamp scroll to the rendered content; pin to the bottom when following.
    pub fn fit_chat_scroll(&mut self, total_lines: u16) {
        let max_scroll = total_lines.saturating_sub(self.chat_height);
        if self.follow_tail || self.chat_scroll > max_scroll {
            self.chat_scroll = max_scroll;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chikitsa_core::{
        normalize, DiagnosisClient, DiagnosisResult, DiagnosisService, Language, LocaleTable,
        RequestDispatcher, ServiceError,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct Healthy;

    #[async_trait]
    impl DiagnosisService for Healthy {
        async fn diagnose(&self, _endpoint: &str, _text: &str) -> Result<DiagnosisResult, ServiceError> {
            normalize(&json!({
                "confidence_score": 0.82,
                "disclaimer": "Not a diagnosis",
                "predicted_disease": "Common Cold",
                "recommendation": "Rest and fluids",
                "symptoms_matched": ["cough"]
            }))
        }
    }

    struct Stalled;

    #[async_trait]
    impl DiagnosisService for Stalled {
        async fn diagnose(&self, _endpoint: &str, _text: &str) -> Result<DiagnosisResult, ServiceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ServiceError::Status(504))
        }
    }

    fn app_with(service: Arc<dyn DiagnosisService>) -> App {
        let locales = LocaleTable::builtin();
        let dispatcher =
            RequestDispatcher::new(service, "http://127.0.0.1:9", &locales, Duration::from_secs(30))
                .unwrap();
        let controller =
            ConversationController::new(Arc::new(dispatcher), locales, Language::English).unwrap();
        App::new(controller, false)
    }

    fn app() -> App {
        app_with(Arc::new(DiagnosisClient::new()))
    }

    /// Poll like the tick loop does until the submission settles.
    async fn tick_until_idle(app: &mut App) {
        for _ in 0..200 {
            app.poll_submission().await;
            if !app.is_submitting() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("submission never settled");
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("abc", 1), 1);
        assert_eq!(char_to_byte_index("बुखार", 1), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_editing_multibyte_input() {
        let mut app = app();
        type_str(&mut app, "सिरदर्द");
        assert_eq!(app.input_cursor, 7);

        app.cursor_home();
        app.delete();
        app.cursor_end();
        app.backspace();
        assert_eq!(app.controller.state().pending_input(), "िरदर्");
    }

    #[test]
    fn test_insert_at_cursor() {
        let mut app = app();
        type_str(&mut app, "fver");
        app.cursor_home();
        app.cursor_right();
        app.insert_char('e');
        assert_eq!(app.controller.state().pending_input(), "fever");
        assert_eq!(app.input_cursor, 2);
    }

    #[test]
    fn test_submit_empty_does_nothing() {
        let mut app = app();
        type_str(&mut app, "   ");
        app.submit();
        assert!(app.submit_task.is_none());
        assert!(!app.is_submitting());
    }

    #[test]
    fn test_new_chat_resets_cursor() {
        let mut app = app();
        type_str(&mut app, "rash");
        app.new_chat();
        assert_eq!(app.input_cursor, 0);
        assert_eq!(app.controller.state().pending_input(), "");
    }

    #[test]
    fn test_fit_chat_scroll_follows_tail() {
        let mut app = app();
        app.chat_height = 10;
        app.fit_chat_scroll(25);
        assert_eq!(app.chat_scroll, 15);

        app.scroll_up();
        app.fit_chat_scroll(25);
        assert_eq!(app.chat_scroll, 14);

        app.chat_scroll = 40;
        app.fit_chat_scroll(25);
        assert_eq!(app.chat_scroll, 15);
    }

    #[tokio::test]
    async fn test_spawned_submission_applied_on_tick() {
        let mut app = app_with(Arc::new(Healthy));
        type_str(&mut app, "cough");
        app.submit();
        assert!(app.submit_task.is_some());
        assert!(app.is_submitting());

        // Editing is locked until the result lands
        app.insert_char('!');
        assert_eq!(app.controller.state().pending_input(), "cough");

        tick_until_idle(&mut app).await;

        assert!(app.submit_task.is_none());
        assert_eq!(app.input_cursor, 0);
        let state = app.controller.state();
        assert_eq!(state.pending_input(), "");
        assert_eq!(state.history().last_message(), Some("cough"));
        let result = state.last_result().unwrap();
        assert!(!result.is_error());
        assert_eq!(result.predicted_disease(), "Common Cold");
    }

    #[tokio::test]
    async fn test_lost_task_completes_with_fallback() {
        let mut app = app_with(Arc::new(Stalled));
        type_str(&mut app, "fever");
        app.submit();
        app.submit_task.as_ref().unwrap().abort();

        tick_until_idle(&mut app).await;

        assert!(app.submit_task.is_none());
        assert_eq!(app.input_cursor, 0);
        let state = app.controller.state();
        assert!(!state.is_submitting());
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.history().last_message(), Some("fever"));
        let result = state.last_result().unwrap();
        assert!(result.is_error());
        assert_eq!(result.predicted_disease(), "Service Unavailable");
    }
}
