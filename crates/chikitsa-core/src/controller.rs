//! The diagnosis conversation controller.
//!
//! Submission is a two-step state machine so front-ends can keep rendering
//! while a request is in flight:
//!
//! ```text
//! IDLE --begin_submit--> SUBMITTING --complete_submit--> IDLE
//! ```
//!
//! [`begin_submit`](ConversationController::begin_submit) validates the input
//! and takes the single-flight lock, handing back a [`PendingSubmission`]
//! whose [`run`](PendingSubmission::run) future can be awaited inline or
//! spawned. [`complete_submit`](ConversationController::complete_submit)
//! applies the outcome and releases the lock.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::diagnosis::DiagnosisResult;
use crate::dispatcher::RequestDispatcher;
use crate::error::{ConfigError, SubmitError};
use crate::language::Language;
use crate::locale::{Labels, LocaleTable};
use crate::state::{ConversationSnapshot, ConversationState, InFlight, SubmissionId};

/// A submission that holds the lock and still needs its response.
pub struct PendingSubmission {
    id: SubmissionId,
    text: String,
    language: Language,
    dispatcher: Arc<RequestDispatcher>,
}

impl PendingSubmission {
    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Send the request. Always resolves; failures yield the fallback result.
    pub async fn run(self) -> CompletedSubmission {
        let result = self.dispatcher.dispatch(&self.text, self.language).await;
        CompletedSubmission {
            id: self.id,
            text: self.text,
            result,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletedSubmission {
    id: SubmissionId,
    text: String,
    result: DiagnosisResult,
}

impl CompletedSubmission {
    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn result(&self) -> &DiagnosisResult {
        &self.result
    }
}

pub struct ConversationController {
    state: ConversationState,
    dispatcher: Arc<RequestDispatcher>,
    locales: LocaleTable,
    labels: Labels,
    next_id: u64,
}

impl ConversationController {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        locales: LocaleTable,
        language: Language,
    ) -> Result<Self, ConfigError> {
        let labels = locales.labels(language)?.clone();
        Ok(Self {
            state: ConversationState::new(language),
            dispatcher,
            locales,
            labels,
            next_id: 0,
        })
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Labels for the active language.
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn current_language(&self) -> Language {
        self.state.active_language
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            pending_input: self.state.pending_input.clone(),
            is_submitting: self.state.is_submitting(),
            last_result: self.state.last_result.clone(),
            last_message: self.state.history.last_message().map(str::to_string),
            history_len: self.state.history.len(),
            active_language: self.state.active_language,
            labels: self.labels.clone(),
        }
    }

    /// Replace the input buffer. Ignored while a submission is in flight.
    pub fn edit_input(&mut self, text: impl Into<String>) -> bool {
        if self.state.is_submitting() {
            return false;
        }
        self.state.pending_input = text.into();
        true
    }

    /// Only affects the next submission and the labels; an in-flight request
    /// keeps the language it was sent with.
    pub fn set_language(&mut self, language: Language) -> Result<(), ConfigError> {
        let labels = self.locales.labels(language)?.clone();
        if language != self.state.active_language {
            info!(from = %self.state.active_language, to = %language, "language changed");
        }
        self.state.active_language = language;
        self.labels = labels;
        Ok(())
    }

    pub fn set_language_str(&mut self, language: &str) -> Result<(), ConfigError> {
        self.set_language(language.parse()?)
    }

    pub fn toggle_language(&mut self) -> Result<Language, ConfigError> {
        let next = self.state.active_language.next();
        self.set_language(next)?;
        Ok(next)
    }

    /// Clear the last result and the input. History and language are kept.
    pub fn new_chat(&mut self) -> Result<(), SubmitError> {
        if self.state.is_submitting() {
            return Err(SubmitError::InFlight);
        }
        self.state.last_result = None;
        self.state.pending_input.clear();
        Ok(())
    }

    /// IDLE -> SUBMITTING. Empty input and a second concurrent submission are
    /// rejected without touching state.
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, SubmitError> {
        if self.state.is_submitting() {
            return Err(SubmitError::InFlight);
        }
        let text = self.state.pending_input.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        let text = text.to_string();

        self.next_id += 1;
        let id = SubmissionId(self.next_id);
        let language = self.state.active_language;
        self.state.in_flight = Some(InFlight {
            id,
            text: text.clone(),
            language,
        });
        debug!(%id, %language, "submission started");

        Ok(PendingSubmission {
            id,
            text,
            language,
            dispatcher: Arc::clone(&self.dispatcher),
        })
    }

    /// SUBMITTING -> IDLE. Returns false and changes nothing if `done` is not
    /// the submission currently in flight.
    pub fn complete_submit(&mut self, done: CompletedSubmission) -> bool {
        match &self.state.in_flight {
            Some(current) if current.id == done.id => {}
            _ => {
                warn!(id = %done.id, "ignoring completion for a submission that is not in flight");
                return false;
            }
        }

        debug!(id = %done.id, is_error = done.result.is_error(), "submission completed");
        self.state.history.append(done.text);
        self.state.last_result = Some(done.result);
        self.state.pending_input.clear();
        self.state.in_flight = None;
        true
    }

    /// Complete the in-flight submission with its fallback result, for when
    /// the task running it was lost.
    pub fn fail_submit(&mut self) -> bool {
        let Some(current) = self.state.in_flight.clone() else {
            return false;
        };
        warn!(id = %current.id, "submission task lost, using fallback");
        let result = self.dispatcher.fallback(current.language);
        self.complete_submit(CompletedSubmission {
            id: current.id,
            text: current.text,
            result,
        })
    }

    /// Run a whole submission cycle inline.
    ///
    /// Dropping the returned future before it resolves releases the lock
    /// without recording a turn; the input is kept for a retry.
    pub async fn submit(&mut self) -> Result<DiagnosisResult, SubmitError> {
        let pending = self.begin_submit()?;
        let mut guard = ReleaseOnDrop {
            id: pending.id(),
            controller: self,
            armed: true,
        };
        let done = pending.run().await;
        guard.armed = false;

        let result = done.result.clone();
        guard.controller.complete_submit(done);
        Ok(result)
    }

    fn release(&mut self, id: SubmissionId) {
        if self.state.in_flight.as_ref().map(|f| f.id) == Some(id) {
            warn!(%id, "submission dropped before completion, releasing lock");
            self.state.in_flight = None;
        }
    }
}

struct ReleaseOnDrop<'a> {
    id: SubmissionId,
    controller: &'a mut ConversationController,
    armed: bool,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.release(self.id);
        }
    }
}
