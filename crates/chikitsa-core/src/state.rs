//! UI-agnostic conversation state.
//!
//! [`ConversationState`] is owned by a single
//! [`ConversationController`](crate::controller::ConversationController) and
//! only changes through its intents. Front-ends read it directly or through a
//! [`ConversationSnapshot`].

use std::fmt;

use crate::diagnosis::DiagnosisResult;
use crate::history::ConversationHistory;
use crate::language::Language;
use crate::locale::Labels;

/// Identifies one submission cycle. Increases monotonically per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(pub(crate) u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The submission currently awaiting a response.
#[derive(Debug, Clone)]
pub(crate) struct InFlight {
    pub id: SubmissionId,
    pub text: String,
    pub language: Language,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub(crate) pending_input: String,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) active_language: Language,
    pub(crate) history: ConversationHistory,
    pub(crate) last_result: Option<DiagnosisResult>,
}

impl ConversationState {
    pub fn new(language: Language) -> Self {
        Self {
            active_language: language,
            ..Self::default()
        }
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Text of the in-flight submission, if any.
    pub fn submitting_text(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.text.as_str())
    }

    pub fn active_language(&self) -> Language {
        self.active_language
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn last_result(&self) -> Option<&DiagnosisResult> {
        self.last_result.as_ref()
    }
}

/// Owned copy of everything a front-end renders.
#[derive(Debug, Clone)]
pub struct ConversationSnapshot {
    pub pending_input: String,
    pub is_submitting: bool,
    pub last_result: Option<DiagnosisResult>,
    pub last_message: Option<String>,
    pub history_len: usize,
    pub active_language: Language,
    pub labels: Labels,
}
