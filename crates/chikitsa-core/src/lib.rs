pub mod config;
pub mod controller;
pub mod diagnosis;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod language;
pub mod locale;
pub mod service;
pub mod state;

// Re-export main types for convenience
pub use config::Config;
pub use controller::{CompletedSubmission, ConversationController, PendingSubmission};
pub use diagnosis::{format_symptom, normalize, DiagnosisResult};
pub use dispatcher::RequestDispatcher;
pub use error::{ConfigError, ServiceError, SubmitError};
pub use history::ConversationHistory;
pub use language::Language;
pub use locale::{Labels, LocaleEntry, LocaleTable};
pub use service::{DiagnosisClient, DiagnosisService};
pub use state::{ConversationSnapshot, ConversationState, SubmissionId};
