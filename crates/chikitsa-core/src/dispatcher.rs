//! Language-aware dispatch of diagnosis requests.
//!
//! The dispatcher resolves the endpoint for a language, makes exactly one
//! attempt against the service under a timeout, and always hands back a
//! renderable [`DiagnosisResult`]. Service failures become the locale's
//! fallback result here and go no further.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::diagnosis::DiagnosisResult;
use crate::error::{ConfigError, ServiceError};
use crate::language::Language;
use crate::locale::{Labels, LocaleTable};
use crate::service::DiagnosisService;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

struct Route {
    url: String,
    labels: Labels,
}

pub struct RequestDispatcher {
    service: Arc<dyn DiagnosisService>,
    routes: HashMap<Language, Route>,
    timeout: Duration,
}

impl RequestDispatcher {
    /// Every supported language must have a locale entry.
    pub fn new(
        service: Arc<dyn DiagnosisService>,
        base_url: &str,
        locales: &LocaleTable,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let base = base_url.trim_end_matches('/');
        let mut routes = HashMap::new();
        for language in Language::all() {
            let entry = locales.get(language)?;
            routes.insert(
                language,
                Route {
                    url: format!("{}{}", base, entry.endpoint),
                    labels: entry.labels.clone(),
                },
            );
        }

        Ok(Self {
            service,
            routes,
            timeout,
        })
    }

    pub fn endpoint_for(&self, language: Language) -> Option<&str> {
        self.routes.get(&language).map(|r| r.url.as_str())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One attempt against the service; failures are returned as-is.
    pub async fn try_dispatch(
        &self,
        text: &str,
        language: Language,
    ) -> Result<DiagnosisResult, ServiceError> {
        let url = self
            .endpoint_for(language)
            .ok_or_else(|| ServiceError::Malformed(format!("no route for {}", language)))?;

        debug!(%language, url, "dispatching diagnosis request");
        match tokio::time::timeout(self.timeout, self.service.diagnose(url, text)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(self.timeout)),
        }
    }

    /// Like [`try_dispatch`](Self::try_dispatch) but never fails: errors
    /// become the fallback result for `language`.
    pub async fn dispatch(&self, text: &str, language: Language) -> DiagnosisResult {
        match self.try_dispatch(text, language).await {
            Ok(result) => {
                debug!(%language, disease = result.predicted_disease(), "diagnosis received");
                result
            }
            Err(e) => {
                warn!(%language, error = %e, "diagnosis service failed, using fallback");
                self.fallback(language)
            }
        }
    }

    pub fn fallback(&self, language: Language) -> DiagnosisResult {
        match self.routes.get(&language) {
            Some(route) => DiagnosisResult::fallback(&route.labels),
            None => DiagnosisResult::fallback(&Labels::english()),
        }
    }
}
