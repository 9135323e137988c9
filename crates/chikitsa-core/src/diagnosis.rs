//! Diagnosis results and the normalizer that produces them.
//!
//! A [`DiagnosisResult`] comes from exactly one of two places: a well-formed
//! service payload run through [`normalize`], or [`DiagnosisResult::fallback`]
//! when the service could not answer.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::ServiceError;
use crate::locale::Labels;

/// Wire shape of a successful service response.
#[derive(Deserialize)]
struct RawDiagnosis {
    confidence_score: f64,
    disclaimer: String,
    predicted_disease: String,
    recommendation: String,
    symptoms_matched: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisResult {
    predicted_disease: String,
    confidence_score: f64,
    symptoms_matched: Vec<String>,
    recommendation: String,
    disclaimer: String,
    is_error: bool,
}

impl DiagnosisResult {
    /// Result synthesized locally when the service fails.
    pub fn fallback(labels: &Labels) -> Self {
        Self {
            predicted_disease: labels.fallback_disease.clone(),
            confidence_score: 0.0,
            symptoms_matched: Vec::new(),
            recommendation: labels.fallback_recommendation.clone(),
            disclaimer: labels.fallback_disclaimer.clone(),
            is_error: true,
        }
    }

    pub fn predicted_disease(&self) -> &str {
        &self.predicted_disease
    }

    /// Confidence in `[0, 1]`.
    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    /// Raw snake_case tokens as returned by the service.
    pub fn symptoms_matched(&self) -> &[String] {
        &self.symptoms_matched
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    pub fn disclaimer(&self) -> &str {
        &self.disclaimer
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Confidence as a percentage with one decimal, e.g. `82.0%`.
    pub fn confidence_display(&self) -> String {
        format!("{:.1}%", self.confidence_score * 100.0)
    }

    pub fn symptoms_display(&self) -> Vec<String> {
        self.symptoms_matched
            .iter()
            .map(|s| format_symptom(s))
            .collect()
    }
}

/// Turn a payload into a result, rejecting anything missing or mistyped.
pub fn normalize(raw: &serde_json::Value) -> Result<DiagnosisResult, ServiceError> {
    let parsed = RawDiagnosis::deserialize(raw)
        .map_err(|e| ServiceError::Malformed(e.to_string()))?;
    from_raw(parsed)
}

pub fn normalize_bytes(body: &[u8]) -> Result<DiagnosisResult, ServiceError> {
    let parsed: RawDiagnosis =
        serde_json::from_slice(body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
    from_raw(parsed)
}

fn from_raw(raw: RawDiagnosis) -> Result<DiagnosisResult, ServiceError> {
    let score = raw.confidence_score;
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(ServiceError::Malformed(format!(
            "confidence_score out of range: {}",
            score
        )));
    }

    Ok(DiagnosisResult {
        predicted_disease: raw.predicted_disease,
        confidence_score: score,
        symptoms_matched: raw.symptoms_matched,
        recommendation: raw.recommendation,
        disclaimer: raw.disclaimer,
        is_error: false,
    })
}

/// `shortness_of_breath` -> `Shortness Of Breath`
pub fn format_symptom(token: &str) -> String {
    static WORD_START: OnceLock<Regex> = OnceLock::new();
    let re = WORD_START.get_or_init(|| Regex::new(r"\b\w").expect("Invalid word-start regex"));

    let spaced = token.replace('_', " ");
    re.replace_all(&spaced, |caps: &regex::Captures| caps[0].to_uppercase())
        .into_owned()
}
