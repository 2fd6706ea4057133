//! The generation-service boundary and its LLM-backed implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::assessment::model::{
    validate_question_batch, ClarificationQuestion, QuestionKind, Recommendations, RiskAssessment,
    RiskFactor, Severity,
};
use crate::assessment::store::{AssessmentInput, ProfileSnapshot};
use crate::error::GenerationError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};

use super::prompts::{
    assessment_system_prompt, assessment_user_prompt, questions_system_prompt,
    questions_user_prompt,
};

/// Produces clarification questions and risk assessments.
///
/// Each call either returns a fully-populated value or fails with a
/// `GenerationError`. Implementations make a single attempt.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate_clarification_questions(
        &self,
        profile: &ProfileSnapshot,
    ) -> Result<Vec<ClarificationQuestion>, GenerationError>;

    async fn generate_risk_assessment(
        &self,
        input: &AssessmentInput,
    ) -> Result<RiskAssessment, GenerationError>;
}

/// Always fails. Used when no provider is configured so every call goes
/// straight to the fallback content.
#[derive(Debug, Clone, Default)]
pub struct OfflineGenerationClient;

#[async_trait]
impl GenerationClient for OfflineGenerationClient {
    async fn generate_clarification_questions(
        &self,
        _profile: &ProfileSnapshot,
    ) -> Result<Vec<ClarificationQuestion>, GenerationError> {
        Err(GenerationError::Unavailable("no provider configured".into()))
    }

    async fn generate_risk_assessment(
        &self,
        _input: &AssessmentInput,
    ) -> Result<RiskAssessment, GenerationError> {
        Err(GenerationError::Unavailable("no provider configured".into()))
    }
}

/// Tuning for LLM-backed generation.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Upper bound on questions kept from a generated batch.
    pub max_questions: usize,
    pub temperature: f32,
    pub questions_max_tokens: u32,
    pub assessment_max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_questions: 5,
            temperature: 0.3,
            questions_max_tokens: 1024,
            assessment_max_tokens: 2048,
        }
    }
}

/// `GenerationClient` backed by an `LlmProvider`.
pub struct LlmGenerationClient {
    llm: Arc<dyn LlmProvider>,
    config: GenerationConfig,
}

impl LlmGenerationClient {
    pub fn new(llm: Arc<dyn LlmProvider>, config: GenerationConfig) -> Self {
        Self { llm, config }
    }

    async fn complete(
        &self,
        system: String,
        user: String,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(user),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(max_tokens);

        let response = self.llm.complete(request).await?;
        if response.finish_reason == FinishReason::Length {
            warn!(
                model = self.llm.model_name(),
                output_tokens = response.output_tokens,
                "Generation hit the token limit; output may be truncated"
            );
        }
        debug!(
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Generation response received"
        );
        Ok(response.content)
    }
}

#[async_trait]
impl GenerationClient for LlmGenerationClient {
    async fn generate_clarification_questions(
        &self,
        profile: &ProfileSnapshot,
    ) -> Result<Vec<ClarificationQuestion>, GenerationError> {
        let raw = self
            .complete(
                questions_system_prompt(self.config.max_questions),
                questions_user_prompt(profile),
                self.config.questions_max_tokens,
            )
            .await?;

        let questions = parse_questions(&raw, self.config.max_questions)?;
        info!(count = questions.len(), "Generated clarification questions");
        Ok(questions)
    }

    async fn generate_risk_assessment(
        &self,
        input: &AssessmentInput,
    ) -> Result<RiskAssessment, GenerationError> {
        let raw = self
            .complete(
                assessment_system_prompt(),
                assessment_user_prompt(input),
                self.config.assessment_max_tokens,
            )
            .await?;

        let assessment = parse_assessment(&raw)?;
        info!(
            score = assessment.overall_risk_score,
            factors = assessment.risk_factors.len(),
            "Generated risk assessment"
        );
        Ok(assessment)
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// A question as the model writes it; validated into `ClarificationQuestion`.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    question: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    required: bool,
}

impl TryFrom<RawQuestion> for ClarificationQuestion {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let kind = match raw.kind.trim().to_ascii_lowercase().as_str() {
            "select" => QuestionKind::Select {
                options: raw
                    .options
                    .ok_or_else(|| format!("select question {} has no options", raw.id))?,
            },
            "boolean" => QuestionKind::Boolean,
            "slider" => QuestionKind::Slider {
                min: raw
                    .min
                    .ok_or_else(|| format!("slider question {} has no min", raw.id))?,
                max: raw
                    .max
                    .ok_or_else(|| format!("slider question {} has no max", raw.id))?,
                unit: raw.unit.unwrap_or_default(),
            },
            "text" => QuestionKind::Text,
            other => return Err(format!("unknown question type '{other}'")),
        };

        Ok(ClarificationQuestion {
            id: raw.id.trim().to_string(),
            question: raw.question.trim().to_string(),
            kind,
            required: raw.required,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssessment {
    overall_risk_score: f64,
    #[serde(default)]
    risk_factors: Vec<RawRiskFactor>,
    #[serde(default)]
    recommendations: Recommendations,
    confidence_score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRiskFactor {
    condition: String,
    risk_percentage: f64,
    severity: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    prevention_tips: Vec<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Round a model-supplied percentage and require it to lie in 0..=100.
fn percentage(field: &str, value: f64) -> Result<u8, GenerationError> {
    let rounded = value.round();
    if value.is_finite() && (0.0..=100.0).contains(&rounded) {
        Ok(rounded as u8)
    } else {
        Err(GenerationError::Malformed(format!(
            "{field} {value} is outside 0-100"
        )))
    }
}

/// Parse and validate a generated question batch.
pub fn parse_questions(
    raw: &str,
    max_questions: usize,
) -> Result<Vec<ClarificationQuestion>, GenerationError> {
    let json = extract_json(raw, '[', ']');
    let parsed: Vec<RawQuestion> = serde_json::from_str(&json).map_err(|e| {
        warn!(error = %e, response = raw, "Failed to parse generated questions");
        GenerationError::Malformed(format!("questions JSON: {e}"))
    })?;

    let questions = parsed
        .into_iter()
        .take(max_questions)
        .map(ClarificationQuestion::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(GenerationError::Malformed)?;

    validate_question_batch(&questions).map_err(GenerationError::Malformed)?;
    Ok(questions)
}

/// Parse and validate a generated risk assessment.
pub fn parse_assessment(raw: &str) -> Result<RiskAssessment, GenerationError> {
    let json = extract_json(raw, '{', '}');
    let parsed: RawAssessment = serde_json::from_str(&json).map_err(|e| {
        warn!(error = %e, response = raw, "Failed to parse generated assessment");
        GenerationError::Malformed(format!("assessment JSON: {e}"))
    })?;

    let risk_factors = parsed
        .risk_factors
        .into_iter()
        .map(|f| {
            let severity: Severity = f.severity.parse().map_err(GenerationError::Malformed)?;
            Ok(RiskFactor {
                risk_percentage: percentage("riskPercentage", f.risk_percentage)?,
                condition: f.condition.trim().to_string(),
                severity,
                explanation: f.explanation,
                prevention_tips: f.prevention_tips,
            })
        })
        .collect::<Result<Vec<_>, GenerationError>>()?;

    let assessment = RiskAssessment {
        overall_risk_score: percentage("overallRiskScore", parsed.overall_risk_score)?,
        risk_factors,
        recommendations: parsed.recommendations,
        confidence_score: percentage("confidenceScore", parsed.confidence_score)?,
    };
    assessment.validate().map_err(GenerationError::Malformed)?;
    Ok(assessment)
}

/// Extract a JSON array or object from model output that may wrap it in
/// markdown fences or prose.
fn extract_json(text: &str, open: char, close: char) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with(open) {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with(open) {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
