//! Question and assessment generation with a fixed fallback path.

pub mod client;
pub mod fallback;
pub mod prompts;

pub use client::{
    parse_assessment, parse_questions, GenerationClient, GenerationConfig, LlmGenerationClient,
    OfflineGenerationClient,
};
pub use fallback::FallbackPolicy;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assessment::model::{validate_question_batch, ClarificationQuestion, RiskAssessment};
use crate::assessment::state::GenerationKind;
use crate::assessment::store::{AssessmentInput, ProfileSnapshot};
use crate::config::AssessConfig;
use crate::error::{GenerationError, LlmError};
use crate::llm::{create_provider, LlmConfig};

/// Where a stage's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Generated,
    Fallback,
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A settled generation: always a usable value, tagged with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled<T> {
    pub value: T,
    pub source: ContentSource,
}

/// Runs one generation attempt under a deadline and substitutes fallback
/// content on any failure.
#[derive(Debug, Clone)]
pub struct Generator {
    fallback: FallbackPolicy,
    timeout: Duration,
}

impl Generator {
    pub fn new(fallback: FallbackPolicy, timeout: Duration) -> Self {
        Self { fallback, timeout }
    }

    pub fn from_config(config: &AssessConfig) -> Self {
        Self::new(FallbackPolicy::new(), config.generation_timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn questions(
        &self,
        client: &dyn GenerationClient,
        profile: &ProfileSnapshot,
    ) -> Settled<Vec<ClarificationQuestion>> {
        let attempt = self
            .deadline(client.generate_clarification_questions(profile))
            .await
            .and_then(|questions| {
                validate_question_batch(&questions).map_err(GenerationError::Malformed)?;
                Ok(questions)
            });

        self.settle(GenerationKind::ClarificationQuestions, attempt, || {
            self.fallback.default_questions()
        })
    }

    pub async fn assessment(
        &self,
        client: &dyn GenerationClient,
        input: &AssessmentInput,
    ) -> Settled<RiskAssessment> {
        let attempt = self
            .deadline(client.generate_risk_assessment(input))
            .await
            .and_then(|assessment| {
                assessment.validate().map_err(GenerationError::Malformed)?;
                Ok(assessment)
            });

        self.settle(GenerationKind::RiskAssessment, attempt, || {
            self.fallback.default_assessment()
        })
    }

    async fn deadline<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, GenerationError>>,
    ) -> Result<T, GenerationError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        }
    }

    fn settle<T>(
        &self,
        kind: GenerationKind,
        attempt: Result<T, GenerationError>,
        fallback: impl FnOnce() -> T,
    ) -> Settled<T> {
        match attempt {
            Ok(value) => {
                info!(kind = %kind, "Generation succeeded");
                Settled {
                    value,
                    source: ContentSource::Generated,
                }
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Generation failed, using fallback content");
                Settled {
                    value: fallback(),
                    source: ContentSource::Fallback,
                }
            }
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(FallbackPolicy::new(), Duration::from_secs(30))
    }
}

/// Pick the client for a configuration: LLM-backed when an API key is set,
/// offline otherwise.
pub fn client_from_config(config: &AssessConfig) -> Result<Arc<dyn GenerationClient>, LlmError> {
    let Some(api_key) = config.api_key.clone() else {
        warn!("ANTHROPIC_API_KEY not set; every generation will use fallback content");
        return Ok(Arc::new(OfflineGenerationClient));
    };

    let llm = create_provider(&LlmConfig {
        api_key,
        model: config.model.clone(),
        base_url: config.api_url.clone(),
    })?;
    let generation = GenerationConfig {
        max_questions: config.max_questions,
        temperature: config.temperature,
        ..GenerationConfig::default()
    };
    Ok(Arc::new(LlmGenerationClient::new(llm, generation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::assessment::model::QuestionKind;
    use crate::assessment::store::HealthProfileStore;

    enum Behavior {
        Succeed,
        Fail,
        Hang,
        Invalid,
    }

    struct StubClient(Behavior);

    fn one_question() -> Vec<ClarificationQuestion> {
        vec![ClarificationQuestion {
            id: "sleep".into(),
            question: "Do you wake up rested?".into(),
            kind: QuestionKind::Boolean,
            required: true,
        }]
    }

    #[async_trait]
    impl GenerationClient for StubClient {
        async fn generate_clarification_questions(
            &self,
            _profile: &ProfileSnapshot,
        ) -> Result<Vec<ClarificationQuestion>, GenerationError> {
            match self.0 {
                Behavior::Succeed => Ok(one_question()),
                Behavior::Fail => Err(GenerationError::Unavailable("down".into())),
                Behavior::Hang => std::future::pending().await,
                Behavior::Invalid => Ok(Vec::new()),
            }
        }

        async fn generate_risk_assessment(
            &self,
            _input: &AssessmentInput,
        ) -> Result<RiskAssessment, GenerationError> {
            match self.0 {
                Behavior::Succeed => {
                    let mut assessment = FallbackPolicy::new().default_assessment();
                    assessment.overall_risk_score = 70;
                    Ok(assessment)
                }
                Behavior::Fail => Err(GenerationError::Malformed("garbage".into())),
                Behavior::Hang => std::future::pending().await,
                Behavior::Invalid => {
                    let mut assessment = FallbackPolicy::new().default_assessment();
                    assessment.confidence_score = 150;
                    Ok(assessment)
                }
            }
        }
    }

    fn generator() -> Generator {
        Generator::new(FallbackPolicy::new(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn success_is_tagged_generated() {
        let store = HealthProfileStore::new();
        let settled = generator()
            .questions(&StubClient(Behavior::Succeed), &store.profile_snapshot())
            .await;
        assert_eq!(settled.source, ContentSource::Generated);
        assert_eq!(settled.value, one_question());

        let settled = generator()
            .assessment(&StubClient(Behavior::Succeed), &store.assessment_input())
            .await;
        assert_eq!(settled.source, ContentSource::Generated);
        assert_eq!(settled.value.overall_risk_score, 70);
    }

    #[tokio::test]
    async fn failure_uses_fallback() {
        let store = HealthProfileStore::new();
        let settled = generator()
            .questions(&StubClient(Behavior::Fail), &store.profile_snapshot())
            .await;
        assert_eq!(settled.source, ContentSource::Fallback);
        assert_eq!(settled.value, FallbackPolicy::new().default_questions());

        let settled = generator()
            .assessment(&StubClient(Behavior::Fail), &store.assessment_input())
            .await;
        assert_eq!(settled.source, ContentSource::Fallback);
        assert_eq!(settled.value.overall_risk_score, 25);
    }

    #[tokio::test]
    async fn timeout_uses_fallback() {
        let store = HealthProfileStore::new();
        let settled = generator()
            .questions(&StubClient(Behavior::Hang), &store.profile_snapshot())
            .await;
        assert_eq!(settled.source, ContentSource::Fallback);

        let settled = generator()
            .assessment(&StubClient(Behavior::Hang), &store.assessment_input())
            .await;
        assert_eq!(settled.source, ContentSource::Fallback);
    }

    #[tokio::test]
    async fn offline_config_settles_on_fallback() {
        let config = AssessConfig::default();
        let client = client_from_config(&config).unwrap();
        let generator = Generator::from_config(&config);
        assert_eq!(generator.timeout(), Duration::from_secs(30));

        let store = HealthProfileStore::new();
        let settled = generator
            .questions(client.as_ref(), &store.profile_snapshot())
            .await;
        assert_eq!(settled.source, ContentSource::Fallback);
    }

    #[tokio::test]
    async fn invalid_output_uses_fallback() {
        let store = HealthProfileStore::new();
        let settled = generator()
            .questions(&StubClient(Behavior::Invalid), &store.profile_snapshot())
            .await;
        assert_eq!(settled.source, ContentSource::Fallback);
        assert_eq!(settled.value.len(), 3);

        let settled = generator()
            .assessment(&StubClient(Behavior::Invalid), &store.assessment_input())
            .await;
        assert_eq!(settled.source, ContentSource::Fallback);
        assert_eq!(settled.value.confidence_score, 85);
    }
}
