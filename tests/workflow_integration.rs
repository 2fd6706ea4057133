//! End-to-end workflow tests through the public API.
//!
//! Each test drives a `StageController` from PersonalInfo to Results with a
//! stub LLM behind the real `LlmGenerationClient`, so prompt building,
//! response parsing, timeouts and fallback all run for real.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use health_assess::assessment::model::{AnswerValue, FamilyCondition, QuestionKind, SmokingStatus};
use health_assess::assessment::{
    risk_tier, LoadState, ProfileEdit, ResultsReport, RiskTier, Stage, StageController,
    StageEvent, Transition,
};
use health_assess::error::LlmError;
use health_assess::generation::{
    ContentSource, FallbackPolicy, GenerationConfig, Generator, LlmGenerationClient,
};
use health_assess::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const QUESTIONS: &str = r#"```json
[
  {"id": "q1", "question": "How many servings of vegetables do you eat per day?", "type": "slider", "min": 0, "max": 10, "unit": "servings", "required": true},
  {"id": "q2", "question": "Has a doctor ever said your blood pressure is high?", "type": "boolean", "required": true},
  {"id": "q3", "question": "Which best describes your work?", "type": "select", "options": ["Desk", "Mixed", "Manual"], "required": false}
]
```"#;

const ASSESSMENT: &str = r#"{
  "overallRiskScore": 47,
  "riskFactors": [
    {"condition": "Hypertension", "riskPercentage": 40, "severity": "moderate",
     "explanation": "Reported high readings and a family history of stroke.",
     "preventionTips": ["Reduce sodium", "Check blood pressure monthly"]},
    {"condition": "Lung Disease", "riskPercentage": 22, "severity": "low",
     "explanation": "Former smoker.", "preventionTips": ["Stay smoke-free"]}
  ],
  "recommendations": {
    "lifestyle": ["Walk 30 minutes daily"],
    "medical": ["Annual blood pressure review"],
    "monitoring": ["Home blood pressure log"]
  },
  "confidenceScore": 78
}"#;

enum Mode {
    /// Answer every call with well-formed JSON.
    Healthy,
    /// Fail every call at the transport layer.
    Down,
    /// Never answer.
    Slow,
    /// Answer with text that is not the requested JSON.
    Garbled,
}

/// Stub LLM provider for integration tests (no real API calls).
struct StubLlm {
    mode: Mode,
    calls: AtomicUsize,
}

impl StubLlm {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let wants_questions = request
            .system_prompt()
            .is_some_and(|p| p.contains("JSON array"));

        let content = match self.mode {
            Mode::Healthy if wants_questions => QUESTIONS.to_string(),
            Mode::Healthy => ASSESSMENT.to_string(),
            Mode::Down => {
                return Err(LlmError::RequestFailed {
                    provider: "stub".into(),
                    reason: "503 Service Unavailable".into(),
                });
            }
            Mode::Slow => std::future::pending().await,
            Mode::Garbled => "I'm sorry, I can't help with that.".to_string(),
        };

        Ok(CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }
}

fn controller(llm: Arc<StubLlm>) -> StageController {
    let client = LlmGenerationClient::new(llm, GenerationConfig::default());
    StageController::new(
        Arc::new(client),
        Generator::new(FallbackPolicy::new(), Duration::from_millis(200)),
    )
}

/// Fill a realistic profile and advance to Clarification(ready).
async fn walk_to_questions(ctl: &StageController) {
    for edit in [
        ProfileEdit::Age(58),
        ProfileEdit::Weight(92.0),
        ProfileEdit::Height(178.0),
        ProfileEdit::SmokingStatus(SmokingStatus::Former),
        ProfileEdit::StressLevel(7),
        ProfileEdit::FamilyFlag(FamilyCondition::Stroke, true),
    ] {
        ctl.edit(edit).await.unwrap();
    }

    assert_eq!(ctl.advance().await.stage(), Stage::Lifestyle);
    assert_eq!(ctl.advance().await.stage(), Stage::FamilyHistory);
    assert_eq!(
        ctl.advance().await.stage(),
        Stage::Clarification(LoadState::Loading)
    );
    assert_eq!(ctl.settled().await, Stage::Clarification(LoadState::Ready));
}

/// Answer every required question with a valid value and finish.
async fn finish(ctl: &StageController) -> ResultsReport {
    let store = ctl.snapshot().await;
    for q in store.questions.iter().filter(|q| q.required) {
        let value = match &q.kind {
            QuestionKind::Slider { min, .. } => AnswerValue::Number(*min),
            QuestionKind::Boolean => AnswerValue::Bool(true),
            QuestionKind::Select { options } => AnswerValue::Text(options[0].clone()),
            QuestionKind::Text => AnswerValue::Text("n/a".into()),
        };
        ctl.edit(ProfileEdit::Answer {
            id: q.id.clone(),
            value,
        })
        .await
        .unwrap();
    }

    assert!(ctl.advance().await.moved());
    assert_eq!(ctl.settled().await, Stage::Results(LoadState::Ready));
    ResultsReport::from_snapshot(&ctl.snapshot().await).unwrap()
}

#[tokio::test]
async fn healthy_service_produces_generated_content() {
    timeout(TEST_TIMEOUT, async {
        let llm = StubLlm::new(Mode::Healthy);
        let ctl = controller(llm.clone());
        let mut events = ctl.subscribe();

        walk_to_questions(&ctl).await;
        let store = ctl.snapshot().await;
        let ids: Vec<&str> = store.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2", "q3"]);
        assert_eq!(store.personal_info.bmi, Some(29.0));

        let report = finish(&ctl).await;
        assert_eq!(report.overall_risk_score, 47);
        assert_eq!(report.risk_tier, RiskTier::Elevated);
        assert_eq!(report.risk_factors.len(), 2);
        assert!(report.to_markdown().contains("### Hypertension (40%, moderate)"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);

        let mut sources = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let StageEvent::GenerationSettled { source, .. } = event {
                sources.push(source);
            }
        }
        assert_eq!(sources, [ContentSource::Generated, ContentSource::Generated]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failing_service_still_completes() {
    timeout(TEST_TIMEOUT, async {
        let llm = StubLlm::new(Mode::Down);
        let ctl = controller(llm.clone());

        walk_to_questions(&ctl).await;
        let questions = ctl.snapshot().await.questions;
        assert_eq!(questions, FallbackPolicy::new().default_questions());

        let report = finish(&ctl).await;
        assert_eq!(report.overall_risk_score, 25);
        assert_eq!(risk_tier(report.overall_risk_score).label(), "Moderate Risk");
        assert_eq!(report.confidence_score, 85);
        assert_eq!(report.risk_factors[0].condition, "Cardiovascular Disease");
        // Single attempt per call, no retries.
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn slow_service_times_out_to_fallback() {
    timeout(TEST_TIMEOUT, async {
        let ctl = controller(StubLlm::new(Mode::Slow));

        walk_to_questions(&ctl).await;
        assert_eq!(ctl.snapshot().await.questions.len(), 3);

        let report = finish(&ctl).await;
        assert_eq!(report.overall_risk_score, 25);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn garbled_output_falls_back() {
    timeout(TEST_TIMEOUT, async {
        let ctl = controller(StubLlm::new(Mode::Garbled));
        let mut events = ctl.subscribe();

        walk_to_questions(&ctl).await;
        let report = finish(&ctl).await;
        assert_eq!(report.overall_risk_score, 25);

        let mut fallbacks = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(
                event,
                StageEvent::GenerationSettled {
                    source: ContentSource::Fallback,
                    ..
                }
            ) {
                fallbacks += 1;
            }
        }
        assert_eq!(fallbacks, 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn reset_from_results_starts_over() {
    timeout(TEST_TIMEOUT, async {
        let ctl = controller(StubLlm::new(Mode::Healthy));
        walk_to_questions(&ctl).await;
        finish(&ctl).await;

        let ready = Stage::Results(LoadState::Ready);
        assert_eq!(ctl.advance().await, Transition::Stayed(ready));
        assert_eq!(ctl.retreat().await, Transition::Stayed(ready));

        ctl.reset().await;
        assert_eq!(ctl.stage().await, Stage::PersonalInfo);

        let store = ctl.snapshot().await;
        assert_eq!(store.personal_info.age, 0);
        assert_eq!(store.personal_info.weight, 0.0);
        assert_eq!(store.personal_info.height, 0.0);
        assert_eq!(store.lifestyle.sleep_hours, 8);
        assert_eq!(store.lifestyle.stress_level, 5);
        assert_eq!(store.lifestyle.exercise_frequency, 3);
        assert!(store.family_history.positive_conditions().is_empty());
        assert!(store.family_history.other.is_empty());
        assert!(store.questions.is_empty());
        assert!(store.answers.is_empty());
        assert!(store.assessment.is_none());

        // A second pass works from the clean session.
        walk_to_questions(&ctl).await;
        assert_eq!(finish(&ctl).await.overall_risk_score, 47);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn clarification_gate_ignores_optional_questions() {
    timeout(TEST_TIMEOUT, async {
        let ctl = controller(StubLlm::new(Mode::Healthy));
        walk_to_questions(&ctl).await;

        ctl.edit(ProfileEdit::Answer {
            id: "q1".into(),
            value: AnswerValue::Number(4.0),
        })
        .await
        .unwrap();
        let progress = ctl.required_progress().await;
        assert_eq!((progress.answered, progress.total), (1, 2));
        assert!(!ctl.can_proceed_clarification().await);
        assert!(!ctl.advance().await.moved());

        // An empty select answer does not count, and q3 is optional anyway.
        ctl.edit(ProfileEdit::Answer {
            id: "q3".into(),
            value: AnswerValue::Text(String::new()),
        })
        .await
        .unwrap();
        assert!(!ctl.can_proceed_clarification().await);

        ctl.edit(ProfileEdit::Answer {
            id: "q2".into(),
            value: AnswerValue::Bool(false),
        })
        .await
        .unwrap();
        assert!(ctl.can_proceed_clarification().await);
        assert!(ctl.advance().await.moved());
        assert_eq!(ctl.settled().await, Stage::Results(LoadState::Ready));
    })
    .await
    .expect("test timed out");
}
