//! Fixed substitute content used whenever generation fails.

use crate::assessment::model::{
    ClarificationQuestion, QuestionKind, Recommendations, RiskAssessment, RiskFactor, Severity,
};

/// Supplies deterministic content so a generation failure never reaches the
/// user and never stalls the workflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPolicy;

impl FallbackPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Three standard questions: stress slider, checkups, headache frequency.
    pub fn default_questions(&self) -> Vec<ClarificationQuestion> {
        vec![
            ClarificationQuestion {
                id: "1".to_string(),
                question: "On a scale of 1 to 10, how would you rate your current stress level?"
                    .to_string(),
                kind: QuestionKind::Slider {
                    min: 1.0,
                    max: 10.0,
                    unit: "/10".to_string(),
                },
                required: true,
            },
            ClarificationQuestion {
                id: "2".to_string(),
                question: "Do you have regular medical checkups?".to_string(),
                kind: QuestionKind::Boolean,
                required: true,
            },
            ClarificationQuestion {
                id: "3".to_string(),
                question: "How often do you experience headaches?".to_string(),
                kind: QuestionKind::Select {
                    options: ["Never", "Rarely", "Monthly", "Weekly", "Daily"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                },
                required: false,
            },
        ]
    }

    /// A low-risk cardiovascular baseline with general recommendations.
    pub fn default_assessment(&self) -> RiskAssessment {
        RiskAssessment {
            overall_risk_score: 25,
            risk_factors: vec![RiskFactor {
                condition: "Cardiovascular Disease".to_string(),
                risk_percentage: 15,
                severity: Severity::Low,
                explanation: "Based on your current profile, your risk of cardiovascular disease \
                              is low. Keeping up healthy habits helps keep it that way."
                    .to_string(),
                prevention_tips: vec![
                    "Maintain regular physical activity".to_string(),
                    "Follow a heart-healthy diet".to_string(),
                ],
            }],
            recommendations: Recommendations {
                lifestyle: vec![
                    "Aim for at least 150 minutes of moderate exercise per week".to_string(),
                    "Keep a consistent sleep schedule".to_string(),
                ],
                medical: vec![
                    "Schedule an annual health checkup".to_string(),
                    "Discuss your family history with your doctor".to_string(),
                ],
                monitoring: vec![
                    "Check your blood pressure regularly".to_string(),
                    "Track your weight and activity levels".to_string(),
                ],
            },
            confidence_score: 85,
        }
    }
}
