//! Derived metrics: BMI, BMI category, risk tier, required-answer progress.
//!
//! Everything here is pure and side-effect free.

use serde::{Deserialize, Serialize};

use super::model::{ClarificationAnswers, ClarificationQuestion};

/// Body-mass index rounded to one decimal.
///
/// Defined only when both weight (kg) and height (cm) are positive and finite
/// and the quotient itself is finite.
pub fn compute_bmi(weight: f64, height: f64) -> Option<f64> {
    if !(weight.is_finite() && height.is_finite()) || weight <= 0.0 || height <= 0.0 {
        return None;
    }
    let meters = height / 100.0;
    let raw = weight / (meters * meters);
    if !raw.is_finite() {
        return None;
    }
    Some((raw * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl std::fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        };
        write!(f, "{s}")
    }
}

pub fn bmi_category(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

/// Overall-risk tier. Tiers partition 0..=100, upper bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    Elevated,
    High,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::Elevated => "Elevated Risk",
            Self::High => "High Risk",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

pub fn risk_tier(score: u8) -> RiskTier {
    match score {
        0..=20 => RiskTier::Low,
        21..=40 => RiskTier::Moderate,
        41..=60 => RiskTier::Elevated,
        _ => RiskTier::High,
    }
}

/// Answered vs total count over required questions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredProgress {
    pub answered: usize,
    pub total: usize,
}

impl RequiredProgress {
    /// Vacuously true when nothing is required.
    pub fn can_proceed(&self) -> bool {
        self.answered == self.total
    }
}

pub fn required_progress(
    questions: &[ClarificationQuestion],
    answers: &ClarificationAnswers,
) -> RequiredProgress {
    let (answered, total) = questions
        .iter()
        .filter(|q| q.required)
        .fold((0, 0), |(answered, total), q| {
            let hit = usize::from(answers.is_answered(&q.id));
            (answered + hit, total + 1)
        });
    RequiredProgress { answered, total }
}
