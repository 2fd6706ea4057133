//! Health profile and generated-artifact data models.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Accepted nightly sleep hours.
pub const SLEEP_HOURS_RANGE: RangeInclusive<u8> = 4..=12;
/// Accepted self-reported stress level.
pub const STRESS_LEVEL_RANGE: RangeInclusive<u8> = 1..=10;
/// Accepted exercise days per week.
pub const EXERCISE_FREQUENCY_RANGE: RangeInclusive<u8> = 0..=7;
/// Bounds for every percentage-valued field of a risk assessment.
pub const PERCENT_RANGE: RangeInclusive<u8> = 0..=100;

// ── Personal info ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Body measurements and demographics.
///
/// `bmi` is first filled in when the personal-info stage is left. From then
/// on every weight or height edit recomputes it, so it always equals
/// `compute_bmi(weight, height)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    /// Years.
    pub age: u32,
    pub gender: Gender,
    /// Kilograms.
    pub weight: f64,
    /// Centimetres.
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
}

// ── Lifestyle ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SmokingStatus {
    #[default]
    Never,
    Former,
    CurrentLight,
    CurrentHeavy,
}

impl std::fmt::Display for SmokingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Never => "never smoked",
            Self::Former => "former smoker",
            Self::CurrentLight => "current light smoker",
            Self::CurrentHeavy => "current heavy smoker",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlcoholConsumption {
    #[default]
    None,
    Light,
    Moderate,
    Heavy,
}

impl std::fmt::Display for AlcoholConsumption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Heavy => "heavy",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalActivity {
    Sedentary,
    Light,
    #[default]
    Moderate,
    Vigorous,
}

impl std::fmt::Display for PhysicalActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sedentary => "sedentary",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Vigorous => "vigorous",
        };
        write!(f, "{s}")
    }
}

/// Unset fields in input take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifestyleFactors {
    pub smoking_status: SmokingStatus,
    pub alcohol_consumption: AlcoholConsumption,
    pub physical_activity: PhysicalActivity,
    pub sleep_hours: u8,
    #[serde(default)]
    pub dietary_preferences: BTreeSet<String>,
    pub stress_level: u8,
    /// Days per week.
    pub exercise_frequency: u8,
}

impl Default for LifestyleFactors {
    fn default() -> Self {
        Self {
            smoking_status: SmokingStatus::default(),
            alcohol_consumption: AlcoholConsumption::default(),
            physical_activity: PhysicalActivity::default(),
            sleep_hours: 8,
            dietary_preferences: BTreeSet::new(),
            stress_level: 5,
            exercise_frequency: 3,
        }
    }
}

// ── Family history ──────────────────────────────────────────────────

/// The conditions tracked as family-history flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FamilyCondition {
    HeartDisease,
    Diabetes,
    Cancer,
    Stroke,
    Alzheimers,
    Osteoporosis,
    MentalHealth,
    Autoimmune,
}

impl FamilyCondition {
    pub const ALL: [FamilyCondition; 8] = [
        Self::HeartDisease,
        Self::Diabetes,
        Self::Cancer,
        Self::Stroke,
        Self::Alzheimers,
        Self::Osteoporosis,
        Self::MentalHealth,
        Self::Autoimmune,
    ];
}

impl std::fmt::Display for FamilyCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HeartDisease => "heart disease",
            Self::Diabetes => "diabetes",
            Self::Cancer => "cancer",
            Self::Stroke => "stroke",
            Self::Alzheimers => "Alzheimer's disease",
            Self::Osteoporosis => "osteoporosis",
            Self::MentalHealth => "mental health conditions",
            Self::Autoimmune => "autoimmune disorders",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FamilyHistory {
    pub heart_disease: bool,
    pub diabetes: bool,
    pub cancer: bool,
    pub stroke: bool,
    pub alzheimers: bool,
    pub osteoporosis: bool,
    pub mental_health: bool,
    pub autoimmune: bool,
    #[serde(default)]
    pub other: String,
}

impl FamilyHistory {
    pub fn get(&self, condition: FamilyCondition) -> bool {
        match condition {
            FamilyCondition::HeartDisease => self.heart_disease,
            FamilyCondition::Diabetes => self.diabetes,
            FamilyCondition::Cancer => self.cancer,
            FamilyCondition::Stroke => self.stroke,
            FamilyCondition::Alzheimers => self.alzheimers,
            FamilyCondition::Osteoporosis => self.osteoporosis,
            FamilyCondition::MentalHealth => self.mental_health,
            FamilyCondition::Autoimmune => self.autoimmune,
        }
    }

    pub fn set(&mut self, condition: FamilyCondition, value: bool) {
        let flag = match condition {
            FamilyCondition::HeartDisease => &mut self.heart_disease,
            FamilyCondition::Diabetes => &mut self.diabetes,
            FamilyCondition::Cancer => &mut self.cancer,
            FamilyCondition::Stroke => &mut self.stroke,
            FamilyCondition::Alzheimers => &mut self.alzheimers,
            FamilyCondition::Osteoporosis => &mut self.osteoporosis,
            FamilyCondition::MentalHealth => &mut self.mental_health,
            FamilyCondition::Autoimmune => &mut self.autoimmune,
        };
        *flag = value;
    }

    /// Flags that are set, in declaration order.
    pub fn positive_conditions(&self) -> Vec<FamilyCondition> {
        FamilyCondition::ALL
            .into_iter()
            .filter(|c| self.get(*c))
            .collect()
    }
}

// ── Clarification questions & answers ───────────────────────────────

/// Question type together with the data only that type carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    Select { options: Vec<String> },
    Boolean,
    Slider { min: f64, max: f64, unit: String },
    Text,
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Select { .. } => "select",
            Self::Boolean => "boolean",
            Self::Slider { .. } => "slider",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationQuestion {
    pub id: String,
    pub question: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub required: bool,
}

impl ClarificationQuestion {
    /// Check that `answer` has the shape and range this question accepts.
    pub fn check_answer(&self, answer: &AnswerValue) -> Result<(), ProfileError> {
        let mismatch = || ProfileError::AnswerTypeMismatch {
            id: self.id.clone(),
            expected: self.kind.label(),
        };

        match (&self.kind, answer) {
            (QuestionKind::Select { options }, AnswerValue::Text(value)) => {
                if value.is_empty() || options.iter().any(|o| o == value) {
                    Ok(())
                } else {
                    Err(ProfileError::UnknownOption {
                        id: self.id.clone(),
                        value: value.clone(),
                    })
                }
            }
            (QuestionKind::Boolean, AnswerValue::Bool(_)) => Ok(()),
            (QuestionKind::Slider { min, max, .. }, AnswerValue::Number(n)) => {
                if n.is_finite() && *n >= *min && *n <= *max {
                    Ok(())
                } else {
                    Err(ProfileError::OutOfRange {
                        field: "slider answer",
                        min: *min,
                        max: *max,
                        value: *n,
                    })
                }
            }
            (QuestionKind::Text, AnswerValue::Text(_)) => Ok(()),
            _ => Err(mismatch()),
        }
    }

    /// Structural validity of a single question.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("question id is empty".into());
        }
        if self.question.trim().is_empty() {
            return Err(format!("question {} has no text", self.id));
        }
        match &self.kind {
            QuestionKind::Select { options } => {
                if options.is_empty() || options.iter().any(|o| o.trim().is_empty()) {
                    return Err(format!("select question {} needs non-empty options", self.id));
                }
            }
            QuestionKind::Slider { min, max, .. } => {
                if !min.is_finite() || !max.is_finite() || min >= max {
                    return Err(format!(
                        "slider question {} has invalid bounds {min}..{max}",
                        self.id
                    ));
                }
            }
            QuestionKind::Boolean | QuestionKind::Text => {}
        }
        Ok(())
    }
}

/// Validate a generated batch: non-empty, every question valid, ids unique.
pub fn validate_question_batch(questions: &[ClarificationQuestion]) -> Result<(), String> {
    if questions.is_empty() {
        return Err("no questions in batch".into());
    }
    let mut seen = HashSet::new();
    for q in questions {
        q.validate()?;
        if !seen.insert(q.id.as_str()) {
            return Err(format!("duplicate question id {}", q.id));
        }
    }
    Ok(())
}

/// An answer whose shape follows the question type.
///
/// Serialized untagged so it reads as a plain JSON string, bool or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AnswerValue {
    /// Whether this value counts toward a required question being answered.
    pub fn is_answered(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty(),
            Self::Bool(_) | Self::Number(_) => true,
        }
    }
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(true) => write!(f, "yes"),
            Self::Bool(false) => write!(f, "no"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Answers keyed by question id. Need not cover every question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClarificationAnswers(BTreeMap<String, AnswerValue>);

impl ClarificationAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&AnswerValue> {
        self.0.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, value: AnswerValue) {
        self.0.insert(id.into(), value);
    }

    pub fn remove(&mut self, id: &str) -> Option<AnswerValue> {
        self.0.remove(id)
    }

    /// Whether `id` holds a value that counts as answered.
    pub fn is_answered(&self, id: &str) -> bool {
        self.0.get(id).is_some_and(AnswerValue::is_answered)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }
}

// ── Risk assessment ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "moderate" | "medium" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub condition: String,
    pub risk_percentage: u8,
    pub severity: Severity,
    pub explanation: String,
    pub prevention_tips: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub lifestyle: Vec<String>,
    pub medical: Vec<String>,
    pub monitoring: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub overall_risk_score: u8,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Recommendations,
    pub confidence_score: u8,
}

impl RiskAssessment {
    /// Structural validity: every percentage within 0..=100 and every
    /// risk factor named.
    pub fn validate(&self) -> Result<(), String> {
        if !PERCENT_RANGE.contains(&self.overall_risk_score) {
            return Err(format!("overall risk score {} out of range", self.overall_risk_score));
        }
        if !PERCENT_RANGE.contains(&self.confidence_score) {
            return Err(format!("confidence score {} out of range", self.confidence_score));
        }
        for factor in &self.risk_factors {
            if factor.condition.trim().is_empty() {
                return Err("risk factor without a condition".into());
            }
            if !PERCENT_RANGE.contains(&factor.risk_percentage) {
                return Err(format!(
                    "risk percentage {} for {} out of range",
                    factor.risk_percentage, factor.condition
                ));
            }
        }
        Ok(())
    }
}
