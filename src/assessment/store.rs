//! In-memory health profile store.
//!
//! Holds the four profile sections plus the generated questions and
//! assessment. Only `StageController` holds a mutable handle; every write is
//! synchronous and visible to the next gate evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

use super::metrics::{compute_bmi, required_progress, RequiredProgress};
use super::model::{
    AlcoholConsumption, AnswerValue, ClarificationAnswers, ClarificationQuestion, FamilyCondition,
    FamilyHistory, Gender, LifestyleFactors, PersonalInfo, PhysicalActivity, RiskAssessment,
    SmokingStatus, EXERCISE_FREQUENCY_RANGE, SLEEP_HOURS_RANGE, STRESS_LEVEL_RANGE,
};

/// A single field-level update. Each variant replaces exactly one field.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileEdit {
    Age(u32),
    Gender(Gender),
    Weight(f64),
    Height(f64),
    SmokingStatus(SmokingStatus),
    AlcoholConsumption(AlcoholConsumption),
    PhysicalActivity(PhysicalActivity),
    SleepHours(u8),
    AddDietaryPreference(String),
    RemoveDietaryPreference(String),
    StressLevel(u8),
    ExerciseFrequency(u8),
    FamilyFlag(FamilyCondition, bool),
    FamilyOther(String),
    Answer { id: String, value: AnswerValue },
    ClearAnswer(String),
}

/// Inputs for the clarification-question generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub personal_info: PersonalInfo,
    pub lifestyle: LifestyleFactors,
    pub family_history: FamilyHistory,
}

impl ProfileSnapshot {
    /// The edits that write this snapshot's sections into a fresh store.
    /// BMI is derived, so it is not carried over.
    pub fn into_edits(self) -> Vec<ProfileEdit> {
        let ProfileSnapshot {
            personal_info: p,
            lifestyle: l,
            family_history: f,
        } = self;

        let mut edits = vec![
            ProfileEdit::Age(p.age),
            ProfileEdit::Gender(p.gender),
            ProfileEdit::Weight(p.weight),
            ProfileEdit::Height(p.height),
            ProfileEdit::SmokingStatus(l.smoking_status),
            ProfileEdit::AlcoholConsumption(l.alcohol_consumption),
            ProfileEdit::PhysicalActivity(l.physical_activity),
            ProfileEdit::SleepHours(l.sleep_hours),
            ProfileEdit::StressLevel(l.stress_level),
            ProfileEdit::ExerciseFrequency(l.exercise_frequency),
        ];
        edits.extend(
            l.dietary_preferences
                .into_iter()
                .map(ProfileEdit::AddDietaryPreference),
        );
        edits.extend(
            FamilyCondition::ALL
                .into_iter()
                .map(|c| ProfileEdit::FamilyFlag(c, f.get(c))),
        );
        edits.push(ProfileEdit::FamilyOther(f.other));
        edits
    }
}

/// Inputs for the risk-assessment generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentInput {
    #[serde(flatten)]
    pub profile: ProfileSnapshot,
    pub questions: Vec<ClarificationQuestion>,
    pub answers: ClarificationAnswers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProfileStore {
    pub personal_info: PersonalInfo,
    pub lifestyle: LifestyleFactors,
    pub family_history: FamilyHistory,
    pub answers: ClarificationAnswers,
    pub questions: Vec<ClarificationQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<RiskAssessment>,
    /// When the current assessment was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessed_at: Option<DateTime<Utc>>,
}

impl HealthProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one field edit, validating it first. A rejected edit leaves the
    /// store untouched.
    pub fn apply(&mut self, edit: ProfileEdit) -> Result<(), ProfileError> {
        match edit {
            ProfileEdit::Age(age) => self.personal_info.age = age,
            ProfileEdit::Gender(gender) => self.personal_info.gender = gender,
            ProfileEdit::Weight(weight) => {
                self.personal_info.weight = check_measurement("weight", weight)?;
                self.track_bmi();
            }
            ProfileEdit::Height(height) => {
                self.personal_info.height = check_measurement("height", height)?;
                self.track_bmi();
            }
            ProfileEdit::SmokingStatus(status) => self.lifestyle.smoking_status = status,
            ProfileEdit::AlcoholConsumption(level) => self.lifestyle.alcohol_consumption = level,
            ProfileEdit::PhysicalActivity(level) => self.lifestyle.physical_activity = level,
            ProfileEdit::SleepHours(hours) => {
                self.lifestyle.sleep_hours = check_range("sleep_hours", hours, &SLEEP_HOURS_RANGE)?;
            }
            ProfileEdit::AddDietaryPreference(pref) => {
                let pref = pref.trim();
                if !pref.is_empty() {
                    self.lifestyle.dietary_preferences.insert(pref.to_string());
                }
            }
            ProfileEdit::RemoveDietaryPreference(pref) => {
                self.lifestyle.dietary_preferences.remove(pref.trim());
            }
            ProfileEdit::StressLevel(level) => {
                self.lifestyle.stress_level =
                    check_range("stress_level", level, &STRESS_LEVEL_RANGE)?;
            }
            ProfileEdit::ExerciseFrequency(days) => {
                self.lifestyle.exercise_frequency =
                    check_range("exercise_frequency", days, &EXERCISE_FREQUENCY_RANGE)?;
            }
            ProfileEdit::FamilyFlag(condition, value) => self.family_history.set(condition, value),
            ProfileEdit::FamilyOther(text) => self.family_history.other = text,
            ProfileEdit::Answer { id, value } => {
                let question = self
                    .question(&id)
                    .ok_or_else(|| ProfileError::UnknownQuestion(id.clone()))?;
                question.check_answer(&value)?;
                self.answers.insert(id, value);
            }
            ProfileEdit::ClearAnswer(id) => {
                self.answers.remove(&id);
            }
        }
        Ok(())
    }

    pub fn question(&self, id: &str) -> Option<&ClarificationQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Recompute and store BMI from the current weight and height.
    pub fn refresh_bmi(&mut self) -> Option<f64> {
        let bmi = compute_bmi(self.personal_info.weight, self.personal_info.height);
        self.personal_info.bmi = bmi;
        bmi
    }

    /// Keep an already computed BMI in step with the measurements.
    fn track_bmi(&mut self) {
        if self.personal_info.bmi.is_some() {
            self.refresh_bmi();
        }
    }

    /// Replace the question batch wholesale. Answers belong to the previous
    /// batch's ids and are dropped with it.
    pub fn replace_questions(&mut self, questions: Vec<ClarificationQuestion>) {
        self.questions = questions;
        self.answers = ClarificationAnswers::new();
    }

    pub fn replace_assessment(&mut self, assessment: RiskAssessment) {
        self.assessment = Some(assessment);
        self.assessed_at = Some(Utc::now());
    }

    /// Restore every section to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ── Progression gates ───────────────────────────────────────────

    pub fn personal_info_complete(&self) -> bool {
        let p = &self.personal_info;
        p.age > 0 && p.weight > 0.0 && p.height > 0.0
    }

    pub fn required_progress(&self) -> RequiredProgress {
        required_progress(&self.questions, &self.answers)
    }

    pub fn clarification_complete(&self) -> bool {
        self.required_progress().can_proceed()
    }

    // ── Generation inputs ───────────────────────────────────────────

    pub fn profile_snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            personal_info: self.personal_info.clone(),
            lifestyle: self.lifestyle.clone(),
            family_history: self.family_history.clone(),
        }
    }

    pub fn assessment_input(&self) -> AssessmentInput {
        AssessmentInput {
            profile: self.profile_snapshot(),
            questions: self.questions.clone(),
            answers: self.answers.clone(),
        }
    }
}

fn check_measurement(field: &'static str, value: f64) -> Result<f64, ProfileError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ProfileError::InvalidMeasurement { field, value })
    }
}

fn check_range(
    field: &'static str,
    value: u8,
    range: &std::ops::RangeInclusive<u8>,
) -> Result<u8, ProfileError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ProfileError::OutOfRange {
            field,
            min: f64::from(*range.start()),
            max: f64::from(*range.end()),
            value: f64::from(value),
        })
    }
}
