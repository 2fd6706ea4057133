//! Prompt construction for the generation calls.

use crate::assessment::model::{ClarificationQuestion, QuestionKind};
use crate::assessment::store::{AssessmentInput, ProfileSnapshot};

/// System prompt for clarification-question generation.
pub fn questions_system_prompt(max_questions: usize) -> String {
    format!(
        "You are a health intake assistant. Given a user's health profile, write up to \
         {max_questions} short follow-up questions that would most improve a personalized \
         health risk assessment. Do not repeat information the profile already contains.\n\n\
         Respond with ONLY a JSON array. Each element is an object with:\n\
         - \"id\": unique string id (\"1\", \"2\", ...)\n\
         - \"question\": the question text\n\
         - \"type\": one of \"select\", \"boolean\", \"slider\", \"text\"\n\
         - \"options\": array of strings (only for \"select\")\n\
         - \"min\", \"max\": numbers and \"unit\": string (only for \"slider\")\n\
         - \"required\": true or false\n\n\
         Example output:\n\
         [{{\"id\": \"1\", \"question\": \"How many cups of coffee do you drink per day?\", \
         \"type\": \"slider\", \"min\": 0, \"max\": 10, \"unit\": \"cups\", \"required\": true}}]\n\n\
         ONLY output the JSON array. No other text."
    )
}

/// System prompt for risk-assessment generation.
pub fn assessment_system_prompt() -> String {
    "You are a preventive-health risk assistant. Given a user's health profile and their \
     answers to follow-up questions, estimate their health risks and give practical \
     recommendations. This is informational, not a diagnosis.\n\n\
     Respond with ONLY a JSON object:\n\
     {\"overallRiskScore\": 0-100, \
     \"riskFactors\": [{\"condition\": \"...\", \"riskPercentage\": 0-100, \
     \"severity\": \"low\"|\"moderate\"|\"high\", \"explanation\": \"...\", \
     \"preventionTips\": [\"...\"]}], \
     \"recommendations\": {\"lifestyle\": [\"...\"], \"medical\": [\"...\"], \"monitoring\": [\"...\"]}, \
     \"confidenceScore\": 0-100}\n\n\
     Rules:\n\
     - Integers only for scores and percentages\n\
     - List the most relevant risk factors first (at most 5)\n\
     - Keep each explanation to 1-2 sentences\n\
     - 2-4 items per recommendation list"
        .to_string()
}

/// Render the profile sections as a plain-text block.
pub fn render_profile(profile: &ProfileSnapshot) -> String {
    let p = &profile.personal_info;
    let l = &profile.lifestyle;
    let f = &profile.family_history;

    let mut out = String::with_capacity(512);
    out.push_str("Personal information:\n");
    out.push_str(&format!("- Age: {}\n", p.age));
    out.push_str(&format!("- Gender: {}\n", p.gender));
    out.push_str(&format!("- Weight: {} kg\n", p.weight));
    out.push_str(&format!("- Height: {} cm\n", p.height));
    if let Some(bmi) = p.bmi {
        out.push_str(&format!("- BMI: {bmi:.1}\n"));
    }

    out.push_str("\nLifestyle:\n");
    out.push_str(&format!("- Smoking: {}\n", l.smoking_status));
    out.push_str(&format!("- Alcohol: {}\n", l.alcohol_consumption));
    out.push_str(&format!("- Physical activity: {}\n", l.physical_activity));
    out.push_str(&format!("- Exercise: {} days per week\n", l.exercise_frequency));
    out.push_str(&format!("- Sleep: {} hours per night\n", l.sleep_hours));
    out.push_str(&format!("- Stress level: {}/10\n", l.stress_level));
    if !l.dietary_preferences.is_empty() {
        let prefs: Vec<&str> = l.dietary_preferences.iter().map(String::as_str).collect();
        out.push_str(&format!("- Diet: {}\n", prefs.join(", ")));
    }

    out.push_str("\nFamily history:\n");
    let conditions = f.positive_conditions();
    if conditions.is_empty() {
        out.push_str("- No listed conditions\n");
    } else {
        let names: Vec<String> = conditions.iter().map(ToString::to_string).collect();
        out.push_str(&format!("- {}\n", names.join(", ")));
    }
    if !f.other.trim().is_empty() {
        out.push_str(&format!("- Other: {}\n", f.other.trim()));
    }

    out
}

/// User prompt for the questions call.
pub fn questions_user_prompt(profile: &ProfileSnapshot) -> String {
    render_profile(profile)
}

/// User prompt for the assessment call: profile plus each question with its
/// answer (or a note that it was skipped).
pub fn assessment_user_prompt(input: &AssessmentInput) -> String {
    let mut out = render_profile(&input.profile);

    if !input.questions.is_empty() {
        out.push_str("\nFollow-up answers:\n");
        for q in &input.questions {
            let answer = input
                .answers
                .get(&q.id)
                .filter(|a| a.is_answered())
                .map(|a| format!("{a}{}", unit_suffix(q)))
                .unwrap_or_else(|| "(skipped)".to_string());
            out.push_str(&format!("- {} {}\n", q.question, answer));
        }
    }

    out
}

fn unit_suffix(question: &ClarificationQuestion) -> String {
    match &question.kind {
        QuestionKind::Slider { unit, .. } if !unit.is_empty() => format!(" {unit}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::model::{AnswerValue, FamilyCondition};
    use crate::assessment::store::{HealthProfileStore, ProfileEdit};
    use crate::generation::FallbackPolicy;

    fn sample_store() -> HealthProfileStore {
        let mut store = HealthProfileStore::new();
        store.apply(ProfileEdit::Age(52)).unwrap();
        store.apply(ProfileEdit::Weight(88.0)).unwrap();
        store.apply(ProfileEdit::Height(180.0)).unwrap();
        store.refresh_bmi();
        store.apply(ProfileEdit::AddDietaryPreference("keto".into())).unwrap();
        store
            .apply(ProfileEdit::FamilyFlag(FamilyCondition::HeartDisease, true))
            .unwrap();
        store.apply(ProfileEdit::FamilyOther("glaucoma".into())).unwrap();
        store
    }

    #[test]
    fn questions_prompt_mentions_limit_and_format() {
        let prompt = questions_system_prompt(4);
        assert!(prompt.contains("up to 4"));
        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("\"slider\""));
    }

    #[test]
    fn profile_rendering_includes_sections() {
        let text = render_profile(&sample_store().profile_snapshot());
        assert!(text.contains("Age: 52"));
        assert!(text.contains("BMI: 27.2"));
        assert!(text.contains("never smoked"));
        assert!(text.contains("Diet: keto"));
        assert!(text.contains("heart disease"));
        assert!(text.contains("Other: glaucoma"));
    }

    #[test]
    fn empty_family_history_is_stated() {
        let text = render_profile(&HealthProfileStore::new().profile_snapshot());
        assert!(text.contains("No listed conditions"));
        assert!(!text.contains("BMI"));
    }

    #[test]
    fn assessment_prompt_lists_answers_and_skips() {
        let mut store = sample_store();
        store.replace_questions(FallbackPolicy::new().default_questions());
        store
            .apply(ProfileEdit::Answer {
                id: "1".into(),
                value: AnswerValue::Number(7.0),
            })
            .unwrap();
        store
            .apply(ProfileEdit::Answer {
                id: "2".into(),
                value: AnswerValue::Bool(true),
            })
            .unwrap();

        let prompt = assessment_user_prompt(&store.assessment_input());
        assert!(prompt.contains("Follow-up answers"));
        assert!(prompt.contains("7 /10"));
        assert!(prompt.contains("checkups? yes"));
        assert!(prompt.contains("headaches? (skipped)"));
    }

    #[test]
    fn assessment_system_prompt_names_fields() {
        let prompt = assessment_system_prompt();
        assert!(prompt.contains("overallRiskScore"));
        assert!(prompt.contains("preventionTips"));
        assert!(prompt.contains("confidenceScore"));
    }
}
