//! Workflow stage state machine.

use serde::{Deserialize, Serialize};

/// Whether a generation stage has its content yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Ready,
}

/// The five workflow stages. The two generation stages carry a load state.
///
/// Progresses linearly: PersonalInfo → Lifestyle → FamilyHistory →
/// Clarification → Results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "stage", content = "load", rename_all = "snake_case")]
pub enum Stage {
    PersonalInfo,
    Lifestyle,
    FamilyHistory,
    Clarification(LoadState),
    Results(LoadState),
}

/// Which generation call a stage depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    ClarificationQuestions,
    RiskAssessment,
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClarificationQuestions => write!(f, "clarification_questions"),
            Self::RiskAssessment => write!(f, "risk_assessment"),
        }
    }
}

impl Stage {
    /// Stage entered by advancing, if any. Generation stages are entered
    /// in the loading state.
    pub fn next(&self) -> Option<Stage> {
        use Stage::*;
        match self {
            PersonalInfo => Some(Lifestyle),
            Lifestyle => Some(FamilyHistory),
            FamilyHistory => Some(Clarification(LoadState::Loading)),
            Clarification(LoadState::Ready) => Some(Results(LoadState::Loading)),
            Clarification(LoadState::Loading) | Results(_) => None,
        }
    }

    /// Stage entered by retreating, if any. Results cannot be left backwards;
    /// only a reset leaves it.
    pub fn previous(&self) -> Option<Stage> {
        use Stage::*;
        match self {
            Lifestyle => Some(PersonalInfo),
            FamilyHistory => Some(Lifestyle),
            Clarification(_) => Some(FamilyHistory),
            PersonalInfo | Results(_) => None,
        }
    }

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        use Stage::*;
        self.next() == Some(target)
            || self.previous() == Some(target)
            || matches!(
                (self, target),
                (Clarification(LoadState::Loading), Clarification(LoadState::Ready))
                    | (Results(LoadState::Loading), Results(LoadState::Ready))
            )
    }

    /// Forward progress ends here; only a reset leaves it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Results(LoadState::Ready))
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            Self::Clarification(LoadState::Loading) | Self::Results(LoadState::Loading)
        )
    }

    /// The generation call this stage waits on, if it is loading.
    pub fn pending_generation(&self) -> Option<GenerationKind> {
        match self {
            Self::Clarification(LoadState::Loading) => Some(GenerationKind::ClarificationQuestions),
            Self::Results(LoadState::Loading) => Some(GenerationKind::RiskAssessment),
            _ => None,
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::PersonalInfo
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PersonalInfo => "personal_info",
            Self::Lifestyle => "lifestyle",
            Self::FamilyHistory => "family_history",
            Self::Clarification(LoadState::Loading) => "clarification(loading)",
            Self::Clarification(LoadState::Ready) => "clarification(ready)",
            Self::Results(LoadState::Loading) => "results(loading)",
            Self::Results(LoadState::Ready) => "results(ready)",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::LoadState::*;

    #[test]
    fn next_walks_all_stages() {
        let mut current = Stage::default();
        assert_eq!(current, Stage::PersonalInfo);

        let expected = [Stage::Lifestyle, Stage::FamilyHistory, Stage::Clarification(Loading)];
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }

        // Loading blocks forward progress until the content is ready.
        assert!(current.next().is_none());
        assert_eq!(Stage::Clarification(Ready).next(), Some(Stage::Results(Loading)));
        assert!(Stage::Results(Loading).next().is_none());
        assert!(Stage::Results(Ready).next().is_none());
    }

    #[test]
    fn previous_only_from_middle_stages() {
        assert!(Stage::PersonalInfo.previous().is_none());
        assert_eq!(Stage::Lifestyle.previous(), Some(Stage::PersonalInfo));
        assert_eq!(Stage::FamilyHistory.previous(), Some(Stage::Lifestyle));
        assert_eq!(Stage::Clarification(Loading).previous(), Some(Stage::FamilyHistory));
        assert_eq!(Stage::Clarification(Ready).previous(), Some(Stage::FamilyHistory));
        assert!(Stage::Results(Loading).previous().is_none());
        assert!(Stage::Results(Ready).previous().is_none());
    }

    #[test]
    fn valid_and_invalid_transitions() {
        assert!(Stage::Clarification(Loading).can_transition_to(Stage::Clarification(Ready)));
        assert!(Stage::Results(Loading).can_transition_to(Stage::Results(Ready)));
        assert!(Stage::FamilyHistory.can_transition_to(Stage::Lifestyle));

        // Skip stages
        assert!(!Stage::PersonalInfo.can_transition_to(Stage::FamilyHistory));
        // Bypass loading
        assert!(!Stage::FamilyHistory.can_transition_to(Stage::Clarification(Ready)));
        // Un-ready
        assert!(!Stage::Results(Ready).can_transition_to(Stage::Results(Loading)));
        // Self-transition
        assert!(!Stage::Lifestyle.can_transition_to(Stage::Lifestyle));
    }

    #[test]
    fn terminal_and_loading() {
        assert!(Stage::Results(Ready).is_terminal());
        assert!(!Stage::Results(Loading).is_terminal());
        assert!(Stage::Clarification(Loading).is_loading());
        assert!(!Stage::Clarification(Ready).is_loading());
        assert_eq!(
            Stage::Results(Loading).pending_generation(),
            Some(GenerationKind::RiskAssessment)
        );
        assert_eq!(Stage::Lifestyle.pending_generation(), None);
    }

    #[test]
    fn stage_serializes_with_load_tag() {
        let json = serde_json::to_value(Stage::Clarification(Loading)).unwrap();
        assert_eq!(json, serde_json::json!({"stage": "clarification", "load": "loading"}));
        let json = serde_json::to_value(Stage::Lifestyle).unwrap();
        assert_eq!(json, serde_json::json!({"stage": "lifestyle"}));
    }
}
