//! StageController: drives one assessment session through its stages.
//!
//! Owns the session (stage + profile store) behind an `RwLock`. Field edits,
//! gate checks and navigation take the lock briefly and never suspend on
//! anything else. Entering a generation stage spawns a task that runs the
//! generation call with fallback and applies the result when it settles.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ProfileError;
use crate::generation::{ContentSource, GenerationClient, Generator};

use super::metrics::RequiredProgress;
use super::state::{GenerationKind, LoadState, Stage};
use super::store::{HealthProfileStore, ProfileEdit};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Notifications for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageEvent {
    StageChanged { from: Stage, to: Stage },
    GenerationSettled { kind: GenerationKind, source: ContentSource },
    SessionReset { session_id: Uuid },
}

/// Result of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: Stage, to: Stage },
    /// The gate did not pass or no move exists from here. Nothing changed.
    Stayed(Stage),
}

impl Transition {
    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }

    /// The stage the session is in after the request.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Moved { to, .. } => *to,
            Self::Stayed(stage) => *stage,
        }
    }
}

/// Identifies one generation call. A result is applied only while the
/// session still holds the same ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationTicket {
    pub session_id: Uuid,
    pub sequence: u64,
    pub kind: GenerationKind,
}

struct InFlight {
    ticket: GenerationTicket,
    handle: JoinHandle<()>,
}

struct Session {
    id: Uuid,
    stage: Stage,
    store: HealthProfileStore,
    sequence: u64,
    in_flight: Option<InFlight>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::default(),
            store: HealthProfileStore::new(),
            sequence: 0,
            in_flight: None,
        }
    }

    fn holds(&self, ticket: &GenerationTicket) -> bool {
        self.in_flight.as_ref().is_some_and(|f| f.ticket == *ticket)
    }

    /// Abort and forget any pending generation.
    fn cancel_generation(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
            debug!(
                session_id = %self.id,
                kind = %in_flight.ticket.kind,
                sequence = in_flight.ticket.sequence,
                "Cancelled in-flight generation"
            );
        }
    }

    /// Whether the current stage's progression gate passes.
    fn gate_passes(&self) -> bool {
        match self.stage {
            Stage::PersonalInfo => self.store.personal_info_complete(),
            Stage::Lifestyle | Stage::FamilyHistory => true,
            Stage::Clarification(LoadState::Ready) => self.store.clarification_complete(),
            Stage::Clarification(LoadState::Loading) | Stage::Results(_) => false,
        }
    }
}

pub struct StageController {
    session: Arc<RwLock<Session>>,
    client: Arc<dyn GenerationClient>,
    generator: Generator,
    tx: broadcast::Sender<StageEvent>,
}

impl StageController {
    pub fn new(client: Arc<dyn GenerationClient>, generator: Generator) -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            session: Arc::new(RwLock::new(Session::new())),
            client,
            generator,
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.tx.subscribe()
    }

    pub async fn stage(&self) -> Stage {
        self.session.read().await.stage
    }

    pub async fn session_id(&self) -> Uuid {
        self.session.read().await.id
    }

    /// Read-only copy of the profile store.
    pub async fn snapshot(&self) -> HealthProfileStore {
        self.session.read().await.store.clone()
    }

    /// Ticket of the generation currently pending, if any.
    pub async fn in_flight(&self) -> Option<GenerationTicket> {
        self.session
            .read()
            .await
            .in_flight
            .as_ref()
            .map(|f| f.ticket)
    }

    // ── Gates ───────────────────────────────────────────────────────

    pub async fn can_proceed_personal_info(&self) -> bool {
        self.session.read().await.store.personal_info_complete()
    }

    pub async fn can_proceed_clarification(&self) -> bool {
        self.session.read().await.store.clarification_complete()
    }

    pub async fn required_progress(&self) -> RequiredProgress {
        self.session.read().await.store.required_progress()
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Apply one field edit. Allowed in any stage; a pending generation
    /// keeps the inputs it was started with.
    pub async fn edit(&self, edit: ProfileEdit) -> Result<(), ProfileError> {
        let mut session = self.session.write().await;
        session.store.apply(edit)
    }

    /// Move forward if the current stage's gate passes. Otherwise nothing
    /// changes.
    pub async fn advance(&self) -> Transition {
        let mut session = self.session.write().await;
        let from = session.stage;

        let Some(to) = from.next().filter(|_| session.gate_passes()) else {
            debug!(session_id = %session.id, stage = %from, "Advance blocked");
            return Transition::Stayed(from);
        };

        debug_assert!(from.can_transition_to(to));
        if from == Stage::PersonalInfo {
            let bmi = session.store.refresh_bmi();
            debug!(session_id = %session.id, bmi = ?bmi, "Computed BMI");
        }

        session.stage = to;
        info!(session_id = %session.id, from = %from, to = %to, "Stage advanced");

        if let Some(kind) = to.pending_generation() {
            self.start_generation(&mut session, kind);
        }
        drop(session);

        let _ = self.tx.send(StageEvent::StageChanged { from, to });
        Transition::Moved { from, to }
    }

    /// Move back one stage, keeping everything already entered. Leaving a
    /// loading stage cancels its generation.
    pub async fn retreat(&self) -> Transition {
        let mut session = self.session.write().await;
        let from = session.stage;

        let Some(to) = from.previous() else {
            debug!(session_id = %session.id, stage = %from, "Retreat blocked");
            return Transition::Stayed(from);
        };

        debug_assert!(from.can_transition_to(to));
        if from.is_loading() {
            session.cancel_generation();
        }
        session.stage = to;
        info!(session_id = %session.id, from = %from, to = %to, "Stage retreated");
        drop(session);

        let _ = self.tx.send(StageEvent::StageChanged { from, to });
        Transition::Moved { from, to }
    }

    /// Discard the session and start a fresh one at PersonalInfo with every
    /// field at its default. Works from any stage, including mid-generation.
    pub async fn reset(&self) {
        let mut session = self.session.write().await;
        session.cancel_generation();

        let from = session.stage;
        let old_id = session.id;
        session.id = Uuid::new_v4();
        session.stage = Stage::PersonalInfo;
        session.store.reset();
        let new_id = session.id;
        drop(session);

        info!(old_session = %old_id, session_id = %new_id, from = %from, "Session reset");
        let _ = self.tx.send(StageEvent::SessionReset { session_id: new_id });
        if from != Stage::PersonalInfo {
            let _ = self.tx.send(StageEvent::StageChanged {
                from,
                to: Stage::PersonalInfo,
            });
        }
    }

    /// Wait until the session is not in a loading stage and return the
    /// stage it settled in.
    pub async fn settled(&self) -> Stage {
        let mut rx = self.tx.subscribe();
        loop {
            let stage = self.stage().await;
            if !stage.is_loading() {
                return stage;
            }
            match rx.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return self.stage().await,
            }
        }
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Spawn the generation for a freshly entered loading stage. Inputs are
    /// captured now; later edits do not reach this call.
    fn start_generation(&self, session: &mut Session, kind: GenerationKind) {
        session.cancel_generation();
        session.sequence += 1;
        let ticket = GenerationTicket {
            session_id: session.id,
            sequence: session.sequence,
            kind,
        };

        info!(session_id = %ticket.session_id, kind = %kind, sequence = ticket.sequence, "Generation started");

        let shared = Arc::clone(&self.session);
        let client = Arc::clone(&self.client);
        let generator = self.generator.clone();
        let tx = self.tx.clone();

        let handle = match kind {
            GenerationKind::ClarificationQuestions => {
                let profile = session.store.profile_snapshot();
                tokio::spawn(async move {
                    let settled = generator.questions(client.as_ref(), &profile).await;
                    let source = settled.source;
                    apply_settled(&shared, &tx, ticket, source, |store| {
                        store.replace_questions(settled.value);
                    })
                    .await;
                })
            }
            GenerationKind::RiskAssessment => {
                let input = session.store.assessment_input();
                tokio::spawn(async move {
                    let settled = generator.assessment(client.as_ref(), &input).await;
                    let source = settled.source;
                    apply_settled(&shared, &tx, ticket, source, |store| {
                        store.replace_assessment(settled.value);
                    })
                    .await;
                })
            }
        };

        session.in_flight = Some(InFlight { ticket, handle });
    }
}

impl Drop for StageController {
    fn drop(&mut self) {
        if let Ok(mut session) = self.session.try_write() {
            session.cancel_generation();
        }
    }
}

/// Apply a settled generation if `ticket` is still the session's pending
/// call, then mark the stage ready.
async fn apply_settled(
    session: &RwLock<Session>,
    tx: &broadcast::Sender<StageEvent>,
    ticket: GenerationTicket,
    source: ContentSource,
    apply: impl FnOnce(&mut HealthProfileStore),
) {
    let mut session = session.write().await;
    if !session.holds(&ticket) {
        debug!(
            session_id = %ticket.session_id,
            kind = %ticket.kind,
            sequence = ticket.sequence,
            "Discarding stale generation result"
        );
        return;
    }

    let from = session.stage;
    let to = match ticket.kind {
        GenerationKind::ClarificationQuestions => Stage::Clarification(LoadState::Ready),
        GenerationKind::RiskAssessment => Stage::Results(LoadState::Ready),
    };
    if !from.can_transition_to(to) {
        debug!(
            session_id = %session.id,
            kind = %ticket.kind,
            stage = %from,
            "Discarding generation result for a stage that is not loading"
        );
        session.in_flight = None;
        return;
    }

    apply(&mut session.store);
    session.in_flight = None;
    session.stage = to;
    info!(
        session_id = %session.id,
        kind = %ticket.kind,
        source = %source,
        stage = %to,
        "Generation settled"
    );
    drop(session);

    let _ = tx.send(StageEvent::GenerationSettled {
        kind: ticket.kind,
        source,
    });
    let _ = tx.send(StageEvent::StageChanged { from, to });
}
