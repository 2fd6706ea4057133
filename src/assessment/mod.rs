//! Staged health-profile workflow: data model, metrics, store, stage machine
//! and the controller that ties them together.

pub mod controller;
pub mod metrics;
pub mod model;
pub mod report;
pub mod state;
pub mod store;

pub use controller::{GenerationTicket, StageController, StageEvent, Transition};
pub use metrics::{bmi_category, compute_bmi, required_progress, risk_tier, BmiCategory, RiskTier};
pub use report::ResultsReport;
pub use state::{GenerationKind, LoadState, Stage};
pub use store::{AssessmentInput, HealthProfileStore, ProfileEdit, ProfileSnapshot};
