//! Health Assess: staged health-profile workflow with generated questions
//! and risk reports that fall back to fixed content when generation fails.

pub mod assessment;
pub mod config;
pub mod error;
pub mod generation;
pub mod llm;
