//! Presentable view of a finished assessment.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::metrics::{bmi_category, risk_tier, BmiCategory, RiskTier};
use super::model::{Recommendations, RiskFactor};
use super::store::HealthProfileStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsReport {
    pub age: u32,
    pub bmi: Option<f64>,
    pub bmi_category: Option<BmiCategory>,
    pub overall_risk_score: u8,
    pub risk_tier: RiskTier,
    pub confidence_score: u8,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Recommendations,
    pub assessed_at: Option<DateTime<Utc>>,
}

impl ResultsReport {
    /// Build the report from a store snapshot. `None` until an assessment
    /// has been stored.
    pub fn from_snapshot(store: &HealthProfileStore) -> Option<Self> {
        let assessment = store.assessment.as_ref()?;
        let bmi = store.personal_info.bmi;

        Some(Self {
            age: store.personal_info.age,
            bmi,
            bmi_category: bmi.map(bmi_category),
            overall_risk_score: assessment.overall_risk_score,
            risk_tier: risk_tier(assessment.overall_risk_score),
            confidence_score: assessment.confidence_score,
            risk_factors: assessment.risk_factors.clone(),
            recommendations: assessment.recommendations.clone(),
            assessed_at: store.assessed_at,
        })
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::with_capacity(1024);
        out.push_str("# Health Risk Assessment\n\n");

        let _ = writeln!(
            out,
            "**Overall risk:** {}/100 ({})  ",
            self.overall_risk_score, self.risk_tier
        );
        let _ = writeln!(out, "**Confidence:** {}%  ", self.confidence_score);
        match (self.bmi, self.bmi_category) {
            (Some(bmi), Some(category)) => {
                let _ = writeln!(out, "**BMI:** {bmi:.1} ({category})");
            }
            _ => out.push_str("**BMI:** not available\n"),
        }

        if !self.risk_factors.is_empty() {
            out.push_str("\n## Risk factors\n");
            for factor in &self.risk_factors {
                let _ = writeln!(
                    out,
                    "\n### {} ({}%, {})\n",
                    factor.condition, factor.risk_percentage, factor.severity
                );
                if !factor.explanation.is_empty() {
                    let _ = writeln!(out, "{}\n", factor.explanation);
                }
                for tip in &factor.prevention_tips {
                    let _ = writeln!(out, "- {tip}");
                }
            }
        }

        out.push_str("\n## Recommendations\n");
        let sections = [
            ("Lifestyle", &self.recommendations.lifestyle),
            ("Medical", &self.recommendations.medical),
            ("Monitoring", &self.recommendations.monitoring),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n### {title}\n");
            for item in items {
                let _ = writeln!(out, "- {item}");
            }
        }

        out.push('\n');
        if let Some(at) = self.assessed_at {
            let _ = writeln!(out, "_Assessed {}._  ", at.format("%Y-%m-%d %H:%M UTC"));
        }
        out.push_str("_This assessment is informational and is not a medical diagnosis._\n");
        out
    }
}
