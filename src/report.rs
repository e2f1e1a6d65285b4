//! End-of-session risk reports
//!
//! A report condenses every assessment collected during a proctoring session into a
//! risk level, a list of incidents, proctor recommendations, and summary statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Category, CategoryAssessment};

/// Upper bound (inclusive) of the LOW band
pub const LOW_RISK_MAX: f64 = 0.3;

/// Upper bound (inclusive) of the MEDIUM band
pub const MEDIUM_RISK_MAX: f64 = 0.7;

/// Weight given to unrecognised categories when weighting a report.
///
/// Differs from aggregation, where unknown categories carry no weight.
const UNKNOWN_CATEGORY_REPORT_WEIGHT: f64 = 0.1;

/// Coarse risk band for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score <= LOW_RISK_MAX {
            RiskLevel::Low
        } else if score <= MEDIUM_RISK_MAX {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Display color used by proctor dashboards
    pub fn color(self) -> &'static str {
        match self {
            RiskLevel::Low => "green",
            RiskLevel::Medium => "yellow",
            RiskLevel::High => "red",
        }
    }

    pub fn recommendations(self) -> Vec<String> {
        let lines: &[&str] = match self {
            RiskLevel::High => &[
                "Immediate manual review required",
                "Consider flagging exam for investigation",
            ],
            RiskLevel::Medium => &[
                "Monitor closely for additional suspicious activity",
                "Review specific incidents",
            ],
            RiskLevel::Low => &["Continue normal monitoring"],
        };
        lines.iter().map(|s| s.to_string()).collect()
    }
}

/// An assessment together with the instant its tick was processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAssessment {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub assessment: CategoryAssessment,
}

impl RecordedAssessment {
    pub fn new(assessment: CategoryAssessment, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            assessment,
        }
    }
}

/// An alerting assessment surfaced in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub category: Category,
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    pub description: String,
}

/// Counts over all assessments in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_analyses: usize,
    pub total_alerts: usize,
    /// Percentage of assessments that alerted (0-100)
    pub alert_rate: f64,
    pub category_breakdown: BTreeMap<Category, usize>,
}

/// Final risk report for a proctoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub color: String,
    pub incidents: Vec<Incident>,
    pub recommendations: Vec<String>,
    pub summary: ReportSummary,
}

impl RiskReport {
    /// Build a report from the assessments recorded over a session.
    ///
    /// Each incident keeps the timestamp of the tick that produced it.
    pub fn generate(
        session_id: impl Into<String>,
        analyses: &[RecordedAssessment],
        duration_ms: i64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let overall_risk_score = weighted_score(analyses.iter().map(|r| &r.assessment));
        let risk_level = RiskLevel::from_score(overall_risk_score);

        Self {
            session_id: session_id.into(),
            generated_at,
            duration_ms,
            overall_risk_score,
            risk_level,
            color: risk_level.color().to_string(),
            incidents: extract_incidents(analyses),
            recommendations: risk_level.recommendations(),
            summary: summarize(analyses),
        }
    }
}

fn report_weight(category: &Category) -> f64 {
    match category {
        Category::Unknown(_) => UNKNOWN_CATEGORY_REPORT_WEIGHT,
        known => known.weight(),
    }
}

/// Weighted mean of assessment scores, 0 for an empty session
pub fn weighted_score<'a>(analyses: impl IntoIterator<Item = &'a CategoryAssessment>) -> f64 {
    let (total_score, total_weight) = analyses
        .into_iter()
        .fold((0.0_f64, 0.0_f64), |(score, weight), a| {
            let w = report_weight(&a.category);
            (score + a.risk_score * w, weight + w)
        });

    if total_weight > 0.0 {
        total_score / total_weight
    } else {
        0.0
    }
}

pub(crate) fn incident_description(category: &Category) -> &'static str {
    match category {
        Category::FaceDetection => "Suspicious face detection activity",
        Category::EyeMovement => "Unusual eye movement patterns detected",
        Category::AudioAnalysis => "Audio anomalies detected",
        Category::BrowserActivity => "Suspicious browser activity",
        Category::Unknown(_) => "Unknown incident",
    }
}

fn extract_incidents(analyses: &[RecordedAssessment]) -> Vec<Incident> {
    analyses
        .iter()
        .filter(|r| r.assessment.alert)
        .map(|r| Incident {
            category: r.assessment.category.clone(),
            timestamp: r.timestamp,
            risk_score: r.assessment.risk_score,
            description: incident_description(&r.assessment.category).to_string(),
        })
        .collect()
}

fn summarize(analyses: &[RecordedAssessment]) -> ReportSummary {
    let total_alerts = analyses.iter().filter(|r| r.assessment.alert).count();

    let mut category_breakdown = BTreeMap::new();
    for record in analyses {
        *category_breakdown
            .entry(record.assessment.category.clone())
            .or_insert(0) += 1;
    }

    let alert_rate = if analyses.is_empty() {
        0.0
    } else {
        (total_alerts as f64 / analyses.len() as f64) * 100.0
    };

    ReportSummary {
        total_analyses: analyses.len(),
        total_alerts,
        alert_rate,
        category_breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BrowserObservation, Observation};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn assessment(category: Category, risk_score: f64, alert: bool) -> CategoryAssessment {
        CategoryAssessment {
            category,
            risk_score,
            alert,
            details: Observation::Browser(BrowserObservation {
                tab_switches: 0,
                focus_lost: 0,
                copy_paste_count: 0,
            }),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap()
    }

    fn record(category: Category, risk_score: f64, alert: bool) -> RecordedAssessment {
        RecordedAssessment::new(assessment(category, risk_score, alert), at())
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.3), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.31), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.7), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.71), RiskLevel::High);
        assert_eq!(RiskLevel::High.color(), "red");
    }

    #[test]
    fn test_risk_level_serialization() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"MEDIUM\"");
    }

    #[test]
    fn test_empty_report() {
        let report = RiskReport::generate("session_empty", &[], 0, at());

        assert_eq!(report.overall_risk_score, 0.0);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert_eq!(report.color, "green");
        assert!(report.incidents.is_empty());
        assert_eq!(report.recommendations, vec!["Continue normal monitoring".to_string()]);
        assert_eq!(report.summary.total_analyses, 0);
        assert_eq!(report.summary.alert_rate, 0.0);
    }

    #[test]
    fn test_high_risk_report() {
        let analyses = vec![
            record(Category::FaceDetection, 1.0, true),
            record(Category::AudioAnalysis, 0.8, true),
            record(Category::FaceDetection, 0.5, false),
            record(Category::BrowserActivity, 0.9, true),
        ];
        let report = RiskReport::generate("session_x", &analyses, 60_000, at());

        // (1.0*0.3 + 0.8*0.25 + 0.5*0.3 + 0.9*0.2) / 1.05
        let expected = (0.3 + 0.2 + 0.15 + 0.18) / 1.05;
        assert!((report.overall_risk_score - expected).abs() < 1e-9);
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.recommendations.len(), 2);
        assert_eq!(report.recommendations[0], "Immediate manual review required");

        assert_eq!(report.incidents.len(), 3);
        assert_eq!(report.incidents[1].category, Category::AudioAnalysis);
        assert_eq!(report.incidents[1].description, "Audio anomalies detected");

        assert_eq!(report.summary.total_alerts, 3);
        assert!((report.summary.alert_rate - 75.0).abs() < 1e-9);
        assert_eq!(report.summary.category_breakdown[&Category::FaceDetection], 2);
        assert_eq!(report.summary.category_breakdown[&Category::BrowserActivity], 1);
        assert!(!report.summary.category_breakdown.contains_key(&Category::EyeMovement));
    }

    #[test]
    fn test_incidents_keep_tick_timestamps() {
        let first = at();
        let second = at() + Duration::seconds(90);
        let analyses = vec![
            RecordedAssessment::new(assessment(Category::BrowserActivity, 0.9, true), first),
            RecordedAssessment::new(assessment(Category::EyeMovement, 0.2, false), second),
            RecordedAssessment::new(assessment(Category::FaceDetection, 1.0, true), second),
        ];
        let generated_at = at() + Duration::minutes(30);
        let report = RiskReport::generate("s", &analyses, 1_800_000, generated_at);

        assert_eq!(report.generated_at, generated_at);
        assert_eq!(report.incidents.len(), 2);
        assert_eq!(report.incidents[0].timestamp, first);
        assert_eq!(report.incidents[1].timestamp, second);
    }

    #[test]
    fn test_report_weights_unknown_categories() {
        let analyses = vec![
            assessment(Category::Unknown("keystrokes".to_string()), 1.0, true),
            assessment(Category::EyeMovement, 0.0, false),
        ];
        // 1.0 * 0.1 / (0.1 + 0.25)
        assert!((weighted_score(&analyses) - 0.1 / 0.35).abs() < 1e-9);

        let records: Vec<RecordedAssessment> = analyses
            .into_iter()
            .map(|a| RecordedAssessment::new(a, at()))
            .collect();
        let report = RiskReport::generate("s", &records, 0, at());
        assert_eq!(report.incidents[0].description, "Unknown incident");
        assert_eq!(
            report.incidents[0].category,
            Category::Unknown("keystrokes".to_string())
        );
    }

    #[test]
    fn test_report_serializes_breakdown_with_category_keys() {
        let analyses = vec![
            record(Category::EyeMovement, 0.4, false),
            record(Category::Unknown("keystrokes".to_string()), 0.1, false),
        ];
        let report = RiskReport::generate("s", &analyses, 1_000, at());
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["summary"]["category_breakdown"]["eye_movement"], 1);
        assert_eq!(value["summary"]["category_breakdown"]["keystrokes"], 1);
    }

    #[test]
    fn test_recorded_assessment_flattens_into_one_object() {
        let value = serde_json::to_value(record(Category::AudioAnalysis, 0.5, false)).unwrap();

        assert_eq!(value["category"], "audio_analysis");
        assert_eq!(value["details"]["channel"], "browser");
        assert!(value["timestamp"].is_string());
    }
}
