//! JSON entry points
//!
//! String-in/string-out wrappers around [`RiskScorer`] for callers that hold raw
//! telemetry JSON (the C ABI and the CLI).

use crate::error::RiskError;
use crate::scorer::RiskScorer;
use crate::types::{CategoryAssessment, Observation};

/// Score a single observation.
///
/// # Arguments
/// * `observation_json` - Observation object tagged with `"channel"`
///
/// # Returns
/// CategoryAssessment JSON
///
/// # Example
/// ```ignore
/// let json = score_json(r#"{"channel":"browser","tab_switches":4,"focus_lost":0,"copy_paste_count":0}"#)?;
/// ```
pub fn score_json(observation_json: &str) -> Result<String, RiskError> {
    let observation: Observation = serde_json::from_str(observation_json)?;
    let assessment = RiskScorer::score(&observation)?;
    Ok(serde_json::to_string(&assessment)?)
}

/// Score every observation of one sampling tick and aggregate the results.
///
/// # Arguments
/// * `observations_json` - JSON array of tagged observations
///
/// # Returns
/// OverallAssessment JSON
pub fn tick_json(observations_json: &str) -> Result<String, RiskError> {
    let observations: Vec<Observation> = serde_json::from_str(observations_json)?;
    if observations.is_empty() {
        return Err(RiskError::EmptyTick);
    }
    let overall = RiskScorer::score_tick(&observations)?;
    Ok(serde_json::to_string(&overall)?)
}

/// Aggregate previously computed assessments.
///
/// # Arguments
/// * `assessments_json` - JSON array of CategoryAssessment objects
///
/// # Returns
/// OverallAssessment JSON
pub fn aggregate_json(assessments_json: &str) -> Result<String, RiskError> {
    let analyses: Vec<CategoryAssessment> = serde_json::from_str(assessments_json)?;
    let overall = RiskScorer::aggregate(analyses)?;
    Ok(serde_json::to_string(&overall)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tick_json() -> &'static str {
        r#"[
            {"channel": "face", "face_detected": false, "face_count": 0, "position_changed": 0.0},
            {"channel": "eye", "look_away_frequency": 8, "eyes_closed_duration": 500, "rapid_movements": 12},
            {"channel": "audio", "voice_count": 1, "noise_level": 0.2, "suspicious_keywords": []},
            {"channel": "browser", "tab_switches": 1, "focus_lost": 0, "copy_paste_count": 0}
        ]"#
    }

    #[test]
    fn test_score_json() {
        let json = score_json(
            r#"{"channel": "browser", "tab_switches": 4, "focus_lost": 3, "copy_paste_count": 0}"#,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["category"], "browser_activity");
        assert_eq!(value["alert"], true);
        assert!((value["risk_score"].as_f64().unwrap() - 0.9).abs() < 1e-9);
        assert_eq!(value["details"]["channel"], "browser");
        assert_eq!(value["details"]["tab_switches"], 4);
    }

    #[test]
    fn test_tick_json() {
        let json = tick_json(sample_tick_json()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        // face 0.3*0.3 + eye 0.7*0.25 = 0.265
        let score = value["overall_risk_score"].as_f64().unwrap();
        assert!((score - 0.265).abs() < 1e-9);
        assert_eq!(value["high_risk"], false);
        assert_eq!(value["analyses"].as_array().unwrap().len(), 4);
        assert_eq!(value["analyses"][1]["category"], "eye_movement");
    }

    #[test]
    fn test_tick_json_empty() {
        assert!(matches!(tick_json("[]"), Err(RiskError::EmptyTick)));
    }

    #[test]
    fn test_aggregate_json_round_trips_scored_output() {
        let tick: serde_json::Value = serde_json::from_str(&tick_json(sample_tick_json()).unwrap()).unwrap();
        let analyses = tick["analyses"].to_string();

        let json = aggregate_json(&analyses).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rescored = value["overall_risk_score"].as_f64().unwrap();
        let original = tick["overall_risk_score"].as_f64().unwrap();
        assert!((rescored - original).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_json_keeps_unknown_category_name() {
        let input = r#"[
            {
                "category": "keystrokes",
                "risk_score": 1.0,
                "alert": true,
                "details": {"channel": "browser", "tab_switches": 0, "focus_lost": 0, "copy_paste_count": 0}
            },
            {
                "category": "eye_movement",
                "risk_score": 0.4,
                "alert": false,
                "details": {"channel": "eye", "look_away_frequency": 6, "eyes_closed_duration": 0, "rapid_movements": 0}
            }
        ]"#;
        let json = aggregate_json(input).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!((value["overall_risk_score"].as_f64().unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(value["analyses"][0]["category"], "keystrokes");
        assert_eq!(value["analyses"][1]["category"], "eye_movement");

        let expected: serde_json::Value = serde_json::from_str(input).unwrap();
        assert_eq!(value["analyses"], expected);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(score_json("not valid json"), Err(RiskError::JsonError(_))));
    }

    #[test]
    fn test_invalid_observation_value() {
        let result = score_json(r#"{"channel": "audio", "voice_count": 1, "noise_level": 3.0}"#);
        assert!(matches!(result, Err(RiskError::InvalidObservation { .. })));
    }
}
