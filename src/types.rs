//! Observation and assessment types
//!
//! Observations are per-channel telemetry samples produced by an external capture
//! pipeline for one sampling tick. Assessments are what the scorer derives from them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Face detection sample from the webcam channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    /// Whether any face was found in the frame
    #[serde(alias = "faceDetected")]
    pub face_detected: bool,
    /// Number of faces found in the frame
    #[serde(alias = "faceCount")]
    pub face_count: u32,
    /// Fractional displacement of the face since the previous sample (typically 0-1+)
    #[serde(alias = "positionChanged")]
    pub position_changed: f64,
}

/// Eye movement sample for one observation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeObservation {
    /// Look-away events in the window
    #[serde(alias = "lookAwayFrequency")]
    pub look_away_frequency: u32,
    /// Time the eyes stayed closed, in milliseconds
    #[serde(alias = "eyesClosedDuration")]
    pub eyes_closed_duration: u64,
    /// Rapid saccade count (reading from another source)
    #[serde(alias = "rapidMovements")]
    pub rapid_movements: u32,
}

/// Audio sample from the microphone channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioObservation {
    /// Distinct voices heard
    #[serde(alias = "voiceCount")]
    pub voice_count: u32,
    /// Background noise level (0-1)
    #[serde(alias = "noiseLevel")]
    pub noise_level: f64,
    /// Keywords flagged by the transcription stage, order irrelevant
    #[serde(default, alias = "suspiciousKeywords")]
    pub suspicious_keywords: Vec<String>,
}

/// Browser activity counters for one observation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserObservation {
    #[serde(alias = "tabSwitches")]
    pub tab_switches: u32,
    #[serde(alias = "focusLost")]
    pub focus_lost: u32,
    #[serde(alias = "copyPasteCount")]
    pub copy_paste_count: u32,
}

/// One observation from any monitoring channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum Observation {
    Face(FaceObservation),
    Eye(EyeObservation),
    Audio(AudioObservation),
    Browser(BrowserObservation),
}

impl Observation {
    /// Category an observation of this channel is scored under
    pub fn category(&self) -> Category {
        match self {
            Observation::Face(_) => Category::FaceDetection,
            Observation::Eye(_) => Category::EyeMovement,
            Observation::Audio(_) => Category::AudioAnalysis,
            Observation::Browser(_) => Category::BrowserActivity,
        }
    }
}

impl From<FaceObservation> for Observation {
    fn from(o: FaceObservation) -> Self {
        Observation::Face(o)
    }
}

impl From<EyeObservation> for Observation {
    fn from(o: EyeObservation) -> Self {
        Observation::Eye(o)
    }
}

impl From<AudioObservation> for Observation {
    fn from(o: AudioObservation) -> Self {
        Observation::Audio(o)
    }
}

impl From<BrowserObservation> for Observation {
    fn from(o: BrowserObservation) -> Self {
        Observation::Browser(o)
    }
}

/// Risk category of an assessment
///
/// Serialized as its snake_case name. Names this crate does not recognise are kept
/// verbatim in [`Category::Unknown`] so they survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    FaceDetection,
    EyeMovement,
    AudioAnalysis,
    BrowserActivity,
    /// Any category name this crate does not recognise
    Unknown(String),
}

impl Category {
    /// Parse a category name, falling back to [`Category::Unknown`]
    pub fn from_name(name: &str) -> Self {
        match name {
            "face_detection" => Category::FaceDetection,
            "eye_movement" => Category::EyeMovement,
            "audio_analysis" => Category::AudioAnalysis,
            "browser_activity" => Category::BrowserActivity,
            other => Category::Unknown(other.to_string()),
        }
    }

    /// Fixed aggregation weight. Unknown categories carry no weight.
    pub fn weight(&self) -> f64 {
        match self {
            Category::FaceDetection => 0.30,
            Category::EyeMovement => 0.25,
            Category::AudioAnalysis => 0.25,
            Category::BrowserActivity => 0.20,
            Category::Unknown(_) => 0.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::FaceDetection => "face_detection",
            Category::EyeMovement => "eye_movement",
            Category::AudioAnalysis => "audio_analysis",
            Category::BrowserActivity => "browser_activity",
            Category::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Unknown(_))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Category::from_name(&name))
    }
}

/// Scored result for one observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssessment {
    pub category: Category,
    /// Risk score clamped to [0, 1]
    pub risk_score: f64,
    /// Whether the risk score exceeds the alert threshold
    pub alert: bool,
    /// The observation this assessment was derived from, unmodified
    pub details: Observation,
}

/// Weighted combination of the assessments for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAssessment {
    /// Weighted mean of the category scores (0-1)
    pub overall_risk_score: f64,
    /// Threshold check against the unnormalized weighted sum
    pub high_risk: bool,
    /// Input assessments in insertion order
    pub analyses: Vec<CategoryAssessment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&Category::BrowserActivity).unwrap();
        assert_eq!(json, "\"browser_activity\"");

        let parsed: Category = serde_json::from_str("\"eye_movement\"").unwrap();
        assert_eq!(parsed, Category::EyeMovement);
    }

    #[test]
    fn test_unrecognised_category_keeps_its_name() {
        let parsed: Category = serde_json::from_str("\"keystroke_dynamics\"").unwrap();
        assert_eq!(parsed, Category::Unknown("keystroke_dynamics".to_string()));
        assert_eq!(parsed.weight(), 0.0);
        assert!(!parsed.is_known());

        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, "\"keystroke_dynamics\"");
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = [
            Category::FaceDetection,
            Category::EyeMovement,
            Category::AudioAnalysis,
            Category::BrowserActivity,
        ]
        .iter()
        .map(|c| c.weight())
        .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_observation_tagged_deserialization() {
        let json = r#"{
            "channel": "audio",
            "voice_count": 2,
            "noise_level": 0.4,
            "suspicious_keywords": ["answer"]
        }"#;

        let obs: Observation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.category(), Category::AudioAnalysis);
        match obs {
            Observation::Audio(audio) => {
                assert_eq!(audio.voice_count, 2);
                assert_eq!(audio.suspicious_keywords, vec!["answer".to_string()]);
            }
            other => panic!("unexpected observation: {other:?}"),
        }
    }

    #[test]
    fn test_camel_case_aliases_accepted() {
        let json = r#"{
            "channel": "face",
            "faceDetected": true,
            "faceCount": 1,
            "positionChanged": 0.1
        }"#;

        let obs: Observation = serde_json::from_str(json).unwrap();
        assert_eq!(
            obs,
            Observation::Face(FaceObservation {
                face_detected: true,
                face_count: 1,
                position_changed: 0.1,
            })
        );
    }

    #[test]
    fn test_negative_count_rejected_at_parse() {
        let json = r#"{"channel": "browser", "tab_switches": -1, "focus_lost": 0, "copy_paste_count": 0}"#;
        assert!(serde_json::from_str::<Observation>(json).is_err());
    }

    #[test]
    fn test_missing_keywords_default_to_empty() {
        let json = r#"{"channel": "audio", "voice_count": 1, "noise_level": 0.2}"#;
        let obs: Observation = serde_json::from_str(json).unwrap();
        match obs {
            Observation::Audio(audio) => assert!(audio.suspicious_keywords.is_empty()),
            other => panic!("unexpected observation: {other:?}"),
        }
    }
}
