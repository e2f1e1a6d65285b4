//! Declarative scoring rules
//!
//! Each category owns a table of named rules. A rule adds a fixed increment to the
//! category's running score when its predicate holds; all rules of a category are
//! evaluated, so several can fire on the same observation.

use serde::Serialize;

use crate::types::{AudioObservation, BrowserObservation, EyeObservation, FaceObservation};

/// Score above which an assessment raises an alert
pub const RISK_THRESHOLD: f64 = 0.7;

/// A single additive scoring rule over an observation of type `O`
pub struct Rule<O> {
    /// Stable rule identifier (lower_snake_case)
    pub name: &'static str,
    /// Human-readable trigger condition
    pub condition: &'static str,
    /// Amount added to the score when the rule fires
    pub increment: f64,
    predicate: fn(&O) -> bool,
}

impl<O> Rule<O> {
    pub fn fires(&self, observation: &O) -> bool {
        (self.predicate)(observation)
    }
}

/// A rule that fired for a particular observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggeredRule {
    pub name: &'static str,
    pub increment: f64,
}

/// Evaluate a rule table and return the rules that fired, in table order
pub fn evaluate<O>(rules: &[Rule<O>], observation: &O) -> Vec<TriggeredRule> {
    rules
        .iter()
        .filter(|rule| rule.fires(observation))
        .map(|rule| TriggeredRule {
            name: rule.name,
            increment: rule.increment,
        })
        .collect()
}

/// Sum of the increments of every rule that fires, before clamping
pub fn raw_score<O>(rules: &[Rule<O>], observation: &O) -> f64 {
    rules
        .iter()
        .filter(|rule| rule.fires(observation))
        .fold(0.0, |score, rule| score + rule.increment)
}

// ============================================================================
// Face detection
// ============================================================================

pub const FACE_RULES: &[Rule<FaceObservation>] = &[
    Rule {
        name: "no_face",
        condition: "face_detected == false",
        increment: 0.3,
        predicate: no_face,
    },
    Rule {
        name: "multiple_faces",
        condition: "face_count > 1",
        increment: 0.5,
        predicate: multiple_faces,
    },
    Rule {
        name: "position_shift",
        condition: "position_changed > 0.3",
        increment: 0.2,
        predicate: position_shift,
    },
];

fn no_face(o: &FaceObservation) -> bool {
    !o.face_detected
}

fn multiple_faces(o: &FaceObservation) -> bool {
    o.face_count > 1
}

fn position_shift(o: &FaceObservation) -> bool {
    o.position_changed > 0.3
}

// ============================================================================
// Eye movement
// ============================================================================

pub const EYE_RULES: &[Rule<EyeObservation>] = &[
    Rule {
        name: "frequent_look_away",
        condition: "look_away_frequency > 5",
        increment: 0.4,
        predicate: frequent_look_away,
    },
    Rule {
        name: "eyes_closed_too_long",
        condition: "eyes_closed_duration > 3000 ms",
        increment: 0.3,
        predicate: eyes_closed_too_long,
    },
    Rule {
        name: "rapid_movement",
        condition: "rapid_movements > 10",
        increment: 0.3,
        predicate: rapid_movement,
    },
];

fn frequent_look_away(o: &EyeObservation) -> bool {
    o.look_away_frequency > 5
}

fn eyes_closed_too_long(o: &EyeObservation) -> bool {
    o.eyes_closed_duration > 3000
}

fn rapid_movement(o: &EyeObservation) -> bool {
    o.rapid_movements > 10
}

// ============================================================================
// Audio analysis
// ============================================================================

pub const AUDIO_RULES: &[Rule<AudioObservation>] = &[
    Rule {
        name: "multiple_voices",
        condition: "voice_count > 1",
        increment: 0.6,
        predicate: multiple_voices,
    },
    Rule {
        name: "high_background_noise",
        condition: "noise_level > 0.7",
        increment: 0.2,
        predicate: high_background_noise,
    },
    Rule {
        name: "suspicious_keywords",
        condition: "suspicious_keywords non-empty",
        increment: 0.4,
        predicate: suspicious_keywords,
    },
];

fn multiple_voices(o: &AudioObservation) -> bool {
    o.voice_count > 1
}

fn high_background_noise(o: &AudioObservation) -> bool {
    o.noise_level > 0.7
}

fn suspicious_keywords(o: &AudioObservation) -> bool {
    !o.suspicious_keywords.is_empty()
}

// ============================================================================
// Browser activity
// ============================================================================

pub const BROWSER_RULES: &[Rule<BrowserObservation>] = &[
    Rule {
        name: "excessive_tab_switching",
        condition: "tab_switches > 3",
        increment: 0.5,
        predicate: excessive_tab_switching,
    },
    Rule {
        name: "focus_lost_repeatedly",
        condition: "focus_lost > 2",
        increment: 0.4,
        predicate: focus_lost_repeatedly,
    },
    Rule {
        name: "clipboard_activity",
        condition: "copy_paste_count > 0",
        increment: 0.3,
        predicate: clipboard_activity,
    },
];

fn excessive_tab_switching(o: &BrowserObservation) -> bool {
    o.tab_switches > 3
}

fn focus_lost_repeatedly(o: &BrowserObservation) -> bool {
    o.focus_lost > 2
}

fn clipboard_activity(o: &BrowserObservation) -> bool {
    o.copy_paste_count > 0
}

/// Flat, serializable view of one rule for listings
#[derive(Debug, Clone, Serialize)]
pub struct RuleDescription {
    pub category: &'static str,
    pub name: &'static str,
    pub condition: &'static str,
    pub increment: f64,
}

/// Every rule of every category, in table order
pub fn describe_rules() -> Vec<RuleDescription> {
    fn describe<O>(category: &'static str, rules: &[Rule<O>]) -> Vec<RuleDescription> {
        rules
            .iter()
            .map(|r| RuleDescription {
                category,
                name: r.name,
                condition: r.condition,
                increment: r.increment,
            })
            .collect()
    }

    let mut all = describe("face_detection", FACE_RULES);
    all.extend(describe("eye_movement", EYE_RULES));
    all.extend(describe("audio_analysis", AUDIO_RULES));
    all.extend(describe("browser_activity", BROWSER_RULES));
    all
}
