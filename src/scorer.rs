//! Rule-based risk scoring and aggregation
//!
//! Converts per-channel observations into category assessments and combines those
//! into one weighted verdict per sampling tick. Scoring is pure: the same input always
//! produces the same output and no state is kept between calls.

use crate::error::RiskError;
use crate::rules::{
    evaluate, raw_score, Rule, TriggeredRule, AUDIO_RULES, BROWSER_RULES, EYE_RULES, FACE_RULES,
    RISK_THRESHOLD,
};
use crate::types::{
    AudioObservation, BrowserObservation, Category, CategoryAssessment, EyeObservation,
    FaceObservation, Observation, OverallAssessment,
};

/// Stateless risk scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    /// Score one observation of any channel
    pub fn score(observation: &Observation) -> Result<CategoryAssessment, RiskError> {
        match observation {
            Observation::Face(o) => Self::score_face(o),
            Observation::Eye(o) => Self::score_eye(o),
            Observation::Audio(o) => Self::score_audio(o),
            Observation::Browser(o) => Self::score_browser(o),
        }
    }

    pub fn score_face(observation: &FaceObservation) -> Result<CategoryAssessment, RiskError> {
        validate_face(observation)?;
        Ok(assess(
            Category::FaceDetection,
            FACE_RULES,
            observation,
            Observation::Face(observation.clone()),
        ))
    }

    pub fn score_eye(observation: &EyeObservation) -> Result<CategoryAssessment, RiskError> {
        Ok(assess(
            Category::EyeMovement,
            EYE_RULES,
            observation,
            Observation::Eye(observation.clone()),
        ))
    }

    pub fn score_audio(observation: &AudioObservation) -> Result<CategoryAssessment, RiskError> {
        validate_audio(observation)?;
        Ok(assess(
            Category::AudioAnalysis,
            AUDIO_RULES,
            observation,
            Observation::Audio(observation.clone()),
        ))
    }

    pub fn score_browser(
        observation: &BrowserObservation,
    ) -> Result<CategoryAssessment, RiskError> {
        Ok(assess(
            Category::BrowserActivity,
            BROWSER_RULES,
            observation,
            Observation::Browser(observation.clone()),
        ))
    }

    /// List the rules that fire for an observation, in table order
    pub fn explain(observation: &Observation) -> Vec<TriggeredRule> {
        match observation {
            Observation::Face(o) => evaluate(FACE_RULES, o),
            Observation::Eye(o) => evaluate(EYE_RULES, o),
            Observation::Audio(o) => evaluate(AUDIO_RULES, o),
            Observation::Browser(o) => evaluate(BROWSER_RULES, o),
        }
    }

    /// Combine category assessments into one weighted verdict.
    ///
    /// Unknown categories get weight 0: they add nothing to either sum but are kept in
    /// `analyses`.
    ///
    /// `high_risk` compares the *unnormalized* weighted sum against the threshold, not
    /// `overall_risk_score`. With only some categories present the two disagree: a lone
    /// face assessment at 1.0 gives an overall score of 1.0 but a weighted sum of 0.3,
    /// so `high_risk` stays false. This is existing behavior and is kept as-is until the
    /// domain owners decide otherwise.
    pub fn aggregate(
        analyses: Vec<CategoryAssessment>,
    ) -> Result<OverallAssessment, RiskError> {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for (index, analysis) in analyses.iter().enumerate() {
            validate_assessment(index, analysis)?;
            let weight = analysis.category.weight();
            weighted_sum += analysis.risk_score * weight;
            total_weight += weight;
        }

        let overall_risk_score = if total_weight > 0.0 {
            (weighted_sum / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(OverallAssessment {
            overall_risk_score,
            high_risk: weighted_sum > RISK_THRESHOLD,
            analyses,
        })
    }

    /// Score every observation of a tick, then aggregate
    pub fn score_tick(observations: &[Observation]) -> Result<OverallAssessment, RiskError> {
        let analyses = observations
            .iter()
            .map(Self::score)
            .collect::<Result<Vec<_>, _>>()?;
        Self::aggregate(analyses)
    }
}

fn assess<O>(
    category: Category,
    rules: &[Rule<O>],
    observation: &O,
    details: Observation,
) -> CategoryAssessment {
    let risk_score = raw_score(rules, observation).min(1.0);
    CategoryAssessment {
        category,
        risk_score,
        alert: risk_score > RISK_THRESHOLD,
        details,
    }
}

fn validate_face(o: &FaceObservation) -> Result<(), RiskError> {
    if !o.position_changed.is_finite() {
        return Err(RiskError::invalid("position_changed", "must be a finite number"));
    }
    if o.position_changed < 0.0 {
        return Err(RiskError::invalid(
            "position_changed",
            format!("must be non-negative, got {}", o.position_changed),
        ));
    }
    Ok(())
}

fn validate_audio(o: &AudioObservation) -> Result<(), RiskError> {
    if !o.noise_level.is_finite() {
        return Err(RiskError::invalid("noise_level", "must be a finite number"));
    }
    if !(0.0..=1.0).contains(&o.noise_level) {
        return Err(RiskError::invalid(
            "noise_level",
            format!("must be within [0, 1], got {}", o.noise_level),
        ));
    }
    Ok(())
}

fn validate_assessment(index: usize, a: &CategoryAssessment) -> Result<(), RiskError> {
    if !a.risk_score.is_finite() || !(0.0..=1.0).contains(&a.risk_score) {
        return Err(RiskError::InvalidAssessment(format!(
            "analysis {index} ({}) has risk_score {} outside [0, 1]",
            a.category, a.risk_score
        )));
    }
    Ok(())
}
