//! Proctoring sessions
//!
//! A session accumulates the assessments of one exam attempt, raises alerts when a
//! tick alerts, and produces the final [`RiskReport`] when it ends. [`SessionStats`]
//! rolls many session summaries up into dashboard counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RiskError;
use crate::report::{
    incident_description, weighted_score, RecordedAssessment, RiskLevel, RiskReport,
};
use crate::scorer::RiskScorer;
use crate::types::{
    AudioObservation, BrowserObservation, CategoryAssessment, EyeObservation, FaceObservation,
    OverallAssessment,
};

/// Risk score above which an alert is considered high severity
pub const HIGH_SEVERITY_SCORE: f64 = 0.8;

/// Channel that produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Webcam,
    Audio,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    fn for_score(max_risk_score: f64) -> Self {
        if max_risk_score > HIGH_SEVERITY_SCORE {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Still receiving telemetry
    Active,
    /// Ended normally by the exam flow
    Completed,
    /// Cut short, e.g. by a client disconnect
    Terminated,
}

/// Alert raised during a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAlert {
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub severity: Severity,
    /// Highest risk score among `analyses`
    pub risk_score: f64,
    pub description: String,
    pub analyses: Vec<CategoryAssessment>,
}

/// Live risk feedback for a webcam tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskUpdate {
    /// Highest of the face and eye scores
    pub risk_score: f64,
    pub analyses: Vec<CategoryAssessment>,
}

/// Telemetry event fed into a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Webcam {
        face: FaceObservation,
        eye: EyeObservation,
    },
    Audio(AudioObservation),
    Browser(BrowserObservation),
}

/// Result of handling one [`SessionEvent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub analyses: Vec<CategoryAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_update: Option<RiskUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<SessionAlert>,
}

/// Everything known about a session at the time it was summarized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub exam_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub alerts: Vec<SessionAlert>,
    pub report: RiskReport,
}

/// Counters over a set of session summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub completed_sessions: usize,
    pub terminated_sessions: usize,
    pub high_risk_sessions: usize,
    pub medium_risk_sessions: usize,
    pub low_risk_sessions: usize,
    /// Mean report score, 0 when there are no sessions
    pub average_risk_score: f64,
    /// Sum of alerting assessments over all reports
    pub total_alerts: usize,
}

impl SessionStats {
    pub fn from_summaries(summaries: &[SessionSummary]) -> Self {
        let mut stats = SessionStats {
            total_sessions: summaries.len(),
            ..Default::default()
        };
        let mut score_total = 0.0;

        for summary in summaries {
            match summary.status {
                SessionStatus::Active => stats.active_sessions += 1,
                SessionStatus::Completed => stats.completed_sessions += 1,
                SessionStatus::Terminated => stats.terminated_sessions += 1,
            }
            match summary.report.risk_level {
                RiskLevel::High => stats.high_risk_sessions += 1,
                RiskLevel::Medium => stats.medium_risk_sessions += 1,
                RiskLevel::Low => stats.low_risk_sessions += 1,
            }
            score_total += summary.report.overall_risk_score;
            stats.total_alerts += summary.report.summary.total_alerts;
        }

        if !summaries.is_empty() {
            stats.average_risk_score = score_total / summaries.len() as f64;
        }
        stats
    }
}

/// An in-progress proctoring session
#[derive(Debug, Clone)]
pub struct ProctoringSession {
    session_id: String,
    user_id: String,
    exam_id: String,
    started_at: DateTime<Utc>,
    analyses: Vec<RecordedAssessment>,
    /// Index in `analyses` where the most recent event's assessments begin
    last_event_start: usize,
    alerts: Vec<SessionAlert>,
}

impl ProctoringSession {
    /// Start a session now
    pub fn start(user_id: impl Into<String>, exam_id: impl Into<String>) -> Self {
        Self::start_at(user_id, exam_id, Utc::now())
    }

    /// Start a session at a given instant
    pub fn start_at(
        user_id: impl Into<String>,
        exam_id: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let session = Self {
            session_id: format!("session_{}", Uuid::new_v4()),
            user_id: user_id.into(),
            exam_id: exam_id.into(),
            started_at,
            analyses: Vec::new(),
            last_event_start: 0,
            alerts: Vec::new(),
        };
        info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            exam_id = %session.exam_id,
            "proctoring session started"
        );
        session
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// An unfinished session is always active; ending it consumes it
    pub fn status(&self) -> SessionStatus {
        SessionStatus::Active
    }

    /// Assessments recorded so far, in arrival order
    pub fn analyses(&self) -> &[RecordedAssessment] {
        &self.analyses
    }

    pub fn alerts(&self) -> &[SessionAlert] {
        &self.alerts
    }

    /// Score a webcam tick (face and eye together)
    pub fn process_webcam(
        &mut self,
        face: &FaceObservation,
        eye: &EyeObservation,
    ) -> Result<(RiskUpdate, Option<SessionAlert>), RiskError> {
        self.process_webcam_at(face, eye, Utc::now())
    }

    pub fn process_webcam_at(
        &mut self,
        face: &FaceObservation,
        eye: &EyeObservation,
        at: DateTime<Utc>,
    ) -> Result<(RiskUpdate, Option<SessionAlert>), RiskError> {
        let face_analysis = RiskScorer::score_face(face)?;
        let eye_analysis = RiskScorer::score_eye(eye)?;
        let analyses = vec![face_analysis, eye_analysis];

        let alert = if analyses.iter().any(|a| a.alert) {
            Some(self.raise(AlertKind::Webcam, analyses.clone(), at))
        } else {
            None
        };
        self.record(&analyses, at);

        let risk_score = max_risk_score(&analyses);
        debug!(session_id = %self.session_id, risk_score, "webcam tick scored");

        Ok((RiskUpdate { risk_score, analyses }, alert))
    }

    pub fn process_audio(
        &mut self,
        audio: &AudioObservation,
    ) -> Result<(CategoryAssessment, Option<SessionAlert>), RiskError> {
        self.process_audio_at(audio, Utc::now())
    }

    pub fn process_audio_at(
        &mut self,
        audio: &AudioObservation,
        at: DateTime<Utc>,
    ) -> Result<(CategoryAssessment, Option<SessionAlert>), RiskError> {
        let analysis = RiskScorer::score_audio(audio)?;
        Ok(self.record_single(AlertKind::Audio, analysis, at))
    }

    pub fn process_browser(
        &mut self,
        browser: &BrowserObservation,
    ) -> Result<(CategoryAssessment, Option<SessionAlert>), RiskError> {
        self.process_browser_at(browser, Utc::now())
    }

    pub fn process_browser_at(
        &mut self,
        browser: &BrowserObservation,
        at: DateTime<Utc>,
    ) -> Result<(CategoryAssessment, Option<SessionAlert>), RiskError> {
        let analysis = RiskScorer::score_browser(browser)?;
        Ok(self.record_single(AlertKind::Browser, analysis, at))
    }

    /// Dispatch a tagged telemetry event
    pub fn handle(&mut self, event: &SessionEvent) -> Result<EventOutcome, RiskError> {
        self.handle_at(event, Utc::now())
    }

    pub fn handle_at(
        &mut self,
        event: &SessionEvent,
        at: DateTime<Utc>,
    ) -> Result<EventOutcome, RiskError> {
        match event {
            SessionEvent::Webcam { face, eye } => {
                let (update, alert) = self.process_webcam_at(face, eye, at)?;
                Ok(EventOutcome {
                    analyses: update.analyses.clone(),
                    risk_update: Some(update),
                    alert,
                })
            }
            SessionEvent::Audio(audio) => {
                let (analysis, alert) = self.process_audio_at(audio, at)?;
                Ok(EventOutcome {
                    analyses: vec![analysis],
                    risk_update: None,
                    alert,
                })
            }
            SessionEvent::Browser(browser) => {
                let (analysis, alert) = self.process_browser_at(browser, at)?;
                Ok(EventOutcome {
                    analyses: vec![analysis],
                    risk_update: None,
                    alert,
                })
            }
        }
    }

    /// Weighted verdict for the most recent event's assessments.
    ///
    /// Never aggregates the whole history: `high_risk` thresholds an unnormalized sum
    /// that grows with every tick. Use [`current_risk`](Self::current_risk) for a
    /// session-wide figure.
    pub fn overall(&self) -> Result<OverallAssessment, RiskError> {
        let latest = self.analyses[self.last_event_start..]
            .iter()
            .map(|r| r.assessment.clone())
            .collect();
        RiskScorer::aggregate(latest)
    }

    /// Session-wide weighted score and band, as the final report computes them
    pub fn current_risk(&self) -> (f64, RiskLevel) {
        let score = weighted_score(self.analyses.iter().map(|r| &r.assessment));
        (score, RiskLevel::from_score(score))
    }

    /// Summarize the session without ending it
    pub fn snapshot_at(&self, at: DateTime<Utc>) -> SessionSummary {
        self.clone().finish(at, SessionStatus::Active)
    }

    /// End the session now
    pub fn end(self) -> SessionSummary {
        self.end_at(Utc::now())
    }

    /// End the session at a given instant and build the final report
    pub fn end_at(self, ended_at: DateTime<Utc>) -> SessionSummary {
        self.finish(ended_at, SessionStatus::Completed)
    }

    /// Cut the session short now (client went away)
    pub fn terminate(self) -> SessionSummary {
        self.terminate_at(Utc::now())
    }

    pub fn terminate_at(self, ended_at: DateTime<Utc>) -> SessionSummary {
        self.finish(ended_at, SessionStatus::Terminated)
    }

    fn finish(self, ended_at: DateTime<Utc>, status: SessionStatus) -> SessionSummary {
        let duration_ms = (ended_at - self.started_at).num_milliseconds();
        let report = RiskReport::generate(&self.session_id, &self.analyses, duration_ms, ended_at);

        if status != SessionStatus::Active {
            info!(
                session_id = %self.session_id,
                status = ?status,
                duration_ms,
                overall_risk_score = report.overall_risk_score,
                risk_level = ?report.risk_level,
                alerts = self.alerts.len(),
                "proctoring session ended"
            );
        }

        SessionSummary {
            session_id: self.session_id,
            user_id: self.user_id,
            exam_id: self.exam_id,
            status,
            started_at: self.started_at,
            ended_at,
            alerts: self.alerts,
            report,
        }
    }

    fn record(&mut self, analyses: &[CategoryAssessment], at: DateTime<Utc>) {
        self.last_event_start = self.analyses.len();
        self.analyses.extend(
            analyses
                .iter()
                .cloned()
                .map(|a| RecordedAssessment::new(a, at)),
        );
    }

    fn record_single(
        &mut self,
        kind: AlertKind,
        analysis: CategoryAssessment,
        at: DateTime<Utc>,
    ) -> (CategoryAssessment, Option<SessionAlert>) {
        let alert = if analysis.alert {
            Some(self.raise(kind, vec![analysis.clone()], at))
        } else {
            None
        };
        debug!(
            session_id = %self.session_id,
            category = %analysis.category,
            risk_score = analysis.risk_score,
            "tick scored"
        );
        self.record(std::slice::from_ref(&analysis), at);
        (analysis, alert)
    }

    fn raise(
        &mut self,
        kind: AlertKind,
        analyses: Vec<CategoryAssessment>,
        at: DateTime<Utc>,
    ) -> SessionAlert {
        let risk_score = max_risk_score(&analyses);
        let description = analyses
            .iter()
            .filter(|a| a.alert)
            .max_by(|a, b| a.risk_score.total_cmp(&b.risk_score))
            .map(|a| incident_description(&a.category))
            .unwrap_or("Suspicious activity")
            .to_string();
        let alert = SessionAlert {
            timestamp: at,
            kind,
            severity: Severity::for_score(risk_score),
            risk_score,
            description,
            analyses,
        };
        warn!(
            session_id = %self.session_id,
            kind = ?alert.kind,
            severity = ?alert.severity,
            risk_score,
            "risk alert"
        );
        self.alerts.push(alert.clone());
        alert
    }
}

fn max_risk_score(analyses: &[CategoryAssessment]) -> f64 {
    analyses
        .iter()
        .map(|a| a.risk_score)
        .fold(0.0_f64, f64::max)
}
