//! proctor-risk - Rule-based risk scoring for exam proctoring telemetry
//!
//! An external capture pipeline (webcam, microphone, browser activity tracker)
//! produces one observation per channel per sampling tick. This crate scores each
//! observation against a fixed table of additive rules, then combines the per-channel
//! scores into one weighted verdict: observation → category assessment → overall
//! assessment.
//!
//! ## Modules
//!
//! - **Scoring**: [`RiskScorer`] and the declarative rule tables in [`rules`]
//! - **Sessions**: [`ProctoringSession`] accumulates assessments, raises alerts, and
//!   produces a [`RiskReport`] when the exam ends; [`SessionStats`] rolls finished
//!   sessions up into dashboard counters

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod scorer;
pub mod session;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::ProctorConfig;
pub use error::RiskError;
pub use pipeline::{aggregate_json, score_json, tick_json};
pub use report::{RecordedAssessment, RiskLevel, RiskReport};
pub use rules::RISK_THRESHOLD;
pub use scorer::RiskScorer;
pub use session::{
    ProctoringSession, SessionEvent, SessionStats, SessionStatus, SessionSummary,
};
pub use types::{
    AudioObservation, BrowserObservation, Category, CategoryAssessment, EyeObservation,
    FaceObservation, Observation, OverallAssessment,
};

/// Library version
pub const PROCTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "proctor-risk";
