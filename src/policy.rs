//! Complaint policy: pure derivations with no I/O.
//!
//! - priority from urgency and the emergency flag
//! - responder department from category
//! - the legal status transition graph
//! - the tourist safety score

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::model::{Category, Complaint, ComplaintStatus, Department, Priority, Urgency};

/// Safety score lookback.
pub const SAFETY_WINDOW_DAYS: i64 = 30;

/// First match wins: critical urgency or an emergency SOS is always critical.
pub fn derive_priority(urgency: Urgency, is_emergency_sos: bool) -> Priority {
    if urgency == Urgency::Critical || is_emergency_sos {
        return Priority::Critical;
    }

    match urgency {
        Urgency::High => Priority::High,
        Urgency::Medium => Priority::Normal,
        Urgency::Low | Urgency::Critical => Priority::Low,
    }
}

pub fn derive_department(category: Category) -> Department {
    match category {
        Category::FireEmergency => Department::FireDepartment,
        Category::MedicalHelp => Department::MedicalEmergency,
        Category::Accident | Category::TrafficViolation => Department::TrafficPolice,
        Category::TheftRobbery | Category::Harassment | Category::Fraud => Department::Police,
        Category::MissingPerson => Department::TouristPolice,
        Category::NoiseComplaint | Category::GeneralHelp | Category::Other => {
            Department::General
        }
    }
}

/// Whether `from -> to` is an edge of the status graph:
///
/// ```text
/// submitted -> under_review -> assigned -> in_progress -> resolved -> closed
/// submitted -> closed
/// any non-terminal -> escalated | rejected
/// ```
///
/// Self-loops are not edges.
pub fn can_transition(from: ComplaintStatus, to: ComplaintStatus) -> bool {
    use ComplaintStatus::*;

    if from == to || from.is_terminal() {
        return false;
    }

    match (from, to) {
        (_, Escalated | Rejected) => true,
        (Submitted, UnderReview | Closed) => true,
        (UnderReview, Assigned) => true,
        (Assigned, InProgress) => true,
        (InProgress, Resolved) => true,
        (Resolved, Closed) => true,
        _ => false,
    }
}

pub fn check_transition(from: ComplaintStatus, to: ComplaintStatus) -> AppResult<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        if score < 30 {
            RiskLevel::High
        } else if score < 70 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAssessment {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub recent_complaints: u32,
    pub recent_emergencies: u32,
    pub unresolved: u32,
}

/// Score a tourist's recent complaint history.
///
/// Starts at 100. Each complaint from the last 30 days costs 10, an
/// emergency costs another 20 and an unresolved one another 15. The result
/// is clamped to `0..=100`.
pub fn safety_score(complaints: &[Complaint], now: DateTime<Utc>) -> SafetyAssessment {
    let since = now - Duration::days(SAFETY_WINDOW_DAYS);

    let mut score: i64 = 100;
    let mut recent_complaints = 0;
    let mut recent_emergencies = 0;
    let mut unresolved = 0;

    for complaint in complaints.iter().filter(|c| c.created_at >= since) {
        recent_complaints += 1;
        score -= 10;

        if complaint.is_emergency_sos {
            recent_emergencies += 1;
            score -= 20;
        }

        if !complaint.status.is_settled() {
            unresolved += 1;
            score -= 15;
        }
    }

    let score = score.clamp(0, 100) as u8;

    SafetyAssessment {
        score,
        risk_level: RiskLevel::from_score(score),
        recent_complaints,
        recent_emergencies,
        unresolved,
    }
}
