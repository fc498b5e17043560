//! Authority dashboard view of complaints.
//!
//! Dashboards do not consume [`Complaint`] records directly. They consume
//! [`Alert`]s, a flattened projection with its own type, severity and
//! display-status vocabulary, plus windowed [`DashboardStats`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    Category, Complaint, ComplaintStatus, Department, LatLng, Priority, Urgency,
};

/// Alert type shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LostTourist,
    Emergency,
    Theft,
    Accident,
    MedicalEmergency,
    PanicButton,
    SuspiciousActivity,
}

impl From<Category> for AlertType {
    fn from(category: Category) -> Self {
        match category {
            Category::MissingPerson => AlertType::LostTourist,
            Category::FireEmergency => AlertType::Emergency,
            Category::TheftRobbery => AlertType::Theft,
            Category::Accident | Category::TrafficViolation => AlertType::Accident,
            Category::MedicalHelp => AlertType::MedicalEmergency,
            Category::Harassment | Category::Fraud | Category::NoiseComplaint => {
                AlertType::SuspiciousActivity
            }
            Category::GeneralHelp | Category::Other => AlertType::PanicButton,
        }
    }
}

/// Alert severity, mirroring the complaint's urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl From<Urgency> for AlertSeverity {
    fn from(urgency: Urgency) -> Self {
        match urgency {
            Urgency::Low => AlertSeverity::Low,
            Urgency::Medium => AlertSeverity::Medium,
            Urgency::High => AlertSeverity::High,
            Urgency::Critical => AlertSeverity::Critical,
        }
    }
}

/// Coarse status shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Active,
    Acknowledged,
    Resolved,
    Escalated,
}

impl From<ComplaintStatus> for DisplayStatus {
    fn from(status: ComplaintStatus) -> Self {
        match status {
            ComplaintStatus::Submitted => DisplayStatus::Active,
            ComplaintStatus::UnderReview
            | ComplaintStatus::Assigned
            | ComplaintStatus::InProgress => DisplayStatus::Acknowledged,
            ComplaintStatus::Resolved | ComplaintStatus::Closed | ComplaintStatus::Rejected => {
                DisplayStatus::Resolved
            }
            ComplaintStatus::Escalated => DisplayStatus::Escalated,
        }
    }
}

/// Dashboard projection of a complaint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub complaint_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: ComplaintStatus,
    pub display_status: DisplayStatus,
    pub title: String,
    pub description: String,
    pub tourist_id: String,
    pub contact_info: String,
    pub address: String,
    pub landmark: Option<String>,
    /// `{lat, lng}`; the stored pair is `[lng, lat]`.
    pub coordinates: Option<LatLng>,
    pub priority: Priority,
    pub assigned_department: Department,
    pub assigned_to: Option<String>,
    #[serde(rename = "isEmergencySOS")]
    pub is_emergency_sos: bool,
    pub fir_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl From<&Complaint> for Alert {
    fn from(complaint: &Complaint) -> Self {
        Self {
            id: complaint.id.clone(),
            complaint_id: complaint.complaint_id(),
            alert_type: complaint.category.into(),
            severity: complaint.urgency.into(),
            status: complaint.status,
            display_status: complaint.status.into(),
            title: complaint.title.clone(),
            description: complaint.description.clone(),
            tourist_id: complaint.user_id.clone(),
            contact_info: complaint.contact_info.clone(),
            address: complaint.location.address.clone(),
            landmark: complaint.location.landmark.clone(),
            coordinates: complaint.location.lat_lng(),
            priority: complaint.priority,
            assigned_department: complaint.assigned_department,
            assigned_to: complaint.assigned_to.clone(),
            is_emergency_sos: complaint.is_emergency_sos,
            fir_number: complaint
                .escalation
                .as_ref()
                .map(|e| e.fir_number.clone()),
            created_at: complaint.created_at,
            updated_at: complaint.updated_at,
            distance_km: None,
        }
    }
}

impl Alert {
    pub fn with_distance(mut self, km: f64) -> Self {
        self.distance_km = Some(round1(km));
        self
    }
}

/// Sliding window applied to `createdAt` for dashboard statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1h")]
    LastHour,
    #[default]
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
}

impl TimeRange {
    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::LastHour => Duration::hours(1),
            TimeRange::LastDay => Duration::hours(24),
            TimeRange::LastWeek => Duration::days(7),
            TimeRange::LastMonth => Duration::days(30),
        }
    }

    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

/// Windowed complaint statistics for authorities.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub time_range: TimeRange,
    pub total: u64,
    pub emergency_count: u64,
    pub by_status: BTreeMap<&'static str, u64>,
    pub by_category: BTreeMap<&'static str, u64>,
    pub by_urgency: BTreeMap<&'static str, u64>,
    /// Percentage of complaints in `resolved`, one decimal.
    pub resolution_rate: f64,
    /// Mean minutes to first acknowledgement, one decimal.
    pub average_response_time: Option<f64>,
}

impl DashboardStats {
    pub fn from_complaints(complaints: &[Complaint], time_range: TimeRange) -> Self {
        let mut by_status = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        let mut by_urgency = BTreeMap::new();
        let mut emergency_count = 0;
        let mut resolved = 0u64;
        let mut response_times = Vec::new();

        for complaint in complaints {
            *by_status.entry(complaint.status.as_str()).or_insert(0) += 1;
            *by_category.entry(complaint.category.as_str()).or_insert(0) += 1;
            *by_urgency.entry(complaint.urgency.as_str()).or_insert(0) += 1;

            if complaint.is_emergency_sos {
                emergency_count += 1;
            }
            if complaint.status == ComplaintStatus::Resolved {
                resolved += 1;
            }
            if let Some(minutes) = complaint.emergency_response_time {
                response_times.push(minutes);
            }
        }

        let total = complaints.len() as u64;
        let resolution_rate = if total == 0 {
            0.0
        } else {
            round1(resolved as f64 / total as f64 * 100.0)
        };
        let average_response_time = (!response_times.is_empty()).then(|| {
            round1(response_times.iter().sum::<i64>() as f64 / response_times.len() as f64)
        });

        Self {
            time_range,
            total,
            emergency_count,
            by_status,
            by_category,
            by_urgency,
            resolution_rate,
            average_response_time,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
