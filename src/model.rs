//! Data models for Tourguard.
//!
//! The [`Complaint`] is the central record: a help/SOS request submitted by a
//! tourist and tracked through a status lifecycle by the authorities. It is
//! persisted as a JSON document, so every type here derives `Serialize` and
//! `Deserialize` with the camelCase field names the dashboards consume.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::policy;

/// What the complaint is about. Drives department routing and the alert type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TheftRobbery,
    Harassment,
    Fraud,
    MissingPerson,
    Accident,
    MedicalHelp,
    FireEmergency,
    TrafficViolation,
    NoiseComplaint,
    GeneralHelp,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::TheftRobbery,
        Category::Harassment,
        Category::Fraud,
        Category::MissingPerson,
        Category::Accident,
        Category::MedicalHelp,
        Category::FireEmergency,
        Category::TrafficViolation,
        Category::NoiseComplaint,
        Category::GeneralHelp,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TheftRobbery => "theft_robbery",
            Category::Harassment => "harassment",
            Category::Fraud => "fraud",
            Category::MissingPerson => "missing_person",
            Category::Accident => "accident",
            Category::MedicalHelp => "medical_help",
            Category::FireEmergency => "fire_emergency",
            Category::TrafficViolation => "traffic_violation",
            Category::NoiseComplaint => "noise_complaint",
            Category::GeneralHelp => "general_help",
            Category::Other => "other",
        }
    }
}

/// User-declared severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [
        Urgency::Low,
        Urgency::Medium,
        Urgency::High,
        Urgency::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }
}

/// System-derived operational priority, also used for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Numeric rank for sorting, higher is more urgent.
    pub fn rank(&self) -> i64 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Critical => 3,
        }
    }
}

/// Responder category a complaint is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    Police,
    FireDepartment,
    MedicalEmergency,
    TrafficPolice,
    TouristPolice,
    CyberCrime,
    General,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Police => "police",
            Department::FireDepartment => "fire_department",
            Department::MedicalEmergency => "medical_emergency",
            Department::TrafficPolice => "traffic_police",
            Department::TouristPolice => "tourist_police",
            Department::CyberCrime => "cyber_crime",
            Department::General => "general",
        }
    }
}

/// Lifecycle status. Legal edges live in [`policy::can_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Submitted,
    UnderReview,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Rejected,
    Escalated,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 8] = [
        ComplaintStatus::Submitted,
        ComplaintStatus::UnderReview,
        ComplaintStatus::Assigned,
        ComplaintStatus::InProgress,
        ComplaintStatus::Resolved,
        ComplaintStatus::Closed,
        ComplaintStatus::Rejected,
        ComplaintStatus::Escalated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Submitted => "submitted",
            ComplaintStatus::UnderReview => "under_review",
            ComplaintStatus::Assigned => "assigned",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Closed => "closed",
            ComplaintStatus::Rejected => "rejected",
            ComplaintStatus::Escalated => "escalated",
        }
    }

    /// `closed` and `rejected` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComplaintStatus::Closed | ComplaintStatus::Rejected)
    }

    /// Resolved or closed; eligible for feedback and excluded from the
    /// unresolved penalty of the safety score.
    pub fn is_settled(&self) -> bool {
        matches!(self, ComplaintStatus::Resolved | ComplaintStatus::Closed)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in dashboard order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Where the complaint happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: String,

    /// Stored GeoJSON style: `[longitude, latitude]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

impl Location {
    /// Swap the stored `[lon, lat]` pair into `{lat, lng}`.
    pub fn lat_lng(&self) -> Option<LatLng> {
        self.coordinates.map(|[lon, lat]| LatLng { lat, lng: lon })
    }
}

/// Who wrote a communication entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationSource {
    User,
    Officer,
    System,
}

/// One entry of the append-only communication log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub from: CommunicationSource,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub officer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub resolved_by: Option<String>,
    pub resolved_at: DateTime<Utc>,
    pub resolution_notes: String,
    pub action_taken: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub rating: u8,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Escalation annotation. Its presence is the escalation flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationInfo {
    pub fir_number: String,
    pub escalated_by: Option<String>,
    pub escalation_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Optional client device details sent along with a submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: Option<String>,
    pub app_version: Option<String>,
    pub battery_level: Option<u8>,
}

/// A user-submitted help/SOS request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: String,
    pub user_id: String,

    pub category: Category,
    pub title: String,
    pub description: String,
    pub urgency: Urgency,
    pub contact_info: String,
    pub location: Location,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,

    /// Derived from urgency and the emergency flag.
    pub priority: Priority,
    /// Derived from category.
    pub assigned_department: Department,

    pub status: ComplaintStatus,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub communications: Vec<Communication>,

    #[serde(default, rename = "isEmergencySOS")]
    pub is_emergency_sos: bool,
    #[serde(default)]
    pub sos_activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub escalation: Option<EscalationInfo>,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,

    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Whole minutes between creation and first acknowledgement.
    #[serde(default)]
    pub emergency_response_time: Option<i64>,

    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency token, owned by the storage layer.
    #[serde(skip)]
    pub version: i64,
}

impl Complaint {
    /// Build a fresh `submitted` complaint with derived fields filled in.
    pub fn new(id: String, user_id: &str, draft: ComplaintDraft, now: DateTime<Utc>) -> Self {
        let mut complaint = Self {
            id,
            user_id: user_id.to_string(),
            category: draft.category,
            title: draft.title,
            description: draft.description,
            urgency: draft.urgency,
            contact_info: draft.contact_info,
            location: draft.location,
            additional_info: draft.additional_info,
            attachments: draft.attachments,
            priority: Priority::Low,
            assigned_department: Department::General,
            status: ComplaintStatus::Submitted,
            assigned_to: None,
            resolution: None,
            feedback: None,
            communications: Vec::new(),
            is_emergency_sos: draft.is_emergency_sos,
            sos_activated_at: draft.is_emergency_sos.then_some(now),
            escalation: None,
            device_info: draft.device_info,
            acknowledged_at: None,
            emergency_response_time: None,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        complaint.refresh_derived();
        complaint
    }

    /// Human-readable identifier, e.g. `SOS202403ABC123`.
    pub fn complaint_id(&self) -> String {
        complaint_id(&self.id, self.created_at)
    }

    /// Recompute priority and department from urgency, category and the
    /// emergency flag.
    pub fn refresh_derived(&mut self) {
        self.priority = policy::derive_priority(self.urgency, self.is_emergency_sos);
        self.assigned_department = policy::derive_department(self.category);
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Append an entry to the communication log.
    pub fn log(
        &mut self,
        from: CommunicationSource,
        message: impl Into<String>,
        officer_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.communications.push(Communication {
            from,
            message: message.into(),
            timestamp: now,
            officer_id,
        });
        self.updated_at = now;
    }

    pub fn log_system(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.log(CommunicationSource::System, message, None, now);
    }

    pub fn summary(&self) -> ComplaintSummary {
        ComplaintSummary {
            id: self.id.clone(),
            complaint_id: self.complaint_id(),
            category: self.category,
            title: self.title.clone(),
            urgency: self.urgency,
            status: self.status,
            created_at: self.created_at,
            is_emergency_sos: self.is_emergency_sos,
        }
    }

    pub fn into_detail(self) -> ComplaintDetail {
        ComplaintDetail {
            complaint_id: self.complaint_id(),
            complaint: self,
        }
    }
}

/// `SOS` + creation year + two-digit month + last six characters of the id,
/// uppercased.
pub fn complaint_id(id: &str, created_at: DateTime<Utc>) -> String {
    let tail_start = id
        .char_indices()
        .rev()
        .nth(5)
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!(
        "SOS{}{:02}{}",
        created_at.year(),
        created_at.month(),
        id[tail_start..].to_uppercase()
    )
}

/// Validated input for building a complaint.
#[derive(Debug, Clone)]
pub struct ComplaintDraft {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub urgency: Urgency,
    pub contact_info: String,
    pub location: Location,
    pub additional_info: Option<String>,
    pub attachments: Vec<String>,
    pub is_emergency_sos: bool,
    pub device_info: Option<DeviceInfo>,
}

/// Public projection returned after submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintSummary {
    pub id: String,
    pub complaint_id: String,
    pub category: Category,
    pub title: String,
    pub urgency: Urgency,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "isEmergencySOS")]
    pub is_emergency_sos: bool,
}

/// Full complaint plus its derived identifier.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDetail {
    pub complaint_id: String,
    #[serde(flatten)]
    pub complaint: Complaint,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /sos/submit`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitComplaintRequest {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub urgency: Urgency,
    pub contact_info: String,
    pub location: Location,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default, rename = "isEmergencySOS")]
    pub is_emergency_sos: bool,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

/// Body of `POST /sos/emergency`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRequest {
    pub description: Option<String>,
    pub location: Option<Location>,
    pub contact_info: Option<String>,
    pub device_info: Option<DeviceInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommunicationRequest {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcknowledgeRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub officer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ComplaintStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(default)]
    pub resolution_notes: Option<String>,
    #[serde(default)]
    pub action_taken: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateRequest {
    #[serde(default)]
    pub officer_name: Option<String>,
    #[serde(default)]
    pub escalation_notes: Option<String>,
    #[serde(default)]
    pub fir_number: Option<String>,
}

// ============================================================================
// Query parameters
// ============================================================================

/// Query parameters for `GET /sos/`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintListQuery {
    pub status: Option<ComplaintStatus>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    Priority,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Query parameters for `GET /authority/complaints`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityListQuery {
    pub status: Option<ComplaintStatus>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
    pub priority: Option<Priority>,
    pub department: Option<Department>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub order: SortOrder,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters for `GET /authority/complaints/nearby`.
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius_km")]
    pub radius: f64,
}

fn default_radius_km() -> f64 {
    5.0
}

/// Query parameters for `GET /notifications`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// ============================================================================
// Pagination and response envelopes
// ============================================================================

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(total: u64, request: PageRequest) -> Self {
        let total_pages = total.div_ceil(u64::from(request.limit));
        Self {
            total,
            page: request.page,
            limit: request.limit,
            total_pages,
            has_next: u64::from(request.page) < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub complaint: ComplaintSummary,
}

#[derive(Debug, Serialize)]
pub struct EmergencyResponse {
    pub message: String,
    pub complaint: ComplaintSummary,
    /// Static estimate. Does not reflect actual dispatch.
    pub eta: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ComplaintResponse {
    pub message: String,
    pub complaint: ComplaintDetail,
}

#[derive(Debug, Serialize)]
pub struct ComplaintListResponse<T> {
    pub message: String,
    pub complaints: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct AlertListResponse<T> {
    pub message: String,
    pub alerts: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Serialize)]
pub struct AlertResponse<T> {
    pub message: String,
    pub alert: T,
    pub complaint: ComplaintDetail,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse<T> {
    pub message: String,
    pub stats: T,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse<T> {
    pub message: String,
    pub notifications: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse<T> {
    pub message: String,
    pub notification: T,
}
