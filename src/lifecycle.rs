//! Complaint lifecycle: creation, status transitions, communication,
//! resolution, escalation, cancellation and feedback.
//!
//! Every operation is a single read-modify-write of one complaint. Status
//! changes are checked against [`policy::check_transition`] before anything
//! is mutated, and each of them appends exactly one system entry to the
//! communication log. Notifications are queued after the write succeeds and
//! never fail the operation.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{AppError, AppResult};
use crate::model::{
    Category, Complaint, ComplaintDraft, ComplaintStatus, CommunicationSource, EmergencyRequest,
    EscalationInfo, Feedback, Location, Priority, Resolution, SubmitComplaintRequest, Urgency,
};
use crate::notify::{Notification, NotificationType, Notifier, preview};
use crate::policy;
use crate::storage::Storage;

/// Static estimate returned with emergency submissions.
pub const EMERGENCY_ETA: &str = "5-8 minutes";

const EMERGENCY_TITLE: &str = "Emergency SOS";
const EMERGENCY_DESCRIPTION: &str = "Emergency SOS activated - immediate assistance required";
const UNKNOWN_ADDRESS: &str = "Location not provided";

const MAX_TITLE_CHARS: usize = 200;
const MAX_TEXT_CHARS: usize = 2000;

/// Who is writing to a complaint's communication log.
#[derive(Debug, Clone)]
pub enum Actor {
    /// The tourist; must own the complaint.
    User { user_id: String },
    /// An officer acting on behalf of the authorities.
    Officer { officer_id: String },
    System,
}

#[derive(Clone)]
pub struct ComplaintService {
    storage: Storage,
    notifier: Notifier,
}

impl ComplaintService {
    pub fn new(storage: Storage, notifier: Notifier) -> Self {
        Self { storage, notifier }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Load a live complaint or fail with `NotFound`.
    pub async fn get(&self, complaint_id: &str) -> AppResult<Complaint> {
        self.storage
            .get_complaint(complaint_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Complaint {complaint_id}")))
    }

    /// Load a complaint the caller is allowed to see: the owner or any
    /// authority.
    pub async fn get_visible_to(&self, complaint_id: &str, principal: &Principal) -> AppResult<Complaint> {
        let complaint = self.get(complaint_id).await?;
        if !principal.is_authority() && !complaint.is_owned_by(&principal.user_id) {
            return Err(AppError::Forbidden(
                "complaint belongs to another user".to_string(),
            ));
        }
        Ok(complaint)
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    #[instrument(skip(self, request), fields(category = ?request.category, urgency = ?request.urgency))]
    pub async fn submit(&self, user_id: &str, request: SubmitComplaintRequest) -> AppResult<Complaint> {
        let draft = ComplaintDraft {
            category: request.category,
            title: required("title", request.title, MAX_TITLE_CHARS)?,
            description: required("description", request.description, MAX_TEXT_CHARS)?,
            urgency: request.urgency,
            contact_info: required("contactInfo", request.contact_info, MAX_TITLE_CHARS)?,
            location: validate_location(request.location)?,
            additional_info: optional_text(request.additional_info),
            attachments: request.attachments,
            is_emergency_sos: request.is_emergency_sos,
            device_info: request.device_info,
        };

        self.create(user_id, draft).await
    }

    /// One-tap emergency variant: always critical, everything defaulted.
    ///
    /// Returns the complaint together with a static ETA string; the ETA does
    /// not reflect any actual dispatch.
    #[instrument(skip(self, principal, request), fields(user_id = %principal.user_id))]
    pub async fn submit_emergency(
        &self,
        principal: &Principal,
        request: EmergencyRequest,
    ) -> AppResult<(Complaint, &'static str)> {
        let contact_info = optional_text(request.contact_info)
            .or_else(|| optional_text(principal.phone.clone()))
            .or_else(|| optional_text(principal.email.clone()))
            .ok_or(AppError::MissingContactInfo)?;

        let location = match request.location {
            Some(location) if location.address.trim().is_empty() => validate_location(Location {
                address: UNKNOWN_ADDRESS.to_string(),
                ..location
            })?,
            Some(location) => validate_location(location)?,
            None => Location {
                address: UNKNOWN_ADDRESS.to_string(),
                coordinates: None,
                landmark: None,
            },
        };

        let draft = ComplaintDraft {
            category: Category::GeneralHelp,
            title: EMERGENCY_TITLE.to_string(),
            description: optional_text(request.description)
                .unwrap_or_else(|| EMERGENCY_DESCRIPTION.to_string()),
            urgency: Urgency::Critical,
            contact_info,
            location,
            additional_info: None,
            attachments: Vec::new(),
            is_emergency_sos: true,
            device_info: request.device_info,
        };

        let complaint = self.create(&principal.user_id, draft).await?;
        Ok((complaint, EMERGENCY_ETA))
    }

    async fn create(&self, user_id: &str, draft: ComplaintDraft) -> AppResult<Complaint> {
        let now = Utc::now();
        let mut complaint = Complaint::new(Uuid::new_v4().simple().to_string(), user_id, draft, now);
        complaint.log_system("Complaint submitted", now);

        complaint.version = self.storage.insert_complaint(&complaint).await?;

        let complaint_id = complaint.complaint_id();
        info!(
            complaint_id = %complaint_id,
            category = complaint.category.as_str(),
            priority = complaint.priority.as_str(),
            department = complaint.assigned_department.as_str(),
            emergency = complaint.is_emergency_sos,
            "Complaint submitted"
        );

        let critical = complaint.urgency == Urgency::Critical;
        let (kind, priority) = if critical {
            (NotificationType::Emergency, Priority::Critical)
        } else {
            (NotificationType::ComplaintUpdate, Priority::Normal)
        };
        self.notifier.notify(
            Notification::new(
                user_id,
                "Complaint Submitted",
                format!(
                    "Your complaint {complaint_id} has been submitted and routed to the {} team.",
                    complaint.assigned_department.as_str().replace('_', " ")
                ),
                kind,
            )
            .with_priority(priority)
            .about_complaint(&complaint.id),
        );

        if complaint.is_emergency_sos {
            self.notifier.notify(
                Notification::new(
                    user_id,
                    "Emergency SOS Activated",
                    format!(
                        "Emergency SOS {complaint_id} is active. Responders have been alerted; stay where you are if it is safe."
                    ),
                    NotificationType::Emergency,
                )
                .with_priority(Priority::Critical)
                .about_complaint(&complaint.id),
            );
        }

        Ok(complaint)
    }

    // ------------------------------------------------------------------------
    // Communication
    // ------------------------------------------------------------------------

    #[instrument(skip(self, message))]
    pub async fn add_communication(
        &self,
        actor: Actor,
        complaint_id: &str,
        message: &str,
    ) -> AppResult<Complaint> {
        let message = required("message", message.to_string(), MAX_TEXT_CHARS)?;
        let mut complaint = self.get(complaint_id).await?;
        let now = Utc::now();

        let officer_message = match &actor {
            Actor::User { user_id } => {
                ensure_owner(&complaint, user_id)?;
                complaint.log(CommunicationSource::User, message, None, now);
                None
            }
            Actor::Officer { officer_id } => {
                complaint.log(
                    CommunicationSource::Officer,
                    message.clone(),
                    Some(officer_id.clone()),
                    now,
                );
                Some(message)
            }
            Actor::System => {
                complaint.log_system(message, now);
                None
            }
        };

        self.save(&mut complaint).await?;
        info!(complaint_id = %complaint.complaint_id(), "Communication added");

        if let Some(message) = officer_message {
            self.notifier.notify(
                Notification::new(
                    &complaint.user_id,
                    "New Message from Authorities",
                    format!(
                        "Update on {}: {}",
                        complaint.complaint_id(),
                        preview(&message)
                    ),
                    NotificationType::Message,
                )
                .about_complaint(&complaint.id),
            );
        }

        Ok(complaint)
    }

    // ------------------------------------------------------------------------
    // Status transitions
    // ------------------------------------------------------------------------

    /// Move a complaint along the status graph.
    ///
    /// Targets that carry their own bookkeeping (`under_review`, `assigned`,
    /// `resolved`, `escalated`) are refused here and must go through
    /// [`acknowledge`](Self::acknowledge), [`assign_officer`](Self::assign_officer),
    /// [`resolve`](Self::resolve) or [`escalate`](Self::escalate).
    #[instrument(skip(self, notes))]
    pub async fn update_status(
        &self,
        complaint_id: &str,
        new_status: ComplaintStatus,
        officer_id: Option<&str>,
        notes: Option<&str>,
    ) -> AppResult<Complaint> {
        if let Some(route) = dedicated_route(new_status) {
            return Err(AppError::Validation(format!(
                "status {new_status} cannot be set directly, use PATCH /authority/complaints/:id/{route}"
            )));
        }

        let mut complaint = self.get(complaint_id).await?;
        apply_status(&mut complaint, new_status, notes, Utc::now())?;
        if let (Some(officer_id), Some(entry)) = (officer_id, complaint.communications.last_mut()) {
            entry.officer_id = Some(officer_id.to_string());
        }
        self.save(&mut complaint).await?;
        Ok(complaint)
    }

    /// `submitted -> under_review`, recording the response time on first
    /// acknowledgement.
    #[instrument(skip(self, officer, notes), fields(officer = %officer.user_id))]
    pub async fn acknowledge(
        &self,
        complaint_id: &str,
        officer: &Principal,
        notes: Option<&str>,
    ) -> AppResult<Complaint> {
        let mut complaint = self.get(complaint_id).await?;
        policy::check_transition(complaint.status, ComplaintStatus::UnderReview)?;

        let now = Utc::now();
        complaint.status = ComplaintStatus::UnderReview;
        if complaint.acknowledged_at.is_none() {
            complaint.acknowledged_at = Some(now);
            complaint.emergency_response_time =
                Some((now - complaint.created_at).num_minutes().max(0));
        }
        complaint.log(
            CommunicationSource::System,
            with_notes(
                format!("Complaint acknowledged by {}", officer.display_name()),
                notes,
            ),
            Some(officer.user_id.clone()),
            now,
        );

        self.save(&mut complaint).await?;

        self.notifier.notify(
            Notification::new(
                &complaint.user_id,
                "Complaint Under Review",
                format!(
                    "Your complaint {} has been acknowledged and is under review.",
                    complaint.complaint_id()
                ),
                NotificationType::ComplaintUpdate,
            )
            .about_complaint(&complaint.id),
        );

        Ok(complaint)
    }

    /// Assign an officer. Forces `assigned`; reassigning an already assigned
    /// complaint only changes the officer.
    #[instrument(skip(self))]
    pub async fn assign_officer(
        &self,
        complaint_id: &str,
        officer_id: &str,
        assigned_by: Option<&str>,
    ) -> AppResult<Complaint> {
        let officer_id = required("officerId", officer_id.to_string(), MAX_TITLE_CHARS)?;
        let mut complaint = self.get(complaint_id).await?;
        if complaint.status != ComplaintStatus::Assigned {
            policy::check_transition(complaint.status, ComplaintStatus::Assigned)?;
        }

        let now = Utc::now();
        complaint.status = ComplaintStatus::Assigned;
        complaint.assigned_to = Some(officer_id.clone());

        let mut message = format!("Complaint assigned to officer {officer_id}");
        if let Some(by) = assigned_by {
            message.push_str(&format!(" by {by}"));
        }
        complaint.log(CommunicationSource::System, message, assigned_by.map(String::from), now);

        self.save(&mut complaint).await?;
        Ok(complaint)
    }

    /// Resolve a complaint. Resolution notes are mandatory and are checked
    /// before anything is loaded or written.
    #[instrument(skip(self, resolution_notes, action_taken))]
    pub async fn resolve(
        &self,
        complaint_id: &str,
        officer_id: Option<&str>,
        resolution_notes: Option<&str>,
        action_taken: Option<&str>,
    ) -> AppResult<Complaint> {
        let notes = resolution_notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(AppError::MissingResolutionNotes)?
            .to_string();

        let mut complaint = self.get(complaint_id).await?;
        policy::check_transition(complaint.status, ComplaintStatus::Resolved)?;

        let now = Utc::now();
        complaint.status = ComplaintStatus::Resolved;
        complaint.resolution = Some(Resolution {
            resolved_by: officer_id.map(String::from),
            resolved_at: now,
            resolution_notes: notes.clone(),
            action_taken: optional_text(action_taken.map(String::from)),
        });
        complaint.log(
            CommunicationSource::System,
            format!("Complaint resolved: {notes}"),
            officer_id.map(String::from),
            now,
        );

        self.save(&mut complaint).await?;
        info!(complaint_id = %complaint.complaint_id(), "Complaint resolved");

        self.notifier.notify(
            Notification::new(
                &complaint.user_id,
                "Complaint Resolved",
                format!(
                    "Your complaint {} has been resolved. Please rate how it was handled.",
                    complaint.complaint_id()
                ),
                NotificationType::FeedbackRequest,
            )
            .about_complaint(&complaint.id)
            .requiring("submit_feedback", format!("/sos/{}/feedback", complaint.id)),
        );

        Ok(complaint)
    }

    /// Escalate to a formal case. Never touches priority or department.
    #[instrument(skip(self, escalation_notes))]
    pub async fn escalate(
        &self,
        complaint_id: &str,
        officer_name: Option<&str>,
        escalation_notes: Option<&str>,
        fir_number: Option<&str>,
    ) -> AppResult<Complaint> {
        let mut complaint = self.get(complaint_id).await?;
        policy::check_transition(complaint.status, ComplaintStatus::Escalated)?;

        let now = Utc::now();
        let fir_number = optional_text(fir_number.map(String::from))
            .unwrap_or_else(|| generate_fir_number(now));
        let notes = optional_text(escalation_notes.map(String::from));

        complaint.status = ComplaintStatus::Escalated;
        complaint.escalation = Some(EscalationInfo {
            fir_number: fir_number.clone(),
            escalated_by: officer_name.map(String::from),
            escalation_date: now,
            notes: notes.clone(),
        });

        let message = match officer_name {
            Some(by) => format!("Complaint escalated by {by}. FIR number: {fir_number}"),
            None => format!("Complaint escalated. FIR number: {fir_number}"),
        };
        complaint.log_system(with_notes(message, notes.as_deref()), now);

        self.save(&mut complaint).await?;
        info!(
            complaint_id = %complaint.complaint_id(),
            fir_number = %fir_number,
            "Complaint escalated"
        );

        self.notifier.notify(
            Notification::new(
                &complaint.user_id,
                "Complaint Escalated",
                format!(
                    "Your complaint {} has been escalated. FIR number: {fir_number}",
                    complaint.complaint_id()
                ),
                NotificationType::Escalation,
            )
            .with_priority(Priority::High)
            .about_complaint(&complaint.id),
        );

        Ok(complaint)
    }

    /// Owner-only, and only while still `submitted`.
    #[instrument(skip(self, reason))]
    pub async fn cancel(&self, complaint_id: &str, user_id: &str, reason: Option<&str>) -> AppResult<Complaint> {
        let mut complaint = self.get(complaint_id).await?;
        ensure_owner(&complaint, user_id)?;
        if complaint.status != ComplaintStatus::Submitted {
            return Err(AppError::NotCancellable(complaint.status));
        }

        let note = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => format!("Cancelled by user: {reason}"),
            None => "Cancelled by user".to_string(),
        };
        apply_status(&mut complaint, ComplaintStatus::Closed, Some(&note), Utc::now())?;

        self.save(&mut complaint).await?;
        info!(complaint_id = %complaint.complaint_id(), "Complaint cancelled");
        Ok(complaint)
    }

    /// Accepted once, from the owner, on a resolved or closed complaint.
    #[instrument(skip(self, comment))]
    pub async fn submit_feedback(
        &self,
        complaint_id: &str,
        user_id: &str,
        rating: u8,
        comment: Option<&str>,
    ) -> AppResult<Complaint> {
        let mut complaint = self.get(complaint_id).await?;
        ensure_owner(&complaint, user_id)?;
        if !complaint.status.is_settled() {
            return Err(AppError::NotEligibleForFeedback(complaint.status));
        }
        if complaint.feedback.is_some() {
            return Err(AppError::AlreadyRated);
        }
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let now = Utc::now();
        complaint.feedback = Some(Feedback {
            rating,
            comment: optional_text(comment.map(String::from)),
            submitted_at: now,
        });
        complaint.log_system(format!("Feedback submitted: {rating}/5"), now);

        self.save(&mut complaint).await?;
        info!(complaint_id = %complaint.complaint_id(), rating, "Feedback submitted");
        Ok(complaint)
    }

    /// Soft delete. The complaint disappears from every default query.
    #[instrument(skip(self))]
    pub async fn delete(&self, complaint_id: &str, deleted_by: &str) -> AppResult<Complaint> {
        let mut complaint = self.get(complaint_id).await?;

        let now = Utc::now();
        complaint.is_deleted = true;
        complaint.deleted_at = Some(now);
        complaint.log(
            CommunicationSource::System,
            "Complaint archived",
            Some(deleted_by.to_string()),
            now,
        );

        self.save(&mut complaint).await?;
        info!(complaint_id = %complaint.complaint_id(), "Complaint archived");
        Ok(complaint)
    }

    async fn save(&self, complaint: &mut Complaint) -> AppResult<()> {
        complaint.version = self.storage.update_complaint(complaint).await?;
        Ok(())
    }
}

/// Validate and apply a status change, logging
/// `Status changed from {old} to {new}[: {notes}]`.
fn apply_status(
    complaint: &mut Complaint,
    new_status: ComplaintStatus,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let old = complaint.status;
    policy::check_transition(old, new_status)?;

    complaint.status = new_status;
    complaint.log_system(
        with_notes(format!("Status changed from {old} to {new_status}"), notes),
        now,
    );
    Ok(())
}

/// Operation that owns a status, when a plain status write would skip its
/// side effects.
fn dedicated_route(status: ComplaintStatus) -> Option<&'static str> {
    match status {
        ComplaintStatus::UnderReview => Some("acknowledge"),
        ComplaintStatus::Assigned => Some("assign"),
        ComplaintStatus::Resolved => Some("resolve"),
        ComplaintStatus::Escalated => Some("escalate"),
        _ => None,
    }
}

/// `FIR` followed by the current epoch milliseconds.
fn generate_fir_number(now: DateTime<Utc>) -> String {
    format!("FIR{}", now.timestamp_millis())
}

fn ensure_owner(complaint: &Complaint, user_id: &str) -> AppResult<()> {
    if complaint.is_owned_by(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "complaint belongs to another user".to_string(),
        ))
    }
}

fn with_notes(message: String, notes: Option<&str>) -> String {
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("{message}: {notes}"),
        None => message,
    }
}

fn required(field: &str, value: String, max_chars: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_location(location: Location) -> AppResult<Location> {
    let address = required("location.address", location.address, MAX_TITLE_CHARS)?;
    if let Some([lon, lat]) = location.coordinates {
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::Validation(
                "location.coordinates must be [longitude, latitude]".to_string(),
            ));
        }
    }
    Ok(Location {
        address,
        coordinates: location.coordinates,
        landmark: optional_text(location.landmark),
    })
}
