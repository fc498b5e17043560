//! HTTP API handlers for Tourguard.
//!
//! # Tourist surface
//!
//! - `POST /sos/submit`, `POST /sos/emergency`
//! - `GET /sos` (also `/sos/`), `GET /sos/:id`, `GET /sos/stats/user`
//! - `POST /sos/:id/communication`, `POST /sos/:id/feedback`, `PATCH /sos/:id/cancel`
//! - `GET /notifications`, `PATCH /notifications/:id/read`
//!
//! # Authority surface
//!
//! - `GET /authority/complaints` (filters, search, sort)
//! - `GET /authority/complaints/stats`, `GET /authority/complaints/nearby`
//! - `GET|DELETE /authority/complaints/:id`
//! - `PATCH /authority/complaints/:id/{acknowledge,assign,status,resolve,escalate}`
//! - `POST /authority/complaints/:id/communication`
//! - `GET /authority/tourists/:user_id/safety`
//!
//! Successful responses use the `{message, <entity>, pagination?}` envelope,
//! failures the `{message, error?}` envelope rendered by [`AppError`].
//!
//! Logs carry ids, statuses and counts only, never message bodies or
//! contact details.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::aggregation::{self, UserStats};
use crate::auth::{Authority, JwtConfig, Principal};
use crate::dashboard::{Alert, DashboardStats, TimeRange};
use crate::error::{AppError, AppResult};
use crate::lifecycle::{Actor, ComplaintService};
use crate::model::{
    AcknowledgeRequest, AlertListResponse, AlertResponse, AssignRequest, AuthorityListQuery,
    CancelRequest, CommunicationRequest, Complaint, ComplaintDetail, ComplaintListQuery,
    ComplaintListResponse, ComplaintResponse, EmergencyRequest, EmergencyResponse, EscalateRequest,
    FeedbackRequest, LatLng, NearbyQuery, NotificationListQuery, NotificationListResponse,
    NotificationResponse, PageRequest, Pagination, ResolveRequest, StatsResponse,
    StatusUpdateRequest, SubmitComplaintRequest, SubmitResponse,
};
use crate::notify::Notification;
use crate::policy::SafetyAssessment;
use crate::storage::{ComplaintFilter, Storage};

/// Largest radius accepted by the nearby search, in kilometres.
const MAX_NEARBY_RADIUS_KM: f64 = 100.0;

/// JSON body extractor whose rejections render as [`AppError::Validation`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejections render as [`AppError::Validation`].
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub complaints: ComplaintService,
    pub jwt: Arc<JwtConfig>,
}

/// Build the full route table.
pub fn router(state: AppState) -> Router {
    let sos = Router::new()
        .route("/", get(list_my_complaints))
        .route("/submit", post(submit_complaint))
        .route("/emergency", post(submit_emergency))
        .route("/stats/user", get(get_user_stats))
        .route("/:id", get(get_my_complaint))
        .route("/:id/communication", post(post_user_communication))
        .route("/:id/feedback", post(post_feedback))
        .route("/:id/cancel", patch(cancel_complaint));

    let authority = Router::new()
        .route("/complaints", get(list_authority_complaints))
        .route("/complaints/stats", get(get_dashboard_stats))
        .route("/complaints/nearby", get(get_nearby_complaints))
        .route(
            "/complaints/:id",
            get(get_authority_complaint).delete(delete_complaint),
        )
        .route("/complaints/:id/acknowledge", patch(acknowledge_complaint))
        .route("/complaints/:id/assign", patch(assign_complaint))
        .route("/complaints/:id/status", patch(update_complaint_status))
        .route("/complaints/:id/resolve", patch(resolve_complaint))
        .route("/complaints/:id/escalate", patch(escalate_complaint))
        .route(
            "/complaints/:id/communication",
            post(post_officer_communication),
        )
        .route("/tourists/:user_id/safety", get(get_tourist_safety));

    Router::new()
        .route("/health", get(health_check))
        .route("/sos/", get(list_my_complaints))
        .nest("/sos", sos)
        .nest("/authority", authority)
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", patch(mark_notification_read))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

// ============================================================================
// Tourist handlers
// ============================================================================

/// POST /sos/submit - Submit a complaint.
///
/// Returns `201 Created` with the public projection of the stored complaint.
#[instrument(skip_all, fields(user_id = %principal.user_id))]
pub async fn submit_complaint(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(request): AppJson<SubmitComplaintRequest>,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let complaint = state.complaints.submit(&principal.user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: "Complaint submitted successfully".to_string(),
            complaint: complaint.summary(),
        }),
    ))
}

/// POST /sos/emergency - One-tap emergency SOS.
///
/// The body is optional. Contact info falls back to the caller's phone, then
/// email. The returned `eta` is a fixed estimate.
#[instrument(skip_all, fields(user_id = %principal.user_id))]
pub async fn submit_emergency(
    State(state): State<AppState>,
    principal: Principal,
    request: Option<AppJson<EmergencyRequest>>,
) -> AppResult<(StatusCode, Json<EmergencyResponse>)> {
    let request = request.map(|AppJson(r)| r).unwrap_or_default();
    let (complaint, eta) = state.complaints.submit_emergency(&principal, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(EmergencyResponse {
            message: "Emergency SOS activated. Help is on the way.".to_string(),
            complaint: complaint.summary(),
            eta,
        }),
    ))
}

/// GET /sos - The caller's complaints, newest first.
#[instrument(skip_all, fields(user_id = %principal.user_id))]
pub async fn list_my_complaints(
    State(state): State<AppState>,
    principal: Principal,
    AppQuery(query): AppQuery<ComplaintListQuery>,
) -> AppResult<Json<ComplaintListResponse<ComplaintDetail>>> {
    let page = PageRequest::new(query.page, query.limit);
    let filter = ComplaintFilter {
        user_id: Some(principal.user_id.clone()),
        status: query.status,
        category: query.category,
        urgency: query.urgency,
        from: query.from,
        to: query.to,
        ..Default::default()
    };

    let (complaints, total) = state.storage.list_complaints(&filter, page).await?;
    info!(count = complaints.len(), total, "Complaints listed");

    Ok(Json(ComplaintListResponse {
        message: "Complaints retrieved successfully".to_string(),
        complaints: complaints.into_iter().map(|c| c.into_detail()).collect(),
        pagination: Pagination::new(total, page),
    }))
}

/// GET /sos/:id - One complaint, visible to its owner and to authorities.
#[instrument(skip(state, principal))]
pub async fn get_my_complaint(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<ComplaintResponse>> {
    let complaint = state.complaints.get_visible_to(&id, &principal).await?;
    Ok(complaint_response("Complaint retrieved successfully", complaint))
}

/// POST /sos/:id/communication - Owner adds a message.
#[instrument(skip(state, principal, request))]
pub async fn post_user_communication(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    AppJson(request): AppJson<CommunicationRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    let actor = Actor::User {
        user_id: principal.user_id,
    };
    let complaint = state
        .complaints
        .add_communication(actor, &id, &request.message)
        .await?;
    Ok(complaint_response("Message added successfully", complaint))
}

/// POST /sos/:id/feedback - Rate a resolved or closed complaint, once.
#[instrument(skip(state, principal, request))]
pub async fn post_feedback(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    AppJson(request): AppJson<FeedbackRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    let complaint = state
        .complaints
        .submit_feedback(
            &id,
            &principal.user_id,
            request.rating,
            request.comment.as_deref(),
        )
        .await?;
    Ok(complaint_response("Feedback submitted successfully", complaint))
}

/// PATCH /sos/:id/cancel - Owner cancels a still-submitted complaint.
#[instrument(skip(state, principal, request))]
pub async fn cancel_complaint(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    request: Option<AppJson<CancelRequest>>,
) -> AppResult<Json<ComplaintResponse>> {
    let request = request.map(|AppJson(r)| r).unwrap_or_default();
    let complaint = state
        .complaints
        .cancel(&id, &principal.user_id, request.reason.as_deref())
        .await?;
    Ok(complaint_response("Complaint cancelled successfully", complaint))
}

/// GET /sos/stats/user - The caller's complaint statistics.
#[instrument(skip_all, fields(user_id = %principal.user_id))]
pub async fn get_user_stats(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<StatsResponse<UserStats>>> {
    let stats = aggregation::user_stats(&state.storage, &principal.user_id).await?;
    Ok(Json(StatsResponse {
        message: "Statistics retrieved successfully".to_string(),
        stats,
    }))
}

/// GET /notifications - The caller's notifications, newest first.
#[instrument(skip_all, fields(user_id = %principal.user_id))]
pub async fn list_notifications(
    State(state): State<AppState>,
    principal: Principal,
    AppQuery(query): AppQuery<NotificationListQuery>,
) -> AppResult<Json<NotificationListResponse<Notification>>> {
    let page = PageRequest::new(query.page, query.limit);
    let (notifications, total) = state
        .storage
        .list_notifications(&principal.user_id, query.unread_only, page)
        .await?;

    Ok(Json(NotificationListResponse {
        message: "Notifications retrieved successfully".to_string(),
        notifications,
        pagination: Pagination::new(total, page),
    }))
}

/// PATCH /notifications/:id/read - Mark one of the caller's notifications read.
#[instrument(skip(state, principal))]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<Json<NotificationResponse<Notification>>> {
    let mut notification = state
        .storage
        .get_notification(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {id}")))?;

    if notification.recipient != principal.user_id {
        return Err(AppError::Forbidden(
            "notification belongs to another user".to_string(),
        ));
    }

    if !notification.is_read {
        notification.is_read = true;
        notification.read_at = Some(Utc::now());
        state.storage.update_notification(&notification).await?;
    }

    Ok(Json(NotificationResponse {
        message: "Notification marked as read".to_string(),
        notification,
    }))
}

// ============================================================================
// Authority handlers
// ============================================================================

/// GET /authority/complaints - All live complaints as alerts.
#[instrument(skip_all, fields(officer = %officer.user_id))]
pub async fn list_authority_complaints(
    State(state): State<AppState>,
    Authority(officer): Authority,
    AppQuery(query): AppQuery<AuthorityListQuery>,
) -> AppResult<Json<AlertListResponse<Alert>>> {
    let page = PageRequest::new(query.page, query.limit);
    let filter = ComplaintFilter {
        user_id: None,
        status: query.status,
        category: query.category,
        urgency: query.urgency,
        priority: query.priority,
        department: query.department,
        from: query.from,
        to: query.to,
        search: query.search,
        sort_by: query.sort_by,
        order: query.order,
    };

    let (complaints, total) = state.storage.list_complaints(&filter, page).await?;
    info!(count = complaints.len(), total, "Authority complaints listed");

    Ok(Json(AlertListResponse {
        message: "Complaints retrieved successfully".to_string(),
        alerts: complaints.iter().map(Alert::from).collect(),
        pagination: Some(Pagination::new(total, page)),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    #[serde(default)]
    pub time_range: TimeRange,
}

/// GET /authority/complaints/stats - Windowed dashboard statistics.
#[instrument(skip_all, fields(officer = %officer.user_id))]
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
    Authority(officer): Authority,
    AppQuery(query): AppQuery<StatsQuery>,
) -> AppResult<Json<StatsResponse<DashboardStats>>> {
    let stats = aggregation::dashboard_stats(&state.storage, query.time_range, Utc::now()).await?;
    info!(
        total = stats.total,
        emergency_count = stats.emergency_count,
        "Dashboard stats queried"
    );

    Ok(Json(StatsResponse {
        message: "Statistics retrieved successfully".to_string(),
        stats,
    }))
}

/// GET /authority/complaints/nearby?lat&lng&radius - Alerts within `radius` km.
#[instrument(skip_all, fields(officer = %officer.user_id))]
pub async fn get_nearby_complaints(
    State(state): State<AppState>,
    Authority(officer): Authority,
    AppQuery(query): AppQuery<NearbyQuery>,
) -> AppResult<Json<AlertListResponse<Alert>>> {
    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lng) {
        return Err(AppError::Validation(
            "lat must be within [-90, 90] and lng within [-180, 180]".to_string(),
        ));
    }
    if !(query.radius > 0.0 && query.radius <= MAX_NEARBY_RADIUS_KM) {
        return Err(AppError::Validation(format!(
            "radius must be greater than 0 and at most {MAX_NEARBY_RADIUS_KM} km"
        )));
    }

    let center = LatLng {
        lat: query.lat,
        lng: query.lng,
    };
    let alerts = aggregation::nearby_alerts(&state.storage, center, query.radius).await?;
    info!(count = alerts.len(), radius_km = query.radius, "Nearby complaints queried");

    Ok(Json(AlertListResponse {
        message: "Nearby complaints retrieved successfully".to_string(),
        alerts,
        pagination: None,
    }))
}

/// GET /authority/complaints/:id - Alert projection plus the full record.
#[instrument(skip(state, _officer))]
pub async fn get_authority_complaint(
    State(state): State<AppState>,
    Authority(_officer): Authority,
    Path(id): Path<String>,
) -> AppResult<Json<AlertResponse<Alert>>> {
    let complaint = state.complaints.get(&id).await?;
    Ok(Json(AlertResponse {
        message: "Complaint retrieved successfully".to_string(),
        alert: Alert::from(&complaint),
        complaint: complaint.into_detail(),
    }))
}

/// PATCH /authority/complaints/:id/acknowledge
#[instrument(skip(state, officer, request))]
pub async fn acknowledge_complaint(
    State(state): State<AppState>,
    Authority(officer): Authority,
    Path(id): Path<String>,
    request: Option<AppJson<AcknowledgeRequest>>,
) -> AppResult<Json<ComplaintResponse>> {
    let request = request.map(|AppJson(r)| r).unwrap_or_default();
    let complaint = state
        .complaints
        .acknowledge(&id, &officer, request.notes.as_deref())
        .await?;
    Ok(complaint_response("Complaint acknowledged", complaint))
}

/// PATCH /authority/complaints/:id/assign
#[instrument(skip(state, officer, request))]
pub async fn assign_complaint(
    State(state): State<AppState>,
    Authority(officer): Authority,
    Path(id): Path<String>,
    AppJson(request): AppJson<AssignRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    let complaint = state
        .complaints
        .assign_officer(&id, &request.officer_id, Some(officer.display_name()))
        .await?;
    Ok(complaint_response("Officer assigned", complaint))
}

/// PATCH /authority/complaints/:id/status
#[instrument(skip(state, officer, request))]
pub async fn update_complaint_status(
    State(state): State<AppState>,
    Authority(officer): Authority,
    Path(id): Path<String>,
    AppJson(request): AppJson<StatusUpdateRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    let complaint = state
        .complaints
        .update_status(
            &id,
            request.status,
            Some(&officer.user_id),
            request.notes.as_deref(),
        )
        .await?;
    Ok(complaint_response("Complaint status updated", complaint))
}

/// PATCH /authority/complaints/:id/resolve
#[instrument(skip(state, officer, request))]
pub async fn resolve_complaint(
    State(state): State<AppState>,
    Authority(officer): Authority,
    Path(id): Path<String>,
    request: Option<AppJson<ResolveRequest>>,
) -> AppResult<Json<ComplaintResponse>> {
    let request = request.map(|AppJson(r)| r).unwrap_or_default();
    let complaint = state
        .complaints
        .resolve(
            &id,
            Some(&officer.user_id),
            request.resolution_notes.as_deref(),
            request.action_taken.as_deref(),
        )
        .await?;
    Ok(complaint_response("Complaint resolved", complaint))
}

/// PATCH /authority/complaints/:id/escalate
#[instrument(skip(state, officer, request))]
pub async fn escalate_complaint(
    State(state): State<AppState>,
    Authority(officer): Authority,
    Path(id): Path<String>,
    request: Option<AppJson<EscalateRequest>>,
) -> AppResult<Json<ComplaintResponse>> {
    let request = request.map(|AppJson(r)| r).unwrap_or_default();
    let officer_name = request
        .officer_name
        .as_deref()
        .unwrap_or_else(|| officer.display_name());
    let complaint = state
        .complaints
        .escalate(
            &id,
            Some(officer_name),
            request.escalation_notes.as_deref(),
            request.fir_number.as_deref(),
        )
        .await?;
    Ok(complaint_response("Complaint escalated", complaint))
}

/// POST /authority/complaints/:id/communication
#[instrument(skip(state, officer, request))]
pub async fn post_officer_communication(
    State(state): State<AppState>,
    Authority(officer): Authority,
    Path(id): Path<String>,
    AppJson(request): AppJson<CommunicationRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    let actor = Actor::Officer {
        officer_id: officer.user_id,
    };
    let complaint = state
        .complaints
        .add_communication(actor, &id, &request.message)
        .await?;
    Ok(complaint_response("Message sent", complaint))
}

/// DELETE /authority/complaints/:id - Soft delete.
#[instrument(skip(state, officer))]
pub async fn delete_complaint(
    State(state): State<AppState>,
    Authority(officer): Authority,
    Path(id): Path<String>,
) -> AppResult<Json<ComplaintResponse>> {
    let complaint = state.complaints.delete(&id, &officer.user_id).await?;
    Ok(complaint_response("Complaint deleted", complaint))
}

/// GET /authority/tourists/:user_id/safety - Safety score and risk label.
#[instrument(skip(state, _officer))]
pub async fn get_tourist_safety(
    State(state): State<AppState>,
    Authority(_officer): Authority,
    Path(user_id): Path<String>,
) -> AppResult<Json<StatsResponse<SafetyAssessment>>> {
    let stats = aggregation::tourist_safety(&state.storage, &user_id, Utc::now()).await?;
    Ok(Json(StatsResponse {
        message: "Safety assessment computed".to_string(),
        stats,
    }))
}

fn complaint_response(message: &str, complaint: Complaint) -> Json<ComplaintResponse> {
    Json(ComplaintResponse {
        message: message.to_string(),
        complaint: complaint.into_detail(),
    })
}
