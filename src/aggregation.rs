//! Aggregation over stored complaints: per-user statistics, windowed
//! dashboard statistics, tourist safety scores and proximity search.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::dashboard::{Alert, DashboardStats, TimeRange};
use crate::error::AppResult;
use crate::model::{Complaint, LatLng};
use crate::policy::{self, SAFETY_WINDOW_DAYS, SafetyAssessment};
use crate::storage::Storage;

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A tourist's own complaint statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: u64,
    pub emergency_count: u64,
    pub resolved_count: u64,
    pub by_status: BTreeMap<&'static str, u64>,
    pub by_category: BTreeMap<&'static str, u64>,
    pub average_rating: Option<f64>,
}

impl UserStats {
    pub fn from_complaints(complaints: &[Complaint]) -> Self {
        let mut by_status = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        let mut ratings = Vec::new();

        for complaint in complaints {
            *by_status.entry(complaint.status.as_str()).or_insert(0) += 1;
            *by_category.entry(complaint.category.as_str()).or_insert(0) += 1;
            if let Some(feedback) = &complaint.feedback {
                ratings.push(f64::from(feedback.rating));
            }
        }

        Self {
            total: complaints.len() as u64,
            emergency_count: complaints.iter().filter(|c| c.is_emergency_sos).count() as u64,
            resolved_count: complaints.iter().filter(|c| c.status.is_settled()).count() as u64,
            by_status,
            by_category,
            average_rating: (!ratings.is_empty())
                .then(|| ratings.iter().sum::<f64>() / ratings.len() as f64),
        }
    }
}

pub async fn user_stats(storage: &Storage, user_id: &str) -> AppResult<UserStats> {
    let complaints = storage.complaints_for_user(user_id).await?;
    Ok(UserStats::from_complaints(&complaints))
}

/// Statistics over complaints created inside `time_range` before `now`.
pub async fn dashboard_stats(
    storage: &Storage,
    time_range: TimeRange,
    now: DateTime<Utc>,
) -> AppResult<DashboardStats> {
    let complaints = storage
        .complaints_created_since(time_range.start(now), None)
        .await?;
    Ok(DashboardStats::from_complaints(&complaints, time_range))
}

/// Safety score for one tourist, from the last 30 days of complaints.
pub async fn tourist_safety(
    storage: &Storage,
    user_id: &str,
    now: DateTime<Utc>,
) -> AppResult<SafetyAssessment> {
    let complaints = storage
        .complaints_created_since(now - Duration::days(SAFETY_WINDOW_DAYS), Some(user_id))
        .await?;
    Ok(policy::safety_score(&complaints, now))
}

/// Alerts within `radius_km` of `center`, nearest first.
///
/// A bounding box prefilter runs in SQL, the exact haversine check here.
pub async fn nearby_alerts(
    storage: &Storage,
    center: LatLng,
    radius_km: f64,
) -> AppResult<Vec<Alert>> {
    let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
    let cos_lat = center.lat.to_radians().cos().abs().max(1e-6);
    let lng_delta = lat_delta / cos_lat;

    let candidates = storage
        .complaints_in_bounds(
            center.lat - lat_delta,
            center.lat + lat_delta,
            &longitude_ranges(center.lng, lng_delta),
        )
        .await?;

    let mut alerts: Vec<(f64, Alert)> = candidates
        .iter()
        .filter_map(|complaint| {
            let point = complaint.location.lat_lng()?;
            let distance = haversine_km(center, point);
            (distance <= radius_km).then(|| (distance, Alert::from(complaint).with_distance(distance)))
        })
        .collect();

    alerts.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(alerts.into_iter().map(|(_, alert)| alert).collect())
}

/// Longitude ranges covering `center ± delta`, split in two when the window
/// crosses the antimeridian. Empty when the window spans every longitude.
fn longitude_ranges(center: f64, delta: f64) -> Vec<(f64, f64)> {
    if delta >= 180.0 {
        return Vec::new();
    }

    let (min, max) = (center - delta, center + delta);
    if min < -180.0 {
        vec![(min + 360.0, 180.0), (-180.0, max)]
    } else if max > 180.0 {
        vec![(min, 180.0), (-180.0, max - 360.0)]
    } else {
        vec![(min, max)]
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
