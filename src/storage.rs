//! SQLite storage layer for Tourguard.
//!
//! Complaints and notifications are stored as JSON documents. A handful of
//! projection columns are kept next to each complaint document so that
//! filters, sorting and pagination run in SQL instead of in memory.
//!
//! Writes to a complaint are compare-and-swap on `(id, version)`: a writer
//! that lost a race gets [`AppError::ConcurrentModification`] instead of
//! silently overwriting the other update.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row};

use crate::error::{AppError, AppResult};
use crate::model::{
    Category, Complaint, ComplaintStatus, Department, PageRequest, Priority, SortField, SortOrder,
    Urgency,
};
use crate::notify::Notification;

/// Columns selected whenever a complaint document is loaded.
const COMPLAINT_COLUMNS: &str = "SELECT document, version FROM complaints";

/// Filters understood by [`Storage::list_complaints`].
///
/// Soft-deleted complaints are always excluded.
#[derive(Debug, Clone, Default)]
pub struct ComplaintFilter {
    pub user_id: Option<String>,
    pub status: Option<ComplaintStatus>,
    pub category: Option<Category>,
    pub urgency: Option<Urgency>,
    pub priority: Option<Priority>,
    pub department: Option<Department>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:tourguard.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS complaints (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL,
                category TEXT NOT NULL,
                urgency TEXT NOT NULL,
                priority TEXT NOT NULL,
                priority_rank INTEGER NOT NULL,
                department TEXT NOT NULL,
                is_emergency INTEGER NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                lat REAL,
                lng REAL,
                search_text TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                version INTEGER NOT NULL,
                document TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_complaints_user_created
            ON complaints(user_id, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_complaints_status_created
            ON complaints(status, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                recipient TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                document TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_notifications_recipient
            ON notifications(recipient, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Complaints
    // ------------------------------------------------------------------------

    /// Insert a new complaint at version 1.
    pub async fn insert_complaint(&self, complaint: &Complaint) -> AppResult<i64> {
        let document = serde_json::to_string(complaint)?;
        let point = complaint.location.lat_lng();

        sqlx::query(
            r#"
            INSERT INTO complaints (
                id, user_id, status, category, urgency, priority, priority_rank,
                department, is_emergency, is_deleted, lat, lng, search_text,
                created_at, version, document
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&complaint.id)
        .bind(&complaint.user_id)
        .bind(complaint.status.as_str())
        .bind(complaint.category.as_str())
        .bind(complaint.urgency.as_str())
        .bind(complaint.priority.as_str())
        .bind(complaint.priority.rank())
        .bind(complaint.assigned_department.as_str())
        .bind(complaint.is_emergency_sos)
        .bind(complaint.is_deleted)
        .bind(point.map(|p| p.lat))
        .bind(point.map(|p| p.lng))
        .bind(search_text(complaint))
        .bind(complaint.created_at.timestamp_millis())
        .bind(document)
        .execute(&self.pool)
        .await?;

        Ok(1)
    }

    /// Fetch a complaint by id. Soft-deleted complaints are not returned.
    pub async fn get_complaint(&self, id: &str) -> AppResult<Option<Complaint>> {
        let row = sqlx::query(&format!(
            "{COMPLAINT_COLUMNS} WHERE id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_complaint).transpose()
    }

    /// Write back a complaint loaded at `complaint.version`.
    ///
    /// Returns the new version.
    pub async fn update_complaint(&self, complaint: &Complaint) -> AppResult<i64> {
        let document = serde_json::to_string(complaint)?;
        let point = complaint.location.lat_lng();

        let result = sqlx::query(
            r#"
            UPDATE complaints SET
                status = ?, category = ?, urgency = ?, priority = ?, priority_rank = ?,
                department = ?, is_emergency = ?, is_deleted = ?, lat = ?, lng = ?,
                search_text = ?, document = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(complaint.status.as_str())
        .bind(complaint.category.as_str())
        .bind(complaint.urgency.as_str())
        .bind(complaint.priority.as_str())
        .bind(complaint.priority.rank())
        .bind(complaint.assigned_department.as_str())
        .bind(complaint.is_emergency_sos)
        .bind(complaint.is_deleted)
        .bind(point.map(|p| p.lat))
        .bind(point.map(|p| p.lng))
        .bind(search_text(complaint))
        .bind(document)
        .bind(&complaint.id)
        .bind(complaint.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ConcurrentModification);
        }

        Ok(complaint.version + 1)
    }

    /// Filtered, sorted, paginated listing.
    ///
    /// Returns the page and the total number of matches.
    pub async fn list_complaints(
        &self,
        filter: &ComplaintFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Complaint>, u64)> {
        let mut count =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total FROM complaints WHERE is_deleted = 0");
        push_filters(&mut count, filter);
        let total: i64 = count.build().fetch_one(&self.pool).await?.get("total");

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("{COMPLAINT_COLUMNS} WHERE is_deleted = 0"));
        push_filters(&mut query, filter);

        let direction = match filter.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        match filter.sort_by {
            SortField::CreatedAt => {
                query.push(format!(" ORDER BY created_at {direction}, id {direction}"));
            }
            SortField::Priority => {
                query.push(format!(
                    " ORDER BY priority_rank {direction}, created_at DESC, id"
                ));
            }
        }

        query
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query.build().fetch_all(&self.pool).await?;
        let complaints = rows.iter().map(decode_complaint).collect::<AppResult<_>>()?;

        Ok((complaints, total as u64))
    }

    /// All live complaints created at or after `since`, optionally for one user.
    pub async fn complaints_created_since(
        &self,
        since: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> AppResult<Vec<Complaint>> {
        let filter = ComplaintFilter {
            user_id: user_id.map(str::to_string),
            from: Some(since),
            ..Default::default()
        };

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("{COMPLAINT_COLUMNS} WHERE is_deleted = 0"));
        push_filters(&mut query, &filter);
        query.push(" ORDER BY created_at DESC, id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_complaint).collect()
    }

    /// Every live complaint owned by `user_id`.
    pub async fn complaints_for_user(&self, user_id: &str) -> AppResult<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            "{COMPLAINT_COLUMNS} WHERE user_id = ? AND is_deleted = 0 ORDER BY created_at DESC, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_complaint).collect()
    }

    /// Live complaints whose coordinates fall inside a latitude band and any
    /// of the given longitude ranges. An empty `lng_ranges` matches every
    /// longitude.
    pub async fn complaints_in_bounds(
        &self,
        min_lat: f64,
        max_lat: f64,
        lng_ranges: &[(f64, f64)],
    ) -> AppResult<Vec<Complaint>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "{COMPLAINT_COLUMNS} WHERE is_deleted = 0 AND lat IS NOT NULL AND lng IS NOT NULL"
        ));
        query
            .push(" AND lat BETWEEN ")
            .push_bind(min_lat)
            .push(" AND ")
            .push_bind(max_lat);

        if !lng_ranges.is_empty() {
            query.push(" AND (");
            for (i, (min_lng, max_lng)) in lng_ranges.iter().enumerate() {
                if i > 0 {
                    query.push(" OR ");
                }
                query
                    .push("lng BETWEEN ")
                    .push_bind(*min_lng)
                    .push(" AND ")
                    .push_bind(*max_lng);
            }
            query.push(")");
        }
        query.push(" ORDER BY created_at DESC, id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_complaint).collect()
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    pub async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        let document = serde_json::to_string(notification)?;

        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient, is_read, created_at, document)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.recipient)
        .bind(notification.is_read)
        .bind(notification.created_at.timestamp_millis())
        .bind(document)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_notification(&self, id: &str) -> AppResult<Option<Notification>> {
        let row = sqlx::query("SELECT document FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_notification).transpose()
    }

    /// Newest first.
    pub async fn list_notifications(
        &self,
        recipient: &str,
        unread_only: bool,
        page: PageRequest,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let unread_clause = if unread_only { " AND is_read = 0" } else { "" };

        let total: i64 = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM notifications WHERE recipient = ?{unread_clause}"
        ))
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?
        .get("total");

        let rows = sqlx::query(&format!(
            r#"
            SELECT document FROM notifications
            WHERE recipient = ?{unread_clause}
            ORDER BY created_at DESC, id
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(recipient)
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let notifications = rows
            .iter()
            .map(decode_notification)
            .collect::<AppResult<_>>()?;

        Ok((notifications, total as u64))
    }

    pub async fn update_notification(&self, notification: &Notification) -> AppResult<()> {
        let document = serde_json::to_string(notification)?;

        sqlx::query("UPDATE notifications SET is_read = ?, document = ? WHERE id = ?")
            .bind(notification.is_read)
            .bind(document)
            .bind(&notification.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &ComplaintFilter) {
    if let Some(user_id) = &filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id.clone());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category) = filter.category {
        query.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(urgency) = filter.urgency {
        query.push(" AND urgency = ").push_bind(urgency.as_str());
    }
    if let Some(priority) = filter.priority {
        query.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(department) = filter.department {
        query.push(" AND department = ").push_bind(department.as_str());
    }
    if let Some(from) = filter.from {
        query
            .push(" AND created_at >= ")
            .push_bind(from.timestamp_millis());
    }
    if let Some(to) = filter.to {
        query
            .push(" AND created_at <= ")
            .push_bind(to.timestamp_millis());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query
            .push(" AND search_text LIKE ")
            .push_bind(format!("%{}%", escape_like(&search.to_lowercase())))
            .push(" ESCAPE '\\'");
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn search_text(complaint: &Complaint) -> String {
    let mut text = format!(
        "{} {} {}",
        complaint.title, complaint.description, complaint.location.address
    );
    if let Some(landmark) = &complaint.location.landmark {
        text.push(' ');
        text.push_str(landmark);
    }
    text.to_lowercase()
}

fn decode_complaint(row: &SqliteRow) -> AppResult<Complaint> {
    let document: String = row.get("document");
    let mut complaint: Complaint = serde_json::from_str(&document)?;
    complaint.version = row.get("version");
    Ok(complaint)
}

fn decode_notification(row: &SqliteRow) -> AppResult<Notification> {
    let document: String = row.get("document");
    Ok(serde_json::from_str(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComplaintDraft, Location};
    use crate::notify::NotificationType;
    use chrono::Duration;

    fn complaint(id: &str, user: &str, category: Category, urgency: Urgency) -> Complaint {
        Complaint::new(
            id.to_string(),
            user,
            ComplaintDraft {
                category,
                title: format!("Complaint {id}"),
                description: "Bag snatched outside the museum".to_string(),
                urgency,
                contact_info: "+1-555-0100".to_string(),
                location: Location {
                    address: "Museum Road".to_string(),
                    coordinates: Some([77.59, 12.97]),
                    landmark: Some("City Museum".to_string()),
                },
                additional_info: None,
                attachments: vec![],
                is_emergency_sos: false,
                device_info: None,
            },
            Utc::now(),
        )
    }

    async fn stored(storage: &Storage, c: &Complaint) -> Complaint {
        storage.insert_complaint(c).await.unwrap();
        storage.get_complaint(&c.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let c = complaint("c1", "u1", Category::TheftRobbery, Urgency::High);

        let loaded = stored(&storage, &c).await;

        assert_eq!(loaded.id, "c1");
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.assigned_department, Department::Police);
        assert!(storage.get_complaint("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let mut loaded = stored(&storage, &complaint("c1", "u1", Category::Other, Urgency::Low)).await;

        loaded.status = ComplaintStatus::UnderReview;
        let version = storage.update_complaint(&loaded).await.unwrap();
        assert_eq!(version, 2);

        let reloaded = storage.get_complaint("c1").await.unwrap().unwrap();
        assert_eq!(reloaded.status, ComplaintStatus::UnderReview);
        assert_eq!(reloaded.version, 2);
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let first = stored(&storage, &complaint("c1", "u1", Category::Other, Urgency::Low)).await;
        let mut second = first.clone();

        storage.update_complaint(&first).await.unwrap();

        second.title = "stale".to_string();
        let err = storage.update_complaint(&second).await.unwrap_err();
        assert!(matches!(err, AppError::ConcurrentModification));
    }

    #[tokio::test]
    async fn test_soft_deleted_hidden() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let mut loaded = stored(&storage, &complaint("c1", "u1", Category::Other, Urgency::Low)).await;

        loaded.is_deleted = true;
        storage.update_complaint(&loaded).await.unwrap();

        assert!(storage.get_complaint("c1").await.unwrap().is_none());
        let (items, total) = storage
            .list_complaints(&ComplaintFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_list_filters_and_pagination() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        for i in 0..5 {
            storage
                .insert_complaint(&complaint(&format!("a{i}"), "u1", Category::Fraud, Urgency::Medium))
                .await
                .unwrap();
        }
        storage
            .insert_complaint(&complaint("b0", "u2", Category::MedicalHelp, Urgency::Critical))
            .await
            .unwrap();

        let mine = ComplaintFilter {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        let (page, total) = storage
            .list_complaints(&mine, PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);

        let critical = ComplaintFilter {
            urgency: Some(Urgency::Critical),
            ..Default::default()
        };
        let (items, total) = storage
            .list_complaints(&critical, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, "b0");

        let by_department = ComplaintFilter {
            department: Some(Department::MedicalEmergency),
            ..Default::default()
        };
        let (_, total) = storage
            .list_complaints(&by_department, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_priority_sort_and_search() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        storage
            .insert_complaint(&complaint("low", "u1", Category::Other, Urgency::Low))
            .await
            .unwrap();
        storage
            .insert_complaint(&complaint("crit", "u1", Category::Other, Urgency::Critical))
            .await
            .unwrap();

        let filter = ComplaintFilter {
            sort_by: SortField::Priority,
            order: SortOrder::Desc,
            ..Default::default()
        };
        let (items, _) = storage
            .list_complaints(&filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(items[0].id, "crit");

        let search = ComplaintFilter {
            search: Some("MUSEUM".to_string()),
            ..Default::default()
        };
        let (_, total) = storage
            .list_complaints(&search, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 2);

        let miss = ComplaintFilter {
            search: Some("harbour".to_string()),
            ..Default::default()
        };
        let (_, total) = storage
            .list_complaints(&miss, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_created_since_and_bounds() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let mut old = complaint("old", "u1", Category::Other, Urgency::Low);
        old.created_at = Utc::now() - Duration::days(40);
        storage.insert_complaint(&old).await.unwrap();
        storage
            .insert_complaint(&complaint("new", "u1", Category::Other, Urgency::Low))
            .await
            .unwrap();

        let recent = storage
            .complaints_created_since(Utc::now() - Duration::days(30), Some("u1"))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "new");

        let inside = storage
            .complaints_in_bounds(12.9, 13.0, &[(77.5, 77.6)])
            .await
            .unwrap();
        assert_eq!(inside.len(), 2);

        let outside = storage
            .complaints_in_bounds(40.0, 41.0, &[(-74.0, -73.0)])
            .await
            .unwrap();
        assert!(outside.is_empty());
    }

    #[tokio::test]
    async fn test_same_instant_pages_do_not_overlap() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let created = Utc::now();
        for id in ["c", "a", "d", "b"] {
            let mut c = complaint(id, "u1", Category::Other, Urgency::Low);
            c.created_at = created;
            storage.insert_complaint(&c).await.unwrap();
        }

        let mut seen = Vec::new();
        for page in 1..=2 {
            let (items, total) = storage
                .list_complaints(&ComplaintFilter::default(), PageRequest::new(Some(page), Some(2)))
                .await
                .unwrap();
            assert_eq!(total, 4);
            seen.extend(items.into_iter().map(|c| c.id));
        }
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let mut discount = complaint("c1", "u1", Category::Fraud, Urgency::Medium);
        discount.title = "Charged 100% extra".to_string();
        storage.insert_complaint(&discount).await.unwrap();
        storage
            .insert_complaint(&complaint("c2", "u1", Category::Other, Urgency::Low))
            .await
            .unwrap();

        let search = |text: &str| ComplaintFilter {
            search: Some(text.to_string()),
            ..Default::default()
        };

        let (hits, _) = storage
            .list_complaints(&search("100%"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c1");

        let (hits, total) = storage
            .list_complaints(&search("%"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits[0].id, "c1");

        let (_, total) = storage
            .list_complaints(&search("_"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_bounds_accept_split_longitude_ranges() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let mut east = complaint("east", "u1", Category::Other, Urgency::Low);
        east.location.coordinates = Some([179.99, 0.0]);
        let mut west = complaint("west", "u1", Category::Other, Urgency::Low);
        west.location.coordinates = Some([-179.99, 0.0]);
        storage.insert_complaint(&east).await.unwrap();
        storage.insert_complaint(&west).await.unwrap();

        let both = storage
            .complaints_in_bounds(-1.0, 1.0, &[(179.9, 180.0), (-180.0, -179.9)])
            .await
            .unwrap();
        assert_eq!(both.len(), 2);

        let anywhere = storage.complaints_in_bounds(-1.0, 1.0, &[]).await.unwrap();
        assert_eq!(anywhere.len(), 2);
    }

    #[tokio::test]
    async fn test_notifications_roundtrip() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let mut n = Notification::new("u1", "Hello", "World", NotificationType::Message);
        storage.insert_notification(&n).await.unwrap();
        storage
            .insert_notification(&Notification::new("u2", "Other", "x", NotificationType::Message))
            .await
            .unwrap();

        let (items, total) = storage
            .list_notifications("u1", true, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, n.id);

        n.is_read = true;
        storage.update_notification(&n).await.unwrap();

        let (_, unread) = storage
            .list_notifications("u1", true, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(unread, 0);

        let loaded = storage.get_notification(&n.id).await.unwrap().unwrap();
        assert!(loaded.is_read);
    }
}
