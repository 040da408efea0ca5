//! Operation history store
//!
//! Append-only record of PDF operations kept in SQLite. Listings join the
//! owning user at read time for display name and email.

pub mod csv;

use chrono::{DateTime, Utc};
use shared_types::{HistoryEntry, HistoryPage, HistoryRecord, NewHistoryEntry, OperationType};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("{0}")]
    InvalidPage(String),

    #[error("Unknown operation type in history row {id}: {value}")]
    CorruptRow { id: i64, value: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const SELECT_JOINED: &str = r#"
    SELECT h.id, h.user_id, h.operation_type, h.timestamp, h.source_type,
           h.ip_address, h.country, h.state, h.user_agent, h.request_details,
           u.first_name, u.last_name, u.email
    FROM pdf_operation_history h
    LEFT JOIN users u ON u.id = h.user_id
"#;

const NEWEST_FIRST: &str = "ORDER BY h.timestamp DESC, h.id DESC";

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: i64,
    user_id: i64,
    operation_type: String,
    timestamp: DateTime<Utc>,
    source_type: String,
    ip_address: Option<String>,
    country: Option<String>,
    state: Option<String>,
    user_agent: Option<String>,
    request_details: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = HistoryError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let operation_type: OperationType =
            row.operation_type
                .parse()
                .map_err(|_| HistoryError::CorruptRow {
                    id: row.id,
                    value: row.operation_type.clone(),
                })?;
        let user_name = format!(
            "{} {}",
            row.first_name.unwrap_or_default(),
            row.last_name.unwrap_or_default()
        )
        .trim()
        .to_string();

        Ok(HistoryRecord {
            entry: HistoryEntry {
                id: row.id,
                user_id: row.user_id,
                operation_type,
                timestamp: row.timestamp,
                source_type: row.source_type,
                ip_address: row.ip_address,
                country: row.country,
                state: row.state,
                user_agent: row.user_agent,
                request_details: row.request_details.unwrap_or_default(),
            },
            user_name,
            user_email: row.email.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct HistoryStore {
    db: SqlitePool,
}

impl HistoryStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Persist an entry; the store assigns its id and timestamp.
    pub async fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, HistoryError> {
        let timestamp = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO pdf_operation_history
                (user_id, operation_type, timestamp, source_type, ip_address, country, state, user_agent, request_details)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.operation_type.as_str())
        .bind(timestamp)
        .bind(&entry.source_type)
        .bind(&entry.ip_address)
        .bind(&entry.country)
        .bind(&entry.state)
        .bind(&entry.user_agent)
        .bind(&entry.request_details)
        .execute(&self.db)
        .await?;

        Ok(HistoryEntry {
            id: result.last_insert_rowid(),
            user_id: entry.user_id,
            operation_type: entry.operation_type,
            timestamp,
            source_type: entry.source_type,
            ip_address: entry.ip_address,
            country: entry.country,
            state: entry.state,
            user_agent: entry.user_agent,
            request_details: entry.request_details,
        })
    }

    /// One page of entries, newest first. `page` is 0-based; `size` must be positive.
    pub async fn list(
        &self,
        page: u32,
        size: u32,
    ) -> Result<HistoryPage<HistoryRecord>, HistoryError> {
        if size == 0 {
            return Err(HistoryError::InvalidPage(
                "Page size must be greater than 0".into(),
            ));
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pdf_operation_history")
            .fetch_one(&self.db)
            .await?;

        let rows: Vec<HistoryRow> =
            sqlx::query_as(&format!("{} {} LIMIT ? OFFSET ?", SELECT_JOINED, NEWEST_FIRST))
                .bind(i64::from(size))
                .bind(i64::from(page) * i64::from(size))
                .fetch_all(&self.db)
                .await?;

        let content = rows
            .into_iter()
            .map(HistoryRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage::new(content, page, size, total.max(0) as u64))
    }

    /// Entries owned by one user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<HistoryRecord>, HistoryError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(&format!(
            "{} WHERE h.user_id = ? {}",
            SELECT_JOINED, NEWEST_FIRST
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(HistoryRecord::try_from).collect()
    }

    /// Every entry, newest first
    pub async fn export_all(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(&format!("{} {}", SELECT_JOINED, NEWEST_FIRST))
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(HistoryRecord::try_from).collect()
    }

    /// Returns whether the entry existed
    pub async fn delete_one(&self, id: i64) -> Result<bool, HistoryError> {
        let result = sqlx::query("DELETE FROM pdf_operation_history WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns the number of deleted entries
    pub async fn delete_all(&self) -> Result<u64, HistoryError> {
        let result = sqlx::query("DELETE FROM pdf_operation_history")
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_pool;
    use crate::users::{NewUser, UserStore};
    use pretty_assertions::assert_eq;
    use shared_types::Role;

    async fn store_with_user() -> (HistoryStore, i64) {
        let pool = test_pool().await;
        let user = UserStore::new(pool.clone())
            .create(NewUser {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                password_hash: "x".into(),
                role: Role::User,
            })
            .await
            .unwrap();
        (HistoryStore::new(pool), user.id)
    }

    fn entry(user_id: i64, op: OperationType, details: &str) -> NewHistoryEntry {
        NewHistoryEntry::new(user_id, op, details)
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let (store, user_id) = store_with_user().await;
        let a = store
            .append(entry(user_id, OperationType::MergePdf, "a"))
            .await
            .unwrap();
        let b = store
            .append(entry(user_id, OperationType::SplitPdf, "b"))
            .await
            .unwrap();
        assert!(b.id > a.id);
        assert!(b.timestamp >= a.timestamp);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_user_join() {
        let (store, user_id) = store_with_user().await;
        for i in 0..5 {
            store
                .append(entry(user_id, OperationType::RotatePages, &format!("op {}", i)))
                .await
                .unwrap();
        }

        let page = store.list(0, 5).await.unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 1);
        let details: Vec<&str> = page
            .content
            .iter()
            .map(|r| r.entry.request_details.as_str())
            .collect();
        assert_eq!(details, vec!["op 4", "op 3", "op 2", "op 1", "op 0"]);
        assert_eq!(page.content[0].user_name, "Ada Lovelace");
        assert_eq!(page.content[0].user_email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let (store, user_id) = store_with_user().await;
        for i in 0..7 {
            store
                .append(entry(user_id, OperationType::MergePdf, &format!("op {}", i)))
                .await
                .unwrap();
        }

        let page = store.list(2, 3).await.unwrap();
        assert_eq!(page.total_elements, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.number, 2);
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].entry.request_details, "op 0");

        let past_end = store.list(5, 3).await.unwrap();
        assert!(past_end.content.is_empty());
        assert_eq!(past_end.total_elements, 7);
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let (store, _) = store_with_user().await;
        assert!(matches!(
            store.list(0, 0).await,
            Err(HistoryError::InvalidPage(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_one_reports_existence() {
        let (store, user_id) = store_with_user().await;
        let saved = store
            .append(entry(user_id, OperationType::AddWatermark, "w"))
            .await
            .unwrap();
        assert!(store.delete_one(saved.id).await.unwrap());
        assert!(!store.delete_one(saved.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all_empties_store() {
        let (store, user_id) = store_with_user().await;
        for _ in 0..3 {
            store
                .append(entry(user_id, OperationType::PdfToImages, "x"))
                .await
                .unwrap();
        }
        assert_eq!(store.delete_all().await.unwrap(), 3);
        let page = store.list(0, 10).await.unwrap();
        assert_eq!(page.total_elements, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_append_for_unknown_user_fails() {
        let (store, _) = store_with_user().await;
        let result = store
            .append(entry(9999, OperationType::MergePdf, "ghost"))
            .await;
        assert!(matches!(result, Err(HistoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_for_user_filters() {
        let (store, user_id) = store_with_user().await;
        store
            .append(entry(user_id, OperationType::MergePdf, "mine"))
            .await
            .unwrap();
        let mine = store.list_for_user(user_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(store.list_for_user(user_id + 1).await.unwrap().is_empty());
    }
}
