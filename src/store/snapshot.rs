//! Offline snapshot of the last successful reads, kept in SQLite
//!
//! One row per (user, kind): `page` holds the list/dashboard data and
//! `detail:<application id>` holds a detail view.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::{
    ApplicationDetail, ApplicationsPageData, FollowUpForm, LinkForm, NewApplication, NoteForm,
    Stage, Status, company_name,
};
use crate::error::{CacheError, StoreError};
use crate::store::Store;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    payload TEXT NOT NULL,
    PRIMARY KEY (user_id, kind)
);
"#;

const PAGE_KIND: &str = "page";

fn detail_kind(application_id: &str) -> String {
    format!("detail:{application_id}")
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Snapshot<T> {
    pub(crate) value: T,
    pub(crate) fetched_at: Option<DateTime<Utc>>,
}

pub(crate) struct SnapshotCache {
    conn: Mutex<Connection>,
}

impl SnapshotCache {
    pub(crate) fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put<T: Serialize>(
        &self,
        user_id: &str,
        kind: &str,
        value: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        self.conn().execute(
            "INSERT INTO snapshots (user_id, kind, fetched_at, payload) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, kind) DO UPDATE SET
                fetched_at = excluded.fetched_at,
                payload = excluded.payload",
            params![user_id, kind, fetched_at.to_rfc3339(), payload],
        )?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(
        &self,
        user_id: &str,
        kind: &str,
    ) -> Result<Option<Snapshot<T>>, CacheError> {
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT fetched_at, payload FROM snapshots WHERE user_id = ?1 AND kind = ?2",
                params![user_id, kind],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((fetched_at, payload)) = row else {
            return Ok(None);
        };
        Ok(Some(Snapshot {
            value: serde_json::from_str(&payload)?,
            fetched_at: DateTime::parse_from_rfc3339(&fetched_at)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
        }))
    }

    pub(crate) fn save_page(
        &self,
        user_id: &str,
        data: &ApplicationsPageData,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        self.put(user_id, PAGE_KIND, data, fetched_at)
    }

    pub(crate) fn load_page(
        &self,
        user_id: &str,
    ) -> Result<Option<Snapshot<ApplicationsPageData>>, CacheError> {
        self.get(user_id, PAGE_KIND)
    }

    pub(crate) fn save_detail(
        &self,
        user_id: &str,
        detail: &ApplicationDetail,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        self.put(user_id, &detail_kind(&detail.application.id), detail, fetched_at)
    }

    pub(crate) fn load_detail(
        &self,
        user_id: &str,
        application_id: &str,
    ) -> Result<Option<Snapshot<ApplicationDetail>>, CacheError> {
        self.get(user_id, &detail_kind(application_id))
    }

    /// Drop every snapshot of `user_id`, returning how many rows went
    pub(crate) fn forget(&self, user_id: &str) -> Result<usize, CacheError> {
        Ok(self
            .conn()
            .execute("DELETE FROM snapshots WHERE user_id = ?1", params![user_id])?)
    }
}

/// Serves reads from the snapshot of one user; refuses every write
pub(crate) struct SnapshotStore {
    cache: SnapshotCache,
    user_id: String,
}

impl SnapshotStore {
    pub(crate) fn new(cache: SnapshotCache, user_id: String) -> Self {
        Self { cache, user_id }
    }
}

impl Store for SnapshotStore {
    fn label(&self) -> &'static str {
        "Offline"
    }

    fn fetch_page_data(&self) -> Result<ApplicationsPageData, StoreError> {
        let snapshot = self.cache.load_page(&self.user_id)?.ok_or(CacheError::Missing)?;
        if let Some(at) = snapshot.fetched_at {
            tracing::info!(fetched_at = %at, "serving offline snapshot");
        }
        Ok(snapshot.value)
    }

    /// Falls back to the page snapshot, which carries no notes
    fn fetch_detail(&self, application_id: &str) -> Result<Option<ApplicationDetail>, StoreError> {
        if let Some(snapshot) = self.cache.load_detail(&self.user_id, application_id)? {
            return Ok(Some(snapshot.value));
        }
        let page = self.fetch_page_data()?;
        let Some(application) = page
            .applications
            .iter()
            .find(|a| a.id == application_id)
            .cloned()
        else {
            return Ok(None);
        };
        let belongs = |id: &Option<String>| id.as_deref() == Some(application_id);
        Ok(Some(ApplicationDetail {
            company_name: company_name(&application, &page.companies),
            application,
            notes: Vec::new(),
            links: page
                .links
                .into_iter()
                .filter(|l| belongs(&l.application_id))
                .collect(),
            follow_ups: page
                .open_follow_ups
                .into_iter()
                .filter(|f| belongs(&f.application_id))
                .collect(),
        }))
    }

    fn create_application(&self, _form: &NewApplication) -> Result<String, StoreError> {
        Err(StoreError::OfflineReadOnly)
    }

    fn update_stage_status(
        &self,
        _id: &str,
        _stage: Stage,
        _status: Status,
    ) -> Result<(), StoreError> {
        Err(StoreError::OfflineReadOnly)
    }

    fn set_follow_up(&self, _form: &FollowUpForm) -> Result<(), StoreError> {
        Err(StoreError::OfflineReadOnly)
    }

    fn mark_follow_up_done(
        &self,
        _id: &str,
        _application_id: Option<&str>,
    ) -> Result<(), StoreError> {
        Err(StoreError::OfflineReadOnly)
    }

    fn delete_application(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::OfflineReadOnly)
    }

    fn add_note(&self, _form: &NoteForm) -> Result<(), StoreError> {
        Err(StoreError::OfflineReadOnly)
    }

    fn add_link(&self, _form: &LinkForm) -> Result<(), StoreError> {
        Err(StoreError::OfflineReadOnly)
    }
}
