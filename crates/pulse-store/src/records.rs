use chrono::Utc;
use tracing::instrument;

use pulse_core::events::ChangeKind;
use pulse_core::ids::RecordId;
use pulse_core::records::StatusRecord;
use pulse_core::summary::StatusSummary;

use crate::database::Database;
use crate::error::StoreError;
use crate::feed::ChangeFeed;

/// Partial update for a record. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub status: Option<String>,
}

/// Repository for status records. Every successful mutation emits one
/// notice on the change feed.
pub struct RecordRepo {
    db: Database,
    feed: ChangeFeed,
}

impl RecordRepo {
    pub fn new(db: Database, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Create a new record.
    #[instrument(skip(self), fields(name, status))]
    pub fn create(
        &self,
        name: &str,
        age: Option<i64>,
        status: &str,
    ) -> Result<StatusRecord, StoreError> {
        let id = RecordId::new();
        let now = Utc::now().to_rfc3339();

        let record = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO records (id, name, age, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id.as_str(), name, age, status, now, now],
            )?;

            Ok(StatusRecord {
                id: id.clone(),
                name: name.to_string(),
                age,
                status: status.to_string(),
                created_at: now.clone(),
                updated_at: now.clone(),
            })
        })?;

        self.feed.emit(ChangeKind::Created, id);
        Ok(record)
    }

    /// Get a record by ID.
    #[instrument(skip(self), fields(record_id = %id))]
    pub fn get(&self, id: &RecordId) -> Result<StatusRecord, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, age, status, created_at, updated_at
                 FROM records WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_record(row),
                None => Err(StoreError::NotFound(format!("record {id}"))),
            }
        })
    }

    /// List all records, newest first.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<StatusRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, age, status, created_at, updated_at
                 FROM records ORDER BY created_at DESC, id DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_record(row)?);
            }
            Ok(results)
        })
    }

    /// Apply a partial update to a record. Read and write run under one
    /// connection lock so a concurrent delete cannot slip in between.
    #[instrument(skip(self, patch), fields(record_id = %id))]
    pub fn update(&self, id: &RecordId, patch: &RecordPatch) -> Result<StatusRecord, StoreError> {
        let now = Utc::now().to_rfc3339();

        let record = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, age, status, created_at, updated_at
                 FROM records WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            let existing = match rows.next()? {
                Some(row) => row_to_record(row)?,
                None => return Err(StoreError::NotFound(format!("record {id}"))),
            };

            let name = patch.name.as_deref().unwrap_or(&existing.name);
            let age = patch.age.or(existing.age);
            let status = patch.status.as_deref().unwrap_or(&existing.status);

            let affected = conn.execute(
                "UPDATE records SET name = ?1, age = ?2, status = ?3, updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![name, age, status, now, id.as_str()],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound(format!("record {id}")));
            }

            Ok(StatusRecord {
                id: id.clone(),
                name: name.to_string(),
                age,
                status: status.to_string(),
                created_at: existing.created_at.clone(),
                updated_at: now.clone(),
            })
        })?;

        self.feed.emit(ChangeKind::Updated, id.clone());
        Ok(record)
    }

    /// Delete a record by ID.
    #[instrument(skip(self), fields(record_id = %id))]
    pub fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        let affected = self.db.with_conn(|conn| {
            let n = conn.execute("DELETE FROM records WHERE id = ?1", [id.as_str()])?;
            Ok(n)
        })?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("record {id}")));
        }

        self.feed.emit(ChangeKind::Deleted, id.clone());
        Ok(())
    }

    /// Count records per status category.
    ///
    /// Categories with no members are absent from the result, matching the
    /// grouping query. This is the aggregate the live pipeline publishes.
    #[instrument(skip(self))]
    pub fn status_counts(&self) -> Result<StatusSummary, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM records GROUP BY status")?;
            let mut rows = stmt.query([])?;
            let mut pairs: Vec<(String, u64)> = Vec::new();
            while let Some(row) = rows.next()? {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                pairs.push((status, count.max(0) as u64));
            }
            Ok(StatusSummary::from_counts(pairs))
        })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<StatusRecord, StoreError> {
    Ok(StatusRecord {
        id: RecordId::from_raw(row.get::<_, String>(0)?),
        name: row.get(1)?,
        age: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RecordRepo {
        let db = Database::in_memory().unwrap();
        RecordRepo::new(db, ChangeFeed::new(64))
    }

    #[test]
    fn create_and_get() {
        let repo = repo();
        let created = repo.create("ada", Some(36), "active").unwrap();
        assert!(created.id.as_str().starts_with("rec_"));

        let fetched = repo.get(&created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn get_missing_is_not_found() {
        let repo = repo();
        let err = repo.get(&RecordId::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn list_returns_all() {
        let repo = repo();
        repo.create("a", None, "active").unwrap();
        repo.create("b", None, "idle").unwrap();
        repo.create("c", None, "active").unwrap();

        let all = repo.list().unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn update_is_partial() {
        let repo = repo();
        let created = repo.create("ada", Some(36), "active").unwrap();

        let updated = repo
            .update(
                &created.id,
                &RecordPatch {
                    status: Some("idle".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "ada");
        assert_eq!(updated.age, Some(36));
        assert_eq!(updated.status, "idle");
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn update_missing_is_not_found() {
        let repo = repo();
        let err = repo.update(&RecordId::new(), &RecordPatch::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn delete_removes_record() {
        let repo = repo();
        let created = repo.create("ada", None, "active").unwrap();

        repo.delete(&created.id).unwrap();
        assert!(matches!(repo.get(&created.id), Err(StoreError::NotFound(_))));

        let err = repo.delete(&created.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn status_counts_sum_to_record_count() {
        let repo = repo();
        for _ in 0..3 {
            repo.create("x", None, "active").unwrap();
        }
        for _ in 0..2 {
            repo.create("y", None, "idle").unwrap();
        }

        let summary = repo.status_counts().unwrap();
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.get("active"), Some(3));
        assert_eq!(summary.get("idle"), Some(2));
    }

    #[test]
    fn empty_categories_are_absent() {
        let repo = repo();
        let rec = repo.create("x", None, "suspended").unwrap();
        repo.delete(&rec.id).unwrap();
        repo.create("y", None, "active").unwrap();

        let summary = repo.status_counts().unwrap();
        assert_eq!(summary.get("suspended"), None);
        assert_eq!(summary.len(), 1);
    }

    #[test]
    fn counts_track_deletes() {
        let repo = repo();
        for _ in 0..3 {
            repo.create("x", None, "active").unwrap();
        }
        let idle_a = repo.create("y", None, "idle").unwrap();
        repo.create("z", None, "idle").unwrap();

        let before = repo.status_counts().unwrap();
        assert_eq!(before.get("idle"), Some(2));

        repo.delete(&idle_a.id).unwrap();

        let after = repo.status_counts().unwrap();
        assert_eq!(after.get("active"), Some(3));
        assert_eq!(after.get("idle"), Some(1));
    }

    #[tokio::test]
    async fn mutations_emit_change_notices() {
        let db = Database::in_memory().unwrap();
        let feed = ChangeFeed::new(64);
        let mut rx = feed.subscribe();
        let repo = RecordRepo::new(db, feed);

        let rec = repo.create("ada", None, "active").unwrap();
        repo.update(
            &rec.id,
            &RecordPatch {
                status: Some("idle".into()),
                ..Default::default()
            },
        )
        .unwrap();
        repo.delete(&rec.id).unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Created);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Updated);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Deleted);
    }

    #[tokio::test]
    async fn update_after_delete_is_not_found_and_emits_nothing() {
        let db = Database::in_memory().unwrap();
        let feed = ChangeFeed::new(64);
        let repo = RecordRepo::new(db, feed);

        let rec = repo.create("ada", None, "active").unwrap();
        repo.delete(&rec.id).unwrap();

        let mut rx = repo.feed().subscribe();
        let err = repo
            .update(
                &rec.id,
                &RecordPatch {
                    status: Some("idle".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn failed_mutation_emits_nothing() {
        let db = Database::in_memory().unwrap();
        let feed = ChangeFeed::new(64);
        let mut rx = feed.subscribe();
        let repo = RecordRepo::new(db, feed);

        let _ = repo.delete(&RecordId::new());
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
