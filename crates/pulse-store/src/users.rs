use chrono::Utc;
use tracing::instrument;

use pulse_core::ids::UserId;
use pulse_core::records::UserRecord;

use crate::database::Database;
use crate::error::StoreError;

/// Partial update for a user. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
}

/// Repository for user profiles. Unlike status records, user mutations do
/// not emit change notices; the live pipeline only watches records.
pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new user.
    #[instrument(skip(self), fields(name))]
    pub fn create(
        &self,
        name: &str,
        email: &str,
        age: Option<i64>,
    ) -> Result<UserRecord, StoreError> {
        let id = UserId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, age, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id.as_str(), name, email, age, now, now],
            )?;

            Ok(UserRecord {
                id: id.clone(),
                name: name.to_string(),
                email: email.to_string(),
                age,
                created_at: now.clone(),
                updated_at: now.clone(),
            })
        })
    }

    /// Get a user by ID.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn get(&self, id: &UserId) -> Result<UserRecord, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, age, created_at, updated_at
                 FROM users WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_user(row),
                None => Err(StoreError::NotFound(format!("user {id}"))),
            }
        })
    }

    /// List all users, newest first.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, age, created_at, updated_at
                 FROM users ORDER BY created_at DESC, id DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_user(row)?);
            }
            Ok(results)
        })
    }

    /// Apply a partial update to a user. Read and write run under one
    /// connection lock so the row cannot vanish in between.
    #[instrument(skip(self, patch), fields(user_id = %id))]
    pub fn update(&self, id: &UserId, patch: &UserPatch) -> Result<UserRecord, StoreError> {
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, age, created_at, updated_at
                 FROM users WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            let existing = match rows.next()? {
                Some(row) => row_to_user(row)?,
                None => return Err(StoreError::NotFound(format!("user {id}"))),
            };

            let name = patch.name.as_deref().unwrap_or(&existing.name);
            let email = patch.email.as_deref().unwrap_or(&existing.email);
            let age = patch.age.or(existing.age);

            let affected = conn.execute(
                "UPDATE users SET name = ?1, email = ?2, age = ?3, updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![name, email, age, now, id.as_str()],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound(format!("user {id}")));
            }

            Ok(UserRecord {
                id: id.clone(),
                name: name.to_string(),
                email: email.to_string(),
                age,
                created_at: existing.created_at.clone(),
                updated_at: now.clone(),
            })
        })
    }

    /// Delete a user by ID.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn delete(&self, id: &UserId) -> Result<(), StoreError> {
        let affected = self.db.with_conn(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id.as_str()])?;
            Ok(n)
        })?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<UserRecord, StoreError> {
    Ok(UserRecord {
        id: UserId::from_raw(row.get::<_, String>(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        age: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
