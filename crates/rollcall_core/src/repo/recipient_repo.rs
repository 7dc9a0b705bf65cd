//! Known-population roster and push endpoint registry.
//!
//! # Responsibility
//! - Store the population addressed by `ALL` targeting.
//! - Own push endpoint registration and deregistration.
//!
//! # Invariants
//! - At most one endpoint per recipient; re-registration replaces it.
//! - Endpoints are removed only by explicit deregistration.

use super::store::SqliteRollCallStore;
use super::{RepoError, RepoResult};
use crate::model::recipient::{Recipient, RecipientId};
use rusqlite::params;

/// Roster contract.
pub trait RecipientRepository {
    /// Inserts or renames one recipient.
    fn upsert_recipient(&self, recipient: &Recipient) -> RepoResult<()>;
    /// Lists recipients ordered by id.
    fn list_recipients(&self) -> RepoResult<Vec<Recipient>>;
    fn contains_recipient(&self, recipient_id: &RecipientId) -> RepoResult<bool>;
}

/// Push endpoint contract.
pub trait EndpointRepository {
    /// Stores `token` for `recipient_id`, replacing any previous one.
    fn register_endpoint(&self, recipient_id: &RecipientId, token: &str) -> RepoResult<()>;
    fn endpoint_for(&self, recipient_id: &RecipientId) -> RepoResult<Option<String>>;
    /// Returns whether an endpoint was removed.
    fn deregister_endpoint(&self, recipient_id: &RecipientId) -> RepoResult<bool>;
}

impl RecipientRepository for SqliteRollCallStore {
    fn upsert_recipient(&self, recipient: &Recipient) -> RepoResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO recipients (id, display_name) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET display_name = excluded.display_name;",
            params![recipient.id.as_str(), recipient.display_name.as_str()],
        )?;
        Ok(())
    }

    fn list_recipients(&self) -> RepoResult<Vec<Recipient>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT id, display_name FROM recipients ORDER BY id;")?;
        let mut rows = stmt.query([])?;
        let mut recipients = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get("id")?;
            let id = RecipientId::parse(&raw).map_err(|_| {
                RepoError::InvalidData(format!("invalid recipient id `{raw}` in recipients.id"))
            })?;
            recipients.push(Recipient {
                id,
                display_name: row.get("display_name")?,
            });
        }
        Ok(recipients)
    }

    fn contains_recipient(&self, recipient_id: &RecipientId) -> RepoResult<bool> {
        let conn = self.connect()?;
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM recipients WHERE id = ?1);",
            [recipient_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl EndpointRepository for SqliteRollCallStore {
    fn register_endpoint(&self, recipient_id: &RecipientId, token: &str) -> RepoResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO push_endpoints (recipient_id, token) VALUES (?1, ?2)
             ON CONFLICT (recipient_id) DO UPDATE SET
                token = excluded.token,
                registered_at = (strftime('%s', 'now') * 1000);",
            params![recipient_id.as_str(), token],
        )?;
        Ok(())
    }

    fn endpoint_for(&self, recipient_id: &RecipientId) -> RepoResult<Option<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT token FROM push_endpoints WHERE recipient_id = ?1;")?;
        let mut rows = stmt.query([recipient_id.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get("token")?));
        }
        Ok(None)
    }

    fn deregister_endpoint(&self, recipient_id: &RecipientId) -> RepoResult<bool> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "DELETE FROM push_endpoints WHERE recipient_id = ?1;",
            [recipient_id.as_str()],
        )?;
        Ok(changed > 0)
    }
}
