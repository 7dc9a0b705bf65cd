//! Preset group persistence.
//!
//! # Invariants
//! - Group names are unique (enforced by the `name` UNIQUE index).
//! - `member_ids` is stored as a JSON array of already-validated ids.

use super::store::SqliteRollCallStore;
use super::{is_unique_violation, RepoError, RepoResult};
use crate::model::group::PresetGroup;
use crate::model::recipient::RecipientId;
use rusqlite::{params, Connection, Row};

const GROUP_SELECT_SQL: &str = "SELECT id, name, member_ids FROM preset_groups";

/// Preset group contract.
pub trait GroupRepository {
    fn create_group(&self, name: &str, member_ids: &[RecipientId]) -> RepoResult<PresetGroup>;
    /// Replaces name and members of an existing group.
    fn update_group(
        &self,
        id: i64,
        name: &str,
        member_ids: &[RecipientId],
    ) -> RepoResult<PresetGroup>;
    fn delete_group(&self, id: i64) -> RepoResult<()>;
    fn find_group_by_name(&self, name: &str) -> RepoResult<Option<PresetGroup>>;
    /// Lists groups ordered by name.
    fn list_groups(&self) -> RepoResult<Vec<PresetGroup>>;
}

impl GroupRepository for SqliteRollCallStore {
    fn create_group(&self, name: &str, member_ids: &[RecipientId]) -> RepoResult<PresetGroup> {
        let conn = self.connect()?;
        let members_json = encode_members(member_ids)?;
        let inserted = conn.execute(
            "INSERT INTO preset_groups (name, member_ids) VALUES (?1, ?2);",
            params![name, members_json],
        );
        match inserted {
            Ok(_) => Ok(PresetGroup {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                member_ids: member_ids.to_vec(),
            }),
            Err(err) if is_unique_violation(&err) => Err(RepoError::DuplicateName(name.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    fn update_group(
        &self,
        id: i64,
        name: &str,
        member_ids: &[RecipientId],
    ) -> RepoResult<PresetGroup> {
        let conn = self.connect()?;
        let members_json = encode_members(member_ids)?;
        let updated = conn.execute(
            "UPDATE preset_groups
             SET
                name = ?2,
                member_ids = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, name, members_json],
        );
        match updated {
            Ok(0) => Err(RepoError::NotFound(format!("group {id}"))),
            Ok(_) => Ok(PresetGroup {
                id,
                name: name.to_string(),
                member_ids: member_ids.to_vec(),
            }),
            Err(err) if is_unique_violation(&err) => Err(RepoError::DuplicateName(name.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_group(&self, id: i64) -> RepoResult<()> {
        let conn = self.connect()?;
        let changed = conn.execute("DELETE FROM preset_groups WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("group {id}")));
        }
        Ok(())
    }

    fn find_group_by_name(&self, name: &str) -> RepoResult<Option<PresetGroup>> {
        let conn = self.connect()?;
        query_groups(&conn, &format!("{GROUP_SELECT_SQL} WHERE name = ?1;"), Some(name))
            .map(|mut groups| groups.pop())
    }

    fn list_groups(&self) -> RepoResult<Vec<PresetGroup>> {
        let conn = self.connect()?;
        query_groups(&conn, &format!("{GROUP_SELECT_SQL} ORDER BY name ASC;"), None)
    }
}

fn query_groups(conn: &Connection, sql: &str, name: Option<&str>) -> RepoResult<Vec<PresetGroup>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = match name {
        Some(name) => stmt.query([name])?,
        None => stmt.query([])?,
    };
    let mut groups = Vec::new();
    while let Some(row) = rows.next()? {
        groups.push(parse_group_row(row)?);
    }
    Ok(groups)
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<PresetGroup> {
    let id: i64 = row.get("id")?;
    let raw: String = row.get("member_ids")?;
    let values: Vec<String> = serde_json::from_str(&raw).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid member list in preset_groups.member_ids for group {id}: {err}"
        ))
    })?;
    let member_ids = values
        .iter()
        .map(|value| {
            RecipientId::parse(value).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid recipient id `{value}` in preset_groups.member_ids for group {id}"
                ))
            })
        })
        .collect::<RepoResult<Vec<_>>>()?;

    Ok(PresetGroup {
        id,
        name: row.get("name")?,
        member_ids,
    })
}

fn encode_members(member_ids: &[RecipientId]) -> RepoResult<String> {
    serde_json::to_string(member_ids)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode member list: {err}")))
}
