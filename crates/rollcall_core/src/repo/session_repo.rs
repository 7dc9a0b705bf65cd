//! Session, target-set and response persistence.
//!
//! # Responsibility
//! - Persist a session together with its target set in one transaction.
//! - Record check-ins behind the `(session_id, recipient_id)` primary key.
//! - Upsert absence declarations and flip the manual-end flag.
//! - Load consistent snapshots for live-view aggregation.
//!
//! # Invariants
//! - Snapshot reads run inside one read transaction.
//! - Nothing in this module deletes sessions or responses.

use super::store::SqliteRollCallStore;
use super::{bool_to_int, is_unique_violation, RepoError, RepoResult};
use crate::model::attendance::{AbsenceDeclaration, CheckIn};
use crate::model::recipient::RecipientId;
use crate::model::session::{Session, SessionId, TargetSet, Targeting};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use uuid::Uuid;

const SESSION_SELECT_SQL: &str = "SELECT
    id,
    initiator_id,
    created_at,
    window_seconds,
    expires_at,
    active,
    targeting_kind,
    targeting_value
FROM sessions";

/// Outcome of a check-in insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInWrite {
    /// A new row was stored.
    Inserted,
    /// A row for the pair already existed; nothing changed.
    Duplicate,
}

/// Everything the aggregator needs for one session, read at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Session,
    pub targets: TargetSet,
    pub check_ins: Vec<CheckIn>,
    pub absences: Vec<AbsenceDeclaration>,
}

/// Record-store contract for sessions and responses.
pub trait SessionRepository {
    /// Inserts session + target rows atomically.
    fn insert_session(&self, session: &Session, targets: &TargetSet) -> RepoResult<()>;
    fn get_session(&self, id: SessionId) -> RepoResult<Option<Session>>;
    /// Returns whether `recipient_id` belongs to the session's target set.
    fn is_target(&self, id: SessionId, recipient_id: &RecipientId) -> RepoResult<bool>;
    fn insert_check_in(&self, check_in: &CheckIn) -> RepoResult<CheckInWrite>;
    /// Last write wins.
    fn upsert_absence(&self, absence: &AbsenceDeclaration) -> RepoResult<()>;
    /// Sets `active = false`; succeeds again on an already-ended session.
    fn deactivate_session(&self, id: SessionId) -> RepoResult<()>;
    fn load_snapshot(&self, id: SessionId) -> RepoResult<Option<SessionSnapshot>>;
    /// Newest first.
    fn list_snapshots_for_initiator(&self, initiator_id: &str) -> RepoResult<Vec<SessionSnapshot>>;
    /// Sessions whose target set contains `recipient_id`, newest first.
    fn list_snapshots_for_recipient(
        &self,
        recipient_id: &RecipientId,
    ) -> RepoResult<Vec<SessionSnapshot>>;
}

impl SessionRepository for SqliteRollCallStore {
    fn insert_session(&self, session: &Session, targets: &TargetSet) -> RepoResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (kind, value) = targeting_to_db(&session.targeting);

        tx.execute(
            "INSERT INTO sessions (
                id,
                initiator_id,
                created_at,
                window_seconds,
                expires_at,
                active,
                targeting_kind,
                targeting_value
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                session.id.to_string(),
                session.initiator_id.as_str(),
                session.created_at,
                session.window_seconds,
                session.expires_at,
                bool_to_int(session.active),
                kind,
                value,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO session_targets (session_id, recipient_id) VALUES (?1, ?2);",
            )?;
            let session_id = session.id.to_string();
            for recipient_id in targets.iter() {
                stmt.execute(params![session_id.as_str(), recipient_id.as_str()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_session(&self, id: SessionId) -> RepoResult<Option<Session>> {
        let conn = self.connect()?;
        load_session(&conn, id)
    }

    fn is_target(&self, id: SessionId, recipient_id: &RecipientId) -> RepoResult<bool> {
        let conn = self.connect()?;
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM session_targets
                WHERE session_id = ?1 AND recipient_id = ?2
            );",
            params![id.to_string(), recipient_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_check_in(&self, check_in: &CheckIn) -> RepoResult<CheckInWrite> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT INTO check_ins (session_id, recipient_id, responded_at)
             VALUES (?1, ?2, ?3);",
            params![
                check_in.session_id.to_string(),
                check_in.recipient_id.as_str(),
                check_in.responded_at,
            ],
        );

        match inserted {
            Ok(_) => Ok(CheckInWrite::Inserted),
            Err(err) if is_unique_violation(&err) => Ok(CheckInWrite::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    fn upsert_absence(&self, absence: &AbsenceDeclaration) -> RepoResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO absence_declarations (
                session_id,
                recipient_id,
                reason,
                location,
                declared_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (session_id, recipient_id) DO UPDATE SET
                reason = excluded.reason,
                location = excluded.location,
                declared_at = excluded.declared_at;",
            params![
                absence.session_id.to_string(),
                absence.recipient_id.as_str(),
                absence.reason.as_str(),
                absence.location.as_deref(),
                absence.declared_at,
            ],
        )?;
        Ok(())
    }

    fn deactivate_session(&self, id: SessionId) -> RepoResult<()> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE sessions SET active = 0 WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("session {id}")));
        }
        Ok(())
    }

    fn load_snapshot(&self, id: SessionId) -> RepoResult<Option<SessionSnapshot>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let snapshot = match load_session(&tx, id)? {
            Some(session) => Some(snapshot_for(&tx, session)?),
            None => None,
        };
        tx.commit()?;
        Ok(snapshot)
    }

    fn list_snapshots_for_initiator(&self, initiator_id: &str) -> RepoResult<Vec<SessionSnapshot>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let sessions = query_sessions(
            &tx,
            &format!(
                "{SESSION_SELECT_SQL}
                 WHERE initiator_id = ?1
                 ORDER BY created_at DESC, id ASC;"
            ),
            initiator_id,
        )?;
        let snapshots = sessions
            .into_iter()
            .map(|session| snapshot_for(&tx, session))
            .collect::<RepoResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(snapshots)
    }

    fn list_snapshots_for_recipient(
        &self,
        recipient_id: &RecipientId,
    ) -> RepoResult<Vec<SessionSnapshot>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let sessions = query_sessions(
            &tx,
            &format!(
                "{SESSION_SELECT_SQL}
                 WHERE id IN (
                    SELECT session_id FROM session_targets WHERE recipient_id = ?1
                 )
                 ORDER BY created_at DESC, id ASC;"
            ),
            recipient_id.as_str(),
        )?;
        let snapshots = sessions
            .into_iter()
            .map(|session| snapshot_for(&tx, session))
            .collect::<RepoResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(snapshots)
    }
}

fn load_session(conn: &Connection, id: SessionId) -> RepoResult<Option<Session>> {
    let mut stmt = conn.prepare(&format!("{SESSION_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_session_row(row)?));
    }
    Ok(None)
}

fn query_sessions(conn: &Connection, sql: &str, key: &str) -> RepoResult<Vec<Session>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(parse_session_row(row)?);
    }
    Ok(sessions)
}

fn snapshot_for(conn: &Connection, session: Session) -> RepoResult<SessionSnapshot> {
    let session_id = session.id.to_string();

    let mut stmt = conn.prepare(
        "SELECT recipient_id FROM session_targets WHERE session_id = ?1 ORDER BY recipient_id;",
    )?;
    let mut rows = stmt.query([session_id.as_str()])?;
    let mut targets = Vec::new();
    while let Some(row) = rows.next()? {
        targets.push(parse_recipient_id(row, "session_targets.recipient_id")?);
    }

    let mut stmt = conn.prepare(
        "SELECT recipient_id, responded_at
         FROM check_ins
         WHERE session_id = ?1
         ORDER BY recipient_id;",
    )?;
    let mut rows = stmt.query([session_id.as_str()])?;
    let mut check_ins = Vec::new();
    while let Some(row) = rows.next()? {
        check_ins.push(CheckIn {
            session_id: session.id,
            recipient_id: parse_recipient_id(row, "check_ins.recipient_id")?,
            responded_at: row.get("responded_at")?,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT recipient_id, reason, location, declared_at
         FROM absence_declarations
         WHERE session_id = ?1
         ORDER BY recipient_id;",
    )?;
    let mut rows = stmt.query([session_id.as_str()])?;
    let mut absences = Vec::new();
    while let Some(row) = rows.next()? {
        absences.push(AbsenceDeclaration {
            session_id: session.id,
            recipient_id: parse_recipient_id(row, "absence_declarations.recipient_id")?,
            reason: row.get("reason")?,
            location: row.get("location")?,
            declared_at: row.get("declared_at")?,
        });
    }

    Ok(SessionSnapshot {
        session,
        targets: targets.into_iter().collect(),
        check_ins,
        absences,
    })
}

fn parse_session_row(row: &Row<'_>) -> RepoResult<Session> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in sessions.id"))
    })?;

    let active = match row.get::<_, i64>("active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid active value `{other}` in sessions.active"
            )));
        }
    };

    let kind: String = row.get("targeting_kind")?;
    let value: Option<String> = row.get("targeting_value")?;
    let targeting = parse_targeting(&kind, value)?;

    Ok(Session {
        id,
        initiator_id: row.get("initiator_id")?,
        created_at: row.get("created_at")?,
        window_seconds: row.get("window_seconds")?,
        expires_at: row.get("expires_at")?,
        active,
        targeting,
    })
}

fn parse_recipient_id(row: &Row<'_>, column: &str) -> RepoResult<RecipientId> {
    let value: String = row.get("recipient_id")?;
    RecipientId::parse(&value)
        .map_err(|_| RepoError::InvalidData(format!("invalid recipient id `{value}` in {column}")))
}

fn targeting_to_db(targeting: &Targeting) -> (&'static str, Option<&str>) {
    match targeting {
        Targeting::All => ("all", None),
        Targeting::Group(name) => ("group", Some(name.as_str())),
        Targeting::Single(recipient_id) => ("single", Some(recipient_id.as_str())),
    }
}

fn parse_targeting(kind: &str, value: Option<String>) -> RepoResult<Targeting> {
    match (kind, value) {
        ("all", _) => Ok(Targeting::All),
        ("group", Some(name)) => Ok(Targeting::Group(name)),
        ("single", Some(raw)) => RecipientId::parse(&raw).map(Targeting::Single).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid recipient id `{raw}` in sessions.targeting_value"
            ))
        }),
        (other, _) => Err(RepoError::InvalidData(format!(
            "invalid targeting `{other}` in sessions.targeting_kind"
        ))),
    }
}
