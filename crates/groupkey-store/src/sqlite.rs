//! SQLite implementation of the StateStore trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use groupkey_core::{KeyEpoch, MemberCertificate, MemberId, Name};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{GroupState, StateStore, StoredMember};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStateStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

fn group_exists(conn: &Connection, prefix: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM groups WHERE prefix = ?1",
            params![prefix],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_member(conn: &Connection, prefix: &str, member: &StoredMember) -> Result<()> {
    conn.execute(
        "INSERT INTO members (prefix, member, certificate, enrolled_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(prefix, member) DO UPDATE SET
            certificate = excluded.certificate,
            enrolled_at = excluded.enrolled_at",
        params![
            prefix,
            member.id().to_uri(),
            member.certificate.to_bytes()?,
            member.enrolled_at,
        ],
    )?;
    Ok(())
}

fn load_members(conn: &Connection, prefix: &str) -> Result<Vec<StoredMember>> {
    let rows = conn
        .prepare(
            "SELECT member, certificate, enrolled_at FROM members
             WHERE prefix = ?1 ORDER BY enrolled_at, member",
        )?
        .query_map(params![prefix], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(member, certificate, enrolled_at)| {
            let certificate = MemberCertificate::from_bytes(&certificate)?;
            if certificate.identity.to_uri() != member {
                return Err(StoreError::InvalidData(format!(
                    "certificate for {} stored under {}",
                    certificate.identity, member
                )));
            }
            Ok(StoredMember {
                certificate,
                enrolled_at,
            })
        })
        .collect()
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load_group(&self, prefix: &Name) -> Result<Option<GroupState>> {
        let prefix = prefix.clone();

        self.blocking(move |conn| {
            let uri = prefix.to_uri();
            let row: Option<(i64, Vec<u8>, i64)> = conn
                .query_row(
                    "SELECT epoch, sealed_key, updated_at FROM groups WHERE prefix = ?1",
                    params![uri],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((epoch, sealed_key, updated_at)) = row else {
                return Ok(None);
            };
            let members = load_members(conn, &uri)?;

            Ok(Some(GroupState {
                prefix,
                epoch: KeyEpoch(epoch as u64),
                sealed_key: Bytes::from(sealed_key),
                members,
                updated_at,
            }))
        })
        .await
    }

    async fn save_group(&self, state: &GroupState) -> Result<()> {
        let state = state.clone();

        self.blocking(move |conn| {
            let uri = state.prefix.to_uri();
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO groups (prefix, epoch, sealed_key, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(prefix) DO UPDATE SET
                    epoch = excluded.epoch,
                    sealed_key = excluded.sealed_key,
                    updated_at = excluded.updated_at",
                params![
                    uri,
                    state.epoch.value() as i64,
                    state.sealed_key.as_ref(),
                    state.updated_at,
                ],
            )?;
            tx.execute("DELETE FROM members WHERE prefix = ?1", params![uri])?;
            for member in &state.members {
                insert_member(&tx, &uri, member)?;
            }

            tx.commit()?;
            tracing::debug!(
                prefix = %uri,
                epoch = %state.epoch,
                members = state.members.len(),
                "saved group state"
            );
            Ok(())
        })
        .await
    }

    async fn put_member(&self, prefix: &Name, member: &StoredMember) -> Result<()> {
        let uri = prefix.to_uri();
        let member = member.clone();

        self.blocking(move |conn| {
            if !group_exists(conn, &uri)? {
                return Err(StoreError::InvalidData(format!("unknown group {uri}")));
            }
            insert_member(conn, &uri, &member)
        })
        .await
    }

    async fn remove_member(&self, prefix: &Name, member: &MemberId) -> Result<bool> {
        let uri = prefix.to_uri();
        let member = member.to_uri();

        self.blocking(move |conn| {
            let removed = conn.execute(
                "DELETE FROM members WHERE prefix = ?1 AND member = ?2",
                params![uri, member],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}
