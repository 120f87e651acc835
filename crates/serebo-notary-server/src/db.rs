use std::path::Path;

use rusqlite::{params, Connection, ErrorCode};

use serebo_core::SereboError;

/// Notary-side state: who registered, what was co-signed, and an event
/// log of every handled request (success and failure alike).
pub struct NotaryDb {
    conn: Connection,
}

const SCHEMA: &str = "
create table if not exists registered_blackbox (
    ID integer primary key autoincrement,
    dtstamp text not null,
    blackboxID text not null unique,
    owner text not null,
    email text not null,
    architecture text not null,
    machine text not null,
    node text not null,
    platform text not null,
    processor text not null,
    notaryAuthorization text not null);
create table if not exists notarize_blackbox (
    ID integer primary key autoincrement,
    blackboxID text not null,
    notaryAuthorization text not null,
    dtstampBB text not null,
    dtstampNS text not null,
    codeBB text not null,
    codeNS text not null,
    codeCommon text not null);
create table if not exists eventlog (
    ID integer primary key autoincrement,
    dtstamp text not null,
    event text not null);
";

fn storage(e: rusqlite::Error) -> SereboError {
    SereboError::StoreIo(e.to_string())
}

impl NotaryDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SereboError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SereboError::StoreIo(format!("{}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(path.as_ref()).map_err(storage)?;
        conn.execute_batch(SCHEMA).map_err(storage)?;
        Ok(NotaryDb { conn })
    }

    /// Store a new registration. The UNIQUE blackboxID column makes a
    /// duplicate surface as `AlreadyRegistered`.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_registration(
        &mut self,
        dtstamp: &str,
        blackbox_id: &str,
        owner: &str,
        email: &str,
        architecture: &str,
        machine: &str,
        node: &str,
        platform: &str,
        processor: &str,
        authorization: &str,
    ) -> Result<(), SereboError> {
        match self.conn.execute(
            "insert into registered_blackbox (dtstamp, blackboxID, owner, email, \
             architecture, machine, node, platform, processor, notaryAuthorization) \
             values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                dtstamp,
                blackbox_id,
                owner,
                email,
                architecture,
                machine,
                node,
                platform,
                processor,
                authorization
            ],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(f, _))
                if f.code == ErrorCode::ConstraintViolation =>
            {
                Err(SereboError::AlreadyRegistered {
                    blackbox_id: blackbox_id.to_string(),
                })
            }
            Err(e) => Err(storage(e)),
        }
    }

    /// Whether a (blackboxID, authorization) pair is registered. Checked
    /// against registered_blackbox, the authoritative table.
    pub fn registration_exists(
        &self,
        blackbox_id: &str,
        authorization: &str,
    ) -> Result<bool, SereboError> {
        self.conn
            .prepare(
                "select 1 from registered_blackbox \
                 where blackboxID = ?1 and notaryAuthorization = ?2",
            )
            .map_err(storage)?
            .exists(params![blackbox_id, authorization])
            .map_err(storage)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn insert_notarization(
        &mut self,
        blackbox_id: &str,
        authorization: &str,
        dtstamp_bb: &str,
        dtstamp_ns: &str,
        code_bb: &str,
        code_ns: &str,
        code_common: &str,
    ) -> Result<(), SereboError> {
        self.conn
            .execute(
                "insert into notarize_blackbox (blackboxID, notaryAuthorization, \
                 dtstampBB, dtstampNS, codeBB, codeNS, codeCommon) \
                 values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    blackbox_id,
                    authorization,
                    dtstamp_bb,
                    dtstamp_ns,
                    code_bb,
                    code_ns,
                    code_common
                ],
            )
            .map_err(storage)?;
        Ok(())
    }

    pub fn notarization_exists(
        &self,
        blackbox_id: &str,
        authorization: &str,
        code_bb: &str,
        code_ns: &str,
        code_common: &str,
    ) -> Result<bool, SereboError> {
        self.conn
            .prepare(
                "select 1 from notarize_blackbox \
                 where blackboxID = ?1 and notaryAuthorization = ?2 \
                 and codeBB = ?3 and codeNS = ?4 and codeCommon = ?5",
            )
            .map_err(storage)?
            .exists(params![blackbox_id, authorization, code_bb, code_ns, code_common])
            .map_err(storage)
    }

    pub fn log_event(&mut self, dtstamp: &str, event: &str) -> Result<(), SereboError> {
        self.conn
            .execute(
                "insert into eventlog (dtstamp, event) values (?1, ?2)",
                params![dtstamp, event],
            )
            .map_err(storage)?;
        Ok(())
    }

    pub fn events(&self) -> Result<Vec<String>, SereboError> {
        let mut stmt = self
            .conn
            .prepare("select event from eventlog order by ID")
            .map_err(storage)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(storage)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }
}
