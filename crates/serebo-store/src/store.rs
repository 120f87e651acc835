use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};
use tracing::{debug, info};

use serebo_core::constants::{
    BLACKBOX_ID_LENGTH, META_BLACKBOX_ID, META_BLACKBOX_PATH, META_CREATION_TIMESTAMP,
};
use serebo_core::time::dtstamp;
use serebo_core::types::{
    BlockRow, DataLogRow, EventMapRow, EventRow, NotaryRow, SystemDataRow,
};
use serebo_core::SereboError;
use serebo_crypto::random_string;

/// The SEREBO black box: one SQLite file holding every durable table.
///
/// Tables:
///   metadata         — key (unique) → value; seeded once at creation
///   systemdata       — append log of platform fingerprint samples
///   datalog          — append-only data records; UNIQUE(dtstamp, hash)
///   blockchain       — append-only hash chain, parent fields embedded
///   eventlog         — one row per insertion event
///   eventlog_datamap — fID-keyed value map (DataHash/ParentHash/BlockHash)
///   notary           — remote notary registrations; alias is mutable
///
/// One connection per instance; every multi-step write runs inside an
/// IMMEDIATE transaction so the write lock covers the whole extension.
/// Readers see either pre- or post-commit state, never a partial one.
pub struct BlackBox {
    conn: Connection,
    path: PathBuf,
}

const SCHEMA: &str = "
create table if not exists metadata (
    key text primary key,
    value text not null);
create table if not exists systemdata (
    ID integer primary key autoincrement,
    dtstamp text not null,
    key text not null,
    value text not null);
create table if not exists datalog (
    ID integer primary key autoincrement,
    dtstamp text not null,
    hash text not null,
    data blob,
    description text not null);
create unique index if not exists datalog_unique on datalog (dtstamp, hash);
create table if not exists blockchain (
    c_ID integer primary key autoincrement,
    c_dtstamp text not null,
    c_randomstring text not null,
    c_hash text not null,
    p_ID integer not null,
    p_dtstamp text not null,
    p_randomstring text not null,
    p_hash text not null,
    data text not null);
create table if not exists eventlog (
    ID integer primary key autoincrement,
    dtstamp text not null,
    fID text not null,
    description text not null);
create table if not exists eventlog_datamap (
    dtstamp text not null,
    fID text not null,
    key text not null,
    value text not null);
create table if not exists notary (
    ID integer primary key autoincrement,
    dtstamp text not null,
    alias text not null,
    owner text not null,
    email text not null,
    notaryDTS text not null,
    notaryAuthorization text not null,
    notaryURL text not null);
";

fn storage(e: rusqlite::Error) -> SereboError {
    SereboError::StoreIo(e.to_string())
}

/// Datalog column a search may target. An enum rather than a raw string so
/// search terms are the only user input reaching the SQL layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchField {
    Data,
    Description,
}

impl SearchField {
    fn column(self) -> &'static str {
        match self {
            SearchField::Data => "data",
            SearchField::Description => "description",
        }
    }
}

/// One table's full contents, as produced by `BlackBox::dump`.
#[derive(Clone, Debug)]
pub struct TableDump {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl BlackBox {
    /// Open the black box at `path`, creating file, tables and seed
    /// metadata (`creation_timestamp`, 512-char `blackboxID`,
    /// `serebo_blackbox_path`) on first open.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SereboError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SereboError::StoreIo(format!("{}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(&path).map_err(storage)?;
        let fresh: bool = !conn
            .prepare("select 1 from sqlite_master where type='table' and name='metadata'")
            .map_err(storage)?
            .exists([])
            .map_err(storage)?;
        conn.execute_batch(SCHEMA).map_err(storage)?;
        let mut bb = BlackBox { conn, path };
        if fresh {
            bb.seed_metadata()?;
            info!(path = %bb.path.display(), "created SEREBO black box");
        } else {
            debug!(path = %bb.path.display(), "opened SEREBO black box");
        }
        Ok(bb)
    }

    fn seed_metadata(&mut self) -> Result<(), SereboError> {
        let canonical = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());
        let now = dtstamp();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage)?;
        tx.execute(
            "insert into metadata (key, value) values (?1, ?2)",
            params![META_CREATION_TIMESTAMP, now],
        )
        .map_err(storage)?;
        tx.execute(
            "insert into metadata (key, value) values (?1, ?2)",
            params![META_BLACKBOX_ID, random_string(BLACKBOX_ID_LENGTH)],
        )
        .map_err(storage)?;
        tx.execute(
            "insert into metadata (key, value) values (?1, ?2)",
            params![META_BLACKBOX_PATH, canonical.display().to_string()],
        )
        .map_err(storage)?;
        tx.commit().map_err(storage)
    }

    /// Path the store was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn metadata_get(&self, key: &str) -> Result<Option<String>, SereboError> {
        let mut stmt = self
            .conn
            .prepare("select value from metadata where key = ?1")
            .map_err(storage)?;
        let mut rows = stmt.query(params![key]).map_err(storage)?;
        match rows.next().map_err(storage)? {
            Some(row) => Ok(Some(row.get(0).map_err(storage)?)),
            None => Ok(None),
        }
    }

    /// Insert a new metadata key. The key column is the primary key, so
    /// re-inserting `blackboxID` or `creation_timestamp` fails here.
    pub fn metadata_insert(&mut self, key: &str, value: &str) -> Result<(), SereboError> {
        self.conn
            .execute(
                "insert into metadata (key, value) values (?1, ?2)",
                params![key, value],
            )
            .map_err(storage)?;
        Ok(())
    }

    /// The store's fixed identity, drawn once at creation.
    pub fn blackbox_id(&self) -> Result<String, SereboError> {
        self.metadata_get(META_BLACKBOX_ID)?
            .ok_or_else(|| SereboError::Corruption("metadata is missing blackboxID".into()))
    }

    // ── Datalog reads ────────────────────────────────────────────────────────

    pub fn datalog_count(&self) -> Result<i64, SereboError> {
        self.conn
            .query_row("select count(*) from datalog", [], |r| r.get(0))
            .map_err(storage)
    }

    pub fn datalog_rows(&self) -> Result<Vec<DataLogRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare("select ID, dtstamp, hash, data, description from datalog order by ID")
            .map_err(storage)?;
        let rows = stmt
            .query_map([], datalog_from_row)
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    pub fn datalog_by_id(&self, id: i64) -> Result<Option<DataLogRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare("select ID, dtstamp, hash, data, description from datalog where ID = ?1")
            .map_err(storage)?;
        let mut rows = stmt.query(params![id]).map_err(storage)?;
        match rows.next().map_err(storage)? {
            Some(row) => Ok(Some(datalog_from_row(row).map_err(storage)?)),
            None => Ok(None),
        }
    }

    /// Datalog rows where `field = term`, case-sensitive.
    pub fn datalog_search_exact(
        &self,
        field: SearchField,
        term: &str,
    ) -> Result<Vec<DataLogRow>, SereboError> {
        let sql = format!(
            "select ID, dtstamp, hash, data, description from datalog where {} = ?1 order by ID",
            field.column()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let rows = stmt
            .query_map(params![term], datalog_from_row)
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    /// Datalog rows where `field LIKE term` (`_` one char, `%` any run).
    pub fn datalog_search_like(
        &self,
        field: SearchField,
        term: &str,
    ) -> Result<Vec<DataLogRow>, SereboError> {
        let sql = format!(
            "select ID, dtstamp, hash, data, description from datalog where {} like ?1 order by ID",
            field.column()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let rows = stmt
            .query_map(params![term], datalog_from_row)
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    /// Datalog rows whose description begins with `prefix`, e.g. the three
    /// notarization views. `%` and `_` in the prefix are escaped so they
    /// match literally.
    pub fn datalog_description_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<DataLogRow>, SereboError> {
        let escaped = prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let mut stmt = self
            .conn
            .prepare(
                "select ID, dtstamp, hash, data, description from datalog \
                 where description like ?1 escape '\\' order by ID",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![format!("{escaped}%")], datalog_from_row)
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    // ── Blockchain reads ─────────────────────────────────────────────────────

    pub fn blockchain_count(&self) -> Result<i64, SereboError> {
        self.conn
            .query_row("select count(*) from blockchain", [], |r| r.get(0))
            .map_err(storage)
    }

    pub fn blockchain_rows(&self) -> Result<Vec<BlockRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare(
                "select c_ID, c_dtstamp, c_randomstring, c_hash, \
                        p_ID, p_dtstamp, p_randomstring, p_hash, data \
                 from blockchain order by c_ID",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map([], block_from_row)
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    pub fn block_by_id(&self, c_id: i64) -> Result<Option<BlockRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare(
                "select c_ID, c_dtstamp, c_randomstring, c_hash, \
                        p_ID, p_dtstamp, p_randomstring, p_hash, data \
                 from blockchain where c_ID = ?1",
            )
            .map_err(storage)?;
        let mut rows = stmt.query(params![c_id]).map_err(storage)?;
        match rows.next().map_err(storage)? {
            Some(row) => Ok(Some(block_from_row(row).map_err(storage)?)),
            None => Ok(None),
        }
    }

    pub fn max_block_id(&self) -> Result<Option<i64>, SereboError> {
        self.conn
            .query_row("select max(c_ID) from blockchain", [], |r| r.get(0))
            .map_err(storage)
    }

    // ── Eventlog reads ───────────────────────────────────────────────────────

    pub fn eventlog_rows(&self) -> Result<Vec<EventRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare("select ID, dtstamp, fID, description from eventlog order by ID")
            .map_err(storage)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EventRow {
                    id: row.get(0)?,
                    dtstamp: row.get(1)?,
                    f_id: row.get(2)?,
                    description: row.get(3)?,
                })
            })
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    pub fn events_by_dtstamp(&self, dt: &str) -> Result<Vec<EventRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare("select ID, dtstamp, fID, description from eventlog where dtstamp = ?1")
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![dt], |row| {
                Ok(EventRow {
                    id: row.get(0)?,
                    dtstamp: row.get(1)?,
                    f_id: row.get(2)?,
                    description: row.get(3)?,
                })
            })
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    pub fn datamap_for(&self, f_id: &str) -> Result<Vec<EventMapRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare("select dtstamp, fID, key, value from eventlog_datamap where fID = ?1")
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![f_id], |row| {
                Ok(EventMapRow {
                    dtstamp: row.get(0)?,
                    f_id: row.get(1)?,
                    key: row.get(2)?,
                    value: row.get(3)?,
                })
            })
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    // ── System data ──────────────────────────────────────────────────────────

    /// Append one systemdata row per (key, value) pair, all at the same
    /// dtstamp, in a single transaction.
    pub fn record_system_data(
        &mut self,
        dt: &str,
        pairs: &[(String, String)],
    ) -> Result<(), SereboError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage)?;
        {
            let mut stmt = tx
                .prepare("insert into systemdata (dtstamp, key, value) values (?1, ?2, ?3)")
                .map_err(storage)?;
            for (key, value) in pairs {
                stmt.execute(params![dt, key, value]).map_err(storage)?;
            }
        }
        tx.commit().map_err(storage)
    }

    pub fn systemdata_rows(&self) -> Result<Vec<SystemDataRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare("select ID, dtstamp, key, value from systemdata order by ID")
            .map_err(storage)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SystemDataRow {
                    id: row.get(0)?,
                    dtstamp: row.get(1)?,
                    key: row.get(2)?,
                    value: row.get(3)?,
                })
            })
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    // ── Notary registrations ─────────────────────────────────────────────────

    pub fn insert_registration(
        &mut self,
        dt: &str,
        alias: &str,
        owner: &str,
        email: &str,
        notary_dts: &str,
        notary_authorization: &str,
        notary_url: &str,
    ) -> Result<i64, SereboError> {
        self.conn
            .execute(
                "insert into notary (dtstamp, alias, owner, email, notaryDTS, \
                 notaryAuthorization, notaryURL) values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![dt, alias, owner, email, notary_dts, notary_authorization, notary_url],
            )
            .map_err(storage)?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn registrations(&self) -> Result<Vec<NotaryRow>, SereboError> {
        let mut stmt = self
            .conn
            .prepare(
                "select ID, dtstamp, alias, owner, email, notaryDTS, \
                 notaryAuthorization, notaryURL from notary order by ID",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map([], notary_from_row)
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(rows)
    }

    pub fn registration_by_alias(&self, alias: &str) -> Result<Option<NotaryRow>, SereboError> {
        self.registration_where("alias", alias)
    }

    pub fn registration_by_url(&self, url: &str) -> Result<Option<NotaryRow>, SereboError> {
        self.registration_where("notaryURL", url)
    }

    fn registration_where(
        &self,
        column: &'static str,
        term: &str,
    ) -> Result<Option<NotaryRow>, SereboError> {
        let sql = format!(
            "select ID, dtstamp, alias, owner, email, notaryDTS, \
             notaryAuthorization, notaryURL from notary where {column} = ?1"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let mut rows = stmt.query(params![term]).map_err(storage)?;
        match rows.next().map_err(storage)? {
            Some(row) => Ok(Some(notary_from_row(row).map_err(storage)?)),
            None => Ok(None),
        }
    }

    /// Rename a notary registration. The alias is the only mutable field in
    /// the store; running it on this connection serializes it against
    /// ledger writes. Returns `NotFound` when no registration matches.
    pub fn change_alias(&mut self, alias: &str, new_alias: &str) -> Result<(), SereboError> {
        let changed = self
            .conn
            .execute(
                "update notary set alias = ?1 where alias = ?2",
                params![new_alias, alias],
            )
            .map_err(storage)?;
        if changed == 0 {
            return Err(SereboError::NotFound(format!(
                "no notary registration with alias {alias}"
            )));
        }
        Ok(())
    }

    // ── Write transactions ───────────────────────────────────────────────────

    /// Begin an IMMEDIATE write transaction. The write lock is taken up
    /// front and held until commit or drop (drop rolls back), which is what
    /// keeps two writers from both chaining onto the same parent block.
    pub fn begin(&mut self) -> Result<WriteTxn<'_>, SereboError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage)?;
        Ok(WriteTxn { tx })
    }

    // ── Backup & dump ────────────────────────────────────────────────────────

    /// Snapshot the store file to `target` without mutating it: take the
    /// exclusive lock, copy the file byte-for-byte, release without
    /// committing a write.
    pub fn backup<P: AsRef<Path>>(&mut self, target: P) -> Result<u64, SereboError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(storage)?;
        let copied = std::fs::copy(&self.path, target.as_ref())
            .map_err(|e| SereboError::StoreIo(format!("{}: {e}", target.as_ref().display())))?;
        drop(tx);
        info!(target = %target.as_ref().display(), bytes = copied, "black box backup written");
        Ok(copied)
    }

    /// Every table's contents, stringified, in schema order.
    pub fn dump(&self) -> Result<Vec<TableDump>, SereboError> {
        const TABLES: [&str; 7] = [
            "metadata",
            "systemdata",
            "datalog",
            "blockchain",
            "eventlog",
            "eventlog_datamap",
            "notary",
        ];
        let mut out = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let mut stmt = self
                .conn
                .prepare(&format!("select * from {table}"))
                .map_err(storage)?;
            let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
            let width = columns.len();
            let mut rows_out = Vec::new();
            let mut rows = stmt.query([]).map_err(storage)?;
            while let Some(row) = rows.next().map_err(storage)? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    let cell = match row.get_ref(i).map_err(storage)? {
                        rusqlite::types::ValueRef::Null => String::new(),
                        rusqlite::types::ValueRef::Integer(v) => v.to_string(),
                        rusqlite::types::ValueRef::Real(v) => v.to_string(),
                        rusqlite::types::ValueRef::Text(t) => {
                            String::from_utf8_lossy(t).into_owned()
                        }
                        rusqlite::types::ValueRef::Blob(b) => {
                            String::from_utf8_lossy(b).into_owned()
                        }
                    };
                    values.push(cell);
                }
                rows_out.push(values);
            }
            out.push(TableDump {
                name: table.to_string(),
                columns,
                rows: rows_out,
            });
        }
        Ok(out)
    }
}

/// In-flight write transaction exposing the primitive inserts the
/// insertion protocol is built from. Dropping without `commit` rolls
/// everything back.
pub struct WriteTxn<'c> {
    tx: rusqlite::Transaction<'c>,
}

impl WriteTxn<'_> {
    /// Insert a datalog row. A violation of the UNIQUE(dtstamp, hash)
    /// index surfaces as `DuplicateRecord` and poisons the whole write.
    pub fn insert_datalog(
        &self,
        dt: &str,
        hash: &str,
        data: &str,
        description: &str,
    ) -> Result<i64, SereboError> {
        match self.tx.execute(
            "insert into datalog (dtstamp, hash, data, description) values (?1, ?2, ?3, ?4)",
            params![dt, hash, data, description],
        ) {
            Ok(_) => Ok(self.tx.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(f, _))
                if f.code == ErrorCode::ConstraintViolation =>
            {
                Err(SereboError::DuplicateRecord {
                    dtstamp: dt.to_string(),
                })
            }
            Err(e) => Err(storage(e)),
        }
    }

    /// The row with the maximum c_ID, read under the write lock.
    pub fn latest_block(&self) -> Result<Option<BlockRow>, SereboError> {
        let mut stmt = self
            .tx
            .prepare(
                "select c_ID, c_dtstamp, c_randomstring, c_hash, \
                        p_ID, p_dtstamp, p_randomstring, p_hash, data \
                 from blockchain order by c_ID desc limit 1",
            )
            .map_err(storage)?;
        let mut rows = stmt.query([]).map_err(storage)?;
        match rows.next().map_err(storage)? {
            Some(row) => Ok(Some(block_from_row(row).map_err(storage)?)),
            None => Ok(None),
        }
    }

    pub fn insert_block(
        &self,
        dt: &str,
        c_randomstring: &str,
        c_hash: &str,
        parent: &serebo_core::types::ParentRef,
        data_hash: &str,
    ) -> Result<i64, SereboError> {
        self.tx
            .execute(
                "insert into blockchain (c_dtstamp, c_randomstring, c_hash, \
                 p_ID, p_dtstamp, p_randomstring, p_hash, data) \
                 values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    dt,
                    c_randomstring,
                    c_hash,
                    parent.id,
                    parent.dtstamp,
                    parent.randomstring,
                    parent.hash,
                    data_hash
                ],
            )
            .map_err(storage)?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn insert_event(&self, dt: &str, f_id: &str, description: &str) -> Result<i64, SereboError> {
        self.tx
            .execute(
                "insert into eventlog (dtstamp, fID, description) values (?1, ?2, ?3)",
                params![dt, f_id, description],
            )
            .map_err(storage)?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn insert_event_map(
        &self,
        dt: &str,
        f_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SereboError> {
        self.tx
            .execute(
                "insert into eventlog_datamap (dtstamp, fID, key, value) values (?1, ?2, ?3, ?4)",
                params![dt, f_id, key, value],
            )
            .map_err(storage)?;
        Ok(())
    }

    pub fn commit(self) -> Result<(), SereboError> {
        self.tx.commit().map_err(storage)
    }
}

// ── Row mappers ──────────────────────────────────────────────────────────────

fn datalog_from_row(row: &rusqlite::Row<'_>) -> Result<DataLogRow, rusqlite::Error> {
    Ok(DataLogRow {
        id: row.get(0)?,
        dtstamp: row.get(1)?,
        hash: row.get(2)?,
        data: row.get(3)?,
        description: row.get(4)?,
    })
}

fn block_from_row(row: &rusqlite::Row<'_>) -> Result<BlockRow, rusqlite::Error> {
    Ok(BlockRow {
        c_id: row.get(0)?,
        c_dtstamp: row.get(1)?,
        c_randomstring: row.get(2)?,
        c_hash: row.get(3)?,
        p_id: row.get(4)?,
        p_dtstamp: row.get(5)?,
        p_randomstring: row.get(6)?,
        p_hash: row.get(7)?,
        data: row.get(8)?,
    })
}

fn notary_from_row(row: &rusqlite::Row<'_>) -> Result<NotaryRow, rusqlite::Error> {
    Ok(NotaryRow {
        id: row.get(0)?,
        dtstamp: row.get(1)?,
        alias: row.get(2)?,
        owner: row.get(3)?,
        email: row.get(4)?,
        notary_dts: row.get(5)?,
        notary_authorization: row.get(6)?,
        notary_url: row.get(7)?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serebo_core::constants::RANDOM_ALPHABET;
    use serebo_core::types::ParentRef;

    fn temp_store(name: &str) -> (BlackBox, PathBuf) {
        let path = std::env::temp_dir().join(format!("serebo_store_test_{name}.sdb"));
        let _ = std::fs::remove_file(&path);
        (BlackBox::open(&path).expect("open temp store"), path)
    }

    #[test]
    fn fresh_store_seeds_metadata() {
        let (bb, path) = temp_store("seed");
        let id = bb.blackbox_id().unwrap();
        assert_eq!(id.len(), 512);
        assert!(id.bytes().all(|b| RANDOM_ALPHABET.contains(&b)));
        let created = bb.metadata_get(META_CREATION_TIMESTAMP).unwrap().unwrap();
        assert_eq!(created.split(':').count(), 7);
        assert!(bb.metadata_get(META_BLACKBOX_PATH).unwrap().is_some());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn reopen_does_not_reseed() {
        let (bb, path) = temp_store("reopen");
        let id = bb.blackbox_id().unwrap();
        drop(bb);
        let bb = BlackBox::open(&path).unwrap();
        assert_eq!(bb.blackbox_id().unwrap(), id);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn metadata_key_reinsertion_fails() {
        let (mut bb, path) = temp_store("metadup");
        let err = bb.metadata_insert(META_BLACKBOX_ID, "forged").unwrap_err();
        assert!(matches!(err, SereboError::StoreIo(_)));
        assert_eq!(bb.blackbox_id().unwrap().len(), 512);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn datalog_unique_index_reports_duplicate_record() {
        let (mut bb, path) = temp_store("dup");
        let txn = bb.begin().unwrap();
        txn.insert_datalog("2024:1:1:0:0:0:1", "H", "d", "desc").unwrap();
        let err = txn
            .insert_datalog("2024:1:1:0:0:0:1", "H", "d2", "desc2")
            .unwrap_err();
        assert!(matches!(err, SereboError::DuplicateRecord { .. }));
        drop(txn);
        // The aborted transaction left nothing behind.
        assert_eq!(bb.datalog_count().unwrap(), 0);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn dropped_transaction_rolls_back_all_tables() {
        let (mut bb, path) = temp_store("rollback");
        {
            let txn = bb.begin().unwrap();
            txn.insert_datalog("2024:1:1:0:0:0:2", "H2", "d", "desc").unwrap();
            txn.insert_block("2024:1:1:0:0:0:2", "R", "BH", &ParentRef::genesis(), "H2")
                .unwrap();
            txn.insert_event("2024:1:1:0:0:0:2", "fid", "desc").unwrap();
            // no commit
        }
        assert_eq!(bb.datalog_count().unwrap(), 0);
        assert_eq!(bb.blockchain_count().unwrap(), 0);
        assert!(bb.eventlog_rows().unwrap().is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn committed_triple_is_readable() {
        let (mut bb, path) = temp_store("commit");
        let txn = bb.begin().unwrap();
        assert!(txn.latest_block().unwrap().is_none());
        txn.insert_datalog("2024:1:1:0:0:0:3", "DH", "payload", "note").unwrap();
        txn.insert_block("2024:1:1:0:0:0:3", "R", "BH", &ParentRef::genesis(), "DH")
            .unwrap();
        txn.insert_event("2024:1:1:0:0:0:3", "fid123", "note").unwrap();
        txn.insert_event_map("2024:1:1:0:0:0:3", "fid123", "DataHash", "DH").unwrap();
        txn.commit().unwrap();

        let rows = bb.datalog_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].data, "payload");
        let block = bb.block_by_id(1).unwrap().unwrap();
        assert_eq!(block.p_id, 0);
        assert_eq!(block.data, "DH");
        let map = bb.datamap_for("fid123").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].key, "DataHash");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn backup_is_byte_identical() {
        let (mut bb, path) = temp_store("backup");
        let txn = bb.begin().unwrap();
        txn.insert_datalog("2024:1:1:0:0:0:4", "DH4", "d", "n").unwrap();
        txn.commit().unwrap();

        let target = std::env::temp_dir().join("serebo_store_test_backup_copy.sdb");
        let _ = std::fs::remove_file(&target);
        bb.backup(&target).unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            std::fs::read(&target).unwrap()
        );
        // The copy opens as a valid store with the same identity.
        let copy = BlackBox::open(&target).unwrap();
        assert_eq!(copy.blackbox_id().unwrap(), bb.blackbox_id().unwrap());
        assert_eq!(copy.datalog_count().unwrap(), 1);
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(target);
    }

    #[test]
    fn change_alias_updates_only_matching_row() {
        let (mut bb, path) = temp_store("alias");
        bb.insert_registration("2024:1:1:0:0:0:5", "first", "o", "e", "ndts", "auth", "http://n1")
            .unwrap();
        bb.insert_registration("2024:1:1:0:0:0:6", "second", "o", "e", "ndts", "auth2", "http://n2")
            .unwrap();
        bb.change_alias("first", "renamed").unwrap();
        assert!(bb.registration_by_alias("first").unwrap().is_none());
        assert_eq!(
            bb.registration_by_alias("renamed").unwrap().unwrap().notary_url,
            "http://n1"
        );
        assert_eq!(
            bb.registration_by_alias("second").unwrap().unwrap().notary_url,
            "http://n2"
        );
        let err = bb.change_alias("ghost", "x").unwrap_err();
        assert!(matches!(err, SereboError::NotFound(_)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn dump_lists_every_table() {
        let (bb, path) = temp_store("dump");
        let dump = bb.dump().unwrap();
        let names: Vec<&str> = dump.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "metadata",
                "systemdata",
                "datalog",
                "blockchain",
                "eventlog",
                "eventlog_datamap",
                "notary"
            ]
        );
        let meta = &dump[0];
        assert_eq!(meta.columns, ["key", "value"]);
        assert_eq!(meta.rows.len(), 3);
        let _ = std::fs::remove_file(path);
    }
}
