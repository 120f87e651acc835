use serde::{Deserialize, Serialize};

use crate::constants::{
    GENESIS_PARENT_DTSTAMP, GENESIS_PARENT_HASH, GENESIS_PARENT_ID, GENESIS_PARENT_RANDOM_STRING,
};

// ── Datalog ──────────────────────────────────────────────────────────────────

/// One datalog row: the human-visible data and one composite hash per row.
/// `(dtstamp, hash)` is unique across the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLogRow {
    pub id: i64,
    pub dtstamp: String,
    pub hash: String,
    pub data: String,
    pub description: String,
}

// ── Blockchain ───────────────────────────────────────────────────────────────

/// A block's view of its parent. `ParentRef::genesis()` is the hard-coded
/// sentinel parent of the first real block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: i64,
    pub dtstamp: String,
    pub randomstring: String,
    pub hash: String,
}

impl ParentRef {
    pub fn genesis() -> Self {
        ParentRef {
            id: GENESIS_PARENT_ID,
            dtstamp: GENESIS_PARENT_DTSTAMP.to_string(),
            randomstring: GENESIS_PARENT_RANDOM_STRING.to_string(),
            hash: GENESIS_PARENT_HASH.to_string(),
        }
    }
}

/// One blockchain row: the block's own fields plus an embedded copy of its
/// parent's, and `data` = the datalog hash that triggered the block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRow {
    pub c_id: i64,
    pub c_dtstamp: String,
    pub c_randomstring: String,
    pub c_hash: String,
    pub p_id: i64,
    pub p_dtstamp: String,
    pub p_randomstring: String,
    pub p_hash: String,
    pub data: String,
}

impl BlockRow {
    /// This block viewed as the parent of its successor.
    pub fn as_parent(&self) -> ParentRef {
        ParentRef {
            id: self.c_id,
            dtstamp: self.c_dtstamp.clone(),
            randomstring: self.c_randomstring.clone(),
            hash: self.c_hash.clone(),
        }
    }
}

// ── Event log ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRow {
    pub id: i64,
    pub dtstamp: String,
    pub f_id: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMapRow {
    pub dtstamp: String,
    pub f_id: String,
    pub key: String,
    pub value: String,
}

// ── System data ──────────────────────────────────────────────────────────────

/// Platform fingerprint sample recorded by `sysrecord`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemDataRow {
    pub id: i64,
    pub dtstamp: String,
    pub key: String,
    pub value: String,
}

// ── Notary registrations ─────────────────────────────────────────────────────

/// One remote notary registration. `alias` is the only mutable field in
/// the whole store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryRow {
    pub id: i64,
    pub dtstamp: String,
    pub alias: String,
    pub owner: String,
    pub email: String,
    pub notary_dts: String,
    pub notary_authorization: String,
    pub notary_url: String,
}

// ── Insertion receipt ────────────────────────────────────────────────────────

/// Everything a successful insertion produced, returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReceipt {
    pub dtstamp: String,
    pub data: String,
    pub description: String,
    pub data_hash: String,
    pub parent_id: i64,
    pub parent_dtstamp: String,
    pub parent_randomstring: String,
    pub parent_hash: String,
    pub block_randomstring: String,
    pub block_hash: String,
}
