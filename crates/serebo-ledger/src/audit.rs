//! Audit procedures: read-only consistency checks between stored data and
//! recomputed data. Every audit reports per-record pass/fail and runs to
//! completion — a mismatch is recorded, never thrown.

use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use serebo_core::types::BlockRow;
use serebo_core::SereboError;
use serebo_crypto::CompositeHasher;
use serebo_store::BlackBox;

/// One record's verdict within an audit.
#[derive(Clone, Debug, Serialize)]
pub struct RecordCheck {
    /// Record ID the check is about. 0 marks a table-level check (e.g.
    /// row-count parity) that has no single record.
    pub id: i64,
    pub ok: bool,
    pub note: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditReport {
    pub name: &'static str,
    pub checks: Vec<RecordCheck>,
}

impl AuditReport {
    fn new(name: &'static str) -> Self {
        AuditReport {
            name,
            checks: Vec::new(),
        }
    }

    fn push(&mut self, id: i64, ok: bool, note: impl Into<String>) {
        self.checks.push(RecordCheck {
            id,
            ok,
            note: note.into(),
        });
    }

    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordCheck> {
        self.checks.iter().filter(|c| !c.ok)
    }
}

fn data_hash_input(dtstamp: &str, data: &str, description: &str) -> String {
    let mut hasher = CompositeHasher::new();
    hasher.update(dtstamp.as_bytes());
    hasher.update(data.as_bytes());
    hasher.update(description.as_bytes());
    hasher.finalize()
}

fn block_hash_input(block: &BlockRow) -> String {
    let mut hasher = CompositeHasher::new();
    hasher.update(block.p_dtstamp.as_bytes());
    hasher.update(block.p_randomstring.as_bytes());
    hasher.update(block.p_hash.as_bytes());
    hasher.update(block.data.as_bytes());
    hasher.finalize()
}

/// Count parity: datalog and blockchain hold the same number of rows, and
/// each shared ID carries the same dtstamp on both sides.
pub fn audit_count(bb: &BlackBox) -> Result<AuditReport, SereboError> {
    let mut report = AuditReport::new("count");
    let datalog = bb.datalog_rows()?;
    let blocks: BTreeMap<i64, BlockRow> =
        bb.blockchain_rows()?.into_iter().map(|b| (b.c_id, b)).collect();
    let counts_match = datalog.len() == blocks.len();
    report.push(
        0,
        counts_match,
        format!("datalog {} rows, blockchain {} rows", datalog.len(), blocks.len()),
    );
    for row in &datalog {
        match blocks.get(&row.id) {
            Some(block) if block.c_dtstamp == row.dtstamp => {
                report.push(row.id, true, "dtstamps match");
            }
            Some(block) => report.push(
                row.id,
                false,
                format!("dtstamp mismatch: datalog {} vs block {}", row.dtstamp, block.c_dtstamp),
            ),
            None => report.push(row.id, false, "no blockchain row with this ID"),
        }
    }
    debug!(audit = report.name, passed = report.passed(), "audit complete");
    Ok(report)
}

/// Recompute every datalog hash from (dtstamp, data, description).
pub fn audit_datahash(bb: &BlackBox) -> Result<AuditReport, SereboError> {
    let mut report = AuditReport::new("datahash");
    for row in bb.datalog_rows()? {
        let recomputed = data_hash_input(&row.dtstamp, &row.data, &row.description);
        if recomputed == row.hash {
            report.push(row.id, true, "hash verified");
        } else {
            report.push(row.id, false, "stored hash does not match recomputed hash");
        }
    }
    debug!(audit = report.name, passed = report.passed(), "audit complete");
    Ok(report)
}

/// For every paired row (same ID, same dtstamp), the block's `data` must
/// equal the datalog hash it was derived from.
pub fn audit_data_blockchain(bb: &BlackBox) -> Result<AuditReport, SereboError> {
    let mut report = AuditReport::new("data-blockchain");
    for row in bb.datalog_rows()? {
        match bb.block_by_id(row.id)? {
            Some(block) if block.c_dtstamp == row.dtstamp => {
                if block.data == row.hash {
                    report.push(row.id, true, "datalog hash carried into block");
                } else {
                    report.push(row.id, false, "block data differs from datalog hash");
                }
            }
            Some(_) => report.push(row.id, false, "paired block carries a different dtstamp"),
            None => report.push(row.id, false, "no blockchain row with this ID"),
        }
    }
    debug!(audit = report.name, passed = report.passed(), "audit complete");
    Ok(report)
}

/// Recompute every block hash from the embedded parent fields and `data`.
pub fn audit_blockchainhash(bb: &BlackBox) -> Result<AuditReport, SereboError> {
    let mut report = AuditReport::new("blockchainhash");
    for block in bb.blockchain_rows()? {
        if block_hash_input(&block) == block.c_hash {
            report.push(block.c_id, true, "block hash verified");
        } else {
            report.push(block.c_id, false, "stored block hash does not match recomputed hash");
        }
    }
    debug!(audit = report.name, passed = report.passed(), "audit complete");
    Ok(report)
}

/// Chain continuity: block i+1's embedded parent fields must equal block
/// i's own fields, for every i from 1 to max(c_ID)−1. That range covers
/// the final link as well.
pub fn audit_blockchainflow(bb: &BlackBox) -> Result<AuditReport, SereboError> {
    let mut report = AuditReport::new("blockchainflow");
    let blocks: BTreeMap<i64, BlockRow> =
        bb.blockchain_rows()?.into_iter().map(|b| (b.c_id, b)).collect();
    let max = blocks.keys().next_back().copied().unwrap_or(0);
    for i in 1..max {
        let child_id = i + 1;
        let (Some(parent), Some(child)) = (blocks.get(&i), blocks.get(&child_id)) else {
            report.push(child_id, false, format!("chain gap: block {i} or {child_id} missing"));
            continue;
        };
        let linked = child.p_id == parent.c_id
            && child.p_dtstamp == parent.c_dtstamp
            && child.p_randomstring == parent.c_randomstring
            && child.p_hash == parent.c_hash;
        if linked {
            report.push(child_id, true, format!("linked to block {i}"));
        } else {
            report.push(child_id, false, format!("parent fields do not match block {i}"));
        }
    }
    debug!(audit = report.name, passed = report.passed(), "audit complete");
    Ok(report)
}

/// Write one line per datalog row to `target`, in the exact format
/// `id | dtstamp | hash` (a single space either side of each pipe).
pub fn dump_hash<P: AsRef<Path>>(bb: &BlackBox, target: P) -> Result<usize, SereboError> {
    let file = std::fs::File::create(target.as_ref())
        .map_err(|e| SereboError::StoreIo(format!("{}: {e}", target.as_ref().display())))?;
    let mut out = BufWriter::new(file);
    let rows = bb.datalog_rows()?;
    for row in &rows {
        writeln!(out, "{} | {} | {}", row.id, row.dtstamp, row.hash)
            .map_err(|e| SereboError::StoreIo(e.to_string()))?;
    }
    out.flush().map_err(|e| SereboError::StoreIo(e.to_string()))?;
    Ok(rows.len())
}

/// Verify a hash-dump file against the store: every `id | dtstamp | hash`
/// line must match the datalog row with that ID.
pub fn check_hash<P: AsRef<Path>>(bb: &BlackBox, source: P) -> Result<AuditReport, SereboError> {
    let text = std::fs::read_to_string(source.as_ref())
        .map_err(|e| SereboError::StoreIo(format!("{}: {e}", source.as_ref().display())))?;
    let mut report = AuditReport::new("checkhash");
    for (lineno, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(" | ").collect();
        let parsed = match parts.as_slice() {
            [id, dtstamp, hash] => id.parse::<i64>().ok().map(|id| (id, *dtstamp, *hash)),
            _ => None,
        };
        let Some((id, dtstamp, hash)) = parsed else {
            report.push(0, false, format!("line {}: malformed record", lineno + 1));
            continue;
        };
        match bb.datalog_by_id(id)? {
            Some(row) if row.dtstamp == dtstamp && row.hash == hash => {
                report.push(id, true, "hash verified");
            }
            Some(row) if row.dtstamp != dtstamp => {
                report.push(id, false, "dtstamp does not match datalog");
            }
            Some(_) => report.push(id, false, "hash does not match datalog"),
            None => report.push(id, false, "no datalog row with this ID"),
        }
    }
    debug!(audit = report.name, passed = report.passed(), "audit complete");
    Ok(report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
