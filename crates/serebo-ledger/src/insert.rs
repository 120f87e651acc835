//! The chain-extension protocol: every accepted record atomically extends
//! datalog, blockchain and eventlog in one write transaction.

use std::path::Path;

use tracing::{debug, info};

use serebo_core::constants::{
    BLOCK_NONCE_LENGTH, DEFAULT_DESCRIPTION, DESCRIPTION_SUFFIX_LENGTH, EVENT_FID_LENGTH,
    MAP_KEY_BLOCK_HASH, MAP_KEY_DATA_HASH, MAP_KEY_PARENT_HASH,
};
use serebo_core::time::dtstamp;
use serebo_core::types::{InsertReceipt, ParentRef};
use serebo_core::SereboError;
use serebo_crypto::{file_composite12, random_string, CompositeHasher};
use serebo_store::BlackBox;

/// Record a text message. The stored description is the caller's text
/// suffixed with `:` and a fresh 10-char random string, so two inserts of
/// the same message in the same microsecond still collide only on the
/// (dtstamp, hash) unique index, not by accident.
pub fn insert_text(
    bb: &mut BlackBox,
    data: &str,
    description: &str,
) -> Result<InsertReceipt, SereboError> {
    insert_record(bb, data, description, true)
}

/// Record an internal log message verbatim — no random suffix. Used where
/// the exact description is meaningful (notarization records, alias
/// changes) and by the file-logging front-end.
pub fn insert_ftext(
    bb: &mut BlackBox,
    data: &str,
    description: &str,
) -> Result<InsertReceipt, SereboError> {
    insert_record(bb, data, description, false)
}

/// Log a file: the stored data is the file's streamed hash composite, and
/// the description records both the path as given and its absolute form.
pub fn log_file<P: AsRef<Path>>(
    bb: &mut BlackBox,
    filepath: P,
    description: &str,
) -> Result<InsertReceipt, SereboError> {
    let filepath = filepath.as_ref();
    let file_hash = file_composite12(filepath)?;
    let absolute = filepath
        .canonicalize()
        .map_err(|e| SereboError::StoreIo(format!("{}: {e}", filepath.display())))?;
    let description = format!(
        "UserGivenPath :> {} >> AbsolutePath :> {} >> UserDescription :> {}",
        filepath.display(),
        absolute.display(),
        normalize_description(description)
    );
    insert_record(bb, &file_hash, &description, false)
}

fn normalize_description(description: &str) -> &str {
    if description.is_empty() {
        DEFAULT_DESCRIPTION
    } else {
        description
    }
}

fn insert_record(
    bb: &mut BlackBox,
    data: &str,
    description: &str,
    suffix: bool,
) -> Result<InsertReceipt, SereboError> {
    // Prepare: timestamp, display description, data hash.
    let dt = dtstamp();
    let description = if suffix {
        format!(
            "{}:{}",
            normalize_description(description),
            random_string(DESCRIPTION_SUFFIX_LENGTH)
        )
    } else {
        normalize_description(description).to_string()
    };
    let mut hasher = CompositeHasher::new();
    hasher.update(dt.as_bytes());
    hasher.update(data.as_bytes());
    hasher.update(description.as_bytes());
    let data_hash = hasher.finalize();

    // The IMMEDIATE transaction holds the write lock from here to commit,
    // so no second writer can chain onto the same parent.
    let txn = bb.begin()?;
    txn.insert_datalog(&dt, &data_hash, data, &description)?;

    let parent = match txn.latest_block()? {
        Some(block) => block.as_parent(),
        None => ParentRef::genesis(),
    };
    debug!(parent_id = parent.id, "extending chain");

    // Child hash covers the parent triple and the new data hash, string-
    // concatenated without separators.
    let block_randomstring = random_string(BLOCK_NONCE_LENGTH);
    let mut hasher = CompositeHasher::new();
    hasher.update(parent.dtstamp.as_bytes());
    hasher.update(parent.randomstring.as_bytes());
    hasher.update(parent.hash.as_bytes());
    hasher.update(data_hash.as_bytes());
    let block_hash = hasher.finalize();

    txn.insert_block(&dt, &block_randomstring, &block_hash, &parent, &data_hash)?;

    let f_id = random_string(EVENT_FID_LENGTH);
    txn.insert_event(&dt, &f_id, &description)?;
    txn.insert_event_map(&dt, &f_id, MAP_KEY_DATA_HASH, &data_hash)?;
    txn.insert_event_map(&dt, &f_id, MAP_KEY_PARENT_HASH, &parent.hash)?;
    txn.insert_event_map(&dt, &f_id, MAP_KEY_BLOCK_HASH, &block_hash)?;

    txn.commit()?;
    info!(block_id = parent.id + 1, "record committed");

    Ok(InsertReceipt {
        dtstamp: dt,
        data: data.to_string(),
        description,
        data_hash,
        parent_id: parent.id,
        parent_dtstamp: parent.dtstamp,
        parent_randomstring: parent.randomstring,
        parent_hash: parent.hash,
        block_randomstring,
        block_hash,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serebo_core::constants::{
        GENESIS_PARENT_HASH, GENESIS_PARENT_RANDOM_STRING, RANDOM_ALPHABET,
    };
    use serebo_crypto::composite12;

    fn temp_box(name: &str) -> (BlackBox, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("serebo_insert_test_{name}.sdb"));
        let _ = std::fs::remove_file(&path);
        (BlackBox::open(&path).expect("open temp store"), path)
    }

    #[test]
    fn first_insert_chains_onto_genesis() {
        let (mut bb, path) = temp_box("genesis");
        let receipt = insert_text(&mut bb, "hello", "note1").unwrap();
        assert_eq!(receipt.parent_id, 0);
        assert_eq!(receipt.parent_dtstamp, "0");
        assert_eq!(receipt.parent_randomstring, GENESIS_PARENT_RANDOM_STRING);
        assert_eq!(receipt.parent_hash, GENESIS_PARENT_HASH);
        let block = bb.block_by_id(1).unwrap().unwrap();
        assert_eq!(block.c_hash, receipt.block_hash);
        assert_eq!(block.data, receipt.data_hash);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn text_mode_appends_ten_char_suffix() {
        let (mut bb, path) = temp_box("suffix");
        let receipt = insert_text(&mut bb, "m", "note1").unwrap();
        let suffix = receipt.description.strip_prefix("note1:").expect("prefix");
        assert_eq!(suffix.len(), 10);
        assert!(suffix.bytes().all(|b| RANDOM_ALPHABET.contains(&b)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn empty_description_defaults_to_na() {
        let (mut bb, path) = temp_box("na");
        let receipt = insert_text(&mut bb, "", "").unwrap();
        assert!(receipt.description.starts_with("NA:"));
        // Empty data is legal.
        assert_eq!(receipt.data, "");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn ftext_keeps_description_verbatim() {
        let (mut bb, path) = temp_box("ftext");
        let receipt = insert_ftext(&mut bb, "code", "Self notarization").unwrap();
        assert_eq!(receipt.description, "Self notarization");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn data_hash_covers_dtstamp_data_and_description() {
        let (mut bb, path) = temp_box("datahash");
        let receipt = insert_text(&mut bb, "payload", "why").unwrap();
        let recomputed = composite12(
            format!("{}{}{}", receipt.dtstamp, receipt.data, receipt.description).as_bytes(),
        );
        assert_eq!(recomputed, receipt.data_hash);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn block_hash_covers_parent_triple_and_data_hash() {
        let (mut bb, path) = temp_box("blockhash");
        insert_text(&mut bb, "one", "a").unwrap();
        let receipt = insert_text(&mut bb, "two", "b").unwrap();
        let recomputed = composite12(
            format!(
                "{}{}{}{}",
                receipt.parent_dtstamp,
                receipt.parent_randomstring,
                receipt.parent_hash,
                receipt.data_hash
            )
            .as_bytes(),
        );
        assert_eq!(recomputed, receipt.block_hash);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn consecutive_inserts_link_parent_to_child() {
        let (mut bb, path) = temp_box("link");
        let first = insert_text(&mut bb, "one", "a").unwrap();
        let second = insert_text(&mut bb, "two", "b").unwrap();
        assert_eq!(second.parent_id, 1);
        assert_eq!(second.parent_hash, first.block_hash);
        assert_eq!(second.parent_dtstamp, first.dtstamp);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn every_insert_writes_event_and_three_map_rows() {
        let (mut bb, path) = temp_box("event");
        let receipt = insert_text(&mut bb, "x", "d").unwrap();
        let events = bb.events_by_dtstamp(&receipt.dtstamp).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].description, receipt.description);
        let map = bb.datamap_for(&events[0].f_id).unwrap();
        assert_eq!(map.len(), 3);
        let get = |k: &str| {
            map.iter()
                .find(|m| m.key == k)
                .map(|m| m.value.clone())
                .expect("map key")
        };
        assert_eq!(get("DataHash"), receipt.data_hash);
        assert_eq!(get("ParentHash"), receipt.parent_hash);
        assert_eq!(get("BlockHash"), receipt.block_hash);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn log_file_stores_file_hash_and_path_description() {
        let (mut bb, path) = temp_box("logfile");
        let file = std::env::temp_dir().join("serebo_insert_test_payload.txt");
        std::fs::write(&file, b"observed data").unwrap();
        let receipt = log_file(&mut bb, &file, "raw reads").unwrap();
        assert_eq!(receipt.data, composite12(b"observed data"));
        assert!(receipt.description.starts_with("UserGivenPath :> "));
        assert!(receipt.description.contains(" >> AbsolutePath :> "));
        assert!(receipt.description.ends_with(" >> UserDescription :> raw reads"));
        let _ = std::fs::remove_file(file);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_writes_nothing() {
        let (mut bb, path) = temp_box("nofile");
        let err = log_file(&mut bb, "/no/such/file", "x").unwrap_err();
        assert!(matches!(err, SereboError::StoreIo(_)));
        assert_eq!(bb.datalog_count().unwrap(), 0);
        let _ = std::fs::remove_file(path);
    }
}
