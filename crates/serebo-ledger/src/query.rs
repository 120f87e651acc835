//! Read paths over datalog: searches and the notarization views.
//! Nothing here writes to the store.

use std::path::Path;

use serebo_core::constants::{NOTARY_NOTE_PREFIX, NTP_NOTE_PREFIX, SELF_NOTE_PREFIX};
use serebo_core::types::DataLogRow;
use serebo_core::SereboError;
use serebo_crypto::file_composite12;
use serebo_store::{BlackBox, SearchField};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// `field = term`, case-sensitive.
    Exact,
    /// `field LIKE term`: `_` matches one character, `%` any run.
    Like,
}

/// Search datalog rows by field and term.
pub fn search(
    bb: &BlackBox,
    field: SearchField,
    term: &str,
    mode: SearchMode,
) -> Result<Vec<DataLogRow>, SereboError> {
    match mode {
        SearchMode::Exact => bb.datalog_search_exact(field, term),
        SearchMode::Like => bb.datalog_search_like(field, term),
    }
}

/// Hash a candidate file and exact-search datalog.data for it. A match
/// means byte-identical content was logged before.
pub fn search_file<P: AsRef<Path>>(
    bb: &BlackBox,
    filepath: P,
) -> Result<(String, Vec<DataLogRow>), SereboError> {
    let file_hash = file_composite12(filepath)?;
    let rows = bb.datalog_search_exact(SearchField::Data, &file_hash)?;
    Ok((file_hash, rows))
}

/// Records written by `selfsign`.
pub fn self_notarizations(bb: &BlackBox) -> Result<Vec<DataLogRow>, SereboError> {
    bb.datalog_description_prefix(SELF_NOTE_PREFIX)
}

/// Records written by `ntpsign`.
pub fn ntp_notarizations(bb: &BlackBox) -> Result<Vec<DataLogRow>, SereboError> {
    bb.datalog_description_prefix(NTP_NOTE_PREFIX)
}

/// Records written by a successful remote notarization.
pub fn notary_notarizations(bb: &BlackBox) -> Result<Vec<DataLogRow>, SereboError> {
    bb.datalog_description_prefix(NOTARY_NOTE_PREFIX)
}

/// A remote-notarization datalog record, re-parsed from its pipe-joined
/// description. `data` on such rows is the cross-signing code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotarizationNote {
    pub dtstamp: String,
    pub code_common: String,
    pub code_bb: String,
    pub dtstamp_bb: String,
    pub code_ns: String,
    pub dtstamp_ns: String,
    pub notary_url: String,
}

impl NotarizationNote {
    /// Parse a `Notarization with SEREBO Notary | Black Box Code: … |
    /// Black Box Date Time: … | Notary Code: … | Notary Date Time: … |
    /// Notary URL: …` record.
    pub fn parse(row: &DataLogRow) -> Result<Self, SereboError> {
        let fields: Vec<&str> = row.description.split(" | ").collect();
        if fields.len() != 6 || fields[0] != NOTARY_NOTE_PREFIX {
            return Err(SereboError::Corruption(format!(
                "datalog row {} is not a notarization record",
                row.id
            )));
        }
        let part = |idx: usize, label: &str| -> Result<String, SereboError> {
            fields[idx]
                .strip_prefix(label)
                .map(str::to_string)
                .ok_or_else(|| {
                    SereboError::Corruption(format!(
                        "datalog row {}: malformed notarization field {idx}",
                        row.id
                    ))
                })
        };
        Ok(NotarizationNote {
            dtstamp: row.dtstamp.clone(),
            code_common: row.data.clone(),
            code_bb: part(1, "Black Box Code: ")?,
            dtstamp_bb: part(2, "Black Box Date Time: ")?,
            code_ns: part(3, "Notary Code: ")?,
            dtstamp_ns: part(4, "Notary Date Time: ")?,
            notary_url: part(5, "Notary URL: ")?,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::{insert_ftext, insert_text};
    use serebo_crypto::composite12;

    fn temp_box(name: &str) -> (BlackBox, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("serebo_query_test_{name}.sdb"));
        let _ = std::fs::remove_file(&path);
        (BlackBox::open(&path).expect("open temp store"), path)
    }

    #[test]
    fn exact_search_is_case_sensitive() {
        let (mut bb, path) = temp_box("exact");
        insert_text(&mut bb, "Result A", "d").unwrap();
        insert_text(&mut bb, "result a", "d").unwrap();
        let hits = search(&bb, SearchField::Data, "Result A", SearchMode::Exact).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].data, "Result A");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn like_search_honors_wildcards() {
        let (mut bb, path) = temp_box("like");
        insert_text(&mut bb, "run-007 complete", "d").unwrap();
        insert_text(&mut bb, "run-013 complete", "d").unwrap();
        insert_text(&mut bb, "setup complete", "d").unwrap();
        let hits = search(&bb, SearchField::Data, "run-0__ complete", SearchMode::Like).unwrap();
        assert_eq!(hits.len(), 2);
        let hits = search(&bb, SearchField::Data, "%complete", SearchMode::Like).unwrap();
        assert_eq!(hits.len(), 3);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn description_search_sees_the_suffixed_form() {
        let (mut bb, path) = temp_box("desc");
        insert_text(&mut bb, "m", "trial-9").unwrap();
        let hits = search(&bb, SearchField::Description, "trial-9:%", SearchMode::Like).unwrap();
        assert_eq!(hits.len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn file_search_finds_logged_content() {
        let (mut bb, path) = temp_box("filesearch");
        let file = std::env::temp_dir().join("serebo_query_test_payload.txt");
        std::fs::write(&file, b"the dataset").unwrap();
        crate::insert::log_file(&mut bb, &file, "ds").unwrap();
        let (hash, hits) = search_file(&bb, &file).unwrap();
        assert_eq!(hash, composite12(b"the dataset"));
        assert_eq!(hits.len(), 1);
        // Different content finds nothing.
        std::fs::write(&file, b"the dataset, edited").unwrap();
        let (_, hits) = search_file(&bb, &file).unwrap();
        assert!(hits.is_empty());
        let _ = std::fs::remove_file(file);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn notarization_views_split_by_prefix() {
        let (mut bb, path) = temp_box("views");
        insert_ftext(&mut bb, "c1", "Self notarization").unwrap();
        insert_ftext(&mut bb, "c2", "NTP server (self) notarization | NTP server: pool").unwrap();
        insert_ftext(
            &mut bb,
            "c3",
            "Notarization with SEREBO Notary | Black Box Code: b | Black Box Date Time: t1 | \
             Notary Code: n | Notary Date Time: t2 | Notary URL: http://n",
        )
        .unwrap();
        insert_text(&mut bb, "plain", "unrelated").unwrap();
        assert_eq!(self_notarizations(&bb).unwrap().len(), 1);
        assert_eq!(ntp_notarizations(&bb).unwrap().len(), 1);
        assert_eq!(notary_notarizations(&bb).unwrap().len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn notarization_note_round_trips_through_parse() {
        let (mut bb, path) = temp_box("parse");
        insert_ftext(
            &mut bb,
            "common-code",
            "Notarization with SEREBO Notary | Black Box Code: bbc | \
             Black Box Date Time: 2024:1:1:0:0:0:1 | Notary Code: nsc | \
             Notary Date Time: 2024:1:1:0:0:0:2 | Notary URL: http://notary",
        )
        .unwrap();
        let rows = notary_notarizations(&bb).unwrap();
        let note = NotarizationNote::parse(&rows[0]).unwrap();
        assert_eq!(note.code_common, "common-code");
        assert_eq!(note.code_bb, "bbc");
        assert_eq!(note.code_ns, "nsc");
        assert_eq!(note.dtstamp_bb, "2024:1:1:0:0:0:1");
        assert_eq!(note.dtstamp_ns, "2024:1:1:0:0:0:2");
        assert_eq!(note.notary_url, "http://notary");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn parse_rejects_non_notarization_rows() {
        let (mut bb, path) = temp_box("parsebad");
        insert_text(&mut bb, "m", "ordinary").unwrap();
        let rows = bb.datalog_rows().unwrap();
        assert!(NotarizationNote::parse(&rows[0]).is_err());
        let _ = std::fs::remove_file(path);
    }
}
