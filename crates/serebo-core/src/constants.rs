//! ─── SEREBO Black Box Constants ─────────────────────────────────────────────
//!
//! "Given a set of data files, is there a system to log and verify that
//! these files had not been changed since their supposed creation?"
//!
//! The genesis parent fields, the random-string alphabet, the metadata
//! keys and the datamap keys below are part of the on-disk format. A
//! store written by one build must audit cleanly under every other.

// ── Genesis parent ───────────────────────────────────────────────────────────

/// Parent block ID used by the very first real block.
pub const GENESIS_PARENT_ID: i64 = 0;

/// Parent dtstamp of the genesis parent. A literal, not a real timestamp.
pub const GENESIS_PARENT_DTSTAMP: &str = "0";

/// Parent random string of the genesis parent.
pub const GENESIS_PARENT_RANDOM_STRING: &str = "GenesisBlock:SEREBO_MauriceHTLing";

/// Parent hash of the genesis parent. Chained into block 1's hash, so the
/// token is as load-bearing as any computed digest.
pub const GENESIS_PARENT_HASH: &str = "TheWord:OmAhHum";

// ── Random strings ───────────────────────────────────────────────────────────

/// Canonical 80-character alphabet for all new random-string draws.
///
/// A legacy writer used a 74-character alphabet; stores it produced stay
/// readable because the alphabet only governs new draws, never validation.
pub const RANDOM_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789~!@#$%^&*()<>=+[]?";

/// Length of the blackboxID drawn once at store creation.
pub const BLACKBOX_ID_LENGTH: usize = 512;

/// Length of the per-block chain nonce (c_randomstring).
pub const BLOCK_NONCE_LENGTH: usize = 32;

/// Length of the random suffix appended to text-mode descriptions.
pub const DESCRIPTION_SUFFIX_LENGTH: usize = 10;

/// Length of the eventlog fID keying the per-event value map.
pub const EVENT_FID_LENGTH: usize = 10;

/// Length of the authorization code a notary issues on registration.
pub const NOTARY_AUTHORIZATION_LENGTH: usize = 256;

/// Length of the nonces both sides draw during notarization.
pub const NOTARY_CODE_LENGTH: usize = 32;

// ── Metadata keys ────────────────────────────────────────────────────────────

pub const META_CREATION_TIMESTAMP: &str = "creation_timestamp";
pub const META_BLACKBOX_ID: &str = "blackboxID";
pub const META_BLACKBOX_PATH: &str = "serebo_blackbox_path";

// ── Eventlog datamap keys ────────────────────────────────────────────────────

pub const MAP_KEY_DATA_HASH: &str = "DataHash";
pub const MAP_KEY_PARENT_HASH: &str = "ParentHash";
pub const MAP_KEY_BLOCK_HASH: &str = "BlockHash";

// ── Notarization description prefixes ────────────────────────────────────────

/// Description prefix written by a local self-signing event.
pub const SELF_NOTE_PREFIX: &str = "Self notarization";

/// Description prefix written by an NTP-anchored self-signing event.
pub const NTP_NOTE_PREFIX: &str = "NTP server (self) notarization";

/// Description prefix written by a successful remote notarization.
pub const NOTARY_NOTE_PREFIX: &str = "Notarization with SEREBO Notary";

/// Description prefix written by a successful notary registration.
pub const REGISTER_NOTE_MESSAGE: &str = "Register SEREBO Black Box with SEREBO Notary";

// ── Defaults ─────────────────────────────────────────────────────────────────

/// Default description when the caller supplies none.
pub const DEFAULT_DESCRIPTION: &str = "NA";

/// Default remote notary endpoint, overridable per registration.
pub const DEFAULT_NOTARY_URL: &str =
    "https://mauricelab.pythonanywhere.com/serebo_notary/services/call/xmlrpc";

/// Sentinel value the notary returns (as every element of the triple) when
/// a notarization request carries an unknown (blackboxID, authorization).
pub const NOT_REGISTERED_SENTINEL: &str = "not registered";
