//! Platform fingerprint: what machine wrote this record, recorded into the
//! systemdata table so later audits can tie records to an environment.

use serde::Serialize;

use serebo_core::time::dtstamp;
use serebo_core::SereboError;
use serebo_crypto::composite12;
use serebo_store::BlackBox;

/// Names of the twelve digests, in composite order. Used to label the
/// per-digest systemdata rows.
const DIGEST_NAMES: [&str; 12] = [
    "hash_md5",
    "hash_sha1",
    "hash_sha224",
    "hash_sha3_224",
    "hash_sha256",
    "hash_sha3_256",
    "hash_sha384",
    "hash_sha3_384",
    "hash_sha512",
    "hash_sha3_512",
    "hash_blake2b",
    "hash_blake2s",
];

/// The platform fingerprint plus its hashes.
#[derive(Clone, Debug, Serialize)]
pub struct SystemData {
    pub architecture: String,
    pub machine: String,
    pub node: String,
    pub platform: String,
    pub processor: String,
    pub system: String,
    /// The joined fingerprint string the digests are computed over.
    pub hashdata: String,
    /// (digest name, lowercase hex digest), in composite order.
    pub digests: Vec<(String, String)>,
}

impl SystemData {
    /// Fingerprint key/value pairs in stable order, without the digests.
    pub fn fingerprint_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("architecture".into(), self.architecture.clone()),
            ("machine".into(), self.machine.clone()),
            ("node".into(), self.node.clone()),
            ("platform".into(), self.platform.clone()),
            ("processor".into(), self.processor.clone()),
            ("system".into(), self.system.clone()),
        ]
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Collect the current platform fingerprint and hash it.
pub fn system_data() -> SystemData {
    let architecture = std::env::consts::ARCH.to_string();
    let machine = std::env::consts::ARCH.to_string();
    let node = hostname();
    let platform = format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH);
    let processor = std::env::consts::ARCH.to_string();
    let system = std::env::consts::OS.to_string();
    let hashdata = [
        architecture.as_str(),
        machine.as_str(),
        node.as_str(),
        platform.as_str(),
        processor.as_str(),
        system.as_str(),
    ]
    .join(":");
    let composite = composite12(hashdata.as_bytes());
    let digests = DIGEST_NAMES
        .iter()
        .zip(composite.split(':'))
        .map(|(name, hex)| (name.to_string(), hex.to_string()))
        .collect();
    SystemData {
        architecture,
        machine,
        node,
        platform,
        processor,
        system,
        hashdata,
        digests,
    }
}

/// Record the fingerprint and its digests into systemdata, one row per
/// key, all at a single dtstamp. Returns the dtstamp used.
pub fn record_system_data(bb: &mut BlackBox) -> Result<(String, SystemData), SereboError> {
    let data = system_data();
    let dt = dtstamp();
    let mut pairs = data.fingerprint_pairs();
    pairs.extend(data.digests.iter().cloned());
    bb.record_system_data(&dt, &pairs)?;
    Ok((dt, data))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
