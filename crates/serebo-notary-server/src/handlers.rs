//! The four wire handlers. Every request — accepted or rejected — leaves
//! a pipe-separated line in the notary's own eventlog.

use std::sync::Mutex;

use tracing::{info, warn};

use serebo_core::constants::{
    NOTARY_AUTHORIZATION_LENGTH, NOTARY_CODE_LENGTH, NOT_REGISTERED_SENTINEL,
};
use serebo_core::time::dtstamp;
use serebo_core::SereboError;
use serebo_crypto::{composite6, random_string};
use serebo_notary::wire;

use crate::db::NotaryDb;

pub struct NotaryService {
    db: Mutex<NotaryDb>,
}

impl NotaryService {
    pub fn new(db: NotaryDb) -> Self {
        NotaryService { db: Mutex::new(db) }
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, SereboError> {
        Ok(Self::new(NotaryDb::open(path)?))
    }

    /// Handle one raw XML-RPC request body and produce the response body.
    /// Protocol-level rejections are XML-RPC faults; the sentinel triple
    /// for an unknown registration is a normal response by contract.
    pub fn handle(&self, body: &str) -> String {
        let (method, params) = match wire::decode_call(body) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                return wire::encode_fault(400, &format!("unparseable request: {e}"));
            }
        };
        let mut db = match self.db.lock() {
            Ok(db) => db,
            Err(_) => return wire::encode_fault(500, "notary state poisoned"),
        };
        match method.as_str() {
            "register_blackbox" => register_blackbox(&mut db, &params),
            "notarizeSereboBB" => notarize_serebo_bb(&mut db, &params),
            "checkBlackBoxRegistration" => check_registration(&mut db, &params),
            "checkNotarization" => check_notarization(&mut db, &params),
            "now" => wire::encode_response(&[&dtstamp()]),
            "randomString" => random_string_method(&params),
            other => {
                warn!(method = other, "unknown method");
                wire::encode_fault(404, &format!("unknown method {other}"))
            }
        }
    }
}

/// Utility method: a server-side random string, default length 16.
fn random_string_method(params: &[String]) -> String {
    let length = match params {
        [] => 16,
        [len] => match len.parse::<usize>() {
            Ok(len) => len,
            Err(_) => return wire::encode_fault(400, "randomString length must be an integer"),
        },
        _ => return wire::encode_fault(400, "randomString takes at most 1 argument"),
    };
    wire::encode_response(&[&random_string(length)])
}

fn log(db: &mut NotaryDb, now: &str, parts: &[&str]) {
    if let Err(e) = db.log_event(now, &parts.join(" | ")) {
        warn!(error = %e, "eventlog write failed");
    }
}

fn register_blackbox(db: &mut NotaryDb, params: &[String]) -> String {
    let now = dtstamp();
    let [blackbox_id, owner, email, architecture, machine, node, platform, processor] =
        match params {
            [a, b, c, d, e, f, g, h] => [a, b, c, d, e, f, g, h],
            _ => {
                log(db, &now, &["register_blackbox", "rejected", "wrong argument count"]);
                return wire::encode_fault(400, "register_blackbox takes 8 arguments");
            }
        };
    let authorization = random_string(NOTARY_AUTHORIZATION_LENGTH);
    match db.insert_registration(
        &now,
        blackbox_id,
        owner,
        email,
        architecture,
        machine,
        node,
        platform,
        processor,
        &authorization,
    ) {
        Ok(()) => {
            info!(owner, "black box registered");
            log(db, &now, &["register_blackbox", "registered", owner, email]);
            wire::encode_response(&[&authorization, &now])
        }
        Err(SereboError::AlreadyRegistered { .. }) => {
            log(db, &now, &["register_blackbox", "rejected", "duplicate blackboxID"]);
            wire::encode_fault(409, "blackboxID is already registered")
        }
        Err(e) => {
            log(db, &now, &["register_blackbox", "failed", &e.to_string()]);
            wire::encode_fault(500, &e.to_string())
        }
    }
}

fn notarize_serebo_bb(db: &mut NotaryDb, params: &[String]) -> String {
    let now = dtstamp();
    let [blackbox_id, authorization, dtstamp_bb, code_bb] = match params {
        [a, b, c, d] => [a, b, c, d],
        _ => {
            log(db, &now, &["notarizeSereboBB", "rejected", "wrong argument count"]);
            return wire::encode_fault(400, "notarizeSereboBB takes 4 arguments");
        }
    };
    match db.registration_exists(blackbox_id, authorization) {
        Ok(true) => {}
        Ok(false) => {
            log(db, &now, &["notarizeSereboBB", "rejected", "not registered"]);
            return wire::encode_response(&[
                NOT_REGISTERED_SENTINEL,
                NOT_REGISTERED_SENTINEL,
                NOT_REGISTERED_SENTINEL,
            ]);
        }
        Err(e) => {
            log(db, &now, &["notarizeSereboBB", "failed", &e.to_string()]);
            return wire::encode_fault(500, &e.to_string());
        }
    }
    let code_ns = random_string(NOTARY_CODE_LENGTH);
    let code_common = composite6(format!("{code_bb}{code_ns}").as_bytes());
    match db.insert_notarization(
        blackbox_id,
        authorization,
        dtstamp_bb,
        &now,
        code_bb,
        &code_ns,
        &code_common,
    ) {
        Ok(()) => {
            info!("notarization recorded");
            log(db, &now, &["notarizeSereboBB", "notarized", code_bb, &code_ns]);
            wire::encode_response(&[&now, &code_ns, &code_common])
        }
        Err(e) => {
            log(db, &now, &["notarizeSereboBB", "failed", &e.to_string()]);
            wire::encode_fault(500, &e.to_string())
        }
    }
}

fn check_registration(db: &mut NotaryDb, params: &[String]) -> String {
    let now = dtstamp();
    let [blackbox_id, authorization] = match params {
        [a, b] => [a, b],
        _ => {
            log(db, &now, &["checkBlackBoxRegistration", "rejected", "wrong argument count"]);
            return wire::encode_fault(400, "checkBlackBoxRegistration takes 2 arguments");
        }
    };
    match db.registration_exists(blackbox_id, authorization) {
        Ok(found) => {
            let verdict = if found { "True" } else { "False" };
            log(db, &now, &["checkBlackBoxRegistration", "checked", verdict]);
            wire::encode_response(&[verdict])
        }
        Err(e) => {
            log(db, &now, &["checkBlackBoxRegistration", "failed", &e.to_string()]);
            wire::encode_fault(500, &e.to_string())
        }
    }
}

fn check_notarization(db: &mut NotaryDb, params: &[String]) -> String {
    let now = dtstamp();
    let [blackbox_id, authorization, code_bb, code_ns, code_common] = match params {
        [a, b, c, d, e] => [a, b, c, d, e],
        _ => {
            log(db, &now, &["checkNotarization", "rejected", "wrong argument count"]);
            return wire::encode_fault(400, "checkNotarization takes 5 arguments");
        }
    };
    match db.notarization_exists(blackbox_id, authorization, code_bb, code_ns, code_common) {
        Ok(found) => {
            let verdict = if found { "True" } else { "False" };
            log(db, &now, &["checkNotarization", "checked", verdict]);
            wire::encode_response(&[verdict])
        }
        Err(e) => {
            log(db, &now, &["checkNotarization", "failed", &e.to_string()]);
            wire::encode_fault(500, &e.to_string())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
