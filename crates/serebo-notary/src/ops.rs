//! Register / notarize / audit flows: remote handshake first, local record
//! only on success, so a failed or half-finished RPC never mutates the
//! black box.

use tracing::{info, warn};

use serebo_core::constants::{
    NOTARY_CODE_LENGTH, NOTARY_NOTE_PREFIX, REGISTER_NOTE_MESSAGE,
};
use serebo_core::time::dtstamp;
use serebo_core::types::InsertReceipt;
use serebo_core::SereboError;
use serebo_crypto::random_string;
use serebo_ledger::insert::insert_ftext;
use serebo_ledger::query::{notary_notarizations, NotarizationNote};
use serebo_ledger::sysinfo::system_data;
use serebo_store::BlackBox;

use crate::client::{NotaryClient, RegistrationRequest};

/// Everything a successful registration produced.
#[derive(Clone, Debug)]
pub struct RegisterOutcome {
    pub blackbox_id: String,
    pub notary_url: String,
    pub notary_authorization: String,
    pub notary_dts: String,
    pub receipt: InsertReceipt,
}

/// Register this black box with the notary at `notary_url` and record the
/// registration locally under `alias`.
pub fn register(
    bb: &mut BlackBox,
    alias: &str,
    owner: &str,
    email: &str,
    notary_url: &str,
) -> Result<RegisterOutcome, SereboError> {
    let blackbox_id = bb.blackbox_id()?;
    let fingerprint = system_data();
    let client = NotaryClient::new(notary_url)?;
    let request = RegistrationRequest {
        blackbox_id: blackbox_id.clone(),
        owner: owner.to_string(),
        email: email.to_string(),
        architecture: fingerprint.architecture,
        machine: fingerprint.machine,
        node: fingerprint.node,
        platform: fingerprint.platform,
        processor: fingerprint.processor,
    };
    let (authorization, notary_dts) = client.register_blackbox(&request)?;

    // Remote success — now the local row and the audit record.
    bb.insert_registration(
        &dtstamp(),
        alias,
        owner,
        email,
        &notary_dts,
        &authorization,
        notary_url,
    )?;
    let description = [
        format!("Notary URL: {notary_url}"),
        format!("Notary Authorization: {authorization}"),
        format!("Notary Date Time Stamp: {notary_dts}"),
    ]
    .join(" | ");
    let receipt = insert_ftext(bb, REGISTER_NOTE_MESSAGE, &description)?;
    info!(alias, notary_url, "black box registered with notary");
    Ok(RegisterOutcome {
        blackbox_id,
        notary_url: notary_url.to_string(),
        notary_authorization: authorization,
        notary_dts,
        receipt,
    })
}

/// Everything a successful notarization produced.
#[derive(Clone, Debug)]
pub struct NotarizeOutcome {
    pub alias: String,
    pub notary_url: String,
    pub dtstamp_bb: String,
    pub code_bb: String,
    pub dtstamp_ns: String,
    pub code_ns: String,
    pub code_common: String,
    pub receipt: InsertReceipt,
}

/// Cross-sign the ledger head with the notary registered under `alias`.
/// The local record (data = codeCommon) is only written after the notary
/// replied.
pub fn notarize(bb: &mut BlackBox, alias: &str) -> Result<NotarizeOutcome, SereboError> {
    let blackbox_id = bb.blackbox_id()?;
    let registration = bb
        .registration_by_alias(alias)?
        .ok_or_else(|| SereboError::NotFound(format!("no notary registration with alias {alias}")))?;
    let client = NotaryClient::new(&registration.notary_url)?;

    let dtstamp_bb = dtstamp();
    let code_bb = random_string(NOTARY_CODE_LENGTH);
    let reply = client.notarize_blackbox(
        &blackbox_id,
        &registration.notary_authorization,
        &dtstamp_bb,
        &code_bb,
    )?;

    let description = [
        NOTARY_NOTE_PREFIX.to_string(),
        format!("Black Box Code: {code_bb}"),
        format!("Black Box Date Time: {dtstamp_bb}"),
        format!("Notary Code: {}", reply.code_ns),
        format!("Notary Date Time: {}", reply.dtstamp_ns),
        format!("Notary URL: {}", registration.notary_url),
    ]
    .join(" | ");
    let receipt = insert_ftext(bb, &reply.code_common, &description)?;
    info!(alias, notary_url = %registration.notary_url, "ledger head notarized");
    Ok(NotarizeOutcome {
        alias: alias.to_string(),
        notary_url: registration.notary_url,
        dtstamp_bb,
        code_bb,
        dtstamp_ns: reply.dtstamp_ns,
        code_ns: reply.code_ns,
        code_common: reply.code_common,
        receipt,
    })
}

/// Ask the notary whether the registration stored under `alias` is still
/// on file. Read-only on both sides.
pub fn audit_register(bb: &BlackBox, alias: &str) -> Result<bool, SereboError> {
    let blackbox_id = bb.blackbox_id()?;
    let registration = bb
        .registration_by_alias(alias)?
        .ok_or_else(|| SereboError::NotFound(format!("no notary registration with alias {alias}")))?;
    let client = NotaryClient::new(&registration.notary_url)?;
    client.check_registration(&blackbox_id, &registration.notary_authorization)
}

/// Verdict on one stored notarization record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotarizationStatus {
    Found,
    NotFound,
    /// Network or protocol failure — says nothing about the record.
    Unavailable(String),
}

#[derive(Clone, Debug)]
pub struct NotarizationCheck {
    pub note: NotarizationNote,
    pub status: NotarizationStatus,
}

/// Re-verify every stored remote notarization against its notary. Each
/// record is checked independently; a dead notary marks its records
/// `Unavailable` and the sweep continues.
pub fn audit_notarizations(bb: &BlackBox) -> Result<Vec<NotarizationCheck>, SereboError> {
    let blackbox_id = bb.blackbox_id()?;
    let mut checks = Vec::new();
    for row in notary_notarizations(bb)? {
        let note = NotarizationNote::parse(&row)?;
        let status = match bb.registration_by_url(&note.notary_url)? {
            None => NotarizationStatus::Unavailable(format!(
                "no local registration for notary {}",
                note.notary_url
            )),
            Some(registration) => {
                match NotaryClient::new(&note.notary_url).and_then(|client| {
                    client.check_notarization(
                        &blackbox_id,
                        &registration.notary_authorization,
                        &note.code_bb,
                        &note.code_ns,
                        &note.code_common,
                    )
                }) {
                    Ok(true) => NotarizationStatus::Found,
                    Ok(false) => NotarizationStatus::NotFound,
                    Err(e) => {
                        warn!(url = %note.notary_url, error = %e, "notarization check failed");
                        NotarizationStatus::Unavailable(e.to_string())
                    }
                }
            }
        };
        checks.push(NotarizationCheck { note, status });
    }
    Ok(checks)
}
