//! Client side of the notary handshake.
//!
//! Every operation is a single XML-RPC POST wrapped in a failure boundary:
//! transport errors, HTTP errors and malformed payloads surface as
//! `RemoteUnavailable` and never mutate the local store.

use std::time::Duration;

use tracing::debug;

use serebo_core::constants::NOT_REGISTERED_SENTINEL;
use serebo_core::SereboError;

use crate::wire::{self, WireError};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// What a call produced before protocol-level interpretation.
enum RpcOutcome {
    Values(Vec<String>),
    Fault { code: i64, message: String },
}

/// The platform identity sent along with a registration.
#[derive(Clone, Debug)]
pub struct RegistrationRequest {
    pub blackbox_id: String,
    pub owner: String,
    pub email: String,
    pub architecture: String,
    pub machine: String,
    pub node: String,
    pub platform: String,
    pub processor: String,
}

/// A successful notarization reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotarizeReply {
    pub dtstamp_ns: String,
    pub code_ns: String,
    pub code_common: String,
}

pub struct NotaryClient {
    url: String,
    http: reqwest::blocking::Client,
}

impl NotaryClient {
    pub fn new(url: &str) -> Result<Self, SereboError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| SereboError::remote(url, e))?;
        Ok(NotaryClient {
            url: url.to_string(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn call(&self, method: &str, params: &[&str]) -> Result<RpcOutcome, SereboError> {
        debug!(method, url = %self.url, "notary RPC");
        let body = wire::encode_call(method, params);
        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .map_err(|e| SereboError::remote(&self.url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SereboError::remote(&self.url, format!("HTTP {status}")));
        }
        let text = response
            .text()
            .map_err(|e| SereboError::remote(&self.url, e))?;
        match wire::decode_response(&text) {
            Ok(values) => Ok(RpcOutcome::Values(values)),
            Err(WireError::Fault { code, message }) => Ok(RpcOutcome::Fault { code, message }),
            Err(e @ WireError::Malformed(_)) => Err(SereboError::remote(&self.url, e)),
        }
    }

    /// Register this black box. Returns (notaryAuthorization, notaryDTS).
    /// A server fault means the blackboxID was already registered there.
    pub fn register_blackbox(
        &self,
        req: &RegistrationRequest,
    ) -> Result<(String, String), SereboError> {
        let outcome = self.call(
            "register_blackbox",
            &[
                &req.blackbox_id,
                &req.owner,
                &req.email,
                &req.architecture,
                &req.machine,
                &req.node,
                &req.platform,
                &req.processor,
            ],
        )?;
        match outcome {
            RpcOutcome::Values(values) => match <[String; 2]>::try_from(values) {
                Ok([authorization, dtstamp]) => Ok((authorization, dtstamp)),
                Err(values) => Err(SereboError::remote(
                    &self.url,
                    format!("register_blackbox returned {} values, expected 2", values.len()),
                )),
            },
            RpcOutcome::Fault { .. } => Err(SereboError::AlreadyRegistered {
                blackbox_id: req.blackbox_id.clone(),
            }),
        }
    }

    /// Ask the notary to co-sign. Returns the notary's timestamp, nonce and
    /// the cross-signing code. The sentinel triple means the notary does
    /// not know this (blackboxID, authorization) pair.
    pub fn notarize_blackbox(
        &self,
        blackbox_id: &str,
        authorization: &str,
        dtstamp_bb: &str,
        code_bb: &str,
    ) -> Result<NotarizeReply, SereboError> {
        let outcome = self.call(
            "notarizeSereboBB",
            &[blackbox_id, authorization, dtstamp_bb, code_bb],
        )?;
        let values = match outcome {
            RpcOutcome::Values(values) => values,
            RpcOutcome::Fault { code, message } => {
                return Err(SereboError::remote(&self.url, format!("fault {code}: {message}")))
            }
        };
        match <[String; 3]>::try_from(values) {
            Ok([dtstamp_ns, code_ns, code_common]) => {
                if dtstamp_ns == NOT_REGISTERED_SENTINEL
                    && code_ns == NOT_REGISTERED_SENTINEL
                    && code_common == NOT_REGISTERED_SENTINEL
                {
                    return Err(SereboError::NotRegistered {
                        url: self.url.clone(),
                    });
                }
                Ok(NotarizeReply {
                    dtstamp_ns,
                    code_ns,
                    code_common,
                })
            }
            Err(values) => Err(SereboError::remote(
                &self.url,
                format!("notarizeSereboBB returned {} values, expected 3", values.len()),
            )),
        }
    }

    /// Whether the notary holds a registration for this pair.
    pub fn check_registration(
        &self,
        blackbox_id: &str,
        authorization: &str,
    ) -> Result<bool, SereboError> {
        self.boolean_call("checkBlackBoxRegistration", &[blackbox_id, authorization])
    }

    /// Whether the notary holds a matching notarization record.
    pub fn check_notarization(
        &self,
        blackbox_id: &str,
        authorization: &str,
        code_bb: &str,
        code_ns: &str,
        code_common: &str,
    ) -> Result<bool, SereboError> {
        self.boolean_call(
            "checkNotarization",
            &[blackbox_id, authorization, code_bb, code_ns, code_common],
        )
    }

    fn boolean_call(&self, method: &str, params: &[&str]) -> Result<bool, SereboError> {
        match self.call(method, params)? {
            RpcOutcome::Values(values) => match values.first().map(String::as_str) {
                Some("True") => Ok(true),
                Some("False") => Ok(false),
                other => Err(SereboError::remote(
                    &self.url,
                    format!("{method} returned {other:?}, expected True/False"),
                )),
            },
            RpcOutcome::Fault { code, message } => {
                Err(SereboError::remote(&self.url, format!("fault {code}: {message}")))
            }
        }
    }
}
