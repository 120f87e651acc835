pub mod client;
pub mod ops;
pub mod wire;

pub use client::{NotarizeReply, NotaryClient, RegistrationRequest};
pub use ops::{
    audit_notarizations, audit_register, notarize, register, NotarizationCheck,
    NotarizationStatus, NotarizeOutcome, RegisterOutcome,
};
