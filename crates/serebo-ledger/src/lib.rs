pub mod audit;
pub mod insert;
pub mod query;
pub mod sysinfo;

pub use audit::{
    audit_blockchainflow, audit_blockchainhash, audit_count, audit_data_blockchain,
    audit_datahash, check_hash, dump_hash, AuditReport, RecordCheck,
};
pub use insert::{insert_ftext, insert_text, log_file};
pub use query::{
    notary_notarizations, ntp_notarizations, search, search_file, self_notarizations,
    NotarizationNote, SearchMode,
};
pub use sysinfo::{record_system_data, system_data, SystemData};
