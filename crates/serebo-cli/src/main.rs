//! serebo — command-line surface of the SEREBO black box.
//!
//! Usage:
//!   serebo init        [--bbpath <path>]
//!   serebo intext      --message <text> [--description <text>] [--bbpath <path>]
//!   serebo logfile     --filepath <file> [--description <text>] [--bbpath <path>]
//!   serebo selfsign    [--bbpath <path>]
//!   serebo ntpsign     [--server <host:port>] [--bbpath <path>]
//!   serebo register    --alias <name> --owner <name> --email <email> [--notary-url <url>]
//!   serebo notarizebb  --alias <name>
//!   serebo audit_count [--bbpath <path>]        (and the other audit_* commands)
//!   serebo dumphash    --target <file>
//!   serebo checkhash   --source <file>
//!   serebo backup      --target <file>
//!
//! Every command exits 0 on success and nonzero on any unrecovered error,
//! including an audit that found discrepancies.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use serebo_core::constants::{DEFAULT_NOTARY_URL, NTP_NOTE_PREFIX, SELF_NOTE_PREFIX};
use serebo_core::time::{dtstamp, dtstamp_from_epoch};
use serebo_core::types::{DataLogRow, InsertReceipt};
use serebo_crypto::{composite12, file_composite12, random_string};
use serebo_ledger::{
    audit_blockchainflow, audit_blockchainhash, audit_count, audit_data_blockchain,
    audit_datahash, check_hash, dump_hash, insert_ftext, insert_text, log_file,
    notary_notarizations, ntp_notarizations, record_system_data, search, search_file,
    self_notarizations, system_data, AuditReport, NotarizationNote, SearchMode, SystemData,
};
use serebo_notary::{
    audit_notarizations, audit_register, notarize, register, NotarizationStatus,
};
use serebo_store::{BlackBox, SearchField};

mod ntp;

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "serebo",
    version,
    about = "SEREBO — secured recorder box for tamper-evident research records"
)]
struct Args {
    /// Path to the SEREBO black box.
    #[arg(long, global = true, default_value = "serebo_blackbox/blackbox.sdb")]
    bbpath: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Exact, case-sensitive match.
    Exact,
    /// SQL LIKE pattern: `_` one character, `%` any run.
    Like,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> SearchMode {
        match mode {
            Mode::Exact => SearchMode::Exact,
            Mode::Like => SearchMode::Like,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create (or open) the black box and print its identity.
    Init,

    /// Insert a text message.
    Intext {
        /// Text message to record.
        #[arg(long)]
        message: String,
        /// Explanation for this entry.
        #[arg(long, default_value = "NA")]
        description: String,
    },

    /// Log a file: its streamed hash composite is recorded, not its content.
    Logfile {
        /// Path of the file to log.
        #[arg(long)]
        filepath: PathBuf,
        /// Explanation for this entry.
        #[arg(long, default_value = "NA")]
        description: String,
    },

    /// Print the current platform fingerprint and its hashes (no write).
    Sysdata,

    /// Record the platform fingerprint into the systemdata table.
    Sysrecord,

    /// Print the hash composite of a file (no write).
    Fhash {
        #[arg(long)]
        filepath: PathBuf,
    },

    /// Generate a random string and log the generation event.
    Localcode {
        /// Length of the random string.
        #[arg(long)]
        length: usize,
        /// Explanation for this generation.
        #[arg(long, default_value = "NA")]
        description: String,
    },

    /// Print the current canonical dtstamp (no write).
    Localdts,

    /// Print the hash composite of a string (no write).
    Shash {
        #[arg(long)]
        dstring: String,
    },

    /// Self-sign: record a fresh 32-char code under "Self notarization".
    Selfsign,

    /// NTP-sign: record an NTP-attested timestamp.
    Ntpsign {
        /// NTP server to query.
        #[arg(long, default_value = "pool.ntp.org:123")]
        server: String,
    },

    /// Register this black box with a SEREBO Notary.
    Register {
        /// Local alias for this notary.
        #[arg(long)]
        alias: String,
        /// Owner's or administrator's name.
        #[arg(long)]
        owner: String,
        /// Owner's or administrator's email.
        #[arg(long)]
        email: String,
        /// Notary web-service URL.
        #[arg(long, default_value = DEFAULT_NOTARY_URL)]
        notary_url: String,
    },

    /// Notarize the ledger head with a registered notary.
    Notarizebb {
        #[arg(long)]
        alias: String,
    },

    /// View all notary registrations (no write).
    Viewreg,

    /// View self-notarization records (no write).
    Viewselfnote,

    /// View NTP notarization records (no write).
    Viewntpnote,

    /// View remote notarization records (no write).
    Viewsnnote,

    /// Rename a notary registration.
    Changealias {
        /// Current alias.
        #[arg(long)]
        alias: String,
        /// New alias.
        #[arg(long)]
        newalias: String,
    },

    /// Search datalog messages (the data column).
    Searchmsg {
        #[arg(long)]
        term: String,
        #[arg(long, value_enum, default_value = "exact")]
        mode: Mode,
    },

    /// Search datalog descriptions.
    Searchdesc {
        #[arg(long)]
        term: String,
        #[arg(long, value_enum, default_value = "exact")]
        mode: Mode,
    },

    /// Hash a file and search datalog for it.
    Searchfile {
        #[arg(long)]
        filepath: PathBuf,
    },

    /// Audit: datalog and blockchain row counts and dtstamps pair up.
    #[command(name = "audit_count")]
    AuditCount,

    /// Audit: every datalog hash recomputes from its row.
    #[command(name = "audit_datahash")]
    AuditDatahash,

    /// Audit: every block carries its datalog row's hash.
    #[command(name = "audit_data_blockchain")]
    AuditDataBlockchain,

    /// Audit: every block hash recomputes from its parent fields.
    #[command(name = "audit_blockchainhash")]
    AuditBlockchainhash,

    /// Audit: every block's parent fields match its predecessor.
    #[command(name = "audit_blockchainflow")]
    AuditBlockchainflow,

    /// Ask the notary whether a registration is still on file.
    #[command(name = "audit_register")]
    AuditRegister {
        #[arg(long)]
        alias: String,
    },

    /// Re-verify every stored notarization against its notary.
    #[command(name = "audit_notarizebb")]
    AuditNotarizebb,

    /// Write `id | dtstamp | hash` for every datalog row.
    Dumphash {
        #[arg(long)]
        target: PathBuf,
    },

    /// Verify a hash-dump file against the store.
    Checkhash {
        #[arg(long)]
        source: PathBuf,
    },

    /// Snapshot the store file while holding the write lock.
    Backup {
        #[arg(long)]
        target: PathBuf,
    },

    /// Print every table's contents.
    Dump,
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,serebo=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let bbpath = args.bbpath;

    match args.command {
        Command::Init => {
            let bb = open(&bbpath)?;
            kv("Black Box Path", bb.path().display());
            kv("Black Box ID", bb.blackbox_id()?);
            Ok(())
        }
        Command::Intext { message, description } => {
            let mut bb = open(&bbpath)?;
            let receipt = insert_text(&mut bb, &message, &description)?;
            println!("Insert Text Status ...");
            print_receipt(&receipt);
            Ok(())
        }
        Command::Logfile { filepath, description } => {
            let mut bb = open(&bbpath)?;
            let receipt = log_file(&mut bb, &filepath, &description)?;
            println!("File Logging Status ...");
            print_receipt(&receipt);
            Ok(())
        }
        Command::Sysdata => {
            print_system_data(&system_data());
            Ok(())
        }
        Command::Sysrecord => {
            let mut bb = open(&bbpath)?;
            let (dt, data) = record_system_data(&mut bb)?;
            kv("Date Time Stamp", dt);
            print_system_data(&data);
            Ok(())
        }
        Command::Fhash { filepath } => {
            kv("File Path", filepath.display());
            kv("File Hash", file_composite12(&filepath)?);
            Ok(())
        }
        Command::Localcode { length, description } => {
            let mut bb = open(&bbpath)?;
            let rstring = random_string(length);
            let description = format!("Local random string generation | {description}");
            let receipt = insert_ftext(&mut bb, &rstring, &description)?;
            println!("Generate Random String (Local) ...");
            kv("Date Time Stamp", receipt.dtstamp);
            kv("Random String", rstring);
            Ok(())
        }
        Command::Localdts => {
            kv("Date Time Stamp", dtstamp());
            Ok(())
        }
        Command::Shash { dstring } => {
            kv("Data String", &dstring);
            kv("Data Hash", composite12(dstring.as_bytes()));
            Ok(())
        }
        Command::Selfsign => {
            let mut bb = open(&bbpath)?;
            let code = random_string(32);
            let receipt = insert_ftext(&mut bb, &code, SELF_NOTE_PREFIX)?;
            println!("Self-Signing / Self-Notarization ...");
            kv("Date Time Stamp", receipt.dtstamp);
            kv("Random String", code);
            Ok(())
        }
        Command::Ntpsign { server } => {
            let mut bb = open(&bbpath)?;
            let epoch = ntp::query(&server, Duration::from_secs(10))?;
            let ntp_dts = dtstamp_from_epoch(epoch)
                .with_context(|| format!("NTP time {epoch} out of range"))?;
            let description = format!("{NTP_NOTE_PREFIX} | NTP server: {server}");
            let receipt = insert_ftext(&mut bb, &ntp_dts, &description)?;
            println!("NTP-Anchored Self-Notarization ...");
            kv("Date Time Stamp", receipt.dtstamp);
            kv("NTP Server", server);
            kv("NTP Date Time Stamp", ntp_dts);
            Ok(())
        }
        Command::Register { alias, owner, email, notary_url } => {
            let mut bb = open(&bbpath)?;
            let outcome = register(&mut bb, &alias, &owner, &email, &notary_url)?;
            println!("Registering SEREBO Black Box with SEREBO Notary ...");
            kv("Black Box ID", outcome.blackbox_id);
            kv("Notary URL", outcome.notary_url);
            kv("Notary Authorization", outcome.notary_authorization);
            kv("Notary Date Time Stamp", outcome.notary_dts);
            Ok(())
        }
        Command::Notarizebb { alias } => {
            let mut bb = open(&bbpath)?;
            let outcome = notarize(&mut bb, &alias)?;
            println!("Notarizing SEREBO Black Box with SEREBO Notary ...");
            kv("Notary Alias", outcome.alias);
            kv("Notary URL", outcome.notary_url);
            kv("Date Time Stamp", outcome.dtstamp_bb);
            kv("Black Box Code", outcome.code_bb);
            kv("Notary Date Time Stamp", outcome.dtstamp_ns);
            kv("Notary Code", outcome.code_ns);
            kv("Cross-Signing Code", outcome.code_common);
            Ok(())
        }
        Command::Viewreg => {
            let bb = open(&bbpath)?;
            println!("Notary Registration(s) ...");
            for reg in bb.registrations()? {
                println!();
                kv("Date Time Stamp", reg.dtstamp);
                kv("Notary Alias", reg.alias);
                kv("Owner", reg.owner);
                kv("Email", reg.email);
                kv("Notary Date Time Stamp", reg.notary_dts);
                kv("Notary Authorization", reg.notary_authorization);
                kv("Notary URL", reg.notary_url);
            }
            Ok(())
        }
        Command::Viewselfnote => {
            let bb = open(&bbpath)?;
            println!("Self Notarization(s) ...");
            print_rows(&self_notarizations(&bb)?);
            Ok(())
        }
        Command::Viewntpnote => {
            let bb = open(&bbpath)?;
            println!("NTP Notarization(s) ...");
            print_rows(&ntp_notarizations(&bb)?);
            Ok(())
        }
        Command::Viewsnnote => {
            let bb = open(&bbpath)?;
            println!("Notarization(s) by SEREBO Notary(ies) ...");
            for row in notary_notarizations(&bb)? {
                println!();
                match NotarizationNote::parse(&row) {
                    Ok(note) => {
                        kv("Date Time Stamp", note.dtstamp);
                        kv("Common Code", note.code_common);
                        kv("Black Box Code", note.code_bb);
                        kv("Black Box Date Time", note.dtstamp_bb);
                        kv("Notary Code", note.code_ns);
                        kv("Notary Date Time", note.dtstamp_ns);
                        kv("Notary URL", note.notary_url);
                    }
                    Err(_) => print_rows(&[row]),
                }
            }
            Ok(())
        }
        Command::Changealias { alias, newalias } => {
            let mut bb = open(&bbpath)?;
            bb.change_alias(&alias, &newalias)?;
            let message = format!("Change notary alias from {alias} to {newalias}");
            insert_ftext(&mut bb, &message, "NA")?;
            kv("Alias", alias);
            kv("New Alias", newalias);
            Ok(())
        }
        Command::Searchmsg { term, mode } => {
            let bb = open(&bbpath)?;
            print_rows(&search(&bb, SearchField::Data, &term, mode.into())?);
            Ok(())
        }
        Command::Searchdesc { term, mode } => {
            let bb = open(&bbpath)?;
            print_rows(&search(&bb, SearchField::Description, &term, mode.into())?);
            Ok(())
        }
        Command::Searchfile { filepath } => {
            let bb = open(&bbpath)?;
            let (hash, rows) = search_file(&bb, &filepath)?;
            kv("File Path", filepath.display());
            kv("File Hash", hash);
            print_rows(&rows);
            Ok(())
        }
        Command::AuditCount => report(audit_count(&open(&bbpath)?)?),
        Command::AuditDatahash => report(audit_datahash(&open(&bbpath)?)?),
        Command::AuditDataBlockchain => report(audit_data_blockchain(&open(&bbpath)?)?),
        Command::AuditBlockchainhash => report(audit_blockchainhash(&open(&bbpath)?)?),
        Command::AuditBlockchainflow => report(audit_blockchainflow(&open(&bbpath)?)?),
        Command::AuditRegister { alias } => {
            let bb = open(&bbpath)?;
            println!("Checking SEREBO Black Box registration in SEREBO Notary ...");
            if audit_register(&bb, &alias)? {
                kv("Status", "Registration found in SEREBO Notary");
            } else {
                kv("Status", "Registration NOT found in SEREBO Notary");
            }
            Ok(())
        }
        Command::AuditNotarizebb => {
            let bb = open(&bbpath)?;
            println!("Checking notarization record(s) in SEREBO Notary(ies) ...");
            for check in audit_notarizations(&bb)? {
                println!();
                kv("Date Time Stamp", check.note.dtstamp);
                kv("Common Code", check.note.code_common);
                kv("Notary URL", check.note.notary_url);
                match check.status {
                    NotarizationStatus::Found => {
                        kv("Status", "Notarization record is found in SEREBO Notary")
                    }
                    NotarizationStatus::NotFound => {
                        kv("Status", "Notarization record is NOT found in SEREBO Notary")
                    }
                    NotarizationStatus::Unavailable(detail) => {
                        kv("Status", format!("Check failed: {detail}"))
                    }
                }
            }
            Ok(())
        }
        Command::Dumphash { target } => {
            let bb = open(&bbpath)?;
            let written = dump_hash(&bb, &target)?;
            kv("Records Written", written);
            kv("Target", target.display());
            Ok(())
        }
        Command::Checkhash { source } => report(check_hash(&open(&bbpath)?, &source)?),
        Command::Backup { target } => {
            let mut bb = open(&bbpath)?;
            let bytes = bb.backup(&target)?;
            kv("Backup Target", target.display());
            kv("Bytes Copied", bytes);
            Ok(())
        }
        Command::Dump => {
            let bb = open(&bbpath)?;
            for table in bb.dump()? {
                println!();
                println!("== {} ({} rows)", table.name, table.rows.len());
                println!("{}", table.columns.join(" | "));
                for row in table.rows {
                    println!("{}", row.join(" | "));
                }
            }
            Ok(())
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn open(bbpath: &Path) -> anyhow::Result<BlackBox> {
    BlackBox::open(bbpath)
        .with_context(|| format!("opening black box at {}", bbpath.display()))
}

fn kv(label: &str, value: impl std::fmt::Display) {
    println!("{label}: {value}");
}

fn print_receipt(receipt: &InsertReceipt) {
    kv("Date Time Stamp", &receipt.dtstamp);
    kv("Data", &receipt.data);
    kv("Description", &receipt.description);
    kv("Data Hash", &receipt.data_hash);
    kv("Parent Block ID", receipt.parent_id);
    kv("Block Hash", &receipt.block_hash);
}

fn print_rows(rows: &[DataLogRow]) {
    kv("Matches", rows.len());
    for row in rows {
        println!();
        kv("ID", row.id);
        kv("Date Time Stamp", &row.dtstamp);
        kv("Data", &row.data);
        kv("Description", &row.description);
    }
}

fn print_system_data(data: &SystemData) {
    println!("System Data ...");
    kv("architecture", &data.architecture);
    kv("machine", &data.machine);
    kv("node", &data.node);
    kv("platform", &data.platform);
    kv("processor", &data.processor);
    kv("system", &data.system);
    kv("hashdata", &data.hashdata);
    for (name, digest) in &data.digests {
        kv(name, digest);
    }
}

/// Print an audit report; discrepancies make the command exit nonzero.
fn report(report: AuditReport) -> anyhow::Result<()> {
    let failures: Vec<_> = report.failures().collect();
    for check in &failures {
        println!("ERROR: record {}: {}", check.id, check.note);
    }
    kv("Audit", report.name);
    kv("Records Checked", report.checks.len());
    kv("Discrepancies", failures.len());
    if !failures.is_empty() {
        bail!("audit {} found {} discrepancies", report.name, failures.len());
    }
    println!("Audit passed.");
    Ok(())
}
