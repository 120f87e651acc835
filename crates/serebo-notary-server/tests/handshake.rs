//! Client ⇄ server handshake over real HTTP: a black box registers with
//! an in-process notary, notarizes its ledger head, and audits the
//! stored receipts back against the notary.

use std::sync::Arc;

use serebo_core::SereboError;
use serebo_ledger::{notary_notarizations, NotarizationNote};
use serebo_notary::{
    audit_notarizations, audit_register, notarize, register, NotarizationStatus, NotaryClient,
};
use serebo_notary_server::{router, NotaryService};
use serebo_store::BlackBox;

/// Bind a free port, then serve the notary from a background thread with
/// its own runtime. The blocking client in the test thread talks to it
/// over real HTTP.
fn start_notary(name: &str) -> String {
    let db_path = std::env::temp_dir().join(format!("serebo_handshake_{name}.sqlite"));
    let _ = std::fs::remove_file(&db_path);
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    listener.set_nonblocking(true).expect("nonblocking");
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            let service = Arc::new(NotaryService::open(&db_path).expect("notary db"));
            axum::serve(listener, router(service)).await.expect("serve");
        });
    });
    format!("http://127.0.0.1:{port}/")
}

fn temp_box(name: &str) -> (BlackBox, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("serebo_handshake_{name}.sdb"));
    let _ = std::fs::remove_file(&path);
    (BlackBox::open(&path).expect("open black box"), path)
}

#[test]
fn register_stores_one_local_row_and_rejects_a_second_attempt() {
    let url = start_notary("s6");
    let (mut bb, path) = temp_box("s6");

    let outcome = register(&mut bb, "primary", "Dr. Ada", "ada@lab.org", &url).unwrap();
    assert_eq!(outcome.notary_authorization.len(), 256);
    assert_eq!(outcome.notary_dts.split(':').count(), 7);

    let regs = bb.registrations().unwrap();
    assert_eq!(regs.len(), 1);
    assert_eq!(regs[0].alias, "primary");
    assert_eq!(regs[0].notary_url, url);
    // The registration also left an audit record in datalog.
    assert_eq!(bb.datalog_count().unwrap(), 1);

    // Same blackboxID again: the notary refuses, nothing is written.
    let err = register(&mut bb, "second", "Dr. Ada", "ada@lab.org", &url).unwrap_err();
    assert!(matches!(err, SereboError::AlreadyRegistered { .. }));
    assert_eq!(bb.registrations().unwrap().len(), 1);
    assert_eq!(bb.datalog_count().unwrap(), 1);
    let _ = std::fs::remove_file(path);
}

#[test]
fn notarize_cross_signs_and_records_locally() {
    let url = start_notary("notarize");
    let (mut bb, path) = temp_box("notarize");
    register(&mut bb, "primary", "Dr. Ada", "ada@lab.org", &url).unwrap();

    let outcome = notarize(&mut bb, "primary").unwrap();
    assert_eq!(outcome.code_bb.len(), 32);
    assert_eq!(outcome.code_ns.len(), 32);
    assert_eq!(
        outcome.code_common,
        serebo_crypto::composite6(format!("{}{}", outcome.code_bb, outcome.code_ns).as_bytes())
    );

    // The local record carries the cross-signing code as its data and a
    // parseable pipe-joined description.
    let rows = notary_notarizations(&bb).unwrap();
    assert_eq!(rows.len(), 1);
    let note = NotarizationNote::parse(&rows[0]).unwrap();
    assert_eq!(note.code_common, outcome.code_common);
    assert_eq!(note.code_bb, outcome.code_bb);
    assert_eq!(note.notary_url, url);
    let _ = std::fs::remove_file(path);
}

#[test]
fn unknown_alias_is_not_found_without_any_write() {
    let (mut bb, path) = temp_box("alias");
    let before = bb.datalog_count().unwrap();
    let err = notarize(&mut bb, "ghost").unwrap_err();
    assert!(matches!(err, SereboError::NotFound(_)));
    assert_eq!(bb.datalog_count().unwrap(), before);
    let _ = std::fs::remove_file(path);
}

#[test]
fn forged_authorization_is_not_registered() {
    let url = start_notary("forged");
    let (mut bb, path) = temp_box("forged");
    register(&mut bb, "primary", "Dr. Ada", "ada@lab.org", &url).unwrap();
    let before = bb.datalog_count().unwrap();

    // Tamper the stored authorization; the notary no longer knows the pair.
    let client = NotaryClient::new(&url).unwrap();
    let err = client
        .notarize_blackbox(&bb.blackbox_id().unwrap(), "forged-auth", "t", "code")
        .unwrap_err();
    assert!(matches!(err, SereboError::NotRegistered { .. }));
    // The failed attempt wrote nothing locally.
    assert_eq!(bb.datalog_count().unwrap(), before);
    let _ = std::fs::remove_file(path);
}

#[test]
fn audits_round_trip_against_the_notary() {
    let url = start_notary("audit");
    let (mut bb, path) = temp_box("audit");
    register(&mut bb, "primary", "Dr. Ada", "ada@lab.org", &url).unwrap();
    notarize(&mut bb, "primary").unwrap();
    notarize(&mut bb, "primary").unwrap();

    assert!(audit_register(&bb, "primary").unwrap());

    let checks = audit_notarizations(&bb).unwrap();
    assert_eq!(checks.len(), 2);
    assert!(checks.iter().all(|c| c.status == NotarizationStatus::Found));
    let _ = std::fs::remove_file(path);
}

#[test]
fn dead_notary_leaves_local_store_untouched() {
    let (mut bb, path) = temp_box("dead");
    // Nothing listens on this port.
    let err = register(&mut bb, "primary", "Dr. Ada", "ada@lab.org", "http://127.0.0.1:9/").unwrap_err();
    assert!(matches!(err, SereboError::RemoteUnavailable { .. }));
    assert!(bb.registrations().unwrap().is_empty());
    assert_eq!(bb.datalog_count().unwrap(), 0);
    let _ = std::fs::remove_file(path);
}
