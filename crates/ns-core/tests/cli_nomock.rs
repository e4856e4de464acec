//! CLI integration tests for the notescrub binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn notescrub() -> Command {
    Command::cargo_bin("notescrub").expect("binary builds")
}

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

#[test]
fn redact_replaces_phi_with_markers() {
    let note = write_temp("MRN: 12345678, seen 2024-06-15.\n");
    notescrub()
        .arg("redact")
        .arg(note.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[MRN REDACTED]"))
        .stdout(predicate::str::contains("[DATE REDACTED]"))
        .stdout(predicate::str::contains("12345678").not());
}

#[test]
fn redact_with_anchor_emits_offset_tokens() {
    let note = write_temp("Procedure 2024-06-15 went well.\n");
    notescrub()
        .arg("redact")
        .arg(note.path())
        .arg("--anchor")
        .arg("2024-06-01")
        .assert()
        .success()
        .stdout(predicate::str::contains("[DATE: T+14 DAYS]"))
        .stdout(predicate::str::contains("2024-06-15").not());
}

#[test]
fn redact_rejects_bad_anchor() {
    let note = write_temp("nothing\n");
    notescrub()
        .arg("redact")
        .arg(note.path())
        .arg("--anchor")
        .arg("junk")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid anchor date"));
}

#[test]
fn redact_reads_stdin() {
    notescrub()
        .arg("redact")
        .arg("-")
        .write_stdin("Call 555-123-4567 today.")
        .assert()
        .success()
        .stdout(predicate::str::contains("[PHONE REDACTED]"));
}

#[test]
fn scan_fails_on_residual_date() {
    let note = write_temp("still contains 2024-06-01\n");
    notescrub()
        .arg("scan")
        .arg(note.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"count\": 1"));
}

#[test]
fn scan_passes_on_tokenized_text() {
    let note = write_temp("index [DATE: T-42 DAYS] and [MRN REDACTED]\n");
    notescrub()
        .arg("scan")
        .arg(note.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 0"));
}

#[test]
fn spans_lists_detections_as_json() {
    let note = write_temp("DOB: 03/15/1980\n");
    notescrub()
        .arg("spans")
        .arg(note.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"label\": \"date\""))
        .stdout(predicate::str::contains("\"source\": \"pattern\""));
}

#[test]
fn bundle_assembles_from_spec_file() {
    let spec = write_temp(
        r#"{
  "anchor_date": "2024-06-01",
  "documents": [
    {"role": "operative note", "sequence": 1,
     "text": "Procedure performed 2024-06-01.", "document_date": "2024-06-01"},
    {"role": "clinic visit", "sequence": 2,
     "text": "Wound check 2024-06-15.", "document_date": "2024-06-15"}
  ]
}"#,
    );
    notescrub()
        .arg("bundle")
        .arg(spec.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[OPERATIVE NOTE/1: T+0 DAYS]"))
        .stdout(predicate::str::contains("\"clinic visit\": 14"))
        .stdout(predicate::str::contains("2024-06-15").not());
}

#[test]
fn bundle_duplicate_sequence_fails() {
    let spec = write_temp(
        r#"{
  "anchor_date": "2024-06-01",
  "documents": [
    {"role": "a", "sequence": 1, "text": "x", "document_date": "2024-06-01"},
    {"role": "b", "sequence": 1, "text": "y", "document_date": "2024-06-02"}
  ]
}"#,
    );
    notescrub()
        .arg("bundle")
        .arg(spec.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate sequence number 1"));
}
