//! Bundle assembly and submission gating.

use crate::error::{BundleError, Result};
use crate::header::HeaderToken;
use ns_common::DocumentId;
use ns_redact::scan;
use ns_temporal::{parse_date, TemporalAnchor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One redacted document staged for bundling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleDocument {
    /// Document id (no PHI).
    pub id: DocumentId,

    /// Document role, e.g. "operative note".
    pub role: String,

    /// Position within the bundle; unique, starts at 1.
    pub sequence: u32,

    /// Signed day offset from the bundle anchor. A document without a
    /// resolved offset is never accepted into a bundle.
    pub offset_days: i64,

    /// Redacted, tokenized document text.
    pub text: String,
}

impl BundleDocument {
    /// Stage a document whose offset is already known.
    pub fn new(
        role: impl Into<String>,
        sequence: u32,
        offset_days: i64,
        text: impl Into<String>,
    ) -> Self {
        BundleDocument {
            id: DocumentId::new(),
            role: role.into(),
            sequence,
            offset_days,
            text: text.into(),
        }
    }

    /// Stage a document by resolving its raw date against the anchor.
    ///
    /// Fails with `MissingOffset` when the date cannot be parsed;
    /// a document that cannot be placed on the timeline must not enter
    /// the bundle.
    pub fn resolve(
        role: impl Into<String>,
        sequence: u32,
        text: impl Into<String>,
        document_date: &str,
        anchor: &TemporalAnchor,
    ) -> Result<Self> {
        let role = role.into();
        let parsed = parse_date(document_date);
        match parsed.date {
            Some(date) => Ok(BundleDocument::new(
                role,
                sequence,
                anchor.offset_to(date),
                text,
            )),
            None => Err(BundleError::MissingOffset {
                document: format!("{}#{}", role, sequence),
                reason: parsed
                    .warning
                    .unwrap_or_else(|| "document date missing".to_string()),
            }),
        }
    }

    /// Header token for this document.
    pub fn header(&self) -> Result<HeaderToken> {
        HeaderToken::new(self.role.clone(), self.sequence, self.offset_days)
    }

    fn display_name(&self) -> String {
        format!("{}#{}", self.role, self.sequence)
    }
}

/// A submitted bundle: documents in sequence order plus the derived
/// role timeline. The anchor date itself never leaves the assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Documents ordered by sequence, each prefixed with its header
    /// token.
    pub documents: Vec<BundleDocument>,

    /// Earliest (minimum) day offset seen for each role; lets
    /// downstream consumers reconstruct the procedure timeline without
    /// ever seeing a real date.
    pub role_offsets: BTreeMap<String, i64>,
}

/// Collects documents for one bundle submission.
pub struct BundleAssembler {
    anchor: TemporalAnchor,
    documents: Vec<BundleDocument>,
}

impl BundleAssembler {
    /// New assembler for the given episode anchor.
    pub fn new(anchor: TemporalAnchor) -> Self {
        BundleAssembler {
            anchor,
            documents: Vec::new(),
        }
    }

    /// The bundle's anchor.
    pub fn anchor(&self) -> &TemporalAnchor {
        &self.anchor
    }

    /// Number of staged documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Stage a document, enforcing the add-time invariants.
    pub fn add(&mut self, doc: BundleDocument) -> Result<()> {
        if doc.sequence == 0 {
            return Err(BundleError::ZeroSequence);
        }
        if doc.role.trim().is_empty() {
            return Err(BundleError::EmptyRole);
        }
        if self.documents.iter().any(|d| d.sequence == doc.sequence) {
            return Err(BundleError::DuplicateSequence {
                sequence: doc.sequence,
            });
        }
        debug!(sequence = doc.sequence, offset_days = doc.offset_days, "staging document");
        self.documents.push(doc);
        Ok(())
    }

    /// Resolve and stage in one step.
    pub fn add_resolved(
        &mut self,
        role: impl Into<String>,
        sequence: u32,
        text: impl Into<String>,
        document_date: &str,
    ) -> Result<()> {
        let doc = BundleDocument::resolve(role, sequence, text, document_date, &self.anchor)?;
        self.add(doc)
    }

    /// Submit the bundle.
    ///
    /// Re-runs the leak scanner over every document and refuses to
    /// proceed if any residual date-like text survives, naming the
    /// offending documents. On success each document text is prefixed
    /// with its header token and the documents are ordered by sequence.
    pub fn submit(self) -> Result<Bundle> {
        if self.documents.is_empty() {
            return Err(BundleError::EmptyBundle);
        }

        let mut leak_count = 0usize;
        let mut offenders = Vec::new();
        for doc in &self.documents {
            let result = scan(&doc.text);
            if !result.is_clean() {
                leak_count += result.count;
                offenders.push(doc.display_name());
            }
        }
        if leak_count > 0 {
            info!(count = leak_count, documents = offenders.len(), "blocking submission");
            return Err(BundleError::LeakDetected {
                count: leak_count,
                documents: offenders,
            });
        }

        let mut documents = self.documents;
        documents.sort_by_key(|d| d.sequence);

        let mut role_offsets: BTreeMap<String, i64> = BTreeMap::new();
        for doc in &documents {
            role_offsets
                .entry(doc.role.clone())
                .and_modify(|offset| *offset = (*offset).min(doc.offset_days))
                .or_insert(doc.offset_days);
        }

        for doc in &mut documents {
            let header = doc.header()?;
            doc.text = format!("{}\n\n{}", header.render(), doc.text);
        }

        info!(documents = documents.len(), "bundle submitted");
        Ok(Bundle {
            documents,
            role_offsets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn anchor() -> TemporalAnchor {
        TemporalAnchor::new(NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"))
    }

    fn clean_doc(role: &str, sequence: u32, offset_days: i64) -> BundleDocument {
        BundleDocument::new(
            role,
            sequence,
            offset_days,
            "Seen in clinic on [DATE: T+0 DAYS]. Recovery uneventful.",
        )
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let mut assembler = BundleAssembler::new(anchor());
        assembler.add(clean_doc("operative note", 1, 0)).unwrap();
        assembler.add(clean_doc("clinic visit", 2, 14)).unwrap();

        let err = assembler.add(clean_doc("discharge summary", 1, 3)).unwrap_err();
        assert_eq!(err, BundleError::DuplicateSequence { sequence: 1 });
    }

    #[test]
    fn test_zero_sequence_rejected() {
        let mut assembler = BundleAssembler::new(anchor());
        assert_eq!(
            assembler.add(clean_doc("note", 0, 0)).unwrap_err(),
            BundleError::ZeroSequence
        );
    }

    #[test]
    fn test_unresolvable_date_is_missing_offset() {
        let err = BundleDocument::resolve(
            "clinic visit",
            2,
            "some text",
            "March 15",
            &anchor(),
        )
        .unwrap_err();
        match err {
            BundleError::MissingOffset { document, reason } => {
                assert_eq!(document, "clinic visit#2");
                assert_eq!(reason, "missing year");
            }
            other => panic!("expected MissingOffset, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_computes_offset() {
        let doc =
            BundleDocument::resolve("clinic visit", 2, "text", "2024-06-15", &anchor()).unwrap();
        assert_eq!(doc.offset_days, 14);
    }

    #[test]
    fn test_submit_blocks_on_leak() {
        let mut assembler = BundleAssembler::new(anchor());
        assembler.add(clean_doc("operative note", 1, 0)).unwrap();
        assembler
            .add(BundleDocument::new(
                "discharge summary",
                2,
                3,
                "Discharged 2024-06-01 in good condition.",
            ))
            .unwrap();

        let err = assembler.submit().unwrap_err();
        match err {
            BundleError::LeakDetected { count, documents } => {
                assert!(count >= 1);
                assert_eq!(documents, vec!["discharge summary#2".to_string()]);
            }
            other => panic!("expected LeakDetected, got {:?}", other),
        }
    }

    #[test]
    fn test_submit_empty_bundle_rejected() {
        let assembler = BundleAssembler::new(anchor());
        assert_eq!(assembler.submit().unwrap_err(), BundleError::EmptyBundle);
    }

    #[test]
    fn test_submit_orders_by_sequence_and_prefixes_headers() {
        let mut assembler = BundleAssembler::new(anchor());
        assembler.add(clean_doc("clinic visit", 3, 30)).unwrap();
        assembler.add(clean_doc("operative note", 1, 0)).unwrap();
        assembler.add(clean_doc("discharge summary", 2, 3)).unwrap();

        let bundle = assembler.submit().unwrap();
        let sequences: Vec<u32> = bundle.documents.iter().map(|d| d.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert!(bundle.documents[0]
            .text
            .starts_with("[OPERATIVE NOTE/1: T+0 DAYS]\n\n"));
        assert!(bundle.documents[2]
            .text
            .starts_with("[CLINIC VISIT/3: T+30 DAYS]\n\n"));
    }

    #[test]
    fn test_role_offsets_take_earliest_occurrence() {
        let mut assembler = BundleAssembler::new(anchor());
        assembler.add(clean_doc("clinic visit", 1, 30)).unwrap();
        assembler.add(clean_doc("clinic visit", 2, -14)).unwrap();
        assembler.add(clean_doc("operative note", 3, 0)).unwrap();

        let bundle = assembler.submit().unwrap();
        assert_eq!(bundle.role_offsets.get("clinic visit"), Some(&-14));
        assert_eq!(bundle.role_offsets.get("operative note"), Some(&0));
    }

    #[test]
    fn test_submitted_bundle_scans_clean() {
        let mut assembler = BundleAssembler::new(anchor());
        assembler.add(clean_doc("operative note", 1, 0)).unwrap();
        assembler.add(clean_doc("clinic visit", 2, 14)).unwrap();

        let bundle = assembler.submit().unwrap();
        for doc in &bundle.documents {
            assert!(scan(&doc.text).is_clean());
        }
    }
}
