// SPDX-FileCopyrightText: © 2024-2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Verification engine
//!
//! Drives single-file and batch checks. Every per-file failure is
//! captured as a reason code inside the result; nothing is raised past
//! the engine boundary. The engine only reads the artifacts it inspects
//! and holds no state between calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::classifier::{classify_evidence, classify_quote, parse_json_bounded};
use crate::report::ReportBuilder;
use crate::types::{
    ArtifactKind, EvidenceFields, EvidenceFormat, ReasonCode, TdxHardwareStatus,
    VerificationReport, VerificationResult,
};

/// Evidence filenames probed during discovery, in listing order.
pub const EVIDENCE_FILENAMES: &[&str] = &[
    "tdx-evidence.json",
    "tdx-local-evidence.json",
    "tdx-mock-evidence.json",
];

/// Token filenames probed during discovery, in listing order.
pub const TOKEN_FILENAMES: &[&str] = &["tdx-token.json", "tdx-mock-token.json"];

/// Quote filenames probed during discovery, in listing order.
pub const QUOTE_FILENAMES: &[&str] = &[
    "tdx-quote.bin",
    "tdx-local-quote.bin",
    "tdx-mock-quote.bin",
];

/// Default bound for a single JSON parse.
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Roots searched when the caller doesn't supply any: the working
/// directory and the generators' output directory.
pub fn default_search_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("."), PathBuf::from("output")]
}

/// Structural verifier for attestation artifacts.
pub struct Verifier {
    parse_timeout: Duration,
    tdx_status: Option<TdxHardwareStatus>,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(DEFAULT_PARSE_TIMEOUT)
    }
}

impl Verifier {
    pub fn new(parse_timeout: Duration) -> Self {
        Self {
            parse_timeout,
            tdx_status: None,
        }
    }

    /// Attach collaborator-provided system facts to be embedded in batch
    /// reports. The engine never detects hardware itself.
    pub fn with_tdx_status(mut self, status: TdxHardwareStatus) -> Self {
        self.tdx_status = Some(status);
        self
    }

    fn read_artifact(&self, path: &Path, kind: ArtifactKind) -> Result<Vec<u8>, VerificationResult> {
        if !path.exists() {
            return Err(VerificationResult::failed(
                file_id(path),
                kind,
                ReasonCode::FileNotFound,
            ));
        }
        match fs_err::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                Err(VerificationResult::failed(
                    file_id(path),
                    kind,
                    ReasonCode::FileNotFound,
                ))
            }
        }
    }

    /// Check an evidence document.
    ///
    /// Standard evidence is valid on shape alone; the `quote` and
    /// `reportData` sub-fields are reported but not required. Local
    /// evidence is stricter: both `tdx_status` and `system_measurements`
    /// must be present.
    pub fn verify_evidence(&self, path: &Path) -> VerificationResult {
        let bytes = match self.read_artifact(path, ArtifactKind::Evidence) {
            Ok(bytes) => bytes,
            Err(result) => return result,
        };
        let doc = match parse_json_bounded(bytes, self.parse_timeout) {
            Ok(doc) => doc,
            Err(code) => return VerificationResult::failed(file_id(path), ArtifactKind::Evidence, code),
        };

        let format = classify_evidence(&doc);
        debug!("{} classified as {} evidence", path.display(), format.as_str());

        let mut result = match format {
            EvidenceFormat::Standard | EvidenceFormat::Mock => {
                let mut result = VerificationResult::passed(file_id(path), ArtifactKind::Evidence);
                result.fields = Some(EvidenceFields {
                    quote: doc.pointer("/evidence/quote").is_some(),
                    report_data: doc.pointer("/evidence/reportData").is_some(),
                });
                result
            }
            EvidenceFormat::Local => {
                if doc.get("system_measurements").is_some() {
                    VerificationResult::passed(file_id(path), ArtifactKind::Evidence)
                } else {
                    VerificationResult::failed(
                        file_id(path),
                        ArtifactKind::Evidence,
                        ReasonCode::IncompleteStructure,
                    )
                }
            }
            EvidenceFormat::Unknown => VerificationResult::failed(
                file_id(path),
                ArtifactKind::Evidence,
                ReasonCode::UnrecognizedFormat,
            ),
        };
        result.format = Some(format);
        result
    }

    /// Check a token document: a non-null, non-empty top-level `token`
    /// string is required. The JWT-shape note is informational.
    pub fn verify_token(&self, path: &Path) -> VerificationResult {
        let bytes = match self.read_artifact(path, ArtifactKind::Token) {
            Ok(bytes) => bytes,
            Err(result) => return result,
        };
        let doc = match parse_json_bounded(bytes, self.parse_timeout) {
            Ok(doc) => doc,
            Err(code) => return VerificationResult::failed(file_id(path), ArtifactKind::Token, code),
        };

        let token = doc.get("token").and_then(Value::as_str).unwrap_or("");
        if token.is_empty() {
            return VerificationResult::failed(
                file_id(path),
                ArtifactKind::Token,
                ReasonCode::MissingOrEmptyToken,
            );
        }

        let mut result = VerificationResult::passed(file_id(path), ArtifactKind::Token);
        result.token_format = Some(if token.split('.').count() == 3 {
            crate::types::TokenFormat::JwtLike
        } else {
            crate::types::TokenFormat::NonStandard
        });
        result
    }

    /// Check a quote blob. Any non-empty file is valid; there is no real
    /// quote structure to validate offline, so content is not inspected
    /// beyond the informational shape heuristic.
    pub fn verify_quote(&self, path: &Path) -> VerificationResult {
        let bytes = match self.read_artifact(path, ArtifactKind::Quote) {
            Ok(bytes) => bytes,
            Err(result) => return result,
        };

        if bytes.is_empty() {
            let mut result =
                VerificationResult::failed(file_id(path), ArtifactKind::Quote, ReasonCode::FileEmpty);
            result.size = Some(0);
            return result;
        }

        let mut result = VerificationResult::passed(file_id(path), ArtifactKind::Quote);
        result.size = Some(bytes.len() as u64);
        result.shape = Some(classify_quote(&bytes));
        result
    }

    /// Discover and check every known artifact under the given roots.
    ///
    /// Discovery order is fixed: evidence, then token, then quote
    /// filenames, each probed in every root before moving to the next
    /// name. Result order in the report matches discovery order. Failures
    /// never abort the batch; an empty universe yields a report whose
    /// overall outcome is failure, not vacuous success.
    pub fn verify_all(&self, search_roots: &[PathBuf]) -> VerificationReport {
        let mut builder = ReportBuilder::new();

        let buckets: [(ArtifactKind, &[&str]); 3] = [
            (ArtifactKind::Evidence, EVIDENCE_FILENAMES),
            (ArtifactKind::Token, TOKEN_FILENAMES),
            (ArtifactKind::Quote, QUOTE_FILENAMES),
        ];

        for (kind, names) in buckets {
            for name in names {
                for root in search_roots {
                    let path = root.join(name);
                    if !path.exists() {
                        continue;
                    }
                    debug!("checking {} as {}", path.display(), kind.as_str());
                    let result = match kind {
                        ArtifactKind::Evidence => self.verify_evidence(&path),
                        ArtifactKind::Token => self.verify_token(&path),
                        ArtifactKind::Quote => self.verify_quote(&path),
                    };
                    builder.push(result);
                }
            }
        }

        let report = builder.finish(self.tdx_status.clone());
        if report.results.is_empty() {
            warn!("no attestation artifacts found in any search root");
        }
        report
    }
}

fn file_id(path: &Path) -> String {
    path.display().to_string()
}
