// SPDX-FileCopyrightText: © 2024-2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Attestation artifact verification library
//!
//! This library classifies TDX attestation artifacts (evidence documents,
//! bearer tokens and quote blobs) by structural shape, validates their
//! internal consistency, and aggregates the outcomes into a verification
//! report.
//!
//! Verification here is structural only: it checks document shape and
//! required-field presence, not signatures or measurement registers.
//! Can be used both as a library and through the `tdx-verify-util` binary.

mod classifier;
mod engine;
mod report;
mod types;

pub use classifier::{classify_evidence, classify_quote, parse_json_bounded};
pub use engine::{
    default_search_roots, Verifier, DEFAULT_PARSE_TIMEOUT, EVIDENCE_FILENAMES, QUOTE_FILENAMES,
    TOKEN_FILENAMES,
};
pub use report::ReportBuilder;
pub use types::{
    ArtifactKind, EvidenceFields, EvidenceFormat, FormatCounts, QuoteShape, ReasonCode, Summary,
    TdxHardwareStatus, TokenFormat, VerificationReport, VerificationResult,
};
