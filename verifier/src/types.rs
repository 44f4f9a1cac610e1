// SPDX-FileCopyrightText: © 2024-2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Data model for artifact verification results and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of attestation artifact being checked.
///
/// The kind is declared by the caller (or by filename convention during
/// discovery), never inferred from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A JSON document asserting the system's trusted state
    Evidence,
    /// A bearer credential document wrapping a token string
    Token,
    /// An opaque attestation quote blob
    Quote,
}

impl ArtifactKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evidence => "evidence",
            Self::Token => "token",
            Self::Quote => "quote",
        }
    }
}

/// Structural shape of an evidence document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceFormat {
    /// Top-level `evidence` object
    Standard,
    /// Top-level `tdx_status` object
    Local,
    /// `evidence.metadata.is_mock == true`
    Mock,
    /// None of the known shapes
    Unknown,
}

impl EvidenceFormat {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Local => "local",
            Self::Mock => "mock",
            Self::Unknown => "unknown",
        }
    }
}

/// Content shape of a quote blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteShape {
    /// Contains non-text bytes
    Binary,
    /// Text whose leading bytes decode as base64
    Base64,
    /// Zero-length file
    Empty,
}

/// Reason a check failed. Captured in the result, never raised past the
/// engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Path does not exist. Also covers an existing file that could not
    /// be read; the taxonomy has no separate code for that state.
    FileNotFound,
    FileEmpty,
    InvalidJson,
    InvalidJsonOrTimeout,
    UnrecognizedFormat,
    IncompleteStructure,
    MissingOrEmptyToken,
}

impl ReasonCode {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileNotFound => "file_not_found",
            Self::FileEmpty => "file_empty",
            Self::InvalidJson => "invalid_json",
            Self::InvalidJsonOrTimeout => "invalid_json_or_timeout",
            Self::UnrecognizedFormat => "unrecognized_format",
            Self::IncompleteStructure => "incomplete_structure",
            Self::MissingOrEmptyToken => "missing_or_empty_token",
        }
    }
}

/// Shape of the token string. Informational only, never a validity gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFormat {
    /// Exactly three '.'-delimited segments
    JwtLike,
    NonStandard,
}

/// Presence of optional sub-fields in standard evidence. Informational
/// only, never a validity gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFields {
    pub quote: bool,
    pub report_data: bool,
}

/// Outcome of a single file check.
///
/// Invariant: `valid == true` iff `error` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Path of the checked file
    pub file: String,
    pub valid: bool,
    pub kind: ArtifactKind,
    /// Evidence shape (evidence checks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<EvidenceFormat>,
    /// Byte length (quote checks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Quote content shape (quote checks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<QuoteShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_format: Option<TokenFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<EvidenceFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReasonCode>,
    /// UTC instant of the check
    pub timestamp: DateTime<Utc>,
}

impl VerificationResult {
    /// A passing result with no enrichment yet.
    pub fn passed(file: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            file: file.into(),
            valid: true,
            kind,
            format: None,
            size: None,
            shape: None,
            token_format: None,
            fields: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A failing result carrying its reason code.
    pub fn failed(file: impl Into<String>, kind: ArtifactKind, error: ReasonCode) -> Self {
        Self {
            error: Some(error),
            valid: false,
            ..Self::passed(file, kind)
        }
    }
}

/// Aggregate counts over a report's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
}

/// Counts of evidence results per structural shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCounts {
    pub standard: usize,
    pub local: usize,
    pub mock: usize,
    pub unknown: usize,
}

impl FormatCounts {
    pub fn record(&mut self, format: EvidenceFormat) {
        match format {
            EvidenceFormat::Standard => self.standard += 1,
            EvidenceFormat::Local => self.local += 1,
            EvidenceFormat::Mock => self.mock += 1,
            EvidenceFormat::Unknown => self.unknown += 1,
        }
    }

    /// Non-zero counts as a `label: n` list, empty string when nothing
    /// was classified.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (label, count) in [
            ("standard", self.standard),
            ("local", self.local),
            ("mock", self.mock),
            ("unknown", self.unknown),
        ] {
            if count > 0 {
                parts.push(format!("{label}: {count}"));
            }
        }
        parts.join(", ")
    }
}

/// System facts supplied by the platform-detection collaborator.
///
/// The engine never probes hardware or the kernel itself; callers that
/// already ran detection can attach the outcome so it travels with the
/// report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TdxHardwareStatus {
    pub tdx_supported: bool,
    pub kernel_module_loaded: bool,
    pub guest_device_present: bool,
}

/// Aggregate outcome of a batch verification run.
///
/// Written once per run to the report path, overwriting the previous
/// run's report. Results keep discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// UTC instant of report generation
    pub timestamp: DateTime<Utc>,
    pub results: Vec<VerificationResult>,
    pub summary: Summary,
    pub categories: FormatCounts,
    /// Human-readable outcome, derived from the aggregate
    pub conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tdx_status: Option<TdxHardwareStatus>,
}
