// SPDX-FileCopyrightText: © 2024-2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Report aggregation and persistence.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;

use crate::types::{
    FormatCounts, Summary, TdxHardwareStatus, VerificationReport, VerificationResult,
};

/// Ordered accumulator for one batch run.
///
/// Built up locally inside `verify_all` and consumed into the final
/// report; nothing is kept in process-wide state between runs.
#[derive(Default)]
pub struct ReportBuilder {
    results: Vec<VerificationResult>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: VerificationResult) {
        self.results.push(result);
    }

    pub fn finish(self, tdx_status: Option<TdxHardwareStatus>) -> VerificationReport {
        let valid_count = self.results.iter().filter(|r| r.valid).count();
        let summary = Summary {
            total: self.results.len(),
            valid_count,
            invalid_count: self.results.len() - valid_count,
        };

        let mut categories = FormatCounts::default();
        for result in &self.results {
            if let Some(format) = result.format {
                categories.record(format);
            }
        }

        let mut report = VerificationReport {
            timestamp: Utc::now(),
            results: self.results,
            summary,
            categories,
            conclusion: String::new(),
            tdx_status,
        };
        report.conclusion = report.derive_conclusion();
        report
    }
}

impl VerificationReport {
    /// Overall outcome of the run: at least one artifact existed and
    /// passed. An empty universe is a failure, not a vacuous success.
    pub fn overall_valid(&self) -> bool {
        self.summary.valid_count > 0
    }

    /// Derive the human-readable conclusion from the aggregate alone.
    ///
    /// Pure function of `summary`, `categories` and the invalid-file
    /// list; callers holding only the serialized report can recompute it.
    pub fn derive_conclusion(&self) -> String {
        let Summary {
            total,
            valid_count,
            invalid_count,
        } = self.summary;

        if total == 0 {
            return "no attestation artifacts found".to_string();
        }

        let formats = self.categories.describe();
        let suffix = if formats.is_empty() {
            String::new()
        } else {
            format!(" ({formats})")
        };

        if invalid_count == 0 {
            format!("all {total} artifacts passed structural verification{suffix}")
        } else if valid_count > 0 {
            let invalid: Vec<&str> = self
                .results
                .iter()
                .filter(|r| !r.valid)
                .map(|r| r.file.as_str())
                .collect();
            format!(
                "{valid_count}/{total} artifacts passed structural verification{suffix}; invalid: {}",
                invalid.join(", ")
            )
        } else {
            format!("all {total} artifacts failed structural verification{suffix}")
        }
    }

    /// Write the report as pretty JSON, atomically replacing any previous
    /// report at the same path.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs_err::create_dir_all(dir).context("Failed to create report directory")?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("Failed to create temporary report file")?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), self)
            .context("Failed to serialize verification report")?;
        tmp.as_file_mut()
            .sync_all()
            .context("Failed to flush verification report to disk")?;
        tmp.persist(path)
            .map_err(|e| anyhow!("Failed to persist report to {}: {e}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactKind, EvidenceFormat, ReasonCode};

    fn passing(file: &str, format: Option<EvidenceFormat>) -> VerificationResult {
        let mut result = VerificationResult::passed(file, ArtifactKind::Evidence);
        result.format = format;
        result
    }

    #[test]
    fn summary_counts_always_add_up() {
        let mut builder = ReportBuilder::new();
        builder.push(passing("a.json", Some(EvidenceFormat::Standard)));
        builder.push(VerificationResult::failed(
            "b.json",
            ArtifactKind::Evidence,
            ReasonCode::UnrecognizedFormat,
        ));
        builder.push(VerificationResult::failed(
            "c.bin",
            ArtifactKind::Quote,
            ReasonCode::FileEmpty,
        ));

        let report = builder.finish(None);
        assert_eq!(report.summary.total, 3);
        assert_eq!(
            report.summary.valid_count + report.summary.invalid_count,
            report.summary.total
        );
        assert_eq!(report.summary.valid_count, 1);
    }

    #[test]
    fn categories_count_evidence_formats() {
        let mut builder = ReportBuilder::new();
        builder.push(passing("a.json", Some(EvidenceFormat::Standard)));
        builder.push(passing("b.json", Some(EvidenceFormat::Local)));
        builder.push(passing("c.bin", None));

        let report = builder.finish(None);
        assert_eq!(report.categories.standard, 1);
        assert_eq!(report.categories.local, 1);
        assert_eq!(report.categories.mock, 0);
        assert_eq!(report.categories.unknown, 0);
    }

    #[test]
    fn conclusion_variants() {
        let empty = ReportBuilder::new().finish(None);
        assert_eq!(empty.conclusion, "no attestation artifacts found");
        assert!(!empty.overall_valid());

        let mut builder = ReportBuilder::new();
        builder.push(passing("a.json", Some(EvidenceFormat::Standard)));
        let all_valid = builder.finish(None);
        assert!(all_valid.conclusion.starts_with("all 1 artifacts passed"));
        assert!(all_valid.conclusion.contains("standard: 1"));
        assert!(all_valid.overall_valid());

        let mut builder = ReportBuilder::new();
        builder.push(passing("a.json", Some(EvidenceFormat::Standard)));
        builder.push(VerificationResult::failed(
            "b.json",
            ArtifactKind::Evidence,
            ReasonCode::InvalidJson,
        ));
        let partial = builder.finish(None);
        assert!(partial.conclusion.contains("1/2 artifacts passed"));
        assert!(partial.conclusion.contains("invalid: b.json"));

        let mut builder = ReportBuilder::new();
        builder.push(VerificationResult::failed(
            "b.json",
            ArtifactKind::Evidence,
            ReasonCode::InvalidJson,
        ));
        let none_valid = builder.finish(None);
        assert!(none_valid.conclusion.starts_with("all 1 artifacts failed"));
        assert!(!none_valid.overall_valid());
    }

    #[test]
    fn conclusion_is_reproducible_from_report_data() {
        let mut builder = ReportBuilder::new();
        builder.push(passing("a.json", Some(EvidenceFormat::Standard)));
        builder.push(VerificationResult::failed(
            "b.json",
            ArtifactKind::Token,
            ReasonCode::MissingOrEmptyToken,
        ));
        let report = builder.finish(None);

        let json = serde_json::to_string(&report).unwrap();
        let parsed: VerificationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.derive_conclusion(), report.conclusion);
    }

    #[test]
    fn report_write_is_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verification-report.json");

        ReportBuilder::new().finish(None).write_to(&path).unwrap();

        let mut builder = ReportBuilder::new();
        builder.push(passing("a.json", Some(EvidenceFormat::Standard)));
        let second = builder.finish(None);
        second.write_to(&path).unwrap();

        let content = fs_err::read_to_string(&path).unwrap();
        let parsed: VerificationReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.summary.total, 1);
        assert_eq!(parsed.conclusion, second.conclusion);
    }
}
