// SPDX-FileCopyrightText: © 2024-2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Artifact classification
//!
//! Pure shape inspection: no I/O, no side effects. Evidence shapes are
//! probed in a fixed precedence order; quote blobs get a best-effort
//! content-shape heuristic.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use crate::types::{EvidenceFormat, QuoteShape, ReasonCode};

/// Longest prefix inspected by the base64 probe.
const BASE64_PROBE_LEN: usize = 100;

/// Determine the structural shape of a parsed evidence document.
///
/// Precedence: Standard, then Local, then Mock, then Unknown. A document
/// carrying a top-level `evidence` object is always claimed by Standard,
/// so the Mock arm can only match if Standard detection is ever narrowed
/// to exclude `is_mock` documents.
pub fn classify_evidence(doc: &Value) -> EvidenceFormat {
    if doc.get("evidence").is_some_and(Value::is_object) {
        return EvidenceFormat::Standard;
    }
    if doc.get("tdx_status").is_some_and(Value::is_object) {
        return EvidenceFormat::Local;
    }
    if doc.pointer("/evidence/metadata/is_mock").and_then(Value::as_bool) == Some(true) {
        return EvidenceFormat::Mock;
    }
    EvidenceFormat::Unknown
}

/// Determine the content shape of a quote blob.
///
/// The shape is informational: any non-empty quote is accepted by the
/// engine regardless of what this returns. A blob that is neither
/// obviously binary nor base64-decodable still classifies as binary.
pub fn classify_quote(bytes: &[u8]) -> QuoteShape {
    if bytes.is_empty() {
        return QuoteShape::Empty;
    }
    if looks_binary(bytes) {
        return QuoteShape::Binary;
    }
    if base64_prefix_decodes(bytes) {
        return QuoteShape::Base64;
    }
    QuoteShape::Binary
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .any(|&b| b >= 0x80 || (b.is_ascii_control() && !matches!(b, b'\t' | b'\n' | b'\r')))
}

fn base64_prefix_decodes(bytes: &[u8]) -> bool {
    let prefix: Vec<u8> = bytes
        .iter()
        .take(BASE64_PROBE_LEN)
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    // The probe may cut the input mid-stream; drop the ragged tail so
    // padding rules don't reject an otherwise valid prefix.
    let aligned = &prefix[..prefix.len() - prefix.len() % 4];
    !aligned.is_empty() && BASE64.decode(aligned).is_ok()
}

/// Parse JSON with a deadline.
///
/// Parsing runs on a helper thread so a pathological document cannot
/// stall a batch run; a missed deadline is reported like a parse failure,
/// with its own reason code.
pub fn parse_json_bounded(bytes: Vec<u8>, timeout: Duration) -> Result<Value, ReasonCode> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(serde_json::from_slice::<Value>(&bytes));
    });
    match rx.recv_timeout(timeout) {
        Ok(Ok(doc)) => Ok(doc),
        Ok(Err(_)) => Err(ReasonCode::InvalidJson),
        Err(_) => Err(ReasonCode::InvalidJsonOrTimeout),
    }
}
