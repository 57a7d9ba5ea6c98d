// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Clearsign envelope codec.
//!
//! Renders a document as plaintext followed by an armored Ed25519 signature
//! block, so the envelope is simultaneously human-readable and independently
//! verifiable against the worker's public key. The signature covers the exact
//! plaintext bytes: flipping a single byte of the document invalidates it.
//!
//! Layout:
//!
//! ```text
//! -----BEGIN SIGNED MESSAGE-----
//! Hash: SHA-512
//!
//! <plaintext, ending with one newline>
//! -----BEGIN ED25519 SIGNATURE-----
//!
//! <base64 signature, wrapped at 64 columns>
//! -----END ED25519 SIGNATURE-----
//! ```
//!
//! The encoded envelope ends with exactly one newline after the final marker.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

use crate::infrastructure::signing_key::SigningKey;

const MSG_HEADER: &str = "-----BEGIN SIGNED MESSAGE-----";
const SIG_HEADER: &str = "-----BEGIN ED25519 SIGNATURE-----";
const SIG_FOOTER: &str = "-----END ED25519 SIGNATURE-----";
const HASH_LINE: &str = "Hash: SHA-512";

const ARMOR_COLUMNS: usize = 64;

#[derive(Debug, Error)]
pub enum ClearsignError {
    #[error("envelope is missing the '{0}' marker")]
    MissingMarker(&'static str),

    #[error("signature block is not valid base64: {0}")]
    MalformedSignature(String),

    #[error("signature must be 64 bytes, got {0}")]
    BadSignatureLength(usize),

    #[error("signature does not verify against the given public key")]
    BadSignature,
}

/// Wraps `plaintext` in a clearsigned envelope.
///
/// The caller guarantees the plaintext already ends with a newline; the
/// signature is computed over those exact bytes.
pub fn encode(plaintext: &str, key: &SigningKey) -> String {
    let signature = key.sign(plaintext.as_bytes());
    let mut envelope = String::with_capacity(plaintext.len() + 256);
    envelope.push_str(MSG_HEADER);
    envelope.push('\n');
    envelope.push_str(HASH_LINE);
    envelope.push_str("\n\n");
    envelope.push_str(plaintext);
    envelope.push_str(SIG_HEADER);
    envelope.push_str("\n\n");
    for chunk in armored(&signature) {
        envelope.push_str(&chunk);
        envelope.push('\n');
    }
    envelope.push_str(SIG_FOOTER);
    envelope.push('\n');
    envelope
}

/// Parses an envelope and verifies its signature, returning the plaintext
/// exactly as signed.
pub fn verify(envelope: &str, key: &VerifyingKey) -> Result<String, ClearsignError> {
    let body = envelope
        .strip_prefix(&format!("{MSG_HEADER}\n"))
        .ok_or(ClearsignError::MissingMarker(MSG_HEADER))?;
    // Headers run until the first blank line; the plaintext starts after it.
    let text_start = body
        .find("\n\n")
        .ok_or(ClearsignError::MissingMarker(MSG_HEADER))?
        + 2;
    let sig_marker = format!("{SIG_HEADER}\n");
    let sig_start = body
        .find(&sig_marker)
        .ok_or(ClearsignError::MissingMarker(SIG_HEADER))?;
    let plaintext = &body[text_start..sig_start];

    let armor = &body[sig_start + sig_marker.len()..];
    let footer_idx = armor
        .find(SIG_FOOTER)
        .ok_or(ClearsignError::MissingMarker(SIG_FOOTER))?;
    let payload: String = armor[..footer_idx].split_whitespace().collect();
    let sig_bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| ClearsignError::MalformedSignature(e.to_string()))?;
    let sig_bytes: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| ClearsignError::BadSignatureLength(sig_bytes.len()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify(plaintext.as_bytes(), &signature)
        .map_err(|_| ClearsignError::BadSignature)?;
    Ok(plaintext.to_string())
}

fn armored(signature: &Signature) -> Vec<String> {
    let encoded = STANDARD.encode(signature.to_bytes());
    encoded
        .as_bytes()
        .chunks(ARMOR_COLUMNS)
        // chunks of valid base64 are always valid UTF-8
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}
