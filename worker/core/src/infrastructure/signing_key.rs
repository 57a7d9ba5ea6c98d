// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! The worker's attestation signing key.
//!
//! Loaded exactly once at worker startup from an armored Ed25519 key file,
//! then shared read-only (`Arc`) with every run's lifecycle. It is never
//! mutated after load, so concurrent runs need no locking to use it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey as Ed25519SigningKey, VerifyingKey};
use std::path::{Path, PathBuf};
use thiserror::Error;

const ARMOR_HEADER: &str = "-----BEGIN ED25519 PRIVATE KEY-----";
const ARMOR_FOOTER: &str = "-----END ED25519 PRIVATE KEY-----";

#[derive(Debug, Error)]
pub enum SigningKeyError {
    #[error("failed to read signing key {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("signing key armor is malformed: {0}")]
    MalformedArmor(String),

    #[error("signing key payload is not a valid Ed25519 secret: {0}")]
    InvalidKey(String),
}

/// Ed25519 private key wrapper. One per worker process.
#[derive(Debug, Clone)]
pub struct SigningKey {
    inner: Ed25519SigningKey,
}

impl SigningKey {
    /// Loads the armored key file configured at `signingKeyLocation`.
    pub fn load(path: &Path) -> Result<Self, SigningKeyError> {
        let armored = std::fs::read_to_string(path).map_err(|source| {
            SigningKeyError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_armored(&armored)
    }

    /// Parses the armored representation: header and footer lines wrapping a
    /// base64 payload of the 32-byte Ed25519 secret.
    pub fn from_armored(armored: &str) -> Result<Self, SigningKeyError> {
        let mut lines = armored.lines().map(str::trim).filter(|l| !l.is_empty());
        if lines.next() != Some(ARMOR_HEADER) {
            return Err(SigningKeyError::MalformedArmor(format!(
                "expected '{ARMOR_HEADER}' header"
            )));
        }
        let mut payload = String::new();
        let mut saw_footer = false;
        for line in lines {
            if line == ARMOR_FOOTER {
                saw_footer = true;
                break;
            }
            payload.push_str(line);
        }
        if !saw_footer {
            return Err(SigningKeyError::MalformedArmor(format!(
                "missing '{ARMOR_FOOTER}' footer"
            )));
        }
        let bytes = STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| SigningKeyError::MalformedArmor(e.to_string()))?;
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            SigningKeyError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_secret_bytes(&secret))
    }

    /// Builds a key directly from secret bytes. Used by tests and key
    /// provisioning tooling; production workers load from disk.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            inner: Ed25519SigningKey::from_bytes(secret),
        }
    }

    /// Renders the armored representation written by provisioning tooling.
    pub fn to_armored(&self) -> String {
        let payload = STANDARD.encode(self.inner.to_bytes());
        format!("{ARMOR_HEADER}\n{payload}\n{ARMOR_FOOTER}\n")
    }

    /// Signs a message with the worker's private key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.inner.sign(message)
    }

    /// Public half, for consumers verifying certificates.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.inner.verifying_key()
    }
}
