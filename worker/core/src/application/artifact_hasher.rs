// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Artifact content hashing.
//!
//! Every file-backed artifact a completed run produced is streamed through
//! SHA-256 in fixed-size chunks; whole files are never pulled into memory.
//! An unreadable artifact is an internal worker error and aborts certificate
//! production, since a silently missing digest would make the attestation
//! misleading. Variants without on-disk content are skipped without error.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::domain::artifact::Artifact;
use crate::domain::attestation::ArtifactDigest;
use crate::domain::error::CertificationError;

const CHUNK_SIZE: usize = 64 * 1024;

pub struct ArtifactHasher;

impl ArtifactHasher {
    /// Digests every hashable artifact of a run, keyed by published name.
    pub async fn digest_artifacts(
        task_dir: &Path,
        artifacts: &[Artifact],
    ) -> Result<BTreeMap<String, ArtifactDigest>, CertificationError> {
        let mut digests = BTreeMap::new();
        for artifact in artifacts {
            let Some(content) = artifact.as_hashable() else {
                continue;
            };
            let path = task_dir.join(content.content_path());
            let digest = Self::digest_file(&path).await.map_err(|e| {
                CertificationError::Internal(format!(
                    "failed to hash artifact '{}' at {}: {}",
                    content.published_name(),
                    path.display(),
                    e
                ))
            })?;
            debug!(
                artifact = content.published_name(),
                sha256 = %digest.sha256,
                "hashed artifact"
            );
            digests.insert(content.published_name().to_string(), digest);
        }
        Ok(digests)
    }

    /// Streams one file through a SHA-256 accumulator.
    pub async fn digest_file(path: &Path) -> std::io::Result<ArtifactDigest> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(ArtifactDigest {
            sha256: hex::encode(hasher.finalize()),
        })
    }
}
