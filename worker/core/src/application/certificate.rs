// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Certificate assembly and signing.
//!
//! `CertificateBuilder` deterministically assembles the attestation from a
//! run's finished state; it performs no I/O. `CertificateSigner` produces the
//! publishable rendering: a byte-exact certified copy of the run log and the
//! clearsigned attestation document. Any I/O or signing failure here is an
//! internal worker error; no partial certificate is ever left publishable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::attestation::{
    Attestation, ArtifactDigest, Environment, CERTIFIED_LOG_PATH, CHAIN_OF_TRUST_VERSION,
    SIGNED_CERT_PATH,
};
use crate::domain::error::CertificationError;
use crate::domain::run::RunContext;
use crate::infrastructure::clearsign;
use crate::infrastructure::signing_key::SigningKey;

/// Assembles attestations. Worker identity and the environment snapshot are
/// process-stable, so one builder serves every run.
#[derive(Debug, Clone)]
pub struct CertificateBuilder {
    worker_group: String,
    worker_id: String,
    environment: Environment,
}

impl CertificateBuilder {
    pub fn new(worker_group: String, worker_id: String, environment: Environment) -> Self {
        Self {
            worker_group,
            worker_id,
            environment,
        }
    }

    /// Pure assembly: identical inputs yield an identical attestation.
    pub fn build(
        &self,
        run: &RunContext,
        artifacts: BTreeMap<String, ArtifactDigest>,
    ) -> Attestation {
        Attestation {
            version: CHAIN_OF_TRUST_VERSION,
            artifacts,
            task: run.task_definition.clone(),
            task_id: run.identity.task_id.clone(),
            run_id: run.identity.run_id,
            worker_group: self.worker_group.clone(),
            worker_id: self.worker_id.clone(),
            environment: self.environment.clone(),
        }
    }
}

/// Renders the attestation as a tamper-evident signed document and certifies
/// the run log.
pub struct CertificateSigner {
    key: Arc<SigningKey>,
}

impl CertificateSigner {
    pub fn new(key: Arc<SigningKey>) -> Self {
        Self { key }
    }

    /// Copies the raw run log byte-for-byte to the certified-log location.
    ///
    /// Must run at the moment the run completes, before anything can append
    /// to the log, so the certified copy reflects exactly what happened.
    pub async fn certify_log(&self, run: &RunContext) -> Result<PathBuf, CertificationError> {
        let source = run.task_dir.join(&run.log_path);
        let destination = run.task_dir.join(CERTIFIED_LOG_PATH);
        ensure_parent(&destination).await?;
        tokio::fs::copy(&source, &destination).await.map_err(|e| {
            CertificationError::Internal(format!(
                "failed to certify log {} -> {}: {}",
                source.display(),
                destination.display(),
                e
            ))
        })?;
        debug!(log = %destination.display(), "certified run log");
        Ok(destination)
    }

    /// Serializes the attestation canonically and writes the clearsigned
    /// envelope to the signed-certificate location.
    pub async fn sign(
        &self,
        attestation: &Attestation,
        task_dir: &Path,
    ) -> Result<PathBuf, CertificationError> {
        let document = Self::render(attestation)?;
        let envelope = clearsign::encode(&document, &self.key);
        let destination = task_dir.join(SIGNED_CERT_PATH);
        ensure_parent(&destination).await?;
        tokio::fs::write(&destination, envelope.as_bytes())
            .await
            .map_err(|e| {
                CertificationError::Internal(format!(
                    "failed to write signed certificate {}: {}",
                    destination.display(),
                    e
                ))
            })?;
        info!(
            task_id = %attestation.task_id,
            run_id = attestation.run_id,
            certificate = %destination.display(),
            "signed chain of trust certificate"
        );
        Ok(destination)
    }

    /// Canonical serialized form: pretty JSON with stable key layout,
    /// terminated with exactly one trailing newline.
    fn render(attestation: &Attestation) -> Result<String, CertificationError> {
        let mut document = serde_json::to_string_pretty(attestation).map_err(|e| {
            CertificationError::Internal(format!("failed to serialize attestation: {e}"))
        })?;
        document.push('\n');
        Ok(document)
    }
}

async fn ensure_parent(path: &Path) -> Result<(), CertificationError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            CertificationError::Internal(format!(
                "failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::{FeaturePayload, RunIdentity};

    fn environment() -> Environment {
        Environment {
            public_ip_address: "203.0.113.9".to_string(),
            private_ip_address: "10.0.4.12".to_string(),
            instance_id: "i-0123456789abcdef0".to_string(),
            instance_type: "m5.large".to_string(),
            region: "us-west-2".to_string(),
        }
    }

    fn run_context(task_dir: &Path) -> RunContext {
        RunContext {
            identity: RunIdentity {
                task_id: "KTBKfEgxR5GdfIIREQIvFQ".to_string(),
                run_id: 0,
            },
            task_definition: serde_json::json!({"command": ["echo", "hello"]}),
            task_dir: task_dir.to_path_buf(),
            log_path: PathBuf::from("live_backing.log"),
            artifacts: vec![],
            features: FeaturePayload {
                chain_of_trust: true,
            },
        }
    }

    fn builder() -> CertificateBuilder {
        CertificateBuilder::new(
            "us-west-2".to_string(),
            "i-0123456789abcdef0".to_string(),
            environment(),
        )
    }

    #[test]
    fn build_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_context(dir.path());
        let digests: BTreeMap<_, _> = [(
            "out.txt".to_string(),
            ArtifactDigest {
                sha256: "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
                    .to_string(),
            },
        )]
        .into_iter()
        .collect();

        let a = builder().build(&run, digests.clone());
        let b = builder().build(&run, digests);
        assert_eq!(
            serde_json::to_string_pretty(&a).unwrap(),
            serde_json::to_string_pretty(&b).unwrap()
        );
        assert_eq!(a.version, 1);
    }

    #[tokio::test]
    async fn certify_log_copies_bytes_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_context(dir.path());
        std::fs::write(dir.path().join("live_backing.log"), b"[task] echo hello\n").unwrap();

        let signer = CertificateSigner::new(Arc::new(SigningKey::from_secret_bytes(&[1u8; 32])));
        let certified = signer.certify_log(&run).await.unwrap();

        assert_eq!(certified, dir.path().join("generic-worker/certified.log"));
        assert_eq!(
            std::fs::read(&certified).unwrap(),
            b"[task] echo hello\n".to_vec()
        );
    }

    #[tokio::test]
    async fn certify_log_without_source_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_context(dir.path());
        let signer = CertificateSigner::new(Arc::new(SigningKey::from_secret_bytes(&[1u8; 32])));
        let err = signer.certify_log(&run).await.unwrap_err();
        assert!(matches!(err, CertificationError::Internal(_)));
    }

    #[tokio::test]
    async fn sign_writes_verifiable_envelope_with_exact_framing() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_context(dir.path());
        let key = Arc::new(SigningKey::from_secret_bytes(&[1u8; 32]));
        let signer = CertificateSigner::new(key.clone());

        let attestation = builder().build(&run, BTreeMap::new());
        let path = signer.sign(&attestation, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("generic-worker/chainOfTrust.json.asc"));

        let envelope = std::fs::read_to_string(&path).unwrap();
        assert!(envelope.starts_with("-----BEGIN SIGNED MESSAGE-----\n"));
        assert!(envelope.ends_with("-----END ED25519 SIGNATURE-----\n"));
        assert!(!envelope.ends_with("\n\n"));

        let document = clearsign::verify(&envelope, &key.verifying_key()).unwrap();
        assert!(document.ends_with('\n'));
        assert!(!document.ends_with("\n\n"));
        let parsed: Attestation = serde_json::from_str(&document).unwrap();
        assert_eq!(parsed, attestation);
    }
}
