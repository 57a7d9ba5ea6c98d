// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Chain-of-trust feature and per-run lifecycle.
//!
//! The process-wide `ChainOfTrustFeature` loads the signing key once at
//! worker startup and hands each run an independent `CotLifecycle`. The
//! lifecycle sequences the custody guard at task start and, at task
//! completion, artifact hashing, certificate assembly, signing, and the
//! atomic handoff of both feature artifacts to the upload collaborator.
//!
//! A failed task command still gets a chain-of-trust record of what it
//! attempted; certification only aborts on custody violations and internal
//! errors. No step is retried here: retrying a security-relevant operation
//! without understanding the cause risks masking an integrity problem.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::artifact_hasher::ArtifactHasher;
use crate::application::certificate::{CertificateBuilder, CertificateSigner};
use crate::domain::artifact::Artifact;
use crate::domain::attestation::{
    is_reserved_artifact_name, CERTIFIED_LOG_NAME, SIGNED_CERT_NAME,
};
use crate::domain::error::CertificationError;
use crate::domain::run::{RunContext, RunIdentity};
use crate::domain::worker_config::{TaskPrincipal, WorkerConfig};
use crate::infrastructure::key_custody::KeyCustodyGuard;
use crate::infrastructure::signing_key::{SigningKey, SigningKeyError};

/// Upload collaborator. Transport, retries, and storage are its concern;
/// a publication failure here still fails the run, since an unpublished
/// certificate means the trust claim does not exist.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Publishes a run-local file under the given artifact name.
    async fn publish(
        &self,
        run: &RunIdentity,
        name: &str,
        local_path: &Path,
    ) -> anyhow::Result<()>;
}

/// Lifecycle states of one run's chain-of-trust feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CotState {
    /// The task payload did not request the feature.
    Disabled,
    /// Requested; custody guard has not run yet.
    Enabled,
    /// Guard passed; the task command may execute.
    Started,
    /// Run command phase finished and artifact digests are collected.
    ArtifactsCollected,
    /// Certificate signed; both feature artifacts exist locally.
    Published,
    /// Both artifacts handed to the upload collaborator.
    Done,
    /// Terminal failure; no certificate was or will be published.
    Aborted,
}

/// Rejects task-declared artifacts that try to reuse a feature-owned name.
///
/// The general upload path calls this regardless of feature enablement, so a
/// task can never spoof its own chain-of-trust record.
pub fn validate_declared_artifacts(artifacts: &[Artifact]) -> Result<(), CertificationError> {
    for artifact in artifacts {
        if is_reserved_artifact_name(artifact.name()) {
            return Err(CertificationError::ReservedArtifactName(
                artifact.name().to_string(),
            ));
        }
    }
    Ok(())
}

/// Process-wide feature: owns the signing key, shared by every run.
pub struct ChainOfTrustFeature {
    key: Arc<SigningKey>,
    guard: KeyCustodyGuard,
    builder: CertificateBuilder,
    principal: TaskPrincipal,
}

impl ChainOfTrustFeature {
    /// Loads the signing key once. Runs at worker startup, before any task.
    pub fn initialise(config: &WorkerConfig) -> Result<Self, SigningKeyError> {
        let key = Arc::new(SigningKey::load(&config.signing_key_location)?);
        info!(
            key = %config.signing_key_location.display(),
            worker_id = %config.worker_id,
            "chain of trust signing key loaded"
        );
        Ok(Self {
            key,
            guard: KeyCustodyGuard::new(&config.signing_key_location),
            builder: CertificateBuilder::new(
                config.worker_group.clone(),
                config.worker_id.clone(),
                config.environment(),
            ),
            principal: config.task_principal(),
        })
    }

    pub fn name(&self) -> &'static str {
        "Chain of Trust"
    }

    /// Feature-owned artifact names the upload path must refuse to tasks.
    pub fn reserved_artifacts(&self) -> [&'static str; 2] {
        [SIGNED_CERT_NAME, CERTIFIED_LOG_NAME]
    }

    pub fn is_enabled(&self, run: &RunContext) -> bool {
        run.features.chain_of_trust
    }

    /// Creates the independent per-run lifecycle.
    pub fn new_run(&self, run: &RunContext, publisher: Arc<dyn ArtifactPublisher>) -> CotLifecycle {
        CotLifecycle {
            state: if self.is_enabled(run) {
                CotState::Enabled
            } else {
                CotState::Disabled
            },
            key: Arc::clone(&self.key),
            guard: self.guard.clone(),
            builder: self.builder.clone(),
            principal: self.principal.clone(),
            publisher,
        }
    }
}

/// Per-run state machine sequencing guard, hashing, signing, and publication.
pub struct CotLifecycle {
    state: CotState,
    key: Arc<SigningKey>,
    guard: KeyCustodyGuard,
    builder: CertificateBuilder,
    principal: TaskPrincipal,
    publisher: Arc<dyn ArtifactPublisher>,
}

impl CotLifecycle {
    pub fn state(&self) -> CotState {
        self.state
    }

    /// Runs the custody guard before any task command executes.
    ///
    /// On a violation the run aborts with a malformed-payload classification
    /// and the task's own command never runs. Only legal from `Enabled`.
    pub fn on_task_start(&mut self, run: &RunContext) -> Result<(), CertificationError> {
        match self.state {
            CotState::Disabled => return Ok(()),
            CotState::Enabled => {}
            state => {
                return Err(CertificationError::Internal(format!(
                    "chain of trust guard cannot run from state {state:?}"
                )))
            }
        }
        match self.guard.verify(&self.principal) {
            Ok(()) => {
                self.state = CotState::Started;
                Ok(())
            }
            Err(e) => {
                warn!(
                    task_id = %run.identity.task_id,
                    run_id = run.identity.run_id,
                    error = %e,
                    "aborting run before task command"
                );
                self.state = CotState::Aborted;
                Err(e)
            }
        }
    }

    /// Certifies and publishes the completed run.
    ///
    /// Called when the run's command phase completes; whether the task's own
    /// command succeeded does not matter here. The certified log is copied
    /// first so it reflects the run exactly at completion, and publication of
    /// both artifacts is only attempted after signing succeeds.
    ///
    /// Only legal from `Started`. `Aborted` is terminal: a run whose custody
    /// guard failed, or whose guard never ran, must never reach publication.
    pub async fn on_task_complete(&mut self, run: &RunContext) -> Result<(), CertificationError> {
        match self.state {
            CotState::Disabled => return Ok(()),
            CotState::Started => {}
            state => {
                return Err(CertificationError::Internal(format!(
                    "run cannot be certified from state {state:?}; the custody guard must pass first"
                )))
            }
        }
        match self.certify(run).await {
            Ok(()) => {
                self.state = CotState::Done;
                info!(
                    task_id = %run.identity.task_id,
                    run_id = run.identity.run_id,
                    "chain of trust record published"
                );
                Ok(())
            }
            Err(e) => {
                if !matches!(e, CertificationError::Upload(_)) {
                    self.state = CotState::Aborted;
                }
                Err(e)
            }
        }
    }

    async fn certify(&mut self, run: &RunContext) -> Result<(), CertificationError> {
        let signer = CertificateSigner::new(Arc::clone(&self.key));

        let certified_log = signer.certify_log(run).await?;

        let digests = ArtifactHasher::digest_artifacts(&run.task_dir, &run.artifacts).await?;
        self.state = CotState::ArtifactsCollected;

        let attestation = self.builder.build(run, digests);
        let certificate = signer.sign(&attestation, &run.task_dir).await?;
        self.state = CotState::Published;

        self.publisher
            .publish(&run.identity, CERTIFIED_LOG_NAME, &certified_log)
            .await
            .map_err(|e| CertificationError::Upload(format!("{CERTIFIED_LOG_NAME}: {e:#}")))?;
        self.publisher
            .publish(&run.identity, SIGNED_CERT_NAME, &certificate)
            .await
            .map_err(|e| CertificationError::Upload(format!("{SIGNED_CERT_NAME}: {e:#}")))?;
        Ok(())
    }
}
