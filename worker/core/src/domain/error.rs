// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Error taxonomy for chain-of-trust certification.
//!
//! Certification failures carry a classification that the run supervisor maps
//! to a run outcome. Nothing in this subsystem panics on I/O failure and
//! nothing aborts the worker process; every failure is a value the caller
//! routes (see `RunOutcome`).

use thiserror::Error;

/// A failure anywhere in the certification pipeline.
#[derive(Debug, Error)]
pub enum CertificationError {
    /// The signing key is readable by the task principal. The worker-type /
    /// task combination is misconfigured and the task command must never run.
    #[error("chain of trust key custody violation: {0}")]
    KeyCustodyViolation(String),

    /// A task declared an artifact under a name reserved for the
    /// chain-of-trust record itself.
    #[error("artifact name '{0}' is reserved for the chain of trust feature")]
    ReservedArtifactName(String),

    /// I/O, hashing, serialization, or signing failure while producing the
    /// certificate. Fatal to the run, survivable by the process.
    #[error("internal worker error during certification: {0}")]
    Internal(String),

    /// The upload collaborator failed to publish a certificate artifact. An
    /// unpublished certificate means the trust claim does not exist.
    #[error("certificate publication failed: {0}")]
    Upload(String),
}

/// How the run supervisor should classify a run that hit a
/// `CertificationError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exception / malformed-payload: the task or worker-type configuration
    /// is at fault.
    MalformedPayload,
    /// Worker-level internal error, distinct from the task's own exit status.
    InternalError,
    /// Run failed because the certificate could not be published.
    Failed,
}

impl CertificationError {
    /// Maps the failure onto the run outcome the supervisor reports.
    pub fn outcome(&self) -> RunOutcome {
        match self {
            Self::KeyCustodyViolation(_) | Self::ReservedArtifactName(_) => {
                RunOutcome::MalformedPayload
            }
            Self::Internal(_) => RunOutcome::InternalError,
            Self::Upload(_) => RunOutcome::Failed,
        }
    }
}
