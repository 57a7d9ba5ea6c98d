// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Per-run context handed to task features.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::artifact::Artifact;

/// Identity of a single task run on this worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunIdentity {
    pub task_id: String,
    pub run_id: u32,
}

/// Feature flags a task payload may request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturePayload {
    #[serde(default)]
    pub chain_of_trust: bool,
}

/// Everything the chain-of-trust feature needs to know about a run.
///
/// Each run's context is independent state; concurrent runs never share one.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub identity: RunIdentity,
    /// The task definition exactly as submitted, copied into the attestation
    /// verbatim.
    pub task_definition: serde_json::Value,
    /// Absolute directory the run executes in. Artifact paths and the log
    /// path resolve against it.
    pub task_dir: PathBuf,
    /// Raw execution log, relative to `task_dir`.
    pub log_path: PathBuf,
    /// Artifacts the run declared or produced.
    pub artifacts: Vec<Artifact>,
    pub features: FeaturePayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_payload_defaults_to_disabled() {
        let payload: FeaturePayload = serde_json::from_str("{}").unwrap();
        assert!(!payload.chain_of_trust);

        let payload: FeaturePayload = serde_json::from_str(r#"{"chainOfTrust": true}"#).unwrap();
        assert!(payload.chain_of_trust);
    }

    #[test]
    fn run_identity_uses_wire_names() {
        let identity = RunIdentity {
            task_id: "KTBKfEgxR5GdfIIREQIvFQ".to_string(),
            run_id: 3,
        };
        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value["taskId"], "KTBKfEgxR5GdfIIREQIvFQ");
        assert_eq!(value["runId"], 3);
    }
}
