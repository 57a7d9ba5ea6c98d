// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Attestation document schema.
//!
//! The attestation binds task identity, run identity, worker identity and
//! environment, and the digest of every file-backed artifact into a single
//! document. Field names are a fixed cross-worker contract consumed by
//! downstream auditors and release gates; do not rename them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema identifier embedded in every attestation.
pub const CHAIN_OF_TRUST_VERSION: u32 = 1;

/// Published name of the certified copy of the run log.
pub const CERTIFIED_LOG_NAME: &str = "public/logs/certified.log";

/// Local path of the certified log, relative to the run's task directory.
pub const CERTIFIED_LOG_PATH: &str = "generic-worker/certified.log";

/// Published name of the clearsigned attestation document.
pub const SIGNED_CERT_NAME: &str = "public/chainOfTrust.json.asc";

/// Local path of the signed certificate, relative to the task directory.
pub const SIGNED_CERT_PATH: &str = "generic-worker/chainOfTrust.json.asc";

/// Whether an artifact name belongs to the chain-of-trust feature. The upload
/// path must reject task-declared artifacts under these names, whether or not
/// the feature is enabled for the run, so a task cannot spoof its own record.
pub fn is_reserved_artifact_name(name: &str) -> bool {
    name == CERTIFIED_LOG_NAME || name == SIGNED_CERT_NAME
}

/// Content digest of one published artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    /// Lowercase hex SHA-256 of the artifact's on-disk bytes (64 chars).
    pub sha256: String,
}

/// Snapshot of the worker host's identity, stable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub public_ip_address: String,
    pub private_ip_address: String,
    pub instance_id: String,
    pub instance_type: String,
    pub region: String,
}

/// The unsigned certificate payload: one per completed task run, immutable
/// once built, consumed immediately by the signer.
///
/// Serialized key order follows field order here and the digest map is
/// ordered, so identical inputs serialize to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    #[serde(rename = "chainOfTrustVersion")]
    pub version: u32,
    pub artifacts: BTreeMap<String, ArtifactDigest>,
    /// Verbatim task definition as originally submitted, carried as
    /// provenance.
    pub task: serde_json::Value,
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(rename = "runId")]
    pub run_id: u32,
    #[serde(rename = "workerGroup")]
    pub worker_group: String,
    #[serde(rename = "workerId")]
    pub worker_id: String,
    pub environment: Environment,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Attestation {
        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "out.txt".to_string(),
            ArtifactDigest {
                sha256: "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
                    .to_string(),
            },
        );
        Attestation {
            version: CHAIN_OF_TRUST_VERSION,
            artifacts,
            task: serde_json::json!({"command": ["echo", "hello"]}),
            task_id: "KTBKfEgxR5GdfIIREQIvFQ".to_string(),
            run_id: 0,
            worker_group: "us-west-2".to_string(),
            worker_id: "i-0123456789abcdef0".to_string(),
            environment: Environment {
                public_ip_address: "203.0.113.9".to_string(),
                private_ip_address: "10.0.4.12".to_string(),
                instance_id: "i-0123456789abcdef0".to_string(),
                instance_type: "m5.large".to_string(),
                region: "us-west-2".to_string(),
            },
        }
    }

    #[test]
    fn wire_field_names_are_pinned() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "chainOfTrustVersion",
            "artifacts",
            "task",
            "taskId",
            "runId",
            "workerGroup",
            "workerId",
            "environment",
        ] {
            assert!(obj.contains_key(key), "missing wire field {key}");
        }
        let env = obj["environment"].as_object().unwrap();
        for key in [
            "publicIpAddress",
            "privateIpAddress",
            "instanceId",
            "instanceType",
            "region",
        ] {
            assert!(env.contains_key(key), "missing environment field {key}");
        }
        assert_eq!(obj["artifacts"]["out.txt"]["sha256"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn reserved_names_cover_both_feature_artifacts() {
        assert!(is_reserved_artifact_name("public/logs/certified.log"));
        assert!(is_reserved_artifact_name("public/chainOfTrust.json.asc"));
        assert!(!is_reserved_artifact_name("public/logs/live.log"));
    }

    #[test]
    fn serialization_is_deterministic() {
        let a = serde_json::to_string_pretty(&sample()).unwrap();
        let b = serde_json::to_string_pretty(&sample()).unwrap();
        assert_eq!(a, b);
    }
}
