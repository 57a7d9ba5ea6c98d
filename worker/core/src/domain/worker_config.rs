// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Worker-level configuration.
//!
//! Set once at startup and read-only thereafter. The chain-of-trust feature
//! takes the signing key location, the worker's identity, the host
//! environment snapshot, and the execution-identity model from here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::attestation::Environment;

/// The OS identity task commands execute under, as distinct from the worker
/// process identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPrincipal {
    /// Task commands run as the worker's own user. No isolation exists, so
    /// the key custody guard must always fail under this model.
    CurrentUser,
    /// Task commands run as a dedicated restricted user.
    RestrictedUser {
        uid: u32,
        gid: u32,
        supplementary_gids: Vec<u32>,
    },
}

/// Dedicated task user provisioned on the host, when the worker type has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUser {
    pub uid: u32,
    pub gid: u32,
    #[serde(default)]
    pub supplementary_gids: Vec<u32>,
}

/// Worker configuration, deserialized once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Armored Ed25519 private key used to sign attestations.
    pub signing_key_location: PathBuf,
    pub worker_group: String,
    pub worker_id: String,
    pub public_ip: String,
    pub private_ip: String,
    pub instance_id: String,
    pub instance_type: String,
    pub region: String,
    /// When true, task commands run as the worker's own user.
    #[serde(default)]
    pub run_tasks_as_current_user: bool,
    /// Restricted user task commands run under. Ignored when
    /// `run_tasks_as_current_user` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_user: Option<TaskUser>,
}

impl WorkerConfig {
    /// Host environment snapshot embedded in every attestation this process
    /// produces.
    pub fn environment(&self) -> Environment {
        Environment {
            public_ip_address: self.public_ip.clone(),
            private_ip_address: self.private_ip.clone(),
            instance_id: self.instance_id.clone(),
            instance_type: self.instance_type.clone(),
            region: self.region.clone(),
        }
    }

    /// Derives the principal task commands will run as. Without a dedicated
    /// task user there is no isolation and the principal degrades to
    /// `CurrentUser`.
    pub fn task_principal(&self) -> TaskPrincipal {
        if self.run_tasks_as_current_user {
            return TaskPrincipal::CurrentUser;
        }
        match &self.task_user {
            Some(user) => TaskPrincipal::RestrictedUser {
                uid: user.uid,
                gid: user.gid,
                supplementary_gids: user.supplementary_gids.clone(),
            },
            None => TaskPrincipal::CurrentUser,
        }
    }
}
