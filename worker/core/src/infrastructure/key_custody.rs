// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Key custody guard.
//!
//! Before any task command executes, the guard verifies that the task
//! principal cannot open the signing key for reading. The check is
//! fail-closed: a readable key is a custody violation that aborts the run
//! with a malformed-configuration classification, because the entire trust
//! guarantee is void once the key is exfiltratable. It runs fresh at every
//! run's start, not just at worker boot, and leaves nothing behind.
//!
//! The task-execution backend is an external collaborator, so rather than
//! spawning a probe process as the task user, the guard simulates the
//! principal's effective Unix read permission from the key file's ownership
//! and mode bits, including supplementary groups.

use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::domain::error::CertificationError;
use crate::domain::worker_config::TaskPrincipal;

/// Message attached to every custody violation.
pub const KEY_NOT_SECURE_MESSAGE: &str =
    "signing key must not be readable by the task principal, but it is";

/// Verifies signing-key custody against the run's task principal.
#[derive(Debug, Clone)]
pub struct KeyCustodyGuard {
    key_path: PathBuf,
}

impl KeyCustodyGuard {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
        }
    }

    /// Fails with `KeyCustodyViolation` when the principal could read the
    /// key, with `Internal` when the key file cannot be inspected at all.
    pub fn verify(&self, principal: &TaskPrincipal) -> Result<(), CertificationError> {
        match principal {
            TaskPrincipal::CurrentUser => {
                // The worker's own user must be able to read its key, so a
                // worker type that runs tasks as that user has no isolation.
                warn!(
                    key = %self.key_path.display(),
                    "task commands run as the worker user; {KEY_NOT_SECURE_MESSAGE}"
                );
                Err(CertificationError::KeyCustodyViolation(format!(
                    "{KEY_NOT_SECURE_MESSAGE} (tasks run as the worker's own user)"
                )))
            }
            TaskPrincipal::RestrictedUser {
                uid,
                gid,
                supplementary_gids,
            } => {
                let metadata = std::fs::metadata(&self.key_path).map_err(|e| {
                    CertificationError::Internal(format!(
                        "failed to inspect signing key {}: {}",
                        self.key_path.display(),
                        e
                    ))
                })?;
                if readable_by(&metadata, *uid, *gid, supplementary_gids) {
                    warn!(
                        key = %self.key_path.display(),
                        uid, "key custody violation: {KEY_NOT_SECURE_MESSAGE}"
                    );
                    Err(CertificationError::KeyCustodyViolation(format!(
                        "{KEY_NOT_SECURE_MESSAGE} (uid {uid} can read {})",
                        self.key_path.display()
                    )))
                } else {
                    debug!(key = %self.key_path.display(), uid, "signing key custody verified");
                    Ok(())
                }
            }
        }
    }
}

/// Effective-permission simulation of a read attempt by `uid`/`gid`.
///
/// Follows kernel permission-class precedence: owner class applies when the
/// uid matches even if its bits are more restrictive than group/other.
fn readable_by(metadata: &std::fs::Metadata, uid: u32, gid: u32, supplementary: &[u32]) -> bool {
    if uid == 0 {
        return true;
    }
    let mode = metadata.mode();
    if metadata.uid() == uid {
        mode & 0o400 != 0
    } else if metadata.gid() == gid || supplementary.contains(&metadata.gid()) {
        mode & 0o040 != 0
    } else {
        mode & 0o004 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::RunOutcome;
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    // A uid/gid pair guaranteed not to be the test process's own.
    const FOREIGN_UID: u32 = 3_999_999;
    const FOREIGN_GID: u32 = 3_999_999;

    fn key_file(mode: u32) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cot-signing.key");
        std::fs::write(&path, "-----BEGIN ED25519 PRIVATE KEY-----\n").unwrap();
        std::fs::set_permissions(&path, Permissions::from_mode(mode)).unwrap();
        (dir, path)
    }

    fn restricted(uid: u32, gid: u32, supplementary: Vec<u32>) -> TaskPrincipal {
        TaskPrincipal::RestrictedUser {
            uid,
            gid,
            supplementary_gids: supplementary,
        }
    }

    #[test]
    fn owner_only_key_is_secure_from_foreign_user() {
        let (_dir, path) = key_file(0o600);
        let guard = KeyCustodyGuard::new(&path);
        assert!(guard
            .verify(&restricted(FOREIGN_UID, FOREIGN_GID, vec![]))
            .is_ok());
    }

    #[test]
    fn world_readable_key_is_a_violation() {
        let (_dir, path) = key_file(0o604);
        let guard = KeyCustodyGuard::new(&path);
        let err = guard
            .verify(&restricted(FOREIGN_UID, FOREIGN_GID, vec![]))
            .unwrap_err();
        assert!(matches!(err, CertificationError::KeyCustodyViolation(_)));
        assert_eq!(err.outcome(), RunOutcome::MalformedPayload);
    }

    #[test]
    fn group_readable_key_leaks_through_primary_group() {
        let (_dir, path) = key_file(0o640);
        let file_gid = std::fs::metadata(&path).unwrap().gid();
        let guard = KeyCustodyGuard::new(&path);
        assert!(guard
            .verify(&restricted(FOREIGN_UID, file_gid, vec![]))
            .is_err());
    }

    #[test]
    fn group_readable_key_leaks_through_supplementary_group() {
        let (_dir, path) = key_file(0o640);
        let file_gid = std::fs::metadata(&path).unwrap().gid();
        let guard = KeyCustodyGuard::new(&path);
        assert!(guard
            .verify(&restricted(FOREIGN_UID, FOREIGN_GID, vec![file_gid]))
            .is_err());
        // Without membership in the key's group the same mode is secure.
        assert!(guard
            .verify(&restricted(FOREIGN_UID, FOREIGN_GID, vec![]))
            .is_ok());
    }

    #[test]
    fn key_owned_by_task_user_is_a_violation() {
        let (_dir, path) = key_file(0o600);
        let owner_uid = std::fs::metadata(&path).unwrap().uid();
        let guard = KeyCustodyGuard::new(&path);
        assert!(guard
            .verify(&restricted(owner_uid, FOREIGN_GID, vec![]))
            .is_err());
    }

    #[test]
    fn current_user_model_always_fails() {
        let (_dir, path) = key_file(0o600);
        let guard = KeyCustodyGuard::new(&path);
        let err = guard.verify(&TaskPrincipal::CurrentUser).unwrap_err();
        assert_eq!(err.outcome(), RunOutcome::MalformedPayload);
    }

    #[test]
    fn missing_key_file_is_internal_error() {
        let guard = KeyCustodyGuard::new("/nonexistent/cot-signing.key");
        let err = guard
            .verify(&restricted(FOREIGN_UID, FOREIGN_GID, vec![]))
            .unwrap_err();
        assert!(matches!(err, CertificationError::Internal(_)));
    }
}
