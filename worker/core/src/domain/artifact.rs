// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Run artifact variants.
//!
//! Artifacts a completed run publishes come in three shapes: file-backed
//! content, redirects, and error markers. Only file-backed artifacts carry
//! on-disk bytes, which they expose through the `HashableContent` capability;
//! the artifact hasher processes exactly the variants that implement it and
//! skips the rest without error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Capability of an artifact variant whose published content is backed by a
/// file on disk. The hasher only ever sees artifacts through this trait.
pub trait HashableContent {
    /// Name the artifact is published under.
    fn published_name(&self) -> &str;

    /// On-disk content location, relative to the run's task directory.
    fn content_path(&self) -> &Path;
}

/// An artifact whose content is a file produced inside the task directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileArtifact {
    /// Published artifact name, e.g. `public/build/out.txt`.
    pub name: String,
    /// Content location relative to the task directory.
    pub path: PathBuf,
    /// MIME type declared by the task, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl HashableContent for FileArtifact {
    fn published_name(&self) -> &str {
        &self.name
    }

    fn content_path(&self) -> &Path {
        &self.path
    }
}

/// An artifact that points consumers at an external URL instead of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectArtifact {
    pub name: String,
    pub url: String,
}

/// A placeholder recorded when the task declared an artifact it failed to
/// produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorArtifact {
    pub name: String,
    pub reason: String,
    pub message: String,
}

/// A published artifact of a task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Artifact {
    File(FileArtifact),
    Redirect(RedirectArtifact),
    Error(ErrorArtifact),
}

impl Artifact {
    /// Published name, regardless of variant.
    pub fn name(&self) -> &str {
        match self {
            Self::File(a) => &a.name,
            Self::Redirect(a) => &a.name,
            Self::Error(a) => &a.name,
        }
    }

    /// Returns the hashable capability if this variant carries on-disk
    /// content.
    pub fn as_hashable(&self) -> Option<&dyn HashableContent> {
        match self {
            Self::File(a) => Some(a),
            Self::Redirect(_) | Self::Error(_) => None,
        }
    }
}
