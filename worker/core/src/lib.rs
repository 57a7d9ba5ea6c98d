// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Chain-of-trust certification engine for the Veritas fleet worker.
//!
//! When a task runs on an untrusted worker, this crate produces a
//! cryptographically verifiable attestation binding task identity, run
//! identity, worker identity and environment, and the content digest of
//! every produced artifact, published as a clearsigned certificate alongside
//! a certified copy of the execution log.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
