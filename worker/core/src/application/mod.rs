// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Application layer: artifact hashing, certificate assembly and signing,
//! and the per-run chain-of-trust lifecycle.

pub mod artifact_hasher;
pub mod certificate;
pub mod chain_of_trust;
