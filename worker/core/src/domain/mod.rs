// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Domain layer: attestation schema, artifact model, run context, worker
//! configuration, and the certification error taxonomy.

pub mod artifact;
pub mod attestation;
pub mod error;
pub mod run;
pub mod worker_config;
