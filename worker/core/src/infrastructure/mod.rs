// Copyright (c) 2026 Veritas Fleet Engineering
// SPDX-License-Identifier: MPL-2.0

//! Infrastructure layer: signing key custody, key loading, and the clearsign
//! envelope codec.

pub mod clearsign;
pub mod key_custody;
pub mod signing_key;
