// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External collaborator traits: credential encryption and the target-site
//! automation driver. Both are black boxes to the core — real
//! implementations live outside this workspace.

mod cipher;
mod driver;

pub use cipher::{CipherError, CredentialCipher, FixedKeyCipher};
pub use driver::{
    DriverError, ErrorCategory, LoginOutcome, MockDriver, PostOutcome, PostPayload, TargetSiteDriver,
    VerifyOutcome,
};
