// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Implements a trait `CipherOracle` modeling the encryption device under attack.

use crate::{AttackError, Block};

/// An encryption oracle keyed with a fixed key unknown to the attacker.
///
/// Implementations must be deterministic: encrypting the same block twice yields
/// the same ciphertext.
/// An implementation that cannot serve a request should return `AttackError::OracleFaultError`.
pub trait CipherOracle {
    /// Encrypts `block` under the oracle's key.
    fn encrypt(&mut self, block: &Block) -> Result<Block, AttackError>;
}

impl<F: FnMut(&Block) -> Block> CipherOracle for F {
    fn encrypt(&mut self, block: &Block) -> Result<Block, AttackError> {
        Ok(self(block))
    }
}
