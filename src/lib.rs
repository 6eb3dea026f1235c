// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A Square (integral) key-recovery attack on 3.5-round AES-128.
//!
//! The attack encrypts lambda sets (256 plaintexts that differ only in one byte,
//! which takes every value exactly once) through an oracle keyed with an unknown key.
//! After three full AES rounds every byte of such a set XOR-sums to zero, so
//! partially decrypting the last half round with the correct round key byte
//! must also XOR-sum to zero. Key byte guesses are filtered across several
//! lambda sets until each of the 16 bytes of the final round key is unique,
//! and the key schedule is then run backwards to obtain the master key.
//!
//! ```no_run
//! use rand::rngs::OsRng;
//! use square_attack::{cipher::ReducedAes, recover_master_key, Block, ATTACK_ROUNDS};
//!
//! # fn main() -> Result<(), square_attack::AttackError> {
//! let secret = Block::new([0x2b; 16]);
//! let mut oracle = ReducedAes::new(&secret, ATTACK_ROUNDS)?;
//! let report = recover_master_key(&mut oracle, &mut OsRng)?;
//! assert_eq!(report.master_key, secret);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

use thiserror::Error;

pub mod attack;
pub mod block;
pub mod candidate_tracker;
pub mod cipher;
pub mod distinguisher;
pub mod key_schedule;
pub mod lambda_set;
pub mod oracle;

#[cfg(test)]
mod test_utils;

pub use crate::attack::{
    recover_master_key, AttackConfig, AttackReport, AttackState, Progress, SquareAttack,
};
pub use crate::block::Block;
pub use crate::cipher::SBoxTables;
pub use crate::oracle::CipherOracle;

/// The number of bytes in a cipher block (and in an AES-128 key).
pub const BLOCK_SIZE: usize = 16;

/// The number of plaintexts in a lambda set: one per value of the active byte.
pub const LAMBDA_SET_SIZE: usize = 256;

/// The number of rounds of the attacked cipher. The last round omits MixColumns,
/// which is why the cipher is commonly described as 3.5-round AES.
pub const ATTACK_ROUNDS: usize = 4;

/// Numeric type used to count lambda sets.
pub type LambdaSetCount = u64;

/// Errors that may be returned while mounting the attack.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AttackError {
    /// Returned when the entropy source fails to produce random bytes.
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailableError(String),

    /// Returned when the encryption oracle fails or violates its contract.
    #[error("Encryption oracle fault: {0}")]
    OracleFaultError(String),

    /// Returned when a key schedule round index is out of range.
    #[error("Key schedule round {round} is out of range")]
    InvalidRoundError {
        /// The offending round index.
        round: usize,
    },

    /// Returned when the attack consumed its lambda set budget without converging.
    #[error("No key recovered after {lambda_sets} lambda sets")]
    BudgetExceededError {
        /// The number of lambda sets consumed.
        lambda_sets: LambdaSetCount,
    },

    /// Returned when the attack is configured with invalid parameters.
    #[error("Invalid configuration")]
    InvalidConfigurationError,
}

impl From<rand::Error> for AttackError {
    fn from(err: rand::Error) -> Self {
        AttackError::EntropyUnavailableError(err.to_string())
    }
}
