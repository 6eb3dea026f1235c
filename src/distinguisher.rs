// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The integral distinguisher on the last half round.
//!
//! The final round of the attacked cipher is SubBytes, ShiftRows, AddRoundKey.
//! XORing a guess into ciphertext byte `p` and applying the inverse S-box undoes that
//! round for byte `p` alone. ShiftRows only relocates bytes, so the result is
//! the output of the third round at state byte `SHIFT_ROWS[p]`, which XOR-sums to
//! zero over a lambda set when the guess equals byte `p` of the final round key.

use crate::cipher::{SBoxTables, SHIFT_ROWS};
use crate::lambda_set::CipherBatch;

/// Undoes the last AddRoundKey and SubBytes on one ciphertext byte.
pub fn partial_decrypt(ciphertext_byte: u8, guess: u8, sbox: &SBoxTables) -> u8 {
    sbox.invert(ciphertext_byte ^ guess)
}

/// Returns the state byte, before the last ShiftRows, that ciphertext byte `position` comes from.
pub fn state_position(position: usize) -> usize {
    SHIFT_ROWS[position]
}

/// XOR-sum over the batch of the partial decryptions of byte `position` under `guess`.
pub fn partial_sum(batch: &CipherBatch, position: usize, guess: u8, sbox: &SBoxTables) -> u8 {
    batch
        .blocks()
        .iter()
        .fold(0, |acc, block| acc ^ partial_decrypt(block[position], guess, sbox))
}

/// Returns whether `guess` is consistent with byte `position` of the final round key.
///
/// `sbox` must be the S-box of the cipher behind `batch`. Then the result is always
/// true for the correct key byte, and true with probability about 1/256 otherwise.
pub fn distinguish(batch: &CipherBatch, position: usize, guess: u8, sbox: &SBoxTables) -> bool {
    partial_sum(batch, position, guess, sbox) == 0
}

/// A set of key byte guesses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuessSet {
    members: [bool; 256],
    len: usize,
}

impl Default for GuessSet {
    fn default() -> Self {
        Self {
            members: [false; 256],
            len: 0,
        }
    }
}

impl GuessSet {
    /// Adds `guess` to the set.
    pub fn insert(&mut self, guess: u8) {
        if !self.members[guess as usize] {
            self.members[guess as usize] = true;
            self.len += 1;
        }
    }

    /// Returns whether `guess` is in the set.
    pub fn contains(&self, guess: u8) -> bool {
        self.members[guess as usize]
    }

    /// The number of guesses in the set.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the only member of the set, if it has exactly one.
    pub fn single(&self) -> Option<u8> {
        if self.len == 1 {
            self.iter().next()
        } else {
            None
        }
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |g| self.members[*g as usize])
    }
}

/// Runs the distinguisher on every guess for byte `position` and returns those that pass.
pub fn positive_guesses(batch: &CipherBatch, position: usize, sbox: &SBoxTables) -> GuessSet {
    let mut positives = GuessSet::default();
    for guess in 0..=255u8 {
        if distinguish(batch, position, guess, sbox) {
            positives.insert(guess);
        }
    }
    positives
}
