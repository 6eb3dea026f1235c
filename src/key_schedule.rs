// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Inversion of the AES-128 key schedule.

use crate::cipher::{check_round, schedule_core, SBoxTables};
use crate::{AttackError, Block, BLOCK_SIZE};

/// Derives round key `round` from round key `round + 1`, undoing `cipher::expand_round(_, round)`.
pub fn invert_round(round_key: &Block, round: usize) -> Result<Block, AttackError> {
    invert_round_with(round_key, round, &SBoxTables::AES)
}

/// Like `invert_round`, undoing `cipher::expand_round_with(_, round, sbox)`.
pub fn invert_round_with(
    round_key: &Block,
    round: usize,
    sbox: &SBoxTables,
) -> Result<Block, AttackError> {
    check_round(round)?;

    // Words 1 to 3 of a round key are each the XOR of their left neighbour
    // and the previous key's word.
    let mut previous = Block::default();
    for i in (4..BLOCK_SIZE).rev() {
        previous[i] = round_key[i] ^ round_key[i - 4];
    }

    let last_word = [previous[12], previous[13], previous[14], previous[15]];
    let core = schedule_core(last_word, round, sbox);
    for i in 0..4 {
        previous[i] = round_key[i] ^ core[i];
    }
    Ok(previous)
}

/// Recovers the master key from round key `rounds` by inverting rounds `rounds - 1` down to 0.
pub fn derive_master_key(round_key: &Block, rounds: usize) -> Result<Block, AttackError> {
    derive_master_key_with(round_key, rounds, &SBoxTables::AES)
}

/// Like `derive_master_key`, for a key schedule substituting with `sbox`.
pub fn derive_master_key_with(
    round_key: &Block,
    rounds: usize,
    sbox: &SBoxTables,
) -> Result<Block, AttackError> {
    let mut key = *round_key;
    for round in (0..rounds).rev() {
        key = invert_round_with(&key, round, sbox)?;
    }
    Ok(key)
}
