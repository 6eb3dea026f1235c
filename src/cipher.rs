// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A reference reduced-round AES-128, used as the encryption oracle under attack.
//!
//! Encryption with `r` rounds performs the initial key whitening, `r - 1` full rounds
//! (SubBytes, ShiftRows, MixColumns, AddRoundKey) and a final round without MixColumns.
//! With 10 rounds this is standard AES-128.

use crate::{AttackError, Block, CipherOracle, BLOCK_SIZE};

/// The AES round constants, indexed by key schedule round (round 0 derives round key 1).
pub const ROUND_CONSTANTS: [u8; 10] = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80, 0x1b, 0x36];

/// The number of key schedule rounds that can be expanded or inverted.
pub const NUM_ROUND_CONSTANTS: usize = ROUND_CONSTANTS.len();

/// The AES field polynomial x^8 + x^4 + x^3 + x + 1.
pub const AES_POLYNOMIAL: u16 = 0x11b;

/// The first row of the AES MixColumns matrix. Each further row is the previous one rotated right.
pub const AES_MIX_COLUMNS: [u8; 4] = [0x02, 0x03, 0x01, 0x01];

/// `SHIFT_ROWS[i]` is the index of the state byte that ShiftRows moves to index `i`.
/// State bytes are stored column by column.
pub const SHIFT_ROWS: [usize; BLOCK_SIZE] = [0, 5, 10, 15, 4, 9, 14, 3, 8, 13, 2, 7, 12, 1, 6, 11];

/// `INV_SHIFT_ROWS[i]` is the index that ShiftRows moves state byte `i` to.
pub const INV_SHIFT_ROWS: [usize; BLOCK_SIZE] = invert_permutation(&SHIFT_ROWS);

const AES_REDUCTION: u8 = AES_POLYNOMIAL as u8;

// Multiplication by x modulo x^8 + `reduction`.
const fn xtime(p: u8, reduction: u8) -> u8 {
    (p << 1) ^ (((p >> 7) & 1) * reduction)
}

const fn gf_mul(mut a: u8, mut b: u8, reduction: u8) -> u8 {
    let mut product = 0;
    while b != 0 {
        if b & 1 == 1 {
            product ^= a;
        }
        a = xtime(a, reduction);
        b >>= 1;
    }
    product
}

// a^254 is the multiplicative inverse of a when the polynomial is irreducible, and maps 0 to 0.
const fn gf_inv(a: u8, reduction: u8) -> u8 {
    let mut result = 1;
    let mut base = a;
    let mut exponent: u8 = 254;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = gf_mul(result, base, reduction);
        }
        base = gf_mul(base, base, reduction);
        exponent >>= 1;
    }
    result
}

// Field inversion followed by the AES affine map.
const fn build_sbox(reduction: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let b = gf_inv(i as u8, reduction);
        table[i] = b
            ^ b.rotate_left(1)
            ^ b.rotate_left(2)
            ^ b.rotate_left(3)
            ^ b.rotate_left(4)
            ^ 0x63;
        i += 1;
    }
    table
}

// Only meaningful when `table` is a permutation.
const fn invert_table(table: &[u8; 256]) -> [u8; 256] {
    let mut inverse = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        inverse[table[i] as usize] = i as u8;
        i += 1;
    }
    inverse
}

const fn invert_permutation(permutation: &[usize; BLOCK_SIZE]) -> [usize; BLOCK_SIZE] {
    let mut inverse = [0usize; BLOCK_SIZE];
    let mut i = 0;
    while i < BLOCK_SIZE {
        inverse[permutation[i]] = i;
        i += 1;
    }
    inverse
}

/// A byte substitution table together with its inverse.
///
/// The same table drives SubBytes and the key schedule. The attack only needs the table to be a
/// permutation, so it works unchanged against ciphers built on other S-boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SBoxTables {
    forward: [u8; 256],
    inverse: [u8; 256],
}

impl SBoxTables {
    /// The AES S-box.
    pub const AES: SBoxTables = SBoxTables::from_field(AES_REDUCTION);

    const fn from_field(reduction: u8) -> Self {
        let forward = build_sbox(reduction);
        Self {
            forward,
            inverse: invert_table(&forward),
        }
    }

    /// Builds the AES-style S-box (field inversion, then the AES affine map) over the field
    /// defined by the degree 8 `polynomial`, e.g. `0x11d` for x^8 + x^4 + x^3 + x^2 + 1.
    ///
    /// Returns `AttackError::InvalidConfigurationError` if `polynomial` is not of degree 8
    /// or the resulting table is not a permutation.
    pub fn over_field(polynomial: u16) -> Result<Self, AttackError> {
        if polynomial >> 8 != 1 {
            return Err(AttackError::InvalidConfigurationError);
        }
        Self::from_table(build_sbox(polynomial as u8))
    }

    /// Wraps an arbitrary substitution table.
    /// Returns `AttackError::InvalidConfigurationError` if `forward` is not a permutation.
    pub fn from_table(forward: [u8; 256]) -> Result<Self, AttackError> {
        let inverse = invert_table(&forward);
        if (0..=255u8).any(|b| forward[inverse[b as usize] as usize] != b) {
            return Err(AttackError::InvalidConfigurationError);
        }
        Ok(Self { forward, inverse })
    }

    /// Substitutes one byte.
    pub fn substitute(&self, byte: u8) -> u8 {
        self.forward[byte as usize]
    }

    /// Undoes `substitute`.
    pub fn invert(&self, byte: u8) -> u8 {
        self.inverse[byte as usize]
    }

    /// The substitution table.
    pub fn forward(&self) -> &[u8; 256] {
        &self.forward
    }

    /// The inverse substitution table.
    pub fn inverse(&self) -> &[u8; 256] {
        &self.inverse
    }
}

impl Default for SBoxTables {
    fn default() -> Self {
        Self::AES
    }
}

/// Applies RotWord, SubWord and the round constant of `round` to the last word of a round key.
/// Callers must check `round < NUM_ROUND_CONSTANTS`.
pub(crate) fn schedule_core(word: [u8; 4], round: usize, sbox: &SBoxTables) -> [u8; 4] {
    let mut result = [
        sbox.substitute(word[1]),
        sbox.substitute(word[2]),
        sbox.substitute(word[3]),
        sbox.substitute(word[0]),
    ];
    result[0] ^= ROUND_CONSTANTS[round];
    result
}

pub(crate) fn check_round(round: usize) -> Result<(), AttackError> {
    if round >= NUM_ROUND_CONSTANTS {
        return Err(AttackError::InvalidRoundError { round });
    }
    Ok(())
}

/// Derives round key `round + 1` from round key `round`.
pub fn expand_round(round_key: &Block, round: usize) -> Result<Block, AttackError> {
    expand_round_with(round_key, round, &SBoxTables::AES)
}

/// Like `expand_round`, for a key schedule substituting with `sbox`.
pub fn expand_round_with(
    round_key: &Block,
    round: usize,
    sbox: &SBoxTables,
) -> Result<Block, AttackError> {
    check_round(round)?;

    let last_word = [round_key[12], round_key[13], round_key[14], round_key[15]];
    let core = schedule_core(last_word, round, sbox);

    let mut next = Block::default();
    for i in 0..4 {
        next[i] = round_key[i] ^ core[i];
    }
    for i in 4..BLOCK_SIZE {
        next[i] = next[i - 4] ^ round_key[i];
    }
    Ok(next)
}

/// Returns the round keys 0 through `rounds` derived from `master_key`.
pub fn expand_key(master_key: &Block, rounds: usize) -> Result<Vec<Block>, AttackError> {
    expand_key_with(master_key, rounds, &SBoxTables::AES)
}

/// Like `expand_key`, for a key schedule substituting with `sbox`.
pub fn expand_key_with(
    master_key: &Block,
    rounds: usize,
    sbox: &SBoxTables,
) -> Result<Vec<Block>, AttackError> {
    let mut round_keys = Vec::with_capacity(rounds + 1);
    round_keys.push(*master_key);
    for round in 0..rounds {
        let next = expand_round_with(&round_keys[round], round, sbox)?;
        round_keys.push(next);
    }
    Ok(round_keys)
}

fn sub_bytes(state: &mut Block, sbox: &SBoxTables) {
    for i in 0..BLOCK_SIZE {
        state[i] = sbox.substitute(state[i]);
    }
}

fn shift_rows(state: &mut Block) {
    let input = *state;
    for i in 0..BLOCK_SIZE {
        state[i] = input[SHIFT_ROWS[i]];
    }
}

// Row `r` of the circulant matrix is `row` rotated right by `r`.
fn mix_columns(state: &mut Block, row: &[u8; 4]) {
    for column in 0..4 {
        let c = 4 * column;
        let input = [state[c], state[c + 1], state[c + 2], state[c + 3]];
        for r in 0..4 {
            state[c + r] = (0..4).fold(0, |acc, j| {
                acc ^ gf_mul(row[(j + 4 - r) % 4], input[j], AES_REDUCTION)
            });
        }
    }
}

/// AES-128 with a configurable number of rounds, S-box and MixColumns coefficients.
#[derive(Clone, Debug)]
pub struct ReducedAes {
    round_keys: Vec<Block>,
    sbox: SBoxTables,
    mix_columns: [u8; 4],
}

impl ReducedAes {
    /// Creates a cipher encrypting with `rounds` rounds under `master_key`.
    pub fn new(master_key: &Block, rounds: usize) -> Result<Self, AttackError> {
        Self::with_components(master_key, rounds, SBoxTables::AES, AES_MIX_COLUMNS)
    }

    /// Creates an AES variant substituting with `sbox`, in both the rounds and the key schedule.
    pub fn with_sbox(
        master_key: &Block,
        rounds: usize,
        sbox: SBoxTables,
    ) -> Result<Self, AttackError> {
        Self::with_components(master_key, rounds, sbox, AES_MIX_COLUMNS)
    }

    /// Creates an AES variant substituting with `sbox` and mixing columns with the
    /// circulant matrix whose first row is `mix_columns`.
    ///
    /// Every coefficient must be nonzero, so that each byte of a column depends on
    /// every input byte.
    pub fn with_components(
        master_key: &Block,
        rounds: usize,
        sbox: SBoxTables,
        mix_columns: [u8; 4],
    ) -> Result<Self, AttackError> {
        if rounds == 0 || rounds > NUM_ROUND_CONSTANTS || mix_columns.contains(&0) {
            return Err(AttackError::InvalidConfigurationError);
        }

        log::debug!(
            "ReducedAes::new -- {} rounds, MixColumns row {:02x?}",
            rounds,
            mix_columns
        );

        Ok(Self {
            round_keys: expand_key_with(master_key, rounds, &sbox)?,
            sbox,
            mix_columns,
        })
    }

    /// The number of rounds performed by `encrypt_block`.
    pub fn rounds(&self) -> usize {
        self.round_keys.len() - 1
    }

    /// The substitution tables of the cipher.
    pub fn sbox(&self) -> &SBoxTables {
        &self.sbox
    }

    /// Returns round key `round`, where round key 0 is the master key.
    pub fn round_key(&self, round: usize) -> Option<&Block> {
        self.round_keys.get(round)
    }

    /// Returns the key added at the end of the final round.
    pub fn final_round_key(&self) -> &Block {
        &self.round_keys[self.rounds()]
    }

    /// Applies the key whitening followed by `full_rounds` full rounds.
    pub(crate) fn encrypt_full_rounds(&self, block: &Block, full_rounds: usize) -> Block {
        let mut state = *block ^ self.round_keys[0];
        for round_key in &self.round_keys[1..=full_rounds] {
            sub_bytes(&mut state, &self.sbox);
            shift_rows(&mut state);
            mix_columns(&mut state, &self.mix_columns);
            state = state ^ *round_key;
        }
        state
    }

    /// Encrypts one block.
    pub fn encrypt_block(&self, block: &Block) -> Block {
        let mut state = self.encrypt_full_rounds(block, self.rounds() - 1);
        sub_bytes(&mut state, &self.sbox);
        shift_rows(&mut state);
        state ^ *self.final_round_key()
    }
}

impl CipherOracle for ReducedAes {
    fn encrypt(&mut self, block: &Block) -> Result<Block, AttackError> {
        Ok(self.encrypt_block(block))
    }
}
