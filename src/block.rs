// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Implements `Block`, a 16-byte cipher state, plaintext, ciphertext or round key.

use crate::{AttackError, BLOCK_SIZE};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use std::fmt;
use std::ops::{BitXor, Index, IndexMut};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
/// A fixed-size block of `BLOCK_SIZE` bytes.
pub struct Block([u8; BLOCK_SIZE]);

impl Block {
    /// Instantiates a `Block` from an array of `BLOCK_SIZE` bytes.
    pub const fn new(data: [u8; BLOCK_SIZE]) -> Self {
        Self(data)
    }

    /// Returns a block with every byte set to `value`.
    pub const fn splat(value: u8) -> Self {
        Self([value; BLOCK_SIZE])
    }

    /// Returns the bytes of the block.
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// Returns the bytes of the block by value.
    pub fn to_bytes(self) -> [u8; BLOCK_SIZE] {
        self.0
    }

    /// Parses a block from exactly `2 * BLOCK_SIZE` hexadecimal digits.
    pub fn from_hex(s: &str) -> Result<Self, AttackError> {
        if s.len() != 2 * BLOCK_SIZE || !s.is_ascii() {
            return Err(AttackError::InvalidConfigurationError);
        }

        let mut data = [0u8; BLOCK_SIZE];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16)
                .map_err(|_| AttackError::InvalidConfigurationError)?;
        }
        Ok(Self(data))
    }
}

impl From<[u8; BLOCK_SIZE]> for Block {
    fn from(data: [u8; BLOCK_SIZE]) -> Self {
        Self(data)
    }
}

impl FromStr for Block {
    type Err = AttackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Block::from_hex(s)
    }
}

impl Index<usize> for Block {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Block {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl BitXor for Block {
    type Output = Block;

    fn bitxor(self, rhs: Self) -> Self::Output {
        let mut result = self;
        for i in 0..BLOCK_SIZE {
            result.0[i] ^= rhs.0[i];
        }
        result
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl Distribution<Block> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        let mut result = Block::default();
        rng.fill_bytes(&mut result.0);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::Block;
    use crate::BLOCK_SIZE;
    use static_assertions::const_assert_eq;
    use std::mem::size_of;

    #[test]
    fn check_size_of_block() {
        const_assert_eq!(size_of::<Block>(), BLOCK_SIZE);
    }

    #[test]
    fn hex_is_parsed_and_displayed() {
        let block: Block = "000102030405060708090a0b0c0d0e0f".parse().unwrap();
        for i in 0..BLOCK_SIZE {
            assert_eq!(block[i], i as u8);
        }
        assert_eq!(block.to_string(), "000102030405060708090a0b0c0d0e0f");
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(Block::from_hex("0001").is_err());
        assert!(Block::from_hex("zz0102030405060708090a0b0c0d0e0f").is_err());
        assert!(Block::from_hex("é0102030405060708090a0b0c0d0e0f").is_err());
    }

    #[test]
    fn xor_is_bytewise() {
        let a = Block::splat(0xf0);
        let b = Block::splat(0x0f);
        assert_eq!(a ^ b, Block::splat(0xff));
        assert_eq!(a ^ a, Block::default());
    }
}
