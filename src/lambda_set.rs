// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Lambda sets and their encryptions.

use crate::{AttackError, Block, CipherOracle, BLOCK_SIZE, LAMBDA_SET_SIZE};
use rand::{CryptoRng, RngCore};

/// 256 plaintexts that agree on every byte except the active one,
/// which takes each of the 256 possible values exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LambdaSet {
    blocks: [Block; LAMBDA_SET_SIZE],
    active_position: usize,
}

impl LambdaSet {
    /// Generates a lambda set active at `active_position` whose other bytes all
    /// equal a fresh random value.
    ///
    /// Block `i` of the set has active byte `i`.
    pub fn generate<R: RngCore + CryptoRng>(
        active_position: usize,
        rng: &mut R,
    ) -> Result<Self, AttackError> {
        if active_position >= BLOCK_SIZE {
            return Err(AttackError::InvalidConfigurationError);
        }

        let mut base = [0u8; 1];
        rng.try_fill_bytes(&mut base)?;

        Ok(Self::with_base(active_position, base[0]))
    }

    fn with_base(active_position: usize, base: u8) -> Self {
        let mut blocks = [Block::splat(base); LAMBDA_SET_SIZE];
        for (i, block) in blocks.iter_mut().enumerate() {
            block[active_position] = i as u8;
        }
        Self {
            blocks,
            active_position,
        }
    }

    /// The position of the byte taking every value.
    pub fn active_position(&self) -> usize {
        self.active_position
    }

    /// The plaintexts of the set.
    pub fn blocks(&self) -> &[Block; LAMBDA_SET_SIZE] {
        &self.blocks
    }

    /// Returns whether the byte at `position` takes each value exactly once across the set.
    pub fn is_balanced_at(&self, position: usize) -> bool {
        takes_every_value(&self.blocks, position)
    }
}

/// The oracle's encryptions of a `LambdaSet`, in the same order as the plaintexts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherBatch {
    blocks: [Block; LAMBDA_SET_SIZE],
}

impl CipherBatch {
    /// Encrypts every plaintext of `lambda_set` with `oracle`.
    ///
    /// Any failure of the oracle is reported as `AttackError::OracleFaultError`.
    pub fn encrypt<O: CipherOracle + ?Sized>(
        lambda_set: &LambdaSet,
        oracle: &mut O,
    ) -> Result<Self, AttackError> {
        let mut blocks = [Block::default(); LAMBDA_SET_SIZE];
        for (ciphertext, plaintext) in blocks.iter_mut().zip(lambda_set.blocks.iter()) {
            *ciphertext = oracle.encrypt(plaintext).map_err(|e| match e {
                AttackError::OracleFaultError(_) => e,
                other => AttackError::OracleFaultError(other.to_string()),
            })?;
        }
        Ok(Self { blocks })
    }

    /// The ciphertexts of the batch.
    pub fn blocks(&self) -> &[Block; LAMBDA_SET_SIZE] {
        &self.blocks
    }

    /// Returns whether the byte at `position` takes each value exactly once across the batch.
    pub fn is_permutation_at(&self, position: usize) -> bool {
        takes_every_value(&self.blocks, position)
    }
}

fn takes_every_value(blocks: &[Block; LAMBDA_SET_SIZE], position: usize) -> bool {
    let mut present = [false; 256];
    for block in blocks {
        let b = block[position] as usize;
        if present[b] {
            return false;
        }
        present[b] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn generated_sets_have_lambda_structure() {
        init_logger();
        let mut rng = StdRng::seed_from_u64(0);

        for active_position in 0..BLOCK_SIZE {
            let set = LambdaSet::generate(active_position, &mut rng).unwrap();
            assert_eq!(set.blocks().len(), LAMBDA_SET_SIZE);
            assert_eq!(set.active_position(), active_position);
            assert!(set.is_balanced_at(active_position));

            let base = set.blocks()[0][(active_position + 1) % BLOCK_SIZE];
            for (i, block) in set.blocks().iter().enumerate() {
                assert_eq!(block[active_position], i as u8);
                for position in (0..BLOCK_SIZE).filter(|p| *p != active_position) {
                    assert_eq!(block[position], base);
                    assert!(!set.is_balanced_at(position));
                }
            }
        }
    }

    #[test]
    fn bases_are_drawn_per_set() {
        let mut rng = StdRng::seed_from_u64(1);
        let bases: std::collections::HashSet<u8> = (0..64)
            .map(|_| LambdaSet::generate(0, &mut rng).unwrap().blocks()[0][1])
            .collect();
        assert!(bases.len() > 1);
    }

    #[test]
    fn out_of_range_position_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            LambdaSet::generate(BLOCK_SIZE, &mut rng).unwrap_err(),
            AttackError::InvalidConfigurationError
        );
    }

    #[test]
    fn failing_entropy_source_is_reported() {
        let mut rng = FailingRng;
        assert!(matches!(
            LambdaSet::generate(0, &mut rng),
            Err(AttackError::EntropyUnavailableError(_))
        ));
    }

    #[test]
    fn encryption_preserves_order() {
        let mut rng = StdRng::seed_from_u64(2);
        let set = LambdaSet::generate(3, &mut rng).unwrap();
        let mut oracle = |block: &Block| *block ^ Block::splat(0x5a);
        let batch = CipherBatch::encrypt(&set, &mut oracle).unwrap();
        for (plaintext, ciphertext) in set.blocks().iter().zip(batch.blocks().iter()) {
            assert_eq!(*ciphertext, *plaintext ^ Block::splat(0x5a));
        }
        assert!(batch.is_permutation_at(3));
    }

    #[test]
    fn oracle_errors_become_oracle_faults() {
        let mut rng = StdRng::seed_from_u64(3);
        let set = LambdaSet::generate(0, &mut rng).unwrap();
        let mut oracle = FaultyOracle::failing_after(10);
        assert!(matches!(
            CipherBatch::encrypt(&set, &mut oracle),
            Err(AttackError::OracleFaultError(_))
        ));
    }
}
