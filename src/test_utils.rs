// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains common test utilities for the `square_attack` crate.

use crate::cipher::{ReducedAes, SBoxTables};
use crate::distinguisher::{distinguish, positive_guesses};
use crate::lambda_set::{CipherBatch, LambdaSet};
use crate::{AttackError, Block, CipherOracle, ATTACK_ROUNDS};
use rand::{rngs::StdRng, CryptoRng, Rng, RngCore, SeedableRng};
use simplelog::{Config, WriteLogger};
use std::sync::Once;

static INIT: Once = Once::new();

// For use in manual testing and inspection.
pub(crate) fn init_logger() {
    INIT.call_once(|| {
        WriteLogger::init(log::LevelFilter::Info, Config::default(), std::io::stdout()).unwrap()
    })
}

/// An entropy source that always fails.
pub(crate) struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        panic!("FailingRng has no entropy")
    }

    fn next_u64(&mut self) -> u64 {
        panic!("FailingRng has no entropy")
    }

    fn fill_bytes(&mut self, _: &mut [u8]) {
        panic!("FailingRng has no entropy")
    }

    fn try_fill_bytes(&mut self, _: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new("entropy source unavailable"))
    }
}

impl CryptoRng for FailingRng {}

/// An identity oracle that starts failing after a fixed number of encryptions.
#[derive(Debug)]
pub(crate) struct FaultyOracle {
    remaining: usize,
}

impl FaultyOracle {
    pub(crate) fn failing_after(successful_calls: usize) -> Self {
        Self {
            remaining: successful_calls,
        }
    }
}

impl CipherOracle for FaultyOracle {
    fn encrypt(&mut self, block: &Block) -> Result<Block, AttackError> {
        if self.remaining == 0 {
            return Err(AttackError::OracleFaultError("device disconnected".into()));
        }
        self.remaining -= 1;
        Ok(*block)
    }
}

/// Tests that intersecting positive sets over a few lambda sets isolates
/// byte `position` of the final round key.
pub(crate) fn test_distinguisher_isolates_key_byte(position: usize) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(position as u64);
    let mut aes = ReducedAes::new(&rng.gen(), ATTACK_ROUNDS).unwrap();
    let expected = aes.final_round_key()[position];

    let mut candidates = [true; 256];
    let mut lambda_sets = 0;
    while candidates.iter().filter(|c| **c).count() > 1 {
        lambda_sets += 1;
        assert!(lambda_sets <= 8, "{position}");

        let set = LambdaSet::generate(rng.gen_range(0..crate::BLOCK_SIZE), &mut rng).unwrap();
        let batch = CipherBatch::encrypt(&set, &mut aes).unwrap();
        assert!(distinguish(&batch, position, expected, &SBoxTables::AES));

        let positives = positive_guesses(&batch, position, &SBoxTables::AES);
        for (guess, candidate) in candidates.iter_mut().enumerate() {
            *candidate &= positives.contains(guess as u8);
        }
    }

    assert!(candidates[expected as usize]);
}

macro_rules! create_distinguisher_test_for_position {
    ($position: expr) => {
        paste::paste! {
            #[test]
            fn [<distinguisher_isolates_final_round_key_byte_ $position>]() {
                test_distinguisher_isolates_key_byte($position);
            }
        }
    };
}

macro_rules! create_distinguisher_tests_for_positions {
    ($($position: expr),*) => {
        $(create_distinguisher_test_for_position!($position);)*
    };
}

pub(crate) use create_distinguisher_test_for_position;
pub(crate) use create_distinguisher_tests_for_positions;
