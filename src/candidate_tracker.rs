// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Accumulates distinguisher results across lambda sets until each key byte is unique.

use crate::cipher::SBoxTables;
use crate::distinguisher::{positive_guesses, GuessSet};
use crate::lambda_set::CipherBatch;
use crate::{Block, BLOCK_SIZE};

/// Numeric type used for per-guess counters.
pub type GuessCount = u32;

/// The state of one byte of the final round key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyByteStatus {
    /// More than one guess is still plausible.
    #[default]
    Undetermined,
    /// The byte has been recovered and is no longer tested.
    Determined(u8),
}

impl KeyByteStatus {
    /// Returns the recovered byte, if any.
    pub fn value(&self) -> Option<u8> {
        match self {
            KeyByteStatus::Undetermined => None,
            KeyByteStatus::Determined(b) => Some(*b),
        }
    }
}

/// The result of feeding one batch to the tracker for one position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// The position was already determined and was skipped.
    Skipped,
    /// No guess passed the distinguisher, which a correctly keyed oracle never causes.
    NoPositives,
    /// The position is still undetermined; `positives` guesses passed this round.
    Ambiguous {
        /// The size of this round's positive set.
        positives: usize,
    },
    /// The position became determined with this value.
    Determined(u8),
}

/// Per-position guess counters and statuses for the 16 bytes of the final round key.
#[derive(Clone, Debug)]
pub struct CandidateTracker {
    counters: [[GuessCount; 256]; BLOCK_SIZE],
    rounds_seen: [GuessCount; BLOCK_SIZE],
    statuses: [KeyByteStatus; BLOCK_SIZE],
}

impl Default for CandidateTracker {
    fn default() -> Self {
        Self {
            counters: [[0; 256]; BLOCK_SIZE],
            rounds_seen: [0; BLOCK_SIZE],
            statuses: [KeyByteStatus::Undetermined; BLOCK_SIZE],
        }
    }
}

impl CandidateTracker {
    /// Creates a tracker with every position undetermined.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes `batch` for one position, partially decrypting with `sbox`.
    pub fn observe_position(
        &mut self,
        batch: &CipherBatch,
        position: usize,
        sbox: &SBoxTables,
    ) -> Observation {
        if self.statuses[position] != KeyByteStatus::Undetermined {
            return Observation::Skipped;
        }
        let positives = positive_guesses(batch, position, sbox);
        self.record(position, &positives)
    }

    /// Updates the counters of `position` with one round's positive set.
    pub fn record(&mut self, position: usize, positives: &GuessSet) -> Observation {
        if self.statuses[position] != KeyByteStatus::Undetermined {
            return Observation::Skipped;
        }

        let first_round = self.rounds_seen[position] == 0;
        self.rounds_seen[position] += 1;

        log::debug!(
            "Key byte {} -- {} positive guesses in round {}",
            position,
            positives.len(),
            self.rounds_seen[position]
        );

        if let Some(guess) = positives.single() {
            return self.determine(position, guess);
        }

        for guess in positives.iter() {
            self.counters[position][guess as usize] += 1;
        }

        if positives.is_empty() {
            return Observation::NoPositives;
        }

        if !first_round {
            if let Some(guess) = unique_maximum(&self.counters[position]) {
                return self.determine(position, guess);
            }
        }

        Observation::Ambiguous {
            positives: positives.len(),
        }
    }

    /// Processes `batch` for every undetermined position, returning each position's observation.
    pub fn observe(
        &mut self,
        batch: &CipherBatch,
        sbox: &SBoxTables,
    ) -> [Observation; BLOCK_SIZE] {
        let mut observations = [Observation::Skipped; BLOCK_SIZE];
        for (position, observation) in observations.iter_mut().enumerate() {
            *observation = self.observe_position(batch, position, sbox);
        }
        observations
    }

    fn determine(&mut self, position: usize, guess: u8) -> Observation {
        log::debug!("Key byte {} -- determined {:02x}", position, guess);
        self.statuses[position] = KeyByteStatus::Determined(guess);
        Observation::Determined(guess)
    }

    /// The status of byte `position`.
    pub fn status(&self, position: usize) -> KeyByteStatus {
        self.statuses[position]
    }

    /// The cumulative count of rounds in which `guess` passed for `position`.
    pub fn count(&self, position: usize, guess: u8) -> GuessCount {
        self.counters[position][guess as usize]
    }

    /// The number of determined positions.
    pub fn determined(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s != KeyByteStatus::Undetermined)
            .count()
    }

    /// Returns whether every position is determined.
    pub fn is_complete(&self) -> bool {
        self.determined() == BLOCK_SIZE
    }

    /// Assembles the recovered round key once every position is determined.
    pub fn recovered_key(&self) -> Option<Block> {
        let mut key = Block::default();
        for position in 0..BLOCK_SIZE {
            key[position] = self.statuses[position].value()?;
        }
        Some(key)
    }
}

// Returns the guess with the strictly largest count, or `None` on a tie.
fn unique_maximum(counts: &[GuessCount; 256]) -> Option<u8> {
    let mut max = 0;
    let mut argmax = 0u8;
    let mut unique = false;
    for (guess, &count) in counts.iter().enumerate() {
        if count > max {
            max = count;
            argmax = guess as u8;
            unique = true;
        } else if count == max {
            unique = false;
        }
    }
    unique.then_some(argmax)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cipher::ReducedAes, lambda_set::LambdaSet, test_utils::*, ATTACK_ROUNDS};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn guesses(members: &[u8]) -> GuessSet {
        let mut set = GuessSet::default();
        for m in members {
            set.insert(*m);
        }
        set
    }

    #[test]
    fn single_positive_determines_immediately() {
        let mut tracker = CandidateTracker::new();
        assert_eq!(tracker.record(3, &guesses(&[0x42])), Observation::Determined(0x42));
        assert_eq!(tracker.status(3), KeyByteStatus::Determined(0x42));
        assert_eq!(tracker.record(3, &guesses(&[1, 2])), Observation::Skipped);
        assert_eq!(tracker.determined(), 1);
    }

    #[test]
    fn ambiguous_first_round_never_determines() {
        let mut tracker = CandidateTracker::new();
        for position in 0..BLOCK_SIZE {
            let observation = tracker.record(position, &guesses(&[0x10, 0x20]));
            assert_eq!(observation, Observation::Ambiguous { positives: 2 });
            assert_eq!(tracker.status(position), KeyByteStatus::Undetermined);
        }
        assert_eq!(tracker.count(0, 0x10), 1);
        assert_eq!(tracker.count(0, 0x30), 0);
    }

    #[test]
    fn unique_maximum_determines_in_later_rounds() {
        let mut tracker = CandidateTracker::new();
        tracker.record(0, &guesses(&[1, 2, 3]));
        assert_eq!(
            tracker.record(0, &guesses(&[2, 4])),
            Observation::Determined(2)
        );
        assert_eq!(tracker.recovered_key(), None);
    }

    #[test]
    fn tied_maximum_stays_undetermined() {
        let mut tracker = CandidateTracker::new();
        tracker.record(5, &guesses(&[1, 2]));
        assert_eq!(
            tracker.record(5, &guesses(&[1, 2, 9])),
            Observation::Ambiguous { positives: 3 }
        );
        assert_eq!(tracker.record(5, &guesses(&[1, 7])), Observation::Determined(1));
    }

    #[test]
    fn empty_positive_set_is_reported() {
        let mut tracker = CandidateTracker::new();
        assert_eq!(tracker.record(0, &GuessSet::default()), Observation::NoPositives);
        assert_eq!(tracker.status(0), KeyByteStatus::Undetermined);
    }

    #[test]
    fn counters_never_decrease() {
        let mut tracker = CandidateTracker::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut previous = [0; 256];
        for _ in 0..20 {
            let mut set = GuessSet::default();
            // 0 is a member of every round, so it always holds the maximum count.
            set.insert(0);
            for _ in 0..3 {
                set.insert(rng.gen());
            }
            tracker.record(1, &set);
            for guess in 0..=255u8 {
                assert!(tracker.count(1, guess) >= previous[guess as usize]);
                previous[guess as usize] = tracker.count(1, guess);
            }
        }
        assert_eq!(tracker.status(1), KeyByteStatus::Determined(0));
    }

    #[test]
    fn tracker_recovers_final_round_key() {
        init_logger();
        let mut rng = StdRng::seed_from_u64(1);
        let mut aes = ReducedAes::new(&rng.gen(), ATTACK_ROUNDS).unwrap();
        let final_key = *aes.final_round_key();

        let mut tracker = CandidateTracker::new();
        let mut lambda_sets = 0;
        while !tracker.is_complete() {
            lambda_sets += 1;
            assert!(lambda_sets < 64);
            let set = LambdaSet::generate(0, &mut rng).unwrap();
            let batch = CipherBatch::encrypt(&set, &mut aes).unwrap();
            for observation in tracker.observe(&batch, &SBoxTables::AES) {
                assert_ne!(observation, Observation::NoPositives);
            }
        }
        assert_eq!(tracker.recovered_key(), Some(final_key));
    }
}
