// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Drives the Square attack: generate, encrypt, distinguish and accumulate
//! until the key is recovered.

use crate::candidate_tracker::{CandidateTracker, Observation};
use crate::cipher::SBoxTables;
use crate::key_schedule::derive_master_key_with;
use crate::lambda_set::{CipherBatch, LambdaSet};
use crate::{AttackError, Block, CipherOracle, LambdaSetCount, ATTACK_ROUNDS, BLOCK_SIZE};
use rand::{CryptoRng, RngCore};

/// The default position of the active byte of every lambda set.
pub const DEFAULT_ACTIVE_POSITION: usize = 0;

/// The default number of lambda sets after which the attack gives up.
///
/// The attack typically converges within a handful of lambda sets;
/// a correctly keyed oracle exhausting this budget is practically impossible.
pub const DEFAULT_MAX_LAMBDA_SETS: LambdaSetCount = 256;

/// Parameters of an attack run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackConfig {
    /// The active byte position of generated lambda sets. Must be less than `BLOCK_SIZE`.
    pub active_position: usize,
    /// The maximum number of lambda sets to consume. Must be nonzero.
    pub max_lambda_sets: LambdaSetCount,
    /// The S-box of the attacked cipher, used for partial decryption and key schedule inversion.
    pub sbox: SBoxTables,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            active_position: DEFAULT_ACTIVE_POSITION,
            max_lambda_sets: DEFAULT_MAX_LAMBDA_SETS,
            sbox: SBoxTables::AES,
        }
    }
}

impl AttackConfig {
    fn validate(&self) -> Result<(), AttackError> {
        if self.active_position >= BLOCK_SIZE || self.max_lambda_sets == 0 {
            return Err(AttackError::InvalidConfigurationError);
        }
        Ok(())
    }
}

/// The output of a successful attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackReport {
    /// The recovered master key.
    pub master_key: Block,
    /// The recovered key of the final round, from which `master_key` was derived.
    pub final_round_key: Block,
    /// The number of lambda sets encrypted by the oracle.
    pub lambda_sets_used: LambdaSetCount,
}

/// The lifecycle of an attack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttackState {
    /// Some key bytes are still undetermined.
    Running,
    /// Every key byte is determined and the master key has been derived.
    Complete(AttackReport),
    /// The attack aborted. No key is reported.
    Failed(AttackError),
}

/// A snapshot of the attack's progress, for presentation purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// The number of lambda sets consumed so far.
    pub lambda_sets_used: LambdaSetCount,
    /// The number of key bytes still undetermined.
    pub positions_remaining: usize,
}

/// A Square attack against a caller-owned oracle.
#[derive(Debug)]
pub struct SquareAttack<'o, O: CipherOracle + ?Sized> {
    oracle: &'o mut O,
    config: AttackConfig,
    tracker: CandidateTracker,
    lambda_sets_used: LambdaSetCount,
    state: AttackState,
}

impl<'o, O: CipherOracle + ?Sized> SquareAttack<'o, O> {
    /// Prepares an attack on `oracle`.
    pub fn new(oracle: &'o mut O, config: AttackConfig) -> Result<Self, AttackError> {
        config.validate()?;

        log::debug!(
            "SquareAttack::new -- active position {}, budget {} lambda sets, AES S-box: {}",
            config.active_position,
            config.max_lambda_sets,
            config.sbox == SBoxTables::AES
        );

        Ok(Self {
            oracle,
            config,
            tracker: CandidateTracker::new(),
            lambda_sets_used: 0,
            state: AttackState::Running,
        })
    }

    /// The current state of the attack.
    pub fn state(&self) -> &AttackState {
        &self.state
    }

    /// The per-position guess statistics accumulated so far.
    pub fn tracker(&self) -> &CandidateTracker {
        &self.tracker
    }

    /// The current progress of the attack.
    pub fn progress(&self) -> Progress {
        Progress {
            lambda_sets_used: self.lambda_sets_used,
            positions_remaining: BLOCK_SIZE - self.tracker.determined(),
        }
    }

    /// Processes one fresh lambda set. Does nothing once the attack has completed or failed.
    pub fn step<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> &AttackState {
        if self.state == AttackState::Running {
            if let Err(e) = self.process_lambda_set(rng) {
                log::warn!("Square attack failed -- {}", e);
                self.state = AttackState::Failed(e);
            }
        }
        &self.state
    }

    /// Runs the attack to completion.
    pub fn run<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<AttackReport, AttackError> {
        loop {
            match self.step(rng) {
                AttackState::Running => {}
                AttackState::Complete(report) => return Ok(*report),
                AttackState::Failed(e) => return Err(e.clone()),
            }
        }
    }

    fn process_lambda_set<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), AttackError> {
        if self.lambda_sets_used >= self.config.max_lambda_sets {
            return Err(AttackError::BudgetExceededError {
                lambda_sets: self.lambda_sets_used,
            });
        }

        let lambda_set = LambdaSet::generate(self.config.active_position, rng)?;
        let batch = CipherBatch::encrypt(&lambda_set, &mut *self.oracle)?;
        self.lambda_sets_used += 1;

        let observations = self.tracker.observe(&batch, &self.config.sbox);
        for (position, observation) in observations.iter().enumerate() {
            if *observation == Observation::NoPositives {
                return Err(AttackError::OracleFaultError(format!(
                    "no key guess is consistent with key byte {position}"
                )));
            }
        }

        let progress = self.progress();
        log::info!(
            "Lambda set {} -- {} key bytes recovered, {} remaining",
            progress.lambda_sets_used,
            BLOCK_SIZE - progress.positions_remaining,
            progress.positions_remaining
        );

        if let Some(final_round_key) = self.tracker.recovered_key() {
            let master_key =
                derive_master_key_with(&final_round_key, ATTACK_ROUNDS, &self.config.sbox)?;
            log::info!(
                "Recovered master key {} from final round key {} with {} lambda sets",
                master_key,
                final_round_key,
                self.lambda_sets_used
            );
            self.state = AttackState::Complete(AttackReport {
                master_key,
                final_round_key,
                lambda_sets_used: self.lambda_sets_used,
            });
        }
        Ok(())
    }
}

/// Recovers the master key of `oracle` with the default configuration.
pub fn recover_master_key<O: CipherOracle + ?Sized, R: RngCore + CryptoRng>(
    oracle: &mut O,
    rng: &mut R,
) -> Result<AttackReport, AttackError> {
    SquareAttack::new(oracle, AttackConfig::default())?.run(rng)
}
