// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Recovers a master key from a 3.5-round AES oracle.
//!
//! Usage: `cargo run --example recover_key [32 hex digit key]`.
//! Without an argument, a random key is used.

use rand::rngs::OsRng;
use rand::Rng;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use square_attack::cipher::ReducedAes;
use square_attack::{recover_master_key, Block, ATTACK_ROUNDS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    TermLogger::init(
        log::LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let mut rng = OsRng;
    let key = match std::env::args().nth(1) {
        Some(hex) => hex.parse::<Block>()?,
        None => rng.gen(),
    };

    let mut oracle = ReducedAes::new(&key, ATTACK_ROUNDS)?;
    let report = recover_master_key(&mut oracle, &mut rng)?;

    println!("Original key:         {}", key);
    println!("Final round key:      {}", report.final_round_key);
    println!("Recovered master key: {}", report.master_key);
    println!("Lambda sets used:     {}", report.lambda_sets_used);

    if report.master_key != key {
        return Err(format!("recovered key {} does not match {}", report.master_key, key).into());
    }
    Ok(())
}
