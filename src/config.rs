// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : cashflow_engine — turn-based economic board game engine in Rust
Module  : config.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Runs game sessions held in an in-memory store: board movement with
          payday detection, asset deals and auctions, market sell-offs, a
          simulated stock market and bank loans. Exposes Prometheus metrics
          and records JSONL session events.
=============================================================================
*/
use std::path::PathBuf;

use clap::Parser;
use dotenvy::dotenv;

/// Flags for the headless table driver. Every flag falls back to the
/// environment (and `.env`).
#[derive(Parser, Clone, Debug)]
#[command(name = "cashflow_engine", about = "Headless Cashflow table driver")]
pub struct Args {
    /// Length of generated session codes
    #[arg(long, env = "CODE_LENGTH", default_value_t = 4)]
    pub code_length: usize,

    /// Seats per session
    #[arg(long, env = "MAX_PLAYERS", default_value_t = 8)]
    pub max_players: usize,

    /// JSON board layout replacing the built-in one
    #[arg(long, env = "BOARD_FILE")]
    pub board_file: Option<PathBuf>,

    /// JSON doodad table replacing the built-in one
    #[arg(long, env = "DOODAD_FILE")]
    pub doodad_file: Option<PathBuf>,

    /// Seed for reproducible sessions
    #[arg(long, env = "RNG_SEED")]
    pub rng_seed: Option<u64>,

    /// Prometheus port, 0 disables the endpoint
    #[arg(long, env = "METRICS_PORT", default_value_t = 9898)]
    pub metrics_port: u16,

    /// Append every session event to this JSONL file
    #[arg(long, env = "RECORD_FILE")]
    pub record_file: Option<PathBuf>,

    /// Bot players seated at the demo table
    #[arg(long, env = "BOTS", default_value_t = 3)]
    pub bots: usize,

    /// Turns to play before printing standings
    #[arg(long, env = "TURNS", default_value_t = 40)]
    pub turns: u32,
}

/// Engine tunables, independent of how the process was started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub code_length: usize,
    pub max_players: usize,
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { code_length: 4, max_players: 8, rng_seed: None }
    }
}

impl From<&Args> for EngineConfig {
    fn from(a: &Args) -> Self {
        Self { code_length: a.code_length.max(1), max_players: a.max_players.max(1), rng_seed: a.rng_seed }
    }
}

pub fn load() -> (Args, EngineConfig) {
    // .env first so clap sees those values as environment
    let _ = dotenv();
    let args = Args::parse();
    let engine = EngineConfig::from(&args);
    (args, engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::try_parse_from(["cashflow_engine"]).unwrap();
        assert_eq!(args.metrics_port, 9898);
        assert_eq!(args.bots, 3);
        assert_eq!(args.turns, 40);
        assert_eq!(EngineConfig::from(&args).code_length, 4);
    }

    #[test]
    fn flags_override_defaults() {
        let args =
            Args::try_parse_from(["cashflow_engine", "--max-players", "4", "--rng-seed", "7", "--code-length", "0"])
                .unwrap();
        let engine = EngineConfig::from(&args);
        assert_eq!(engine.max_players, 4);
        assert_eq!(engine.rng_seed, Some(7));
        assert_eq!(engine.code_length, 1);
    }
}
