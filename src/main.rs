// ===============================
// src/main.rs
// ===============================
/*
 # play a seeded demo table and watch the counters
 RNG_SEED=7 TURNS=60 cargo run --release
 curl -s localhost:9898/metrics | egrep '^(turns_advanced|paydays|auctions_resolved)'
*/
/*
=============================================================================
Project : cashflow_engine — turn-based economic board game engine in Rust
Module  : main.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Runs game sessions held in an in-memory store: board movement with
          payday detection, asset deals and auctions, market sell-offs, a
          simulated stock market and bank loans. Exposes Prometheus metrics
          and records JSONL session events.
=============================================================================
*/
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cashflow_engine::board::Content;
use cashflow_engine::store::SessionStore;
use cashflow_engine::{bots, config, metrics, recorder, GameService};

#[tokio::main]
async fn main() -> ExitCode {
    // ---- Load config ----
    let (args, engine) = config::load();

    // ---- Logging ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ---- Metrics ----
    metrics::init();
    if args.metrics_port != 0 {
        tokio::spawn(metrics::serve_metrics(args.metrics_port));
    }

    // ---- Static content ----
    let content = match Content::load(args.board_file.as_deref(), args.doodad_file.as_deref()) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(%e, "content load failed");
            return ExitCode::FAILURE;
        }
    };
    info!(
        board = %content.board.name,
        spaces = content.board.len(),
        doodads = content.doodads.len(),
        code_length = engine.code_length,
        max_players = engine.max_players,
        seed = ?engine.rng_seed,
        bots = args.bots,
        turns = args.turns,
        "startup config"
    );

    // ---- Engine ----
    let store = Arc::new(SessionStore::new(engine.code_length));
    let seed = engine.rng_seed.unwrap_or_else(rand::random);
    let service = GameService::new(store, content, engine);

    // ---- Recorder (optional) ----
    let recorder = args.record_file.clone().map(|path| tokio::spawn(recorder::run(service.subscribe(), path)));

    // ---- Demo table ----
    let outcome = bots::run_table(&service, args.bots, args.turns, seed).await;

    // closing the channel lets the recorder flush and stop
    drop(service);
    if let Some(task) = recorder {
        let _ = task.await;
    }

    match outcome {
        Ok((code, standings)) => {
            for (rank, s) in standings.iter().enumerate() {
                info!(
                    %code,
                    rank = rank + 1,
                    name = %s.name,
                    cash = %s.cash,
                    net_income = %s.net_income,
                    assets = s.assets,
                    "standings"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(%e, kind = e.kind().as_str(), "table aborted");
            ExitCode::FAILURE
        }
    }
}
