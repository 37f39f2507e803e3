// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use tracing::{error, info};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Sessions --------
pub static SESSIONS_CREATED: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("sessions_created_total", "game sessions created").unwrap());

pub static SESSIONS_LIVE: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("sessions_live", "sessions currently held in the store").unwrap());

pub static PLAYERS_JOINED: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("players_joined_total", "players seated, creators included").unwrap());

// -------- Actions --------
pub static ACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("actions_total", "actions applied (label: action)"), &["action"]).unwrap()
});

pub static REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("rejections_total", "actions rejected (label: kind)"), &["kind"]).unwrap()
});

// -------- Game flow --------
pub static TURNS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("turns_advanced_total", "turns handed to the next player").unwrap());

pub static PAYDAYS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("paydays_total", "payday credits applied").unwrap());

pub static AUCTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("auctions_resolved_total", "auctions closed (label: outcome = sold|no_bids|cancelled)"),
        &["outcome"],
    )
    .unwrap()
});

pub static MARKET_QUORUMS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("market_quorums_total", "market events closed by quorum").unwrap());

pub fn init() {
    // Register all metrics to the custom registry; a second call is a no-op
    for m in [
        REGISTRY.register(Box::new(SESSIONS_CREATED.clone())),
        REGISTRY.register(Box::new(SESSIONS_LIVE.clone())),
        REGISTRY.register(Box::new(PLAYERS_JOINED.clone())),
        REGISTRY.register(Box::new(ACTIONS.clone())),
        REGISTRY.register(Box::new(REJECTIONS.clone())),
        REGISTRY.register(Box::new(TURNS.clone())),
        REGISTRY.register(Box::new(PAYDAYS.clone())),
        REGISTRY.register(Box::new(AUCTIONS.clone())),
        REGISTRY.register(Box::new(MARKET_QUORUMS.clone())),
    ] {
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

// Serve one HTTP request (GET / or /metrics), tiny HTTP 1.1 responder
fn handle_client(mut stream: TcpStream) {
    // Read a bit to consume headers (no full parse)
    let mut _req_buf = [0u8; 1024];
    let _ = stream.read(&mut _req_buf);

    let body = encode_metrics();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

// Run the metrics server in a dedicated OS thread (keeps Tokio runtime clean)
pub async fn serve_metrics(port: u16) {
    thread::spawn(move || {
        let addr = format!("0.0.0.0:{port}");
        let listener = match TcpListener::bind(&addr) {
            Ok(l) => l,
            Err(e) => {
                error!(%addr, ?e, "metrics bind failed, endpoint disabled");
                return;
            }
        };
        info!("metrics listening on http://{addr}/ (and /metrics)");

        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => error!(?e, "metrics accept error"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_counters_show_up_in_text_output() {
        init();
        init();
        ACTIONS.with_label_values(&["move"]).inc();
        let text = String::from_utf8(encode_metrics()).unwrap();
        assert!(text.contains("actions_total"));
    }
}
