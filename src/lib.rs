// ===============================
// src/lib.rs
// ===============================
pub mod auction;
pub mod board;
pub mod bots;
pub mod config;
pub mod deals;
pub mod error;
pub mod finance;
pub mod loans;
pub mod market;
pub mod metrics;
pub mod player;
pub mod professions;
pub mod recorder;
pub mod service;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod weights;

pub use error::{ErrorKind, GameError, GameResult};
pub use service::{Action, Event, GameService, Joined};
pub use snapshot::{GameSnapshot, PlayerView};
