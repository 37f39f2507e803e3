// ===============================
// src/board.rs (static content: board layout & doodad table)
// ===============================
use std::path::Path;

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weights;

const DEFAULT_BOARD: &str = include_str!("../content/board.json");
const DEFAULT_DOODADS: &str = include_str!("../content/doodads.json");

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("read {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("parse {what}: {source}")]
    Parse { what: String, source: serde_json::Error },
    #[error("board has no spaces")]
    EmptyBoard,
    #[error("doodad table is empty")]
    EmptyDoodads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpaceKind {
    Payday,
    Deal,
    Market,
    Doodad,
    Charity,
    Baby,
    Downsized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSpace {
    pub id: u32,
    pub name: String,
    pub kind: SpaceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub name: String,
    pub spaces: Vec<BoardSpace>,
}

/// Result of one move along the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub to: u32,
    /// A payday space lies in `(from, to]`, wrap-around included.
    pub passed_payday: bool,
}

impl Board {
    pub fn len(&self) -> u32 {
        self.spaces.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// Space kind at a 1-based position.
    pub fn kind_at(&self, position: u32) -> Option<SpaceKind> {
        let idx = position.checked_sub(1)? as usize;
        self.spaces.get(idx).map(|s| s.kind)
    }

    fn wrap(&self, from: u32, steps: u32) -> u32 {
        let len = u64::from(self.len().max(1));
        let zero_based = (u64::from(from.saturating_sub(1)) + u64::from(steps)) % len;
        // < len, so it fits back into u32
        zero_based as u32 + 1
    }

    /// Walk `steps` spaces from `from`, wrapping back into `[1, len]`.
    ///
    /// Every space between the old position (exclusive) and the new one
    /// (inclusive) is checked, so the tail of the old lap and the head of the
    /// new lap are both covered.
    pub fn advance(&self, from: u32, steps: u32) -> Step {
        let scan = steps.min(self.len());
        let passed_payday = (1..=scan).any(|k| self.kind_at(self.wrap(from, k)) == Some(SpaceKind::Payday));
        Step { to: self.wrap(from, steps), passed_payday }
    }
}

/// Random "you spent money on something" expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doodad {
    pub name: String,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoodadEntry {
    pub name: String,
    pub cost: Decimal,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Static data shared by every session.
#[derive(Debug, Clone)]
pub struct Content {
    pub board: Board,
    pub doodads: Vec<DoodadEntry>,
}

fn parse<T: serde::de::DeserializeOwned>(what: &str, raw: &str) -> Result<T, ContentError> {
    serde_json::from_str(raw).map_err(|source| ContentError::Parse { what: what.to_string(), source })
}

fn read(path: &Path) -> Result<String, ContentError> {
    std::fs::read_to_string(path).map_err(|source| ContentError::Io { path: path.display().to_string(), source })
}

impl Content {
    /// Built-in board and doodad table.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_json(DEFAULT_BOARD, DEFAULT_DOODADS)
    }

    pub fn from_json(board: &str, doodads: &str) -> Result<Self, ContentError> {
        let board: Board = parse("board", board)?;
        let doodads: Vec<DoodadEntry> = parse("doodads", doodads)?;
        if board.spaces.is_empty() {
            return Err(ContentError::EmptyBoard);
        }
        if doodads.iter().all(|d| d.weight == 0) {
            return Err(ContentError::EmptyDoodads);
        }
        Ok(Self { board, doodads })
    }

    /// Built-ins, each optionally replaced by a JSON file.
    pub fn load(board_file: Option<&Path>, doodad_file: Option<&Path>) -> Result<Self, ContentError> {
        let board = match board_file {
            Some(p) => read(p)?,
            None => DEFAULT_BOARD.to_string(),
        };
        let doodads = match doodad_file {
            Some(p) => read(p)?,
            None => DEFAULT_DOODADS.to_string(),
        };
        Self::from_json(&board, &doodads)
    }

    pub fn draw_doodad<R: Rng + ?Sized>(&self, rng: &mut R) -> Doodad {
        let weights: Vec<u32> = self.doodads.iter().map(|d| d.weight).collect();
        let idx = weights::pick_index(rng, &weights).unwrap_or(0);
        let entry = &self.doodads[idx];
        Doodad { name: entry.name.clone(), cost: entry.cost }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Board {
        Content::builtin().unwrap().board
    }

    #[test]
    fn builtin_board_shape() {
        let b = board();
        assert_eq!(b.len(), 24);
        assert_eq!(b.kind_at(6), Some(SpaceKind::Payday));
        assert_eq!(b.kind_at(0), None);
        assert_eq!(b.kind_at(25), None);
    }

    #[test]
    fn wraps_into_range() {
        let b = board();
        assert_eq!(b.advance(20, 4).to, 24);
        assert_eq!(b.advance(20, 5).to, 1);
        assert_eq!(b.advance(24, 12).to, 12);
    }

    #[test]
    fn huge_moves_wrap_without_overflow() {
        let b = board();
        // u32::MAX = 24 * 178956970 + 15
        let step = b.advance(24, u32::MAX);
        assert_eq!(step.to, 15);
        assert!(step.passed_payday);
        assert_eq!(b.advance(1, u32::MAX).to, 16);
    }

    #[test]
    fn payday_detection() {
        let b = board();
        // 3 -> 5: no payday between
        assert!(!b.advance(3, 2).passed_payday);
        // 3 -> 9 crosses 6
        assert!(b.advance(3, 6).passed_payday);
        // landing exactly on 6 counts
        assert!(b.advance(3, 3).passed_payday);
        // leaving a payday does not count
        assert!(!b.advance(6, 1).passed_payday);
        // wrap-around: 23 -> 2 has no payday (24 is market)
        assert!(!b.advance(23, 3).passed_payday);
        // wrap-around: 21 -> 7 crosses 22 and 6
        assert!(b.advance(21, 10).passed_payday);
    }

    #[test]
    fn empty_board_is_rejected() {
        let err = Content::from_json(r#"{"name":"x","spaces":[]}"#, DEFAULT_DOODADS).unwrap_err();
        assert!(matches!(err, ContentError::EmptyBoard));
    }
}
