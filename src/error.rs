// ===============================
// src/error.rs
// ===============================
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Coarse rejection category reported back to the acting connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    NotAuthorized,
    InvalidInput,
    InsufficientFunds,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::NotAuthorized => "not_authorized",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InsufficientFunds => "insufficient_funds",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GameError {
    #[error("Game not found")]
    SessionNotFound(String),
    #[error("Player not found")]
    PlayerNotFound(Uuid),
    #[error("Asset not found")]
    AssetNotFound(Uuid),
    #[error("Liability not found")]
    LiabilityNotFound(Uuid),
    #[error("Unknown ticker {0}")]
    UnknownTicker(String),
    #[error("Unknown profession {0}")]
    UnknownProfession(String),

    #[error("It is not your turn")]
    NotYourTurn,
    #[error("Only the game creator can do that")]
    CreatorOnly,
    #[error("Player has left the game")]
    PlayerInactive,

    #[error("Icon {0} is already taken")]
    IconTaken(String),
    #[error("Game is full")]
    SessionFull,
    #[error("No free game code")]
    CodesExhausted,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Already responded")]
    AlreadyResponded,

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
}

impl GameError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        GameError::InvalidInput(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::SessionNotFound(_)
            | GameError::PlayerNotFound(_)
            | GameError::AssetNotFound(_)
            | GameError::LiabilityNotFound(_)
            | GameError::UnknownTicker(_)
            | GameError::UnknownProfession(_) => ErrorKind::NotFound,
            GameError::NotYourTurn | GameError::CreatorOnly | GameError::PlayerInactive => {
                ErrorKind::NotAuthorized
            }
            GameError::IconTaken(_)
            | GameError::SessionFull
            | GameError::CodesExhausted
            | GameError::InvalidInput(_)
            | GameError::AlreadyResponded => ErrorKind::InvalidInput,
            GameError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(GameError::SessionNotFound("ABCD".into()).kind(), ErrorKind::NotFound);
        assert_eq!(GameError::NotYourTurn.kind(), ErrorKind::NotAuthorized);
        assert_eq!(GameError::CreatorOnly.kind(), ErrorKind::NotAuthorized);
        assert_eq!(GameError::IconTaken("🐸".into()).kind(), ErrorKind::InvalidInput);
        assert_eq!(GameError::CodesExhausted.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            GameError::InsufficientFunds { needed: Decimal::TEN, available: Decimal::ONE }.kind(),
            ErrorKind::InsufficientFunds
        );
    }

    #[test]
    fn messages_are_human_readable() {
        let e = GameError::InsufficientFunds { needed: Decimal::new(1500, 0), available: Decimal::new(200, 0) };
        assert_eq!(e.to_string(), "Insufficient funds: need 1500, have 200");
        assert_eq!(GameError::invalid("amount must be positive").to_string(), "amount must be positive");
    }
}
