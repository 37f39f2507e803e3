// ===============================
// src/snapshot.rs (read-only views broadcast to clients)
// ===============================
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::market::StockMarket;
use crate::player::{Player, PlayerId};
use crate::session::{Game, PendingEvent};

/// A player with every derived figure materialised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    #[serde(flatten)]
    pub player: Player,
    pub income: Decimal,
    pub taxes: Decimal,
    pub child_expenses: Decimal,
    pub expenses: Decimal,
    pub net_income: Decimal,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            player: p.clone(),
            income: p.income(),
            taxes: p.taxes(),
            child_expenses: p.child_expenses(),
            expenses: p.expenses(),
            net_income: p.net_income(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub id: Uuid,
    pub code: String,
    pub creator_id: PlayerId,
    pub current_player_id: PlayerId,
    pub turn: u32,
    pub board_name: String,
    pub board_length: u32,
    pub players: Vec<PlayerView>,
    pub stock_market: StockMarket,
    pub pending: Option<PendingEvent>,
}

impl GameSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.player.id == id)
    }
}

impl From<&Game> for GameSnapshot {
    fn from(g: &Game) -> Self {
        Self {
            id: g.id,
            code: g.code.clone(),
            creator_id: g.creator_id,
            current_player_id: g.current_player_id,
            turn: g.turn,
            board_name: g.content().board.name.clone(),
            board_length: g.content().board.len(),
            players: g.players.iter().map(PlayerView::from).collect(),
            stock_market: g.stock_market.clone(),
            pending: g.pending.clone(),
        }
    }
}
