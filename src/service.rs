// ===============================
// src/service.rs (engine façade: one entry point per player action)
// ===============================
//
// Flow of every call:
//   1) look the session up in the store (case-insensitive code)
//   2) lock that one session, validate + mutate, take a snapshot
//   3) release the lock
//   4) bump metrics and publish the event (changed / rejected)
//
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::board::Content;
use crate::config::EngineConfig;
use crate::deals::DealSize;
use crate::error::{ErrorKind, GameError, GameResult};
use crate::finance::Profession;
use crate::metrics::{
    ACTIONS, AUCTIONS, MARKET_QUORUMS, PAYDAYS, PLAYERS_JOINED, REJECTIONS, SESSIONS_CREATED, SESSIONS_LIVE, TURNS,
};
use crate::player::{Player, PlayerId};
use crate::professions;
use crate::session::{AuctionResult, Effects, Game, PaymentMethod};
use crate::snapshot::GameSnapshot;
use crate::store::{self, SessionStore};

const EVENT_BUFFER: usize = 1024;

/// A player action as a transport would decode it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    SelectProfession { name: String },
    SetIcon { icon: String },
    Move { spaces: u32 },
    EndTurn,
    Confirm,
    PayDoodad { method: PaymentMethod },
    BuyCharity,
    GetDeal { size: DealSize },
    BuyDeal,
    BuyDealWithLoan,
    SellDeal,
    PlaceBid { amount: Decimal },
    PassBid,
    SellToMarket { asset_id: Uuid },
    MarketPass,
    BuyStock { ticker: String, quantity: u32 },
    SellStock { ticker: String, quantity: u32 },
    TakeOutLoan { amount: Decimal, term_years: u32 },
    PayOffLoan { liability_id: Uuid, amount: Decimal },
    RemovePlayer { target: PlayerId },
    Leave,
    /// Anything this engine does not know. Applied as a no-op.
    #[serde(other)]
    Unsupported,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SelectProfession { .. } => "select_profession",
            Action::SetIcon { .. } => "set_icon",
            Action::Move { .. } => "move",
            Action::EndTurn => "end_turn",
            Action::Confirm => "confirm",
            Action::PayDoodad { .. } => "pay_doodad",
            Action::BuyCharity => "buy_charity",
            Action::GetDeal { .. } => "get_deal",
            Action::BuyDeal => "buy_deal",
            Action::BuyDealWithLoan => "buy_deal_with_loan",
            Action::SellDeal => "sell_deal",
            Action::PlaceBid { .. } => "place_bid",
            Action::PassBid => "pass_bid",
            Action::SellToMarket { .. } => "sell_to_market",
            Action::MarketPass => "market_pass",
            Action::BuyStock { .. } => "buy_stock",
            Action::SellStock { .. } => "sell_stock",
            Action::TakeOutLoan { .. } => "take_out_loan",
            Action::PayOffLoan { .. } => "pay_off_loan",
            Action::RemovePlayer { .. } => "remove_player",
            Action::Leave => "leave",
            Action::Unsupported => "unsupported",
        }
    }
}

/// Published after a mutation commits, or when one is rejected.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    SessionChanged { ts: DateTime<Utc>, code: String, action: &'static str, snapshot: GameSnapshot },
    Rejected {
        ts: DateTime<Utc>,
        code: String,
        player: Option<PlayerId>,
        action: &'static str,
        kind: ErrorKind,
        reason: String,
    },
}

/// Result of creating or joining a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Joined {
    pub player_id: PlayerId,
    pub snapshot: GameSnapshot,
}

pub struct GameService {
    store: Arc<SessionStore>,
    content: Arc<Content>,
    config: EngineConfig,
    events: broadcast::Sender<Event>,
    sessions_opened: AtomicU64,
}

impl GameService {
    pub fn new(store: Arc<SessionStore>, content: Arc<Content>, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { store, content, config, events, sessions_opened: AtomicU64::new(0) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Seeded per session when a seed is configured, otherwise from entropy.
    fn session_rng(&self) -> ChaCha8Rng {
        let ordinal = self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        match self.config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(ordinal)),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn publish(&self, event: Event) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn reject(&self, code: &str, player: Option<PlayerId>, action: &'static str, err: &GameError) {
        let kind = err.kind();
        REJECTIONS.with_label_values(&[kind.as_str()]).inc();
        warn!(code = %code, player = ?player, action, kind = kind.as_str(), reason = %err, "action rejected");
        self.publish(Event::Rejected {
            ts: Utc::now(),
            code: store::normalize_code(code),
            player,
            action,
            kind,
            reason: err.to_string(),
        });
    }

    fn changed(&self, action: &'static str, snapshot: &GameSnapshot) {
        ACTIONS.with_label_values(&[action]).inc();
        self.publish(Event::SessionChanged {
            ts: Utc::now(),
            code: snapshot.code.clone(),
            action,
            snapshot: snapshot.clone(),
        });
    }

    // ---------- lobby ----------

    pub fn create_game(&self, player_name: &str) -> GameResult<Joined> {
        let name = player_name.trim();
        if name.is_empty() {
            let err = GameError::invalid("player name must not be empty");
            self.reject("", None, "create_game", &err);
            return Err(err);
        }
        let creator = Player::new(name);
        let player_id = creator.id;
        let mut session_rng = self.session_rng();
        let mut code_rng = ChaCha8Rng::seed_from_u64(session_rng.gen());
        let content = self.content.clone();
        let created = self.store.create(&mut code_rng, |code| Game::new(code, creator, content, session_rng));
        let shared = match created {
            Ok(shared) => shared,
            Err(e) => {
                self.reject("", None, "create_game", &e);
                return Err(e);
            }
        };
        let snapshot = GameSnapshot::from(&*store::lock(&shared));

        SESSIONS_CREATED.inc();
        PLAYERS_JOINED.inc();
        SESSIONS_LIVE.set(self.store.len() as i64);
        info!(code = %snapshot.code, player = %player_id, name, "session created");
        self.changed("create_game", &snapshot);
        Ok(Joined { player_id, snapshot })
    }

    fn try_join(&self, code: &str, player_name: &str) -> GameResult<Joined> {
        let name = player_name.trim();
        if name.is_empty() {
            return Err(GameError::invalid("player name must not be empty"));
        }
        let shared = self.store.get(code)?;
        let mut game = store::lock(&shared);
        let player_id = game.join(Player::new(name), self.config.max_players)?;
        Ok(Joined { player_id, snapshot: GameSnapshot::from(&*game) })
    }

    pub fn join_game(&self, code: &str, player_name: &str) -> GameResult<Joined> {
        match self.try_join(code, player_name) {
            Ok(joined) => {
                PLAYERS_JOINED.inc();
                self.changed("join_game", &joined.snapshot);
                Ok(joined)
            }
            Err(e) => {
                self.reject(code, None, "join_game", &e);
                Err(e)
            }
        }
    }

    /// Profession catalog offered to new players.
    pub fn professions(&self) -> Vec<Profession> {
        professions::catalog()
    }

    pub fn snapshot(&self, code: &str) -> GameResult<GameSnapshot> {
        let shared = self.store.get(code)?;
        let game = store::lock(&shared);
        Ok(GameSnapshot::from(&*game))
    }

    /// Drop a session from the store. Returns whether it existed.
    pub fn evict(&self, code: &str) -> bool {
        let removed = self.store.evict(code);
        SESSIONS_LIVE.set(self.store.len() as i64);
        if removed {
            info!(code = %store::normalize_code(code), "session evicted");
        }
        removed
    }

    // ---------- actions ----------

    /// Apply one action for `player` in session `code` and return the new
    /// snapshot. Rejections leave the session untouched.
    pub fn apply(&self, code: &str, player: PlayerId, action: Action) -> GameResult<GameSnapshot> {
        let name = action.name();
        let result = self.store.get(code).and_then(|shared| {
            let mut game = store::lock(&shared);
            let effects = dispatch(&mut game, player, action)?;
            Ok((GameSnapshot::from(&*game), effects))
        });

        match result {
            Ok((snapshot, Some(effects))) => {
                record_effects(&effects);
                debug!(code = %snapshot.code, player = %player, action = name, "action applied");
                self.changed(name, &snapshot);
                Ok(snapshot)
            }
            Ok((snapshot, None)) => {
                debug!(code = %snapshot.code, player = %player, action = name, "unsupported action ignored");
                Ok(snapshot)
            }
            Err(e) => {
                self.reject(code, Some(player), name, &e);
                Err(e)
            }
        }
    }

    pub fn select_profession(&self, code: &str, player: PlayerId, name: &str) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::SelectProfession { name: name.to_string() })
    }

    pub fn set_icon(&self, code: &str, player: PlayerId, icon: &str) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::SetIcon { icon: icon.to_string() })
    }

    pub fn move_player(&self, code: &str, player: PlayerId, spaces: u32) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::Move { spaces })
    }

    pub fn end_turn(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::EndTurn)
    }

    pub fn confirm(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::Confirm)
    }

    pub fn pay_doodad(&self, code: &str, player: PlayerId, method: PaymentMethod) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::PayDoodad { method })
    }

    pub fn buy_charity(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::BuyCharity)
    }

    pub fn get_deal(&self, code: &str, player: PlayerId, size: DealSize) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::GetDeal { size })
    }

    pub fn buy_deal(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::BuyDeal)
    }

    pub fn buy_deal_with_loan(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::BuyDealWithLoan)
    }

    pub fn sell_deal(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::SellDeal)
    }

    pub fn place_bid(&self, code: &str, player: PlayerId, amount: Decimal) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::PlaceBid { amount })
    }

    pub fn pass_bid(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::PassBid)
    }

    pub fn sell_to_market(&self, code: &str, player: PlayerId, asset_id: Uuid) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::SellToMarket { asset_id })
    }

    pub fn market_pass(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::MarketPass)
    }

    pub fn buy_stock(&self, code: &str, player: PlayerId, ticker: &str, quantity: u32) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::BuyStock { ticker: ticker.to_string(), quantity })
    }

    pub fn sell_stock(&self, code: &str, player: PlayerId, ticker: &str, quantity: u32) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::SellStock { ticker: ticker.to_string(), quantity })
    }

    pub fn take_out_loan(
        &self,
        code: &str,
        player: PlayerId,
        amount: Decimal,
        term_years: u32,
    ) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::TakeOutLoan { amount, term_years })
    }

    pub fn pay_off_loan(
        &self,
        code: &str,
        player: PlayerId,
        liability_id: Uuid,
        amount: Decimal,
    ) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::PayOffLoan { liability_id, amount })
    }

    pub fn remove_player(&self, code: &str, creator: PlayerId, target: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, creator, Action::RemovePlayer { target })
    }

    pub fn leave_game(&self, code: &str, player: PlayerId) -> GameResult<GameSnapshot> {
        self.apply(code, player, Action::Leave)
    }
}

/// `None` means the action was ignored.
fn dispatch(game: &mut Game, actor: PlayerId, action: Action) -> GameResult<Option<Effects>> {
    let none = Effects::default();
    let effects = match action {
        Action::SelectProfession { name } => game.select_profession(actor, &name).map(|_| none)?,
        Action::SetIcon { icon } => game.set_icon(actor, &icon).map(|_| none)?,
        Action::Move { spaces } => game.move_player(actor, spaces)?,
        Action::EndTurn => game.end_turn(actor)?,
        Action::Confirm => game.confirm(actor).map(|_| none)?,
        Action::PayDoodad { method } => game.pay_doodad(actor, method).map(|_| none)?,
        Action::BuyCharity => game.buy_charity(actor).map(|_| none)?,
        Action::GetDeal { size } => game.get_deal(actor, size).map(|_| none)?,
        Action::BuyDeal => game.buy_deal(actor).map(|_| none)?,
        Action::BuyDealWithLoan => game.buy_deal_with_loan(actor).map(|_| none)?,
        Action::SellDeal => game.sell_deal(actor).map(|_| none)?,
        Action::PlaceBid { amount } => game.place_bid(actor, amount)?,
        Action::PassBid => game.pass_bid(actor)?,
        Action::SellToMarket { asset_id } => game.sell_to_market(actor, asset_id)?,
        Action::MarketPass => game.market_pass(actor)?,
        Action::BuyStock { ticker, quantity } => game.buy_stock(actor, &ticker, quantity).map(|_| none)?,
        Action::SellStock { ticker, quantity } => game.sell_stock(actor, &ticker, quantity).map(|_| none)?,
        Action::TakeOutLoan { amount, term_years } => game.take_out_loan(actor, amount, term_years).map(|_| none)?,
        Action::PayOffLoan { liability_id, amount } => {
            game.pay_off_loan(actor, liability_id, amount).map(|_| none)?
        }
        Action::RemovePlayer { target } => game.remove_player(actor, target)?,
        Action::Leave => game.leave(actor)?,
        Action::Unsupported => return Ok(None),
    };
    Ok(Some(effects))
}

fn record_effects(effects: &Effects) {
    if effects.paydays > 0 {
        PAYDAYS.inc_by(u64::from(effects.paydays));
    }
    if effects.turn_advanced {
        TURNS.inc();
    }
    if effects.market_closed {
        MARKET_QUORUMS.inc();
    }
    if let Some(result) = &effects.auction {
        let outcome = match result {
            AuctionResult::Sold { .. } => "sold",
            AuctionResult::NoBids => "no_bids",
            AuctionResult::Cancelled => "cancelled",
        };
        AUCTIONS.with_label_values(&[outcome]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> GameService {
        let config = EngineConfig { rng_seed: Some(11), ..EngineConfig::default() };
        GameService::new(Arc::new(SessionStore::new(4)), Arc::new(Content::builtin().unwrap()), config)
    }

    #[test]
    fn actions_decode_from_tagged_json() {
        let a: Action = serde_json::from_str(r#"{"action":"move","spaces":5}"#).unwrap();
        assert_eq!(a, Action::Move { spaces: 5 });
        let a: Action = serde_json::from_str(r#"{"action":"takeOutLoan","amount":1000,"termYears":2}"#).unwrap();
        assert_eq!(a, Action::TakeOutLoan { amount: Decimal::from(1000), term_years: 2 });
        let a: Action = serde_json::from_str(r#"{"action":"teleport"}"#).unwrap();
        assert_eq!(a, Action::Unsupported);
    }

    #[test]
    fn unsupported_actions_are_silent() {
        let svc = service();
        let host = svc.create_game("Host").unwrap();
        let mut rx = svc.subscribe();
        let snap = svc.apply(&host.snapshot.code, host.player_id, Action::Unsupported).unwrap();
        assert_eq!(snap, host.snapshot);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn rejections_are_published_and_change_nothing() {
        let svc = service();
        let host = svc.create_game("Host").unwrap();
        let guest = svc.join_game(&host.snapshot.code.to_ascii_lowercase(), "Guest").unwrap();
        let mut rx = svc.subscribe();

        let err = svc.move_player(&host.snapshot.code, guest.player_id, 3).unwrap_err();
        assert_eq!(err, GameError::NotYourTurn);
        match rx.try_recv().unwrap() {
            Event::Rejected { kind, action, .. } => {
                assert_eq!(kind, ErrorKind::NotAuthorized);
                assert_eq!(action, "move");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(svc.snapshot(&host.snapshot.code).unwrap(), guest.snapshot);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let svc = service();
        let err = svc.end_turn("ZZZZ", Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(svc.join_game("ZZZZ", "x").is_err());
    }

    #[test]
    fn successful_actions_broadcast_the_snapshot() {
        let svc = service();
        let host = svc.create_game("Host").unwrap();
        let mut rx = svc.subscribe();
        let snap = svc.select_profession(&host.snapshot.code, host.player_id, "Teacher").unwrap();
        match rx.try_recv().unwrap() {
            Event::SessionChanged { snapshot, action, .. } => {
                assert_eq!(action, "select_profession");
                assert_eq!(snapshot, snap);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
