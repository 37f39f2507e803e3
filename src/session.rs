// ===============================
// src/session.rs (game session & turn engine)
// ===============================
//
// One `Game` is one table. Every method validates first and mutates after,
// so a rejected call leaves the table untouched. The session store hands out
// exclusive access to one game per action; nothing here locks.
//
use std::sync::Arc;

use ahash::AHashSet;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auction::AuctionState;
use crate::board::{Content, Doodad, SpaceKind};
use crate::deals::{self, DealSize, PurchaseOffer};
use crate::error::{GameError, GameResult};
use crate::finance::{round2, Asset, Liability};
use crate::loans;
use crate::market::StockMarket;
use crate::player::{Player, PlayerId, STATUS_TURNS};
use crate::professions;

pub const ICONS: &[&str] = &["🐸", "🦊", "🐼", "🐙", "🦄", "🐝", "🐢", "🦉", "🐳", "🦁"];

fn charity_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Deal the current player is looking at.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealOffer {
    pub size: Option<DealSize>,
    /// Drawn by `get_deal`; taken away once bought or auctioned.
    pub asset: Option<Asset>,
    pub auction: Option<AuctionState>,
}

/// Buy-side offer every asset holder may answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEvent {
    pub offer: PurchaseOffer,
    pub responded: AHashSet<PlayerId>,
}

/// The one board-triggered event a table can have open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PendingEvent {
    /// Payday, baby, downsized or doodad notice. Doodads carry the bill.
    Confirm { kind: SpaceKind, doodad: Option<Doodad> },
    Deal(DealOffer),
    Market(MarketEvent),
    Charity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    Cash,
    Credit,
}

/// Side effects of one action, for logs and metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub paydays: u32,
    pub landed: Option<SpaceKind>,
    pub turn_advanced: bool,
    pub auction: Option<AuctionResult>,
    pub market_closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionResult {
    Sold { winner: PlayerId, bid: Decimal },
    NoBids,
    Cancelled,
}

pub struct Game {
    pub id: Uuid,
    pub code: String,
    pub creator_id: PlayerId,
    pub current_player_id: PlayerId,
    /// Seating order; departed players stay, flagged inactive.
    pub players: Vec<Player>,
    pub stock_market: StockMarket,
    pub pending: Option<PendingEvent>,
    pub turn: u32,
    content: Arc<Content>,
    rng: ChaCha8Rng,
}

impl Game {
    /// Open a table with its creator seated and holding the first turn.
    pub fn new(code: impl Into<String>, mut creator: Player, content: Arc<Content>, rng: ChaCha8Rng) -> Self {
        creator.icon = ICONS[0].to_string();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            creator_id: creator.id,
            current_player_id: creator.id,
            players: vec![creator],
            stock_market: StockMarket::new(),
            pending: None,
            turn: 1,
            content,
            rng,
        }
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active)
    }

    fn active_ids(&self) -> Vec<PlayerId> {
        self.active_players().map(|p| p.id).collect()
    }

    fn seats(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    fn index_of(&self, id: PlayerId) -> GameResult<usize> {
        self.players.iter().position(|p| p.id == id).ok_or(GameError::PlayerNotFound(id))
    }

    pub fn player(&self, id: PlayerId) -> GameResult<&Player> {
        self.index_of(id).map(|i| &self.players[i])
    }

    /// Seated and still playing.
    fn member(&self, id: PlayerId) -> GameResult<usize> {
        let idx = self.index_of(id)?;
        if !self.players[idx].is_active {
            return Err(GameError::PlayerInactive);
        }
        Ok(idx)
    }

    /// Seated, playing, and holding the turn.
    fn turn_holder(&self, id: PlayerId) -> GameResult<usize> {
        let idx = self.member(id)?;
        if self.current_player_id != id {
            return Err(GameError::NotYourTurn);
        }
        Ok(idx)
    }

    fn free_icon(&self) -> String {
        let used: AHashSet<&str> = self.active_players().map(|p| p.icon.as_str()).collect();
        ICONS.iter().find(|i| !used.contains(*i)).unwrap_or(&ICONS[0]).to_string()
    }

    // ---------- lobby ----------

    pub fn join(&mut self, mut player: Player, max_players: usize) -> GameResult<PlayerId> {
        if self.active_players().count() >= max_players {
            return Err(GameError::SessionFull);
        }
        player.icon = self.free_icon();
        let id = player.id;
        info!(code = %self.code, player = %id, name = %player.name, "player joined");
        self.players.push(player);
        Ok(id)
    }

    pub fn set_icon(&mut self, actor: PlayerId, icon: &str) -> GameResult<()> {
        let idx = self.member(actor)?;
        let icon = icon.trim();
        if icon.is_empty() {
            return Err(GameError::invalid("icon must not be empty"));
        }
        if self.active_players().any(|p| p.id != actor && p.icon == icon) {
            return Err(GameError::IconTaken(icon.to_string()));
        }
        self.players[idx].icon = icon.to_string();
        Ok(())
    }

    pub fn select_profession(&mut self, actor: PlayerId, name: &str) -> GameResult<()> {
        let idx = self.member(actor)?;
        if self.players[idx].profession.is_some() {
            return Err(GameError::invalid("profession already chosen"));
        }
        let profession = professions::find(name).ok_or_else(|| GameError::UnknownProfession(name.to_string()))?;
        debug!(code = %self.code, player = %actor, profession = %profession.name, "profession selected");
        self.players[idx].set_profession(profession);
        Ok(())
    }

    // ---------- movement ----------

    /// Move the turn holder. Downsized players stay put.
    pub fn move_player(&mut self, actor: PlayerId, spaces: u32) -> GameResult<Effects> {
        let idx = self.turn_holder(actor)?;
        if spaces == 0 {
            return Err(GameError::invalid("must move at least one space"));
        }
        if self.players[idx].profession.is_none() {
            return Err(GameError::invalid("choose a profession first"));
        }
        if self.pending.is_some() {
            return Err(GameError::invalid("resolve the current event first"));
        }
        let mut effects = Effects::default();
        if self.players[idx].downsized_turns > 0 {
            debug!(code = %self.code, player = %actor, "downsized, move ignored");
            return Ok(effects);
        }

        let from = self.players[idx].board_space;
        let step = self.content.board.advance(from, spaces);
        self.players[idx].board_space = step.to;
        if step.passed_payday {
            self.payday(idx);
            effects.paydays += 1;
        }

        // Landing on payday pays again on top of the crossing credit above.
        let Some(kind) = self.content.board.kind_at(step.to) else {
            return Ok(effects);
        };
        effects.landed = Some(kind);
        self.pending = match kind {
            SpaceKind::Payday => {
                self.payday(idx);
                effects.paydays += 1;
                Some(PendingEvent::Confirm { kind, doodad: None })
            }
            SpaceKind::Deal => Some(PendingEvent::Deal(DealOffer::default())),
            SpaceKind::Market => Some(PendingEvent::Market(self.open_market(actor))),
            SpaceKind::Doodad => {
                let doodad = self.content.draw_doodad(&mut self.rng);
                Some(PendingEvent::Confirm { kind, doodad: Some(doodad) })
            }
            SpaceKind::Charity => Some(PendingEvent::Charity),
            SpaceKind::Baby => {
                self.players[idx].add_child();
                Some(PendingEvent::Confirm { kind, doodad: None })
            }
            SpaceKind::Downsized => {
                let cost = self.players[idx].downsize();
                info!(code = %self.code, player = %actor, cost = %cost, "downsized");
                Some(PendingEvent::Confirm { kind, doodad: None })
            }
        };
        debug!(code = %self.code, player = %actor, from, to = step.to, ?kind, "moved");
        Ok(effects)
    }

    fn payday(&mut self, idx: usize) {
        let credit = self.players[idx].collect_payday();
        info!(code = %self.code, player = %self.players[idx].id, amount = %credit, "payday");
    }

    fn open_market(&mut self, mover: PlayerId) -> MarketEvent {
        let offer = deals::generate_offer(&mut self.rng);
        let responded = self
            .active_players()
            .filter(|p| p.id != mover && !p.owns_kind(offer.kind))
            .map(|p| p.id)
            .collect();
        MarketEvent { offer, responded }
    }

    // ---------- confirmations, doodads, charity ----------

    pub fn confirm(&mut self, actor: PlayerId) -> GameResult<()> {
        self.turn_holder(actor)?;
        match &self.pending {
            Some(PendingEvent::Confirm { kind: SpaceKind::Doodad, .. }) => {
                Err(GameError::invalid("choose how to pay for the doodad"))
            }
            Some(PendingEvent::Confirm { .. }) => {
                self.pending = None;
                Ok(())
            }
            _ => Err(GameError::invalid("nothing to confirm")),
        }
    }

    pub fn pay_doodad(&mut self, actor: PlayerId, method: PaymentMethod) -> GameResult<Decimal> {
        let idx = self.turn_holder(actor)?;
        let Some(PendingEvent::Confirm { doodad: Some(doodad), .. }) = &self.pending else {
            return Err(GameError::invalid("no doodad to pay"));
        };
        let cost = doodad.cost;
        let player = &mut self.players[idx];
        match method {
            // may go negative
            PaymentMethod::Cash => player.cash -= cost,
            PaymentMethod::Credit => match player.liabilities.iter_mut().find(|l| l.is_revolving()) {
                Some(card) => card.amount += cost,
                None => player.liabilities.push(Liability::credit_card(cost)),
            },
        }
        self.pending = None;
        Ok(cost)
    }

    pub fn buy_charity(&mut self, actor: PlayerId) -> GameResult<Decimal> {
        let idx = self.turn_holder(actor)?;
        if !matches!(self.pending, Some(PendingEvent::Charity)) {
            return Err(GameError::invalid("no charity event"));
        }
        let player = &mut self.players[idx];
        let cost = round2(player.income() * charity_rate());
        // like a cash doodad, may go negative
        player.cash -= cost;
        player.charity_turns = STATUS_TURNS;
        self.pending = None;
        Ok(cost)
    }

    // ---------- deals & auction ----------

    fn open_deal(&self) -> GameResult<&DealOffer> {
        match &self.pending {
            Some(PendingEvent::Deal(offer)) => Ok(offer),
            _ => Err(GameError::invalid("no deal on the table")),
        }
    }

    fn open_deal_mut(&mut self) -> GameResult<&mut DealOffer> {
        match &mut self.pending {
            Some(PendingEvent::Deal(offer)) => Ok(offer),
            _ => Err(GameError::invalid("no deal on the table")),
        }
    }

    /// The drawn asset, while it is still for sale to the turn holder.
    fn offered_asset(&self) -> GameResult<&Asset> {
        let offer = self.open_deal()?;
        if offer.auction.is_some() {
            return Err(GameError::invalid("the deal is being auctioned"));
        }
        offer.asset.as_ref().ok_or_else(|| GameError::invalid("draw a deal first"))
    }

    pub fn get_deal(&mut self, actor: PlayerId, size: DealSize) -> GameResult<&Asset> {
        let idx = self.turn_holder(actor)?;
        let offer = self.open_deal()?;
        if offer.asset.is_some() || offer.auction.is_some() {
            return Err(GameError::invalid("a deal was already drawn"));
        }
        let holds_mlm = self.players[idx].holds_mlm();
        let asset = deals::generate_for(&mut self.rng, size, holds_mlm);
        debug!(code = %self.code, player = %actor, asset = %asset.name, equity = %asset.equity, "deal drawn");
        let offer = self.open_deal_mut()?;
        offer.size = Some(size);
        Ok(offer.asset.insert(asset))
    }

    pub fn buy_deal(&mut self, actor: PlayerId) -> GameResult<()> {
        let idx = self.turn_holder(actor)?;
        let equity = self.offered_asset()?.equity;
        let cash = self.players[idx].cash;
        if equity > cash {
            return Err(GameError::InsufficientFunds { needed: equity, available: cash });
        }
        self.complete_purchase(idx)
    }

    /// Borrow whatever cash is missing, then buy.
    pub fn buy_deal_with_loan(&mut self, actor: PlayerId) -> GameResult<()> {
        let idx = self.turn_holder(actor)?;
        let asset = self.offered_asset()?;
        let shortfall = asset.equity - self.players[idx].cash;
        if shortfall > Decimal::ZERO {
            let name = format!("Loan: {}", asset.name);
            loans::finance(&mut self.players[idx], name, shortfall, loans::DEAL_LOAN_TERM_MONTHS)?;
        }
        self.complete_purchase(idx)
    }

    fn complete_purchase(&mut self, idx: usize) -> GameResult<()> {
        let Some(PendingEvent::Deal(DealOffer { asset: Some(asset), .. })) = self.pending.take() else {
            return Err(GameError::invalid("draw a deal first"));
        };
        let player = &mut self.players[idx];
        player.cash -= asset.equity;
        info!(code = %self.code, player = %player.id, asset = %asset.name, "deal bought");
        player.assets.push(asset);
        Ok(())
    }

    /// Put the drawn deal up for auction.
    pub fn sell_deal(&mut self, actor: PlayerId) -> GameResult<()> {
        self.turn_holder(actor)?;
        self.offered_asset()?;
        if self.active_players().count() < 2 {
            return Err(GameError::invalid("nobody to sell to"));
        }
        self.open_deal_mut()?.auction = Some(AuctionState::open(actor));
        info!(code = %self.code, seller = %actor, "auction opened");
        Ok(())
    }

    fn running_auction(&self) -> GameResult<(&AuctionState, &Asset)> {
        let offer = self.open_deal()?;
        match (&offer.auction, &offer.asset) {
            (Some(a), Some(asset)) if !a.is_complete => Ok((a, asset)),
            _ => Err(GameError::invalid("no auction is running")),
        }
    }

    pub fn place_bid(&mut self, actor: PlayerId, amount: Decimal) -> GameResult<Effects> {
        self.respond_to_auction(actor, Some(amount))
    }

    pub fn pass_bid(&mut self, actor: PlayerId) -> GameResult<Effects> {
        self.respond_to_auction(actor, None)
    }

    fn respond_to_auction(&mut self, actor: PlayerId, bid: Option<Decimal>) -> GameResult<Effects> {
        let idx = self.member(actor)?;
        let (_, asset) = self.running_auction()?;
        let equity = asset.equity;
        let cash = self.players[idx].cash;
        let offer = self.open_deal_mut()?;
        if let Some(auction) = offer.auction.as_mut() {
            auction.respond(actor, bid, cash, equity)?;
        }
        Ok(Effects { auction: self.settle_auction(), ..Effects::default() })
    }

    /// Close the auction once every active bidder has answered and move the
    /// asset and cash.
    fn settle_auction(&mut self) -> Option<AuctionResult> {
        let active = self.active_ids();
        let seats = self.seats();
        let Some(PendingEvent::Deal(offer)) = &mut self.pending else {
            return None;
        };
        let auction = offer.auction.as_mut()?;
        if auction.is_complete || !auction.is_ready(&active) {
            return None;
        }
        let seller = auction.seller;
        let outcome = auction.resolve(&seats);
        let asset = offer.asset.take()?;

        let Some((winner, bid)) = outcome else {
            info!(code = %self.code, asset = %asset.name, "auction closed without bids");
            return Some(AuctionResult::NoBids);
        };
        if let Some(w) = self.players.iter_mut().find(|p| p.id == winner) {
            w.cash -= bid + asset.equity;
            w.assets.push(asset);
        }
        if let Some(s) = self.players.iter_mut().find(|p| p.id == seller) {
            s.cash += bid;
        }
        info!(code = %self.code, seller = %seller, winner = %winner, bid = %bid, "auction sold");
        Some(AuctionResult::Sold { winner, bid })
    }

    // ---------- market events ----------

    fn open_market_event(&self, actor: PlayerId) -> GameResult<&MarketEvent> {
        match &self.pending {
            Some(PendingEvent::Market(m)) if m.responded.contains(&actor) => Err(GameError::AlreadyResponded),
            Some(PendingEvent::Market(m)) => Ok(m),
            _ => Err(GameError::invalid("no market event")),
        }
    }

    /// Sell one asset into the open market offer.
    pub fn sell_to_market(&mut self, actor: PlayerId, asset_id: Uuid) -> GameResult<Effects> {
        let idx = self.member(actor)?;
        let offer = self.open_market_event(actor)?.offer.clone();
        let player = &self.players[idx];
        let pos = player
            .assets
            .iter()
            .position(|a| a.id == asset_id)
            .ok_or(GameError::AssetNotFound(asset_id))?;
        if player.assets[pos].kind != offer.kind {
            return Err(GameError::invalid("the buyer does not want that asset"));
        }

        let player = &mut self.players[idx];
        let asset = player.assets.remove(pos);
        let proceeds = offer.gross_for(&asset) - asset.loan_amount();
        player.cash += proceeds;
        info!(code = %self.code, player = %actor, asset = %asset.name, proceeds = %proceeds, "sold to market");
        Ok(self.record_market_response(actor))
    }

    pub fn market_pass(&mut self, actor: PlayerId) -> GameResult<Effects> {
        self.member(actor)?;
        self.open_market_event(actor)?;
        Ok(self.record_market_response(actor))
    }

    /// Mark `actor` done and advance the turn once every active player is.
    fn record_market_response(&mut self, actor: PlayerId) -> Effects {
        let mut effects = Effects::default();
        let active = self.active_ids();
        let Some(PendingEvent::Market(m)) = &mut self.pending else {
            return effects;
        };
        m.responded.insert(actor);
        if active.iter().all(|id| m.responded.contains(id)) {
            info!(code = %self.code, "market quorum reached");
            effects.market_closed = true;
            effects.turn_advanced = true;
            self.advance_turn();
        }
        effects
    }

    // ---------- stocks & loans ----------

    pub fn buy_stock(&mut self, actor: PlayerId, ticker: &str, quantity: u32) -> GameResult<Decimal> {
        let idx = self.turn_holder(actor)?;
        self.stock_market.buy(&mut self.players[idx], ticker, quantity)
    }

    pub fn sell_stock(&mut self, actor: PlayerId, ticker: &str, quantity: u32) -> GameResult<Decimal> {
        let idx = self.turn_holder(actor)?;
        self.stock_market.sell(&mut self.players[idx], ticker, quantity)
    }

    pub fn take_out_loan(&mut self, actor: PlayerId, amount: Decimal, term_years: u32) -> GameResult<Uuid> {
        let idx = self.member(actor)?;
        loans::take_out_loan(&mut self.players[idx], amount, term_years)
    }

    pub fn pay_off_loan(&mut self, actor: PlayerId, liability_id: Uuid, amount: Decimal) -> GameResult<Decimal> {
        let idx = self.member(actor)?;
        loans::pay_off_loan(&mut self.players[idx], liability_id, amount)
    }

    // ---------- turn cycle ----------

    pub fn end_turn(&mut self, actor: PlayerId) -> GameResult<Effects> {
        self.turn_holder(actor)?;
        if let Some(PendingEvent::Confirm { doodad: Some(_), .. }) = &self.pending {
            return Err(GameError::invalid("pay for the doodad first"));
        }
        self.advance_turn();
        Ok(Effects { turn_advanced: true, ..Effects::default() })
    }

    /// Hand the turn to the next active seat, clear the event and tick the
    /// stock market.
    fn advance_turn(&mut self) {
        let current = self.players.iter().position(|p| p.id == self.current_player_id);
        if let Some(i) = current {
            self.players[i].tick_status();
        }
        let n = self.players.len();
        let start = current.map(|i| i + 1).unwrap_or(0);
        if let Some(next) = (0..n).map(|k| (start + k) % n).find(|&i| self.players[i].is_active) {
            self.current_player_id = self.players[next].id;
        }

        self.pending = None;
        self.stock_market.tick(&mut self.rng);
        for p in self.players.iter_mut() {
            self.stock_market.refresh_dividends(p);
        }
        self.turn += 1;
        info!(code = %self.code, turn = self.turn, player = %self.current_player_id, "turn advanced");
    }

    // ---------- departures ----------

    pub fn leave(&mut self, actor: PlayerId) -> GameResult<Effects> {
        let idx = self.member(actor)?;
        Ok(self.depart(idx))
    }

    pub fn remove_player(&mut self, actor: PlayerId, target: PlayerId) -> GameResult<Effects> {
        self.member(actor)?;
        if actor != self.creator_id {
            return Err(GameError::CreatorOnly);
        }
        let idx = self.member(target)?;
        Ok(self.depart(idx))
    }

    /// Mark a player inactive and answer anything still waiting on them.
    fn depart(&mut self, idx: usize) -> Effects {
        let id = self.players[idx].id;
        self.players[idx].is_active = false;
        info!(code = %self.code, player = %id, "player left");

        let mut effects = Effects::default();
        match &mut self.pending {
            Some(PendingEvent::Deal(offer)) => {
                if let Some(auction) = offer.auction.as_mut().filter(|a| !a.is_complete) {
                    if auction.seller == id {
                        offer.auction = None;
                        offer.asset = None;
                        effects.auction = Some(AuctionResult::Cancelled);
                    } else {
                        auction.forfeit(id);
                        effects.auction = self.settle_auction();
                    }
                }
            }
            Some(PendingEvent::Market(_)) => {
                effects = self.record_market_response(id);
            }
            _ => {}
        }

        if self.current_player_id == id && !effects.turn_advanced {
            self.advance_turn();
            effects.turn_advanced = true;
        }
        effects
    }
}
