// ===============================
// src/bots.rs (headless bot players & table driver)
// ===============================
//
// Bots play through the same `GameService` API a transport would use.
// Heuristics, per pending event:
// - nothing pending     : roll two dice, then maybe trade stock, then end turn
// - payday/baby/layoff  : confirm
// - doodad              : pay cash when affordable, otherwise charge it
// - charity             : give when cash covers twice the cost
// - deal                : small deal when poor, big deal otherwise; buy
//                         income-producing assets, borrow a little if short,
//                         auction the rest
// - auction (others)    : bid half the equity when cash allows, else pass
// - market (everyone)   : sell holdings of the wanted kind at a profit
//
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use tokio::task::yield_now;
use tracing::{info, warn};

use crate::deals::DealSize;
use crate::error::GameResult;
use crate::finance::round2;
use crate::player::PlayerId;
use crate::service::{Action, GameService};
use crate::session::{PaymentMethod, PendingEvent};
use crate::snapshot::{GameSnapshot, PlayerView};

const BOT_NAMES: &[&str] = &["Ada", "Bo", "Cy", "Dee", "Eve", "Finn", "Gus", "Hal"];
const BIG_DEAL_CASH: i64 = 10_000;
/// Shortfall a bot is willing to borrow for a deal.
const MAX_DEAL_LOAN: i64 = 5_000;
const STOCK_LOT: u32 = 10;
const STOCK_TRADE_CHANCE: f64 = 0.25;

pub struct Bot {
    pub id: PlayerId,
    pub name: String,
    rng: ChaCha8Rng,
    turn_seen: u32,
    moved: bool,
    traded: bool,
}

fn dice<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=6) + rng.gen_range(1..=6)
}

impl Bot {
    pub fn new(id: PlayerId, name: impl Into<String>, seed: u64) -> Self {
        Self { id, name: name.into(), rng: ChaCha8Rng::seed_from_u64(seed), turn_seen: 0, moved: false, traded: false }
    }

    fn me<'a>(&self, snap: &'a GameSnapshot) -> Option<&'a PlayerView> {
        snap.player(self.id)
    }

    /// Out-of-turn answer to a market event or someone else's auction.
    pub fn respond(&mut self, snap: &GameSnapshot) -> Option<Action> {
        let me = self.me(snap)?;
        if !me.player.is_active {
            return None;
        }
        match snap.pending.as_ref()? {
            PendingEvent::Market(m) if !m.responded.contains(&self.id) => {
                let sale = me
                    .player
                    .assets
                    .iter()
                    .filter(|a| a.kind == m.offer.kind)
                    .find(|a| m.offer.gross_for(a) - a.loan_amount() > a.equity);
                Some(match sale {
                    Some(asset) => Action::SellToMarket { asset_id: asset.id },
                    None => Action::MarketPass,
                })
            }
            PendingEvent::Deal(offer) => {
                let auction = offer.auction.as_ref().filter(|a| !a.is_complete && a.seller != self.id)?;
                if auction.has_responded(self.id) {
                    return None;
                }
                let equity = offer.asset.as_ref()?.equity;
                let bid = round2(equity / Decimal::TWO).max(Decimal::ONE);
                if bid + equity <= me.player.cash && self.rng.gen_bool(0.5) {
                    Some(Action::PlaceBid { amount: bid })
                } else {
                    Some(Action::PassBid)
                }
            }
            _ => None,
        }
    }

    /// Next step for the turn holder.
    pub fn act(&mut self, snap: &GameSnapshot) -> Action {
        if snap.turn != self.turn_seen {
            self.turn_seen = snap.turn;
            self.moved = false;
            self.traded = false;
        }
        let Some(me) = snap.player(self.id) else {
            return Action::EndTurn;
        };
        let cash = me.player.cash;

        match &snap.pending {
            None if !self.moved => {
                self.moved = true;
                Action::Move { spaces: dice(&mut self.rng) }
            }
            None => self.maybe_trade(snap, me).unwrap_or(Action::EndTurn),
            Some(PendingEvent::Confirm { doodad: Some(d), .. }) => Action::PayDoodad {
                method: if d.cost <= cash { PaymentMethod::Cash } else { PaymentMethod::Credit },
            },
            Some(PendingEvent::Confirm { .. }) => Action::Confirm,
            Some(PendingEvent::Charity) => {
                let cost = me.income * Decimal::new(10, 2);
                if cost * Decimal::TWO <= cash {
                    Action::BuyCharity
                } else {
                    Action::EndTurn
                }
            }
            Some(PendingEvent::Deal(offer)) => match (&offer.asset, &offer.auction) {
                (None, None) => Action::GetDeal {
                    size: if cash >= Decimal::from(BIG_DEAL_CASH) { DealSize::Big } else { DealSize::Small },
                },
                (Some(asset), None) => {
                    let worth_it = asset.income() > Decimal::ZERO;
                    let others = snap.players.iter().filter(|p| p.player.is_active).count() > 1;
                    if worth_it && asset.equity <= cash {
                        Action::BuyDeal
                    } else if worth_it && asset.equity - cash <= Decimal::from(MAX_DEAL_LOAN) {
                        Action::BuyDealWithLoan
                    } else if others {
                        Action::SellDeal
                    } else {
                        Action::EndTurn
                    }
                }
                // waiting on bids, or done
                (_, Some(a)) if !a.is_complete => Action::Unsupported,
                _ => Action::EndTurn,
            },
            // the mover answers through `respond`
            Some(PendingEvent::Market(_)) => Action::Unsupported,
        }
    }

    fn maybe_trade(&mut self, snap: &GameSnapshot, me: &PlayerView) -> Option<Action> {
        if self.traded || !self.rng.gen_bool(STOCK_TRADE_CHANCE) {
            return None;
        }
        self.traded = true;
        if let Some(pos) = me.player.stock_positions.first() {
            if self.rng.gen_bool(0.3) {
                return Some(Action::SellStock { ticker: pos.ticker.clone(), quantity: pos.quantity });
            }
        }
        let stocks = &snap.stock_market.stocks;
        if stocks.is_empty() {
            return None;
        }
        let pick = &stocks[self.rng.gen_range(0..stocks.len())];
        let cost = pick.current_price * Decimal::from(STOCK_LOT);
        (cost * Decimal::from(3) <= me.player.cash)
            .then(|| Action::BuyStock { ticker: pick.ticker.clone(), quantity: STOCK_LOT })
    }
}

/// Final line of the standings table.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub name: String,
    pub cash: Decimal,
    pub net_income: Decimal,
    pub assets: usize,
}

/// Seat `bots` players at a fresh table and play until `turns` turns have
/// passed or every bot has left. Returns standings, best net income first.
pub async fn run_table(
    service: &GameService,
    bots: usize,
    turns: u32,
    seed: u64,
) -> GameResult<(String, Vec<Standing>)> {
    let bots = bots.clamp(1, BOT_NAMES.len());
    let mut seat_rng = ChaCha8Rng::seed_from_u64(seed);
    let professions = service.professions();

    let host = service.create_game(BOT_NAMES[0])?;
    let code = host.snapshot.code.clone();
    let mut table = vec![Bot::new(host.player_id, BOT_NAMES[0], seat_rng.gen())];
    for name in BOT_NAMES.iter().take(bots).skip(1) {
        let joined = service.join_game(&code, name)?;
        table.push(Bot::new(joined.player_id, *name, seat_rng.gen()));
    }
    for bot in &table {
        let pick = &professions[seat_rng.gen_range(0..professions.len())];
        service.select_profession(&code, bot.id, &pick.name)?;
    }
    info!(%code, bots, turns, "table seated");

    // generous bound: a turn takes a handful of actions
    let max_steps = turns as usize * 64 + 64;
    for _ in 0..max_steps {
        let snap = service.snapshot(&code)?;
        if snap.turn > turns || snap.players.iter().all(|p| !p.player.is_active) {
            break;
        }

        let mut answered = false;
        for bot in table.iter_mut() {
            if let Some(action) = bot.respond(&snap) {
                if let Err(e) = service.apply(&code, bot.id, action) {
                    warn!(bot = %bot.name, reason = %e, "response rejected");
                }
                answered = true;
                break;
            }
        }
        if answered {
            yield_now().await;
            continue;
        }

        let Some(bot) = table.iter_mut().find(|b| b.id == snap.current_player_id) else {
            break;
        };
        let action = bot.act(&snap);
        if action == Action::Unsupported {
            // nobody can move the table forward
            service.end_turn(&code, bot.id)?;
        } else if let Err(e) = service.apply(&code, bot.id, action) {
            warn!(bot = %bot.name, reason = %e, "action rejected, ending turn");
            if let Err(e) = service.end_turn(&code, bot.id) {
                warn!(bot = %bot.name, reason = %e, "end turn rejected");
                // unpaid doodad: put it on credit
                service.pay_doodad(&code, bot.id, PaymentMethod::Credit)?;
            }
        }
        yield_now().await;
    }

    let snap = service.snapshot(&code)?;
    let mut standings: Vec<Standing> = snap
        .players
        .iter()
        .map(|p| Standing {
            name: p.player.name.clone(),
            cash: p.player.cash,
            net_income: p.net_income,
            assets: p.player.assets.len(),
        })
        .collect();
    standings.sort_by(|a, b| b.net_income.cmp(&a.net_income));
    Ok((code, standings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Content;
    use crate::config::EngineConfig;
    use crate::store::SessionStore;
    use std::sync::Arc;

    fn service(seed: u64) -> GameService {
        let config = EngineConfig { rng_seed: Some(seed), ..EngineConfig::default() };
        GameService::new(Arc::new(SessionStore::new(4)), Arc::new(Content::builtin().unwrap()), config)
    }

    #[tokio::test]
    async fn bots_play_a_full_table() {
        let svc = service(5);
        let (code, standings) = run_table(&svc, 3, 20, 5).await.unwrap();
        assert_eq!(standings.len(), 3);
        let snap = svc.snapshot(&code).unwrap();
        assert!(snap.turn > 1);
        assert!(standings.windows(2).all(|w| w[0].net_income >= w[1].net_income));
    }

    #[test]
    fn first_act_of_a_turn_is_a_roll() {
        let svc = service(1);
        let host = svc.create_game("Ada").unwrap();
        let mut bot = Bot::new(host.player_id, "Ada", 3);
        match bot.act(&host.snapshot) {
            Action::Move { spaces } => assert!((2..=12).contains(&spaces)),
            other => panic!("expected a roll, got {other:?}"),
        }
        // same turn, no event: never a second roll
        assert!(!matches!(bot.act(&host.snapshot), Action::Move { .. }));
    }
}
