// ===============================
// src/market.rs (stock market engine)
// ===============================
//
// Per-turn random walk for single securities, composites (ETF) priced as the
// mean of their components, and player positions with running average cost.
//
// Notes:
// - Each step multiplies price by (1 + x), x ~ N(0.5%, sd) clamped to
//   [-0.90, 9.0]; the result is floored at 0.01 and rounded to cents.
// - Composites never draw; they are recomputed right after every update.
//
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};
use crate::finance::{round2, PAYMENTS_PER_YEAR};
use crate::player::Player;

pub const DRIFT: f64 = 0.005;
pub const MIN_CHANGE: f64 = -0.90;
pub const MAX_CHANGE: f64 = 9.0;
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StockCategory {
    /// Penny stock
    Speculative,
    /// Blue chip
    Stable,
    /// Basket of other tickers
    Composite,
}

struct StockDefinition {
    ticker: &'static str,
    name: &'static str,
    category: StockCategory,
    starting_cents: i64,
    std_dev: f64,
    /// Annual dividend yield, basis points.
    yield_bp: i64,
    components: &'static [&'static str],
}

const ALL_SINGLES: &[&str] = &["MEME", "YOLO", "BURG", "SOCK", "BEAN", "NAPS", "GLUE", "DUCK"];
const STABLE_SINGLES: &[&str] = &["BURG", "SOCK", "BEAN", "NAPS", "GLUE", "DUCK"];

#[rustfmt::skip]
const CATALOG: &[StockDefinition] = &[
    StockDefinition { ticker: "MEME", name: "MemeKing Inc.",       category: StockCategory::Speculative, starting_cents: 800,  std_dev: 0.15,  yield_bp: 0,   components: &[] },
    StockDefinition { ticker: "YOLO", name: "YOLO Therapeutics",   category: StockCategory::Speculative, starting_cents: 1400, std_dev: 0.18,  yield_bp: 200, components: &[] },
    StockDefinition { ticker: "BURG", name: "BurgerVerse Corp.",   category: StockCategory::Stable,      starting_cents: 4500, std_dev: 0.04,  yield_bp: 300, components: &[] },
    StockDefinition { ticker: "SOCK", name: "SockDraw Holdings",   category: StockCategory::Stable,      starting_cents: 6200, std_dev: 0.03,  yield_bp: 250, components: &[] },
    StockDefinition { ticker: "BEAN", name: "MagicBean Financial", category: StockCategory::Stable,      starting_cents: 3800, std_dev: 0.05,  yield_bp: 0,   components: &[] },
    StockDefinition { ticker: "NAPS", name: "NapTime Industries",  category: StockCategory::Stable,      starting_cents: 7500, std_dev: 0.035, yield_bp: 200, components: &[] },
    StockDefinition { ticker: "GLUE", name: "SuperGlue Systems",   category: StockCategory::Stable,      starting_cents: 5500, std_dev: 0.04,  yield_bp: 0,   components: &[] },
    StockDefinition { ticker: "DUCK", name: "RubberDuck Energy",   category: StockCategory::Stable,      starting_cents: 5000, std_dev: 0.045, yield_bp: 0,   components: &[] },
    StockDefinition { ticker: "TOTL", name: "Total Chaos ETF",     category: StockCategory::Composite,   starting_cents: 0,    std_dev: 0.0,   yield_bp: 0,   components: ALL_SINGLES },
    StockDefinition { ticker: "BLUE", name: "Blue Chip Bliss ETF", category: StockCategory::Composite,   starting_cents: 0,    std_dev: 0.0,   yield_bp: 0,   components: STABLE_SINGLES },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockState {
    pub ticker: String,
    pub name: String,
    pub category: StockCategory,
    pub current_price: Decimal,
    pub previous_price: Decimal,
    pub dividend_yield: Decimal,
    pub volatility: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_tickers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPosition {
    pub ticker: String,
    pub quantity: u32,
    pub average_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMarket {
    pub stocks: Vec<StockState>,
    pub turn_number: u32,
}

impl Default for StockMarket {
    fn default() -> Self {
        Self::new()
    }
}

/// One clamped per-step change ratio drawn from N(DRIFT, sd).
pub fn step_change<R: Rng + ?Sized>(rng: &mut R, sd: f64) -> f64 {
    let x = match Normal::new(DRIFT, sd) {
        Ok(normal) => normal.sample(rng),
        // unusable deviation: no noise
        Err(_) => DRIFT,
    };
    x.clamp(MIN_CHANGE, MAX_CHANGE)
}

pub fn apply_change(price: Decimal, change: f64) -> Decimal {
    let factor = Decimal::ONE + Decimal::from_f64(change).unwrap_or(Decimal::ZERO);
    round2(price * factor).max(MIN_PRICE)
}

impl StockMarket {
    /// Every catalog security at its starting price.
    pub fn new() -> Self {
        let stocks = CATALOG
            .iter()
            .map(|def| {
                let price = Decimal::new(def.starting_cents, 2);
                StockState {
                    ticker: def.ticker.to_string(),
                    name: def.name.to_string(),
                    category: def.category,
                    current_price: price,
                    previous_price: price,
                    dividend_yield: Decimal::new(def.yield_bp, 4),
                    volatility: def.std_dev,
                    component_tickers: def.components.iter().map(|t| t.to_string()).collect(),
                }
            })
            .collect();

        let mut market = Self { stocks, turn_number: 0 };
        market.recalculate_composites();
        market
    }

    pub fn stock(&self, ticker: &str) -> Option<&StockState> {
        self.stocks.iter().find(|s| s.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Random walk every non-composite, then re-derive composites.
    pub fn update_prices<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for stock in self.stocks.iter_mut() {
            if stock.category == StockCategory::Composite {
                continue;
            }
            let change = step_change(rng, stock.volatility);
            stock.previous_price = stock.current_price;
            stock.current_price = apply_change(stock.current_price, change);
        }
        self.recalculate_composites();
    }

    /// Composite price = rounded mean of component prices; yield = mean yield.
    pub fn recalculate_composites(&mut self) {
        let derived: Vec<(usize, Decimal, Decimal)> = self
            .stocks
            .iter()
            .enumerate()
            .filter(|(_, s)| s.category == StockCategory::Composite && !s.component_tickers.is_empty())
            .filter_map(|(i, etf)| {
                let parts: Vec<&StockState> = self
                    .stocks
                    .iter()
                    .filter(|s| etf.component_tickers.contains(&s.ticker))
                    .collect();
                if parts.is_empty() {
                    return None;
                }
                let n = Decimal::from(parts.len());
                let price: Decimal = parts.iter().map(|s| s.current_price).sum();
                let yld: Decimal = parts.iter().map(|s| s.dividend_yield).sum();
                Some((i, round2(price / n), yld / n))
            })
            .collect();

        for (i, price, yld) in derived {
            let etf = &mut self.stocks[i];
            etf.previous_price = etf.current_price;
            etf.current_price = price;
            etf.dividend_yield = yld;
        }
    }

    /// Turn boundary: one price step.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.update_prices(rng);
        self.turn_number += 1;
    }

    /// Monthly dividend income for a set of positions.
    pub fn dividend_income(&self, positions: &[StockPosition]) -> Decimal {
        let periods = Decimal::from(PAYMENTS_PER_YEAR);
        let total: Decimal = positions
            .iter()
            .filter_map(|p| self.stock(&p.ticker).map(|s| (p, s)))
            .filter(|(_, s)| !s.dividend_yield.is_zero())
            .map(|(p, s)| Decimal::from(p.quantity) * s.current_price * s.dividend_yield / periods)
            .sum();
        round2(total)
    }

    pub fn refresh_dividends(&self, player: &mut Player) {
        player.dividend_income = self.dividend_income(&player.stock_positions);
    }

    pub fn buy(&self, player: &mut Player, ticker: &str, quantity: u32) -> GameResult<Decimal> {
        if quantity == 0 {
            return Err(GameError::invalid("quantity must be positive"));
        }
        let stock = self.stock(ticker).ok_or_else(|| GameError::UnknownTicker(ticker.to_string()))?;

        let total_cost = stock.current_price * Decimal::from(quantity);
        if total_cost > player.cash {
            return Err(GameError::InsufficientFunds { needed: total_cost, available: player.cash });
        }
        player.cash -= total_cost;

        match player.stock_positions.iter_mut().find(|p| p.ticker == stock.ticker) {
            Some(pos) => {
                let existing = pos.average_cost * Decimal::from(pos.quantity);
                pos.quantity += quantity;
                pos.average_cost = round2((existing + total_cost) / Decimal::from(pos.quantity));
            }
            None => player.stock_positions.push(StockPosition {
                ticker: stock.ticker.clone(),
                quantity,
                average_cost: stock.current_price,
            }),
        }

        self.refresh_dividends(player);
        Ok(total_cost)
    }

    pub fn sell(&self, player: &mut Player, ticker: &str, quantity: u32) -> GameResult<Decimal> {
        if quantity == 0 {
            return Err(GameError::invalid("quantity must be positive"));
        }
        let stock = self.stock(ticker).ok_or_else(|| GameError::UnknownTicker(ticker.to_string()))?;
        let idx = player
            .stock_positions
            .iter()
            .position(|p| p.ticker == stock.ticker)
            .ok_or_else(|| GameError::invalid(format!("no {} shares held", stock.ticker)))?;
        if player.stock_positions[idx].quantity < quantity {
            return Err(GameError::invalid(format!("not enough {} shares", stock.ticker)));
        }

        let proceeds = stock.current_price * Decimal::from(quantity);
        player.cash += proceeds;

        let pos = &mut player.stock_positions[idx];
        pos.quantity -= quantity;
        if pos.quantity == 0 {
            player.stock_positions.remove(idx);
        }

        self.refresh_dividends(player);
        Ok(proceeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn player_with(cash: i64) -> Player {
        let mut p = Player::new("Ann");
        p.cash = Decimal::from(cash);
        p
    }

    fn assert_composites_track(market: &StockMarket) {
        for etf in market.stocks.iter().filter(|s| s.category == StockCategory::Composite) {
            let parts: Vec<Decimal> = etf
                .component_tickers
                .iter()
                .map(|t| market.stock(t).unwrap().current_price)
                .collect();
            let mean = round2(parts.iter().copied().sum::<Decimal>() / Decimal::from(parts.len()));
            assert_eq!(etf.current_price, mean, "{} drifted", etf.ticker);
        }
    }

    #[test]
    fn composites_start_at_component_mean() {
        let market = StockMarket::new();
        // (8 + 14 + 45 + 62 + 38 + 75 + 55 + 50) / 8
        assert_eq!(market.stock("TOTL").unwrap().current_price, Decimal::new(4338, 2));
        // (45 + 62 + 38 + 75 + 55 + 50) / 6
        assert_eq!(market.stock("BLUE").unwrap().current_price, Decimal::new(5417, 2));
        // (0.03 + 0.025 + 0 + 0.02 + 0 + 0) / 6
        assert_eq!(market.stock("BLUE").unwrap().dividend_yield, Decimal::new(125, 4));
    }

    #[test]
    fn tick_advances_turn_and_keeps_composites_in_line() {
        let mut market = StockMarket::new();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for _ in 0..50 {
            market.tick(&mut rng);
            assert_composites_track(&market);
        }
        assert_eq!(market.turn_number, 50);
    }

    #[test]
    fn buy_updates_average_cost() {
        let mut market = StockMarket::new();
        let mut p = player_with(10_000);
        market.buy(&mut p, "BURG", 10).unwrap();
        assert_eq!(p.cash, Decimal::from(9_550));

        market.stocks.iter_mut().find(|s| s.ticker == "BURG").unwrap().current_price = Decimal::from(60);
        market.buy(&mut p, "burg", 5).unwrap();
        let pos = &p.stock_positions[0];
        assert_eq!(pos.quantity, 15);
        // (450 + 300) / 15
        assert_eq!(pos.average_cost, Decimal::from(50));
    }

    #[test]
    fn buy_rejections() {
        let market = StockMarket::new();
        let mut p = player_with(100);
        assert!(matches!(market.buy(&mut p, "NAPS", 2), Err(GameError::InsufficientFunds { .. })));
        assert!(matches!(market.buy(&mut p, "NOPE", 1), Err(GameError::UnknownTicker(_))));
        assert!(matches!(market.buy(&mut p, "MEME", 0), Err(GameError::InvalidInput(_))));
        assert_eq!(p.cash, Decimal::from(100));
    }

    #[test]
    fn selling_everything_removes_position() {
        let market = StockMarket::new();
        let mut p = player_with(1_000);
        market.buy(&mut p, "MEME", 10).unwrap();
        assert!(market.sell(&mut p, "MEME", 11).is_err());
        market.sell(&mut p, "MEME", 10).unwrap();
        assert!(p.stock_positions.is_empty());
        assert_eq!(p.cash, Decimal::from(1_000));
    }

    #[test]
    fn dividends_follow_positions() {
        let market = StockMarket::new();
        let mut p = player_with(10_000);
        market.buy(&mut p, "BURG", 100).unwrap();
        // 100 * 45 * 0.03 / 12
        assert_eq!(p.dividend_income, Decimal::new(1125, 2));
        market.buy(&mut p, "BEAN", 10).unwrap();
        assert_eq!(p.dividend_income, Decimal::new(1125, 2));
        market.sell(&mut p, "BURG", 100).unwrap();
        assert_eq!(p.dividend_income, Decimal::ZERO);
    }

    #[test]
    fn degenerate_deviation_is_pure_drift() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(step_change(&mut rng, 0.0), DRIFT);
        assert_eq!(step_change(&mut rng, f64::NAN), DRIFT);
    }

    proptest! {
        #[test]
        fn step_change_is_clamped(seed in any::<u64>(), sd in 0.0f64..5.0) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let x = step_change(&mut rng, sd);
            prop_assert!((MIN_CHANGE..=MAX_CHANGE).contains(&x));
        }

        #[test]
        fn prices_stay_positive_and_bounded(seed in any::<u64>(), steps in 1usize..40) {
            let mut market = StockMarket::new();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for _ in 0..steps {
                market.update_prices(&mut rng);
                for s in market.stocks.iter().filter(|s| s.category != StockCategory::Composite) {
                    prop_assert!(s.current_price >= MIN_PRICE);
                    prop_assert!(s.current_price <= s.previous_price * Decimal::TEN);
                    // one cent of rounding slack on the downside
                    prop_assert!(s.current_price >= s.previous_price / Decimal::TEN - MIN_PRICE);
                }
            }
        }

        #[test]
        fn buy_then_sell_is_cash_neutral(idx in 0usize..10, qty in 1u32..200) {
            let market = StockMarket::new();
            let ticker = market.stocks[idx].ticker.clone();
            let mut p = player_with(1_000_000);
            let before = p.cash;
            market.buy(&mut p, &ticker, qty).unwrap();
            market.sell(&mut p, &ticker, qty).unwrap();
            prop_assert_eq!(p.cash, before);
            prop_assert!(p.stock_positions.is_empty());
        }
    }
}
