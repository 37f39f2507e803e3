// ===============================
// src/player.rs (player balance sheet)
// ===============================
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::finance::{Asset, AssetKind, Liability, Profession};
use crate::market::StockPosition;

pub type PlayerId = Uuid;

pub const START_SPACE: u32 = 1;
pub const MAX_CHILDREN: u32 = 3;
/// Turns of charity discount / downsized freeze granted by one event.
pub const STATUS_TURNS: u32 = 3;

fn tax_rate() -> Decimal {
    Decimal::new(20, 2)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub icon: String,
    pub board_space: u32,
    pub profession: Option<Profession>,
    pub assets: Vec<Asset>,
    pub liabilities: Vec<Liability>,
    pub stock_positions: Vec<StockPosition>,
    pub cash: Decimal,
    /// Recomputed after every trade and price update.
    pub dividend_income: Decimal,
    pub number_of_children: u32,
    pub charity_turns: u32,
    pub downsized_turns: u32,
    /// False once the player left or was removed.
    pub is_active: bool,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            icon: String::new(),
            board_space: START_SPACE,
            profession: None,
            assets: Vec::new(),
            liabilities: Vec::new(),
            stock_positions: Vec::new(),
            cash: Decimal::ZERO,
            dividend_income: Decimal::ZERO,
            number_of_children: 0,
            charity_turns: 0,
            downsized_turns: 0,
            is_active: true,
        }
    }

    /// Copy the template on: starting cash, fresh copies of its starter
    /// assets and liabilities.
    pub fn set_profession(&mut self, profession: Profession) {
        self.cash = profession.savings;
        self.assets = profession
            .assets
            .iter()
            .cloned()
            .map(|a| Asset { id: Uuid::new_v4(), ..a })
            .collect();
        self.liabilities = profession
            .liabilities
            .iter()
            .cloned()
            .map(|l| Liability { id: Uuid::new_v4(), ..l })
            .collect();
        self.profession = Some(profession);
    }

    fn salary(&self) -> Decimal {
        self.profession.as_ref().map(|p| p.salary).unwrap_or_default()
    }

    pub fn asset_income(&self) -> Decimal {
        self.assets.iter().map(Asset::income).sum()
    }

    pub fn income(&self) -> Decimal {
        self.asset_income() + self.salary() + self.dividend_income
    }

    pub fn taxes(&self) -> Decimal {
        self.income() * tax_rate()
    }

    pub fn child_expenses(&self) -> Decimal {
        let per_child = self.profession.as_ref().map(|p| p.child_expense).unwrap_or_default();
        per_child * Decimal::from(self.number_of_children)
    }

    pub fn expenses(&self) -> Decimal {
        let other = self.profession.as_ref().map(|p| p.other_expenses).unwrap_or_default();
        self.liabilities.iter().map(Liability::expense).sum::<Decimal>() + self.child_expenses() + other
    }

    pub fn net_income(&self) -> Decimal {
        self.income() - self.expenses()
    }

    /// Credit net income, then advance every installment loan one period.
    /// Paid-off loans are dropped. Returns the amount credited.
    pub fn collect_payday(&mut self) -> Decimal {
        let credit = self.net_income();
        self.cash += credit;
        self.liabilities.retain_mut(|l| !l.apply_monthly_amortization());
        credit
    }

    pub fn holds_mlm(&self) -> bool {
        self.assets.iter().any(|a| a.kind.is_mlm())
    }

    pub fn owns_kind(&self, kind: AssetKind) -> bool {
        self.assets.iter().any(|a| a.kind == kind)
    }

    pub fn add_child(&mut self) {
        self.number_of_children = (self.number_of_children + 1).min(MAX_CHILDREN);
    }

    /// Lose a month of expenses and sit out a few turns.
    pub fn downsize(&mut self) -> Decimal {
        let cost = self.expenses();
        self.cash -= cost;
        self.downsized_turns = STATUS_TURNS;
        self.charity_turns = 0;
        cost
    }

    /// Called when this player's turn ends.
    pub fn tick_status(&mut self) {
        self.charity_turns = self.charity_turns.saturating_sub(1);
        self.downsized_turns = self.downsized_turns.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::professions;

    fn scenario_player() -> Player {
        let mut p = Player::new("Sam");
        p.set_profession(Profession {
            name: "Tester".into(),
            salary: Decimal::from(3000),
            child_expense: Decimal::from(200),
            other_expenses: Decimal::from(500),
            savings: Decimal::from(1000),
            assets: Vec::new(),
            liabilities: vec![Liability::new("Car", Decimal::from(6000), Decimal::new(6, 2), 60)],
        });
        p
    }

    #[test]
    fn derived_values() {
        let mut p = scenario_player();
        assert_eq!(p.income(), Decimal::from(3000));
        assert_eq!(p.taxes(), Decimal::from(600));
        assert_eq!(p.expenses(), Decimal::new(61600, 2));
        assert_eq!(p.net_income(), Decimal::new(238400, 2));

        p.add_child();
        assert_eq!(p.child_expenses(), Decimal::from(200));
        assert_eq!(p.expenses(), Decimal::new(81600, 2));
    }

    #[test]
    fn payday_credits_then_amortizes() {
        let mut p = scenario_player();
        let credit = p.collect_payday();
        assert_eq!(credit, Decimal::new(238400, 2));
        assert_eq!(p.cash, Decimal::new(338400, 2));
        assert_eq!(p.liabilities[0].term, 59);
        assert_eq!(p.liabilities[0].amount, Decimal::new(591400, 2));
    }

    #[test]
    fn paid_off_loans_disappear_on_payday() {
        let mut p = scenario_player();
        p.liabilities[0].term = 1;
        p.collect_payday();
        assert!(p.liabilities.is_empty());
    }

    #[test]
    fn children_are_capped() {
        let mut p = scenario_player();
        for _ in 0..5 {
            p.add_child();
        }
        assert_eq!(p.number_of_children, MAX_CHILDREN);
    }

    #[test]
    fn downsizing_costs_expenses_and_clears_charity() {
        let mut p = scenario_player();
        p.charity_turns = 2;
        let cost = p.downsize();
        assert_eq!(cost, Decimal::new(61600, 2));
        assert_eq!(p.cash, Decimal::new(38400, 2));
        assert_eq!(p.downsized_turns, STATUS_TURNS);
        assert_eq!(p.charity_turns, 0);
    }

    #[test]
    fn profession_copies_get_fresh_ids() {
        let template = professions::find("Engineer").unwrap();
        let mut a = Player::new("A");
        let mut b = Player::new("B");
        a.set_profession(template.clone());
        b.set_profession(template);
        assert_eq!(a.cash, Decimal::from(1200));
        assert_ne!(a.liabilities[0].id, b.liabilities[0].id);
    }
}
