// ===============================
// src/loans.rs (bank loans)
// ===============================
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{GameError, GameResult};
use crate::finance::{Liability, PAYMENTS_PER_YEAR};
use crate::player::Player;

pub const MIN_TERM_YEARS: u32 = 1;
pub const MAX_TERM_YEARS: u32 = 5;
/// Term for loans that cover a deal's equity shortfall.
pub const DEAL_LOAN_TERM_MONTHS: u32 = 5 * PAYMENTS_PER_YEAR;

pub fn loan_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Personal loan, credited to cash immediately.
pub fn take_out_loan(player: &mut Player, amount: Decimal, term_years: u32) -> GameResult<Uuid> {
    if amount <= Decimal::ZERO {
        return Err(GameError::invalid("loan amount must be positive"));
    }
    if !(MIN_TERM_YEARS..=MAX_TERM_YEARS).contains(&term_years) {
        return Err(GameError::invalid(format!(
            "loan term must be between {MIN_TERM_YEARS} and {MAX_TERM_YEARS} years"
        )));
    }
    issue(player, "Personal Loan", amount, term_years * PAYMENTS_PER_YEAR)
}

/// Financing path used when buying a deal on credit: explicit name, any term.
pub fn finance(player: &mut Player, name: impl Into<String>, amount: Decimal, term_months: u32) -> GameResult<Uuid> {
    if amount <= Decimal::ZERO {
        return Err(GameError::invalid("loan amount must be positive"));
    }
    issue(player, name, amount, term_months)
}

/// Both the credit and the first month's interest must stay representable,
/// otherwise nothing is booked.
fn issue(
    player: &mut Player,
    name: impl Into<String>,
    amount: Decimal,
    term_months: u32,
) -> GameResult<Uuid> {
    let out_of_range = || GameError::invalid("loan amount is out of range");
    let cash = player.cash.checked_add(amount).ok_or_else(out_of_range)?;
    let monthly_growth = Decimal::ONE + loan_rate() / Decimal::from(PAYMENTS_PER_YEAR);
    amount.checked_mul(monthly_growth).ok_or_else(out_of_range)?;

    let liability = Liability::new(name, amount, loan_rate(), term_months);
    let id = liability.id;
    player.cash = cash;
    player.liabilities.push(liability);
    Ok(id)
}

/// Pay down a liability. The payment is capped at the outstanding balance and
/// the liability disappears once nothing is owed. Returns the amount applied.
pub fn pay_off_loan(player: &mut Player, liability_id: Uuid, amount: Decimal) -> GameResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(GameError::invalid("payment must be positive"));
    }
    let idx = player
        .liabilities
        .iter()
        .position(|l| l.id == liability_id)
        .ok_or(GameError::LiabilityNotFound(liability_id))?;

    let applied = amount.min(player.liabilities[idx].amount);
    if applied > player.cash {
        return Err(GameError::InsufficientFunds { needed: applied, available: player.cash });
    }

    player.cash -= applied;
    let liability = &mut player.liabilities[idx];
    liability.amount -= applied;
    if liability.amount <= Decimal::ZERO {
        player.liabilities.remove(idx);
    }
    Ok(applied)
}
