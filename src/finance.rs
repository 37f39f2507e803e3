// ===============================
// src/finance.rs (assets, liabilities, amortization)
// ===============================
//
// Pure value math. The only mutation here is the one-period amortization step
// applied on payday; callers never construct negative amounts/rates/terms.
//
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PAYMENTS_PER_YEAR: u32 = 12;
pub const MORTGAGE_TERM: u32 = 30 * PAYMENTS_PER_YEAR;
pub const CAR_LOAN_TERM: u32 = 5 * PAYMENTS_PER_YEAR;
pub const STUDENT_LOANS_TERM: u32 = 20 * PAYMENTS_PER_YEAR;
/// Revolving line: interest-only payments, never amortizes.
pub const CREDIT_CARD_TERM: u32 = 0;
pub const CREDIT_CARD_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Balance at or below this is treated as paid off.
pub const PAID_OFF_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Round to cents (banker's rounding).
pub fn round2(v: Decimal) -> Decimal {
    v.round_dp(2)
}

fn periods() -> Decimal {
    Decimal::from(PAYMENTS_PER_YEAR)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    /// Network-marketing stake, level 1. Mutually exclusive with level 2.
    MlmLevel1,
    MlmLevel2,
    Business,
    /// 2br/1ba condo
    Condo,
    /// 3br/2ba house
    House,
    Apartment,
    CertificateOfDeposit,
    Land,
    Gold,
}

impl AssetKind {
    pub fn is_mlm(&self) -> bool {
        matches!(self, AssetKind::MlmLevel1 | AssetKind::MlmLevel2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub kind: AssetKind,
    /// Units for apartments, 10-acre parcels for land.
    pub quantity: Option<u32>,
    /// Amount invested; also the purchase cost of a deal.
    pub equity: Decimal,
    pub value: Decimal,
    pub rate_of_return: Decimal,
}

impl Asset {
    pub fn new(name: impl Into<String>, kind: AssetKind, quantity: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            quantity,
            equity: Decimal::ZERO,
            value: Decimal::ZERO,
            rate_of_return: Decimal::ZERO,
        }
    }

    /// Portion of the value backed by a loan.
    pub fn loan_amount(&self) -> Decimal {
        self.value - self.equity
    }

    /// Monthly income.
    pub fn income(&self) -> Decimal {
        self.value * (self.rate_of_return / periods())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liability {
    pub id: Uuid,
    pub name: String,
    pub amount: Decimal,
    /// Annual rate, e.g. 0.06
    pub interest_rate: Decimal,
    /// Remaining monthly installments; 0 means revolving.
    pub term: u32,
}

impl Liability {
    pub fn new(name: impl Into<String>, amount: Decimal, interest_rate: Decimal, term: u32) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), amount, interest_rate, term }
    }

    pub fn credit_card(amount: Decimal) -> Self {
        Self::new("Credit Card", amount, CREDIT_CARD_RATE, CREDIT_CARD_TERM)
    }

    pub fn is_revolving(&self) -> bool {
        self.term == 0 && self.interest_rate > Decimal::ZERO
    }

    /// Monthly payment.
    pub fn expense(&self) -> Decimal {
        if self.amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        if self.term == 0 {
            if self.interest_rate > Decimal::ZERO {
                return round2(self.amount * self.interest_rate / periods());
            }
            return Decimal::ZERO;
        }
        if self.interest_rate.is_zero() {
            return round2(self.amount / Decimal::from(self.term));
        }

        let r = self.interest_rate / periods();
        let growth = (1.0 + r.to_f64().unwrap_or(0.0)).powi(-(self.term as i32));
        let denom = Decimal::ONE - Decimal::from_f64(growth).unwrap_or(Decimal::ONE);
        if denom <= Decimal::ZERO {
            return round2(self.amount / Decimal::from(self.term));
        }
        round2(self.amount * r / denom)
    }

    /// Advance one installment. Returns true once the balance is paid off,
    /// at which point the balance is exactly zero.
    pub fn apply_monthly_amortization(&mut self) -> bool {
        if self.term == 0 {
            return false;
        }

        let payment = self.expense();
        if self.interest_rate.is_zero() {
            self.amount -= payment;
        } else {
            let r = self.interest_rate / periods();
            self.amount = self.amount * (Decimal::ONE + r) - payment;
        }
        self.term -= 1;

        if self.amount <= PAID_OFF_EPSILON || self.term == 0 {
            self.amount = Decimal::ZERO;
            return true;
        }
        false
    }
}

/// Template copied onto a player when they pick it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profession {
    pub name: String,
    pub salary: Decimal,
    pub child_expense: Decimal,
    pub other_expenses: Decimal,
    /// Starting cash.
    pub savings: Decimal,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub liabilities: Vec<Liability>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn installment_payment_matches_amortization_formula() {
        let loan = Liability::new("Car", d(6000), Decimal::new(6, 2), 60);
        assert_eq!(loan.expense(), Decimal::new(11600, 2));

        let mortgage = Liability::new("Mortgage", d(47000), Decimal::new(6, 2), MORTGAGE_TERM);
        assert_eq!(mortgage.expense(), Decimal::new(28179, 2));
    }

    #[test]
    fn special_cases() {
        // zero rate: straight line
        assert_eq!(Liability::new("x", d(1200), Decimal::ZERO, 12).expense(), d(100));
        // revolving: interest only
        assert_eq!(Liability::credit_card(d(4000)).expense(), d(60));
        // zero term, zero rate: nothing
        assert_eq!(Liability::new("x", d(500), Decimal::ZERO, 0).expense(), Decimal::ZERO);
        // nothing owed
        assert_eq!(Liability::new("x", Decimal::ZERO, Decimal::new(5, 2), 10).expense(), Decimal::ZERO);
    }

    #[test]
    fn revolving_line_never_amortizes() {
        let mut card = Liability::credit_card(d(1000));
        assert!(!card.apply_monthly_amortization());
        assert_eq!(card.amount, d(1000));
    }

    #[test]
    fn amortization_step_reduces_balance_and_term() {
        let mut loan = Liability::new("Car", d(6000), Decimal::new(6, 2), 60);
        let paid = loan.apply_monthly_amortization();
        assert!(!paid);
        assert_eq!(loan.term, 59);
        // 6000 * 1.005 - 116.00
        assert_eq!(loan.amount, Decimal::new(591400, 2));
    }

    #[test]
    fn asset_derived_values() {
        let mut a = Asset::new("House - 3br/2ba", AssetKind::House, None);
        a.equity = d(10_000);
        a.value = d(60_000);
        a.rate_of_return = Decimal::new(4, 2);
        assert_eq!(a.loan_amount(), d(50_000));
        assert_eq!(a.income(), d(200));
    }

    proptest! {
        #[test]
        fn full_term_pays_off(
            amount in 100i64..1_000_000,
            rate_bp in 1i64..10_000,
            term in 1u32..=360,
        ) {
            let mut loan = Liability::new("p", d(amount), Decimal::new(rate_bp, 4), term);
            let mut paid_at = None;
            for i in 0..term {
                if loan.apply_monthly_amortization() && paid_at.is_none() {
                    paid_at = Some(i);
                }
            }
            prop_assert!(paid_at.is_some());
            prop_assert_eq!(loan.amount, Decimal::ZERO);
        }
    }
}
