// ===============================
// src/deals.rs (deal & market-offer generation)
// ===============================
//
// Two deal tables:
// - big   : expensive, leveraged real estate / business / land
// - small : starter deals incl. CDs, gold and the MLM stakes
//
// Market offers are buy-side bids for a whole category of asset the players
// may hold; apartments are priced per unit, land per 10-acre parcel.
//
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::finance::{Asset, AssetKind};
use crate::weights;

const BIG_DEAL_MIN_COST: i64 = 5_000;
const BIG_DEAL_MAX_COST: i64 = 100_000;
const SMALL_DEAL_MIN_COST: i64 = 500;
const SMALL_DEAL_MAX_COST: i64 = 8_000;

const BIG_DEAL_WEIGHTS: &[(AssetKind, u32)] = &[
    (AssetKind::Apartment, 3),
    (AssetKind::Business, 3),
    (AssetKind::House, 3),
    (AssetKind::Land, 1),
];

const SMALL_DEAL_WEIGHTS: &[(AssetKind, u32)] = &[
    (AssetKind::Apartment, 2),
    (AssetKind::Business, 1),
    (AssetKind::House, 2),
    (AssetKind::Land, 2),
    (AssetKind::CertificateOfDeposit, 2),
    (AssetKind::Gold, 1),
    (AssetKind::MlmLevel1, 1),
    (AssetKind::MlmLevel2, 1),
    (AssetKind::Condo, 3),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DealSize {
    Small,
    Big,
}

fn earns_return(kind: AssetKind) -> bool {
    matches!(
        kind,
        AssetKind::Apartment
            | AssetKind::Business
            | AssetKind::House
            | AssetKind::Condo
            | AssetKind::CertificateOfDeposit
            | AssetKind::Land
    )
}

fn is_leveraged(kind: AssetKind) -> bool {
    matches!(
        kind,
        AssetKind::Apartment | AssetKind::Business | AssetKind::House | AssetKind::Condo | AssetKind::Land
    )
}

fn asset_name(kind: AssetKind, quantity: Option<u32>, size: DealSize) -> String {
    match kind {
        AssetKind::MlmLevel1 => "Direct 2 You - Level 1".to_string(),
        AssetKind::MlmLevel2 => "Direct 2 You - Level 2".to_string(),
        AssetKind::Business => match size {
            DealSize::Big => "Business".to_string(),
            DealSize::Small => "Small Business".to_string(),
        },
        AssetKind::Condo => "Condo - 2br/1ba".to_string(),
        AssetKind::House => "House - 3br/2ba".to_string(),
        AssetKind::Apartment => match quantity {
            Some(2) => "Duplex".to_string(),
            Some(q) => format!("{q}-Plex"),
            None => "Apartment".to_string(),
        },
        AssetKind::CertificateOfDeposit => "Certificate of Deposit".to_string(),
        AssetKind::Land => format!("Land - {}0 acres", quantity.unwrap_or(1)),
        AssetKind::Gold => "Gold Coins".to_string(),
    }
}

fn equity_amount<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64, multiplier: Option<u32>) -> Decimal {
    let low = match multiplier {
        Some(m) => min * i64::from(m),
        None => min,
    };
    Decimal::from(rng.gen_range(low..max.max(low + 1)))
}

fn deal_kind<R: Rng + ?Sized>(rng: &mut R, size: DealSize) -> AssetKind {
    let table = match size {
        DealSize::Big => BIG_DEAL_WEIGHTS,
        DealSize::Small => SMALL_DEAL_WEIGHTS,
    };
    weights::pick(rng, table).copied().unwrap_or(AssetKind::House)
}

/// Draw a deal for a player, re-drawing MLM stakes when the player already
/// holds one (the two levels are mutually exclusive).
pub fn generate_for<R: Rng + ?Sized>(rng: &mut R, size: DealSize, holds_mlm: bool) -> Asset {
    let mut kind = deal_kind(rng, size);
    while holds_mlm && kind.is_mlm() {
        kind = deal_kind(rng, size);
    }
    build(rng, kind, size)
}

fn build<R: Rng + ?Sized>(rng: &mut R, kind: AssetKind, size: DealSize) -> Asset {
    let quantity = match (size, kind) {
        (DealSize::Big, AssetKind::Apartment) => Some(rng.gen_range(4..16)),
        (DealSize::Big, AssetKind::Land) => Some(rng.gen_range(10..100)),
        (DealSize::Small, AssetKind::Apartment) => Some(2),
        (DealSize::Small, AssetKind::Land) => Some(1),
        _ => None,
    };

    let mut asset = Asset::new(asset_name(kind, quantity, size), kind, quantity);

    let (equity, value_mult, ror_range) = match size {
        DealSize::Big => {
            // big land is priced per 100 acres, not per parcel
            let multiplier = if kind == AssetKind::Land { quantity.map(|q| q / 10) } else { quantity };
            (equity_amount(rng, BIG_DEAL_MIN_COST, BIG_DEAL_MAX_COST, multiplier), 1i64..10, 0i64..5)
        }
        DealSize::Small => (
            equity_amount(rng, SMALL_DEAL_MIN_COST, SMALL_DEAL_MAX_COST, quantity),
            8i64..20,
            -1i64..5,
        ),
    };

    asset.equity = equity;
    asset.value = if is_leveraged(kind) {
        equity * Decimal::from(rng.gen_range(value_mult))
    } else {
        equity
    };
    asset.rate_of_return = if earns_return(kind) {
        Decimal::new(rng.gen_range(ror_range), 2)
    } else {
        Decimal::ZERO
    };
    asset
}

/// Buy-side offer broadcast by a market event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOffer {
    pub name: String,
    pub kind: AssetKind,
    pub price: Decimal,
}

impl PurchaseOffer {
    /// Gross proceeds for selling `asset` into this offer.
    pub fn gross_for(&self, asset: &Asset) -> Decimal {
        let units = match asset.kind {
            AssetKind::Apartment | AssetKind::Land => asset.quantity.unwrap_or(1),
            _ => 1,
        };
        self.price * Decimal::from(units)
    }
}

struct OfferRow {
    kind: AssetKind,
    weight: u32,
    min: i64,
    max: i64,
    headline: &'static str,
}

// MLM level 1 stakes have no buyers.
#[rustfmt::skip]
const OFFER_TABLE: &[OfferRow] = &[
    OfferRow { kind: AssetKind::Apartment,            weight: 8,  min: 8_000, max: 100_000,   headline: "Apartment buyer, price offered is per unit" },
    OfferRow { kind: AssetKind::Business,             weight: 4,  min: 8_000, max: 1_000_000, headline: "Business buyer approaches you" },
    OfferRow { kind: AssetKind::House,                weight: 10, min: 8_000, max: 500_000,   headline: "House buyer" },
    OfferRow { kind: AssetKind::Land,                 weight: 4,  min: 1_000, max: 50_000,    headline: "Land buyer, price offered is per 10 acres" },
    OfferRow { kind: AssetKind::CertificateOfDeposit, weight: 4,  min: 500,   max: 8_000,     headline: "Certificate of Deposit buyer" },
    OfferRow { kind: AssetKind::Gold,                 weight: 1,  min: 500,   max: 8_000,     headline: "Gold buyer" },
    OfferRow { kind: AssetKind::MlmLevel2,            weight: 1,  min: 20,    max: 500,       headline: "Someone offers to buy your downstream!" },
    OfferRow { kind: AssetKind::Condo,                weight: 6,  min: 8_000, max: 150_000,   headline: "Condo buyer" },
];

pub fn generate_offer<R: Rng + ?Sized>(rng: &mut R) -> PurchaseOffer {
    let weights: Vec<u32> = OFFER_TABLE.iter().map(|r| r.weight).collect();
    let row = &OFFER_TABLE[weights::pick_index(rng, &weights).unwrap_or(0)];
    PurchaseOffer {
        name: row.headline.to_string(),
        kind: row.kind,
        price: Decimal::from(rng.gen_range(row.min..row.max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn big_deals_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let a = generate_for(&mut rng, DealSize::Big, false);
            assert!(matches!(
                a.kind,
                AssetKind::Apartment | AssetKind::Business | AssetKind::House | AssetKind::Land
            ));
            assert!(a.equity >= Decimal::from(BIG_DEAL_MIN_COST));
            assert!(a.equity < Decimal::from(BIG_DEAL_MAX_COST));
            assert!(a.value >= a.equity);
            assert!(a.rate_of_return >= Decimal::ZERO);
            if a.kind == AssetKind::Apartment {
                let q = a.quantity.unwrap();
                assert!((4..16).contains(&q));
                assert_eq!(a.name, format!("{q}-Plex"));
            }
        }
    }

    #[test]
    fn small_deal_shapes() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..500 {
            let a = generate_for(&mut rng, DealSize::Small, false);
            match a.kind {
                AssetKind::Apartment => {
                    assert_eq!(a.quantity, Some(2));
                    assert_eq!(a.name, "Duplex");
                    assert!(a.equity >= Decimal::from(1_000));
                }
                AssetKind::Land => assert_eq!(a.name, "Land - 10 acres"),
                AssetKind::Gold | AssetKind::MlmLevel1 | AssetKind::MlmLevel2 => {
                    assert_eq!(a.value, a.equity);
                    assert_eq!(a.rate_of_return, Decimal::ZERO);
                }
                AssetKind::Business => assert_eq!(a.name, "Small Business"),
                _ => {}
            }
        }
    }

    #[test]
    fn mlm_holders_never_draw_another_stake() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..1000 {
            assert!(!generate_for(&mut rng, DealSize::Small, true).kind.is_mlm());
        }
    }

    #[test]
    fn offers_never_target_level_one_stakes() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..1000 {
            let o = generate_offer(&mut rng);
            assert_ne!(o.kind, AssetKind::MlmLevel1);
            assert!(o.price > Decimal::ZERO);
        }
    }

    #[test]
    fn per_unit_offer_pricing() {
        let offer = PurchaseOffer { name: "x".into(), kind: AssetKind::Apartment, price: Decimal::from(9_000) };
        let plex = Asset::new("4-Plex", AssetKind::Apartment, Some(4));
        assert_eq!(offer.gross_for(&plex), Decimal::from(36_000));

        let house_offer = PurchaseOffer { name: "x".into(), kind: AssetKind::House, price: Decimal::from(90_000) };
        let house = Asset::new("House", AssetKind::House, None);
        assert_eq!(house_offer.gross_for(&house), Decimal::from(90_000));
    }
}
