// ===============================
// src/auction.rs (sealed-bid resale of a deal)
// ===============================
//
// The current player may decline a deal and put it up for auction instead.
// Every other active player answers exactly once, with a positive bid or a
// pass. When the last answer arrives the auction closes: seats are scanned
// in turn order starting right after the seller and the first strictly
// greater bid is kept, so equal bids go to the seat nearest the seller.
//
use ahash::AHashMap;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{GameError, GameResult};
use crate::player::PlayerId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionState {
    pub seller: PlayerId,
    /// `None` is an explicit pass. Never contains the seller.
    pub bids: AHashMap<PlayerId, Option<Decimal>>,
    pub is_complete: bool,
    pub winner: Option<PlayerId>,
    pub winning_bid: Option<Decimal>,
}

impl AuctionState {
    pub fn open(seller: PlayerId) -> Self {
        Self { seller, bids: AHashMap::new(), is_complete: false, winner: None, winning_bid: None }
    }

    pub fn has_responded(&self, player: PlayerId) -> bool {
        self.bids.contains_key(&player)
    }

    /// Record one bidder's answer.
    ///
    /// A bid must be positive and, together with the equity the winner also
    /// pays, fit in the bidder's cash.
    pub fn respond(
        &mut self,
        bidder: PlayerId,
        bid: Option<Decimal>,
        cash: Decimal,
        equity: Decimal,
    ) -> GameResult<()> {
        if self.is_complete {
            return Err(GameError::invalid("auction is already closed"));
        }
        if bidder == self.seller {
            return Err(GameError::invalid("the seller cannot bid"));
        }
        if self.has_responded(bidder) {
            return Err(GameError::AlreadyResponded);
        }
        if let Some(amount) = bid {
            if amount <= Decimal::ZERO {
                return Err(GameError::invalid("bid must be positive"));
            }
            let needed = amount
                .checked_add(equity)
                .ok_or_else(|| GameError::invalid("bid is out of range"))?;
            if needed > cash {
                return Err(GameError::InsufficientFunds { needed, available: cash });
            }
        }
        self.bids.insert(bidder, bid);
        Ok(())
    }

    /// Count a departed player as having passed.
    pub fn forfeit(&mut self, player: PlayerId) {
        if player != self.seller && !self.is_complete {
            self.bids.entry(player).or_insert(None);
        }
    }

    /// Every eligible bidder has answered.
    pub fn is_ready<'a>(&self, eligible: impl IntoIterator<Item = &'a PlayerId>) -> bool {
        eligible.into_iter().filter(|id| **id != self.seller).all(|id| self.has_responded(*id))
    }

    /// Close the auction. `seats` is the full seating order of the table.
    pub fn resolve(&mut self, seats: &[PlayerId]) -> Option<(PlayerId, Decimal)> {
        let start = seats.iter().position(|id| *id == self.seller).map(|i| i + 1).unwrap_or(0);
        let mut best: Option<(PlayerId, Decimal)> = None;
        for offset in 0..seats.len() {
            let seat = seats[(start + offset) % seats.len()];
            if seat == self.seller {
                continue;
            }
            if let Some(Some(bid)) = self.bids.get(&seat) {
                if *bid > Decimal::ZERO && best.map_or(true, |(_, b)| *bid > b) {
                    best = Some((seat, *bid));
                }
            }
        }
        self.is_complete = true;
        self.winner = best.map(|(id, _)| id);
        self.winning_bid = best.map(|(_, bid)| bid);
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn seats(n: usize) -> Vec<PlayerId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn highest_bid_wins() {
        let s = seats(3);
        let mut a = AuctionState::open(s[0]);
        a.respond(s[1], Some(d(12_000)), d(50_000), d(10_000)).unwrap();
        assert!(!a.is_ready(&s));
        a.respond(s[2], Some(d(15_000)), d(50_000), d(10_000)).unwrap();
        assert!(a.is_ready(&s));
        assert_eq!(a.resolve(&s), Some((s[2], d(15_000))));
        assert!(a.is_complete);
        assert_eq!(a.winner, Some(s[2]));
    }

    #[test]
    fn oversized_bid_is_rejected_not_fatal() {
        let s = seats(2);
        let mut a = AuctionState::open(s[0]);
        let err = a.respond(s[1], Some(Decimal::MAX), d(50_000), d(10_000)).unwrap_err();
        assert!(matches!(err, GameError::InvalidInput(_)));
        assert!(!a.has_responded(s[1]));
    }

    #[test]
    fn ties_go_to_the_seat_after_the_seller() {
        let s = seats(4);
        // seller in seat 2: scan order is 3, 0, 1
        let mut a = AuctionState::open(s[2]);
        a.respond(s[0], Some(d(500)), d(5_000), Decimal::ZERO).unwrap();
        a.respond(s[1], Some(d(500)), d(5_000), Decimal::ZERO).unwrap();
        a.respond(s[3], Some(d(500)), d(5_000), Decimal::ZERO).unwrap();
        assert_eq!(a.resolve(&s).map(|(id, _)| id), Some(s[3]));
    }

    #[test]
    fn all_pass_transfers_nothing() {
        let s = seats(3);
        let mut a = AuctionState::open(s[0]);
        a.respond(s[1], None, d(100), d(10)).unwrap();
        a.respond(s[2], None, d(100), d(10)).unwrap();
        assert_eq!(a.resolve(&s), None);
        assert!(a.is_complete);
        assert_eq!(a.winning_bid, None);
    }

    #[test]
    fn bad_responses_are_rejected() {
        let s = seats(3);
        let mut a = AuctionState::open(s[0]);
        assert!(matches!(a.respond(s[0], Some(d(1)), d(100), d(0)), Err(GameError::InvalidInput(_))));
        assert!(matches!(a.respond(s[1], Some(d(0)), d(100), d(0)), Err(GameError::InvalidInput(_))));
        // bid plus equity must fit in cash
        assert!(matches!(
            a.respond(s[1], Some(d(60)), d(100), d(50)),
            Err(GameError::InsufficientFunds { .. })
        ));
        a.respond(s[1], Some(d(50)), d(100), d(50)).unwrap();
        assert_eq!(a.respond(s[1], None, d(100), d(50)), Err(GameError::AlreadyResponded));
        assert!(a.bids.len() == 1 && !a.bids.contains_key(&s[0]));
    }

    #[test]
    fn forfeit_counts_as_pass() {
        let s = seats(3);
        let mut a = AuctionState::open(s[0]);
        a.respond(s[1], Some(d(10)), d(100), d(0)).unwrap();
        a.forfeit(s[2]);
        a.forfeit(s[0]);
        assert!(a.is_ready(&s));
        assert!(!a.bids.contains_key(&s[0]));
        assert_eq!(a.resolve(&s), Some((s[1], d(10))));
    }
}
