// ===============================
// src/weights.rs
// ===============================
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Pick one entry with probability proportional to its weight.
///
/// Zero-weight entries are never picked. Returns `None` when the table is
/// empty or every weight is zero.
pub fn pick_index<R: Rng + ?Sized>(rng: &mut R, weights: &[u32]) -> Option<usize> {
    WeightedIndex::<u32>::new(weights).ok().map(|dist| dist.sample(rng))
}

/// Convenience over `(item, weight)` tables.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, table: &'a [(T, u32)]) -> Option<&'a T> {
    let weights: Vec<u32> = table.iter().map(|(_, w)| *w).collect();
    pick_index(rng, &weights).map(|i| &table[i].0)
}
