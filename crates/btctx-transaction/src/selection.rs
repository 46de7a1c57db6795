//! UTXO selection.
//!
//! The selector prefers a single UTXO large enough to cover the target.
//! Failing that it seeds with the largest UTXO and walks the rest in
//! ascending order, taking each one that keeps the running total at or
//! below the target, and succeeds only when the total lands exactly on it.
//! A pool whose total exceeds the target can therefore still fail; the
//! funding loop compensates by re-selecting against the shortfall.

use crate::utxo::Utxo;
use crate::TransactionError;

/// A successful selection: the chosen items and the untouched remainder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection<T> {
    pub selected: Vec<T>,
    pub unselected: Vec<T>,
}

impl<T> Selection<T> {
    /// Sum of the selected values.
    pub fn total(&self, value: impl Fn(&T) -> u64) -> u64 {
        self.selected.iter().map(value).fold(0, u64::saturating_add)
    }
}

/// A failed selection. The pool is handed back unchanged.
///
/// `available` saturates at `u64::MAX`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionFailure<T> {
    pub pool: Vec<T>,
    pub target: u64,
    pub available: u64,
}

impl<T> From<SelectionFailure<T>> for TransactionError {
    fn from(failure: SelectionFailure<T>) -> Self {
        TransactionError::InsufficientBalance {
            target: failure.target,
            available: failure.available,
        }
    }
}

/// Select items from `pool` covering `target`.
///
/// # Arguments
/// * `pool`   - Candidate items, in caller order.
/// * `target` - The amount to cover.
/// * `value`  - Accessor for an item's value.
///
/// # Returns
/// The selection, or a `SelectionFailure` carrying the pool back.
pub fn select<T, F>(pool: Vec<T>, target: u64, value: F) -> Result<Selection<T>, SelectionFailure<T>>
where
    F: Fn(&T) -> u64,
{
    let available = pool.iter().map(&value).fold(0, u64::saturating_add);
    if pool.is_empty() {
        return Err(SelectionFailure { pool, target, available });
    }

    // First index holding the largest value.
    let mut best = 0;
    for (i, item) in pool.iter().enumerate() {
        if value(item) > value(&pool[best]) {
            best = i;
        }
    }
    if value(&pool[best]) >= target {
        let mut unselected = pool;
        let chosen = unselected.remove(best);
        return Ok(Selection {
            selected: vec![chosen],
            unselected,
        });
    }

    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by_key(|&i| value(&pool[i]));

    let (largest, rest) = match order.split_last() {
        Some(split) => split,
        None => return Err(SelectionFailure { pool, target, available }),
    };
    let mut chosen = vec![*largest];
    let mut total = value(&pool[*largest]);
    let mut reached = false;
    for &i in rest {
        let next = match total.checked_add(value(&pool[i])) {
            Some(next) if next <= target => next,
            _ => continue,
        };
        chosen.push(i);
        total = next;
        if total == target {
            reached = true;
            break;
        }
    }
    if !reached {
        return Err(SelectionFailure { pool, target, available });
    }

    // Selected keep the walk order; the remainder stays ascending.
    let mut slots: Vec<Option<T>> = pool.into_iter().map(Some).collect();
    let selected = chosen.iter().filter_map(|&i| slots[i].take()).collect();
    let unselected = order.iter().filter_map(|&i| slots[i].take()).collect();
    Ok(Selection { selected, unselected })
}

/// Select UTXOs covering `target` satoshis.
pub fn select_utxos(pool: Vec<Utxo>, target: u64) -> Result<Selection<Utxo>, SelectionFailure<Utxo>> {
    select(pool, target, |u| u.value)
}
