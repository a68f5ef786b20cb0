//! Fixed-point currency amounts.
//!
//! Every currency figure that flows through reconciliation (brokerage, STT,
//! net amount, total cost, slippage) is a [`Money`] value: an `i64` at 1e-6
//! scale ("micros").  1 rupee = `Money::new(1_000_000)`.
//!
//! There is no `From<i64>` impl; callers construct amounts explicitly with
//! [`Money::new`] so that quantities and amounts cannot be mixed by accident.
//!
//! Division by a share quantity ([`Money::div_qty`]) truncates toward zero at
//! micro resolution and yields zero for a zero quantity.

use serde::{Deserialize, Serialize};

/// Number of micros in one currency unit.
pub const MICROS_SCALE: i64 = 1_000_000;

/// A fixed-point currency amount at 1e-6 scale.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn new(micros: i64) -> Self {
        Money(micros)
    }

    /// Whole currency units, e.g. `Money::from_units(12)` is 12.000000.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * MICROS_SCALE)
    }

    #[inline]
    pub const fn micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn saturating_add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }

    /// Per-unit amount for `qty` units. Zero quantity yields [`Money::ZERO`].
    #[inline]
    pub fn div_qty(self, qty: u64) -> Money {
        if qty == 0 {
            return Money::ZERO;
        }
        match i64::try_from(qty) {
            Ok(q) => Money(self.0 / q),
            // Any i64 amount divided by more than i64::MAX units rounds to zero.
            Err(_) => Money::ZERO,
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 / MICROS_SCALE;
        let frac = (self.0 % MICROS_SCALE).abs();
        // -0.5 truncates to 0 units; keep the sign.
        if self.0 < 0 && units == 0 {
            write!(f, "-{units}.{frac:06}")
        } else {
            write!(f, "{units}.{frac:06}")
        }
    }
}
