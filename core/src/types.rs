//! Shared value types: identifiers, money and weight.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a string-backed identifier newtype.
///
/// Identifiers are opaque strings so that records created by this service
/// (UUIDs) and legacy records (`ObjectId` hex) share one representation.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a fresh identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            /// Returns the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a parcel.
    ParcelId
);

string_id!(
    /// Unique identifier for a rider application (employee record).
    ApplicationId
);

/// Monetary amount in minor currency units (cents, poisha).
///
/// Serialized as a plain integer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from whole major units.
    #[must_use]
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    /// Converts a decimal major-unit amount, rounding half away from zero
    /// to the nearest minor unit.
    ///
    /// Returns `None` when the value does not fit in `i64` minor units.
    #[must_use]
    pub fn from_major_decimal(major: Decimal) -> Option<Self> {
        let minor = major
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(minor).ok().map(Self)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns the amount in major units as an exact decimal.
    #[must_use]
    pub fn major(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns true for negative amounts.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.major())
    }
}

/// Parcel weight in kilograms.
///
/// Always non-negative. Serialized as a JSON number; deserialized from a
/// number or a numeric string.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weight(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Weight {
    /// Zero kilograms.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a weight, rejecting negative values.
    #[must_use]
    pub fn new(kilograms: Decimal) -> Option<Self> {
        if kilograms.is_sign_negative() && !kilograms.is_zero() {
            None
        } else {
            Some(Self(kilograms.normalize()))
        }
    }

    /// Returns the weight in kilograms.
    #[must_use]
    pub const fn kilograms(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}kg", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_from_major_decimal_rounds_half_away_from_zero() {
        assert_eq!(Money::from_major_decimal(dec!(1.005)), Some(Money::from_minor(101)));
        assert_eq!(Money::from_major_decimal(dec!(20)), Some(Money::from_minor(2000)));
        assert_eq!(Money::from_major_decimal(dec!(0.004)), Some(Money::ZERO));
    }

    #[test]
    fn money_from_major_decimal_rejects_out_of_range() {
        let huge = |s: &str| Decimal::from_scientific(s).unwrap();
        assert_eq!(Money::from_major_decimal(huge("1e27")), None);
        assert_eq!(Money::from_major_decimal(huge("1e20")), None);
        assert_eq!(Money::from_major_decimal(Decimal::MIN), None);
    }

    #[test]
    fn money_display_uses_two_decimals() {
        assert_eq!(Money::from_minor(15000).to_string(), "150.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
    }

    #[test]
    fn money_serializes_as_minor_units() {
        let json = serde_json::to_string(&Money::from_major(150)).unwrap();
        assert_eq!(json, "15000");
    }

    #[test]
    fn weight_rejects_negative() {
        assert!(Weight::new(dec!(-0.1)).is_none());
        assert_eq!(Weight::new(dec!(0)), Some(Weight::ZERO));
        assert_eq!(Weight::new(dec!(2.50)).unwrap().kilograms(), dec!(2.5));
    }

    #[test]
    fn weight_round_trips_as_number() {
        let weight = Weight::new(dec!(2.5)).unwrap();
        let json = serde_json::to_string(&weight).unwrap();
        assert_eq!(json, "2.5");
        let back: Weight = serde_json::from_str(&json).unwrap();
        assert_eq!(back, weight);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ParcelId::generate(), ParcelId::generate());
    }
}
