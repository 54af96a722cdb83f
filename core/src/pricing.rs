//! Delivery-cost pricing.
//!
//! Pure and deterministic: the price depends only on the two zones, the
//! parcel type and the weight. No clock, no I/O.
//!
//! ```text
//!                       same zone        different zones
//! document              60               80
//! non-document ≤ 3kg    110              150
//! non-document > 3kg    110 + 40/kg      150 + 40/kg + 40
//! ```
//!
//! The per-kilogram surcharge applies to the excess over the threshold and is
//! proportional, so 3.5kg adds 20.
//!
//! # Example
//!
//! ```
//! use zapshift_core::pricing::{delivery_cost, Tariff};
//! use zapshift_core::Money;
//!
//! let cost = delivery_cost(&Tariff::default(), "Dhaka", "Khulna", "non-document", None).unwrap();
//! assert_eq!(cost, Money::from_major(150));
//! ```

use crate::types::{Money, Weight};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pricing failures. Every variant is an input problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Zone, parcel type or weight could not be priced.
    #[error("invalid pricing input: {0}")]
    InvalidInput(String),
}

impl From<PricingError> for crate::Error {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidInput(message) => Self::Validation(message),
        }
    }
}

/// Kind of parcel, which selects the base rate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParcelType {
    /// Letters and paperwork; flat rate regardless of weight.
    #[serde(rename = "document")]
    Document,
    /// Everything else; weight-dependent.
    #[serde(rename = "non-document", alias = "not-document")]
    NonDocument,
}

impl ParcelType {
    /// Wire name of the parcel type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::NonDocument => "non-document",
        }
    }
}

impl fmt::Display for ParcelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParcelType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "non-document" | "not-document" | "non_document" => Ok(Self::NonDocument),
            other => Err(PricingError::InvalidInput(format!(
                "unknown parcel type '{other}'"
            ))),
        }
    }
}

/// Delivery zone (a division name).
///
/// Zones compare case-insensitively; surrounding whitespace is ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zone(String);

impl Zone {
    /// Parses a zone name, rejecting blank input.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidInput`] for an empty or whitespace-only name.
    pub fn parse(name: &str) -> Result<Self, PricingError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(PricingError::InvalidInput("zone must not be blank".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Zone name as given (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Zone {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Zone {}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rate card used by the calculator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tariff {
    /// Document, sender and receiver in the same zone.
    pub document_same_zone: Money,
    /// Document, different zones.
    pub document_cross_zone: Money,
    /// Non-document up to the threshold, same zone.
    pub package_same_zone: Money,
    /// Non-document up to the threshold, different zones.
    pub package_cross_zone: Money,
    /// Weight (kg) above which the surcharge applies.
    pub weight_threshold: Decimal,
    /// Surcharge per kilogram above the threshold.
    pub per_kg_surcharge: Money,
    /// Extra flat charge for heavy parcels crossing zones.
    pub heavy_cross_zone_surcharge: Money,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            document_same_zone: Money::from_major(60),
            document_cross_zone: Money::from_major(80),
            package_same_zone: Money::from_major(110),
            package_cross_zone: Money::from_major(150),
            weight_threshold: Decimal::from(3),
            per_kg_surcharge: Money::from_major(40),
            heavy_cross_zone_surcharge: Money::from_major(40),
        }
    }
}

impl Tariff {
    /// Prices a parcel.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidInput`] when the surcharge overflows
    /// the representable amount (absurd weights).
    pub fn price(
        &self,
        sender: &Zone,
        receiver: &Zone,
        parcel_type: ParcelType,
        weight: Weight,
    ) -> Result<Money, PricingError> {
        let same_zone = sender == receiver;

        let base = match (parcel_type, same_zone) {
            (ParcelType::Document, true) => return Ok(self.document_same_zone),
            (ParcelType::Document, false) => return Ok(self.document_cross_zone),
            (ParcelType::NonDocument, true) => self.package_same_zone,
            (ParcelType::NonDocument, false) => self.package_cross_zone,
        };

        let excess = weight.kilograms() - self.weight_threshold;
        if excess <= Decimal::ZERO {
            return Ok(base);
        }

        let too_heavy = || PricingError::InvalidInput(format!("weight {weight} is too large to price"));

        let surcharge = excess
            .checked_mul(self.per_kg_surcharge.major())
            .and_then(Money::from_major_decimal)
            .ok_or_else(too_heavy)?;

        let mut total = base.checked_add(surcharge).ok_or_else(too_heavy)?;
        if !same_zone {
            total = total
                .checked_add(self.heavy_cross_zone_surcharge)
                .ok_or_else(too_heavy)?;
        }
        Ok(total)
    }
}

/// Prices raw request fields.
///
/// Missing weight counts as zero. Blank zones, unknown parcel types and
/// negative weights are rejected rather than defaulted.
///
/// # Errors
///
/// Returns [`PricingError::InvalidInput`] for any unpriceable input.
pub fn delivery_cost(
    tariff: &Tariff,
    sender_zone: &str,
    receiver_zone: &str,
    parcel_type: &str,
    weight: Option<Decimal>,
) -> Result<Money, PricingError> {
    let sender = Zone::parse(sender_zone)?;
    let receiver = Zone::parse(receiver_zone)?;
    let parcel_type = parcel_type.parse::<ParcelType>()?;
    let weight = Weight::new(weight.unwrap_or_default())
        .ok_or_else(|| PricingError::InvalidInput("weight must not be negative".to_string()))?;

    tariff.price(&sender, &receiver, parcel_type, weight)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn price(sender: &str, receiver: &str, kind: &str, weight: Decimal) -> Money {
        delivery_cost(&Tariff::default(), sender, receiver, kind, Some(weight)).unwrap()
    }

    #[test]
    fn documents_are_flat_rate() {
        assert_eq!(price("Dhaka", "Dhaka", "document", dec!(0)), Money::from_major(60));
        assert_eq!(price("Dhaka", "Sylhet", "document", dec!(12)), Money::from_major(80));
    }

    #[test]
    fn light_packages_use_base_rate() {
        assert_eq!(price("A", "A", "non-document", dec!(3)), Money::from_major(110));
        assert_eq!(price("A", "B", "non-document", dec!(2.5)), Money::from_major(150));
    }

    #[test]
    fn heavy_packages_pay_per_kilogram() {
        assert_eq!(price("A", "A", "non-document", dec!(5)), Money::from_major(190));
        // 150 + 2 * 40 + 40
        assert_eq!(price("A", "B", "non-document", dec!(5)), Money::from_major(270));
        // fractional excess is proportional
        assert_eq!(price("A", "A", "non-document", dec!(3.5)), Money::from_major(130));
        assert_eq!(price("A", "A", "non-document", dec!(3.333)), Money::from_minor(12332));
    }

    #[test]
    fn zones_compare_case_insensitively() {
        assert_eq!(price(" dhaka", "DHAKA ", "document", dec!(1)), Money::from_major(60));
    }

    #[test]
    fn missing_weight_is_zero() {
        let cost = delivery_cost(&Tariff::default(), "A", "B", "non-document", None).unwrap();
        assert_eq!(cost, Money::from_major(150));
    }

    #[test]
    fn legacy_type_name_is_accepted() {
        assert_eq!(price("A", "B", "not-document", dec!(1)), Money::from_major(150));
    }

    #[test]
    fn unknown_inputs_are_rejected() {
        let tariff = Tariff::default();
        assert!(matches!(
            delivery_cost(&tariff, "", "B", "document", None),
            Err(PricingError::InvalidInput(_))
        ));
        assert!(matches!(
            delivery_cost(&tariff, "A", "  ", "document", None),
            Err(PricingError::InvalidInput(_))
        ));
        assert!(matches!(
            delivery_cost(&tariff, "A", "B", "furniture", None),
            Err(PricingError::InvalidInput(_))
        ));
        assert!(matches!(
            delivery_cost(&tariff, "A", "B", "document", Some(dec!(-1))),
            Err(PricingError::InvalidInput(_))
        ));
    }

    #[test]
    fn absurd_weight_fails_instead_of_overflowing() {
        let huge = |s: &str| Decimal::from_scientific(s).unwrap();
        for weight in [Decimal::MAX, huge("1e26"), huge("1e20")] {
            let result = delivery_cost(&Tariff::default(), "A", "B", "non-document", Some(weight));
            assert!(
                matches!(result, Err(PricingError::InvalidInput(_))),
                "weight {weight} should be rejected"
            );
        }
    }

    fn zone_name() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["Dhaka", "Khulna", "Sylhet", "Rajshahi", "dhaka"])
            .prop_map(str::to_string)
    }

    fn parcel_kind() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["document", "non-document"])
    }

    fn weight() -> impl Strategy<Value = Decimal> {
        (0u32..100_000u32).prop_map(|grams| Decimal::new(i64::from(grams), 3))
    }

    proptest! {
        #[test]
        fn price_is_non_negative(
            sender in zone_name(),
            receiver in zone_name(),
            kind in parcel_kind(),
            kg in weight(),
        ) {
            let cost = price(&sender, &receiver, kind, kg);
            prop_assert!(!cost.is_negative());
        }

        #[test]
        fn price_is_deterministic(
            sender in zone_name(),
            receiver in zone_name(),
            kind in parcel_kind(),
            kg in weight(),
        ) {
            prop_assert_eq!(
                price(&sender, &receiver, kind, kg),
                price(&sender, &receiver, kind, kg)
            );
        }

        #[test]
        fn same_zone_never_costs_more(kind in parcel_kind(), kg in weight()) {
            prop_assert!(price("Dhaka", "Dhaka", kind, kg) <= price("Dhaka", "Khulna", kind, kg));
        }

        #[test]
        fn heavier_never_costs_less(kind in parcel_kind(), a in weight(), b in weight()) {
            let (light, heavy) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(price("A", "B", kind, light) <= price("A", "B", kind, heavy));
        }
    }
}
