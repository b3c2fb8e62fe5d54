//! Unit price resolution.
//!
//! The same precedence applies everywhere a cart line or order line is
//! priced: a selected variant's price wins outright, otherwise the
//! product's discount price if one is set, otherwise the base price.

use rust_decimal::Decimal;

/// The candidate prices for one cart line.
///
/// `variant_price` is `Some` exactly when the line has a variant
/// selected, since variants always carry a price.
#[derive(Debug, Clone, Copy)]
pub struct PriceSources {
    pub base_price: Decimal,
    pub discount_price: Option<Decimal>,
    pub variant_price: Option<Decimal>,
}

impl PriceSources {
    /// Resolve the authoritative unit price for this line.
    pub fn resolve(&self) -> Decimal {
        self.variant_price
            .or(self.discount_price)
            .unwrap_or(self.base_price)
    }
}

/// The price shown in catalog listings, where no variant is selected yet.
pub fn display_price(base_price: Decimal, discount_price: Option<Decimal>) -> Decimal {
    discount_price.unwrap_or(base_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn base_price_when_nothing_else_set() {
        let sources = PriceSources {
            base_price: dec(100),
            discount_price: None,
            variant_price: None,
        };
        assert_eq!(sources.resolve(), dec(100));
    }

    #[test]
    fn discount_beats_base() {
        let sources = PriceSources {
            base_price: dec(100),
            discount_price: Some(dec(80)),
            variant_price: None,
        };
        assert_eq!(sources.resolve(), dec(80));
    }

    #[test]
    fn variant_beats_discount() {
        // A selected variant's price wins even when a discount exists.
        let sources = PriceSources {
            base_price: dec(100),
            discount_price: Some(dec(80)),
            variant_price: Some(dec(90)),
        };
        assert_eq!(sources.resolve(), dec(90));
    }

    #[test]
    fn display_price_prefers_discount() {
        assert_eq!(display_price(dec(100), Some(dec(80))), dec(80));
        assert_eq!(display_price(dec(100), None), dec(100));
    }
}
