//! Cart lines and the cart state they live in.

use crate::types::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// One distinct product/variant entry in the cart
///
/// `name`, `image` and `price` are a display snapshot taken when the product
/// was first added; they are never re-fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Dedup key, see [`CartLine::line_id`]
    pub id: String,
    /// Catalog product
    #[serde(alias = "product_id")]
    pub product_id: ProductId,
    /// Product name at add-time
    pub name: String,
    /// Product image at add-time
    #[serde(default)]
    pub image: Option<String>,
    /// Size, colour or similar option
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Unit price at add-time
    pub price: Money,
    /// Units in the cart, never zero inside a [`CartState`]
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

impl CartLine {
    /// A single unit of `product_id` without variant
    #[must_use]
    pub fn new(product_id: ProductId, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: Self::line_id(product_id, None),
            product_id,
            name: name.into(),
            image: None,
            variant: None,
            price,
            quantity: 1,
        }
    }

    /// Selects a variant; the line id follows
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        let variant = variant.into();
        self.id = Self::line_id(self.product_id, Some(&variant));
        self.variant = Some(variant);
        self
    }

    /// Attaches the product image
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Dedup key for a product and optional variant: `"12"` or `"12:large"`
    #[must_use]
    pub fn line_id(product_id: ProductId, variant: Option<&str>) -> String {
        match variant {
            Some(variant) if !variant.is_empty() => format!("{product_id}:{variant}"),
            _ => product_id.to_string(),
        }
    }

    /// `price * quantity`
    #[must_use]
    pub fn total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// The in-session cart
///
/// Lines keep insertion order and unique ids. The cached total always equals
/// the sum of line totals, and no line has a zero quantity; the only way to
/// change a cart is through the four operations below, which keep both true.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<CartLine>,
    total: Money,
}

impl CartState {
    /// Builds a cart by replaying `lines` through [`add_item`](Self::add_item)
    /// and [`set_quantity`](Self::set_quantity)
    ///
    /// Duplicate ids merge by summing quantities; zero-quantity lines are dropped.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut state = Self::default();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            let id = line.id.clone();
            let quantity = state
                .get(&id)
                .map_or(0, |existing| existing.quantity)
                .saturating_add(line.quantity);
            state.add_item(line);
            state.set_quantity(&id, i64::from(quantity));
        }
        state
    }

    /// Lines in insertion order
    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    /// Sum of all line totals
    #[must_use]
    pub const fn total(&self) -> Money {
        self.total
    }

    /// Sum of all quantities
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |count, line| count.saturating_add(line.quantity))
    }

    /// Line with the given id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CartLine> {
        self.items.iter().find(|line| line.id == id)
    }

    /// True when the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds one unit of `line`, merging with an existing line of the same id
    ///
    /// The incoming quantity is ignored: a new line always starts at one.
    pub fn add_item(&mut self, mut line: CartLine) {
        if let Some(existing) = self.items.iter_mut().find(|l| l.id == line.id) {
            existing.quantity = existing.quantity.saturating_add(1);
        } else {
            line.quantity = 1;
            self.items.push(line);
        }
        self.recompute_total();
    }

    /// Removes the line with `id`; returns the removed line
    pub fn remove_item(&mut self, id: &str) -> Option<CartLine> {
        let index = self.items.iter().position(|line| line.id == id)?;
        let removed = self.items.remove(index);
        self.recompute_total();
        Some(removed)
    }

    /// Sets the quantity of line `id`; zero or less removes the line
    ///
    /// Quantities above `u32::MAX` are capped there, and line totals saturate
    /// rather than overflow. Returns false if no line has that id.
    pub fn set_quantity(&mut self, id: &str, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove_item(id).is_some();
        }

        let Some(line) = self.items.iter_mut().find(|line| line.id == id) else {
            return false;
        };
        line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        self.recompute_total();
        true
    }

    /// Empties the cart
    pub fn clear(&mut self) {
        self.items.clear();
        self.total = Money::ZERO;
    }

    fn recompute_total(&mut self) {
        self.total = self.items.iter().map(CartLine::total).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, price: i64) -> CartLine {
        CartLine {
            id: id.to_string(),
            product_id: ProductId::new(1),
            name: "Rattan bag".to_string(),
            image: None,
            variant: None,
            price: Money::from_major(price),
            quantity: 1,
        }
    }

    #[test]
    fn adding_same_id_twice_merges() {
        let mut cart = CartState::default();
        cart.add_item(line("p1", 1000));
        cart.add_item(line("p1", 1000));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.total(), Money::from_major(2000));
    }

    #[test]
    fn incoming_quantity_is_ignored_on_add() {
        let mut cart = CartState::default();
        cart.add_item(CartLine {
            quantity: 7,
            ..line("p1", 10)
        });

        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn third_add_reaches_three_thousand() {
        let mut cart = CartState::from_lines(vec![CartLine {
            quantity: 2,
            ..line("p1", 1000)
        }]);
        cart.add_item(line("p1", 1000));

        let p1 = cart.get("p1").cloned();
        assert_eq!(p1.as_ref().map(|l| l.quantity), Some(3));
        assert_eq!(p1.as_ref().map(CartLine::total), Some(Money::from_major(3000)));
        assert_eq!(cart.total(), Money::from_major(3000));
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = CartState::from_lines(vec![line("p1", 5), line("p2", 7)]);

        assert!(cart.set_quantity("p1", 0));
        assert!(cart.get("p1").is_none());
        assert_eq!(cart.total(), Money::from_major(7));

        assert!(cart.set_quantity("p2", -3));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::ZERO);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut cart = CartState::from_lines(vec![line("p1", 5)]);
        let before = cart.clone();

        assert!(!cart.set_quantity("nope", 4));
        assert!(cart.remove_item("nope").is_none());
        assert_eq!(cart, before);
    }

    #[test]
    fn huge_quantity_on_huge_price_saturates() {
        let price = Money::new(rust_decimal::Decimal::from_i128_with_scale(
            100_000_000_000_000_000_000,
            0,
        ));
        let mut cart = CartState::from_lines(vec![
            CartLine {
                price,
                ..line("1", 0)
            },
            line("2", 5),
        ]);

        assert!(cart.set_quantity("1", i64::MAX));

        assert_eq!(cart.get("1").map(|l| l.quantity), Some(u32::MAX));
        assert_eq!(cart.total(), cart.items().iter().map(CartLine::total).sum());
        assert!(cart.total().is_positive());
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut cart = CartState::default();
        cart.add_item(line("b", 1));
        cart.add_item(line("a", 1));
        cart.add_item(line("b", 1));

        let ids: Vec<_> = cart.items().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn from_lines_normalizes() {
        let cart = CartState::from_lines(vec![
            CartLine {
                quantity: 2,
                ..line("p1", 10)
            },
            CartLine {
                quantity: 0,
                ..line("p2", 10)
            },
            CartLine {
                quantity: 3,
                ..line("p1", 10)
            },
        ]);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Money::from_major(50));
    }

    #[test]
    fn variant_changes_line_id() {
        let plain = CartLine::new(ProductId::new(12), "Tee", Money::from_major(300));
        let large = plain.clone().with_variant("large");

        assert_eq!(plain.id, "12");
        assert_eq!(large.id, "12:large");
    }

    #[test]
    fn line_reads_snake_case_keys() {
        let json = r#"{"id":"3","product_id":3,"name":"Cap","price":"199.00","quantity":2}"#;
        let parsed: Result<CartLine, _> = serde_json::from_str(json);

        assert_eq!(parsed.ok().map(|l| l.total()), Some(Money::from_major(398)));
    }
}
