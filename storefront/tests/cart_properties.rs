//! Cart invariants over arbitrary operation sequences.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use storefront::cart::{CartEnvironment, CartLine, CartState, CartStore};
use storefront::events::StorefrontEvent;
use storefront::types::{Money, ProductId};
use rust_decimal::Decimal;
use storefront_testing::RecordingEventBus;

#[derive(Clone, Debug)]
enum Op {
    Add { product: u64, variant: Option<&'static str> },
    Remove { product: u64, variant: Option<&'static str> },
    SetQuantity { product: u64, variant: Option<&'static str>, quantity: i64 },
    Clear,
}

const PRICES: [i64; 4] = [120, 450, 999, 1500];

fn variant_strategy() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("small")), Just(Some("large"))]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..4u64, variant_strategy()).prop_map(|(product, variant)| Op::Add { product, variant }),
        1 => (0..4u64, variant_strategy()).prop_map(|(product, variant)| Op::Remove { product, variant }),
        2 => (0..4u64, variant_strategy(), -2..8i64)
            .prop_map(|(product, variant, quantity)| Op::SetQuantity { product, variant, quantity }),
        1 => Just(Op::Clear),
    ]
}

fn line(product: u64, variant: Option<&str>) -> CartLine {
    let index = usize::try_from(product).unwrap();
    let line = CartLine::new(
        ProductId::new(product),
        format!("Product {product}"),
        Money::from_major(PRICES[index]),
    );
    match variant {
        Some(variant) => line.with_variant(variant),
        None => line,
    }
}

fn apply(cart: &mut CartState, op: Op) {
    match op {
        Op::Add { product, variant } => cart.add_item(line(product, variant)),
        Op::Remove { product, variant } => {
            cart.remove_item(&CartLine::line_id(ProductId::new(product), variant));
        },
        Op::SetQuantity {
            product,
            variant,
            quantity,
        } => {
            cart.set_quantity(&CartLine::line_id(ProductId::new(product), variant), quantity);
        },
        Op::Clear => cart.clear(),
    }
}

proptest! {
    #[test]
    fn total_always_matches_lines(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let mut cart = CartState::default();

        for op in ops {
            apply(&mut cart, op);

            let expected: Money = cart.items().iter().map(|l| l.price.times(l.quantity)).sum();
            prop_assert_eq!(cart.total(), expected);
            prop_assert!(cart.items().iter().all(|l| l.quantity >= 1));

            let ids: HashSet<&str> = cart.items().iter().map(|l| l.id.as_str()).collect();
            prop_assert_eq!(ids.len(), cart.items().len());
            prop_assert_eq!(cart.is_empty(), cart.items().is_empty());
        }
    }

    #[test]
    fn adding_n_times_yields_quantity_n(times in 1..20u32) {
        let mut cart = CartState::default();
        for _ in 0..times {
            cart.add_item(line(2, None));
        }

        prop_assert_eq!(cart.items().len(), 1);
        prop_assert_eq!(cart.item_count(), times);
        prop_assert_eq!(cart.total(), Money::from_major(999).times(times));
    }
}

#[tokio::test]
async fn three_adds_through_the_store_reach_three_thousand() {
    let bus = Arc::new(RecordingEventBus::<StorefrontEvent>::default());
    let cart = CartStore::new(CartEnvironment::new(bus.clone()));
    let p1 = CartLine::new(ProductId::new(1), "p1", Money::from_major(1000));

    cart.add_item(p1.clone()).await;
    cart.add_item(p1.clone()).await;
    let state = cart.add_item(p1).await;

    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].quantity, 3);
    assert_eq!(state.total(), Money::from_major(3000));
}

#[tokio::test]
async fn extreme_quantity_through_the_store_keeps_serving() {
    let bus = Arc::new(RecordingEventBus::<StorefrontEvent>::default());
    let cart = CartStore::new(CartEnvironment::new(bus.clone()));
    let yacht = CartLine::new(
        ProductId::new(1),
        "Yacht",
        Money::new(Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0)),
    );

    cart.add_item(yacht).await;
    let state = cart.set_quantity("1", i64::MAX).await;

    assert_eq!(state.items()[0].quantity, u32::MAX);
    assert_eq!(state.total(), state.items()[0].total());

    let state = cart.set_quantity("1", 2).await;
    assert_eq!(state.total(), Money::new(Decimal::from_i128_with_scale(200_000_000_000_000_000_000, 0)));
}
