//! Turns the session cart into an order.
//!
//! The whole conversion runs in one transaction: claim the cart, price every
//! line from the records table, insert the order and its lines, take the
//! stock, empty the cart, commit. Any failure rolls all of it back, leaving
//! stock and cart as they were.

use std::collections::HashMap;

use db::models::{
    order::{CreateOrder, Order, OrderItem, OrderWithItems, PaymentMethod},
    record::Record,
    user::User,
    web_session::{Cart, WebSession},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use utils::money::{format_cents, line_total};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("Cart is empty")]
    EmptyCart,
    #[error("a shipping address is required")]
    MissingAddress,
    #[error("unknown payment method: {0}")]
    InvalidPaymentMethod(String),
    #[error("\"{title}\" is no longer available")]
    RecordUnavailable { record_id: Uuid, title: String },
    #[error("Not enough stock for \"{title}\": requested {requested}, available {available}")]
    InsufficientStock {
        record_id: Uuid,
        title: String,
        requested: i64,
        available: i64,
    },
    #[error("order total is too large")]
    Overflow,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CheckoutRequest {
    /// Falls back to the account's saved address when absent.
    pub shipping_address: Option<String>,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub record_id: Uuid,
    pub title: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    pub total_cents: i64,
}

/// Prices the cart against the current records and checks stock for every line.
///
/// `records` holds the rows found for the cart's ids; ids missing from it are
/// records deleted since they were added.
pub fn plan_order(cart: &Cart, records: &HashMap<Uuid, Record>) -> Result<OrderPlan, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut lines = Vec::new();
    let mut total_cents: i64 = 0;
    for (record_id, line) in cart.lines() {
        let Some(record) = records.get(record_id) else {
            return Err(CheckoutError::RecordUnavailable {
                record_id: *record_id,
                title: line.title.clone(),
            });
        };
        if line.quantity < 1 || line.quantity > record.stock_quantity {
            return Err(CheckoutError::InsufficientStock {
                record_id: *record_id,
                title: record.title.clone(),
                requested: line.quantity,
                available: record.stock_quantity,
            });
        }
        let line_total_cents =
            line_total(record.price_cents, line.quantity).ok_or(CheckoutError::Overflow)?;
        total_cents = total_cents
            .checked_add(line_total_cents)
            .ok_or(CheckoutError::Overflow)?;
        lines.push(PlannedLine {
            record_id: *record_id,
            title: record.title.clone(),
            quantity: line.quantity,
            unit_price_cents: record.price_cents,
            line_total_cents,
        });
    }

    Ok(OrderPlan { lines, total_cents })
}

fn resolve_address(requested: Option<&str>, saved: Option<&str>) -> Result<String, CheckoutError> {
    requested
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .or_else(|| saved.map(str::trim).filter(|address| !address.is_empty()))
        .map(str::to_string)
        .ok_or(CheckoutError::MissingAddress)
}

pub struct CheckoutService;

impl CheckoutService {
    pub async fn checkout(
        pool: &SqlitePool,
        session_id: Uuid,
        user: &User,
        request: &CheckoutRequest,
    ) -> Result<OrderWithItems, CheckoutError> {
        match Self::place_order(pool, session_id, user, request).await {
            Ok(order) => {
                info!(
                    order_id = %order.id,
                    user_id = %user.id,
                    total_cents = order.total_cents,
                    lines = order.items.len(),
                    "Order placed"
                );
                Ok(order)
            }
            Err(e) => {
                warn!(user_id = %user.id, session_id = %session_id, error = %e, "Checkout rejected");
                Err(e)
            }
        }
    }

    /// Flash text for a placed order.
    pub fn confirmation_message(order: &Order) -> String {
        format!(
            "Order #{} placed, total {}",
            order.short_id(),
            format_cents(order.total_cents)
        )
    }

    async fn place_order(
        pool: &SqlitePool,
        session_id: Uuid,
        user: &User,
        request: &CheckoutRequest,
    ) -> Result<OrderWithItems, CheckoutError> {
        let payment_method: PaymentMethod = request
            .payment_method
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|_| CheckoutError::InvalidPaymentMethod(request.payment_method.clone()))?;
        let shipping_address = resolve_address(
            request.shipping_address.as_deref(),
            user.shipping_address.as_deref(),
        )?;

        // dropping `tx` on any early return rolls everything back
        let mut tx = pool.begin().await?;

        let cart = WebSession::claim_cart(&mut *tx, session_id)
            .await?
            .ok_or(CheckoutError::SessionNotFound)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut records = HashMap::new();
        for (record_id, _) in cart.lines() {
            if let Some(record) = Record::find_by_id(&mut *tx, *record_id).await? {
                records.insert(*record_id, record);
            }
        }
        let plan = plan_order(&cart, &records)?;

        let order = Order::create(
            &mut *tx,
            &CreateOrder {
                user_id: user.id,
                payment_method,
                shipping_address: shipping_address.clone(),
                total_cents: plan.total_cents,
            },
            Uuid::new_v4(),
        )
        .await?;

        for line in &plan.lines {
            OrderItem::create(
                &mut *tx,
                order.id,
                line.record_id,
                line.quantity,
                line.unit_price_cents,
            )
            .await?;
            if !Record::decrement_stock(&mut *tx, line.record_id, line.quantity).await? {
                let available = records
                    .get(&line.record_id)
                    .map(|record| record.stock_quantity)
                    .unwrap_or(0);
                return Err(CheckoutError::InsufficientStock {
                    record_id: line.record_id,
                    title: line.title.clone(),
                    requested: line.quantity,
                    available,
                });
            }
        }

        WebSession::save_cart(&mut *tx, session_id, &Cart::default()).await?;

        if user.shipping_address.is_none() {
            User::update_shipping_address(&mut *tx, user.id, Some(&shipping_address)).await?;
        }

        let items = OrderItem::find_details_by_order_id(&mut *tx, order.id).await?;
        tx.commit().await?;

        Ok(OrderWithItems { order, items })
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            order::OrderStatus,
            record::UpdateRecord,
            user::UserRole,
            web_session::CartLine,
        },
    };
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::services::{
        cart::CartService,
        test_support::{TestStore, record_fixture},
    };

    fn request(address: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: address.map(str::to_string),
            payment_method: "card".to_string(),
        }
    }

    fn cart_of(lines: &[(&Record, i64)]) -> Cart {
        let mut cart = Cart::default();
        for (record, quantity) in lines {
            cart.insert(
                record.id,
                CartLine {
                    title: record.title.clone(),
                    unit_price_cents: record.price_cents,
                    quantity: *quantity,
                },
            );
        }
        cart
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let records: Vec<Record> = (0..rng.gen_range(1..6))
                .map(|i| {
                    record_fixture(
                        &format!("Record {i}"),
                        rng.gen_range(1..500_000),
                        rng.gen_range(1..50),
                    )
                })
                .collect();
            let lines: Vec<(&Record, i64)> = records
                .iter()
                .map(|record| (record, rng.gen_range(1..=record.stock_quantity)))
                .collect();
            let cart = cart_of(&lines);
            let by_id: HashMap<Uuid, Record> =
                records.iter().map(|record| (record.id, record.clone())).collect();

            let plan = plan_order(&cart, &by_id).unwrap();
            let expected: i64 = lines
                .iter()
                .map(|(record, quantity)| record.price_cents * quantity)
                .sum();
            assert_eq!(plan.total_cents, expected);
            assert_eq!(
                plan.total_cents,
                plan.lines.iter().map(|line| line.line_total_cents).sum::<i64>()
            );
            assert_eq!(plan.lines.len(), records.len());
        }
    }

    #[test]
    fn plan_rejects_overdrawn_and_missing_lines() {
        let record = record_fixture("Kind of Blue", 2800, 1);
        let cart = cart_of(&[(&record, 2)]);
        let by_id = HashMap::from([(record.id, record.clone())]);
        assert!(matches!(
            plan_order(&cart, &by_id),
            Err(CheckoutError::InsufficientStock { requested: 2, available: 1, .. })
        ));

        assert!(matches!(
            plan_order(&cart, &HashMap::new()),
            Err(CheckoutError::RecordUnavailable { .. })
        ));
        assert!(matches!(
            plan_order(&Cart::default(), &by_id),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn address_falls_back_to_saved_one() {
        assert_eq!(resolve_address(Some(" Test street 5 "), None).unwrap(), "Test street 5");
        assert_eq!(resolve_address(Some("  "), Some("Saved 1")).unwrap(), "Saved 1");
        assert!(matches!(resolve_address(None, None), Err(CheckoutError::MissingAddress)));
    }

    #[tokio::test]
    async fn checkout_creates_order_takes_stock_and_empties_cart() {
        let store = TestStore::new().await;
        let user = store.user("buyer", UserRole::Customer).await;
        let moon = store.record("The Dark Side of the Moon", 2599, 10).await;
        let road = store.record("Abbey Road", 2250, 5).await;
        let session = store.session().await;
        CartService::add(&store.db.pool, session.id, moon.id, 2).await.unwrap();
        CartService::add(&store.db.pool, session.id, road.id, 1).await.unwrap();

        let order = CheckoutService::checkout(&store.db.pool, session.id, &user, &request(Some("Test street 5")))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_method, PaymentMethod::Card);
        assert_eq!(order.user_id, user.id);
        assert_eq!(order.total_cents, 2 * 2599 + 2250);
        assert_eq!(order.items.len(), 2);
        assert_eq!(store.stock_of(moon.id).await, 8);
        assert_eq!(store.stock_of(road.id).await, 4);

        let cart = WebSession::load_cart(&store.db.pool, session.id).await.unwrap().unwrap();
        assert!(cart.is_empty());

        // the address used is remembered for next time
        let reloaded = User::find_by_id(&store.db.pool, user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.shipping_address.as_deref(), Some("Test street 5"));
        assert!(CheckoutService::confirmation_message(&order).starts_with("Order #"));
    }

    #[tokio::test]
    async fn unit_price_is_captured_at_purchase_time() {
        let store = TestStore::new().await;
        let user = store.user("buyer", UserRole::Customer).await;
        let record = store.record("Abbey Road", 2250, 5).await;
        let session = store.session().await;
        CartService::add(&store.db.pool, session.id, record.id, 2).await.unwrap();

        let repriced = UpdateRecord {
            price_cents: Some(1999),
            ..Default::default()
        };
        Record::update(&store.db.pool, record.id, &repriced).await.unwrap();

        let order = CheckoutService::checkout(&store.db.pool, session.id, &user, &request(Some("Addr")))
            .await
            .unwrap();
        assert_eq!(order.items[0].unit_price_cents, 1999);
        assert_eq!(order.total_cents, 3998);

        // later price changes do not touch the order
        Record::update(
            &store.db.pool,
            record.id,
            &UpdateRecord {
                price_cents: Some(5000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let items = OrderItem::find_by_order_id(&store.db.pool, order.id).await.unwrap();
        assert_eq!(items[0].unit_price_cents, 1999);
    }

    #[tokio::test]
    async fn failed_checkout_changes_nothing() {
        let store = TestStore::new().await;
        let user = store.user("buyer", UserRole::Customer).await;
        let plenty = store.record("Plenty", 1000, 10).await;
        let scarce = store.record("Scarce", 1000, 3).await;
        let session = store.session().await;
        CartService::add(&store.db.pool, session.id, plenty.id, 4).await.unwrap();
        CartService::add(&store.db.pool, session.id, scarce.id, 3).await.unwrap();
        let cart_before = WebSession::load_cart(&store.db.pool, session.id).await.unwrap();

        // someone else bought one after it went into the cart
        assert!(Record::decrement_stock(&store.db.pool, scarce.id, 1).await.unwrap());

        let err = CheckoutService::checkout(&store.db.pool, session.id, &user, &request(Some("Addr")))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { available: 2, .. }));

        assert_eq!(store.stock_of(plenty.id).await, 10);
        assert_eq!(store.stock_of(scarce.id).await, 2);
        assert!(Order::find_by_user_id(&store.db.pool, user.id).await.unwrap().is_empty());
        let cart_after = WebSession::load_cart(&store.db.pool, session.id).await.unwrap();
        assert_eq!(cart_before, cart_after);
    }

    #[tokio::test]
    async fn empty_cart_and_bad_payment_are_rejected() {
        let store = TestStore::new().await;
        let user = store.user("buyer", UserRole::Customer).await;
        let session = store.session().await;

        let err = CheckoutService::checkout(&store.db.pool, session.id, &user, &request(Some("Addr")))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));

        let bad = CheckoutRequest {
            shipping_address: Some("Addr".to_string()),
            payment_method: "barter".to_string(),
        };
        let err = CheckoutService::checkout(&store.db.pool, session.id, &user, &bad)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidPaymentMethod(_)));
    }

    #[tokio::test]
    async fn random_checkouts_never_overdraw_stock() {
        let store = TestStore::new().await;
        let user = store.user("buyer", UserRole::Customer).await;
        let mut records = Vec::new();
        for i in 0..4 {
            records.push(store.record(&format!("Record {i}"), 1000 + i, 6).await);
        }

        let mut rng = StdRng::seed_from_u64(42);
        let mut sold: HashMap<Uuid, i64> = HashMap::new();
        for _ in 0..25 {
            let session = store.session().await;
            let mut cart = Cart::default();
            for record in &records {
                if rng.gen_bool(0.5) {
                    cart.insert(
                        record.id,
                        CartLine {
                            title: record.title.clone(),
                            unit_price_cents: record.price_cents,
                            quantity: rng.gen_range(1..4),
                        },
                    );
                }
            }
            WebSession::save_cart(&store.db.pool, session.id, &cart).await.unwrap();

            match CheckoutService::checkout(&store.db.pool, session.id, &user, &request(Some("Addr"))).await {
                Ok(order) => {
                    for item in &order.items {
                        *sold.entry(item.record_id).or_default() += item.quantity;
                    }
                    let cart = WebSession::load_cart(&store.db.pool, session.id).await.unwrap().unwrap();
                    assert!(cart.is_empty());
                }
                Err(_) => {
                    let unchanged = WebSession::load_cart(&store.db.pool, session.id).await.unwrap().unwrap();
                    assert_eq!(unchanged, cart);
                }
            }
        }

        for record in &records {
            let stock = store.stock_of(record.id).await;
            assert!(stock >= 0);
            assert_eq!(stock + sold.get(&record.id).copied().unwrap_or(0), 6);
        }
    }

    #[tokio::test]
    async fn concurrent_checkouts_cannot_oversell_last_copy() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("store.db").display());
        let store = TestStore::with_db(DBService::new(&url).await.unwrap());
        let first_buyer = store.user("first", UserRole::Customer).await;
        let second_buyer = store.user("second", UserRole::Customer).await;
        let record = store.record("Last Copy", 9900, 1).await;

        let first_session = store.session().await;
        let second_session = store.session().await;
        CartService::add(&store.db.pool, first_session.id, record.id, 1).await.unwrap();
        CartService::add(&store.db.pool, second_session.id, record.id, 1).await.unwrap();

        let first_request = request(Some("A"));
        let second_request = request(Some("B"));
        let (first, second) = tokio::join!(
            CheckoutService::checkout(&store.db.pool, first_session.id, &first_buyer, &first_request),
            CheckoutService::checkout(&store.db.pool, second_session.id, &second_buyer, &second_request),
        );

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(store.stock_of(record.id).await, 0);
    }
}
