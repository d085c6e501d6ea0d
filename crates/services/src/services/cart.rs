//! Session-held shopping cart.
//!
//! Every mutation reads the cart through [`WebSession::claim_cart`] inside a
//! transaction, so two requests on the same session cannot overwrite each
//! other's changes.

use db::models::{
    record::Record,
    web_session::{Cart, CartLine, WebSession},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;
use ts_rs::TS;
use utils::money::line_total;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("record not found")]
    RecordNotFound(Uuid),
    #[error("quantity must be at least {min}")]
    InvalidQuantity { min: i64 },
    #[error("Not enough stock for \"{title}\": requested {requested}, available {available}")]
    InsufficientStock {
        title: String,
        requested: i64,
        available: i64,
    },
    #[error("cart total is too large")]
    Overflow,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CartLineView {
    pub record_id: Uuid,
    pub title: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    /// Current stock, or 0 when the record has since been removed.
    pub stock_quantity: i64,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AddToCart {
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SetCartQuantity {
    pub quantity: i64,
}

/// Adds `quantity` units of `record`, merging with an existing line.
pub fn apply_add(cart: &mut Cart, record: &Record, quantity: i64) -> Result<(), CartError> {
    if quantity < 1 {
        return Err(CartError::InvalidQuantity { min: 1 });
    }
    let existing = cart.get(&record.id).map(|line| line.quantity).unwrap_or(0);
    let requested = existing.checked_add(quantity).ok_or(CartError::Overflow)?;
    put_line(cart, record, requested)
}

/// Sets the line for `record` to exactly `quantity`; zero removes it.
pub fn apply_set(cart: &mut Cart, record: &Record, quantity: i64) -> Result<(), CartError> {
    if quantity < 0 {
        return Err(CartError::InvalidQuantity { min: 0 });
    }
    if quantity == 0 {
        cart.remove(&record.id);
        return Ok(());
    }
    put_line(cart, record, quantity)
}

fn put_line(cart: &mut Cart, record: &Record, quantity: i64) -> Result<(), CartError> {
    if quantity > record.stock_quantity {
        return Err(CartError::InsufficientStock {
            title: record.title.clone(),
            requested: quantity,
            available: record.stock_quantity,
        });
    }
    line_total(record.price_cents, quantity).ok_or(CartError::Overflow)?;
    cart.insert(
        record.id,
        CartLine {
            title: record.title.clone(),
            unit_price_cents: record.price_cents,
            quantity,
        },
    );
    Ok(())
}

pub struct CartService;

impl CartService {
    pub async fn view(pool: &SqlitePool, session_id: Uuid) -> Result<CartView, CartError> {
        let cart = WebSession::load_cart(pool, session_id)
            .await?
            .ok_or(CartError::SessionNotFound)?;
        Self::render(pool, &cart).await
    }

    /// Builds the view, checking each line against current stock.
    pub async fn render(pool: &SqlitePool, cart: &Cart) -> Result<CartView, CartError> {
        let mut lines = Vec::new();
        let mut total_cents: i64 = 0;
        for (record_id, line) in cart.lines() {
            let stock_quantity = Record::find_by_id(pool, *record_id)
                .await?
                .map(|record| record.stock_quantity)
                .unwrap_or(0);
            let line_total_cents =
                line_total(line.unit_price_cents, line.quantity).ok_or(CartError::Overflow)?;
            total_cents = total_cents
                .checked_add(line_total_cents)
                .ok_or(CartError::Overflow)?;
            lines.push(CartLineView {
                record_id: *record_id,
                title: line.title.clone(),
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                line_total_cents,
                stock_quantity,
                available: stock_quantity >= line.quantity,
            });
        }
        Ok(CartView {
            lines,
            item_count: cart.item_count(),
            total_cents,
        })
    }

    pub async fn add(
        pool: &SqlitePool,
        session_id: Uuid,
        record_id: Uuid,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        let cart = Self::mutate(pool, session_id, record_id, |cart, record| {
            apply_add(cart, record, quantity)
        })
        .await?;
        debug!(session_id = %session_id, record_id = %record_id, quantity, "Added to cart");
        Self::render(pool, &cart).await
    }

    pub async fn set_quantity(
        pool: &SqlitePool,
        session_id: Uuid,
        record_id: Uuid,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity { min: 0 });
        }
        // zero drops the line without a record lookup
        if quantity == 0 {
            let (view, _) = Self::remove(pool, session_id, record_id).await?;
            return Ok(view);
        }
        let cart = Self::mutate(pool, session_id, record_id, |cart, record| {
            apply_set(cart, record, quantity)
        })
        .await?;
        Self::render(pool, &cart).await
    }

    /// Removes a line. The flag reports whether the line was there.
    pub async fn remove(
        pool: &SqlitePool,
        session_id: Uuid,
        record_id: Uuid,
    ) -> Result<(CartView, bool), CartError> {
        let mut tx = pool.begin().await?;
        let mut cart = WebSession::claim_cart(&mut *tx, session_id)
            .await?
            .ok_or(CartError::SessionNotFound)?;
        let removed = cart.remove(&record_id).is_some();
        if removed {
            WebSession::save_cart(&mut *tx, session_id, &cart).await?;
        }
        tx.commit().await?;
        Ok((Self::render(pool, &cart).await?, removed))
    }

    pub async fn clear(pool: &SqlitePool, session_id: Uuid) -> Result<(), CartError> {
        let mut tx = pool.begin().await?;
        let mut cart = WebSession::claim_cart(&mut *tx, session_id)
            .await?
            .ok_or(CartError::SessionNotFound)?;
        cart.clear();
        WebSession::save_cart(&mut *tx, session_id, &cart).await?;
        tx.commit().await?;
        debug!(session_id = %session_id, "Cart cleared");
        Ok(())
    }

    async fn mutate<F>(
        pool: &SqlitePool,
        session_id: Uuid,
        record_id: Uuid,
        change: F,
    ) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Cart, &Record) -> Result<(), CartError>,
    {
        let mut tx = pool.begin().await?;
        let mut cart = WebSession::claim_cart(&mut *tx, session_id)
            .await?
            .ok_or(CartError::SessionNotFound)?;
        let record = Record::find_by_id(&mut *tx, record_id)
            .await?
            .ok_or(CartError::RecordNotFound(record_id))?;
        change(&mut cart, &record)?;
        WebSession::save_cart(&mut *tx, session_id, &cart).await?;
        tx.commit().await?;
        Ok(cart)
    }
}
