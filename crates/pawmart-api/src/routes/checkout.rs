//! # Checkout
//!
//! Turns the caller's cart into an order.
//!
//! ## Sequence
//!
//! ```text
//! cart ──► revalidate against catalog ──► quote ──► deduct stock (memory)
//!      ──► deduct stock (database, conditional) ──► create order
//!      ──► clear cart ──► confirmation email (background)
//! ```
//!
//! Prices and names always come from the catalog. Any line that is gone,
//! inactive or short on stock fails the whole checkout with
//! `409 STOCK_CONFLICT`, listing every problem line.
//!
//! The in-memory deduction is all-or-nothing under a single lock. The
//! database deduction is a conditional bulk update without a transaction;
//! if fewer rows apply than lines were ordered the order still stands and
//! a warning is logged for staff to reconcile.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::fields::{normalize_email, optional_text};
use pawmart_core::order::order_number;
use pawmart_core::pricing::{plan_deductions, revalidate};
use pawmart_core::{OrderStatus, PaymentMethod, PricedLine, Quote, ShippingAddress, StockDeduction, StockIssue};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::notify;
use crate::routes::cart::{save_cart, stock_snapshots};
use crate::state::{AppState, OrderRecord, StatusChange};

/// Place an order for everything in the cart.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[schema(value_type = Object)]
    pub shipping_address: ShippingAddress,
    #[schema(value_type = String, example = "cash_on_delivery")]
    pub payment_method: PaymentMethod,
    /// Defaults to the account email.
    pub contact_email: Option<String>,
    pub notes: Option<String>,
}

/// Priced cart without placing an order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutQuote {
    #[schema(value_type = Vec<Object>)]
    pub lines: Vec<PricedLine>,
    #[schema(value_type = Object)]
    pub quote: Quote,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/checkout", post(place_order))
        .route("/v1/checkout/quote", post(quote_cart))
}

/// Revalidate the caller's cart and price it. Fails on any stock issue.
fn price_for_checkout(
    state: &AppState,
    user_id: Uuid,
) -> Result<(Vec<PricedLine>, Quote), AppError> {
    let record = state.cart_of(user_id);
    if record.cart.is_empty() {
        return Err(AppError::Validation("cart is empty".into()));
    }
    let snapshots = stock_snapshots(state, &record.cart);
    let lines = revalidate(&record.cart.lines, &snapshots).map_err(AppError::StockConflict)?;
    if lines.is_empty() {
        return Err(AppError::Validation("cart is empty".into()));
    }
    let quote = state.config.pricing.quote(&lines)?;
    Ok((lines, quote))
}

/// Decrement in-memory stock for every deduction, or none of them.
pub fn deduct_in_memory(state: &AppState, deductions: &[StockDeduction]) -> Result<(), AppError> {
    let ids: Vec<Uuid> = deductions.iter().map(|d| d.product_id).collect();
    let wanted = |id: &Uuid| {
        deductions
            .iter()
            .find(|d| d.product_id == *id)
            .map_or(0, |d| d.quantity)
    };
    state
        .products
        .try_update_many(
            &ids,
            |id, product| match product {
                Some(p) if p.active && p.stock >= wanted(id) => Ok(()),
                Some(p) if p.active => Err(StockIssue::InsufficientStock {
                    product_id: *id,
                    name: p.name.clone(),
                    requested: wanted(id),
                    available: p.stock,
                }),
                Some(p) => Err(StockIssue::Unavailable {
                    product_id: *id,
                    name: p.name.clone(),
                }),
                None => Err(StockIssue::NotFound { product_id: *id }),
            },
            |id, product| {
                product.stock -= wanted(id);
                product.updated_at = Utc::now();
            },
        )
        .map(|_| ())
        .map_err(|issue| AppError::StockConflict(vec![issue]))
}

/// Return stock for an order's lines, in memory and in the database.
///
/// Products deleted since the order was placed are skipped.
pub async fn restock(state: &AppState, order: &OrderRecord) {
    let deductions = plan_deductions(&order.lines);
    for d in &deductions {
        state.products.update(&d.product_id, |p| {
            p.stock = p.stock.saturating_add(d.quantity);
            p.updated_at = Utc::now();
        });
    }
    if let Some(pool) = &state.db_pool {
        match crate::db::products::restock(pool, &deductions).await {
            Ok(applied) if applied < deductions.len() as u64 => tracing::warn!(
                order_id = %order.id,
                requested = deductions.len(),
                applied,
                "partial restock in database"
            ),
            Ok(_) => {}
            Err(e) => tracing::warn!(order_id = %order.id, error = %e, "database restock failed"),
        }
    }
    tracing::info!(order_id = %order.id, lines = deductions.len(), "stock returned");
}

/// POST /v1/checkout/quote — Price the cart without placing an order.
#[utoipa::path(
    post,
    path = "/v1/checkout/quote",
    responses(
        (status = 200, description = "Priced cart", body = CheckoutQuote),
        (status = 409, description = "Stock conflict", body = crate::error::ErrorBody),
        (status = 422, description = "Empty cart", body = crate::error::ErrorBody),
    ),
    tag = "checkout"
)]
async fn quote_cart(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<CheckoutQuote>, AppError> {
    let user_id = caller.require_user()?;
    let (lines, quote) = price_for_checkout(&state, user_id)?;
    Ok(Json(CheckoutQuote { lines, quote }))
}

/// POST /v1/checkout — Place an order for the cart.
#[utoipa::path(
    post,
    path = "/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderRecord),
        (status = 409, description = "Stock conflict", body = crate::error::ErrorBody),
        (status = 422, description = "Empty cart or invalid address", body = crate::error::ErrorBody),
    ),
    tag = "checkout"
)]
async fn place_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderRecord>), AppError> {
    let user_id = caller.require_user()?;
    let req = extract_json(body)?;

    let shipping_address = req.shipping_address.normalized()?;
    let notes = optional_text("notes", req.notes.as_deref(), 1000)?;
    let contact_email = match req.contact_email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => normalize_email(email)?,
        _ => state
            .users
            .get(&user_id)
            .map(|u| u.email)
            .ok_or_else(|| AppError::NotFound(format!("account {user_id} not found")))?,
    };

    let (lines, quote) = price_for_checkout(&state, user_id)?;
    let deductions = plan_deductions(&lines);
    deduct_in_memory(&state, &deductions)?;

    let order_id = Uuid::new_v4();
    if let Some(pool) = &state.db_pool {
        match crate::db::products::deduct_stock(pool, &deductions).await {
            Ok(applied) if applied < deductions.len() as u64 => tracing::warn!(
                order_id = %order_id,
                requested = deductions.len(),
                applied,
                "partial stock deduction in database"
            ),
            Ok(_) => {}
            Err(e) => tracing::warn!(
                order_id = %order_id,
                error = %e,
                "database stock deduction failed"
            ),
        }
    }

    let now = Utc::now();
    let order = OrderRecord {
        id: order_id,
        order_number: order_number(order_id, now),
        user_id,
        lines,
        item_count: quote.item_count,
        subtotal: quote.subtotal,
        shipping: quote.shipping,
        tax: quote.tax,
        total: quote.total,
        status: OrderStatus::Pending,
        payment_method: req.payment_method,
        shipping_address,
        contact_email,
        notes,
        status_history: vec![StatusChange {
            status: OrderStatus::Pending,
            at: now,
        }],
        created_at: now,
        updated_at: now,
    };
    state.orders.insert(order.id, order.clone());
    state.persist(&order).await?;

    let mut cart = state.cart_of(user_id);
    cart.cart.clear();
    save_cart(&state, cart).await?;

    state.metrics.record_order();
    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        user_id = %user_id,
        total = %order.total,
        items = order.item_count,
        "order placed"
    );
    notify::send_in_background(&state, "order_confirmation", notify::order_confirmation(&order));

    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ProductRecord;
    use pawmart_core::{Money, ProductCategory};

    fn product(state: &AppState, stock: u32, active: bool) -> Uuid {
        let now = Utc::now();
        let p = ProductRecord {
            id: Uuid::new_v4(),
            slug: Uuid::new_v4().to_string(),
            name: "Bird Seed".into(),
            description: String::new(),
            category: ProductCategory::Food,
            species: vec![],
            price: Money::from_cents(6_00),
            compare_at_price: None,
            stock,
            images: vec![],
            featured: false,
            active,
            created_at: now,
            updated_at: now,
        };
        let id = p.id;
        state.products.insert(id, p);
        id
    }

    fn deduction(product_id: Uuid, quantity: u32) -> StockDeduction {
        StockDeduction {
            product_id,
            quantity,
        }
    }

    #[test]
    fn in_memory_deduction_is_all_or_nothing() {
        let state = AppState::new();
        let a = product(&state, 5, true);
        let b = product(&state, 1, true);

        let err = deduct_in_memory(&state, &[deduction(a, 2), deduction(b, 2)]).unwrap_err();
        match err {
            AppError::StockConflict(issues) => assert_eq!(issues[0].product_id(), b),
            other => panic!("expected stock conflict, got {other:?}"),
        }
        assert_eq!(state.products.get(&a).unwrap().stock, 5);

        deduct_in_memory(&state, &[deduction(a, 2), deduction(b, 1)]).unwrap();
        assert_eq!(state.products.get(&a).unwrap().stock, 3);
        assert_eq!(state.products.get(&b).unwrap().stock, 0);
    }

    #[test]
    fn inactive_product_blocks_deduction() {
        let state = AppState::new();
        let id = product(&state, 9, false);
        let err = deduct_in_memory(&state, &[deduction(id, 1)]).unwrap_err();
        assert!(matches!(
            err,
            AppError::StockConflict(ref issues) if matches!(issues[0], StockIssue::Unavailable { .. })
        ));
    }

    #[test]
    fn empty_cart_cannot_be_priced() {
        let state = AppState::new();
        let err = price_for_checkout(&state, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
