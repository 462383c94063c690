//! # Shopping Cart
//!
//! Server-side cart per account. The cart stores product ids and
//! quantities only; names, prices and availability are joined from the
//! catalog on every read, so the view always reflects current prices.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::pricing::revalidate;
use pawmart_core::{Cart, Money, PricedLine, Quote, StockIssue, StockSnapshot};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::{AppState, CartRecord, ProductRecord};

/// Add units of a product.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

/// Set a line's quantity. Zero removes the line.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

/// A cart line joined with current catalog data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    #[schema(value_type = String)]
    pub unit_price: Money,
    pub quantity: u32,
    #[schema(value_type = String)]
    pub line_total: Money,
    pub stock: u32,
    /// False when the line would fail checkout as it stands.
    pub available: bool,
}

/// The cart as the shopper sees it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    /// Totals over the lines that can currently be bought.
    #[schema(value_type = Object)]
    pub quote: Quote,
    /// Lines that cannot be bought as they stand.
    #[schema(value_type = Vec<Object>)]
    pub issues: Vec<StockIssue>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/cart", get(get_cart).delete(clear_cart))
        .route("/v1/cart/items", post(add_item))
        .route(
            "/v1/cart/items/:product_id",
            delete(remove_item).put(set_quantity),
        )
}

/// Current catalog state for every product in a cart.
pub fn stock_snapshots(state: &AppState, cart: &Cart) -> HashMap<Uuid, StockSnapshot> {
    cart.lines
        .iter()
        .filter_map(|line| state.products.get(&line.product_id))
        .map(|p| {
            (
                p.id,
                StockSnapshot {
                    name: p.name,
                    unit_price: p.price,
                    stock: p.stock,
                    active: p.active,
                },
            )
        })
        .collect()
}

/// Price the buyable part of a cart and collect problems with the rest.
pub fn price_cart(
    state: &AppState,
    cart: &Cart,
) -> Result<(Vec<PricedLine>, Quote, Vec<StockIssue>), AppError> {
    let snapshots = stock_snapshots(state, cart);
    let (priced, issues) = match revalidate(&cart.lines, &snapshots) {
        Ok(priced) => (priced, Vec::new()),
        Err(issues) => {
            let blocked: Vec<Uuid> = issues.iter().map(StockIssue::product_id).collect();
            let rest: Vec<_> = cart
                .lines
                .iter()
                .filter(|l| !blocked.contains(&l.product_id))
                .copied()
                .collect();
            // Everything left passed the first pass against the same snapshots.
            let priced = revalidate(&rest, &snapshots).unwrap_or_default();
            (priced, issues)
        }
    };
    let quote = state.config.pricing.quote(&priced)?;
    Ok((priced, quote, issues))
}

/// Build the shopper-facing view of a cart.
pub fn cart_view(state: &AppState, cart: &Cart) -> Result<CartView, AppError> {
    let (priced, quote, issues) = price_cart(state, cart)?;
    let lines = cart
        .lines
        .iter()
        .filter_map(|line| {
            let product = state.products.get(&line.product_id)?;
            let priced_line = priced.iter().find(|p| p.product_id == line.product_id);
            Some(CartLineView {
                product_id: product.id,
                line_total: priced_line
                    .map(|p| p.line_total)
                    .unwrap_or_else(|| product.price.checked_mul(line.quantity).unwrap_or(Money::ZERO)),
                available: priced_line.is_some(),
                name: product.name,
                slug: product.slug,
                image: product.images.into_iter().next(),
                unit_price: product.price,
                quantity: line.quantity,
                stock: product.stock,
            })
        })
        .collect();
    Ok(CartView {
        lines,
        quote,
        issues,
    })
}

fn purchasable(state: &AppState, product_id: Uuid) -> Result<ProductRecord, AppError> {
    state
        .products
        .get(&product_id)
        .filter(|p| p.active)
        .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))
}

fn ensure_stock(product: &ProductRecord, quantity: u32) -> Result<(), AppError> {
    if quantity > product.stock {
        return Err(AppError::StockConflict(vec![StockIssue::InsufficientStock {
            product_id: product.id,
            name: product.name.clone(),
            requested: quantity,
            available: product.stock,
        }]));
    }
    Ok(())
}

/// Store and persist a modified cart.
pub async fn save_cart(state: &AppState, mut record: CartRecord) -> Result<CartRecord, AppError> {
    record.updated_at = Some(Utc::now());
    state.carts.insert(record.id, record.clone());
    state.persist(&record).await?;
    Ok(record)
}

/// GET /v1/cart — Cart lines with live prices and a quote.
#[utoipa::path(
    get,
    path = "/v1/cart",
    responses(
        (status = 200, description = "Current cart", body = CartView),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    tag = "cart"
)]
async fn get_cart(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<CartView>, AppError> {
    let user_id = caller.require_user()?;
    let record = state.cart_of(user_id);
    cart_view(&state, &record.cart).map(Json)
}

/// POST /v1/cart/items — Add units of a product.
#[utoipa::path(
    post,
    path = "/v1/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 404, description = "Unknown or inactive product", body = crate::error::ErrorBody),
        (status = 409, description = "Not enough stock", body = crate::error::ErrorBody),
        (status = 422, description = "Quantity out of range", body = crate::error::ErrorBody),
    ),
    tag = "cart"
)]
async fn add_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<CartView>, AppError> {
    let user_id = caller.require_user()?;
    let req = extract_json(body)?;
    let record = add_to_cart(&state, user_id, req.product_id, req.quantity).await?;
    cart_view(&state, &record.cart).map(Json)
}

/// Add units to a user's cart after checking the product can be bought.
pub async fn add_to_cart(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    quantity: u32,
) -> Result<CartRecord, AppError> {
    let product = purchasable(state, product_id)?;
    let mut record = state.cart_of(user_id);
    let resulting = record.cart.add(product_id, quantity)?;
    ensure_stock(&product, resulting)?;
    save_cart(state, record).await
}

/// PUT /v1/cart/items/:product_id — Set a line's quantity.
#[utoipa::path(
    put,
    path = "/v1/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 404, description = "Line not in cart", body = crate::error::ErrorBody),
        (status = 409, description = "Not enough stock", body = crate::error::ErrorBody),
    ),
    tag = "cart"
)]
async fn set_quantity(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(product_id): Path<Uuid>,
    body: Result<Json<SetQuantityRequest>, JsonRejection>,
) -> Result<Json<CartView>, AppError> {
    let user_id = caller.require_user()?;
    let req = extract_json(body)?;
    let mut record = state.cart_of(user_id);
    if req.quantity > 0 {
        let product = purchasable(&state, product_id)?;
        ensure_stock(&product, req.quantity)?;
    }
    record.cart.set_quantity(product_id, req.quantity)?;
    let record = save_cart(&state, record).await?;
    cart_view(&state, &record.cart).map(Json)
}

/// DELETE /v1/cart/items/:product_id — Remove a line.
#[utoipa::path(
    delete,
    path = "/v1/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 404, description = "Line not in cart", body = crate::error::ErrorBody),
    ),
    tag = "cart"
)]
async fn remove_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>, AppError> {
    let user_id = caller.require_user()?;
    let mut record = state.cart_of(user_id);
    record.cart.remove(&product_id)?;
    let record = save_cart(&state, record).await?;
    cart_view(&state, &record.cart).map(Json)
}

/// DELETE /v1/cart — Empty the cart.
#[utoipa::path(
    delete,
    path = "/v1/cart",
    responses((status = 204, description = "Cart cleared")),
    tag = "cart"
)]
async fn clear_cart(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<StatusCode, AppError> {
    let user_id = caller.require_user()?;
    let mut record = state.cart_of(user_id);
    record.cart.clear();
    save_cart(&state, record).await?;
    Ok(StatusCode::NO_CONTENT)
}
