//! Wishlist: saved products, movable into the cart.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::routes::cart::{add_to_cart, cart_view, CartView};
use crate::state::{AppState, ProductRecord, WishlistRecord};

#[derive(Debug, Deserialize, ToSchema)]
pub struct WishlistAddRequest {
    pub product_id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/wishlist", get(get_wishlist))
        .route("/v1/wishlist/items", post(add_item))
        .route("/v1/wishlist/items/:product_id", delete(remove_item))
        .route(
            "/v1/wishlist/items/:product_id/move-to-cart",
            post(move_to_cart),
        )
}

/// Wishlisted products that still exist, in the order they were saved.
///
/// Inactive products stay listed so the shopper can see they went away.
fn products_of(state: &AppState, record: &WishlistRecord) -> Vec<ProductRecord> {
    record
        .product_ids
        .iter()
        .filter_map(|id| state.products.get(id))
        .collect()
}

async fn save(state: &AppState, mut record: WishlistRecord) -> Result<WishlistRecord, AppError> {
    record.updated_at = Some(Utc::now());
    state.wishlists.insert(record.id, record.clone());
    state.persist(&record).await?;
    Ok(record)
}

/// GET /v1/wishlist
#[utoipa::path(
    get,
    path = "/v1/wishlist",
    responses((status = 200, description = "Saved products", body = Vec<ProductRecord>)),
    tag = "wishlist"
)]
async fn get_wishlist(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ProductRecord>>, AppError> {
    let user_id = caller.require_user()?;
    Ok(Json(products_of(&state, &state.wishlist_of(user_id))))
}

/// POST /v1/wishlist/items — Save a product. Saving twice is a no-op.
#[utoipa::path(
    post,
    path = "/v1/wishlist/items",
    request_body = WishlistAddRequest,
    responses(
        (status = 200, description = "Saved products", body = Vec<ProductRecord>),
        (status = 404, description = "Unknown product", body = crate::error::ErrorBody),
    ),
    tag = "wishlist"
)]
async fn add_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<WishlistAddRequest>, JsonRejection>,
) -> Result<Json<Vec<ProductRecord>>, AppError> {
    let user_id = caller.require_user()?;
    let req = extract_json(body)?;
    if !state.products.get(&req.product_id).is_some_and(|p| p.active) {
        return Err(AppError::NotFound(format!(
            "product {} not found",
            req.product_id
        )));
    }
    let mut record = state.wishlist_of(user_id);
    if !record.product_ids.contains(&req.product_id) {
        record.product_ids.push(req.product_id);
        record = save(&state, record).await?;
    }
    Ok(Json(products_of(&state, &record)))
}

/// DELETE /v1/wishlist/items/:product_id
#[utoipa::path(
    delete,
    path = "/v1/wishlist/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Saved products", body = Vec<ProductRecord>),
        (status = 404, description = "Not in wishlist", body = crate::error::ErrorBody),
    ),
    tag = "wishlist"
)]
async fn remove_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<ProductRecord>>, AppError> {
    let user_id = caller.require_user()?;
    let record = remove_from(&state, user_id, product_id).await?;
    Ok(Json(products_of(&state, &record)))
}

async fn remove_from(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<WishlistRecord, AppError> {
    let mut record = state.wishlist_of(user_id);
    let before = record.product_ids.len();
    record.product_ids.retain(|id| *id != product_id);
    if record.product_ids.len() == before {
        return Err(AppError::NotFound(format!(
            "product {product_id} is not in the wishlist"
        )));
    }
    save(state, record).await
}

/// POST /v1/wishlist/items/:product_id/move-to-cart
///
/// Adds one unit to the cart, then drops the product from the wishlist.
/// If the cart rejects it the wishlist is left untouched.
#[utoipa::path(
    post,
    path = "/v1/wishlist/items/{product_id}/move-to-cart",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 404, description = "Not in wishlist or unavailable", body = crate::error::ErrorBody),
        (status = 409, description = "Out of stock", body = crate::error::ErrorBody),
    ),
    tag = "wishlist"
)]
async fn move_to_cart(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>, AppError> {
    let user_id = caller.require_user()?;
    if !state.wishlist_of(user_id).product_ids.contains(&product_id) {
        return Err(AppError::NotFound(format!(
            "product {product_id} is not in the wishlist"
        )));
    }
    let cart = add_to_cart(&state, user_id, product_id, 1).await?;
    remove_from(&state, user_id, product_id).await?;
    cart_view(&state, &cart.cart).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawmart_core::{Money, ProductCategory};

    fn product(state: &AppState, stock: u32) -> Uuid {
        let now = Utc::now();
        let p = ProductRecord {
            id: Uuid::new_v4(),
            slug: format!("p-{stock}"),
            name: "Leash".into(),
            description: String::new(),
            category: ProductCategory::Accessories,
            species: vec![],
            price: Money::from_cents(12_00),
            compare_at_price: None,
            stock,
            images: vec![],
            featured: false,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let id = p.id;
        state.products.insert(id, p);
        id
    }

    #[tokio::test]
    async fn remove_unknown_is_not_found() {
        let state = AppState::new();
        let err = remove_from(&state, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_skips_deleted_products() {
        let state = AppState::new();
        let user = Uuid::new_v4();
        let kept = product(&state, 1);
        let mut record = state.wishlist_of(user);
        record.product_ids = vec![Uuid::new_v4(), kept];
        let record = save(&state, record).await.unwrap();
        let listed = products_of(&state, &record);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept);
    }
}
