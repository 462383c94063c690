//! # Product Catalog
//!
//! Public storefront listing and detail, plus admin CRUD under
//! `/v1/admin/products`. Inactive products are invisible to the public
//! routes and cannot be added to a cart.

use std::cmp::Reverse;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::catalog::slugify;
use pawmart_core::fields::require_text;
use pawmart_core::{Money, ProductCategory, Species};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query, extract_validated_json, Page, PageParams, Validate};
use crate::state::{AppState, ProductRecord};

/// Ordering of the product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

/// Filters for `GET /v1/products`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    #[param(value_type = Option<String>)]
    pub category: Option<ProductCategory>,
    #[param(value_type = Option<String>)]
    pub species: Option<Species>,
    /// Case-insensitive match on name and description.
    pub q: Option<String>,
    #[param(value_type = Option<String>)]
    pub min_price: Option<Money>,
    #[param(value_type = Option<String>)]
    pub max_price: Option<Money>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    #[param(value_type = Option<String>)]
    pub sort: Option<ProductSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    fn matches(&self, product: &ProductRecord, needle: Option<&str>) -> bool {
        if !product.active {
            return false;
        }
        if self.category.is_some_and(|c| c != product.category) {
            return false;
        }
        // Products with no species listed suit any species.
        if let Some(species) = self.species {
            if !product.species.is_empty() && !product.species.contains(&species) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.in_stock == Some(true) && product.stock == 0 {
            return false;
        }
        if let Some(featured) = self.featured {
            if product.featured != featured {
                return false;
            }
        }
        match needle {
            Some(needle) => {
                product.name.to_lowercase().contains(needle)
                    || product.description.to_lowercase().contains(needle)
            }
            None => true,
        }
    }
}

/// Apply filters and ordering to a product list.
pub fn filter_and_sort(products: Vec<ProductRecord>, query: &ProductQuery) -> Vec<ProductRecord> {
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut items: Vec<ProductRecord> = products
        .into_iter()
        .filter(|p| query.matches(p, needle.as_deref()))
        .collect();

    match query.sort.unwrap_or_default() {
        ProductSort::Newest => items.sort_by_key(|p| (Reverse(p.created_at), p.id)),
        ProductSort::PriceAsc => items.sort_by_key(|p| (p.price, p.id)),
        ProductSort::PriceDesc => items.sort_by_key(|p| (Reverse(p.price), p.id)),
        ProductSort::Name => items.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        }),
    }
    items
}

/// Create or replace a product (admin).
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductInput {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[schema(value_type = String, example = "food")]
    pub category: ProductCategory,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub species: Vec<Species>,
    #[schema(value_type = String, example = "24.99")]
    pub price: Money,
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Validate for ProductInput {
    fn validate(&self) -> Result<(), String> {
        if self.price.is_zero() {
            return Err("price must be greater than zero".into());
        }
        if let Some(compare) = self.compare_at_price {
            if compare <= self.price {
                return Err("compare_at_price must exceed price".into());
            }
        }
        Ok(())
    }
}

/// Set the on-hand stock (admin).
#[derive(Debug, Deserialize, ToSchema)]
pub struct StockUpdate {
    pub stock: u32,
}

/// Public catalog routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/products", get(list_products))
        .route("/v1/products/:id_or_slug", get(get_product))
}

/// Admin catalog routes.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/products", get(admin_list_products).post(create_product))
        .route(
            "/v1/admin/products/:id",
            put(update_product).delete(delete_product),
        )
        .route("/v1/admin/products/:id/stock", put(set_stock))
        .route("/v1/admin/products/:id/activate", post(activate_product))
}

/// GET /v1/products — Filtered, sorted, paginated storefront listing.
#[utoipa::path(
    get,
    path = "/v1/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "One page of products", body = crate::extractors::ProductPage),
        (status = 400, description = "Malformed filter", body = crate::error::ErrorBody),
    ),
    tag = "catalog"
)]
async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<Page<ProductRecord>>, AppError> {
    let query = extract_query(query)?;
    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            return Err(AppError::BadRequest("min_price exceeds max_price".into()));
        }
    }
    let items = filter_and_sort(state.products.list(), &query);
    Ok(Json(Page::from_sorted(
        items,
        PageParams {
            page: query.page,
            per_page: query.per_page,
        },
    )))
}

/// GET /v1/products/:id_or_slug — Product detail.
#[utoipa::path(
    get,
    path = "/v1/products/{id_or_slug}",
    params(("id_or_slug" = String, Path, description = "Product UUID or slug")),
    responses(
        (status = 200, description = "Product", body = ProductRecord),
        (status = 404, description = "Not found or inactive", body = crate::error::ErrorBody),
    ),
    tag = "catalog"
)]
async fn get_product(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ProductRecord>, AppError> {
    state
        .product_by_id_or_slug(&key)
        .filter(|p| p.active)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {key} not found")))
}

/// GET /v1/admin/products — Every product, including inactive ones.
#[utoipa::path(
    get,
    path = "/v1/admin/products",
    responses((status = 200, description = "All products", body = Vec<ProductRecord>)),
    tag = "admin"
)]
async fn admin_list_products(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ProductRecord>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let mut items = state.products.list();
    items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(Json(items))
}

fn resolve_slug(input: &ProductInput, name: &str) -> Result<String, AppError> {
    let slug = slugify(input.slug.as_deref().unwrap_or(name));
    if slug.is_empty() {
        return Err(AppError::Validation(
            "slug must contain at least one letter or digit".into(),
        ));
    }
    Ok(slug)
}

fn slug_taken(slug: &str) -> AppError {
    AppError::Conflict(format!("slug {slug} is already in use"))
}

/// POST /v1/admin/products — Create a product.
#[utoipa::path(
    post,
    path = "/v1/admin/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Created", body = ProductRecord),
        (status = 409, description = "Slug in use", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn create_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductRecord>), AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_validated_json(body)?;
    let name = require_text("name", &input.name, 200)?;
    let slug = resolve_slug(&input, &name)?;

    let now = Utc::now();
    let product = ProductRecord {
        id: Uuid::new_v4(),
        slug,
        name,
        description: input.description.trim().to_string(),
        category: input.category,
        species: input.species,
        price: input.price,
        compare_at_price: input.compare_at_price,
        stock: input.stock,
        images: input.images,
        featured: input.featured,
        active: input.active,
        created_at: now,
        updated_at: now,
    };
    if !state
        .products
        .insert_unless(product.id, product.clone(), |p| p.slug == product.slug)
    {
        return Err(slug_taken(&product.slug));
    }
    state.persist(&product).await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /v1/admin/products/:id — Replace a product's fields.
#[utoipa::path(
    put,
    path = "/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Updated", body = ProductRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Slug in use", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn update_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<ProductRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_validated_json(body)?;
    let name = require_text("name", &input.name, 200)?;
    let slug = resolve_slug(&input, &name)?;

    let product = state
        .products
        .update_unless(&id, |p| p.slug == slug, |p| {
            p.slug = slug.clone();
            p.name = name;
            p.description = input.description.trim().to_string();
            p.category = input.category;
            p.species = input.species;
            p.price = input.price;
            p.compare_at_price = input.compare_at_price;
            p.stock = input.stock;
            p.images = input.images;
            p.featured = input.featured;
            p.active = input.active;
            p.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?
        .map_err(|_| slug_taken(&slug))?;
    state.persist(&product).await?;
    Ok(Json(product))
}

/// DELETE /v1/admin/products/:id — Deactivate a product.
///
/// Products are soft-deleted so placed orders keep a valid reference.
#[utoipa::path(
    delete,
    path = "/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Deactivated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn delete_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    set_active(&state, id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/admin/products/:id/activate — Restore a deactivated product.
#[utoipa::path(
    post,
    path = "/v1/admin/products/{id}/activate",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reactivated", body = ProductRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn activate_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    set_active(&state, id, true).await.map(Json)
}

async fn set_active(state: &AppState, id: Uuid, active: bool) -> Result<ProductRecord, AppError> {
    let product = state
        .products
        .update(&id, |p| {
            p.active = active;
            p.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;
    state.persist(&product).await?;
    tracing::info!(product_id = %id, active, "product visibility changed");
    Ok(product)
}

/// PUT /v1/admin/products/:id/stock — Set the on-hand quantity.
#[utoipa::path(
    put,
    path = "/v1/admin/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = StockUpdate,
    responses(
        (status = 200, description = "Stock set", body = ProductRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn set_stock(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<StockUpdate>, JsonRejection>,
) -> Result<Json<ProductRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let update = extract_json(body)?;
    let product = state
        .products
        .update(&id, |p| {
            p.stock = update.stock;
            p.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;
    state.persist(&product).await?;
    tracing::info!(product_id = %id, stock = update.stock, "stock set");
    Ok(Json(product))
}
