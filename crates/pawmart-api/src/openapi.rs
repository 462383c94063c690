//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PawMart API",
        version = "0.3.2",
        description = "Pet adoption and pet supplies storefront: catalog, cart, checkout, orders, visit reservations and back office."
    ),
    paths(
        // Accounts
        crate::routes::accounts::register,
        crate::routes::accounts::login,
        crate::routes::accounts::logout,
        crate::routes::accounts::me,
        // Catalog
        crate::routes::products::list_products,
        crate::routes::products::get_product,
        // Pets
        crate::routes::pets::list_pets,
        crate::routes::pets::get_pet,
        // Content
        crate::routes::gallery::list_gallery,
        crate::routes::team::list_team,
        // Cart & wishlist
        crate::routes::cart::get_cart,
        crate::routes::cart::add_item,
        crate::routes::cart::set_quantity,
        crate::routes::cart::remove_item,
        crate::routes::cart::clear_cart,
        crate::routes::wishlist::get_wishlist,
        crate::routes::wishlist::add_item,
        crate::routes::wishlist::remove_item,
        crate::routes::wishlist::move_to_cart,
        // Checkout & orders
        crate::routes::checkout::quote_cart,
        crate::routes::checkout::place_order,
        crate::routes::orders::list_own,
        crate::routes::orders::get_own,
        crate::routes::orders::cancel_own,
        // Reservations
        crate::routes::reservations::book,
        crate::routes::reservations::list_own,
        crate::routes::reservations::cancel_own,
        // Admin
        crate::routes::admin::dashboard,
        crate::routes::admin::list_users,
        crate::routes::admin::set_role,
        crate::routes::products::admin_list_products,
        crate::routes::products::create_product,
        crate::routes::products::update_product,
        crate::routes::products::delete_product,
        crate::routes::products::activate_product,
        crate::routes::products::set_stock,
        crate::routes::pets::create_pet,
        crate::routes::pets::update_pet,
        crate::routes::pets::delete_pet,
        crate::routes::gallery::create_item,
        crate::routes::gallery::update_item,
        crate::routes::gallery::delete_item,
        crate::routes::team::create_member,
        crate::routes::team::update_member,
        crate::routes::team::delete_member,
        crate::routes::orders::list_all,
        crate::routes::orders::get_any,
        crate::routes::orders::update_status,
        crate::routes::reservations::list_all,
        crate::routes::reservations::update_status,
    ),
    components(schemas(
        // Records
        crate::state::AccountView,
        crate::state::ProductRecord,
        crate::state::PetRecord,
        crate::state::OrderRecord,
        crate::state::StatusChange,
        crate::state::GalleryItemRecord,
        crate::state::TeamMemberRecord,
        crate::state::ReservationRecord,
        crate::auth::Role,
        crate::auth::IssuedSession,
        crate::extractors::ProductPage,
        crate::extractors::PetPage,
        // Errors
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // DTOs
        crate::routes::accounts::RegisterRequest,
        crate::routes::accounts::LoginRequest,
        crate::routes::accounts::SessionResponse,
        crate::routes::products::ProductInput,
        crate::routes::products::ProductSort,
        crate::routes::products::StockUpdate,
        crate::routes::pets::PetInput,
        crate::routes::gallery::GalleryInput,
        crate::routes::team::TeamMemberInput,
        crate::routes::cart::AddItemRequest,
        crate::routes::cart::SetQuantityRequest,
        crate::routes::cart::CartLineView,
        crate::routes::cart::CartView,
        crate::routes::wishlist::WishlistAddRequest,
        crate::routes::checkout::CheckoutRequest,
        crate::routes::checkout::CheckoutQuote,
        crate::routes::orders::OrderStatusUpdate,
        crate::routes::reservations::ReservationRequest,
        crate::routes::reservations::ReservationStatusUpdate,
        crate::routes::admin::Dashboard,
        crate::routes::admin::LowStockItem,
        crate::routes::admin::RequestMetrics,
        crate::routes::admin::RoleUpdate,
    )),
    tags(
        (name = "accounts", description = "Registration and sessions"),
        (name = "catalog", description = "Pet supplies catalog"),
        (name = "pets", description = "Pets available for adoption"),
        (name = "gallery", description = "Photo gallery"),
        (name = "team", description = "Team directory"),
        (name = "cart", description = "Shopping cart"),
        (name = "wishlist", description = "Saved products"),
        (name = "checkout", description = "Pricing and order placement"),
        (name = "orders", description = "Order history"),
        (name = "reservations", description = "Pet visit reservations"),
        (name = "admin", description = "Back office"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
