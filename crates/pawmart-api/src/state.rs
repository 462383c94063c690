//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! Every collection lives in an in-memory [`Store`] that serves all reads.
//! When a database pool is configured, each write is also persisted as a
//! JSONB document (write-through) and the stores are hydrated from the
//! database on startup. A failed persist surfaces as a 500 so the client
//! never believes a write is durable when it is not.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pawmart_core::{
    AdoptionStatus, Cart, Money, OrderStatus, PaymentMethod, PetSex, PetSize, PricedLine,
    ProductCategory, ReservationStatus, ShippingAddress, Species,
};
use pawmart_mail::MailClient;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Insert unless any existing record matches `conflict`, checked under
    /// the same write lock. Returns whether the record was inserted.
    pub fn insert_unless(&self, id: Uuid, value: T, conflict: impl Fn(&T) -> bool) -> bool {
        let mut guard = self.data.write();
        if guard.values().any(|v| conflict(v)) {
            return false;
        }
        guard.insert(id, value);
        true
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// List the records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data.read().values().filter(|v| pred(v)).cloned().collect()
    }

    /// First record matching a predicate.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Update a record unless any other record matches `conflict`, checked
    /// under the same write lock.
    ///
    /// Returns `None` if the record doesn't exist, `Some(Err(other))` with
    /// the first conflicting record, or `Some(Ok(updated))`.
    pub fn update_unless(
        &self,
        id: &Uuid,
        conflict: impl Fn(&T) -> bool,
        f: impl FnOnce(&mut T),
    ) -> Option<Result<T, T>> {
        let mut guard = self.data.write();
        if !guard.contains_key(id) {
            return None;
        }
        if let Some(other) = guard.iter().find(|(k, v)| *k != id && conflict(v)) {
            return Some(Err(other.1.clone()));
        }
        let entry = guard.get_mut(id)?;
        f(entry);
        Some(Ok(entry.clone()))
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure may inspect the current state, validate preconditions,
    /// mutate the record, and return `Ok(R)` or `Err(E)`, all under a single
    /// write lock.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Atomically validate and mutate several records.
    ///
    /// `check` runs for every id first (with `None` for a missing record);
    /// `apply` runs only if every check passed. Either all records change
    /// or none do. Returns the updated records in `ids` order.
    pub fn try_update_many<E>(
        &self,
        ids: &[Uuid],
        check: impl Fn(&Uuid, Option<&T>) -> Result<(), E>,
        apply: impl Fn(&Uuid, &mut T),
    ) -> Result<Vec<T>, E> {
        let mut guard = self.data.write();
        for id in ids {
            check(id, guard.get(id))?;
        }
        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = guard.get_mut(id) {
                apply(id, entry);
                updated.push(entry.clone());
            }
        }
        Ok(updated)
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Remove every record matching a predicate, returning the removed records.
    pub fn remove_matching(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut guard = self.data.write();
        let ids: Vec<Uuid> = guard
            .iter()
            .filter(|(_, v)| pred(v))
            .map(|(k, _)| *k)
            .collect();
        ids.iter().filter_map(|id| guard.remove(id)).collect()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Documents ----------------------------------------------------------------

/// A record persisted as a JSONB document in the `documents` table.
pub trait Document: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Collection name, the first half of the primary key.
    const COLLECTION: &'static str;

    /// Document id, the second half of the primary key.
    fn id(&self) -> Uuid;
}

macro_rules! document {
    ($ty:ty, $collection:literal) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;
            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

// -- Records ------------------------------------------------------------------

/// A customer or staff account.
///
/// Never returned directly; routes respond with [`AccountView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    /// Lowercased, unique.
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    /// `sha256i$<rounds>$<salt hex>$<hash hex>`.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for AccountView {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// A login session. Only the SHA-256 of the session secret is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Hex SHA-256 of the secret half of the token.
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A product in the supplies catalog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductRecord {
    pub id: Uuid,
    /// URL slug, unique across products.
    pub slug: String,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "food")]
    pub category: ProductCategory,
    /// Species the product is meant for. Empty means any.
    #[schema(value_type = Vec<String>)]
    pub species: Vec<Species>,
    #[schema(value_type = String, example = "24.99")]
    pub price: Money,
    /// Previous price shown struck through.
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Money>,
    pub stock: u32,
    pub images: Vec<String>,
    pub featured: bool,
    /// Inactive products are hidden from the storefront and cannot be bought.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pet listed for adoption.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PetRecord {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String, example = "dog")]
    pub species: Species,
    pub breed: Option<String>,
    pub age_months: u32,
    #[schema(value_type = String, example = "medium")]
    pub size: PetSize,
    #[schema(value_type = String, example = "female")]
    pub sex: PetSex,
    pub description: String,
    pub images: Vec<String>,
    #[schema(value_type = String, example = "150.00")]
    pub adoption_fee: Money,
    #[schema(value_type = String, example = "AVAILABLE")]
    pub status: AdoptionStatus,
    pub vaccinated: bool,
    pub neutered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's server-side cart. Keyed by the user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartRecord {
    /// Same as `user_id`.
    pub id: Uuid,
    pub user_id: Uuid,
    pub cart: Cart,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A user's wishlist. Keyed by the user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WishlistRecord {
    /// Same as `user_id`.
    pub id: Uuid,
    pub user_id: Uuid,
    /// Products in insertion order, no duplicates.
    pub product_ids: Vec<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One entry in an order's status history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    #[schema(value_type = String, example = "PROCESSING")]
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

/// A placed order. Lines and totals are frozen at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderRecord {
    pub id: Uuid,
    /// `PM-YYYYMMDD-XXXXXXXX`.
    pub order_number: String,
    pub user_id: Uuid,
    #[schema(value_type = Vec<Object>)]
    pub lines: Vec<PricedLine>,
    pub item_count: u32,
    #[schema(value_type = String)]
    pub subtotal: Money,
    #[schema(value_type = String)]
    pub shipping: Money,
    #[schema(value_type = String)]
    pub tax: Money,
    #[schema(value_type = String)]
    pub total: Money,
    #[schema(value_type = String, example = "PENDING")]
    pub status: OrderStatus,
    #[schema(value_type = String, example = "cash_on_delivery")]
    pub payment_method: PaymentMethod,
    #[schema(value_type = Object)]
    pub shipping_address: ShippingAddress,
    pub contact_email: String,
    pub notes: Option<String>,
    pub status_history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A photo in the public gallery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GalleryItemRecord {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub caption: Option<String>,
    pub tags: Vec<String>,
    /// Pet pictured, if any.
    pub pet_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A staff member in the team directory.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamMemberRecord {
    pub id: Uuid,
    pub name: String,
    /// Job title shown on the team page.
    pub position: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
    /// Ascending sort key on the team page.
    pub display_order: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booked visit to meet a pet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pet_id: Uuid,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    /// Start of the one-hour slot.
    pub scheduled_for: DateTime<Utc>,
    pub party_size: u32,
    pub notes: Option<String>,
    #[schema(value_type = String, example = "PENDING")]
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

document!(UserRecord, "users");
document!(SessionRecord, "sessions");
document!(ProductRecord, "products");
document!(PetRecord, "pets");
document!(CartRecord, "carts");
document!(WishlistRecord, "wishlists");
document!(OrderRecord, "orders");
document!(GalleryItemRecord, "gallery");
document!(TeamMemberRecord, "team");
document!(ReservationRecord, "reservations");

// -- Application State --------------------------------------------------------

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each `Store`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Store<UserRecord>,
    pub sessions: Store<SessionRecord>,
    pub products: Store<ProductRecord>,
    pub pets: Store<PetRecord>,
    pub carts: Store<CartRecord>,
    pub wishlists: Store<WishlistRecord>,
    pub orders: Store<OrderRecord>,
    pub gallery: Store<GalleryItemRecord>,
    pub team: Store<TeamMemberRecord>,
    pub reservations: Store<ReservationRecord>,

    /// PostgreSQL pool. `None` runs the API in in-memory-only mode.
    pub db_pool: Option<PgPool>,

    /// Transactional-email client. `None` disables outgoing mail.
    pub mail: Option<MailClient>,

    /// Request counters, shared with the metrics middleware.
    pub metrics: ApiMetrics,

    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration and no mail client.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None, None)
    }

    /// State with the given configuration, optional mail client and optional pool.
    pub fn with_config(
        config: AppConfig,
        mail: Option<MailClient>,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            users: Store::new(),
            sessions: Store::new(),
            products: Store::new(),
            pets: Store::new(),
            carts: Store::new(),
            wishlists: Store::new(),
            orders: Store::new(),
            gallery: Store::new(),
            team: Store::new(),
            reservations: Store::new(),
            db_pool,
            mail,
            metrics: ApiMetrics::new(),
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let users = hydrate(pool, &self.users).await?;
        let sessions = hydrate(pool, &self.sessions).await?;
        let products = hydrate(pool, &self.products).await?;
        let pets = hydrate(pool, &self.pets).await?;
        let carts = hydrate(pool, &self.carts).await?;
        let wishlists = hydrate(pool, &self.wishlists).await?;
        let orders = hydrate(pool, &self.orders).await?;
        let gallery = hydrate(pool, &self.gallery).await?;
        let team = hydrate(pool, &self.team).await?;
        let reservations = hydrate(pool, &self.reservations).await?;
        let expired_sessions = crate::auth::sweep_expired_sessions(self).await;

        tracing::info!(
            users,
            sessions,
            expired_sessions,
            products,
            pets,
            carts,
            wishlists,
            orders,
            gallery,
            team,
            reservations,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }

    /// Write a document through to the database, if one is configured.
    pub async fn persist<D: Document>(&self, doc: &D) -> Result<(), AppError> {
        if let Some(pool) = &self.db_pool {
            if let Err(e) = crate::db::documents::upsert(pool, doc).await {
                tracing::error!(
                    collection = D::COLLECTION,
                    id = %doc.id(),
                    error = %e,
                    "failed to persist document"
                );
                return Err(AppError::Internal(format!(
                    "{} {} recorded in-memory but database persist failed",
                    D::COLLECTION,
                    doc.id()
                )));
            }
        }
        Ok(())
    }

    /// Delete a document from the database, if one is configured.
    pub async fn persist_delete<D: Document>(&self, id: Uuid) -> Result<(), AppError> {
        if let Some(pool) = &self.db_pool {
            if let Err(e) = crate::db::documents::delete(pool, D::COLLECTION, id).await {
                tracing::error!(
                    collection = D::COLLECTION,
                    id = %id,
                    error = %e,
                    "failed to delete document"
                );
                return Err(AppError::Internal(format!(
                    "{} {id} removed in-memory but database delete failed",
                    D::COLLECTION
                )));
            }
        }
        Ok(())
    }

    /// Look up a product by id or slug.
    pub fn product_by_id_or_slug(&self, key: &str) -> Option<ProductRecord> {
        match key.parse::<Uuid>() {
            Ok(id) => self.products.get(&id),
            Err(_) => self.products.find(|p| p.slug == key),
        }
    }

    /// A user's cart, empty if they never had one.
    pub fn cart_of(&self, user_id: Uuid) -> CartRecord {
        self.carts.get(&user_id).unwrap_or(CartRecord {
            id: user_id,
            user_id,
            cart: Cart::new(),
            updated_at: None,
        })
    }

    /// A user's wishlist, empty if they never had one.
    pub fn wishlist_of(&self, user_id: Uuid) -> WishlistRecord {
        self.wishlists.get(&user_id).unwrap_or(WishlistRecord {
            id: user_id,
            user_id,
            product_ids: Vec::new(),
            updated_at: None,
        })
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

async fn hydrate<D: Document>(pool: &PgPool, store: &Store<D>) -> Result<usize, String> {
    let docs = crate::db::documents::load_all::<D>(pool)
        .await
        .map_err(|e| format!("failed to load {}: {e}", D::COLLECTION))?;
    let count = docs.len();
    for doc in docs {
        store.insert(doc.id(), doc);
    }
    Ok(count)
}
