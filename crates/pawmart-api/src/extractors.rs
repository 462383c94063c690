//! # Custom Extractors & Validation
//!
//! The [`Validate`] trait for request DTOs, helpers that map JSON and query
//! rejections into [`AppError`], and page-based pagination shared by the
//! list endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::state::{PetRecord, ProductRecord};

/// Default page size for list endpoints.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract query parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// `page` / `per_page` query parameters. Pages are 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number, starting at 1.
    pub page: Option<u32>,
    /// Items per page (1..=100, default 20).
    pub per_page: Option<u32>,
}

impl PageParams {
    /// Resolve defaults and clamp to the allowed range.
    pub fn resolve(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }
}

/// One page of a filtered, sorted listing.
#[derive(Debug, Serialize, ToSchema)]
#[aliases(ProductPage = Page<ProductRecord>, PetPage = Page<PetRecord>)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching items across all pages.
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    /// Cut one page out of an already filtered and sorted list.
    pub fn from_sorted(items: Vec<T>, params: PageParams) -> Self {
        let (page, per_page) = params.resolve();
        let total = items.len();
        let skip = (page as usize - 1).saturating_mul(per_page as usize);
        let items = items.into_iter().skip(skip).take(per_page as usize).collect();
        Self {
            items,
            total,
            page,
            per_page,
        }
    }
}
