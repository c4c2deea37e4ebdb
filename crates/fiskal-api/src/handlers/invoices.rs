//! Tenant-scoped invoice handlers
//!
//! The invoice CRUD surface itself is thin glue around the record store;
//! what matters here is the tenant discipline: every read derives a
//! [`TenantScope`] from the authenticated identity before touching
//! records, so administrators see everything and everyone else only their
//! own rows. No handler queries the store without a scope.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use fiskal_core::{Identity, RecordFilter, TenantScope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// An invoice row as the record store returns it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceRecord {
    pub id: String,
    /// Identifier of the owning user; the tenant boundary.
    pub owner_id: String,
    pub number: String,
    pub total_cents: i64,
    pub paid: bool,
}

/// Optional business filters for listing
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    /// Only invoices with this paid status
    pub paid: Option<bool>,
}

/// Invoice list response
#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceRecord>,
}

/// List invoices visible to the authenticated identity
///
/// Business filters are ANDed with the tenant restriction; they can narrow
/// the result but never widen it past the tenant boundary.
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    tag = "invoices",
    responses(
        (status = 200, description = "Invoices visible to the caller", body = InvoiceListResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    )
)]
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<InvoiceQuery>,
) -> Result<impl IntoResponse, AppError> {
    let scope = TenantScope::for_identity(&identity);

    let mut filter = RecordFilter::scoped(&scope);
    if let Some(paid) = query.paid {
        filter = filter.and(move |invoice: &InvoiceRecord| invoice.paid == paid);
    }

    let invoices = state
        .invoices
        .read()
        .await
        .iter()
        .filter(|invoice| filter.matches(invoice, &invoice.owner_id))
        .cloned()
        .collect();

    Ok(Json(InvoiceListResponse { invoices }))
}

/// Fetch a single invoice
///
/// An existing record outside the caller's tenant scope is rejected with
/// the generic 403 body; only genuinely missing records read as 404.
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    tag = "invoices",
    responses(
        (status = 200, description = "Invoice", body = InvoiceRecord),
        (status = 403, description = "Outside the caller's tenant scope", body = crate::error::ApiError),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let scope = TenantScope::for_identity(&identity);

    let invoice = state
        .invoices
        .read()
        .await
        .iter()
        .find(|invoice| invoice.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

    if !scope.permits(&invoice.owner_id) {
        return Err(AppError::Forbidden);
    }

    Ok(Json(invoice))
}
