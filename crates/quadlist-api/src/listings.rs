use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::info;

use quadlist_db::models::{ListingFilter, ListingRow, ListingUpdate, NewListing, SortKey};
use quadlist_types::api::{
    CreateListingRequest, CreateListingResponse, ListingResponse, SimpleResponse,
    UpdateListingRequest, UpdateStatusRequest,
};
use quadlist_types::models::{Category, ListingStatus};

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::{AppState, blocking};

/// The external upload collaborator caps attachments at 5; reject anything
/// beyond that rather than silently truncating.
const MAX_IMAGES: usize = 5;

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let category = query
        .category
        .filter(|c| !c.is_empty())
        .map(|c| parse_category(&c))
        .transpose()?;
    let filter = ListingFilter {
        category,
        search: query.search.filter(|s| !s.is_empty()),
        sort: SortKey::parse_or_default(query.sort.as_deref()),
    };

    let state2 = state.clone();
    let rows = blocking(move || Ok(state2.db.listings(&filter)?)).await?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

pub async fn list_mine(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let state2 = state.clone();
    let rows = blocking(move || Ok(state2.db.listings_by_owner(user.user_id)?)).await?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateListingRequest>,
) -> Result<Json<CreateListingResponse>, ApiError> {
    let category = parse_category(&req.category)?;
    let price = validate_price(req.price)?;
    if req.images.len() > MAX_IMAGES {
        return Err(ApiError::Validation(format!(
            "At most {} images are allowed",
            MAX_IMAGES
        )));
    }

    let listing = NewListing {
        title: req.title,
        description: req.description,
        category,
        price,
        images: req.images,
    };

    let state2 = state.clone();
    let listing_id = blocking(move || Ok(state2.db.create_listing(user.user_id, &listing)?)).await?;
    info!("Listing {} created by user {}", listing_id, user.user_id);

    Ok(Json(CreateListingResponse {
        success: true,
        message: "Listing created successfully".to_string(),
        listing_id,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(listing_id): Path<i64>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let update = ListingUpdate {
        title: req.title,
        description: req.description,
        category: parse_category(&req.category)?,
        price: validate_price(req.price)?,
    };

    let state2 = state.clone();
    let affected =
        blocking(move || Ok(state2.db.update_listing(user.user_id, listing_id, &update)?)).await?;
    if affected == 0 {
        return Err(listing_not_found());
    }

    Ok(Json(SimpleResponse {
        success: true,
        message: "Listing updated successfully".to_string(),
    }))
}

pub async fn set_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(listing_id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let status: ListingStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::Validation("Invalid status".to_string()))?;

    let state2 = state.clone();
    let affected =
        blocking(move || Ok(state2.db.set_listing_status(user.user_id, listing_id, status)?))
            .await?;
    if affected == 0 {
        return Err(listing_not_found());
    }

    Ok(Json(SimpleResponse {
        success: true,
        message: "Listing status updated successfully".to_string(),
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(listing_id): Path<i64>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let state2 = state.clone();
    let affected = blocking(move || Ok(state2.db.delete_listing(user.user_id, listing_id)?)).await?;
    if affected == 0 {
        return Err(listing_not_found());
    }
    info!("Listing {} deleted by user {}", listing_id, user.user_id);

    Ok(Json(SimpleResponse {
        success: true,
        message: "Listing deleted successfully".to_string(),
    }))
}

fn to_response(row: ListingRow) -> ListingResponse {
    let (first_name, last_name, email) = match row.owner {
        Some(owner) => (Some(owner.first_name), Some(owner.last_name), Some(owner.email)),
        None => (None, None, None),
    };
    ListingResponse {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        description: row.description,
        category: row.category,
        price: row.price,
        status: row.status,
        images: row.images,
        created_at: row.created_at,
        updated_at: row.updated_at,
        first_name,
        last_name,
        email,
    }
}

fn parse_category(raw: &str) -> Result<Category, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation("Invalid category".to_string()))
}

fn validate_price(price: Option<f64>) -> Result<Option<f64>, ApiError> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => {
            Err(ApiError::Validation("Price must be a non-negative number".to_string()))
        }
        other => Ok(other),
    }
}

fn listing_not_found() -> ApiError {
    // "does not exist" and "not yours" collapse into one answer on purpose
    ApiError::NotFound("Listing not found or unauthorized".to_string())
}
