use axum::{Json, extract::State};

use quadlist_db::models::ProfileUpdate;
use quadlist_types::api::{ProfileResponse, SimpleResponse, UpdateProfileRequest};

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::{AppState, blocking};

pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let state2 = state.clone();
    let profile = blocking(move || Ok(state2.db.profile(user.user_id)?))
        .await?
        // A valid session pointing at a missing row is an internal
        // consistency fault; the client still just sees 404.
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        id: profile.id,
        email: profile.email,
        first_name: profile.first_name,
        last_name: profile.last_name,
        phone: profile.phone,
        major: profile.major,
        graduation_year: profile.graduation_year,
        campus: profile.campus,
        bio: profile.bio,
        preferred_contact: profile.preferred_contact,
        notifications: profile.notifications,
        messages: profile.messages,
    }))
}

/// Whole-record replace, not a merge: optional fields left out of the request
/// overwrite the stored value with NULL.
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let update = ProfileUpdate {
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        major: req.major,
        graduation_year: req.graduation_year,
        campus: req.campus,
        bio: req.bio,
        preferred_contact: req.preferred_contact,
        notifications: req.notifications,
        messages: req.messages,
    };

    let state2 = state.clone();
    let affected =
        blocking(move || Ok(state2.db.update_profile(user.user_id, &update)?)).await?;
    if affected == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(Json(SimpleResponse {
        success: true,
        message: "Profile updated successfully".to_string(),
    }))
}
