use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::profile::dto::{ProfileResponse, UpdateProfileRequest};
use crate::profile::repo;
use crate::profile::repo_types::{CompanyProfile, ProfileUpdate};
use crate::state::AppState;
use crate::storage::{logo_key, LogoFormat};

pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;
const LOGO_URL_TTL: Duration = Duration::from_secs(30 * 60);
const MIN_PHONE_LEN: usize = 10;

fn required(field: &str, label: &str, value: &str) -> AppResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::validation(field, format!("{label} is required.")));
    }
    Ok(v.to_string())
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn validate_update(req: &UpdateProfileRequest) -> AppResult<ProfileUpdate> {
    let company_name = required("company_name", "Company name", &req.company_name)?;
    let pan_number = required("pan_number", "PAN number", &req.pan_number)?;
    let phone = required("phone", "Phone number", &req.phone)?;
    if phone.chars().count() < MIN_PHONE_LEN {
        return Err(AppError::validation(
            "phone",
            "Phone number must be at least 10 digits long.",
        ));
    }
    let address = required("address", "Address", &req.address)?;
    let website = optional(&req.website);
    if let Some(url) = &website {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::validation("website", "Enter a valid URL."));
        }
    }
    Ok(ProfileUpdate {
        company_name,
        pan_number,
        gst_number: optional(&req.gst_number),
        phone,
        address,
        website,
    })
}

/// Checks size and format of an uploaded logo.
pub fn validate_logo(file_name: &str, size: usize) -> AppResult<LogoFormat> {
    if size == 0 {
        return Err(AppError::validation("logo", "Logo file is empty."));
    }
    if size > MAX_LOGO_BYTES {
        return Err(AppError::validation(
            "logo",
            "Logo file size must be less than 2MB.",
        ));
    }
    LogoFormat::from_file_name(file_name).ok_or_else(|| {
        AppError::validation(
            "logo",
            "Unsupported file format. Please upload JPG, JPEG, PNG or GIF.",
        )
    })
}

pub async fn to_response(state: &AppState, profile: CompanyProfile) -> ProfileResponse {
    let is_complete = profile.is_complete();
    let logo_url = match &profile.logo_key {
        Some(key) => match state.storage.signed_url(key, LOGO_URL_TTL).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, user_id = %profile.user_id, "presign logo failed");
                None
            }
        },
        None => None,
    };
    ProfileResponse {
        company_name: profile.company_name,
        pan_number: profile.pan_number,
        gst_number: profile.gst_number,
        phone: profile.phone,
        address: profile.address,
        website: profile.website,
        logo_url,
        is_complete,
    }
}

pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    req: &UpdateProfileRequest,
) -> AppResult<ProfileResponse> {
    let fields = validate_update(req)?;
    repo::get_or_create(&state.db, user_id).await?;
    let profile = repo::update(&state.db, user_id, &fields).await?;
    info!(user_id = %user_id, "company profile updated");
    Ok(to_response(state, profile).await)
}

pub async fn upload_logo(
    state: &AppState,
    user_id: Uuid,
    file_name: &str,
    body: Bytes,
) -> AppResult<ProfileResponse> {
    let format = validate_logo(file_name, body.len())?;
    repo::get_or_create(&state.db, user_id).await?;

    let key = logo_key(user_id, format);
    state.storage.put(&key, body, format.content_type()).await?;

    if let Some(old) = repo::set_logo(&state.db, user_id, &key).await? {
        if let Err(e) = state.storage.remove(&old).await {
            warn!(error = %e, key = %old, "failed to delete replaced logo");
        }
    }

    let profile = repo::get(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("company profile"))?;
    info!(user_id = %user_id, key = %key, "company logo uploaded");
    Ok(to_response(state, profile).await)
}
