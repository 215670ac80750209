use serde::{Deserialize, Serialize};

/// Request body for updating the company profile.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub company_name: String,
    pub pan_number: String,
    #[serde(default)]
    pub gst_number: Option<String>,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub website: Option<String>,
}

/// Company profile as shown to its owner and embedded in rendered documents.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub company_name: String,
    pub pan_number: String,
    pub gst_number: Option<String>,
    pub phone: String,
    pub address: String,
    pub website: Option<String>,
    pub logo_url: Option<String>, // presigned, short lived
    pub is_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct GetProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub is_new: bool,
}
